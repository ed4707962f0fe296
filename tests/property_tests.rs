//! Property-based tests for the round-trip guarantees of the codec.
//!
//! Documents are encoded with zero values written out, so every generated
//! value reaches the decoder and a document is never empty.

#![allow(non_snake_case)]

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_cfg::{from_str, parse_str, to_string_with_options, EncodeOptions, Parser};
use std::collections::BTreeMap;

fn roundtrip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(
    value: &T,
) -> bool {
    let options = EncodeOptions::new().with_emit_zero_values(true);
    match to_string_with_options(value, &options) {
        Ok(serialized) => match from_str::<T>(&serialized) {
            Ok(deserialized) => {
                if *value != deserialized {
                    eprintln!("Mismatch, serialized was: {}", serialized);
                    return false;
                }
                // A second pass renders the same text.
                to_string_with_options(&deserialized, &options)
                    .map(|again| again == serialized)
                    .unwrap_or(false)
            }
            Err(e) => {
                eprintln!("Deserialize failed: {}", e);
                eprintln!("Serialized was: {}", serialized);
                false
            }
        },
        Err(e) => {
            eprintln!("Serialize failed: {}", e);
            false
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Leaf<T> {
    V: T,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Record {
    Id: u32,
    Delta: i64,
    Enabled: bool,
    Label: String,
    Scale: f64,
    Inner: Leaf<i16>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Registry {
    Counts: BTreeMap<String, i64>,
    Names: BTreeMap<String, String>,
    Records: BTreeMap<String, Leaf<u8>>,
}

fn key() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,10}"
}

fn multiline_text() -> impl Strategy<Value = String> {
    prop::collection::vec("[ -~\t]{0,30}", 0..8).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #[test]
    fn prop_i8(n in any::<i8>()) {
        let leaf = Leaf { V: n };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_i64(n in any::<i64>()) {
        let leaf = Leaf { V: n };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_u16(n in any::<u16>()) {
        let leaf = Leaf { V: n };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_u64(n in any::<u64>()) {
        let leaf = Leaf { V: n };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_bool(b in any::<bool>()) {
        let leaf = Leaf { V: b };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_f64_finite(f in -1.0e300f64..1.0e300f64) {
        let leaf = Leaf { V: f };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_f32_binary_fractions(n in -1_000_000i32..1_000_000) {
        let leaf = Leaf { V: n as f32 / 8.0 };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_char(c in any::<char>()) {
        let leaf = Leaf { V: c.to_string() };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_single_line_string(s in ".{0,160}") {
        let leaf = Leaf { V: s };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_multi_line_string(s in multiline_text()) {
        let leaf = Leaf { V: s };
        prop_assert!(roundtrip(&leaf));
    }

    #[test]
    fn prop_record(
        id in any::<u32>(),
        delta in any::<i64>(),
        enabled in any::<bool>(),
        label in "[ -~]{0,60}",
        scale in -1.0e9f64..1.0e9f64,
        inner in any::<i16>(),
    ) {
        let record = Record {
            Id: id,
            Delta: delta,
            Enabled: enabled,
            Label: label,
            Scale: scale,
            Inner: Leaf { V: inner },
        };
        prop_assert!(roundtrip(&record));
    }

    #[test]
    fn prop_registry(
        counts in prop::collection::btree_map(key(), any::<i64>(), 1..6),
        names in prop::collection::btree_map(key(), "[ -~]{0,20}", 0..6),
        records in prop::collection::btree_map(key(), any::<u8>(), 0..6),
    ) {
        let registry = Registry {
            Counts: counts,
            Names: names,
            Records: records.into_iter().map(|(k, v)| (k, Leaf { V: v })).collect(),
        };
        prop_assert!(roundtrip(&registry));
    }

    #[test]
    fn prop_parser_never_panics(lines in prop::collection::vec(".{0,40}", 0..20)) {
        let input = lines.join("\n");
        let result = Parser::default().parse_str(&input);
        if result.entries.is_empty() && result.includes.is_empty() {
            prop_assert!(result.error().is_some());
        }
        let _ = parse_str(&input);
    }

    #[test]
    fn prop_flat_and_nested_agree(
        outer in key().prop_filter("block key", |k| !k.eq_ignore_ascii_case("include")),
        pairs in prop::collection::btree_map(key(), "[a-z0-9]{1,10}", 1..6),
    ) {
        let flat: String = pairs
            .iter()
            .map(|(k, v)| format!("{}.{} = {}\n", outer, k, v))
            .collect();
        let nested = format!(
            "{} {{\n{}}}\n",
            outer,
            pairs.iter().map(|(k, v)| format!("  {} = {}\n", k, v)).collect::<String>()
        );
        let flat_map = parse_str(&flat).unwrap();
        let nested_map = parse_str(&nested).unwrap();
        prop_assert_eq!(flat_map, nested_map);
    }
}
