//! Working with CfgValue and hand-built descriptors.
//!
//! Run with: cargo run --example dynamic_values

use serde_cfg::{decode, encode, CfgMap, CfgValue, DecodeOptions, Descriptor, EncodeOptions, Field, ScalarKind};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    // Describe the shape at runtime instead of deriving it
    let descriptor = Descriptor::Struct(vec![
        Field::new("Name", Descriptor::Scalar(ScalarKind::String)),
        Field::new("Workers", Descriptor::Scalar(ScalarKind::U8)),
        Field::new("Started", Descriptor::Time),
        Field::new("Labels", Descriptor::map_of(Descriptor::Scalar(ScalarKind::String))),
    ]);

    let source = "Name = crawler\nWorkers = 4\nStarted = 2024-03-01 08:30:00\n\
                  Labels.Team = search\nLabels.Tier = 2\n";
    let value = decode(source, &descriptor, &DecodeOptions::default())?;

    // Access values dynamically
    if let Some(name) = value.pointer("Name").and_then(CfgValue::as_str) {
        println!("Accessing field 'Name': {}", name);
    }
    if let Some(workers) = value.pointer("Workers").and_then(CfgValue::as_u64) {
        println!("Accessing field 'Workers': {}", workers);
    }
    if let Some(labels) = value.pointer("Labels").and_then(CfgValue::as_map) {
        println!("Accessing field 'Labels': {} entries\n", labels.len());
    }

    // Build a value by hand and render it
    let mut labels = CfgMap::new();
    labels.insert("Zone".to_string(), CfgValue::from("eu-west"));
    labels.insert("Owner".to_string(), CfgValue::from("ops"));

    let mut root = CfgMap::new();
    root.insert("Name".to_string(), CfgValue::from("indexer"));
    root.insert("Workers".to_string(), CfgValue::from(0u8));
    root.insert("Labels".to_string(), CfgValue::Map(labels));

    let compact = encode(&CfgValue::Struct(root.clone()), &EncodeOptions::default())?;
    println!("Compact:\n{}", String::from_utf8(compact)?);

    let full = encode(
        &CfgValue::Struct(root),
        &EncodeOptions::new().with_emit_zero_values(true).with_lowercase_keys(true),
    )?;
    println!("With zero values, lowercase keys:\n{}", String::from_utf8(full)?);

    Ok(())
}
