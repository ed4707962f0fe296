#![allow(non_snake_case)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde::{Deserialize, Serialize};
use serde_cfg::{from_str, parse_str, to_string};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone)]
struct Server {
    Host: String,
    Port: u16,
    Verbose: bool,
}

#[derive(Serialize, Deserialize, Clone)]
struct Service {
    Name: String,
    Weight: f64,
    Replicas: u32,
}

#[derive(Serialize, Deserialize, Clone)]
struct Registry {
    Services: BTreeMap<String, Service>,
}

fn registry(size: u32) -> Registry {
    Registry {
        Services: (0..size)
            .map(|i| {
                (
                    format!("svc{}", i),
                    Service {
                        Name: format!("Service {}", i),
                        Weight: 0.5 + f64::from(i),
                        Replicas: i + 1,
                    },
                )
            })
            .collect(),
    }
}

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let flat: String = (0..100).map(|i| format!("Section.Key{} = value {}\n", i, i)).collect();
    let nested = format!(
        "Section {{\n{}}}\n",
        (0..100).map(|i| format!("  Key{} = value {}\n", i, i)).collect::<String>()
    );

    group.bench_function("flat_paths", |b| b.iter(|| parse_str(black_box(&flat))));
    group.bench_function("nested_block", |b| b.iter(|| parse_str(black_box(&nested))));
    group.finish();
}

fn benchmark_simple(c: &mut Criterion) {
    let server = Server {
        Host: "localhost".to_string(),
        Port: 8080,
        Verbose: true,
    };
    let text = "Host = localhost\nPort = 8080\nVerbose = True\n";

    c.bench_function("encode_simple_struct", |b| b.iter(|| to_string(black_box(&server))));
    c.bench_function("decode_simple_struct", |b| {
        b.iter(|| from_str::<Server>(black_box(text)))
    });
}

fn benchmark_registry(c: &mut Criterion) {
    let mut encode = c.benchmark_group("encode_registry");
    for size in [10, 50, 100, 500].iter() {
        let data = registry(*size);
        encode.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| to_string(black_box(data)))
        });
    }
    encode.finish();

    let mut decode = c.benchmark_group("decode_registry");
    for size in [10, 50, 100, 500].iter() {
        let text = to_string(&registry(*size)).unwrap();
        decode.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| from_str::<Registry>(black_box(text)))
        });
    }
    decode.finish();
}

fn benchmark_strings(c: &mut Criterion) {
    #[derive(Serialize, Deserialize)]
    struct Text {
        Value: String,
    }

    let mut group = c.benchmark_group("encode_strings");

    let short = Text {
        Value: "short".to_string(),
    };
    let long = Text {
        Value: "This is a very long string that will be wrapped across several lines of output ".repeat(4),
    };
    let multiline = Text {
        Value: (0..10).map(|i| format!("line number {}\n", i)).collect(),
    };

    group.bench_function("short_string", |b| b.iter(|| to_string(black_box(&short))));
    group.bench_function("wrapped_string", |b| b.iter(|| to_string(black_box(&long))));
    group.bench_function("heredoc_string", |b| b.iter(|| to_string(black_box(&multiline))));

    group.finish();
}

criterion_group!(
    benches,
    benchmark_parse,
    benchmark_simple,
    benchmark_registry,
    benchmark_strings
);
criterion_main!(benches);
