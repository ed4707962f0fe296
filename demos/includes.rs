//! Splicing included documents into a parse.
//!
//! Run with: cargo run --example includes

#![allow(non_snake_case)]

use serde::Deserialize;
use serde_cfg::{from_str_with_resolver, DecodeOptions};
use std::collections::HashMap;
use std::error::Error;
use std::io;

#[derive(Debug, Deserialize)]
struct Database {
    Url: String,
    Pool: u32,
}

#[derive(Debug, Deserialize)]
struct Config {
    Name: String,
    Database: Database,
}

const MAIN: &str = "Name = billing\ninclude \"database.cfg\"\nDatabase.Pool = 8\n";

fn main() -> Result<(), Box<dyn Error>> {
    // An in-memory document store; FileResolver reads from disk instead.
    let mut files = HashMap::new();
    files.insert("database.cfg", "Database {\n  Url = postgres://db/billing\n}\n");

    let mut resolver = |path: &str| -> io::Result<Vec<u8>> {
        files
            .get(path)
            .map(|contents| contents.as_bytes().to_vec())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    };

    let config: Config = from_str_with_resolver(MAIN, &DecodeOptions::default(), &mut resolver)?;
    println!("Decoded: {:?}", config);

    // A missing include is reported with the file name.
    let err = from_str_with_resolver::<Config, _>(
        "include missing.cfg\n",
        &DecodeOptions::default(),
        &mut resolver,
    )
    .unwrap_err();
    println!("\nMissing include:\n{}", err);

    Ok(())
}
