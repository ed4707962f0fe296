//! Basic decoding and encoding of a configuration document.
//!
//! Run with: cargo run --example simple

#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};
use serde_cfg::{from_str, to_string};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Server {
    Host: String,
    Port: u16,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Config {
    Name: String,
    Server: Server,
    MaxUpload: u64,
    Verbose: bool,
}

const DOCUMENT: &str = r#"
# Service configuration
Name = inventory
Server {
  Host = 0.0.0.0
  Port = 8080
}
MaxUpload = 16M
Verbose = yes
"#;

fn main() -> Result<(), Box<dyn Error>> {
    let config: Config = from_str(DOCUMENT)?;
    println!("Decoded: {:?}\n", config);

    let text = to_string(&config)?;
    println!("Encoded:\n{}", text);

    let back: Config = from_str(&text)?;
    assert_eq!(config, back);
    println!("✓ Round-trip successful");

    Ok(())
}
