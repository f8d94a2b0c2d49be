//! Serde round trips through the text and binary encodings.
//!
//! Run with: cargo run --example serde_roundtrip

use serde::{Deserialize, Serialize};
use serde_ion::{from_slice, from_str, to_binary, to_string, to_string_pretty};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
enum Status {
    Active,
    Suspended { reason: String },
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Account {
    id: u64,
    owner: String,
    balance: f64,
    status: Status,
    tags: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let accounts = vec![
        Account {
            id: 1,
            owner: "Alice Johnson".to_string(),
            balance: 1250.75,
            status: Status::Active,
            tags: vec!["premium".to_string()],
        },
        Account {
            id: 2,
            owner: "Bob Smith".to_string(),
            balance: -20.0,
            status: Status::Suspended {
                reason: "overdrawn".to_string(),
            },
            tags: Vec::new(),
        },
    ];

    let text = to_string(&accounts)?;
    println!("Text Ion:\n{}\n", text);
    println!("Pretty:\n{}\n", to_string_pretty(&accounts)?);

    let bytes = to_binary(&accounts)?;
    println!("Binary Ion: {} bytes (text is {} bytes)", bytes.len(), text.len());

    let from_text: Vec<Account> = from_str(&text)?;
    let from_binary: Vec<Account> = from_slice(&bytes)?;
    assert_eq!(from_text, accounts);
    assert_eq!(from_binary, accounts);
    println!("✓ Round-trip successful");

    Ok(())
}
