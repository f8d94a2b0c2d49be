//! Converting between the text and binary encodings.
//!
//! Run with: cargo run --example transcode

use serde_ion::binary_writer::BinaryWriter;
use serde_ion::text_writer::TextWriter;
use serde_ion::writer::copy_values;
use serde_ion::{Reader, WriterOptions};
use std::error::Error;

const INPUT: &str = r#"
order::{id: 1001, items: [{sku: "A-1", qty: 2}, {sku: "B-2", qty: 1}], paid: true}
{{"raw clob"}}
(+ 1 2)
"#;

fn main() -> Result<(), Box<dyn Error>> {
    let mut reader = Reader::new(INPUT.as_bytes());
    let mut binary = BinaryWriter::new();
    copy_values(&mut reader, &mut binary)?;
    let bytes = binary.finish()?;
    println!("Binary ({} bytes): {:02X?}\n", bytes.len(), bytes);

    let mut reader = Reader::new(&bytes);
    let mut text = TextWriter::with_options(WriterOptions::pretty());
    copy_values(&mut reader, &mut text)?;
    println!("Back to text:\n{}", text.finish()?);

    Ok(())
}
