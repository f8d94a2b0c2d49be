//! Walking an Ion stream with the cursor reader.
//!
//! Run with: cargo run --example cursor_walk

use serde_ion::{IonType, Reader};
use std::error::Error;

const INPUT: &str = r#"
$ion_symbol_table::{symbols: ["region", "sales"]}
report::{
  region: "emea",
  sales: [120, 98.5, 3e2],
  updated: 2024-03-01T10:15:00Z,
}
(total $11)
"#;

fn walk(reader: &mut Reader<'_>) -> Result<(), Box<dyn Error>> {
    loop {
        let Some(ion_type) = reader.next()? else {
            if reader.depth() == 0 {
                return Ok(());
            }
            reader.step_out()?;
            continue;
        };
        let indent = "  ".repeat(reader.depth());
        let field = match reader.field_name()? {
            Some(name) => format!("{:?}: ", name),
            None => String::new(),
        };
        let annotations = reader.annotations()?;
        print!("{}{}{} ", indent, field, ion_type);
        if !annotations.is_empty() {
            print!("{:?} ", annotations);
        }
        if ion_type.is_container() && !reader.is_null() {
            println!();
            reader.step_in()?;
            continue;
        }
        match ion_type {
            IonType::Int => println!("= {:?}", reader.int_value()?),
            IonType::Float | IonType::Decimal => println!("= {:?}", reader.number_value()?),
            IonType::Timestamp => println!("= {:?}", reader.timestamp_value()?.map(|t| t.to_string())),
            IonType::Symbol => println!("= {:?}", reader.symbol_value()?),
            IonType::String => println!("= {:?}", reader.string_value()?),
            _ => println!(),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut reader = Reader::new(INPUT.as_bytes());
    walk(&mut reader)?;
    println!("symbol table has {} symbols", reader.symbol_table().max_id());
    Ok(())
}
