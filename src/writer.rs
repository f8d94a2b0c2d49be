//! The writer interface shared by the text and binary encoders.
//!
//! An [`IonWriter`] is driven one value at a time. Field names and
//! annotations are staged with [`IonWriter::set_field_name`] and
//! [`IonWriter::set_annotations`] and attach to the next value written.
//!
//! [`write_element`] and [`copy_values`] walk owned trees and live readers
//! with explicit stacks, so nesting depth is bounded by memory rather than by
//! the call stack.

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::symbols::Symbol;
use crate::types::IonType;
use crate::value::{Decimal, Element, Int, Timestamp, Value};

/// A sink for Ion values in either encoding.
///
/// Inside a struct every value needs a field name; outside one, setting a
/// field name is an error. Both are reported as [`Error::InvalidState`] when
/// the value is written.
pub trait IonWriter {
    fn set_field_name(&mut self, name: Symbol);

    fn set_annotations(&mut self, annotations: Vec<Symbol>);

    /// Writes a typed null (`null.<type>`).
    fn write_null(&mut self, ion_type: IonType) -> Result<()>;

    fn write_bool(&mut self, value: bool) -> Result<()>;

    fn write_i64(&mut self, value: i64) -> Result<()>;

    fn write_int(&mut self, value: &Int) -> Result<()>;

    fn write_f64(&mut self, value: f64) -> Result<()>;

    fn write_decimal(&mut self, value: &Decimal) -> Result<()>;

    fn write_timestamp(&mut self, value: &Timestamp) -> Result<()>;

    fn write_symbol(&mut self, value: &Symbol) -> Result<()>;

    fn write_string(&mut self, value: &str) -> Result<()>;

    /// Writes a clob. The text encoding rejects bytes above `0x7F`.
    fn write_clob(&mut self, value: &[u8]) -> Result<()>;

    fn write_blob(&mut self, value: &[u8]) -> Result<()>;

    /// Opens a list, sexp or struct.
    fn step_in(&mut self, container: IonType) -> Result<()>;

    /// Closes the innermost open container.
    fn step_out(&mut self) -> Result<()>;

    fn depth(&self) -> usize;
}

enum Children<'e> {
    Sequence(std::slice::Iter<'e, Element>),
    Fields(std::slice::Iter<'e, (Symbol, Element)>),
}

fn write_one<'e, W: IonWriter + ?Sized>(
    writer: &mut W,
    element: &'e Element,
) -> Result<Option<Children<'e>>> {
    if !element.annotations.is_empty() {
        writer.set_annotations(element.annotations.clone());
    }
    match &element.value {
        Value::Null(ion_type) => writer.write_null(*ion_type)?,
        Value::Bool(b) => writer.write_bool(*b)?,
        Value::Int(i) => writer.write_int(i)?,
        Value::Float(f) => writer.write_f64(*f)?,
        Value::Decimal(d) => writer.write_decimal(d)?,
        Value::Timestamp(t) => writer.write_timestamp(t)?,
        Value::Symbol(s) => writer.write_symbol(s)?,
        Value::String(s) => writer.write_string(s)?,
        Value::Clob(bytes) => writer.write_clob(bytes)?,
        Value::Blob(bytes) => writer.write_blob(bytes)?,
        Value::List(items) => {
            writer.step_in(IonType::List)?;
            return Ok(Some(Children::Sequence(items.iter())));
        }
        Value::Sexp(items) => {
            writer.step_in(IonType::Sexp)?;
            return Ok(Some(Children::Sequence(items.iter())));
        }
        Value::Struct(fields) => {
            writer.step_in(IonType::Struct)?;
            return Ok(Some(Children::Fields(fields.iter())));
        }
    }
    Ok(None)
}

/// Writes an owned element tree.
///
/// # Examples
///
/// ```rust
/// use serde_ion::text_writer::TextWriter;
/// use serde_ion::writer::write_element;
/// use serde_ion::{Element, Value};
///
/// let element = Element::from(vec![Element::from(1), Element::from("a b")])
///     .with_annotations(["pair"]);
/// let mut writer = TextWriter::new();
/// write_element(&mut writer, &element).unwrap();
/// assert_eq!(writer.into_inner(), "pair::[1,\"a b\"]");
/// ```
pub fn write_element<W: IonWriter + ?Sized>(writer: &mut W, element: &Element) -> Result<()> {
    let mut stack = Vec::new();
    if let Some(children) = write_one(writer, element)? {
        stack.push(children);
    }
    while let Some(frame) = stack.last_mut() {
        let next = match frame {
            Children::Sequence(items) => items.next().map(|child| (None, child)),
            Children::Fields(fields) => fields.next().map(|(name, child)| (Some(name), child)),
        };
        match next {
            Some((name, child)) => {
                if let Some(name) = name {
                    writer.set_field_name(name.clone());
                }
                if let Some(children) = write_one(writer, child)? {
                    stack.push(children);
                }
            }
            None => {
                stack.pop();
                writer.step_out()?;
            }
        }
    }
    Ok(())
}

fn missing(ion_type: IonType) -> Error {
    Error::InvalidState(format!("reader produced no {ion_type} value"))
}

/// Copies every remaining value at the reader's current depth into `writer`.
///
/// Symbols are copied resolved, so the output carries its own symbol
/// context. Unknown symbol ids stay unknown.
///
/// # Examples
///
/// ```rust
/// use serde_ion::text_writer::TextWriter;
/// use serde_ion::writer::copy_values;
/// use serde_ion::Reader;
///
/// let mut reader = Reader::new(b"a::{x: [1, 2.5, \"s\"]} (+ 1 2)");
/// let mut writer = TextWriter::new();
/// copy_values(&mut reader, &mut writer).unwrap();
/// assert_eq!(writer.into_inner(), "a::{x:[1,2.5,\"s\"]}\n('+' 1 2)");
/// ```
pub fn copy_values<W: IonWriter + ?Sized>(reader: &mut Reader<'_>, writer: &mut W) -> Result<()> {
    let base = reader.depth();
    loop {
        let Some(ion_type) = reader.next()? else {
            if reader.depth() == base {
                return Ok(());
            }
            reader.step_out()?;
            writer.step_out()?;
            continue;
        };
        if let Some(name) = reader.field_name()? {
            writer.set_field_name(name);
        }
        let annotations = reader.annotations()?;
        if !annotations.is_empty() {
            writer.set_annotations(annotations);
        }
        if reader.is_null() {
            writer.write_null(ion_type)?;
            continue;
        }
        match ion_type {
            IonType::List | IonType::Sexp | IonType::Struct => {
                reader.step_in()?;
                writer.step_in(ion_type)?;
            }
            IonType::Null => writer.write_null(IonType::Null)?,
            IonType::Bool => {
                let value = reader.bool_value()?.ok_or_else(|| missing(ion_type))?;
                writer.write_bool(value)?;
            }
            IonType::Int => {
                let value = reader.int_value()?.ok_or_else(|| missing(ion_type))?;
                writer.write_int(&value)?;
            }
            IonType::Float => {
                let value = reader.f64_value()?.ok_or_else(|| missing(ion_type))?;
                writer.write_f64(value)?;
            }
            IonType::Decimal => {
                let value = reader.decimal_value()?.ok_or_else(|| missing(ion_type))?;
                writer.write_decimal(&value)?;
            }
            IonType::Timestamp => {
                let value = reader.timestamp_value()?.ok_or_else(|| missing(ion_type))?;
                writer.write_timestamp(&value)?;
            }
            IonType::Symbol => {
                let value = reader.symbol_value()?.ok_or_else(|| missing(ion_type))?;
                writer.write_symbol(&value)?;
            }
            IonType::String => {
                let value = reader.string_value()?.ok_or_else(|| missing(ion_type))?;
                writer.write_string(&value)?;
            }
            IonType::Clob => {
                let value = reader.bytes_value()?.ok_or_else(|| missing(ion_type))?;
                writer.write_clob(&value)?;
            }
            IonType::Blob => {
                let value = reader.bytes_value()?.ok_or_else(|| missing(ion_type))?;
                writer.write_blob(&value)?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary_writer::BinaryWriter;
    use crate::text_writer::TextWriter;

    fn sample() -> Element {
        Element::new(Value::Struct(vec![
            (Symbol::from("name"), Element::from("widget")),
            (
                Symbol::from("tags"),
                Element::from(vec![Element::from("a"), Element::from(Symbol::from("b"))]),
            ),
            (Symbol::from("price"), Element::from(Decimal::new(1999, -2))),
            (Symbol::from("missing"), Element::new(Value::Null(IonType::Int))),
            (
                Symbol::from("raw"),
                Element::new(Value::Blob(vec![0xFF, 0x00])).with_annotations(["bytes"]),
            ),
        ]))
    }

    #[test]
    fn test_write_element_text() {
        let mut writer = TextWriter::new();
        write_element(&mut writer, &sample()).unwrap();
        assert_eq!(
            writer.into_inner(),
            "{name:\"widget\",tags:[\"a\",b],price:19.99,missing:null.int,raw:bytes::{{/wA=}}}"
        );
    }

    #[test]
    fn test_element_survives_binary() {
        let element = sample();
        let mut writer = BinaryWriter::new();
        write_element(&mut writer, &element).unwrap();
        let bytes = writer.finish().unwrap();
        let back = Reader::new(&bytes).read_all().unwrap();
        assert_eq!(back, vec![element]);
    }

    #[test]
    fn test_copy_values_text_to_binary_to_text() {
        let input = "ann::{a:1,b:[true,null.bool,2e0],c:(x '+' \"s\")}\n2007-02-23T12:14:33.079-08:00\n{{\"clob\"}}";
        let mut reader = Reader::new(input.as_bytes());
        let mut binary = BinaryWriter::new();
        copy_values(&mut reader, &mut binary).unwrap();
        let bytes = binary.finish().unwrap();

        let mut reader = Reader::new(&bytes);
        let mut text = TextWriter::new();
        copy_values(&mut reader, &mut text).unwrap();
        assert_eq!(text.into_inner(), input);
    }

    #[test]
    fn test_copy_values_from_inside_container() {
        let mut reader = Reader::new(b"[1, [2, 3], 4] 5");
        reader.next().unwrap();
        reader.step_in().unwrap();
        reader.next().unwrap();
        let mut writer = TextWriter::new();
        copy_values(&mut reader, &mut writer).unwrap();
        assert_eq!(writer.into_inner(), "[2,3]\n4");
        reader.step_out().unwrap();
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
    }
}
