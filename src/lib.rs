//! # serde_ion
//!
//! A Serde-compatible codec for Amazon Ion 1.0, with both of its encodings:
//! a compact binary form and a human-readable text form. Anything read from
//! one encoding can be written to the other without loss.
//!
//! ## Key Features
//!
//! - **Both encodings**: binary and text readers and writers behind one API
//! - **Streaming reader**: walks values without building a tree, skipping
//!   binary containers by their stored length
//! - **Symbol tables**: local symbol tables, shared table imports through a
//!   [`Catalog`], and version-marker resets handled inside the [`Reader`]
//! - **Serde Compatible**: works with `#[derive(Serialize, Deserialize)]`
//! - **Full Ion data model**: arbitrary-size ints, decimals with negative
//!   zero, timestamps with precision and unknown offsets, annotations
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! serde_ion = "0.1"
//! serde = { version = "1.0", features = ["derive"] }
//! ```
//!
//! ### Basic Serialization and Deserialization
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_ion::{from_slice, from_str, to_binary, to_string};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! let user = User { id: 7, name: "Alice".into(), tags: vec!["admin".into()] };
//!
//! let text = to_string(&user).unwrap();
//! assert_eq!(text, r#"{id:7,name:"Alice",tags:["admin"]}"#);
//! assert_eq!(from_str::<User>(&text).unwrap(), user);
//!
//! // The binary form starts with the version marker E0 01 00 EA.
//! let bytes = to_binary(&user).unwrap();
//! assert_eq!(&bytes[..4], &[0xE0, 0x01, 0x00, 0xEA]);
//! assert_eq!(from_slice::<User>(&bytes).unwrap(), user);
//! ```
//!
//! ### Streaming with the Reader
//!
//! ```rust
//! use serde_ion::{IonType, Reader};
//!
//! let mut reader = Reader::new(b"[1, 2, [3, 4]]");
//! assert_eq!(reader.next().unwrap(), Some(IonType::List));
//! reader.step_in().unwrap();
//! let mut sum = 0;
//! while let Some(ion_type) = reader.next().unwrap() {
//!     if ion_type == IonType::Int {
//!         sum += reader.i64_value().unwrap().unwrap();
//!     }
//! }
//! reader.step_out().unwrap();
//! assert_eq!(sum, 3);
//! ```
//!
//! ### Working with Elements
//!
//! [`Element`] is an owned tree of Ion values, annotations included:
//!
//! ```rust
//! use serde_ion::{Element, Reader};
//!
//! let element = Reader::new(b"point::{x: 1, y: 2.50}").read_all().unwrap().remove(0);
//! assert!(element.has_annotation("point"));
//! assert_eq!(element.to_string(), "point::{x:1,y:2.50}");
//! ```
//!
//! ## Module Layout
//!
//! - [`numeric`]: binary integer primitives (`UInt`, `Int`, `VarUInt`, `VarInt`)
//! - [`lexical`]: text character classes and escaping
//! - [`cursor`], [`binary_cursor`], [`text_cursor`]: raw cursors per encoding
//! - [`reader`]: symbol resolution and the reader state machine
//! - [`writer`], [`binary_writer`], [`text_writer`]: the writers
//! - [`ser`], [`de`]: Serde integration

pub mod binary_cursor;
pub mod binary_writer;
pub mod cursor;
pub mod de;
pub mod error;
pub mod lexical;
pub mod numeric;
pub mod options;
pub mod reader;
pub mod ser;
pub mod symbols;
pub mod text_cursor;
pub mod text_writer;
pub mod types;
pub mod value;
pub mod writer;

pub use de::Deserializer;
pub use error::{Error, Result};
pub use options::{Format, ReaderOptions, WriterOptions};
pub use reader::{Reader, ReaderState};
pub use ser::Serializer;
pub use symbols::{Catalog, ImportDescriptor, SharedSymbolTable, SimpleCatalog, Symbol, SymbolTable};
pub use types::IonType;
pub use value::{Decimal, Element, Int, Precision, Timestamp, Value};
pub use writer::IonWriter;

use binary_writer::BinaryWriter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use text_writer::TextWriter;

/// Serialize any `T: Serialize` to compact Ion text.
///
/// # Examples
///
/// ```rust
/// use serde_ion::to_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// assert_eq!(to_string(&Point { x: 1, y: 2 }).unwrap(), "{x:1,y:2}");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized (e.g., map keys that
/// are not strings).
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, WriterOptions::default())
}

/// Serialize any `T: Serialize` to indented Ion text.
///
/// # Examples
///
/// ```rust
/// use serde_ion::to_string_pretty;
///
/// assert_eq!(to_string_pretty(&vec![1, 2]).unwrap(), "[\n  1,\n  2\n]");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_pretty<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, WriterOptions::pretty())
}

/// Serialize any `T: Serialize` to Ion text with custom layout options.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `options` asks for binary output,
/// which is not text; use [`to_vec_with_options`] for that.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options<T>(value: &T, options: WriterOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    if options.format == Format::Binary {
        return Err(Error::invalid_input(
            "binary output is not text; use to_vec_with_options",
        ));
    }
    let mut serializer = Serializer::new(TextWriter::with_options(options));
    value.serialize(&mut serializer)?;
    serializer.into_inner().finish()
}

/// Serialize any `T: Serialize` to binary Ion.
///
/// # Examples
///
/// ```rust
/// use serde_ion::to_binary;
///
/// let bytes = to_binary(&vec![1, 2]).unwrap();
/// assert_eq!(bytes, [0xE0, 0x01, 0x00, 0xEA, 0xB4, 0x21, 0x01, 0x21, 0x02]);
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_binary<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut serializer = Serializer::new(BinaryWriter::new());
    value.serialize(&mut serializer)?;
    serializer.into_inner().finish()
}

/// Serialize any `T: Serialize` to bytes in the encoding `options` selects.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec_with_options<T>(value: &T, options: WriterOptions) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    match options.format {
        Format::Binary => to_binary(value),
        Format::Text => to_string_with_options(value, options).map(String::into_bytes),
    }
}

/// Serialize any `T: Serialize` to a writer as compact Ion text.
///
/// # Examples
///
/// ```rust
/// use serde_ion::to_writer;
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &("a", 1)).unwrap();
/// assert_eq!(buffer, b"[\"a\",1]");
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    to_writer_with_options(writer, value, WriterOptions::default())
}

/// Serialize any `T: Serialize` to a writer in the encoding `options` selects.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, T>(mut writer: W, value: &T, options: WriterOptions) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let bytes = to_vec_with_options(value, options)?;
    writer
        .write_all(&bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(())
}

/// Convert any `T: Serialize` to an [`Element`].
///
/// # Examples
///
/// ```rust
/// use serde_ion::{to_element, IonType};
///
/// let element = to_element(&vec![Some(1), None]).unwrap();
/// let items = element.value.as_sequence().unwrap();
/// assert_eq!(items[0].value.as_i64(), Some(1));
/// assert_eq!(items[1].ion_type(), IonType::Null);
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_element<T>(value: &T) -> Result<Element>
where
    T: ?Sized + Serialize,
{
    let bytes = to_binary(value)?;
    let mut elements = Reader::new(&bytes).read_all()?;
    elements
        .pop()
        .ok_or_else(|| Error::custom("value produced no output"))
}

/// Deserialize an instance of type `T` from an [`Element`].
///
/// # Errors
///
/// Returns an error if the element does not match the shape of `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_element<T>(element: &Element) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut writer = BinaryWriter::new();
    writer::write_element(&mut writer, element)?;
    let bytes = writer.finish()?;
    from_slice(&bytes)
}

/// Deserialize an instance of type `T` from a string of Ion text.
///
/// The input must hold exactly one top-level value.
///
/// # Examples
///
/// ```rust
/// use serde_ion::from_str;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_str("{ x: 1, y: 2 } // origin-ish").unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns an error if the input is not valid Ion, holds no value or more
/// than one, or cannot be deserialized to type `T`. Grammar errors carry the
/// byte offset.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<'a, T>(s: &'a str) -> Result<T>
where
    T: Deserialize<'a>,
{
    from_slice(s.as_bytes())
}

/// Deserialize an instance of type `T` from binary or text Ion bytes.
///
/// The encoding is detected from the first byte.
///
/// # Examples
///
/// ```rust
/// use serde_ion::from_slice;
///
/// let binary = [0xE0, 0x01, 0x00, 0xEA, 0x21, 0x05];
/// assert_eq!(from_slice::<u8>(&binary).unwrap(), 5);
/// assert_eq!(from_slice::<u8>(b"5").unwrap(), 5);
/// ```
///
/// # Errors
///
/// Returns an error if the bytes are not valid Ion or cannot be deserialized
/// to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<'a, T>(v: &'a [u8]) -> Result<T>
where
    T: Deserialize<'a>,
{
    from_slice_with_options(v, ReaderOptions::default())
}

/// Deserialize an instance of type `T` with custom reader options, such as a
/// catalog of shared symbol tables.
///
/// # Errors
///
/// Returns an error if the bytes are not valid Ion or cannot be deserialized
/// to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice_with_options<'a, T>(v: &'a [u8], options: ReaderOptions) -> Result<T>
where
    T: Deserialize<'a>,
{
    let mut deserializer = Deserializer::with_options(v, options);
    let value = T::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

/// Deserialize an instance of type `T` from an I/O stream of Ion.
///
/// The stream is read to the end before decoding starts.
///
/// # Examples
///
/// ```rust
/// use serde_ion::from_reader;
/// use std::io::Cursor;
///
/// let numbers: Vec<i32> = from_reader(Cursor::new(b"[1, 2, 3]")).unwrap();
/// assert_eq!(numbers, vec![1, 2, 3]);
/// ```
///
/// # Errors
///
/// Returns an error if reading from the reader fails, the input is not valid
/// Ion, or the data cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(mut reader: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_slice(&bytes)
}
