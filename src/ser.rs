//! Serde serialization onto an [`IonWriter`].
//!
//! The [`Serializer`] streams straight into a text or binary writer; no
//! intermediate tree is built. The data model maps as follows:
//!
//! | Rust / serde                  | Ion                                   |
//! |-------------------------------|---------------------------------------|
//! | `bool`                        | bool                                  |
//! | integers (incl. 128-bit)      | int                                   |
//! | `f32`, `f64`                  | float                                 |
//! | `char`, `&str`, `String`      | string                                |
//! | bytes                         | blob                                  |
//! | `None`, `()`, unit structs    | `null.null`                           |
//! | sequences, tuples             | list                                  |
//! | maps, structs                 | struct                                |
//! | unit variants                 | symbol with the variant name          |
//! | other variants                | the content, annotated with the name  |
//!
//! ## Direct Serializer Usage
//!
//! ```rust
//! use serde::Serialize;
//! use serde_ion::text_writer::TextWriter;
//! use serde_ion::Serializer;
//!
//! #[derive(Serialize)]
//! enum Shape { Circle { r: u32 }, Empty }
//!
//! let mut serializer = Serializer::new(TextWriter::new());
//! vec![Shape::Circle { r: 2 }, Shape::Empty].serialize(&mut serializer).unwrap();
//! assert_eq!(serializer.into_inner().into_inner(), "[Circle::{r:2},Empty]");
//! ```

use crate::error::{Error, Result};
use crate::symbols::Symbol;
use crate::types::IonType;
use crate::value::Int;
use crate::writer::IonWriter;
use num_bigint::BigInt;
use serde::{ser, Serialize};

/// Serializes Rust values into an [`IonWriter`].
pub struct Serializer<W> {
    writer: W,
    annotations: Vec<Symbol>,
}

impl<W: IonWriter> Serializer<W> {
    pub fn new(writer: W) -> Self {
        Serializer {
            writer,
            annotations: Vec::new(),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Hands pending variant annotations to the writer before a value.
    fn prefix(&mut self) {
        if !self.annotations.is_empty() {
            self.writer.set_annotations(std::mem::take(&mut self.annotations));
        }
    }

    fn open(&mut self, container: IonType) -> Result<Compound<'_, W>> {
        self.prefix();
        self.writer.step_in(container)?;
        Ok(Compound { ser: self })
    }
}

impl<'a, W: IonWriter> ser::Serializer for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Compound<'a, W>;
    type SerializeTuple = Compound<'a, W>;
    type SerializeTupleStruct = Compound<'a, W>;
    type SerializeTupleVariant = Compound<'a, W>;
    type SerializeMap = Compound<'a, W>;
    type SerializeStruct = Compound<'a, W>;
    type SerializeStructVariant = Compound<'a, W>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.prefix();
        self.writer.write_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.prefix();
        self.writer.write_i64(v)
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        self.prefix();
        self.writer.write_int(&Int::from(BigInt::from(v)))
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.prefix();
        self.writer.write_int(&Int::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        self.prefix();
        self.writer.write_int(&Int::from(BigInt::from(v)))
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.prefix();
        self.writer.write_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.serialize_str(v.encode_utf8(&mut buf))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.prefix();
        self.writer.write_string(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.prefix();
        self.writer.write_blob(v)
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_some<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.prefix();
        self.writer.write_null(IonType::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.prefix();
        self.writer.write_symbol(&Symbol::from(variant))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.annotations.push(Symbol::from(variant));
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.open(IonType::List)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        self.open(IonType::List)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.open(IonType::List)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.annotations.push(Symbol::from(variant));
        self.open(IonType::List)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.open(IonType::Struct)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.open(IonType::Struct)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.annotations.push(Symbol::from(variant));
        self.open(IonType::Struct)
    }
}

/// Serializes the children of one list or struct.
pub struct Compound<'a, W> {
    ser: &'a mut Serializer<W>,
}

impl<W: IonWriter> Compound<'_, W> {
    fn element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(&mut *self.ser)
    }

    fn field<T>(&mut self, key: &str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.ser.writer.set_field_name(Symbol::from(key));
        value.serialize(&mut *self.ser)
    }

    fn close(self) -> Result<()> {
        self.ser.writer.step_out()
    }
}

impl<W: IonWriter> ser::SerializeSeq for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl<W: IonWriter> ser::SerializeTuple for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl<W: IonWriter> ser::SerializeTupleStruct for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl<W: IonWriter> ser::SerializeTupleVariant for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl<W: IonWriter> ser::SerializeMap for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let name = key.serialize(MapKeySerializer)?;
        self.ser.writer.set_field_name(Symbol::Text(name));
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl<W: IonWriter> ser::SerializeStruct for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl<W: IonWriter> ser::SerializeStructVariant for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

fn key_must_be_text() -> Error {
    Error::custom("map keys must be strings, chars, integers, bools or unit variants")
}

/// Turns a map key into field name text.
struct MapKeySerializer;

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = ser::Impossible<String, Error>;
    type SerializeTuple = ser::Impossible<String, Error>;
    type SerializeTupleStruct = ser::Impossible<String, Error>;
    type SerializeTupleVariant = ser::Impossible<String, Error>;
    type SerializeMap = ser::Impossible<String, Error>;
    type SerializeStruct = ser::Impossible<String, Error>;
    type SerializeStructVariant = ser::Impossible<String, Error>;

    fn serialize_bool(self, v: bool) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_none(self) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_some<T>(self, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(key_must_be_text())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_must_be_text())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_must_be_text())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_must_be_text())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_must_be_text())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_must_be_text())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_must_be_text())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_must_be_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_writer::TextWriter;
    use serde::Serialize;
    use std::collections::BTreeMap;

    fn text<T: Serialize + ?Sized>(value: &T) -> String {
        let mut serializer = Serializer::new(TextWriter::new());
        value.serialize(&mut serializer).unwrap();
        serializer.into_inner().into_inner()
    }

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize)]
    enum Event {
        Start,
        Move(Point),
        Resize(u32, u32),
        Rename { to: String },
    }

    #[test]
    fn test_primitives() {
        assert_eq!(text(&true), "true");
        assert_eq!(text(&-7i8), "-7");
        assert_eq!(text(&u64::MAX), "18446744073709551615");
        assert_eq!(text(&i128::MIN), "-170141183460469231731687303715884105728");
        assert_eq!(text(&0.5f32), "5e-1");
        assert_eq!(text(&'x'), "\"x\"");
        assert_eq!(text(&()), "null.null");
        assert_eq!(text(&None::<i32>), "null.null");
        assert_eq!(text(&Some(3)), "3");
    }

    #[test]
    fn test_bytes_become_blob() {
        assert_eq!(text(&Bytes(&[1, 2, 3])), "{{AQID}}");
    }

    struct Bytes<'a>(&'a [u8]);

    impl Serialize for Bytes<'_> {
        fn serialize<S: ser::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
            serializer.serialize_bytes(self.0)
        }
    }

    #[test]
    fn test_structs_and_sequences() {
        assert_eq!(text(&Point { x: 1, y: -2 }), "{x:1,y:-2}");
        assert_eq!(text(&vec![vec![1], vec![]]), "[[1],[]]");
        assert_eq!(text(&(1, "a")), "[1,\"a\"]");
    }

    #[test]
    fn test_enum_variants() {
        let events = vec![
            Event::Start,
            Event::Move(Point { x: 0, y: 1 }),
            Event::Resize(3, 4),
            Event::Rename { to: "b".into() },
        ];
        assert_eq!(
            text(&events),
            "[Start,Move::{x:0,y:1},Resize::[3,4],Rename::{to:\"b\"}]"
        );
    }

    #[test]
    fn test_nested_newtype_variants_keep_all_annotations() {
        #[derive(Serialize)]
        enum Outer {
            Wrap(Inner),
        }
        #[derive(Serialize)]
        enum Inner {
            Value(i32),
        }
        assert_eq!(text(&Outer::Wrap(Inner::Value(5))), "Wrap::Value::5");
    }

    #[test]
    fn test_map_keys() {
        let mut map = BTreeMap::new();
        map.insert(1, "one");
        map.insert(2, "two words");
        assert_eq!(text(&map), "{'1':\"one\",'2':\"two words\"}");

        let mut bad = BTreeMap::new();
        bad.insert(vec![1], 1);
        let mut serializer = Serializer::new(TextWriter::new());
        assert!(matches!(bad.serialize(&mut serializer), Err(Error::Custom(_))));
    }
}
