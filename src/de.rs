//! Serde deserialization from a [`Reader`].
//!
//! The [`Deserializer`] pulls values straight from the reader, so binary and
//! text input go through the same code. Ion types map onto the serde data
//! model like this:
//!
//! - null of any type: unit (or `None`)
//! - int: `i64`, `u64` or `i128`/`u128` depending on size
//! - float and decimal: `f64`
//! - string, symbol and timestamp: string (unknown symbols as `$<id>`)
//! - blob and clob: bytes
//! - list and sexp: sequence; struct: map
//!
//! Enums accept a symbol for unit variants, or a value annotated with the
//! variant name for the rest, which is what the serializer writes.
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_ion::from_str;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! enum Shape { Circle { r: u32 }, Empty }
//!
//! let shapes: Vec<Shape> = from_str("[Circle::{r: 2}, Empty]").unwrap();
//! assert_eq!(shapes, vec![Shape::Circle { r: 2 }, Shape::Empty]);
//! ```

use crate::error::{Error, Result};
use crate::options::ReaderOptions;
use crate::reader::{Reader, ReaderState};
use crate::symbols::Symbol;
use crate::types::IonType;
use crate::value::Int;
use num_traits::ToPrimitive;
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

/// Deserializes Rust values from an Ion stream.
pub struct Deserializer<'a> {
    reader: Reader<'a>,
    /// Annotations of the current value already taken as variant names.
    consumed: usize,
}

fn symbol_text(symbol: Symbol) -> String {
    match symbol {
        Symbol::Text(text) => text,
        Symbol::Unknown(id) => format!("${id}"),
    }
}

fn missing(ion_type: IonType) -> Error {
    Error::InvalidState(format!("reader produced no {ion_type} value"))
}

impl<'a> Deserializer<'a> {
    /// Reads binary or text input, detected from the first byte.
    pub fn from_slice(input: &'a [u8]) -> Self {
        Self::from_reader(Reader::new(input))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &'a str) -> Self {
        Self::from_slice(input.as_bytes())
    }

    pub fn with_options(input: &'a [u8], options: ReaderOptions) -> Self {
        Self::from_reader(Reader::with_options(input, options))
    }

    pub fn from_reader(reader: Reader<'a>) -> Self {
        Deserializer {
            reader,
            consumed: 0,
        }
    }

    fn advance(&mut self) -> Result<Option<IonType>> {
        self.consumed = 0;
        self.reader.next()
    }

    fn current(&mut self) -> Result<IonType> {
        if self.reader.state() == ReaderState::BeforeFirstValue {
            self.advance()?;
        }
        self.reader
            .ion_type()
            .ok_or_else(|| Error::custom("expected a value, found end of input"))
    }

    /// Deserializes the next top-level value, or returns `None` at the end
    /// of the stream.
    ///
    /// ```rust
    /// use serde_ion::Deserializer;
    ///
    /// let mut de = Deserializer::from_str("1 2 3");
    /// let mut sum = 0;
    /// while let Some(n) = de.next_value::<i32>().unwrap() {
    ///     sum += n;
    /// }
    /// assert_eq!(sum, 6);
    /// ```
    pub fn next_value<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        if self.advance()?.is_none() {
            return Ok(None);
        }
        T::deserialize(&mut *self).map(Some)
    }

    /// Checks that nothing follows the value just deserialized.
    pub fn end(&mut self) -> Result<()> {
        match self.advance()? {
            None => Ok(()),
            Some(ion_type) => Err(Error::Custom(format!(
                "trailing {ion_type} value after the top-level value"
            ))),
        }
    }

    fn next_variant_name(&mut self) -> Result<Option<String>> {
        let annotations = self.reader.annotations()?;
        let Some(name) = annotations.into_iter().nth(self.consumed) else {
            return Ok(None);
        };
        self.consumed += 1;
        Ok(Some(symbol_text(name)))
    }

    fn visit_int<'de, V: Visitor<'de>>(int: Int, visitor: V) -> Result<V::Value> {
        match int {
            Int::I64(i) => visitor.visit_i64(i),
            Int::Big(big) => {
                if let Some(u) = big.to_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = big.to_i128() {
                    visitor.visit_i128(i)
                } else if let Some(u) = big.to_u128() {
                    visitor.visit_u128(u)
                } else {
                    visitor.visit_string(big.to_string())
                }
            }
        }
    }
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'_> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let ion_type = self.current()?;
        if self.reader.is_null() {
            return visitor.visit_unit();
        }
        let reader = &mut self.reader;
        match ion_type {
            IonType::Null => visitor.visit_unit(),
            IonType::Bool => visitor.visit_bool(reader.bool_value()?.ok_or_else(|| missing(ion_type))?),
            IonType::Int => {
                let int = reader.int_value()?.ok_or_else(|| missing(ion_type))?;
                Deserializer::visit_int(int, visitor)
            }
            IonType::Float | IonType::Decimal => {
                visitor.visit_f64(reader.number_value()?.ok_or_else(|| missing(ion_type))?)
            }
            IonType::Timestamp => {
                let ts = reader.timestamp_value()?.ok_or_else(|| missing(ion_type))?;
                visitor.visit_string(ts.to_string())
            }
            IonType::Symbol => {
                let symbol = reader.symbol_value()?.ok_or_else(|| missing(ion_type))?;
                visitor.visit_string(symbol_text(symbol))
            }
            IonType::String => visitor.visit_string(reader.string_value()?.ok_or_else(|| missing(ion_type))?),
            IonType::Clob | IonType::Blob => {
                visitor.visit_byte_buf(reader.bytes_value()?.ok_or_else(|| missing(ion_type))?)
            }
            IonType::List | IonType::Sexp => {
                reader.step_in()?;
                let value = visitor.visit_seq(SeqAccess { de: &mut *self })?;
                self.reader.step_out()?;
                Ok(value)
            }
            IonType::Struct => {
                reader.step_in()?;
                let value = visitor.visit_map(MapAccess { de: &mut *self })?;
                self.reader.step_out()?;
                Ok(value)
            }
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.current()?;
        if self.reader.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let ion_type = self.current()?;
        if self.reader.is_null() {
            visitor.visit_unit()
        } else {
            Err(Error::Custom(format!("expected null, found {ion_type}")))
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let ion_type = self.current()?;
        if let Some(variant) = self.next_variant_name()? {
            return visitor.visit_enum(Enum { de: self, variant });
        }
        match ion_type {
            IonType::Symbol | IonType::String if !self.reader.is_null() => {
                let name = match ion_type {
                    IonType::Symbol => self.reader.symbol_value()?.map(symbol_text),
                    _ => self.reader.string_value()?,
                }
                .ok_or_else(|| missing(ion_type))?;
                let unit: de::value::StringDeserializer<Error> = name.into_deserializer();
                visitor.visit_enum(unit)
            }
            other => Err(Error::Custom(format!(
                "expected a symbol or an annotated value for an enum, found {other}"
            ))),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.current()?;
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf seq tuple tuple_struct map struct identifier
    }
}

struct SeqAccess<'b, 'a> {
    de: &'b mut Deserializer<'a>,
}

impl<'de> de::SeqAccess<'de> for SeqAccess<'_, '_> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        if self.de.advance()?.is_none() {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

struct MapAccess<'b, 'a> {
    de: &'b mut Deserializer<'a>,
}

impl<'de> de::MapAccess<'de> for MapAccess<'_, '_> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        if self.de.advance()?.is_none() {
            return Ok(None);
        }
        let name = self
            .de
            .reader
            .field_name()?
            .map(symbol_text)
            .ok_or_else(|| Error::invalid_state("struct field without a name"))?;
        let key: de::value::StringDeserializer<Error> = name.into_deserializer();
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }
}

struct Enum<'b, 'a> {
    de: &'b mut Deserializer<'a>,
    variant: String,
}

impl<'de> de::EnumAccess<'de> for Enum<'_, '_> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let name: de::value::StringDeserializer<Error> = self.variant.clone().into_deserializer();
        let value = seed.deserialize(name)?;
        Ok((value, self))
    }
}

impl<'de> de::VariantAccess<'de> for Enum<'_, '_> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_map(&mut *self.de, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    fn from_text<T: DeserializeOwned>(text: &str) -> Result<T> {
        let mut de = Deserializer::from_str(text);
        let value = T::deserialize(&mut de)?;
        de.end()?;
        Ok(value)
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    enum Event {
        Start,
        Move(Point),
        Resize(u32, u32),
        Rename { to: String },
    }

    #[test]
    fn test_primitives() {
        assert!(from_text::<bool>("true").unwrap());
        assert_eq!(from_text::<i8>("-0x10").unwrap(), -16);
        assert_eq!(from_text::<u64>("18446744073709551615").unwrap(), u64::MAX);
        assert_eq!(from_text::<f64>("1.5e0").unwrap(), 1.5);
        assert_eq!(from_text::<f64>("1.25").unwrap(), 1.25);
        assert_eq!(from_text::<f32>("7").unwrap(), 7.0);
        assert_eq!(from_text::<String>("'sym bol'").unwrap(), "sym bol");
        assert_eq!(from_text::<String>("2007-02-23").unwrap(), "2007-02-23");
        assert_eq!(from_text::<char>("\"c\"").unwrap(), 'c');
        assert_eq!(from_text::<Option<i32>>("null.int").unwrap(), None);
        assert_eq!(from_text::<Option<i32>>("4").unwrap(), Some(4));
        from_text::<()>("null").unwrap();
    }

    #[test]
    fn test_out_of_range_int() {
        assert!(from_text::<u8>("256").is_err());
        assert!(from_text::<i64>("18446744073709551616").is_err());
    }

    #[test]
    fn test_struct_skips_unknown_fields() {
        let p: Point = from_text("{x: 1, extra: [1, {deep: 2}], y: 2}").unwrap();
        assert_eq!(p, Point { x: 1, y: 2 });
    }

    #[test]
    fn test_tuple_stops_early_and_steps_out() {
        let mut de = Deserializer::from_str("[[1, 2, 3], 4]");
        // The inner list has three elements; a pair reads two and steps out.
        let value: ((i32, i32), i32) = Deserialize::deserialize(&mut de).unwrap();
        assert_eq!(value, ((1, 2), 4));
        de.end().unwrap();
    }

    #[test]
    fn test_enums() {
        let events: Vec<Event> = from_text(
            "[Start, 'Start', Move::{x: 0, y: 1}, Resize::[3, 4], Rename::{to: \"b\"}]",
        )
        .unwrap();
        assert_eq!(
            events,
            vec![
                Event::Start,
                Event::Start,
                Event::Move(Point { x: 0, y: 1 }),
                Event::Resize(3, 4),
                Event::Rename { to: "b".into() },
            ]
        );
        assert!(from_text::<Event>("42").is_err());
    }

    #[test]
    fn test_nested_variant_annotations() {
        #[derive(Deserialize, Debug, PartialEq)]
        enum Outer {
            Wrap(Inner),
        }
        #[derive(Deserialize, Debug, PartialEq)]
        enum Inner {
            Value(i32),
            Start,
        }
        assert_eq!(from_text::<Outer>("Wrap::Value::5").unwrap(), Outer::Wrap(Inner::Value(5)));
        assert_eq!(from_text::<Outer>("Wrap::Start").unwrap(), Outer::Wrap(Inner::Start));
    }

    #[test]
    fn test_maps_and_sexps() {
        let map: BTreeMap<String, Vec<i32>> = from_text("{a: (1 2), 'b c': []}").unwrap();
        assert_eq!(map["a"], vec![1, 2]);
        assert!(map["b c"].is_empty());
    }

    #[test]
    fn test_bytes() {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(with = "bytes_as_buf")]
            data: Vec<u8>,
        }
        mod bytes_as_buf {
            pub fn deserialize<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
                struct V;
                impl serde::de::Visitor<'_> for V {
                    type Value = Vec<u8>;
                    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        f.write_str("bytes")
                    }
                    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
                        Ok(v)
                    }
                }
                d.deserialize_byte_buf(V)
            }
        }
        let raw: Raw = from_text("{data: {{AQID}}}").unwrap();
        assert_eq!(raw.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_trailing_and_missing_values() {
        assert!(from_text::<i32>("1 2").is_err());
        assert!(from_text::<i32>("").is_err());
        assert!(from_text::<i32>("   // nothing\n").is_err());
    }

    #[test]
    fn test_malformed_input_is_reported() {
        let err = from_text::<Vec<i32>>("[1, 2").unwrap_err();
        assert!(err.is_data_error());
    }
}
