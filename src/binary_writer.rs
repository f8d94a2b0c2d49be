//! Ion binary output.
//!
//! Container bodies are buffered per nesting level, so every length is known
//! when its header is written and always takes the minimal number of bytes.
//! Symbol text is interned into a local symbol table as it is written.
//! [`BinaryWriter::finish`] emits the version marker, then that table (if any
//! symbol beyond the system table was used), then the values.
//!
//! ```rust
//! use serde_ion::binary_writer::BinaryWriter;
//! use serde_ion::writer::IonWriter;
//! use serde_ion::{IonType, Reader};
//!
//! let mut writer = BinaryWriter::new();
//! writer.step_in(IonType::List).unwrap();
//! writer.write_i64(1).unwrap();
//! writer.write_string("two").unwrap();
//! writer.step_out().unwrap();
//! let bytes = writer.finish().unwrap();
//! assert_eq!(
//!     bytes,
//!     [0xE0, 0x01, 0x00, 0xEA, 0xB6, 0x21, 0x01, 0x83, b't', b'w', b'o']
//! );
//!
//! let mut reader = Reader::new(&bytes);
//! assert_eq!(reader.next().unwrap(), Some(IonType::List));
//! ```

use crate::binary_cursor::IVM;
use crate::error::{Error, Result};
use crate::numeric;
use crate::symbols::{sid, Symbol, SymbolTable};
use crate::types::IonType;
use crate::value::{Decimal, Int, Timestamp};
use crate::writer::IonWriter;
use chrono::{Datelike, Timelike};
use num_bigint::{BigInt, Sign};
use tracing::debug;

const LEN_VAR: u8 = 14;
const LEN_NULL: u8 = 15;
const ANNOTATION_WRAPPER: u8 = 0xE;

struct Container {
    ion_type: IonType,
    field: Option<usize>,
    annotations: Vec<usize>,
    body: Vec<u8>,
}

/// Writes binary Ion into memory.
pub struct BinaryWriter {
    symbols: SymbolTable,
    containers: Vec<Container>,
    top_level: Vec<u8>,
    scratch: Vec<u8>,
    field_name: Option<Symbol>,
    annotations: Vec<Symbol>,
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends a type descriptor (and `VarUInt` length when needed).
fn push_header(out: &mut Vec<u8>, type_code: u8, length: usize) {
    // A struct with L=1 would read as a sorted struct.
    let short = length < usize::from(LEN_VAR) && !(type_code == 0xD && length == 1);
    if short {
        out.push(type_code << 4 | length as u8);
    } else {
        out.push(type_code << 4 | LEN_VAR);
        numeric::encode_var_uint(out, length as u64);
    }
}

fn header_len(type_code: u8, length: usize) -> usize {
    if length < usize::from(LEN_VAR) && !(type_code == 0xD && length == 1) {
        1
    } else {
        1 + numeric::var_uint_len(length as u64)
    }
}

/// Writes the value already encoded in `value` into `out` with its field name
/// and annotation wrapper.
fn emit(out: &mut Vec<u8>, field: Option<usize>, annotations: &[usize], value: &[u8]) {
    if let Some(sid) = field {
        numeric::encode_var_uint(out, sid as u64);
    }
    if !annotations.is_empty() {
        let list_len: usize = annotations
            .iter()
            .map(|a| numeric::var_uint_len(*a as u64))
            .sum();
        let wrapped = numeric::var_uint_len(list_len as u64) + list_len + value.len();
        push_header(out, ANNOTATION_WRAPPER, wrapped);
        numeric::encode_var_uint(out, list_len as u64);
        for sid in annotations {
            numeric::encode_var_uint(out, *sid as u64);
        }
    }
    out.extend_from_slice(value);
}

fn encode_decimal_body(out: &mut Vec<u8>, value: &Decimal) {
    if value.is_zero() && !value.is_negative_zero() && value.exponent() == 0 {
        return;
    }
    numeric::encode_var_int(out, value.exponent());
    if value.is_negative_zero() {
        out.push(0x80);
    } else {
        numeric::encode_int_big(out, value.coefficient());
    }
}

fn encode_timestamp_body(out: &mut Vec<u8>, value: &Timestamp) {
    use crate::value::Precision;

    match value.offset_minutes() {
        Some(minutes) => {
            numeric::encode_var_int(out, i64::from(minutes));
        }
        None => out.push(numeric::VAR_INT_NEGATIVE_ZERO),
    }
    let utc = value.utc();
    let precision = value.precision();
    numeric::encode_var_uint(out, utc.year().unsigned_abs().into());
    if precision >= Precision::Month {
        numeric::encode_var_uint(out, utc.month().into());
    }
    if precision >= Precision::Day {
        numeric::encode_var_uint(out, utc.day().into());
    }
    if precision >= Precision::Minute {
        numeric::encode_var_uint(out, utc.hour().into());
        numeric::encode_var_uint(out, utc.minute().into());
    }
    if precision >= Precision::Second {
        numeric::encode_var_uint(out, utc.second().into());
        let digits = value.fraction_digits();
        if digits > 0 {
            let nanos = utc.nanosecond() % 1_000_000_000;
            let coefficient = nanos / 10u32.pow(9 - u32::from(digits));
            numeric::encode_var_int(out, -i64::from(digits));
            numeric::encode_int_big(out, &BigInt::from(coefficient));
        }
    }
}

impl BinaryWriter {
    #[must_use]
    pub fn new() -> Self {
        BinaryWriter {
            symbols: SymbolTable::system(),
            containers: Vec::new(),
            top_level: Vec::with_capacity(256),
            scratch: Vec::with_capacity(64),
            field_name: None,
            annotations: Vec::new(),
        }
    }

    /// The symbol table the output will declare.
    #[must_use]
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    fn check_symbol(symbol: &Symbol) -> Result<()> {
        match symbol {
            Symbol::Unknown(id) if *id != 0 => Err(Error::InvalidInput(format!(
                "symbol ${id} has unknown text and cannot be written to a new stream"
            ))),
            _ => Ok(()),
        }
    }

    /// Interns `symbol`. Callers check it first so a rejected write never
    /// leaves a stray entry in the local table.
    fn symbol_id(&mut self, symbol: &Symbol) -> Result<usize> {
        Self::check_symbol(symbol)?;
        Ok(match symbol {
            Symbol::Text(text) => self.symbols.intern(text),
            Symbol::Unknown(id) => *id,
        })
    }

    /// Takes the staged field name and annotations, checking struct rules.
    /// Nothing is interned unless every symbol can be written.
    fn take_prefix(&mut self) -> Result<(Option<usize>, Vec<usize>)> {
        let field_name = self.field_name.take();
        let annotations = std::mem::take(&mut self.annotations);
        let in_struct = self
            .containers
            .last()
            .is_some_and(|c| c.ion_type == IonType::Struct);
        match (in_struct, &field_name) {
            (true, None) => return Err(Error::invalid_state("struct values need a field name")),
            (false, Some(_)) => return Err(Error::invalid_state("field name set outside a struct")),
            _ => {}
        }
        field_name
            .iter()
            .chain(&annotations)
            .try_for_each(Self::check_symbol)?;
        let field = field_name.map(|name| self.symbol_id(&name)).transpose()?;
        let annotations = annotations
            .iter()
            .map(|a| self.symbol_id(a))
            .collect::<Result<Vec<_>>>()?;
        Ok((field, annotations))
    }

    /// Encodes a scalar whose body is produced by `body` and appends it to
    /// the innermost container.
    fn commit(
        &mut self,
        (field, annotations): (Option<usize>, Vec<usize>),
        type_code: u8,
        body: impl FnOnce(&mut Vec<u8>),
    ) {
        self.scratch.clear();
        body(&mut self.scratch);
        let length = self.scratch.len();
        if length < usize::from(LEN_VAR) {
            self.scratch.insert(0, type_code << 4 | length as u8);
        } else {
            let mut header = Vec::with_capacity(header_len(type_code, length));
            push_header(&mut header, type_code, length);
            self.scratch.splice(0..0, header);
        }
        let out = match self.containers.last_mut() {
            Some(container) => &mut container.body,
            None => &mut self.top_level,
        };
        emit(out, field, &annotations, &self.scratch);
    }

    /// Writes a value that is a lone type descriptor byte.
    fn write_descriptor(&mut self, descriptor: u8) -> Result<()> {
        let (field, annotations) = self.take_prefix()?;
        let out = match self.containers.last_mut() {
            Some(container) => &mut container.body,
            None => &mut self.top_level,
        };
        emit(out, field, &annotations, &[descriptor]);
        Ok(())
    }

    fn write_typed(&mut self, type_code: u8, body: impl FnOnce(&mut Vec<u8>)) -> Result<()> {
        let prefix = self.take_prefix()?;
        self.commit(prefix, type_code, body);
        Ok(())
    }

    fn encode_symbol_table(&self, out: &mut Vec<u8>) {
        let mut list = Vec::new();
        for text in self.symbols.local_symbols() {
            let text = text.as_deref().unwrap_or_default();
            push_header(&mut list, 0x8, text.len());
            list.extend_from_slice(text.as_bytes());
        }
        let mut fields = Vec::with_capacity(list.len() + 4);
        numeric::encode_var_uint(&mut fields, sid::SYMBOLS as u64);
        push_header(&mut fields, 0xB, list.len());
        fields.extend_from_slice(&list);

        let mut table = Vec::with_capacity(fields.len() + 4);
        push_header(&mut table, 0xD, fields.len());
        table.extend_from_slice(&fields);
        emit(out, None, &[sid::ION_SYMBOL_TABLE], &table);
    }

    /// Returns the finished stream.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if a container is still open or a field name
    /// or annotation was staged without a value.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.containers.is_empty() {
            return Err(Error::invalid_state("finish called with open containers"));
        }
        if self.field_name.is_some() || !self.annotations.is_empty() {
            return Err(Error::invalid_state("field name or annotations left unused"));
        }
        let local = self.symbols.local_symbols().len();
        let mut out = Vec::with_capacity(IVM.len() + self.top_level.len() + local * 8 + 8);
        out.extend_from_slice(&IVM);
        if local > 0 {
            self.encode_symbol_table(&mut out);
        }
        out.extend_from_slice(&self.top_level);
        debug!(
            symbols = local,
            bytes = out.len(),
            "flushed binary stream"
        );
        Ok(out)
    }
}

impl IonWriter for BinaryWriter {
    fn set_field_name(&mut self, name: Symbol) {
        self.field_name = Some(name);
    }

    fn set_annotations(&mut self, annotations: Vec<Symbol>) {
        self.annotations = annotations;
    }

    fn write_null(&mut self, ion_type: IonType) -> Result<()> {
        self.write_descriptor(ion_type.code() << 4 | LEN_NULL)
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_descriptor(0x10 | u8::from(value))
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        let type_code = if value < 0 { 0x3 } else { 0x2 };
        let magnitude = value.unsigned_abs();
        self.write_typed(type_code, |out| {
            out.extend_from_slice(&magnitude.to_be_bytes()[8 - numeric::uint_len(magnitude)..]);
        })
    }

    fn write_int(&mut self, value: &Int) -> Result<()> {
        match value {
            Int::I64(i) => self.write_i64(*i),
            Int::Big(big) => {
                let type_code = if big.sign() == Sign::Minus { 0x3 } else { 0x2 };
                self.write_typed(type_code, |out| {
                    numeric::encode_uint_big(out, big.magnitude());
                })
            }
        }
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        if value == 0.0 && value.is_sign_positive() {
            return self.write_typed(0x4, |_| {});
        }
        self.write_typed(0x4, |out| out.extend_from_slice(&value.to_be_bytes()))
    }

    fn write_decimal(&mut self, value: &Decimal) -> Result<()> {
        self.write_typed(0x5, |out| encode_decimal_body(out, value))
    }

    fn write_timestamp(&mut self, value: &Timestamp) -> Result<()> {
        self.write_typed(0x6, |out| encode_timestamp_body(out, value))
    }

    fn write_symbol(&mut self, value: &Symbol) -> Result<()> {
        Self::check_symbol(value)?;
        let prefix = self.take_prefix()?;
        let id = self.symbol_id(value)? as u64;
        self.commit(prefix, 0x7, |out| {
            out.extend_from_slice(&id.to_be_bytes()[8 - numeric::uint_len(id)..]);
        });
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_typed(0x8, |out| out.extend_from_slice(value.as_bytes()))
    }

    fn write_clob(&mut self, value: &[u8]) -> Result<()> {
        self.write_typed(0x9, |out| out.extend_from_slice(value))
    }

    fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        self.write_typed(0xA, |out| out.extend_from_slice(value))
    }

    fn step_in(&mut self, container: IonType) -> Result<()> {
        if !container.is_container() {
            return Err(Error::InvalidState(format!("cannot step into {container}")));
        }
        let (field, annotations) = self.take_prefix()?;
        self.containers.push(Container {
            ion_type: container,
            field,
            annotations,
            body: Vec::new(),
        });
        Ok(())
    }

    fn step_out(&mut self) -> Result<()> {
        if self.field_name.is_some() || !self.annotations.is_empty() {
            return Err(Error::invalid_state("field name or annotations left unused"));
        }
        let container = self
            .containers
            .pop()
            .ok_or_else(|| Error::invalid_state("step_out at depth 0"))?;
        self.scratch.clear();
        push_header(&mut self.scratch, container.ion_type.code(), container.body.len());
        self.scratch.extend_from_slice(&container.body);
        let out = match self.containers.last_mut() {
            Some(parent) => &mut parent.body,
            None => &mut self.top_level,
        };
        emit(out, container.field, &container.annotations, &self.scratch);
        Ok(())
    }

    fn depth(&self) -> usize {
        self.containers.len()
    }
}
