//! Cursor over the binary encoding.
//!
//! Every binary value starts with a type descriptor byte: the high nibble is
//! the type code, the low nibble the length (14 = a `VarUInt` length
//! follows, 15 = null). Containers are skipped in one jump using their
//! stored length; nothing inside them is decoded unless the caller steps in.
//!
//! ```rust
//! use serde_ion::binary_cursor::BinaryCursor;
//! use serde_ion::cursor::{RawCursor, RawEvent, RawScalar};
//! use serde_ion::{Int, IonType};
//!
//! // $ion_1_0 [1, 2]
//! let bytes = [0xE0, 0x01, 0x00, 0xEA, 0xB4, 0x21, 0x01, 0x21, 0x02];
//! let mut cursor = BinaryCursor::new(&bytes);
//! assert_eq!(cursor.next().unwrap(), Some(RawEvent::VersionMarker));
//! assert_eq!(cursor.next().unwrap(), Some(RawEvent::Value(IonType::List)));
//! cursor.step_in().unwrap();
//! cursor.next().unwrap();
//! assert_eq!(cursor.materialize().unwrap(), RawScalar::Int(Int::I64(1)));
//! ```

use crate::cursor::{RawCursor, RawEvent, RawScalar, RawSymbol};
use crate::error::{Error, Result};
use crate::numeric;
use crate::types::IonType;
use crate::value::{Decimal, Int, Precision, Timestamp};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::ops::Range;
use tracing::trace;

/// The binary Ion 1.0 version marker.
pub const IVM: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];

const LEN_VAR: u8 = 14;
const LEN_NULL: u8 = 15;

#[derive(Debug, Clone, Copy)]
struct Frame {
    ion_type: IonType,
    end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Header {
    type_code: u8,
    low: u8,
    body_start: usize,
    body_end: usize,
}

#[derive(Debug, Clone)]
struct Current {
    ion_type: IonType,
    null: bool,
    negative: bool,
    low: u8,
    body: Range<usize>,
    offset: usize,
}

/// Walks a binary Ion buffer.
pub struct BinaryCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    frames: Vec<Frame>,
    current: Option<Current>,
    field: Option<RawSymbol>,
    annotations: Vec<RawSymbol>,
}

impl<'a> BinaryCursor<'a> {
    /// Creates a cursor. The version marker is optional; if present it is
    /// reported by the first [`RawCursor::next`].
    pub fn new(buf: &'a [u8]) -> Self {
        BinaryCursor {
            buf,
            pos: 0,
            frames: Vec::new(),
            current: None,
            field: None,
            annotations: Vec::new(),
        }
    }

    fn limit(&self) -> usize {
        self.frames.last().map_or(self.buf.len(), |f| f.end)
    }

    fn in_struct(&self) -> bool {
        self.frames
            .last()
            .is_some_and(|f| f.ion_type == IonType::Struct)
    }

    fn var_uint(&self, pos: usize, limit: usize) -> Result<(usize, usize)> {
        let (value, used) = numeric::decode_var_uint(&self.buf[pos..limit])
            .map_err(|e| e.at_offset(pos))?;
        let value = usize::try_from(value)
            .map_err(|_| Error::malformed(pos, "length exceeds address space"))?;
        Ok((value, used))
    }

    fn header(&self, pos: usize, limit: usize) -> Result<Header> {
        let td = *self
            .buf
            .get(pos)
            .filter(|_| pos < limit)
            .ok_or_else(|| Error::malformed(pos, "unexpected end of input"))?;
        let (type_code, low) = (td >> 4, td & 0x0F);
        let mut body_start = pos + 1;
        let length = match (type_code, low) {
            (_, LEN_NULL) | (0x1, _) => 0,
            (0xD, 1) | (_, LEN_VAR) => {
                let (length, used) = self.var_uint(body_start, limit)?;
                body_start += used;
                length
            }
            (_, low) => usize::from(low),
        };
        let body_end = body_start
            .checked_add(length)
            .filter(|end| *end <= limit)
            .ok_or_else(|| Error::malformed(pos, "value extends past the end of its container"))?;
        Ok(Header {
            type_code,
            low,
            body_start,
            body_end,
        })
    }

    fn ion_type_of(header: &Header, pos: usize) -> Result<IonType> {
        let null = header.low == LEN_NULL;
        let ion_type = match header.type_code {
            0x0 => IonType::Null,
            0x1 if header.low <= 1 || null => IonType::Bool,
            0x1 => return Err(Error::malformed(pos, "invalid bool length")),
            0x2 => IonType::Int,
            0x3 if !null && header.body_start == header.body_end => {
                return Err(Error::malformed(pos, "negative zero int"))
            }
            0x3 => IonType::Int,
            0x4 if matches!(header.low, 0 | 4 | 8) || null => IonType::Float,
            0x4 => return Err(Error::malformed(pos, "invalid float length")),
            0x5 => IonType::Decimal,
            0x6 => IonType::Timestamp,
            0x7 => IonType::Symbol,
            0x8 => IonType::String,
            0x9 => IonType::Clob,
            0xA => IonType::Blob,
            0xB => IonType::List,
            0xC => IonType::Sexp,
            0xD => IonType::Struct,
            _ => return Err(Error::malformed(pos, "reserved type code")),
        };
        Ok(ion_type)
    }

    fn read_annotations(&mut self, wrapper: &Header, pos: usize) -> Result<Header> {
        if wrapper.low == LEN_NULL || wrapper.low < 3 {
            return Err(Error::malformed(pos, "invalid annotation wrapper"));
        }
        let mut p = wrapper.body_start;
        let (length, used) = self.var_uint(p, wrapper.body_end)?;
        p += used;
        let annotations_end = p
            .checked_add(length)
            .filter(|end| length > 0 && *end < wrapper.body_end)
            .ok_or_else(|| Error::malformed(p, "invalid annotation list length"))?;
        while p < annotations_end {
            let (sid, used) = self.var_uint(p, annotations_end)?;
            self.annotations.push(RawSymbol::Id(sid));
            p += used;
        }
        let inner = self.header(annotations_end, wrapper.body_end)?;
        if inner.body_end != wrapper.body_end {
            return Err(Error::malformed(pos, "annotation wrapper length does not match its value"));
        }
        if inner.type_code == 0xE || (inner.type_code == 0 && inner.low != LEN_NULL) {
            return Err(Error::malformed(annotations_end, "annotation wrapper must wrap a value"));
        }
        Ok(inner)
    }

    fn current(&self) -> Result<&Current> {
        self.current
            .as_ref()
            .ok_or_else(|| Error::invalid_state("not positioned on a value"))
    }

    fn body(&self, current: &Current) -> &'a [u8] {
        &self.buf[current.body.clone()]
    }

    fn read_int(&self, current: &Current) -> Result<Int> {
        let bytes = self.body(current);
        if bytes.len() <= 8 {
            let magnitude = numeric::decode_fixed_uint(bytes)?;
            return Ok(if current.negative {
                match i64::try_from(-i128::from(magnitude)) {
                    Ok(i) => Int::I64(i),
                    Err(_) => Int::from(-num_bigint::BigInt::from(magnitude)),
                }
            } else {
                Int::from(magnitude)
            });
        }
        let magnitude = num_bigint::BigInt::from(numeric::decode_fixed_uint_big(bytes));
        Ok(Int::from(if current.negative { -magnitude } else { magnitude }))
    }

    fn read_float(&self, current: &Current) -> Result<f64> {
        let bytes = self.body(current);
        match bytes.len() {
            0 => Ok(0.0),
            4 => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(bytes);
                Ok(f64::from(f32::from_be_bytes(raw)))
            }
            8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                Ok(f64::from_be_bytes(raw))
            }
            _ => Err(Error::malformed(current.offset, "invalid float length")),
        }
    }

    fn read_decimal(bytes: &[u8]) -> Result<Decimal> {
        if bytes.is_empty() {
            return Ok(Decimal::new(0, 0));
        }
        let (exponent, used) = numeric::decode_var_int(bytes)?;
        let coefficient = &bytes[used..];
        Ok(if numeric::is_negative_zero_int(coefficient) {
            Decimal::negative_zero(exponent)
        } else {
            Decimal::new(numeric::decode_fixed_int_big(coefficient), exponent)
        })
    }

    fn read_timestamp(bytes: &[u8]) -> Result<Timestamp> {
        let mut pos = 0;
        let offset = if numeric::is_negative_zero_var_int(bytes) {
            let (_, used) = numeric::decode_var_int(bytes)?;
            pos += used;
            None
        } else {
            let (minutes, used) = numeric::decode_var_int(bytes)?;
            pos += used;
            Some(i32::try_from(minutes).map_err(|_| Error::malformed(0, "timestamp offset out of range"))?)
        };
        let mut fields = [1u32, 1, 1, 0, 0, 0];
        let mut count = 0;
        while count < fields.len() && pos < bytes.len() {
            let (value, used) = numeric::decode_var_uint(&bytes[pos..]).map_err(|e| e.at_offset(pos))?;
            fields[count] =
                u32::try_from(value).map_err(|_| Error::malformed(pos, "timestamp field out of range"))?;
            pos += used;
            count += 1;
        }
        let precision = match count {
            1 => Precision::Year,
            2 => Precision::Month,
            3 => Precision::Day,
            5 => Precision::Minute,
            6 => Precision::Second,
            _ => return Err(Error::malformed(pos, "incomplete timestamp")),
        };
        let (mut nanos, mut digits) = (0, 0u8);
        if pos < bytes.len() {
            if precision != Precision::Second {
                return Err(Error::malformed(pos, "fraction without seconds"));
            }
            let fraction = Self::read_decimal(&bytes[pos..]).map_err(|e| e.at_offset(pos))?;
            (nanos, digits) = fraction_nanos(&fraction).ok_or_else(|| {
                Error::malformed(pos, "timestamp fraction must be in [0, 1) with at most nine digits")
            })?;
        }
        let year = i32::try_from(fields[0]).map_err(|_| Error::malformed(0, "timestamp year out of range"))?;
        let date = NaiveDate::from_ymd_opt(year, fields[1], fields[2])
            .ok_or_else(|| Error::malformed(0, "invalid timestamp date"))?;
        let time = NaiveTime::from_hms_nano_opt(fields[3], fields[4], fields[5], nanos)
            .ok_or_else(|| Error::malformed(0, "invalid timestamp time"))?;
        Timestamp::from_utc_fields(precision, NaiveDateTime::new(date, time), offset, digits)
    }
}

fn fraction_nanos(fraction: &Decimal) -> Option<(u32, u8)> {
    use num_traits::ToPrimitive;

    let digits = u8::try_from(-fraction.exponent()).ok().filter(|d| *d <= 9)?;
    if fraction.is_zero() {
        return Some((0, if fraction.exponent() == 0 { 0 } else { digits }));
    }
    let coefficient = fraction.coefficient().to_u32()?;
    let scale = 10u32.pow(u32::from(digits));
    if coefficient >= scale {
        return None;
    }
    Some((coefficient * (1_000_000_000 / scale), digits))
}

impl RawCursor for BinaryCursor<'_> {
    fn next(&mut self) -> Result<Option<RawEvent>> {
        if let Some(current) = self.current.take() {
            self.pos = current.body.end;
        }
        let limit = self.limit();
        loop {
            self.field = None;
            self.annotations.clear();
            if self.pos >= limit {
                return Ok(None);
            }
            let mut pos = self.pos;
            if self.in_struct() {
                let (sid, used) = self.var_uint(pos, limit)?;
                self.field = Some(RawSymbol::Id(sid));
                pos += used;
            }
            if self.frames.is_empty() && self.buf.get(pos) == Some(&IVM[0]) {
                let marker = self
                    .buf
                    .get(pos..pos + IVM.len())
                    .ok_or_else(|| Error::malformed(pos, "truncated version marker"))?;
                if marker != IVM {
                    return Err(Error::malformed(pos, "unsupported Ion version"));
                }
                trace!(offset = pos, "binary version marker");
                self.pos = pos + IVM.len();
                return Ok(Some(RawEvent::VersionMarker));
            }
            let header = self.header(pos, limit)?;
            if header.type_code == 0 && header.low != LEN_NULL {
                self.pos = header.body_end;
                continue;
            }
            let value = if header.type_code == 0xE {
                self.read_annotations(&header, pos)?
            } else {
                header
            };
            let ion_type = Self::ion_type_of(&value, pos)?;
            self.current = Some(Current {
                ion_type,
                null: value.low == LEN_NULL,
                negative: value.type_code == 0x3,
                low: value.low,
                body: value.body_start..value.body_end,
                offset: pos,
            });
            return Ok(Some(RawEvent::Value(ion_type)));
        }
    }

    fn step_in(&mut self) -> Result<()> {
        let current = self.current()?;
        if !current.ion_type.is_container() || current.null {
            return Err(Error::invalid_state("step_in requires a non-null container"));
        }
        let frame = Frame {
            ion_type: current.ion_type,
            end: current.body.end,
        };
        self.pos = current.body.start;
        self.frames.push(frame);
        self.current = None;
        self.field = None;
        self.annotations.clear();
        Ok(())
    }

    fn step_out(&mut self) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| Error::invalid_state("step_out at depth 0"))?;
        self.pos = frame.end;
        self.current = None;
        self.field = None;
        self.annotations.clear();
        Ok(())
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }

    fn ion_type(&self) -> Option<IonType> {
        self.current.as_ref().map(|c| c.ion_type)
    }

    fn is_null(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.null)
    }

    fn field_name(&self) -> Option<&RawSymbol> {
        self.current.as_ref().and(self.field.as_ref())
    }

    fn annotations(&self) -> &[RawSymbol] {
        &self.annotations
    }

    fn materialize(&self) -> Result<RawScalar> {
        let current = self.current()?;
        if current.null || current.ion_type.is_container() || current.ion_type == IonType::Null {
            return Err(Error::invalid_state("no scalar value at the current position"));
        }
        let bytes = self.body(current);
        let base = current.body.start;
        let scalar = match current.ion_type {
            IonType::Bool => RawScalar::Bool(current.low == 1),
            IonType::Int => RawScalar::Int(self.read_int(current)?),
            IonType::Float => RawScalar::Float(self.read_float(current)?),
            IonType::Decimal => {
                RawScalar::Decimal(Self::read_decimal(bytes).map_err(|e| e.at_offset(base))?)
            }
            IonType::Timestamp => {
                RawScalar::Timestamp(Self::read_timestamp(bytes).map_err(|e| e.at_offset(base))?)
            }
            IonType::Symbol => {
                let sid = numeric::decode_fixed_uint(bytes).map_err(|e| e.at_offset(base))?;
                let sid = usize::try_from(sid)
                    .map_err(|_| Error::malformed(base, "symbol id exceeds address space"))?;
                RawScalar::Symbol(RawSymbol::Id(sid))
            }
            IonType::String => RawScalar::String(
                std::str::from_utf8(bytes)
                    .map_err(|e| Error::malformed(base + e.valid_up_to(), "invalid UTF-8 in string"))?
                    .to_string(),
            ),
            IonType::Clob | IonType::Blob => RawScalar::Bytes(bytes.to_vec()),
            IonType::Null | IonType::List | IonType::Sexp | IonType::Struct => {
                return Err(Error::invalid_state("no scalar value at the current position"))
            }
        };
        Ok(scalar)
    }

    fn offset(&self) -> usize {
        self.current.as_ref().map_or(self.pos, |c| c.offset)
    }
}
