//! Owned representation of Ion values.
//!
//! Cursors never build these; they exist for callers that want a whole value
//! in memory ([`Reader::read_element`](crate::Reader::read_element)), for
//! transcoding, and for handing Ion data to other serde formats.
//!
//! ## Core Types
//!
//! - [`Element`]: a [`Value`] plus its annotations
//! - [`Int`]: an integer of any size
//! - [`Decimal`]: an exact base-10 number that keeps its precision
//! - [`Timestamp`]: a point in time with explicit precision and offset
//!
//! ## Examples
//!
//! ```rust
//! use serde_ion::{Decimal, Element, Timestamp, Value};
//!
//! let price = Decimal::parse("12.50").unwrap();
//! assert_eq!(price.exponent(), -2);
//! assert_eq!(price.to_string(), "12.50");
//!
//! let when = Timestamp::parse("2007-02-23T12:14Z").unwrap();
//! assert_eq!(when.to_string(), "2007-02-23T12:14Z");
//!
//! let element = Element::from("hello").with_annotations(["greeting"]);
//! assert_eq!(element.value.as_str(), Some("hello"));
//! assert!(matches!(element.value, Value::String(_)));
//! ```

use crate::error::{Error, Result};
use crate::symbols::Symbol;
use crate::types::IonType;
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// An integer of any size. Values that fit in `i64` use [`Int::I64`].
#[derive(Debug, Clone)]
pub enum Int {
    I64(i64),
    Big(BigInt),
}

impl Int {
    /// Returns the value as an `i64` if it fits.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Int::I64(i) => Some(*i),
            Int::Big(b) => b.to_i64(),
        }
    }

    #[must_use]
    pub fn to_bigint(&self) -> BigInt {
        match self {
            Int::I64(i) => BigInt::from(*i),
            Int::Big(b) => b.clone(),
        }
    }

    #[must_use]
    pub fn to_f64(&self) -> f64 {
        match self {
            Int::I64(i) => *i as f64,
            Int::Big(b) => b.to_f64().unwrap_or(f64::NAN),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_negative(&self) -> bool {
        match self {
            Int::I64(i) => *i < 0,
            Int::Big(b) => b.sign() == Sign::Minus,
        }
    }
}

impl PartialEq for Int {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Int::I64(a), Int::I64(b)) => a == b,
            _ => self.to_bigint() == other.to_bigint(),
        }
    }
}

impl Eq for Int {}

impl Hash for Int {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bigint().hash(state);
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Int::I64(i) => write!(f, "{i}"),
            Int::Big(b) => write!(f, "{b}"),
        }
    }
}

impl From<i64> for Int {
    fn from(value: i64) -> Self {
        Int::I64(value)
    }
}

impl From<u64> for Int {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => Int::I64(i),
            Err(_) => Int::Big(BigInt::from(value)),
        }
    }
}

impl From<BigInt> for Int {
    fn from(value: BigInt) -> Self {
        match value.to_i64() {
            Some(i) => Int::I64(i),
            None => Int::Big(value),
        }
    }
}

/// An exact decimal number: `coefficient * 10^exponent`.
///
/// Precision is part of the value, so `1.0` and `1.00` are different
/// decimals. Negative zero is kept distinct from zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    coefficient: BigInt,
    exponent: i64,
    negative_zero: bool,
}

impl Decimal {
    /// Creates a decimal from a coefficient and exponent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ion::Decimal;
    ///
    /// assert_eq!(Decimal::new(12345, -2).to_string(), "123.45");
    /// assert_eq!(Decimal::new(7, 0).to_string(), "7.");
    /// assert_eq!(Decimal::new(12, 3).to_string(), "12d3");
    /// ```
    pub fn new<C: Into<BigInt>>(coefficient: C, exponent: i64) -> Self {
        Decimal {
            coefficient: coefficient.into(),
            exponent,
            negative_zero: false,
        }
    }

    /// Creates `-0` with the given exponent.
    #[must_use]
    pub fn negative_zero(exponent: i64) -> Self {
        Decimal {
            coefficient: BigInt::zero(),
            exponent,
            negative_zero: true,
        }
    }

    #[must_use]
    pub fn coefficient(&self) -> &BigInt {
        &self.coefficient
    }

    #[must_use]
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    #[must_use]
    pub fn is_negative_zero(&self) -> bool {
        self.negative_zero
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.coefficient.is_zero()
    }

    /// Nearest `f64` to this decimal.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        if self.negative_zero {
            return -0.0;
        }
        format!("{}e{}", self.coefficient, self.exponent)
            .parse()
            .unwrap_or(f64::NAN)
    }

    /// Parses the text form: optional `-`, digits with an optional `.`, and an
    /// optional `d`/`D` exponent. Underscores must already be removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] with an offset into `text`.
    pub fn parse(text: &str) -> Result<Decimal> {
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let sign_len = text.len() - body.len();
        let (mantissa, exponent) = match body.find(['d', 'D']) {
            Some(split) => {
                let exp_text = &body[split + 1..];
                let exp_text = exp_text.strip_prefix('+').unwrap_or(exp_text);
                let exponent: i64 = exp_text.parse().map_err(|_| {
                    Error::malformed(sign_len + split + 1, "invalid decimal exponent")
                })?;
                (&body[..split], exponent)
            }
            None => (body, 0),
        };
        let (whole, fraction) = match mantissa.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (mantissa, ""),
        };
        if whole.is_empty() || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(Error::malformed(sign_len, "invalid decimal digits"));
        }
        let digits = format!("{whole}{fraction}");
        let magnitude = BigInt::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| Error::malformed(sign_len, "invalid decimal digits"))?;
        let exponent = i64::try_from(fraction.len())
            .ok()
            .and_then(|len| exponent.checked_sub(len))
            .ok_or_else(|| Error::malformed(sign_len, "decimal exponent out of range"))?;
        Ok(if negative && magnitude.is_zero() {
            Decimal::negative_zero(exponent)
        } else if negative {
            Decimal::new(-magnitude, exponent)
        } else {
            Decimal::new(magnitude, exponent)
        })
    }
}

/// Past this many zeros after the point, decimals switch to `d` notation.
const MAX_LEADING_ZEROS: u64 = 6;

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative_zero || self.coefficient.sign() == Sign::Minus {
            f.write_str("-")?;
        }
        let digits = self.coefficient.magnitude().to_string();
        if self.exponent > 0 {
            return write!(f, "{digits}d{}", self.exponent);
        }
        let scale = self.exponent.unsigned_abs();
        let len = digits.len() as u64;
        if scale == 0 {
            write!(f, "{digits}.")
        } else if len > scale {
            let (whole, fraction) = digits.split_at(digits.len() - scale as usize);
            write!(f, "{whole}.{fraction}")
        } else if scale - len <= MAX_LEADING_ZEROS {
            write!(f, "0.{}{digits}", "0".repeat((scale - len) as usize))
        } else {
            write!(f, "{digits}d{}", self.exponent)
        }
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal::new(value, 0)
    }
}

/// How much of a [`Timestamp`] is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Precision {
    Year,
    Month,
    Day,
    Minute,
    /// Seconds, possibly with a fraction.
    Second,
}

/// A point in time with explicit precision and a known or unknown offset.
///
/// Fields are stored in local time. An offset of `None` is the unknown offset
/// written `-00:00` in text. Fractions carry up to nine digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timestamp {
    precision: Precision,
    local: NaiveDateTime,
    offset: Option<i32>,
    fraction_digits: u8,
}

const MAX_FRACTION_DIGITS: u8 = 9;
const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;

impl Timestamp {
    /// Builds a timestamp from local fields.
    ///
    /// Fields below `precision` are ignored and reset; `fraction_digits` is
    /// only kept at [`Precision::Second`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for years outside `1..=9999`, more than
    /// nine fraction digits or an offset of a day or more.
    pub fn new(
        precision: Precision,
        local: NaiveDateTime,
        offset: Option<i32>,
        fraction_digits: u8,
    ) -> Result<Timestamp> {
        if !(1..=9999).contains(&local.year()) {
            return Err(Error::invalid_input("timestamp year must be within 1..=9999"));
        }
        if fraction_digits > MAX_FRACTION_DIGITS {
            return Err(Error::invalid_input("timestamp fraction exceeds nanoseconds"));
        }
        if offset.is_some_and(|o| o.abs() > MAX_OFFSET_MINUTES) {
            return Err(Error::invalid_input("timestamp offset out of range"));
        }
        let truncated = truncate(local, precision, fraction_digits)
            .ok_or_else(|| Error::invalid_input("invalid timestamp fields"))?;
        Ok(Timestamp {
            precision,
            local: truncated,
            offset: if precision >= Precision::Minute { offset } else { None },
            fraction_digits: if precision == Precision::Second { fraction_digits } else { 0 },
        })
    }

    /// A year-precision timestamp.
    pub fn with_year(year: i32) -> Result<Timestamp> {
        let local = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| Error::invalid_input("invalid timestamp year"))?;
        Timestamp::new(Precision::Year, local, None, 0)
    }

    /// A day-precision timestamp.
    pub fn with_ymd(year: i32, month: u32, day: u32) -> Result<Timestamp> {
        let local = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| Error::invalid_input("invalid timestamp date"))?;
        Timestamp::new(Precision::Day, local, None, 0)
    }

    /// Second precision at UTC, keeping as many fraction digits as the
    /// nanoseconds need.
    #[must_use]
    pub fn from_utc(value: DateTime<Utc>) -> Timestamp {
        let local = value.naive_utc();
        Timestamp {
            precision: Precision::Second,
            local,
            offset: Some(0),
            fraction_digits: significant_fraction_digits(local.nanosecond()),
        }
    }

    /// Rebuilds a timestamp from UTC fields, as stored in binary.
    pub(crate) fn from_utc_fields(
        precision: Precision,
        utc: NaiveDateTime,
        offset: Option<i32>,
        fraction_digits: u8,
    ) -> Result<Timestamp> {
        let local = match offset {
            Some(minutes) if precision >= Precision::Minute => utc
                .checked_add_signed(Duration::minutes(i64::from(minutes)))
                .ok_or_else(|| Error::malformed(0, "timestamp offset out of range"))?,
            _ => utc,
        };
        Timestamp::new(precision, local, offset, fraction_digits)
            .map_err(|e| Error::malformed(0, &e.to_string()))
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Local date and time.
    #[must_use]
    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    /// Offset from UTC in minutes, or `None` when unknown.
    #[must_use]
    pub fn offset_minutes(&self) -> Option<i32> {
        self.offset
    }

    #[must_use]
    pub fn fraction_digits(&self) -> u8 {
        self.fraction_digits
    }

    /// Date and time in UTC. Timestamps without a known offset are treated
    /// as UTC.
    #[must_use]
    pub fn utc(&self) -> NaiveDateTime {
        match self.offset {
            Some(minutes) => self
                .local
                .checked_sub_signed(Duration::minutes(i64::from(minutes)))
                .unwrap_or(self.local),
            None => self.local,
        }
    }

    /// Converts to a chrono value carrying the offset (UTC if unknown).
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.offset.unwrap_or(0) * 60)?;
        Some(offset.from_utc_datetime(&self.utc()))
    }

    /// Parses the text form, e.g. `2007T`, `2007-02-23`,
    /// `2007-02-23T12:14:33.079-08:00`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] with an offset into `text`.
    pub fn parse(text: &str) -> Result<Timestamp> {
        let mut p = TimestampParser { bytes: text.as_bytes(), pos: 0 };
        let year = p.digits(4)? as i32;
        let (mut month, mut day) = (1, 1);
        let (mut hour, mut minute, mut second, mut nanos) = (0, 0, 0, 0);
        let mut digits = 0u8;
        let mut offset = None;

        let precision = if p.eat(b'T') {
            Precision::Year
        } else {
            p.expect(b'-')?;
            month = p.digits(2)?;
            if p.eat(b'T') {
                Precision::Month
            } else {
                p.expect(b'-')?;
                day = p.digits(2)?;
                if p.done() || (p.eat(b'T') && p.done()) {
                    Precision::Day
                } else {
                    hour = p.digits(2)?;
                    p.expect(b':')?;
                    minute = p.digits(2)?;
                    let mut precision = Precision::Minute;
                    if p.eat(b':') {
                        precision = Precision::Second;
                        second = p.digits(2)?;
                        if p.eat(b'.') {
                            let start = p.pos;
                            while p.peek().is_some_and(|b| b.is_ascii_digit()) {
                                p.pos += 1;
                            }
                            let count = p.pos - start;
                            if count == 0 {
                                return Err(Error::malformed(start, "empty timestamp fraction"));
                            }
                            if count > usize::from(MAX_FRACTION_DIGITS) {
                                return Err(Error::malformed(
                                    start,
                                    "timestamp fraction exceeds nanoseconds",
                                ));
                            }
                            let value: u32 = text[start..p.pos]
                                .parse()
                                .map_err(|_| Error::malformed(start, "invalid fraction"))?;
                            digits = count as u8;
                            nanos = value * 10u32.pow(u32::from(MAX_FRACTION_DIGITS) - count as u32);
                        }
                    }
                    offset = p.offset()?;
                    precision
                }
            }
        };
        if !p.done() {
            return Err(Error::malformed(p.pos, "unexpected characters after timestamp"));
        }
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| Error::malformed(0, "invalid timestamp date"))?;
        let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
            .ok_or_else(|| Error::malformed(0, "invalid timestamp time"))?;
        Timestamp::new(precision, NaiveDateTime::new(date, time), offset, digits)
            .map_err(|e| Error::malformed(0, &e.to_string()))
    }
}

fn truncate(local: NaiveDateTime, precision: Precision, digits: u8) -> Option<NaiveDateTime> {
    let (month, day) = match precision {
        Precision::Year => (1, 1),
        Precision::Month => (local.month(), 1),
        _ => (local.month(), local.day()),
    };
    let date = NaiveDate::from_ymd_opt(local.year(), month, day)?;
    let time = match precision {
        Precision::Year | Precision::Month | Precision::Day => NaiveTime::from_hms_opt(0, 0, 0)?,
        Precision::Minute => NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)?,
        Precision::Second => {
            let unit = 10u32.pow(u32::from(MAX_FRACTION_DIGITS - digits));
            let nanos = local.nanosecond() / unit * unit;
            NaiveTime::from_hms_nano_opt(local.hour(), local.minute(), local.second(), nanos)?
        }
    };
    Some(NaiveDateTime::new(date, time))
}

fn significant_fraction_digits(nanos: u32) -> u8 {
    if nanos == 0 {
        return 0;
    }
    let mut digits = MAX_FRACTION_DIGITS;
    let mut rest = nanos;
    while rest % 10 == 0 {
        rest /= 10;
        digits -= 1;
    }
    digits
}

struct TimestampParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl TimestampParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn done(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.eat(b) {
            Ok(())
        } else {
            Err(Error::malformed(
                self.pos,
                &format!("expected '{}' in timestamp", b as char),
            ))
        }
    }

    fn digits(&mut self, count: usize) -> Result<u32> {
        let end = self.pos + count;
        let field = self
            .bytes
            .get(self.pos..end)
            .filter(|f| f.iter().all(u8::is_ascii_digit))
            .ok_or_else(|| Error::malformed(self.pos, "expected timestamp digits"))?;
        self.pos = end;
        Ok(field.iter().fold(0, |acc, b| acc * 10 + u32::from(b - b'0')))
    }

    fn offset(&mut self) -> Result<Option<i32>> {
        if self.eat(b'Z') || self.eat(b'z') {
            return Ok(Some(0));
        }
        let negative = match self.peek() {
            Some(b'+') => false,
            Some(b'-') => true,
            _ => return Err(Error::malformed(self.pos, "expected timestamp offset")),
        };
        self.pos += 1;
        let hours = self.digits(2)?;
        self.expect(b':')?;
        let minutes = self.digits(2)?;
        if hours >= 24 || minutes >= 60 {
            return Err(Error::malformed(self.pos, "timestamp offset out of range"));
        }
        let total = (hours * 60 + minutes) as i32;
        Ok(match (negative, total) {
            (true, 0) => None,
            (true, t) => Some(-t),
            (false, t) => Some(t),
        })
    }
}

fn write_offset(f: &mut fmt::Formatter<'_>, offset: Option<i32>) -> fmt::Result {
    match offset {
        None => f.write_str("-00:00"),
        Some(0) => f.write_str("Z"),
        Some(minutes) => {
            let sign = if minutes < 0 { '-' } else { '+' };
            let abs = minutes.abs();
            write!(f, "{sign}{:02}:{:02}", abs / 60, abs % 60)
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.local;
        match self.precision {
            Precision::Year => write!(f, "{:04}T", t.year()),
            Precision::Month => write!(f, "{:04}-{:02}T", t.year(), t.month()),
            Precision::Day => write!(f, "{:04}-{:02}-{:02}", t.year(), t.month(), t.day()),
            Precision::Minute => {
                write!(
                    f,
                    "{:04}-{:02}-{:02}T{:02}:{:02}",
                    t.year(),
                    t.month(),
                    t.day(),
                    t.hour(),
                    t.minute()
                )?;
                write_offset(f, self.offset)
            }
            Precision::Second => {
                write!(
                    f,
                    "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                    t.year(),
                    t.month(),
                    t.day(),
                    t.hour(),
                    t.minute(),
                    t.second()
                )?;
                if self.fraction_digits > 0 {
                    let nanos = format!("{:09}", t.nanosecond() % 1_000_000_000);
                    write!(f, ".{}", &nanos[..usize::from(self.fraction_digits)])?;
                }
                write_offset(f, self.offset)
            }
        }
    }
}

/// An owned Ion value with its annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub annotations: Vec<Symbol>,
    pub value: Value,
}

/// An owned Ion value.
///
/// Struct fields keep their order and may repeat.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A typed null such as `null.int`; `Null(IonType::Null)` is `null.null`.
    Null(IonType),
    Bool(bool),
    Int(Int),
    Float(f64),
    Decimal(Decimal),
    Timestamp(Timestamp),
    Symbol(Symbol),
    String(String),
    Clob(Vec<u8>),
    Blob(Vec<u8>),
    List(Vec<Element>),
    Sexp(Vec<Element>),
    Struct(Vec<(Symbol, Element)>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null(IonType::Null)
    }
}

impl Value {
    #[must_use]
    pub fn ion_type(&self) -> IonType {
        match self {
            Value::Null(t) => *t,
            Value::Bool(_) => IonType::Bool,
            Value::Int(_) => IonType::Int,
            Value::Float(_) => IonType::Float,
            Value::Decimal(_) => IonType::Decimal,
            Value::Timestamp(_) => IonType::Timestamp,
            Value::Symbol(_) => IonType::Symbol,
            Value::String(_) => IonType::String,
            Value::Clob(_) => IonType::Clob,
            Value::Blob(_) => IonType::Blob,
            Value::List(_) => IonType::List,
            Value::Sexp(_) => IonType::Sexp,
            Value::Struct(_) => IonType::Struct,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => i.as_i64(),
            _ => None,
        }
    }

    /// Any numeric value as an `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(i.to_f64()),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }

    /// Text of a string, or of a symbol whose text is known.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ion::{Symbol, Value};
    ///
    /// assert_eq!(Value::String("a".into()).as_str(), Some("a"));
    /// assert_eq!(Value::Symbol(Symbol::from("b")).as_str(), Some("b"));
    /// assert_eq!(Value::Symbol(Symbol::Unknown(12)).as_str(), None);
    /// ```
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Symbol(s) => s.text(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Clob(b) | Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Children of a list or sexp.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Element]> {
        match self {
            Value::List(items) | Value::Sexp(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_struct(&self) -> Option<&[(Symbol, Element)]> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// First struct field named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Element> {
        self.as_struct()?
            .iter()
            .find(|(field, _)| field.is(name))
            .map(|(_, element)| element)
    }
}

impl Element {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Element {
            annotations: Vec::new(),
            value,
        }
    }

    /// Replaces the annotations.
    #[must_use]
    pub fn with_annotations<I, S>(mut self, annotations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        self.annotations = annotations.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn ion_type(&self) -> IonType {
        self.value.ion_type()
    }

    #[must_use]
    pub fn has_annotation(&self, text: &str) -> bool {
        self.annotations.iter().any(|a| a.is(text))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Element> {
        self.value.get(name)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = crate::text_writer::TextWriter::new();
        crate::writer::write_element(&mut writer, self).map_err(|_| fmt::Error)?;
        f.write_str(&writer.into_inner())
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Element::new(value)
    }
}

impl From<bool> for Element {
    fn from(value: bool) -> Self {
        Element::new(Value::Bool(value))
    }
}

impl From<i32> for Element {
    fn from(value: i32) -> Self {
        Element::new(Value::Int(Int::I64(i64::from(value))))
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Element::new(Value::Int(Int::I64(value)))
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Element::new(Value::Float(value))
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::new(Value::String(value.to_string()))
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::new(Value::String(value))
    }
}

impl From<Symbol> for Element {
    fn from(value: Symbol) -> Self {
        Element::new(Value::Symbol(value))
    }
}

impl From<Decimal> for Element {
    fn from(value: Decimal) -> Self {
        Element::new(Value::Decimal(value))
    }
}

impl From<Timestamp> for Element {
    fn from(value: Timestamp) -> Self {
        Element::new(Value::Timestamp(value))
    }
}

impl From<Vec<Element>> for Element {
    fn from(value: Vec<Element>) -> Self {
        Element::new(Value::List(value))
    }
}

impl TryFrom<Element> for i64 {
    type Error = crate::Error;

    fn try_from(element: Element) -> crate::Result<Self> {
        element.value.as_i64().ok_or_else(|| {
            crate::Error::custom(format!("expected int, found {}", element.ion_type()))
        })
    }
}

impl TryFrom<Element> for String {
    type Error = crate::Error;

    fn try_from(element: Element) -> crate::Result<Self> {
        match element.value {
            Value::String(s) | Value::Symbol(Symbol::Text(s)) => Ok(s),
            other => Err(crate::Error::custom(format!(
                "expected text, found {}",
                other.ion_type()
            ))),
        }
    }
}

/// Converts to the closest serde data model. Annotations are dropped,
/// decimals become `f64`, timestamps and unknown symbols become strings.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::{SerializeMap, SerializeSeq};

        match self {
            Value::Null(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(Int::I64(i)) => serializer.serialize_i64(*i),
            Value::Int(Int::Big(b)) => match b.to_u64() {
                Some(u) => serializer.serialize_u64(u),
                None => serializer.serialize_str(&b.to_string()),
            },
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Decimal(d) => serializer.serialize_f64(d.to_f64()),
            Value::Timestamp(t) => serializer.serialize_str(&t.to_string()),
            Value::Symbol(s) => serializer.serialize_str(&s.to_string()),
            Value::String(s) => serializer.serialize_str(s),
            Value::Clob(b) | Value::Blob(b) => serializer.serialize_bytes(b),
            Value::List(items) | Value::Sexp(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(&name.to_string(), value)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Element {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value.serialize(serializer)
    }
}

/// Builds an element from any self-describing serde format. Reading Ion
/// through [`Reader::read_element`](crate::Reader::read_element) keeps
/// annotations and exact types; this path does not.
impl<'de> Deserialize<'de> for Element {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ElementVisitor;

        impl<'de> Visitor<'de> for ElementVisitor {
            type Value = Element;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any Ion value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Element, E> {
                Ok(Element::from(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Element, E> {
                Ok(Element::from(value))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Element, E> {
                Ok(Element::new(Value::Int(Int::from(value))))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Element, E> {
                Ok(Element::from(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Element, E> {
                Ok(Element::from(value))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Element, E> {
                Ok(Element::from(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<Element, E> {
                Ok(Element::new(Value::Blob(value.to_vec())))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<Element, E> {
                Ok(Element::new(Value::Blob(value)))
            }

            fn visit_unit<E>(self) -> std::result::Result<Element, E> {
                Ok(Element::new(Value::default()))
            }

            fn visit_none<E>(self) -> std::result::Result<Element, E> {
                Ok(Element::new(Value::default()))
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Element, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Element, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Element::new(Value::List(items)))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Element, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut fields = Vec::new();
                while let Some((name, value)) = map.next_entry::<String, Element>()? {
                    fields.push((Symbol::Text(name), value));
                }
                Ok(Element::new(Value::Struct(fields)))
            }
        }

        deserializer.deserialize_any(ElementVisitor)
    }
}
