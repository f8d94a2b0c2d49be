//! Cursor over the text encoding.
//!
//! The cursor scans one token per value and records its span; decoding
//! (escapes, digits, base64) waits until [`RawCursor::materialize`]. A
//! container that is never stepped into is skipped by matching delimiters,
//! with quoted text and lobs scanned so that brackets inside them do not
//! count.
//!
//! Input is validated as UTF-8 up front, but an invalid sequence is only
//! reported when the scan reaches it, so everything before it stays
//! readable.
//!
//! ```rust
//! use serde_ion::cursor::{RawCursor, RawEvent, RawScalar, RawSymbol};
//! use serde_ion::text_cursor::TextCursor;
//! use serde_ion::IonType;
//!
//! let mut cursor = TextCursor::new(b"{name: 'Ion', tags: [a, b]}");
//! assert_eq!(cursor.next().unwrap(), Some(RawEvent::Value(IonType::Struct)));
//! cursor.step_in().unwrap();
//! cursor.next().unwrap();
//! assert_eq!(cursor.field_name(), Some(&RawSymbol::Text("name".into())));
//! assert_eq!(
//!     cursor.materialize().unwrap(),
//!     RawScalar::Symbol(RawSymbol::Text("Ion".into()))
//! );
//! ```

use crate::cursor::{RawCursor, RawEvent, RawScalar, RawSymbol};
use crate::error::{Error, Result};
use crate::lexical;
use crate::symbols::VERSION_MARKER_TEXT;
use crate::types::IonType;
use crate::value::{Decimal, Int, Timestamp};
use base64::Engine;
use num_bigint::BigInt;
use std::ops::Range;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct Frame {
    ion_type: IonType,
    /// The closing delimiter has been seen but not consumed.
    closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Null,
    Bool(bool),
    Special(f64),
    Int,
    Float,
    Decimal,
    Timestamp,
    Identifier,
    Operator,
    SymbolId(usize),
    QuotedSymbol(Range<usize>),
    ShortString(Range<usize>),
    LongString(Vec<Range<usize>>),
    Blob(Range<usize>),
    ShortClob(Range<usize>),
    LongClob(Vec<Range<usize>>),
    Container,
}

#[derive(Debug, Clone)]
struct Current {
    ion_type: IonType,
    token: Token,
    start: usize,
    end: usize,
}

/// Walks a text Ion buffer.
pub struct TextCursor<'a> {
    text: &'a str,
    invalid_utf8_at: Option<usize>,
    pos: usize,
    frames: Vec<Frame>,
    current: Option<Current>,
    field: Option<RawSymbol>,
    annotations: Vec<RawSymbol>,
}

const fn closer(ion_type: IonType) -> u8 {
    match ion_type {
        IonType::List => b']',
        IonType::Sexp => b')',
        _ => b'}',
    }
}

fn is_version_marker_like(text: &str) -> bool {
    let Some((major, minor)) = text.strip_prefix("$ion_").and_then(|v| v.split_once('_')) else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(major) && digits(minor)
}

/// Removes underscores, which may only sit between two digits.
fn strip_underscores(text: &str, offset: usize, radix: u32) -> Result<String> {
    let bytes = text.as_bytes();
    let is_digit = |b: Option<&u8>| b.is_some_and(|b| (*b as char).is_digit(radix));
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'_' && !(i > 0 && is_digit(bytes.get(i - 1)) && is_digit(bytes.get(i + 1))) {
            return Err(Error::malformed(offset + i, "misplaced underscore in number"));
        }
    }
    Ok(text.replace('_', ""))
}

impl<'a> TextCursor<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        let (text, invalid_utf8_at) = match std::str::from_utf8(input) {
            Ok(text) => (text, None),
            Err(e) => {
                let valid = &input[..e.valid_up_to()];
                (std::str::from_utf8(valid).unwrap_or_default(), Some(e.valid_up_to()))
            }
        };
        TextCursor {
            text,
            invalid_utf8_at,
            pos: 0,
            frames: Vec::new(),
            current: None,
            field: None,
            annotations: Vec::new(),
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes().get(self.pos + ahead).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.bytes()[self.pos..].starts_with(prefix.as_bytes())
    }

    /// Error for running out of input; points at invalid UTF-8 if that is
    /// what cut the text short.
    fn end_error(&self, msg: &str) -> Error {
        match self.invalid_utf8_at {
            Some(offset) => Error::malformed(offset, "invalid UTF-8"),
            None => Error::malformed(self.pos, msg),
        }
    }

    fn in_frame(&self, ion_type: IonType) -> bool {
        self.frames.last().is_some_and(|f| f.ion_type == ion_type)
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        let bytes = self.bytes();
        loop {
            match bytes.get(self.pos) {
                Some(&b) if lexical::is_whitespace(i32::from(b)) => self.pos += 1,
                Some(b'/') if bytes.get(self.pos + 1) == Some(&b'/') => {
                    match self.text[self.pos..].find('\n') {
                        Some(n) => self.pos += n + 1,
                        None => self.pos = bytes.len(),
                    }
                }
                Some(b'/') if bytes.get(self.pos + 1) == Some(&b'*') => {
                    match self.text[self.pos + 2..].find("*/") {
                        Some(n) => self.pos += n + 4,
                        None => return Err(self.end_error("unterminated block comment")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_identifier(&mut self) -> &'a str {
        let text = self.text;
        let start = self.pos;
        while self.peek().is_some_and(|b| lexical::is_letter_or_digit(i32::from(b))) {
            self.pos += 1;
        }
        &text[start..self.pos]
    }

    /// Scans `"..."` or `'...'` starting at the opening quote and returns the
    /// span between the quotes.
    fn scan_short_quoted(&mut self, quote: u8) -> Result<Range<usize>> {
        let bytes = self.bytes();
        let start = self.pos + 1;
        let mut i = start;
        loop {
            match bytes.get(i) {
                None => {
                    self.pos = i.min(bytes.len());
                    return Err(self.end_error("unterminated quoted text"));
                }
                Some(b'\\') => i += 2,
                Some(b'\n') => return Err(Error::malformed(i, "newline in quoted text")),
                Some(&b) if b == quote => break,
                Some(_) => i += 1,
            }
        }
        self.pos = i + 1;
        Ok(start..i)
    }

    fn scan_long_segment(&mut self) -> Result<Range<usize>> {
        let bytes = self.bytes();
        let start = self.pos + 3;
        let mut i = start;
        loop {
            match bytes.get(i) {
                None => {
                    self.pos = i.min(bytes.len());
                    return Err(self.end_error("unterminated long string"));
                }
                Some(b'\\') => i += 2,
                Some(b'\'') if bytes[i..].starts_with(b"'''") => break,
                Some(_) => i += 1,
            }
        }
        self.pos = i + 3;
        Ok(start..i)
    }

    /// Scans adjacent `'''...'''` segments, which form one value.
    fn scan_long_segments(&mut self) -> Result<Vec<Range<usize>>> {
        let mut segments = vec![self.scan_long_segment()?];
        loop {
            let save = self.pos;
            self.skip_whitespace()?;
            if self.starts_with("'''") {
                segments.push(self.scan_long_segment()?);
            } else {
                self.pos = save;
                return Ok(segments);
            }
        }
    }

    fn expect_lob_close(&mut self) -> Result<()> {
        self.skip_whitespace()?;
        if self.starts_with("}}") {
            self.pos += 2;
            Ok(())
        } else {
            Err(Error::malformed(self.pos, "expected '}}' to close lob"))
        }
    }

    fn scan_lob(&mut self) -> Result<(IonType, Token)> {
        self.pos += 2;
        self.skip_whitespace()?;
        if self.peek() == Some(b'"') {
            let span = self.scan_short_quoted(b'"')?;
            self.expect_lob_close()?;
            return Ok((IonType::Clob, Token::ShortClob(span)));
        }
        if self.starts_with("'''") {
            let segments = self.scan_long_segments()?;
            self.expect_lob_close()?;
            return Ok((IonType::Clob, Token::LongClob(segments)));
        }
        let start = self.pos;
        let length = self.text[start..]
            .find("}}")
            .ok_or_else(|| self.end_error("unterminated blob"))?;
        self.pos = start + length + 2;
        Ok((IonType::Blob, Token::Blob(start..start + length)))
    }

    fn scan_number(&mut self, start: usize) -> (IonType, Token) {
        let bytes = self.bytes();
        while let Some(&b) = bytes.get(self.pos) {
            let comment = b == b'/' && matches!(bytes.get(self.pos + 1), Some(b'/' | b'*'));
            if lexical::is_numeric_terminator(i32::from(b)) || comment {
                break;
            }
            self.pos += 1;
        }
        let token = &self.text[start..self.pos];
        let body = token.strip_prefix('-').unwrap_or(token);
        let b = body.as_bytes();
        let timestamp = !token.starts_with('-')
            && b.len() >= 5
            && b[..4].iter().all(u8::is_ascii_digit)
            && matches!(b[4], b'-' | b'T');
        if timestamp {
            (IonType::Timestamp, Token::Timestamp)
        } else if ["0x", "0X", "0b", "0B"].iter().any(|p| body.starts_with(p)) {
            (IonType::Int, Token::Int)
        } else if body.contains(['e', 'E']) {
            (IonType::Float, Token::Float)
        } else if body.contains(['.', 'd', 'D']) {
            (IonType::Decimal, Token::Decimal)
        } else {
            (IonType::Int, Token::Int)
        }
    }

    fn special_float(&self, prefix: &str) -> bool {
        self.starts_with(prefix)
            && lexical::is_numeric_terminator(self.peek_at(prefix.len()).map_or(lexical::EOF, i32::from))
    }

    fn scan_value(&mut self) -> Result<(IonType, Token)> {
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Err(self.end_error("expected a value"));
        };
        let scanned = match b {
            b'[' => {
                self.pos += 1;
                (IonType::List, Token::Container)
            }
            b'(' => {
                self.pos += 1;
                (IonType::Sexp, Token::Container)
            }
            b'{' if self.peek_at(1) == Some(b'{') => self.scan_lob()?,
            b'{' => {
                self.pos += 1;
                (IonType::Struct, Token::Container)
            }
            b'"' => (IonType::String, Token::ShortString(self.scan_short_quoted(b'"')?)),
            b'\'' if self.starts_with("'''") => {
                (IonType::String, Token::LongString(self.scan_long_segments()?))
            }
            b'\'' => (IonType::Symbol, Token::QuotedSymbol(self.scan_short_quoted(b'\'')?)),
            b'+' if self.special_float("+inf") => {
                self.pos += 4;
                (IonType::Float, Token::Special(f64::INFINITY))
            }
            b'-' if self.special_float("-inf") => {
                self.pos += 4;
                (IonType::Float, Token::Special(f64::NEG_INFINITY))
            }
            b'0'..=b'9' => self.scan_number(start),
            b'-' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number(start),
            b if lexical::is_letter(i32::from(b)) => self.scan_keyword_or_symbol()?,
            b if lexical::is_operator_char(i32::from(b)) && self.in_frame(IonType::Sexp) => {
                while self.peek().is_some_and(|c| lexical::is_operator_char(i32::from(c))) {
                    self.pos += 1;
                }
                (IonType::Symbol, Token::Operator)
            }
            _ => return Err(Error::malformed(start, "unexpected character")),
        };
        Ok(scanned)
    }

    fn scan_keyword_or_symbol(&mut self) -> Result<(IonType, Token)> {
        let identifier = self.scan_identifier();
        Ok(match identifier {
            "null" if self.peek() == Some(b'.') => {
                let dot = self.pos;
                self.pos += 1;
                let name = self.scan_identifier();
                let ion_type = IonType::from_name(name)
                    .ok_or_else(|| Error::malformed(dot + 1, "unknown type in typed null"))?;
                (ion_type, Token::Null)
            }
            "null" => (IonType::Null, Token::Null),
            "true" => (IonType::Bool, Token::Bool(true)),
            "false" => (IonType::Bool, Token::Bool(false)),
            "nan" => (IonType::Float, Token::Special(f64::NAN)),
            _ => match lexical::parse_symbol_id(identifier) {
                Some(id) => {
                    let id = usize::try_from(id)
                        .map_err(|_| Error::malformed(self.pos, "symbol id out of range"))?;
                    (IonType::Symbol, Token::SymbolId(id))
                }
                None => (IonType::Symbol, Token::Identifier),
            },
        })
    }

    fn read_field_name(&mut self) -> Result<()> {
        let name = match self.peek() {
            Some(b'"') => {
                let span = self.scan_short_quoted(b'"')?;
                RawSymbol::Text(lexical::unescape(&self.text[span.clone()], span.start)?)
            }
            Some(b'\'') if self.starts_with("'''") => {
                let segments = self.scan_long_segments()?;
                RawSymbol::Text(self.join_segments(&segments)?)
            }
            Some(b'\'') => {
                let span = self.scan_short_quoted(b'\'')?;
                RawSymbol::Text(lexical::unescape(&self.text[span.clone()], span.start)?)
            }
            Some(b) if lexical::is_letter(i32::from(b)) => {
                let identifier = self.scan_identifier();
                match lexical::parse_symbol_id(identifier).and_then(|id| usize::try_from(id).ok()) {
                    Some(id) => RawSymbol::Id(id),
                    None => RawSymbol::Text(identifier.to_string()),
                }
            }
            None => return Err(self.end_error("expected a field name")),
            Some(_) => return Err(Error::malformed(self.pos, "expected a field name")),
        };
        self.skip_whitespace()?;
        if self.peek() != Some(b':') || self.starts_with("::") {
            return Err(Error::malformed(self.pos, "expected ':' after field name"));
        }
        self.pos += 1;
        self.skip_whitespace()?;
        self.field = Some(name);
        Ok(())
    }

    fn read_annotations(&mut self) -> Result<()> {
        loop {
            let save = self.pos;
            let candidate = match self.peek() {
                Some(b'\'') if !self.starts_with("'''") => {
                    let span = self.scan_short_quoted(b'\'')?;
                    Some((span, true))
                }
                Some(b) if lexical::is_letter(i32::from(b)) => {
                    self.scan_identifier();
                    Some((save..self.pos, false))
                }
                _ => None,
            };
            let Some((span, quoted)) = candidate else {
                return Ok(());
            };
            self.skip_whitespace()?;
            if !self.starts_with("::") {
                self.pos = save;
                return Ok(());
            }
            let text = &self.text[span.clone()];
            let symbol = if quoted {
                RawSymbol::Text(lexical::unescape(text, span.start)?)
            } else {
                match lexical::parse_symbol_id(text).and_then(|id| usize::try_from(id).ok()) {
                    Some(id) => RawSymbol::Id(id),
                    None => RawSymbol::Text(text.to_string()),
                }
            };
            self.annotations.push(symbol);
            self.pos += 2;
            self.skip_whitespace()?;
        }
    }

    /// Consumes the separator after a value inside a list or struct.
    fn after_value(&mut self) -> Result<()> {
        let Some(frame) = self.frames.last().copied() else {
            return Ok(());
        };
        if frame.ion_type == IonType::Sexp {
            return Ok(());
        }
        self.skip_whitespace()?;
        match self.peek() {
            Some(b',') => {
                self.pos += 1;
                Ok(())
            }
            Some(b) if b == closer(frame.ion_type) => Ok(()),
            None => Err(self.end_error("unterminated container")),
            Some(_) => Err(Error::malformed(self.pos, "expected ',' between values")),
        }
    }

    /// Skips to just past the delimiter that closes a container whose body
    /// starts at the current position.
    fn skip_container(&mut self, close: u8) -> Result<()> {
        let mut expected = vec![close];
        while let Some(&want) = expected.last() {
            self.skip_whitespace()?;
            let Some(b) = self.peek() else {
                return Err(self.end_error("unterminated container"));
            };
            match b {
                b'[' => {
                    expected.push(b']');
                    self.pos += 1;
                }
                b'(' => {
                    expected.push(b')');
                    self.pos += 1;
                }
                b'{' if self.peek_at(1) == Some(b'{') => {
                    self.scan_lob()?;
                }
                b'{' => {
                    expected.push(b'}');
                    self.pos += 1;
                }
                b']' | b')' | b'}' => {
                    if b != want {
                        return Err(Error::malformed(self.pos, "mismatched closing delimiter"));
                    }
                    expected.pop();
                    self.pos += 1;
                }
                b'"' => {
                    self.scan_short_quoted(b'"')?;
                }
                b'\'' if self.starts_with("'''") => {
                    self.scan_long_segment()?;
                }
                b'\'' => {
                    self.scan_short_quoted(b'\'')?;
                }
                b if b >= 0x80 => {
                    return Err(Error::malformed(self.pos, "non-ASCII character outside quoted text"))
                }
                _ => self.pos += 1,
            }
        }
        Ok(())
    }

    fn finish_current(&mut self) -> Result<()> {
        let Some(current) = self.current.take() else {
            return Ok(());
        };
        self.pos = current.end;
        if current.token == Token::Container {
            self.skip_container(closer(current.ion_type))?;
        }
        self.after_value()
    }

    fn current(&self) -> Result<&Current> {
        self.current
            .as_ref()
            .ok_or_else(|| Error::invalid_state("not positioned on a value"))
    }

    fn join_segments(&self, segments: &[Range<usize>]) -> Result<String> {
        let mut out = String::new();
        for span in segments {
            out.push_str(&lexical::unescape(&self.text[span.clone()], span.start)?);
        }
        Ok(out)
    }

    fn parse_int(&self, text: &str, offset: usize) -> Result<Int> {
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (radix, digits, digits_at) = match body.get(..2) {
            Some("0x" | "0X") => (16, &body[2..], 2),
            Some("0b" | "0B") => (2, &body[2..], 2),
            _ => (10, body, 0),
        };
        let digits_offset = offset + usize::from(negative) + digits_at;
        if digits.is_empty() || !digits.bytes().all(|b| b == b'_' || (b as char).is_digit(radix)) {
            return Err(Error::malformed(digits_offset, "invalid integer"));
        }
        if radix == 10 && digits.len() > 1 && digits.starts_with('0') {
            return Err(Error::malformed(digits_offset, "leading zero in integer"));
        }
        let digits = strip_underscores(digits, digits_offset, radix)?;
        let signed = if negative { format!("-{digits}") } else { digits };
        if let Ok(value) = i64::from_str_radix(&signed, radix) {
            return Ok(Int::I64(value));
        }
        BigInt::parse_bytes(signed.as_bytes(), radix)
            .map(Int::from)
            .ok_or_else(|| Error::malformed(offset, "invalid integer"))
    }

    fn parse_float(text: &str, offset: usize) -> Result<f64> {
        let body = text.strip_prefix('-').unwrap_or(text);
        let valid = body.bytes().next().is_some_and(|b| b.is_ascii_digit())
            && body.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-' | b'_'));
        if !valid {
            return Err(Error::malformed(offset, "invalid float"));
        }
        strip_underscores(text, offset, 10)?
            .parse()
            .map_err(|_| Error::malformed(offset, "invalid float"))
    }

    fn decode_blob(&self, span: &Range<usize>) -> Result<Vec<u8>> {
        let mut compact = String::with_capacity(span.len());
        for (i, ch) in self.text[span.clone()].char_indices() {
            let code = ch as i32;
            if lexical::is_base64_char(code) || ch == '=' {
                compact.push(ch);
            } else if !lexical::is_whitespace(code) {
                return Err(Error::malformed(span.start + i, "invalid character in blob"));
            }
        }
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| Error::malformed(span.start, &format!("invalid base64: {e}")))
    }
}

impl RawCursor for TextCursor<'_> {
    fn next(&mut self) -> Result<Option<RawEvent>> {
        self.finish_current()?;
        self.field = None;
        self.annotations.clear();
        if self.frames.last().is_some_and(|f| f.closed) {
            return Ok(None);
        }
        self.skip_whitespace()?;
        let Some(b) = self.peek() else {
            if !self.frames.is_empty() {
                return Err(self.end_error("unterminated container"));
            }
            if let Some(offset) = self.invalid_utf8_at {
                return Err(Error::malformed(offset, "invalid UTF-8"));
            }
            return Ok(None);
        };
        if let Some(frame) = self.frames.last_mut() {
            if b == closer(frame.ion_type) {
                frame.closed = true;
                return Ok(None);
            }
        }
        if matches!(b, b']' | b')' | b'}') {
            return Err(Error::malformed(self.pos, "unexpected closing delimiter"));
        }
        if self.in_frame(IonType::Struct) {
            self.read_field_name()?;
        }
        self.read_annotations()?;
        let start = self.pos;
        let (ion_type, token) = self.scan_value()?;
        if self.frames.is_empty() && self.annotations.is_empty() && token == Token::Identifier {
            let text = &self.text[start..self.pos];
            if text == VERSION_MARKER_TEXT {
                trace!(offset = start, "text version marker");
                return Ok(Some(RawEvent::VersionMarker));
            }
            if is_version_marker_like(text) {
                return Err(Error::malformed(start, "unsupported Ion version"));
            }
        }
        self.current = Some(Current {
            ion_type,
            token,
            start,
            end: self.pos,
        });
        Ok(Some(RawEvent::Value(ion_type)))
    }

    fn step_in(&mut self) -> Result<()> {
        let current = self.current()?;
        if current.token != Token::Container {
            return Err(Error::invalid_state("step_in requires a non-null container"));
        }
        let frame = Frame {
            ion_type: current.ion_type,
            closed: false,
        };
        self.pos = current.end;
        self.frames.push(frame);
        self.current = None;
        self.field = None;
        self.annotations.clear();
        Ok(())
    }

    fn step_out(&mut self) -> Result<()> {
        let frame = *self
            .frames
            .last()
            .ok_or_else(|| Error::invalid_state("step_out at depth 0"))?;
        if let Some(current) = self.current.take() {
            self.pos = current.end;
            if current.token == Token::Container {
                self.skip_container(closer(current.ion_type))?;
            }
        }
        if frame.closed {
            self.pos += 1;
        } else {
            self.skip_container(closer(frame.ion_type))?;
        }
        self.frames.pop();
        self.field = None;
        self.annotations.clear();
        self.after_value()
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }

    fn ion_type(&self) -> Option<IonType> {
        self.current.as_ref().map(|c| c.ion_type)
    }

    fn is_null(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.token == Token::Null)
    }

    fn field_name(&self) -> Option<&RawSymbol> {
        self.current.as_ref().and(self.field.as_ref())
    }

    fn annotations(&self) -> &[RawSymbol] {
        &self.annotations
    }

    fn materialize(&self) -> Result<RawScalar> {
        let current = self.current()?;
        let (start, text) = (current.start, &self.text[current.start..current.end]);
        let scalar = match &current.token {
            Token::Null | Token::Container => {
                return Err(Error::invalid_state("no scalar value at the current position"))
            }
            Token::Bool(b) => RawScalar::Bool(*b),
            Token::Special(f) => RawScalar::Float(*f),
            Token::Int => RawScalar::Int(self.parse_int(text, start)?),
            Token::Float => RawScalar::Float(Self::parse_float(text, start)?),
            Token::Decimal => {
                let cleaned = strip_underscores(text, start, 10)?;
                RawScalar::Decimal(Decimal::parse(&cleaned).map_err(|e| e.at_offset(start))?)
            }
            Token::Timestamp => {
                RawScalar::Timestamp(Timestamp::parse(text).map_err(|e| e.at_offset(start))?)
            }
            Token::Identifier | Token::Operator => {
                RawScalar::Symbol(RawSymbol::Text(text.to_string()))
            }
            Token::SymbolId(id) => RawScalar::Symbol(RawSymbol::Id(*id)),
            Token::QuotedSymbol(span) => RawScalar::Symbol(RawSymbol::Text(lexical::unescape(
                &self.text[span.clone()],
                span.start,
            )?)),
            Token::ShortString(span) => {
                RawScalar::String(lexical::unescape(&self.text[span.clone()], span.start)?)
            }
            Token::LongString(segments) => RawScalar::String(self.join_segments(segments)?),
            Token::Blob(span) => RawScalar::Bytes(self.decode_blob(span)?),
            Token::ShortClob(span) => {
                RawScalar::Bytes(lexical::unescape_clob(&self.text[span.clone()], span.start)?)
            }
            Token::LongClob(segments) => {
                let mut bytes = Vec::new();
                for span in segments {
                    bytes.extend(lexical::unescape_clob(&self.text[span.clone()], span.start)?);
                }
                RawScalar::Bytes(bytes)
            }
        };
        Ok(scalar)
    }

    fn offset(&self) -> usize {
        self.current.as_ref().map_or(self.pos, |c| c.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalars(input: &str) -> Vec<RawScalar> {
        let mut cursor = TextCursor::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(event) = cursor.next().unwrap() {
            if matches!(event, RawEvent::Value(_)) && !cursor.is_null() {
                out.push(cursor.materialize().unwrap());
            }
        }
        out
    }

    fn text(s: &str) -> RawSymbol {
        RawSymbol::Text(s.to_string())
    }

    #[test]
    fn test_numbers() {
        let values = scalars("0 -7 1_000 0x1F -0b101 1.5 1.5e0 -2e-1 +inf -inf 9223372036854775808 nan");
        assert_eq!(
            values[..11],
            [
                RawScalar::Int(Int::I64(0)),
                RawScalar::Int(Int::I64(-7)),
                RawScalar::Int(Int::I64(1000)),
                RawScalar::Int(Int::I64(31)),
                RawScalar::Int(Int::I64(-5)),
                RawScalar::Decimal(Decimal::new(15, -1)),
                RawScalar::Float(1.5),
                RawScalar::Float(-0.2),
                RawScalar::Float(f64::INFINITY),
                RawScalar::Float(f64::NEG_INFINITY),
                RawScalar::Int(Int::from(9_223_372_036_854_775_808u64)),
            ]
        );
        assert!(matches!(values[11], RawScalar::Float(f) if f.is_nan()));
    }

    #[test]
    fn test_text_and_symbols() {
        assert_eq!(
            scalars(r#"foo 'quoted sym' $10 "a\tb" '''long ''' '''joined''' true"#),
            vec![
                RawScalar::Symbol(text("foo")),
                RawScalar::Symbol(text("quoted sym")),
                RawScalar::Symbol(RawSymbol::Id(10)),
                RawScalar::String("a\tb".to_string()),
                RawScalar::String("long joined".to_string()),
                RawScalar::Bool(true),
            ]
        );
    }

    #[test]
    fn test_lobs_and_timestamps() {
        assert_eq!(
            scalars(r#"{{AQID}} {{ "hi\n" }} {{'''a''' '''b'''}} {{}} 2007-02-23T12:14Z 2007T"#),
            vec![
                RawScalar::Bytes(vec![1, 2, 3]),
                RawScalar::Bytes(b"hi\n".to_vec()),
                RawScalar::Bytes(b"ab".to_vec()),
                RawScalar::Bytes(Vec::new()),
                RawScalar::Timestamp(Timestamp::parse("2007-02-23T12:14Z").unwrap()),
                RawScalar::Timestamp(Timestamp::parse("2007T").unwrap()),
            ]
        );
    }

    #[test]
    fn test_typed_nulls() {
        let mut cursor = TextCursor::new(b"null null.int null.struct null.null");
        let mut seen = Vec::new();
        while let Some(RawEvent::Value(t)) = cursor.next().unwrap() {
            assert!(cursor.is_null());
            seen.push(t);
        }
        assert_eq!(
            seen,
            vec![IonType::Null, IonType::Int, IonType::Struct, IonType::Null]
        );
        assert!(TextCursor::new(b"null.widget").next().is_err());
    }

    #[test]
    fn test_nested_traversal_with_early_step_out() {
        let mut cursor = TextCursor::new(b"[1, 2, [3, 4]] after");
        assert_eq!(cursor.next().unwrap(), Some(RawEvent::Value(IonType::List)));
        cursor.step_in().unwrap();
        assert_eq!(cursor.next().unwrap(), Some(RawEvent::Value(IonType::Int)));
        assert_eq!(cursor.depth(), 1);
        cursor.step_out().unwrap();
        assert_eq!(cursor.depth(), 0);
        assert_eq!(cursor.next().unwrap(), Some(RawEvent::Value(IonType::Symbol)));
        assert_eq!(cursor.materialize().unwrap(), RawScalar::Symbol(text("after")));
        assert_eq!(cursor.next().unwrap(), None);
    }

    #[test]
    fn test_skip_matches_scan() {
        let input = b"[1, \"]\", {a: (x ')' [y])}, {{\"}\"}}] 42";
        let mut skipped = TextCursor::new(input);
        skipped.next().unwrap();
        assert_eq!(skipped.next().unwrap(), Some(RawEvent::Value(IonType::Int)));

        let mut scanned = TextCursor::new(input);
        scanned.next().unwrap();
        scanned.step_in().unwrap();
        let mut children = 0;
        while scanned.next().unwrap().is_some() {
            children += 1;
        }
        scanned.step_out().unwrap();
        assert_eq!(children, 4);
        assert_eq!(scanned.next().unwrap(), Some(RawEvent::Value(IonType::Int)));
        assert_eq!(scanned.materialize().unwrap(), skipped.materialize().unwrap());
    }

    #[test]
    fn test_struct_fields() {
        let mut cursor = TextCursor::new(br#"{a: 1, 'b c': 2, "d": 3, $4: 4,}"#);
        cursor.next().unwrap();
        cursor.step_in().unwrap();
        let mut names = Vec::new();
        while cursor.next().unwrap().is_some() {
            names.push(cursor.field_name().cloned().unwrap());
        }
        assert_eq!(names, vec![text("a"), text("b c"), text("d"), RawSymbol::Id(4)]);
        cursor.step_out().unwrap();
        assert_eq!(cursor.next().unwrap(), None);
    }

    #[test]
    fn test_annotations() {
        let mut cursor = TextCursor::new(b"a::'b'::$7::[1] plain ann :: 2");
        cursor.next().unwrap();
        assert_eq!(cursor.annotations(), &[text("a"), text("b"), RawSymbol::Id(7)]);
        cursor.next().unwrap();
        assert!(cursor.annotations().is_empty());
        cursor.next().unwrap();
        assert_eq!(cursor.annotations(), &[text("ann")]);
        assert_eq!(cursor.materialize().unwrap(), RawScalar::Int(Int::I64(2)));
    }

    #[test]
    fn test_sexp_operators() {
        let mut cursor = TextCursor::new(b"(a + -1 >= - b)");
        cursor.next().unwrap();
        cursor.step_in().unwrap();
        let mut items = Vec::new();
        while cursor.next().unwrap().is_some() {
            items.push(cursor.materialize().unwrap());
        }
        assert_eq!(
            items,
            vec![
                RawScalar::Symbol(text("a")),
                RawScalar::Symbol(text("+")),
                RawScalar::Int(Int::I64(-1)),
                RawScalar::Symbol(text(">=")),
                RawScalar::Symbol(text("-")),
                RawScalar::Symbol(text("b")),
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            scalars("// line\n1 /* block */ 2 // trailing"),
            vec![RawScalar::Int(Int::I64(1)), RawScalar::Int(Int::I64(2))]
        );
    }

    #[test]
    fn test_version_marker() {
        let mut cursor = TextCursor::new(b"$ion_1_0 a::$ion_1_0 '$ion_1_0'");
        assert_eq!(cursor.next().unwrap(), Some(RawEvent::VersionMarker));
        assert_eq!(cursor.next().unwrap(), Some(RawEvent::Value(IonType::Symbol)));
        assert_eq!(cursor.next().unwrap(), Some(RawEvent::Value(IonType::Symbol)));
        assert!(TextCursor::new(b"$ion_2_0").next().unwrap_err().is_data_error());
    }

    #[test]
    fn test_malformed() {
        for input in ["[1 2]", "[1, 2", "{a 1}", "(1, 2)", "]", "\"open", "/* open", "[1,,2]"] {
            let mut cursor = TextCursor::new(input.as_bytes());
            let mut result = Ok(());
            for _ in 0..8 {
                match cursor.next() {
                    Ok(Some(RawEvent::Value(t))) if t.is_container() => {
                        if let Err(e) = cursor.step_in() {
                            result = Err(e);
                            break;
                        }
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
            assert!(result.is_err_and(|e| e.is_data_error()), "{input}");
        }
    }

    #[test]
    fn test_materialize_errors_are_lazy() {
        let mut cursor = TextCursor::new(b"\"bad \\q escape\" 01 1__0 next");
        cursor.next().unwrap();
        assert!(cursor.materialize().unwrap_err().is_data_error());
        cursor.next().unwrap();
        assert!(cursor.materialize().is_err());
        cursor.next().unwrap();
        assert!(cursor.materialize().is_err());
        cursor.next().unwrap();
        assert_eq!(cursor.materialize().unwrap(), RawScalar::Symbol(text("next")));
    }

    #[test]
    fn test_invalid_utf8_reported_late() {
        let mut input = b"1 2 ".to_vec();
        input.push(0xFF);
        let mut cursor = TextCursor::new(&input);
        assert!(cursor.next().unwrap().is_some());
        assert!(cursor.next().unwrap().is_some());
        let err = cursor.next().unwrap_err();
        assert_eq!(err, Error::malformed(4, "invalid UTF-8"));
    }
}
