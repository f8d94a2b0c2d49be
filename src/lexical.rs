//! Character classification and escaping for the Ion text syntax.
//!
//! Classification works on `i32` code points so the tokenizer can pass
//! pseudo-characters alongside real ones: [`EOF`], the two comment
//! placeholders and the escaped-newline placeholder all live below zero.
//! Real characters at or above 128 belong to no class.
//!
//! ## Escaping
//!
//! Quoted text uses one canonical escape per character:
//!
//! ```text
//! \0  \b  \t  \n  \r  \"  \'  \\
//! \xHH        below U+0100
//! \uHHHH      below U+10000
//! \UHHHHHHHH  everything else
//! ```
//!
//! ```rust
//! use serde_ion::lexical::escape_string;
//!
//! assert_eq!(escape_string("tab\there"), "tab\\there");
//! assert_eq!(escape_string("caf\u{e9}"), "caf\\xE9");
//! assert_eq!(escape_string("plain"), "plain");
//! ```

use crate::error::{Error, Result};
use std::borrow::Cow;

/// End of input.
pub const EOF: i32 = -1;
/// Placeholder for a `// line` comment.
pub const WHITESPACE_COMMENT1: i32 = -2;
/// Placeholder for a `/* block */` comment.
pub const WHITESPACE_COMMENT2: i32 = -3;
/// Placeholder for a backslash-newline inside long strings.
pub const ESCAPED_NEWLINE: i32 = -4;

const LETTER: u8 = 1;
const DIGIT: u8 = 1 << 1;
const OPERATOR: u8 = 1 << 2;
const WHITESPACE: u8 = 1 << 3;
const BASE64: u8 = 1 << 4;
const HEX_DIGIT: u8 = 1 << 5;
const NUMERIC_TERMINATOR: u8 = 1 << 6;

const LETTERS: &[u8] = b"_$abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const OPERATORS: &[u8] = b"!#%&*+-./;<=>?@^`|~";
const WHITESPACE_CHARS: &[u8] = b" \t\r\n\x0b\x0c";
const BASE64_CHARS: &[u8] = b"+/0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const HEX_DIGITS: &[u8] = b"0123456789abcdefABCDEF";
const NUMERIC_TERMINATORS: &[u8] = b"{}[](),\"' \t\n\r\x0c";

const fn mark(mut table: [u8; 128], chars: &[u8], flag: u8) -> [u8; 128] {
    let mut i = 0;
    while i < chars.len() {
        table[chars[i] as usize] |= flag;
        i += 1;
    }
    table
}

const fn build_table() -> [u8; 128] {
    let table = [0u8; 128];
    let table = mark(table, LETTERS, LETTER);
    let table = mark(table, DIGITS, DIGIT);
    let table = mark(table, OPERATORS, OPERATOR);
    let table = mark(table, WHITESPACE_CHARS, WHITESPACE);
    let table = mark(table, BASE64_CHARS, BASE64);
    let table = mark(table, HEX_DIGITS, HEX_DIGIT);
    mark(table, NUMERIC_TERMINATORS, NUMERIC_TERMINATOR)
}

static CLASSES: [u8; 128] = build_table();

#[inline]
fn flags(ch: i32) -> u8 {
    if (0..128).contains(&ch) {
        CLASSES[ch as usize]
    } else {
        0
    }
}

/// The character classes a code point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharClass {
    pub letter: bool,
    pub digit: bool,
    pub letter_or_digit: bool,
    pub operator: bool,
    pub whitespace: bool,
    pub base64: bool,
    pub hex_digit: bool,
    pub numeric_terminator: bool,
}

/// Classifies a code point (or pseudo-character) in one table lookup.
///
/// # Examples
///
/// ```rust
/// use serde_ion::lexical::{classify, WHITESPACE_COMMENT1};
///
/// let class = classify('f' as i32);
/// assert!(class.letter && class.hex_digit && class.base64);
/// assert!(!class.operator);
/// assert!(classify(WHITESPACE_COMMENT1).whitespace);
/// ```
#[must_use]
pub fn classify(ch: i32) -> CharClass {
    let f = flags(ch);
    CharClass {
        letter: f & LETTER != 0,
        digit: f & DIGIT != 0,
        letter_or_digit: f & (LETTER | DIGIT) != 0,
        operator: f & OPERATOR != 0,
        whitespace: is_whitespace(ch),
        base64: f & BASE64 != 0,
        hex_digit: f & HEX_DIGIT != 0,
        numeric_terminator: is_numeric_terminator(ch),
    }
}

#[inline]
#[must_use]
pub fn is_letter(ch: i32) -> bool {
    flags(ch) & LETTER != 0
}

#[inline]
#[must_use]
pub fn is_digit(ch: i32) -> bool {
    flags(ch) & DIGIT != 0
}

#[inline]
#[must_use]
pub fn is_letter_or_digit(ch: i32) -> bool {
    flags(ch) & (LETTER | DIGIT) != 0
}

/// Characters that may form unquoted operator symbols inside s-expressions.
#[inline]
#[must_use]
pub fn is_operator_char(ch: i32) -> bool {
    flags(ch) & OPERATOR != 0
}

/// Real whitespace plus the comment and escaped-newline placeholders.
#[inline]
#[must_use]
pub fn is_whitespace(ch: i32) -> bool {
    match ch {
        WHITESPACE_COMMENT1 | WHITESPACE_COMMENT2 | ESCAPED_NEWLINE => true,
        _ => flags(ch) & WHITESPACE != 0,
    }
}

#[inline]
#[must_use]
pub fn is_base64_char(ch: i32) -> bool {
    flags(ch) & BASE64 != 0
}

#[inline]
#[must_use]
pub fn is_hex_digit(ch: i32) -> bool {
    flags(ch) & HEX_DIGIT != 0
}

/// Characters that may legally follow a bare numeric token.
#[inline]
#[must_use]
pub fn is_numeric_terminator(ch: i32) -> bool {
    ch == EOF || flags(ch) & NUMERIC_TERMINATOR != 0
}

/// Returns `true` if `ch` must be escaped inside quoted text.
#[inline]
#[must_use]
pub fn needs_escape(ch: u32) -> bool {
    ch < 0x20 || ch > 0x7E || ch == u32::from(b'"') || ch == u32::from(b'\'') || ch == u32::from(b'\\')
}

/// Returns the canonical escape sequence for `ch`.
///
/// # Examples
///
/// ```rust
/// use serde_ion::lexical::escape_sequence;
///
/// assert_eq!(escape_sequence('\n'), "\\n");
/// assert_eq!(escape_sequence('\u{7f}'), "\\x7F");
/// assert_eq!(escape_sequence('\u{20ac}'), "\\u20AC");
/// assert_eq!(escape_sequence('\u{1d11e}'), "\\U0001D11E");
/// ```
#[must_use]
pub fn escape_sequence(ch: char) -> Cow<'static, str> {
    match ch {
        '\0' => Cow::Borrowed("\\0"),
        '\u{8}' => Cow::Borrowed("\\b"),
        '\t' => Cow::Borrowed("\\t"),
        '\n' => Cow::Borrowed("\\n"),
        '\r' => Cow::Borrowed("\\r"),
        '"' => Cow::Borrowed("\\\""),
        '\'' => Cow::Borrowed("\\'"),
        '\\' => Cow::Borrowed("\\\\"),
        c if (c as u32) < 0x100 => Cow::Owned(format!("\\x{:02X}", c as u32)),
        c if (c as u32) < 0x10000 => Cow::Owned(format!("\\u{:04X}", c as u32)),
        c => Cow::Owned(format!("\\U{:08X}", c as u32)),
    }
}

/// Rewrites `s` with every escape-needing character replaced by its escape
/// sequence. Strings that need no escaping are returned borrowed.
#[must_use]
pub fn escape_string(s: &str) -> Cow<'_, str> {
    let Some(first) = s.char_indices().find(|(_, c)| needs_escape(*c as u32)) else {
        return Cow::Borrowed(s);
    };
    let mut out = String::with_capacity(s.len() + 8);
    out.push_str(&s[..first.0]);
    for ch in s[first.0..].chars() {
        if needs_escape(ch as u32) {
            out.push_str(&escape_sequence(ch));
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

/// Escapes clob content, which must be ASCII.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for bytes above `0x7F`.
pub fn escape_clob(bytes: &[u8]) -> Result<String> {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        let escaped = match b {
            0x00 => "\\0",
            0x07 => "\\a",
            0x08 => "\\b",
            0x09 => "\\t",
            0x0A => "\\n",
            0x0B => "\\v",
            0x0C => "\\f",
            0x0D => "\\r",
            b'"' => "\\\"",
            b'\'' => "\\'",
            b'/' => "\\/",
            b'?' => "\\?",
            b'\\' => "\\\\",
            0x80..=0xFF => {
                return Err(Error::InvalidInput(format!(
                    "clob byte 0x{b:02X} is not ASCII"
                )))
            }
            b if b < 0x20 || b == 0x7F => {
                out.push_str(&format!("\\x{b:02X}"));
                continue;
            }
            b => {
                out.push(b as char);
                continue;
            }
        };
        out.push_str(escaped);
    }
    Ok(out)
}

fn hex_value(text: &str, offset: usize) -> Result<u32> {
    if !text.bytes().all(|b| is_hex_digit(i32::from(b))) {
        return Err(Error::malformed(offset, "invalid hex digits in escape"));
    }
    u32::from_str_radix(text, 16).map_err(|_| Error::malformed(offset, "invalid hex escape"))
}

enum Escaped {
    Char(u32),
    Nothing,
}

/// Decodes the escape starting right after a backslash at `bytes[pos]`.
/// Returns the decoded value and the number of bytes consumed.
fn decode_escape(text: &str, pos: usize, base: usize) -> Result<(Escaped, usize)> {
    let bytes = text.as_bytes();
    let Some(&kind) = bytes.get(pos) else {
        return Err(Error::malformed(base + pos, "unterminated escape sequence"));
    };
    let simple = |c: u8| Ok((Escaped::Char(u32::from(c)), 1));
    match kind {
        b'0' => simple(0),
        b'a' => simple(0x07),
        b'b' => simple(0x08),
        b't' => simple(b'\t'),
        b'n' => simple(b'\n'),
        b'v' => simple(0x0B),
        b'f' => simple(0x0C),
        b'r' => simple(b'\r'),
        b'"' | b'\'' | b'/' | b'?' | b'\\' => simple(kind),
        b'\n' => Ok((Escaped::Nothing, 1)),
        b'\r' if bytes.get(pos + 1) == Some(&b'\n') => Ok((Escaped::Nothing, 2)),
        b'\r' => Ok((Escaped::Nothing, 1)),
        b'x' | b'u' | b'U' => {
            let width = match kind {
                b'x' => 2,
                b'u' => 4,
                _ => 8,
            };
            let digits = text
                .get(pos + 1..pos + 1 + width)
                .ok_or_else(|| Error::malformed(base + pos, "truncated hex escape"))?;
            Ok((Escaped::Char(hex_value(digits, base + pos)?), 1 + width))
        }
        _ => Err(Error::malformed(base + pos, "unknown escape sequence")),
    }
}

/// Decodes the body of a quoted string or symbol.
///
/// `base` is the offset of `text` in the source and is only used for error
/// positions.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for unknown escapes, bad hex digits or
/// escapes that do not name a Unicode scalar value.
pub fn unescape(text: &str, base: usize) -> Result<String> {
    if !text.contains('\\') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut pending_high: Option<u32> = None;
    let mut run_start = 0;
    let mut pos = 0;
    let bytes = text.as_bytes();
    while pos < bytes.len() {
        if bytes[pos] != b'\\' {
            pos += 1;
            continue;
        }
        out.push_str(&text[run_start..pos]);
        let (escaped, used) = decode_escape(text, pos + 1, base)?;
        if let Escaped::Char(code) = escaped {
            match (pending_high.take(), code) {
                (None, 0xD800..=0xDBFF) => pending_high = Some(code),
                (Some(high), 0xDC00..=0xDFFF) => {
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
                    out.push(to_char(combined, base + pos)?);
                }
                (Some(_), _) => return Err(Error::malformed(base + pos, "unpaired surrogate")),
                (None, code) => out.push(to_char(code, base + pos)?),
            }
        }
        pos += 1 + used;
        run_start = pos;
        if pending_high.is_some() && bytes.get(pos) != Some(&b'\\') {
            return Err(Error::malformed(base + pos, "unpaired surrogate"));
        }
    }
    if pending_high.is_some() {
        return Err(Error::malformed(base + pos, "unpaired surrogate"));
    }
    out.push_str(&text[run_start..]);
    Ok(out)
}

/// Decodes the body of a quoted clob segment into bytes.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for non-ASCII characters, Unicode
/// escapes, or any escape [`unescape`] would reject.
pub fn unescape_clob(text: &str, base: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let b = bytes[pos];
        if b > 0x7F {
            return Err(Error::malformed(base + pos, "clob text must be ASCII"));
        }
        if b != b'\\' {
            out.push(b);
            pos += 1;
            continue;
        }
        if matches!(bytes.get(pos + 1), Some(b'u') | Some(b'U')) {
            return Err(Error::malformed(base + pos, "unicode escape in clob"));
        }
        let (escaped, used) = decode_escape(text, pos + 1, base)?;
        if let Escaped::Char(code) = escaped {
            // \xHH is the widest escape allowed here, so this always fits.
            out.push(code as u8);
        }
        pos += 1 + used;
    }
    Ok(out)
}

fn to_char(code: u32, offset: usize) -> Result<char> {
    char::from_u32(code).ok_or_else(|| Error::malformed(offset, "escape is not a Unicode scalar value"))
}

/// Returns `true` for text that forms a bare identifier.
#[must_use]
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.bytes();
    match chars.next() {
        Some(first) if is_letter(i32::from(first)) => {
            chars.all(|b| is_letter_or_digit(i32::from(b)))
        }
        _ => false,
    }
}

/// Returns `true` for text made only of operator characters.
#[must_use]
pub fn is_operator_symbol(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| is_operator_char(i32::from(b)))
}

/// Returns `true` for identifiers the grammar reserves for other values.
#[must_use]
pub fn is_keyword(s: &str) -> bool {
    matches!(s, "null" | "true" | "false" | "nan")
}

/// Parses `$<digits>` symbol id syntax.
#[must_use]
pub fn parse_symbol_id(s: &str) -> Option<u64> {
    let digits = s.strip_prefix('$')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Returns `true` if a symbol with this text must be written in single quotes.
///
/// # Examples
///
/// ```rust
/// use serde_ion::lexical::symbol_needs_quotes;
///
/// assert!(!symbol_needs_quotes("foo"));
/// assert!(!symbol_needs_quotes("$"));
/// assert!(symbol_needs_quotes("123abc"));
/// assert!(symbol_needs_quotes("true"));
/// assert!(symbol_needs_quotes("$10"));
/// assert!(symbol_needs_quotes(""));
/// ```
#[must_use]
pub fn symbol_needs_quotes(s: &str) -> bool {
    !is_identifier(s) || is_keyword(s) || parse_symbol_id(s).is_some()
}
