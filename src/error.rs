//! Error types for Ion encoding, decoding and cursor traversal.
//!
//! Errors fall into two families:
//!
//! - **Data errors**: the input bytes or text violate the Ion grammar
//!   ([`Error::MalformedInput`]). These are fatal to the reader that hit them.
//! - **Programmer errors**: a value does not fit the requested encoding
//!   ([`Error::EncodingOverflow`], [`Error::InvalidInput`]), an operation was
//!   called in a state that forbids it ([`Error::InvalidState`]), or symbol id
//!   zero was dereferenced ([`Error::UnknownSymbol`]).
//!
//! Symbol ids that have no known text are *not* errors; they surface as
//! [`Symbol::Unknown`](crate::Symbol::Unknown).
//!
//! ## Examples
//!
//! ```rust
//! use serde_ion::{numeric, Error};
//!
//! let mut out = Vec::new();
//! let err = numeric::encode_fixed_uint(&mut out, 256, 1).unwrap_err();
//! assert!(matches!(err, Error::EncodingOverflow { .. }));
//! assert!(out.is_empty());
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors raised by the codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A value needs more bytes than the fixed width it was asked to fit in.
    #[error("value {value} does not fit in {length} byte(s)")]
    EncodingOverflow { value: String, length: usize },

    /// A value handed to an encoder is not representable (e.g. a non-integral
    /// number for an integer encoding). Nothing was written.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The source bytes or text violate the grammar at `offset`.
    #[error("malformed input at offset {offset}: {msg}")]
    MalformedInput { offset: usize, msg: String },

    /// An operation was called in a state that forbids it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Symbol id zero was dereferenced.
    #[error("symbol id {0} has no text and cannot be resolved")]
    UnknownSymbol(usize),

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates an overflow error for `value` not fitting in `length` bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ion::Error;
    ///
    /// let err = Error::overflow(256, 1);
    /// assert!(err.to_string().contains("1 byte"));
    /// ```
    pub fn overflow<T: fmt::Display>(value: T, length: usize) -> Self {
        Error::EncodingOverflow {
            value: value.to_string(),
            length,
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(msg: &str) -> Self {
        Error::InvalidInput(msg.to_string())
    }

    /// Creates a malformed input error at a byte offset.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ion::Error;
    ///
    /// let err = Error::malformed(12, "unterminated list");
    /// assert!(err.to_string().contains("offset 12"));
    /// ```
    pub fn malformed(offset: usize, msg: &str) -> Self {
        Error::MalformedInput {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(msg: &str) -> Self {
        Error::InvalidState(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Shifts the offset of a malformed input error by `base`.
    ///
    /// Decoders report offsets relative to the slice they were handed; cursors
    /// use this to translate them into buffer offsets.
    #[must_use]
    pub fn at_offset(self, base: usize) -> Self {
        match self {
            Error::MalformedInput { offset, msg } => Error::MalformedInput {
                offset: offset + base,
                msg,
            },
            other => other,
        }
    }

    /// Returns `true` for errors caused by the data rather than the caller.
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        matches!(self, Error::MalformedInput { .. })
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_is_data_error() {
        assert!(Error::malformed(0, "bad").is_data_error());
        assert!(!Error::invalid_state("depth 0").is_data_error());
        assert!(!Error::UnknownSymbol(0).is_data_error());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::overflow(256, 1).to_string(),
            "value 256 does not fit in 1 byte(s)"
        );
        assert!(Error::UnknownSymbol(0).to_string().contains("symbol id 0"));
    }
}
