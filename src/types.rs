//! The closed set of Ion value types.

use std::fmt;

/// The type of an Ion value.
///
/// Every predicate is an exhaustive match, so adding a variant forces each
/// call site to be revisited.
///
/// # Examples
///
/// ```rust
/// use serde_ion::IonType;
///
/// assert!(IonType::List.is_container());
/// assert!(IonType::Decimal.is_numeric());
/// assert!(IonType::Symbol.is_text());
/// assert_eq!(IonType::Blob.name(), "blob");
/// assert_eq!(IonType::from_name("sexp"), Some(IonType::Sexp));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IonType {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Timestamp,
    Symbol,
    String,
    Clob,
    Blob,
    List,
    Sexp,
    Struct,
}

impl IonType {
    /// All types, ordered by binary type code.
    pub const ALL: [IonType; 13] = [
        IonType::Null,
        IonType::Bool,
        IonType::Int,
        IonType::Float,
        IonType::Decimal,
        IonType::Timestamp,
        IonType::Symbol,
        IonType::String,
        IonType::Clob,
        IonType::Blob,
        IonType::List,
        IonType::Sexp,
        IonType::Struct,
    ];

    /// The binary type code (high nibble of the type descriptor byte).
    ///
    /// Negative integers use code 3; this returns the positive code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            IonType::Null => 0x0,
            IonType::Bool => 0x1,
            IonType::Int => 0x2,
            IonType::Float => 0x4,
            IonType::Decimal => 0x5,
            IonType::Timestamp => 0x6,
            IonType::Symbol => 0x7,
            IonType::String => 0x8,
            IonType::Clob => 0x9,
            IonType::Blob => 0xA,
            IonType::List => 0xB,
            IonType::Sexp => 0xC,
            IonType::Struct => 0xD,
        }
    }

    /// The name used in `null.<name>`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            IonType::Null => "null",
            IonType::Bool => "bool",
            IonType::Int => "int",
            IonType::Float => "float",
            IonType::Decimal => "decimal",
            IonType::Timestamp => "timestamp",
            IonType::Symbol => "symbol",
            IonType::String => "string",
            IonType::Clob => "clob",
            IonType::Blob => "blob",
            IonType::List => "list",
            IonType::Sexp => "sexp",
            IonType::Struct => "struct",
        }
    }

    /// Looks a type up by its `null.<name>` spelling.
    #[must_use]
    pub fn from_name(name: &str) -> Option<IonType> {
        IonType::ALL.into_iter().find(|t| t.name() == name)
    }

    #[inline]
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, IonType::List | IonType::Sexp | IonType::Struct)
    }

    #[inline]
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        !self.is_container()
    }

    /// Types whose values can be read as a number.
    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, IonType::Int | IonType::Float | IonType::Decimal)
    }

    /// Types whose values carry Unicode text.
    #[inline]
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, IonType::Symbol | IonType::String)
    }

    /// Types whose values carry raw bytes.
    #[inline]
    #[must_use]
    pub const fn is_lob(self) -> bool {
        matches!(self, IonType::Clob | IonType::Blob)
    }
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for t in IonType::ALL {
            assert_eq!(IonType::from_name(t.name()), Some(t));
        }
        assert_eq!(IonType::from_name("integer"), None);
    }

    #[test]
    fn test_predicates_partition() {
        for t in IonType::ALL {
            assert_ne!(t.is_container(), t.is_scalar());
            if t.is_numeric() || t.is_text() || t.is_lob() {
                assert!(t.is_scalar());
            }
        }
    }

    #[test]
    fn test_codes_are_ordered() {
        let codes: Vec<u8> = IonType::ALL.iter().map(|t| t.code()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        assert_eq!(codes, sorted);
    }
}
