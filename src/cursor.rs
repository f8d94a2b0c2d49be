//! The raw cursor interface shared by the binary and text encodings.
//!
//! A raw cursor walks one buffer value by value. It knows nothing about
//! symbol tables: symbols come out as [`RawSymbol`]s, either an id or text,
//! and version markers are reported as events instead of being applied.
//! [`Reader`](crate::Reader) layers symbol resolution on top.
//!
//! Cursors keep O(depth) state: one frame per open container, plus the
//! header of the current value. Scalars are decoded only when
//! [`RawCursor::materialize`] is called.

use crate::error::Result;
use crate::types::IonType;
use crate::value::{Decimal, Int, Timestamp};

/// A symbol as it appears in the stream, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSymbol {
    Id(usize),
    Text(String),
}

/// What [`RawCursor::next`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    /// An Ion version marker at the top level.
    VersionMarker,
    /// A value of the given type (possibly a typed null).
    Value(IonType),
}

/// A decoded non-null scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum RawScalar {
    Bool(bool),
    Int(Int),
    Float(f64),
    Decimal(Decimal),
    Timestamp(Timestamp),
    Symbol(RawSymbol),
    String(String),
    /// Contents of a blob or clob.
    Bytes(Vec<u8>),
}

/// A forward-only cursor over a fully buffered Ion stream.
pub trait RawCursor {
    /// Moves to the next value at the current depth.
    ///
    /// Skips whatever is left of the current value. Returns `Ok(None)` when
    /// the current container (or the stream) has no more values.
    fn next(&mut self) -> Result<Option<RawEvent>>;

    /// Enters the current container. Fails with `InvalidState` if the cursor
    /// is not on a non-null container.
    fn step_in(&mut self) -> Result<()>;

    /// Leaves the current container, skipping any unread children. Fails
    /// with `InvalidState` at depth 0.
    fn step_out(&mut self) -> Result<()>;

    fn depth(&self) -> usize;

    /// Type of the current value, `None` when not positioned on one.
    fn ion_type(&self) -> Option<IonType>;

    fn is_null(&self) -> bool;

    /// Field name of the current value; `Some` only inside a struct.
    fn field_name(&self) -> Option<&RawSymbol>;

    fn annotations(&self) -> &[RawSymbol];

    /// Decodes the current scalar. Fails with `InvalidState` for nulls and
    /// containers, and with `MalformedInput` if the encoded bytes are bad.
    fn materialize(&self) -> Result<RawScalar>;

    /// Byte offset of the current value, or of the read position when not
    /// positioned on a value.
    fn offset(&self) -> usize;
}
