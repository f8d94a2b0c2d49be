//! Configuration for readers and writers.
//!
//! - [`Format`]: which of the two encodings to produce or expect
//! - [`ReaderOptions`]: forced source format and shared symbol table catalog
//! - [`WriterOptions`]: output encoding and text layout
//!
//! ## Examples
//!
//! ```rust
//! use serde_ion::{to_string_with_options, Format, WriterOptions};
//!
//! let options = WriterOptions::pretty().with_indent(4);
//! let text = to_string_with_options(&vec![1, 2], options).unwrap();
//! assert_eq!(text, "[\n    1,\n    2\n]");
//!
//! assert_eq!(WriterOptions::binary().format, Format::Binary);
//! ```

use crate::symbols::Catalog;
use std::fmt;
use std::rc::Rc;

/// Wire encoding of an Ion stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Binary,
}

impl Format {
    /// Picks the encoding of `input` from its first byte.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ion::Format;
    ///
    /// assert_eq!(Format::detect(&[0xE0, 0x01, 0x00, 0xEA]), Format::Binary);
    /// assert_eq!(Format::detect(b"{a:1}"), Format::Text);
    /// assert_eq!(Format::detect(b""), Format::Text);
    /// ```
    #[must_use]
    pub fn detect(input: &[u8]) -> Format {
        match input.first() {
            Some(0xE0) => Format::Binary,
            _ => Format::Text,
        }
    }
}

/// Options for [`Reader`](crate::Reader).
#[derive(Clone, Default)]
pub struct ReaderOptions {
    /// Skips format detection when set.
    pub source_format: Option<Format>,
    /// Shared symbol tables available to import declarations.
    pub catalog: Option<Rc<dyn Catalog>>,
}

impl fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("source_format", &self.source_format)
            .field("catalog", &self.catalog.as_ref().map(|_| "<catalog>"))
            .finish()
    }
}

impl ReaderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.source_format = Some(format);
        self
    }

    /// Sets the catalog consulted for imported symbol tables.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ion::{ReaderOptions, SharedSymbolTable, SimpleCatalog};
    /// use std::rc::Rc;
    ///
    /// let catalog = SimpleCatalog::new()
    ///     .with_table(SharedSymbolTable::new("colors", 1, ["red", "green"]));
    /// let options = ReaderOptions::new().with_catalog(Rc::new(catalog));
    /// assert!(options.catalog.is_some());
    /// ```
    #[must_use]
    pub fn with_catalog(mut self, catalog: Rc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }
}

/// Options for serializing and for the writers.
#[derive(Clone, Debug, PartialEq)]
pub struct WriterOptions {
    pub format: Format,
    /// Only affects text output.
    pub pretty: bool,
    pub indent: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            format: Format::Text,
            pretty: false,
            indent: 2,
        }
    }
}

impl WriterOptions {
    /// Compact text output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text output with one child per line.
    #[must_use]
    pub fn pretty() -> Self {
        WriterOptions {
            pretty: true,
            ..Default::default()
        }
    }

    /// Binary output.
    #[must_use]
    pub fn binary() -> Self {
        WriterOptions {
            format: Format::Binary,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the number of spaces per nesting level in pretty output.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}
