//! Symbol tables, shared table imports and the catalog interface.
//!
//! Every symbol in a binary stream, and every `$<n>` symbol in a text
//! stream, is an integer id resolved against the *active* symbol table:
//!
//! ```text
//! id 1..=9     system symbols ($ion, $ion_1_0, $ion_symbol_table, ...)
//! next ids     each import contributes exactly max_id slots
//! remaining    the stream's own `symbols` list, in order
//! ```
//!
//! Slots an import declares but the catalog cannot fill stay in place with no
//! text, so later ids keep their positions. Resolving such a slot yields
//! [`Symbol::Unknown`] rather than an error. Only id 0 is an error.
//!
//! ```rust
//! use serde_ion::{Symbol, SymbolTable};
//!
//! let system = SymbolTable::system();
//! assert_eq!(system.max_id(), 9);
//! assert_eq!(system.resolve(3).unwrap(), Symbol::from("$ion_symbol_table"));
//! assert_eq!(system.resolve(42).unwrap(), Symbol::Unknown(42));
//! assert!(system.resolve(0).is_err());
//! ```

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};

/// Text of the system symbols; id `n` is at index `n - 1`.
pub const SYSTEM_SYMBOLS: [&str; 9] = [
    "$ion",
    "$ion_1_0",
    "$ion_symbol_table",
    "name",
    "version",
    "imports",
    "symbols",
    "max_id",
    "$ion_shared_symbol_table",
];

/// Ids of the system symbols.
pub mod sid {
    pub const ION: usize = 1;
    pub const ION_1_0: usize = 2;
    pub const ION_SYMBOL_TABLE: usize = 3;
    pub const NAME: usize = 4;
    pub const VERSION: usize = 5;
    pub const IMPORTS: usize = 6;
    pub const SYMBOLS: usize = 7;
    pub const MAX_ID: usize = 8;
    pub const ION_SHARED_SYMBOL_TABLE: usize = 9;
}

/// The text of the version marker symbol.
pub const VERSION_MARKER_TEXT: &str = "$ion_1_0";

/// The annotation that marks a struct as a symbol table declaration.
pub const SYMBOL_TABLE_ANNOTATION: &str = "$ion_symbol_table";

/// A resolved symbol: either its text or, when the active table has no text
/// for it, the id it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    Text(String),
    Unknown(usize),
}

impl Symbol {
    /// Returns the symbol's text if it is known.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Symbol::Text(text) => Some(text),
            Symbol::Unknown(_) => None,
        }
    }

    /// Returns the id of a symbol whose text is unknown.
    #[must_use]
    pub fn unknown_id(&self) -> Option<usize> {
        match self {
            Symbol::Text(_) => None,
            Symbol::Unknown(id) => Some(*id),
        }
    }

    /// Returns `true` if this symbol's text is `text`.
    #[must_use]
    pub fn is(&self, text: &str) -> bool {
        self.text() == Some(text)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Text(text) => f.write_str(text),
            Symbol::Unknown(id) => write!(f, "${id}"),
        }
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol::Text(value.to_string())
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Symbol::Text(value)
    }
}

/// A named, versioned table of symbols that streams import by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSymbolTable {
    name: String,
    version: u32,
    symbols: Vec<Option<String>>,
}

impl SharedSymbolTable {
    /// Creates a shared table. Versions below 1 are treated as 1.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ion::SharedSymbolTable;
    ///
    /// let table = SharedSymbolTable::new("com.example.fruit", 2, ["apple", "pear"]);
    /// assert_eq!(table.max_id(), 2);
    /// ```
    pub fn new<I, S>(name: &str, version: u32, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SharedSymbolTable {
            name: name.to_string(),
            version: version.max(1),
            symbols: symbols.into_iter().map(|s| Some(s.into())).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn max_id(&self) -> usize {
        self.symbols.len()
    }

    /// Text of the table's symbols, in id order.
    #[must_use]
    pub fn symbols(&self) -> &[Option<String>] {
        &self.symbols
    }
}

/// One entry of a symbol table's `imports` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDescriptor {
    pub name: String,
    pub version: u32,
    pub max_id: Option<usize>,
}

impl ImportDescriptor {
    pub fn new(name: &str, version: u32, max_id: Option<usize>) -> Self {
        ImportDescriptor {
            name: name.to_string(),
            version: version.max(1),
            max_id,
        }
    }
}

/// Source of shared symbol tables, consulted while building local tables.
pub trait Catalog {
    /// Finds the table `name` at `version`, or the best available version.
    fn lookup(&self, name: &str, version: u32) -> Option<&SharedSymbolTable>;
}

/// An in-memory [`Catalog`].
///
/// When the requested version is missing, the highest available version is
/// returned.
#[derive(Debug, Clone, Default)]
pub struct SimpleCatalog {
    tables: HashMap<String, BTreeMap<u32, SharedSymbolTable>>,
}

impl SimpleCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any table with the same name and version.
    pub fn insert(&mut self, table: SharedSymbolTable) {
        self.tables
            .entry(table.name.clone())
            .or_default()
            .insert(table.version, table);
    }

    /// Builder-style [`SimpleCatalog::insert`].
    #[must_use]
    pub fn with_table(mut self, table: SharedSymbolTable) -> Self {
        self.insert(table);
        self
    }
}

impl Catalog for SimpleCatalog {
    fn lookup(&self, name: &str, version: u32) -> Option<&SharedSymbolTable> {
        let versions = self.tables.get(name)?;
        versions
            .get(&version)
            .or_else(|| versions.values().next_back())
    }
}

/// The symbol table active for part of a stream.
///
/// Reader-side tables are built from the stream and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    imports: Vec<ImportDescriptor>,
    symbols: Vec<Option<String>>,
    ids: IndexMap<String, usize>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::system()
    }
}

impl SymbolTable {
    /// Builds the system symbol table.
    #[must_use]
    pub fn system() -> Self {
        let mut table = SymbolTable {
            imports: Vec::new(),
            symbols: Vec::with_capacity(SYSTEM_SYMBOLS.len()),
            ids: IndexMap::with_capacity(SYSTEM_SYMBOLS.len()),
        };
        for text in SYSTEM_SYMBOLS {
            table.push(Some(text.to_string()));
        }
        table
    }

    /// Builds a local table from an import list and the stream's own symbols.
    ///
    /// Imports of `$ion` are ignored (the system table is always first). Each
    /// remaining import reserves `max_id` slots; if `max_id` is not declared
    /// the catalog's table must match the requested version exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] (offset 0, relative to the
    /// declaration) for an import with no `max_id` that the catalog cannot
    /// satisfy exactly.
    pub fn local<I>(
        imports: &[ImportDescriptor],
        symbols: I,
        catalog: Option<&dyn Catalog>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut table = Self::system();
        for import in imports.iter().filter(|i| i.name != "$ion") {
            let shared = catalog.and_then(|c| c.lookup(&import.name, import.version));
            let max_id = match (import.max_id, shared) {
                (Some(max_id), _) => max_id,
                (None, Some(found)) if found.version == import.version => found.max_id(),
                (None, _) => {
                    return Err(Error::malformed(
                        0,
                        &format!(
                            "import {} version {} has no max_id and no exact catalog match",
                            import.name, import.version
                        ),
                    ))
                }
            };
            match shared {
                Some(found) if found.version != import.version || found.max_id() < max_id => {
                    warn!(
                        name = %import.name,
                        version = import.version,
                        found_version = found.version,
                        "shared symbol table only partially satisfies import"
                    );
                }
                None => warn!(
                    name = %import.name,
                    version = import.version,
                    "shared symbol table not found in catalog"
                ),
                _ => {}
            }
            for slot in 0..max_id {
                let text = shared.and_then(|s| s.symbols.get(slot).cloned().flatten());
                table.push(text);
            }
            table.imports.push(ImportDescriptor {
                max_id: Some(max_id),
                ..import.clone()
            });
        }
        for text in symbols {
            table.push(text);
        }
        debug!(
            imports = table.imports.len(),
            max_id = table.max_id(),
            "built local symbol table"
        );
        Ok(table)
    }

    /// Returns a copy of this table with `symbols` appended.
    #[must_use]
    pub fn appended<I>(&self, symbols: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut table = self.clone();
        for text in symbols {
            table.push(text);
        }
        table
    }

    fn push(&mut self, text: Option<String>) {
        let id = self.symbols.len() + 1;
        if let Some(text) = &text {
            self.ids.entry(text.clone()).or_insert(id);
        }
        self.symbols.push(text);
    }

    /// Adds `text` if it is not present and returns its id.
    pub(crate) fn intern(&mut self, text: &str) -> usize {
        if let Some(id) = self.ids.get(text) {
            return *id;
        }
        self.push(Some(text.to_string()));
        self.symbols.len()
    }

    /// Highest id defined by this table.
    #[must_use]
    pub fn max_id(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if this is the plain system table.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.imports.is_empty() && self.symbols.len() == SYSTEM_SYMBOLS.len()
    }

    /// The resolved imports, each with its effective `max_id`.
    #[must_use]
    pub fn imports(&self) -> &[ImportDescriptor] {
        &self.imports
    }

    /// Symbols after the system symbols and imports, in id order.
    #[must_use]
    pub fn local_symbols(&self) -> &[Option<String>] {
        let imported: usize = self.imports.iter().filter_map(|i| i.max_id).sum();
        let start = (SYSTEM_SYMBOLS.len() + imported).min(self.symbols.len());
        &self.symbols[start..]
    }

    /// Returns the text for `id`, if the table has any.
    #[must_use]
    pub fn text_for(&self, id: usize) -> Option<&str> {
        id.checked_sub(1)
            .and_then(|index| self.symbols.get(index))
            .and_then(|text| text.as_deref())
    }

    /// Returns the lowest id whose text is `text`.
    #[must_use]
    pub fn id_for(&self, text: &str) -> Option<usize> {
        self.ids.get(text).copied()
    }

    /// Resolves an id to a [`Symbol`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSymbol`] for id 0.
    pub fn resolve(&self, id: usize) -> Result<Symbol> {
        if id == 0 {
            return Err(Error::UnknownSymbol(0));
        }
        Ok(match self.text_for(id) {
            Some(text) => Symbol::Text(text.to_string()),
            None => Symbol::Unknown(id),
        })
    }
}
