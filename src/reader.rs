//! The format-independent reader.
//!
//! [`Reader`] picks a cursor for the input (binary if the first byte is
//! `0xE0`, text otherwise) and hides the stream's system values from the
//! caller:
//!
//! - a version marker at the top level resets the active symbol table to
//!   the system table;
//! - a top-level struct annotated only with `$ion_symbol_table` installs a
//!   new local symbol table and is never surfaced.
//!
//! Field names, annotations and symbol values come out resolved against the
//! active table. Scalars are decoded on first access and cached until the
//! reader moves.
//!
//! ```rust
//! use serde_ion::{IonType, Reader, Symbol};
//!
//! let mut reader = Reader::new(b"$ion_symbol_table::{symbols:[\"color\"]} {$10: red}");
//! assert_eq!(reader.next().unwrap(), Some(IonType::Struct));
//! reader.step_in().unwrap();
//! reader.next().unwrap();
//! assert_eq!(reader.field_name().unwrap(), Some(Symbol::from("color")));
//! assert_eq!(reader.string_value().unwrap().as_deref(), Some("red"));
//! ```

use crate::binary_cursor::BinaryCursor;
use crate::cursor::{RawCursor, RawEvent, RawScalar, RawSymbol};
use crate::error::{Error, Result};
use crate::options::{Format, ReaderOptions};
use crate::symbols::{Catalog, ImportDescriptor, Symbol, SymbolTable, SYMBOL_TABLE_ANNOTATION};
use crate::text_cursor::TextCursor;
use crate::types::IonType;
use crate::value::{Decimal, Element, Int, Timestamp, Value};
use std::rc::Rc;
use tracing::debug;

/// Where a [`Reader`] is in its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    BeforeFirstValue,
    /// On a value, or just past a container that was stepped out of.
    AtValue,
    InsideContainerBeforeFirstChild,
    AfterLastValueInContainer,
    AtEndOfStream,
    /// Malformed input was found; every further call fails.
    Error,
}

enum ImportsDecl {
    None,
    Append,
    List(Vec<ImportDescriptor>),
}

struct PartialContainer {
    ion_type: IonType,
    annotations: Vec<Symbol>,
    field: Option<Symbol>,
    children: Vec<(Option<Symbol>, Element)>,
}

impl PartialContainer {
    fn into_element(self, offset: usize) -> Result<Element> {
        let value = match self.ion_type {
            IonType::Struct => Value::Struct(
                self.children
                    .into_iter()
                    .map(|(name, child)| {
                        name.map(|n| (n, child))
                            .ok_or_else(|| Error::malformed(offset, "struct field without a name"))
                    })
                    .collect::<Result<_>>()?,
            ),
            IonType::Sexp => Value::Sexp(self.children.into_iter().map(|(_, c)| c).collect()),
            _ => Value::List(self.children.into_iter().map(|(_, c)| c).collect()),
        };
        Ok(Element {
            annotations: self.annotations,
            value,
        })
    }
}

/// Reads Ion values from a fully buffered binary or text stream.
pub struct Reader<'a> {
    cursor: Box<dyn RawCursor + 'a>,
    format: Format,
    symbols: SymbolTable,
    catalog: Option<Rc<dyn Catalog>>,
    state: ReaderState,
    cache: Option<RawScalar>,
}

impl<'a> Reader<'a> {
    /// Creates a reader, detecting the format from the first byte.
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_options(input, ReaderOptions::default())
    }

    pub fn with_options(input: &'a [u8], options: ReaderOptions) -> Self {
        let format = options
            .source_format
            .unwrap_or_else(|| Format::detect(input));
        let cursor: Box<dyn RawCursor + 'a> = match format {
            Format::Binary => Box::new(BinaryCursor::new(input)),
            Format::Text => Box::new(TextCursor::new(input)),
        };
        Reader {
            cursor,
            format,
            symbols: SymbolTable::system(),
            catalog: options.catalog,
            state: ReaderState::BeforeFirstValue,
            cache: None,
        }
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    #[must_use]
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// The symbol table currently in effect.
    #[must_use]
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    fn check_usable(&self) -> Result<()> {
        if self.state == ReaderState::Error {
            return Err(Error::invalid_state(
                "reader stopped after malformed input",
            ));
        }
        Ok(())
    }

    /// Records data errors as fatal and hands the error back.
    fn fail(&mut self, err: Error) -> Error {
        if err.is_data_error() {
            self.state = ReaderState::Error;
        }
        err
    }

    fn resolve(&self, raw: &RawSymbol) -> Result<Symbol> {
        match raw {
            RawSymbol::Text(text) => Ok(Symbol::Text(text.clone())),
            RawSymbol::Id(id) => self.symbols.resolve(*id),
        }
    }

    fn resolve_text(&self, raw: Option<&RawSymbol>) -> Option<String> {
        raw.and_then(|r| self.resolve(r).ok())
            .and_then(|s| match s {
                Symbol::Text(text) => Some(text),
                Symbol::Unknown(_) => None,
            })
    }

    fn is_symbol_table(&self) -> bool {
        match self.cursor.annotations() {
            [only] => self.resolve_text(Some(only)).as_deref() == Some(SYMBOL_TABLE_ANNOTATION),
            _ => false,
        }
    }

    /// Moves to the next user value at the current depth.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for grammar violations (after which
    /// the reader is unusable) and [`Error::InvalidState`] once it is.
    pub fn next(&mut self) -> Result<Option<IonType>> {
        self.check_usable()?;
        self.cache = None;
        loop {
            let event = match self.cursor.next() {
                Ok(event) => event,
                Err(e) => return Err(self.fail(e)),
            };
            match event {
                None => {
                    self.state = if self.cursor.depth() == 0 {
                        ReaderState::AtEndOfStream
                    } else {
                        ReaderState::AfterLastValueInContainer
                    };
                    return Ok(None);
                }
                Some(RawEvent::VersionMarker) => {
                    debug!(offset = self.cursor.offset(), "version marker, resetting symbol table");
                    self.symbols = SymbolTable::system();
                }
                Some(RawEvent::Value(ion_type)) => {
                    if self.cursor.depth() == 0
                        && ion_type == IonType::Struct
                        && !self.cursor.is_null()
                        && self.is_symbol_table()
                    {
                        if let Err(e) = self.load_symbol_table() {
                            return Err(self.fail(e));
                        }
                        continue;
                    }
                    self.state = ReaderState::AtValue;
                    return Ok(Some(ion_type));
                }
            }
        }
    }

    fn load_symbol_table(&mut self) -> Result<()> {
        let offset = self.cursor.offset();
        self.cursor.step_in()?;
        let mut imports = None;
        let mut symbols = None;
        while let Some(RawEvent::Value(ion_type)) = self.cursor.next()? {
            match self.resolve_text(self.cursor.field_name()).as_deref() {
                Some("imports") => {
                    if imports.is_some() {
                        return Err(Error::malformed(offset, "duplicate imports field"));
                    }
                    imports = Some(self.read_imports(ion_type)?);
                }
                Some("symbols") => {
                    if symbols.is_some() {
                        return Err(Error::malformed(offset, "duplicate symbols field"));
                    }
                    symbols = Some(self.read_symbol_list(ion_type)?);
                }
                _ => {}
            }
        }
        self.cursor.step_out()?;

        let symbols = symbols.unwrap_or_default();
        let count = symbols.len();
        let catalog = self.catalog.as_deref();
        self.symbols = match imports.unwrap_or(ImportsDecl::None) {
            ImportsDecl::Append => self.symbols.appended(symbols),
            ImportsDecl::None => SymbolTable::local(&[], symbols, catalog)?,
            ImportsDecl::List(list) => {
                SymbolTable::local(&list, symbols, catalog).map_err(|e| e.at_offset(offset))?
            }
        };
        debug!(
            symbols = count,
            imports = self.symbols.imports().len(),
            max_id = self.symbols.max_id(),
            "installed local symbol table"
        );
        Ok(())
    }

    fn read_imports(&mut self, ion_type: IonType) -> Result<ImportsDecl> {
        if self.cursor.is_null() {
            return Ok(ImportsDecl::None);
        }
        match ion_type {
            IonType::Symbol => {
                let RawScalar::Symbol(raw) = self.cursor.materialize()? else {
                    return Ok(ImportsDecl::None);
                };
                Ok(match self.resolve_text(Some(&raw)) {
                    Some(name) if name == SYMBOL_TABLE_ANNOTATION => ImportsDecl::Append,
                    Some(name) => ImportsDecl::List(vec![ImportDescriptor::new(&name, 1, None)]),
                    None => ImportsDecl::None,
                })
            }
            IonType::List => {
                let mut list = Vec::new();
                self.cursor.step_in()?;
                while let Some(RawEvent::Value(child)) = self.cursor.next()? {
                    if child == IonType::Struct && !self.cursor.is_null() {
                        if let Some(import) = self.read_import()? {
                            list.push(import);
                        }
                    }
                }
                self.cursor.step_out()?;
                Ok(ImportsDecl::List(list))
            }
            _ => Ok(ImportsDecl::None),
        }
    }

    fn read_import(&mut self) -> Result<Option<ImportDescriptor>> {
        let (mut name, mut version, mut max_id) = (None, 1, None);
        self.cursor.step_in()?;
        while let Some(RawEvent::Value(ion_type)) = self.cursor.next()? {
            if self.cursor.is_null() {
                continue;
            }
            let field = self.resolve_text(self.cursor.field_name());
            match (field.as_deref(), ion_type) {
                (Some("name"), IonType::String) => {
                    if let RawScalar::String(text) = self.cursor.materialize()? {
                        name = Some(text);
                    }
                }
                (Some("version"), IonType::Int) => {
                    if let RawScalar::Int(v) = self.cursor.materialize()? {
                        version = v.as_i64().and_then(|v| u32::try_from(v).ok()).unwrap_or(1).max(1);
                    }
                }
                (Some("max_id"), IonType::Int) => {
                    if let RawScalar::Int(v) = self.cursor.materialize()? {
                        max_id = v.as_i64().and_then(|v| usize::try_from(v).ok());
                    }
                }
                _ => {}
            }
        }
        self.cursor.step_out()?;
        Ok(name
            .filter(|n| !n.is_empty())
            .map(|n| ImportDescriptor::new(&n, version, max_id)))
    }

    fn read_symbol_list(&mut self, ion_type: IonType) -> Result<Vec<Option<String>>> {
        let mut symbols = Vec::new();
        if ion_type != IonType::List || self.cursor.is_null() {
            return Ok(symbols);
        }
        self.cursor.step_in()?;
        while let Some(RawEvent::Value(child)) = self.cursor.next()? {
            let text = match (child, self.cursor.is_null()) {
                (IonType::String, false) => match self.cursor.materialize()? {
                    RawScalar::String(text) => Some(text),
                    _ => None,
                },
                _ => None,
            };
            symbols.push(text);
        }
        self.cursor.step_out()?;
        Ok(symbols)
    }

    /// Enters the current container.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] unless positioned on a non-null list, sexp or
    /// struct.
    pub fn step_in(&mut self) -> Result<()> {
        self.check_usable()?;
        if self.state != ReaderState::AtValue {
            return Err(Error::invalid_state("step_in requires a current value"));
        }
        match self.cursor.step_in() {
            Ok(()) => {
                self.cache = None;
                self.state = ReaderState::InsideContainerBeforeFirstChild;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Leaves the current container, skipping its unread children.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] at depth 0.
    pub fn step_out(&mut self) -> Result<()> {
        self.check_usable()?;
        match self.cursor.step_out() {
            Ok(()) => {
                self.cache = None;
                self.state = ReaderState::AtValue;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.cursor.depth()
    }

    /// Type of the current value.
    #[must_use]
    pub fn ion_type(&self) -> Option<IonType> {
        match self.state {
            ReaderState::AtValue => self.cursor.ion_type(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.state == ReaderState::AtValue && self.cursor.is_null()
    }

    /// Field name of the current value; `None` outside structs.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSymbol`] if the field name is symbol id 0.
    pub fn field_name(&self) -> Result<Option<Symbol>> {
        self.check_usable()?;
        if self.ion_type().is_none() {
            return Ok(None);
        }
        self.cursor.field_name().map(|raw| self.resolve(raw)).transpose()
    }

    /// Annotations of the current value, in order.
    pub fn annotations(&self) -> Result<Vec<Symbol>> {
        self.check_usable()?;
        self.cursor
            .annotations()
            .iter()
            .map(|raw| self.resolve(raw))
            .collect()
    }

    fn scalar(&mut self) -> Result<Option<&RawScalar>> {
        self.check_usable()?;
        let Some(ion_type) = self.ion_type() else {
            return Ok(None);
        };
        if self.cursor.is_null() || ion_type.is_container() || ion_type == IonType::Null {
            return Ok(None);
        }
        if self.cache.is_none() {
            match self.cursor.materialize() {
                Ok(scalar) => self.cache = Some(scalar),
                Err(e) => return Err(self.fail(e)),
            }
        }
        Ok(self.cache.as_ref())
    }

    pub fn bool_value(&mut self) -> Result<Option<bool>> {
        Ok(match self.scalar()? {
            Some(RawScalar::Bool(b)) => Some(*b),
            _ => None,
        })
    }

    pub fn int_value(&mut self) -> Result<Option<Int>> {
        Ok(match self.scalar()? {
            Some(RawScalar::Int(i)) => Some(i.clone()),
            _ => None,
        })
    }

    /// Integer value as `i64`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the integer does not fit.
    pub fn i64_value(&mut self) -> Result<Option<i64>> {
        match self.scalar()? {
            Some(RawScalar::Int(i)) => i
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::InvalidInput(format!("integer {i} does not fit in i64"))),
            _ => Ok(None),
        }
    }

    /// Float value; other numeric types give `None`.
    pub fn f64_value(&mut self) -> Result<Option<f64>> {
        Ok(match self.scalar()? {
            Some(RawScalar::Float(f)) => Some(*f),
            _ => None,
        })
    }

    /// Any int, float or decimal as an `f64`.
    pub fn number_value(&mut self) -> Result<Option<f64>> {
        Ok(match self.scalar()? {
            Some(RawScalar::Int(i)) => Some(i.to_f64()),
            Some(RawScalar::Float(f)) => Some(*f),
            Some(RawScalar::Decimal(d)) => Some(d.to_f64()),
            _ => None,
        })
    }

    pub fn decimal_value(&mut self) -> Result<Option<Decimal>> {
        Ok(match self.scalar()? {
            Some(RawScalar::Decimal(d)) => Some(d.clone()),
            _ => None,
        })
    }

    pub fn timestamp_value(&mut self) -> Result<Option<Timestamp>> {
        Ok(match self.scalar()? {
            Some(RawScalar::Timestamp(t)) => Some(t.clone()),
            _ => None,
        })
    }

    /// Symbol value, resolved against the active table.
    pub fn symbol_value(&mut self) -> Result<Option<Symbol>> {
        let raw = match self.scalar()? {
            Some(RawScalar::Symbol(raw)) => raw.clone(),
            _ => return Ok(None),
        };
        self.resolve(&raw).map(Some)
    }

    /// Text of a string, or of a symbol whose text is known.
    pub fn string_value(&mut self) -> Result<Option<String>> {
        let raw = match self.scalar()? {
            Some(RawScalar::String(text)) => return Ok(Some(text.clone())),
            Some(RawScalar::Symbol(raw)) => raw.clone(),
            _ => return Ok(None),
        };
        Ok(self.resolve(&raw)?.text().map(str::to_string))
    }

    /// Contents of a blob or clob.
    pub fn bytes_value(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(match self.scalar()? {
            Some(RawScalar::Bytes(bytes)) => Some(bytes.clone()),
            _ => None,
        })
    }

    fn current_value(&mut self) -> Result<Value> {
        let ion_type = self
            .ion_type()
            .ok_or_else(|| Error::invalid_state("not positioned on a value"))?;
        if self.cursor.is_null() {
            return Ok(Value::Null(ion_type));
        }
        self.scalar()?;
        let raw = self
            .cache
            .take()
            .ok_or_else(|| Error::invalid_state("no scalar value at the current position"))?;
        Ok(match raw {
            RawScalar::Bool(b) => Value::Bool(b),
            RawScalar::Int(i) => Value::Int(i),
            RawScalar::Float(f) => Value::Float(f),
            RawScalar::Decimal(d) => Value::Decimal(d),
            RawScalar::Timestamp(t) => Value::Timestamp(t),
            RawScalar::Symbol(raw) => Value::Symbol(self.resolve(&raw)?),
            RawScalar::String(s) => Value::String(s),
            RawScalar::Bytes(b) if ion_type == IonType::Clob => Value::Clob(b),
            RawScalar::Bytes(b) => Value::Blob(b),
        })
    }

    /// Reads the current value, including everything inside it, into an
    /// owned [`Element`]. Returns `None` when not positioned on a value.
    ///
    /// Containers are walked with an explicit stack, and the reader ends up
    /// just past the value.
    pub fn read_element(&mut self) -> Result<Option<Element>> {
        let Some(ion_type) = self.ion_type() else {
            self.check_usable()?;
            return Ok(None);
        };
        let annotations = self.annotations()?;
        if !ion_type.is_container() || self.is_null() {
            let value = self.current_value()?;
            return Ok(Some(Element { annotations, value }));
        }
        let offset = self.cursor.offset();
        let mut stack = vec![PartialContainer {
            ion_type,
            annotations,
            field: None,
            children: Vec::new(),
        }];
        self.step_in()?;
        loop {
            match self.next()? {
                Some(child) => {
                    let annotations = self.annotations()?;
                    let field = self.field_name()?;
                    if child.is_container() && !self.is_null() {
                        stack.push(PartialContainer {
                            ion_type: child,
                            annotations,
                            field,
                            children: Vec::new(),
                        });
                        self.step_in()?;
                    } else {
                        let value = self.current_value()?;
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push((field, Element { annotations, value }));
                        }
                    }
                }
                None => {
                    self.step_out()?;
                    let done = stack
                        .pop()
                        .ok_or_else(|| Error::invalid_state("container stack underflow"))?;
                    let field = done.field.clone();
                    let element = done.into_element(offset)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push((field, element)),
                        None => return Ok(Some(element)),
                    }
                }
            }
        }
    }

    /// Reads every remaining value at the current depth.
    pub fn read_all(&mut self) -> Result<Vec<Element>> {
        let mut elements = Vec::new();
        while self.next()?.is_some() {
            if let Some(element) = self.read_element()? {
                elements.push(element);
            }
        }
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{SharedSymbolTable, SimpleCatalog};

    fn symbols(reader: &mut Reader<'_>) -> Vec<Symbol> {
        let mut out = Vec::new();
        while reader.next().unwrap().is_some() {
            out.push(reader.symbol_value().unwrap().unwrap());
        }
        out
    }

    #[test]
    fn test_local_symbol_table_hidden() {
        let mut reader = Reader::new(b"$ion_symbol_table::{symbols:[\"a\", \"b\"]} $10 $11 $12");
        assert_eq!(
            symbols(&mut reader),
            vec![Symbol::from("a"), Symbol::from("b"), Symbol::Unknown(12)]
        );
        assert_eq!(reader.state(), ReaderState::AtEndOfStream);
    }

    #[test]
    fn test_import_layering() {
        let catalog = SimpleCatalog::new()
            .with_table(SharedSymbolTable::new("fruit", 1, ["apple", "pear", "plum"]));
        let options = ReaderOptions::new().with_catalog(Rc::new(catalog));
        let input = br#"
            $ion_symbol_table::{
                imports: [{name: "fruit", version: 1, max_id: 5}],
                symbols: ["kiwi"],
            }
            $10 $12 $13 $14 $15
        "#;
        let mut reader = Reader::with_options(input, options);
        assert_eq!(
            symbols(&mut reader),
            vec![
                Symbol::from("apple"),
                Symbol::from("plum"),
                Symbol::Unknown(13),
                Symbol::Unknown(14),
                Symbol::from("kiwi"),
            ]
        );
    }

    #[test]
    fn test_append_and_reset() {
        let input = b"$ion_symbol_table::{symbols:[\"a\"]} $10 \
                      $ion_symbol_table::{imports:$ion_symbol_table, symbols:[\"b\"]} $10 $11 \
                      $ion_1_0 $10";
        let mut reader = Reader::new(input);
        assert_eq!(
            symbols(&mut reader),
            vec![
                Symbol::from("a"),
                Symbol::from("a"),
                Symbol::from("b"),
                Symbol::Unknown(10),
            ]
        );
        assert!(reader.symbol_table().is_system());
    }

    #[test]
    fn test_non_string_symbols_leave_gaps() {
        let mut reader = Reader::new(b"$ion_symbol_table::{symbols:[\"a\", 1, null.string, \"d\"]} $10 $11 $13");
        assert_eq!(
            symbols(&mut reader),
            vec![Symbol::from("a"), Symbol::Unknown(11), Symbol::from("d")]
        );
    }

    #[test]
    fn test_annotated_symbol_table_is_user_data() {
        let mut reader = Reader::new(b"other::$ion_symbol_table::{symbols:[\"a\"]}");
        assert_eq!(reader.next().unwrap(), Some(IonType::Struct));
        assert_eq!(reader.annotations().unwrap().len(), 2);
    }

    #[test]
    fn test_symbol_id_zero() {
        let mut reader = Reader::new(b"$0");
        reader.next().unwrap();
        assert_eq!(reader.symbol_value(), Err(Error::UnknownSymbol(0)));
        assert_ne!(reader.state(), ReaderState::Error);
    }

    #[test]
    fn test_accessors_and_mismatch() {
        let mut reader = Reader::new(b"42 \"text\" null.int 2.5e0 1.25 {{AQID}} sym");
        reader.next().unwrap();
        assert_eq!(reader.i64_value().unwrap(), Some(42));
        assert_eq!(reader.string_value().unwrap(), None);
        assert_eq!(reader.number_value().unwrap(), Some(42.0));

        reader.next().unwrap();
        assert_eq!(reader.string_value().unwrap().as_deref(), Some("text"));
        assert_eq!(reader.bool_value().unwrap(), None);

        reader.next().unwrap();
        assert!(reader.is_null());
        assert_eq!(reader.int_value().unwrap(), None);

        reader.next().unwrap();
        assert_eq!(reader.f64_value().unwrap(), Some(2.5));

        reader.next().unwrap();
        assert_eq!(reader.decimal_value().unwrap(), Some(Decimal::new(125, -2)));
        assert_eq!(reader.f64_value().unwrap(), None);
        assert_eq!(reader.number_value().unwrap(), Some(1.25));

        reader.next().unwrap();
        assert_eq!(reader.bytes_value().unwrap(), Some(vec![1, 2, 3]));

        reader.next().unwrap();
        assert_eq!(reader.string_value().unwrap().as_deref(), Some("sym"));
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn test_state_transitions() {
        let mut reader = Reader::new(b"[1]");
        assert_eq!(reader.state(), ReaderState::BeforeFirstValue);
        assert!(matches!(reader.step_in(), Err(Error::InvalidState(_))));
        reader.next().unwrap();
        assert_eq!(reader.state(), ReaderState::AtValue);
        reader.step_in().unwrap();
        assert_eq!(reader.state(), ReaderState::InsideContainerBeforeFirstChild);
        assert_eq!(reader.ion_type(), None);
        reader.next().unwrap();
        assert_eq!(reader.next().unwrap(), None);
        assert_eq!(reader.state(), ReaderState::AfterLastValueInContainer);
        reader.step_out().unwrap();
        assert_eq!(reader.next().unwrap(), None);
        assert_eq!(reader.state(), ReaderState::AtEndOfStream);
        assert!(matches!(reader.step_out(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_error_state_is_sticky() {
        let mut reader = Reader::new(b"[1, 2");
        reader.next().unwrap();
        reader.step_in().unwrap();
        reader.next().unwrap();
        reader.next().unwrap();
        assert!(reader.next().unwrap_err().is_data_error());
        assert_eq!(reader.state(), ReaderState::Error);
        assert!(matches!(reader.next(), Err(Error::InvalidState(_))));
        assert!(matches!(reader.step_out(), Err(Error::InvalidState(_))));
        assert!(matches!(reader.annotations(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_materialize_failure_is_fatal() {
        let mut reader = Reader::new(b"\"bad \\q\" 1");
        reader.next().unwrap();
        assert!(reader.string_value().unwrap_err().is_data_error());
        assert!(matches!(reader.next(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_read_element() {
        let mut reader = Reader::new(b"ann::{a: [1, (b c)], d: null.list, e: {}} 7");
        reader.next().unwrap();
        let element = reader.read_element().unwrap().unwrap();
        assert!(element.has_annotation("ann"));
        let a = element.get("a").unwrap();
        let items = a.value.as_sequence().unwrap();
        assert_eq!(items[0].value.as_i64(), Some(1));
        assert_eq!(items[1].ion_type(), IonType::Sexp);
        assert_eq!(element.get("d").unwrap().value, Value::Null(IonType::List));
        assert_eq!(element.get("e").unwrap().value, Value::Struct(Vec::new()));

        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.i64_value().unwrap(), Some(7));
    }

    #[test]
    fn test_read_all() {
        let elements = Reader::new(b"1 two \"three\"").read_all().unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[1].value, Value::Symbol(Symbol::from("two")));
    }
}
