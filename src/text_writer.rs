//! Ion text output.
//!
//! Compact output puts top-level values on their own lines and writes
//! containers without spaces: `[a,b]`, `(a b)`, `{k:v,k2:v2}`. Pretty output
//! puts each child on its own line, indented by
//! [`WriterOptions::indent`](crate::WriterOptions) spaces per level.
//!
//! ```rust
//! use serde_ion::text_writer::TextWriter;
//! use serde_ion::writer::IonWriter;
//! use serde_ion::{IonType, Symbol};
//!
//! let mut writer = TextWriter::new();
//! writer.write_symbol(&Symbol::from("a")).unwrap();
//! writer.write_symbol(&Symbol::from("b")).unwrap();
//! writer.write_blob(&[1, 2, 3]).unwrap();
//! assert_eq!(writer.into_inner(), "a\nb\n{{AQID}}");
//! ```

use crate::error::{Error, Result};
use crate::lexical::{escape_clob, escape_string, symbol_needs_quotes};
use crate::options::WriterOptions;
use crate::symbols::Symbol;
use crate::types::IonType;
use crate::value::{Decimal, Int, Timestamp};
use crate::writer::IonWriter;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

struct Frame {
    ion_type: IonType,
    count: usize,
}

/// Writes Ion text into a `String`.
pub struct TextWriter {
    output: String,
    options: WriterOptions,
    stack: Vec<Frame>,
    top_level_count: usize,
    field_name: Option<Symbol>,
    annotations: Vec<Symbol>,
}

impl Default for TextWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(WriterOptions::default())
    }

    #[must_use]
    pub fn with_options(options: WriterOptions) -> Self {
        TextWriter {
            output: String::with_capacity(256),
            options,
            stack: Vec::new(),
            top_level_count: 0,
            field_name: None,
            annotations: Vec::new(),
        }
    }

    /// Returns the text written so far.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.output
    }

    /// Returns the text, failing if a container is still open.
    pub fn finish(self) -> Result<String> {
        if !self.stack.is_empty() {
            return Err(Error::invalid_state("finish called with open containers"));
        }
        Ok(self.output)
    }

    fn write_newline_indent(&mut self, depth: usize) {
        self.output.push('\n');
        for _ in 0..depth * self.options.indent {
            self.output.push(' ');
        }
    }

    fn push_symbol_text(&mut self, text: &str) {
        if symbol_needs_quotes(text) || text.starts_with("$ion_") {
            self.output.push('\'');
            self.output.push_str(&escape_string(text));
            self.output.push('\'');
        } else {
            self.output.push_str(text);
        }
    }

    fn push_symbol(&mut self, symbol: &Symbol) {
        match symbol {
            Symbol::Text(text) => self.push_symbol_text(text),
            Symbol::Unknown(id) => self.output.push_str(&format!("${id}")),
        }
    }

    /// Emits the separator, field name and annotations for the next value.
    fn start_value(&mut self) -> Result<()> {
        let field_name = self.field_name.take();
        let annotations = std::mem::take(&mut self.annotations);
        let pretty = self.options.pretty;
        let depth = self.stack.len();
        match self.stack.last_mut() {
            None => {
                if field_name.is_some() {
                    return Err(Error::invalid_state("field name set outside a struct"));
                }
                if self.top_level_count > 0 {
                    self.output.push('\n');
                }
                self.top_level_count += 1;
            }
            Some(frame) => {
                let in_struct = frame.ion_type == IonType::Struct;
                if in_struct && field_name.is_none() {
                    return Err(Error::invalid_state("struct values need a field name"));
                }
                if !in_struct && field_name.is_some() {
                    return Err(Error::invalid_state("field name set outside a struct"));
                }
                if frame.count > 0 {
                    match frame.ion_type {
                        IonType::Sexp if !pretty => self.output.push(' '),
                        IonType::Sexp => {}
                        _ => self.output.push(','),
                    }
                }
                frame.count += 1;
                if pretty {
                    self.write_newline_indent(depth);
                }
            }
        }
        if let Some(name) = field_name {
            self.push_symbol(&name);
            self.output.push(':');
            if pretty {
                self.output.push(' ');
            }
        }
        for annotation in &annotations {
            self.push_symbol(annotation);
            self.output.push_str("::");
        }
        Ok(())
    }

    fn write_scalar(&mut self, text: &str) -> Result<()> {
        self.start_value()?;
        self.output.push_str(text);
        Ok(())
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "+inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{value:e}")
    }
}

impl IonWriter for TextWriter {
    fn set_field_name(&mut self, name: Symbol) {
        self.field_name = Some(name);
    }

    fn set_annotations(&mut self, annotations: Vec<Symbol>) {
        self.annotations = annotations;
    }

    fn write_null(&mut self, ion_type: IonType) -> Result<()> {
        self.write_scalar(&format!("null.{}", ion_type.name()))
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_scalar(if value { "true" } else { "false" })
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_scalar(&value.to_string())
    }

    fn write_int(&mut self, value: &Int) -> Result<()> {
        self.write_scalar(&value.to_string())
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_scalar(&format_float(value))
    }

    fn write_decimal(&mut self, value: &Decimal) -> Result<()> {
        self.write_scalar(&value.to_string())
    }

    fn write_timestamp(&mut self, value: &Timestamp) -> Result<()> {
        self.write_scalar(&value.to_string())
    }

    fn write_symbol(&mut self, value: &Symbol) -> Result<()> {
        self.start_value()?;
        self.push_symbol(value);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.start_value()?;
        self.output.push('"');
        self.output.push_str(&escape_string(value));
        self.output.push('"');
        Ok(())
    }

    fn write_clob(&mut self, value: &[u8]) -> Result<()> {
        let escaped = escape_clob(value)?;
        self.write_scalar(&format!("{{{{\"{escaped}\"}}}}"))
    }

    fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        let encoded = STANDARD.encode(value);
        self.write_scalar(&format!("{{{{{encoded}}}}}"))
    }

    fn step_in(&mut self, container: IonType) -> Result<()> {
        let open = match container {
            IonType::List => '[',
            IonType::Sexp => '(',
            IonType::Struct => '{',
            other => {
                return Err(Error::InvalidState(format!("cannot step into {other}")));
            }
        };
        self.start_value()?;
        self.output.push(open);
        self.stack.push(Frame {
            ion_type: container,
            count: 0,
        });
        Ok(())
    }

    fn step_out(&mut self) -> Result<()> {
        if self.field_name.is_some() || !self.annotations.is_empty() {
            return Err(Error::invalid_state("field name or annotations left unused"));
        }
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::invalid_state("step_out at depth 0"))?;
        if self.options.pretty && frame.count > 0 {
            self.write_newline_indent(self.stack.len());
        }
        self.output.push(match frame.ion_type {
            IonType::List => ']',
            IonType::Sexp => ')',
            _ => '}',
        });
        Ok(())
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}
