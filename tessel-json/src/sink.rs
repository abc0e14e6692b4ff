use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use tessel_format::{FormatError, ScalarValue, TokenSink};

/// Options for JSON output.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to pretty-print with indentation (default: false)
    pub pretty: bool,

    /// Indentation string for pretty-printing (default: "  ")
    pub indent: &'static str,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ",
        }
    }
}

impl SerializeOptions {
    /// Compact output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty-printing with default indentation.
    pub const fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Set a custom indentation string (implies pretty-printing).
    pub const fn indent(mut self, indent: &'static str) -> Self {
        self.indent = indent;
        self.pretty = true;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Ctx {
    Object { first: bool },
    Array { first: bool },
}

/// Token sink that writes JSON text.
#[derive(Debug, Default)]
pub struct JsonSink {
    out: String,
    stack: Vec<Ctx>,
    options: SerializeOptions,
}

impl JsonSink {
    /// Compact writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer with the given options.
    pub fn with_options(options: SerializeOptions) -> Self {
        Self {
            out: String::new(),
            stack: Vec::new(),
            options,
        }
    }

    /// The text written so far.
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Consume the writer and return the text.
    pub fn finish(self) -> String {
        self.out
    }

    fn write_indent(&mut self) {
        if self.options.pretty {
            self.out.push('\n');
            for _ in 0..self.stack.len() {
                self.out.push_str(self.options.indent);
            }
        }
    }

    fn before_value(&mut self) {
        if let Some(Ctx::Array { first }) = self.stack.last_mut() {
            let was_first = *first;
            *first = false;
            if !was_first {
                self.out.push(',');
            }
            self.write_indent();
        }
    }

    fn close(&mut self, non_empty: bool, close: char) {
        if non_empty {
            self.write_indent();
        }
        self.out.push(close);
    }

    fn write_string(&mut self, s: &str) {
        self.out.push('"');
        let mut run = 0;
        for (i, c) in s.char_indices() {
            let escaped = match c {
                '"' => "\\\"",
                '\\' => "\\\\",
                '\n' => "\\n",
                '\r' => "\\r",
                '\t' => "\\t",
                '\u{08}' => "\\b",
                '\u{0C}' => "\\f",
                c if c.is_ascii_control() && c != '\u{7F}' => "",
                _ => continue,
            };
            self.out.push_str(&s[run..i]);
            if escaped.is_empty() {
                // Remaining C0 controls use the \u form.
                let _ = write!(self.out, "\\u{:04x}", c as u32);
            } else {
                self.out.push_str(escaped);
            }
            run = i + c.len_utf8();
        }
        self.out.push_str(&s[run..]);
        self.out.push('"');
    }
}

impl TokenSink for JsonSink {
    fn begin_object(&mut self) -> Result<(), FormatError> {
        self.before_value();
        self.out.push('{');
        self.stack.push(Ctx::Object { first: true });
        Ok(())
    }

    fn key(&mut self, key: &str) -> Result<(), FormatError> {
        match self.stack.last_mut() {
            Some(Ctx::Object { first }) => {
                let was_first = *first;
                *first = false;
                if !was_first {
                    self.out.push(',');
                }
                self.write_indent();
                self.write_string(key);
                self.out.push(':');
                if self.options.pretty {
                    self.out.push(' ');
                }
                Ok(())
            }
            _ => Err(FormatError::new("key written outside of an object")),
        }
    }

    fn end_object(&mut self) -> Result<(), FormatError> {
        match self.stack.pop() {
            Some(Ctx::Object { first }) => {
                self.close(!first, '}');
                Ok(())
            }
            _ => Err(FormatError::new("object end without a matching start")),
        }
    }

    fn begin_array(&mut self) -> Result<(), FormatError> {
        self.before_value();
        self.out.push('[');
        self.stack.push(Ctx::Array { first: true });
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), FormatError> {
        match self.stack.pop() {
            Some(Ctx::Array { first }) => {
                self.close(!first, ']');
                Ok(())
            }
            _ => Err(FormatError::new("array end without a matching start")),
        }
    }

    fn scalar(&mut self, value: ScalarValue<'_>) -> Result<(), FormatError> {
        if let ScalarValue::F64(f) = value
            && !f.is_finite()
        {
            return Err(FormatError::new(alloc::format!(
                "JSON cannot represent the float `{f}`"
            )));
        }
        self.before_value();
        let _ = match value {
            ScalarValue::Bool(b) => write!(self.out, "{b}"),
            ScalarValue::I64(n) => write!(self.out, "{n}"),
            ScalarValue::U64(n) => write!(self.out, "{n}"),
            ScalarValue::F64(f) => write!(self.out, "{f:?}"),
            ScalarValue::Decimal(d) => write!(self.out, "{d}"),
            ScalarValue::Str(s) => {
                self.write_string(&s);
                Ok(())
            }
        };
        Ok(())
    }

    fn null(&mut self) -> Result<(), FormatError> {
        self.before_value();
        self.out.push_str("null");
        Ok(())
    }
}
