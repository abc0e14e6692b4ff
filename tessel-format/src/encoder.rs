//! Push encoder.
//!
//! The [`Encoder`] is the write-side mirror of the [`Decoder`](crate::Decoder):
//! it validates the structure of what is written (keys only inside objects,
//! one value per key, balanced closes, a single root value), enforces the
//! depth limit and keeps the logical path used for back-references and
//! errors.

use alloc::borrow::Cow;
use alloc::vec::Vec;

use rust_decimal::Decimal;
use tessel_path::Path;

use crate::{
    FormatError, Result, ScalarValue, SerdeConfig, SerdeError, SerdeErrorKind, TokenSink, Value,
    trace,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Object { key_pending: bool, key_in_path: bool },
    Array { index: usize, index_in_path: bool },
}

/// Format-agnostic writer over a [`TokenSink`].
pub struct Encoder<'s> {
    sink: &'s mut dyn TokenSink,
    stack: Vec<Open>,
    path: Path,
    max_depth: usize,
    reference_key: &'static str,
    root_written: bool,
}

impl<'s> Encoder<'s> {
    /// Create an encoder writing to `sink`.
    pub fn new(sink: &'s mut dyn TokenSink, config: &SerdeConfig) -> Self {
        Self {
            sink,
            stack: Vec::new(),
            path: Path::root(),
            max_depth: config.max_depth,
            reference_key: config.reference_key,
            root_written: false,
        }
    }

    /// Path of the innermost open key or element.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path that the next value will be written at.
    pub fn value_path(&self) -> Path {
        let mut path = self.path.clone();
        if let Some(Open::Array {
            index,
            index_in_path,
        }) = self.stack.last()
        {
            if *index_in_path {
                path.set_last_index(*index);
            } else {
                path.push_index(*index);
            }
        }
        path
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Build an error located at the current path.
    pub fn error(&self, kind: SerdeErrorKind) -> SerdeError {
        SerdeError::new(kind, self.path.clone())
    }

    fn malformed(&self, message: &str) -> SerdeError {
        self.error(SerdeErrorKind::MalformedInput {
            message: message.into(),
        })
    }

    fn sink_error(&self, err: FormatError) -> SerdeError {
        self.error(SerdeErrorKind::Sink(err))
    }

    fn before_value(&mut self) -> Result<()> {
        match self.stack.last_mut() {
            None if self.root_written => Err(self.malformed("a second root value")),
            None => Ok(()),
            Some(Open::Object {
                key_pending: false, ..
            }) => Err(self.malformed("value written without a key")),
            Some(Open::Object { .. }) => Ok(()),
            Some(Open::Array {
                index,
                index_in_path,
            }) => {
                if *index_in_path {
                    self.path.set_last_index(*index);
                } else {
                    self.path.push_index(*index);
                    *index_in_path = true;
                }
                Ok(())
            }
        }
    }

    fn after_value(&mut self) {
        match self.stack.last_mut() {
            None => self.root_written = true,
            Some(Open::Object { key_pending, .. }) => *key_pending = false,
            Some(Open::Array { index, .. }) => *index += 1,
        }
    }

    fn write(
        &mut self,
        f: impl FnOnce(&mut (dyn TokenSink + 's)) -> core::result::Result<(), FormatError>,
    ) -> Result<()> {
        self.before_value()?;
        f(&mut *self.sink).map_err(|err| self.sink_error(err))?;
        self.after_value();
        Ok(())
    }

    /// Write a scalar.
    pub fn encode_scalar(&mut self, value: ScalarValue<'_>) -> Result<()> {
        trace!(?value, path = %self.path, "encode scalar");
        self.write(|sink| sink.scalar(value))
    }

    /// Write a boolean.
    pub fn encode_bool(&mut self, value: bool) -> Result<()> {
        self.encode_scalar(ScalarValue::Bool(value))
    }

    /// Write a signed integer.
    pub fn encode_i64(&mut self, value: i64) -> Result<()> {
        self.encode_scalar(ScalarValue::I64(value))
    }

    /// Write an unsigned integer.
    pub fn encode_u64(&mut self, value: u64) -> Result<()> {
        self.encode_scalar(ScalarValue::U64(value))
    }

    /// Write a float.
    pub fn encode_f64(&mut self, value: f64) -> Result<()> {
        self.encode_scalar(ScalarValue::F64(value))
    }

    /// Write a string.
    pub fn encode_str(&mut self, value: &str) -> Result<()> {
        self.encode_scalar(ScalarValue::Str(Cow::Borrowed(value)))
    }

    /// Write a character as a one-character string.
    pub fn encode_char(&mut self, value: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.encode_str(value.encode_utf8(&mut buf))
    }

    /// Write an exact decimal.
    pub fn encode_decimal(&mut self, value: Decimal) -> Result<()> {
        self.encode_scalar(ScalarValue::Decimal(value))
    }

    /// Write a `null`.
    pub fn encode_null(&mut self) -> Result<()> {
        self.write(|sink| sink.null())
    }

    fn open(&mut self, frame: Open) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            return Err(self.error(SerdeErrorKind::DepthLimitExceeded {
                max_depth: self.max_depth,
            }));
        }
        self.before_value()?;
        let result = match frame {
            Open::Object { .. } => self.sink.begin_object(),
            Open::Array { .. } => self.sink.begin_array(),
        };
        result.map_err(|err| self.sink_error(err))?;
        self.stack.push(frame);
        Ok(())
    }

    /// Open an object.
    pub fn begin_object(&mut self) -> Result<()> {
        self.open(Open::Object {
            key_pending: false,
            key_in_path: false,
        })
    }

    /// Open an array.
    pub fn begin_array(&mut self) -> Result<()> {
        self.open(Open::Array {
            index: 0,
            index_in_path: false,
        })
    }

    /// Write a key in the open object.
    pub fn key(&mut self, name: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(Open::Object {
                key_pending: false,
                key_in_path,
            }) => {
                if *key_in_path {
                    self.path.pop();
                }
                *key_in_path = true;
            }
            Some(Open::Object { .. }) => return Err(self.malformed("two keys without a value")),
            _ => return Err(self.malformed("key written outside an object")),
        }
        self.path.push_property(name);
        self.sink.key(name).map_err(|err| self.sink_error(err))?;
        if let Some(Open::Object { key_pending, .. }) = self.stack.last_mut() {
            *key_pending = true;
        }
        Ok(())
    }

    fn close(&mut self, expect_object: Option<bool>) -> Result<()> {
        let Some(top) = self.stack.last().copied() else {
            return Err(self.malformed("no structure to finish"));
        };
        let is_object = matches!(top, Open::Object { .. });
        if expect_object.is_some_and(|want| want != is_object) {
            return Err(self.malformed(if is_object {
                "array closed while an object is open"
            } else {
                "object closed while an array is open"
            }));
        }
        if let Open::Object {
            key_pending: true, ..
        } = top
        {
            return Err(self.malformed("key without a value"));
        }
        let result = if is_object {
            self.sink.end_object()
        } else {
            self.sink.end_array()
        };
        result.map_err(|err| self.sink_error(err))?;
        self.stack.pop();
        if matches!(
            top,
            Open::Object {
                key_in_path: true,
                ..
            } | Open::Array {
                index_in_path: true,
                ..
            }
        ) {
            self.path.pop();
        }
        self.after_value();
        Ok(())
    }

    /// Close the innermost open structure, whichever kind it is.
    pub fn finish_structure(&mut self) -> Result<()> {
        self.close(None)
    }

    /// Close the innermost structure, which must be an object.
    pub fn end_object(&mut self) -> Result<()> {
        self.close(Some(true))
    }

    /// Close the innermost structure, which must be an array.
    pub fn end_array(&mut self) -> Result<()> {
        self.close(Some(false))
    }

    /// Write a back-reference to the value first written at `target`.
    pub fn encode_back_reference(&mut self, target: &Path) -> Result<()> {
        trace!(%target, path = %self.path, "encode back-reference");
        // The marker is an object on the wire, one level below this one.
        if self.stack.len() >= self.max_depth {
            return Err(self.error(SerdeErrorKind::DepthLimitExceeded {
                max_depth: self.max_depth,
            }));
        }
        let key = self.reference_key;
        let rendered = alloc::string::ToString::to_string(target);
        self.write(|sink| sink.back_reference(key, &rendered))
    }

    /// Write a [`Value`] tree.
    pub fn encode_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.encode_null(),
            Value::Bool(b) => self.encode_bool(*b),
            Value::I64(n) => self.encode_i64(*n),
            Value::U64(n) => self.encode_u64(*n),
            Value::F64(f) => self.encode_f64(*f),
            Value::Str(s) => self.encode_str(s),
            Value::Decimal(d) => self.encode_decimal(*d),
            Value::Array(items) => {
                self.begin_array()?;
                for item in items {
                    self.encode_value(item)?;
                }
                self.end_array()
            }
            Value::Object(entries) => {
                self.begin_object()?;
                for (key, item) in entries {
                    self.key(key)?;
                    self.encode_value(item)?;
                }
                self.end_object()
            }
        }
    }

    /// Check that exactly one complete root value was written.
    pub fn finish(self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(self.malformed("unclosed structure"));
        }
        if !self.root_written {
            return Err(self.malformed("nothing was written"));
        }
        Ok(())
    }
}

impl core::fmt::Debug for Encoder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Encoder")
            .field("path", &self.path)
            .field("depth", &self.stack.len())
            .field("root_written", &self.root_written)
            .finish()
    }
}
