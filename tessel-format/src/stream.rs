use alloc::borrow::Cow;
use alloc::string::String;
use core::fmt;

use crate::{ScalarValue, Token};

/// Error reported by a format adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    /// What went wrong.
    pub message: String,
    /// Byte offset into the input, when the format knows it.
    pub offset: Option<usize>,
}

impl FormatError {
    /// Create an error with a byte offset.
    pub fn at(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Create an error without position information.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{} at byte {offset}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl core::error::Error for FormatError {}

/// Format-specific token producer.
///
/// Sources are responsible for the grammar of their format: they must only
/// produce keys inside objects, alternate keys and values, and balance
/// begin/end tokens. The [`Decoder`](crate::Decoder) double-checks the
/// structure it is asked to read but does not re-validate the whole grammar.
pub trait TokenSource<'de> {
    /// Produce the next token, or [`Token::End`] when exhausted.
    fn next_token(&mut self) -> Result<Token<'de>, FormatError>;

    /// Byte offset of the next token, if the format tracks one.
    fn position(&self) -> Option<usize> {
        None
    }
}

/// Format-specific token consumer.
///
/// The [`Encoder`](crate::Encoder) validates nesting before calling into the
/// sink, so sinks can assume a well-formed call sequence.
pub trait TokenSink {
    /// Open an object.
    fn begin_object(&mut self) -> Result<(), FormatError>;
    /// Write a key inside an object.
    fn key(&mut self, key: &str) -> Result<(), FormatError>;
    /// Close an object.
    fn end_object(&mut self) -> Result<(), FormatError>;
    /// Open an array.
    fn begin_array(&mut self) -> Result<(), FormatError>;
    /// Close an array.
    fn end_array(&mut self) -> Result<(), FormatError>;
    /// Write a scalar.
    fn scalar(&mut self, value: ScalarValue<'_>) -> Result<(), FormatError>;
    /// Write a null.
    fn null(&mut self) -> Result<(), FormatError>;

    /// Write a back-reference marker pointing at `path`.
    ///
    /// The default representation is an object with a single reference key,
    /// which is what the decoder recognizes. Formats with native reference
    /// support can override this, but must then also produce the same token
    /// shape when decoding.
    fn back_reference(&mut self, reference_key: &str, path: &str) -> Result<(), FormatError> {
        self.begin_object()?;
        self.key(reference_key)?;
        self.scalar(ScalarValue::Str(Cow::Borrowed(path)))?;
        self.end_object()
    }
}

impl<S: TokenSink + ?Sized> TokenSink for &mut S {
    fn begin_object(&mut self) -> Result<(), FormatError> {
        (**self).begin_object()
    }
    fn key(&mut self, key: &str) -> Result<(), FormatError> {
        (**self).key(key)
    }
    fn end_object(&mut self) -> Result<(), FormatError> {
        (**self).end_object()
    }
    fn begin_array(&mut self) -> Result<(), FormatError> {
        (**self).begin_array()
    }
    fn end_array(&mut self) -> Result<(), FormatError> {
        (**self).end_array()
    }
    fn scalar(&mut self, value: ScalarValue<'_>) -> Result<(), FormatError> {
        (**self).scalar(value)
    }
    fn null(&mut self) -> Result<(), FormatError> {
        (**self).null()
    }
    fn back_reference(&mut self, reference_key: &str, path: &str) -> Result<(), FormatError> {
        (**self).back_reference(reference_key, path)
    }
}

impl<'de, S: TokenSource<'de> + ?Sized> TokenSource<'de> for &mut S {
    fn next_token(&mut self) -> Result<Token<'de>, FormatError> {
        (**self).next_token()
    }
    fn position(&self) -> Option<usize> {
        (**self).position()
    }
}
