use alloc::borrow::Cow;
use alloc::string::String;
use core::fmt;

use rust_decimal::Decimal;

/// Scalar data carried by a token.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue<'de> {
    /// Boolean literal.
    Bool(bool),
    /// Signed integer literal.
    I64(i64),
    /// Unsigned integer literal.
    U64(u64),
    /// Floating-point literal.
    F64(f64),
    /// UTF-8 string literal.
    Str(Cow<'de, str>),
    /// Exact decimal literal (formats with a decimal type, or integers too
    /// large for 64 bits).
    Decimal(Decimal),
}

impl ScalarValue<'_> {
    /// Detach from the input buffer.
    pub fn into_owned(self) -> ScalarValue<'static> {
        match self {
            ScalarValue::Bool(b) => ScalarValue::Bool(b),
            ScalarValue::I64(n) => ScalarValue::I64(n),
            ScalarValue::U64(n) => ScalarValue::U64(n),
            ScalarValue::F64(n) => ScalarValue::F64(n),
            ScalarValue::Str(s) => ScalarValue::Str(Cow::Owned(s.into_owned())),
            ScalarValue::Decimal(d) => ScalarValue::Decimal(d),
        }
    }

    /// Render for error messages.
    pub fn describe(&self) -> String {
        match self {
            ScalarValue::Bool(b) => alloc::format!("boolean `{b}`"),
            ScalarValue::I64(n) => alloc::format!("integer `{n}`"),
            ScalarValue::U64(n) => alloc::format!("integer `{n}`"),
            ScalarValue::F64(n) => alloc::format!("float `{n}`"),
            ScalarValue::Str(s) => alloc::format!("string {s:?}"),
            ScalarValue::Decimal(d) => alloc::format!("decimal `{d}`"),
        }
    }
}

/// A format-agnostic decode/encode event.
#[derive(Clone, PartialEq)]
pub enum Token<'de> {
    /// Beginning of an object.
    BeginObject,
    /// End of an object.
    EndObject,
    /// Beginning of an array.
    BeginArray,
    /// End of an array.
    EndArray,
    /// Property key inside an object.
    Key(Cow<'de, str>),
    /// Scalar literal.
    Scalar(ScalarValue<'de>),
    /// Null literal.
    Null,
    /// The source is exhausted.
    End,
}

impl Token<'_> {
    /// The payload-free kind of this token.
    pub const fn kind(&self) -> TokenKind {
        match self {
            Token::BeginObject => TokenKind::BeginObject,
            Token::EndObject => TokenKind::EndObject,
            Token::BeginArray => TokenKind::BeginArray,
            Token::EndArray => TokenKind::EndArray,
            Token::Key(_) => TokenKind::Key,
            Token::Scalar(ScalarValue::Bool(_)) => TokenKind::Bool,
            Token::Scalar(ScalarValue::Str(_)) => TokenKind::String,
            Token::Scalar(_) => TokenKind::Number,
            Token::Null => TokenKind::Null,
            Token::End => TokenKind::End,
        }
    }

    /// Detach from the input buffer.
    pub fn into_owned(self) -> Token<'static> {
        match self {
            Token::BeginObject => Token::BeginObject,
            Token::EndObject => Token::EndObject,
            Token::BeginArray => Token::BeginArray,
            Token::EndArray => Token::EndArray,
            Token::Key(k) => Token::Key(Cow::Owned(k.into_owned())),
            Token::Scalar(s) => Token::Scalar(s.into_owned()),
            Token::Null => Token::Null,
            Token::End => Token::End,
        }
    }

    /// Render for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Key(k) => alloc::format!("key {k:?}"),
            Token::Scalar(s) => s.describe(),
            other => String::from(other.kind().name()),
        }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::BeginObject => f.write_str("BeginObject"),
            Token::EndObject => f.write_str("EndObject"),
            Token::BeginArray => f.write_str("BeginArray"),
            Token::EndArray => f.write_str("EndArray"),
            Token::Key(k) => f.debug_tuple("Key").field(k).finish(),
            Token::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            Token::Null => f.write_str("Null"),
            Token::End => f.write_str("End"),
        }
    }
}

/// Kind of the next token, as returned by [`Decoder::peek_kind`](crate::Decoder::peek_kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `{`
    BeginObject,
    /// `}`
    EndObject,
    /// `[`
    BeginArray,
    /// `]`
    EndArray,
    /// Object key
    Key,
    /// Boolean scalar
    Bool,
    /// Numeric scalar
    Number,
    /// String scalar
    String,
    /// Null
    Null,
    /// End of input
    End,
}

impl TokenKind {
    /// Name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            TokenKind::BeginObject => "object start",
            TokenKind::EndObject => "object end",
            TokenKind::BeginArray => "array start",
            TokenKind::EndArray => "array end",
            TokenKind::Key => "key",
            TokenKind::Bool => "boolean",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Null => "null",
            TokenKind::End => "end of input",
        }
    }

    /// Whether a value starts with this token.
    pub const fn starts_value(self) -> bool {
        !matches!(
            self,
            TokenKind::EndObject | TokenKind::EndArray | TokenKind::Key | TokenKind::End
        )
    }
}
