//! Streaming decoder engine.
//!
//! A [`Decoder`] pulls [`Token`]s from a [`TokenSource`] and exposes typed,
//! structure-aware reads on top of them. It tracks nesting (enforcing the
//! configured depth limit), the logical path of the value being read, and an
//! optional lookahead window that can be rewound once.

use alloc::borrow::Cow;
use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tessel_path::Path;

use crate::{
    Result, ScalarValue, SerdeConfig, SerdeError, SerdeErrorKind, Token, TokenKind, TokenSource,
    Value, trace,
};

/// Largest magnitude at which every integer is exactly representable as `f64`.
const F64_EXACT_INT: u64 = 1 << 53;

/// Decimals with fewer significant digits than this survive a trip through
/// `f64` and back.
const F64_EXACT_DECIMAL: u128 = 1_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object {
        key_in_path: bool,
    },
    Array {
        index: Option<usize>,
        element_pending: bool,
    },
}

struct Checkpoint {
    stack: Vec<Frame>,
    path: Path,
}

struct Recording<'de> {
    tokens: Vec<Token<'de>>,
    checkpoint: Checkpoint,
}

/// Format-agnostic reader over a token stream.
pub struct Decoder<'s, 'de> {
    source: &'s mut dyn TokenSource<'de>,
    peeked: Option<Token<'de>>,
    replay: VecDeque<Token<'de>>,
    recording: Option<Recording<'de>>,
    stack: Vec<Frame>,
    path: Path,
    max_depth: usize,
    max_lookahead: usize,
}

impl<'s, 'de> Decoder<'s, 'de> {
    /// Create a decoder reading from `source`.
    pub fn new(source: &'s mut dyn TokenSource<'de>, config: &SerdeConfig) -> Self {
        Self {
            source,
            peeked: None,
            replay: VecDeque::new(),
            recording: None,
            stack: Vec::new(),
            path: Path::root(),
            max_depth: config.max_depth,
            max_lookahead: config.max_lookahead_tokens,
        }
    }

    /// Logical path of the value about to be read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Byte offset reported by the source, when known and nothing is buffered.
    pub fn position(&self) -> Option<usize> {
        if self.peeked.is_none() && self.replay.is_empty() {
            self.source.position()
        } else {
            None
        }
    }

    /// Build an error located at the current path.
    pub fn error(&self, kind: SerdeErrorKind) -> SerdeError {
        SerdeError::new(kind, self.path.clone())
    }

    fn fetch(&mut self) -> Result<Token<'de>> {
        if let Some(token) = self.replay.pop_front() {
            return Ok(token);
        }
        let token = self.source.next_token().map_err(|err| {
            SerdeError::new(
                SerdeErrorKind::MalformedInput {
                    message: err.to_string(),
                },
                self.path.clone(),
            )
        })?;
        trace!(?token, "token from source");
        Ok(token)
    }

    fn peek(&mut self) -> Result<&Token<'de>> {
        if self.peeked.is_none() {
            let token = self.fetch()?;
            self.peeked = Some(token);
        }
        match &self.peeked {
            Some(token) => Ok(token),
            None => Err(self.error(SerdeErrorKind::MalformedInput {
                message: "token stream ended".into(),
            })),
        }
    }

    fn pull(&mut self) -> Result<Token<'de>> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.fetch()?,
        };
        if let Some(recording) = &mut self.recording {
            if recording.tokens.len() >= self.max_lookahead {
                return Err(SerdeError::new(
                    SerdeErrorKind::LookaheadExceeded {
                        max_tokens: self.max_lookahead,
                    },
                    self.path.clone(),
                ));
            }
            recording.tokens.push(token.clone());
        }
        Ok(token)
    }

    fn value_started(&mut self) {
        if let Some(Frame::Array {
            element_pending, ..
        }) = self.stack.last_mut()
        {
            *element_pending = false;
        }
    }

    fn unexpected(&self, expected: &'static str, token: &Token<'_>) -> SerdeError {
        match token {
            Token::End => self.error(SerdeErrorKind::MalformedInput {
                message: alloc::format!("unexpected end of input, expected {expected}"),
            }),
            Token::EndObject | Token::EndArray | Token::Key(_) => {
                self.error(SerdeErrorKind::MalformedInput {
                    message: alloc::format!("expected {expected}, found {}", token.describe()),
                })
            }
            other => self.error(SerdeErrorKind::TypeMismatch {
                expected,
                got: other.describe(),
            }),
        }
    }

    /// Kind of the next token, without consuming it.
    pub fn peek_kind(&mut self) -> Result<TokenKind> {
        Ok(self.peek()?.kind())
    }

    fn scalar(&mut self, expected: &'static str) -> Result<ScalarValue<'de>> {
        if matches!(self.peek()?, Token::Scalar(_)) {
            self.value_started();
            if let Token::Scalar(value) = self.pull()? {
                return Ok(value);
            }
        }
        let token = self.peek()?.clone();
        Err(self.unexpected(expected, &token))
    }

    fn out_of_range(&self, value: impl ToString, target: &'static str) -> SerdeError {
        self.error(SerdeErrorKind::NumberOutOfRange {
            value: value.to_string(),
            target,
        })
    }

    fn precision_loss(&self, value: impl ToString, target: &'static str) -> SerdeError {
        self.error(SerdeErrorKind::PrecisionLoss {
            value: value.to_string(),
            target,
        })
    }

    fn integer<T>(&mut self, target: &'static str) -> Result<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        match self.scalar(target)? {
            ScalarValue::I64(n) => T::try_from(n).map_err(|_| self.out_of_range(n, target)),
            ScalarValue::U64(n) => T::try_from(n).map_err(|_| self.out_of_range(n, target)),
            ScalarValue::F64(f) => {
                if !f.is_finite() || f.fract() != 0.0 {
                    return Err(self.precision_loss(f, target));
                }
                if f < 0.0 {
                    if f < i64::MIN as f64 {
                        return Err(self.out_of_range(f, target));
                    }
                    T::try_from(f as i64).map_err(|_| self.out_of_range(f, target))
                } else {
                    if f >= u64::MAX as f64 {
                        return Err(self.out_of_range(f, target));
                    }
                    T::try_from(f as u64).map_err(|_| self.out_of_range(f, target))
                }
            }
            ScalarValue::Decimal(d) => {
                if !d.fract().is_zero() {
                    return Err(self.precision_loss(d, target));
                }
                if d.is_sign_negative() {
                    let n = d.to_i64().ok_or_else(|| self.out_of_range(d, target))?;
                    T::try_from(n).map_err(|_| self.out_of_range(d, target))
                } else {
                    let n = d.to_u64().ok_or_else(|| self.out_of_range(d, target))?;
                    T::try_from(n).map_err(|_| self.out_of_range(d, target))
                }
            }
            other => Err(self.error(SerdeErrorKind::TypeMismatch {
                expected: target,
                got: other.describe(),
            })),
        }
    }

    /// Read a boolean.
    pub fn decode_bool(&mut self) -> Result<bool> {
        match self.scalar("boolean")? {
            ScalarValue::Bool(b) => Ok(b),
            other => Err(self.error(SerdeErrorKind::TypeMismatch {
                expected: "boolean",
                got: other.describe(),
            })),
        }
    }

    /// Read an `i8`.
    pub fn decode_i8(&mut self) -> Result<i8> {
        self.integer("i8")
    }

    /// Read an `i16`.
    pub fn decode_i16(&mut self) -> Result<i16> {
        self.integer("i16")
    }

    /// Read an `i32`.
    pub fn decode_i32(&mut self) -> Result<i32> {
        self.integer("i32")
    }

    /// Read an `i64`.
    pub fn decode_i64(&mut self) -> Result<i64> {
        self.integer("i64")
    }

    /// Read a `u8`.
    pub fn decode_u8(&mut self) -> Result<u8> {
        self.integer("u8")
    }

    /// Read a `u16`.
    pub fn decode_u16(&mut self) -> Result<u16> {
        self.integer("u16")
    }

    /// Read a `u32`.
    pub fn decode_u32(&mut self) -> Result<u32> {
        self.integer("u32")
    }

    /// Read a `u64`.
    pub fn decode_u64(&mut self) -> Result<u64> {
        self.integer("u64")
    }

    /// Read an `f64`. Integers beyond 2^53 are rejected as precision loss.
    pub fn decode_f64(&mut self) -> Result<f64> {
        match self.scalar("f64")? {
            ScalarValue::F64(f) => Ok(f),
            ScalarValue::I64(n) => {
                if n.unsigned_abs() > F64_EXACT_INT {
                    return Err(self.precision_loss(n, "f64"));
                }
                Ok(n as f64)
            }
            ScalarValue::U64(n) => {
                if n > F64_EXACT_INT {
                    return Err(self.precision_loss(n, "f64"));
                }
                Ok(n as f64)
            }
            ScalarValue::Decimal(d) => {
                if d.normalize().mantissa().unsigned_abs() >= F64_EXACT_DECIMAL {
                    return Err(self.precision_loss(d, "f64"));
                }
                d.to_f64().ok_or_else(|| self.out_of_range(d, "f64"))
            }
            other => Err(self.error(SerdeErrorKind::TypeMismatch {
                expected: "f64",
                got: other.describe(),
            })),
        }
    }

    /// Read an `f32`. Finite values beyond `f32::MAX` are out of range.
    ///
    /// A value is accepted when it is exactly an `f32`, or when the nearest
    /// `f32` prints as the same decimal number (`0.1`). Anything else would
    /// silently drop digits and is precision loss.
    pub fn decode_f32(&mut self) -> Result<f32> {
        let f = self.decode_f64()?;
        if !f.is_finite() {
            return Ok(f as f32);
        }
        if f.abs() > f32::MAX as f64 {
            return Err(self.out_of_range(f, "f32"));
        }
        let narrowed = f as f32;
        if f64::from(narrowed) != f && narrowed.to_string().parse::<f64>() != Ok(f) {
            return Err(self.precision_loss(f, "f32"));
        }
        Ok(narrowed)
    }

    /// Read an exact decimal. Numeric strings are accepted.
    pub fn decode_decimal(&mut self) -> Result<Decimal> {
        match self.scalar("decimal")? {
            ScalarValue::Decimal(d) => Ok(d),
            ScalarValue::I64(n) => Ok(Decimal::from(n)),
            ScalarValue::U64(n) => Ok(Decimal::from(n)),
            ScalarValue::F64(f) => Decimal::try_from(f).map_err(|_| self.out_of_range(f, "decimal")),
            ScalarValue::Str(s) => s.parse::<Decimal>().map_err(|_| {
                self.error(SerdeErrorKind::TypeMismatch {
                    expected: "decimal",
                    got: alloc::format!("string {s:?}"),
                })
            }),
            other => Err(self.error(SerdeErrorKind::TypeMismatch {
                expected: "decimal",
                got: other.describe(),
            })),
        }
    }

    /// Read a string.
    pub fn decode_string(&mut self) -> Result<Cow<'de, str>> {
        match self.scalar("string")? {
            ScalarValue::Str(s) => Ok(s),
            other => Err(self.error(SerdeErrorKind::TypeMismatch {
                expected: "string",
                got: other.describe(),
            })),
        }
    }

    /// Read a single-character string.
    pub fn decode_char(&mut self) -> Result<char> {
        let s = self.decode_string()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(self.error(SerdeErrorKind::TypeMismatch {
                expected: "char",
                got: alloc::format!("string {s:?}"),
            })),
        }
    }

    /// Consume a `null` if one is next. Returns whether it did.
    pub fn decode_null(&mut self) -> Result<bool> {
        if matches!(self.peek()?, Token::Null) {
            self.value_started();
            self.pull()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn enter(&mut self, frame: Frame) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            return Err(self.error(SerdeErrorKind::DepthLimitExceeded {
                max_depth: self.max_depth,
            }));
        }
        self.value_started();
        self.pull()?;
        self.stack.push(frame);
        Ok(())
    }

    /// Open an array.
    pub fn begin_array(&mut self) -> Result<()> {
        if !matches!(self.peek()?, Token::BeginArray) {
            let token = self.peek()?.clone();
            return Err(self.unexpected("array", &token));
        }
        self.enter(Frame::Array {
            index: None,
            element_pending: false,
        })
    }

    /// Whether the open array has another element. Does not consume the
    /// closing marker; call [`finish_structure`](Self::finish_structure) for
    /// that.
    pub fn has_next_element(&mut self) -> Result<bool> {
        let is_end = matches!(self.peek()?, Token::EndArray | Token::End);
        let Some(Frame::Array {
            index,
            element_pending,
        }) = self.stack.last_mut()
        else {
            return Err(self.error(SerdeErrorKind::MalformedInput {
                message: "not inside an array".into(),
            }));
        };
        if is_end {
            return Ok(false);
        }
        if !*element_pending {
            *element_pending = true;
            match index {
                Some(i) => {
                    *i += 1;
                    self.path.set_last_index(*i);
                }
                None => {
                    *index = Some(0);
                    self.path.push_index(0);
                }
            }
        }
        Ok(true)
    }

    /// Open an object.
    pub fn begin_object(&mut self) -> Result<()> {
        if !matches!(self.peek()?, Token::BeginObject) {
            let token = self.peek()?.clone();
            return Err(self.unexpected("object", &token));
        }
        self.enter(Frame::Object { key_in_path: false })
    }

    /// Read the next key of the open object, or `None` at its end. The
    /// closing marker is left for [`finish_structure`](Self::finish_structure).
    pub fn next_key(&mut self) -> Result<Option<Cow<'de, str>>> {
        if !matches!(self.stack.last(), Some(Frame::Object { .. })) {
            return Err(self.error(SerdeErrorKind::MalformedInput {
                message: "not inside an object".into(),
            }));
        }
        match self.peek()? {
            Token::EndObject => return Ok(None),
            Token::Key(_) => {}
            _ => {
                let token = self.peek()?.clone();
                return Err(self.unexpected("key", &token));
            }
        }
        let Token::Key(key) = self.pull()? else {
            return Ok(None);
        };
        if let Some(Frame::Object { key_in_path }) = self.stack.last_mut() {
            if *key_in_path {
                self.path.pop();
            }
            *key_in_path = true;
        }
        self.path.push_property(key.as_ref());
        Ok(Some(key))
    }

    /// Consume the closing marker of the innermost open structure.
    pub fn finish_structure(&mut self) -> Result<()> {
        let Some(frame) = self.stack.last().copied() else {
            return Err(self.error(SerdeErrorKind::MalformedInput {
                message: "no structure to finish".into(),
            }));
        };
        let token = self.peek()?.clone();
        let matches = matches!(
            (frame, &token),
            (Frame::Object { .. }, Token::EndObject) | (Frame::Array { .. }, Token::EndArray)
        );
        if !matches {
            let expected = match frame {
                Frame::Object { .. } => "object end",
                Frame::Array { .. } => "array end",
            };
            return Err(self.error(SerdeErrorKind::MalformedInput {
                message: alloc::format!("expected {expected}, found {}", token.describe()),
            }));
        }
        self.pull()?;
        self.stack.pop();
        match frame {
            Frame::Object { key_in_path: true }
            | Frame::Array {
                index: Some(_), ..
            } => {
                self.path.pop();
            }
            _ => {}
        }
        Ok(())
    }

    /// Skip one complete value, however deeply nested (within the depth limit).
    pub fn skip_value(&mut self) -> Result<()> {
        let base = self.stack.len();
        loop {
            match self.peek_kind()? {
                TokenKind::BeginObject => self.begin_object()?,
                TokenKind::BeginArray => self.begin_array()?,
                TokenKind::EndObject | TokenKind::EndArray if self.stack.len() > base => {
                    self.finish_structure()?
                }
                TokenKind::Key if self.stack.len() > base => {
                    self.next_key()?;
                    continue;
                }
                kind if kind.starts_value() => {
                    self.value_started();
                    self.pull()?;
                }
                _ => {
                    let token = self.peek()?.clone();
                    return Err(self.unexpected("value", &token));
                }
            }
            if self.stack.len() == base {
                return Ok(());
            }
        }
    }

    /// Read one complete value as a [`Value`] tree.
    pub fn decode_value(&mut self) -> Result<Value> {
        match self.peek_kind()? {
            TokenKind::Null => {
                self.decode_null()?;
                Ok(Value::Null)
            }
            TokenKind::BeginArray => {
                self.begin_array()?;
                let mut items = Vec::new();
                while self.has_next_element()? {
                    items.push(self.decode_value()?);
                }
                self.finish_structure()?;
                Ok(Value::Array(items))
            }
            TokenKind::BeginObject => {
                self.begin_object()?;
                let mut entries = indexmap::IndexMap::new();
                while let Some(key) = self.next_key()? {
                    let value = self.decode_value()?;
                    entries.insert(key.into_owned(), value);
                }
                self.finish_structure()?;
                Ok(Value::Object(entries))
            }
            _ => Ok(match self.scalar("value")? {
                ScalarValue::Bool(b) => Value::Bool(b),
                ScalarValue::I64(n) => Value::I64(n),
                ScalarValue::U64(n) => Value::U64(n),
                ScalarValue::F64(f) => Value::F64(f),
                ScalarValue::Str(s) => Value::Str(s.into_owned()),
                ScalarValue::Decimal(d) => Value::Decimal(d),
            }),
        }
    }

    /// Start recording consumed tokens so that [`replay`](Self::replay) can
    /// rewind to this point. At most `max_lookahead_tokens` tokens may be
    /// consumed before the window is replayed or discarded.
    pub fn start_buffering(&mut self) -> Result<()> {
        if self.recording.is_some() {
            return Err(self.error(SerdeErrorKind::MalformedInput {
                message: "lookahead window already open".into(),
            }));
        }
        trace!(path = %self.path, "start buffering");
        self.recording = Some(Recording {
            tokens: Vec::new(),
            checkpoint: Checkpoint {
                stack: self.stack.clone(),
                path: self.path.clone(),
            },
        });
        Ok(())
    }

    /// Rewind to the point where buffering started. Tokens consumed since
    /// then will be produced again, in order.
    pub fn replay(&mut self) -> Result<()> {
        let Some(recording) = self.recording.take() else {
            return Err(self.error(SerdeErrorKind::MalformedInput {
                message: "no lookahead window to replay".into(),
            }));
        };
        trace!(tokens = recording.tokens.len(), "replaying lookahead");
        let mut replay: VecDeque<Token<'de>> = recording.tokens.into();
        replay.extend(self.peeked.take());
        replay.append(&mut self.replay);
        self.replay = replay;
        self.stack = recording.checkpoint.stack;
        self.path = recording.checkpoint.path;
        Ok(())
    }

    /// Close the lookahead window, keeping the current position.
    pub fn discard(&mut self) {
        self.recording = None;
    }

    /// Whether a lookahead window is open.
    pub fn is_buffering(&self) -> bool {
        self.recording.is_some()
    }

    /// Check that the whole input has been consumed.
    pub fn finish(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(self.error(SerdeErrorKind::MalformedInput {
                message: "unclosed structure".into(),
            }));
        }
        match self.peek()? {
            Token::End => Ok(()),
            _ => {
                let token = self.peek()?.clone();
                Err(self.error(SerdeErrorKind::MalformedInput {
                    message: alloc::format!("trailing {} after value", token.describe()),
                }))
            }
        }
    }
}

impl core::fmt::Debug for Decoder<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Decoder")
            .field("path", &self.path)
            .field("depth", &self.stack.len())
            .field("peeked", &self.peeked)
            .field("replay", &self.replay.len())
            .field("buffering", &self.recording.is_some())
            .finish()
    }
}
