//! JSON tokenizer.
//!
//! Works directly on the input string. Strings without escapes are handed to
//! the engine as borrowed slices; escaped strings are decoded into owned
//! buffers. The grammar is checked here so the engine only ever sees a
//! well-formed token sequence.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::str::FromStr;

use rust_decimal::Decimal;
use tessel_format::{FormatError, ScalarValue, Token, TokenSource};

use crate::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object,
    Array,
}

/// What the grammar allows next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    FirstElementOrEnd,
    CommaOrArrayEnd,
    FirstKeyOrEnd,
    Key,
    CommaOrObjectEnd,
    Finished,
}

/// Token source over a JSON document.
#[derive(Debug, Clone)]
pub struct JsonSource<'de> {
    input: &'de str,
    pos: usize,
    stack: Vec<Frame>,
    expect: Expect,
}

impl<'de> JsonSource<'de> {
    /// Tokenize `input`.
    pub fn new(input: &'de str) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            expect: Expect::Value,
        }
    }

    fn bytes(&self) -> &'de [u8] {
        self.input.as_bytes()
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek_byte() {
            self.pos += 1;
        }
    }

    fn unexpected(&self, expected: &str) -> FormatError {
        match self.input[self.pos..].chars().next() {
            Some(c) => FormatError::at(
                alloc::format!("expected {expected}, found `{c}`"),
                self.pos,
            ),
            None => FormatError::at(
                alloc::format!("unexpected end of input, expected {expected}"),
                self.pos,
            ),
        }
    }

    fn after_value(&mut self) {
        self.expect = match self.stack.last() {
            Some(Frame::Object) => Expect::CommaOrObjectEnd,
            Some(Frame::Array) => Expect::CommaOrArrayEnd,
            None => Expect::Finished,
        };
    }

    fn close(&mut self, token: Token<'de>) -> Token<'de> {
        self.pos += 1;
        self.stack.pop();
        self.after_value();
        token
    }

    fn value(&mut self) -> Result<Token<'de>, FormatError> {
        let token = match self.peek_byte() {
            Some(b'{') => {
                self.pos += 1;
                self.stack.push(Frame::Object);
                self.expect = Expect::FirstKeyOrEnd;
                return Ok(Token::BeginObject);
            }
            Some(b'[') => {
                self.pos += 1;
                self.stack.push(Frame::Array);
                self.expect = Expect::FirstElementOrEnd;
                return Ok(Token::BeginArray);
            }
            Some(b'"') => Token::Scalar(ScalarValue::Str(self.string()?)),
            Some(b'-' | b'0'..=b'9') => Token::Scalar(self.number()?),
            Some(b't') => {
                self.literal("true")?;
                Token::Scalar(ScalarValue::Bool(true))
            }
            Some(b'f') => {
                self.literal("false")?;
                Token::Scalar(ScalarValue::Bool(false))
            }
            Some(b'n') => {
                self.literal("null")?;
                Token::Null
            }
            _ => return Err(self.unexpected("a value")),
        };
        self.after_value();
        Ok(token)
    }

    fn key(&mut self) -> Result<Token<'de>, FormatError> {
        if self.peek_byte() != Some(b'"') {
            return Err(self.unexpected("a string key"));
        }
        let key = self.string()?;
        self.skip_whitespace();
        if self.peek_byte() != Some(b':') {
            return Err(self.unexpected("`:`"));
        }
        self.pos += 1;
        self.expect = Expect::Value;
        Ok(Token::Key(key))
    }

    fn literal(&mut self, word: &'static str) -> Result<(), FormatError> {
        if !self.input[self.pos..].starts_with(word) {
            return Err(FormatError::at(
                alloc::format!("invalid literal, expected `{word}`"),
                self.pos,
            ));
        }
        self.pos += word.len();
        Ok(())
    }

    /// Scan a string starting at the opening quote.
    fn string(&mut self) -> Result<Cow<'de, str>, FormatError> {
        let start = self.pos;
        self.pos += 1;
        let content = self.pos;
        let bytes = self.bytes();
        loop {
            match bytes.get(self.pos) {
                None => return Err(FormatError::at("unterminated string", start)),
                Some(b'"') => {
                    let s = &self.input[content..self.pos];
                    self.pos += 1;
                    return Ok(Cow::Borrowed(s));
                }
                Some(b'\\') => break,
                Some(&b) if b < 0x20 => {
                    return Err(FormatError::at("control character in string", self.pos));
                }
                Some(_) => self.pos += 1,
            }
        }

        let mut out = String::from(&self.input[content..self.pos]);
        let mut run = self.pos;
        loop {
            match bytes.get(self.pos) {
                None => return Err(FormatError::at("unterminated string", start)),
                Some(b'"') => {
                    out.push_str(&self.input[run..self.pos]);
                    self.pos += 1;
                    return Ok(Cow::Owned(out));
                }
                Some(b'\\') => {
                    out.push_str(&self.input[run..self.pos]);
                    self.escape(&mut out)?;
                    run = self.pos;
                }
                Some(&b) if b < 0x20 => {
                    return Err(FormatError::at("control character in string", self.pos));
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Decode one escape sequence starting at the backslash.
    fn escape(&mut self, out: &mut String) -> Result<(), FormatError> {
        let at = self.pos;
        let Some(&kind) = self.bytes().get(self.pos + 1) else {
            return Err(FormatError::at("unterminated escape", at));
        };
        self.pos += 2;
        let c = match kind {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{08}',
            b'f' => '\u{0C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => self.unicode_escape(at)?,
            _ => return Err(FormatError::at("invalid escape", at)),
        };
        out.push(c);
        Ok(())
    }

    fn hex4(&mut self) -> Result<u16, FormatError> {
        let digits = self
            .input
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| FormatError::at("truncated unicode escape", self.pos))?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FormatError::at("invalid unicode escape", self.pos));
        }
        let unit = u16::from_str_radix(digits, 16)
            .map_err(|_| FormatError::at("invalid unicode escape", self.pos))?;
        self.pos += 4;
        Ok(unit)
    }

    fn unicode_escape(&mut self, at: usize) -> Result<char, FormatError> {
        let unit = self.hex4()?;
        let code = match unit {
            0xD800..=0xDBFF => {
                if !self.input[self.pos..].starts_with("\\u") {
                    return Err(FormatError::at("unpaired surrogate", at));
                }
                self.pos += 2;
                let low = self.hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(FormatError::at("unpaired surrogate", at));
                }
                0x10000 + ((u32::from(unit) & 0x3FF) << 10) + (u32::from(low) & 0x3FF)
            }
            0xDC00..=0xDFFF => return Err(FormatError::at("unpaired surrogate", at)),
            _ => u32::from(unit),
        };
        char::from_u32(code).ok_or_else(|| FormatError::at("invalid unicode escape", at))
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while let Some(b'0'..=b'9') = self.peek_byte() {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Scan a number, choosing the narrowest exact representation.
    fn number(&mut self) -> Result<ScalarValue<'de>, FormatError> {
        let start = self.pos;
        let negative = self.peek_byte() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        let int_start = self.pos;
        match self.digits() {
            0 => return Err(self.unexpected("a digit")),
            n if n > 1 && self.bytes()[int_start] == b'0' => {
                return Err(FormatError::at("leading zero in number", int_start));
            }
            _ => {}
        }
        let mut float = false;
        if self.peek_byte() == Some(b'.') {
            float = true;
            self.pos += 1;
            if self.digits() == 0 {
                return Err(self.unexpected("a digit after `.`"));
            }
        }
        if let Some(b'e' | b'E') = self.peek_byte() {
            float = true;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek_byte() {
                self.pos += 1;
            }
            if self.digits() == 0 {
                return Err(self.unexpected("an exponent"));
            }
        }

        let text = &self.input[start..self.pos];
        let float_value = || match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(ScalarValue::F64(f)),
            Ok(_) => Err(FormatError::at(
                alloc::format!("number `{text}` is out of range for a float"),
                start,
            )),
            Err(_) => Err(FormatError::at(alloc::format!("invalid number `{text}`"), start)),
        };
        if float {
            return float_value();
        }
        if let Ok(n) = text.parse::<i64>() {
            return Ok(ScalarValue::I64(n));
        }
        if !negative && let Ok(n) = text.parse::<u64>() {
            return Ok(ScalarValue::U64(n));
        }
        if let Ok(d) = Decimal::from_str(text) {
            return Ok(ScalarValue::Decimal(d));
        }
        float_value()
    }
}

impl<'de> TokenSource<'de> for JsonSource<'de> {
    fn next_token(&mut self) -> Result<Token<'de>, FormatError> {
        self.skip_whitespace();
        let token = match self.expect {
            Expect::Value => self.value()?,
            Expect::FirstElementOrEnd => match self.peek_byte() {
                Some(b']') => self.close(Token::EndArray),
                _ => self.value()?,
            },
            Expect::CommaOrArrayEnd => match self.peek_byte() {
                Some(b']') => self.close(Token::EndArray),
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    self.value()?
                }
                _ => return Err(self.unexpected("`,` or `]`")),
            },
            Expect::FirstKeyOrEnd => match self.peek_byte() {
                Some(b'}') => self.close(Token::EndObject),
                _ => self.key()?,
            },
            Expect::Key => self.key()?,
            Expect::CommaOrObjectEnd => match self.peek_byte() {
                Some(b'}') => self.close(Token::EndObject),
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    self.expect = Expect::Key;
                    self.key()?
                }
                _ => return Err(self.unexpected("`,` or `}`")),
            },
            Expect::Finished => match self.peek_byte() {
                None => Token::End,
                Some(_) => return Err(self.unexpected("end of input")),
            },
        };
        trace!(?token, pos = self.pos, "json token");
        Ok(token)
    }

    fn position(&self) -> Option<usize> {
        Some(self.pos)
    }
}
