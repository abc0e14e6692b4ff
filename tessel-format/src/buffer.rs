use alloc::borrow::Cow;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use crate::{FormatError, ScalarValue, Token, TokenSink, TokenSource};

/// In-memory token stream.
///
/// Works as a sink that records every token written to it, and as a source
/// that yields them back. Useful for tests, for format-free round trips, and
/// for transcoding between formats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBuffer {
    tokens: VecDeque<Token<'static>>,
}

impl TokenBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer that will yield `tokens`.
    pub fn from_tokens(tokens: impl IntoIterator<Item = Token<'static>>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Tokens not yet consumed.
    pub fn tokens(&self) -> Vec<Token<'static>> {
        self.tokens.iter().cloned().collect()
    }

    /// Number of tokens not yet consumed.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether every token has been consumed.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenSource<'static> for TokenBuffer {
    fn next_token(&mut self) -> Result<Token<'static>, FormatError> {
        Ok(self.tokens.pop_front().unwrap_or(Token::End))
    }
}

impl TokenSink for TokenBuffer {
    fn begin_object(&mut self) -> Result<(), FormatError> {
        self.tokens.push_back(Token::BeginObject);
        Ok(())
    }

    fn key(&mut self, key: &str) -> Result<(), FormatError> {
        self.tokens.push_back(Token::Key(Cow::Owned(String::from(key))));
        Ok(())
    }

    fn end_object(&mut self) -> Result<(), FormatError> {
        self.tokens.push_back(Token::EndObject);
        Ok(())
    }

    fn begin_array(&mut self) -> Result<(), FormatError> {
        self.tokens.push_back(Token::BeginArray);
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), FormatError> {
        self.tokens.push_back(Token::EndArray);
        Ok(())
    }

    fn scalar(&mut self, value: ScalarValue<'_>) -> Result<(), FormatError> {
        self.tokens.push_back(Token::Scalar(value.into_owned()));
        Ok(())
    }

    fn null(&mut self) -> Result<(), FormatError> {
        self.tokens.push_back(Token::Null);
        Ok(())
    }
}
