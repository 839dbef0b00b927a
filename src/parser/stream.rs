use std::sync::Arc;

use crate::error::{CompileError, ParseErrorKind};
use crate::scanner::TokenizeResponse;
use crate::scanner::token::{Position, TWO_CHAR_OPERATORS, Token};

/// Cursor over the tokenizer's parallel arrays.
///
/// Adjacent single-character tokens that spell a known two-character
/// operator are consolidated on the fly. The consolidated lookahead is
/// computed lazily and cached until it is consumed.
#[derive(Debug, Clone)]
pub struct TokenStream {
    file: Arc<str>,
    values: Vec<String>,
    lines: Vec<u32>,
    cols: Vec<u32>,
    index: usize,
    next: Option<Token>,
}

impl TokenStream {
    pub fn new(response: TokenizeResponse) -> Self {
        let TokenizeResponse {
            file_name,
            values,
            lines,
            cols,
        } = response;
        Self {
            file: Arc::from(file_name),
            values,
            lines,
            cols,
            index: 0,
            next: None,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    fn position_of(&self, index: usize) -> Position {
        Position {
            file: Arc::clone(&self.file),
            line: self.lines.get(index).copied().unwrap_or(0),
            column: self.cols.get(index).copied().unwrap_or(0),
        }
    }

    fn adjacent(&self, index: usize) -> bool {
        match (
            self.lines.get(index),
            self.lines.get(index + 1),
            self.cols.get(index),
            self.cols.get(index + 1),
        ) {
            (Some(l1), Some(l2), Some(c1), Some(c2)) => l1 == l2 && c1 + 1 == *c2,
            _ => false,
        }
    }

    fn consolidate(&self) -> Option<Token> {
        let text = self.values.get(self.index)?;
        let position = self.position_of(self.index);
        if let Some(following) = self.values.get(self.index + 1) {
            let merged = format!("{text}{following}");
            if TWO_CHAR_OPERATORS.contains(&merged.as_str()) && self.adjacent(self.index) {
                return Some(Token::new(merged, position, 2));
            }
        }
        Some(Token::new(text.clone(), position, 1))
    }

    pub fn peek(&mut self) -> Option<&Token> {
        if self.next.is_none() {
            self.next = self.consolidate();
        }
        self.next.as_ref()
    }

    pub fn pop(&mut self) -> Option<Token> {
        self.peek();
        let token = self.next.take()?;
        self.index += token.width;
        Some(token)
    }

    pub fn has_more(&self) -> bool {
        self.index < self.values.len()
    }

    pub fn peek_text(&mut self) -> Option<&str> {
        self.peek().map(|t| t.text.as_str())
    }

    pub fn is_next(&mut self, text: &str) -> bool {
        self.peek_text() == Some(text)
    }

    /// Consume the next token only if its text is `text`.
    pub fn pop_if_present(&mut self, text: &str) -> bool {
        if self.is_next(text) {
            self.pop();
            true
        } else {
            false
        }
    }

    pub fn pop_expected(&mut self, text: &str) -> Result<Token, CompileError> {
        match self.pop_if(|t| t.text == text) {
            Ok(token) => Ok(token),
            Err(Some(found)) => Err(CompileError::at_token(
                ParseErrorKind::UnexpectedToken,
                format!("expected '{text}' but found '{}'", found.display_text()),
                &found,
            )),
            Err(None) => Err(CompileError::end_of_file(
                &self.file,
                format!("expected '{text}' but found <END-OF-FILE>"),
            )),
        }
    }

    /// Consume a token starting with a letter or underscore.
    pub fn pop_word(&mut self) -> Result<Token, CompileError> {
        match self.pop() {
            Some(token) if token.is_word() => Ok(token),
            Some(token) => Err(CompileError::at_token(
                ParseErrorKind::UnexpectedToken,
                format!("expected word but found '{}'", token.display_text()),
                &token,
            )),
            None => Err(CompileError::end_of_file(
                &self.file,
                "expected word but found <END-OF-FILE>",
            )),
        }
    }

    /// Pop the next token when `accept` holds for it; otherwise leave it in
    /// place and hand back a copy.
    fn pop_if(&mut self, accept: impl FnOnce(&Token) -> bool) -> Result<Token, Option<Token>> {
        match self.peek().map(accept) {
            Some(true) => self.pop().ok_or(None),
            Some(false) => Err(self.peek().cloned()),
            None => Err(None),
        }
    }
}
