use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Two-character operators the token stream consolidates from adjacent
/// single-character tokens.
pub const TWO_CHAR_OPERATORS: [&str; 4] = ["==", "!=", "<=", ">="];

/// Text of the token the tokenizer emits for a newline in newline-control mode.
pub const NEWLINE: &str = "\n";

/// Where a token starts: originating file plus 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A token as seen by the parser. `width` is 2 when two raw tokens were
/// merged into one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub position: Position,
    pub width: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, position: Position, width: usize) -> Self {
        Self {
            text: text.into(),
            position,
            width,
        }
    }

    pub fn is_newline(&self) -> bool {
        self.text == NEWLINE
    }

    pub fn first_char(&self) -> Option<char> {
        self.text.chars().next()
    }

    /// Text for messages; the newline token reads as `NEWLINE`.
    pub fn display_text(&self) -> &str {
        if self.is_newline() {
            "NEWLINE"
        } else {
            &self.text
        }
    }

    /// Starts with an ASCII letter or underscore.
    pub fn is_word(&self) -> bool {
        self.first_char()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' @{}", self.display_text(), self.position)
    }
}
