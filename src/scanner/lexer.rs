use winnow::combinator::alt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::stream::{LocatingSlice, Location};
use winnow::token::{any, take_until, take_while};

type Input<'a> = LocatingSlice<&'a str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Word,
    Str,
    Newline,
    Punct,
}

/// A character-level token with its byte offset in the normalized source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub kind: RawKind,
    pub text: String,
    pub offset: usize,
}

fn cut(_: ErrMode<ContextError>) -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn blanks(input: &mut Input<'_>, keep_newlines: bool) -> ModalResult<()> {
    take_while(0.., |c: char| {
        c == ' ' || c == '\t' || (c == '\n' && !keep_newlines)
    })
    .void()
    .parse_next(input)
}

/// Runs to the end of the line; the newline itself is left in place.
fn line_comment(input: &mut Input<'_>) -> ModalResult<()> {
    ("//", take_while(0.., |c: char| c != '\n'))
        .void()
        .parse_next(input)
}

fn block_comment(input: &mut Input<'_>) -> ModalResult<()> {
    ("/*", take_until(0.., "*/"), "*/")
        .void()
        .parse_next(input)
}

/// Quoted text kept verbatim, quotes included. Escapes are skipped, not checked.
fn string_literal(input: &mut Input<'_>) -> ModalResult<RawToken> {
    let offset = input.current_token_start();
    let quote = any
        .verify(|c: &char| *c == '"' || *c == '\'')
        .parse_next(input)?;
    let mut text = String::from(quote);
    loop {
        let c = any.parse_next(input).map_err(cut)?;
        text.push(c);
        if c == '\\' {
            let escaped = any.parse_next(input).map_err(cut)?;
            text.push(escaped);
        } else if c == quote {
            break;
        }
    }
    Ok(RawToken {
        kind: RawKind::Str,
        text,
        offset,
    })
}

fn word(input: &mut Input<'_>) -> ModalResult<RawToken> {
    let offset = input.current_token_start();
    take_while(1.., is_word_char)
        .map(|text: &str| RawToken {
            kind: RawKind::Word,
            text: text.to_string(),
            offset,
        })
        .parse_next(input)
}

fn newline(input: &mut Input<'_>) -> ModalResult<RawToken> {
    let offset = input.current_token_start();
    '\n'.map(|c: char| RawToken {
        kind: RawKind::Newline,
        text: c.to_string(),
        offset,
    })
    .parse_next(input)
}

fn punct(input: &mut Input<'_>) -> ModalResult<RawToken> {
    let offset = input.current_token_start();
    any.map(|c: char| RawToken {
        kind: RawKind::Punct,
        text: c.to_string(),
        offset,
    })
    .parse_next(input)
}

fn scan_token(input: &mut Input<'_>) -> ModalResult<RawToken> {
    alt((string_literal, word, newline, punct)).parse_next(input)
}

/// Scan normalized source into raw tokens.
///
/// On an unterminated string or block comment, returns the byte offset where
/// the unclosed item starts.
pub fn scan_all(source: &str, keep_newlines: bool) -> Result<Vec<RawToken>, usize> {
    let mut input = LocatingSlice::new(source);
    let mut tokens = Vec::new();

    loop {
        if blanks(&mut input, keep_newlines).is_err() {
            break;
        }
        if input.is_empty() {
            break;
        }
        let start = input.current_token_start();
        let scanned = if input.starts_with("//") {
            line_comment(&mut input).map(|()| None)
        } else if input.starts_with("/*") {
            block_comment(&mut input).map(|()| None)
        } else {
            scan_token(&mut input).map(Some)
        };
        match scanned {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => {}
            Err(_) => return Err(start),
        }
    }

    Ok(tokens)
}

/// Maps ascending byte offsets to 1-based (line, column) pairs, counting
/// columns in characters.
pub struct LineCursor<'a> {
    source: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> LineCursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Advance to `target`. Offsets must be visited in ascending order.
    pub fn locate(&mut self, target: usize) -> (u32, u32) {
        let target = target.min(self.source.len());
        if target > self.offset {
            for c in self.source[self.offset..target].chars() {
                if c == '\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
            }
            self.offset = target;
        }
        (self.line, self.column)
    }
}
