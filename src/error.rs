use miette::{Diagnostic, SourceSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scanner::token::{Position, Token};

/// Stable error codes surfaced across the service boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnclosedItem,
    BadRequest,
    ParseError,
    Unsupported,
    ServiceNotFound,
    UndefinedVariable,
    UnknownSystemFunction,
    UnknownField,
    ArgumentCountMismatch,
    ArgumentTypeMismatch,
    DivisionByZero,
    LabelNotFound,
    NonBooleanCondition,
    OperatorNotImplemented,
    UnsupportedIndex,
    UnsupportedAssignmentTarget,
    NotCallable,
    OutputFailed,
}

/// ` at file:line:column`, or ` at file` when only the file is known.
fn location(position: &Option<Position>, file: &Option<String>) -> String {
    match (position, file) {
        (Some(p), _) => format!(" at {p}"),
        (None, Some(file)) => format!(" at {file}"),
        (None, None) => String::new(),
    }
}

fn at(position: &Option<Position>) -> String {
    match position {
        Some(p) => format!(" at {p}"),
        None => String::new(),
    }
}

// ============= Tokenizer errors =============

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("there is an unclosed comment or string in {file} (line {line}, column {column})")]
    UnclosedItem {
        file: String,
        line: u32,
        column: u32,
    },

    #[error("missing {0} argument")]
    BadRequest(&'static str),
}

impl TokenizeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnclosedItem { .. } => ErrorCode::UnclosedItem,
            Self::BadRequest(_) => ErrorCode::BadRequest,
        }
    }
}

// ============= Compile-time errors (with miette diagnostics) =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ParseErrorKind {
    #[strum(serialize = "unexpected token")]
    UnexpectedToken,
    #[strum(serialize = "unexpected end of file")]
    UnexpectedEnd,
    #[strum(serialize = "invalid escape sequence")]
    InvalidEscape,
    #[strum(serialize = "unsupported assignment target")]
    UnsupportedAssignmentTarget,
}

#[derive(Error, Debug, Diagnostic)]
#[error("parse error{}: {message}", location(.position, .file))]
#[diagnostic(code(silly::parse))]
pub struct CompileError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub position: Option<Position>,
    /// Source file, also known when `position` is not.
    pub file: Option<String>,
    width: usize,
    #[label("here")]
    span: Option<SourceSpan>,
    #[source_code]
    src: miette::NamedSource<String>,
}

impl CompileError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        position: Option<Position>,
        width: usize,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            file: position.as_ref().map(|p| p.file.to_string()),
            position,
            width: width.max(1),
            span: None,
            src: miette::NamedSource::new("input", String::new()),
        }
    }

    /// Error pointing at `token`.
    pub fn at_token(kind: ParseErrorKind, message: impl Into<String>, token: &Token) -> Self {
        Self::new(
            kind,
            message,
            Some(token.position.clone()),
            token.text.chars().count(),
        )
    }

    /// Error raised when the token stream of `file` runs dry.
    pub fn end_of_file(file: &str, message: impl Into<String>) -> Self {
        Self {
            file: Some(file.to_string()),
            ..Self::new(ParseErrorKind::UnexpectedEnd, message, None, 0)
        }
    }

    /// Attach source code for fancy miette diagnostics
    pub fn with_source_code(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        self.span = match &self.position {
            Some(p) => line_column_to_offset(&source, p.line, p.column)
                .map(|offset| SourceSpan::new(offset.into(), self.width)),
            None => Some(SourceSpan::new(source.len().into(), 0)),
        };
        self.src = miette::NamedSource::new(name.into(), source);
        self
    }
}

/// Byte offset of a 1-based line/column (columns count characters).
fn line_column_to_offset(source: &str, line: u32, column: u32) -> Option<usize> {
    let line_start = if line <= 1 {
        0
    } else {
        source
            .match_indices('\n')
            .nth(line as usize - 2)
            .map(|(i, _)| i + 1)?
    };
    source[line_start..]
        .char_indices()
        .nth(column.saturating_sub(1) as usize)
        .map(|(i, _)| line_start + i)
}

// ============= Service errors =============

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(name: &str, version: Option<&str>) -> Self {
        let message = match version {
            Some(v) => format!("service not found: {name} ({v})"),
            None => format!("service not found: {name}"),
        };
        Self::new(ErrorCode::ServiceNotFound, message)
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unsupported, what)
    }
}

impl From<TokenizeError> for ServiceError {
    fn from(e: TokenizeError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

impl From<Error> for ServiceError {
    fn from(e: Error) -> Self {
        match e {
            Error::Service(inner) => inner,
            other => Self::new(other.code(), other.to_string()),
        }
    }
}

// ============= Runtime errors =============

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("variable is not defined: {0}")]
    UndefinedVariable(String),

    #[error("unknown system function: ${0}")]
    UnknownSystemFunction(String),

    #[error("unknown field: .{0}")]
    UnknownField(String),

    #[error("invalid argument count: expected {expected} but received {found}")]
    ArgumentCountMismatch { expected: usize, found: usize },

    #[error("expected {expected} for argument #{position} but found {found}")]
    ArgumentTypeMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("division by 0")]
    DivisionByZero,

    #[error("label not found: {0}")]
    LabelNotFound(String),

    #[error("only booleans may be used as the condition of if statements, found {0}")]
    NonBooleanCondition(String),

    #[error("operator not implemented: {0}")]
    OperatorNotImplemented(String),

    #[error("index access is not supported on {0}")]
    UnsupportedIndex(String),

    #[error("only variables may be assigned to")]
    UnsupportedAssignmentTarget,

    #[error("{0} is not callable")]
    NotCallable(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UndefinedVariable(_) => ErrorCode::UndefinedVariable,
            Self::UnknownSystemFunction(_) => ErrorCode::UnknownSystemFunction,
            Self::UnknownField(_) => ErrorCode::UnknownField,
            Self::ArgumentCountMismatch { .. } => ErrorCode::ArgumentCountMismatch,
            Self::ArgumentTypeMismatch { .. } => ErrorCode::ArgumentTypeMismatch,
            Self::DivisionByZero => ErrorCode::DivisionByZero,
            Self::LabelNotFound(_) => ErrorCode::LabelNotFound,
            Self::NonBooleanCondition(_) => ErrorCode::NonBooleanCondition,
            Self::OperatorNotImplemented(_) => ErrorCode::OperatorNotImplemented,
            Self::UnsupportedIndex(_) => ErrorCode::UnsupportedIndex,
            Self::UnsupportedAssignmentTarget => ErrorCode::UnsupportedAssignmentTarget,
            Self::NotCallable(_) => ErrorCode::NotCallable,
            Self::Service(e) => e.code,
            Self::Output(_) => ErrorCode::OutputFailed,
        }
    }
}

// ============= Top-level outcome of a run =============

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("runtime error{}: {source}", at(.position))]
    Runtime {
        source: RuntimeError,
        position: Option<Position>,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("only one source file is supported, received {0}")]
    UnsupportedMultiFile(usize),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Tokenize(e) => e.code(),
            Self::Compile(_) => ErrorCode::ParseError,
            Self::Runtime { source, .. } => source.code(),
            Self::Service(e) => e.code,
            Self::UnsupportedMultiFile(_) => ErrorCode::Unsupported,
        }
    }

    /// The runtime failure, if this run died while executing.
    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            Self::Runtime { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RuntimeError> for Error {
    fn from(source: RuntimeError) -> Self {
        Self::Runtime {
            source,
            position: None,
        }
    }
}

// ============= Tests =============
