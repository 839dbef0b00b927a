//! Program entry point, also reachable as the `sillylang` service.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::ast::Program;
use crate::error::{Error, ErrorCode, ServiceError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::parser::stream::TokenStream;
use crate::scanner::{self, TokenizeRequest, TokenizeResponse};
use crate::services::{BoxFuture, Service, ServiceRegistry};

pub const SERVICE_NAME: &str = "sillylang";
pub const SERVICE_VERSION: &str = "0.1.0";
/// Parse-only variant of the language service.
pub const PARSE_SERVICE_NAME: &str = "sillylangparse";
/// Runs trees produced by the parse service.
pub const RUNTIME_SERVICE_NAME: &str = "sillylangruntime";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(alias = "filename")]
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRequest {
    pub files: Vec<SourceFile>,
}

impl ProgramRequest {
    pub fn single(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            files: vec![SourceFile {
                name: name.into(),
                content: content.into(),
            }],
        }
    }
}

/// Acknowledgement of a finished run. Printed output goes to the
/// interpreter's writer, so both buffers stay empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub done: bool,
    pub std_out: Vec<String>,
    pub std_err: Vec<String>,
}

impl RunResult {
    fn finished() -> Self {
        Self {
            done: true,
            std_out: Vec::new(),
            std_err: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub done: bool,
    pub parse_tree: Program,
}

/// An already parsed program to execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRequest {
    #[serde(alias = "parseTreeLegacy")]
    pub parse_tree: Program,
}

/// Consolidated token stream for one source text, tokenized in-process.
pub fn token_stream(file_name: &str, source: &str) -> Result<TokenStream, Error> {
    let request = TokenizeRequest::new(file_name, source).with_newline_control(true);
    Ok(TokenStream::new(scanner::tokenize(&request)?))
}

/// Parse one source text without running it.
pub fn parse_source(file_name: &str, source: &str) -> Result<Program, Error> {
    let tokens = token_stream(file_name, source)?;
    Parser::new(tokens)
        .parse()
        .map_err(|e| Error::Compile(e.with_source_code(file_name, source)))
}

/// Tokenize every file through the tokenizer service, then parse the one
/// file this language accepts.
pub async fn compile(
    registry: &ServiceRegistry,
    request: &ProgramRequest,
) -> Result<Program, Error> {
    let tokenizer = registry.resolve(scanner::SERVICE_NAME, None)?;
    let mut streams = Vec::with_capacity(request.files.len());
    for file in &request.files {
        let tokenize =
            TokenizeRequest::new(&file.name, &file.content).with_newline_control(true);
        let response: TokenizeResponse = tokenizer.send_json(&tokenize).await?;
        streams.push(TokenStream::new(response));
    }

    let (Some(file), Some(tokens), 1) =
        (request.files.first(), streams.pop(), request.files.len())
    else {
        return Err(Error::UnsupportedMultiFile(request.files.len()));
    };
    Parser::new(tokens)
        .parse()
        .map_err(|e| Error::Compile(e.with_source_code(&file.name, &file.content)))
}

/// Compile and execute a program, printing to `writer`.
pub async fn run_program(
    registry: &ServiceRegistry,
    request: &ProgramRequest,
    writer: Box<dyn Write + Send>,
) -> Result<RunResult, Error> {
    let program = compile(registry, request).await?;
    tracing::debug!(statements = program.statements.len(), "compiled program");
    run_tree(registry, &program, writer).await
}

/// Execute a parsed program, printing to `writer`.
pub async fn run_tree(
    registry: &ServiceRegistry,
    program: &Program,
    writer: Box<dyn Write + Send>,
) -> Result<RunResult, Error> {
    let mut interpreter = Interpreter::with_writer(registry.clone(), writer);
    interpreter.interpret(program).await?;
    Ok(RunResult::finished())
}

fn bad_request(e: serde_json::Error) -> ServiceError {
    ServiceError::new(ErrorCode::BadRequest, e.to_string())
}

/// Runs programs sent as [`ProgramRequest`] documents, printing to stdout.
pub struct LanguageService;

impl Service for LanguageService {
    fn handle_json<'a>(
        &'a self,
        ctx: &'a ServiceRegistry,
        request: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, ServiceError>> {
        Box::pin(async move {
            let request: ProgramRequest = serde_json::from_value(request).map_err(bad_request)?;
            let result = run_program(ctx, &request, Box::new(std::io::stdout())).await?;
            serde_json::to_value(result).map_err(bad_request)
        })
    }
}

/// Answers [`ProgramRequest`] documents with a [`ParseResult`].
pub struct ParseService;

impl Service for ParseService {
    fn handle_json<'a>(
        &'a self,
        ctx: &'a ServiceRegistry,
        request: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, ServiceError>> {
        Box::pin(async move {
            let request: ProgramRequest = serde_json::from_value(request).map_err(bad_request)?;
            let program = compile(ctx, &request).await?;
            serde_json::to_value(ParseResult {
                done: true,
                parse_tree: program,
            })
            .map_err(bad_request)
        })
    }
}

/// Runs [`TreeRequest`] documents, printing to stdout.
pub struct RuntimeService;

impl Service for RuntimeService {
    fn handle_json<'a>(
        &'a self,
        ctx: &'a ServiceRegistry,
        request: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, ServiceError>> {
        Box::pin(async move {
            let request: TreeRequest = serde_json::from_value(request).map_err(bad_request)?;
            let result = run_tree(ctx, &request.parse_tree, Box::new(std::io::stdout())).await?;
            serde_json::to_value(result).map_err(bad_request)
        })
    }
}
