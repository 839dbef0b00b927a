pub mod lexer;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ServiceError, TokenizeError};
use crate::services::{BoxFuture, Service, ServiceRegistry};
use lexer::LineCursor;

/// Name the tokenizer registers under.
pub const SERVICE_NAME: &str = "simpleTokenizer";
pub const SERVICE_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeOptions {
    /// Emit newlines as tokens instead of dropping them as whitespace.
    #[serde(default)]
    pub newline_control: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeRequest {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub source_text: Option<String>,
    #[serde(default)]
    pub options: TokenizeOptions,
}

impl TokenizeRequest {
    pub fn new(file_name: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            source_text: Some(source_text.into()),
            options: TokenizeOptions::default(),
        }
    }

    pub fn with_newline_control(mut self, on: bool) -> Self {
        self.options.newline_control = on;
        self
    }
}

/// Flat token arrays: `values[i]` starts at `lines[i]`, `cols[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeResponse {
    pub file_name: String,
    pub values: Vec<String>,
    pub lines: Vec<u32>,
    pub cols: Vec<u32>,
}

impl TokenizeResponse {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Split source text into flat word, string, punctuation and (optionally)
/// newline tokens.
pub fn tokenize(request: &TokenizeRequest) -> Result<TokenizeResponse, TokenizeError> {
    let file_name = request
        .file_name
        .as_deref()
        .filter(|f| !f.is_empty())
        .ok_or(TokenizeError::BadRequest("file name"))?;
    let source_text = request
        .source_text
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(TokenizeError::BadRequest("source text"))?;

    let source = source_text.replace("\r\n", "\n").replace('\r', "\n");
    let mut cursor = LineCursor::new(&source);

    let raw = match lexer::scan_all(&source, request.options.newline_control) {
        Ok(raw) => raw,
        Err(offset) => {
            let (line, column) = cursor.locate(offset);
            return Err(TokenizeError::UnclosedItem {
                file: file_name.to_string(),
                line,
                column,
            });
        }
    };

    let mut response = TokenizeResponse {
        file_name: file_name.to_string(),
        values: Vec::with_capacity(raw.len()),
        lines: Vec::with_capacity(raw.len()),
        cols: Vec::with_capacity(raw.len()),
    };
    for token in raw {
        let (line, column) = cursor.locate(token.offset);
        response.values.push(token.text);
        response.lines.push(line);
        response.cols.push(column);
    }
    tracing::trace!(file = file_name, count = response.len(), "tokenized");
    Ok(response)
}

/// The tokenizer exposed over the service fabric as a document request.
pub struct TokenizerService;

impl Service for TokenizerService {
    fn handle_json<'a>(
        &'a self,
        _ctx: &'a ServiceRegistry,
        request: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, ServiceError>> {
        Box::pin(async move {
            let request: TokenizeRequest = serde_json::from_value(request)
                .map_err(|e| ServiceError::new(ErrorCode::BadRequest, e.to_string()))?;
            let response = tokenize(&request)?;
            serde_json::to_value(response)
                .map_err(|e| ServiceError::new(ErrorCode::BadRequest, e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize_ok(source: &str) -> TokenizeResponse {
        tokenize(&TokenizeRequest::new("main.slang", source).with_newline_control(true))
            .expect("tokenize should succeed")
    }

    #[test]
    fn newline_control_assignment() {
        let response = tokenize_ok("n = 1\n");
        assert_eq!(response.values, vec!["n", "=", "1", "\n"]);
        assert_eq!(response.lines, vec![1, 1, 1, 1]);
        assert_eq!(response.cols, vec![1, 3, 5, 6]);
        assert_eq!(response.file_name, "main.slang");
    }

    #[test]
    fn crlf_is_normalized() {
        let response = tokenize_ok("a\r\nb\rc");
        assert_eq!(response.values, vec!["a", "\n", "b", "\n", "c"]);
        assert_eq!(response.lines, vec![1, 1, 2, 2, 3]);
    }

    #[test]
    fn positions_follow_multiline_strings() {
        let response = tokenize_ok("x = \"a\nb\" y");
        assert_eq!(response.values[2], "\"a\nb\"");
        assert_eq!((response.lines[3], response.cols[3]), (2, 4));
    }

    #[test]
    fn unclosed_string_reports_position() {
        let err = tokenize(&TokenizeRequest::new("main.slang", "n = 1\nprint \"oops"))
            .unwrap_err();
        assert_eq!(
            err,
            TokenizeError::UnclosedItem {
                file: "main.slang".into(),
                line: 2,
                column: 7,
            }
        );
        assert_eq!(err.code(), ErrorCode::UnclosedItem);
    }

    #[test]
    fn missing_file_name_is_bad_request() {
        let request = TokenizeRequest {
            file_name: None,
            source_text: Some("x".into()),
            options: TokenizeOptions::default(),
        };
        assert_eq!(
            tokenize(&request).unwrap_err(),
            TokenizeError::BadRequest("file name")
        );
    }

    #[test]
    fn empty_source_is_bad_request() {
        let err = tokenize(&TokenizeRequest::new("main.slang", "")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn request_uses_camel_case_on_the_wire() {
        let request: TokenizeRequest = serde_json::from_value(serde_json::json!({
            "fileName": "a.slang",
            "sourceText": "x",
            "options": { "newlineControl": true }
        }))
        .expect("valid request");
        assert!(request.options.newline_control);
        assert_eq!(request.file_name.as_deref(), Some("a.slang"));
    }

    #[tokio::test]
    async fn served_through_the_registry() {
        let registry = ServiceRegistry::with_builtins();
        let client = registry
            .resolve(SERVICE_NAME, None)
            .expect("tokenizer is registered");
        let response: TokenizeResponse = client
            .send_json(&TokenizeRequest::new("main.slang", "a b"))
            .await
            .expect("tokenize over the fabric");
        assert_eq!(response.values, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn errors_cross_the_fabric_with_their_code() {
        let registry = ServiceRegistry::with_builtins();
        let client = registry
            .resolve(SERVICE_NAME, None)
            .expect("tokenizer is registered");
        let err = client
            .send_json::<_, TokenizeResponse>(&TokenizeRequest::new("main.slang", "/* open"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnclosedItem);
    }
}
