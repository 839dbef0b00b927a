use std::sync::Arc;

use silly_lang::error::{Error, ErrorCode, RuntimeError, ServiceError};
use silly_lang::interpreter::Interpreter;
use silly_lang::language::{self, ProgramRequest, RunResult};
use silly_lang::services::{BoxFuture, Service, ServiceRegistry};

/// Replies `echo: <request>`.
struct Echo;

impl Service for Echo {
    fn handle_string<'a>(
        &'a self,
        _ctx: &'a ServiceRegistry,
        request: &'a str,
    ) -> BoxFuture<'a, Result<String, ServiceError>> {
        Box::pin(async move { Ok(format!("echo: {request}")) })
    }
}

fn registry() -> ServiceRegistry {
    let registry = ServiceRegistry::with_builtins();
    registry.register("echo", "1.0.0", Arc::new(Echo));
    registry
}

async fn run_fixture(source: &str) -> Vec<String> {
    let program = language::parse_source("main.slang", source).expect("parse should succeed");
    let mut interp = Interpreter::capturing(registry(), Box::new(std::io::sink()));
    interp
        .interpret(&program)
        .await
        .expect("interpret should succeed");
    interp.output().to_vec()
}

async fn run_fixture_err(source: &str) -> Error {
    let program = language::parse_source("main.slang", source).expect("parse should succeed");
    let mut interp = Interpreter::capturing(registry(), Box::new(std::io::sink()));
    interp
        .interpret(&program)
        .await
        .expect_err("interpret should fail")
}

#[tokio::test]
async fn fixture_mississippi() {
    let source = include_str!("../fixtures/mississippi.slang");
    let expected = include_str!("../fixtures/mississippi.expected");
    let output = run_fixture(source).await;
    let expected_lines: Vec<&str> = expected.lines().collect();
    assert_eq!(output.len(), 11);
    assert_eq!(output, expected_lines);
}

#[tokio::test]
async fn fixture_arithmetic() {
    let source = include_str!("../fixtures/arithmetic.slang");
    let expected = include_str!("../fixtures/arithmetic.expected");
    let output = run_fixture(source).await;
    let expected_lines: Vec<&str> = expected.lines().collect();
    assert_eq!(output, expected_lines);
}

#[tokio::test]
async fn fixture_strings() {
    let source = include_str!("../fixtures/strings.slang");
    let expected = include_str!("../fixtures/strings.expected");
    let output = run_fixture(source).await;
    let expected_lines: Vec<&str> = expected.lines().collect();
    assert_eq!(output, expected_lines);
}

#[tokio::test]
async fn fixture_branching() {
    let source = include_str!("../fixtures/branching.slang");
    let expected = include_str!("../fixtures/branching.expected");
    let output = run_fixture(source).await;
    let expected_lines: Vec<&str> = expected.lines().collect();
    assert_eq!(output, expected_lines);
}

#[tokio::test]
async fn fixture_service() {
    let source = include_str!("../fixtures/service.slang");
    let expected = include_str!("../fixtures/service.expected");
    let output = run_fixture(source).await;
    let expected_lines: Vec<&str> = expected.lines().collect();
    assert_eq!(output, expected_lines);
}

#[tokio::test]
async fn fixture_missing_label() {
    let source = include_str!("../fixtures/error_missing_label.slang");
    let err = run_fixture_err(source).await;
    assert_eq!(err.code(), ErrorCode::LabelNotFound);
    assert_eq!(
        err.to_string(),
        "runtime error at main.slang:2:1: label not found: missing"
    );
}

#[tokio::test]
async fn output_before_a_failure_is_kept() {
    let program = language::parse_source("main.slang", "print 1\nprint 1 / 0\nprint 2")
        .expect("parse should succeed");
    let mut interp = Interpreter::capturing(registry(), Box::new(std::io::sink()));
    let err = interp.interpret(&program).await.expect_err("should fail");
    assert!(matches!(err.as_runtime(), Some(RuntimeError::DivisionByZero)));
    assert_eq!(interp.output(), ["1"]);
}

#[tokio::test]
async fn unknown_service_is_not_found() {
    let err = run_fixture_err("svc = CTC.nowhere").await;
    assert_eq!(err.code(), ErrorCode::ServiceNotFound);
}

#[tokio::test]
async fn pause_requires_a_float() {
    let err = run_fixture_err("$pause(\"soon\")").await;
    match err.as_runtime() {
        Some(RuntimeError::ArgumentTypeMismatch { position, .. }) => assert_eq!(*position, 1),
        other => panic!("expected ArgumentTypeMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn program_entry_point_accepts_a_single_file() {
    let registry = registry();
    let request = ProgramRequest::single(
        "main.slang",
        include_str!("../fixtures/mississippi.slang"),
    );
    let result = language::run_program(&registry, &request, Box::new(std::io::sink()))
        .await
        .expect("run should succeed");
    assert_eq!(
        result,
        RunResult {
            done: true,
            std_out: vec![],
            std_err: vec![],
        }
    );
}

#[tokio::test]
async fn program_entry_point_rejects_two_files() {
    let registry = registry();
    let request: ProgramRequest = serde_json::from_value(serde_json::json!({
        "files": [
            { "name": "a.slang", "content": "x = 1" },
            { "name": "b.slang", "content": "y = 2" }
        ]
    }))
    .expect("valid request");
    let err = language::run_program(&registry, &request, Box::new(std::io::sink()))
        .await
        .expect_err("two files are rejected");
    assert!(matches!(err, Error::UnsupportedMultiFile(2)));
    assert_eq!(err.code(), ErrorCode::Unsupported);
}
