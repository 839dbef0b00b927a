use silly_lang::error::{Error, ErrorCode, ParseErrorKind};
use silly_lang::language;

fn parse_error(source: &str) -> silly_lang::CompileError {
    match language::parse_source("main.slang", source) {
        Err(Error::Compile(e)) => e,
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn unclosed_paren_stops_at_the_newline() {
    let source = include_str!("../fixtures/error_unclosed_paren.slang");
    let err = parse_error(source);
    assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
    assert_eq!(
        err.to_string(),
        "parse error at main.slang:2:12: unexpected token: 'NEWLINE'"
    );
}

#[test]
fn only_variables_are_assignable() {
    let source = include_str!("../fixtures/error_assign_target.slang");
    let err = parse_error(source);
    assert_eq!(err.kind, ParseErrorKind::UnsupportedAssignmentTarget);
    let position = err.position.as_ref().expect("has a position");
    assert_eq!((position.line, position.column), (2, 1));
}

#[test]
fn two_statements_on_one_line_are_rejected() {
    let err = parse_error("x = 1 y = 2");
    assert!(
        err.message.contains("unexpected token: 'y'"),
        "unexpected message: {}",
        err.message
    );
}

#[test]
fn premature_end_of_input() {
    let err = parse_error("if x goto");
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEnd);
    assert!(err.position.is_none());
    assert_eq!(
        err.to_string(),
        "parse error at main.slang: expected '@' but found <END-OF-FILE>"
    );
}

#[test]
fn bad_escape_is_reported() {
    let err = parse_error(r#"print "a\qb""#);
    assert_eq!(err.kind, ParseErrorKind::InvalidEscape);
}

#[test]
fn unclosed_string_is_a_tokenizer_error() {
    let err = language::parse_source("main.slang", "print \"open").unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnclosedItem);
}

#[test]
fn valid_program_after_blank_lines_parses() {
    let program = language::parse_source("main.slang", "\n\n\nx = 1\n\n\nprint x\n\n")
        .expect("parse should succeed");
    assert_eq!(program.statements.len(), 2);
}
