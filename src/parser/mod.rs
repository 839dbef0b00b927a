pub mod stream;

use crate::ast::*;
use crate::error::{CompileError, ParseErrorKind};
use crate::scanner::token::{NEWLINE, Token};
use stream::TokenStream;

/// Binary operator tiers, loosest first. Each tier parses operands at the
/// next tier down; below the last tier sits unary parsing.
const TIERS: [&[&str]; 6] = [
    &["and"],
    &["or"],
    &["==", "!="],
    &["<=", ">=", "<", ">"],
    &["+", "-"],
    &["*", "/", "%"],
];

pub struct Parser {
    tokens: TokenStream,
}

impl Parser {
    pub fn new(tokens: TokenStream) -> Self {
        Self { tokens }
    }

    /// Parse newline-separated statements. Blank lines are allowed anywhere;
    /// two statements on one line are not.
    pub fn parse(mut self) -> Result<Program, CompileError> {
        let mut statements = Vec::new();
        while self.tokens.pop_if_present(NEWLINE) {}

        let mut separated = true;
        while self.tokens.has_more() {
            if !separated && let Some(token) = self.tokens.peek() {
                return Err(CompileError::at_token(
                    ParseErrorKind::UnexpectedToken,
                    format!("unexpected token: '{}'", token.display_text()),
                    token,
                ));
            }
            statements.push(self.statement()?);
            separated = false;
            while self.tokens.pop_if_present(NEWLINE) {
                separated = true;
            }
        }
        tracing::debug!(
            file = self.tokens.file(),
            statements = statements.len(),
            "parsed program"
        );
        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Statement, CompileError> {
        let start = match self.tokens.peek() {
            Some(token) => token.clone(),
            None => {
                return Err(CompileError::end_of_file(
                    self.tokens.file(),
                    "expected a statement",
                ));
            }
        };
        let kind = match start.text.as_str() {
            "@" => StmtKind::Label {
                name: self.label()?,
            },
            "if" => self.if_statement()?,
            "goto" => {
                self.tokens.pop_expected("goto")?;
                StmtKind::Goto {
                    label: self.label()?,
                }
            }
            "print" => {
                self.tokens.pop_expected("print")?;
                StmtKind::Print {
                    expr: self.expression()?,
                }
            }
            _ => self.assign_or_expression(&start)?,
        };
        Ok(Statement {
            kind,
            position: start.position,
        })
    }

    /// `@name`, yielding the name.
    fn label(&mut self) -> Result<String, CompileError> {
        self.tokens.pop_expected("@")?;
        Ok(self.tokens.pop_word()?.text)
    }

    /// `if <expr> goto @a [else [goto] @b]`
    fn if_statement(&mut self) -> Result<StmtKind, CompileError> {
        self.tokens.pop_expected("if")?;
        let condition = self.expression()?;
        self.tokens.pop_expected("goto")?;
        let true_label = self.label()?;
        let false_label = if self.tokens.pop_if_present("else") {
            self.tokens.pop_if_present("goto");
            Some(self.label()?)
        } else {
            None
        };
        Ok(StmtKind::If {
            condition,
            true_label,
            false_label,
        })
    }

    fn assign_or_expression(&mut self, start: &Token) -> Result<StmtKind, CompileError> {
        let expr = self.expression()?;
        if !self.tokens.pop_if_present("=") {
            return Ok(StmtKind::Expression { expr });
        }
        if !matches!(expr, Expr::Variable(_)) {
            return Err(CompileError::at_token(
                ParseErrorKind::UnsupportedAssignmentTarget,
                "only variables may be assigned to",
                start,
            ));
        }
        let value = self.expression()?;
        Ok(StmtKind::Assign {
            target: expr,
            value,
        })
    }

    pub fn expression(&mut self) -> Result<Expr, CompileError> {
        self.tier(0)
    }

    fn tier(&mut self, level: usize) -> Result<Expr, CompileError> {
        let Some(operators) = TIERS.get(level) else {
            return self.unary();
        };
        let first = self.tier(level + 1)?;
        let mut chain = OpsChain {
            operands: vec![first],
            operators: Vec::new(),
        };
        while let Some(op) = self.pop_operator(operators) {
            chain.operators.push(op);
            chain.operands.push(self.tier(level + 1)?);
        }
        if chain.operators.is_empty() {
            Ok(chain.operands.remove(0))
        } else {
            Ok(Expr::OpsChain(chain))
        }
    }

    fn pop_operator(&mut self, operators: &[&str]) -> Option<Token> {
        let matched = self
            .tokens
            .peek_text()
            .is_some_and(|text| operators.contains(&text));
        if matched { self.tokens.pop() } else { None }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        if self.tokens.pop_if_present("not") {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        if self.tokens.pop_if_present("-") {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.suffixed()
    }

    /// A parenthesized expression or entity, followed by any number of
    /// `.field`, `[key]` and `(args)` suffixes.
    fn suffixed(&mut self) -> Result<Expr, CompileError> {
        let mut expr = if self.tokens.pop_if_present("(") {
            let inner = self.expression()?;
            self.tokens.pop_expected(")")?;
            inner
        } else {
            self.entity()?
        };

        loop {
            if self.tokens.pop_if_present(".") {
                let name = self.tokens.pop_word()?.text;
                expr = Expr::Field(FieldAccess {
                    root: Box::new(expr),
                    name,
                });
            } else if self.tokens.pop_if_present("[") {
                let key = self.expression()?;
                self.tokens.pop_expected("]")?;
                expr = Expr::Index(IndexAccess {
                    root: Box::new(expr),
                    key: Box::new(key),
                });
            } else if self.tokens.pop_if_present("(") {
                let mut args = Vec::new();
                while !self.tokens.pop_if_present(")") {
                    if !args.is_empty() {
                        self.tokens.pop_expected(",")?;
                    }
                    args.push(self.expression()?);
                }
                expr = Expr::Invoke(Invoke {
                    root: Box::new(expr),
                    args,
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn entity(&mut self) -> Result<Expr, CompileError> {
        let token = match self.tokens.peek() {
            Some(token) => token.clone(),
            None => {
                return Err(CompileError::end_of_file(
                    self.tokens.file(),
                    "expected an expression",
                ));
            }
        };

        match token.text.as_str() {
            "true" | "false" => {
                self.tokens.pop();
                return Ok(Expr::Bool(token.text == "true"));
            }
            "null" => {
                self.tokens.pop();
                return Ok(Expr::Null);
            }
            "$" => {
                self.tokens.pop();
                return Ok(Expr::SystemFunc(self.tokens.pop_word()?.text));
            }
            _ => {}
        }

        if matches!(token.first_char(), Some('"' | '\'')) {
            self.tokens.pop();
            return decode_string(&token).map(Expr::Str);
        }

        if token.is_word() {
            self.tokens.pop();
            if token.text == SERVICE_ROOT {
                return Ok(Expr::ServiceRoot);
            }
            return Ok(Expr::Variable(token.text));
        }

        if is_digits(&token.text) {
            self.tokens.pop();
            if !self.tokens.is_next(".") {
                return token.text.parse().map(Expr::Int).map_err(|_| {
                    CompileError::at_token(
                        ParseErrorKind::UnexpectedToken,
                        format!("integer literal out of range: {}", token.text),
                        &token,
                    )
                });
            }
            let dot = self.tokens.pop_expected(".")?;
            return match self.pop_digits() {
                Some(decimals) => float_literal(&token.text, &decimals, &token),
                None => Err(CompileError::at_token(
                    ParseErrorKind::UnexpectedToken,
                    "unexpected '.'",
                    &dot,
                )),
            };
        }

        if self.tokens.pop_if_present(".")
            && let Some(decimals) = self.pop_digits()
        {
            return float_literal("0", &decimals, &token);
        }

        Err(CompileError::at_token(
            ParseErrorKind::UnexpectedToken,
            format!("unexpected token: '{}'", token.display_text()),
            &token,
        ))
    }

    fn pop_digits(&mut self) -> Option<String> {
        if self.tokens.peek_text().is_some_and(is_digits) {
            self.tokens.pop().map(|t| t.text)
        } else {
            None
        }
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// `whole.decimals` read as written, leading zeros in `decimals` included.
fn float_literal(whole: &str, decimals: &str, token: &Token) -> Result<Expr, CompileError> {
    format!("{whole}.{decimals}")
        .parse()
        .map(Expr::Float)
        .map_err(|_| {
            CompileError::at_token(
                ParseErrorKind::UnexpectedToken,
                format!("invalid float literal: {whole}.{decimals}"),
                token,
            )
        })
}

/// Strip the quotes from a string token and decode its escapes.
fn decode_string(token: &Token) -> Result<String, CompileError> {
    let raw = &token.text;
    let inner = raw
        .get(1..raw.len().saturating_sub(1))
        .filter(|_| raw.len() >= 2)
        .unwrap_or_default();
    let invalid = |message: String| {
        CompileError::at_token(ParseErrorKind::InvalidEscape, message, token)
    };

    let mut decoded = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => decoded.push('\r'),
            Some('n') => decoded.push('\n'),
            Some('"') => decoded.push('"'),
            Some('\'') => decoded.push('\''),
            Some('t') => decoded.push('\t'),
            Some('\\') => decoded.push('\\'),
            Some(other) => return Err(invalid(format!("invalid escape sequence: \\{other}"))),
            None => {
                return Err(invalid(
                    "invalid escape sequence: terminating backslash".to_string(),
                ));
            }
        }
    }
    Ok(decoded)
}
