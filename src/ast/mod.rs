pub mod printer;

use serde::{Deserialize, Serialize};

use crate::scanner::token::{Position, Token};

/// Reserved identifier that evaluates to the service root.
pub const SERVICE_ROOT: &str = "CTC";

/// A parsed program: statements in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// One line of the program, tagged with where it starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(flatten)]
    pub kind: StmtKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StmtKind {
    Label {
        name: String,
    },
    If {
        condition: Expr,
        true_label: String,
        false_label: Option<String>,
    },
    Goto {
        label: String,
    },
    Print {
        expr: Expr,
    },
    /// The parser guarantees `target` is an [`Expr::Variable`].
    Assign {
        target: Expr,
        value: Expr,
    },
    Expression {
        expr: Expr,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Variable(String),
    SystemFunc(String),
    ServiceRoot,
    OpsChain(OpsChain),
    Field(FieldAccess),
    Index(IndexAccess),
    Invoke(Invoke),
    Not(Box<Expr>),
    Neg(Box<Expr>),
}

/// Operands joined by operators of one precedence tier, folded left to right.
/// Always holds one more operand than operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpsChain {
    pub operands: Vec<Expr>,
    pub operators: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAccess {
    pub root: Box<Expr>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexAccess {
    pub root: Box<Expr>,
    pub key: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoke {
    pub root: Box<Expr>,
    pub args: Vec<Expr>,
}

impl Statement {
    pub fn label_name(&self) -> Option<&str> {
        match &self.kind {
            StmtKind::Label { name } => Some(name),
            _ => None,
        }
    }
}
