use std::str::FromStr;

use crate::error::RuntimeError;
use crate::interpreter::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Rem,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
}

impl BinaryOp {
    pub fn parse(text: &str) -> Result<Self, RuntimeError> {
        Self::from_str(text).map_err(|_| RuntimeError::OperatorNotImplemented(text.to_string()))
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

fn not_implemented(left: &Value, op: BinaryOp, right: &Value) -> RuntimeError {
    RuntimeError::OperatorNotImplemented(format!(
        "{} {op} {}",
        left.type_tag(),
        right.type_tag()
    ))
}

/// Apply `op` to a pair of values, dispatching on both type tags.
pub fn binary(left: &Value, op: BinaryOp, right: &Value) -> Result<Value, RuntimeError> {
    let matched = match (left, right) {
        _ if op == BinaryOp::Equal => Some(Value::Bool(left.is_equal(right))),
        _ if op == BinaryOp::NotEqual => Some(Value::Bool(!left.is_equal(right))),
        (Value::Int(a), Value::Int(b)) => integer(*a, op, *b)?,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => float(a, op, b)?,
                _ => None,
            }
        }
        (Value::Bool(a), Value::Bool(b)) => logical(*a, op, *b),
        _ => None,
    };
    match matched {
        Some(value) => Ok(value),
        None if op == BinaryOp::Add
            && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_))) =>
        {
            Ok(Value::Str(format!("{left}{right}")))
        }
        None => Err(not_implemented(left, op, right)),
    }
}

fn integer(a: i64, op: BinaryOp, b: i64) -> Result<Option<Value>, RuntimeError> {
    let value = match op {
        BinaryOp::Add => Value::Int(a.wrapping_add(b)),
        BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinaryOp::Div => Value::Int(floor_div(a, b)?),
        BinaryOp::Rem => Value::Int(floor_rem(a, b)?),
        BinaryOp::Less => Value::Bool(a < b),
        BinaryOp::Greater => Value::Bool(a > b),
        BinaryOp::LessEqual => Value::Bool(a <= b),
        BinaryOp::GreaterEqual => Value::Bool(a >= b),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn float(a: f64, op: BinaryOp, b: f64) -> Result<Option<Value>, RuntimeError> {
    let value = match op {
        BinaryOp::Add => Value::Float(a + b),
        BinaryOp::Sub => Value::Float(a - b),
        BinaryOp::Mul => Value::Float(a * b),
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => return Err(RuntimeError::DivisionByZero),
        BinaryOp::Div => Value::Float(a / b),
        BinaryOp::Rem => Value::Float(a % b),
        BinaryOp::Less => Value::Bool(a < b),
        BinaryOp::Greater => Value::Bool(a > b),
        BinaryOp::LessEqual => Value::Bool(a <= b),
        BinaryOp::GreaterEqual => Value::Bool(a >= b),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn logical(a: bool, op: BinaryOp, b: bool) -> Option<Value> {
    match op {
        BinaryOp::And => Some(Value::Bool(a && b)),
        BinaryOp::Or => Some(Value::Bool(a || b)),
        _ => None,
    }
}

/// Quotient rounded toward negative infinity.
fn floor_div(a: i64, b: i64) -> Result<i64, RuntimeError> {
    if b == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

/// Remainder carrying the sign of the divisor.
fn floor_rem(a: i64, b: i64) -> Result<i64, RuntimeError> {
    if b == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

pub fn not(operand: &Value) -> Result<Value, RuntimeError> {
    match operand {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(RuntimeError::OperatorNotImplemented(format!(
            "not {}",
            other.type_tag()
        ))),
    }
}

pub fn negate(operand: &Value) -> Result<Value, RuntimeError> {
    match operand {
        Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
        Value::Float(n) => Ok(Value::Float(-n)),
        other => Err(RuntimeError::OperatorNotImplemented(format!(
            "-{}",
            other.type_tag()
        ))),
    }
}
