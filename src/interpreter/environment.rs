use std::collections::HashMap;

use crate::error::RuntimeError;
use crate::interpreter::value::Value;

/// Variables of one run. There is a single flat scope; assignment both
/// defines and updates.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_and_get() {
        let mut env = Environment::new();
        env.assign("x", Value::Int(42));
        assert!(matches!(env.get("x"), Ok(Value::Int(42))));
    }

    #[test]
    fn reassign_replaces_value_and_type() {
        let mut env = Environment::new();
        env.assign("x", Value::Int(1));
        env.assign("x", Value::Str("one".into()));
        assert!(matches!(env.get("x"), Ok(Value::Str(s)) if s == "one"));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn undefined_is_an_error() {
        let env = Environment::new();
        assert!(env.is_empty());
        assert!(matches!(
            env.get("x"),
            Err(RuntimeError::UndefinedVariable(name)) if name == "x"
        ));
    }

    #[test]
    fn null_is_a_defined_value() {
        let mut env = Environment::new();
        env.assign("x", Value::Null);
        assert!(matches!(env.get("x"), Ok(Value::Null)));
    }
}
