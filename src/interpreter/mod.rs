pub mod callable;
pub mod environment;
pub mod operators;
pub mod value;

use std::collections::HashMap;
use std::io::Write;

use crate::ast::*;
use crate::error::{Error, RuntimeError};
use crate::interpreter::callable::NativeFunction;
use crate::interpreter::environment::Environment;
use crate::interpreter::operators::BinaryOp;
use crate::interpreter::value::{ServiceHandle, Value};
use crate::services::{BoxFuture, ServiceRegistry};

/// Jump targets by label name, built once before a run starts.
#[derive(Debug, Default)]
pub struct LabelIndex {
    positions: HashMap<String, usize>,
}

impl LabelIndex {
    /// A label defined twice keeps its last position.
    pub fn build(program: &Program) -> Self {
        let mut positions = HashMap::new();
        for (index, statement) in program.statements.iter().enumerate() {
            if let Some(name) = statement.label_name()
                && let Some(previous) = positions.insert(name.to_string(), index)
            {
                tracing::warn!(
                    label = name,
                    previous,
                    index,
                    position = %statement.position,
                    "duplicate label overrides earlier definition"
                );
            }
        }
        Self { positions }
    }

    pub fn resolve(&self, name: &str) -> Result<usize, RuntimeError> {
        self.positions
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::LabelNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

enum Flow {
    Next,
    Jump(usize),
}

pub struct Interpreter {
    registry: ServiceRegistry,
    /// Variables of the current run; empty between runs.
    environment: Environment,
    /// Printed lines, kept only by [`Interpreter::capturing`].
    output: Option<Vec<String>>,
    /// Writer for print output (allows testing without stdout)
    writer: Box<dyn Write + Send>,
}

impl Interpreter {
    pub fn with_writer(registry: ServiceRegistry, writer: Box<dyn Write + Send>) -> Self {
        Self {
            registry,
            environment: Environment::new(),
            output: None,
            writer,
        }
    }

    /// Like [`Interpreter::with_writer`], but also keeps every printed line
    /// for [`Interpreter::output`].
    pub fn capturing(registry: ServiceRegistry, writer: Box<dyn Write + Send>) -> Self {
        Self {
            output: Some(Vec::new()),
            ..Self::with_writer(registry, writer)
        }
    }

    /// Lines printed so far; always empty unless capturing.
    pub fn output(&self) -> &[String] {
        self.output.as_deref().unwrap_or_default()
    }

    /// Run `program` from its first statement until the program counter
    /// passes the end or a statement fails. Each run starts with no
    /// variables and drops its variables when it ends.
    pub async fn interpret(&mut self, program: &Program) -> Result<(), Error> {
        self.environment = Environment::new();
        let result = self.run(program).await;
        self.environment = Environment::new();
        result
    }

    async fn run(&mut self, program: &Program) -> Result<(), Error> {
        let labels = LabelIndex::build(program);
        // labels execute as no-ops
        let steps: Vec<Option<&Statement>> = program
            .statements
            .iter()
            .map(|s| s.label_name().map_or(Some(s), |_| None))
            .collect();
        tracing::debug!(
            statements = steps.len(),
            labels = labels.len(),
            "running program"
        );

        let mut pc = 0;
        while pc < steps.len() {
            let Some(statement) = steps[pc] else {
                pc += 1;
                continue;
            };
            tracing::trace!(pc, position = %statement.position, "execute");
            let flow = self
                .execute(statement, &labels)
                .await
                .map_err(|source| Error::Runtime {
                    source,
                    position: Some(statement.position.clone()),
                })?;
            pc = match flow {
                Flow::Next => pc + 1,
                Flow::Jump(target) => target,
            };
        }
        Ok(())
    }

    async fn execute(
        &mut self,
        statement: &Statement,
        labels: &LabelIndex,
    ) -> Result<Flow, RuntimeError> {
        match &statement.kind {
            StmtKind::Label { .. } => Ok(Flow::Next),
            StmtKind::Assign { target, value } => {
                let Expr::Variable(name) = target else {
                    return Err(RuntimeError::UnsupportedAssignmentTarget);
                };
                let value = self.evaluate(value).await?;
                self.environment.assign(name.as_str(), value);
                Ok(Flow::Next)
            }
            StmtKind::If {
                condition,
                true_label,
                false_label,
            } => {
                let chosen = match self.evaluate(condition).await? {
                    Value::Bool(true) => Some(true_label),
                    Value::Bool(false) => false_label.as_ref(),
                    other => {
                        return Err(RuntimeError::NonBooleanCondition(
                            other.type_tag().to_string(),
                        ));
                    }
                };
                match chosen {
                    Some(label) => Ok(Flow::Jump(labels.resolve(label)?)),
                    None => Ok(Flow::Next),
                }
            }
            StmtKind::Goto { label } => Ok(Flow::Jump(labels.resolve(label)?)),
            StmtKind::Print { expr } => {
                let text = self.evaluate(expr).await?.to_string();
                writeln!(self.writer, "{text}")?;
                if let Some(output) = &mut self.output {
                    output.push(text);
                }
                Ok(Flow::Next)
            }
            StmtKind::Expression { expr } => {
                self.evaluate(expr).await?;
                Ok(Flow::Next)
            }
        }
    }

    pub fn evaluate<'a>(&'a mut self, expr: &'a Expr) -> BoxFuture<'a, Result<Value, RuntimeError>> {
        Box::pin(async move {
            match expr {
                Expr::Int(n) => Ok(Value::Int(*n)),
                Expr::Float(n) => Ok(Value::Float(*n)),
                Expr::Str(s) => Ok(Value::Str(s.clone())),
                Expr::Bool(b) => Ok(Value::Bool(*b)),
                Expr::Null => Ok(Value::Null),
                Expr::Variable(name) => self.environment.get(name),
                Expr::SystemFunc(name) => NativeFunction::system(name)
                    .map(Value::Function)
                    .ok_or_else(|| RuntimeError::UnknownSystemFunction(name.clone())),
                Expr::ServiceRoot => Ok(Value::ServiceRoot),
                Expr::OpsChain(chain) => self.evaluate_chain(chain).await,
                Expr::Field(field) => {
                    let root = self.evaluate(&field.root).await?;
                    self.field(root, &field.name)
                }
                Expr::Index(index) => {
                    let root = self.evaluate(&index.root).await?;
                    Err(RuntimeError::UnsupportedIndex(root.type_tag().to_string()))
                }
                Expr::Invoke(invoke) => {
                    let callee = self.evaluate(&invoke.root).await?;
                    let mut args = Vec::with_capacity(invoke.args.len());
                    for arg in &invoke.args {
                        args.push(self.evaluate(arg).await?);
                    }
                    self.call(callee, &args).await
                }
                Expr::Not(operand) => operators::not(&self.evaluate(operand).await?),
                Expr::Neg(operand) => operators::negate(&self.evaluate(operand).await?),
            }
        })
    }

    /// Fold a chain left to right. Arithmetic chains evaluate every operand
    /// first; `and`/`or` chains stop evaluating once the result is settled.
    fn evaluate_chain<'a>(
        &'a mut self,
        chain: &'a OpsChain,
    ) -> BoxFuture<'a, Result<Value, RuntimeError>> {
        Box::pin(async move {
            let ops = chain
                .operators
                .iter()
                .map(|token| BinaryOp::parse(&token.text))
                .collect::<Result<Vec<_>, _>>()?;
            let Some((first, rest)) = chain.operands.split_first() else {
                return Err(RuntimeError::OperatorNotImplemented(
                    "empty operator chain".to_string(),
                ));
            };
            let mut acc = self.evaluate(first).await?;

            if ops.iter().any(|op| op.is_logical()) {
                for (op, operand) in ops.iter().zip(rest) {
                    if matches!(
                        (op, &acc),
                        (BinaryOp::And, Value::Bool(false)) | (BinaryOp::Or, Value::Bool(true))
                    ) {
                        continue;
                    }
                    let right = self.evaluate(operand).await?;
                    acc = operators::binary(&acc, *op, &right)?;
                }
            } else {
                let mut values = Vec::with_capacity(rest.len());
                for operand in rest {
                    values.push(self.evaluate(operand).await?);
                }
                for (op, right) in ops.iter().zip(&values) {
                    acc = operators::binary(&acc, *op, right)?;
                }
            }
            Ok(acc)
        })
    }

    fn field(&self, root: Value, name: &str) -> Result<Value, RuntimeError> {
        match root {
            Value::ServiceRoot => {
                let client = self.registry.resolve(name, None)?;
                Ok(Value::Service(ServiceHandle {
                    name: name.to_string(),
                    client,
                }))
            }
            Value::Service(handle) if name == "sendString" => {
                Ok(Value::Function(NativeFunction::SendString(handle.client)))
            }
            _ => Err(RuntimeError::UnknownField(name.to_string())),
        }
    }

    async fn call(&mut self, callee: Value, args: &[Value]) -> Result<Value, RuntimeError> {
        let Value::Function(function) = callee else {
            return Err(RuntimeError::NotCallable(callee.type_tag().to_string()));
        };
        function.check_args(args)?;
        tracing::trace!(function = function.name(), args = args.len(), "native call");
        Ok(function.call(args).await?.into_value())
    }
}
