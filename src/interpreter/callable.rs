use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::RuntimeError;
use crate::interpreter::value::{TypeTag, Value};
use crate::services::ServiceClient;

/// Built-in callables. All of them may suspend the caller.
#[derive(Debug, Clone)]
pub enum NativeFunction {
    CurrentTime,
    Pause,
    /// `sendString` bound to one service.
    SendString(ServiceClient),
}

/// What a native call hands back before it is wrapped into a [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum NativeReturn {
    Number(f64),
    Bool(bool),
    Text(String),
    Absent,
}

impl NativeReturn {
    /// Whole numbers become `Int`, fractional ones `Float`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Value::Int(n as i64)
            }
            Self::Number(n) => Value::Float(n),
            Self::Bool(b) => Value::Bool(b),
            Self::Text(s) => Value::Str(s),
            Self::Absent => Value::Null,
        }
    }
}

impl NativeFunction {
    /// Look up a `$name` system function.
    pub fn system(name: &str) -> Option<Self> {
        match name {
            "currentTime" => Some(Self::CurrentTime),
            "pause" => Some(Self::Pause),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::CurrentTime => "currentTime",
            Self::Pause => "pause",
            Self::SendString(_) => "sendString",
        }
    }

    pub fn param_types(&self) -> &'static [TypeTag] {
        match self {
            Self::CurrentTime => &[],
            Self::Pause => &[TypeTag::Float],
            Self::SendString(_) => &[TypeTag::String],
        }
    }

    pub fn arity(&self) -> usize {
        self.param_types().len()
    }

    /// Check arity and exact argument tags; no coercion.
    pub fn check_args(&self, args: &[Value]) -> Result<(), RuntimeError> {
        if args.len() != self.arity() {
            return Err(RuntimeError::ArgumentCountMismatch {
                expected: self.arity(),
                found: args.len(),
            });
        }
        for (i, (arg, expected)) in args.iter().zip(self.param_types()).enumerate() {
            if arg.type_tag() != *expected {
                return Err(RuntimeError::ArgumentTypeMismatch {
                    position: i + 1,
                    expected: expected.to_string(),
                    found: arg.type_tag().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Run the function. Arguments must already have passed [`Self::check_args`].
    pub async fn call(&self, args: &[Value]) -> Result<NativeReturn, RuntimeError> {
        match (self, args) {
            (Self::CurrentTime, []) => {
                let secs = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs_f64())
                    .unwrap_or_default();
                Ok(NativeReturn::Number(secs))
            }
            (Self::Pause, [Value::Float(seconds)]) => {
                let millis = (seconds * 1000.0).floor();
                if millis > 0.0 {
                    tokio::time::sleep(Duration::from_millis(millis as u64)).await;
                }
                Ok(NativeReturn::Absent)
            }
            (Self::SendString(client), [Value::Str(request)]) => {
                let reply = client.send_string(request).await?;
                Ok(NativeReturn::Text(reply))
            }
            _ => {
                self.check_args(args)?;
                Err(RuntimeError::NotCallable(self.to_string()))
            }
        }
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_lookup() {
        assert!(matches!(
            NativeFunction::system("pause"),
            Some(NativeFunction::Pause)
        ));
        assert!(NativeFunction::system("sleep").is_none());
    }

    #[test]
    fn pause_rejects_non_float() {
        let err = NativeFunction::Pause
            .check_args(&[Value::Int(1)])
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ArgumentTypeMismatch { position: 1, .. }
        ));
        assert_eq!(err.to_string(), "expected float for argument #1 but found int");
    }

    #[test]
    fn arity_is_exact() {
        let err = NativeFunction::CurrentTime
            .check_args(&[Value::Null])
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ArgumentCountMismatch {
                expected: 0,
                found: 1
            }
        ));
    }

    #[test]
    fn wrapping_by_shape() {
        assert!(matches!(NativeReturn::Number(4.0).into_value(), Value::Int(4)));
        assert!(matches!(NativeReturn::Number(4.5).into_value(), Value::Float(n) if n == 4.5));
        assert!(matches!(NativeReturn::Bool(true).into_value(), Value::Bool(true)));
        assert!(matches!(NativeReturn::Absent.into_value(), Value::Null));
        assert!(matches!(NativeReturn::Text("ok".into()).into_value(), Value::Str(s) if s == "ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_sleeps_for_the_floored_delay() {
        let start = tokio::time::Instant::now();
        let result = NativeFunction::Pause
            .call(&[Value::Float(1.2345)])
            .await
            .expect("pause resolves");
        assert_eq!(result, NativeReturn::Absent);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1234), "slept {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1240), "slept {elapsed:?}");
    }

    #[tokio::test]
    async fn negative_pause_resolves_immediately() {
        let result = NativeFunction::Pause
            .call(&[Value::Float(-3.0)])
            .await
            .expect("pause resolves");
        assert_eq!(result, NativeReturn::Absent);
    }

    #[tokio::test]
    async fn current_time_is_after_epoch() {
        match NativeFunction::CurrentTime.call(&[]).await {
            Ok(NativeReturn::Number(secs)) => assert!(secs > 1_600_000_000.0),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
