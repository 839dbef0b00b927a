use std::fmt;

use crate::interpreter::callable::NativeFunction;
use crate::services::ServiceClient;

#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Function(NativeFunction),
    ServiceRoot,
    Service(ServiceHandle),
}

/// Runtime type tag, spelled the way error messages show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum TypeTag {
    Int,
    Float,
    String,
    Bool,
    Null,
    NativeFunction,
    ServiceRoot,
    ServiceHandle,
}

/// A value bound to one resolved service.
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    pub name: String,
    pub client: ServiceClient,
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Int(_) => TypeTag::Int,
            Self::Float(_) => TypeTag::Float,
            Self::Str(_) => TypeTag::String,
            Self::Bool(_) => TypeTag::Bool,
            Self::Null => TypeTag::Null,
            Self::Function(_) => TypeTag::NativeFunction,
            Self::ServiceRoot => TypeTag::ServiceRoot,
            Self::Service(_) => TypeTag::ServiceHandle,
        }
    }

    /// Numeric payload widened to `f64`, for mixed int/float arithmetic.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Equality behind `==` and `!=`. Ints and floats compare by numeric
    /// value; functions, the service root and handles never compare equal.
    pub fn is_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            // f64's Display already drops the fraction of whole numbers
            Self::Float(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
            Self::Function(func) => write!(f, "{func}"),
            Self::ServiceRoot => write!(f, "<service root>"),
            Self::Service(handle) => write!(f, "<service {}>", handle.name),
        }
    }
}
