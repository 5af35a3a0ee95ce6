use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
};

use ::serde::{Deserialize, Serialize};
use arcstr::ArcStr;

use crate::ontology::domain::ScalarKind;

/// A scalar value produced or consumed by the data store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    I64(i64),
    F64(f64),
    Text(ArcStr),
}

impl Value {
    pub fn text(text: impl Into<ArcStr>) -> Self {
        Self::Text(text.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is admissible for a property of the given scalar kind.
    ///
    /// Integers are accepted where floats are expected.
    pub fn conforms_to(&self, kind: ScalarKind) -> bool {
        matches!(
            (self, kind),
            (Self::Null, _)
                | (Self::Boolean(_), ScalarKind::Boolean)
                | (Self::I64(_), ScalarKind::I64 | ScalarKind::F64)
                | (Self::F64(_), ScalarKind::F64)
                | (Self::Text(_), ScalarKind::Text)
        )
    }

    /// Compare two non-null values.
    ///
    /// Numbers compare numerically across integer and float representation.
    /// Values of unrelated kinds are ordered by kind, so the ordering is total.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::I64(a), Self::I64(b)) => a.cmp(b),
            (Self::F64(a), Self::F64(b)) => a.total_cmp(b),
            (Self::I64(a), Self::F64(b)) => (*a as f64).total_cmp(b),
            (Self::F64(a), Self::I64(b)) => a.total_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => a.as_str().cmp(b.as_str()),
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::I64(_) | Self::F64(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(bool) => serde_json::Value::Bool(*bool),
            Value::I64(int) => serde_json::Value::from(*int),
            Value::F64(float) => serde_json::Value::from(*float),
            Value::Text(text) => serde_json::Value::String(text.to_string()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(bool) => write!(f, "{bool}"),
            Self::I64(int) => write!(f, "{int}"),
            Self::F64(float) => write!(f, "{float}"),
            Self::Text(text) => write!(f, "'{text}'"),
        }
    }
}
