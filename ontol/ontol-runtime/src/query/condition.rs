use std::fmt::{Debug, Display};

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Debug)]
pub enum Comparison {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Self::Eq),
            "neq" => Some(Self::Neq),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// A boolean predicate over the scalar properties of one entity.
///
/// The empty conjunction is the default and matches everything.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
    Compare(ArcStr, Comparison, Value),
    /// Whether the property holds a non-null value
    Exists(ArcStr, bool),
}

impl Default for Condition {
    fn default() -> Self {
        Self::All(vec![])
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn write_list(
            f: &mut std::fmt::Formatter<'_>,
            op: &str,
            conditions: &[Condition],
        ) -> std::fmt::Result {
            write!(f, "({op}")?;
            for condition in conditions {
                write!(f, " {condition}")?;
            }
            write!(f, ")")
        }

        match self {
            Self::All(conditions) => write_list(f, "and", conditions),
            Self::Any(conditions) => write_list(f, "or", conditions),
            Self::Not(inner) => write!(f, "(not {inner})"),
            Self::Compare(field, comparison, value) => {
                write!(f, "({} {field} {value})", comparison.symbol())
            }
            Self::Exists(field, exists) => write!(f, "(exists {field} {exists})"),
        }
    }
}

impl Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_s_expression() {
        let condition = Condition::All(vec![
            Condition::Compare("q".into(), Comparison::Eq, Value::text("bar")),
            Condition::Not(Box::new(Condition::Exists("w".into(), true))),
        ]);

        assert_eq!("(and (= q 'bar') (not (exists w true)))", condition.to_string());
    }
}
