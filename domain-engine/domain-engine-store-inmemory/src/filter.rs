use std::cmp::Ordering;

use ontol_runtime::{
    query::condition::{Comparison, Condition},
    value::Value,
};

use crate::core::Vertex;

/// Evaluate a condition against the scalar properties of one vertex.
///
/// Unset properties count as null. Null is only equal to null and is never
/// ordered against anything.
pub(super) fn eval_condition(condition: &Condition, vertex: &Vertex) -> bool {
    match condition {
        Condition::All(conditions) => conditions.iter().all(|cond| eval_condition(cond, vertex)),
        Condition::Any(conditions) => conditions.iter().any(|cond| eval_condition(cond, vertex)),
        Condition::Not(inner) => !eval_condition(inner, vertex),
        Condition::Exists(field, exists) => !vertex.value(field).is_null() == *exists,
        Condition::Compare(field, comparison, operand) => {
            compare(vertex.value(field), *comparison, operand)
        }
    }
}

fn compare(value: &Value, comparison: Comparison, operand: &Value) -> bool {
    let ordering = match (value.is_null(), operand.is_null()) {
        (true, true) => Some(Ordering::Equal),
        (false, false) => Some(value.total_cmp(operand)),
        _ => None,
    };

    match (comparison, ordering) {
        (Comparison::Eq, ordering) => ordering == Some(Ordering::Equal),
        (Comparison::Neq, ordering) => ordering != Some(Ordering::Equal),
        (_, None) => false,
        (_, Some(_)) if value.is_null() => false,
        (Comparison::Gt, Some(ordering)) => ordering.is_gt(),
        (Comparison::Gte, Some(ordering)) => ordering.is_ge(),
        (Comparison::Lt, Some(ordering)) => ordering.is_lt(),
        (Comparison::Lte, Some(ordering)) => ordering.is_le(),
    }
}
