use serde::{Deserialize, Serialize};

use super::{condition::Condition, order::OrderBy};

/// A combination of a condition and an order, without select.
#[derive(Clone, PartialEq, Default, Serialize, Deserialize, Debug)]
pub struct Filter {
    condition: Condition,
    order: Vec<OrderBy>,
}

impl Filter {
    pub fn new(condition: Condition, order: Vec<OrderBy>) -> Self {
        Self { condition, order }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Sort keys, the first one taking precedence
    pub fn order(&self) -> &[OrderBy] {
        &self.order
    }
}
