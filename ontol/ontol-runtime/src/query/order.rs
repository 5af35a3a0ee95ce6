use std::cmp::Ordering;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize, Debug)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    /// Re-order an [Ordering] by this direction
    pub fn reorder(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Where null values end up in a sorted sequence.
///
/// This is independent of [Direction]: nulls that are the smallest
/// come first in ascending order and last in descending order.
#[derive(Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize, Debug)]
pub enum Nulls {
    #[default]
    Smallest,
    Biggest,
}

/// One sort key of a collection.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct OrderBy {
    pub field: ArcStr,
    pub direction: Direction,
    pub nulls: Nulls,
}

impl OrderBy {
    pub fn new(field: impl Into<ArcStr>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
            nulls: Nulls::default(),
        }
    }

    pub fn with_nulls(self, nulls: Nulls) -> Self {
        Self { nulls, ..self }
    }

    /// Compare two values of this sort key.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => match self.nulls {
                Nulls::Smallest => Ordering::Less,
                Nulls::Biggest => Ordering::Greater,
            },
            (false, true) => match self.nulls {
                Nulls::Smallest => Ordering::Greater,
                Nulls::Biggest => Ordering::Less,
            },
            (false, false) => a.total_cmp(b),
        };

        self.direction.reorder(ordering)
    }
}
