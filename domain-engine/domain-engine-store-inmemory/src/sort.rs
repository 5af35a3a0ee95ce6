use std::cmp::Ordering;

use ontol_runtime::query::order::OrderBy;

use crate::core::{Vertex, VertexKey};

/// Stable sort by a tuple of sort keys, the first key taking precedence.
pub(super) fn sort_vertices(vertices: &mut [(VertexKey, &Vertex)], order: &[OrderBy]) {
    if order.is_empty() {
        return;
    }

    vertices.sort_by(|(_, a), (_, b)| compare_order_tuple(a, b, order));
}

fn compare_order_tuple(a: &Vertex, b: &Vertex, order: &[OrderBy]) -> Ordering {
    for order_by in order {
        match order_by.compare(a.value(&order_by.field), b.value(&order_by.field)) {
            Ordering::Equal => continue,
            unequal => return unequal,
        }
    }

    Ordering::Equal
}
