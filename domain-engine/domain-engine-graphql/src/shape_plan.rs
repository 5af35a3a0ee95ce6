//! The output shape of a query, planned per concrete type.

use std::fmt::Debug;

use arcstr::ArcStr;
use ontol_runtime::{ontology::domain::Cardinality, DefId, FnvIndexMap};

use crate::argument::CollectionArgs;

/// The selections of an operation's root fields, by output alias.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct RootPlan {
    pub fields: FnvIndexMap<ArcStr, RootField>,
}

impl RootPlan {
    /// The collections to fetch, in output order.
    pub fn collections(&self) -> impl Iterator<Item = &CollectionPlan> {
        self.fields.values().filter_map(|field| match field {
            RootField::Typename => None,
            RootField::Collection(collection) => Some(collection),
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum RootField {
    /// `__typename` of the query root
    Typename,
    /// All instances of a type
    Collection(CollectionPlan),
}

#[derive(Clone, PartialEq, Debug)]
pub struct CollectionPlan {
    pub args: CollectionArgs,
    pub shape: ShapePlan,
}

/// Per-instance output shape at one position of the query.
///
/// There is exactly one branch for every concrete type that can occur at the position,
/// possibly without any fields.
#[derive(Clone, PartialEq, Debug)]
pub struct ShapePlan {
    /// The declared type at this position
    pub def_id: DefId,
    pub branches: FnvIndexMap<DefId, Branch>,
}

impl ShapePlan {
    pub fn branch(&self, concrete: DefId) -> Option<&Branch> {
        self.branches.get(&concrete)
    }

    pub fn concrete_types(&self) -> impl Iterator<Item = DefId> + '_ {
        self.branches.keys().copied()
    }
}

/// The output fields of one concrete type, in first-selection order.
#[derive(Clone, PartialEq, Default)]
pub struct Branch {
    pub fields: FnvIndexMap<ArcStr, OutputField>,
}

impl Debug for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum OutputField {
    /// The externally visible name of the concrete type
    Typename,
    /// A scalar property, by field name
    Property(ArcStr),
    Link {
        field: ArcStr,
        cardinality: Cardinality,
        collection: CollectionPlan,
    },
}
