use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use super::filter::Filter;
use crate::{DefId, DefIdSet, FnvIndexMap};

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub enum Select {
    /// A scalar property
    Leaf,
    /// A link to other entities, fetched as nested rows
    Link(EntitySelect),
}

/// Select a collection of entities.
///
/// Used for root queries and for the contents of links.
/// The nested rows of a single-valued link are selected the same way,
/// the data store then yields at most one row.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct EntitySelect {
    pub source: StructSelect,
    pub filter: Filter,
    /// Maximum number of rows. `None` means unlimited.
    pub limit: Option<usize>,
    /// Number of rows to skip, after filtering and ordering
    pub offset: usize,
}

/// The polymorphic projection of a collection.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct StructSelect {
    /// The declared type of the collection
    pub def_id: DefId,
    /// The concrete types whose instances are in scope.
    /// Every row is tagged with one of these.
    pub variants: DefIdSet,
    /// The union of properties needed by any variant.
    /// A property missing on some variant is simply absent from its rows.
    pub properties: FnvIndexMap<ArcStr, Select>,
}

impl StructSelect {
    pub fn new(def_id: DefId, variants: DefIdSet) -> Self {
        Self {
            def_id,
            variants,
            properties: Default::default(),
        }
    }

    pub fn into_entity_select(self) -> EntitySelect {
        EntitySelect {
            source: self,
            filter: Filter::default(),
            limit: None,
            offset: 0,
        }
    }
}

impl From<StructSelect> for EntitySelect {
    fn from(value: StructSelect) -> Self {
        value.into_entity_select()
    }
}
