#![forbid(unsafe_code)]

use std::fmt::Debug;

use ::serde::{Deserialize, Serialize};
use fnv::FnvBuildHasher;
use indexmap::IndexMap;
use smallvec::SmallVec;

pub mod ontology;
pub mod query;
pub mod row;
pub mod value;

/// One type definition inside the schema.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct DefId(pub u16);

impl DefId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// This forces single-line output even when pretty-printed
impl Debug for DefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "def@{}", self.0)
    }
}

/// Sorted set of DefIds
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Debug)]
pub struct DefIdSet(SmallVec<DefId, 2>);

impl DefIdSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[DefId] {
        self.0.as_slice()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DefId> {
        self.0.iter()
    }

    pub fn contains(&self, def_id: &DefId) -> bool {
        self.0.binary_search(def_id).is_ok()
    }

    pub fn insert(&mut self, def_id: DefId) {
        match self.0.binary_search(&def_id) {
            Ok(_pos) => {} // element already in vector @ `pos`
            Err(pos) => self.0.insert(pos, def_id),
        }
    }
}

impl FromIterator<DefId> for DefIdSet {
    fn from_iter<T: IntoIterator<Item = DefId>>(iter: T) -> Self {
        let mut set = Self::default();
        for def_id in iter {
            set.insert(def_id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a DefIdSet {
    type Item = &'a DefId;
    type IntoIter = std::slice::Iter<'a, DefId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

pub type FnvIndexMap<K, V> = IndexMap<K, V, FnvBuildHasher>;
