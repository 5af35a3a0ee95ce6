//! Rows are what the data store produces for an [EntitySelect](crate::query::select::EntitySelect).

use arcstr::ArcStr;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

use crate::{value::Value, DefId};

/// One entity instance, tagged by its concrete type.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct Row {
    /// The discriminator
    pub def_id: DefId,
    pub attrs: FnvHashMap<ArcStr, Attr>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub enum Attr {
    Unit(Value),
    /// Single-valued link
    Row(Option<Row>),
    /// Multi-valued link
    Seq(Vec<Row>),
}

impl Row {
    pub fn new(def_id: DefId) -> Self {
        Self {
            def_id,
            attrs: Default::default(),
        }
    }

    pub fn with(mut self, name: impl Into<ArcStr>, attr: impl Into<Attr>) -> Self {
        self.attrs.insert(name.into(), attr.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.get(name)
    }
}

impl From<Value> for Attr {
    fn from(value: Value) -> Self {
        Self::Unit(value)
    }
}

impl From<Row> for Attr {
    fn from(value: Row) -> Self {
        Self::Row(Some(value))
    }
}

impl From<Option<Row>> for Attr {
    fn from(value: Option<Row>) -> Self {
        Self::Row(value)
    }
}

impl From<Vec<Row>> for Attr {
    fn from(value: Vec<Row>) -> Self {
        Self::Seq(value)
    }
}
