//! The Ontology: the compiled, immutable schema index.

use arcstr::ArcStr;
use fnv::FnvHashMap;

use crate::{DefId, DefIdSet, FnvIndexMap};

use self::{
    builder::OntologyBuilder,
    domain::{Def, Field},
};

pub mod builder;
pub mod domain;

/// The Ontology is the read-only model of the schema that queries run against.
///
/// It is built once (see [OntologyBuilder]) and then shared between concurrently
/// executing queries, typically inside an `Arc`.
pub struct Ontology {
    defs: Vec<Def>,
    def_names: FnvHashMap<ArcStr, DefId>,
    typenames: FnvHashMap<ArcStr, DefId>,
    /// Interface name to all types satisfying it, including inheritors.
    interfaces: FnvHashMap<ArcStr, DefIdSet>,
}

impl Ontology {
    /// Make a builder for building an Ontology from scratch.
    pub fn builder() -> OntologyBuilder {
        OntologyBuilder::default()
    }

    pub fn def(&self, def_id: DefId) -> &Def {
        &self.defs[def_id.index()]
    }

    /// Like [Ontology::def], for ids that may come from outside the ontology.
    pub fn get_def(&self, def_id: DefId) -> Option<&Def> {
        self.defs.get(def_id.index())
    }

    pub fn defs(&self) -> impl Iterator<Item = &Def> {
        self.defs.iter()
    }

    /// Look up a type by its data store (interface) name.
    pub fn find_def(&self, name: &str) -> Option<&Def> {
        self.def_names.get(name).map(|def_id| self.def(*def_id))
    }

    /// Look up a type by its externally visible name.
    pub fn find_def_by_typename(&self, typename: &str) -> Option<&Def> {
        self.typenames.get(typename).map(|def_id| self.def(*def_id))
    }

    /// All types that inherit from `def_id`, including `def_id` itself.
    pub fn subtypes_of(&self, def_id: DefId) -> &DefIdSet {
        &self.def(def_id).subtypes
    }

    pub fn fields_of(&self, def_id: DefId) -> &FnvIndexMap<ArcStr, Field> {
        &self.def(def_id).fields
    }

    pub fn is_subtype_of(&self, sub: DefId, sup: DefId) -> bool {
        self.subtypes_of(sup).contains(&sub)
    }

    /// The instantiable types among the subtypes of `def_id`.
    pub fn concrete_subtypes(&self, def_id: DefId) -> DefIdSet {
        self.subtypes_of(def_id)
            .iter()
            .copied()
            .filter(|subtype| self.def(*subtype).is_concrete())
            .collect()
    }

    /// All types satisfying the named interface.
    pub fn interface_members(&self, name: &str) -> Option<&DefIdSet> {
        self.interfaces.get(name)
    }
}
