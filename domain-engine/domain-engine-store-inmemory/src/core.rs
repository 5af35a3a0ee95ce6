use arcstr::ArcStr;
use fnv::FnvHashMap;
use indexmap::IndexMap;
use ontol_runtime::{
    ontology::{
        domain::{Cardinality, FieldTarget, Optionality},
        Ontology,
    },
    value::Value,
    DefId,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use domain_engine_core::{DomainError, DomainResult};

pub(super) struct InMemoryStore {
    pub vertices: FnvHashMap<DefId, VertexTable>,
    pub serial_counter: u64,
}

/// Entities of one concrete type, by serial number.
pub type VertexTable = IndexMap<u64, Vertex>;

#[derive(Clone, Default, Debug)]
pub struct Vertex {
    pub attrs: FnvHashMap<ArcStr, StoredAttr>,
}

#[derive(Clone, Debug)]
pub enum StoredAttr {
    Value(Value),
    Links(SmallVec<VertexKey, 1>),
}

/// Address of a stored entity.
///
/// Serial numbers are allocated in insertion order across all types.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct VertexKey {
    pub type_def_id: DefId,
    pub serial: u64,
}

/// An entity to be inserted.
#[derive(Clone, Debug)]
pub struct EntityData {
    pub def_id: DefId,
    pub attrs: Vec<(ArcStr, EntityAttr)>,
}

#[derive(Clone, Debug)]
pub enum EntityAttr {
    Value(Value),
    Links(Vec<VertexKey>),
}

impl EntityData {
    pub fn new(def_id: DefId) -> Self {
        Self {
            def_id,
            attrs: vec![],
        }
    }

    pub fn prop(mut self, name: impl Into<ArcStr>, value: impl Into<Value>) -> Self {
        self.attrs
            .push((name.into(), EntityAttr::Value(value.into())));
        self
    }

    pub fn link(self, name: impl Into<ArcStr>, target: VertexKey) -> Self {
        self.links(name, [target])
    }

    pub fn links(
        mut self,
        name: impl Into<ArcStr>,
        targets: impl IntoIterator<Item = VertexKey>,
    ) -> Self {
        self.attrs.push((
            name.into(),
            EntityAttr::Links(targets.into_iter().collect()),
        ));
        self
    }
}

impl InMemoryStore {
    /// An empty table for every concrete type.
    pub fn new(ontology: &Ontology) -> Self {
        let mut vertices: FnvHashMap<DefId, VertexTable> = Default::default();

        for def in ontology.defs() {
            if def.is_concrete() {
                debug!("new collection {:?} (`{}`)", def.id, def.name);
                vertices.insert(def.id, Default::default());
            }
        }

        Self {
            vertices,
            serial_counter: 0,
        }
    }

    pub fn insert(&mut self, data: EntityData, ontology: &Ontology) -> DomainResult<VertexKey> {
        let def = ontology.def(data.def_id);
        if !self.vertices.contains_key(&def.id) {
            return Err(DomainError::data_store(format!(
                "`{}` has no instances of its own",
                def.name
            )));
        }

        let mut vertex = Vertex::default();

        for (name, attr) in data.attrs {
            let field = def.field(&name).ok_or_else(|| {
                DomainError::data_store(format!("`{name}` is not a field of `{}`", def.name))
            })?;

            let stored = match (field.target, attr) {
                (FieldTarget::Scalar(kind), EntityAttr::Value(value)) => {
                    if !value.conforms_to(kind) {
                        return Err(DomainError::data_store(format!(
                            "{value} is not a valid {kind:?} for `{name}`"
                        )));
                    }
                    StoredAttr::Value(value)
                }
                (FieldTarget::Def(target), EntityAttr::Links(keys)) => {
                    if field.cardinality == Cardinality::One && keys.len() > 1 {
                        return Err(DomainError::data_store(format!(
                            "`{name}` links to at most one entity"
                        )));
                    }
                    for key in &keys {
                        if !ontology.is_subtype_of(key.type_def_id, target) {
                            return Err(DomainError::data_store(format!(
                                "`{name}` cannot link to a `{}`",
                                ontology.def(key.type_def_id).name
                            )));
                        }
                        if self.look_up_vertex(*key).is_none() {
                            return Err(DomainError::data_store(format!(
                                "`{name}` links to a missing entity"
                            )));
                        }
                    }
                    StoredAttr::Links(keys.into_iter().collect())
                }
                _ => {
                    return Err(DomainError::data_store(format!(
                        "`{name}` mixes up properties and links"
                    )));
                }
            };

            if vertex.attrs.insert(name.clone(), stored).is_some() {
                return Err(DomainError::data_store(format!("`{name}` given twice")));
            }
        }

        for field in def.fields.values() {
            if field.optionality == Optionality::Mandatory && !vertex.attrs.contains_key(&field.name)
            {
                return Err(DomainError::data_store(format!(
                    "`{}` is required on `{}`",
                    field.name, def.name
                )));
            }
        }

        self.serial_counter += 1;
        let key = VertexKey {
            type_def_id: def.id,
            serial: self.serial_counter,
        };

        if let Some(table) = self.vertices.get_mut(&def.id) {
            table.insert(key.serial, vertex);
        }

        Ok(key)
    }

    pub fn look_up_vertex(&self, key: VertexKey) -> Option<&Vertex> {
        self.vertices.get(&key.type_def_id)?.get(&key.serial)
    }
}

impl Vertex {
    /// The scalar value of a property, `Null` when unset.
    pub fn value(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;

        match self.attrs.get(name) {
            Some(StoredAttr::Value(value)) => value,
            _ => &NULL,
        }
    }

    pub fn links(&self, name: &str) -> &[VertexKey] {
        match self.attrs.get(name) {
            Some(StoredAttr::Links(keys)) => keys.as_slice(),
            _ => &[],
        }
    }
}
