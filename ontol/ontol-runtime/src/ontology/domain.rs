//! Type description model, part of the Ontology

use std::fmt::Debug;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::{DefId, DefIdSet, FnvIndexMap};

/// An object type in the schema.
#[derive(Clone, Serialize, Deserialize)]
pub struct Def {
    pub id: DefId,
    /// The name of the type in the data store, also used as the GraphQL interface name.
    pub name: ArcStr,
    /// The externally visible name, reported as `__typename`.
    pub typename: ArcStr,
    /// Abstract types have no instances of their own.
    pub is_abstract: bool,
    /// Direct ancestors, in declaration order.
    pub ancestors: Vec<DefId>,
    /// Names of interfaces satisfied by this type, including inherited ones.
    pub interfaces: Vec<ArcStr>,
    /// Own and inherited fields, own fields shadowing inherited ones.
    pub fields: FnvIndexMap<ArcStr, Field>,
    /// Reflexive and transitive closure of the types inheriting from this one.
    pub subtypes: DefIdSet,
}

impl Def {
    pub fn is_concrete(&self) -> bool {
        !self.is_abstract
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Fields declared or overridden by this type itself.
    pub fn own_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .values()
            .filter(move |field| field.declared_by == self.id)
    }
}

impl Debug for Def {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Def")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("ancestors", &self.ancestors)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Field {
    pub name: ArcStr,
    pub target: FieldTarget,
    pub cardinality: Cardinality,
    pub optionality: Optionality,
    /// The type that declared this field, or the type that last overrode it.
    pub declared_by: DefId,
    /// For overrides: the type whose declaration got overridden.
    pub overrides: Option<DefId>,
}

impl Field {
    pub fn target_def(&self) -> Option<DefId> {
        match self.target {
            FieldTarget::Def(def_id) => Some(def_id),
            FieldTarget::Scalar(_) => None,
        }
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.target {
            FieldTarget::Scalar(kind) => Some(kind),
            FieldTarget::Def(_) => None,
        }
    }

    /// Two fields are the same underlying field when the name and the
    /// declaring type agree.
    pub fn is_same_field(&self, other: &Field) -> bool {
        self.name == other.name && self.declared_by == other.declared_by
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum FieldTarget {
    Scalar(ScalarKind),
    Def(DefId),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ScalarKind {
    Boolean,
    I64,
    F64,
    Text,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Optionality {
    Mandatory,
    Optional,
}
