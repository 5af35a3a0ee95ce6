use domain_engine_core::{domain_error::DomainErrorKind, DomainResult};
use ontol_runtime::{
    ontology::{domain::Field, Ontology},
    DefId, DefIdSet,
};

/// Maps GraphQL type names to the concrete types of the ontology.
///
/// A type is addressed either by its own name, which doubles as its GraphQL interface name,
/// or by its typename, which is the name of its GraphQL object type.
/// Both denote the type together with all its subtypes.
#[derive(Clone, Copy)]
pub struct TypeResolver<'o> {
    ontology: &'o Ontology,
}

impl<'o> TypeResolver<'o> {
    pub fn new(ontology: &'o Ontology) -> Self {
        Self { ontology }
    }

    pub fn ontology(&self) -> &'o Ontology {
        self.ontology
    }

    /// The type a GraphQL type name denotes, if it names a single type.
    pub fn find_def(&self, name: &str) -> Option<DefId> {
        self.ontology
            .find_def(name)
            .or_else(|| self.ontology.find_def_by_typename(name))
            .map(|def| def.id)
    }

    /// The instantiable types a value of the named GraphQL type can have at runtime.
    pub fn concrete_types(&self, name: &str) -> DomainResult<DefIdSet> {
        if let Some(def_id) = self.find_def(name) {
            return Ok(self.concrete_types_of(def_id));
        }

        match self.ontology.interface_members(name) {
            Some(members) => {
                let mut set = DefIdSet::default();
                for member in members {
                    for concrete in &self.concrete_types_of(*member) {
                        set.insert(*concrete);
                    }
                }
                Ok(set)
            }
            None => Err(DomainErrorKind::UnknownType(name.to_string()).into_error()),
        }
    }

    pub fn concrete_types_of(&self, def_id: DefId) -> DefIdSet {
        self.ontology.concrete_subtypes(def_id)
    }

    /// Resolve a field requested on an instance of the concrete type.
    ///
    /// Overrides declared by the concrete type or its closest ancestors take effect here.
    pub fn field(&self, concrete: DefId, name: &str) -> DomainResult<&'o Field> {
        let def = self.ontology.def(concrete);
        def.field(name).ok_or_else(|| {
            DomainErrorKind::UnknownFieldForType {
                typename: def.typename.to_string(),
                field: name.to_string(),
            }
            .into_error()
        })
    }
}
