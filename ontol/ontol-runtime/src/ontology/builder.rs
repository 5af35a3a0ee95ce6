use arcstr::ArcStr;
use fnv::FnvHashMap;
use thiserror::Error;
use tracing::debug;

use crate::{DefId, DefIdSet, FnvIndexMap};

use super::{
    domain::{Cardinality, Def, Field, FieldTarget, Optionality, ScalarKind},
    Ontology,
};

/// One more than the largest [DefId].
const MAX_DEFS: usize = u16::MAX as usize + 1;

/// Reasons a schema is rejected at construction.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("type `{0}` is defined more than once")]
    DuplicateType(ArcStr),
    #[error("`{name}` names a type and is the typename of `{other}`")]
    AmbiguousName { name: ArcStr, other: ArcStr },
    #[error("{0} types exceed the limit of {max}", max = MAX_DEFS)]
    TooManyTypes(usize),
    #[error("type `{referenced_by}` refers to unknown type `{name}`")]
    UnknownType { name: ArcStr, referenced_by: ArcStr },
    #[error("inheritance cycle: {}", .0.join(" -> "))]
    InheritanceCycle(Vec<ArcStr>),
    #[error("field `{field}` is declared more than once on `{def}`")]
    DuplicateField { def: ArcStr, field: ArcStr },
    #[error("`{def}.{field}` cannot override the declaration from `{overridden}`: {reason}")]
    IncompatibleOverride {
        def: ArcStr,
        field: ArcStr,
        overridden: ArcStr,
        reason: &'static str,
    },
    #[error("`{def}` inherits incompatible declarations of `{field}` from `{first}` and `{second}`")]
    IncompatibleInheritance {
        def: ArcStr,
        field: ArcStr,
        first: ArcStr,
        second: ArcStr,
    },
}

/// Builds an [Ontology] from type declarations.
///
/// Types refer to each other by name. Everything is resolved and validated in [OntologyBuilder::build].
#[derive(Default)]
pub struct OntologyBuilder {
    decls: Vec<DefDecl>,
}

pub struct DefDecl {
    name: ArcStr,
    typename: Option<ArcStr>,
    is_abstract: bool,
    extends: Vec<ArcStr>,
    implements: Vec<ArcStr>,
    fields: Vec<FieldDecl>,
}

impl DefDecl {
    pub fn extends(&mut self, ancestor: impl Into<ArcStr>) -> &mut Self {
        self.extends.push(ancestor.into());
        self
    }

    pub fn implements(&mut self, interface: impl Into<ArcStr>) -> &mut Self {
        self.implements.push(interface.into());
        self
    }

    pub fn typename(&mut self, typename: impl Into<ArcStr>) -> &mut Self {
        self.typename = Some(typename.into());
        self
    }

    pub fn abstract_def(&mut self) -> &mut Self {
        self.is_abstract = true;
        self
    }

    pub fn field(&mut self, field: FieldDecl) -> &mut Self {
        self.fields.push(field);
        self
    }
}

#[derive(Clone)]
pub struct FieldDecl {
    name: ArcStr,
    target: TargetDecl,
    cardinality: Cardinality,
    optionality: Optionality,
}

#[derive(Clone)]
enum TargetDecl {
    Scalar(ScalarKind),
    Def(ArcStr),
}

impl FieldDecl {
    pub fn property(name: impl Into<ArcStr>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            target: TargetDecl::Scalar(kind),
            cardinality: Cardinality::One,
            optionality: Optionality::Optional,
        }
    }

    pub fn link(name: impl Into<ArcStr>, target: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            target: TargetDecl::Def(target.into()),
            cardinality: Cardinality::One,
            optionality: Optionality::Optional,
        }
    }

    pub fn many(self) -> Self {
        Self {
            cardinality: Cardinality::Many,
            ..self
        }
    }

    pub fn required(self) -> Self {
        Self {
            optionality: Optionality::Mandatory,
            ..self
        }
    }
}

impl OntologyBuilder {
    /// Declare a new type.
    pub fn def(&mut self, name: impl Into<ArcStr>) -> &mut DefDecl {
        self.decls.push(DefDecl {
            name: name.into(),
            typename: None,
            is_abstract: false,
            extends: vec![],
            implements: vec![],
            fields: vec![],
        });
        let last = self.decls.len() - 1;
        &mut self.decls[last]
    }

    pub fn build(self) -> Result<Ontology, SchemaError> {
        // every index below fits a DefId from here on
        if self.decls.len() > MAX_DEFS {
            return Err(SchemaError::TooManyTypes(self.decls.len()));
        }

        let mut def_names: FnvHashMap<ArcStr, DefId> = Default::default();
        let mut typenames: FnvHashMap<ArcStr, DefId> = Default::default();

        for (index, decl) in self.decls.iter().enumerate() {
            let def_id = DefId(index as u16);
            if def_names.insert(decl.name.clone(), def_id).is_some() {
                return Err(SchemaError::DuplicateType(decl.name.clone()));
            }
            let typename = decl.external_typename();
            if typenames.insert(typename.clone(), def_id).is_some() {
                return Err(SchemaError::DuplicateType(typename));
            }
        }

        for (index, decl) in self.decls.iter().enumerate() {
            match typenames.get(&decl.name) {
                Some(other) if other.index() != index => {
                    return Err(SchemaError::AmbiguousName {
                        name: decl.name.clone(),
                        other: self.decls[other.index()].name.clone(),
                    });
                }
                _ => {}
            }
        }

        let lookup = |name: &ArcStr, referenced_by: &ArcStr| -> Result<DefId, SchemaError> {
            def_names
                .get(name)
                .copied()
                .ok_or_else(|| SchemaError::UnknownType {
                    name: name.clone(),
                    referenced_by: referenced_by.clone(),
                })
        };

        let mut ancestors: Vec<Vec<DefId>> = Vec::with_capacity(self.decls.len());
        for decl in &self.decls {
            ancestors.push(
                decl.extends
                    .iter()
                    .map(|name| lookup(name, &decl.name))
                    .collect::<Result<_, _>>()?,
            );
        }

        let topo_order = self.topological_order(&ancestors)?;

        // Every type together with all of its (transitive) ancestors
        let mut supertypes: Vec<DefIdSet> = vec![DefIdSet::default(); self.decls.len()];
        for def_id in &topo_order {
            let mut set = DefIdSet::from_iter([*def_id]);
            for ancestor in &ancestors[def_id.index()] {
                for supertype in &supertypes[ancestor.index()] {
                    set.insert(*supertype);
                }
            }
            supertypes[def_id.index()] = set;
        }

        let is_subtype = |sub: DefId, sup: DefId| supertypes[sub.index()].contains(&sup);

        let mut fields: Vec<FnvIndexMap<ArcStr, Field>> =
            vec![FnvIndexMap::default(); self.decls.len()];
        let mut interfaces: Vec<Vec<ArcStr>> = vec![vec![]; self.decls.len()];

        for def_id in &topo_order {
            let decl = &self.decls[def_id.index()];
            let mut effective: FnvIndexMap<ArcStr, Field> = Default::default();
            let mut def_interfaces: Vec<ArcStr> = vec![];

            for ancestor in &ancestors[def_id.index()] {
                for (name, inherited) in &fields[ancestor.index()] {
                    match effective.get(name) {
                        None => {
                            effective.insert(name.clone(), inherited.clone());
                        }
                        Some(existing) if existing.is_same_field(inherited) => {}
                        Some(existing) => {
                            let narrower = narrower_field(existing, inherited, &is_subtype)
                                .ok_or_else(|| SchemaError::IncompatibleInheritance {
                                    def: decl.name.clone(),
                                    field: name.clone(),
                                    first: self.decls[existing.declared_by.index()].name.clone(),
                                    second: self.decls[inherited.declared_by.index()]
                                        .name
                                        .clone(),
                                })?
                                .clone();
                            effective.insert(name.clone(), narrower);
                        }
                    }
                }

                for interface in &interfaces[ancestor.index()] {
                    if !def_interfaces.contains(interface) {
                        def_interfaces.push(interface.clone());
                    }
                }
            }

            for interface in &decl.implements {
                if def_names.contains_key(interface) {
                    return Err(SchemaError::DuplicateType(interface.clone()));
                }
                if !def_interfaces.contains(interface) {
                    def_interfaces.push(interface.clone());
                }
            }

            let mut own_names: Vec<&ArcStr> = vec![];
            for field_decl in &decl.fields {
                if own_names.contains(&&field_decl.name) {
                    return Err(SchemaError::DuplicateField {
                        def: decl.name.clone(),
                        field: field_decl.name.clone(),
                    });
                }
                own_names.push(&field_decl.name);

                let target = match &field_decl.target {
                    TargetDecl::Scalar(kind) => FieldTarget::Scalar(*kind),
                    TargetDecl::Def(name) => FieldTarget::Def(lookup(name, &decl.name)?),
                };

                let mut field = Field {
                    name: field_decl.name.clone(),
                    target,
                    cardinality: field_decl.cardinality,
                    optionality: field_decl.optionality,
                    declared_by: *def_id,
                    overrides: None,
                };

                if let Some(inherited) = effective.get(&field_decl.name) {
                    check_override(&field, inherited, &is_subtype).map_err(|reason| {
                        SchemaError::IncompatibleOverride {
                            def: decl.name.clone(),
                            field: field_decl.name.clone(),
                            overridden: self.decls[inherited.declared_by.index()].name.clone(),
                            reason,
                        }
                    })?;
                    field.overrides = Some(inherited.declared_by);
                }

                // IndexMap keeps the position of an overridden field
                effective.insert(field_decl.name.clone(), field);
            }

            fields[def_id.index()] = effective;
            interfaces[def_id.index()] = def_interfaces;
        }

        let mut subtypes: Vec<DefIdSet> = vec![DefIdSet::default(); self.decls.len()];
        for (index, set) in supertypes.iter().enumerate() {
            for supertype in set {
                subtypes[supertype.index()].insert(DefId(index as u16));
            }
        }

        let mut interface_members: FnvHashMap<ArcStr, DefIdSet> = Default::default();
        for (index, def_interfaces) in interfaces.iter().enumerate() {
            for interface in def_interfaces {
                interface_members
                    .entry(interface.clone())
                    .or_default()
                    .insert(DefId(index as u16));
            }
        }

        let defs: Vec<Def> = self
            .decls
            .into_iter()
            .zip(ancestors)
            .zip(fields.into_iter().zip(interfaces))
            .zip(subtypes)
            .enumerate()
            .map(
                |(index, (((decl, ancestors), (fields, interfaces)), subtypes))| Def {
                    id: DefId(index as u16),
                    typename: decl.external_typename(),
                    name: decl.name,
                    is_abstract: decl.is_abstract,
                    ancestors,
                    interfaces,
                    fields,
                    subtypes,
                },
            )
            .collect();

        debug!(
            "built ontology with {} types and {} interfaces",
            defs.len(),
            interface_members.len()
        );

        Ok(Ontology {
            defs,
            def_names,
            typenames,
            interfaces: interface_members,
        })
    }

    /// Order types so that every type comes after all of its ancestors.
    fn topological_order(&self, ancestors: &[Vec<DefId>]) -> Result<Vec<DefId>, SchemaError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            Visiting,
            Done,
        }

        fn visit(
            def_id: DefId,
            ancestors: &[Vec<DefId>],
            marks: &mut [Mark],
            path: &mut Vec<DefId>,
            output: &mut Vec<DefId>,
        ) -> Result<(), Vec<DefId>> {
            match marks[def_id.index()] {
                Mark::Done => return Ok(()),
                Mark::Visiting => {
                    let start = path.iter().position(|id| *id == def_id).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(def_id);
                    return Err(cycle);
                }
                Mark::Unvisited => {}
            }

            marks[def_id.index()] = Mark::Visiting;
            path.push(def_id);
            for ancestor in &ancestors[def_id.index()] {
                visit(*ancestor, ancestors, marks, path, output)?;
            }
            path.pop();
            marks[def_id.index()] = Mark::Done;
            output.push(def_id);

            Ok(())
        }

        let mut marks = vec![Mark::Unvisited; self.decls.len()];
        let mut output = Vec::with_capacity(self.decls.len());

        for index in 0..self.decls.len() {
            visit(
                DefId(index as u16),
                ancestors,
                &mut marks,
                &mut vec![],
                &mut output,
            )
            .map_err(|cycle| {
                SchemaError::InheritanceCycle(
                    cycle
                        .into_iter()
                        .map(|def_id| self.decls[def_id.index()].name.clone())
                        .collect(),
                )
            })?;
        }

        Ok(output)
    }
}

impl DefDecl {
    fn external_typename(&self) -> ArcStr {
        match &self.typename {
            Some(typename) => typename.clone(),
            None => arcstr::format!("{}Type", self.name),
        }
    }
}

fn check_override(
    field: &Field,
    inherited: &Field,
    is_subtype: &impl Fn(DefId, DefId) -> bool,
) -> Result<(), &'static str> {
    if field.cardinality != inherited.cardinality {
        return Err("cardinality differs");
    }

    match (field.target, inherited.target) {
        (FieldTarget::Scalar(own), FieldTarget::Scalar(inherited)) => {
            if own != inherited {
                return Err("scalar type differs");
            }
        }
        (FieldTarget::Def(own), FieldTarget::Def(inherited)) => {
            if !is_subtype(own, inherited) {
                return Err("link target is not a subtype of the inherited target");
            }
        }
        _ => return Err("cannot change between property and link"),
    }

    Ok(())
}

/// Of two declarations inherited through different ancestors, pick the one with the narrower target.
fn narrower_field<'f>(
    a: &'f Field,
    b: &'f Field,
    is_subtype: &impl Fn(DefId, DefId) -> bool,
) -> Option<&'f Field> {
    if a.cardinality != b.cardinality {
        return None;
    }

    match (a.target, b.target) {
        (FieldTarget::Scalar(a_kind), FieldTarget::Scalar(b_kind)) if a_kind == b_kind => Some(a),
        (FieldTarget::Def(a_target), FieldTarget::Def(b_target)) => {
            if is_subtype(a_target, b_target) {
                Some(a)
            } else if is_subtype(b_target, a_target) {
                Some(b)
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn inheritance() -> OntologyBuilder {
        let mut builder = Ontology::builder();
        builder
            .def("Bar")
            .field(FieldDecl::property("q", ScalarKind::Text));
        builder
            .def("Bar2")
            .extends("Bar")
            .field(FieldDecl::property("w", ScalarKind::Text));
        builder.def("Foo").field(FieldDecl::link("blah", "Bar"));
        builder
            .def("Foo2")
            .extends("Foo")
            .field(FieldDecl::link("blah", "Bar2"));
        builder
    }

    fn field_names(ontology: &Ontology, name: &str) -> Vec<String> {
        ontology
            .find_def(name)
            .unwrap()
            .fields
            .keys()
            .map(|name| name.to_string())
            .collect()
    }

    #[test]
    fn inherited_fields_and_subtypes() {
        let ontology = inheritance().build().unwrap();
        let bar = ontology.find_def("Bar").unwrap().id;
        let bar2 = ontology.find_def("Bar2").unwrap().id;

        assert_eq!(vec!["q", "w"], field_names(&ontology, "Bar2"));
        assert_eq!(&[bar, bar2], ontology.subtypes_of(bar).as_slice());
        assert_eq!(&[bar2], ontology.subtypes_of(bar2).as_slice());
        assert!(ontology.is_subtype_of(bar2, bar));
        assert!(!ontology.is_subtype_of(bar, bar2));
        assert_eq!(
            bar,
            ontology.fields_of(bar2)["q"].declared_by,
            "inherited field keeps its declaring type"
        );
    }

    #[test]
    fn override_narrows_link_target() {
        let ontology = inheritance().build().unwrap();
        let foo = ontology.find_def("Foo").unwrap().id;
        let foo2 = ontology.find_def("Foo2").unwrap().id;
        let bar = ontology.find_def("Bar").unwrap().id;
        let bar2 = ontology.find_def("Bar2").unwrap().id;

        let blah = &ontology.fields_of(foo2)["blah"];
        assert_eq!(Some(bar2), blah.target_def());
        assert_eq!(foo2, blah.declared_by);
        assert_eq!(Some(foo), blah.overrides);

        assert_eq!(Some(bar), ontology.fields_of(foo)["blah"].target_def());
        assert_eq!(1, ontology.def(foo2).own_fields().count());
    }

    #[test]
    fn default_typename() {
        let ontology = inheritance().build().unwrap();
        assert_eq!(
            "Bar2Type",
            ontology.find_def("Bar2").unwrap().typename.as_str()
        );
        assert_eq!(
            "Bar2",
            ontology
                .find_def_by_typename("Bar2Type")
                .unwrap()
                .name
                .as_str()
        );
    }

    #[test]
    fn inheritance_cycle_is_rejected() {
        let mut builder = Ontology::builder();
        builder.def("A").extends("C");
        builder.def("B").extends("A");
        builder.def("C").extends("B");

        let Err(SchemaError::InheritanceCycle(cycle)) = builder.build() else {
            panic!("expected a cycle");
        };
        assert_eq!(4, cycle.len());
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn self_inheritance_is_a_cycle() {
        let mut builder = Ontology::builder();
        builder.def("A").extends("A");

        assert_eq!(
            Err(SchemaError::InheritanceCycle(vec!["A".into(), "A".into()])),
            builder.build().map(|_| ())
        );
    }

    #[test]
    fn non_covariant_override_is_rejected() {
        let mut builder = inheritance();
        builder.def("Baz");
        builder
            .def("Foo3")
            .extends("Foo")
            .field(FieldDecl::link("blah", "Baz"));

        assert_eq!(
            "`Foo3.blah` cannot override the declaration from `Foo`: link target is not a subtype of the inherited target",
            builder.build().err().unwrap().to_string()
        );
    }

    #[test]
    fn property_cannot_become_link() {
        let mut builder = inheritance();
        builder
            .def("Bar3")
            .extends("Bar")
            .field(FieldDecl::link("q", "Bar"));

        assert!(matches!(
            builder.build(),
            Err(SchemaError::IncompatibleOverride {
                reason: "cannot change between property and link",
                ..
            })
        ));
    }

    #[test]
    fn diamond_inheritance_picks_narrower_declaration() {
        let mut builder = inheritance();
        builder.def("Left").field(FieldDecl::link("blah", "Bar"));
        builder.def("Right").field(FieldDecl::link("blah", "Bar2"));
        builder.def("Both").extends("Left").extends("Right");

        let ontology = builder.build().unwrap();
        let bar2 = ontology.find_def("Bar2").unwrap().id;
        let both = ontology.find_def("Both").unwrap().id;

        assert_eq!(Some(bar2), ontology.fields_of(both)["blah"].target_def());
    }

    #[test]
    fn incompatible_diamond_is_rejected() {
        let mut builder = Ontology::builder();
        builder
            .def("Left")
            .field(FieldDecl::property("x", ScalarKind::Text));
        builder
            .def("Right")
            .field(FieldDecl::property("x", ScalarKind::I64));
        builder.def("Both").extends("Left").extends("Right");

        assert!(matches!(
            builder.build(),
            Err(SchemaError::IncompatibleInheritance { .. })
        ));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut builder = Ontology::builder();
        builder.def("Foo").field(FieldDecl::link("blah", "Nope"));

        assert_eq!(
            "type `Foo` refers to unknown type `Nope`",
            builder.build().err().unwrap().to_string()
        );
    }

    #[test]
    fn duplicate_own_field_is_rejected() {
        let mut builder = Ontology::builder();
        builder
            .def("Foo")
            .field(FieldDecl::property("a", ScalarKind::Text))
            .field(FieldDecl::property("a", ScalarKind::Text));

        assert!(matches!(
            builder.build(),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn name_clashing_with_a_typename_is_rejected() {
        let mut builder = inheritance();
        builder.def("BarType");

        assert_eq!(
            "`BarType` names a type and is the typename of `Bar`",
            builder.build().err().unwrap().to_string()
        );
    }

    #[test]
    fn own_name_as_typename_is_allowed() {
        let mut builder = Ontology::builder();
        builder.def("Plain").typename("Plain");

        let ontology = builder.build().unwrap();
        assert_eq!(
            Some("Plain"),
            ontology
                .find_def_by_typename("Plain")
                .map(|def| def.name.as_str())
        );
    }

    #[test]
    fn def_ids_are_bounded() {
        let mut builder = Ontology::builder();
        for index in 0..=MAX_DEFS {
            builder.def(format!("T{index}"));
        }

        assert!(matches!(
            builder.build(),
            Err(SchemaError::TooManyTypes(count)) if count == MAX_DEFS + 1
        ));
    }

    #[test]
    fn interfaces_are_inherited() {
        let mut builder = inheritance();
        builder.def("Named").abstract_def().implements("HasName");
        builder.def("Person").extends("Named");

        let ontology = builder.build().unwrap();
        let named = ontology.find_def("Named").unwrap().id;
        let person = ontology.find_def("Person").unwrap().id;

        assert_eq!(
            &[named, person],
            ontology.interface_members("HasName").unwrap().as_slice()
        );
        assert_eq!(&[person], ontology.concrete_subtypes(named).as_slice());
    }
}
