//! Compiles shape plans into data store selects.

use arcstr::ArcStr;
use domain_engine_core::{domain_error::DomainErrorKind, Config, DomainError, DomainResult};
use indexmap::map::Entry;
use ontol_runtime::{
    ontology::{domain::ScalarKind, Ontology},
    query::{
        condition::{Comparison, Condition},
        filter::Filter,
        select::{EntitySelect, Select, StructSelect},
    },
    DefId, DefIdSet,
};
use tracing::trace;

use crate::shape_plan::{CollectionPlan, OutputField, RootPlan, ShapePlan};

pub struct QueryCompiler<'o> {
    ontology: &'o Ontology,
    config: &'o Config,
}

impl<'o> QueryCompiler<'o> {
    pub fn new(ontology: &'o Ontology, config: &'o Config) -> Self {
        Self { ontology, config }
    }

    /// One select per root collection, in the order of [RootPlan::collections].
    pub fn compile_root(&self, root_plan: &RootPlan) -> DomainResult<Vec<EntitySelect>> {
        root_plan
            .collections()
            .map(|collection| {
                let select = self.compile_collection(collection, true)?;
                trace!("compiled select: {select:#?}");
                Ok(select)
            })
            .collect()
    }

    /// Compile one collection.
    ///
    /// Only root collections fall back to the configured default limit.
    pub fn compile_collection(
        &self,
        collection: &CollectionPlan,
        root: bool,
    ) -> DomainResult<EntitySelect> {
        let source = self.compile_struct(&collection.shape)?;
        let args = &collection.args;

        let condition = args.condition.clone();
        self.check_condition(&condition, &collection.shape)?;
        for order_by in &args.order {
            self.scalar_kind_of(&order_by.field, &collection.shape)?;
        }

        let limit = match (args.first, root) {
            (Some(first), _) => Some(first),
            (None, true) => self.config.default_limit,
            (None, false) => None,
        };

        let offset = match args.after {
            Some(after) => after
                .checked_add(1)
                .ok_or_else(|| compile_error(format!("cursor `{after}` is out of range")))?,
            None => 0,
        };

        Ok(EntitySelect {
            source,
            filter: Filter::new(condition, args.order.clone()),
            limit,
            offset,
        })
    }

    /// The union over all branches of the properties they need.
    fn compile_struct(&self, shape: &ShapePlan) -> DomainResult<StructSelect> {
        let mut struct_select =
            StructSelect::new(shape.def_id, shape.concrete_types().collect::<DefIdSet>());

        for branch in shape.branches.values() {
            for output_field in branch.fields.values() {
                match output_field {
                    OutputField::Typename => {}
                    OutputField::Property(field) => {
                        merge_property(&mut struct_select, field.clone(), Select::Leaf, self)?;
                    }
                    OutputField::Link {
                        field, collection, ..
                    } => {
                        let select = Select::Link(self.compile_collection(collection, false)?);
                        merge_property(&mut struct_select, field.clone(), select, self)?;
                    }
                }
            }
        }

        Ok(struct_select)
    }

    /// The scalar kind of a property usable for filtering or ordering.
    ///
    /// The property must be a scalar of one kind on the declared type and every concrete type.
    fn scalar_kind_of(&self, field: &str, shape: &ShapePlan) -> DomainResult<ScalarKind> {
        let mut kind: Option<ScalarKind> = None;

        for def_id in std::iter::once(shape.def_id).chain(shape.concrete_types()) {
            let def = self.ontology.def(def_id);
            let field_kind = match def.field(field) {
                Some(declared) => declared.scalar_kind().ok_or_else(|| {
                    compile_error(format!(
                        "`{field}` on `{}` is a link and cannot be filtered or ordered on",
                        def.typename
                    ))
                })?,
                None => {
                    return Err(compile_error(format!(
                        "`{field}` is not a property of `{}`",
                        def.typename
                    )));
                }
            };

            if kind.is_some_and(|kind| kind != field_kind) {
                return Err(compile_error(format!(
                    "`{field}` has different types among the types in scope"
                )));
            }
            kind = Some(field_kind);
        }

        kind.ok_or_else(|| compile_error(format!("`{field}` has no type")))
    }

    fn check_condition(&self, condition: &Condition, shape: &ShapePlan) -> DomainResult<()> {
        match condition {
            Condition::All(conditions) | Condition::Any(conditions) => {
                for condition in conditions {
                    self.check_condition(condition, shape)?;
                }
                Ok(())
            }
            Condition::Not(inner) => self.check_condition(inner, shape),
            Condition::Exists(field, _) => self.scalar_kind_of(field, shape).map(|_| ()),
            Condition::Compare(field, comparison, value) => {
                let kind = self.scalar_kind_of(field, shape)?;

                if value.is_null() && !matches!(comparison, Comparison::Eq | Comparison::Neq) {
                    return Err(compile_error(format!(
                        "null is not ordered, cannot compare `{field}` with it"
                    )));
                }
                if !value.conforms_to(kind) {
                    return Err(compile_error(format!(
                        "{value} is not a valid {kind:?} for `{field}`"
                    )));
                }

                Ok(())
            }
        }
    }
}

fn merge_property(
    struct_select: &mut StructSelect,
    field: ArcStr,
    select: Select,
    compiler: &QueryCompiler,
) -> DomainResult<()> {
    match struct_select.properties.entry(field) {
        Entry::Vacant(vacant) => {
            vacant.insert(select);
            Ok(())
        }
        Entry::Occupied(mut occupied) => {
            let name = occupied.key().clone();
            match (occupied.get_mut(), select) {
                (Select::Leaf, Select::Leaf) => Ok(()),
                (Select::Link(existing), Select::Link(other)) => {
                    merge_link(&name, existing, other, compiler)
                }
                _ => Err(compile_error(format!(
                    "`{name}` is both a property and a link among the types in scope"
                ))),
            }
        }
    }
}

/// Two branches selecting the same link share one nested select.
fn merge_link(
    name: &str,
    existing: &mut EntitySelect,
    other: EntitySelect,
    compiler: &QueryCompiler,
) -> DomainResult<()> {
    if existing.filter != other.filter
        || existing.limit != other.limit
        || existing.offset != other.offset
    {
        return Err(compile_error(format!(
            "`{name}` is selected with different arguments"
        )));
    }

    let source = &mut existing.source;
    source.def_id = wider_def(compiler.ontology, source.def_id, other.source.def_id);
    for variant in &other.source.variants {
        source.variants.insert(*variant);
    }
    for (field, select) in other.source.properties {
        merge_property(source, field, select, compiler)?;
    }

    Ok(())
}

fn wider_def(ontology: &Ontology, a: DefId, b: DefId) -> DefId {
    if ontology.is_subtype_of(a, b) {
        b
    } else {
        a
    }
}

fn compile_error(msg: String) -> DomainError {
    DomainErrorKind::BackendCompile(msg).into_error()
}
