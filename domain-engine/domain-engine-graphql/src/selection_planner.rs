//! Plans the output shape of an operation for every concrete type it can meet.

use domain_engine_core::{
    domain_error::{DomainErrorKind, SourcePos},
    DomainError, DomainResult,
};
use fnv::FnvHashMap;
use graphql_parser::{
    query::{
        Definition, Directive, Document, Field, FragmentDefinition, OperationDefinition,
        Selection, SelectionSet, TypeCondition, VariableDefinition,
    },
    Pos,
};
use ontol_runtime::{
    ontology::{domain::FieldTarget, Ontology},
    DefId, FnvIndexMap,
};
use tracing::trace;

use crate::{
    argument::{CollectionArgs, Variables, VariableScope},
    shape_plan::{Branch, CollectionPlan, OutputField, RootField, RootPlan, ShapePlan},
    type_resolver::TypeResolver,
};

/// The name of the query root type, as reported by `__typename` on the root.
pub const QUERY_TYPENAME: &str = "Query";

const TYPENAME_FIELD: &str = "__typename";

type FieldGroups<'d, 'a> = FnvIndexMap<&'a str, Vec<&'d Field<'a, &'a str>>>;

/// Plan the operation named `operation_name`, or the only operation of the document.
pub fn plan_operation<'d, 'a>(
    ontology: &Ontology,
    document: &'d Document<'a, &'a str>,
    operation_name: Option<&str>,
    variables: &Variables,
) -> DomainResult<RootPlan> {
    let operation = find_operation(document, operation_name)?;
    reject_directives(operation.directives)?;

    let planner = SelectionPlanner {
        resolver: TypeResolver::new(ontology),
        fragments: index_fragments(document)?,
        scope: VariableScope::new(operation.variable_definitions, variables)?,
    };

    for fragment in planner.fragments.values() {
        planner.validate_selection_set(&fragment.selection_set)?;
    }
    planner.validate_selection_set(operation.selection_set)?;
    planner.check_fragment_cycles()?;

    let root_plan = planner.plan_root(operation.selection_set)?;

    trace!("root plan: {root_plan:#?}");

    Ok(root_plan)
}

struct Operation<'d, 'a> {
    selection_set: &'d SelectionSet<'a, &'a str>,
    variable_definitions: &'d [VariableDefinition<'a, &'a str>],
    directives: &'d [Directive<'a, &'a str>],
}

fn find_operation<'d, 'a>(
    document: &'d Document<'a, &'a str>,
    operation_name: Option<&str>,
) -> DomainResult<Operation<'d, 'a>> {
    let operations: Vec<&OperationDefinition<'a, &'a str>> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Operation(operation) => Some(operation),
            Definition::Fragment(_) => None,
        })
        .collect();

    let operation = match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|operation| operation_name_of(operation) == Some(name))
            .ok_or_else(|| DomainErrorKind::OperationNotFound(name.to_string()).into_error())?,
        None => match operations.as_slice() {
            [operation] => *operation,
            [] => {
                return Err(
                    DomainErrorKind::Syntax("document contains no operation".to_string())
                        .into_error(),
                )
            }
            _ => return Err(DomainErrorKind::AmbiguousOperation.into_error()),
        },
    };

    match operation {
        OperationDefinition::SelectionSet(selection_set) => Ok(Operation {
            selection_set,
            variable_definitions: &[],
            directives: &[],
        }),
        OperationDefinition::Query(query) => Ok(Operation {
            selection_set: &query.selection_set,
            variable_definitions: &query.variable_definitions,
            directives: &query.directives,
        }),
        OperationDefinition::Mutation(mutation) => {
            Err(DomainErrorKind::UnsupportedOperation("mutation")
                .into_error()
                .with_pos(source_pos(mutation.position)))
        }
        OperationDefinition::Subscription(subscription) => {
            Err(DomainErrorKind::UnsupportedOperation("subscription")
                .into_error()
                .with_pos(source_pos(subscription.position)))
        }
    }
}

fn operation_name_of<'a>(operation: &OperationDefinition<'a, &'a str>) -> Option<&'a str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name,
        OperationDefinition::Mutation(mutation) => mutation.name,
        OperationDefinition::Subscription(subscription) => subscription.name,
    }
}

fn index_fragments<'d, 'a>(
    document: &'d Document<'a, &'a str>,
) -> DomainResult<FnvHashMap<&'a str, &'d FragmentDefinition<'a, &'a str>>> {
    let mut fragments: FnvHashMap<&'a str, &'d FragmentDefinition<'a, &'a str>> =
        Default::default();

    for definition in &document.definitions {
        if let Definition::Fragment(fragment) = definition {
            reject_directives(&fragment.directives)?;

            if fragments.insert(fragment.name, fragment).is_some() {
                return Err(DomainErrorKind::Syntax(format!(
                    "fragment `{}` is defined more than once",
                    fragment.name
                ))
                .into_error()
                .with_pos(source_pos(fragment.position)));
            }
        }
    }

    Ok(fragments)
}

fn reject_directives<'a>(directives: &[Directive<'a, &'a str>]) -> DomainResult<()> {
    match directives.first() {
        Some(directive) => Err(
            DomainErrorKind::UnsupportedDirective(directive.name.to_string())
                .into_error()
                .with_pos(source_pos(directive.position)),
        ),
        None => Ok(()),
    }
}

fn source_pos(pos: Pos) -> SourcePos {
    SourcePos {
        line: pos.line,
        column: pos.column,
    }
}

struct SelectionPlanner<'o, 'd, 'a> {
    resolver: TypeResolver<'o>,
    fragments: FnvHashMap<&'a str, &'d FragmentDefinition<'a, &'a str>>,
    scope: VariableScope<'a>,
}

impl<'o, 'd, 'a> SelectionPlanner<'o, 'd, 'a> {
    fn fragment(
        &self,
        name: &str,
        pos: Pos,
    ) -> DomainResult<&'d FragmentDefinition<'a, &'a str>> {
        self.fragments.get(name).copied().ok_or_else(|| {
            DomainErrorKind::UnknownFragment(name.to_string())
                .into_error()
                .with_pos(source_pos(pos))
        })
    }

    /// Reject directives and unknown fragments anywhere in the selection set,
    /// also in the parts no concrete type ends up using.
    fn validate_selection_set(&self, selection_set: &SelectionSet<'a, &'a str>) -> DomainResult<()> {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    reject_directives(&field.directives)?;
                    self.validate_selection_set(&field.selection_set)?;
                }
                Selection::InlineFragment(inline) => {
                    reject_directives(&inline.directives)?;
                    self.validate_selection_set(&inline.selection_set)?;
                }
                Selection::FragmentSpread(spread) => {
                    reject_directives(&spread.directives)?;
                    self.fragment(spread.fragment_name, spread.position)?;
                }
            }
        }

        Ok(())
    }

    fn check_fragment_cycles(&self) -> DomainResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn collect_spreads<'a>(selection_set: &SelectionSet<'a, &'a str>, output: &mut Vec<&'a str>) {
            for selection in &selection_set.items {
                match selection {
                    Selection::Field(field) => collect_spreads(&field.selection_set, output),
                    Selection::InlineFragment(inline) => {
                        collect_spreads(&inline.selection_set, output)
                    }
                    Selection::FragmentSpread(spread) => output.push(spread.fragment_name),
                }
            }
        }

        fn visit<'a>(
            name: &'a str,
            planner: &SelectionPlanner<'_, '_, 'a>,
            marks: &mut FnvHashMap<&'a str, Mark>,
        ) -> DomainResult<()> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    return Err(DomainErrorKind::FragmentCycle(name.to_string()).into_error())
                }
                None => {}
            }

            marks.insert(name, Mark::Visiting);

            if let Some(fragment) = planner.fragments.get(name) {
                let mut spreads = vec![];
                collect_spreads(&fragment.selection_set, &mut spreads);
                for spread in spreads {
                    visit(spread, planner, marks).map_err(|error| {
                        error.with_pos(source_pos(fragment.position))
                    })?;
                }
            }

            marks.insert(name, Mark::Done);
            Ok(())
        }

        let mut marks: FnvHashMap<&'a str, Mark> = Default::default();
        for name in self.fragments.keys() {
            visit(*name, self, &mut marks)?;
        }

        Ok(())
    }

    /// Group the fields of `selection_set` that apply, by output alias.
    ///
    /// `applies` decides whether a type condition matches.
    fn collect_fields(
        &self,
        selection_set: &'d SelectionSet<'a, &'a str>,
        applies: &dyn Fn(&str) -> DomainResult<bool>,
        output: &mut FieldGroups<'d, 'a>,
    ) -> DomainResult<()> {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    output
                        .entry(field.alias.unwrap_or(field.name))
                        .or_default()
                        .push(field);
                }
                Selection::InlineFragment(inline) => {
                    let does_apply = match &inline.type_condition {
                        None => true,
                        Some(TypeCondition::On(type_name)) => applies(type_name)
                            .map_err(|error| error.with_pos(source_pos(inline.position)))?,
                    };
                    if does_apply {
                        self.collect_fields(&inline.selection_set, applies, output)?;
                    }
                }
                Selection::FragmentSpread(spread) => {
                    let fragment = self.fragment(spread.fragment_name, spread.position)?;
                    let TypeCondition::On(type_name) = &fragment.type_condition;
                    let does_apply = applies(type_name)
                        .map_err(|error| error.with_pos(source_pos(fragment.position)))?;
                    if does_apply {
                        self.collect_fields(&fragment.selection_set, applies, output)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn plan_root(&self, selection_set: &'d SelectionSet<'a, &'a str>) -> DomainResult<RootPlan> {
        let resolver = self.resolver;
        let applies = |type_name: &str| -> DomainResult<bool> {
            if type_name == QUERY_TYPENAME {
                Ok(true)
            } else {
                resolver.concrete_types(type_name).map(|_| false)
            }
        };

        let mut groups = FieldGroups::default();
        self.collect_fields(selection_set, &applies, &mut groups)?;

        let mut root_plan = RootPlan::default();

        for (alias, fields) in groups {
            let Some(first) = fields.first().copied() else {
                continue;
            };
            check_same_field(QUERY_TYPENAME, alias, first, &fields)?;

            let root_field = if first.name == TYPENAME_FIELD {
                check_typename(QUERY_TYPENAME, alias, &fields)?;
                RootField::Typename
            } else {
                let def_id = resolver
                    .ontology()
                    .find_def(first.name)
                    .map(|def| def.id)
                    .ok_or_else(|| {
                        DomainErrorKind::UnknownFieldForType {
                            typename: QUERY_TYPENAME.to_string(),
                            field: first.name.to_string(),
                        }
                        .into_error()
                        .with_pos(source_pos(first.position))
                    })?;

                RootField::Collection(self.plan_collection(QUERY_TYPENAME, alias, def_id, &fields)?)
            };

            root_plan.fields.insert(alias.into(), root_field);
        }

        Ok(root_plan)
    }

    /// Plan the selection sets of `fields` against every concrete type of `def_id`.
    fn plan_shape(
        &self,
        def_id: DefId,
        selection_sets: &[&'d SelectionSet<'a, &'a str>],
    ) -> DomainResult<ShapePlan> {
        let resolver = self.resolver;
        let mut branches: FnvIndexMap<DefId, Branch> = Default::default();

        for concrete in resolver.concrete_types_of(def_id).iter().copied() {
            let applies = |type_name: &str| -> DomainResult<bool> {
                Ok(resolver.concrete_types(type_name)?.contains(&concrete))
            };

            let mut groups = FieldGroups::default();
            for selection_set in selection_sets.iter().copied() {
                self.collect_fields(selection_set, &applies, &mut groups)?;
            }

            let mut branch = Branch::default();
            for (alias, fields) in groups {
                let Some(first) = fields.first().copied() else {
                    continue;
                };
                let output_field = self.plan_output_field(concrete, alias, first, &fields)?;
                branch.fields.insert(alias.into(), output_field);
            }

            branches.insert(concrete, branch);
        }

        Ok(ShapePlan { def_id, branches })
    }

    fn plan_output_field(
        &self,
        concrete: DefId,
        alias: &str,
        first: &'d Field<'a, &'a str>,
        fields: &[&'d Field<'a, &'a str>],
    ) -> DomainResult<OutputField> {
        let typename = &self.resolver.ontology().def(concrete).typename;

        check_same_field(typename, alias, first, fields)?;

        if first.name == TYPENAME_FIELD {
            check_typename(typename, alias, fields)?;
            return Ok(OutputField::Typename);
        }

        let field = self
            .resolver
            .field(concrete, first.name)
            .map_err(|error| error.with_pos(source_pos(first.position)))?;

        match field.target {
            FieldTarget::Scalar(_) => {
                for selection in fields {
                    if !selection.arguments.is_empty() {
                        return Err(conflict(
                            typename,
                            alias,
                            format!("scalar property `{}` takes no arguments", field.name),
                            selection.position,
                        ));
                    }
                    if !selection.selection_set.items.is_empty() {
                        return Err(conflict(
                            typename,
                            alias,
                            format!("scalar property `{}` has no sub-selection", field.name),
                            selection.position,
                        ));
                    }
                }

                Ok(OutputField::Property(field.name.clone()))
            }
            FieldTarget::Def(target) => {
                let collection = self.plan_collection(typename, alias, target, fields)?;

                Ok(OutputField::Link {
                    field: field.name.clone(),
                    cardinality: field.cardinality,
                    collection,
                })
            }
        }
    }

    /// Plan a root collection or link, whose instances are of `def_id` or its subtypes.
    fn plan_collection(
        &self,
        typename: &str,
        alias: &str,
        def_id: DefId,
        fields: &[&'d Field<'a, &'a str>],
    ) -> DomainResult<CollectionPlan> {
        let mut args: Option<CollectionArgs> = None;

        for selection in fields {
            if selection.selection_set.items.is_empty() {
                return Err(conflict(
                    typename,
                    alias,
                    format!("`{}` requires a sub-selection", selection.name),
                    selection.position,
                ));
            }

            let selection_args = CollectionArgs::parse(&selection.arguments, &self.scope)
                .map_err(|error| error.with_pos(source_pos(selection.position)))?;

            match &args {
                None => args = Some(selection_args),
                Some(args) if *args == selection_args => {}
                Some(_) => {
                    return Err(conflict(
                        typename,
                        alias,
                        "selected with different arguments".to_string(),
                        selection.position,
                    ))
                }
            }
        }

        let selection_sets: Vec<_> = fields
            .iter()
            .map(|selection| &selection.selection_set)
            .collect();

        Ok(CollectionPlan {
            args: args.unwrap_or_default(),
            shape: self.plan_shape(def_id, &selection_sets)?,
        })
    }
}

fn check_same_field<'a>(
    typename: &str,
    alias: &str,
    first: &Field<'a, &'a str>,
    fields: &[&Field<'a, &'a str>],
) -> DomainResult<()> {
    for field in fields {
        if field.name != first.name {
            return Err(conflict(
                typename,
                alias,
                format!("`{}` and `{}` are different fields", first.name, field.name),
                field.position,
            ));
        }
    }

    Ok(())
}

fn check_typename<'a>(
    typename: &str,
    alias: &str,
    fields: &[&Field<'a, &'a str>],
) -> DomainResult<()> {
    for field in fields {
        if !field.arguments.is_empty() || !field.selection_set.items.is_empty() {
            return Err(conflict(
                typename,
                alias,
                "`__typename` takes no arguments and has no sub-selection".to_string(),
                field.position,
            ));
        }
    }

    Ok(())
}

fn conflict(typename: &str, alias: &str, reason: String, pos: Pos) -> DomainError {
    DomainErrorKind::ShapeConflict {
        typename: typename.to_string(),
        alias: alias.to_string(),
        reason,
    }
    .into_error()
    .with_pos(source_pos(pos))
}
