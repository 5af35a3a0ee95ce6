//! Turns data store rows into the response tree.

use arcstr::ArcStr;
use domain_engine_core::{DomainError, DomainResult};
use ontol_runtime::{
    ontology::{domain::Cardinality, Ontology},
    row::{Attr, Row},
    value::Value,
    FnvIndexMap,
};

use crate::{
    result_tree::ResultNode,
    selection_planner::QUERY_TYPENAME,
    shape_plan::{OutputField, RootField, RootPlan, ShapePlan},
};

/// Materialize the response of a whole operation.
///
/// `results` holds the rows of each collection in [RootPlan::collections] order.
pub fn materialize_root(
    ontology: &Ontology,
    root_plan: &RootPlan,
    results: Vec<Vec<Row>>,
) -> DomainResult<ResultNode> {
    let mut results = results.into_iter();
    let mut output = FnvIndexMap::default();

    for (alias, root_field) in &root_plan.fields {
        let node = match root_field {
            RootField::Typename => ResultNode::Scalar(QUERY_TYPENAME.into()),
            RootField::Collection(collection) => {
                let rows = results.next().ok_or_else(|| {
                    DomainError::data_store(format!("no result for `{alias}`"))
                })?;
                Materializer { ontology }.list(&collection.shape, rows)?
            }
        };
        output.insert(alias.clone(), node);
    }

    if results.next().is_some() {
        return Err(DomainError::data_store("more results than queries"));
    }

    Ok(ResultNode::Object(output))
}

struct Materializer<'o> {
    ontology: &'o Ontology,
}

impl Materializer<'_> {
    fn list(&self, shape: &ShapePlan, rows: Vec<Row>) -> DomainResult<ResultNode> {
        rows.into_iter()
            .map(|row| self.object(shape, row))
            .collect::<DomainResult<_>>()
            .map(ResultNode::List)
    }

    /// The branch is chosen by the concrete type of the row.
    fn object(&self, shape: &ShapePlan, mut row: Row) -> DomainResult<ResultNode> {
        let (def, branch) = match (self.ontology.get_def(row.def_id), shape.branch(row.def_id)) {
            (Some(def), Some(branch)) => (def, branch),
            (Some(def), None) => {
                return Err(DomainError::data_store(format!(
                    "unexpected row of type `{}`",
                    def.name
                )));
            }
            (None, _) => {
                return Err(DomainError::data_store(format!(
                    "row of unknown type {:?}",
                    row.def_id
                )));
            }
        };

        let mut output = FnvIndexMap::default();

        for (alias, output_field) in &branch.fields {
            let node = match output_field {
                OutputField::Typename => ResultNode::Scalar(Value::Text(def.typename.clone())),
                OutputField::Property(field) => match row.attrs.get(field) {
                    Some(Attr::Unit(value)) => value.clone().into(),
                    _ => return Err(malformed(field, def.name.as_str())),
                },
                OutputField::Link {
                    field,
                    cardinality,
                    collection,
                } => {
                    // the same link may be output under several aliases
                    let attr = take_or_clone(&mut row, field, &branch.fields, alias);
                    match (cardinality, attr) {
                        (Cardinality::One, Some(Attr::Row(None))) => ResultNode::Null,
                        (Cardinality::One, Some(Attr::Row(Some(row)))) => {
                            self.object(&collection.shape, row)?
                        }
                        (Cardinality::Many, Some(Attr::Seq(rows))) => {
                            self.list(&collection.shape, rows)?
                        }
                        _ => return Err(malformed(field, def.name.as_str())),
                    }
                }
            };
            output.insert(alias.clone(), node);
        }

        Ok(ResultNode::Object(output))
    }
}

/// Move the attribute out of the row when no later alias reads it.
fn take_or_clone(
    row: &mut Row,
    field: &ArcStr,
    fields: &FnvIndexMap<ArcStr, OutputField>,
    alias: &ArcStr,
) -> Option<Attr> {
    let read_later = fields
        .iter()
        .skip_while(|(key, _)| *key != alias)
        .skip(1)
        .any(|(_, output_field)| match output_field {
            OutputField::Link { field: other, .. } => other == field,
            _ => false,
        });

    if read_later {
        row.attrs.get(field).cloned()
    } else {
        row.attrs.remove(field)
    }
}

fn malformed(field: &str, def_name: &str) -> DomainError {
    DomainError::data_store(format!("malformed `{field}` in row of type `{def_name}`"))
}
