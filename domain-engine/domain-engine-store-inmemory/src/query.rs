use ontol_runtime::{
    ontology::{domain::Cardinality, Ontology},
    query::select::{EntitySelect, Select, StructSelect},
    row::{Attr, Row},
};
use tracing::{debug, debug_span};

use domain_engine_core::{DomainError, DomainResult};

use crate::{filter::eval_condition, sort::sort_vertices};

use super::core::{InMemoryStore, Vertex, VertexKey};

impl InMemoryStore {
    /// All instances of the selected variants, in insertion order before sorting.
    pub fn query_entities(
        &self,
        select: &EntitySelect,
        ontology: &Ontology,
    ) -> DomainResult<Vec<Row>> {
        debug!("query entities: {:?}", select.source.def_id);

        let mut candidates: Vec<(VertexKey, &Vertex)> = select
            .source
            .variants
            .iter()
            .filter_map(|def_id| Some((*def_id, self.vertices.get(def_id)?)))
            .flat_map(|(def_id, table)| {
                table.iter().map(move |(serial, vertex)| {
                    let key = VertexKey {
                        type_def_id: def_id,
                        serial: *serial,
                    };
                    (key, vertex)
                })
            })
            .collect();
        candidates.sort_by_key(|(key, _)| key.serial);

        self.query_collection(candidates, select, ontology)
    }

    fn query_collection(
        &self,
        mut candidates: Vec<(VertexKey, &Vertex)>,
        select: &EntitySelect,
        ontology: &Ontology,
    ) -> DomainResult<Vec<Row>> {
        candidates.retain(|(_, vertex)| eval_condition(select.filter.condition(), vertex));
        sort_vertices(&mut candidates, select.filter.order());

        candidates
            .into_iter()
            .skip(select.offset)
            .take(select.limit.unwrap_or(usize::MAX))
            .map(|(key, vertex)| self.project_vertex(key, vertex, &select.source, ontology))
            .collect()
    }

    fn project_vertex(
        &self,
        key: VertexKey,
        vertex: &Vertex,
        struct_select: &StructSelect,
        ontology: &Ontology,
    ) -> DomainResult<Row> {
        let _entered = debug_span!("struct_sel", id = ?key.type_def_id).entered();
        let def = ontology.def(key.type_def_id);
        let mut row = Row::new(key.type_def_id);

        for (name, select) in &struct_select.properties {
            // a property of another variant
            let Some(field) = def.field(name) else {
                continue;
            };

            let attr = match select {
                Select::Leaf => Attr::Unit(vertex.value(name).clone()),
                Select::Link(entity_select) => {
                    let linked = vertex
                        .links(name)
                        .iter()
                        .filter(|linked_key| {
                            entity_select
                                .source
                                .variants
                                .contains(&linked_key.type_def_id)
                        })
                        .map(|linked_key| {
                            let linked = self.look_up_vertex(*linked_key).ok_or_else(|| {
                                DomainError::data_store(format!(
                                    "dangling link `{name}` from `{}`",
                                    def.name
                                ))
                            })?;
                            Ok((*linked_key, linked))
                        })
                        .collect::<DomainResult<Vec<_>>>()?;

                    let rows = self.query_collection(linked, entity_select, ontology)?;

                    match field.cardinality {
                        Cardinality::One => Attr::Row(rows.into_iter().next()),
                        Cardinality::Many => Attr::Seq(rows),
                    }
                }
            };

            row.attrs.insert(name.clone(), attr);
        }

        Ok(row)
    }
}
