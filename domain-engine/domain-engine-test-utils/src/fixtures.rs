//! Schemas and data shared by tests.

use std::sync::Arc;

use domain_engine_core::{data_store::DataStore, Config, DomainEngine, DomainResult};
use domain_engine_store_inmemory::{EntityData, InMemoryDb};
use ontol_runtime::ontology::{builder::FieldDecl, domain::ScalarKind, Ontology};

/// `Bar2` extends `Bar`, `Foo2` extends `Foo` and narrows the target of `blah` to `Bar2`.
/// A `Shelf` holds any number of `Bar`s.
pub fn gql_inheritance() -> Ontology {
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
        .def("Shelf")
        .field(FieldDecl::link("items", "Bar").many());

    builder.build().expect("inheritance fixture is consistent")
}

/// One instance of each type of [gql_inheritance], every `Foo` linking to the `Bar` of matching depth
/// and the `Shelf` holding both `Bar`s.
pub async fn gql_inheritance_db(ontology: Arc<Ontology>) -> DomainResult<InMemoryDb> {
    let def_id = |name: &str| {
        ontology
            .find_def(name)
            .map(|def| def.id)
            .expect("fixture type")
    };
    let db = InMemoryDb::new(ontology.clone());

    let bar = db
        .insert(EntityData::new(def_id("Bar")).prop("q", "bar"))
        .await?;
    let bar2 = db
        .insert(
            EntityData::new(def_id("Bar2"))
                .prop("q", "bar2")
                .prop("w", "special"),
        )
        .await?;
    db.insert(EntityData::new(def_id("Foo")).link("blah", bar))
        .await?;
    db.insert(EntityData::new(def_id("Foo2")).link("blah", bar2))
        .await?;
    db.insert(EntityData::new(def_id("Shelf")).links("items", [bar, bar2]))
        .await?;

    Ok(db)
}

/// A [DomainEngine] over the seeded [gql_inheritance] data.
pub async fn gql_inheritance_engine(config: Config) -> DomainResult<DomainEngine> {
    let ontology = Arc::new(gql_inheritance());
    let db = gql_inheritance_db(ontology.clone()).await?;

    Ok(DomainEngine::builder(ontology)
        .config(config)
        .data_store(DataStore::new(Arc::new(db)))
        .build())
}
