#![forbid(unsafe_code)]

//! GraphQL query resolution over an inheritance schema.
//!
//! An operation is resolved in four steps:
//! [selection_planner] checks the document against the ontology and plans the output shape,
//! [query_compiler] turns the plan into data store selects,
//! the [DomainEngine](domain_engine_core::DomainEngine) runs them in one transaction,
//! and [result_materializer] shapes the returned rows.

pub mod argument;
pub mod context;
pub mod query_compiler;
pub mod result_materializer;
pub mod result_tree;
pub mod selection_planner;
pub mod shape_plan;
pub mod type_resolver;

pub use argument::Variables;
pub use context::ServiceCtx;
pub use result_tree::ResultNode;
