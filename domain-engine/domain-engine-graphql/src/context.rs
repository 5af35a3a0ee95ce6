use std::sync::Arc;

use domain_engine_core::{domain_error::DomainErrorKind, DomainEngine, DomainResult, Session};
use graphql_parser::query::Document;
use tracing::debug;

use crate::{
    argument::Variables, query_compiler::QueryCompiler, result_materializer::materialize_root,
    result_tree::ResultNode, selection_planner::plan_operation,
};

/// ServiceCtx is the entry point for resolving GraphQL operations.
///
/// It's cheap to clone and can be shared between concurrent requests.
#[derive(Clone)]
pub struct ServiceCtx {
    pub domain_engine: Arc<DomainEngine>,
    pub session: Session,
}

impl ServiceCtx {
    pub fn with_session(self, session: Session) -> Self {
        Self { session, ..self }
    }

    /// Parse and resolve a query document.
    pub async fn execute(
        &self,
        query: &str,
        operation_name: Option<&str>,
        variables: &Variables,
    ) -> DomainResult<ResultNode> {
        let document = graphql_parser::parse_query::<&str>(query)
            .map_err(|error| DomainErrorKind::Syntax(error.to_string()).into_error())?;

        self.resolve(&document, operation_name, variables).await
    }

    /// Resolve an already parsed query document.
    ///
    /// All collections of the operation are fetched in one data store transaction.
    pub async fn resolve<'a>(
        &self,
        document: &Document<'a, &'a str>,
        operation_name: Option<&str>,
        variables: &Variables,
    ) -> DomainResult<ResultNode> {
        let ontology = self.domain_engine.ontology();

        let root_plan = plan_operation(ontology, document, operation_name, variables)?;
        let selects =
            QueryCompiler::new(ontology, self.domain_engine.config()).compile_root(&root_plan)?;

        let results = if selects.is_empty() {
            vec![]
        } else {
            debug!("querying {} collections", selects.len());
            self.domain_engine
                .query_entities(selects, self.session.clone())
                .await?
        };

        materialize_root(ontology, &root_plan, results)
    }
}

impl From<DomainEngine> for ServiceCtx {
    fn from(value: DomainEngine) -> Self {
        Arc::new(value).into()
    }
}

impl From<Arc<DomainEngine>> for ServiceCtx {
    fn from(value: Arc<DomainEngine>) -> Self {
        Self {
            domain_engine: value,
            session: Default::default(),
        }
    }
}
