use std::sync::Arc;

use domain_engine_core::{data_store::DataStore, Config, DomainEngine, DomainResult};
use domain_engine_graphql::{ServiceCtx, Variables};
use ontol_runtime::ontology::Ontology;
use unimock::Unimock;

use crate::mock_datastore::LinearDataStoreAdapter;

/// A context whose data store is answered by the given mock setup.
pub fn gql_ctx_mock_data_store(
    ontology: Arc<Ontology>,
    config: Config,
    setup: impl unimock::Clause,
) -> ServiceCtx {
    let unimock = Unimock::new(setup);
    let domain_engine = DomainEngine::builder(ontology)
        .config(config)
        .data_store(DataStore::new(Arc::new(LinearDataStoreAdapter::new(
            unimock,
        ))))
        .build();

    ServiceCtx::from(domain_engine)
}

#[async_trait::async_trait(?Send)]
pub trait Exec {
    /// Execute as a GraphQL query, with the result as the JSON `data` member.
    async fn exec(
        self,
        variables: serde_json::Value,
        ctx: &ServiceCtx,
    ) -> DomainResult<serde_json::Value>;

    /// Like [Exec::exec], selecting the operation by name.
    async fn exec_operation(
        self,
        operation_name: &str,
        variables: serde_json::Value,
        ctx: &ServiceCtx,
    ) -> DomainResult<serde_json::Value>;
}

#[async_trait::async_trait(?Send)]
impl Exec for &str {
    async fn exec(
        self,
        variables: serde_json::Value,
        ctx: &ServiceCtx,
    ) -> DomainResult<serde_json::Value> {
        let variables = into_variables(variables);
        let result = ctx.execute(self, None, &variables).await?;
        Ok(result.to_json())
    }

    async fn exec_operation(
        self,
        operation_name: &str,
        variables: serde_json::Value,
        ctx: &ServiceCtx,
    ) -> DomainResult<serde_json::Value> {
        let variables = into_variables(variables);
        let result = ctx.execute(self, Some(operation_name), &variables).await?;
        Ok(result.to_json())
    }
}

fn into_variables(value: serde_json::Value) -> Variables {
    match value {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => Variables::new(),
        other => panic!("variables must be an object, got {other}"),
    }
}
