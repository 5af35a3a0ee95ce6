use domain_engine_core::Config;
use domain_engine_graphql::ServiceCtx;
use domain_engine_test_utils::{fixtures::gql_inheritance_engine, init_test_tracing};

mod test_graphql_inheritance;
mod test_graphql_unit;

fn main() {}

async fn inheritance_ctx() -> ServiceCtx {
    inheritance_ctx_with_config(Config::default()).await
}

async fn inheritance_ctx_with_config(config: Config) -> ServiceCtx {
    init_test_tracing();
    ServiceCtx::from(gql_inheritance_engine(config).await.unwrap())
}
