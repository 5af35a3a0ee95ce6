//! GraphQL "unit" tests, i.e. only mocked datastore

use std::sync::Arc;

use domain_engine_core::{
    domain_error::ErrorCategory,
    transact::{ReqMessage, RespMessage},
    Config, DomainError, Session,
};
use domain_engine_test_utils::{
    expect_eq,
    fixtures::gql_inheritance,
    graphql_test_utils::{gql_ctx_mock_data_store, Exec},
    init_test_tracing,
    mock_datastore::{respond_queried, LinearTransactMock},
};
use ontol_runtime::{
    ontology::Ontology,
    query::{
        filter::Filter,
        select::{EntitySelect, Select, StructSelect},
    },
    row::Row,
    value::Value,
    DefId, DefIdSet,
};
use serde_json::json;
use unimock::*;

fn ontology() -> Arc<Ontology> {
    init_test_tracing();
    Arc::new(gql_inheritance())
}

fn def(ontology: &Ontology, name: &str) -> DefId {
    ontology.find_def(name).unwrap().id
}

#[tokio::test]
async fn one_select_for_all_variants() {
    let ontology = ontology();
    let (bar, bar2) = (def(&ontology, "Bar"), def(&ontology, "Bar2"));

    let mut expected_source = StructSelect::new(bar, DefIdSet::from_iter([bar, bar2]));
    expected_source
        .properties
        .insert("q".into(), Select::Leaf);
    expected_source
        .properties
        .insert("w".into(), Select::Leaf);
    let expected_select = EntitySelect {
        source: expected_source,
        filter: Filter::default(),
        limit: Some(2),
        offset: 0,
    };

    let ctx = gql_ctx_mock_data_store(
        ontology,
        Config::default(),
        LinearTransactMock::transact
            .next_call(matching!(_))
            .answers_arc(Arc::new(move |_, messages, _| {
                let [Ok(ReqMessage::Query(0, entity_select))] = messages.as_slice() else {
                    panic!("expected exactly one query");
                };
                assert_eq!(&expected_select, entity_select);

                respond_queried(&messages, |_| {
                    vec![
                        Row::new(bar).with("q", Value::text("bar")),
                        Row::new(bar2)
                            .with("q", Value::text("bar2"))
                            .with("w", Value::text("special")),
                    ]
                })
            })),
    );

    expect_eq!(
        actual = "{ Bar(first: 2) { q ... on Bar2 { w } } }"
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({
            "Bar": [
                { "q": "bar" },
                { "q": "bar2", "w": "special" },
            ]
        })),
    );
}

#[tokio::test]
async fn one_transaction_for_all_root_fields() {
    let ontology = ontology();
    let (bar, foo) = (def(&ontology, "Bar"), def(&ontology, "Foo"));

    let ctx = gql_ctx_mock_data_store(
        ontology,
        Config::default(),
        LinearTransactMock::transact
            .next_call(matching!(_))
            .answers_arc(Arc::new(move |_, messages, _| {
                let def_ids: Vec<_> = messages
                    .iter()
                    .map(|message| match message {
                        Ok(ReqMessage::Query(_, select)) => select.source.def_id,
                        Err(error) => panic!("{error}"),
                    })
                    .collect();
                assert_eq!(vec![bar, foo], def_ids);

                respond_queried(&messages, |ReqMessage::Query(op_seq, _)| match op_seq {
                    0 => vec![Row::new(bar).with("q", Value::text("bar"))],
                    _ => vec![Row::new(foo)],
                })
            })),
    );

    expect_eq!(
        actual = "{ Bar { q } t: __typename Foo { __typename } }"
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({
            "Bar": [{ "q": "bar" }],
            "t": "Query",
            "Foo": [{ "__typename": "FooType" }],
        })),
    );
}

#[tokio::test]
async fn typename_only_query_skips_the_data_store() {
    let ctx = gql_ctx_mock_data_store(ontology(), Config::default(), ());

    expect_eq!(
        actual = "{ __typename }".exec(json!({}), &ctx).await,
        expected = Ok(json!({ "__typename": "Query" })),
    );
}

#[tokio::test]
async fn data_store_failure_yields_no_data() {
    let ctx = gql_ctx_mock_data_store(
        ontology(),
        Config::default(),
        LinearTransactMock::transact
            .next_call(matching!(_))
            .answers_arc(Arc::new(|_, _, _| Err(DomainError::data_store("offline")))),
    );

    let error = "{ Bar { q } }".exec(json!({}), &ctx).await.unwrap_err();
    expect_eq!(
        actual = error.category(),
        expected = ErrorCategory::BackendExecutionError
    );
    expect_eq!(actual = error.to_string(), expected = "data store: offline");
}

#[tokio::test]
async fn incomplete_response_yields_no_data() {
    let ontology = ontology();
    let bar = def(&ontology, "Bar");

    let ctx = gql_ctx_mock_data_store(
        ontology,
        Config::default(),
        LinearTransactMock::transact
            .next_call(matching!(_))
            .answers_arc(Arc::new(move |_, _, _| {
                Ok(vec![
                    Ok(RespMessage::SequenceStart(0)),
                    Ok(RespMessage::Element(
                        Row::new(bar).with("q", Value::text("bar")),
                    )),
                    Ok(RespMessage::SequenceEnd(0)),
                ])
            })),
    );

    let error = "{ Bar { q } Foo { __typename } }"
        .exec(json!({}), &ctx)
        .await
        .unwrap_err();
    expect_eq!(
        actual = error.category(),
        expected = ErrorCategory::BackendExecutionError
    );
}

#[tokio::test]
async fn row_of_unselected_type_is_rejected() {
    let ontology = ontology();
    let foo = def(&ontology, "Foo");

    let ctx = gql_ctx_mock_data_store(
        ontology,
        Config::default(),
        LinearTransactMock::transact
            .next_call(matching!(_))
            .answers_arc(Arc::new(move |_, messages, _| {
                respond_queried(&messages, |_| vec![Row::new(foo)])
            })),
    );

    let error = "{ Bar2 { q } }".exec(json!({}), &ctx).await.unwrap_err();
    expect_eq!(
        actual = error.category(),
        expected = ErrorCategory::BackendExecutionError
    );
}

#[tokio::test]
async fn default_limit_is_compiled_into_root_select() {
    let ontology = ontology();

    let ctx = gql_ctx_mock_data_store(
        ontology,
        Config {
            default_limit: Some(20),
        },
        LinearTransactMock::transact
            .next_call(matching!(_))
            .answers_arc(Arc::new(|_, messages, _| {
                let Some(Ok(ReqMessage::Query(_, entity_select))) = messages.first() else {
                    panic!()
                };
                assert_eq!(Some(20), entity_select.limit);
                let Some(Select::Link(blah)) = entity_select.source.properties.get("blah") else {
                    panic!("blah not selected");
                };
                assert_eq!(None, blah.limit);

                respond_queried(&messages, |_| vec![])
            })),
    );

    expect_eq!(
        actual = "{ Foo { blah { q } } }".exec(json!({}), &ctx).await,
        expected = Ok(json!({ "Foo": [] })),
    );
}

#[tokio::test]
async fn session_reaches_the_data_store() {
    let ontology = ontology();

    let ctx = gql_ctx_mock_data_store(
        ontology,
        Config::default(),
        LinearTransactMock::transact
            .next_call(matching!(_))
            .answers_arc(Arc::new(|_, messages, session| {
                assert_eq!(Some(&"tenant-a"), session.0.downcast_ref::<&str>());
                respond_queried(&messages, |_| vec![])
            })),
    )
    .with_session(Session(Arc::new("tenant-a")));

    expect_eq!(
        actual = "{ Bar { q } }".exec(json!({}), &ctx).await,
        expected = Ok(json!({ "Bar": [] })),
    );
}
