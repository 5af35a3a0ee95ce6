//! Queries over the inheritance fixture, against the in-memory data store.

use domain_engine_core::{domain_error::ErrorCategory, Config};
use domain_engine_test_utils::{expect_eq, graphql_test_utils::Exec};
use serde_json::json;

use crate::{inheritance_ctx, inheritance_ctx_with_config};

#[tokio::test]
async fn typename_of_polymorphic_collection() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = "query { Bar { __typename q } }".exec(json!({}), &ctx).await,
        expected = Ok(json!({
            "Bar": [
                { "__typename": "BarType", "q": "bar" },
                { "__typename": "Bar2Type", "q": "bar2" },
            ]
        })),
    );
}

#[tokio::test]
async fn typename_through_link() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = "{ Foo { __typename blah { __typename q } } }"
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({
            "Foo": [
                {
                    "__typename": "FooType",
                    "blah": { "__typename": "BarType", "q": "bar" }
                },
                {
                    "__typename": "Foo2Type",
                    "blah": { "__typename": "Bar2Type", "q": "bar2" }
                },
            ]
        })),
    );
}

#[tokio::test]
async fn narrowed_link_target_in_fragment() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = "
            query {
                Foo2 {
                    blah {
                        __typename
                        ... on Bar2 {
                            q
                            w
                        }
                    }
                }
            }
        "
        .exec(json!({}), &ctx)
        .await,
        expected = Ok(json!({
            "Foo2": [
                {
                    "blah": { "__typename": "Bar2Type", "q": "bar2", "w": "special" }
                }
            ]
        })),
    );
}

#[tokio::test]
async fn fragment_fields_are_absent_for_other_types() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = "{ Foo { blah { __typename ... on Bar2 { w } } } }"
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({
            "Foo": [
                { "blah": { "__typename": "BarType" } },
                { "blah": { "__typename": "Bar2Type", "w": "special" } },
            ]
        })),
    );

    expect_eq!(
        actual = "{ Foo2 { blah { __typename ... on Foo { __typename } } } }"
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({
            "Foo2": [{ "blah": { "__typename": "Bar2Type" } }]
        })),
    );
}

#[tokio::test]
async fn subtype_root_field() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = "{ Bar2 { __typename q w } }".exec(json!({}), &ctx).await,
        expected = Ok(json!({
            "Bar2": [{ "__typename": "Bar2Type", "q": "bar2", "w": "special" }]
        })),
    );
}

#[tokio::test]
async fn named_fragments_and_aliases() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = "
            query {
                bars: Bar { ...BarFields }
                kind: __typename
            }

            fragment BarFields on Bar {
                type: __typename
                q
                ... on Bar2Type { special: w }
            }
        "
        .exec(json!({}), &ctx)
        .await,
        expected = Ok(json!({
            "bars": [
                { "type": "BarType", "q": "bar" },
                { "type": "Bar2Type", "q": "bar2", "special": "special" },
            ],
            "kind": "Query"
        })),
    );
}

#[tokio::test]
async fn operation_by_name() {
    let ctx = inheritance_ctx().await;
    let document = "
        query Bars { Bar { q } }
        query Foos { Foo { __typename } }
    ";

    expect_eq!(
        actual = document.exec_operation("Foos", json!({}), &ctx).await,
        expected = Ok(json!({
            "Foo": [{ "__typename": "FooType" }, { "__typename": "Foo2Type" }]
        })),
    );

    let error = document.exec(json!({}), &ctx).await.unwrap_err();
    expect_eq!(actual = error.category(), expected = ErrorCategory::SyntaxError);
}

#[tokio::test]
async fn order_and_paging() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = r#"{ Bar(order: {q: {dir: DESC}}, first: 1) { q } }"#
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({ "Bar": [{ "q": "bar2" }] })),
    );
    expect_eq!(
        actual = r#"{ Bar(order: {q: {dir: DESC}}, after: "0") { q } }"#
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({ "Bar": [{ "q": "bar" }] })),
    );
}

#[tokio::test]
async fn filter_with_variables() {
    let ctx = inheritance_ctx().await;
    let query = r#"
        query ($q: String = "bar2") {
            Bar(filter: {q: {eq: $q}}) { __typename }
        }
    "#;

    expect_eq!(
        actual = query.exec(json!({}), &ctx).await,
        expected = Ok(json!({ "Bar": [{ "__typename": "Bar2Type" }] })),
    );
    expect_eq!(
        actual = query.exec(json!({ "q": "bar" }), &ctx).await,
        expected = Ok(json!({ "Bar": [{ "__typename": "BarType" }] })),
    );
}

#[tokio::test]
async fn filter_on_link() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = r#"{ Foo { __typename blah(filter: {q: {eq: "bar2"}}) { q } } }"#
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({
            "Foo": [
                { "__typename": "FooType", "blah": null },
                { "__typename": "Foo2Type", "blah": { "q": "bar2" } },
            ]
        })),
    );
}

#[tokio::test]
async fn multi_link_lists_every_subtype() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = "{ Shelf { items { __typename q ... on Bar2 { w } } } }"
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({
            "Shelf": [{
                "items": [
                    { "__typename": "BarType", "q": "bar" },
                    { "__typename": "Bar2Type", "q": "bar2", "w": "special" },
                ]
            }]
        })),
    );
}

#[tokio::test]
async fn nested_order_and_paging() {
    let ctx = inheritance_ctx().await;

    expect_eq!(
        actual = r#"{ Shelf { items(order: {q: {dir: DESC}}, first: 2) { __typename q } } }"#
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({
            "Shelf": [{
                "items": [
                    { "__typename": "Bar2Type", "q": "bar2" },
                    { "__typename": "BarType", "q": "bar" },
                ]
            }]
        })),
    );
    expect_eq!(
        actual = r#"{ Shelf { items(order: {q: {dir: DESC}}, first: 1, after: "0") { q } } }"#
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({ "Shelf": [{ "items": [{ "q": "bar" }] }] })),
    );
    expect_eq!(
        actual = r#"{ Shelf { items(filter: {q: {eq: "nothing"}}) { q } } }"#
            .exec(json!({}), &ctx)
            .await,
        expected = Ok(json!({ "Shelf": [{ "items": [] }] })),
    );
}

#[tokio::test]
async fn default_limit_applies_to_root_only() {
    let ctx = inheritance_ctx_with_config(Config {
        default_limit: Some(1),
    })
    .await;

    expect_eq!(
        actual = "{ Foo { blah { q } } }".exec(json!({}), &ctx).await,
        expected = Ok(json!({ "Foo": [{ "blah": { "q": "bar" } }] })),
    );
    expect_eq!(
        actual = "{ Shelf { items { q } } }".exec(json!({}), &ctx).await,
        expected = Ok(json!({ "Shelf": [{ "items": [{ "q": "bar" }, { "q": "bar2" }] }] })),
    );
}

#[tokio::test]
async fn same_query_same_result() {
    let ctx = inheritance_ctx().await;
    let query = "{ Foo { __typename blah { __typename q ... on Bar2 { w } } } }";

    let first = query.exec(json!({}), &ctx).await.unwrap();
    let second = query.exec(json!({}), &ctx).await.unwrap();
    expect_eq!(actual = second, expected = first);
}

#[tokio::test]
async fn errors_by_category() {
    let ctx = inheritance_ctx().await;

    let error = "{ Bar { q }".exec(json!({}), &ctx).await.unwrap_err();
    expect_eq!(actual = error.category(), expected = ErrorCategory::SyntaxError);

    let error = "{ Bar { w } }".exec(json!({}), &ctx).await.unwrap_err();
    expect_eq!(
        actual = error.category(),
        expected = ErrorCategory::UnknownFieldForType
    );
    expect_eq!(
        actual = error.to_string(),
        expected = "unknown field `w` on type `BarType` at 1:9"
    );

    let error = "{ Bar2 { x: q ... on Bar2 { x: w } } }"
        .exec(json!({}), &ctx)
        .await
        .unwrap_err();
    expect_eq!(
        actual = error.category(),
        expected = ErrorCategory::QueryShapeConflict
    );

    let error = r#"{ Bar(filter: {w: {eq: "special"}}) { q } }"#
        .exec(json!({}), &ctx)
        .await
        .unwrap_err();
    expect_eq!(
        actual = error.category(),
        expected = ErrorCategory::BackendCompileError
    );

    let error = format!(r#"{{ Bar(after: "{}") {{ q }} }}"#, usize::MAX)
        .as_str()
        .exec(json!({}), &ctx)
        .await
        .unwrap_err();
    expect_eq!(
        actual = error.category(),
        expected = ErrorCategory::BackendCompileError
    );

    let error = "mutation { Bar { q } }"
        .exec(json!({}), &ctx)
        .await
        .unwrap_err();
    expect_eq!(actual = error.category(), expected = ErrorCategory::SyntaxError);
}
