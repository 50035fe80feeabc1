#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use twinstore_core::core_types::{RequestContext, SessionId};
use twinstore_core::{ExErrorKind, Mode, MutationKind, SessionModes};
use twinstore_engine::{Engine, EngineQuery, EngineQueryResult, InboundRequest};

fn widget_request() -> InboundRequest {
    InboundRequest::new("product", "add")
        .with_field("name", "Widget")
        .with_field("category", "Tools")
        .with_field("price", "9.99")
}

#[test]
fn test_handle_applies_requested_mode() {
    let stores = TestStores::new();
    let engine = Engine::new(&stores.backends);
    let ctx = RequestContext::new();

    let response = engine
        .handle(&ctx, &widget_request().with_mode("dual"))
        .unwrap();
    assert_eq!(response.request_id, ctx.request_id.to_string());
    assert_eq!(response.outcome.mode, Mode::Dual);
    assert_eq!(response.outcome.kind, MutationKind::Create);
    assert_eq!(
        secondary_count(stores.secondary(), "SELECT COUNT(*) FROM products"),
        1
    );

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["mode"], "dual");
    assert_eq!(json["entity"], "product");
    assert_eq!(json["id"], response.outcome.id);
}

#[test]
fn test_handle_uses_session_mode_when_request_has_none() {
    let stores = TestStores::new();
    let sessions = SessionModes::new();
    let session = SessionId::from_string("cookie-1");
    sessions.select(&session, "Secondary").unwrap();

    let engine = Engine::new(&stores.backends).with_sessions(&sessions);
    let ctx = RequestContext::new().with_session(session);
    let response = engine.handle(&ctx, &widget_request()).unwrap();
    assert_eq!(response.outcome.mode, Mode::Secondary);
    assert_eq!(primary_count(stores.primary(), "SELECT COUNT(*) FROM products"), 0);

    let response = engine
        .handle(&ctx, &widget_request().with_mode("primary"))
        .unwrap();
    assert_eq!(response.outcome.mode, Mode::Primary);
}

#[test]
fn test_handle_rejects_bad_requests_before_writing() {
    let stores = TestStores::new();
    let engine = Engine::new(&stores.backends);
    let ctx = RequestContext::new();

    let err = engine
        .handle(&ctx, &widget_request().with_mode("both"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidMode);

    let err = engine
        .handle(&ctx, &widget_request().with_field("price", "cheap"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);

    let err = engine
        .handle(&ctx, &InboundRequest::new("product", "delete"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);

    assert_eq!(primary_count(stores.primary(), "SELECT COUNT(*) FROM products"), 0);
}

#[test]
fn test_configured_default_mode_applies() {
    let stores = TestStores::new();
    let engine = Engine::with_stores(stores.primary(), stores.backends.secondary(), Mode::Dual);
    let outcome = engine.write(&widget(), None).unwrap();
    assert_eq!(outcome.mode, Mode::Dual);

    match engine
        .query(
            &EngineQuery::ReadOne {
                entity: "product".into(),
                id: outcome.id,
            },
            Some(Mode::Secondary),
        )
        .unwrap()
    {
        EngineQueryResult::Record(Some(record)) => assert_eq!(record.id(), Some(outcome.id)),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_query_results_serialize_as_column_maps() {
    let stores = TestStores::new();
    let engine = Engine::new(&stores.backends);
    engine.write(&widget(), Some(Mode::Dual)).unwrap();

    let result = engine
        .query(
            &EngineQuery::ReadAll {
                entity: "product".into(),
            },
            None,
        )
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json[0]["product_id"], 1);
    assert_eq!(json[0]["name"], "Widget");

    let missing = engine
        .query(
            &EngineQuery::ReadOne {
                entity: "product".into(),
                id: 7,
            },
            Some(Mode::Dual),
        )
        .unwrap();
    assert_eq!(missing, EngineQueryResult::Record(None));

    let report = engine.query(&EngineQuery::OrderReport, None).unwrap();
    assert_eq!(report, EngineQueryResult::Orders(vec![]));
}
