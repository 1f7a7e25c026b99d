mod common;

use common::fields;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use storeconf_cloud::{CancelSignal, GatewayConfig, HttpGateway};
use storeconf_sync::{ResourceState, SyncConfig, SyncEngine, SyncError, SHIPPING_ZONE};
use storeconf_types::{ResourceId, TenantId};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine(server: &MockServer, config: SyncConfig) -> SyncEngine {
    let gateway = HttpGateway::new(GatewayConfig {
        base_url: server.uri(),
        bearer_token: Some("token".into()),
        ..Default::default()
    })
    .unwrap();
    SyncEngine::new(Arc::new(gateway), config)
}

fn tenant() -> TenantId {
    TenantId::parse("shop").unwrap()
}

#[tokio::test]
async fn create_posts_then_reads_back_with_language_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/shop/shipping-zones"))
        .and(body_json(json!({"key": "eu", "description": {"en": "Europe"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "z1", "version": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/shipping-zones/z1"))
        .and(header("accept-language", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "z1",
            "version": 1,
            "key": "eu",
            "description": "Europe",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(
        &server,
        SyncConfig {
            accept_language: Some("en".into()),
            operation_timeout_secs: Some(10),
        },
    );
    let desired = fields(json!({"key": "eu", "description": {"en": "Europe"}, "name": null}));
    let state = engine
        .create(&tenant(), &SHIPPING_ZONE, &desired, &CancelSignal::none())
        .await
        .unwrap();

    assert_eq!(state.id, ResourceId::from("z1"));
    assert_eq!(
        state.fields,
        fields(json!({"key": "eu", "description": {"en": "Europe"}}))
    );
}

#[tokio::test]
async fn update_patches_only_changes() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/shop/shipping-zones/z1"))
        .and(body_json(json!({"name": null, "locations": [{"country": "FR"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "z1", "version": 2})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/shipping-zones/z1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "z1",
            "version": 2,
            "key": "eu",
            "locations": [{"country": "FR"}],
        })))
        .mount(&server)
        .await;

    let recorded = ResourceState {
        id: ResourceId::from("z1"),
        version: Some(1),
        fields: fields(json!({"key": "eu", "name": "Europe", "locations": [{"country": "DE"}]})),
        drift: Vec::new(),
    };
    let desired = fields(json!({"key": "eu", "locations": [{"country": "FR"}]}));
    let state = engine(&server, SyncConfig::default())
        .update(&tenant(), &SHIPPING_ZONE, &recorded, &desired, &CancelSignal::none())
        .await
        .unwrap();

    assert_eq!(state.version, Some(2));
    assert_eq!(state.fields, desired);
}

#[tokio::test]
async fn rejection_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/shop/shipping-zones"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "key already in use"})),
        )
        .mount(&server)
        .await;

    let err = engine(&server, SyncConfig::default())
        .create(
            &tenant(),
            &SHIPPING_ZONE,
            &fields(json!({"key": "eu"})),
            &CancelSignal::none(),
        )
        .await
        .unwrap_err();

    match err {
        SyncError::RemoteRejected { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("key already in use"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn missing_id_in_create_response_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/shop/shipping-zones"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"version": 1})))
        .mount(&server)
        .await;

    let err = engine(&server, SyncConfig::default())
        .create(
            &tenant(),
            &SHIPPING_ZONE,
            &fields(json!({"key": "eu"})),
            &CancelSignal::none(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Decode { .. }));
}
