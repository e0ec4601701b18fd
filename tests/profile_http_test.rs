//! profile HTTP 传输集成测试
//!
//! 用 wiremock 模拟 profile 服务，客户端经由静态注册中心发现实例。

#![cfg(feature = "http")]

use profilesvc_client::{
    Address, CallContext, ClientBuilder, ClientError, HttpOperationFactory, MemoryRegistry,
    Profile, ProfileClient, ProfileService, RemoteError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVICE: &str = "profilesvc";

async fn connect(servers: &[&MockServer], builder: ClientBuilder) -> ProfileClient {
    let registry = MemoryRegistry::with_instances(
        SERVICE,
        servers.iter().map(|server| server.address().to_string()),
    );
    let factory = Arc::new(HttpOperationFactory::new().expect("http factory"));
    ProfileClient::connect(builder, &registry, factory)
        .await
        .expect("connect")
}

fn alice() -> Profile {
    Profile {
        id: "1234".into(),
        name: "alice".into(),
        addresses: vec![Address {
            id: "home".into(),
            location: "Berlin".into(),
        }],
    }
}

#[tokio::test]
async fn get_profile_decodes_the_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "profile": {
                "id": "1234",
                "name": "alice",
                "addresses": [{"id": "home", "location": "Berlin"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&[&server], ClientBuilder::new(SERVICE)).await;
    let profile = client
        .get_profile(&CallContext::new(), "1234")
        .await
        .expect("get profile");

    assert_eq!(profile, alice());
    client.shutdown().await;
}

#[tokio::test]
async fn post_profile_sends_the_profile_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/profiles/"))
        .and(body_json(json!({
            "id": "1234",
            "name": "alice",
            "addresses": [{"id": "home", "location": "Berlin"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&[&server], ClientBuilder::new(SERVICE)).await;
    client
        .post_profile(&CallContext::new(), alice())
        .await
        .expect("post profile");
    client.shutdown().await;
}

#[tokio::test]
async fn address_methods_use_nested_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles/1234/addresses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "addresses": [{"id": "home", "location": "Berlin"}, {"id": "work"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/profiles/1234/addresses/work"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&[&server], ClientBuilder::new(SERVICE)).await;
    let ctx = CallContext::new();

    let addresses = client.get_addresses(&ctx, "1234").await.expect("addresses");
    assert_eq!(addresses.len(), 2);
    assert_eq!(addresses[1].id, "work");
    assert!(addresses[1].location.is_empty());

    client
        .delete_address(&ctx, "1234", "work")
        .await
        .expect("delete address");
    client.shutdown().await;
}

#[tokio::test]
async fn error_responses_are_retried_then_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .expect(3)
        .mount(&server)
        .await;

    let client = connect(
        &[&server],
        ClientBuilder::new(SERVICE).retry(3, Duration::from_millis(500)),
    )
    .await;
    let err = client
        .get_profile(&CallContext::new(), "missing")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(
        err.remote_cause(),
        Some(&RemoteError::status(404, "not found"))
    );
    client.shutdown().await;
}

#[tokio::test]
async fn embedded_err_field_is_a_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/profiles/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"err": "inconsistent IDs"})))
        .mount(&server)
        .await;

    let client = connect(
        &[&server],
        ClientBuilder::new(SERVICE).retry(1, Duration::from_millis(500)),
    )
    .await;
    let err = client
        .put_profile(&CallContext::new(), "1234", alice())
        .await
        .unwrap_err();

    assert_eq!(
        err.remote_cause(),
        Some(&RemoteError::Application("inconsistent IDs".into()))
    );
    client.shutdown().await;
}

#[tokio::test]
async fn unavailable_instance_fails_over() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"error": "draining"})),
        )
        .mount(&broken)
        .await;
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"profile": {"id": "1234"}})))
        .mount(&healthy)
        .await;

    let client = connect(&[&broken, &healthy], ClientBuilder::new(SERVICE)).await;
    let ctx = CallContext::new();

    // 无论轮询从哪个实例开始，都能在重试内成功
    for _ in 0..4 {
        let profile = client.get_profile(&ctx, "1234").await.expect("get profile");
        assert_eq!(profile.id, "1234");
    }
    client.shutdown().await;
}

#[tokio::test]
async fn slow_instances_hit_the_per_attempt_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/profiles/1234"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = connect(
        &[&server],
        ClientBuilder::new(SERVICE).retry(2, Duration::from_millis(100)),
    )
    .await;
    let err = client
        .delete_profile(&CallContext::new(), "1234")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::RetriesExhausted { attempts: 2, .. }));
    assert_eq!(
        err.remote_cause(),
        Some(&RemoteError::Timeout(Duration::from_millis(100)))
    );
    client.shutdown().await;
}
