//! End-to-end tests for contract clients.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use httpapi::config::{ClientConfig, DEFAULT_CONNECTION_LIMIT};
use httpapi::{http_api, ApiContract, ApiError, ApiResponse, HttpApi, Json, PendingState};

mod common;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    id: u64,
    name: String,
}

http_api! {
    /// Front page of a site.
    pub struct HomeApi {
        fn fetch_home() -> pending String = GET "/";
        fn fetch_home_now() -> blocking String = GET "/";
        fn raw_home() -> pending ApiResponse = GET "/";
    }
}

http_api! {
    pub struct ItemsApi {
        fn item(path id: u64, query expand: Option<&str>, header x_tenant: &str) -> pending Json<Item> = GET "/items/{id}";
        fn search(query tag: &[&str]) -> pending String = GET "/items";
        fn create(body item: &Item) -> pending String = POST "/items";
    }
}

http_api! {
    struct UnboundPlaceholder {
        fn item() -> pending String = GET "/items/{id}";
    }
}

http_api! {
    struct BodyOnGet {
        fn search(body filter: &str) -> pending String = GET "/search";
    }
}

http_api! {
    struct Pinned at "http://127.0.0.1:9" {
        fn ping() -> pending String = GET "/ping";
    }
}

#[tokio::test]
async fn default_construction() {
    let api: HomeApi = HttpApi::create().unwrap();
    let config = api.proxy().config();

    assert_eq!(config.connection_limit, DEFAULT_CONNECTION_LIMIT);
    assert_eq!(config.connection_limit, 128);
    assert!(config.base_address.is_none());
    assert_eq!(api.proxy().chain().lifecycle().limiter().limit(), 128);
    assert!(api.proxy().chain().stage_names().is_empty());
}

#[tokio::test]
async fn call_without_any_base_address_fails() {
    let api: HomeApi = HttpApi::create().unwrap();
    match api.fetch_home().await {
        Err(ApiError::MissingArgument { argument }) => assert_eq!(argument, "base_address"),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn pending_call_returns_before_the_response() {
    let addr = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        (200, "<html>home</html>".to_string())
    })
    .await;
    let api: HomeApi = HttpApi::create_with_base(&format!("http://{}", addr)).unwrap();

    let start = Instant::now();
    let call = api.fetch_home();
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(call.state(), PendingState::Pending);

    let body = call.await.unwrap();
    assert_eq!(body, "<html>home</html>");
}

#[tokio::test]
async fn pending_state_tracks_resolution() {
    let addr = common::start_mock_backend("ok").await;
    let api: HomeApi = HttpApi::create_with_base(&format!("http://{}", addr)).unwrap();

    let call = api.raw_home();
    let probe = call.cancellation().clone();
    let response = call.await.unwrap();
    assert_eq!(response.status.as_u16(), 200);
    assert!(!probe.is_cancelled());
}

#[test]
fn blocking_call_outside_any_runtime() {
    let backend = tokio::runtime::Runtime::new().unwrap();
    let addr = backend.block_on(common::start_mock_backend("pong"));

    let api: HomeApi = HttpApi::create_with_base(&format!("http://{}", addr)).unwrap();
    assert_eq!(api.fetch_home_now().unwrap(), "pong");
    assert!(api.proxy().chain().lifecycle().executor().is_started());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_call_inside_a_runtime() {
    let addr = common::start_mock_backend("pong").await;
    let api: HomeApi = HttpApi::create_with_base(&format!("http://{}", addr)).unwrap();
    assert_eq!(api.fetch_home_now().unwrap(), "pong");
}

#[tokio::test]
async fn arguments_reach_the_wire() {
    let addr = common::start_programmable_backend(|req| async move {
        assert_eq!(req.method, "GET");
        assert_eq!(req.target, "/items/42?expand=owner");
        assert_eq!(req.header("x-tenant"), Some("acme"));
        (200, r#"{"id":42,"name":"pen"}"#.to_string())
    })
    .await;
    let api: ItemsApi = HttpApi::create_with_base(&format!("http://{}", addr)).unwrap();

    let item = api.item(42, Some("owner"), "acme").await.unwrap();
    assert_eq!(
        item.into_inner(),
        Item {
            id: 42,
            name: "pen".into()
        }
    );
}

#[tokio::test]
async fn repeated_query_and_json_body() {
    let addr = common::start_programmable_backend(|req| async move {
        let echo = format!("{} {} {} {}", req.method, req.target, req.header("content-type").unwrap_or("-"), req.body);
        (200, echo)
    })
    .await;
    let api: ItemsApi = HttpApi::create_with_base(&format!("http://{}", addr)).unwrap();

    let listed = api.search(&["red", "blue"]).await.unwrap();
    assert_eq!(listed, "GET /items?tag=red&tag=blue - ");

    let item = Item {
        id: 7,
        name: "cup".into(),
    };
    let created = api.create(&item).await.unwrap();
    assert_eq!(created, r#"POST /items application/json {"id":7,"name":"cup"}"#);
}

#[tokio::test]
async fn error_status_and_raw_responses() {
    let addr = common::start_programmable_backend(|_| async { (404, "missing".to_string()) }).await;
    let api: HomeApi = HttpApi::create_with_base(&format!("http://{}", addr)).unwrap();

    match api.fetch_home().await {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body, "missing");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let raw = api.raw_home().await.unwrap();
    assert_eq!(raw.status.as_u16(), 404);
    assert_eq!(raw.text(), "missing");
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let addr = common::start_mock_backend("not json").await;
    let api: ItemsApi = HttpApi::create_with_base(&format!("http://{}", addr)).unwrap();
    let outcome = api.item(1, None, "acme").await;
    assert!(matches!(outcome, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn unreachable_destination_is_a_transport_error() {
    let api: Pinned = HttpApi::create().unwrap();
    let outcome = api.ping().await;
    assert!(matches!(outcome, Err(ApiError::Transport(_))), "{:?}", outcome);
}

#[tokio::test]
async fn clients_share_one_descriptor() {
    let a: HomeApi = HttpApi::create().unwrap();
    let b: HomeApi = HttpApi::create_with_base("http://localhost:1").unwrap();
    assert!(Arc::ptr_eq(a.proxy().descriptor(), b.proxy().descriptor()));
    assert!(!Arc::ptr_eq(a.proxy().chain(), b.proxy().chain()));
}

#[test]
fn construction_errors() {
    assert!(matches!(
        HttpApi::create_with_base::<HomeApi>(""),
        Err(ApiError::MissingArgument { .. })
    ));
    assert!(matches!(
        HttpApi::create::<UnboundPlaceholder>(),
        Err(ApiError::InvalidContract { .. })
    ));
    assert!(matches!(
        HttpApi::create::<BodyOnGet>(),
        Err(ApiError::UnsupportedType { .. })
    ));

    let config = ClientConfig {
        connection_limit: 0,
        ..ClientConfig::default()
    };
    match HttpApi::create_with_config::<HomeApi>(config) {
        Err(ApiError::InvalidConfiguration(errors)) => {
            assert!(errors.iter().any(|e| e.field == "connection_limit"));
        }
        other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
    }

    assert!(matches!(
        HttpApi::create_with_base::<HomeApi>("ftp://example.com"),
        Err(ApiError::InvalidConfiguration(_))
    ));
}

#[tokio::test]
async fn config_changes_after_build_are_invisible() {
    let mut config = ClientConfig::with_base_address("http://localhost:1");
    config.connection_limit = 4;
    let api: HomeApi = HttpApi::create_with_config(config.clone()).unwrap();

    config.connection_limit = 99;
    assert_eq!(api.proxy().config().connection_limit, 4);
}
