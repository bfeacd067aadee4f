//! Integration test: a node built from a TOML config, driven over HTTP.
//!
//! Exercises config parsing, ledger wiring in `AppState`, and the REST
//! routes together, with a manual clock so refunds can be reached.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use htlcswap_core::ManualClock;
use htlcswap_integration_tests::START;
use htlcswap_node::api::build_router;
use htlcswap_node::config::SwapNodeConfig;
use htlcswap_node::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

const CONFIG: &str = r#"
[api]
port = 9100

[engine]
timelock_duration_secs = 600
cancel_policy = "either_party"

[logging]
format = "json"

[[ledgers]]
id = "ledger-bitcoin"
balances = { btc = "0.5" }

[[ledgers]]
id = "ledger-liquid"
balances = { DePix = "2000" }
"#;

struct Node {
    router: Router,
    clock: Arc<ManualClock>,
}

fn node() -> Node {
    let config: SwapNodeConfig = toml::from_str(CONFIG).unwrap();
    config.validate().unwrap();
    let clock = Arc::new(ManualClock::new(START));
    let state = AppState::from_config(&config, clock.clone()).unwrap();
    Node {
        router: build_router(Arc::new(state)),
        clock,
    }
}

async fn call(node: &Node, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = node
        .router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(node: &Node) -> String {
    let (status, body) = call(
        node,
        Method::POST,
        "/api/v1/offers",
        Some(json!({
            "initiator_asset": "btc",
            "initiator_amount": "0.001",
            "acceptor_asset": "depix",
            "acceptor_amount": "50.0",
            "initiator_address": "addrA",
            "initiator_refund_address": "refundA"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["swap_id"].as_str().unwrap().to_string()
}

async fn step(node: &Node, id: &str, step: &str, body: Option<Value>) -> (StatusCode, Value) {
    call(node, Method::POST, &format!("/api/v1/offers/{}/{}", id, step), body).await
}

async fn balance_of(node: &Node, asset: &str) -> String {
    let (_, body) = call(node, Method::GET, "/api/v1/balances", None).await;
    body["balances"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["asset"] == asset)
        .and_then(|b| b["balance"].as_str())
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_status_reflects_configured_ledgers() {
    let node = node();
    let (status, body) = call(&node, Method::GET, "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ledger"], "ledger-router");
    assert_eq!(body["assets"], json!(["btc", "depix"]));
    assert_eq!(body["swaps"], 0);

    assert_eq!(balance_of(&node, "btc").await, "0.5");
    assert_eq!(balance_of(&node, "depix").await, "2000");
}

#[tokio::test]
async fn test_swap_over_http_moves_funds_on_both_ledgers() {
    let node = node();
    let id = create(&node).await;

    let (status, _) = step(&node, &id, "accept", Some(json!({"acceptor_address": "addrB"}))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = step(&node, &id, "lock-initiator", None).await;
    assert!(body["initiator_txid"]
        .as_str()
        .unwrap()
        .starts_with("ledger-bitcoin-lock-"));
    let (_, body) = step(&node, &id, "lock-acceptor", None).await;
    assert!(body["acceptor_txid"]
        .as_str()
        .unwrap()
        .starts_with("ledger-liquid-lock-"));
    assert_eq!(body["acceptor_timelock"].as_i64().unwrap(), START + 300);

    assert_eq!(balance_of(&node, "btc").await, "0.499");
    assert_eq!(balance_of(&node, "depix").await, "1950.0");

    let (status, receipt) = step(&node, &id, "claim-initiator", None).await;
    assert_eq!(status, StatusCode::OK);
    let secret = receipt["secret"].as_str().unwrap().to_string();

    let (status, body) = step(&node, &id, "claim-acceptor", Some(json!({ "secret": secret }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (_, body) = call(&node, Method::GET, "/api/v1/status", None).await;
    assert_eq!(body["by_status"]["completed"], 1);
}

#[tokio::test]
async fn test_acceptor_may_cancel_under_either_party_policy() {
    let node = node();
    let id = create(&node).await;

    let (status, body) = step(&node, &id, "cancel", Some(json!({"actor": "acceptor"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (_, body) = call(&node, Method::GET, "/api/v1/offers/open", None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_refund_waits_for_configured_timelock() {
    let node = node();
    let id = create(&node).await;
    step(&node, &id, "accept", Some(json!({"acceptor_address": "addrB"}))).await;
    step(&node, &id, "lock-initiator", None).await;

    node.clock.set(START + 599);
    let (status, body) = step(&node, &id, "refund", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "timelock_not_expired");
    assert_eq!(body["retryable"], true);

    node.clock.set(START + 600);
    let (status, body) = step(&node, &id, "refund", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "refunded");
    assert!(body["initiator_refund_txid"]
        .as_str()
        .unwrap()
        .starts_with("ledger-bitcoin-refund-"));
    // Refund goes to the refund address, not back to the node's wallet.
    assert_eq!(balance_of(&node, "btc").await, "0.499");
}
