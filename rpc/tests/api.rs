//! End-to-end API tests against the router, without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use fundrelay_chain::{Chain, SharedChain};
use fundrelay_nullables::NullClock;
use fundrelay_rpc::{router, RpcState};
use fundrelay_types::{Address, LedgerParams};
use serde_json::{json, Value};
use tower::ServiceExt;

fn addr(s: &str) -> Address {
    Address::from_label(s)
}

fn app(enable_faucet: bool) -> Router {
    let clock = Arc::new(NullClock::new(1_000));
    let chain = SharedChain::new(Chain::new(addr("owner"), LedgerParams::default(), clock));
    router(RpcState {
        chain,
        metrics: prometheus::Registry::new(),
        enable_faucet,
    })
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create(app: &Router, goal: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/campaigns",
        Some(json!({
            "from": addr("manager"),
            "name": "Clinic",
            "description": "A rural clinic",
            "media_ref": "bafy-clinic",
            "milestones": [{ "name": "walls", "goal": goal }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["address"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn healthcheck_reports_ok() {
    let app = app(false);
    let (status, body) = call(&app, "GET", "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["campaigns"], 0);
}

#[tokio::test]
async fn create_and_fund_campaign() {
    let app = app(true);
    let campaign = create(&app, "100").await;

    let alice = addr("alice").to_string();
    let (status, _) = call(
        &app,
        "POST",
        &format!("/accounts/{alice}/faucet"),
        Some(json!({ "amount": "150" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, receipt) = call(
        &app,
        "POST",
        &format!("/campaigns/{campaign}/contribute"),
        Some(json!({ "from": alice, "amount": "40.5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["events"][0]["type"], "contribution_made");
    assert_eq!(receipt["events"][0]["campaign_name"], "Clinic");

    let (_, summary) = call(&app, "GET", &format!("/campaigns/{campaign}/summary"), None).await;
    assert_eq!(summary["funded"], "40.5");
    assert_eq!(summary["goal_total"], "100");
    assert_eq!(summary["backer_count"], 1);

    let (_, history) = call(&app, "GET", &format!("/backers/{alice}/contributions"), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    let (_, balance) = call(&app, "GET", &format!("/accounts/{alice}/balance"), None).await;
    assert_eq!(balance["balance"], "109.5");
}

#[tokio::test]
async fn errors_carry_kind_and_status() {
    let app = app(true);
    let campaign = create(&app, "10").await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/campaigns/{campaign}/milestones/0/request-verification"),
        Some(json!({ "from": addr("stranger") })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "authorization");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/campaigns/{campaign}/milestones/0/withdraw"),
        Some(json!({ "from": addr("manager") })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].as_str().unwrap().contains("not eligible"));

    let missing = addr("missing");
    let (status, body) = call(&app, "GET", &format!("/campaigns/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = call(&app, "GET", "/campaigns/not-an-address", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn faucet_is_refused_when_disabled() {
    let app = app(false);
    let (status, body) = call(
        &app,
        "POST",
        &format!("/accounts/{}/faucet", addr("alice")),
        Some(json!({ "amount": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn provider_flow_and_submission() {
    let app = app(false);
    let campaign = create(&app, "5").await;

    let (status, body) = call(
        &app,
        "POST",
        "/authority/providers",
        Some(json!({ "from": addr("owner"), "provider": addr("relay") })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (_, body) = call(
        &app,
        "POST",
        "/authority/providers",
        Some(json!({ "from": addr("owner"), "provider": addr("relay") })),
    )
    .await;
    assert_eq!(body["changed"], false);

    let submission = json!({
        "from": addr("relay"),
        "campaign": campaign,
        "milestone_index": 0,
        "verified": true
    });
    let (status, body) = call(&app, "POST", "/authority/submissions", Some(submission.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], true);
    let (_, body) = call(&app, "POST", "/authority/submissions", Some(submission)).await;
    assert_eq!(body["recorded"], false);

    let (_, milestones) = call(&app, "GET", &format!("/campaigns/{campaign}/milestones"), None).await;
    assert_eq!(milestones[0]["verified"], true);
    assert_eq!(milestones[0]["state"], "verified");

    let (_, providers) = call(&app, "GET", "/authority/providers", None).await;
    assert_eq!(providers["providers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn events_are_paged_by_sequence() {
    let app = app(false);
    for _ in 0..3 {
        create(&app, "1").await;
    }
    let (_, page) = call(&app, "GET", "/events?from=1&limit=1", None).await;
    assert_eq!(page["events"][0]["sequence"], 1);
    assert_eq!(page["next"], 2);
    assert_eq!(page["more"], true);

    let (_, page) = call(&app, "GET", "/events?from=2", None).await;
    assert_eq!(page["events"].as_array().unwrap().len(), 1);
    assert_eq!(page["more"], false);
}

#[tokio::test]
async fn metrics_endpoint_serves_text() {
    let app = app(false);
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
