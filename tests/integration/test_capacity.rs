use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine;
use serde_json::{Value, json};

use super::helpers::{FakeChain, FakeFacilitator, assert_status, read_json, send, spawn_app};

#[tokio::test]
async fn get_capacity_reports_available_slots() {
    let chain = FakeChain::new(100, 95, i64::MAX);
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let res = send(
        &app.app,
        Request::get("/capacity/0xToken").body(Body::empty()).unwrap(),
    )
    .await;

    assert_status(res.status(), StatusCode::OK);
    let body: Value = read_json(res).await;
    assert_eq!(body["capacity"]["max"], 100);
    assert_eq!(body["capacity"]["current"], 95);
    assert_eq!(body["capacity"]["available"], 5);
}

#[tokio::test]
async fn get_capacity_reports_a_snapshot_even_when_over_subscribed() {
    // current + pending already exceeds max: a transient, self-healing
    // state (spec §5), not an error this read-only endpoint should refuse.
    let chain = FakeChain::new(100, 104, i64::MAX);
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let res = send(
        &app.app,
        Request::get("/capacity/0xToken").body(Body::empty()).unwrap(),
    )
    .await;

    assert_status(res.status(), StatusCode::OK);
    let body: Value = read_json(res).await;
    assert_eq!(body["capacity"]["max"], 100);
    assert_eq!(body["capacity"]["current"], 104);
    assert_eq!(body["capacity"]["available"], 0);
}

#[tokio::test]
async fn mint_is_rejected_with_429_once_capacity_is_exhausted() {
    let chain = FakeChain::new(100, 100, i64::MAX);
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let authorization = json!({
        "fromAddress": "0xpayer",
        "toAddress": "0xtoken2",
        "valueMinorUnits": 10_000_000u64,
        "nonce": "0xnonce",
        "validAfter": 0,
        "validBefore": 9_999_999_999i64,
        "signature": "0xsig",
        "chainId": 56,
        "assetContractAddress": "0xasset",
    });
    let header_value =
        base64::engine::general_purpose::STANDARD.encode(authorization.to_string());

    let res = send(
        &app.app,
        Request::post("/mint")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-payment", header_value)
            .body(Body::from(
                json!({
                    "tokenAddress": "0xToken2",
                    "recipients": ["0xrecipient1"],
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;

    assert_status(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = read_json(res).await;
    assert_eq!(body["available"], 0);
}
