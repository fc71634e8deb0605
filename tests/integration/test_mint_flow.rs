use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine;
use serde_json::{Value, json};

use super::helpers::{FakeChain, FakeFacilitator, assert_status, read_json, send, spawn_app};

fn mint_body(token: &str) -> Body {
    Body::from(
        json!({
            "tokenAddress": token,
            "recipients": ["0xrecipient1"],
        })
        .to_string(),
    )
}

#[tokio::test]
async fn mint_without_payment_header_returns_a_402_challenge() {
    let chain = FakeChain::new(100, 0, i64::MAX);
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let res = send(
        &app.app,
        Request::post("/mint")
            .header(header::CONTENT_TYPE, "application/json")
            .body(mint_body("0xToken"))
            .unwrap(),
    )
    .await;

    assert_status(res.status(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = read_json(res).await;
    assert_eq!(body["payTo"], "0xToken");
    assert_eq!(body["token"], "0xasset");
    assert_eq!(body["paymentRequired"]["scheme"], "exact");
}

#[tokio::test]
async fn mint_with_a_valid_payment_header_settles_and_returns_the_tx_hash() {
    let chain = FakeChain::new(100, 0, i64::MAX);
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let authorization = json!({
        "fromAddress": "0xpayer",
        "toAddress": "0xtoken",
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
            .body(mint_body("0xToken"))
            .unwrap(),
    )
    .await;

    assert_status(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-payment-response"));
    let body: Value = read_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["paymentTxHash"], "0xsettled0");
}

#[tokio::test]
async fn internal_mint_with_wrong_secret_returns_404() {
    let chain = FakeChain::new(100, 0, i64::MAX);
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let res = send(
        &app.app,
        Request::post("/internal/mint/not-the-secret")
            .header(header::CONTENT_TYPE, "application/json")
            .body(mint_body("0xToken"))
            .unwrap(),
    )
    .await;

    assert_status(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_is_rejected_before_any_payment_work() {
    let chain = FakeChain::new(100, 0, i64::MAX);
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let res = send(
        &app.app,
        Request::post("/mint")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "tokenAddress": "", "recipients": [] }).to_string(),
            ))
            .unwrap(),
    )
    .await;

    assert_status(res.status(), StatusCode::BAD_REQUEST);
}
