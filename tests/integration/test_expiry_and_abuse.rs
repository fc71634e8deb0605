use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
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
async fn expired_deployment_deadline_returns_410() {
    let chain = FakeChain::new(100, 0, 0); // deadline already in the past
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let res = send(
        &app.app,
        Request::post("/mint")
            .header(header::CONTENT_TYPE, "application/json")
            .body(mint_body("0xExpired"))
            .unwrap(),
    )
    .await;

    assert_status(res.status(), StatusCode::GONE);
}

#[tokio::test]
async fn repeated_requests_against_an_expired_token_eventually_get_the_minimal_body() {
    let chain = FakeChain::new(100, 0, 0);
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let mut last_body: Value = json!({});
    for _ in 0..(app.config.abuse_max_requests + 2) {
        let res = send(
            &app.app,
            Request::post("/mint")
                .header(header::CONTENT_TYPE, "application/json")
                .body(mint_body("0xExpired"))
                .unwrap(),
        )
        .await;
        assert_status(res.status(), StatusCode::GONE);
        last_body = read_json(res).await;
    }

    // once the expired-IP abuse counter trips, the body drops the `expired`
    // hint and carries only the generic message.
    assert!(last_body.get("expired").is_none());
}

#[tokio::test]
async fn internal_endpoint_rejects_a_non_whitelisted_caller() {
    let chain = FakeChain::new(100, 0, i64::MAX);
    let app = spawn_app(chain, FakeFacilitator::new()).await;

    let res = send(
        &app.app,
        Request::post(format!("/internal/mint/{}", app.config.internal_mint_secret))
            .header(header::CONTENT_TYPE, "application/json")
            .body(mint_body("0xToken"))
            .unwrap(),
    )
    .await;

    assert_status(res.status(), StatusCode::FORBIDDEN);
}
