//! Integration tests for the CLP to USD conversion endpoint.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn decimal(value: &serde_json::Value) -> Decimal {
    value
        .as_str()
        .expect("decimal serialized as string")
        .parse()
        .expect("parse decimal")
}

#[tokio::test]
async fn conversion_uses_the_fallback_rate_when_unconfigured() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/currency/clp-to-usd?amount=9500",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(body["source"], "fallback");
    assert_eq!(decimal(&body["rate"]), dec!(950));
    assert_eq!(decimal(&body["amount_clp"]), dec!(9500));
    assert_eq!(decimal(&body["amount_usd"]), dec!(10));
}

#[tokio::test]
async fn conversion_rounds_to_cents() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/currency/clp-to-usd?amount=10000",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(decimal(&body["amount_usd"]), dec!(10.53));
}

#[tokio::test]
async fn zero_converts_to_zero() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/currency/clp-to-usd?amount=0",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(decimal(&body["amount_usd"]), Decimal::ZERO);
}

#[tokio::test]
async fn negative_amounts_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/currency/clp-to-usd?amount=-100",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
}
