//! End-to-end tests for the two-phase payment checkout.

mod common;

use std::sync::Arc;

use axum::http::Method;
use common::{response_json, TestApp};
use ferremas_api::gateway::SimulatedGateway;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal serialized as string")
        .parse()
        .expect("parse decimal")
}

/// Creates a cart holding `quantity` units of a freshly seeded product and
/// returns `(cart_id, product_id)`.
async fn cart_with_product(
    app: &TestApp,
    code: &str,
    price: Decimal,
    stock: i32,
    quantity: i32,
) -> (String, String) {
    let product = app.seed_product(code, price, stock).await;

    let response = app.request(Method::POST, "/api/v1/carts", None, None).await;
    let cart = response_json(response).await;
    let cart_id = cart["id"].as_str().expect("cart id").to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/carts/{cart_id}/items"),
            Some(json!({ "product_id": product.id, "quantity": quantity })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    (cart_id, product.id.to_string())
}

async fn start_checkout(app: &TestApp, cart_id: &str) -> Value {
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/start",
            Some(json!({ "cart_id": cart_id })),
            None,
        )
        .await;
    assert_eq!(response.status(), 201);
    response_json(response).await
}

#[tokio::test]
async fn start_returns_token_and_server_side_amount() {
    let app = TestApp::new().await;
    let (cart_id, _) = cart_with_product(&app, "TAL-001", dec!(79990), 12, 2).await;

    let start = start_checkout(&app, &cart_id).await;

    let buy_order = start["buy_order"].as_str().expect("buy order");
    assert!(buy_order.starts_with("ORD-"));
    assert_eq!(buy_order.len(), 26);
    assert_eq!(decimal(&start["amount"]), dec!(159980));

    let token = start["token"].as_str().expect("token");
    assert!(start["url"].as_str().expect("url").contains(token));

    // The cart is locked while the payment is pending.
    let response = app
        .request(Method::GET, &format!("/api/v1/carts/{cart_id}"), None, None)
        .await;
    let cart = response_json(response).await;
    assert_eq!(cart["status"], "converting");
}

#[tokio::test]
async fn locked_cart_rejects_mutations() {
    let app = TestApp::new().await;
    let (cart_id, product_id) = cart_with_product(&app, "TAL-001", dec!(79990), 12, 1).await;
    start_checkout(&app, &cart_id).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/carts/{cart_id}/items"),
            Some(json!({ "product_id": product_id, "quantity": 1 })),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);

    // A locked cart cannot start a second payment either.
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/start",
            Some(json!({ "cart_id": cart_id })),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn empty_cart_cannot_start_checkout() {
    let app = TestApp::new().await;
    let response = app.request(Method::POST, "/api/v1/carts", None, None).await;
    let cart = response_json(response).await;
    let cart_id = cart["id"].as_str().expect("cart id");

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/start",
            Some(json!({ "cart_id": cart_id })),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn authorized_payment_converts_cart_and_decrements_stock() {
    let app = TestApp::new().await;
    let (cart_id, product_id) = cart_with_product(&app, "TAL-001", dec!(79990), 12, 2).await;
    let start = start_checkout(&app, &cart_id).await;
    let token = start["token"].as_str().expect("token");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/checkout/confirm?token_ws={token}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let outcome = response_json(response).await;
    assert_eq!(outcome["status"], "authorized");
    assert_eq!(outcome["response_code"], 0);
    assert!(outcome["authorization_code"].as_str().is_some());
    assert_eq!(outcome["buy_order"], start["buy_order"]);

    let response = app
        .request(Method::GET, &format!("/api/v1/carts/{cart_id}"), None, None)
        .await;
    let cart = response_json(response).await;
    assert_eq!(cart["status"], "converted");
    assert!(cart["lines"].as_array().expect("lines").is_empty());

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{product_id}"),
            None,
            None,
        )
        .await;
    let product = response_json(response).await;
    assert_eq!(product["stock"], 10);
}

#[tokio::test]
async fn repeated_confirm_returns_the_stored_outcome() {
    let app = TestApp::new().await;
    let (cart_id, product_id) = cart_with_product(&app, "TAL-001", dec!(79990), 12, 2).await;
    let start = start_checkout(&app, &cart_id).await;
    let token = start["token"].as_str().expect("token").to_string();

    let uri = format!("/api/v1/checkout/confirm?token_ws={token}");
    let first = response_json(app.request(Method::GET, &uri, None, None).await).await;

    let response = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), 200);
    let second = response_json(response).await;

    assert_eq!(first, second);

    // Stock is only decremented once.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{product_id}"),
            None,
            None,
        )
        .await;
    let product = response_json(response).await;
    assert_eq!(product["stock"], 10);
}

#[tokio::test]
async fn rejected_payment_unlocks_the_cart() {
    let app = TestApp::with_gateway(Arc::new(SimulatedGateway::declining_over(dec!(10000)))).await;
    let (cart_id, product_id) = cart_with_product(&app, "TAL-001", dec!(79990), 12, 1).await;
    let start = start_checkout(&app, &cart_id).await;
    let token = start["token"].as_str().expect("token");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/checkout/confirm?token_ws={token}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let outcome = response_json(response).await;
    assert_eq!(outcome["status"], "rejected");
    assert!(outcome["authorization_code"].is_null());

    let response = app
        .request(Method::GET, &format!("/api/v1/carts/{cart_id}"), None, None)
        .await;
    let cart = response_json(response).await;
    assert_eq!(cart["status"], "active");
    assert_eq!(cart["lines"].as_array().expect("lines").len(), 1);

    // No stock was taken.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{product_id}"),
            None,
            None,
        )
        .await;
    let product = response_json(response).await;
    assert_eq!(product["stock"], 12);
}

#[tokio::test]
async fn customer_abort_restores_the_cart() {
    let app = TestApp::new().await;
    let (cart_id, _) = cart_with_product(&app, "TAL-001", dec!(79990), 12, 1).await;
    let start = start_checkout(&app, &cart_id).await;
    let token = start["token"].as_str().expect("token");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/checkout/confirm?TBK_TOKEN={token}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let outcome = response_json(response).await;
    assert_eq!(outcome["status"], "aborted");

    let response = app
        .request(Method::GET, &format!("/api/v1/carts/{cart_id}"), None, None)
        .await;
    let cart = response_json(response).await;
    assert_eq!(cart["status"], "active");

    // An unlocked cart can start a fresh payment.
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/start",
            Some(json!({ "cart_id": cart_id })),
            None,
        )
        .await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn confirm_without_tokens_is_a_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/checkout/confirm", None, None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn confirm_with_unknown_token_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/checkout/confirm?token_ws=sim-does-not-exist",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn transaction_is_queryable_after_confirm() {
    let app = TestApp::new().await;
    let (cart_id, _) = cart_with_product(&app, "TAL-001", dec!(79990), 12, 1).await;
    let start = start_checkout(&app, &cart_id).await;
    let token = start["token"].as_str().expect("token");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/checkout/confirm?token_ws={token}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let tx = app
        .state
        .services
        .checkout
        .find_by_token(token)
        .await
        .expect("transaction lookup");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/checkout/transactions/{}", tx.id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["status"], "authorized");
    assert_eq!(body["buy_order"], start["buy_order"]);
}
