//! Integration tests for registration, login, token lifecycle and
//! customer profiles.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::{json, Value};

fn register_payload(email: &str) -> Value {
    json!({
        "email": email,
        "password": "correcthorse1",
        "first_name": "Valentina",
        "last_name": "Rojas",
        "phone": "+56911112222"
    })
}

async fn register(app: &TestApp, email: &str) -> Value {
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(register_payload(email)),
            None,
        )
        .await;
    assert_eq!(response.status(), 201);
    response_json(response).await
}

#[tokio::test]
async fn register_returns_profile_and_tokens() {
    let app = TestApp::new().await;

    let body = register(&app, "valentina@example.com").await;
    assert_eq!(body["email"], "valentina@example.com");
    assert!(body["user_id"].as_str().is_some());
    assert!(body["customer_id"].as_str().is_some());
    assert_eq!(body["tokens"]["token_type"], "Bearer");
    assert!(body["tokens"]["access_token"].as_str().is_some());
    assert!(body["tokens"]["refresh_token"].as_str().is_some());
}

#[tokio::test]
async fn register_normalizes_email_case_and_rejects_duplicates() {
    let app = TestApp::new().await;
    register(&app, "valentina@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(register_payload("VALENTINA@example.com")),
            None,
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = TestApp::new().await;

    let mut payload = register_payload("valentina@example.com");
    payload["password"] = json!("short");

    let response = app
        .request(Method::POST, "/api/v1/auth/register", Some(payload), None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn login_succeeds_with_correct_credentials() {
    let app = TestApp::new().await;
    register(&app, "valentina@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "valentina@example.com",
                "password": "correcthorse1"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert!(body["access_token"].as_str().is_some());
}

#[tokio::test]
async fn login_fails_with_wrong_password() {
    let app = TestApp::new().await;
    register(&app, "valentina@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "valentina@example.com",
                "password": "not-the-password"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn me_reflects_the_token_identity() {
    let app = TestApp::new().await;
    let registered = register(&app, "valentina@example.com").await;
    let token = registered["tokens"]["access_token"]
        .as_str()
        .expect("access token");

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["email"], "valentina@example.com");
    assert_eq!(body["roles"][0], "customer");

    let response = app.request(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn refresh_rotates_the_refresh_token() {
    let app = TestApp::new().await;
    let registered = register(&app, "valentina@example.com").await;
    let refresh = registered["tokens"]["refresh_token"]
        .as_str()
        .expect("refresh token")
        .to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert!(body["access_token"].as_str().is_some());

    // The consumed token cannot be replayed.
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let app = TestApp::new().await;
    let registered = register(&app, "valentina@example.com").await;
    let token = registered["tokens"]["access_token"]
        .as_str()
        .expect("access token");

    let response = app
        .request(Method::POST, "/api/v1/auth/logout", None, Some(token))
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(token))
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn customer_can_read_and_update_own_profile() {
    let app = TestApp::new().await;
    let registered = register(&app, "valentina@example.com").await;
    let token = registered["tokens"]["access_token"]
        .as_str()
        .expect("access token");

    let response = app
        .request(Method::GET, "/api/v1/customers/me", None, Some(token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["first_name"], "Valentina");
    assert_eq!(body["phone"], "+56911112222");

    let response = app
        .request(
            Method::PUT,
            "/api/v1/customers/me",
            Some(json!({ "address": "Av. Siempre Viva 742", "phone": "" })),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["address"], "Av. Siempre Viva 742");
    // Blank strings clear the field.
    assert!(body["phone"].is_null());
}

#[tokio::test]
async fn customer_listing_is_admin_only() {
    let app = TestApp::new().await;
    let registered = register(&app, "valentina@example.com").await;
    let customer_token = registered["tokens"]["access_token"]
        .as_str()
        .expect("access token");

    let response = app
        .request(Method::GET, "/api/v1/customers", None, None)
        .await;
    assert_eq!(response.status(), 401);

    let response = app
        .request(Method::GET, "/api/v1/customers", None, Some(customer_token))
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .request_as_admin(Method::GET, "/api/v1/customers", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);
}
