//! Integration tests for contact message intake and management.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;

async fn submit_message(app: &TestApp, name: &str, subject: &str) -> serde_json::Value {
    let response = app
        .request(
            Method::POST,
            "/api/v1/contact",
            Some(json!({
                "name": name,
                "email": "cliente@example.com",
                "subject": subject,
                "message": "¿Tienen stock del taladro GSB 13 RE?"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 201);
    response_json(response).await
}

#[tokio::test]
async fn submission_is_public_and_acknowledged_by_name() {
    let app = TestApp::new().await;

    let ack = submit_message(&app, "Pedro Soto", "Consulta de stock").await;
    assert!(ack["id"].as_str().is_some());
    assert_eq!(ack["message"], "Gracias por contactarnos, Pedro Soto");
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/contact",
            Some(json!({
                "name": "Pedro Soto",
                "email": "not-an-email",
                "subject": "Consulta",
                "message": "Hola"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn listing_requires_the_contact_permission() {
    let app = TestApp::new().await;
    submit_message(&app, "Pedro Soto", "Consulta de stock").await;

    let response = app.request(Method::GET, "/api/v1/contact", None, None).await;
    assert_eq!(response.status(), 401);

    let response = app
        .request_as_admin(Method::GET, "/api/v1/contact", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["read"], false);
}

#[tokio::test]
async fn mark_read_filters_out_of_the_unread_listing() {
    let app = TestApp::new().await;
    let first = submit_message(&app, "Pedro Soto", "Consulta de stock").await;
    submit_message(&app, "Ana Díaz", "Cotización").await;

    let id = first["id"].as_str().expect("message id");
    let response = app
        .request_as_admin(Method::POST, &format!("/api/v1/contact/{id}/read"), None)
        .await;
    assert_eq!(response.status(), 200);

    // Marking twice is harmless.
    let response = app
        .request_as_admin(Method::POST, &format!("/api/v1/contact/{id}/read"), None)
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request_as_admin(Method::GET, "/api/v1/contact?unread=true", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["subject"], "Cotización");
}

#[tokio::test]
async fn marking_an_unknown_message_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/contact/00000000-0000-0000-0000-000000000000/read",
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}
