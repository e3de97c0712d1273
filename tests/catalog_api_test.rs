//! Integration tests for the product catalog endpoints.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

fn decimal(value: &serde_json::Value) -> Decimal {
    value
        .as_str()
        .expect("decimal serialized as string")
        .parse()
        .expect("parse decimal")
}

#[tokio::test]
async fn create_product_requires_authentication() {
    let app = TestApp::new().await;

    let payload = json!({
        "code": "TAL-001",
        "name": "Taladro Percutor",
        "brand": "Bosch",
        "model": "GSB 13 RE",
        "price": "79990",
        "stock": 12
    });

    let response = app
        .request(Method::POST, "/api/v1/products", Some(payload), None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn admin_creates_and_fetches_product() {
    let app = TestApp::new().await;

    let payload = json!({
        "code": "tal-001",
        "name": "Taladro Percutor",
        "brand": "Bosch",
        "model": "GSB 13 RE",
        "description": "Taladro percutor 650W",
        "price": "79990",
        "stock": 12
    });

    let response = app
        .request_as_admin(Method::POST, "/api/v1/products", Some(payload))
        .await;
    assert_eq!(response.status(), 201);

    let body = response_json(response).await;
    // Codes are normalized to upper case on the way in.
    assert_eq!(body["code"], "TAL-001");
    assert_eq!(body["available"], true);
    assert_eq!(decimal(&body["price"]), dec!(79990));

    let id = body["id"].as_str().expect("product id").to_string();

    let response = app
        .request(Method::GET, &format!("/api/v1/products/{id}"), None, None)
        .await;
    assert_eq!(response.status(), 200);
    let fetched = response_json(response).await;
    assert_eq!(fetched["name"], "Taladro Percutor");

    let response = app
        .request(Method::GET, "/api/v1/products/code/TAL-001", None, None)
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn duplicate_product_code_is_a_conflict() {
    let app = TestApp::new().await;
    app.seed_product("MAR-100", dec!(9990), 5).await;

    let payload = json!({
        "code": "MAR-100",
        "name": "Martillo Carpintero",
        "brand": "Stanley",
        "model": "51-271",
        "price": "9990",
        "stock": 5
    });

    let response = app
        .request_as_admin(Method::POST, "/api/v1/products", Some(payload))
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn malformed_product_code_is_rejected() {
    let app = TestApp::new().await;

    for code in ["X", "TAL_001", "-TAL", "TAL-", "TAL--001"] {
        let payload = json!({
            "code": code,
            "name": "Producto",
            "brand": "Marca",
            "model": "Modelo",
            "price": "1000",
            "stock": 1
        });

        let response = app
            .request_as_admin(Method::POST, "/api/v1/products", Some(payload))
            .await;
        assert_eq!(response.status(), 400, "code {code:?} should be rejected");
    }
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let app = TestApp::new().await;

    let payload = json!({
        "code": "SIE-001",
        "name": "Sierra Circular",
        "brand": "Makita",
        "model": "5007MG",
        "price": "-1",
        "stock": 3
    });

    let response = app
        .request_as_admin(Method::POST, "/api/v1/products", Some(payload))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn list_products_filters_by_search_and_stock() {
    let app = TestApp::new().await;
    app.seed_product("TAL-001", dec!(79990), 12).await;
    app.seed_product("TAL-002", dec!(45990), 0).await;
    app.seed_product("MAR-100", dec!(9990), 30).await;

    let response = app
        .request(Method::GET, "/api/v1/products", None, None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["pagination"]["total"], 3);

    let response = app
        .request(Method::GET, "/api/v1/products?search=TAL", None, None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["pagination"]["total"], 2);

    let response = app
        .request(Method::GET, "/api/v1/products?in_stock=true", None, None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["pagination"]["total"], 2);
    for item in body["data"].as_array().expect("product list") {
        assert_eq!(item["available"], true);
    }
}

#[tokio::test]
async fn list_products_filters_by_category_slug() {
    let app = TestApp::new().await;
    let category = app.seed_category("Herramientas Eléctricas").await;

    let payload = json!({
        "code": "TAL-001",
        "name": "Taladro Percutor",
        "brand": "Bosch",
        "model": "GSB 13 RE",
        "price": "79990",
        "stock": 12,
        "category_id": category.id
    });
    let response = app
        .request_as_admin(Method::POST, "/api/v1/products", Some(payload))
        .await;
    assert_eq!(response.status(), 201);

    app.seed_product("MAR-100", dec!(9990), 30).await;

    let uri = format!("/api/v1/products?category={}", category.slug);
    let response = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["code"], "TAL-001");

    let response = app
        .request(Method::GET, "/api/v1/products?category=no-existe", None, None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn update_and_delete_product() {
    let app = TestApp::new().await;
    let product = app.seed_product("TAL-001", dec!(79990), 12).await;

    let response = app
        .request_as_admin(
            Method::PUT,
            &format!("/api/v1/products/{}", product.id),
            Some(json!({ "price": "74990", "stock": 8 })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(decimal(&body["price"]), dec!(74990));
    assert_eq!(body["stock"], 8);

    let response = app
        .request_as_admin(
            Method::DELETE,
            &format!("/api/v1/products/{}", product.id),
            None,
        )
        .await;
    assert_eq!(response.status(), 204);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}", product.id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn unknown_product_returns_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/products/00000000-0000-0000-0000-000000000000",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(Method::GET, "/api/v1/products/code/NADA-1", None, None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn categories_are_public_to_read_and_admin_to_write() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/categories",
            Some(json!({ "name": "Herramientas Manuales" })),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/categories",
            Some(json!({ "name": "Herramientas Manuales" })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["slug"], "herramientas-manuales");

    // Same name again collides on the slug.
    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/categories",
            Some(json!({ "name": "Herramientas Manuales" })),
        )
        .await;
    assert_eq!(response.status(), 409);

    let response = app
        .request(Method::GET, "/api/v1/categories", None, None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body.as_array().expect("category list").len(), 1);
}
