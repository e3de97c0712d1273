use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input,
};
use crate::AppState;

/// Creates the router for cart endpoints. Carts are addressed by id and
/// require no authentication, matching an anonymous storefront session.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/carts", post(create_cart))
        .route("/carts/:id", get(get_cart))
        .route("/carts/:id/items", post(add_item))
        .route("/carts/:id/items/:product_id", put(update_item))
        .route("/carts/:id/items/:product_id", delete(remove_item))
        .route("/carts/:id/items", delete(clear_cart))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    /// Units to add; defaults to one.
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    /// New line quantity. Zero or less removes the line.
    pub quantity: i32,
}

/// Create an empty cart
#[utoipa::path(
    post,
    path = "/api/v1/carts",
    responses((status = 201, description = "Cart created", body = crate::services::cart::CartView)),
    tag = "Cart"
)]
pub async fn create_cart(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .create_cart(None)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(cart))
}

/// Get a cart with its lines and total
#[utoipa::path(
    get,
    path = "/api/v1/carts/{id}",
    params(("id" = Uuid, Path, description = "Cart id")),
    responses(
        (status = 200, description = "Cart contents", body = crate::services::cart::CartView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .cart
        .get_cart(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

/// Add a product to the cart
#[utoipa::path(
    post,
    path = "/api/v1/carts/{id}/items",
    params(("id" = Uuid, Path, description = "Cart id")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = crate::services::cart::CartView),
        (status = 404, description = "Cart or product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Product out of stock", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .cart
        .add_item(id, payload.product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

/// Set the quantity of a cart line
#[utoipa::path(
    put,
    path = "/api/v1/carts/{id}/items/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Cart id"),
        ("product_id" = Uuid, Path, description = "Product id")
    ),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = crate::services::cart::CartView),
        (status = 404, description = "Cart or line not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .cart
        .update_item_quantity(id, product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

/// Remove a line from the cart
#[utoipa::path(
    delete,
    path = "/api/v1/carts/{id}/items/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Cart id"),
        ("product_id" = Uuid, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Updated cart", body = crate::services::cart::CartView),
        (status = 404, description = "Cart or line not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .cart
        .remove_item(id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

/// Remove every line from the cart
#[utoipa::path(
    delete,
    path = "/api/v1/carts/{id}/items",
    params(("id" = Uuid, Path, description = "Cart id")),
    responses(
        (status = 200, description = "Emptied cart", body = crate::services::cart::CartView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let view = state
        .services
        .cart
        .clear_cart(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}
