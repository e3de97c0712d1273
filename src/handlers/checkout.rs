use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::AppState;

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/start", post(start_checkout))
        .route("/checkout/confirm", get(confirm_checkout))
        .route("/checkout/transactions/:id", get(get_transaction))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartCheckoutRequest {
    pub cart_id: Uuid,
}

/// Return parameters from the payment form.
/// `token_ws` arrives on a normal return, `TBK_TOKEN` when the customer
/// aborted at the gateway.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ConfirmQuery {
    pub token_ws: Option<String>,
    #[serde(rename = "TBK_TOKEN")]
    pub tbk_token: Option<String>,
}

/// Start a payment for a cart
#[utoipa::path(
    post,
    path = "/api/v1/checkout/start",
    request_body = StartCheckoutRequest,
    responses(
        (status = 201, description = "Payment created", body = crate::services::checkout::CheckoutStart),
        (status = 400, description = "Empty or locked cart", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn start_checkout(
    State(state): State<AppState>,
    Json(payload): Json<StartCheckoutRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let start = state
        .services
        .checkout
        .start(payload.cart_id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(start))
}

/// Confirm a payment after the gateway redirect
#[utoipa::path(
    get,
    path = "/api/v1/checkout/confirm",
    params(ConfirmQuery),
    responses(
        (status = 200, description = "Payment outcome", body = crate::services::checkout::CheckoutOutcome),
        (status = 400, description = "Missing token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown token", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn confirm_checkout(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let outcome = state
        .services
        .checkout
        .confirm(query.token_ws, query.tbk_token)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(outcome))
}

/// Fetch a payment transaction by id
#[utoipa::path(
    get,
    path = "/api/v1/checkout/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let tx = state
        .services
        .checkout
        .get_transaction(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(tx))
}
