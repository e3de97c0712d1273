use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::errors::ApiError;
use crate::handlers::common::{map_service_error, success_response};
use crate::AppState;

/// Creates the router for currency conversion endpoints
pub fn currency_routes() -> Router<AppState> {
    Router::new().route("/currency/clp-to-usd", get(clp_to_usd))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ConvertQuery {
    /// Amount in Chilean pesos
    pub amount: Decimal,
}

/// Convert a CLP amount to USD
#[utoipa::path(
    get,
    path = "/api/v1/currency/clp-to-usd",
    params(ConvertQuery),
    responses(
        (status = 200, description = "Converted amount", body = crate::services::currency::Conversion),
        (status = 400, description = "Negative amount", body = crate::errors::ErrorResponse)
    ),
    tag = "Currency"
)]
pub async fn clp_to_usd(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let conversion = state
        .services
        .currency
        .clp_to_usd(query.amount)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(conversion))
}
