use axum::{
    extract::{Json, Query, State},
    routing::{get, put},
    Extension, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{perm, AuthRouterExt, AuthUser};
use crate::entities::customer;
use crate::errors::ApiError;
use crate::handlers::common::{
    map_service_error, success_response, validate_input, PaginatedResponse, PaginationParams,
};
use crate::services::customers::CustomerPatch;
use crate::AppState;

const MAX_PAGE_SIZE: u64 = 100;

/// Creates the router for customer profile endpoints
pub fn customers_routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/customers", get(list_customers))
        .with_permission(perm::CUSTOMERS_MANAGE);

    let own = Router::new()
        .route("/customers/me", get(get_own_profile))
        .route("/customers/me", put(update_own_profile))
        .with_auth();

    admin.merge(own)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<customer::Model> for CustomerResponse {
    fn from(c: customer::Model) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            first_name: c.first_name,
            last_name: c.last_name,
            phone: c.phone,
            address: c.address,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
}

/// List customer profiles (admin)
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(PaginationParams),
    responses((status = 200, description = "Paginated customer list")),
    security(("Bearer" = [])),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (page, per_page) = pagination.capped(MAX_PAGE_SIZE);
    let (items, total) = state
        .services
        .customers
        .list(page, per_page)
        .await
        .map_err(map_service_error)?;

    let data: Vec<CustomerResponse> = items.into_iter().map(Into::into).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Get the authenticated user's customer profile
#[utoipa::path(
    get,
    path = "/api/v1/customers/me",
    responses(
        (status = 200, description = "Customer profile", body = CustomerResponse),
        (status = 404, description = "No profile for this account", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Customers"
)]
pub async fn get_own_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user_id = user.user_uuid()?;
    let profile = state
        .services
        .customers
        .get_by_user(user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(CustomerResponse::from(profile)))
}

/// Update the authenticated user's customer profile
#[utoipa::path(
    put,
    path = "/api/v1/customers/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = CustomerResponse),
        (status = 404, description = "No profile for this account", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Customers"
)]
pub async fn update_own_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let user_id = user.user_uuid()?;

    let patch = CustomerPatch {
        first_name: payload.first_name.map(|v| v.trim().to_string()),
        last_name: payload.last_name.map(|v| v.trim().to_string()),
        phone: payload.phone.map(|v| {
            let v = v.trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        }),
        address: payload.address.map(|v| {
            let v = v.trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        }),
    };

    let updated = state
        .services
        .customers
        .update_by_user(user_id, patch)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(CustomerResponse::from(updated)))
}
