use axum::{
    extract::{Json, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthError, AuthRouterExt, AuthUser, Registration, TokenPair};
use crate::errors::ApiError;
use crate::events::Event;
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::AppState;

/// Creates the router for authentication endpoints
pub fn auth_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .with_auth();

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .merge(protected)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub email: String,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

/// Register a new customer account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let (account, profile) = state
        .auth_service
        .register(Registration {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            phone: payload.phone.filter(|p| !p.trim().is_empty()),
            address: payload.address.filter(|a| !a.trim().is_empty()),
        })
        .await?;

    let tokens = state.auth_service.generate_token(&account).await?;

    state
        .event_sender
        .send_or_log(Event::UserRegistered {
            user_id: account.id,
        })
        .await;
    state
        .event_sender
        .send_or_log(Event::CustomerCreated {
            customer_id: profile.id,
            user_id: account.id,
        })
        .await;

    Ok(created_response(RegisterResponse {
        user_id: account.id,
        customer_id: profile.id,
        email: account.email,
        tokens,
    }))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let account = state
        .auth_service
        .authenticate(&payload.email, &payload.password)
        .await?;
    let tokens = state.auth_service.generate_token(&account).await?;
    Ok(success_response(tokens))
}

/// Exchange a refresh token for a new pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Invalid refresh token", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let tokens = state
        .auth_service
        .refresh_token(&payload.refresh_token)
        .await?;
    Ok(success_response(tokens))
}

/// Revoke the current access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Logged out")),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingAuth)?;

    state.auth_service.revoke_token(token.trim()).await?;
    Ok(success_response(
        serde_json::json!({ "message": "Successfully logged out" }),
    ))
}

/// Identity of the current token
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses((status = 200, description = "Current user", body = MeResponse)),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn me(
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    Ok(success_response(MeResponse {
        user_id: user.user_id,
        email: user.email,
        roles: user.roles,
    }))
}
