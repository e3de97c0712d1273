use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{perm, AuthRouterExt};
use crate::entities::contact_message;
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::services::contact::NewContactMessage;
use crate::AppState;

const MAX_PAGE_SIZE: u64 = 100;

/// Creates the router for contact form endpoints
pub fn contact_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/contact", get(list_messages))
        .route("/contact/:id/read", post(mark_message_read))
        .with_permission(perm::CONTACT_MANAGE);

    Router::new()
        .route("/contact", post(submit_message))
        .merge(protected)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactAck {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactMessageResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<contact_message::Model> for ContactMessageResponse {
    fn from(m: contact_message::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            subject: m.subject,
            message: m.body,
            read: m.read,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MessageListQuery {
    /// Only messages not yet marked as read
    #[serde(default)]
    pub unread: bool,
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: PaginationParams,
}

/// Submit a contact form message
#[utoipa::path(
    post,
    path = "/api/v1/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message received", body = ContactAck),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Contact"
)]
pub async fn submit_message(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let saved = state
        .services
        .contact
        .submit(NewContactMessage {
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_lowercase(),
            subject: payload.subject.trim().to_string(),
            body: payload.message,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ContactAck {
        id: saved.id,
        message: format!("Gracias por contactarnos, {}", saved.name),
    }))
}

/// List contact messages (admin)
#[utoipa::path(
    get,
    path = "/api/v1/contact",
    params(MessageListQuery),
    responses((status = 200, description = "Paginated message list")),
    security(("Bearer" = [])),
    tag = "Contact"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (page, per_page) = query.pagination.capped(MAX_PAGE_SIZE);
    let (items, total) = state
        .services
        .contact
        .list(query.unread, page, per_page)
        .await
        .map_err(map_service_error)?;

    let data: Vec<ContactMessageResponse> = items.into_iter().map(Into::into).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Mark a contact message as read (admin)
#[utoipa::path(
    post,
    path = "/api/v1/contact/{id}/read",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message marked read", body = ContactMessageResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Contact"
)]
pub async fn mark_message_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let updated = state
        .services
        .contact
        .mark_read(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ContactMessageResponse::from(updated)))
}
