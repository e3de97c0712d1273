/*!
 * # Authentication and Authorization Module
 *
 * JWT authentication with refresh token rotation, plus role and
 * permission checks enforced through router middleware.
 *
 * Access tokens are short-lived HS256 JWTs carrying the user's role and
 * derived permissions. Refresh tokens are longer-lived JWTs whose `jti`
 * is persisted in the `refresh_tokens` table; a refresh rotates the
 * stored token so each refresh token is usable once.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::{customer, refresh_token, user};
use crate::entities::user::UserRole;
use crate::errors::ErrorResponse;

/// Permission names used by protected routes.
pub mod perm {
    pub const CATALOG_MANAGE: &str = "catalog:manage";
    pub const CONTACT_MANAGE: &str = "contact:manage";
    pub const CUSTOMERS_MANAGE: &str = "customers:manage";
}

/// Permissions granted by a role.
/// Admins bypass permission checks entirely, so only non-admin roles matter.
pub fn role_permissions(role: UserRole) -> Vec<String> {
    match role {
        UserRole::Admin => vec![
            perm::CATALOG_MANAGE.to_string(),
            perm::CONTACT_MANAGE.to_string(),
            perm::CUSTOMERS_MANAGE.to_string(),
        ],
        UserRole::Customer => vec![],
    }
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }

    pub fn user_uuid(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.user_id).map_err(|_| AuthError::InvalidToken)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
}

impl AuthConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            jwt_audience: "ferremas-api".to_string(),
            jwt_issuer: "ferremas-auth".to_string(),
            access_token_expiration: Duration::from_secs(config.jwt_expiration),
            refresh_token_expiration: Duration::from_secs(config.refresh_token_expiration),
        }
    }
}

/// Token pair returned by login, register and refresh.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token revoked")]
    RevokedToken,
    #[error("Invalid credentials")]
    WrongCredentials,
    #[error("Account is disabled")]
    InactiveAccount,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Token creation failed: {0}")]
    TokenCreation(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAuth
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::RevokedToken
            | Self::WrongCredentials
            | Self::InactiveAccount => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions => StatusCode::FORBIDDEN,
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::TokenCreation(_) | Self::DatabaseError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn response_message(&self) -> String {
        match self {
            Self::TokenCreation(_) | Self::DatabaseError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<AuthError> for crate::errors::ApiError {
    fn from(err: AuthError) -> Self {
        use crate::errors::ServiceError;
        let service = match &err {
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::EmailTaken => ServiceError::Conflict(err.to_string()),
            AuthError::TokenCreation(_)
            | AuthError::DatabaseError(_)
            | AuthError::InternalError(_) => ServiceError::InternalError(err.to_string()),
            _ => ServiceError::Unauthorized(err.to_string()),
        };
        crate::errors::ApiError::ServiceError(service)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

/// Registration input consumed by [`AuthService::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Authentication service that handles accounts and token issuance
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    db: Arc<DatabaseConnection>,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            db,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a user account together with its customer profile.
    /// Both rows commit in one transaction; a duplicate email fails the whole
    /// registration.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<(user::Model, customer::Model), AuthError> {
        let email = registration.email.trim().to_lowercase();

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(&registration.password)?;
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let new_user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(UserRole::Customer),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved_user = new_user.insert(&txn).await?;

        let new_customer = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(saved_user.id),
            first_name: Set(registration.first_name),
            last_name: Set(registration.last_name),
            phone: Set(registration.phone),
            address: Set(registration.address),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved_customer = new_customer.insert(&txn).await?;

        txn.commit().await?;

        debug!(user_id = %saved_user.id, "User registered");
        Ok((saved_user, saved_customer))
    }

    /// Verifies credentials and returns the account.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, AuthError> {
        let email = email.trim().to_lowercase();
        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::WrongCredentials)?;

        if !self.verify_password(password, &account.password_hash)? {
            return Err(AuthError::WrongCredentials);
        }
        if !account.is_active {
            return Err(AuthError::InactiveAccount);
        }

        Ok(account)
    }

    /// Generates an access/refresh token pair for a user.
    pub async fn generate_token(&self, account: &user::Model) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let refresh_exp = now
            + ChronoDuration::from_std(self.config.refresh_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let access_jti = Uuid::new_v4().to_string();
        let refresh_jti = Uuid::new_v4().to_string();

        let roles = vec![account.role.as_str().to_string()];
        let permissions = role_permissions(account.role);

        let access_claims = Claims {
            sub: account.id.to_string(),
            email: Some(account.email.clone()),
            roles: roles.clone(),
            permissions,
            jti: access_jti,
            iat: now.timestamp(),
            exp: access_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        // Refresh tokens carry no role data; roles are re-read on refresh.
        let refresh_claims = Claims {
            sub: account.id.to_string(),
            email: None,
            roles: vec![],
            permissions: vec![],
            jti: refresh_jti.clone(),
            iat: now.timestamp(),
            exp: refresh_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let encoding_key = EncodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let access_token = encode(&Header::new(Algorithm::HS256), &access_claims, &encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;
        let refresh_token = encode(&Header::new(Algorithm::HS256), &refresh_claims, &encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        self.store_refresh_token(account.id, &refresh_jti, refresh_exp)
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
        })
    }

    /// Validates a JWT and extracts its claims.
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Exchanges a refresh token for a fresh pair, rotating the stored token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(refresh_token).await?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let stored = refresh_token::Entity::find()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::Token.eq(claims.jti.clone()))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if stored.revoked || stored.expires_at < Utc::now() {
            return Err(AuthError::InvalidToken);
        }

        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !account.is_active {
            return Err(AuthError::InactiveAccount);
        }

        let new_pair = self.generate_token(&account).await?;

        let mut consumed: refresh_token::ActiveModel = stored.into();
        consumed.revoked = Set(true);
        consumed.update(&*self.db).await?;

        Ok(new_pair)
    }

    /// Revokes an access token by blacklisting its `jti` until expiry.
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;
        let expiry = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);

        let mut blacklist = self.blacklisted_tokens.write().await;
        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
        blacklist.push(BlacklistedToken {
            jti: claims.jti,
            expiry,
        });
        Ok(())
    }

    async fn is_token_blacklisted(&self, jti: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == jti && t.expiry > Utc::now())
    }

    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let row = refresh_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token: Set(jti.to_string()),
            expires_at: Set(expires_at),
            revoked: Set(false),
            created_at: Set(Utc::now()),
        };
        row.insert(&*self.db).await?;
        Ok(())
    }

    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::InternalError(format!("Password hash: {e}")))
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::InternalError(format!("Stored hash invalid: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AuthError::MissingAuth)?;

    // Admins have every permission
    if user.is_admin() {
        return Ok(next.run(request).await);
    }

    if !user.has_permission(&required_permission) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role(&required_role) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();

    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match extract_auth_from_headers(&headers, &auth_service).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract authentication info from request headers
async fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_value) = auth_header.to_str() {
            if let Some(token) = auth_value.strip_prefix("Bearer ") {
                let claims = auth_service.validate_token(token.trim()).await?;
                return Ok(AuthUser {
                    user_id: claims.sub,
                    email: claims.email,
                    roles: claims.roles,
                    permissions: claims.permissions,
                    token_id: claims.jti,
                });
            }
        }
    }

    Err(AuthError::MissingAuth)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}
