use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use ferremas_api::{
    auth::{AuthConfig, AuthService, Claims},
    config::{AppConfig, CurrencyConfig, WebpayConfig},
    db,
    entities::{category, product},
    events::{self, EventSender},
    gateway::{PaymentGateway, SimulatedGateway},
    handlers::AppServices,
    services::catalog::NewProduct,
    AppState,
};

/// Test harness wiring the full application router to an in-memory SQLite
/// database and the simulated payment gateway.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 18_080,
        database_url: "sqlite::memory:".to_string(),
        auto_migrate: true,
        jwt_secret: "test_secret_key_for_testing_purposes_only_32chars".to_string(),
        jwt_expiration: 3600,
        refresh_token_expiration: 86_400,
        environment: "test".to_string(),
        log_level: "warn".to_string(),
        log_json: false,
        cors_origins: "*".to_string(),
        request_timeout_seconds: 5,
        currency: CurrencyConfig::default(),
        webpay: WebpayConfig::default(),
    }
}

impl TestApp {
    /// Builds an application whose gateway authorizes every payment.
    pub async fn new() -> Self {
        Self::with_gateway(Arc::new(SimulatedGateway::new())).await
    }

    /// Builds an application with an explicit payment gateway, used to
    /// exercise the rejected path.
    pub async fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        let config = test_config();

        let pool = db::establish_connection_from_app_config(&config)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));

        let services = AppServices::with_gateway(db.clone(), event_sender.clone(), &config, gateway)
            .expect("failed to build test services");

        let state = AppState {
            db,
            config: config.clone(),
            event_sender,
            auth_service,
            services,
        };

        let admin_token = mint_admin_token(&config.jwt_secret);
        let router = ferremas_api::app_router(state.clone());

        Self {
            router,
            state,
            admin_token,
            _event_task: event_task,
        }
    }

    /// Bearer token for a synthetic admin account.
    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Sends a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {tok}"));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for admin-authenticated requests.
    pub async fn request_as_admin(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.admin_token.clone();
        self.request(method, uri, body, Some(&token)).await
    }

    /// Inserts a product directly through the catalog service.
    pub async fn seed_product(&self, code: &str, price: Decimal, stock: i32) -> product::Model {
        self.state
            .services
            .catalog
            .create_product(NewProduct {
                code: code.to_string(),
                name: format!("Test Product {code}"),
                brand: "Bosch".to_string(),
                model: format!("M-{code}"),
                description: Some("Seeded for integration tests".to_string()),
                price,
                stock,
                category_id: None,
                image_url: None,
            })
            .await
            .expect("seed product for tests")
    }

    /// Inserts a category directly through the catalog service.
    #[allow(dead_code)]
    pub async fn seed_category(&self, name: &str) -> category::Model {
        self.state
            .services
            .catalog
            .create_category(name)
            .await
            .expect("seed category for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Encodes an access token with the admin role without touching the
/// database, the way the auth service would for an admin account.
fn mint_admin_token(jwt_secret: &str) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        email: Some("admin@ferremas.cl".to_string()),
        roles: vec!["admin".to_string()],
        permissions: vec![
            "catalog:manage".to_string(),
            "contact:manage".to_string(),
            "customers:manage".to_string(),
        ],
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(1)).timestamp(),
        nbf: now.timestamp(),
        iss: "ferremas-auth".to_string(),
        aud: "ferremas-api".to_string(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("encode admin token")
}

/// Reads a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response body")
}
