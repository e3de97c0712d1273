use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use validator::{Validate, ValidationError};

/// Application configuration loaded from files and environment variables.
///
/// Sources are layered in order of precedence:
/// 1. `config/default.toml`
/// 2. `config/{environment}.toml` (based on `APP_ENV`)
/// 3. Environment variables prefixed with `APP__` (e.g. `APP__PORT`)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,

    #[validate(length(min = 32, message = "jwt_secret must be at least 32 characters"))]
    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiration")]
    #[validate(range(min = 60, message = "jwt_expiration must be at least 60 seconds"))]
    pub jwt_expiration: u64,

    #[serde(default = "default_refresh_token_expiration")]
    pub refresh_token_expiration: u64,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins, or "*" for any.
    #[serde(default = "default_cors_origins")]
    #[validate(custom = "validate_cors_origins")]
    pub cors_origins: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    #[validate]
    #[serde(default)]
    pub currency: CurrencyConfig,

    #[validate]
    #[serde(default)]
    pub webpay: WebpayConfig,
}

/// Settings for the CLP to USD conversion endpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CurrencyConfig {
    /// Remote exchange-rate endpoint. Leave empty to always use the fallback rate.
    #[serde(default)]
    pub exchange_api_url: String,

    /// CLP per USD used when the remote endpoint is unreachable.
    #[serde(default = "default_fallback_rate")]
    pub fallback_clp_per_usd: Decimal,

    #[serde(default = "default_currency_timeout")]
    pub timeout_seconds: u64,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            exchange_api_url: String::new(),
            fallback_clp_per_usd: default_fallback_rate(),
            timeout_seconds: default_currency_timeout(),
        }
    }
}

/// Settings for the Webpay payment gateway.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WebpayConfig {
    /// When true, payments run against the in-process simulated gateway
    /// instead of the remote Webpay REST API.
    #[serde(default = "default_simulate")]
    pub simulate: bool,

    #[serde(default = "default_webpay_base_url")]
    pub base_url: String,

    #[serde(default = "default_commerce_code")]
    pub commerce_code: String,

    #[serde(default = "default_webpay_api_key")]
    pub api_key: String,

    /// URL the payment form redirects back to after the customer pays.
    #[serde(default = "default_return_url")]
    pub return_url: String,

    #[serde(default = "default_webpay_timeout")]
    pub timeout_seconds: u64,
}

impl Default for WebpayConfig {
    fn default() -> Self {
        Self {
            simulate: default_simulate(),
            base_url: default_webpay_base_url(),
            commerce_code: default_commerce_code(),
            api_key: default_webpay_api_key(),
            return_url: default_return_url(),
            timeout_seconds: default_webpay_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_auto_migrate() -> bool {
    true
}

fn default_jwt_expiration() -> u64 {
    3600
}

fn default_refresh_token_expiration() -> u64 {
    86400 * 7
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cors_origins() -> String {
    "*".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_fallback_rate() -> Decimal {
    Decimal::from(950)
}

fn default_currency_timeout() -> u64 {
    5
}

fn default_simulate() -> bool {
    true
}

fn default_webpay_base_url() -> String {
    "https://webpay3gint.transbank.cl".to_string()
}

fn default_commerce_code() -> String {
    // Transbank integration-environment commerce code
    "597055555532".to_string()
}

fn default_webpay_api_key() -> String {
    // Shared integration-environment key published by Transbank
    "579B532A7440BB0C9079DED94D31EA1615BACEB56610332264630D42D0A36B1C".to_string()
}

fn default_return_url() -> String {
    "http://localhost:8080/api/v1/checkout/confirm".to_string()
}

fn default_webpay_timeout() -> u64 {
    15
}

fn validate_cors_origins(origins: &str) -> Result<(), ValidationError> {
    if origins.trim().is_empty() {
        return Err(ValidationError::new("cors_origins_empty"));
    }
    if origins == "*" {
        return Ok(());
    }
    for origin in origins.split(',') {
        let origin = origin.trim();
        if !origin.starts_with("http://") && !origin.starts_with("https://") {
            return Err(ValidationError::new("cors_origin_invalid_scheme"));
        }
    }
    Ok(())
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Parsed list of allowed origins, or None when any origin is allowed.
    pub fn cors_origin_list(&self) -> Option<Vec<String>> {
        if self.cors_origins == "*" {
            None
        } else {
            Some(
                self.cors_origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            )
        }
    }
}

/// Loads and validates the application configuration.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

    let config = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{environment}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .set_default("environment", environment.clone())?
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config
        .validate()
        .map_err(|e| ConfigError::Message(format!("Invalid configuration: {e}")))?;

    Ok(app_config)
}

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
