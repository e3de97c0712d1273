//! Payment gateway abstraction.
//!
//! Checkout talks to a [`PaymentGateway`] trait object so the rest of the
//! system is unaware of which backend authorizes payments. Production uses
//! the Webpay REST client; development and tests use the in-process
//! simulated gateway.

pub mod simulated;
pub mod webpay;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub use simulated::SimulatedGateway;
pub use webpay::WebpayClient;

/// Result of creating a transaction at the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayTransaction {
    /// Opaque token identifying the transaction at the gateway.
    pub token: String,
    /// Payment form URL the customer is redirected to.
    pub url: String,
}

/// Result of committing a transaction at the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCommit {
    pub authorized: bool,
    pub authorization_code: Option<String>,
    /// Gateway response code. Zero means approved.
    pub response_code: i32,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers a new transaction and returns the token plus redirect URL.
    async fn create_transaction(
        &self,
        buy_order: &str,
        session_id: &str,
        amount: Decimal,
        return_url: &str,
    ) -> Result<GatewayTransaction, ServiceError>;

    /// Commits a previously created transaction after the customer paid.
    async fn commit_transaction(&self, token: &str) -> Result<GatewayCommit, ServiceError>;
}
