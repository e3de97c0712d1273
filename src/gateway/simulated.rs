use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;

use super::{GatewayCommit, GatewayTransaction, PaymentGateway};

#[derive(Debug, Clone)]
struct PendingTransaction {
    buy_order: String,
    amount: Decimal,
}

/// Deterministic in-process payment gateway for development and tests.
///
/// Every commit authorizes unless the transaction amount exceeds the
/// configured decline threshold, which lets tests exercise the rejected
/// path without a remote gateway.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    pending: Arc<DashMap<String, PendingTransaction>>,
    decline_over: Option<Decimal>,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declines any transaction whose amount is strictly greater than `limit`.
    pub fn declining_over(limit: Decimal) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            decline_over: Some(limit),
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn create_transaction(
        &self,
        buy_order: &str,
        _session_id: &str,
        amount: Decimal,
        return_url: &str,
    ) -> Result<GatewayTransaction, ServiceError> {
        let token = format!("sim-{}", Uuid::new_v4().simple());
        self.pending.insert(
            token.clone(),
            PendingTransaction {
                buy_order: buy_order.to_string(),
                amount,
            },
        );
        debug!(%token, %buy_order, "Simulated transaction created");
        Ok(GatewayTransaction {
            url: format!("{return_url}?token_ws={token}"),
            token,
        })
    }

    async fn commit_transaction(&self, token: &str) -> Result<GatewayCommit, ServiceError> {
        let (_, pending) = self.pending.remove(token).ok_or_else(|| {
            ServiceError::ExternalServiceError(format!("Unknown gateway token {token}"))
        })?;

        let authorized = match self.decline_over {
            Some(limit) => pending.amount <= limit,
            None => true,
        };

        debug!(%token, buy_order = %pending.buy_order, authorized, "Simulated commit");

        if authorized {
            Ok(GatewayCommit {
                authorized: true,
                // Deterministic pseudo-code derived from the token
                authorization_code: Some(format!("AUT{:06}", token.len() * 7919 % 1_000_000)),
                response_code: 0,
            })
        } else {
            Ok(GatewayCommit {
                authorized: false,
                authorization_code: None,
                response_code: -1,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn create_then_commit_authorizes() {
        let gateway = SimulatedGateway::new();
        let tx = gateway
            .create_transaction("ORD-1", "sess-1", dec!(19990), "http://localhost/return")
            .await
            .unwrap();
        assert!(tx.url.contains(&tx.token));

        let commit = gateway.commit_transaction(&tx.token).await.unwrap();
        assert!(commit.authorized);
        assert_eq!(commit.response_code, 0);
        assert!(commit.authorization_code.is_some());
    }

    #[tokio::test]
    async fn amounts_over_threshold_are_declined() {
        let gateway = SimulatedGateway::declining_over(dec!(10000));
        let tx = gateway
            .create_transaction("ORD-2", "sess-2", dec!(10001), "http://localhost/return")
            .await
            .unwrap();

        let commit = gateway.commit_transaction(&tx.token).await.unwrap();
        assert!(!commit.authorized);
        assert_eq!(commit.response_code, -1);
        assert!(commit.authorization_code.is_none());
    }

    #[tokio::test]
    async fn commit_consumes_the_token() {
        let gateway = SimulatedGateway::new();
        let tx = gateway
            .create_transaction("ORD-3", "sess-3", dec!(500), "http://localhost/return")
            .await
            .unwrap();

        gateway.commit_transaction(&tx.token).await.unwrap();
        assert!(gateway.commit_transaction(&tx.token).await.is_err());
    }

    #[tokio::test]
    async fn unknown_token_is_a_gateway_error() {
        let gateway = SimulatedGateway::new();
        let err = gateway.commit_transaction("sim-missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }
}
