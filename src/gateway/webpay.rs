use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::WebpayConfig;
use crate::errors::ServiceError;

use super::{GatewayCommit, GatewayTransaction, PaymentGateway};

const TRANSACTIONS_PATH: &str = "/rswebpaytransaction/api/webpay/v1.2/transactions";

/// REST client for the Transbank Webpay Plus API.
#[derive(Debug, Clone)]
pub struct WebpayClient {
    http: Client,
    base_url: String,
    commerce_code: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    token: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    status: String,
    response_code: i32,
    authorization_code: Option<String>,
}

impl WebpayClient {
    pub fn new(config: &WebpayConfig) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            commerce_code: config.commerce_code.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn transactions_url(&self) -> String {
        format!("{}{}", self.base_url, TRANSACTIONS_PATH)
    }
}

#[async_trait]
impl PaymentGateway for WebpayClient {
    #[instrument(skip(self), fields(buy_order = %buy_order))]
    async fn create_transaction(
        &self,
        buy_order: &str,
        session_id: &str,
        amount: Decimal,
        return_url: &str,
    ) -> Result<GatewayTransaction, ServiceError> {
        // Webpay amounts are integral CLP.
        let amount = amount.round().to_i64().ok_or_else(|| {
            ServiceError::InvalidInput(format!("Amount {amount} out of range"))
        })?;

        let response = self
            .http
            .post(self.transactions_url())
            .header("Tbk-Api-Key-Id", &self.commerce_code)
            .header("Tbk-Api-Key-Secret", &self.api_key)
            .json(&json!({
                "buy_order": buy_order,
                "session_id": session_id,
                "amount": amount,
                "return_url": return_url,
            }))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Webpay create: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "Webpay create returned {status}: {body}"
            )));
        }

        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Webpay create body: {e}")))?;

        debug!(token = %created.token, "Webpay transaction created");
        Ok(GatewayTransaction {
            token: created.token,
            url: created.url,
        })
    }

    #[instrument(skip(self, token))]
    async fn commit_transaction(&self, token: &str) -> Result<GatewayCommit, ServiceError> {
        let response = self
            .http
            .put(format!("{}/{token}", self.transactions_url()))
            .header("Tbk-Api-Key-Id", &self.commerce_code)
            .header("Tbk-Api-Key-Secret", &self.api_key)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Webpay commit: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "Webpay commit returned {status}: {body}"
            )));
        }

        let committed: CommitResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Webpay commit body: {e}")))?;

        debug!(
            status = %committed.status,
            response_code = committed.response_code,
            "Webpay transaction committed"
        );

        Ok(GatewayCommit {
            authorized: committed.status == "AUTHORIZED" && committed.response_code == 0,
            authorization_code: committed.authorization_code,
            response_code: committed.response_code,
        })
    }
}
