use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::config::CurrencyConfig;
use crate::errors::ServiceError;

/// Where the exchange rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Remote,
    Fallback,
}

/// A CLP amount converted to USD.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversion {
    pub amount_clp: Decimal,
    pub amount_usd: Decimal,
    /// CLP per USD applied.
    pub rate: Decimal,
    pub source: RateSource,
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    clp_per_usd: Decimal,
}

fn convert(amount_clp: Decimal, rate: Decimal, source: RateSource) -> Conversion {
    Conversion {
        amount_clp,
        amount_usd: (amount_clp / rate).round_dp(2),
        rate,
        source,
    }
}

/// Converts CLP amounts to USD using a remote rate with a fixed fallback.
///
/// Any failure to reach or parse the remote endpoint degrades to the
/// configured fallback rate instead of failing the request.
#[derive(Clone)]
pub struct CurrencyService {
    http: Client,
    config: CurrencyConfig,
}

impl CurrencyService {
    pub fn new(config: CurrencyConfig) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    #[instrument(skip(self))]
    pub async fn clp_to_usd(&self, amount_clp: Decimal) -> Result<Conversion, ServiceError> {
        if amount_clp < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Amount must be non-negative".to_string(),
            ));
        }

        match self.fetch_remote_rate().await {
            Some(rate) if rate > Decimal::ZERO => Ok(convert(amount_clp, rate, RateSource::Remote)),
            _ => Ok(convert(
                amount_clp,
                self.config.fallback_clp_per_usd,
                RateSource::Fallback,
            )),
        }
    }

    async fn fetch_remote_rate(&self) -> Option<Decimal> {
        if self.config.exchange_api_url.is_empty() {
            return None;
        }

        let response = match self.http.get(&self.config.exchange_api_url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Exchange rate fetch failed, using fallback");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Exchange rate endpoint errored, using fallback");
            return None;
        }

        match response.json::<RateResponse>().await {
            Ok(body) => Some(body.clp_per_usd),
            Err(e) => {
                warn!(error = %e, "Exchange rate body invalid, using fallback");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn conversion_divides_and_rounds_to_cents() {
        let result = convert(dec!(9500), dec!(950), RateSource::Fallback);
        assert_eq!(result.amount_usd, dec!(10.00));

        let result = convert(dec!(10000), dec!(950), RateSource::Fallback);
        assert_eq!(result.amount_usd, dec!(10.53));
    }

    #[test]
    fn zero_converts_to_zero() {
        let result = convert(Decimal::ZERO, dec!(950), RateSource::Fallback);
        assert_eq!(result.amount_usd, Decimal::ZERO);
    }

    #[tokio::test]
    async fn empty_endpoint_uses_fallback_rate() {
        let service = CurrencyService::new(CurrencyConfig::default()).unwrap();
        let result = service.clp_to_usd(dec!(1900)).await.unwrap();
        assert_eq!(result.source, RateSource::Fallback);
        assert_eq!(result.rate, dec!(950));
        assert_eq!(result.amount_usd, dec!(2.00));
    }

    #[tokio::test]
    async fn unreachable_endpoint_uses_fallback_rate() {
        let config = CurrencyConfig {
            exchange_api_url: "http://127.0.0.1:1/rate".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        };
        let service = CurrencyService::new(config).unwrap();
        let result = service.clp_to_usd(dec!(950)).await.unwrap();
        assert_eq!(result.source, RateSource::Fallback);
        assert_eq!(result.amount_usd, dec!(1.00));
    }

    #[tokio::test]
    async fn negative_amount_is_rejected() {
        let service = CurrencyService::new(CurrencyConfig::default()).unwrap();
        assert!(service.clp_to_usd(dec!(-1)).await.is_err());
    }
}
