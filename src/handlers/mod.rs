pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod common;
pub mod contact;
pub mod currency;
pub mod customers;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::gateway::{PaymentGateway, SimulatedGateway, WebpayClient};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::CatalogService>,
    pub contact: Arc<crate::services::ContactService>,
    pub customers: Arc<crate::services::CustomerService>,
    pub cart: Arc<crate::services::CartService>,
    pub checkout: Arc<crate::services::CheckoutService>,
    pub currency: Arc<crate::services::CurrencyService>,
}

impl AppServices {
    /// Builds the service container, selecting the payment gateway from
    /// configuration.
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> Result<Self, crate::errors::ServiceError> {
        let gateway: Arc<dyn PaymentGateway> = if config.webpay.simulate {
            Arc::new(SimulatedGateway::new())
        } else {
            Arc::new(WebpayClient::new(&config.webpay)?)
        };
        Self::with_gateway(db, event_sender, config, gateway)
    }

    /// Builds the container with an explicit gateway, used by tests.
    pub fn with_gateway(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        config: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self, crate::errors::ServiceError> {
        Ok(Self {
            catalog: Arc::new(crate::services::CatalogService::new(
                db.clone(),
                event_sender.clone(),
            )),
            contact: Arc::new(crate::services::ContactService::new(
                db.clone(),
                event_sender.clone(),
            )),
            customers: Arc::new(crate::services::CustomerService::new(db.clone())),
            cart: Arc::new(crate::services::CartService::new(
                db.clone(),
                event_sender.clone(),
            )),
            checkout: Arc::new(crate::services::CheckoutService::new(
                db,
                gateway,
                event_sender,
                config.webpay.return_url.clone(),
            )),
            currency: Arc::new(crate::services::CurrencyService::new(
                config.currency.clone(),
            )?),
        })
    }
}
