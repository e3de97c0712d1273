use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::cart::{self, CartStatus};
use crate::entities::payment_transaction::{self, PaymentStatus};
use crate::entities::{cart_item, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::PaymentGateway;

/// Result of starting a checkout: where to send the customer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutStart {
    pub token: String,
    pub url: String,
    pub buy_order: String,
    pub amount: Decimal,
}

/// Final state of a payment attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutOutcome {
    pub status: PaymentStatus,
    pub buy_order: String,
    pub amount: Decimal,
    pub authorization_code: Option<String>,
    pub response_code: Option<i32>,
}

impl CheckoutOutcome {
    fn from_transaction(tx: &payment_transaction::Model) -> Self {
        Self {
            status: tx.status,
            buy_order: tx.buy_order.clone(),
            amount: tx.amount,
            authorization_code: tx.authorization_code.clone(),
            response_code: tx.response_code,
        }
    }
}

/// Merchant order id: "ORD-" plus 22 hex chars from a fresh UUID.
/// Unique per attempt, within the gateway's 26-character limit.
fn new_buy_order() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("ORD-{}", &id[..22])
}

/// Service driving the two-phase Webpay checkout.
///
/// Phase one (`start`) computes the amount server-side, registers the
/// transaction at the gateway and locks the cart. Phase two (`confirm`)
/// commits the transaction and settles the cart: stock is decremented and
/// the cart emptied only on authorization.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: EventSender,
    return_url: String,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: EventSender,
        return_url: String,
    ) -> Self {
        Self {
            db,
            gateway,
            event_sender,
            return_url,
        }
    }

    #[instrument(skip(self))]
    pub async fn start(&self, cart_id: Uuid) -> Result<CheckoutStart, ServiceError> {
        let cart = cart::Entity::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {cart_id} not found")))?;

        match cart.status {
            CartStatus::Active => {}
            CartStatus::Converting => {
                return Err(ServiceError::InvalidOperation(
                    "Cart already has a pending payment".to_string(),
                ))
            }
            CartStatus::Converted => {
                return Err(ServiceError::InvalidOperation(
                    "Cart has already been checked out".to_string(),
                ))
            }
        }

        let lines = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(&*self.db)
            .await?;
        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "Cannot check out an empty cart".to_string(),
            ));
        }

        // The amount is always recomputed here; client-supplied totals are
        // never trusted.
        let amount: Decimal = lines.iter().map(|l| l.line_total()).sum();
        let buy_order = new_buy_order();

        let created = self
            .gateway
            .create_transaction(&buy_order, &cart_id.to_string(), amount, &self.return_url)
            .await?;

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let tx_row = payment_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart_id),
            buy_order: Set(buy_order.clone()),
            token: Set(created.token.clone()),
            amount: Set(amount),
            status: Set(PaymentStatus::Created),
            authorization_code: Set(None),
            response_code: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        tx_row.insert(&txn).await?;

        let mut cart_row: cart::ActiveModel = cart.into();
        cart_row.status = Set(CartStatus::Converting);
        cart_row.updated_at = Set(now);
        cart_row.update(&txn).await?;

        txn.commit().await?;

        info!(%cart_id, %buy_order, %amount, "Checkout started");
        self.event_sender
            .send_or_log(Event::CheckoutStarted {
                cart_id,
                buy_order: buy_order.clone(),
                amount,
            })
            .await;

        Ok(CheckoutStart {
            token: created.token,
            url: created.url,
            buy_order,
            amount,
        })
    }

    /// Settles a payment after the customer returns from the gateway.
    ///
    /// `token_ws` is present on a normal return; `tbk_token` is present when
    /// the customer aborted the payment form. Repeated confirms of an already
    /// settled transaction return the stored outcome without touching the
    /// gateway again.
    #[instrument(skip(self, token_ws, tbk_token))]
    pub async fn confirm(
        &self,
        token_ws: Option<String>,
        tbk_token: Option<String>,
    ) -> Result<CheckoutOutcome, ServiceError> {
        if let Some(token) = tbk_token {
            return self.abort(&token).await;
        }

        let token = token_ws.ok_or_else(|| {
            ServiceError::ValidationError(
                "Either token_ws or TBK_TOKEN is required".to_string(),
            )
        })?;

        let tx = self.find_by_token(&token).await?;
        if tx.status.is_terminal() {
            return Ok(CheckoutOutcome::from_transaction(&tx));
        }

        let commit = self.gateway.commit_transaction(&token).await?;

        if commit.authorized {
            self.settle_authorized(tx, commit.authorization_code, commit.response_code)
                .await
        } else {
            self.settle_rejected(tx, commit.response_code).await
        }
    }

    async fn abort(&self, token: &str) -> Result<CheckoutOutcome, ServiceError> {
        let tx = self.find_by_token(token).await?;
        if tx.status.is_terminal() {
            return Ok(CheckoutOutcome::from_transaction(&tx));
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let cart = cart::Entity::find_by_id(tx.cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", tx.cart_id)))?;
        let mut cart_row: cart::ActiveModel = cart.into();
        cart_row.status = Set(CartStatus::Active);
        cart_row.updated_at = Set(now);
        cart_row.update(&txn).await?;

        let tx_id = tx.id;
        let buy_order = tx.buy_order.clone();
        let mut tx_row: payment_transaction::ActiveModel = tx.into();
        tx_row.status = Set(PaymentStatus::Aborted);
        tx_row.updated_at = Set(now);
        let updated = tx_row.update(&txn).await?;

        txn.commit().await?;

        warn!(transaction_id = %tx_id, %buy_order, "Payment aborted");
        self.event_sender
            .send_or_log(Event::PaymentAborted {
                transaction_id: tx_id,
                buy_order,
            })
            .await;

        Ok(CheckoutOutcome::from_transaction(&updated))
    }

    async fn settle_authorized(
        &self,
        tx: payment_transaction::Model,
        authorization_code: Option<String>,
        response_code: i32,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let lines = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(tx.cart_id))
            .all(&txn)
            .await?;

        // Stock is decremented at confirmation time, floored at zero.
        let mut depleted = Vec::new();
        for line in &lines {
            if let Some(item) = product::Entity::find_by_id(line.product_id).one(&txn).await? {
                let remaining = (item.stock - line.quantity).max(0);
                let product_id = item.id;
                let mut row: product::ActiveModel = item.into();
                row.stock = Set(remaining);
                row.updated_at = Set(now);
                row.update(&txn).await?;
                if remaining == 0 {
                    depleted.push(product_id);
                }
            }
        }

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(tx.cart_id))
            .exec(&txn)
            .await?;

        let cart = cart::Entity::find_by_id(tx.cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", tx.cart_id)))?;
        let mut cart_row: cart::ActiveModel = cart.into();
        cart_row.status = Set(CartStatus::Converted);
        cart_row.updated_at = Set(now);
        cart_row.update(&txn).await?;

        let tx_id = tx.id;
        let buy_order = tx.buy_order.clone();
        let mut tx_row: payment_transaction::ActiveModel = tx.into();
        tx_row.status = Set(PaymentStatus::Authorized);
        tx_row.authorization_code = Set(authorization_code);
        tx_row.response_code = Set(Some(response_code));
        tx_row.updated_at = Set(now);
        let updated = tx_row.update(&txn).await?;

        txn.commit().await?;

        info!(transaction_id = %tx_id, %buy_order, "Payment authorized");
        self.event_sender
            .send_or_log(Event::PaymentAuthorized {
                transaction_id: tx_id,
                buy_order,
            })
            .await;
        for product_id in depleted {
            self.event_sender
                .send_or_log(Event::StockDepleted { product_id })
                .await;
        }

        Ok(CheckoutOutcome::from_transaction(&updated))
    }

    async fn settle_rejected(
        &self,
        tx: payment_transaction::Model,
        response_code: i32,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        // The cart unlocks so the customer can retry.
        let cart = cart::Entity::find_by_id(tx.cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", tx.cart_id)))?;
        let mut cart_row: cart::ActiveModel = cart.into();
        cart_row.status = Set(CartStatus::Active);
        cart_row.updated_at = Set(now);
        cart_row.update(&txn).await?;

        let tx_id = tx.id;
        let buy_order = tx.buy_order.clone();
        let mut tx_row: payment_transaction::ActiveModel = tx.into();
        tx_row.status = Set(PaymentStatus::Rejected);
        tx_row.response_code = Set(Some(response_code));
        tx_row.updated_at = Set(now);
        let updated = tx_row.update(&txn).await?;

        txn.commit().await?;

        warn!(transaction_id = %tx_id, %buy_order, response_code, "Payment rejected");
        self.event_sender
            .send_or_log(Event::PaymentRejected {
                transaction_id: tx_id,
                buy_order,
            })
            .await;

        Ok(CheckoutOutcome::from_transaction(&updated))
    }

    pub async fn get_transaction(
        &self,
        id: Uuid,
    ) -> Result<payment_transaction::Model, ServiceError> {
        payment_transaction::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transaction {id} not found")))
    }

    /// Looks up a transaction by its gateway token.
    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<payment_transaction::Model, ServiceError> {
        payment_transaction::Entity::find()
            .filter(payment_transaction::Column::Token.eq(token))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Unknown payment token".to_string()))
    }
}
