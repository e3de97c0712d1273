use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::cart::{self, CartStatus};
use crate::entities::{cart_item, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// One cart line joined with its product.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub code: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Cart with computed totals, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    pub status: CartStatus,
    pub lines: Vec<CartLine>,
    pub total: Decimal,
}

/// Quantity actually stored for a line: never more than available stock.
fn clamp_to_stock(requested: i64, stock: i32) -> i32 {
    requested.clamp(0, stock.max(0) as i64) as i32
}

fn sum_lines(lines: &[CartLine]) -> Decimal {
    lines.iter().map(|l| l.line_total).sum()
}

/// Service for shopping carts.
///
/// A cart is a server-side row addressed by id; one line per product.
/// Quantities are clamped to available stock on every write, and adding a
/// product with zero stock is rejected outright.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_cart(
        &self,
        customer_id: Option<Uuid>,
    ) -> Result<CartView, ServiceError> {
        let now = Utc::now();
        let row = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            status: Set(CartStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = row.insert(&*self.db).await?;

        info!(cart_id = %saved.id, "Cart created");
        self.event_sender
            .send_or_log(Event::CartCreated { cart_id: saved.id })
            .await;
        self.build_view(&saved).await
    }

    pub async fn get_cart(&self, cart_id: Uuid) -> Result<CartView, ServiceError> {
        let cart = self.find_cart(&*self.db, cart_id).await?;
        self.build_view(&cart).await
    }

    /// Adds `quantity` units of a product, incrementing any existing line.
    /// The stored quantity is clamped to the product's stock.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart = self.find_cart(&txn, cart_id).await?;
        self.ensure_active(&cart)?;

        let item = product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        if item.stock <= 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "Product {} is out of stock",
                item.code
            )));
        }

        let existing = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        let now = Utc::now();
        match existing {
            Some(line) => {
                let new_quantity =
                    clamp_to_stock(line.quantity as i64 + quantity as i64, item.stock);
                let mut row: cart_item::ActiveModel = line.into();
                row.quantity = Set(new_quantity);
                row.unit_price = Set(item.price);
                row.updated_at = Set(now);
                row.update(&txn).await?;
            }
            None => {
                let row = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart_id),
                    product_id: Set(product_id),
                    quantity: Set(clamp_to_stock(quantity as i64, item.stock)),
                    unit_price: Set(item.price),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                row.insert(&txn).await?;
            }
        }

        self.touch_cart(&txn, cart).await?;
        txn.commit().await?;

        debug!(%cart_id, %product_id, quantity, "Cart item added");
        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id,
                product_id,
                quantity,
            })
            .await;

        self.get_cart(cart_id).await
    }

    /// Sets the quantity of a line, removing it when the quantity is zero or
    /// negative. Quantities above stock are clamped down.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity <= 0 {
            return self.remove_item(cart_id, product_id).await;
        }

        let txn = self.db.begin().await?;

        let cart = self.find_cart(&txn, cart_id).await?;
        self.ensure_active(&cart)?;

        let item = product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        let line = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {product_id} is not in the cart"))
            })?;

        let clamped = clamp_to_stock(quantity as i64, item.stock);
        if clamped == 0 {
            line.delete(&txn).await?;
            self.touch_cart(&txn, cart).await?;
            txn.commit().await?;
            self.event_sender
                .send_or_log(Event::CartItemRemoved {
                    cart_id,
                    product_id,
                })
                .await;
            return self.get_cart(cart_id).await;
        }

        let mut row: cart_item::ActiveModel = line.into();
        row.quantity = Set(clamped);
        row.unit_price = Set(item.price);
        row.updated_at = Set(Utc::now());
        row.update(&txn).await?;

        self.touch_cart(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id,
                product_id,
                quantity: clamped,
            })
            .await;

        self.get_cart(cart_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = self.find_cart(&txn, cart_id).await?;
        self.ensure_active(&cart)?;

        let line = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {product_id} is not in the cart"))
            })?;

        line.delete(&txn).await?;
        self.touch_cart(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id,
                product_id,
            })
            .await;

        self.get_cart(cart_id).await
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, cart_id: Uuid) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = self.find_cart(&txn, cart_id).await?;
        self.ensure_active(&cart)?;

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;
        self.touch_cart(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartCleared { cart_id })
            .await;

        self.get_cart(cart_id).await
    }

    async fn find_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
    ) -> Result<cart::Model, ServiceError> {
        cart::Entity::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {cart_id} not found")))
    }

    fn ensure_active(&self, cart: &cart::Model) -> Result<(), ServiceError> {
        match cart.status {
            CartStatus::Active => Ok(()),
            CartStatus::Converting => Err(ServiceError::InvalidOperation(
                "Cart is locked by a pending payment".to_string(),
            )),
            CartStatus::Converted => Err(ServiceError::InvalidOperation(
                "Cart has already been checked out".to_string(),
            )),
        }
    }

    async fn touch_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart: cart::Model,
    ) -> Result<(), ServiceError> {
        let mut row: cart::ActiveModel = cart.into();
        row.updated_at = Set(Utc::now());
        row.update(conn).await?;
        Ok(())
    }

    async fn build_view(&self, cart: &cart::Model) -> Result<CartView, ServiceError> {
        let rows = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for (line, maybe_product) in rows {
            let item = maybe_product.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Cart line {} references missing product",
                    line.id
                ))
            })?;
            lines.push(CartLine {
                product_id: item.id,
                code: item.code,
                name: item.name,
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.line_total(),
            });
        }

        Ok(CartView {
            id: cart.id,
            status: cart.status,
            total: sum_lines(&lines),
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4(),
            code: "FER-001".to_string(),
            name: "Martillo".to_string(),
            unit_price: price,
            quantity,
            line_total: price * Decimal::from(quantity),
        }
    }

    #[test]
    fn clamp_never_exceeds_stock() {
        assert_eq!(clamp_to_stock(3, 10), 3);
        assert_eq!(clamp_to_stock(15, 10), 10);
        assert_eq!(clamp_to_stock(1, 1), 1);
    }

    #[test]
    fn clamp_handles_degenerate_stock() {
        assert_eq!(clamp_to_stock(5, 0), 0);
        assert_eq!(clamp_to_stock(5, -3), 0);
        assert_eq!(clamp_to_stock(-2, 10), 0);
    }

    #[test]
    fn clamp_survives_quantity_overflow() {
        // i32::MAX existing + more requested must not wrap
        assert_eq!(clamp_to_stock(i32::MAX as i64 + 100, i32::MAX), i32::MAX);
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let lines = vec![line(dec!(9990), 2), line(dec!(15590), 1), line(dec!(450), 10)];
        assert_eq!(sum_lines(&lines), dec!(9990) * dec!(2) + dec!(15590) + dec!(4500));
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(sum_lines(&[]), Decimal::ZERO);
    }
}
