use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Domain events emitted by the services after state changes commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ProductCreated { product_id: Uuid },
    ProductUpdated { product_id: Uuid },
    ProductDeleted { product_id: Uuid },
    StockDepleted { product_id: Uuid },
    CategoryCreated { category_id: Uuid },
    ContactMessageReceived { message_id: Uuid },
    UserRegistered { user_id: Uuid },
    CustomerCreated { customer_id: Uuid, user_id: Uuid },
    CartCreated { cart_id: Uuid },
    CartItemAdded { cart_id: Uuid, product_id: Uuid, quantity: i32 },
    CartItemUpdated { cart_id: Uuid, product_id: Uuid, quantity: i32 },
    CartItemRemoved { cart_id: Uuid, product_id: Uuid },
    CartCleared { cart_id: Uuid },
    CheckoutStarted { cart_id: Uuid, buy_order: String, amount: Decimal },
    PaymentAuthorized { transaction_id: Uuid, buy_order: String },
    PaymentRejected { transaction_id: Uuid, buy_order: String },
    PaymentAborted { transaction_id: Uuid, buy_order: String },
}

/// Cloneable handle for publishing events onto the process-wide channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.sender.send(event).await
    }

    /// Sends an event, logging instead of failing when the receiver is gone.
    /// Event delivery is best effort and never blocks the request path.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!(event = ?e.0, "Event channel closed, dropping event");
        }
    }
}

/// Drains the event channel, logging each event.
/// Runs until every `EventSender` is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PaymentAuthorized {
                transaction_id,
                buy_order,
            } => {
                info!(%transaction_id, %buy_order, "Payment authorized");
            }
            Event::PaymentRejected {
                transaction_id,
                buy_order,
            } => {
                warn!(%transaction_id, %buy_order, "Payment rejected");
            }
            Event::PaymentAborted {
                transaction_id,
                buy_order,
            } => {
                warn!(%transaction_id, %buy_order, "Payment aborted by customer");
            }
            Event::StockDepleted { product_id } => {
                warn!(%product_id, "Product stock depleted");
            }
            other => {
                info!(event = ?other, "Event processed");
            }
        }
    }
    error!("Event channel closed, processor shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::CartCreated {
                cart_id: Uuid::new_v4(),
            })
            .await
            .unwrap();

        assert!(matches!(rx.recv().await, Some(Event::CartCreated { .. })));
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);
        drop(rx);

        // Must not panic or return an error
        sender
            .send_or_log(Event::CartCleared {
                cart_id: Uuid::new_v4(),
            })
            .await;
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::CheckoutStarted {
            cart_id: Uuid::nil(),
            buy_order: "ORD-1".to_string(),
            amount: Decimal::from(1000),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "checkout_started");
        assert_eq!(json["buy_order"], "ORD-1");
    }
}
