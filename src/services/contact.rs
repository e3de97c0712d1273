use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::contact_message;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Input for a contact form submission.
#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
}

/// Service for contact form intake and admin review.
#[derive(Clone)]
pub struct ContactService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ContactService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn submit(
        &self,
        input: NewContactMessage,
    ) -> Result<contact_message::Model, ServiceError> {
        let row = contact_message::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            subject: Set(input.subject),
            body: Set(input.body),
            read: Set(false),
            created_at: Set(Utc::now()),
        };
        let saved = row.insert(&*self.db).await?;

        info!(message_id = %saved.id, "Contact message received");
        self.event_sender
            .send_or_log(Event::ContactMessageReceived {
                message_id: saved.id,
            })
            .await;
        Ok(saved)
    }

    /// Lists messages newest first, optionally only unread ones.
    pub async fn list(
        &self,
        unread_only: bool,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<contact_message::Model>, u64), ServiceError> {
        let mut query = contact_message::Entity::find()
            .order_by_desc(contact_message::Column::CreatedAt);
        if unread_only {
            query = query.filter(contact_message::Column::Read.eq(false));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<contact_message::Model, ServiceError> {
        contact_message::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Contact message {id} not found")))
    }

    /// Marks a message as read. Idempotent.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: Uuid) -> Result<contact_message::Model, ServiceError> {
        let existing = self.get(id).await?;
        if existing.read {
            return Ok(existing);
        }
        let mut row: contact_message::ActiveModel = existing.into();
        row.read = Set(true);
        Ok(row.update(&*self.db).await?)
    }
}
