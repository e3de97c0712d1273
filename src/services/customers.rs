use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::customer;
use crate::errors::ServiceError;

/// Partial update for a customer profile.
#[derive(Debug, Clone, Default)]
pub struct CustomerPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

/// Service for customer profiles.
/// Profiles are created by registration; this service reads and updates them.
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {id} not found")))
    }

    pub async fn get_by_user(&self, user_id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find()
            .filter(customer::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer profile for user {user_id} not found"))
            })
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let paginator = customer::Entity::find()
            .order_by_asc(customer::Column::LastName)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self, patch))]
    pub async fn update_by_user(
        &self,
        user_id: Uuid,
        patch: CustomerPatch,
    ) -> Result<customer::Model, ServiceError> {
        let existing = self.get_by_user(user_id).await?;
        let mut row: customer::ActiveModel = existing.into();

        if let Some(first_name) = patch.first_name {
            if first_name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "First name must not be empty".to_string(),
                ));
            }
            row.first_name = Set(first_name);
        }
        if let Some(last_name) = patch.last_name {
            if last_name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Last name must not be empty".to_string(),
                ));
            }
            row.last_name = Set(last_name);
        }
        if let Some(phone) = patch.phone {
            row.phone = Set(phone);
        }
        if let Some(address) = patch.address {
            row.address = Set(address);
        }
        row.updated_at = Set(Utc::now());

        Ok(row.update(&*self.db).await?)
    }
}
