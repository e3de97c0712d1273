use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{category, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// SKU shape: uppercase alphanumeric groups joined by dashes, 2 to 20 chars.
static PRODUCT_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9]+(-[A-Z0-9]+)*$").expect("product code regex")
});

pub fn is_valid_product_code(code: &str) -> bool {
    (2..=20).contains(&code.len()) && PRODUCT_CODE.is_match(code)
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

/// Partial update for a product. `code` is immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<Option<Uuid>>,
    pub image_url: Option<Option<String>>,
}

/// Catalog listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_slug: Option<String>,
    pub search: Option<String>,
    pub in_stock_only: bool,
}

/// Service for categories and products.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut condition = Condition::all();

        if let Some(slug) = &filter.category_slug {
            let cat = category::Entity::find()
                .filter(category::Column::Slug.eq(slug.clone()))
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Category {slug} not found")))?;
            condition = condition.add(product::Column::CategoryId.eq(cat.id));
        }

        if let Some(term) = &filter.search {
            let pattern = format!("%{term}%");
            condition = condition.add(
                Condition::any()
                    .add(product::Column::Name.like(pattern.clone()))
                    .add(product::Column::Brand.like(pattern.clone()))
                    .add(product::Column::Code.like(pattern)),
            );
        }

        if filter.in_stock_only {
            condition = condition.add(product::Column::Stock.gt(0));
        }

        let paginator = product::Entity::find()
            .filter(condition)
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {id} not found")))
    }

    pub async fn get_product_by_code(&self, code: &str) -> Result<product::Model, ServiceError> {
        product::Entity::find()
            .filter(product::Column::Code.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {code} not found")))
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_product(&self, input: NewProduct) -> Result<product::Model, ServiceError> {
        if !is_valid_product_code(&input.code) {
            return Err(ServiceError::ValidationError(format!(
                "Product code '{}' is not a valid SKU",
                input.code
            )));
        }
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price must be non-negative".to_string(),
            ));
        }
        if input.stock < 0 {
            return Err(ServiceError::ValidationError(
                "Stock must be non-negative".to_string(),
            ));
        }

        let duplicate = product::Entity::find()
            .filter(product::Column::Code.eq(input.code.clone()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product code '{}' already exists",
                input.code
            )));
        }

        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }

        let now = Utc::now();
        let row = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(input.code),
            name: Set(input.name),
            brand: Set(input.brand),
            model: Set(input.model),
            description: Set(input.description),
            price: Set(input.price),
            stock: Set(input.stock),
            category_id: Set(input.category_id),
            image_url: Set(input.image_url),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = row.insert(&*self.db).await?;

        info!(product_id = %saved.id, code = %saved.code, "Product created");
        self.event_sender
            .send_or_log(Event::ProductCreated {
                product_id: saved.id,
            })
            .await;
        Ok(saved)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<product::Model, ServiceError> {
        if let Some(price) = patch.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Price must be non-negative".to_string(),
                ));
            }
        }
        if let Some(stock) = patch.stock {
            if stock < 0 {
                return Err(ServiceError::ValidationError(
                    "Stock must be non-negative".to_string(),
                ));
            }
        }
        if let Some(Some(category_id)) = patch.category_id {
            self.get_category(category_id).await?;
        }

        let existing = self.get_product(id).await?;
        let mut row: product::ActiveModel = existing.into();

        if let Some(name) = patch.name {
            row.name = Set(name);
        }
        if let Some(brand) = patch.brand {
            row.brand = Set(brand);
        }
        if let Some(model) = patch.model {
            row.model = Set(model);
        }
        if let Some(description) = patch.description {
            row.description = Set(description);
        }
        if let Some(price) = patch.price {
            row.price = Set(price);
        }
        if let Some(stock) = patch.stock {
            row.stock = Set(stock);
        }
        if let Some(category_id) = patch.category_id {
            row.category_id = Set(category_id);
        }
        if let Some(image_url) = patch.image_url {
            row.image_url = Set(image_url);
        }
        row.updated_at = Set(Utc::now());

        let saved = row.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated { product_id: id })
            .await;
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_product(id).await?;
        product::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        info!(product_id = %id, "Product deleted");
        self.event_sender
            .send_or_log(Event::ProductDeleted { product_id: id })
            .await;
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<category::Model, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Category name must not be empty".to_string(),
            ));
        }

        let slug = slugify(name);
        let duplicate = category::Entity::find()
            .filter(category::Column::Slug.eq(slug.clone()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category '{name}' already exists"
            )));
        }

        let row = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(slug),
            created_at: Set(Utc::now()),
        };
        let saved = row.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CategoryCreated {
                category_id: saved.id,
            })
            .await;
        Ok(saved)
    }
}
