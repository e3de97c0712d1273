use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::{perm, AuthRouterExt};
use crate::entities::{category, product};
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::services::catalog::{NewProduct, ProductFilter, ProductPatch};
use crate::AppState;

const MAX_PAGE_SIZE: u64 = 100;

/// Custom validator for Decimal minimum value
fn validate_decimal_min_zero(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("decimal_min_zero"));
    }
    Ok(())
}

fn normalize_string(value: String) -> String {
    value.trim().to_string()
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .and_then(|v| if v.is_empty() { None } else { Some(v) })
}

/// Creates the router for catalog endpoints
pub fn catalog_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product))
        .route("/products/:id", delete(delete_product))
        .route("/categories", post(create_category))
        .with_permission(perm::CATALOG_MANAGE);

    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/code/:code", get(get_product_by_code))
        .route("/categories", get(list_categories))
        .merge(protected)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 2, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub brand: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    pub description: Option<String>,
    #[validate(custom = "validate_decimal_min_zero")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    pub category_id: Option<Uuid>,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub brand: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_decimal_min_zero")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// Filter by category slug
    pub category: Option<String>,
    /// Substring match over name, brand and code
    pub search: Option<String>,
    /// Only products with stock > 0
    #[serde(default)]
    pub in_stock: bool,
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    /// Derived availability: stock > 0
    pub available: bool,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(p: product::Model) -> Self {
        Self {
            id: p.id,
            code: p.code,
            name: p.name,
            brand: p.brand,
            model: p.model,
            description: p.description,
            price: p.price,
            available: p.stock > 0,
            stock: p.stock,
            category_id: p.category_id,
            image_url: p.image_url,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl From<category::Model> for CategoryResponse {
    fn from(c: category::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// List products with optional filters
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Paginated product list"),
        (status = 404, description = "Unknown category", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (page, per_page) = query.pagination.capped(MAX_PAGE_SIZE);
    let filter = ProductFilter {
        category_slug: normalize_optional_string(query.category),
        search: normalize_optional_string(query.search),
        in_stock_only: query.in_stock,
    };

    let (items, total) = state
        .services
        .catalog
        .list_products(filter, page, per_page)
        .await
        .map_err(map_service_error)?;

    let data: Vec<ProductResponse> = items.into_iter().map(Into::into).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ProductResponse::from(item)))
}

/// Get a product by SKU code
#[utoipa::path(
    get,
    path = "/api/v1/products/code/{code}",
    params(("code" = String, Path, description = "Product SKU")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_product_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .catalog
        .get_product_by_code(code.trim())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ProductResponse::from(item)))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate code", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = NewProduct {
        code: normalize_string(payload.code).to_ascii_uppercase(),
        name: normalize_string(payload.name),
        brand: normalize_string(payload.brand),
        model: normalize_string(payload.model),
        description: normalize_optional_string(payload.description),
        price: payload.price,
        stock: payload.stock,
        category_id: payload.category_id,
        image_url: normalize_optional_string(payload.image_url),
    };

    let created = state
        .services
        .catalog
        .create_product(input)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(ProductResponse::from(created)))
}

/// Update a product. The SKU code is immutable.
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let patch = ProductPatch {
        name: payload.name.map(normalize_string),
        brand: payload.brand.map(normalize_string),
        model: payload.model.map(normalize_string),
        description: payload.description.map(|v| Some(normalize_string(v))),
        price: payload.price,
        stock: payload.stock,
        category_id: payload.category_id.map(Some),
        image_url: payload.image_url.map(|v| Some(normalize_string(v))),
    };

    let updated = state
        .services
        .catalog
        .update_product(id, patch)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ProductResponse::from(updated)))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// List all categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Category list", body = [CategoryResponse])),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let items = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;
    let data: Vec<CategoryResponse> = items.into_iter().map(Into::into).collect();
    Ok(success_response(data))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Duplicate category", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .catalog
        .create_category(&payload.name)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(CategoryResponse::from(created)))
}
