use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ferremas API",
        version = "0.1.0",
        description = r#"
# Ferremas Hardware Store API

Storefront backend for a hardware retailer: product catalog, shopping
carts, Webpay checkout, contact intake, currency conversion and customer
accounts.

## Authentication

Management endpoints require a JWT in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

Catalog browsing, carts and checkout are public.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Catalog", description = "Products and categories"),
        (name = "Cart", description = "Shopping cart operations"),
        (name = "Checkout", description = "Two-phase Webpay payment flow"),
        (name = "Contact", description = "Contact form intake and review"),
        (name = "Currency", description = "CLP to USD conversion"),
        (name = "Auth", description = "Registration, login and tokens"),
        (name = "Customers", description = "Customer profiles")
    ),
    paths(
        crate::handlers::catalog::list_products,
        crate::handlers::catalog::get_product,
        crate::handlers::catalog::get_product_by_code,
        crate::handlers::catalog::create_product,
        crate::handlers::catalog::update_product,
        crate::handlers::catalog::delete_product,
        crate::handlers::catalog::list_categories,
        crate::handlers::catalog::create_category,
        crate::handlers::cart::create_cart,
        crate::handlers::cart::get_cart,
        crate::handlers::cart::add_item,
        crate::handlers::cart::update_item,
        crate::handlers::cart::remove_item,
        crate::handlers::cart::clear_cart,
        crate::handlers::checkout::start_checkout,
        crate::handlers::checkout::confirm_checkout,
        crate::handlers::checkout::get_transaction,
        crate::handlers::contact::submit_message,
        crate::handlers::contact::list_messages,
        crate::handlers::contact::mark_message_read,
        crate::handlers::currency::clp_to_usd,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_own_profile,
        crate::handlers::customers::update_own_profile,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::catalog::ProductResponse,
        crate::handlers::catalog::CategoryResponse,
        crate::handlers::catalog::CreateProductRequest,
        crate::handlers::catalog::UpdateProductRequest,
        crate::handlers::catalog::CreateCategoryRequest,
        crate::handlers::cart::AddItemRequest,
        crate::handlers::cart::UpdateItemRequest,
        crate::handlers::checkout::StartCheckoutRequest,
        crate::handlers::contact::ContactRequest,
        crate::handlers::contact::ContactAck,
        crate::handlers::contact::ContactMessageResponse,
        crate::handlers::auth::RegisterRequest,
        crate::handlers::auth::LoginRequest,
        crate::handlers::auth::RefreshRequest,
        crate::handlers::auth::RegisterResponse,
        crate::handlers::auth::MeResponse,
        crate::handlers::customers::CustomerResponse,
        crate::handlers::customers::UpdateProfileRequest,
        crate::services::cart::CartView,
        crate::services::cart::CartLine,
        crate::entities::cart::CartStatus,
        crate::entities::payment_transaction::PaymentStatus,
        crate::services::checkout::CheckoutStart,
        crate::services::checkout::CheckoutOutcome,
        crate::services::currency::Conversion,
        crate::services::currency::RateSource,
        crate::auth::TokenPair,
    ))
)]
pub struct ApiDocV1;

/// Swagger UI mounted at `/docs`, serving the OpenAPI document at
/// `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
