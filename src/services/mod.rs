//! Business logic services.
//!
//! Each service owns one slice of the domain and is the only place that
//! slice's rules live. Handlers stay thin; services return
//! [`crate::errors::ServiceError`] and never touch HTTP types.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod currency;
pub mod customers;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use contact::ContactService;
pub use currency::CurrencyService;
pub use customers::CustomerService;
