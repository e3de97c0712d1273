//! Database entities for the hardware store API.

pub mod cart;
pub mod cart_item;
pub mod category;
pub mod contact_message;
pub mod customer;
pub mod payment_transaction;
pub mod product;
pub mod refresh_token;
pub mod user;
