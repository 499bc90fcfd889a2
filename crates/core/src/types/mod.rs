//! Core types for CoreWell.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod document;
pub mod email;
pub mod id;
pub mod price;

pub use cart::{Cart, CartError, CartLine, QuantityChange};
pub use document::{
    CartDocument, OrderDraft, ShippingDetails, StockistRequest, SubscriptionRequest, collections,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
