//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Email and password accounts behind [`auth::IdentityProvider`]
//! - `checkout` - Turning the cart into an order
//! - `leads` - Stockist requests and subscription sign-ups

pub mod auth;
pub mod checkout;
pub mod leads;
