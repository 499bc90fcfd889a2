//! Domain models for the storefront.
//!
//! - [`session`] - The signed-in identity and well-known local cache keys
//! - [`user`] - Stored account records for the local identity provider

pub mod session;
pub mod user;

pub use session::{Identity, keys};
pub use user::Account;
