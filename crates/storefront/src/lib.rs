//! CoreWell storefront library.
//!
//! The cart and everything around it, independent of any particular host:
//!
//! - [`cart::CartStore`] keeps the cart in memory, in the local cache and,
//!   when a user is signed in, in the remote document store
//! - [`cart::Outbox`] delivers remote cart writes off the mutation path
//! - [`services`] covers sign-in, checkout and lead capture
//! - [`state::AppState`] wires the collaborators together for a host

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod documents;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod telemetry;
