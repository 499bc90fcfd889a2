//! CoreWell Core - Shared types library.
//!
//! This crate provides the domain types used across the CoreWell components:
//! - `storefront` - Cart store, outbox, checkout and lead capture services
//! - `cli` - Command-line host for the storefront
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O, no
//! document store access, no clocks. This keeps the cart invariants testable
//! in isolation.
//!
//! # Modules
//!
//! - [`types`] - Ids, prices, emails, the cart state machine and document payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
