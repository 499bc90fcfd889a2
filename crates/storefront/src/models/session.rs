//! Session-related types.
//!
//! Types stored in the local cache for authentication state.

use serde::{Deserialize, Serialize};

use corewell_core::{Email, UserId};

/// An authenticated user's stable reference.
///
/// The `uid` keys the user's remote cart document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Identity provider uid.
    pub uid: UserId,
    /// User's email address.
    pub email: Email,
}

/// Local cache keys.
pub mod keys {
    /// Key for the serialized cart blob.
    pub const CART: &str = "corewellCart";

    /// Key for the persisted signed-in identity.
    pub const SESSION: &str = "corewellSession";
}
