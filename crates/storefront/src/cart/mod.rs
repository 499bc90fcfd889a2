//! Cart persistence and remote synchronisation.
//!
//! - [`CartStore`] owns the authoritative in-memory cart, mirrors it to the
//!   local cache on every mutation and to the remote store when signed in
//! - [`Outbox`] queues remote writes so mutations never wait on the network

mod outbox;
mod store;

pub use outbox::{FlushReport, Outbox, OutboxConfig};
pub use store::CartStore;

use std::str::FromStr;

/// What happens to the anonymous cart when a user signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginPolicy {
    /// The remote cart replaces the local one; anonymous lines are discarded.
    #[default]
    Replace,
    /// Local lines are folded into the remote cart, summing quantities.
    Merge,
}

impl FromStr for LoginPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "merge" => Ok(Self::Merge),
            other => Err(format!("expected `replace` or `merge`, got `{other}`")),
        }
    }
}
