//! CLI command implementations.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use tokio::sync::watch;
use tracing::{debug, warn};

use corewell_storefront::cart::CartStore;
use corewell_storefront::error::AppError;
use corewell_storefront::models::Identity;
use corewell_storefront::services::auth::IdentityProvider;
use corewell_storefront::state::AppState;

/// Everything a command needs for one invocation.
pub struct Context {
    pub state: AppState,
    pub cart: CartStore,
    events: watch::Receiver<Option<Identity>>,
}

impl Context {
    /// Restore the persisted session and load the cached cart.
    pub fn new(state: AppState) -> Self {
        if let Some(identity) = state.restore_session() {
            debug!(user_id = %identity.uid, "Restored session");
        }
        let events = state.identity().subscribe();
        let cart = state.cart_store();
        Self {
            state,
            cart,
            events,
        }
    }

    /// Apply a sign-in or sign-out to the cart and persist the session.
    pub async fn sync_identity(&mut self) -> Result<(), AppError> {
        self.cart.catch_up(&mut self.events).await;
        self.state.save_session()
    }

    /// Deliver outstanding remote cart writes before the process exits.
    pub async fn finish(&self) {
        let report = self.state.outbox().flush().await;
        if report.dropped > 0 {
            warn!(
                dropped = report.dropped,
                "Some cart changes could not be saved to your account"
            );
        }
    }
}
