//! Integration tests for the CoreWell storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p corewell-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_properties` - Cart behaviour across many operations
//! - `identity_sync` - Sign-in, sign-out and remote cart sync
//! - `checkout_flow` - Orders and lead capture end to end
//! - `persistence` - On-disk state surviving a restart
//!
//! Every scenario runs against in-memory backends except `persistence`,
//! which uses the file adapters in a temporary directory.

use std::sync::Arc;

use secrecy::SecretString;

use corewell_core::{CartDocument, DocumentId, ProductId, collections};
use corewell_storefront::cache::MemoryCache;
use corewell_storefront::cart::{CartStore, LoginPolicy};
use corewell_storefront::catalog::StaticCatalog;
use corewell_storefront::config::StorefrontConfig;
use corewell_storefront::documents::{MemoryDocumentStore, StoreResult, read_as, write_as};
use corewell_storefront::state::AppState;

/// In-memory storefront with handles on its backends for inspection.
pub struct TestContext {
    pub state: AppState,
    pub cache: Arc<MemoryCache>,
    pub documents: Arc<MemoryDocumentStore>,
}

impl TestContext {
    /// A storefront using the built-in catalog and `policy` on sign-in.
    #[must_use]
    pub fn new(policy: LoginPolicy) -> Self {
        let cache = Arc::new(MemoryCache::new());
        let documents = Arc::new(MemoryDocumentStore::new());
        let config = StorefrontConfig {
            login_policy: policy,
            ..StorefrontConfig::default()
        };
        let state = AppState::with_backends(
            config,
            cache.clone(),
            documents.clone(),
            Arc::new(StaticCatalog::corewell()),
        );
        Self {
            state,
            cache,
            documents,
        }
    }

    /// A fresh cart store over the shared cache, as a new page load would get.
    #[must_use]
    pub fn cart_store(&self) -> CartStore {
        self.state.cart_store()
    }

    /// Add each product id in turn, panicking on unknown ids.
    ///
    /// # Panics
    ///
    /// Panics if an id is not in the catalog.
    pub fn add_all(&self, store: &mut CartStore, ids: &[&str]) {
        for id in ids {
            if let Err(e) = store.add_or_increment(&ProductId::new(*id), self.state.catalog()) {
                panic!("failed to add {id}: {e}");
            }
        }
    }

    /// Write a remote cart for `uid` directly to the document store.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails.
    pub async fn seed_remote_cart(&self, uid: &str, ids: &[&str]) -> StoreResult<()> {
        let mut scratch = CartStore::new(
            Arc::new(MemoryCache::new()),
            self.documents.clone(),
            self.state.outbox().clone(),
            LoginPolicy::Replace,
        );
        self.add_all(&mut scratch, ids);
        write_as(
            self.documents.as_ref(),
            collections::CARTS,
            &DocumentId::new(uid),
            &CartDocument::from(scratch.cart().clone()),
        )
        .await
    }

    /// The remote cart document for `uid`, if any.
    ///
    /// # Errors
    ///
    /// Returns the store error if the read fails.
    pub async fn remote_cart(&self, uid: &str) -> StoreResult<Option<CartDocument>> {
        read_as(self.documents.as_ref(), collections::CARTS, &DocumentId::new(uid)).await
    }
}

/// Wrap a test password.
#[must_use]
pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_owned())
}
