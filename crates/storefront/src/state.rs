//! Application state shared across a host's services.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{FileCache, LocalCache};
use crate::cart::{CartStore, Outbox};
use crate::catalog::{Catalog, StaticCatalog};
use crate::config::StorefrontConfig;
use crate::documents::{DocumentStore, FileDocumentStore, StoreError};
use crate::error::Result;
use crate::models::{Identity, keys};
use crate::services::auth::{IdentityProvider, LocalIdentityProvider};

/// Application state shared across a host.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// collaborators every service needs.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    cache: Arc<dyn LocalCache>,
    documents: Arc<dyn DocumentStore>,
    catalog: Arc<dyn Catalog>,
    identity: LocalIdentityProvider,
    outbox: Outbox,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("outbox", &self.inner.outbox)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Open on-disk state under `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directories cannot be created or the
    /// configured catalog file cannot be loaded.
    pub fn open(config: StorefrontConfig) -> Result<Self> {
        let cache = FileCache::open(config.cache_dir())?;
        let documents = FileDocumentStore::open(config.documents_dir())?;
        let catalog = match &config.catalog_path {
            Some(path) => StaticCatalog::from_json_file(path)?,
            None => StaticCatalog::corewell(),
        };
        debug!(data_dir = %config.data_dir.display(), "Opened storefront state");
        Ok(Self::with_backends(
            config,
            Arc::new(cache),
            Arc::new(documents),
            Arc::new(catalog),
        ))
    }

    /// Build state around caller-supplied collaborators.
    #[must_use]
    pub fn with_backends(
        config: StorefrontConfig,
        cache: Arc<dyn LocalCache>,
        documents: Arc<dyn DocumentStore>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        let identity = LocalIdentityProvider::new(documents.clone());
        let outbox = Outbox::new(documents.clone(), config.outbox);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                cache,
                documents,
                catalog,
                identity,
                outbox,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn cache(&self) -> &dyn LocalCache {
        self.inner.cache.as_ref()
    }

    #[must_use]
    pub fn documents(&self) -> &dyn DocumentStore {
        self.inner.documents.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> &LocalIdentityProvider {
        &self.inner.identity
    }

    #[must_use]
    pub fn outbox(&self) -> &Outbox {
        &self.inner.outbox
    }

    /// Start delivering remote cart writes in the background.
    #[must_use]
    pub fn start_outbox_worker(&self) -> JoinHandle<()> {
        self.inner.outbox.spawn()
    }

    /// A cart store loaded from the local cache, bound to the current
    /// identity without refetching its remote cart.
    #[must_use]
    pub fn cart_store(&self) -> CartStore {
        let mut store = CartStore::new(
            self.inner.cache.clone(),
            self.inner.documents.clone(),
            self.inner.outbox.clone(),
            self.inner.config.login_policy,
        );
        store.load();
        if let Some(identity) = self.inner.identity.current() {
            store.resume(identity);
        }
        store
    }

    /// Re-establish the session persisted by [`save_session`](Self::save_session).
    pub fn restore_session(&self) -> Option<Identity> {
        let blob = match self.inner.cache.get(keys::SESSION) {
            Ok(blob) => blob?,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };
        match serde_json::from_str::<Identity>(&blob) {
            Ok(identity) => {
                self.inner.identity.restore(identity.clone());
                Some(identity)
            }
            Err(e) => {
                debug!(error = %e, "Discarding unreadable persisted session");
                None
            }
        }
    }

    /// Persist the current identity so the next process can restore it.
    ///
    /// # Errors
    ///
    /// Returns an error if the local cache cannot be written.
    pub fn save_session(&self) -> Result<()> {
        match self.inner.identity.current() {
            Some(identity) => {
                let blob = serde_json::to_string(&identity).map_err(StoreError::from)?;
                self.inner.cache.set(keys::SESSION, &blob)?;
            }
            None => self.inner.cache.remove(keys::SESSION)?,
        }
        Ok(())
    }
}
