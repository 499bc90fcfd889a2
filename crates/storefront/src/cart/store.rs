//! The authoritative cart for one session.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use corewell_core::{
    Cart, CartDocument, CartError, CartLine, DocumentId, ProductId, QuantityChange, collections,
};

use super::{LoginPolicy, Outbox};
use crate::cache::LocalCache;
use crate::catalog::Catalog;
use crate::documents::{DocumentStore, read_as, write_as};
use crate::error::add_breadcrumb;
use crate::models::{Identity, keys};

/// Owns the in-memory cart and keeps the local cache and the remote store
/// in step with it.
///
/// One instance per session, driven from a single task: mutations take
/// `&mut self` and return once memory and the local cache are updated. Remote
/// writes are handed to the [`Outbox`] and land later.
pub struct CartStore {
    cart: Cart,
    identity: Option<Identity>,
    cache: Arc<dyn LocalCache>,
    documents: Arc<dyn DocumentStore>,
    outbox: Outbox,
    policy: LoginPolicy,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("cart", &self.cart)
            .field("identity", &self.identity)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store with an empty, anonymous cart.
    ///
    /// Call [`load`](Self::load) to pick up a cached cart.
    #[must_use]
    pub fn new(
        cache: Arc<dyn LocalCache>,
        documents: Arc<dyn DocumentStore>,
        outbox: Outbox,
        policy: LoginPolicy,
    ) -> Self {
        Self {
            cart: Cart::new(),
            identity: None,
            cache,
            documents,
            outbox,
            policy,
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Replace the in-memory cart with the one in the local cache.
    ///
    /// A missing or unreadable blob yields an empty cart.
    pub fn load(&mut self) -> &Cart {
        self.cart = match self.cache.get(keys::CART) {
            Ok(Some(blob)) => serde_json::from_str(&blob).unwrap_or_else(|e| {
                debug!(error = %e, "Discarding unreadable cached cart");
                Cart::new()
            }),
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read cart from local cache");
                Cart::new()
            }
        };
        &self.cart
    }

    /// Bind an already signed-in identity without fetching its remote cart.
    ///
    /// Used when a host restarts mid-session: the local cache already mirrors
    /// the remote cart, so only future mutations need syncing.
    pub fn resume(&mut self, identity: Identity) {
        debug!(user_id = %identity.uid, "Resumed cart session");
        self.identity = Some(identity);
    }

    /// Switch to `identity`'s remote cart after a sign-in.
    ///
    /// Under [`LoginPolicy::Replace`] the remote cart overwrites the local one
    /// (a missing remote cart is created empty). Under [`LoginPolicy::Merge`]
    /// local lines are folded into the remote cart and the result is queued
    /// for writing back. Either way the local cache is rewritten to match.
    ///
    /// A snapshot still waiting in the outbox for `identity` stands in for
    /// the remote cart and is queued again after the policy is applied.
    ///
    /// Remote failures are logged and leave the cart as it was. The identity
    /// is bound regardless, so later mutations still sync.
    #[instrument(skip(self, identity), fields(user_id = %identity.uid))]
    pub async fn load_for_identity(&mut self, identity: &Identity) -> &Cart {
        self.identity = Some(identity.clone());
        let doc_id = DocumentId::new(identity.uid.as_str());

        // An undelivered snapshot is newer than the stored document.
        let queued = self.outbox.take_pending(&identity.uid).await;
        let had_queued = queued.is_some();
        let remote = if let Some(cart) = queued {
            debug!("Using queued cart snapshot as remote state");
            Some(CartDocument::from(cart))
        } else {
            match read_as::<CartDocument>(self.documents.as_ref(), collections::CARTS, &doc_id)
                .await
            {
                Ok(remote) => remote,
                Err(e) => {
                    warn!(error = %e, "Failed to load remote cart, keeping local cart");
                    return &self.cart;
                }
            }
        };

        let (next, needs_write_back) = match (remote, self.policy) {
            (Some(doc), LoginPolicy::Replace) => (doc.items, had_queued),
            (Some(doc), LoginPolicy::Merge) => {
                let mut merged = doc.items;
                merged.merge_from(&self.cart);
                (merged, had_queued || !self.cart.is_empty())
            }
            (None, policy) => {
                let initial = match policy {
                    LoginPolicy::Replace => Cart::new(),
                    LoginPolicy::Merge => self.cart.clone(),
                };
                let document = CartDocument::from(initial.clone());
                if let Err(e) = write_as(
                    self.documents.as_ref(),
                    collections::CARTS,
                    &doc_id,
                    &document,
                )
                .await
                {
                    warn!(error = %e, "Failed to create remote cart, keeping local cart");
                    return &self.cart;
                }
                (initial, false)
            }
        };

        self.cart = next;
        self.write_local();
        if needs_write_back {
            self.outbox.enqueue(&identity.uid, &self.cart);
        }
        info!(
            lines = self.cart.len(),
            policy = ?self.policy,
            "Loaded cart for identity"
        );
        &self.cart
    }

    /// React to an identity provider event.
    ///
    /// A new identity triggers [`load_for_identity`](Self::load_for_identity);
    /// the identity already bound is ignored; `None` (sign-out) detaches the
    /// remote binding and keeps the cart local-only.
    pub async fn handle_identity_change(&mut self, next: Option<Identity>) {
        match next {
            Some(identity) if self.identity.as_ref() == Some(&identity) => {}
            Some(identity) => {
                self.load_for_identity(&identity).await;
            }
            None => {
                if let Some(previous) = self.identity.take() {
                    info!(user_id = %previous.uid, "Signed out, cart is now local-only");
                }
            }
        }
    }

    /// Wait for the next identity event and apply it.
    ///
    /// Returns `false` once the identity provider has gone away.
    pub async fn follow(&mut self, events: &mut watch::Receiver<Option<Identity>>) -> bool {
        if events.changed().await.is_err() {
            return false;
        }
        let next = events.borrow_and_update().clone();
        self.handle_identity_change(next).await;
        true
    }

    /// Apply an identity event if one arrived since the last check.
    pub async fn catch_up(&mut self, events: &mut watch::Receiver<Option<Identity>>) {
        if events.has_changed().unwrap_or(false) {
            let next = events.borrow_and_update().clone();
            self.handle_identity_change(next).await;
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product_id`, creating its line if needed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the catalog has no such
    /// product; nothing is changed in that case.
    #[instrument(skip(self, catalog), fields(product_id = %product_id))]
    pub fn add_or_increment(
        &mut self,
        product_id: &ProductId,
        catalog: &dyn Catalog,
    ) -> Result<&CartLine, CartError> {
        let product = catalog
            .find(product_id)
            .ok_or_else(|| CartError::ProductNotFound(product_id.clone()))?;

        let index = self
            .cart
            .increment_or_push(product_id.clone(), product.name, product.price);
        self.persist();
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));

        let len = self.cart.len();
        self.cart
            .get(index)
            .ok_or(CartError::IndexOutOfBounds {
                index,
                len,
            })
    }

    /// Apply `delta` to the quantity of the line at `index`.
    ///
    /// A resulting quantity of zero or below removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::IndexOutOfBounds` for an invalid index; nothing is
    /// persisted in that case.
    #[instrument(skip(self))]
    pub fn set_quantity(&mut self, index: usize, delta: i64) -> Result<QuantityChange, CartError> {
        let change = self.cart.adjust_quantity(index, delta)?;
        self.persist();
        Ok(change)
    }

    /// Remove the line at `index` whatever its quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::IndexOutOfBounds` for an invalid index; nothing is
    /// persisted in that case.
    #[instrument(skip(self))]
    pub fn remove_at(&mut self, index: usize) -> Result<CartLine, CartError> {
        let removed = self.cart.remove_at(index)?;
        self.persist();
        Ok(removed)
    }

    /// Empty the cart, e.g. after an order was placed.
    #[instrument(skip(self))]
    pub fn clear(&mut self) {
        self.cart.clear();
        self.persist();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.cart.total_count()
    }

    /// Sum of `price * quantity`, rounded to two decimal places.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.cart.total_price()
    }

    /// The current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    /// The identity the cart is bound to, if signed in.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The outbox carrying remote writes.
    #[must_use]
    pub const fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    fn persist(&self) {
        self.write_local();
        if let Some(identity) = &self.identity {
            self.outbox.enqueue(&identity.uid, &self.cart);
        }
    }

    fn write_local(&self) {
        let blob = match serde_json::to_string(&self.cart) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cart");
                return;
            }
        };
        if let Err(e) = self.cache.set(keys::CART, &blob) {
            warn!(error = %e, "Failed to write cart to local cache");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use corewell_core::{Email, UserId};

    use super::*;
    use crate::cache::MemoryCache;
    use crate::cart::OutboxConfig;
    use crate::catalog::StaticCatalog;
    use crate::documents::MemoryDocumentStore;

    struct Harness {
        cache: Arc<MemoryCache>,
        documents: Arc<MemoryDocumentStore>,
        catalog: StaticCatalog,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                cache: Arc::new(MemoryCache::new()),
                documents: Arc::new(MemoryDocumentStore::new()),
                catalog: StaticCatalog::corewell(),
            }
        }

        fn store(&self, policy: LoginPolicy) -> CartStore {
            let outbox = Outbox::new(self.documents.clone(), OutboxConfig::default());
            let mut store =
                CartStore::new(self.cache.clone(), self.documents.clone(), outbox, policy);
            store.load();
            store
        }

        fn cached_blob(&self) -> Option<String> {
            self.cache.get(keys::CART).unwrap()
        }

        async fn seed_remote(&self, uid: &str, ids: &[&str]) {
            let mut cart = Cart::new();
            for id in ids {
                let product = self.catalog.find(&ProductId::new(*id)).unwrap();
                cart.increment_or_push(product.id, product.name, product.price);
            }
            write_as(
                self.documents.as_ref(),
                collections::CARTS,
                &DocumentId::new(uid),
                &CartDocument::from(cart),
            )
            .await
            .unwrap();
        }

        async fn remote(&self, uid: &str) -> Option<Cart> {
            read_as::<CartDocument>(
                self.documents.as_ref(),
                collections::CARTS,
                &DocumentId::new(uid),
            )
            .await
            .unwrap()
            .map(|doc| doc.items)
        }
    }

    fn identity(uid: &str) -> Identity {
        Identity {
            uid: UserId::new(uid),
            email: Email::parse("buyer@corewell.co.za").unwrap(),
        }
    }

    fn add(store: &mut CartStore, harness: &Harness, id: &str) -> Result<CartLine, CartError> {
        store
            .add_or_increment(&ProductId::new(id), &harness.catalog)
            .cloned()
    }

    #[test]
    fn test_load_missing_cache_is_empty() {
        let harness = Harness::new();
        let store = harness.store(LoginPolicy::Replace);
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_load_corrupt_cache_is_empty() {
        let harness = Harness::new();
        harness.cache.set(keys::CART, "{not json").unwrap();
        assert!(harness.store(LoginPolicy::Replace).cart().is_empty());

        harness.cache.set(keys::CART, "null").unwrap();
        assert!(harness.store(LoginPolicy::Replace).cart().is_empty());
    }

    #[test]
    fn test_add_twice_makes_one_line() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        add(&mut store, &harness, "glow-boost").unwrap();
        let line = add(&mut store, &harness, "glow-boost").unwrap();

        assert_eq!(line.quantity, 2);
        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.total_count(), 2);
        assert_eq!(store.total_price(), Decimal::new(11_998, 2));
    }

    #[test]
    fn test_unknown_product_changes_nothing() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        let err = add(&mut store, &harness, "mystery-pill").unwrap_err();
        assert_eq!(err, CartError::ProductNotFound(ProductId::new("mystery-pill")));
        assert!(store.cart().is_empty());
        assert!(harness.cached_blob().is_none());
    }

    #[test]
    fn test_mutations_write_local_cache() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        add(&mut store, &harness, "iron-boost").unwrap();

        let cached: Cart = serde_json::from_str(&harness.cached_blob().unwrap()).unwrap();
        assert_eq!(&cached, store.cart());
    }

    #[test]
    fn test_reload_roundtrip() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        for id in ["iron-boost", "glow-boost", "iron-boost", "colon-cleanse"] {
            add(&mut store, &harness, id).unwrap();
        }

        let reloaded = harness.store(LoginPolicy::Replace);
        assert_eq!(reloaded.cart(), store.cart());
    }

    #[test]
    fn test_set_quantity_to_zero_removes_and_shifts() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        for id in ["glow-boost", "colon-cleanse", "iron-boost"] {
            add(&mut store, &harness, id).unwrap();
        }

        let change = store.set_quantity(0, -1).unwrap();
        assert!(matches!(change, QuantityChange::Removed(_)));
        assert_eq!(store.lines().len(), 2);
        assert_eq!(store.lines()[0].id.as_str(), "colon-cleanse");
        assert_eq!(store.lines()[1].id.as_str(), "iron-boost");
    }

    #[test]
    fn test_out_of_bounds_is_not_persisted() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        add(&mut store, &harness, "glow-boost").unwrap();
        let before = harness.cached_blob();

        assert!(matches!(
            store.set_quantity(5, 1),
            Err(CartError::IndexOutOfBounds { index: 5, len: 1 })
        ));
        assert_eq!(harness.cached_blob(), before);
    }

    #[test]
    fn test_remove_twice_fails() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        add(&mut store, &harness, "glow-boost").unwrap();

        store.remove_at(0).unwrap();
        assert!(matches!(
            store.remove_at(0),
            Err(CartError::IndexOutOfBounds { index: 0, len: 0 })
        ));
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_clear_leaves_empty_array_in_cache() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        for id in ["glow-boost", "colon-cleanse", "iron-boost"] {
            add(&mut store, &harness, id).unwrap();
        }

        store.clear();
        assert_eq!(store.total_count(), 0);
        assert_eq!(store.lines().len(), 0);
        assert_eq!(harness.cached_blob().as_deref(), Some("[]"));
    }

    #[test]
    fn test_anonymous_mutations_skip_remote() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        add(&mut store, &harness, "glow-boost").unwrap();
        assert_eq!(store.outbox().pending(), 0);
    }

    #[tokio::test]
    async fn test_identified_mutations_reach_remote() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        store.load_for_identity(&identity("u1")).await;

        add(&mut store, &harness, "glow-boost").unwrap();
        add(&mut store, &harness, "iron-boost").unwrap();
        assert_eq!(store.outbox().pending(), 1);

        store.outbox().flush().await;
        assert_eq!(harness.remote("u1").await.unwrap(), store.cart().clone());
    }

    #[tokio::test]
    async fn test_login_replaces_anonymous_cart() {
        let harness = Harness::new();
        harness.seed_remote("u1", &["iron-boost"]).await;
        let mut store = harness.store(LoginPolicy::Replace);
        add(&mut store, &harness, "glow-boost").unwrap();
        add(&mut store, &harness, "colon-cleanse").unwrap();

        store.load_for_identity(&identity("u1")).await;

        let remote = harness.remote("u1").await.unwrap();
        assert_eq!(store.cart(), &remote);
        let cached: Cart = serde_json::from_str(&harness.cached_blob().unwrap()).unwrap();
        assert_eq!(cached, remote);
    }

    #[tokio::test]
    async fn test_login_without_remote_creates_empty() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        add(&mut store, &harness, "glow-boost").unwrap();

        store.load_for_identity(&identity("u2")).await;

        assert!(store.cart().is_empty());
        assert_eq!(harness.remote("u2").await, Some(Cart::new()));
        assert_eq!(harness.cached_blob().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_login_failure_keeps_cart() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);
        add(&mut store, &harness, "glow-boost").unwrap();
        let before = store.cart().clone();

        harness.documents.set_offline(true);
        store.load_for_identity(&identity("u3")).await;

        assert_eq!(store.cart(), &before);
        assert_eq!(store.identity().map(|i| i.uid.as_str()), Some("u3"));
    }

    #[tokio::test]
    async fn test_merge_policy_sums_and_writes_back() {
        let harness = Harness::new();
        harness.seed_remote("u1", &["iron-boost", "glow-boost"]).await;
        let mut store = harness.store(LoginPolicy::Merge);
        add(&mut store, &harness, "glow-boost").unwrap();
        add(&mut store, &harness, "colon-cleanse").unwrap();

        store.load_for_identity(&identity("u1")).await;
        let summary: Vec<_> = store
            .lines()
            .iter()
            .map(|l| (l.id.as_str(), l.quantity))
            .collect();
        assert_eq!(
            summary,
            [("iron-boost", 1), ("glow-boost", 2), ("colon-cleanse", 1)]
        );

        store.outbox().flush().await;
        assert_eq!(harness.remote("u1").await.unwrap(), store.cart().clone());
    }

    #[tokio::test]
    async fn test_follow_applies_sign_in_and_sign_out() {
        let harness = Harness::new();
        harness.seed_remote("u1", &["iron-boost"]).await;
        let mut store = harness.store(LoginPolicy::Replace);
        let (tx, mut rx) = watch::channel(None);

        tx.send_replace(Some(identity("u1")));
        assert!(store.follow(&mut rx).await);
        assert_eq!(store.lines().len(), 1);

        tx.send_replace(None);
        assert!(store.follow(&mut rx).await);
        assert!(store.identity().is_none());

        add(&mut store, &harness, "glow-boost").unwrap();
        assert_eq!(store.outbox().pending(), 0);
        assert_eq!(store.lines().len(), 2);

        drop(tx);
        assert!(!store.follow(&mut rx).await);
    }

    #[tokio::test]
    async fn test_relogin_before_delivery_keeps_latest_cart() {
        let harness = Harness::new();
        let mut store = harness.store(LoginPolicy::Replace);

        store.handle_identity_change(Some(identity("u1"))).await;
        add(&mut store, &harness, "glow-boost").unwrap();
        store.handle_identity_change(None).await;
        store.handle_identity_change(Some(identity("u1"))).await;

        assert_eq!(store.lines().len(), 1);
        store.outbox().flush().await;
        assert_eq!(harness.remote("u1").await.unwrap(), store.cart().clone());

        let cached: Cart = serde_json::from_str(&harness.cached_blob().unwrap()).unwrap();
        assert_eq!(&cached, store.cart());
    }

    #[test]
    fn test_total_of_oversized_cached_price_does_not_panic() {
        let harness = Harness::new();
        harness
            .cache
            .set(
                keys::CART,
                r#"[{"id":"a","name":"A","price":"79228162514264337593543950335","quantity":2}]"#,
            )
            .unwrap();
        let store = harness.store(LoginPolicy::Replace);

        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.total_price(), Decimal::MAX);
    }
}
