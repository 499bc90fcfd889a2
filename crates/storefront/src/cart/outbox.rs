//! Outbox for remote cart writes.
//!
//! Cart mutations must not wait on the network, so remote writes are queued
//! here and delivered by a background worker (or an explicit [`Outbox::flush`]).
//!
//! - Each remote write carries the complete cart, so only the newest snapshot
//!   per identity matters: enqueueing replaces any snapshot still waiting.
//! - Failed writes are retried with jittered exponential backoff up to
//!   [`OutboxConfig::max_attempts`], then dropped and reported.
//! - A single drainer runs at a time, so writes for one identity are applied
//!   in enqueue order and the store converges on the latest snapshot.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use corewell_core::{Cart, CartDocument, DocumentId, UserId, collections};

use crate::documents::{DocumentStore, write_as};

/// Retry behaviour for remote cart writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboxConfig {
    /// Attempts per snapshot, including the first one.
    pub max_attempts: u32,
    /// Delay cap for the first retry; doubles per attempt.
    pub base_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl OutboxConfig {
    /// Jittered delay before retrying after `attempt` failed attempts.
    ///
    /// Drawn uniformly from `1ms..=min(base * 2^(attempt-1), max)`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let cap = self.base_backoff.saturating_mul(factor).min(self.max_backoff);
        let cap_ms = u64::try_from(cap.as_millis()).unwrap_or(u64::MAX).max(1);
        Duration::from_millis(rand::rng().random_range(1..=cap_ms))
    }
}

/// What a drain pass accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Snapshots written to the store.
    pub written: usize,
    /// Snapshots abandoned after exhausting their attempts.
    pub dropped: usize,
}

#[derive(Debug)]
struct Pending {
    cart: Cart,
    attempts: u32,
}

#[derive(Debug, Default)]
struct Queue {
    pending: HashMap<UserId, Pending>,
    order: VecDeque<UserId>,
}

struct Inner {
    documents: Arc<dyn DocumentStore>,
    config: OutboxConfig,
    queue: Mutex<Queue>,
    wake: Notify,
    drain_lock: tokio::sync::Mutex<()>,
}

/// Handle to the remote cart write queue. Cheap to clone.
#[derive(Clone)]
pub struct Outbox {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("config", &self.inner.config)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl Outbox {
    /// Create an outbox delivering to `documents`. No worker is started.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>, config: OutboxConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                documents,
                config,
                queue: Mutex::new(Queue::default()),
                wake: Notify::new(),
                drain_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.inner.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `cart` as the next remote state for `user`.
    ///
    /// Never blocks on I/O. A snapshot still waiting for `user` is replaced.
    pub fn enqueue(&self, user: &UserId, cart: &Cart) {
        {
            let mut queue = self.queue();
            let previous = queue.pending.insert(
                user.clone(),
                Pending {
                    cart: cart.clone(),
                    attempts: 0,
                },
            );
            if previous.is_some() {
                debug!(user_id = %user, "Collapsed pending cart write");
            } else {
                queue.order.push_back(user.clone());
            }
        }
        self.inner.wake.notify_one();
    }

    /// Number of identities with a snapshot waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue().pending.len()
    }

    /// Withdraw the snapshot still queued for `user`, if any.
    ///
    /// Waits for a running delivery pass to finish first, so afterwards no
    /// write for `user` is in flight. A returned cart is newer than whatever
    /// the store holds for `user`.
    pub async fn take_pending(&self, user: &UserId) -> Option<Cart> {
        let _guard = self.inner.drain_lock.lock().await;
        let mut queue = self.queue();
        queue.order.retain(|queued| queued != user);
        queue.pending.remove(user).map(|pending| pending.cart)
    }

    /// Start the background worker on the current tokio runtime.
    ///
    /// The worker runs until the returned handle is aborted.
    #[must_use]
    pub fn spawn(&self) -> JoinHandle<()> {
        let outbox = self.clone();
        tokio::spawn(async move {
            loop {
                outbox.inner.wake.notified().await;
                let report = outbox.drain().await;
                if report != FlushReport::default() {
                    debug!(
                        written = report.written,
                        dropped = report.dropped,
                        "Outbox drained"
                    );
                }
            }
        })
    }

    /// Deliver everything queued, including retries, before returning.
    ///
    /// Waits for a running worker pass to finish first.
    pub async fn flush(&self) -> FlushReport {
        self.drain().await
    }

    async fn drain(&self) -> FlushReport {
        let _guard = self.inner.drain_lock.lock().await;
        let mut report = FlushReport::default();
        while let Some((user, pending)) = self.take_next() {
            self.deliver(user, pending, &mut report).await;
        }
        report
    }

    fn take_next(&self) -> Option<(UserId, Pending)> {
        let mut queue = self.queue();
        while let Some(user) = queue.order.pop_front() {
            if let Some(pending) = queue.pending.remove(&user) {
                return Some((user, pending));
            }
        }
        None
    }

    fn is_superseded(&self, user: &UserId) -> bool {
        self.queue().pending.contains_key(user)
    }

    async fn deliver(&self, user: UserId, mut pending: Pending, report: &mut FlushReport) {
        let doc_id = DocumentId::new(user.as_str());
        let document = CartDocument::from(pending.cart);
        let config = self.inner.config;

        loop {
            pending.attempts += 1;
            let result = write_as(
                self.inner.documents.as_ref(),
                collections::CARTS,
                &doc_id,
                &document,
            )
            .await;

            let err = match result {
                Ok(()) => {
                    debug!(user_id = %user, attempt = pending.attempts, "Remote cart written");
                    report.written += 1;
                    return;
                }
                Err(err) => err,
            };

            if pending.attempts >= config.max_attempts {
                error!(
                    user_id = %user,
                    attempts = pending.attempts,
                    error = %err,
                    "Giving up on remote cart write"
                );
                sentry::capture_error(&err);
                report.dropped += 1;
                return;
            }

            let backoff = config.backoff(pending.attempts);
            warn!(
                user_id = %user,
                attempt = pending.attempts,
                max_attempts = config.max_attempts,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Remote cart write failed, retrying"
            );
            tokio::time::sleep(backoff).await;

            if self.is_superseded(&user) {
                debug!(user_id = %user, "Retry superseded by newer cart snapshot");
                return;
            }
        }
    }
}
