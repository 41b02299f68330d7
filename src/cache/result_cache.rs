use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{oneshot, RwLock};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::introspection::result::Introspection;

/// Storage for introspection results keyed by the raw token.
pub trait ResultCache: Send + Sync + 'static {
    /// Pure lookup. Never performs I/O and never calls the authority.
    fn get(&self, token: &str) -> impl Future<Output = Option<Arc<Introspection>>> + Send;

    /// Insert or replace the entry for `token`, expiring it after `ttl`.
    fn store(
        &self,
        token: &str,
        result: Arc<Introspection>,
        ttl: Duration,
    ) -> impl Future<Output = ()> + Send;
}

#[derive(Debug)]
struct Entry {
    result: Arc<Introspection>,
    /// None when `now + ttl` is not representable
    expires_at: Option<Instant>,
    generation: u64,
    eviction: AbortHandle,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: RwLock<HashMap<String, Entry>>,
    generation: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for entry in self.entries.get_mut().values() {
            entry.eviction.abort();
        }
    }
}

/// Process-local TTL cache. One eviction task per stored token; storing the
/// same token again cancels the pending task and schedules a new one.
///
/// `store` spawns onto the current tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    inner: Arc<Inner>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired-but-not-yet-evicted included.
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl ResultCache for InMemoryCache {
    async fn get(&self, token: &str) -> Option<Arc<Introspection>> {
        let entries = self.inner.entries.read().await;
        entries
            .get(token)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.result.clone())
    }

    async fn store(&self, token: &str, result: Arc<Introspection>, ttl: Duration) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let (inserted_tx, inserted) = oneshot::channel();
        let eviction = tokio::spawn(evict_after(
            Arc::downgrade(&self.inner),
            token.to_owned(),
            generation,
            ttl,
            inserted,
        ))
        .abort_handle();

        let entry = Entry {
            result,
            expires_at: Instant::now().checked_add(ttl),
            generation,
            eviction,
        };
        let previous = self.inner.entries.write().await.insert(token.to_owned(), entry);
        let _ = inserted_tx.send(());

        if let Some(previous) = previous {
            previous.eviction.abort();
        }
    }
}

async fn evict_after(
    inner: Weak<Inner>,
    token: String,
    generation: u64,
    ttl: Duration,
    inserted: oneshot::Receiver<()>,
) {
    tokio::time::sleep(ttl).await;
    // store was cancelled before its insert
    if inserted.await.is_err() {
        return;
    }

    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut entries = inner.entries.write().await;
    // a later store owns the slot now
    if entries
        .get(&token)
        .is_some_and(|entry| entry.generation == generation)
    {
        entries.remove(&token);
        debug!(remaining = entries.len(), "evicted expired introspection result");
    }
}
