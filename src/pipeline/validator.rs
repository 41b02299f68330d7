use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::HeaderMap;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::cache::result_cache::{InMemoryCache, ResultCache};
use crate::config::options::IntrospectionConfig;
use crate::introspection::client::introspect;
use crate::observability::metrics::get_metrics;
use crate::pipeline::extract::extract_token;
use crate::pipeline::outcome::Outcome;

type InFlight = Arc<OnceCell<Outcome>>;
type InFlightMap = Mutex<HashMap<String, InFlight>>;

/// Per-request entry point: cache lookup, then introspection, then cache store.
///
/// Concurrent misses for the same token share one outbound call. Only
/// successful introspections (active or not) are cached; errors never are.
#[derive(Debug)]
pub struct Validator<C = InMemoryCache> {
    config: Arc<IntrospectionConfig<C>>,
    in_flight: Arc<InFlightMap>,
}

impl<C> Clone for Validator<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<C: ResultCache> Validator<C> {
    pub fn new(config: IntrospectionConfig<C>) -> Self {
        Self {
            config: Arc::new(config),
            in_flight: Arc::new(InFlightMap::default()),
        }
    }

    pub fn config(&self) -> &IntrospectionConfig<C> {
        &self.config
    }

    pub async fn validate(&self, token: &str) -> Outcome {
        if let Some(cache) = self.config.cache() {
            let metrics = get_metrics().await;
            if let Some(hit) = cache.get(token).await {
                metrics.cache_lookups.with_label_values(&["hit"]).inc();
                debug!(active = hit.is_active(), "introspection cache hit");
                return Ok(hit);
            }
            metrics.cache_lookups.with_label_values(&["miss"]).inc();
        }
        self.introspect_coalesced(token).await
    }

    /// Extract the bearer token from `headers` and validate it.
    pub async fn validate_headers(&self, headers: &HeaderMap) -> Outcome {
        let token = extract_token(headers, None)?;
        self.validate(&token).await
    }

    async fn introspect_coalesced(&self, token: &str) -> Outcome {
        let metrics = get_metrics().await;
        let (guard, joined) = InFlightGuard::join(&self.in_flight, token);
        if joined {
            metrics.coalesced_waits.inc();
        }

        // a cancelled initializer hands the call over to the next waiter
        let outcome = guard
            .slot()
            .get_or_init(|| self.introspect_and_store(token))
            .await
            .clone();
        outcome
    }

    /// Tokens with an introspection currently in flight.
    pub(crate) fn in_flight_len(&self) -> usize {
        lock(&self.in_flight).len()
    }

    async fn introspect_and_store(&self, token: &str) -> Outcome {
        let result = Arc::new(introspect(token, &self.config).await?);
        if let Some(cache) = self.config.cache() {
            cache
                .store(token, result.clone(), self.config.cache_ttl())
                .await;
        }
        Ok(result)
    }
}

fn lock(in_flight: &InFlightMap) -> MutexGuard<'_, HashMap<String, InFlight>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One waiter's hold on a token's in-flight slot.
///
/// Dropping it releases the slot once the call has completed, or once the
/// last waiter is gone, so cancelled requests never leave an entry behind.
struct InFlightGuard<'a> {
    in_flight: &'a InFlightMap,
    token: &'a str,
    slot: Option<InFlight>,
}

impl<'a> InFlightGuard<'a> {
    /// Join the pending call for `token`, or open a new slot. `true` when joined.
    fn join(in_flight: &'a InFlightMap, token: &'a str) -> (Self, bool) {
        let mut map = lock(in_flight);
        let (slot, joined) = match map.get(token) {
            Some(slot) => (slot.clone(), true),
            None => {
                let slot = InFlight::default();
                map.insert(token.to_owned(), slot.clone());
                (slot, false)
            }
        };
        let guard = Self {
            in_flight,
            token,
            slot: Some(slot),
        };
        (guard, joined)
    }

    fn slot(&self) -> &OnceCell<Outcome> {
        match &self.slot {
            Some(slot) => slot,
            None => unreachable!("slot is only taken on drop"),
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        let completed = slot.initialized();
        let ptr = Arc::as_ptr(&slot);
        // own reference goes first so the last waiter sees a count of one
        drop(slot);

        let mut map = lock(self.in_flight);
        let release = map.get(self.token).is_some_and(|current| {
            Arc::as_ptr(current) == ptr && (completed || Arc::strong_count(current) == 1)
        });
        if release {
            map.remove(self.token);
        }
    }
}
