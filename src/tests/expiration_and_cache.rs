#[cfg(test)]
mod test {

    use std::sync::Arc;
    use std::time::Duration;

    use crate::cache::result_cache::{InMemoryCache, ResultCache};
    use crate::introspection::result::Introspection;

    fn active_for(sub: &str) -> Arc<Introspection> {
        Arc::new(Introspection::new(true).with_field("sub", sub).unwrap())
    }

    #[tokio::test]
    async fn result_expires_after_ttl() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_millis(200);

        cache.store("short", active_for("alice"), ttl).await;

        let got = cache.get("short").await;
        assert!(got.is_some());
        assert_eq!(got.unwrap().sub().as_deref(), Some("alice"));

        tokio::time::sleep(ttl * 2).await;
        assert!(cache.get("short").await.is_none());
        assert!(cache.is_empty().await, "eviction task should have removed the entry");
    }

    #[tokio::test]
    async fn unknown_token_is_a_miss() {
        let cache = InMemoryCache::new();
        cache.store("known", active_for("alice"), Duration::from_secs(60)).await;

        assert!(cache.get("unknown").await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn restore_replaces_value_and_timer() {
        let cache = InMemoryCache::new();

        cache.store("tok", active_for("first"), Duration::from_millis(150)).await;
        cache.store("tok", active_for("second"), Duration::from_secs(5)).await;

        // the first timer would have fired by now
        tokio::time::sleep(Duration::from_millis(400)).await;

        let got = cache.get("tok").await.expect("entry must survive the superseded timer");
        assert_eq!(got.sub().as_deref(), Some("second"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn shorter_restore_expires_earlier() {
        let cache = InMemoryCache::new();

        cache.store("tok", active_for("first"), Duration::from_secs(5)).await;
        cache.store("tok", active_for("second"), Duration::from_millis(100)).await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(cache.get("tok").await.is_none());
    }

    #[tokio::test]
    async fn inactive_results_are_stored_like_active_ones() {
        let cache = InMemoryCache::new();
        cache
            .store("revoked", Arc::new(Introspection::new(false)), Duration::from_secs(60))
            .await;

        let got = cache.get("revoked").await.unwrap();
        assert!(!got.is_active());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_store_and_get() {
        let cache = InMemoryCache::new();

        let mut handles = Vec::new();
        for i in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let token = format!("token-{}", i);
                cache
                    .store(&token, active_for(&token), Duration::from_secs(60))
                    .await;
                cache.get(&token).await
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let got = handle.await.unwrap().expect("stored entry must be visible");
            assert_eq!(got.sub(), Some(format!("token-{}", i)));
        }
        assert_eq!(cache.len().await, 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_store_and_get_on_one_token() {
        let cache = InMemoryCache::new();
        let writers = 10;
        let rounds = 20;

        let mut handles = Vec::new();
        for w in 0..writers {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for r in 0..rounds {
                    let value = Introspection::new(true)
                        .with_field("sub", format!("writer-{}-round-{}", w, r))
                        .unwrap()
                        .with_field("round", r)
                        .unwrap();
                    cache.store("key", Arc::new(value), Duration::from_secs(60)).await;

                    let got = cache.get("key").await.expect("a stored value must be visible");
                    // sub and round must come from the same store call
                    let sub = got.sub().expect("sub present");
                    let (writer, sub_round) = sub
                        .trim_start_matches("writer-")
                        .split_once("-round-")
                        .expect("sub shape");
                    let writer: u32 = writer.parse().unwrap();
                    let sub_round: u32 = sub_round.parse().unwrap();
                    let round: u32 = got.field("round").unwrap().unwrap();
                    assert!(writer < writers);
                    assert!(round < rounds);
                    assert_eq!(sub_round, round);
                    assert_eq!(got.field_count(), 2);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len().await, 1);
        let last = cache.get("key").await.unwrap();
        assert!(last.is_active());
    }

    #[tokio::test]
    async fn zero_ttl_entry_is_never_served_and_gets_evicted() {
        let cache = InMemoryCache::new();
        cache.store("gone", active_for("alice"), Duration::ZERO).await;

        assert!(cache.get("gone").await.is_none());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_empty().await);
    }
}
