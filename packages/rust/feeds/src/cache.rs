//! Short-lived cache of fetched feed bodies, keyed by request URL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Response bodies reused for a refresh window so that bursts of trigger
/// polls do not hammer the wiki.
pub struct FeedCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl FeedCache {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh cached body for `key`, evicting it if it has expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut entries = self.entries.lock().await;
        let lookup = entries
            .get(key)
            .map(|(stored_at, body)| (stored_at.elapsed() < self.ttl, body.clone()));
        match lookup {
            Some((true, body)) => Some(body),
            Some((false, _)) => {
                debug!(key, "cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, key: impl Into<String>, body: String) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        entries.insert(key.into(), (Instant::now(), body));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_returns_bodies() {
        let cache = FeedCache::new(Duration::from_secs(60));
        assert!(cache.get("a").await.is_none());
        cache.put("a", "body".to_string()).await;
        assert_eq!(cache.get("a").await.as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn zero_ttl_disables_cache() {
        let cache = FeedCache::new(Duration::ZERO);
        cache.put("a", "body".to_string()).await;
        assert!(cache.get("a").await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_dropped() {
        let cache = FeedCache::new(Duration::from_millis(20));
        cache.put("a", "body".to_string()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get("a").await.is_none());
    }
}
