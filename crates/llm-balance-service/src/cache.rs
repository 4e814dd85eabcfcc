//! In-memory TTL cache of normalized balances.
//!
//! Entries are keyed by provider and the SHA-256 fingerprint of the key, so
//! the raw key is never held in memory longer than the request that carried
//! it. Expired entries are treated as absent and purged on the next insert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use llm_balance_core::{ApiKey, NormalizedBalance, ProviderKind};

use crate::crypto::key_fingerprint;

/// Cache key: one entry per provider and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    provider: ProviderKind,
    fingerprint: String,
}

impl CacheKey {
    /// Build the cache key for `key` at `provider`.
    #[must_use]
    pub fn new(provider: ProviderKind, key: &ApiKey) -> Self {
        Self {
            provider,
            fingerprint: key_fingerprint(key),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    balance: NormalizedBalance,
    inserted_at: Instant,
}

/// Cache statistics, reported by the detailed health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Live entry count (expired entries not yet purged included).
    pub entries: usize,
    /// Capacity.
    pub max_entries: usize,
    /// Entry lifetime in seconds.
    pub ttl_seconds: u64,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that missed.
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub hit_rate: f64,
}

/// Balance cache with a fixed TTL and a bounded entry count.
#[derive(Debug)]
pub struct BalanceCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BalanceCache {
    /// Create a cache. A zero `ttl` or zero `max_entries` disables caching.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Whether lookups can ever hit.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero() && self.max_entries > 0
    }

    /// Look up a fresh entry.
    pub async fn get(&self, key: &CacheKey) -> Option<NormalizedBalance> {
        if !self.is_enabled() {
            return None;
        }

        let found = {
            let entries = self.entries.read().await;
            entries
                .get(key)
                .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
                .map(|entry| entry.balance.clone())
        };

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store a balance, replacing any previous entry for the same key.
    ///
    /// When full, expired entries are purged first and then the oldest
    /// entries are evicted.
    pub async fn insert(&self, key: CacheKey, balance: NormalizedBalance) {
        if !self.is_enabled() {
            return;
        }

        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

            while entries.len() >= self.max_entries {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                balance,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "Balance cache cleared");
    }

    /// Current statistics.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await.len();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };

        CacheStats {
            entries,
            max_entries: self.max_entries,
            ttl_seconds: self.ttl.as_secs(),
            hits,
            misses,
            hit_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> ApiKey {
        llm_balance_core::validate(raw).unwrap()
    }

    fn balance(amount: f64) -> NormalizedBalance {
        NormalizedBalance {
            balance: amount,
            ..NormalizedBalance::zeroed("CNY")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_fresh_entries() {
        let cache = BalanceCache::new(Duration::from_secs(300), 10);
        let k = CacheKey::new(ProviderKind::DeepSeek, &key("sk-validapikey1234567890"));

        assert!(cache.get(&k).await.is_none());
        cache.insert(k.clone(), balance(42.0)).await;
        assert_eq!(cache.get(&k).await.unwrap().balance, 42.0);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = BalanceCache::new(Duration::from_secs(300), 10);
        let k = CacheKey::new(ProviderKind::DeepSeek, &key("sk-validapikey1234567890"));
        cache.insert(k.clone(), balance(1.0)).await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&k).await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&k).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn providers_do_not_share_entries() {
        let cache = BalanceCache::new(Duration::from_secs(300), 10);
        let api_key = key("sk-validapikey1234567890");
        cache
            .insert(CacheKey::new(ProviderKind::DeepSeek, &api_key), balance(1.0))
            .await;

        assert!(cache
            .get(&CacheKey::new(ProviderKind::SiliconFlow, &api_key))
            .await
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_oldest_when_full() {
        let cache = BalanceCache::new(Duration::from_secs(300), 2);
        let a = CacheKey::new(ProviderKind::DeepSeek, &key("sk-aaaaaaaaaaaaaaaaaaaa1"));
        let b = CacheKey::new(ProviderKind::DeepSeek, &key("sk-bbbbbbbbbbbbbbbbbbbb2"));
        let c = CacheKey::new(ProviderKind::DeepSeek, &key("sk-cccccccccccccccccccc3"));

        cache.insert(a.clone(), balance(1.0)).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert(b.clone(), balance(2.0)).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert(c.clone(), balance(3.0)).await;

        assert!(cache.get(&a).await.is_none());
        assert!(cache.get(&b).await.is_some());
        assert!(cache.get(&c).await.is_some());
        assert_eq!(cache.stats().await.entries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_disables_cache() {
        let cache = BalanceCache::new(Duration::ZERO, 10);
        let k = CacheKey::new(ProviderKind::DeepSeek, &key("sk-validapikey1234567890"));

        cache.insert(k.clone(), balance(1.0)).await;
        assert!(!cache.is_enabled());
        assert!(cache.get(&k).await.is_none());
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache = BalanceCache::new(Duration::from_secs(300), 10);
        let k = CacheKey::new(ProviderKind::DeepSeek, &key("sk-validapikey1234567890"));
        cache.insert(k.clone(), balance(1.0)).await;

        cache.clear().await;
        assert!(cache.get(&k).await.is_none());
    }
}
