//! # Analysis Cache
//!
//! Short-lived copies of recent analyses keyed by id, so follow-up requests
//! (ingredients, nutrition, reviews, chat) skip the store. Entries expire
//! after a fixed time-to-live and are invalidated whenever the store is
//! written for the same id.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ingredient_model::ProductAnalysis;

/// Default time-to-live for cached analyses
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;

pub struct AnalysisCache {
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, (Instant, ProductAnalysis)>>,
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached analysis, if present and not expired
    pub async fn get(&self, id: Uuid) -> Option<ProductAnalysis> {
        {
            let entries = self.entries.read().await;
            match entries.get(&id) {
                Some((stored_at, analysis)) if stored_at.elapsed() < self.ttl => {
                    debug!("Cache hit for analysis {id}");
                    return Some(analysis.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it so the map does not grow without bound
        self.entries.write().await.remove(&id);
        debug!("Cache entry for analysis {id} expired");
        None
    }

    /// Cache an analysis, dropping any expired entries first
    pub async fn insert(&self, analysis: ProductAnalysis) {
        let mut entries = self.entries.write().await;
        let purged = self.retain_fresh(&mut entries);
        if purged > 0 {
            debug!("Purged {purged} expired cache entries");
        }
        entries.insert(analysis.id, (Instant::now(), analysis));
    }

    pub async fn invalidate(&self, id: Uuid) {
        if self.entries.write().await.remove(&id).is_some() {
            debug!("Invalidated cached analysis {id}");
        }
    }

    /// Remove every expired entry, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        self.retain_fresh(&mut entries)
    }

    fn retain_fresh(&self, entries: &mut HashMap<Uuid, (Instant, ProductAnalysis)>) -> usize {
        let before = entries.len();
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_extractor::extract_fields;

    fn analysis() -> ProductAnalysis {
        ProductAnalysis::new("Granola Bar", "A bar", extract_fields("Granola Bar"))
    }

    #[tokio::test]
    async fn test_insert_get_invalidate() {
        let cache = AnalysisCache::default();
        let analysis = analysis();
        let id = analysis.id;

        cache.insert(analysis.clone()).await;
        assert_eq!(cache.get(id).await, Some(analysis));

        cache.invalidate(id).await;
        assert_eq!(cache.get(id).await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = AnalysisCache::new(Duration::from_millis(20));
        let analysis = analysis();
        let id = analysis.id;
        cache.insert(analysis).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get(id).await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = AnalysisCache::new(Duration::from_millis(20));
        cache.insert(analysis()).await;
        cache.insert(analysis()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.purge_expired().await, 2);
    }

    #[tokio::test]
    async fn test_insert_drops_stale_entries() {
        let cache = AnalysisCache::new(Duration::from_millis(20));
        let stale = analysis();
        let stale_id = stale.id;
        cache.insert(stale).await;
        cache.insert(analysis()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        // Never read again, yet gone once something new is cached
        let fresh = analysis();
        let fresh_id = fresh.id;
        cache.insert(fresh).await;
        assert_eq!(cache.len().await, 1);
        assert!(cache.get(fresh_id).await.is_some());
        assert!(cache.get(stale_id).await.is_none());
    }
}
