use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use folio_core::FolioError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::KeyValueStore;

struct StoreEntry {
    value: String,
    expires_at: Instant,
}

/// In-process key-value store with per-entry expiration.
///
/// Expired entries are treated as absent on read. They stay in memory until
/// the same key is written again or [`purge_expired`](Self::purge_expired)
/// runs; long-lived stores should run [`spawn_purger`](Self::spawn_purger).
pub struct InMemoryStore {
    store: RwLock<HashMap<String, StoreEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let store = self.store.read().await;
        store.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of entries held in memory, expired ones included.
    pub async fn stored_entries(&self) -> usize {
        self.store.read().await.len()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|_, entry| entry.expires_at > now);
        before - store.len()
    }

    /// Purge expired entries every `every` on a background task.
    ///
    /// The task holds only a weak reference and exits once the store is dropped.
    pub fn spawn_purger(store: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.purge_expired().await;
            }
        })
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FolioError> {
        let store = self.store.read().await;
        match store.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), FolioError> {
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or_else(|| FolioError::Cache(format!("TTL of {ttl_secs}s is out of range")))?;
        let mut store = self.store.write().await;
        store.insert(
            key.to_string(),
            StoreEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}
