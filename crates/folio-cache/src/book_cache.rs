use std::sync::Arc;

use folio_core::{
    BookId, CachedBook, EnrichedBook, EventSink, FolioError, KeyValueStore, PipelineEvent,
    DEFAULT_CACHE_TTL_SECS, MAX_CACHE_TTL_SECS,
};

/// Configuration for [`BookCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookCacheConfig {
    /// Prepended to the identifier to form the storage key. Defaults to `"book:"`.
    pub key_prefix: String,
    /// Lifetime of positive and negative entries. Defaults to 24 hours.
    pub ttl_secs: u64,
}

impl Default for BookCacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "book:".to_string(),
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl BookCacheConfig {
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// The TTL must lie in `1..=MAX_CACHE_TTL_SECS`; Redis refuses `EX 0`.
    pub fn validate(&self) -> Result<(), FolioError> {
        if (1..=MAX_CACHE_TTL_SECS).contains(&self.ttl_secs) {
            Ok(())
        } else {
            Err(FolioError::Config(format!(
                "cache TTL must be between 1 and {MAX_CACHE_TTL_SECS} seconds, got {}",
                self.ttl_secs
            )))
        }
    }
}

/// Typed gateway over a [`KeyValueStore`] for enriched books.
///
/// Hides the storage encoding: callers see [`CachedBook`] values, never the
/// raw sentinel string.
#[derive(Clone)]
pub struct BookCache {
    store: Arc<dyn KeyValueStore>,
    config: BookCacheConfig,
    events: EventSink,
}

impl BookCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: BookCacheConfig, events: EventSink) -> Self {
        Self {
            store,
            config,
            events,
        }
    }

    pub fn config(&self) -> &BookCacheConfig {
        &self.config
    }

    /// Storage key for a book.
    pub fn key(&self, id: &BookId) -> String {
        format!("{}{id}", self.config.key_prefix)
    }

    /// Read and decode the entry for `id`. Backend failures and undecodable
    /// entries surface as [`FolioError::Cache`].
    pub async fn get(&self, id: &BookId) -> Result<Option<CachedBook>, FolioError> {
        let key = self.key(id);
        let Some(raw) = self.store.get(&key).await? else {
            self.events.emit(PipelineEvent::CacheMiss { key }).await;
            return Ok(None);
        };

        let cached = CachedBook::decode(&raw)?;
        let event = match cached {
            CachedBook::Absent => PipelineEvent::NegativeCacheHit { key },
            CachedBook::Present(_) => PipelineEvent::CacheHit { key },
        };
        self.events.emit(event).await;
        Ok(Some(cached))
    }

    pub async fn put(&self, id: &BookId, value: &CachedBook) -> Result<(), FolioError> {
        let negative = matches!(value, CachedBook::Absent);
        self.write(id, value.encode()?, negative).await
    }

    pub async fn put_book(&self, id: &BookId, book: &EnrichedBook) -> Result<(), FolioError> {
        self.write(id, CachedBook::encode_book(book)?, false).await
    }

    /// Record a confirmed absence for `id`.
    pub async fn put_not_found(&self, id: &BookId) -> Result<(), FolioError> {
        self.put(id, &CachedBook::Absent).await
    }

    async fn write(&self, id: &BookId, encoded: String, negative: bool) -> Result<(), FolioError> {
        self.config.validate()?;
        let key = self.key(id);
        self.store.set(&key, &encoded, self.config.ttl_secs).await?;
        self.events
            .emit(PipelineEvent::CacheWrite {
                key,
                negative,
                ttl_secs: self.config.ttl_secs,
            })
            .await;
        Ok(())
    }
}
