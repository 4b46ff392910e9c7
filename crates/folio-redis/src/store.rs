use async_trait::async_trait;
use folio_core::{FolioError, KeyValueStore};
use redis::AsyncCommands;

/// Address used when no Redis URL is configured.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Configuration for [`RedisStore`].
#[derive(Debug, Clone, Default)]
pub struct RedisStoreConfig {
    /// Prepended to every key. Empty by default, so `book:<id>` is stored as-is.
    pub prefix: String,
}

/// Redis-backed [`KeyValueStore`].
pub struct RedisStore {
    client: redis::Client,
    config: RedisStoreConfig,
}

impl RedisStore {
    /// Create a new `RedisStore` with an existing Redis client and configuration.
    pub fn new(client: redis::Client, config: RedisStoreConfig) -> Self {
        Self { client, config }
    }

    /// Create a new `RedisStore` from a Redis URL with default configuration.
    ///
    /// Only the URL is validated here; the connection is opened lazily.
    pub fn from_url(url: &str) -> Result<Self, FolioError> {
        Self::from_url_with_config(url, RedisStoreConfig::default())
    }

    /// Create a new `RedisStore` from a Redis URL with custom configuration.
    pub fn from_url_with_config(url: &str, config: RedisStoreConfig) -> Result<Self, FolioError> {
        let client = redis::Client::open(url)
            .map_err(|e| FolioError::Cache(format!("invalid Redis URL: {e}")))?;
        Ok(Self { client, config })
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{key}", self.config.prefix)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, FolioError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| FolioError::Cache(format!("Redis connection error: {e}")))
    }

    /// Round-trip a `PING`, used at startup to fail fast on a bad address.
    pub async fn ping(&self) -> Result<(), FolioError> {
        let mut con = self.get_connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut con)
            .await
            .map_err(|e| FolioError::Cache(format!("Redis PING error: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FolioError> {
        let mut con = self.get_connection().await?;
        let raw: Option<String> = con
            .get(self.redis_key(key))
            .await
            .map_err(|e| FolioError::Cache(format!("Redis GET error: {e}")))?;
        Ok(raw)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), FolioError> {
        let mut con = self.get_connection().await?;
        let _: () = con
            .set_ex(self.redis_key(key), value, ttl_secs)
            .await
            .map_err(|e| FolioError::Cache(format!("Redis SET EX error: {e}")))?;
        Ok(())
    }
}
