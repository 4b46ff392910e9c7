//! Redis integration for Folio.
//!
//! [`RedisStore`] implements [`KeyValueStore`](folio_core::KeyValueStore) on
//! top of a multiplexed async connection. Expiration is delegated to Redis
//! (`SET key value EX ttl`).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use folio_redis::{RedisStore, RedisStoreConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisStore::from_url("redis://127.0.0.1:6379")?;
//!
//! // Namespaced under "folio:" so keys read "folio:book:<id>".
//! let config = RedisStoreConfig { prefix: "folio:".to_string() };
//! let store = RedisStore::from_url_with_config("redis://127.0.0.1:6379", config)?;
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::{RedisStore, RedisStoreConfig, DEFAULT_REDIS_URL};

pub use folio_core::KeyValueStore;
