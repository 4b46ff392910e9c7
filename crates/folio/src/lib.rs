//! Folio: public-domain book retrieval with AI literary enrichment.
//!
//! This crate re-exports the Folio sub-crates for single-import usage.
//! Enable features to control which modules are available.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `callbacks`, `cache`, `service` |
//! | `redis` | Redis-backed `KeyValueStore` |
//! | `model-utils` | `ProviderBackend` (HTTP + fake), structured output helpers |
//! | `gutenberg` | Project Gutenberg content source |
//! | `openai` | OpenAI two-stage enricher |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use folio::cache::{BookCache, BookCacheConfig, InMemoryStore};
//! use folio::core::{EventSink, FolioError};
//! use folio::service::BookService;
//! ```

/// Data model, gateway traits, `FolioError`, pipeline events. Always available.
pub use folio_core as core;

/// Tracing, recording and composite callback handlers.
#[cfg(feature = "callbacks")]
pub use folio_callbacks as callbacks;

/// `InMemoryStore` and the typed `BookCache` gateway.
#[cfg(feature = "cache")]
pub use folio_cache as cache;

/// `BookService`, the retrieval orchestrator.
#[cfg(feature = "service")]
pub use folio_service as service;

/// Redis `KeyValueStore`.
#[cfg(feature = "redis")]
pub use folio_redis as redis;

/// `ProviderBackend` abstraction and structured output helpers.
#[cfg(feature = "model-utils")]
pub use folio_models as models;

/// Project Gutenberg `ContentSource`.
#[cfg(feature = "gutenberg")]
pub use folio_gutenberg as gutenberg;

/// OpenAI `Enricher`.
#[cfg(feature = "openai")]
pub use folio_openai as openai;
