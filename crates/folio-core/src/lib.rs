use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "schemars")]
pub use schemars;

/// Literal cache value recording a confirmed-absent book.
pub const NOT_FOUND_SENTINEL: &str = "NOT_FOUND";

/// Default lifetime of both positive and negative cache entries (24 hours).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;

/// Longest accepted cache entry lifetime (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 86_400;

// ---------------------------------------------------------------------------
// BookId
// ---------------------------------------------------------------------------

/// Catalog identifier of a book. Used verbatim in cache keys and source URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Wrap an identifier, rejecting empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Result<Self, FolioError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FolioError::Validation(
                "book identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BookId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Raw source data
// ---------------------------------------------------------------------------

/// Unprocessed metadata blob returned by a content source.
///
/// Opaque to everything except the enrichment gateway, which hands it to the
/// model as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawMetadata(String);

impl RawMetadata {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Text body and metadata blob for one catalog entry. Discarded after enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSourceData {
    pub content: String,
    pub metadata: RawMetadata,
}

// ---------------------------------------------------------------------------
// Book model
// ---------------------------------------------------------------------------

/// Title, authors and cover extracted from raw metadata (stage-1 enrichment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct MinimalMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub cover_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub struct Character {
    pub id: String,
    pub label: String,
}

/// Directed link between two character ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub struct Relation {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub struct Quote {
    pub text: String,
    pub character: String,
    pub sentiment: Sentiment,
    pub chapter: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub enum NarrativePointOfView {
    #[serde(rename = "first person", alias = "first-person")]
    FirstPerson,
    #[serde(rename = "third person", alias = "third-person")]
    ThirdPerson,
}

/// The full enriched record: the unit of caching and the unit returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct EnrichedBook {
    pub title: String,
    pub authors: Vec<String>,
    pub cover_url: String,
    pub year: i32,
    pub summary: String,
    pub genres: Vec<String>,
    pub main_characters: Vec<Character>,
    pub central_theme: String,
    pub central_conflict: String,
    pub location: String,
    pub historical_context: String,
    pub setting_environment: String,
    pub writing_style: String,
    pub narrative_point_of_view: NarrativePointOfView,
    pub moral_of_story: String,
    pub characters: Vec<Character>,
    pub relations: Vec<Relation>,
    pub quotes: Vec<Quote>,
}

impl EnrichedBook {
    /// Relations whose source or target is not a declared character id.
    ///
    /// Model output is never rejected on this basis; callers use it for
    /// diagnostics.
    pub fn dangling_relations(&self) -> Vec<&Relation> {
        let ids: HashSet<&str> = self.characters.iter().map(|c| c.id.as_str()).collect();
        self.relations
            .iter()
            .filter(|r| !ids.contains(r.source.as_str()) || !ids.contains(r.target.as_str()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Cache value
// ---------------------------------------------------------------------------

/// Decoded cache entry for a book: either a confirmed absence or the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedBook {
    Absent,
    Present(EnrichedBook),
}

impl CachedBook {
    /// Encode to the stored string form: the sentinel or the book's JSON.
    pub fn encode(&self) -> Result<String, FolioError> {
        match self {
            CachedBook::Absent => Ok(NOT_FOUND_SENTINEL.to_string()),
            CachedBook::Present(book) => Self::encode_book(book),
        }
    }

    /// Stored form of a present book, without wrapping it first.
    pub fn encode_book(book: &EnrichedBook) -> Result<String, FolioError> {
        serde_json::to_string(book)
            .map_err(|e| FolioError::Cache(format!("JSON serialize error: {e}")))
    }

    /// Decode a stored string. Anything other than the sentinel must be a book.
    pub fn decode(raw: &str) -> Result<Self, FolioError> {
        if raw == NOT_FOUND_SENTINEL {
            return Ok(CachedBook::Absent);
        }
        serde_json::from_str(raw)
            .map(CachedBook::Present)
            .map_err(|e| FolioError::Cache(format!("JSON deserialize error: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Pipeline stages & token usage
// ---------------------------------------------------------------------------

/// Step of a retrieval at which something happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStage {
    CacheCheck,
    Fetching,
    Enriching,
    Persisting,
}

impl fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetrievalStage::CacheCheck => "cache_check",
            RetrievalStage::Fetching => "fetching",
            RetrievalStage::Enriching => "enriching",
            RetrievalStage::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// Which of the two enrichment calls a model event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStage {
    Metadata,
    Analysis,
}

impl fmt::Display for EnrichmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichmentStage::Metadata => f.write_str("metadata"),
            EnrichmentStage::Analysis => f.write_str("analysis"),
        }
    }
}

/// Token accounting reported by the enrichment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Lifecycle events emitted by the retrieval pipeline and its gateways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
    LookupStarted {
        run_id: String,
        book_id: String,
    },
    CacheHit {
        key: String,
    },
    NegativeCacheHit {
        key: String,
    },
    CacheMiss {
        key: String,
    },
    CacheWrite {
        key: String,
        negative: bool,
        ttl_secs: u64,
    },
    SourceRequest {
        url: String,
    },
    SourceResponse {
        url: String,
        status: u16,
        bytes: usize,
    },
    ModelCalled {
        stage: EnrichmentStage,
        model: String,
    },
    ModelResponded {
        stage: EnrichmentStage,
        usage: Option<TokenUsage>,
    },
    DanglingRelations {
        book_id: String,
        count: usize,
    },
    LookupFinished {
        run_id: String,
        book_id: String,
        from_cache: bool,
    },
    LookupFailed {
        run_id: String,
        book_id: String,
        stage: RetrievalStage,
        not_found: bool,
        error: String,
    },
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type covering the pipeline and every gateway.
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("book not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("source returned HTTP {status} for {url}")]
    SourceStatus { status: u16, url: String },
    #[error("source error: {0}")]
    Source(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("rate limit: {0}")]
    RateLimit(String),
    #[error("parsing error: {0}")]
    Parsing(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("callback error: {0}")]
    Callback(String),
    #[error("config error: {0}")]
    Config(String),
}

impl FolioError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FolioError::NotFound(_))
    }
}

// ---------------------------------------------------------------------------
// Gateway traits
// ---------------------------------------------------------------------------

/// String-keyed, string-valued store with per-entry expiration.
///
/// Implementations are expected to be safe for concurrent use; last writer wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Look up a value. Fails only when the backend itself is unreachable.
    async fn get(&self, key: &str) -> Result<Option<String>, FolioError>;
    /// Write a value that expires after `ttl_secs`, overwriting any existing one.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), FolioError>;
}

/// External provider of raw book text and metadata.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch once, without retries. Failures are reported raw; callers classify them.
    async fn fetch(&self, id: &BookId) -> Result<RawSourceData, FolioError>;
}

/// Generative-model enrichment, in two stages.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Stage 1: derive title, authors and cover from the raw metadata blob.
    async fn extract_minimal_metadata(
        &self,
        raw: &RawMetadata,
    ) -> Result<MinimalMetadata, FolioError>;

    /// Stage 2: derive the full literary analysis from metadata and text.
    async fn analyze(
        &self,
        metadata: &MinimalMetadata,
        content: &str,
    ) -> Result<EnrichedBook, FolioError>;
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Receives pipeline events, tagged with the emitting component's name.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    async fn on_event(&self, component: &str, event: PipelineEvent) -> Result<(), FolioError>;
}

/// A callback handler bound to one component name.
///
/// Each component is handed its own sink at construction. Handler failures
/// are reported through `tracing` and never interrupt the caller.
#[derive(Clone)]
pub struct EventSink {
    component: Arc<str>,
    handler: Arc<dyn CallbackHandler>,
}

impl EventSink {
    pub fn new(component: impl Into<Arc<str>>, handler: Arc<dyn CallbackHandler>) -> Self {
        Self {
            component: component.into(),
            handler,
        }
    }

    /// A sink sharing this sink's handler under a different component name.
    pub fn scoped(&self, component: impl Into<Arc<str>>) -> Self {
        Self {
            component: component.into(),
            handler: self.handler.clone(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub async fn emit(&self, event: PipelineEvent) {
        if let Err(e) = self.handler.on_event(&self.component, event).await {
            tracing::warn!(component = %self.component, error = %e, "callback handler failed");
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}
