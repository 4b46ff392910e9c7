use async_trait::async_trait;
use folio_core::{CallbackHandler, FolioError, PipelineEvent};

/// Forwards pipeline events to `tracing` with structured fields.
pub struct TracingCallback;

impl TracingCallback {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingCallback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallbackHandler for TracingCallback {
    async fn on_event(&self, component: &str, event: PipelineEvent) -> Result<(), FolioError> {
        match event {
            PipelineEvent::LookupStarted { run_id, book_id } => {
                tracing::info!(component, run_id = %run_id, book_id = %book_id, "lookup started");
            }
            PipelineEvent::CacheHit { key } => {
                tracing::debug!(component, key = %key, "cache hit");
            }
            PipelineEvent::NegativeCacheHit { key } => {
                tracing::debug!(component, key = %key, "negative cache hit");
            }
            PipelineEvent::CacheMiss { key } => {
                tracing::debug!(component, key = %key, "cache miss");
            }
            PipelineEvent::CacheWrite {
                key,
                negative,
                ttl_secs,
            } => {
                tracing::debug!(component, key = %key, negative, ttl_secs, "cache write");
            }
            PipelineEvent::SourceRequest { url } => {
                tracing::debug!(component, url = %url, "source request");
            }
            PipelineEvent::SourceResponse { url, status, bytes } => {
                tracing::debug!(component, url = %url, status, bytes, "source response");
            }
            PipelineEvent::ModelCalled { stage, model } => {
                tracing::info!(component, stage = %stage, model = %model, "model called");
            }
            PipelineEvent::ModelResponded { stage, usage } => {
                let total_tokens = usage.map(|u| u.total_tokens).unwrap_or(0);
                tracing::info!(component, stage = %stage, total_tokens, "model responded");
            }
            PipelineEvent::DanglingRelations { book_id, count } => {
                tracing::warn!(component, book_id = %book_id, count, "relations reference unknown characters");
            }
            PipelineEvent::LookupFinished {
                run_id,
                book_id,
                from_cache,
            } => {
                tracing::info!(component, run_id = %run_id, book_id = %book_id, from_cache, "lookup finished");
            }
            PipelineEvent::LookupFailed {
                run_id,
                book_id,
                stage,
                not_found,
                error,
            } => {
                if not_found {
                    tracing::info!(component, run_id = %run_id, book_id = %book_id, stage = %stage, "book not found");
                } else {
                    tracing::error!(component, run_id = %run_id, book_id = %book_id, stage = %stage, error = %error, "lookup failed");
                }
            }
        }
        Ok(())
    }
}
