use std::sync::Arc;

use async_trait::async_trait;
use folio_core::{
    BookId, ContentSource, EventSink, FolioError, PipelineEvent, RawMetadata, RawSourceData,
};
use folio_models::ProviderBackend;

#[derive(Debug, Clone)]
pub struct GutenbergConfig {
    pub base_url: String,
}

impl GutenbergConfig {
    pub fn new() -> Self {
        Self {
            base_url: "https://www.gutenberg.org".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Default for GutenbergConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches plain text and the catalog page for a Project Gutenberg ebook.
///
/// The text comes from `/files/{id}/{id}-0.txt`, the metadata blob is the
/// HTML of `/ebooks/{id}`. Both requests run concurrently, once each.
pub struct GutenbergSource {
    config: GutenbergConfig,
    backend: Arc<dyn ProviderBackend>,
    events: EventSink,
}

impl GutenbergSource {
    pub fn new(
        config: GutenbergConfig,
        backend: Arc<dyn ProviderBackend>,
        events: EventSink,
    ) -> Self {
        Self {
            config,
            backend,
            events,
        }
    }

    pub fn content_url(&self, id: &BookId) -> String {
        format!("{}/files/{id}/{id}-0.txt", self.base())
    }

    pub fn metadata_url(&self, id: &BookId) -> String {
        format!("{}/ebooks/{id}", self.base())
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn get(&self, url: String) -> Result<String, FolioError> {
        self.events
            .emit(PipelineEvent::SourceRequest { url: url.clone() })
            .await;

        let response = self.backend.get_text(&url).await?;
        self.events
            .emit(PipelineEvent::SourceResponse {
                url: url.clone(),
                status: response.status,
                bytes: response.body.len(),
            })
            .await;

        if !response.is_success() {
            return Err(FolioError::SourceStatus {
                status: response.status,
                url,
            });
        }
        Ok(response.body)
    }
}

#[async_trait]
impl ContentSource for GutenbergSource {
    async fn fetch(&self, id: &BookId) -> Result<RawSourceData, FolioError> {
        let (content, metadata) = futures::future::try_join(
            self.get(self.content_url(id)),
            self.get(self.metadata_url(id)),
        )
        .await?;

        Ok(RawSourceData {
            content,
            metadata: RawMetadata::new(metadata),
        })
    }
}
