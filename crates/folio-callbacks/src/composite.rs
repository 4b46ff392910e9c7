use std::sync::Arc;

use async_trait::async_trait;
use folio_core::{CallbackHandler, FolioError, PipelineEvent};

/// Fans every event out to several handlers, stopping at the first failure.
pub struct CompositeCallback {
    handlers: Vec<Arc<dyn CallbackHandler>>,
}

impl CompositeCallback {
    pub fn new(handlers: Vec<Arc<dyn CallbackHandler>>) -> Self {
        Self { handlers }
    }
}

#[async_trait]
impl CallbackHandler for CompositeCallback {
    async fn on_event(&self, component: &str, event: PipelineEvent) -> Result<(), FolioError> {
        for handler in &self.handlers {
            handler.on_event(component, event.clone()).await?;
        }
        Ok(())
    }
}
