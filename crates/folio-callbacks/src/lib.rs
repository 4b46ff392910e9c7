mod composite;
mod tracing_cb;

pub use composite::CompositeCallback;
pub use tracing_cb::TracingCallback;

use std::sync::Arc;

use async_trait::async_trait;
use folio_core::{CallbackHandler, FolioError, PipelineEvent};
use tokio::sync::RwLock;

/// A callback handler that records every event with its component, useful for testing.
#[derive(Default, Clone)]
pub struct RecordingCallback {
    events: Arc<RwLock<Vec<(String, PipelineEvent)>>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .read()
            .await
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Events emitted by one component, in order.
    pub async fn events_from(&self, component: &str) -> Vec<PipelineEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(c, _)| c == component)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

#[async_trait]
impl CallbackHandler for RecordingCallback {
    async fn on_event(&self, component: &str, event: PipelineEvent) -> Result<(), FolioError> {
        self.events
            .write()
            .await
            .push((component.to_string(), event));
        Ok(())
    }
}
