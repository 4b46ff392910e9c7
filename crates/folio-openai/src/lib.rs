mod enricher;
mod prompts;

pub use enricher::{OpenAiConfig, OpenAiEnricher};
pub use prompts::{content_window, CONTENT_WINDOW_END, CONTENT_WINDOW_START, METADATA_WINDOW};
