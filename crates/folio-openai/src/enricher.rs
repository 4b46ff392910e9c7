use std::sync::Arc;

use async_trait::async_trait;
use folio_core::{
    EnrichedBook, Enricher, EnrichmentStage, EventSink, FolioError, MinimalMetadata,
    PipelineEvent, RawMetadata, TokenUsage,
};
use folio_models::{
    json_schema_format, parse_structured, ProviderBackend, ProviderRequest, ProviderResponse,
};
use serde_json::{json, Value};

use crate::prompts;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f64>,
    pub seed: Option<u64>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: None,
            seed: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// [`Enricher`] backed by OpenAI chat completions with a JSON-schema
/// `response_format`. One call per stage, never retried.
pub struct OpenAiEnricher {
    config: OpenAiConfig,
    backend: Arc<dyn ProviderBackend>,
    events: EventSink,
}

impl OpenAiEnricher {
    /// Fails with [`FolioError::Config`] when the API key is empty.
    pub fn new(
        config: OpenAiConfig,
        backend: Arc<dyn ProviderBackend>,
        events: EventSink,
    ) -> Result<Self, FolioError> {
        if config.api_key.trim().is_empty() {
            return Err(FolioError::Config("OpenAI API key is not set".to_string()));
        }
        Ok(Self {
            config,
            backend,
            events,
        })
    }

    fn build_request(&self, system: &str, user: String, response_format: Value) -> ProviderRequest {
        let mut body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "response_format": response_format,
        });

        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(seed) = self.config.seed {
            body["seed"] = json!(seed);
        }

        ProviderRequest {
            url: format!("{}/chat/completions", self.config.base_url),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        }
    }

    async fn complete(
        &self,
        stage: EnrichmentStage,
        request: ProviderRequest,
    ) -> Result<String, FolioError> {
        self.events
            .emit(PipelineEvent::ModelCalled {
                stage,
                model: self.config.model.clone(),
            })
            .await;

        let resp = self.backend.send(request).await?;
        check_error_status(&resp)?;

        self.events
            .emit(PipelineEvent::ModelResponded {
                stage,
                usage: parse_usage(&resp.body["usage"]),
            })
            .await;

        reply_content(&resp.body)
    }
}

fn check_error_status(resp: &ProviderResponse) -> Result<(), FolioError> {
    if resp.status == 429 {
        let msg = resp.body["error"]["message"]
            .as_str()
            .unwrap_or("rate limited")
            .to_string();
        return Err(FolioError::RateLimit(msg));
    }
    if resp.status >= 400 {
        let msg = resp.body["error"]["message"]
            .as_str()
            .unwrap_or("unknown API error")
            .to_string();
        return Err(FolioError::Model(format!(
            "OpenAI API error ({}): {}",
            resp.status, msg
        )));
    }
    Ok(())
}

/// Text of the first choice. A refusal or an empty reply means there is no
/// structured result.
fn reply_content(body: &Value) -> Result<String, FolioError> {
    let message = &body["choices"][0]["message"];
    if let Some(refusal) = message["refusal"].as_str() {
        return Err(FolioError::Parsing(format!("model refused: {refusal}")));
    }
    match message["content"].as_str() {
        Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
        _ => Err(FolioError::Parsing(
            "model returned no structured result".to_string(),
        )),
    }
}

fn parse_usage(usage: &Value) -> Option<TokenUsage> {
    if usage.is_null() {
        return None;
    }
    Some(TokenUsage {
        input_tokens: token_count(&usage["prompt_tokens"]),
        output_tokens: token_count(&usage["completion_tokens"]),
        total_tokens: token_count(&usage["total_tokens"]),
    })
}

/// Saturates at `u32::MAX` instead of wrapping.
fn token_count(value: &Value) -> u32 {
    value
        .as_u64()
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

#[async_trait]
impl Enricher for OpenAiEnricher {
    async fn extract_minimal_metadata(
        &self,
        raw: &RawMetadata,
    ) -> Result<MinimalMetadata, FolioError> {
        let request = self.build_request(
            prompts::METADATA_SYSTEM,
            prompts::metadata_request(raw),
            json_schema_format::<MinimalMetadata>("Metadata"),
        );
        let content = self.complete(EnrichmentStage::Metadata, request).await?;
        parse_structured(&content)
    }

    async fn analyze(
        &self,
        metadata: &MinimalMetadata,
        content: &str,
    ) -> Result<EnrichedBook, FolioError> {
        let request = self.build_request(
            prompts::ANALYSIS_SYSTEM,
            prompts::analysis_request(metadata, content),
            json_schema_format::<EnrichedBook>("bookDetails"),
        );
        let reply = self.complete(EnrichmentStage::Analysis, request).await?;
        parse_structured(&reply)
    }
}
