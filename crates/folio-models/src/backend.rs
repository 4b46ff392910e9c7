use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use folio_core::FolioError;
use serde_json::Value;
use tokio::sync::Mutex;

/// A JSON POST to a model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Value,
}

/// Status and body of a plain-text GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub status: u16,
    pub body: String,
}

impl TextResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound HTTP used by the gateways. Each call is a single attempt.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, FolioError>;
    async fn get_text(&self, url: &str) -> Result<TextResponse, FolioError>;
}

/// Production backend using reqwest, with a fixed per-request timeout.
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(timeout: Duration) -> Result<Self, FolioError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FolioError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an already-configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(e: reqwest::Error, url: &str, wrap: fn(String) -> FolioError) -> FolioError {
    if e.is_timeout() {
        FolioError::Timeout(format!("request to {url} timed out"))
    } else {
        wrap(format!("HTTP request to {url} failed: {e}"))
    }
}

/// Decode a provider reply once its status is known.
///
/// An error status with a body that is not JSON (a proxy's HTML page, say)
/// keeps its status and gets a `null` body, so callers classify it by status.
/// Only a successful reply with an undecodable body is a parsing failure.
fn decode_provider_body(
    status: u16,
    url: &str,
    text: &str,
) -> Result<ProviderResponse, FolioError> {
    match serde_json::from_str::<Value>(text) {
        Ok(body) => Ok(ProviderResponse { status, body }),
        Err(_) if status >= 400 => Ok(ProviderResponse {
            status,
            body: Value::Null,
        }),
        Err(e) => Err(FolioError::Parsing(format!(
            "failed to parse response JSON from {url}: {e}"
        ))),
    }
}

#[async_trait]
impl ProviderBackend for HttpBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, FolioError> {
        let mut builder = self.client.post(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        builder = builder.json(&request.body);

        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, &request.url, FolioError::Model))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| classify(e, &request.url, FolioError::Model))?;

        decode_provider_body(status, &request.url, &text)
    }

    async fn get_text(&self, url: &str) -> Result<TextResponse, FolioError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(e, url, FolioError::Source))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify(e, url, FolioError::Source))?;

        Ok(TextResponse { status, body })
    }
}

/// Test backend with queued responses. Records every request it receives.
pub struct FakeBackend {
    responses: Arc<Mutex<VecDeque<Result<ProviderResponse, FolioError>>>>,
    texts: Arc<Mutex<HashMap<String, VecDeque<Result<TextResponse, FolioError>>>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    text_requests: Arc<Mutex<Vec<String>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            texts: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            text_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_response(&self, response: ProviderResponse) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Ok(response));
        self
    }

    pub fn push_error(&self, error: FolioError) -> &Self {
        self.responses
            .try_lock()
            .expect("not concurrent during setup")
            .push_back(Err(error));
        self
    }

    /// Queue a GET response for `url`.
    pub fn push_text(&self, url: impl Into<String>, response: TextResponse) -> &Self {
        self.texts
            .try_lock()
            .expect("not concurrent during setup")
            .entry(url.into())
            .or_default()
            .push_back(Ok(response));
        self
    }

    /// Queue a GET failure for `url`.
    pub fn push_text_error(&self, url: impl Into<String>, error: FolioError) -> &Self {
        self.texts
            .try_lock()
            .expect("not concurrent during setup")
            .entry(url.into())
            .or_default()
            .push_back(Err(error));
        self
    }

    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn text_requests(&self) -> Vec<String> {
        self.text_requests.lock().await.clone()
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for FakeBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, FolioError> {
        self.requests.lock().await.push(request);
        let mut responses = self.responses.lock().await;
        responses
            .pop_front()
            .unwrap_or_else(|| Err(FolioError::Model("FakeBackend exhausted".to_string())))
    }

    async fn get_text(&self, url: &str) -> Result<TextResponse, FolioError> {
        self.text_requests.lock().await.push(url.to_string());
        let mut texts = self.texts.lock().await;
        texts
            .get_mut(url)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(FolioError::Source(format!("FakeBackend has no response for {url}"))))
    }
}
