//! Shared HTTP plumbing for external providers (Cohere, Pinecone, OpenAI-compatible chat)

use crate::error::{status_kind, ProviderError, ProviderResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct APIMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub avg_latency_ms: f64,
}

/// One provider endpoint: base URL, credentials, deadline and counters
#[derive(Clone)]
pub struct ProviderClient {
    name: String,
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    headers: Vec<(&'static str, String)>,
    timeout: Duration,
    metrics: Arc<APIMetrics>,
}

impl ProviderClient {
    /// Create a client; `timeout` bounds every call made through [`Self::post_json`]
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let name = name.into();
        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ProviderError::from_reqwest(name.clone(), e))?;

        Ok(Self {
            name,
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            headers: Vec::new(),
            timeout,
            metrics: Arc::new(APIMetrics::default()),
        })
    }

    /// Send an extra header on every request (skipped when `value` is None)
    pub fn with_header(mut self, name: &'static str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.headers.push((name, value));
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Build an authenticated POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .http_client
            .post(self.url(path))
            .header("Accept", "application/json");
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        for (name, value) in &self.headers {
            req = req.header(*name, value);
        }
        req
    }

    /// POST a JSON body and decode a JSON response within the deadline
    pub async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> ProviderResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let result = self
            .with_deadline(async {
                let response = self.send(self.post(path).json(body)).await?;
                response
                    .json::<Resp>()
                    .await
                    .map_err(|e| ProviderError::malformed(self.name.clone(), e.to_string()))
            })
            .await;

        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);
        if result.is_err() {
            self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(provider = %self.name, path, elapsed_ms = elapsed, ok = result.is_ok(), "provider call");

        result
    }

    /// Send a request and turn non-success statuses into errors
    pub async fn send(&self, req: reqwest::RequestBuilder) -> ProviderResult<reqwest::Response> {
        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.name.clone(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                self.name.clone(),
                status_kind(status.as_u16()),
                format!("{} service error (HTTP {}): {}", self.name, status, body),
            ));
        }

        Ok(response)
    }

    /// Bound a provider future by this client's deadline
    pub async fn with_deadline<T, F>(&self, fut: F) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(
                self.name.clone(),
                format!("no response within {}s", self.timeout.as_secs_f32()),
            )),
        }
    }

    pub(crate) fn record_error(&self) {
        self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_request(&self) {
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);
    }
}
