//! OpenAI-compatible chat completion client (Groq, vLLM, OpenAI)
//!
//! Serves both delivery modes: a single blocking completion, or a
//! server-sent event stream turned into text deltas.

use super::sse::{SseDecoder, DONE_SENTINEL};
use super::{ChatMessage, DeltaStream, Generator, GeneratorCapabilities, ProviderClient};
use crate::config::GenerationServiceConfig;
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Generator backed by an HTTP chat completion endpoint
pub struct HttpGenerator {
    client: ProviderClient,
    model: String,
    temperature: f32,
    streaming: bool,
    idle_timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl HttpGenerator {
    /// Create from configuration
    pub fn from_config(config: &GenerationServiceConfig) -> ProviderResult<Self> {
        let client = ProviderClient::new(
            "generation",
            config.url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            streaming: config.streaming,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        })
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    fn request<'a>(&'a self, messages: &'a [ChatMessage], stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            stream,
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        let response: ChatResponse = self
            .client
            .post_json(COMPLETIONS_PATH, &self.request(messages, false))
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ProviderError::malformed(self.client.name(), "No response from LLM"))
    }

    async fn generate_stream(&self, messages: &[ChatMessage]) -> ProviderResult<DeltaStream> {
        self.client.record_request();

        let req = self
            .client
            .post(COMPLETIONS_PATH)
            .header("Accept", "text/event-stream")
            .json(&self.request(messages, true));

        // The deadline covers the response head; the body is bounded per chunk.
        let response = self
            .client
            .with_deadline(self.client.send(req))
            .await
            .inspect_err(|_| self.client.record_error())?;

        let provider = self.client.name().to_string();
        let bytes = response.bytes_stream().map({
            let provider = provider.clone();
            move |chunk| chunk.map_err(|e| ProviderError::from_reqwest(provider.clone(), e))
        });

        Ok(delta_stream(bytes, provider, self.idle_timeout))
    }

    fn capabilities(&self) -> GeneratorCapabilities {
        GeneratorCapabilities {
            blocking: true,
            streaming: self.streaming,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

struct DeltaState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<ProviderResult<String>>,
    provider: String,
    idle_timeout: Duration,
    done: bool,
}

impl<S> DeltaState<S> {
    fn handle_event(&mut self, payload: &str) {
        if self.done {
            return;
        }
        if payload.trim() == DONE_SENTINEL {
            self.done = true;
            return;
        }
        match serde_json::from_str::<ChatChunk>(payload) {
            Ok(chunk) => {
                let content = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .unwrap_or_default();
                if !content.is_empty() {
                    self.pending.push_back(Ok(content));
                }
            }
            Err(e) => {
                self.pending.push_back(Err(ProviderError::malformed(
                    self.provider.clone(),
                    format!("unparseable stream event: {}", e),
                )));
                self.done = true;
            }
        }
    }
}

/// Turn a raw SSE byte stream into text deltas
///
/// Each delta is yielded as soon as its event is complete. The stream ends
/// after `[DONE]`, at end of body, or after the first error.
pub fn delta_stream<S, B>(bytes: S, provider: String, idle_timeout: Duration) -> DeltaStream
where
    S: Stream<Item = ProviderResult<B>> + Send + 'static,
    B: AsRef<[u8]>,
{
    let state = DeltaState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        provider,
        idle_timeout,
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }

            match tokio::time::timeout(st.idle_timeout, st.bytes.next()).await {
                Err(_) => {
                    st.done = true;
                    let err = ProviderError::timeout(
                        st.provider.clone(),
                        format!(
                            "stream idle for more than {}s",
                            st.idle_timeout.as_secs_f32()
                        ),
                    );
                    return Some((Err(err), st));
                }
                Ok(None) => {
                    if let Some(payload) = st.decoder.finish() {
                        st.handle_event(&payload);
                    }
                    st.done = true;
                }
                Ok(Some(Err(e))) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                Ok(Some(Ok(chunk))) => {
                    for payload in st.decoder.push(chunk.as_ref()) {
                        st.handle_event(&payload);
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    fn sse(deltas: &[&str]) -> String {
        let mut body = String::new();
        for d in deltas {
            body.push_str(&format!(
                "data: {}\n\n",
                serde_json::json!({"choices": [{"delta": {"content": d}}]})
            ));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    fn chunks_of(body: &str, size: usize) -> Vec<ProviderResult<Vec<u8>>> {
        body.as_bytes()
            .chunks(size)
            .map(|c| Ok(c.to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn test_deltas_in_order_regardless_of_fragmentation() {
        let body = sse(&["Hel", "lo", ", wor", "ld"]);
        for size in [1, 3, 7, 64, body.len()] {
            let stream = delta_stream(
                futures::stream::iter(chunks_of(&body, size)),
                "gen".into(),
                Duration::from_secs(5),
            );
            let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;
            assert_eq!(deltas, vec!["Hel", "lo", ", wor", "ld"], "chunk size {}", size);
        }
    }

    #[tokio::test]
    async fn test_events_after_done_are_ignored() {
        let body = format!("{}data: {{\"choices\":[{{\"delta\":{{\"content\":\"late\"}}}}]}}\n\n", sse(&["a"]));
        let stream = delta_stream(
            futures::stream::iter(chunks_of(&body, body.len())),
            "gen".into(),
            Duration::from_secs(5),
        );
        let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;
        assert_eq!(deltas, vec!["a"]);
    }

    #[tokio::test]
    async fn test_empty_and_role_only_deltas_skipped() {
        let body = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n";
        let stream = delta_stream(
            futures::stream::iter(chunks_of(body, 10)),
            "gen".into(),
            Duration::from_secs(5),
        );
        let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;
        assert_eq!(deltas, vec!["x"]);
    }

    #[tokio::test]
    async fn test_garbage_event_ends_stream_with_error() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: not json\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n";
        let stream = delta_stream(
            futures::stream::iter(chunks_of(body, body.len())),
            "gen".into(),
            Duration::from_secs(5),
        );
        let items: Vec<ProviderResult<String>> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "ok");
        assert_eq!(
            items[1].as_ref().unwrap_err().kind,
            ProviderErrorKind::Malformed
        );
    }

    #[tokio::test]
    async fn test_idle_stream_times_out() {
        let stalled = futures::stream::pending::<ProviderResult<Vec<u8>>>();
        let mut stream = delta_stream(stalled, "gen".into(), Duration::from_millis(20));
        let first = stream.next().await.unwrap();
        assert_eq!(first.unwrap_err().kind, ProviderErrorKind::Timeout);
        assert!(stream.next().await.is_none());
    }
}
