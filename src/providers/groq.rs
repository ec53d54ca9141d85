//! Streaming client for Groq's OpenAI-compatible chat completions API.
//!
//! Any endpoint speaking the same wire format works by pointing
//! [`GroqOptions::base_url`] at it.
//! See: <https://console.groq.com/docs/api-reference#chat-create>

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::traits::CompletionProvider;
use crate::types::{CompletionEvent, CompletionRequest, CompletionStream, Message};
use crate::{HuginnError, Result};

/// Default base URL for the Groq API
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default completion model
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Request parameters for the completion endpoint.
#[derive(Debug, Clone)]
pub struct GroqOptions {
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model identifier. Default: `llama-3.3-70b-versatile`.
    pub model: String,
    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,
    /// Maximum completion tokens. Default: 4000.
    pub max_tokens: u32,
    /// Wall-clock timeout for the whole HTTP exchange. Default: 120s.
    pub timeout: Duration,
}

impl Default for GroqOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 4000,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Client for a streaming chat completions endpoint.
#[derive(Clone)]
pub struct GroqClient {
    api_key: Option<String>,
    http: Client,
    options: GroqOptions,
}

impl GroqClient {
    /// Create a client. Without an API key every call fails with
    /// [`HuginnError::MissingApiKey`].
    pub fn new(api_key: Option<String>, options: GroqOptions) -> Result<Self> {
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| HuginnError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            http,
            options,
        })
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Map a non-success response to an error.
    async fn error_from_response(response: reqwest::Response) -> HuginnError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        match status {
            429 => HuginnError::RateLimited,
            401 | 403 => HuginnError::AuthenticationFailed,
            _ => {
                let message = serde_json::from_str::<ErrorResponse>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                HuginnError::Api { status, message }
            }
        }
    }
}

#[async_trait]
impl CompletionProvider for GroqClient {
    fn name(&self) -> &str {
        "groq"
    }

    #[instrument(name = "groq.stream", skip(self, request), fields(model = %self.options.model, turns = request.messages().len()))]
    async fn stream(&self, request: &CompletionRequest) -> Result<CompletionStream> {
        let api_key = self.api_key.as_deref().ok_or(HuginnError::MissingApiKey)?;
        let url = format!("{}/chat/completions", self.options.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&ChatCompletionRequest {
                model: &self.options.model,
                messages: request.messages(),
                stream: true,
                temperature: self.options.temperature,
                max_tokens: self.options.max_tokens,
            })
            .send()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        debug!("completion stream established");
        Ok(sse_events(response.bytes_stream()))
    }
}

// ============================================================================
// Server-sent event decoding
// ============================================================================

/// Turn a raw byte stream of `data:` lines into completion events.
///
/// The result ends after the first `Done` or error. A byte stream that
/// ends without `data: [DONE]` produces a trailing [`HuginnError::Stream`].
pub(crate) fn sse_events<S, B, E>(bytes: S) -> CompletionStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if matches!(item, Ok(CompletionEvent::Done) | Err(_)) {
                    state.finished = true;
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.feed(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => state.pending.push_back(Err(HuginnError::Stream(e.to_string()))),
                None => {
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                    state.pending.push_back(Err(HuginnError::Stream(
                        "stream ended before completion marker".to_string(),
                    )));
                }
            }
        }
    }))
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<CompletionEvent>>,
    finished: bool,
}

/// Line-buffering decoder for the completion SSE framing.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Consume a chunk, returning events for every complete line.
    fn feed(&mut self, chunk: &[u8]) -> Vec<Result<CompletionEvent>> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a final line that had no trailing newline.
    fn finish(&mut self) -> Vec<Result<CompletionEvent>> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&line))
            .into_iter()
            .collect()
    }
}

fn decode_line(line: &str) -> Option<Result<CompletionEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(Ok(CompletionEvent::Done));
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(StreamChunk {
            error: Some(error), ..
        }) => Some(Err(HuginnError::Stream(error.message))),
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())
            .map(|text| Ok(CompletionEvent::Content(text))),
        Err(e) => Some(Err(HuginnError::Stream(format!("malformed chunk: {e}")))),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
