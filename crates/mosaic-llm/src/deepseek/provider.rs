//! `DeepSeek` provider implementing the [`Provider`] trait.
//!
//! `DeepSeek` speaks the `OpenAI` chat-completions wire format, so this
//! adapter reuses those request/chunk types against its own endpoint. The
//! deltas are token-granular — far chattier than the other backends — so
//! the default flush policy is time-threshold batching to bound downstream
//! writes.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use mosaic_core::messages::{GenerationSettings, Message, ProviderKind};
use mosaic_settings::ProviderApiSettings;

use crate::error_parsing::status_error;
use crate::flush::{DEFAULT_FLUSH_INTERVAL, FlushPolicy};
use crate::openai::types::{ChatChunk, build_request, extract_delta};
use crate::provider::{Provider, ProviderError, ProviderResult, TextDeltaStream};
use crate::sse::{SseOptions, parse_sse_data, sse_data_lines};

/// Default base URL for the `DeepSeek` API.
const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// `DeepSeek` terminates with an explicit `[DONE]`, like `OpenAI`.
const SSE_OPTIONS: SseOptions = SseOptions {
    process_remaining_buffer: false,
};

/// `DeepSeek` LLM provider.
pub struct DeepSeekProvider {
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl DeepSeekProvider {
    /// Create a provider for one model.
    ///
    /// Fails with [`ProviderError::Auth`] when no API key is configured.
    pub fn new(model: impl Into<String>, api: &ProviderApiSettings) -> ProviderResult<Self> {
        let api_key = api
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::Auth {
                message: "DeepSeek API key not configured".into(),
            })?;
        Ok(Self {
            model: model.into(),
            api_key,
            base_url: api
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: reqwest::Client::new(),
        })
    }

    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = format!("Bearer {}", self.api_key);
        let _ = headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| ProviderError::Auth {
                message: format!("invalid API key header: {e}"),
            })?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl Provider for DeepSeekProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DeepSeek
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn default_flush_policy(&self) -> FlushPolicy {
        FlushPolicy::TimeThreshold(DEFAULT_FLUSH_INTERVAL)
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn open_stream(
        &self,
        messages: &[Message],
        settings: &GenerationSettings,
    ) -> ProviderResult<TextDeltaStream> {
        let request = build_request(&self.model, messages, settings);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            message_count = request.messages.len(),
            temperature = request.temperature,
            "sending DeepSeek request"
        );

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers()?)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response, "deepseek").await);
        }

        let deltas = sse_data_lines(response.bytes_stream(), SSE_OPTIONS).filter_map(|payload| {
            let chunk: Option<ChatChunk> = parse_sse_data(&payload, "deepseek");
            std::future::ready(chunk.as_ref().and_then(extract_delta).map(Ok))
        });

        Ok(Box::pin(deltas))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
