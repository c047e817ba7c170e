//! Google Gemini provider implementing the [`Provider`] trait.
//!
//! Drives `streamGenerateContent?alt=sse` with API-key auth. Gemini chunks
//! arrive already coarse-grained (sentence- to paragraph-sized), so the
//! default flush policy is pass-through: no extra batching.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use mosaic_core::messages::{GenerationSettings, Message, ProviderKind};
use mosaic_settings::ProviderApiSettings;

use crate::error_parsing::status_error;
use crate::flush::FlushPolicy;
use crate::provider::{Provider, ProviderError, ProviderResult, TextDeltaStream};
use crate::sse::{SseOptions, parse_sse_data, sse_data_lines};

use super::types::{GenerateContentChunk, build_request, extract_text};

/// Default base URL for the Gemini API.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini may end the stream without a final newline; process the
/// remaining buffer to avoid losing the last chunk.
const SSE_OPTIONS: SseOptions = SseOptions {
    process_remaining_buffer: true,
};

/// Google Gemini LLM provider.
pub struct GoogleProvider {
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a provider for one model.
    ///
    /// Fails with [`ProviderError::Auth`] when no API key is configured.
    pub fn new(model: impl Into<String>, api: &ProviderApiSettings) -> ProviderResult<Self> {
        let api_key = api
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::Auth {
                message: "Google API key not configured".into(),
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

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn default_flush_policy(&self) -> FlushPolicy {
        FlushPolicy::PassThrough
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn open_stream(
        &self,
        messages: &[Message],
        settings: &GenerationSettings,
    ) -> ProviderResult<TextDeltaStream> {
        let request = build_request(messages, settings);

        debug!(
            content_count = request.contents.len(),
            has_system = request.system_instruction.is_some(),
            "sending Gemini request"
        );

        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(self.api_url())
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response, "google").await);
        }

        let deltas = sse_data_lines(response.bytes_stream(), SSE_OPTIONS).filter_map(|payload| {
            let chunk: Option<GenerateContentChunk> = parse_sse_data(&payload, "google");
            std::future::ready(chunk.as_ref().and_then(extract_text).map(Ok))
        });

        Ok(Box::pin(deltas))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
