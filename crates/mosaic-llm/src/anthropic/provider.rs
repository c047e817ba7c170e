//! Anthropic provider implementing the [`Provider`] trait.
//!
//! Drives the streaming Messages API. The wire protocol is typed events;
//! only `content_block_delta` events with a `text_delta` payload carry
//! artifact text. Everything else (`message_start`, `ping`, block framing)
//! is ignored, and `error` events terminate the stream.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, instrument, warn};

use mosaic_core::messages::{GenerationSettings, Message, ProviderKind};
use mosaic_settings::ProviderApiSettings;

use crate::error_parsing::status_error;
use crate::flush::{DEFAULT_SIZE_THRESHOLD, FlushPolicy};
use crate::provider::{Provider, ProviderError, ProviderResult, TextDeltaStream};
use crate::sse::{SseOptions, parse_sse_data, sse_data_lines};

use super::types::{AnthropicSseEvent, build_request, extract_delta};

/// Default base URL for the Anthropic API.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Anthropic closes with `message_stop` but may leave a trailing buffer.
const SSE_OPTIONS: SseOptions = SseOptions {
    process_remaining_buffer: true,
};

/// Anthropic LLM provider.
pub struct AnthropicProvider {
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a provider for one model.
    ///
    /// Fails with [`ProviderError::Auth`] when no API key is configured.
    pub fn new(model: impl Into<String>, api: &ProviderApiSettings) -> ProviderResult<Self> {
        let api_key = api
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::Auth {
                message: "Anthropic API key not configured".into(),
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
        let _ = headers.insert(
            "anthropic-version",
            HeaderValue::from_static(API_VERSION),
        );
        let _ = headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).map_err(|e| ProviderError::Auth {
                message: format!("invalid API key header: {e}"),
            })?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn default_flush_policy(&self) -> FlushPolicy {
        FlushPolicy::SizeThreshold(DEFAULT_SIZE_THRESHOLD)
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn open_stream(
        &self,
        messages: &[Message],
        settings: &GenerationSettings,
    ) -> ProviderResult<TextDeltaStream> {
        let request = build_request(&self.model, messages, settings);
        let url = format!("{}/v1/messages", self.base_url);

        debug!(
            message_count = request.messages.len(),
            max_tokens = request.max_tokens,
            has_system = request.system.is_some(),
            "sending Anthropic request"
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
            return Err(status_error(response, "anthropic").await);
        }

        // A fatal `error` event ends the stream; later events are dropped.
        let deltas = sse_data_lines(response.bytes_stream(), SSE_OPTIONS)
            .scan(false, |errored, payload| {
                if *errored {
                    return std::future::ready(None);
                }
                let item = match parse_sse_data::<AnthropicSseEvent>(&payload, "anthropic") {
                    Some(AnthropicSseEvent::Error { error }) => {
                        warn!(
                            error_type = %error.error_type,
                            message = %error.message,
                            "Anthropic SSE error"
                        );
                        *errored = true;
                        Some(Err(ProviderError::Other {
                            message: format!("{}: {}", error.error_type, error.message),
                        }))
                    }
                    Some(ref event) => extract_delta(event).map(|t| Ok(t.to_owned())),
                    None => None,
                };
                std::future::ready(Some(item))
            })
            .filter_map(std::future::ready);

        Ok(Box::pin(deltas))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
