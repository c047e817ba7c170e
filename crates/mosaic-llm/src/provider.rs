//! # Provider Trait
//!
//! Core abstraction for LLM backends. Every backend (`OpenAI`, Anthropic,
//! Google, `DeepSeek`) implements [`Provider`] to expose one uniform
//! contract: a lazy, finite, non-restartable sequence of raw text deltas.
//!
//! The trait returns a boxed [`Stream`] of `String` deltas, letting the
//! engine consume text incrementally regardless of the underlying wire
//! framing. Deltas arrive in generation order and are never reordered or
//! dropped; concatenating them reconstructs the full response.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use mosaic_core::messages::{GenerationSettings, Message, ProviderKind};

use crate::flush::FlushPolicy;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Boxed stream of raw text deltas returned by [`Provider::open_stream`].
pub type TextDeltaStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Errors that can occur during provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Model ID not present in the registry. Rejected before any stream opens.
    #[error("unknown model: {model}")]
    UnknownModel {
        /// The rejected model ID.
        model: String,
    },

    /// Provider is disabled (no API key configured, or marked unreachable).
    #[error("provider disabled: {provider}")]
    Disabled {
        /// The disabled provider.
        provider: ProviderKind,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SSE stream parsing failed.
    #[error("SSE parse error: {message}")]
    SseParse {
        /// Error description.
        message: String,
    },

    /// Authentication failed (invalid or rejected key).
    #[error("auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Rate limited by the backend.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds.
        retry_after_ms: u64,
        /// Error description.
        message: String,
    },

    /// Backend returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Provider-specific error code.
        code: Option<String>,
        /// Whether this error can be retried.
        retryable: bool,
    },

    /// Provider-specific error.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl ProviderError {
    /// Whether the transport layer may retry this error (only before the
    /// first delta has been yielded).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::RateLimited { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::UnknownModel { .. }
            | Self::Disabled { .. }
            | Self::SseParse { .. }
            | Self::Auth { .. }
            | Self::Json(_)
            | Self::Other { .. } => false,
        }
    }

    /// Extract retry-after delay in milliseconds, if available.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// Error category string for logs and metrics.
    pub fn category(&self) -> &str {
        match self {
            Self::UnknownModel { .. } => "request",
            Self::Disabled { .. } => "disabled",
            Self::Http(_) => "network",
            Self::Json(_) | Self::SseParse { .. } => "parse",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limit",
            Self::Api { .. } => "api",
            Self::Other { .. } => "unknown",
        }
    }
}

/// Core LLM provider trait.
///
/// Implementors must be `Send + Sync` for use across async tasks. The
/// [`open_stream`](Provider::open_stream) method issues one streaming call
/// and returns the raw delta sequence; buffering into caller-visible
/// emissions is layered on top via [`FlushPolicy`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which backend this adapter drives.
    fn kind(&self) -> ProviderKind;

    /// Current model ID (e.g. `"gpt-4o"`).
    fn model(&self) -> &str;

    /// Flush policy matched to this backend's delta granularity.
    fn default_flush_policy(&self) -> FlushPolicy;

    /// Open a streaming generation call.
    ///
    /// Returns the raw delta stream, or a fatal error if the call could not
    /// be established. Mid-stream failures surface as an `Err` item; text
    /// yielded before the failure remains valid.
    async fn open_stream(
        &self,
        messages: &[Message],
        settings: &GenerationSettings,
    ) -> ProviderResult<TextDeltaStream>;
}

/// Factory for creating providers on demand.
///
/// Called once per generation attempt to create a fresh provider matching
/// the requested model, so configuration changes take effect between
/// attempts without restarting the engine.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Create a provider for the given model ID.
    ///
    /// Returns [`ProviderError::UnknownModel`] for models outside the
    /// registry and [`ProviderError::Disabled`] when the owning backend has
    /// no usable credentials.
    async fn create_for_model(&self, model: &str) -> ProviderResult<Arc<dyn Provider>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_not_retryable() {
        let err = ProviderError::UnknownModel {
            model: "gpt-9".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "request");
        assert_eq!(err.to_string(), "unknown model: gpt-9");
    }

    #[test]
    fn disabled_not_retryable() {
        let err = ProviderError::Disabled {
            provider: ProviderKind::Google,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "disabled");
    }

    #[test]
    fn rate_limited_is_retryable() {
        let err = ProviderError::RateLimited {
            retry_after_ms: 5000,
            message: "Too many requests".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.retry_after_ms(), Some(5000));
        assert_eq!(err.category(), "rate_limit");
    }

    #[test]
    fn api_error_respects_retryable_flag() {
        let retryable = ProviderError::Api {
            status: 500,
            message: "Internal server error".into(),
            code: None,
            retryable: true,
        };
        assert!(retryable.is_retryable());

        let fatal = ProviderError::Api {
            status: 400,
            message: "Bad request".into(),
            code: Some("invalid_request".into()),
            retryable: false,
        };
        assert!(!fatal.is_retryable());
    }

    #[test]
    fn auth_not_retryable() {
        let err = ProviderError::Auth {
            message: "invalid key".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "auth");
        assert_eq!(err.retry_after_ms(), None);
    }

    #[test]
    fn api_error_display() {
        let err = ProviderError::Api {
            status: 429,
            message: "Rate limited".into(),
            code: None,
            retryable: true,
        };
        assert_eq!(err.to_string(), "API error (429): Rate limited");
    }

    #[test]
    fn provider_factory_is_object_safe() {
        fn assert_object_safe(_: &dyn ProviderFactory) {}
        let _ = assert_object_safe;
    }

    #[test]
    fn provider_trait_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn Provider>();
        assert_send_sync::<dyn ProviderFactory>();
    }
}
