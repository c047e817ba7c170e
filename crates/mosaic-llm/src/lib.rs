//! # mosaic-llm
//!
//! LLM provider adapters and shared streaming utilities.
//!
//! Defines the [`Provider`] trait all four backends implement, plus:
//! - Shared SSE parser (handles the backends' framing differences)
//! - Chunk buffering with per-adapter flush policies
//! - Transport retry with exponential backoff + jitter (pre-first-delta only)
//! - Model registry: `model_id -> ModelInfo { name, kind, max_tokens }`
//! - API error envelope parsing
//! - Provider health tracking feeding the enabled-provider flags
//! - Provider factory: `model_id -> Box<dyn Provider>`

#![deny(unsafe_code)]

pub mod anthropic;
pub mod deepseek;
pub mod error_parsing;
pub mod flush;
pub mod google;
pub mod health;
pub mod models;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod sse;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use mosaic_core::messages::ProviderKind;
use mosaic_settings::{ApiSettings, EnabledProviders};

pub use flush::{ChunkBuffer, FlushPolicy, flushed};
pub use health::ProviderHealthTracker;
pub use models::{ModelInfo, detect_provider, find_model};
pub use provider::{Provider, ProviderError, ProviderFactory, ProviderResult, TextDeltaStream};

/// Create a provider for one backend and model.
pub fn create_provider(
    kind: ProviderKind,
    model: &str,
    api: &ApiSettings,
) -> ProviderResult<Arc<dyn Provider>> {
    let settings = api.for_kind(kind);
    Ok(match kind {
        ProviderKind::OpenAi => Arc::new(openai::OpenAiProvider::new(model, settings)?),
        ProviderKind::Anthropic => Arc::new(anthropic::AnthropicProvider::new(model, settings)?),
        ProviderKind::Google => Arc::new(google::GoogleProvider::new(model, settings)?),
        ProviderKind::DeepSeek => Arc::new(deepseek::DeepSeekProvider::new(model, settings)?),
    })
}

/// Standard [`ProviderFactory`] backed by the settings tree.
///
/// Holds a shared handle to the enabled-provider flags so health-sweep
/// updates take effect on the next generation attempt without rebuilding
/// the factory.
pub struct MosaicProviderFactory {
    api: ApiSettings,
    enabled: Arc<RwLock<EnabledProviders>>,
}

impl MosaicProviderFactory {
    /// Build a factory from API settings, deriving availability from key
    /// presence.
    #[must_use]
    pub fn new(api: ApiSettings) -> Self {
        let enabled = EnabledProviders::from_api_keys(&api);
        Self {
            api,
            enabled: Arc::new(RwLock::new(enabled)),
        }
    }

    /// Shared handle to the availability flags (for the health sweep).
    #[must_use]
    pub fn enabled_handle(&self) -> Arc<RwLock<EnabledProviders>> {
        Arc::clone(&self.enabled)
    }

    /// Current availability snapshot.
    #[must_use]
    pub fn enabled(&self) -> EnabledProviders {
        *self
            .enabled
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ProviderFactory for MosaicProviderFactory {
    async fn create_for_model(&self, model: &str) -> ProviderResult<Arc<dyn Provider>> {
        let info = models::find_model(model).ok_or_else(|| ProviderError::UnknownModel {
            model: model.to_owned(),
        })?;
        if !self.enabled().is_enabled(info.kind) {
            return Err(ProviderError::Disabled {
                provider: info.kind,
            });
        }
        create_provider(info.kind, model, &self.api)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_settings::ProviderApiSettings;

    fn api_with_keys() -> ApiSettings {
        let key = |name: &str| ProviderApiSettings {
            api_key: Some(name.to_string()),
            base_url: None,
        };
        ApiSettings {
            openai: key("sk-openai"),
            anthropic: key("sk-ant"),
            google: key("g"),
            deepseek: key("ds"),
        }
    }

    #[tokio::test]
    async fn factory_rejects_unknown_model() {
        let factory = MosaicProviderFactory::new(api_with_keys());
        let err = factory.create_for_model("gpt-9-ultra").await.err().unwrap();
        assert!(matches!(err, ProviderError::UnknownModel { .. }));
    }

    #[tokio::test]
    async fn factory_rejects_disabled_provider() {
        let mut api = api_with_keys();
        api.google.api_key = None;
        let factory = MosaicProviderFactory::new(api);
        let err = factory
            .create_for_model("gemini-1.5-flash")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::Disabled { .. }));
    }

    #[tokio::test]
    async fn factory_creates_matching_adapter() {
        let factory = MosaicProviderFactory::new(api_with_keys());
        for (model, kind) in [
            ("gpt-4o", ProviderKind::OpenAi),
            ("claude-3-5-sonnet-20241022", ProviderKind::Anthropic),
            ("gemini-2.0-flash-exp", ProviderKind::Google),
            ("deepseek-chat", ProviderKind::DeepSeek),
        ] {
            let provider = factory.create_for_model(model).await.unwrap();
            assert_eq!(provider.kind(), kind);
            assert_eq!(provider.model(), model);
        }
    }

    #[tokio::test]
    async fn sweep_handle_disables_factory_creation() {
        let factory = MosaicProviderFactory::new(api_with_keys());
        assert!(factory.create_for_model("gpt-4o").await.is_ok());

        factory
            .enabled_handle()
            .write()
            .unwrap()
            .set_enabled(ProviderKind::OpenAi, false);

        let err = factory.create_for_model("gpt-4o").await.err().unwrap();
        assert!(matches!(err, ProviderError::Disabled { .. }));
    }
}
