//! Settings tree: API credentials, engine knobs, provider availability.

use mosaic_core::ProviderKind;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Root
// ─────────────────────────────────────────────────────────────────────────────

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MosaicSettings {
    /// Per-provider API credentials and endpoints.
    pub api: ApiSettings,
    /// Engine behavior knobs.
    pub engine: EngineSettings,
}

// ─────────────────────────────────────────────────────────────────────────────
// API settings
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials and endpoint override for one backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderApiSettings {
    /// API key. Absence disables the provider at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (tests point this at a local mock).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// API settings for all four backends.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// `OpenAI`.
    pub openai: ProviderApiSettings,
    /// Anthropic.
    pub anthropic: ProviderApiSettings,
    /// Google.
    pub google: ProviderApiSettings,
    /// `DeepSeek`.
    pub deepseek: ProviderApiSettings,
}

impl ApiSettings {
    /// Settings for one backend.
    #[must_use]
    pub fn for_kind(&self, kind: ProviderKind) -> &ProviderApiSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Google => &self.google,
            ProviderKind::DeepSeek => &self.deepseek,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine settings
// ─────────────────────────────────────────────────────────────────────────────

/// Engine behavior knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Default model when the caller does not pick one.
    pub default_model: String,
    /// Validation retries per refinement cycle (on top of the initial attempt).
    pub max_validation_retries: u32,
    /// Delay between validation retries in milliseconds.
    pub retry_delay_ms: u64,
    /// Size-threshold flush policies emit once this many buffered chars.
    pub flush_size_threshold: usize,
    /// Time-threshold flush policies emit at most once per this interval.
    pub flush_interval_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o".to_string(),
            max_validation_retries: 2,
            retry_delay_ms: 1000,
            flush_size_threshold: 100,
            flush_interval_ms: 100,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider availability
// ─────────────────────────────────────────────────────────────────────────────

/// Which backends are currently usable.
///
/// Initialized from API key presence at startup; the health sweep in
/// `mosaic-llm` may flip a provider off when it proves unreachable and back
/// on when it recovers. The engine reads this, it never writes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnabledProviders {
    /// `OpenAI` is usable.
    pub openai: bool,
    /// Anthropic is usable.
    pub anthropic: bool,
    /// Google is usable.
    pub google: bool,
    /// `DeepSeek` is usable.
    pub deepseek: bool,
}

impl EnabledProviders {
    /// Derive availability from configured API keys.
    #[must_use]
    pub fn from_api_keys(api: &ApiSettings) -> Self {
        let has_key = |p: &ProviderApiSettings| p.api_key.as_deref().is_some_and(|k| !k.is_empty());
        Self {
            openai: has_key(&api.openai),
            anthropic: has_key(&api.anthropic),
            google: has_key(&api.google),
            deepseek: has_key(&api.deepseek),
        }
    }

    /// Whether one backend is usable.
    #[must_use]
    pub fn is_enabled(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OpenAi => self.openai,
            ProviderKind::Anthropic => self.anthropic,
            ProviderKind::Google => self.google,
            ProviderKind::DeepSeek => self.deepseek,
        }
    }

    /// Flip one backend's availability (health sweep only).
    pub fn set_enabled(&mut self, kind: ProviderKind, enabled: bool) {
        match kind {
            ProviderKind::OpenAi => self.openai = enabled,
            ProviderKind::Anthropic => self.anthropic = enabled,
            ProviderKind::Google => self.google = enabled,
            ProviderKind::DeepSeek => self.deepseek = enabled,
        }
    }

    /// Backends currently enabled, in registry order.
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::all()
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── EngineSettings ───────────────────────────────────────────────────

    #[test]
    fn engine_defaults() {
        let e = EngineSettings::default();
        assert_eq!(e.default_model, "gpt-4o");
        assert_eq!(e.max_validation_retries, 2);
        assert_eq!(e.retry_delay_ms, 1000);
        assert_eq!(e.flush_size_threshold, 100);
        assert_eq!(e.flush_interval_ms, 100);
    }

    #[test]
    fn engine_partial_json_fills_defaults() {
        let e: EngineSettings = serde_json::from_str(r#"{"defaultModel":"gpt-4o-mini"}"#).unwrap();
        assert_eq!(e.default_model, "gpt-4o-mini");
        assert_eq!(e.max_validation_retries, 2);
    }

    // ── ApiSettings ──────────────────────────────────────────────────────

    #[test]
    fn api_settings_for_kind() {
        let mut api = ApiSettings::default();
        api.google.api_key = Some("g-key".into());
        assert_eq!(
            api.for_kind(ProviderKind::Google).api_key.as_deref(),
            Some("g-key")
        );
        assert!(api.for_kind(ProviderKind::OpenAi).api_key.is_none());
    }

    // ── EnabledProviders ─────────────────────────────────────────────────

    #[test]
    fn enabled_from_key_presence() {
        let mut api = ApiSettings::default();
        api.openai.api_key = Some("sk-1".into());
        api.deepseek.api_key = Some(String::new()); // empty key does not count

        let enabled = EnabledProviders::from_api_keys(&api);
        assert!(enabled.openai);
        assert!(!enabled.anthropic);
        assert!(!enabled.google);
        assert!(!enabled.deepseek);
    }

    #[test]
    fn set_enabled_flips_flag() {
        let mut enabled = EnabledProviders::default();
        enabled.set_enabled(ProviderKind::Anthropic, true);
        assert!(enabled.is_enabled(ProviderKind::Anthropic));
        enabled.set_enabled(ProviderKind::Anthropic, false);
        assert!(!enabled.is_enabled(ProviderKind::Anthropic));
    }

    #[test]
    fn enabled_kinds_in_registry_order() {
        let enabled = EnabledProviders {
            openai: true,
            anthropic: false,
            google: true,
            deepseek: true,
        };
        assert_eq!(
            enabled.enabled_kinds(),
            vec![
                ProviderKind::OpenAi,
                ProviderKind::Google,
                ProviderKind::DeepSeek
            ]
        );
    }

    #[test]
    fn settings_roundtrip() {
        let settings = MosaicSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: MosaicSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.engine.default_model, settings.engine.default_model);
    }
}
