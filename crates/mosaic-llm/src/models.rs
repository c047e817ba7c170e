//! # Model Registry
//!
//! Static tables of the models each backend serves, with display names and
//! max-token ceilings. Lookup is strict: a model ID outside these tables is
//! rejected before any stream opens.

use mosaic_core::messages::ProviderKind;

/// Metadata for one servable model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    /// Wire-level model ID.
    pub id: &'static str,
    /// Human-readable name (used in analytics).
    pub name: &'static str,
    /// Backend serving this model.
    pub kind: ProviderKind,
    /// Max-token ceiling used for utilization accounting.
    pub max_tokens: u32,
}

/// `OpenAI` models.
pub const OPENAI_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-4o",
        name: "GPT-4o",
        kind: ProviderKind::OpenAi,
        max_tokens: 128_000,
    },
    ModelInfo {
        id: "gpt-4o-mini",
        name: "GPT-4o Mini",
        kind: ProviderKind::OpenAi,
        max_tokens: 64_000,
    },
];

/// Anthropic models.
pub const ANTHROPIC_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "claude-3-5-sonnet-20241022",
        name: "Claude 3.5 Sonnet",
        kind: ProviderKind::Anthropic,
        max_tokens: 200_000,
    },
    ModelInfo {
        id: "claude-3-5-haiku-20241022",
        name: "Claude 3.5 Haiku",
        kind: ProviderKind::Anthropic,
        max_tokens: 200_000,
    },
    ModelInfo {
        id: "claude-3-opus-20240229",
        name: "Claude 3 Opus",
        kind: ProviderKind::Anthropic,
        max_tokens: 200_000,
    },
    ModelInfo {
        id: "claude-3-sonnet-20240229",
        name: "Claude 3 Sonnet",
        kind: ProviderKind::Anthropic,
        max_tokens: 200_000,
    },
    ModelInfo {
        id: "claude-3-haiku-20240307",
        name: "Claude 3 Haiku",
        kind: ProviderKind::Anthropic,
        max_tokens: 200_000,
    },
];

/// Google models.
pub const GOOGLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gemini-2.0-flash-exp",
        name: "Gemini 2.0 Flash",
        kind: ProviderKind::Google,
        max_tokens: 1_000_000,
    },
    ModelInfo {
        id: "gemini-1.5-flash",
        name: "Gemini 1.5 Flash",
        kind: ProviderKind::Google,
        max_tokens: 1_000_000,
    },
    ModelInfo {
        id: "gemini-1.5-flash-8b",
        name: "Gemini 1.5 Flash-8B",
        kind: ProviderKind::Google,
        max_tokens: 1_000_000,
    },
    ModelInfo {
        id: "gemini-1.5-pro",
        name: "Gemini 1.5 Pro",
        kind: ProviderKind::Google,
        max_tokens: 1_000_000,
    },
];

/// `DeepSeek` models.
pub const DEEPSEEK_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "deepseek-chat",
        name: "DeepSeek Chat",
        kind: ProviderKind::DeepSeek,
        max_tokens: 32_768,
    },
    ModelInfo {
        id: "deepseek-coder",
        name: "DeepSeek Coder",
        kind: ProviderKind::DeepSeek,
        max_tokens: 32_768,
    },
];

/// Default model per backend.
#[must_use]
pub fn default_model(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "gpt-4o",
        ProviderKind::Anthropic => "claude-3-5-sonnet-20241022",
        ProviderKind::Google => "gemini-2.0-flash-exp",
        ProviderKind::DeepSeek => "deepseek-chat",
    }
}

/// Models served by one backend.
#[must_use]
pub fn models_for(kind: ProviderKind) -> &'static [ModelInfo] {
    match kind {
        ProviderKind::OpenAi => OPENAI_MODELS,
        ProviderKind::Anthropic => ANTHROPIC_MODELS,
        ProviderKind::Google => GOOGLE_MODELS,
        ProviderKind::DeepSeek => DEEPSEEK_MODELS,
    }
}

/// Look up a model by exact ID across all backends.
#[must_use]
pub fn find_model(model_id: &str) -> Option<&'static ModelInfo> {
    ProviderKind::all()
        .into_iter()
        .flat_map(models_for)
        .find(|m| m.id == model_id)
}

/// Detect which backend serves a model ID.
///
/// Unknown model IDs return `None` (strict fail-fast behavior — there is no
/// family-prefix guessing).
#[must_use]
pub fn detect_provider(model_id: &str) -> Option<ProviderKind> {
    find_model(model_id).map(|m| m.kind)
}

/// Whether a model ID is recognized by any backend.
#[must_use]
pub fn is_model_supported(model_id: &str) -> bool {
    find_model(model_id).is_some()
}

/// All known model IDs across all backends.
#[must_use]
pub fn all_model_ids() -> Vec<&'static str> {
    ProviderKind::all()
        .into_iter()
        .flat_map(models_for)
        .map(|m| m.id)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── find_model / detect_provider ─────────────────────────────────────

    #[test]
    fn find_known_models() {
        assert_eq!(find_model("gpt-4o").unwrap().max_tokens, 128_000);
        assert_eq!(
            find_model("claude-3-5-sonnet-20241022").unwrap().name,
            "Claude 3.5 Sonnet"
        );
        assert_eq!(
            find_model("gemini-1.5-pro").unwrap().kind,
            ProviderKind::Google
        );
        assert_eq!(find_model("deepseek-coder").unwrap().max_tokens, 32_768);
    }

    #[test]
    fn detect_provider_per_family() {
        assert_eq!(detect_provider("gpt-4o-mini"), Some(ProviderKind::OpenAi));
        assert_eq!(
            detect_provider("claude-3-haiku-20240307"),
            Some(ProviderKind::Anthropic)
        );
        assert_eq!(
            detect_provider("gemini-1.5-flash-8b"),
            Some(ProviderKind::Google)
        );
        assert_eq!(detect_provider("deepseek-chat"), Some(ProviderKind::DeepSeek));
    }

    #[test]
    fn unknown_model_rejected() {
        assert_eq!(detect_provider("gpt-9-ultra"), None);
        assert_eq!(detect_provider("claude-some-future-model"), None);
        assert_eq!(detect_provider(""), None);
        assert!(!is_model_supported("totally-unknown"));
    }

    // ── defaults ─────────────────────────────────────────────────────────

    #[test]
    fn default_models_are_registered() {
        for kind in ProviderKind::all() {
            let id = default_model(kind);
            let info = find_model(id).expect("default model must be in registry");
            assert_eq!(info.kind, kind);
        }
    }

    // ── all_model_ids ────────────────────────────────────────────────────

    #[test]
    fn all_model_ids_covers_every_table() {
        let ids = all_model_ids();
        assert_eq!(
            ids.len(),
            OPENAI_MODELS.len()
                + ANTHROPIC_MODELS.len()
                + GOOGLE_MODELS.len()
                + DEEPSEEK_MODELS.len()
        );
        assert!(ids.contains(&"gpt-4o"));
        assert!(ids.contains(&"deepseek-chat"));
    }

    #[test]
    fn model_ids_are_unique() {
        let mut ids = all_model_ids();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }
}
