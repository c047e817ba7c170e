//! # Token Analytics Estimator
//!
//! Per-call and cumulative token accounting, riding alongside every
//! generation. Estimation is policy-per-provider-family:
//!
//! - `openai` / `deepseek` — exact `cl100k_base` count
//! - `anthropic` — exact count scaled by 1.1 (rounded up) to approximate
//!   its different tokenization
//! - `google` — character length divided by 4, rounded up
//! - anything else — 0
//!
//! Analytics never fail a generation: estimation errors are logged by the
//! caller and the outcome stands.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;

use mosaic_llm::models::{ModelInfo, find_model};

static CL100K: LazyLock<CoreBPE> =
    LazyLock::new(|| tiktoken_rs::cl100k_base().expect("failed to load cl100k_base tokenizer"));

/// Exact `cl100k_base` token count.
fn exact_tokens(text: &str) -> u32 {
    u32::try_from(CL100K.encode_ordinary(text).len()).unwrap_or(u32::MAX)
}

/// Estimate the token count of `text` for a provider family.
///
/// `provider` is the lowercase family string; unknown families estimate 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn estimate_tokens(text: &str, provider: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    match provider {
        "openai" | "deepseek" => exact_tokens(text),
        "anthropic" => (f64::from(exact_tokens(text)) * 1.1).ceil() as u32,
        "google" => (text.len() as f64 / 4.0).ceil() as u32,
        _ => 0,
    }
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Errors from the analytics estimator. Non-fatal by policy: callers log
/// and continue.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Model ID not present in the registry.
    #[error("unknown model for analytics: {model}")]
    UnknownModel {
        /// The unrecognized model ID.
        model: String,
    },
}

/// Token accounting for one generation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAnalytics {
    /// Display name of the model.
    pub model_name: String,
    /// Provider family string.
    pub provider: String,
    /// Estimated prompt-side tokens.
    pub prompt_tokens: u32,
    /// Estimated response-side tokens.
    pub response_tokens: u32,
    /// `prompt_tokens + response_tokens`.
    pub total_tokens: u32,
    /// The model's max-token ceiling.
    pub max_tokens: u32,
    /// `total / max × 100`, rounded to two decimals.
    pub utilization_percentage: f64,
}

impl TokenAnalytics {
    /// Compute analytics for one call from the prompt and generated code.
    pub fn compute(model_id: &str, prompt: &str, code: &str) -> Result<Self, AnalyticsError> {
        let info = find_model(model_id).ok_or_else(|| AnalyticsError::UnknownModel {
            model: model_id.to_owned(),
        })?;
        Ok(Self::compute_for(info, prompt, code))
    }

    /// Compute analytics against a known model entry.
    #[must_use]
    pub fn compute_for(info: &ModelInfo, prompt: &str, code: &str) -> Self {
        let provider = info.kind.as_str();
        let prompt_tokens = estimate_tokens(prompt, provider);
        let response_tokens = estimate_tokens(code, provider);
        let total_tokens = prompt_tokens + response_tokens;
        Self {
            model_name: info.name.to_owned(),
            provider: provider.to_owned(),
            prompt_tokens,
            response_tokens,
            total_tokens,
            max_tokens: info.max_tokens,
            utilization_percentage: round2(
                f64::from(total_tokens) / f64::from(info.max_tokens) * 100.0,
            ),
        }
    }
}

/// Cumulative token accounting across one artifact lineage.
///
/// Sums prompt/response/total tokens over every successful analytics
/// computation since the last brand-new generation. Utilization is
/// recomputed against the **latest** call's max-token ceiling, even when
/// the lineage mixes models with different ceilings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeTokenAnalytics {
    /// Most recent per-call analytics.
    #[serde(flatten)]
    pub latest: TokenAnalytics,
    /// Summed prompt tokens.
    pub cumulative_prompt_tokens: u32,
    /// Summed response tokens.
    pub cumulative_response_tokens: u32,
    /// Summed total tokens.
    pub cumulative_total_tokens: u32,
    /// Cumulative total vs. the latest call's ceiling.
    pub cumulative_utilization_percentage: f64,
}

/// Session-scoped analytics accumulator for one artifact lineage.
///
/// Reset when a brand-new (non-refinement) generation starts; merged on
/// every successful computation thereafter.
#[derive(Clone, Debug, Default)]
pub struct AnalyticsSession {
    cumulative: Option<CumulativeTokenAnalytics>,
}

impl AnalyticsSession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop accumulated state (brand-new generation).
    pub fn reset(&mut self) {
        self.cumulative = None;
    }

    /// Merge one call's analytics and return the updated cumulative view.
    pub fn record(&mut self, analytics: TokenAnalytics) -> &CumulativeTokenAnalytics {
        let (prompt, response) = match &self.cumulative {
            Some(prev) => (
                prev.cumulative_prompt_tokens + analytics.prompt_tokens,
                prev.cumulative_response_tokens + analytics.response_tokens,
            ),
            None => (analytics.prompt_tokens, analytics.response_tokens),
        };
        let total = prompt + response;
        let utilization = round2(f64::from(total) / f64::from(analytics.max_tokens) * 100.0);

        self.cumulative.insert(CumulativeTokenAnalytics {
            latest: analytics,
            cumulative_prompt_tokens: prompt,
            cumulative_response_tokens: response,
            cumulative_total_tokens: total,
            cumulative_utilization_percentage: utilization,
        })
    }

    /// Current cumulative view, if any call has been recorded.
    #[must_use]
    pub fn current(&self) -> Option<&CumulativeTokenAnalytics> {
        self.cumulative.as_ref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
