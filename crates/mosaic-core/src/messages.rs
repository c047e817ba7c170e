//! Message and request types for the Mosaic generation pipeline.
//!
//! A generation request is an ordered list of role-tagged messages plus the
//! sampling settings for the call. Requests are immutable once issued — the
//! engine clones and rewrites them between refinement attempts rather than
//! mutating an in-flight request.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Provider identity
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of an LLM backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// `OpenAI` chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages.
    Anthropic,
    /// Google Gemini.
    Google,
    /// `DeepSeek` (`OpenAI`-compatible wire format).
    DeepSeek,
}

impl ProviderKind {
    /// Stable lowercase identifier, used in logs, metrics, and persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::DeepSeek => "deepseek",
        }
    }

    /// All supported backends, in registry order.
    #[must_use]
    pub fn all() -> [Self; 4] {
        [Self::OpenAi, Self::Anthropic, Self::Google, Self::DeepSeek]
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "google" => Ok(Self::Google),
            "deepseek" => Ok(Self::DeepSeek),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Role of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the generation (prompt scaffold).
    System,
    /// End-user input.
    User,
    /// Model output from an earlier turn.
    Assistant,
}

/// A single role-tagged message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role.
    pub role: Role,
    /// Plain-text content.
    pub content: String,
}

impl Message {
    /// Build a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generation settings
// ─────────────────────────────────────────────────────────────────────────────

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default maximum output tokens per call.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
/// Default nucleus-sampling cutoff.
pub const DEFAULT_TOP_P: f64 = 1.0;

/// Sampling parameters for one generation call.
///
/// Providers ignore fields their API does not support (e.g. the penalty
/// pair on backends without it).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Top-p sampling.
    pub top_p: f64,
    /// Frequency penalty.
    #[serde(default)]
    pub frequency_penalty: f64,
    /// Presence penalty.
    #[serde(default)]
    pub presence_penalty: f64,
    /// Whether the response is streamed. Always true in the engine; kept
    /// explicit so requests round-trip through persistence faithfully.
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream: true,
        }
    }
}

impl GenerationSettings {
    /// Return a copy with the temperature replaced.
    #[must_use]
    pub fn with_temperature(&self, temperature: f64) -> Self {
        Self {
            temperature,
            ..self.clone()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generation request
// ─────────────────────────────────────────────────────────────────────────────

/// A complete request for one generation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Model ID (e.g. `"gpt-4o"`, `"claude-3-5-sonnet-20241022"`).
    pub model: String,
    /// Ordered conversation history.
    pub messages: Vec<Message>,
    /// Sampling settings.
    #[serde(default)]
    pub settings: GenerationSettings,
}

impl GenerationRequest {
    /// Build a request from a model and messages with default settings.
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            settings: GenerationSettings::default(),
        }
    }

    /// Concatenated content of all user messages, for prompt-side token
    /// accounting.
    #[must_use]
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
