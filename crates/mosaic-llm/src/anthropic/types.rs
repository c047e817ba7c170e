//! Wire types for the Anthropic Messages API.

use mosaic_core::messages::{GenerationSettings, Message, Role};
use serde::{Deserialize, Serialize};

/// Streaming messages request body.
#[derive(Clone, Debug, Serialize)]
pub struct AnthropicRequest {
    /// Model ID.
    pub model: String,
    /// Maximum tokens to generate (required by the API).
    pub max_tokens: u32,
    /// Conversation turns (no system role; see `system`).
    pub messages: Vec<AnthropicMessage>,
    /// System prompt, separate from the turn list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Always true — this adapter only streams.
    pub stream: bool,
    /// Sampling temperature.
    pub temperature: f64,
    /// Top-p sampling.
    pub top_p: f64,
}

/// One conversation turn.
#[derive(Clone, Debug, Serialize)]
pub struct AnthropicMessage {
    /// `"user"` or `"assistant"`.
    pub role: &'static str,
    /// Turn text.
    pub content: String,
}

/// Build the request body from engine messages and settings.
///
/// System messages are folded into the separate `system` parameter; the
/// remaining turns keep their order.
#[must_use]
pub fn build_request(
    model: &str,
    messages: &[Message],
    settings: &GenerationSettings,
) -> AnthropicRequest {
    let system_parts: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));

    let turns = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| AnthropicMessage {
            role: match m.role {
                Role::Assistant => "assistant",
                _ => "user",
            },
            content: m.content.clone(),
        })
        .collect();

    AnthropicRequest {
        model: model.to_owned(),
        max_tokens: settings.max_tokens,
        messages: turns,
        system,
        stream: true,
        temperature: settings.temperature,
        top_p: settings.top_p,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE event types
// ─────────────────────────────────────────────────────────────────────────────

/// Typed Anthropic SSE events.
///
/// Only `content_block_delta` with a `text_delta` payload carries artifact
/// text; every other event type is structural framing and is ignored
/// without error. `error` events are fatal.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicSseEvent {
    /// Message envelope opened.
    MessageStart,
    /// A content block opened.
    ContentBlockStart,
    /// Incremental content for the open block.
    ContentBlockDelta {
        /// The delta payload.
        delta: SseDelta,
    },
    /// The open block closed.
    ContentBlockStop,
    /// Top-level message metadata update.
    MessageDelta,
    /// Message envelope closed — clean end of stream.
    MessageStop,
    /// Keep-alive.
    Ping,
    /// Fatal stream error.
    Error {
        /// Error details.
        error: SseError,
    },
    /// Forward-compatibility: unrecognized event types are ignored.
    #[serde(other)]
    Unknown,
}

/// Delta payload inside a `content_block_delta` event.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SseDelta {
    /// Text fragment.
    TextDelta {
        /// The fragment.
        text: String,
    },
    /// Non-text delta (tool input, signatures, …) — not artifact text.
    #[serde(other)]
    Other,
}

/// Error payload of an `error` event.
#[derive(Clone, Debug, Deserialize)]
pub struct SseError {
    /// Error type string (e.g. `"overloaded_error"`).
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable message.
    pub message: String,
}

/// Extract the text delta from an event, if it carries one.
#[must_use]
pub fn extract_delta(event: &AnthropicSseEvent) -> Option<&str> {
    match event {
        AnthropicSseEvent::ContentBlockDelta {
            delta: SseDelta::TextDelta { text },
        } => Some(text),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
