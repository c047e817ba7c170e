//! Wire types for the `OpenAI` chat completions API.
//!
//! `DeepSeek` speaks the same format; its adapter reuses these types with a
//! different endpoint.

use mosaic_core::messages::{GenerationSettings, Message, Role};
use serde::{Deserialize, Serialize};

/// Streaming chat completions request body.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    /// Model ID.
    pub model: String,
    /// Conversation history.
    pub messages: Vec<ChatMessage>,
    /// Always true — this adapter only streams.
    pub stream: bool,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Top-p sampling.
    pub top_p: f64,
    /// Frequency penalty.
    pub frequency_penalty: f64,
    /// Presence penalty.
    pub presence_penalty: f64,
}

/// One wire-format message.
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: &'static str,
    /// Message text.
    pub content: String,
}

/// Map a [`Role`] to its wire name.
#[must_use]
pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Build the request body from engine messages and settings.
#[must_use]
pub fn build_request(
    model: &str,
    messages: &[Message],
    settings: &GenerationSettings,
) -> ChatRequest {
    ChatRequest {
        model: model.to_owned(),
        messages: messages
            .iter()
            .map(|m| ChatMessage {
                role: role_name(m.role),
                content: m.content.clone(),
            })
            .collect(),
        stream: true,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        top_p: settings.top_p,
        frequency_penalty: settings.frequency_penalty,
        presence_penalty: settings.presence_penalty,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE chunk types
// ─────────────────────────────────────────────────────────────────────────────

/// One SSE chunk of a streaming chat completion.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatChunk {
    /// Choice list; streaming responses carry at most one.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A single choice inside a chunk.
#[derive(Clone, Debug, Deserialize)]
pub struct ChunkChoice {
    /// Incremental delta payload.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Set on the final chunk of the choice.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental delta inside a choice.
///
/// Role-only and empty deltas are structural framing, not text.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkDelta {
    /// Text fragment, when this delta carries one.
    #[serde(default)]
    pub content: Option<String>,
}

/// Extract the text delta from a chunk, if it carries one.
#[must_use]
pub fn extract_delta(chunk: &ChatChunk) -> Option<String> {
    chunk
        .choices
        .first()
        .and_then(|c| c.delta.content.clone())
        .filter(|text| !text.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── build_request ────────────────────────────────────────────────────

    #[test]
    fn request_maps_roles_and_settings() {
        let messages = vec![Message::system("scaffold"), Message::user("make a timer")];
        let settings = GenerationSettings {
            temperature: 0.3,
            max_tokens: 2000,
            ..GenerationSettings::default()
        };
        let req = build_request("gpt-4o", &messages, &settings);

        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages[1].role, "user");
        assert!(req.stream);
        assert!((req.temperature - 0.3).abs() < f64::EPSILON);
        assert_eq!(req.max_tokens, 2000);
    }

    #[test]
    fn request_serializes_snake_case_fields() {
        let req = build_request(
            "gpt-4o",
            &[Message::user("x")],
            &GenerationSettings::default(),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("max_tokens").is_some());
        assert!(json.get("frequency_penalty").is_some());
        assert!(json.get("top_p").is_some());
    }

    // ── extract_delta ────────────────────────────────────────────────────

    #[test]
    fn extract_content_delta() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":"hello"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(extract_delta(&chunk), Some("hello".into()));
    }

    #[test]
    fn role_only_delta_ignored() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(extract_delta(&chunk), None);
    }

    #[test]
    fn finish_chunk_ignored() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(extract_delta(&chunk), None);
    }

    #[test]
    fn empty_choices_ignored() {
        let chunk: ChatChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(extract_delta(&chunk), None);
    }

    #[test]
    fn empty_content_ignored() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert_eq!(extract_delta(&chunk), None);
    }
}
