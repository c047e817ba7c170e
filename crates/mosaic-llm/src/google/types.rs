//! Wire types for the Google Gemini `generateContent` API.

use mosaic_core::messages::{GenerationSettings, Message, Role};
use serde::{Deserialize, Serialize};

/// Streaming generate-content request body.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns.
    pub contents: Vec<Content>,
    /// System prompt, separate from the turn list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    /// Sampling configuration.
    pub generation_config: GenerationConfig,
}

/// A conversation turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Content {
    /// `"user"` or `"model"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Ordered content parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One content part.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Part {
    /// Text payload.
    #[serde(default)]
    pub text: Option<String>,
}

/// System prompt wrapper.
#[derive(Clone, Debug, Serialize)]
pub struct SystemInstruction {
    /// Prompt parts.
    pub parts: Vec<Part>,
}

/// Sampling configuration.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f64,
    /// Top-p sampling.
    pub top_p: f64,
    /// Maximum tokens to generate.
    pub max_output_tokens: u32,
}

/// Build the request body from engine messages and settings.
///
/// System messages become the `systemInstruction`; user turns keep the
/// `"user"` role and assistant turns map to `"model"`.
#[must_use]
pub fn build_request(messages: &[Message], settings: &GenerationSettings) -> GenerateContentRequest {
    let system_parts: Vec<Part> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| Part {
            text: Some(m.content.clone()),
        })
        .collect();

    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| Content {
            role: Some(
                match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                }
                .to_owned(),
            ),
            parts: vec![Part {
                text: Some(m.content.clone()),
            }],
        })
        .collect();

    GenerateContentRequest {
        contents,
        system_instruction: (!system_parts.is_empty())
            .then_some(SystemInstruction { parts: system_parts }),
        generation_config: GenerationConfig {
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_output_tokens: settings.max_tokens,
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE chunk types
// ─────────────────────────────────────────────────────────────────────────────

/// One SSE chunk of a streaming generate-content response.
#[derive(Clone, Debug, Deserialize)]
pub struct GenerateContentChunk {
    /// Candidate list; streaming responses carry at most one.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// A response candidate.
#[derive(Clone, Debug, Deserialize)]
pub struct Candidate {
    /// Generated content for this chunk.
    #[serde(default)]
    pub content: Option<Content>,
}

/// Extract the text of a chunk (all parts of the first candidate, joined).
#[must_use]
pub fn extract_text(chunk: &GenerateContentChunk) -> Option<String> {
    let content = chunk.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    (!text.is_empty()).then_some(text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
