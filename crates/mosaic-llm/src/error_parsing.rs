//! Shared API error response parsing across the four backends.
//!
//! Handles the error envelope formats they actually return:
//! - `OpenAI`/`DeepSeek`/Anthropic: `{"error": {"message": "...", "type": "..."}}`
//! - Google: `{"error": {"message": "...", "status": "..."}}`
//! - Flat: `{"message": "...", "code": "..."}`

use serde_json::Value;

/// Parsed API error information.
pub struct ApiErrorInfo {
    /// Human-readable error message.
    pub message: String,
    /// Provider-specific error code (e.g. `"overloaded_error"`, `"NOT_FOUND"`).
    pub code: Option<String>,
    /// Whether the request can be retried (429 or 5xx).
    pub retryable: bool,
}

/// Parse an API error response body into structured error info.
///
/// Tries the known JSON envelopes in order of specificity, falling back to
/// the raw body text if nothing matches.
pub fn parse_api_error(body: &str, status: u16) -> ApiErrorInfo {
    let retryable = status == 429 || status >= 500;

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        // Standard envelope: {"error": {"message": "...", "type"/"status": "..."}}
        if let Some(msg) = json["error"]["message"].as_str() {
            let code = json["error"]["type"]
                .as_str()
                .or_else(|| json["error"]["status"].as_str())
                .map(String::from);
            return ApiErrorInfo {
                message: msg.to_string(),
                code,
                retryable,
            };
        }

        // Flat: {"message": "...", "code": "..."}
        if let Some(msg) = json["message"].as_str() {
            let code = json["code"]
                .as_str()
                .or_else(|| json["type"].as_str())
                .map(String::from);
            return ApiErrorInfo {
                message: msg.to_string(),
                code,
                retryable,
            };
        }

        // Valid JSON but unrecognized structure — include raw body
        return ApiErrorInfo {
            message: format!("HTTP {status}: {body}"),
            code: None,
            retryable,
        };
    }

    ApiErrorInfo {
        message: format!("HTTP {status}: {body}"),
        code: None,
        retryable,
    }
}

/// Convert a non-2xx response into the matching [`ProviderError`].
///
/// 401/403 become auth errors, 429 becomes a rate-limit error carrying any
/// `Retry-After` hint, everything else an API error with the parsed
/// envelope.
///
/// [`ProviderError`]: crate::provider::ProviderError
pub(crate) async fn status_error(
    response: reqwest::Response,
    provider: &str,
) -> crate::provider::ProviderError {
    use crate::provider::ProviderError;

    let status = response.status();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(mosaic_core::retry::parse_retry_after_header);
    let body_text = response.text().await.unwrap_or_default();
    let info = parse_api_error(&body_text, status.as_u16());
    tracing::error!(
        provider,
        status = status.as_u16(),
        code = info.code.as_deref().unwrap_or("unknown"),
        retryable = info.retryable,
        "API error"
    );

    if status.as_u16() == 401 || status.as_u16() == 403 {
        return ProviderError::Auth {
            message: info.message,
        };
    }
    if status.as_u16() == 429 {
        return ProviderError::RateLimited {
            retry_after_ms: retry_after.unwrap_or(0),
            message: info.message,
        };
    }
    ProviderError::Api {
        status: status.as_u16(),
        message: info.message,
        code: info.code,
        retryable: info.retryable,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_standard_format() {
        let body = r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let info = parse_api_error(body, 529);
        assert_eq!(info.message, "Overloaded");
        assert_eq!(info.code.as_deref(), Some("overloaded_error"));
        assert!(info.retryable);
    }

    #[test]
    fn google_status_format() {
        let body = r#"{"error":{"status":"NOT_FOUND","message":"Model not found"}}"#;
        let info = parse_api_error(body, 404);
        assert_eq!(info.message, "Model not found");
        assert_eq!(info.code.as_deref(), Some("NOT_FOUND"));
        assert!(!info.retryable);
    }

    #[test]
    fn flat_message_format() {
        let body = r#"{"message":"Invalid model","code":"model_not_found"}"#;
        let info = parse_api_error(body, 400);
        assert_eq!(info.message, "Invalid model");
        assert_eq!(info.code.as_deref(), Some("model_not_found"));
        assert!(!info.retryable);
    }

    #[test]
    fn unrecognized_json_includes_body() {
        let body = r#"{"error":{}}"#;
        let info = parse_api_error(body, 400);
        assert!(info.message.contains("400"));
        assert!(info.message.contains(r#"{"error":{}}"#));
        assert!(info.code.is_none());
    }

    #[test]
    fn non_json_body() {
        let info = parse_api_error("Bad Gateway", 502);
        assert!(info.message.contains("502"));
        assert!(info.message.contains("Bad Gateway"));
        assert!(info.retryable);
    }

    #[test]
    fn retryable_statuses() {
        assert!(parse_api_error("", 429).retryable);
        assert!(parse_api_error("", 500).retryable);
        assert!(parse_api_error("", 503).retryable);
        assert!(!parse_api_error("", 400).retryable);
        assert!(!parse_api_error("", 401).retryable);
    }

    #[test]
    fn type_preferred_over_status_when_both_present() {
        let body = r#"{"error":{"type":"overloaded","status":"UNAVAILABLE","message":"busy"}}"#;
        let info = parse_api_error(body, 503);
        assert_eq!(info.code.as_deref(), Some("overloaded"));
    }
}
