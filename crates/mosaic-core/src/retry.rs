//! Retry configuration and backoff calculation.
//!
//! Portable, sync-only building blocks for transport retry. The async retry
//! execution lives in `mosaic-llm` (which has access to tokio); this module
//! contains the math:
//!
//! - [`RetryConfig`]: retry parameters (max retries, backoff, jitter)
//! - [`calculate_backoff_delay`]: exponential backoff with explicit randomness
//! - [`parse_retry_after_header`]: parse a `Retry-After` HTTP header

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default maximum transport retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default maximum delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Default jitter factor (0.0–1.0).
pub const DEFAULT_JITTER_FACTOR: f64 = 0.2;

/// Configuration for transport retry logic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in ms (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay between retries in ms (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter factor 0.0–1.0 (default: 0.2).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_jitter_factor() -> f64 {
    DEFAULT_JITTER_FACTOR
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backoff calculation
// ─────────────────────────────────────────────────────────────────────────────

/// Calculate exponential backoff delay with explicit randomness.
///
/// Formula: `min(max_delay, base_delay * 2^attempt) * (1 + (random*2-1) * jitter)`
///
/// `random` must be a value in `[0.0, 1.0)` from a PRNG, mapped to a
/// symmetric ±jitter band around the capped exponential value.
///
/// # Arguments
///
/// * `attempt` — zero-based attempt index (0 for the first retry)
/// * `base_delay_ms` — base delay in milliseconds
/// * `max_delay_ms` — maximum delay cap
/// * `jitter_factor` — jitter range (0.0–1.0)
/// * `random` — PRNG sample in `[0.0, 1.0)`
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn calculate_backoff_delay(
    attempt: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_factor: f64,
    random: f64,
) -> u64 {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(31));
    let capped = exponential.min(max_delay_ms);

    let jitter = 1.0 + (random * 2.0 - 1.0) * jitter_factor;
    let with_jitter = (capped as f64) * jitter;

    with_jitter.round().max(0.0) as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry-After header parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a `Retry-After` HTTP header value.
///
/// The value can be either a number of seconds (e.g. `"120"`) or an
/// HTTP-date (e.g. `"Thu, 01 Dec 2025 16:00:00 GMT"`). Returns the delay
/// in milliseconds, or `None` if parsing fails.
#[must_use]
pub fn parse_retry_after_header(value: &str) -> Option<u64> {
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds * 1000);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let now = chrono::Utc::now();
        let delay_ms = date.signed_duration_since(now).num_milliseconds();
        #[allow(clippy::cast_sign_loss)]
        return Some(if delay_ms > 0 { delay_ms as u64 } else { 0 });
    }

    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── RetryConfig ──────────────────────────────────────────────────────

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.jitter_factor - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn retry_config_serde_fills_defaults() {
        let config: RetryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.base_delay_ms, DEFAULT_BASE_DELAY_MS);
    }

    // ── calculate_backoff_delay ──────────────────────────────────────────

    #[test]
    fn backoff_doubles_per_attempt_without_jitter() {
        assert_eq!(calculate_backoff_delay(0, 1000, 60_000, 0.0, 0.5), 1000);
        assert_eq!(calculate_backoff_delay(1, 1000, 60_000, 0.0, 0.5), 2000);
        assert_eq!(calculate_backoff_delay(2, 1000, 60_000, 0.0, 0.5), 4000);
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        assert_eq!(calculate_backoff_delay(10, 1000, 5000, 0.0, 0.5), 5000);
    }

    #[test]
    fn backoff_jitter_stays_in_band() {
        // jitter 0.2 → delay within ±20% of 1000
        for random in [0.0, 0.25, 0.5, 0.75, 0.999] {
            let d = calculate_backoff_delay(0, 1000, 60_000, 0.2, random);
            assert!((800..=1200).contains(&d), "delay {d} out of band");
        }
    }

    #[test]
    fn backoff_huge_attempt_does_not_overflow() {
        let d = calculate_backoff_delay(u32::MAX, 1000, 30_000, 0.0, 0.5);
        assert_eq!(d, 30_000);
    }

    // ── parse_retry_after_header ─────────────────────────────────────────

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after_header("120"), Some(120_000));
        assert_eq!(parse_retry_after_header("0"), Some(0));
    }

    #[test]
    fn retry_after_past_http_date_is_zero() {
        let past = "Thu, 01 Jan 2004 00:00:00 GMT";
        assert_eq!(parse_retry_after_header(past), Some(0));
    }

    #[test]
    fn retry_after_garbage_is_none() {
        assert_eq!(parse_retry_after_header("soon"), None);
        assert_eq!(parse_retry_after_header(""), None);
    }
}
