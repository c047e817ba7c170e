//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MosaicSettings::default()`]
//! 2. If `~/.mosaic/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::MosaicSettings;

/// Resolve the path to the settings file (`~/.mosaic/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".mosaic").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MosaicSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<MosaicSettings> {
    let defaults = serde_json::to_value(MosaicSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: MosaicSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// API keys use the vendor-conventional variable names; engine knobs use
/// `MOSAIC_*`. Invalid values are logged and ignored (fall back to
/// file/default).
pub fn apply_env_overrides(settings: &mut MosaicSettings) {
    // ── API keys ────────────────────────────────────────────────────
    if let Some(v) = read_env_string("OPENAI_API_KEY") {
        settings.api.openai.api_key = Some(v);
    }
    if let Some(v) = read_env_string("ANTHROPIC_API_KEY") {
        settings.api.anthropic.api_key = Some(v);
    }
    if let Some(v) = read_env_string("GOOGLE_API_KEY") {
        settings.api.google.api_key = Some(v);
    }
    if let Some(v) = read_env_string("DEEPSEEK_API_KEY") {
        settings.api.deepseek.api_key = Some(v);
    }

    // ── Engine knobs ────────────────────────────────────────────────
    if let Some(v) = read_env_string("MOSAIC_DEFAULT_MODEL") {
        settings.engine.default_model = v;
    }
    if let Some(v) = read_env_u32("MOSAIC_MAX_VALIDATION_RETRIES", 0, 10) {
        settings.engine.max_validation_retries = v;
    }
    if let Some(v) = read_env_u64("MOSAIC_RETRY_DELAY_MS", 0, 60_000) {
        settings.engine.retry_delay_ms = v;
    }
    if let Some(v) = read_env_usize("MOSAIC_FLUSH_SIZE", 1, 65_536) {
        settings.engine.flush_size_threshold = v;
    }
    if let Some(v) = read_env_u64("MOSAIC_FLUSH_INTERVAL_MS", 1, 60_000) {
        settings.engine.flush_interval_ms = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
