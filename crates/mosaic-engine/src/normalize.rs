//! # Code Normalizer
//!
//! Pure text transform from raw accumulated model output to the canonical
//! artifact form. Steps, order-sensitive:
//!
//! 1. Remove fenced-code-block delimiters (with or without a language tag)
//!    anywhere in the text — models add them despite instructions.
//! 2. If the text has no default-export marker and opens with a top-level
//!    declaration (`const`/`function`/`class`), rewrite that leading
//!    declaration to also mark it as the default export.
//! 3. Trim surrounding whitespace.
//!
//! The transform is idempotent: normalizing already-normalized text is a
//! no-op. That property is what lets the engine re-normalize freely between
//! refinement attempts.

use std::sync::LazyLock;

use regex::Regex;

/// Default-export marker looked for before rewriting.
const EXPORT_MARKER: &str = "export default";

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[\w]*\n?").expect("fence regex is valid"));

static LEADING_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(const|function|class)\s+(\w+)").expect("decl regex is valid"));

/// Strip fenced-code-block delimiters anywhere in the text.
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    FENCE_RE.replace_all(text, "").into_owned()
}

/// Normalize raw model output into the canonical artifact form.
///
/// The leading declaration is found after trimming — otherwise a raw text
/// with leading whitespace would normalize differently on a second pass,
/// breaking idempotence.
#[must_use]
pub fn normalize(text: &str) -> String {
    let stripped = strip_code_fences(text);
    let trimmed = stripped.trim();
    if trimmed.contains(EXPORT_MARKER) {
        trimmed.to_owned()
    } else {
        LEADING_DECL_RE
            .replace(trimmed, "export default $1 $2")
            .into_owned()
    }
}

/// Clean one flushed fragment for progressive display.
///
/// Only fence stripping — the export rewrite and trim apply to the whole
/// artifact, not to mid-stream fragments whose boundaries are arbitrary.
#[must_use]
pub fn clean_fragment(fragment: &str) -> String {
    strip_code_fences(fragment)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
