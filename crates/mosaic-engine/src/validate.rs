//! # Structural Validator
//!
//! Cheap syntactic checks that a normalized artifact is at least a
//! plausible component: non-empty, declares something, exports a default,
//! and balances its delimiters. Deliberately not a parse — structurally
//! valid but semantically broken code passes, and the runtime error loop
//! catches it later.
//!
//! Checks short-circuit in a fixed order; the first failure wins.

use std::sync::LazyLock;

use regex::Regex;

/// Ways an artifact can fail structural validation.
///
/// Each maps to one check, in check order.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Nothing left after trimming.
    #[error("empty code response")]
    EmptyArtifact,
    /// No `function <name>` or `const <name>` declaration anywhere.
    #[error("invalid component structure")]
    InvalidComponentStructure,
    /// No default-export marker.
    #[error("missing export default statement")]
    MissingDefaultExport,
    /// `()`, `{}`, `[]` unbalanced or incorrectly nested.
    #[error("mismatched or unclosed brackets")]
    MismatchedOrUnclosedBrackets,
}

impl ValidationError {
    /// Stable identifier for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyArtifact => "empty_artifact",
            Self::InvalidComponentStructure => "invalid_component_structure",
            Self::MissingDefaultExport => "missing_default_export",
            Self::MismatchedOrUnclosedBrackets => "mismatched_brackets",
        }
    }
}

/// Result of one validation pass.
pub type ValidationResult = Result<(), ValidationError>;

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\bfunction\b|\bconst\b)\s+\w+").expect("declaration regex is valid")
});

/// Validate a normalized artifact.
///
/// Pure: the same input always yields the same result.
pub fn validate(code: &str) -> ValidationResult {
    if code.trim().is_empty() {
        return Err(ValidationError::EmptyArtifact);
    }

    if !DECLARATION_RE.is_match(code) {
        return Err(ValidationError::InvalidComponentStructure);
    }

    if !code.contains("export default") {
        return Err(ValidationError::MissingDefaultExport);
    }

    check_brackets(code)
}

/// Stack-disciplined bracket matching over `()`, `{}`, `[]`.
///
/// Push on open, pop-and-match on close; an unmatched close or a non-empty
/// stack at the end is invalid. Other characters (including quotes — this
/// is a structural proxy, not a lexer) are ignored.
fn check_brackets(code: &str) -> ValidationResult {
    let mut stack: Vec<char> = Vec::new();

    for ch in code.chars() {
        match ch {
            '(' | '{' | '[' => stack.push(ch),
            ')' | '}' | ']' => {
                let expected = match ch {
                    ')' => '(',
                    '}' => '{',
                    _ => '[',
                };
                if stack.pop() != Some(expected) {
                    return Err(ValidationError::MismatchedOrUnclosedBrackets);
                }
            }
            _ => {}
        }
    }

    if stack.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MismatchedOrUnclosedBrackets)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
