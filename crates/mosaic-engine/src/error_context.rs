//! # Error-context builder
//!
//! Turns a raw runtime/compile error string into structured context for the
//! next refinement prompt: the core message, the offending line/column when
//! extractable, a short surrounding snippet, and a keyword-family checklist
//! of fix instructions. The output is advisory text for the backend, not
//! machine-enforced.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

static SYNTAX_MSG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)SyntaxError:(.*?)\n").expect("syntax regex is valid"));

static LINE_COL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+):(\d+)\)").expect("line-col regex is valid"));

static LINE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)line (\d+)").expect("line regex is valid"));

static COLUMN_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)column (\d+)").expect("column regex is valid"));

static SNIPPET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\n\s*\d+ \|.*){2,4}").expect("snippet regex is valid"));

/// Keyword family of an error message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorFamily {
    /// `SyntaxError` — malformed JSX/TS.
    Syntax,
    /// `TypeError` — bad property access, wrong types.
    Type,
    /// `ReferenceError` — undefined identifiers, missing imports.
    Reference,
    /// Anything else.
    Generic,
}

/// Classify an error string by keyword.
#[must_use]
pub fn classify(error: &str) -> ErrorFamily {
    if error.contains("SyntaxError") {
        ErrorFamily::Syntax
    } else if error.contains("TypeError") {
        ErrorFamily::Type
    } else if error.contains("ReferenceError") {
        ErrorFamily::Reference
    } else {
        ErrorFamily::Generic
    }
}

/// Structured view of a raw error string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    /// Core message (the `SyntaxError:` line when present, else the whole
    /// error).
    pub message: String,
    /// Offending line, when extractable.
    pub line: Option<u32>,
    /// Offending column, when extractable.
    pub column: Option<u32>,
    /// Short surrounding code snippet (` N | …` frame lines), or empty.
    pub snippet: String,
}

/// Parse a raw error string into an [`ErrorReport`].
///
/// Line/column come from a `(line:col)` marker when present, falling back
/// to `line N` / `column N` phrasing.
#[must_use]
pub fn parse_error_report(error: &str) -> ErrorReport {
    let message = SYNTAX_MSG_RE
        .captures(error)
        .and_then(|c| c.get(1))
        .map_or_else(|| error.trim().to_owned(), |m| m.as_str().trim().to_owned());

    let (mut line, mut column) = LINE_COL_RE.captures(error).map_or((None, None), |c| {
        (
            c.get(1).and_then(|m| m.as_str().parse().ok()),
            c.get(2).and_then(|m| m.as_str().parse().ok()),
        )
    });

    if line.is_none() {
        line = LINE_WORD_RE
            .captures(error)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());
    }
    if column.is_none() {
        column = COLUMN_WORD_RE
            .captures(error)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());
    }

    let snippet = SNIPPET_RE
        .find(error)
        .map(|m| m.as_str().trim().to_owned())
        .unwrap_or_default();

    ErrorReport {
        message,
        line,
        column,
        snippet,
    }
}

/// Family-specific checklist of fix instructions.
#[must_use]
pub fn fix_checklist(error: &str) -> String {
    let report = parse_error_report(error);
    let lines: Vec<String> = match classify(error) {
        ErrorFamily::Syntax => vec![
            "- Fix the syntax error in the component".into(),
            "- Ensure proper JSX formatting and tag closure".into(),
            "- Validate attribute syntax and values".into(),
            format!(
                "- Pay special attention to line {}",
                report
                    .line
                    .map_or_else(|| "with error".to_owned(), |l| l.to_string())
            ),
        ],
        ErrorFamily::Type => vec![
            "- Fix type-related issues in the component".into(),
            "- Ensure proper prop types and interfaces".into(),
            "- Validate null/undefined handling".into(),
            "- Check object property access".into(),
        ],
        ErrorFamily::Reference => vec![
            "- Fix undefined variable references".into(),
            "- Verify all required imports are present".into(),
            "- Check variable scope and declarations".into(),
            "- Validate hook usage rules".into(),
        ],
        ErrorFamily::Generic => vec![
            "- Review and fix the component structure".into(),
            "- Ensure proper React patterns are followed".into(),
            "- Validate component logic and data flow".into(),
            "- Check for potential runtime issues".into(),
        ],
    };
    lines.join("\n")
}

/// Build the full error-context block embedded into a refinement prompt.
#[must_use]
pub fn build_error_context(error: &str) -> String {
    let report = parse_error_report(error);

    let mut out = String::new();
    out.push_str("Current Error Details:\n");
    out.push_str(&report.message);
    out.push('\n');

    if let Some(line) = report.line {
        let _ = write!(out, "At Line: {line}");
        if let Some(column) = report.column {
            let _ = write!(out, ", Column: {column}");
        }
        out.push('\n');
    }

    if !report.snippet.is_empty() {
        let _ = write!(out, "\nProblematic Code Section:\n{}\n", report.snippet);
    }

    let _ = write!(
        out,
        "\nRequired Fixes:\n{}\n\nSpecial Instructions:\n\
         1. Maintain existing imports and component structure\n\
         2. Preserve all working functionality\n\
         3. Focus on fixing the identified error\n\
         4. Ensure proper TypeScript types\n\
         5. Follow React best practices\n",
        fix_checklist(error)
    );

    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
