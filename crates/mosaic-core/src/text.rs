//! Text utilities shared across crates.

/// Truncate a string to at most `max` bytes on a char boundary, appending
/// an ellipsis marker when truncation happened. Used for log previews of
/// stream payloads and prompts.
#[must_use]
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_owned();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_unchanged() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn exact_length_unchanged() {
        assert_eq!(truncate_str("hello", 5), "hello");
    }

    #[test]
    fn long_string_truncated_with_marker() {
        assert_eq!(truncate_str("hello world", 5), "hello…");
    }

    #[test]
    fn respects_char_boundaries() {
        // "é" is two bytes; cutting at 1 would split it
        let out = truncate_str("édition", 1);
        assert_eq!(out, "…");
    }
}
