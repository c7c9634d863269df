//! URL normalization used for every source/target comparison.

/// Canonical form of a path: trimmed, lowercased, trailing slashes removed.
///
/// A path made only of slashes collapses to `/`. Returns `None` for input
/// that is empty after trimming. Whitespace mixed into the trailing slashes
/// is stripped with them, so the result is a fixed point.
pub fn normalize_path(path: &str) -> Option<String> {
    let trimmed = path.trim_matches(is_blank);
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    let stripped = lowered.trim_end_matches(|c: char| c == '/' || is_blank(c));
    if stripped.is_empty() {
        Some("/".to_string())
    } else {
        Some(stripped.to_string())
    }
}

// Unicode whitespace plus the byte-order mark, which CMS text fields can carry.
fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}
