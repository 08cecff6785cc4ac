//! UTF-8-safe truncation helpers.
//!
//! Budgets are expressed in characters (tokens * 4), so cuts are made on
//! `char` boundaries; byte slicing could panic inside a multi-byte character.

/// Return the prefix made of at most `max_chars` characters.
pub fn safe_prefix_by_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Truncate by characters and append `suffix` when truncation occurs.
pub fn truncate_with_suffix_by_chars(text: &str, max_chars: usize, suffix: &str) -> String {
    let prefix = safe_prefix_by_chars(text, max_chars);
    if prefix.len() == text.len() {
        return text.to_string();
    }
    format!("{prefix}{suffix}")
}

/// Cut to `max_chars` characters and always append `marker`.
///
/// The result is never longer than `max_chars + marker.chars().count()`.
pub fn cut_with_marker(text: &str, max_chars: usize, marker: &str) -> String {
    format!("{}{marker}", safe_prefix_by_chars(text, max_chars))
}
