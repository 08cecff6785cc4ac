//! Crude token estimation.
//!
//! Provides a rough heuristic (~1 token per 4 chars, ~0.75 words per token)
//! for pre-flight budget checks. The goal is conservative budget pressure, not
//! billing accuracy; no tokenizer is involved.

use crate::conversation::Conversation;

/// Characters per token used by every estimate in the crate.
pub const CHARS_PER_TOKEN: usize = 4;
/// Words per token (~1.33 tokens per word).
pub const WORDS_PER_TOKEN: f64 = 0.75;

/// Estimate the token count of a piece of text.
///
/// `ceil(chars / 4)`; counts Unicode scalar values, not bytes.
pub fn estimate_text(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Sum of per-message estimates, excluding ephemeral messages.
///
/// Ephemeral (internal) messages are never sent in aggregate, so they do not
/// count against the budget.
pub fn estimate_conversation(conversation: &Conversation) -> usize {
    conversation
        .messages()
        .iter()
        .filter(|m| !m.source.is_ephemeral())
        .map(|m| estimate_text(&m.content))
        .sum()
}

/// Converts a word count to an estimated token count (rounded up).
pub fn words_to_tokens(words: usize) -> usize {
    (words as f64 / WORDS_PER_TOKEN).ceil() as usize
}

/// Converts a token count to an estimated word count (rounded down).
pub fn tokens_to_words(tokens: usize) -> usize {
    (tokens as f64 * WORDS_PER_TOKEN) as usize
}

/// Whitespace-separated word count; 0 for blank text.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Newline count plus one; 0 for empty text.
pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.matches('\n').count() + 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Provider;
    use crate::types::Role;

    #[test]
    fn estimate_text_rounds_up() {
        assert_eq!(estimate_text(""), 0);
        assert_eq!(estimate_text("abcd"), 1);
        assert_eq!(estimate_text("abcde"), 2);
        assert_eq!(estimate_text(&"x".repeat(400)), 100);
    }

    // Multi-byte characters count once each.
    #[test]
    fn estimate_text_counts_chars_not_bytes() {
        assert_eq!(estimate_text("éééé"), 1);
        assert_eq!(estimate_text("🙂🙂🙂🙂🙂"), 2);
    }

    #[test]
    fn word_token_conversions() {
        assert_eq!(words_to_tokens(0), 0);
        assert_eq!(words_to_tokens(3), 4);
        assert_eq!(words_to_tokens(75), 100);
        assert_eq!(tokens_to_words(100), 75);
        assert_eq!(tokens_to_words(1), 0);
    }

    #[test]
    fn word_and_line_counts() {
        assert_eq!(count_words("   "), 0);
        assert_eq!(count_words(" one  two\nthree "), 3);
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("one"), 1);
        assert_eq!(count_lines("one\ntwo\n"), 3);
    }

    #[test]
    fn conversation_estimate_skips_internal_messages() {
        let mut conv = Conversation::new("gpt-4o", Provider::OpenAi);
        conv.push_user("abcdabcd");
        conv.push_assistant("abcd", None);
        let base = estimate_conversation(&conv);
        assert_eq!(base, 3);

        conv.push_internal(Role::System, "x".repeat(4_000));
        assert_eq!(estimate_conversation(&conv), base);
    }

    #[cfg(feature = "fuzz-tests")]
    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn estimate_is_ceil_of_char_count(text in "\\PC{0,200}") {
                let chars = text.chars().count();
                let tokens = estimate_text(&text);
                prop_assert!(tokens * CHARS_PER_TOKEN >= chars);
                prop_assert!(tokens * CHARS_PER_TOKEN < chars + CHARS_PER_TOKEN);
            }

            #[test]
            fn concatenation_never_beats_parts(a in "\\PC{0,80}", b in "\\PC{0,80}") {
                let joined = format!("{a}{b}");
                prop_assert!(estimate_text(&joined) <= estimate_text(&a) + estimate_text(&b));
            }

            #[test]
            fn word_conversion_does_not_lose_words(words in 0usize..100_000) {
                prop_assert!(tokens_to_words(words_to_tokens(words)) >= words.saturating_sub(1));
            }
        }
    }
}
