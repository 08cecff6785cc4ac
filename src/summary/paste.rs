//! Oversized paste handling for the composer.

use super::{SummaryContext, SummaryService};
use crate::tokens::{count_lines, count_words, estimate_text};
use tracing::debug;

/// Pastes with at least this many lines are shown as a placeholder.
const PLACEHOLDER_MIN_LINES: usize = 3;
/// Pastes longer than this many characters are shown as a placeholder.
const PLACEHOLDER_MIN_CHARS: usize = 150;

/// Result of [`SummaryService::process_paste`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteSummary {
    /// Shown in the composer: a placeholder or the paste itself.
    pub display_text: String,
    /// Sent on submit: the paste, or its summary/truncation.
    pub actual_text: String,
    pub was_summarized: bool,
    pub was_truncated: bool,
    /// Lines in the original paste.
    pub line_count: usize,
}

impl SummaryService {
    /// Turn pasted text into a composer placeholder plus the text to send.
    ///
    /// `index` numbers the placeholder (`[Pasted text 2]`).
    pub async fn process_paste(&self, text: &str, index: usize) -> PasteSummary {
        if text.is_empty() {
            return PasteSummary::default();
        }

        let line_count = count_lines(text);
        let tokens = estimate_text(text);
        let target_tokens = self.config.target_tokens;

        let use_placeholder = text.contains(['\n', '\r'])
            || line_count >= PLACEHOLDER_MIN_LINES
            || text.chars().count() > PLACEHOLDER_MIN_CHARS;
        let display_text = if use_placeholder {
            format!("[Pasted text {index}]")
        } else {
            text.to_string()
        };

        if !self.config.enabled || tokens <= target_tokens {
            return PasteSummary {
                display_text,
                actual_text: text.to_string(),
                was_summarized: false,
                was_truncated: false,
                line_count,
            };
        }

        debug!(
            index,
            tokens,
            words = count_words(text),
            target_tokens,
            "summarizing oversized paste"
        );
        let outcome = self
            .summarize_with_fallback(text, target_tokens, SummaryContext::PastedContent)
            .await;
        let label = if outcome.was_truncated {
            "truncated"
        } else {
            "summarized"
        };
        PasteSummary {
            display_text: format!("[Pasted text {index} ({label})]"),
            actual_text: outcome.text,
            was_summarized: true,
            was_truncated: outcome.was_truncated,
            line_count,
        }
    }
}

/// Composer-side record of pastes awaiting submit.
///
/// The composer shows placeholders; [`PasteBuffer::resolve`] swaps each one
/// back for the text that should actually be sent.
#[derive(Debug, Clone, Default)]
pub struct PasteBuffer {
    entries: Vec<PasteSummary>,
}

impl PasteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index to pass to the next [`SummaryService::process_paste`] call.
    pub fn next_index(&self) -> usize {
        self.entries.len() + 1
    }

    pub fn push(&mut self, paste: PasteSummary) {
        self.entries.push(paste);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Expand placeholders in `composed` and reset the buffer.
    ///
    /// One left-to-right pass: substituted text is never scanned again, so a
    /// paste that itself contains `[Pasted text 2]` is sent as written. When
    /// two placeholders start at the same position the longer one wins.
    pub fn resolve(&mut self, composed: &str) -> String {
        let entries: Vec<&PasteSummary> = self
            .entries
            .iter()
            .filter(|p| !p.display_text.is_empty() && p.display_text != p.actual_text)
            .collect();

        let mut resolved = String::with_capacity(composed.len());
        let mut rest = composed;
        loop {
            let next = entries
                .iter()
                .filter_map(|p| rest.find(&p.display_text).map(|at| (at, *p)))
                .min_by(|(a, pa), (b, pb)| {
                    a.cmp(b)
                        .then_with(|| pb.display_text.len().cmp(&pa.display_text.len()))
                });
            let Some((at, paste)) = next else {
                resolved.push_str(rest);
                break;
            };
            resolved.push_str(&rest[..at]);
            resolved.push_str(&paste.actual_text);
            rest = &rest[at + paste.display_text.len()..];
        }

        self.entries.clear();
        resolved
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::TRUNCATION_MARKER;
    use super::*;
    use crate::config::SummaryConfig;
    use crate::error::ApiError;

    fn small_target() -> SummaryConfig {
        SummaryConfig {
            target_tokens: 10,
            ..SummaryConfig::default()
        }
    }

    #[tokio::test]
    async fn empty_paste_is_empty_summary() {
        let stub = StubSummarizer::replying(vec![]);
        let svc = service(&stub, SummaryConfig::default());
        assert_eq!(svc.process_paste("", 1).await, PasteSummary::default());
    }

    #[tokio::test]
    async fn short_single_line_paste_is_shown_verbatim() {
        let stub = StubSummarizer::replying(vec![]);
        let svc = service(&stub, SummaryConfig::default());
        let out = svc.process_paste("just a word", 1).await;
        assert_eq!(out.display_text, "just a word");
        assert_eq!(out.actual_text, "just a word");
        assert_eq!(out.line_count, 1);
        assert!(!out.was_summarized);
    }

    #[tokio::test]
    async fn multiline_or_long_paste_uses_placeholder() {
        let stub = StubSummarizer::replying(vec![]);
        let svc = service(&stub, SummaryConfig::default());

        let out = svc.process_paste("line one\nline two", 2).await;
        assert_eq!(out.display_text, "[Pasted text 2]");
        assert_eq!(out.actual_text, "line one\nline two");
        assert_eq!(out.line_count, 2);

        let long = "y".repeat(151);
        let out = svc.process_paste(&long, 3).await;
        assert_eq!(out.display_text, "[Pasted text 3]");
        assert_eq!(out.actual_text, long);
        assert_eq!(stub.prompt_count(), 0);
    }

    #[tokio::test]
    async fn oversized_paste_is_summarized() {
        let stub = StubSummarizer::replying(vec![Ok("the gist".into())]);
        let svc = service(&stub, small_target());
        let out = svc.process_paste(&"word ".repeat(20), 1).await;
        assert_eq!(out.display_text, "[Pasted text 1 (summarized)]");
        assert_eq!(out.actual_text, "the gist");
        assert!(out.was_summarized);
        assert!(!out.was_truncated);
        assert!(stub.prompts.lock().unwrap()[0].contains("pasted content"));
    }

    #[tokio::test]
    async fn summarizer_failure_truncates_paste() {
        let stub = StubSummarizer::replying(vec![Err(ApiError::status(502, "", None))]);
        let svc = service(&stub, small_target());
        let out = svc.process_paste(&"z".repeat(100), 4).await;
        assert_eq!(out.display_text, "[Pasted text 4 (truncated)]");
        assert_eq!(out.actual_text, format!("{}{TRUNCATION_MARKER}", "z".repeat(40)));
        assert!(out.was_summarized);
        assert!(out.was_truncated);
    }

    #[tokio::test]
    async fn disabled_summary_passes_paste_through() {
        let stub = StubSummarizer::replying(vec![Ok("never".into())]);
        let svc = service(
            &stub,
            SummaryConfig {
                enabled: false,
                ..small_target()
            },
        );
        let text = "z".repeat(100);
        let out = svc.process_paste(&text, 1).await;
        assert_eq!(out.actual_text, text);
        assert!(!out.was_summarized);
        assert_eq!(stub.prompt_count(), 0);
    }

    #[tokio::test]
    async fn paste_buffer_resolves_placeholders_on_submit() {
        let stub = StubSummarizer::replying(vec![Ok("gist".into())]);
        let svc = service(&stub, small_target());
        let mut buffer = PasteBuffer::new();

        let first = svc.process_paste("a\nb", buffer.next_index()).await;
        buffer.push(first);
        let second = svc
            .process_paste(&"long ".repeat(40), buffer.next_index())
            .await;
        buffer.push(second);
        assert_eq!(buffer.len(), 2);

        let sent = buffer.resolve("see [Pasted text 1] and [Pasted text 2 (summarized)]");
        assert_eq!(sent, "see a\nb and gist");
        assert!(buffer.is_empty());
    }

    // Verifies substituted paste text is not expanded a second time.
    #[test]
    fn resolved_text_is_not_rescanned() {
        let mut buffer = PasteBuffer::new();
        buffer.push(PasteSummary {
            display_text: "[Pasted text 1]".into(),
            actual_text: "notes mention [Pasted text 2] verbatim".into(),
            line_count: 2,
            ..PasteSummary::default()
        });
        buffer.push(PasteSummary {
            display_text: "[Pasted text 2]".into(),
            actual_text: "second\npaste".into(),
            line_count: 2,
            ..PasteSummary::default()
        });

        let sent = buffer.resolve("[Pasted text 1] then [Pasted text 2]");
        assert_eq!(
            sent,
            "notes mention [Pasted text 2] verbatim then second\npaste"
        );
    }

    // Verifies a placeholder that prefixes another never splits it.
    #[test]
    fn longer_placeholder_wins_at_same_position() {
        let mut buffer = PasteBuffer::new();
        buffer.push(PasteSummary {
            display_text: "[Pasted text 1]".into(),
            actual_text: "one".into(),
            ..PasteSummary::default()
        });
        buffer.push(PasteSummary {
            display_text: "[Pasted text 1] extra".into(),
            actual_text: "longer".into(),
            ..PasteSummary::default()
        });
        assert_eq!(buffer.resolve("[Pasted text 1] extra"), "longer");
    }
}
