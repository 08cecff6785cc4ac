//! Conversation compaction.
//!
//! Replaces the oldest eligible run of messages with one synthetic system
//! summary when the remaining budget is below the requested reserve. The
//! leading system preamble and the last `preserve_messages` entries are never
//! touched.

use super::{SummaryContext, SummaryService};
use crate::budget::ContextBudget;
use crate::conversation::{short_id, Conversation, Message, Source};
use crate::tokens::estimate_text;
use crate::types::Role;
use tracing::{debug, info};

/// Label that opens every compaction summary.
pub const SUMMARY_PREFIX: &str = "[Earlier conversation summarized]\n";

/// Outcome of [`SummaryService::trim_if_needed`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrimResult {
    /// Full message list after compaction (unchanged when not trimmed).
    pub messages: Vec<Message>,
    pub was_trimmed: bool,
    /// True when the summarizer failed and the range was truncated instead.
    pub was_truncated: bool,
}

impl TrimResult {
    pub(crate) fn unchanged(conversation: &Conversation) -> Self {
        Self {
            messages: conversation.messages().to_vec(),
            was_trimmed: false,
            was_truncated: false,
        }
    }
}

impl SummaryService {
    /// Compute a compacted message list if the conversation leaves less than
    /// `reserve_tokens` free for `model`. Does not mutate the conversation.
    pub async fn trim_if_needed(
        &self,
        conversation: &Conversation,
        model: &str,
        reserve_tokens: usize,
    ) -> TrimResult {
        let budget = ContextBudget::new(model, self.context_limit);
        let remaining = budget.remaining_tokens(conversation);
        if remaining >= reserve_tokens {
            return TrimResult::unchanged(conversation);
        }

        let messages = conversation.messages();
        if messages.len() <= 2 {
            debug!(count = messages.len(), "too few messages to compact");
            return TrimResult::unchanged(conversation);
        }

        let start = leading_system_count(messages);
        // The newest message is the turn being answered and always survives.
        let preserve = self.config.preserve_messages.max(1);
        let mut end = start.max(messages.len().saturating_sub(preserve));
        // Tool results stay with the assistant message that requested them.
        while end > start && messages.get(end).is_some_and(|m| m.role == Role::Tool) {
            end -= 1;
        }
        if end <= start {
            debug!(start, end, "no compactable range");
            return TrimResult::unchanged(conversation);
        }

        let text = render_range(&messages[start..end]);
        let source_tokens = estimate_text(&text);
        let min_summary = self.config.min_summary_tokens;
        let tokens_to_free = reserve_tokens - remaining + min_summary;
        let desired = min_summary.max(source_tokens.saturating_sub(tokens_to_free));
        let target_tokens = source_tokens.min(desired);

        let outcome = self
            .summarize_with_fallback(&text, target_tokens, SummaryContext::ConversationHistory)
            .await;

        let summary = summary_message(conversation, start, model, &outcome.text);
        let mut trimmed = Vec::with_capacity(messages.len() - (end - start) + 1);
        trimmed.extend_from_slice(&messages[..start]);
        trimmed.push(summary);
        trimmed.extend_from_slice(&messages[end..]);

        info!(
            model,
            remaining,
            reserve_tokens,
            replaced = end - start,
            source_tokens,
            target_tokens,
            truncated = outcome.was_truncated,
            "compacted conversation history"
        );
        TrimResult {
            messages: trimmed,
            was_trimmed: true,
            was_truncated: outcome.was_truncated,
        }
    }

    /// Run [`Self::trim_if_needed`] and apply the result to `conversation`.
    pub async fn compact(
        &self,
        conversation: &mut Conversation,
        model: &str,
        reserve_tokens: usize,
    ) -> TrimResult {
        let result = self.trim_if_needed(conversation, model, reserve_tokens).await;
        if result.was_trimmed {
            conversation.replace_messages(result.messages.clone());
        }
        result
    }
}

fn leading_system_count(messages: &[Message]) -> usize {
    messages
        .iter()
        .take_while(|message| message.role == Role::System)
        .count()
}

/// `"<Role>: <content>"` per message, blank-line separated.
fn render_range(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|message| !message.source.is_ephemeral())
        .map(|message| format!("{}: {}", message.role.label(), message.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn summary_message(conversation: &Conversation, index: usize, model: &str, text: &str) -> Message {
    let mut message = conversation.new_message(
        Role::System,
        Source::System,
        format!("{SUMMARY_PREFIX}{text}"),
        Some(model),
    );
    message.id = short_id("summary");
    message.index = index;
    message
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::TRUNCATION_MARKER;
    use super::*;
    use crate::config::SummaryConfig;
    use crate::conversation::Provider;
    use crate::error::ApiError;
    use crate::tokens::estimate_conversation;

    const MODEL: &str = "test-model";

    /// Conversation with one system preamble and `turns` user/assistant pairs,
    /// each message `chars` characters long.
    fn conversation(turns: usize, chars: usize) -> Conversation {
        let mut conv = Conversation::new(MODEL, Provider::LmStudio);
        conv.push_system("s".repeat(chars));
        for i in 0..turns {
            conv.push_user(format!("{i}").repeat(chars));
            conv.push_assistant("a".repeat(chars), None);
        }
        conv
    }

    fn service_with_limit(stub: &StubSummarizer, limit: usize) -> SummaryService {
        service(stub, SummaryConfig::default()).with_context_limit(Some(limit))
    }

    #[tokio::test]
    async fn no_op_when_reserve_fits() {
        let stub = StubSummarizer::replying(vec![Ok("SUMMARY".into())]);
        let svc = service_with_limit(&stub, 100_000);
        let conv = conversation(5, 40);
        let result = svc.trim_if_needed(&conv, MODEL, 2_000).await;
        assert!(!result.was_trimmed);
        assert_eq!(result.messages, conv.messages());
        assert_eq!(stub.prompt_count(), 0);
    }

    #[tokio::test]
    async fn no_op_with_two_or_fewer_messages() {
        let stub = StubSummarizer::replying(vec![Ok("SUMMARY".into())]);
        let svc = service_with_limit(&stub, 10);
        let mut conv = Conversation::new(MODEL, Provider::LmStudio);
        conv.push_user("x".repeat(400));
        conv.push_assistant("y".repeat(400), None);
        let result = svc.trim_if_needed(&conv, MODEL, 2_000).await;
        assert!(!result.was_trimmed);
        assert_eq!(stub.prompt_count(), 0);
    }

    #[tokio::test]
    async fn no_op_when_only_preserved_tail_is_eligible() {
        let stub = StubSummarizer::replying(vec![Ok("SUMMARY".into())]);
        let svc = service_with_limit(&stub, 10);
        let mut conv = Conversation::new(MODEL, Provider::LmStudio);
        conv.push_system("preamble");
        for _ in 0..2 {
            conv.push_user("question ".repeat(20));
            conv.push_assistant("answer ".repeat(20), None);
        }
        let result = svc.trim_if_needed(&conv, MODEL, 2_000).await;
        assert!(!result.was_trimmed);
    }

    #[tokio::test]
    async fn ten_message_scenario_splices_one_summary() {
        // 1 system + 9 others; each message 200 chars = 50 tokens, 500 total.
        // A 1000-token window leaves 500 remaining against a 2000 reserve.
        let stub = StubSummarizer::replying(vec![Ok("SUMMARY".into())]);
        let svc = service_with_limit(&stub, 1_000);
        let mut conv = conversation(4, 200);
        conv.push_user("q".repeat(200));
        assert_eq!(conv.len(), 10);
        assert_eq!(estimate_conversation(&conv), 500);

        let before = conv.messages().to_vec();
        let result = svc.trim_if_needed(&conv, MODEL, 2_000).await;
        assert!(result.was_trimmed);
        assert!(!result.was_truncated);

        // Range is [1, 6): 10 - 5 + 1 = 6 messages.
        let (start, end) = (1, 10 - 4);
        assert_eq!(result.messages.len(), before.len() - (end - start) + 1);
        assert_eq!(result.messages.len(), 1 + 1 + 4);
        assert_eq!(result.messages[0], before[0]);
        assert_eq!(&result.messages[2..], &before[end..]);

        let summary = &result.messages[1];
        assert_eq!(summary.role, Role::System);
        assert_eq!(summary.source, Source::System);
        assert_eq!(summary.index, start);
        assert!(summary.id.starts_with("summary_"));
        assert_eq!(summary.content, format!("{SUMMARY_PREFIX}SUMMARY"));

        // The pure call leaves the conversation untouched.
        assert_eq!(conv.messages(), before.as_slice());
    }

    #[tokio::test]
    async fn rendered_range_uses_role_labels_and_skips_internal() {
        let stub = StubSummarizer::replying(vec![Ok("SUMMARY".into())]);
        let svc = service_with_limit(&stub, 100);
        let mut conv = Conversation::new(MODEL, Provider::LmStudio);
        conv.push_user("first question");
        conv.push_internal(Role::User, "routing hint");
        conv.push_assistant("first answer", None);
        for i in 0..4 {
            conv.push_user(format!("tail {i} ").repeat(30));
        }
        let result = svc.trim_if_needed(&conv, MODEL, 2_000).await;
        assert!(result.was_trimmed);

        let prompt = stub.prompts.lock().unwrap()[0].clone();
        assert!(prompt.ends_with("User: first question\n\nAssistant: first answer"));
        assert!(!prompt.contains("routing hint"));
    }

    #[tokio::test]
    async fn target_follows_tokens_to_free() {
        // Range text is ~2000 tokens; freeing 2000 - 0 + 500 leaves the floor.
        let stub = StubSummarizer::replying(vec![]);
        let svc = service_with_limit(&stub, 2_000);
        let mut conv = Conversation::new(MODEL, Provider::LmStudio);
        conv.push_user("u".repeat(4_000));
        conv.push_assistant("a".repeat(4_000), None);
        for _ in 0..4 {
            conv.push_user("tail");
        }
        let result = svc.trim_if_needed(&conv, MODEL, 2_000).await;
        assert!(result.was_truncated);
        let summary = &result.messages[0].content;
        let body = summary
            .strip_prefix(SUMMARY_PREFIX)
            .expect("labelled summary");
        assert!(body.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            body.chars().count(),
            500 * 4 + TRUNCATION_MARKER.chars().count()
        );
    }

    #[tokio::test]
    async fn summarizer_failure_is_flagged_not_raised() {
        let stub = StubSummarizer::replying(vec![Err(ApiError::status(500, "boom", None))]);
        let svc = service_with_limit(&stub, 1_000);
        let mut conv = conversation(4, 200);
        conv.push_user("q".repeat(200));
        let result = svc.trim_if_needed(&conv, MODEL, 2_000).await;
        assert!(result.was_trimmed);
        assert!(result.was_truncated);
        assert!(result.messages[1].content.starts_with(SUMMARY_PREFIX));
        assert!(result.messages[1].content.ends_with(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn range_never_splits_tool_results_from_their_call() {
        let stub = StubSummarizer::replying(vec![Ok("SUMMARY".into())]);
        let svc = service_with_limit(&stub, 10);
        let mut conv = Conversation::new(MODEL, Provider::LmStudio);
        conv.push_user("old question");
        conv.push_assistant("old answer", None);
        conv.push_user("what time is it");
        conv.push_assistant_tool_calls(
            "",
            vec![crate::conversation::ToolCall::pending(
                "call_1",
                "current_time",
                serde_json::Map::new(),
            )],
            None,
        );
        conv.push_tool_result("call_1", "{}", None).unwrap();
        conv.push_assistant("noon", None);
        conv.push_user("thanks");
        conv.push_assistant("welcome", None);

        // Plain end would be 8 - 4 = 4, pointing at the tool result.
        let result = svc.trim_if_needed(&conv, MODEL, 2_000).await;
        assert!(result.was_trimmed);
        assert_eq!(result.messages.len(), 1 + 5);
        assert_eq!(result.messages[1].role, Role::Assistant);
        assert!(result.messages[1].has_tool_calls());
        assert_eq!(result.messages[2].role, Role::Tool);
    }

    #[tokio::test]
    async fn newest_turn_survives_zero_preserve_count() {
        let stub = StubSummarizer::replying(vec![Ok("SUMMARY".into())]);
        let config = SummaryConfig {
            preserve_messages: 0,
            ..SummaryConfig::default()
        };
        let svc = service(&stub, config).with_context_limit(Some(1_000));
        let mut conv = conversation(3, 400);
        conv.push_user("LATEST QUESTION");

        let result = svc.trim_if_needed(&conv, MODEL, 500).await;
        assert!(result.was_trimmed);
        assert_eq!(result.messages.len(), 3);
        let last = result.messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "LATEST QUESTION");
        assert!(!stub.prompts.lock().unwrap()[0].contains("LATEST QUESTION"));
    }

    #[tokio::test]
    async fn compaction_is_idempotent_once_within_budget() {
        // Verifies a second pass with the same reserve is a no-op after the
        // first one freed enough room.
        let stub = StubSummarizer::replying(vec![Ok("S".into()), Ok("S2".into())]);
        let svc = service_with_limit(&stub, 3_000);
        let mut conv = Conversation::new(MODEL, Provider::LmStudio);
        conv.push_system("preamble");
        for _ in 0..6 {
            conv.push_user("u".repeat(1_000));
            conv.push_assistant("a".repeat(1_000), None);
        }
        let reserve = 1_000;
        let first = svc.compact(&mut conv, MODEL, reserve).await;
        assert!(first.was_trimmed);
        assert_eq!(conv.len(), 1 + 1 + 4);

        let second = svc.compact(&mut conv, MODEL, reserve).await;
        assert!(!second.was_trimmed);
        assert_eq!(conv.len(), 6);
        assert_eq!(stub.prompt_count(), 1);
    }

    #[tokio::test]
    async fn compact_applies_result_in_place() {
        let stub = StubSummarizer::replying(vec![Ok("SUMMARY".into())]);
        let svc = service_with_limit(&stub, 1_000);
        let mut conv = conversation(4, 200);
        conv.push_user("q".repeat(200));
        let updated_before = conv.updated_at();
        let result = svc.compact(&mut conv, MODEL, 2_000).await;
        assert!(result.was_trimmed);
        assert_eq!(conv.messages(), result.messages.as_slice());
        assert!(conv.updated_at() > updated_before);
    }

    #[cfg(feature = "fuzz-tests")]
    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn compaction_keeps_preamble_and_tail(
                turns in 1usize..12,
                chars in 50usize..600,
                limit in 200usize..4_000,
                reserve in 0usize..2_000,
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .expect("runtime");
                let stub = StubSummarizer::replying(vec![Ok("SUMMARY".into())]);
                let svc = service_with_limit(&stub, limit);
                let conv = conversation(turns, chars);
                let result = runtime.block_on(svc.trim_if_needed(&conv, MODEL, reserve));

                let before = conv.messages();
                let after = &result.messages;
                prop_assert_eq!(&after[0], &before[0]);
                if result.was_trimmed {
                    prop_assert!(after.len() < before.len());
                    prop_assert!(after[1].content.starts_with(SUMMARY_PREFIX));
                    let kept = after.len() - 2;
                    prop_assert_eq!(&after[2..], &before[before.len() - kept..]);
                } else {
                    prop_assert_eq!(after.as_slice(), before);
                }
            }
        }
    }
}
