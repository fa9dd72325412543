//! Grounded prompt assembly

use super::{Citation, ConversationTurn};
use crate::config::ConversationMode;
use crate::llm::ChatMessage;

/// Answer returned when retrieval finds nothing citable
pub const NO_INFORMATION_ANSWER: &str =
    "I couldn't find any relevant information in the indexed documents to answer that question.";

/// Placeholder grounding block when no passages survived reranking
pub const NO_DOCUMENTS_PLACEHOLDER: &str = "No relevant documents found.";

/// `[<id>] Content: <text>\nSource: <source>` per citation, blank-line separated
pub fn build_grounding_block(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return NO_DOCUMENTS_PLACEHOLDER.to_string();
    }

    citations
        .iter()
        .map(|c| format!("[{}] Content: {}\nSource: {}", c.id, c.text, c.source))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System instructions with the grounding block appended
pub fn build_system_prompt(citations: &[Citation]) -> String {
    let reference_hint = match citations.len() {
        0 => String::from("No reference numbers are available for this question."),
        1 => String::from("The only valid reference number is [1]."),
        n => format!("Valid reference numbers are [1] through [{}].", n),
    };

    format!(
        r#"You are an intelligent assistant for a retrieval-augmented question answering service.
Your goal is to answer the user's question using the provided context.

**Instructions:**
1. **Context-Driven**: Base your answer strictly on the provided context snippets.
2. **Conversation History**: The user may refer to previous messages. Use the conversation history to resolve pronouns or references (e.g., "it", "he", "that file").
3. **Citations**: REQUIRED. Every factual claim must carry the bracketed reference number of the snippet it came from (e.g., [1]). {}
4. **Honesty**: If the context does not contain the answer, say so plainly. Do not make it up.

**Context from Documents:**
{}"#,
        reference_hint,
        build_grounding_block(citations)
    )
}

/// System message followed by the caller's turns
///
/// In multi-turn mode the history is passed through untouched, in order. In
/// stateless mode only the final turn (the active question) is sent.
pub fn build_messages(
    turns: &[ConversationTurn],
    citations: &[Citation],
    mode: ConversationMode,
) -> Vec<ChatMessage> {
    let history: &[ConversationTurn] = match mode {
        ConversationMode::MultiTurn => turns,
        ConversationMode::Stateless => &turns[turns.len().saturating_sub(1)..],
    };

    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(build_system_prompt(citations)));
    messages.extend(history.iter().map(ChatMessage::from));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatRole;

    fn citation(id: usize, text: &str, source: &str) -> Citation {
        Citation {
            id,
            text: text.to_string(),
            source: source.to_string(),
            score: 0.5,
        }
    }

    #[test]
    fn test_grounding_block_format() {
        let block = build_grounding_block(&[
            citation(1, "Rust is fast.", "guide.md"),
            citation(2, "Cargo builds.", "cargo.md"),
        ]);
        assert_eq!(
            block,
            "[1] Content: Rust is fast.\nSource: guide.md\n\n[2] Content: Cargo builds.\nSource: cargo.md"
        );
    }

    #[test]
    fn test_grounding_block_placeholder() {
        assert_eq!(build_grounding_block(&[]), NO_DOCUMENTS_PLACEHOLDER);
        assert!(build_system_prompt(&[]).contains(NO_DOCUMENTS_PLACEHOLDER));
    }

    #[test]
    fn test_system_prompt_mentions_reference_range() {
        let prompt = build_system_prompt(&[citation(1, "a", "x"), citation(2, "b", "y")]);
        assert!(prompt.contains("[1] through [2]"));
        assert!(prompt.contains("[2] Content: b\nSource: y"));
        assert!(prompt.contains("Do not make it up"));
        assert!(prompt.contains("resolve pronouns"));
    }

    #[test]
    fn test_multi_turn_keeps_history_in_order() {
        let turns = vec![
            ConversationTurn::user("Who wrote the guide?"),
            ConversationTurn::assistant("Alice [1]."),
            ConversationTurn::user("What else did she write?"),
        ];
        let messages = build_messages(&turns, &[], ConversationMode::MultiTurn);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].content, "Who wrote the guide?");
        assert_eq!(messages[2].role, ChatRole::Assistant);
        assert_eq!(messages[2].content, "Alice [1].");
        assert_eq!(messages[3].role, ChatRole::User);
        assert_eq!(messages[3].content, "What else did she write?");
    }

    #[test]
    fn test_stateless_sends_only_active_question() {
        let turns = vec![
            ConversationTurn::user("first"),
            ConversationTurn::assistant("reply"),
            ConversationTurn::user("second"),
        ];
        let messages = build_messages(&turns, &[], ConversationMode::Stateless);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], ChatMessage::user("second"));
    }
}
