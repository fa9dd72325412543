//! Query pipeline
//!
//! Embeds the active question, retrieves and reranks passages, assembles a
//! grounded prompt and hands back citations together with the answer, either
//! as finished text or as a live stream of deltas.

mod orchestrator;
pub mod prompt;

pub use orchestrator::{active_question, citations_from, QueryPipeline, Retrieval};
pub use prompt::{build_grounding_block, build_messages, build_system_prompt, NO_INFORMATION_ANSWER};

use crate::llm::{ChatMessage, ChatRole, DeltaStream};
use crate::vector::SearchMatch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a caller-supplied turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of the caller's conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        let role = match turn.role {
            TurnRole::User => ChatRole::User,
            TurnRole::Assistant => ChatRole::Assistant,
        };
        ChatMessage {
            role,
            content: turn.content.clone(),
        }
    }
}

/// A search match after the reranker has scored it
#[derive(Debug, Clone, PartialEq)]
pub struct RerankedChunk {
    pub search_match: SearchMatch,
    pub relevance_score: f64,
    /// 1-based position in reranked order
    pub rank: usize,
}

/// Source passage backing bracket references like `[1]` in the answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based, equal to the passage's position in reranked order
    pub id: usize,
    pub text: String,
    pub source: String,
    pub score: f64,
}

/// How the caller's transport wants the answer delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// One finished answer
    Blocking,
    /// Incremental deltas over an open response
    Streaming,
}

/// The answer text, finished or in flight
pub enum AnswerBody {
    Text(String),
    Stream(DeltaStream),
}

impl fmt::Debug for AnswerBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Result of one query: citations plus the answer
#[derive(Debug)]
pub struct QueryAnswer {
    pub citations: Vec<Citation>,
    pub body: AnswerBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_roles_on_the_wire() {
        let turns: Vec<ConversationTurn> = serde_json::from_str(
            r#"[{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}]"#,
        )
        .unwrap();
        assert_eq!(turns[0], ConversationTurn::user("hi"));
        assert_eq!(turns[1], ConversationTurn::assistant("hello"));

        assert!(serde_json::from_str::<ConversationTurn>(r#"{"role": "system", "content": "x"}"#).is_err());
    }

    #[test]
    fn test_turn_into_chat_message() {
        let msg = ChatMessage::from(&ConversationTurn::assistant("prior answer"));
        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.content, "prior answer");
    }
}
