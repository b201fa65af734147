//! Conversation state for a chat session
//!
//! The conversation is an append-only log of chat turns. The full log is
//! what the transcript shows; only a bounded window of the most recent
//! turns is handed to the answering agent as context.

use crate::providers::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions
    User,
    /// The answering agent
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single immutable entry in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    role: Role,
    content: String,
}

impl ChatTurn {
    /// Creates a user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use tabletalk::conversation::{ChatTurn, Role};
    ///
    /// let turn = ChatTurn::user("how many rows are there?");
    /// assert_eq!(turn.role(), Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Author of the turn
    pub fn role(&self) -> Role {
        self.role
    }

    /// Text of the turn
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Converts the turn into a provider message
    pub fn to_message(&self) -> Message {
        match self.role {
            Role::User => Message::user(self.content.clone()),
            Role::Assistant => Message::assistant(self.content.clone()),
        }
    }
}

/// Append-only, ordered log of chat turns
///
/// # Examples
///
/// ```
/// use tabletalk::conversation::{ChatTurn, Conversation};
///
/// let mut conversation = Conversation::new();
/// conversation.append(ChatTurn::user("hi"));
/// conversation.append(ChatTurn::assistant("hello"));
/// assert_eq!(conversation.all().len(), 2);
/// assert_eq!(conversation.window(1)[0].content(), "hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    /// Creates an empty conversation
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Appends a turn to the end of the log
    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Every turn in insertion order
    pub fn all(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The most recent `k` turns, oldest first
    ///
    /// Returns the whole log when it holds `k` turns or fewer.
    pub fn window(&self, k: usize) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(k);
        &self.turns[start..]
    }

    /// Number of turns in the log
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if nothing has been said yet
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last turn, if any
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }
}
