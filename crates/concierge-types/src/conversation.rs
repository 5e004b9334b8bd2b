//! Conversation and message types for Concierge.
//!
//! A conversation is an ordered list of messages plus a title. Message order
//! is creation order and is never rearranged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Title given to a conversation before (or instead of) a generated one.
pub const DEFAULT_TITLE: &str = "Untitled conversation";

/// Author of a stored conversation message.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'assistant', 'system'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single stored message within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            role,
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A conversation between a user and the assistant.
///
/// `messages` may be empty when the conversation was loaded by a listing
/// query that does not fetch message bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a new conversation whose first message is the given user text.
    pub fn start(first_message: impl Into<String>) -> Self {
        let first = Message::user(first_message);
        Self {
            id: Uuid::now_v7(),
            title: DEFAULT_TITLE.to_string(),
            created_at: first.created_at,
            updated_at: first.created_at,
            messages: vec![first],
        }
    }

    /// Content of the first user message, if any.
    pub fn first_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Append a message and bump `updated_at`. Returns a reference to it.
    pub fn push(&mut self, message: Message) -> &Message {
        self.updated_at = message.created_at;
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

/// Result of the first turn of a new conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedConversation {
    pub conversation_id: Uuid,
    pub title: String,
    pub reply: String,
}

/// Result of a follow-up turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuedConversation {
    pub reply: String,
}
