//! Chat session store: per-identity append-only message logs.
//!
//! In-memory only; history does not survive a restart. Cleared wholesale per
//! identity — there is no per-message deletion.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Sender::User)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(content, Sender::Ai)
    }

    fn new(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered message logs keyed by identity (account email, or the anonymous
/// key for unauthenticated chat).
pub struct ChatSessionStore {
    sessions: DashMap<String, Vec<ChatMessage>>,
}

impl ChatSessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn append(&self, identity: &str, message: ChatMessage) {
        self.sessions
            .entry(identity.to_string())
            .or_default()
            .push(message);
    }

    pub fn history(&self, identity: &str) -> Vec<ChatMessage> {
        self.sessions
            .get(identity)
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self, identity: &str) {
        if let Some(mut log) = self.sessions.get_mut(identity) {
            log.clear();
        }
    }

    /// Number of user-sent messages for an identity (feeds profile stats).
    pub fn user_query_count(&self, identity: &str) -> usize {
        self.sessions
            .get(identity)
            .map(|log| log.iter().filter(|m| m.sender == Sender::User).count())
            .unwrap_or(0)
    }
}

impl Default for ChatSessionStore {
    fn default() -> Self {
        Self::new()
    }
}
