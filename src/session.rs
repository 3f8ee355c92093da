//! Conversation sessions
//!
//! Server-side session registry keyed by a random bearer token. Each
//! session owns the ordered message history for one authenticated user;
//! the token doubles as the session id. State lives in an explicit store
//! rather than ambient framework context so logout can always re-derive
//! the transcript from current in-memory state.

use crate::llm::ChatMessage;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// One authenticated session's state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub username: String,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

/// In-memory session registry
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for an authenticated user; returns the token.
    pub fn create(&self, username: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let state = SessionState {
            username: username.to_string(),
            session_id: token.clone(),
            started_at: Utc::now(),
            messages: Vec::new(),
        };
        self.sessions.lock().unwrap().insert(token.clone(), state);
        token
    }

    /// Append one message. Returns false if the token is unknown.
    pub fn append(&self, token: &str, message: ChatMessage) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(token) {
            Some(state) => {
                state.messages.push(message);
                true
            }
            None => false,
        }
    }

    /// Append a batch of messages in order. Returns false if the token is
    /// unknown.
    pub fn extend(&self, token: &str, messages: Vec<ChatMessage>) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(token) {
            Some(state) => {
                state.messages.extend(messages);
                true
            }
            None => false,
        }
    }

    /// Read-only copy of the session's history, for rendering and for
    /// composing completion requests.
    pub fn snapshot(&self, token: &str) -> Option<Vec<ChatMessage>> {
        self.sessions
            .lock()
            .unwrap()
            .get(token)
            .map(|state| state.messages.clone())
    }

    /// Remove the session at logout, handing its state to the caller for
    /// transcript persistence.
    pub fn remove(&self, token: &str) -> Option<SessionState> {
        self.sessions.lock().unwrap().remove(token)
    }
}
