//! API request and response types

use crate::llm::Role;
use serde::{Deserialize, Serialize};

/// Request to log in
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatSendRequest {
    pub token: String,
    pub text: String,
}

/// Response with the assistant's reply
#[derive(Debug, Serialize)]
pub struct ChatSendResponse {
    pub reply: String,
}

/// A user-visible conversational turn
#[derive(Debug, Serialize)]
pub struct VisibleMessage {
    pub role: Role,
    pub content: String,
}

/// Response with the session's visible history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<VisibleMessage>,
}

/// Request to log out
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

/// Response for logout; transcript failures surface as a warning, never an
/// error.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
