//! HTTP request handlers

use super::types::{
    ChatSendRequest, ChatSendResponse, ErrorResponse, HistoryResponse, LoginRequest,
    LoginResponse, LogoutRequest, LogoutResponse, VisibleMessage,
};
use super::AppState;
use crate::llm::{ChatMessage, Role};
use crate::transcript::SaveOutcome;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

const INDEX_HTML: &str = include_str!("../../ui/index.html");

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // The demo chat page
        .route("/", get(serve_index))
        // Session lifecycle
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        // Chat
        .route("/api/chat", post(chat))
        .route("/api/history", get(history))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let verified = state
        .auth
        .verify(&req.username, &req.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !verified {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = state.sessions.create(&req.username);
    tracing::info!(username = %req.username, "Login succeeded");

    Ok(Json(LoginResponse {
        token,
        username: req.username,
    }))
}

async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, AppError> {
    let session = state
        .sessions
        .remove(&req.token)
        .ok_or_else(|| AppError::Unauthorized("Unknown session".to_string()))?;

    tracing::info!(
        username = %session.username,
        session_id = %session.session_id,
        started_at = %session.started_at,
        messages = session.messages.len(),
        "Session ended"
    );

    // Transcript failures are reported, never fatal to logout
    match state
        .transcripts
        .save(&session.username, &session.session_id, &session.messages)
    {
        Ok(SaveOutcome::Saved(path)) => Ok(Json(LogoutResponse {
            saved: true,
            path: Some(path.display().to_string()),
            warning: None,
        })),
        Ok(SaveOutcome::NothingToSave) => Ok(Json(LogoutResponse {
            saved: false,
            path: None,
            warning: None,
        })),
        Err(e) => {
            tracing::warn!(
                username = %session.username,
                error = %e,
                "Failed to save transcript"
            );
            Ok(Json(LogoutResponse {
                saved: false,
                path: None,
                warning: Some(e.to_string()),
            }))
        }
    }
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatSendRequest>,
) -> Result<Json<ChatSendResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }

    if !state.sessions.append(&req.token, ChatMessage::user(&req.text)) {
        return Err(AppError::Unauthorized("Unknown session".to_string()));
    }

    // The turn runs to completion before this handler returns; one user
    // utterance at a time per session.
    let history = state
        .sessions
        .snapshot(&req.token)
        .ok_or_else(|| AppError::Unauthorized("Unknown session".to_string()))?;

    let produced = state.controller.run_turn(&history).await;
    let reply = produced
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    state.sessions.extend(&req.token, produced);

    Ok(Json(ChatSendResponse { reply }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    token: String,
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let messages = state
        .sessions
        .snapshot(&query.token)
        .ok_or_else(|| AppError::Unauthorized("Unknown session".to_string()))?;

    let visible = messages
        .into_iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .map(|m| VisibleMessage {
            role: m.role,
            content: m.content,
        })
        .collect();

    Ok(Json(HistoryResponse { messages: visible }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("salesdesk ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
