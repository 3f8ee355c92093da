//! HTTP API
//!
//! Login-gated chat endpoints plus the embedded demo page.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::agent::TurnController;
use crate::auth::CredentialStore;
use crate::session::SessionStore;
use crate::transcript::TranscriptStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: CredentialStore,
    pub sessions: Arc<SessionStore>,
    pub controller: Arc<TurnController>,
    pub transcripts: Arc<TranscriptStore>,
}

impl AppState {
    pub fn new(
        auth: CredentialStore,
        sessions: Arc<SessionStore>,
        controller: Arc<TurnController>,
        transcripts: Arc<TranscriptStore>,
    ) -> Self {
        Self {
            auth,
            sessions,
            controller,
            transcripts,
        }
    }
}
