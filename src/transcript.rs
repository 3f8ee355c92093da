//! Transcript persistence
//!
//! Writes the user-visible half of a conversation to disk at logout: one
//! JSON file per (username, session id), containing only user/assistant
//! entries with tool-call metadata stripped.

use crate::llm::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Characters not allowed in transcript path components
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("failed to create transcript directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write transcript {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize transcript: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result of a save: either the file that was written, or nothing worth
/// writing.
#[derive(Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    NothingToSave,
}

/// A durable transcript entry. Exactly role and content; never tool
/// metadata.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist the user/assistant exchanges of a session. The directory is
    /// created on demand; an empty filtered list writes nothing.
    pub fn save(
        &self,
        username: &str,
        session_id: &str,
        messages: &[ChatMessage],
    ) -> Result<SaveOutcome, TranscriptError> {
        let entries: Vec<TranscriptEntry> = messages
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .map(|m| TranscriptEntry {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();

        if entries.is_empty() {
            return Ok(SaveOutcome::NothingToSave);
        }

        fs::create_dir_all(&self.dir).map_err(|source| TranscriptError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let filename = format!(
            "{}_{}_messages.json",
            sanitize_component(username),
            sanitize_component(session_id)
        );
        let path = self.dir.join(filename);

        let json = serde_json::to_vec(&entries)?;
        fs::write(&path, json).map_err(|source| TranscriptError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(SaveOutcome::Saved(path))
    }
}

/// Make a username or session id safe to use as a filename component:
/// replace filesystem-hostile characters, trim whitespace, and never
/// produce an empty component.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}
