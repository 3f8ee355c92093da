//! Credential store
//!
//! Durable username -> SHA-256 password hash mapping backed by sqlite,
//! seeded with one bootstrap operator account. There is deliberately no
//! rate limiting, lockout, or reset flow: the demo runs a single shared
//! operator account.

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// SHA-256 of the bootstrap admin password, fixed at first initialization.
const BOOTSTRAP_ADMIN_HASH: &str =
    "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";

const SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS users (username TEXT PRIMARY KEY, password_hash TEXT)";

#[derive(Debug, Error)]
pub enum AuthError {
    /// The store could not be read; verification must fail closed.
    #[error("authentication unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),
}

/// Result of an `add` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyExists,
}

/// Thread-safe credential store handle
#[derive(Clone)]
pub struct CredentialStore {
    conn: Arc<Mutex<Connection>>,
}

impl CredentialStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self, AuthError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, AuthError> {
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO users (username, password_hash) VALUES (?1, ?2)",
            params!["admin", BOOTSTRAP_ADMIN_HASH],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Check a username/password pair against the stored hash.
    ///
    /// An absent username is `Ok(false)`. A store failure is an error,
    /// never a grant.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let supplied = hash_password(password);
        let conn = self.conn.lock().unwrap();
        let stored: Option<String> = conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stored.is_some_and(|hash| hash == supplied))
    }

    /// Insert a new account. An existing username is left untouched and
    /// reported, not treated as a failure.
    pub fn add(&self, username: &str, password: &str) -> Result<AddOutcome, AuthError> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (username, password_hash) VALUES (?1, ?2)",
            params![username, hash_password(password)],
        )?;
        Ok(if inserted == 0 {
            AddOutcome::AlreadyExists
        } else {
            AddOutcome::Added
        })
    }
}

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
