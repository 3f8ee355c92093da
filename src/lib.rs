//! Salesdesk - login-gated sales-analyst chat service
//!
//! Forwards authenticated users' chat messages to an OpenAI-compatible
//! model which may issue a single SQL query per turn against the local
//! sales database via a tool call. Transcripts are written to disk at
//! logout.

pub mod agent;
pub mod api;
pub mod auth;
pub mod llm;
pub mod sales;
pub mod session;
pub mod transcript;
