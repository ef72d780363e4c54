//! Error types for the SignalScope domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum; the cores themselves
//! absorb these errors and degrade instead of propagating them.

use thiserror::Error;

/// The top-level error type for SignalScope operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Summarizer errors ---
    #[error("Summarizer error: {0}")]
    Summarizer(#[from] SummarizerError),

    // --- Store / lookup errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Boundary errors ---

/// Failures of the external summarization call.
#[derive(Debug, Clone, Error)]
pub enum SummarizerError {
    #[error("Summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("Summarizer timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Summarizer call failed: {0}")]
    CallFailed(String),
}

/// Failures of trigger queries, profile lookups, and liked-set lookups.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed on {source_name}: {reason}")]
    QueryFailed { source_name: String, reason: String },
}
