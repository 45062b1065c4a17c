//! Error types for the Studio backend
//!
//! Each layer owns a `thiserror` enum: configuration, the ledger client seam,
//! and the crate-level `StudioError` that the gateway, store and aggregation
//! return. The HTTP boundary maps `StudioError` onto status codes in
//! `api::error`.

use thiserror::Error;

/// Crate-level result alias
pub type StudioResult<T> = Result<T, StudioError>;

/// Main error type for Studio operations
#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    pub fn validation(message: impl Into<String>) -> Self {
        StudioError::Validation(message.into())
    }

    /// True for failures caused by caller input rather than a collaborator
    pub fn is_client_error(&self) -> bool {
        matches!(self, StudioError::Validation(_))
    }
}

/// Errors raised by a ledger client implementation
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed ledger response: {0}")]
    Decode(String),

    #[error("Invalid query '{filter}': {reason}")]
    Query { filter: String, reason: String },

    #[error("Entity {0} not found")]
    EntityNotFound(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required env: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
