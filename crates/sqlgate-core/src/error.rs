use rusqlite::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by guarded connections and configuration loading.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Statement compilation was aborted by the authorizer.
    #[error("not authorized: {sql}")]
    Denied { sql: String },

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Failed to load config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Invalid policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for GuardError {
    fn from(e: rusqlite::Error) -> Self {
        GuardError::Sqlite(e)
    }
}

impl GuardError {
    pub fn is_denied(&self) -> bool {
        match self {
            Self::Denied { .. } => true,
            Self::Sqlite(e) => is_authorization_denied(e),
            _ => false,
        }
    }
}

/// Policy construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("rule {index}: {source}")]
    UnknownAction {
        index: usize,
        source: crate::action::UnknownAction,
    },

    #[error("rule {index}: invalid {field} pattern '{pattern}': {message}")]
    InvalidPattern {
        index: usize,
        field: &'static str,
        pattern: String,
        message: String,
    },

    #[error("rule {index}: no actions listed")]
    EmptyRule { index: usize },
}

/// True when `err` is SQLite's `SQLITE_AUTH` failure from a denied action.
pub fn is_authorization_denied(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::AuthorizationForStatementDenied
    )
}
