//! Error types for the world crate

use realm_core::{RealmError, SessionId, ZoneId};
use std::path::PathBuf;

/// World-specific error types
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// File I/O error
    #[error("File error on {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON template
    #[error("Invalid template {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Template parsed but violates a structural rule
    #[error("Invalid template {path}: {message}")]
    InvalidTemplate { path: PathBuf, message: String },

    /// A zone that should exist does not
    #[error("Zone not found: {0}")]
    ZoneNotFound(ZoneId),

    /// The operation needs a character the session does not control
    #[error("Session {0} has no character")]
    NoCharacter(SessionId),

    /// The session was deregistered before the operation could run
    #[error("Session {0} is not registered")]
    SessionNotRegistered(SessionId),
}

impl From<WorldError> for RealmError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::ZoneNotFound(_) | WorldError::NoCharacter(_) => {
                RealmError::ZoneInconsistency(err.to_string())
            }
            WorldError::SessionNotRegistered(_) => RealmError::SessionClosed,
            other => RealmError::InvalidData(other.to_string()),
        }
    }
}

/// Result type for world operations
pub type Result<T> = std::result::Result<T, WorldError>;
