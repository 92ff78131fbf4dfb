//! Core error types for the realm server

#[derive(thiserror::Error, Debug)]
pub enum RealmError {
    /// Framing, sequence or handshake violation. Always fatal for the session.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A handler failed; the session stream can no longer be trusted.
    #[error("Handler fault: {0}")]
    HandlerFault(String),

    /// World state that should exist does not (e.g. a warp to a missing zone).
    #[error("Zone inconsistency: {0}")]
    ZoneInconsistency(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Session closed")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, RealmError>;
