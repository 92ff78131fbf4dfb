//! Protocol-level errors

use realm_core::RealmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unexpected end of packet: needed {needed} more bytes")]
    Truncated { needed: usize },

    #[error("Invalid frame length {0}")]
    FrameLength(usize),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: u32 },

    #[error("Invalid text: {0}")]
    InvalidText(String),

    #[error("Unknown packet {category}/{action}")]
    UnknownPacket { category: u8, action: u8 },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<ProtocolError> for RealmError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::FrameLength(_) => RealmError::ProtocolViolation(err.to_string()),
            other => RealmError::InvalidData(other.to_string()),
        }
    }
}
