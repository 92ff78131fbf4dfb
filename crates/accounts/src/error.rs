//! Persistence errors

use realm_core::RealmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Character not found: {0}")]
    NotFound(String),

    #[error("Invalid character name: {0}")]
    InvalidName(String),

    #[error("Invalid character file format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AccountError>;

impl From<AccountError> for RealmError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(name) => RealmError::NotFound(name),
            other => RealmError::Persistence(other.to_string()),
        }
    }
}
