//! Configuration errors

use realm_core::RealmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },
}

impl From<ConfigError> for RealmError {
    fn from(err: ConfigError) -> Self {
        RealmError::Config(err.to_string())
    }
}
