//! # Network Configuration
//!
//! Options for the listener, sessions and keep-alive, derived from the
//! server-wide [`ServerConfig`](realm_config::ServerConfig).
//!
//! # Example
//!
//! ```rust
//! use realm_config::ServerConfig;
//! use realm_network::NetworkConfig;
//!
//! let config = NetworkConfig::from(&ServerConfig::default());
//! assert!(config.validate().is_ok());
//! ```

use realm_config::{RateLimitTable, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Network layer options
///
/// # Fields
///
/// - `bind_address`: Address and port to listen on
/// - `max_connections`: Maximum concurrent sessions
/// - `enforce_sequence`: Disconnect on a sequence mismatch
/// - `ping_interval`: Keep-alive period
/// - `write_timeout`: How long one outbound write may take
/// - `rate_limits`: Minimum interval per (category, action)
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Address and port to bind the TCP listener to
    ///
    /// # Default
    /// `0.0.0.0:8078`
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent sessions
    ///
    /// # Default
    /// 200 sessions
    ///
    /// # Notes
    /// - Session ids are 16-bit, so at most 65535
    /// - Connections past the limit are closed right after accept
    pub max_connections: usize,

    /// Compare every inbound sequence value with the expected one
    ///
    /// # Default
    /// `true`
    ///
    /// # Notes
    /// - When off, mismatches are logged and the packet is processed anyway
    pub enforce_sequence: bool,

    /// Period of the keep-alive sweep
    ///
    /// # Default
    /// 60 seconds
    ///
    /// # Notes
    /// - A session that has not answered the previous ping by the next
    ///   sweep is closed
    pub ping_interval: Duration,

    /// Write timeout for one outbound frame
    ///
    /// # Default
    /// 10 seconds
    pub write_timeout: Duration,

    /// Minimum intervals between packets of the same kind
    ///
    /// # Default
    /// [`RateLimitTable::standard`]
    pub rate_limits: Arc<RateLimitTable>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8078)),
            max_connections: 200,
            enforce_sequence: true,
            ping_interval: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            rate_limits: Arc::new(RateLimitTable::standard()),
        }
    }
}

impl From<&ServerConfig> for NetworkConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            bind_address: config.bind_address(),
            max_connections: config.max_players,
            enforce_sequence: config.enforce_sequence,
            ping_interval: config.ping_interval,
            rate_limits: Arc::new(config.rate_limits.clone()),
            ..Self::default()
        }
    }
}

impl NetworkConfig {
    /// Validate the configuration
    ///
    /// # Returns
    /// `Ok(())` if configuration is valid, `Err(String)` otherwise
    ///
    /// # Checks
    /// - `max_connections` must be in `1..=65535`
    /// - `ping_interval` and `write_timeout` must be nonzero
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }

        if self.max_connections > u16::MAX as usize {
            return Err(format!("max_connections must be <= {}", u16::MAX));
        }

        if self.ping_interval.is_zero() {
            return Err("ping_interval must be > 0".to_string());
        }

        if self.write_timeout.is_zero() {
            return Err("write_timeout must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NetworkConfig::default();
        assert_eq!(config.bind_address.port(), 8078);
        assert_eq!(config.max_connections, 200);
        assert!(config.enforce_sequence);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_derived_from_server_config() {
        let server = ServerConfig::parse("serverport = 9000\nmaxplayers = 12\nenforcesequence = false\n").unwrap();
        let config = NetworkConfig::from(&server);
        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.max_connections, 12);
        assert!(!config.enforce_sequence);
    }

    #[test]
    fn test_invalid_max_connections() {
        let mut config = NetworkConfig::default();
        config.max_connections = 0;
        assert!(config.validate().is_err());
        config.max_connections = 70_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_ping_interval() {
        let mut config = NetworkConfig::default();
        config.ping_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
