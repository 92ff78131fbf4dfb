//! Realm Configuration Management
//!
//! Loads `serveroptions.txt`: one `key = value` option per line, `#` starts
//! a comment. Every option has a default, so an empty file is a valid
//! configuration.

mod error;
mod rate_limits;

pub use error::ConfigError;
pub use rate_limits::RateLimitTable;

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Number of regular speed classes; the next class never acts.
pub const SPEED_TIERS: usize = 7;

/// Simulation constants for the zone tick engine
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Tick period and the quantum added to every actor's accumulator (from "tickms")
    pub tick: Duration,
    /// Accumulated time an actor of each speed class needs before acting (from "actrates")
    pub act_thresholds: [Duration; SPEED_TIERS],
    /// Opponents that dealt no damage for longer are forgotten (from "boredom")
    pub boredom: Duration,
    /// How far an actor looks for someone to chase (from "chaseradius")
    pub chase_radius: i32,
    /// Respawn search radius around the spawn origin (from "respawnradius")
    pub respawn_radius: i32,
    /// Random spawn positions tried before falling back (from "respawnattempts")
    pub respawn_attempts: u32,
    /// Patrolling actors turn back once this far from home (from "patroldistance")
    pub patrol_distance: i32,
    /// Position updates further than this on either axis are not sent (from "visibility")
    pub visibility_range: i32,
    /// Recovery runs every this many ticks (from "recoveryticks")
    pub recovery_interval_ticks: u64,
    /// Ticks an actor drop is reserved for its killer (from "dropprotection")
    pub drop_protection_ticks: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(125),
            act_thresholds: [900, 1200, 1500, 1900, 3700, 7500, 15000].map(Duration::from_millis),
            boredom: Duration::from_secs(30),
            chase_radius: 10,
            respawn_radius: 2,
            respawn_attempts: 200,
            patrol_distance: 6,
            visibility_range: 12,
            recovery_interval_ticks: 80,
            drop_protection_ticks: 40,
        }
    }
}

impl SimulationConfig {
    /// Ticks without damage after which an opponent is dropped
    pub fn boredom_ticks(&self) -> u32 {
        let tick = self.tick.as_millis().max(1);
        (self.boredom.as_millis() / tick) as u32
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // ========== Network ==========
    /// Server name (from "name" option)
    pub name: String,
    /// Interface to bind (from "serverinterface" option, AUTO = all)
    pub server_interface: String,
    /// Port to listen on (from "serverport" option, default: 8078)
    pub server_port: u16,
    /// Maximum concurrent sessions (from "maxplayers" option)
    pub max_players: usize,

    // ========== Protocol ==========
    /// Disconnect on sequence mismatch (from "enforcesequence" option)
    pub enforce_sequence: bool,
    /// Keep-alive period (from "pinginterval" option, seconds)
    pub ping_interval: Duration,
    /// Per-packet minimum intervals (from "ratelimit.<Category>.<Action>" options)
    pub rate_limits: RateLimitTable,

    // ========== World ==========
    /// Directory with `actors.json`, `zones/` and `characters/` (from "datadir" option)
    pub data_dir: PathBuf,
    /// Bound on the global chat history (from "globalhistory" option)
    pub global_history: usize,
    /// Where killed characters come back (from "respawnzone", "respawnx", "respawny")
    pub respawn_zone: u16,
    pub respawn_x: i32,
    pub respawn_y: i32,
    pub simulation: SimulationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "Realm".into(),
            server_interface: "AUTO".into(),
            server_port: 8078,
            max_players: 200,
            enforce_sequence: true,
            ping_interval: Duration::from_secs(60),
            rate_limits: RateLimitTable::standard(),
            data_dir: PathBuf::from("data"),
            global_history: 100,
            respawn_zone: 1,
            respawn_x: 5,
            respawn_y: 5,
            simulation: SimulationConfig::default(),
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy>(key: &str, value: &str, current: T) -> T {
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!("Ignoring invalid value '{}' for option '{}'", value, key);
            current
        }
    }
}

fn parse_bool(key: &str, value: &str, current: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => true,
        "false" | "no" | "0" | "off" => false,
        _ => {
            warn!("Ignoring invalid value '{}' for option '{}'", value, key);
            current
        }
    }
}

impl ServerConfig {
    /// Load configuration from a serveroptions.txt file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse serveroptions.txt content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                config.parse_option(key.trim(), value.trim())?;
            }
        }

        Ok(config)
    }

    fn parse_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        if key.starts_with("ratelimit.") {
            return self.rate_limits.parse_option(key, value);
        }

        let sim = &mut self.simulation;
        match key {
            "name" => self.name = value.into(),
            "serverinterface" => self.server_interface = value.into(),
            "serverport" => self.server_port = parse_or(key, value, self.server_port),
            "maxplayers" => self.max_players = parse_or(key, value, self.max_players),
            "enforcesequence" => self.enforce_sequence = parse_bool(key, value, self.enforce_sequence),
            "pinginterval" => {
                let secs = parse_or(key, value, self.ping_interval.as_secs());
                self.ping_interval = Duration::from_secs(secs.max(1));
            }
            "datadir" => self.data_dir = PathBuf::from(value),
            "globalhistory" => self.global_history = parse_or(key, value, self.global_history),
            "respawnzone" => self.respawn_zone = parse_or(key, value, self.respawn_zone),
            "respawnx" => self.respawn_x = parse_or(key, value, self.respawn_x),
            "respawny" => self.respawn_y = parse_or(key, value, self.respawn_y),
            "tickms" => {
                let millis = parse_or(key, value, sim.tick.as_millis() as u64);
                sim.tick = Duration::from_millis(millis.max(1));
            }
            "actrates" => {
                let parsed: Vec<u64> = value
                    .split(',')
                    .filter_map(|part| part.trim().parse().ok())
                    .collect();
                if parsed.len() != SPEED_TIERS {
                    return Err(ConfigError::InvalidOption {
                        key: key.into(),
                        reason: format!("expected {} comma separated millisecond values", SPEED_TIERS),
                    });
                }
                for (slot, millis) in sim.act_thresholds.iter_mut().zip(parsed) {
                    *slot = Duration::from_millis(millis);
                }
            }
            "boredom" => {
                let millis = parse_or(key, value, sim.boredom.as_millis() as u64);
                sim.boredom = Duration::from_millis(millis);
            }
            "chaseradius" => sim.chase_radius = parse_or(key, value, sim.chase_radius),
            "respawnradius" => sim.respawn_radius = parse_or(key, value, sim.respawn_radius),
            "respawnattempts" => sim.respawn_attempts = parse_or(key, value, sim.respawn_attempts),
            "patroldistance" => sim.patrol_distance = parse_or(key, value, sim.patrol_distance),
            "visibility" => sim.visibility_range = parse_or(key, value, sim.visibility_range),
            "recoveryticks" => {
                sim.recovery_interval_ticks = parse_or(key, value, sim.recovery_interval_ticks).max(1)
            }
            "dropprotection" => sim.drop_protection_ticks = parse_or(key, value, sim.drop_protection_ticks),
            _ => warn!("Unknown option '{}'", key),
        }
        Ok(())
    }

    /// Get the bind address for the TCP listener
    pub fn bind_address(&self) -> SocketAddr {
        let ip = if self.server_interface == "AUTO" {
            "0.0.0.0"
        } else {
            &self.server_interface
        };

        format!("{}:{}", ip, self.server_port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], self.server_port)))
    }

    /// Display configuration summary
    pub fn display(&self) {
        tracing::info!("Server configuration:");
        tracing::info!("  Name: {}", self.name);
        tracing::info!("  Bind: {}", self.bind_address());
        tracing::info!("  Max Players: {}", self.max_players);
        tracing::info!("  Enforce Sequence: {}", self.enforce_sequence);
        tracing::info!("  Ping Interval: {}s", self.ping_interval.as_secs());
        tracing::info!("  Rate Limits: {}", self.rate_limits.len());
        tracing::info!("  Data Dir: {}", self.data_dir.display());
        tracing::info!(
            "  Respawn: zone {} @ ({}, {})",
            self.respawn_zone,
            self.respawn_x,
            self.respawn_y
        );
        tracing::info!(
            "  Tick: {}ms, chase radius {}, visibility {}",
            self.simulation.tick.as_millis(),
            self.simulation.chase_radius,
            self.simulation.visibility_range
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_protocol::{PacketAction, PacketCategory, PacketId};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server_port, 8078);
        assert!(config.enforce_sequence);
        assert_eq!(config.simulation.tick, Duration::from_millis(125));
        assert_eq!(config.simulation.boredom_ticks(), 240);
    }

    #[test]
    fn test_parse_simple_config() {
        let config_text = r#"
# local test server
name = Test Realm
serverport = 9999
enforcesequence = no
ratelimit.Talk.Report = 750
actrates = 100, 200, 300, 400, 500, 600, 700
chaseradius = 4
"#;
        let config = ServerConfig::parse(config_text).unwrap();
        assert_eq!(config.name, "Test Realm");
        assert_eq!(config.server_port, 9999);
        assert!(!config.enforce_sequence);
        assert_eq!(
            config
                .rate_limits
                .interval(PacketId::new(PacketCategory::Talk, PacketAction::Report)),
            Some(Duration::from_millis(750))
        );
        assert_eq!(config.simulation.act_thresholds[6], Duration::from_millis(700));
        assert_eq!(config.simulation.chase_radius, 4);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = ServerConfig::parse("serverport = lots\nmaxplayers = -3\n").unwrap();
        assert_eq!(config.server_port, 8078);
        assert_eq!(config.max_players, 200);
    }

    #[test]
    fn test_bad_act_rates_rejected() {
        assert!(ServerConfig::parse("actrates = 1,2,3").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datadir = /srv/realm").unwrap();
        let config = ServerConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/realm"));

        assert!(matches!(
            ServerConfig::load_from_file("/nonexistent/serveroptions.txt"),
            Err(ConfigError::Io { .. })
        ));
    }
}
