//! # Realm Networking Layer
//!
//! Tokio-based sessions for the realm server.
//!
//! ## Modules
//!
//! - [`config`] - Network options derived from the server configuration
//! - [`context`] - State shared by every session task
//! - [`session`] - Per-connection protocol state machine
//! - [`sequence`] - Inbound sequence tracking
//! - [`rate_limit`] - Per-packet minimum intervals
//! - [`handlers`] - Message handler registry
//! - [`game_handlers`] - The standard handler table
//! - [`keepalive`] - Periodic ping sweep
//! - [`server`] - TCP acceptance and shutdown

pub mod config;
pub mod context;
pub mod game_handlers;
pub mod handlers;
pub mod keepalive;
pub mod rate_limit;
pub mod sequence;
pub mod server;
pub mod session;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use config::NetworkConfig;
pub use context::ServerContext;
pub use handlers::{HandlerFunction, HandlerRegistry};
pub use keepalive::SweepReport;
pub use rate_limit::RateLimiter;
pub use sequence::SequenceGenerator;
pub use server::{spawn_connection, RealmServer, ServerStats};
pub use session::{KeepAlive, Session};
