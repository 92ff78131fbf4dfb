//! The world's view of a connected session

use async_trait::async_trait;
use parking_lot::Mutex;
use realm_core::{Result, SessionId, ZoneId};
use realm_protocol::ServerMessage;
use std::sync::Arc;

use crate::character::Character;

/// A connection the world can address.
///
/// Implemented by the network session; tests use recording doubles.
#[async_trait]
pub trait Peer: Send + Sync + 'static {
    fn session_id(&self) -> SessionId;

    /// Serialize and write one message. Concurrent calls never interleave.
    async fn send(&self, message: ServerMessage) -> Result<()>;

    /// Ask the session to shut down; cleanup happens on its own task.
    fn close(&self);

    /// Zone currently occupied, if any
    fn zone(&self) -> Option<ZoneId>;

    fn set_zone(&self, zone: Option<ZoneId>);

    /// Character controlled by this session, if logged in
    fn character(&self) -> Option<Arc<Mutex<Character>>>;

    /// Held for the whole of a zone transition so one session never runs
    /// two at once.
    fn transition_lock(&self) -> &tokio::sync::Mutex<()>;
}
