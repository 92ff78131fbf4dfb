//! Test doubles for code that talks to peers

use async_trait::async_trait;
use parking_lot::Mutex;
use realm_accounts::CharacterRecord;
use realm_core::{Result, SessionId, ZoneId};
use realm_protocol::ServerMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::character::Character;
use crate::peer::Peer;

/// A peer that stores everything sent to it
pub struct RecordingPeer {
    id: SessionId,
    sent: Mutex<Vec<ServerMessage>>,
    zone: Mutex<Option<ZoneId>>,
    character: Mutex<Option<Arc<Mutex<Character>>>>,
    closed: AtomicBool,
    transition: tokio::sync::Mutex<()>,
}

impl RecordingPeer {
    pub fn new(id: u16) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::new(id),
            sent: Mutex::new(Vec::new()),
            zone: Mutex::new(None),
            character: Mutex::new(None),
            closed: AtomicBool::new(false),
            transition: tokio::sync::Mutex::new(()),
        })
    }

    /// A peer already controlling `character`.
    pub fn with_character(id: u16, character: Arc<Mutex<Character>>) -> Arc<Self> {
        let peer = Self::new(id);
        *peer.character.lock() = Some(character);
        peer
    }

    pub fn sent(&self) -> Vec<ServerMessage> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Peer for RecordingPeer {
    fn session_id(&self) -> SessionId {
        self.id
    }

    async fn send(&self, message: ServerMessage) -> Result<()> {
        self.sent.lock().push(message);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn zone(&self) -> Option<ZoneId> {
        *self.zone.lock()
    }

    fn set_zone(&self, zone: Option<ZoneId>) {
        *self.zone.lock() = zone;
    }

    fn character(&self) -> Option<Arc<Mutex<Character>>> {
        self.character.lock().clone()
    }

    fn transition_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.transition
    }
}

/// A default character for session `id` standing at `(x, y)` in zone 1.
pub fn character(id: u16, x: i32, y: i32) -> Arc<Mutex<Character>> {
    let record = CharacterRecord {
        name: format!("player{}", id),
        x,
        y,
        ..CharacterRecord::default()
    };
    Arc::new(Mutex::new(Character::from_record(record, SessionId::new(id))))
}
