//! Process-wide table of zones and sessions
//!
//! Zones are fixed at construction; sessions come and go. Global chat
//! history is a bounded queue, oldest entry first.

use dashmap::DashMap;
use parking_lot::Mutex;
use realm_core::{SessionId, TilePosition, ZoneId};
use realm_protocol::ServerMessage;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::broadcast::fan_out;
use crate::error::{Result, WorldError};
use crate::peer::Peer;
use crate::zone::Zone;

/// One global chat line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalMessage {
    pub id: u64,
    pub author: String,
    pub message: String,
    pub timestamp: SystemTime,
}

/// Zones and sessions of the running server
///
/// Generic over the session type so callers get their own type back from
/// [`WorldRegistry::find_session`].
pub struct WorldRegistry<S: Peer> {
    zones: HashMap<ZoneId, Arc<Zone>>,
    sessions: DashMap<SessionId, Arc<S>>,
    history: Mutex<VecDeque<GlobalMessage>>,
    history_limit: usize,
    next_message_id: AtomicU64,
}

impl<S: Peer> WorldRegistry<S> {
    pub fn new(zones: Vec<Zone>, history_limit: usize) -> Self {
        let zones = zones.into_iter().map(|zone| (zone.id(), Arc::new(zone))).collect();
        Self {
            zones,
            sessions: DashMap::new(),
            history: Mutex::new(VecDeque::with_capacity(history_limit)),
            history_limit,
            next_message_id: AtomicU64::new(1),
        }
    }

    // ========== Zones ==========

    pub fn find_zone(&self, id: ZoneId) -> Option<Arc<Zone>> {
        self.zones.get(&id).cloned()
    }

    pub fn zones(&self) -> impl Iterator<Item = &Arc<Zone>> {
        self.zones.values()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    // ========== Sessions ==========

    pub fn find_session(&self, id: SessionId) -> Option<Arc<S>> {
        self.sessions.get(&id).map(|s| s.clone())
    }

    /// Returns false if the id is already registered.
    pub fn register_session(&self, session: Arc<S>) -> bool {
        let id = session.session_id();
        match self.sessions.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(session);
                debug!("Session {} registered", id);
                true
            }
        }
    }

    /// Remove a session and, if it occupies a zone, leave it.
    ///
    /// Only the first call for an id does anything.
    pub async fn deregister_session(&self, id: SessionId) -> Option<Arc<S>> {
        let (_, session) = self.sessions.remove(&id)?;
        // A transition already in flight finishes first; later ones see the
        // session gone and bail.
        let _guard = session.transition_lock().lock().await;
        if let Some(zone_id) = session.zone() {
            match self.find_zone(zone_id) {
                Some(zone) => {
                    zone.leave(id, None).await;
                }
                None => warn!("Session {} was in unknown zone {}", id, zone_id),
            }
        }
        debug!("Session {} deregistered", id);
        drop(_guard);
        Some(session)
    }

    pub fn sessions(&self) -> Vec<Arc<S>> {
        self.sessions.iter().map(|s| s.value().clone()).collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether any session controls a character called `name`.
    pub fn is_character_online(&self, name: &str) -> bool {
        self.sessions.iter().any(|s| {
            s.character()
                .map(|c| c.lock().name.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
    }

    /// Send to every session that controls a character.
    pub async fn broadcast_all(&self, message: &ServerMessage, exclude: Option<SessionId>) {
        let peers: Vec<Arc<S>> = self
            .sessions
            .iter()
            .filter(|s| Some(*s.key()) != exclude && s.character().is_some())
            .map(|s| s.value().clone())
            .collect();
        fan_out(&peers, message).await;
    }

    // ========== Global chat ==========

    /// Append a message and trim the history to its bound.
    pub fn add_global_message(&self, author: &str, message: &str) -> GlobalMessage {
        let entry = GlobalMessage {
            id: self.next_message_id.fetch_add(1, Ordering::Relaxed),
            author: author.to_string(),
            message: message.to_string(),
            timestamp: SystemTime::now(),
        };

        let mut history = self.history.lock();
        history.push_back(entry.clone());
        while history.len() > self.history_limit {
            history.pop_front();
        }
        entry
    }

    /// The most recent `count` messages, oldest first and newest last.
    pub fn recent_global_messages(&self, count: usize) -> Vec<GlobalMessage> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(count);
        history.iter().skip(skip).cloned().collect()
    }

    // ========== Transitions ==========

    fn is_registered(&self, session: &Arc<S>) -> bool {
        self.sessions
            .get(&session.session_id())
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), session))
    }

    /// Move a session's character to `target` at `position`.
    ///
    /// Leaves the current zone (if any), updates the character, then enters
    /// the target. Runs under the session's transition lock, so a session
    /// never has two transitions in flight. The target is resolved first; a
    /// missing target leaves the session where it was. A session that is no
    /// longer registered is not moved.
    pub async fn transition(
        &self,
        session: &Arc<S>,
        target: ZoneId,
        position: TilePosition,
        effect: Option<u8>,
    ) -> Result<Arc<Zone>> {
        let _guard = session.transition_lock().lock().await;
        let id = session.session_id();
        if !self.is_registered(session) {
            return Err(WorldError::SessionNotRegistered(id));
        }

        let character = session.character().ok_or(WorldError::NoCharacter(id))?;
        let target_zone = self.find_zone(target).ok_or(WorldError::ZoneNotFound(target))?;

        if let Some(current) = session.zone().and_then(|z| self.find_zone(z)) {
            current.leave(id, effect).await;
        }

        {
            let mut character = character.lock();
            character.zone = target;
            character.position = position;
            character.sit_state = Default::default();
        }

        let peer: Arc<dyn Peer> = session.clone();
        target_zone.enter(peer, character, effect).await;
        info!("Session {} moved to zone {} at ({}, {})", id, target, position.x, position.y);
        Ok(target_zone)
    }
}
