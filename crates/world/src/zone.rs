//! A live world area
//!
//! A zone owns its occupants, actors and dropped items. Every collection is
//! internally synchronized so connection tasks and the zone's own tick can
//! use it concurrently without an outer lock:
//!
//! - occupants and items: `DashMap`
//! - actors: fixed `RwLock<Vec<_>>` of per-actor `Mutex`es
//!
//! Snapshot accessors clone `Arc`s out so no map guard outlives the call.
//! Nothing in here holds a lock across an `.await`.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use realm_core::{ActorIndex, ItemId, ItemSlot, SessionId, TilePosition, ZoneId};
use realm_protocol::{ActorInfo, ItemInfo, NearbyInfo, ServerMessage};
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::actor::Actor;
use crate::broadcast::fan_out;
use crate::character::Character;
use crate::item::{DroppedItem, PickupRefusal};
use crate::peer::Peer;
use crate::templates::{TileKind, Warp, ZoneTemplate};

/// Tiles (on either axis) within which a character may pick up an item
pub const PICKUP_RANGE: i32 = 2;

/// A session present in a zone, with the character it controls
#[derive(Clone)]
pub struct Occupant {
    pub peer: Arc<dyn Peer>,
    pub character: Arc<Mutex<Character>>,
}

impl Occupant {
    pub fn session_id(&self) -> SessionId {
        self.peer.session_id()
    }
}

pub struct Zone {
    template: Arc<ZoneTemplate>,
    occupants: DashMap<SessionId, Occupant>,
    actors: RwLock<Vec<Arc<Mutex<Actor>>>>,
    items: DashMap<ItemSlot, DroppedItem>,
    next_item_slot: AtomicU16,
    ticks: AtomicU64,
}

impl Zone {
    pub fn new(template: Arc<ZoneTemplate>) -> Self {
        Self {
            template,
            occupants: DashMap::new(),
            actors: RwLock::new(Vec::new()),
            items: DashMap::new(),
            next_item_slot: AtomicU16::new(1),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> ZoneId {
        self.template.id
    }

    pub fn template(&self) -> &ZoneTemplate {
        &self.template
    }

    pub fn shared_template(&self) -> Arc<ZoneTemplate> {
        self.template.clone()
    }

    // ========== Terrain ==========

    pub fn tile(&self, pos: TilePosition) -> TileKind {
        self.template.tile(pos)
    }

    pub fn warp_at(&self, pos: TilePosition) -> Option<Warp> {
        self.template.warp_at(pos).copied()
    }

    /// Occupied by a character or a live actor.
    pub fn is_occupied(&self, pos: TilePosition) -> bool {
        self.character_at(pos).is_some() || self.actor_at(pos).is_some()
    }

    /// A character may step onto `pos`.
    pub fn is_open_for_character(&self, pos: TilePosition) -> bool {
        self.template.in_bounds(pos) && self.tile(pos).walkable_for_character() && !self.is_occupied(pos)
    }

    // ========== Occupants ==========

    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn has_occupant(&self, session: SessionId) -> bool {
        self.occupants.contains_key(&session)
    }

    pub fn occupant(&self, session: SessionId) -> Option<Occupant> {
        self.occupants.get(&session).map(|o| o.clone())
    }

    pub fn occupants(&self) -> Vec<Occupant> {
        self.occupants.iter().map(|o| o.value().clone()).collect()
    }

    fn peers_except(&self, exclude: Option<SessionId>) -> Vec<Arc<dyn Peer>> {
        self.occupants
            .iter()
            .filter(|o| Some(*o.key()) != exclude)
            .map(|o| o.peer.clone())
            .collect()
    }

    /// Session of a visible character standing on `pos`.
    pub fn character_at(&self, pos: TilePosition) -> Option<SessionId> {
        self.occupants
            .iter()
            .find(|o| {
                let character = o.character.lock();
                character.position == pos && !character.is_dead()
            })
            .map(|o| *o.key())
    }

    /// Add a session, then tell everyone else it appeared.
    ///
    /// Returns false (and broadcasts nothing) if the session was already here.
    pub async fn enter(&self, peer: Arc<dyn Peer>, character: Arc<Mutex<Character>>, effect: Option<u8>) -> bool {
        let session = peer.session_id();
        let occupant = Occupant { peer: peer.clone(), character: character.clone() };
        match self.occupants.entry(session) {
            dashmap::mapref::entry::Entry::Occupied(_) => return false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(occupant);
            }
        }
        peer.set_zone(Some(self.id()));

        let info = character.lock().info();
        info!("Session {} entered zone {} (effect {:?})", session, self.id(), effect);
        fan_out(&self.peers_except(Some(session)), &ServerMessage::PlayersAgree { character: info }).await;
        true
    }

    /// Remove a session and tell the remaining occupants.
    pub async fn leave(&self, session: SessionId, effect: Option<u8>) -> Option<Occupant> {
        let (_, occupant) = self.occupants.remove(&session)?;
        if occupant.peer.zone() == Some(self.id()) {
            occupant.peer.set_zone(None);
        }
        for actor in self.actors() {
            actor.lock().opponents.remove(session);
        }

        info!("Session {} left zone {}", session, self.id());
        let peers = self.peers_except(None);
        fan_out(&peers, &ServerMessage::PlayersRemove { player_id: session }).await;
        fan_out(&peers, &ServerMessage::AvatarRemove { player_id: session, effect }).await;
        Some(occupant)
    }

    /// Send to every occupant except `exclude`.
    pub async fn broadcast(&self, message: &ServerMessage, exclude: Option<SessionId>) {
        fan_out(&self.peers_except(exclude), message).await;
    }

    /// Send to occupants whose character is within `range` of `center`.
    pub async fn broadcast_near(
        &self,
        center: TilePosition,
        range: i32,
        message: &ServerMessage,
        exclude: Option<SessionId>,
    ) {
        let peers: Vec<Arc<dyn Peer>> = self
            .occupants
            .iter()
            .filter(|o| Some(*o.key()) != exclude && o.character.lock().position.in_range(center, range))
            .map(|o| o.peer.clone())
            .collect();
        fan_out(&peers, message).await;
    }

    // ========== Actors ==========

    /// Append an actor; its index is its slot.
    pub fn add_actor(&self, build: impl FnOnce(ActorIndex) -> Actor) -> ActorIndex {
        let mut actors = self.actors.write();
        let index = actors.len() as ActorIndex;
        actors.push(Arc::new(Mutex::new(build(index))));
        index
    }

    pub fn actor(&self, index: ActorIndex) -> Option<Arc<Mutex<Actor>>> {
        self.actors.read().get(index as usize).cloned()
    }

    pub fn actors(&self) -> Vec<Arc<Mutex<Actor>>> {
        self.actors.read().clone()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.read().len()
    }

    /// Index of a live actor standing on `pos`.
    pub fn actor_at(&self, pos: TilePosition) -> Option<ActorIndex> {
        self.actors.read().iter().find_map(|actor| {
            let actor = actor.lock();
            (!actor.is_dead() && actor.position == pos).then_some(actor.index)
        })
    }

    pub fn actor_infos(&self) -> Vec<ActorInfo> {
        self.actors
            .read()
            .iter()
            .filter_map(|actor| {
                let actor = actor.lock();
                (!actor.is_dead()).then(|| ActorInfo {
                    index: actor.index,
                    template_id: actor.template.id,
                    position: actor.position,
                    direction: actor.direction,
                })
            })
            .collect()
    }

    // ========== Items ==========

    /// Place an item on the ground and return its slot.
    pub fn drop_item(
        &self,
        item_id: ItemId,
        amount: u32,
        position: TilePosition,
        owner: Option<SessionId>,
        protection_ticks: u32,
    ) -> DroppedItem {
        let mut slot = self.next_item_slot.fetch_add(1, Ordering::Relaxed);
        while slot == 0 || self.items.contains_key(&slot) {
            slot = self.next_item_slot.fetch_add(1, Ordering::Relaxed);
        }
        let item = DroppedItem { slot, item_id, amount, position, owner, protection_ticks };
        self.items.insert(slot, item);
        debug!("Zone {} dropped item {} x{} in slot {}", self.id(), item_id, amount, slot);
        item
    }

    pub fn item(&self, slot: ItemSlot) -> Option<DroppedItem> {
        self.items.get(&slot).map(|i| *i)
    }

    pub fn items(&self) -> Vec<DroppedItem> {
        self.items.iter().map(|i| *i.value()).collect()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Remove an item for `taker` standing at `from`.
    ///
    /// Check and removal happen under the item's map entry, so two
    /// concurrent pickups of one slot cannot both succeed.
    pub fn pickup(&self, slot: ItemSlot, taker: SessionId, from: TilePosition) -> Result<DroppedItem, PickupRefusal> {
        let entry = match self.items.entry(slot) {
            dashmap::mapref::entry::Entry::Occupied(entry) => entry,
            dashmap::mapref::entry::Entry::Vacant(_) => return Err(PickupRefusal::Missing),
        };
        let item = *entry.get();
        if !item.position.in_range(from, PICKUP_RANGE) {
            return Err(PickupRefusal::TooFar);
        }
        if !item.can_be_taken_by(taker) {
            return Err(PickupRefusal::Protected);
        }
        entry.remove();
        Ok(item)
    }

    /// One tick of pickup protection for every item (floor 0).
    pub fn decrement_protection(&self) {
        for mut item in self.items.iter_mut() {
            item.protection_ticks = item.protection_ticks.saturating_sub(1);
        }
    }

    // ========== Snapshots ==========

    /// Characters, live actors and items within `range` of `center`.
    pub fn nearby(&self, center: TilePosition, range: i32) -> NearbyInfo {
        let characters = self
            .occupants
            .iter()
            .filter_map(|o| {
                let character = o.character.lock();
                (!character.hidden && character.position.in_range(center, range)).then(|| character.info())
            })
            .collect();
        let actors = self
            .actor_infos()
            .into_iter()
            .filter(|a| a.position.in_range(center, range))
            .collect();
        let items: Vec<ItemInfo> = self
            .items
            .iter()
            .filter(|i| i.position.in_range(center, range))
            .map(|i| i.info())
            .collect();
        NearbyInfo { characters, actors, items }
    }

    // ========== Tick counter ==========

    /// Ticks that did work (idle ticks are not counted).
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Count a processed tick and return the new total.
    pub fn advance_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }
}
