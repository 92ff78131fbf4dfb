//! Live character state

use realm_accounts::CharacterRecord;
use realm_core::{Direction, ItemId, SessionId, SitState, TilePosition, ZoneId};
use realm_protocol::CharacterInfo;
use std::collections::BTreeMap;

/// A logged-in character
///
/// Shared between the owning session and the zone it occupies behind a
/// `parking_lot::Mutex`. Never lock it while holding an actor lock.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub player_id: SessionId,
    pub name: String,
    pub zone: ZoneId,
    pub position: TilePosition,
    pub direction: Direction,
    pub hp: u32,
    pub max_hp: u32,
    pub tp: u32,
    pub max_tp: u32,
    pub accuracy: u32,
    pub evade: u32,
    pub armor: u32,
    pub min_damage: u32,
    pub max_damage: u32,
    pub sit_state: SitState,
    pub hidden: bool,
    pub experience: u32,
    pub inventory: BTreeMap<ItemId, u32>,
    extra: BTreeMap<String, String>,
}

impl Character {
    pub fn from_record(record: CharacterRecord, player_id: SessionId) -> Self {
        let max_hp = record.max_hp.max(1);
        let max_tp = record.max_tp;
        Self {
            player_id,
            name: record.name,
            zone: ZoneId::new(record.zone),
            position: TilePosition::new(record.x, record.y),
            direction: Direction::from_u8(record.direction).unwrap_or(Direction::Down),
            // A character saved dead comes back with one hp.
            hp: record.hp.clamp(1, max_hp),
            max_hp,
            tp: record.tp.min(max_tp),
            max_tp,
            accuracy: record.accuracy,
            evade: record.evade,
            armor: record.armor,
            min_damage: record.min_damage,
            max_damage: record.max_damage.max(record.min_damage),
            sit_state: SitState::Standing,
            hidden: false,
            experience: record.experience,
            inventory: record.inventory,
            extra: record.extra,
        }
    }

    pub fn to_record(&self) -> CharacterRecord {
        CharacterRecord {
            name: self.name.clone(),
            zone: self.zone.get(),
            x: self.position.x,
            y: self.position.y,
            direction: self.direction as u8,
            hp: self.hp,
            max_hp: self.max_hp,
            tp: self.tp,
            max_tp: self.max_tp,
            accuracy: self.accuracy,
            evade: self.evade,
            armor: self.armor,
            min_damage: self.min_damage,
            max_damage: self.max_damage,
            experience: self.experience,
            inventory: self.inventory.clone(),
            extra: self.extra.clone(),
        }
    }

    pub fn info(&self) -> CharacterInfo {
        CharacterInfo {
            name: self.name.clone(),
            player_id: self.player_id,
            zone_id: self.zone,
            position: self.position,
            direction: self.direction,
            hp: self.hp,
            max_hp: self.max_hp,
            tp: self.tp,
            max_tp: self.max_tp,
            sit_state: self.sit_state,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    /// Hidden or dead characters are not targeted by actors.
    pub fn is_targetable(&self) -> bool {
        !self.hidden && !self.is_dead()
    }

    /// Apply damage, returning the amount actually removed.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        dealt
    }

    pub fn hp_percentage(&self) -> u32 {
        self.hp * 100 / self.max_hp.max(1)
    }

    pub fn add_item(&mut self, item: ItemId, amount: u32) -> u32 {
        let total = self.inventory.entry(item).or_insert(0);
        *total = total.saturating_add(amount);
        *total
    }

    /// Restore vitals after death.
    pub fn revive(&mut self) {
        self.hp = self.max_hp;
        self.tp = self.max_tp;
        self.sit_state = SitState::Standing;
    }
}
