//! Persisted character data

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything saved about a character between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub name: String,
    pub zone: u16,
    pub x: i32,
    pub y: i32,
    pub direction: u8,
    pub hp: u32,
    pub max_hp: u32,
    pub tp: u32,
    pub max_tp: u32,
    pub accuracy: u32,
    pub evade: u32,
    pub armor: u32,
    pub min_damage: u32,
    pub max_damage: u32,
    pub experience: u32,
    /// Item id to amount
    pub inventory: BTreeMap<u16, u32>,
    /// Unrecognised keys, written back unchanged
    pub extra: BTreeMap<String, String>,
}

impl Default for CharacterRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            zone: 1,
            x: 1,
            y: 1,
            direction: 0,
            hp: 10,
            max_hp: 10,
            tp: 10,
            max_tp: 10,
            accuracy: 1,
            evade: 1,
            armor: 0,
            min_damage: 1,
            max_damage: 2,
            experience: 0,
            inventory: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}
