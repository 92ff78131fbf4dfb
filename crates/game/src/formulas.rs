//! # Combat Formulas
//!
//! Hit chance, damage and recovery amounts. Pure functions of the stats
//! involved and a random source; no I/O and no locking.

use rand::{Rng, RngCore};
use realm_world::{ActorTemplate, Character};

/// Lowest hit chance regardless of stats
pub const MIN_HIT_CHANCE: f64 = 0.2;

/// Highest hit chance regardless of stats
pub const MAX_HIT_CHANCE: f64 = 0.95;

/// Chance of a critical hit when the defender faces the attacker
pub const CRITICAL_CHANCE: f64 = 0.05;

/// The stats one side of a fight brings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CombatStats {
    pub accuracy: u32,
    pub evade: u32,
    pub armor: u32,
    pub min_damage: u32,
    pub max_damage: u32,
}

impl From<&Character> for CombatStats {
    fn from(character: &Character) -> Self {
        Self {
            accuracy: character.accuracy,
            evade: character.evade,
            armor: character.armor,
            min_damage: character.min_damage,
            max_damage: character.max_damage,
        }
    }
}

impl From<&ActorTemplate> for CombatStats {
    fn from(template: &ActorTemplate) -> Self {
        Self {
            accuracy: template.accuracy,
            evade: template.evade,
            armor: template.armor,
            min_damage: template.min_damage,
            max_damage: template.max_damage,
        }
    }
}

/// Formula collaborator used by the tick engine and attack handler
pub trait CombatFormulas: Send + Sync {
    /// Probability in `0.0..=1.0` that an attack lands
    fn hit_chance(&self, attacker: &CombatStats, defender: &CombatStats) -> f64;

    /// Damage of a landed attack
    fn damage(&self, attacker: &CombatStats, defender: &CombatStats, critical: bool, rng: &mut dyn RngCore) -> u32;

    /// Amount of a pool (`max` hp or tp) restored by one recovery pass
    fn recovery(&self, max: u32, sitting: bool) -> u32;

    /// Roll a whole attack: 0 on a miss, otherwise the damage.
    ///
    /// # Arguments
    /// * `flanked` - The defender is not facing the attacker; always critical
    fn resolve_attack(
        &self,
        attacker: &CombatStats,
        defender: &CombatStats,
        flanked: bool,
        rng: &mut dyn RngCore,
    ) -> u32 {
        let chance = self.hit_chance(attacker, defender).clamp(0.0, 1.0);
        if !rng.gen_bool(chance) {
            return 0;
        }
        let critical = flanked || rng.gen_bool(CRITICAL_CHANCE);
        self.damage(attacker, defender, critical, rng)
    }
}

/// Default formulas
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormulas;

impl CombatFormulas for StandardFormulas {
    fn hit_chance(&self, attacker: &CombatStats, defender: &CombatStats) -> f64 {
        let total = (attacker.accuracy + defender.evade).max(1) as f64;
        let chance = 0.5 + 0.45 * (attacker.accuracy as f64 - defender.evade as f64) / total;
        chance.clamp(MIN_HIT_CHANCE, MAX_HIT_CHANCE)
    }

    fn damage(&self, attacker: &CombatStats, defender: &CombatStats, critical: bool, rng: &mut dyn RngCore) -> u32 {
        let low = attacker.min_damage;
        let high = attacker.max_damage.max(low);
        let mut amount = rng.gen_range(low..=high);
        if critical {
            amount = amount * 3 / 2;
        }

        let armor_roll = if defender.armor == 0 {
            0
        } else {
            rng.gen_range(defender.armor / 2..=defender.armor)
        };
        // A landed hit always does something.
        amount.saturating_sub(armor_roll / 2).max(1)
    }

    fn recovery(&self, max: u32, sitting: bool) -> u32 {
        if max == 0 {
            return 0;
        }
        let divisor = if sitting { 5 } else { 10 };
        (max / divisor).max(1)
    }
}
