//! Live non-player actors

use realm_core::{ActorIndex, Direction, SessionId, TilePosition};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::opponents::Opponents;
use crate::templates::{ActorTemplate, BehaviorClass, SpawnEntry};

/// Idle movement pattern, chosen when the actor spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorState {
    Stationary,
    Wander,
    Patrol,
    Circle,
}

/// How much time an actor must accumulate before it may act
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedClass {
    /// 0 is the fastest tier
    Tier(u8),
    Never,
}

impl SpeedClass {
    pub fn from_spawn(speed: u8, tiers: usize) -> Self {
        if (speed as usize) < tiers {
            Self::Tier(speed)
        } else {
            Self::Never
        }
    }

    /// Accumulated time needed before acting, `None` for [`SpeedClass::Never`].
    pub fn threshold(self, thresholds: &[Duration]) -> Option<Duration> {
        match self {
            Self::Tier(tier) => thresholds.get(tier as usize).copied(),
            Self::Never => None,
        }
    }
}

/// Where and how an actor (re)spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPoint {
    pub origin: TilePosition,
    pub speed: SpeedClass,
    pub respawn: Duration,
    pub fixed_facing: Option<Direction>,
}

impl SpawnPoint {
    pub fn from_entry(entry: &SpawnEntry, tiers: usize) -> Self {
        Self {
            origin: entry.origin(),
            speed: SpeedClass::from_spawn(entry.speed, tiers),
            respawn: Duration::from_secs(entry.respawn_secs as u64),
            fixed_facing: entry.fixed_facing,
        }
    }

    /// Fixed-facing and never-acting actors always stand at their origin.
    pub fn is_fixed(&self) -> bool {
        self.fixed_facing.is_some() || self.speed == SpeedClass::Never
    }
}

/// Result of damaging an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Damage actually removed from hp
    pub dealt: u32,
    pub killed: bool,
}

/// A spawned actor
///
/// Invariants: `hp <= template.max_hp`, and the actor is dead exactly when
/// `hp == 0`. Only [`Actor::revive`] brings a dead actor back.
#[derive(Debug, Clone)]
pub struct Actor {
    pub index: ActorIndex,
    pub template: Arc<ActorTemplate>,
    pub spawn: SpawnPoint,
    pub position: TilePosition,
    pub direction: Direction,
    pub behavior: BehaviorState,
    /// Time accumulated towards the next action
    pub accumulator: Duration,
    pub opponents: Opponents,
    /// Ticks left before a circling actor turns
    pub turn_timer: u32,
    hp: u32,
    died_at: Option<Instant>,
}

impl Actor {
    pub fn new(
        index: ActorIndex,
        template: Arc<ActorTemplate>,
        spawn: SpawnPoint,
        position: TilePosition,
        direction: Direction,
        behavior: BehaviorState,
    ) -> Self {
        let hp = template.max_hp;
        Self {
            index,
            template,
            spawn,
            position,
            direction,
            behavior,
            accumulator: Duration::ZERO,
            opponents: Opponents::new(),
            turn_timer: 0,
            hp,
            died_at: None,
        }
    }

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn max_hp(&self) -> u32 {
        self.template.max_hp
    }

    pub fn hp_percentage(&self) -> u32 {
        (self.hp * 100).checked_div(self.max_hp()).unwrap_or(0)
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    pub fn died_at(&self) -> Option<Instant> {
        self.died_at
    }

    pub fn class(&self) -> BehaviorClass {
        self.template.class
    }

    /// Apply a character's hit. Dead actors take no damage.
    pub fn take_damage(&mut self, attacker: SessionId, amount: u32, now: Instant) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome { dealt: 0, killed: false };
        }
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        self.opponents.add_damage(attacker, dealt);

        let killed = self.hp == 0;
        if killed {
            self.died_at = Some(now);
        }
        DamageOutcome { dealt, killed }
    }

    /// True once a dead actor has waited out its respawn duration.
    pub fn respawn_due(&self, now: Instant) -> bool {
        match self.died_at {
            Some(died) => now.saturating_duration_since(died) >= self.spawn.respawn,
            None => false,
        }
    }

    /// Bring a dead actor back at full hp with no threat and an empty
    /// accumulator. Does nothing to a live actor.
    pub fn revive(&mut self, position: TilePosition, direction: Direction) -> bool {
        if !self.is_dead() {
            return false;
        }
        self.hp = self.max_hp();
        self.died_at = None;
        self.opponents.clear();
        self.accumulator = Duration::ZERO;
        self.position = position;
        self.direction = direction;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(max_hp: u32) -> Arc<ActorTemplate> {
        Arc::new(ActorTemplate {
            id: 1,
            name: "rat".into(),
            max_hp,
            accuracy: 0,
            evade: 0,
            armor: 0,
            min_damage: 1,
            max_damage: 2,
            experience: 5,
            class: BehaviorClass::Passive,
            drop: None,
        })
    }

    fn actor(respawn_secs: u64) -> Actor {
        let spawn = SpawnPoint {
            origin: TilePosition::new(1, 1),
            speed: SpeedClass::Tier(0),
            respawn: Duration::from_secs(respawn_secs),
            fixed_facing: None,
        };
        Actor::new(0, template(50), spawn, spawn.origin, Direction::Down, BehaviorState::Wander)
    }

    #[test]
    fn test_damage_and_kill() {
        let now = Instant::now();
        let mut actor = actor(10);
        let hit = actor.take_damage(SessionId::new(1), 20, now);
        assert_eq!(hit, DamageOutcome { dealt: 20, killed: false });
        let kill = actor.take_damage(SessionId::new(2), 99, now);
        assert_eq!(kill, DamageOutcome { dealt: 30, killed: true });
        assert!(actor.is_dead());
        assert_eq!(actor.hp(), 0);
        assert_eq!(actor.take_damage(SessionId::new(1), 5, now).dealt, 0);
    }

    #[test]
    fn test_hp_starts_at_template_max() {
        let actor = actor(10);
        assert_eq!(actor.hp(), 50);
        assert_eq!(actor.hp_percentage(), 100);

        let empty = Actor::new(1, template(0), actor.spawn, actor.position, Direction::Up, BehaviorState::Wander);
        assert_eq!(empty.hp(), 0);
        assert_eq!(empty.hp_percentage(), 0);
    }

    #[test]
    fn test_respawn_timing() {
        let start = Instant::now();
        let mut actor = actor(10);
        actor.take_damage(SessionId::new(1), 50, start);

        assert!(!actor.respawn_due(start + Duration::from_millis(9_900)));
        assert!(actor.respawn_due(start + Duration::from_secs(10)));

        assert!(actor.revive(TilePosition::new(2, 2), Direction::Up));
        assert_eq!(actor.hp(), 50);
        assert!(actor.opponents.is_empty());
        assert!(actor.died_at().is_none());
        assert!(!actor.revive(TilePosition::new(3, 3), Direction::Up));
        assert_eq!(actor.position, TilePosition::new(2, 2));
    }

    #[test]
    fn test_speed_classes() {
        let thresholds = [Duration::from_millis(900); 7];
        assert_eq!(SpeedClass::from_spawn(3, 7), SpeedClass::Tier(3));
        assert_eq!(SpeedClass::from_spawn(7, 7), SpeedClass::Never);
        assert_eq!(SpeedClass::Never.threshold(&thresholds), None);
        assert_eq!(SpeedClass::Tier(6).threshold(&thresholds), Some(Duration::from_millis(900)));
    }
}
