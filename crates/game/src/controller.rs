//! # Actor Behavior Controller
//!
//! Decides what a single actor does on its turn. The controller holds only
//! configuration; every decision reads a [`ZoneView`] snapshot and mutates
//! nothing but the actor passed in.

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use realm_config::SimulationConfig;
use realm_core::{Direction, SessionId, TilePosition};
use realm_world::{Actor, ActorTemplate, BehaviorClass, BehaviorState, Character, SpawnPoint, Zone, ZoneTemplate};
use std::collections::HashSet;
use std::sync::Arc;

use crate::formulas::CombatStats;

/// Ticks a circling actor walks before turning
const CIRCLE_LEG: std::ops::RangeInclusive<u32> = 2..=5;

/// Percent chance a wandering actor takes a step on its turn
const WANDER_STEP_PERCENT: u32 = 40;

/// Percent chance a wandering actor keeps its previous heading
const WANDER_INERTIA_PERCENT: u32 = 60;

/// Percent chance a patrolling actor keeps its previous heading
const PATROL_INERTIA_PERCENT: u32 = 85;

/// A character as seen by the controller
#[derive(Clone)]
pub struct CharacterView {
    pub session: SessionId,
    pub position: TilePosition,
    pub direction: Direction,
    pub stats: CombatStats,
    /// Alive and not hidden
    pub targetable: bool,
    pub character: Arc<Mutex<Character>>,
}

/// Snapshot of the parts of a zone the controller looks at
///
/// Captured once per pass. The tick engine keeps it current as actors move
/// and characters die so later decisions in the same pass see earlier ones.
pub struct ZoneView {
    template: Arc<ZoneTemplate>,
    characters: Vec<CharacterView>,
    actor_positions: HashSet<TilePosition>,
}

impl ZoneView {
    /// Lock each occupant's character, then each actor, one at a time.
    pub fn capture(zone: &Zone) -> Self {
        let characters = zone
            .occupants()
            .into_iter()
            .map(|occupant| {
                let character = occupant.character.lock();
                CharacterView {
                    session: occupant.session_id(),
                    position: character.position,
                    direction: character.direction,
                    stats: CombatStats::from(&*character),
                    targetable: character.is_targetable(),
                    character: occupant.character.clone(),
                }
            })
            .collect();
        let actor_positions = zone
            .actors()
            .iter()
            .filter_map(|actor| {
                let actor = actor.lock();
                (!actor.is_dead()).then_some(actor.position)
            })
            .collect();
        Self { template: zone.shared_template(), characters, actor_positions }
    }

    /// A view with no actors, for tests and population
    pub fn new(template: Arc<ZoneTemplate>, characters: Vec<CharacterView>) -> Self {
        Self { template, characters, actor_positions: HashSet::new() }
    }

    pub fn template(&self) -> &ZoneTemplate {
        &self.template
    }

    pub fn characters(&self) -> &[CharacterView] {
        &self.characters
    }

    pub fn character(&self, session: SessionId) -> Option<&CharacterView> {
        self.characters.iter().find(|c| c.session == session)
    }

    /// Any character stands on `pos`, hidden or not.
    pub fn has_character_at(&self, pos: TilePosition) -> bool {
        self.characters.iter().any(|c| c.position == pos)
    }

    pub fn has_actor_at(&self, pos: TilePosition) -> bool {
        self.actor_positions.contains(&pos)
    }

    /// Terrain allows an actor on `pos`, ignoring occupancy.
    pub fn is_walkable_for_actor(&self, pos: TilePosition) -> bool {
        self.template.in_bounds(pos) && self.template.tile(pos).walkable_for_actor()
    }

    /// Terrain allows an actor and nobody stands there.
    pub fn is_open_for_actor(&self, pos: TilePosition) -> bool {
        self.is_walkable_for_actor(pos) && !self.has_actor_at(pos) && !self.has_character_at(pos)
    }

    pub fn place_actor(&mut self, pos: TilePosition) {
        self.actor_positions.insert(pos);
    }

    pub fn move_actor(&mut self, from: TilePosition, to: TilePosition) {
        self.actor_positions.remove(&from);
        self.actor_positions.insert(to);
    }

    pub fn remove_actor(&mut self, pos: TilePosition) {
        self.actor_positions.remove(&pos);
    }

    /// The character can no longer be targeted this pass.
    pub fn mark_untargetable(&mut self, session: SessionId) {
        if let Some(view) = self.characters.iter_mut().find(|c| c.session == session) {
            view.targetable = false;
        }
    }
}

/// An attack the actor wants to make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackDecision {
    pub target: SessionId,
    pub direction: Direction,
    /// The target is not facing the actor
    pub flanked: bool,
}

/// Result of a move attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveDecision {
    pub from: TilePosition,
    pub direction: Direction,
    pub moved: bool,
}

/// Stateless actor strategy
#[derive(Debug, Clone)]
pub struct ActorController {
    chase_radius: i32,
    respawn_radius: i32,
    respawn_attempts: u32,
    patrol_distance: i32,
}

impl ActorController {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            chase_radius: config.chase_radius,
            respawn_radius: config.respawn_radius,
            respawn_attempts: config.respawn_attempts,
            patrol_distance: config.patrol_distance,
        }
    }

    // ========== Spawning ==========

    /// Pick the idle pattern for a freshly (re)spawned actor.
    pub fn choose_behavior<R: Rng + ?Sized>(
        &self,
        template: &ActorTemplate,
        spawn: &SpawnPoint,
        rng: &mut R,
    ) -> BehaviorState {
        if spawn.is_fixed() || !template.is_attackable() {
            return BehaviorState::Stationary;
        }
        match rng.gen_range(0..100) {
            0..=49 => BehaviorState::Wander,
            50..=69 => BehaviorState::Patrol,
            70..=84 => BehaviorState::Circle,
            _ => BehaviorState::Stationary,
        }
    }

    /// Where an actor (re)appears.
    ///
    /// Fixed actors always use their origin. Others try up to
    /// `respawn_attempts` random tiles within `respawn_radius` of the origin;
    /// the second half of the attempts also accepts occupied tiles. If every
    /// attempt fails the origin is used.
    pub fn spawn_position<R: Rng + ?Sized>(&self, spawn: &SpawnPoint, view: &ZoneView, rng: &mut R) -> TilePosition {
        if spawn.is_fixed() {
            return spawn.origin;
        }

        let radius = self.respawn_radius.max(0);
        let relax_after = self.respawn_attempts / 2;
        for attempt in 0..self.respawn_attempts {
            let candidate = TilePosition::new(
                spawn.origin.x + rng.gen_range(-radius..=radius),
                spawn.origin.y + rng.gen_range(-radius..=radius),
            );
            let acceptable = if attempt < relax_after {
                view.is_open_for_actor(candidate)
            } else {
                view.is_walkable_for_actor(candidate)
            };
            if acceptable {
                return candidate;
            }
        }
        spawn.origin
    }

    pub fn spawn_direction<R: Rng + ?Sized>(&self, spawn: &SpawnPoint, rng: &mut R) -> Direction {
        match spawn.fixed_facing {
            Some(direction) => direction,
            None => random_direction(rng),
        }
    }

    // ========== Attacking ==========

    /// Choose an adjacent character to attack, if the actor wants to.
    ///
    /// Aggressive actors and passive actors with opponents attack. The
    /// adjacent opponent with the most damage dealt is preferred; an
    /// aggressive actor with no adjacent opponent picks any adjacent
    /// character at random.
    pub fn attack_target<R: Rng + ?Sized>(&self, actor: &Actor, view: &ZoneView, rng: &mut R) -> Option<AttackDecision> {
        let class = actor.class();
        let willing = match class {
            BehaviorClass::Aggressive => true,
            BehaviorClass::Passive => !actor.opponents.is_empty(),
            BehaviorClass::Vendor | BehaviorClass::Other => false,
        };
        if !willing {
            return None;
        }

        let adjacent: Vec<&CharacterView> = view
            .characters()
            .iter()
            .filter(|c| c.targetable && c.position.is_adjacent_to(actor.position))
            .collect();
        if adjacent.is_empty() {
            return None;
        }

        let preferred = actor
            .opponents
            .strongest_where(|o| adjacent.iter().any(|c| c.session == o.session))
            .map(|opponent| opponent.session);
        let target = match preferred {
            Some(session) => adjacent.iter().find(|c| c.session == session).copied(),
            None if class == BehaviorClass::Aggressive => adjacent.choose(rng).copied(),
            None => None,
        }?;

        let direction = actor.position.direction_towards(target.position)?;
        Some(AttackDecision {
            target: target.session,
            direction,
            flanked: target.direction != direction.opposite(),
        })
    }

    // ========== Moving ==========

    /// Character the actor would walk towards, if any.
    pub fn chase_target<'v>(&self, actor: &Actor, view: &'v ZoneView) -> Option<&'v CharacterView> {
        let in_reach: Vec<&CharacterView> = view
            .characters()
            .iter()
            .filter(|c| c.targetable && actor.position.distance_to(c.position) <= self.chase_radius)
            .collect();

        let strongest = actor
            .opponents
            .strongest_where(|o| in_reach.iter().any(|c| c.session == o.session))
            .map(|opponent| opponent.session);
        if let Some(session) = strongest {
            return in_reach.into_iter().find(|c| c.session == session);
        }

        if actor.class() == BehaviorClass::Aggressive {
            return in_reach
                .into_iter()
                .min_by_key(|c| actor.position.distance_to(c.position));
        }
        None
    }

    /// Try to move the actor one tile. Returns `None` when it stays put
    /// without trying.
    pub fn move_step<R: Rng + ?Sized>(&self, actor: &mut Actor, view: &ZoneView, rng: &mut R) -> Option<MoveDecision> {
        if actor.spawn.is_fixed() || !actor.template.is_attackable() {
            return None;
        }

        if let Some(target) = self.chase_target(actor, view) {
            let target = target.position;
            return Some(self.chase(actor, target, view, rng));
        }

        match actor.behavior {
            BehaviorState::Stationary => None,
            BehaviorState::Wander => {
                if rng.gen_range(0..100) >= WANDER_STEP_PERCENT {
                    return None;
                }
                let direction = if rng.gen_range(0..100) < WANDER_INERTIA_PERCENT {
                    actor.direction
                } else {
                    random_direction(rng)
                };
                Some(try_step(actor, direction, view))
            }
            BehaviorState::Patrol => {
                let origin = actor.spawn.origin;
                if actor.position.distance_to(origin) > self.patrol_distance {
                    return Some(step_towards(actor, origin, view));
                }
                let ahead = actor.position.step(actor.direction);
                let direction = if ahead.distance_to(origin) > self.patrol_distance {
                    match actor.position.direction_towards(origin) {
                        Some(home) => home,
                        None => random_direction(rng),
                    }
                } else if rng.gen_range(0..100) < PATROL_INERTIA_PERCENT {
                    actor.direction
                } else {
                    random_direction(rng)
                };
                Some(try_step(actor, direction, view))
            }
            BehaviorState::Circle => {
                if actor.turn_timer == 0 {
                    actor.direction = actor.direction.clockwise();
                    actor.turn_timer = rng.gen_range(CIRCLE_LEG);
                } else {
                    actor.turn_timer -= 1;
                }
                let direction = actor.direction;
                Some(try_step(actor, direction, view))
            }
        }
    }

    /// Step towards `target`: the main axis first, then a perpendicular
    /// direction, then one random direction.
    fn chase<R: Rng + ?Sized>(&self, actor: &mut Actor, target: TilePosition, view: &ZoneView, rng: &mut R) -> MoveDecision {
        let Some(primary) = actor.position.direction_towards(target) else {
            return MoveDecision { from: actor.position, direction: actor.direction, moved: false };
        };
        if actor.position.step(primary) == target {
            // Already adjacent; just face the target.
            actor.direction = primary;
            return MoveDecision { from: actor.position, direction: primary, moved: false };
        }

        let attempt = try_step(actor, primary, view);
        if attempt.moved {
            return attempt;
        }

        let perpendicular = match actor.position.secondary_direction_towards(target) {
            Some(direction) => direction,
            None => {
                let options: Vec<Direction> =
                    Direction::ALL.into_iter().filter(|d| d.is_perpendicular_to(primary)).collect();
                options.choose(rng).copied().unwrap_or(primary)
            }
        };
        let attempt = try_step(actor, perpendicular, view);
        if attempt.moved {
            return attempt;
        }

        try_step(actor, random_direction(rng), view)
    }
}

fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Direction {
    Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
}

/// Step towards `target` along the main axis, then the other axis.
fn step_towards(actor: &mut Actor, target: TilePosition, view: &ZoneView) -> MoveDecision {
    let Some(primary) = actor.position.direction_towards(target) else {
        return MoveDecision { from: actor.position, direction: actor.direction, moved: false };
    };
    let attempt = try_step(actor, primary, view);
    if attempt.moved {
        return attempt;
    }
    match actor.position.secondary_direction_towards(target) {
        Some(side) => try_step(actor, side, view),
        None => attempt,
    }
}

/// Face `direction` and move if the tile ahead is open.
fn try_step(actor: &mut Actor, direction: Direction, view: &ZoneView) -> MoveDecision {
    let from = actor.position;
    actor.direction = direction;
    let next = from.step(direction);
    let moved = view.is_open_for_actor(next);
    if moved {
        actor.position = next;
    }
    MoveDecision { from, direction, moved }
}
