//! # Zone Tick Engine
//!
//! One [`ZoneTicker`] per zone advances its actors on a fixed period.
//!
//! Each processed tick runs, in order:
//! 1. item protection countdown
//! 2. respawn pass, then one appearance broadcast
//! 3. act pass: every live actor attacks or moves once its accumulator
//!    reaches its speed threshold
//! 4. one outcome message per occupant
//! 5. recovery for characters that were not hit (every N ticks)
//! 6. killed characters are revived at the respawn point
//!
//! Zones without occupants are not processed at all.

use rand::rngs::StdRng;
use rand::SeedableRng;
use realm_config::SimulationConfig;
use realm_core::{ActorIndex, SessionId, TilePosition, ZoneId};
use realm_protocol::{ActorAttack, ActorInfo, ActorMove, ServerMessage};
use realm_world::{fan_out_each, Peer, WorldRegistry, Zone};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::controller::{ActorController, AttackDecision, ZoneView};
use crate::formulas::{CombatFormulas, CombatStats};

/// Where killed characters come back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespawnPoint {
    pub zone: ZoneId,
    pub position: TilePosition,
}

/// What one processed tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Value of the zone's tick counter after this tick
    pub tick: u64,
    pub respawned: Vec<ActorInfo>,
    pub moves: Vec<ActorMove>,
    pub attacks: Vec<ActorAttack>,
    pub recovered: Vec<SessionId>,
    pub killed: Vec<SessionId>,
}

/// Outcome of one actor's turn, applied after its lock is released
enum Turn {
    Attack { index: ActorIndex, decision: AttackDecision, damage: u32 },
    Move(ActorMove),
    Idle,
}

pub struct ZoneTicker<S: Peer> {
    zone: Arc<Zone>,
    world: Arc<WorldRegistry<S>>,
    config: SimulationConfig,
    controller: ActorController,
    formulas: Arc<dyn CombatFormulas>,
    respawn: RespawnPoint,
    rng: StdRng,
}

impl<S: Peer> ZoneTicker<S> {
    pub fn new(
        zone: Arc<Zone>,
        world: Arc<WorldRegistry<S>>,
        config: SimulationConfig,
        formulas: Arc<dyn CombatFormulas>,
        respawn: RespawnPoint,
    ) -> Self {
        let controller = ActorController::new(&config);
        Self {
            zone,
            world,
            config,
            controller,
            formulas,
            respawn,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the random source, for reproducible runs.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn zone(&self) -> &Arc<Zone> {
        &self.zone
    }

    /// Tick on the configured period until `shutdown` fires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Zone {} ticking every {}ms", self.zone.id(), self.config.tick.as_millis());

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    self.tick(Instant::now()).await;
                }
            }
        }

        info!("Zone {} tick loop stopped after {} ticks", self.zone.id(), self.zone.ticks());
    }

    /// Process one tick at `now`.
    ///
    /// # Returns
    /// `None` if the zone was empty and nothing happened
    pub async fn tick(&mut self, now: Instant) -> Option<TickReport> {
        let zone = self.zone.clone();
        if zone.is_empty() {
            return None;
        }

        let tick = zone.advance_tick();
        zone.decrement_protection();

        let mut view = ZoneView::capture(&zone);

        let respawned = self.respawn_pass(&zone, &mut view, now);
        if !respawned.is_empty() {
            zone.broadcast(&ServerMessage::NpcAgree { actors: respawned.clone() }, None)
                .await;
        }

        let (moves, attacks) = self.act_pass(&zone, &mut view);
        self.broadcast_outcomes(&zone, &view, &moves, &attacks).await;

        let hit: HashSet<SessionId> = attacks.iter().filter(|a| a.damage > 0).map(|a| a.target).collect();
        let recovered = if tick % self.config.recovery_interval_ticks.max(1) == 0 {
            self.recovery_pass(&zone, &hit).await
        } else {
            Vec::new()
        };

        let mut killed: Vec<SessionId> = Vec::new();
        for attack in attacks.iter().filter(|a| a.killed) {
            if !killed.contains(&attack.target) {
                killed.push(attack.target);
            }
        }
        self.revive_killed(&killed).await;

        trace!(
            "Zone {} tick {}: {} respawned, {} moves, {} attacks",
            zone.id(),
            tick,
            respawned.len(),
            moves.len(),
            attacks.len()
        );
        Some(TickReport { tick, respawned, moves, attacks, recovered, killed })
    }

    fn respawn_pass(&mut self, zone: &Zone, view: &mut ZoneView, now: Instant) -> Vec<ActorInfo> {
        let mut respawned = Vec::new();
        for slot in zone.actors() {
            let mut actor = slot.lock();
            if !actor.respawn_due(now) {
                continue;
            }

            let position = self.controller.spawn_position(&actor.spawn, view, &mut self.rng);
            let direction = self.controller.spawn_direction(&actor.spawn, &mut self.rng);
            let behavior = self.controller.choose_behavior(&actor.template, &actor.spawn, &mut self.rng);
            if actor.revive(position, direction) {
                actor.behavior = behavior;
                actor.turn_timer = 0;
                view.place_actor(position);
                debug!("Zone {} actor {} respawned at ({}, {})", zone.id(), actor.index, position.x, position.y);
                respawned.push(ActorInfo {
                    index: actor.index,
                    template_id: actor.template.id,
                    position,
                    direction,
                });
            }
        }
        respawned
    }

    fn act_pass(&mut self, zone: &Zone, view: &mut ZoneView) -> (Vec<ActorMove>, Vec<ActorAttack>) {
        let boredom = self.config.boredom_ticks();
        let mut moves = Vec::new();
        let mut attacks = Vec::new();

        for slot in zone.actors() {
            let turn = {
                let mut actor = slot.lock();
                if actor.is_dead() {
                    continue;
                }
                actor.opponents.age_and_prune(boredom);

                let Some(threshold) = actor.spawn.speed.threshold(&self.config.act_thresholds) else {
                    continue;
                };
                actor.accumulator += self.config.tick;
                if actor.accumulator < threshold {
                    continue;
                }

                let turn = match self.controller.attack_target(&actor, view, &mut self.rng) {
                    Some(decision) => {
                        actor.direction = decision.direction;
                        match view.character(decision.target).map(|c| c.stats) {
                            Some(defender) => {
                                let attacker = CombatStats::from(&*actor.template);
                                let damage = self
                                    .formulas
                                    .resolve_attack(&attacker, &defender, decision.flanked, &mut self.rng);
                                Turn::Attack { index: actor.index, decision, damage }
                            }
                            None => Turn::Idle,
                        }
                    }
                    None => match self.controller.move_step(&mut actor, view, &mut self.rng) {
                        Some(step) if step.moved => {
                            view.move_actor(step.from, actor.position);
                            Turn::Move(ActorMove {
                                index: actor.index,
                                position: actor.position,
                                direction: actor.direction,
                            })
                        }
                        _ => Turn::Idle,
                    },
                };

                // A ready actor that did nothing stays ready without banking time
                match turn {
                    Turn::Idle => actor.accumulator = threshold,
                    _ => actor.accumulator -= threshold,
                }
                turn
            };

            match turn {
                Turn::Attack { index, decision, damage } => {
                    let Some(target) = view.character(decision.target).map(|c| c.character.clone()) else {
                        continue;
                    };
                    let (dealt, killed, hp_percentage) = {
                        let mut character = target.lock();
                        let dealt = character.take_damage(damage);
                        (dealt, character.is_dead(), character.hp_percentage())
                    };
                    if killed {
                        slot.lock().opponents.remove(decision.target);
                        view.mark_untargetable(decision.target);
                        info!("Session {} was killed by actor {} in zone {}", decision.target, index, zone.id());
                    }
                    attacks.push(ActorAttack {
                        index,
                        target: decision.target,
                        direction: decision.direction,
                        damage: dealt,
                        killed,
                        hp_percentage,
                    });
                }
                Turn::Move(step) => moves.push(step),
                Turn::Idle => {}
            }
        }

        (moves, attacks)
    }

    /// One message per occupant: moves within visibility range, every attack.
    async fn broadcast_outcomes(&self, zone: &Zone, view: &ZoneView, moves: &[ActorMove], attacks: &[ActorAttack]) {
        if moves.is_empty() && attacks.is_empty() {
            return;
        }

        let range = self.config.visibility_range;
        let deliveries: Vec<(Arc<dyn Peer>, ServerMessage)> = zone
            .occupants()
            .into_iter()
            .filter_map(|occupant| {
                let center = match view.character(occupant.session_id()) {
                    Some(seen) => seen.position,
                    None => occupant.character.lock().position,
                };
                let visible: Vec<ActorMove> = moves.iter().filter(|m| m.position.in_range(center, range)).copied().collect();
                if visible.is_empty() && attacks.is_empty() {
                    return None;
                }
                let message = ServerMessage::NpcPlayer { moves: visible, attacks: attacks.to_vec() };
                Some((occupant.peer, message))
            })
            .collect();
        fan_out_each(deliveries).await;
    }

    async fn recovery_pass(&self, zone: &Zone, hit: &HashSet<SessionId>) -> Vec<SessionId> {
        let mut recovered = Vec::new();
        let mut deliveries: Vec<(Arc<dyn Peer>, ServerMessage)> = Vec::new();

        for occupant in zone.occupants() {
            let session = occupant.session_id();
            if hit.contains(&session) {
                continue;
            }
            let update = {
                let mut guard = occupant.character.lock();
                let character = &mut *guard;
                if character.is_dead() || (character.hp >= character.max_hp && character.tp >= character.max_tp) {
                    None
                } else {
                    let sitting = character.sit_state.is_sitting();
                    let hp_gain = self.formulas.recovery(character.max_hp, sitting);
                    let tp_gain = self.formulas.recovery(character.max_tp, sitting);
                    character.hp = character.hp.saturating_add(hp_gain).min(character.max_hp);
                    character.tp = character.tp.saturating_add(tp_gain).min(character.max_tp);
                    Some((character.hp, character.tp))
                }
            };
            if let Some((hp, tp)) = update {
                recovered.push(session);
                deliveries.push((occupant.peer, ServerMessage::RecoverPlayer { hp, tp }));
            }
        }

        fan_out_each(deliveries).await;
        recovered
    }

    /// Restore killed characters and move them to the respawn point.
    async fn revive_killed(&self, killed: &[SessionId]) {
        for &session in killed {
            let Some(peer) = self.world.find_session(session) else {
                continue;
            };
            if let Some(character) = peer.character() {
                character.lock().revive();
            }

            let position = self.respawn.position;
            match self.world.transition(&peer, self.respawn.zone, position, None).await {
                Ok(target) => {
                    let nearby = target.nearby(position, self.config.visibility_range);
                    let warp = ServerMessage::WarpAgree { zone_id: target.id(), position, effect: None, nearby };
                    if let Err(e) = peer.send(warp).await {
                        warn!("Session {} failed to receive respawn warp: {}", session, e);
                    }
                }
                Err(e) => {
                    warn!("Session {} could not be revived: {}", session, e);
                    peer.close();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulas::StandardFormulas;
    use rand::RngCore;
    use realm_core::Direction;
    use realm_world::testing::{character, RecordingPeer};
    use realm_world::{Actor, ActorTemplate, BehaviorClass, BehaviorState, SpawnPoint, SpeedClass, ZoneTemplate};
    use std::time::Duration;

    /// Every attack lands for a fixed amount.
    struct FixedHits(u32);

    impl CombatFormulas for FixedHits {
        fn hit_chance(&self, _: &CombatStats, _: &CombatStats) -> f64 {
            1.0
        }
        fn damage(&self, _: &CombatStats, _: &CombatStats, _: bool, _: &mut dyn RngCore) -> u32 {
            self.0
        }
        fn recovery(&self, max: u32, sitting: bool) -> u32 {
            StandardFormulas.recovery(max, sitting)
        }
    }

    fn fast_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.act_thresholds = [config.tick; realm_config::SPEED_TIERS];
        config.recovery_interval_ticks = 1_000;
        config
    }

    fn template(class: BehaviorClass, max_hp: u32) -> Arc<ActorTemplate> {
        Arc::new(ActorTemplate {
            id: 7,
            name: "boar".into(),
            max_hp,
            accuracy: 5,
            evade: 5,
            armor: 0,
            min_damage: 1,
            max_damage: 3,
            experience: 10,
            class,
            drop: None,
        })
    }

    fn add_actor(zone: &Zone, class: BehaviorClass, max_hp: u32, at: TilePosition, speed: SpeedClass) -> ActorIndex {
        let spawn = SpawnPoint { origin: at, speed, respawn: Duration::from_secs(10), fixed_facing: None };
        zone.add_actor(|index| {
            Actor::new(index, template(class, max_hp), spawn, at, Direction::Down, BehaviorState::Stationary)
        })
    }

    fn world(zone_ids: &[u16]) -> Arc<WorldRegistry<RecordingPeer>> {
        let zones = zone_ids
            .iter()
            .map(|&id| Zone::new(Arc::new(ZoneTemplate::open(ZoneId::new(id), 20, 20))))
            .collect();
        Arc::new(WorldRegistry::new(zones, 10))
    }

    async fn join(world: &WorldRegistry<RecordingPeer>, id: u16, zone: u16, x: i32, y: i32) -> Arc<RecordingPeer> {
        let peer = RecordingPeer::with_character(id, character(id, x, y));
        world.register_session(peer.clone());
        world
            .transition(&peer, ZoneId::new(zone), TilePosition::new(x, y), None)
            .await
            .unwrap();
        peer
    }

    fn ticker(
        world: &Arc<WorldRegistry<RecordingPeer>>,
        zone: u16,
        config: SimulationConfig,
        formulas: Arc<dyn CombatFormulas>,
    ) -> ZoneTicker<RecordingPeer> {
        let respawn = RespawnPoint { zone: ZoneId::new(2), position: TilePosition::new(1, 1) };
        ZoneTicker::new(world.find_zone(ZoneId::new(zone)).unwrap(), world.clone(), config, formulas, respawn)
            .with_rng(StdRng::seed_from_u64(5))
    }

    #[tokio::test]
    async fn test_empty_zone_is_skipped() {
        let world = world(&[1]);
        let zone = world.find_zone(ZoneId::new(1)).unwrap();
        add_actor(&zone, BehaviorClass::Aggressive, 10, TilePosition::new(3, 3), SpeedClass::Tier(0));
        let mut ticker = ticker(&world, 1, fast_config(), Arc::new(StandardFormulas));

        assert!(ticker.tick(Instant::now()).await.is_none());
        assert_eq!(zone.ticks(), 0);
        assert_eq!(zone.actor(0).unwrap().lock().accumulator, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_respawn_waits_full_duration() {
        let world = world(&[1, 2]);
        let zone = world.find_zone(ZoneId::new(1)).unwrap();
        let index = add_actor(&zone, BehaviorClass::Passive, 50, TilePosition::new(10, 10), SpeedClass::Never);
        let watcher = join(&world, 1, 1, 1, 1).await;
        let mut ticker = ticker(&world, 1, fast_config(), Arc::new(StandardFormulas));

        let killed_at = Instant::now();
        {
            let actor = zone.actor(index).unwrap();
            let outcome = actor.lock().take_damage(SessionId::new(1), 50, killed_at);
            assert!(outcome.killed);
        }

        ticker.tick(killed_at + Duration::from_millis(9_900)).await.unwrap();
        assert!(zone.actor(index).unwrap().lock().is_dead());

        let report = ticker.tick(killed_at + Duration::from_secs(10)).await.unwrap();
        assert_eq!(report.respawned.len(), 1);
        let actor = zone.actor(index).unwrap();
        let actor = actor.lock();
        assert!(!actor.is_dead());
        assert_eq!(actor.hp(), 50);
        assert!(actor.opponents.is_empty());
        assert!(watcher.sent().iter().any(|m| matches!(m, ServerMessage::NpcAgree { .. })));
    }

    #[tokio::test]
    async fn test_attacks_highest_damage_opponent() {
        let world = world(&[1, 2]);
        let zone = world.find_zone(ZoneId::new(1)).unwrap();
        let index = add_actor(&zone, BehaviorClass::Passive, 100, TilePosition::new(5, 5), SpeedClass::Tier(0));
        let a = join(&world, 1, 1, 5, 4).await;
        let b = join(&world, 2, 1, 4, 5).await;
        {
            let actor = zone.actor(index).unwrap();
            let mut actor = actor.lock();
            actor.take_damage(SessionId::new(2), 5, Instant::now());
            actor.take_damage(SessionId::new(1), 12, Instant::now());
        }
        a.clear();
        b.clear();

        let mut ticker = ticker(&world, 1, fast_config(), Arc::new(FixedHits(3)));
        let report = ticker.tick(Instant::now()).await.unwrap();

        assert_eq!(report.attacks.len(), 1);
        assert_eq!(report.attacks[0].target, SessionId::new(1));
        assert_eq!(report.attacks[0].damage, 3);
        assert_eq!(a.character().unwrap().lock().hp, 7);
        assert_eq!(b.character().unwrap().lock().hp, 10);
        for peer in [&a, &b] {
            assert!(peer
                .sent()
                .iter()
                .any(|m| matches!(m, ServerMessage::NpcPlayer { attacks, .. } if attacks.len() == 1)));
        }
    }

    #[tokio::test]
    async fn test_bored_opponents_are_forgotten() {
        let world = world(&[1, 2]);
        let zone = world.find_zone(ZoneId::new(1)).unwrap();
        let index = add_actor(&zone, BehaviorClass::Passive, 100, TilePosition::new(15, 15), SpeedClass::Never);
        let _watcher = join(&world, 1, 1, 1, 1).await;
        zone.actor(index)
            .unwrap()
            .lock()
            .take_damage(SessionId::new(1), 4, Instant::now());

        let mut config = fast_config();
        config.boredom = config.tick * 2;
        let mut ticker = ticker(&world, 1, config, Arc::new(StandardFormulas));

        ticker.tick(Instant::now()).await.unwrap();
        ticker.tick(Instant::now()).await.unwrap();
        assert!(zone.actor(index).unwrap().lock().opponents.contains(SessionId::new(1)));
        ticker.tick(Instant::now()).await.unwrap();
        assert!(zone.actor(index).unwrap().lock().opponents.is_empty());
    }

    #[tokio::test]
    async fn test_recovery_skips_characters_that_were_hit() {
        let world = world(&[1, 2]);
        let zone = world.find_zone(ZoneId::new(1)).unwrap();
        add_actor(&zone, BehaviorClass::Aggressive, 100, TilePosition::new(5, 5), SpeedClass::Tier(0));
        let victim = join(&world, 1, 1, 5, 6).await;
        let resting = join(&world, 2, 1, 15, 15).await;
        victim.character().unwrap().lock().hp = 8;
        resting.character().unwrap().lock().hp = 4;

        let mut config = fast_config();
        config.recovery_interval_ticks = 1;
        config.chase_radius = 0;
        let mut ticker = ticker(&world, 1, config, Arc::new(FixedHits(1)));
        let report = ticker.tick(Instant::now()).await.unwrap();

        assert_eq!(report.recovered, vec![SessionId::new(2)]);
        assert_eq!(resting.character().unwrap().lock().hp, 5);
        assert_eq!(victim.character().unwrap().lock().hp, 7);
        assert!(resting
            .sent()
            .iter()
            .any(|m| matches!(m, ServerMessage::RecoverPlayer { hp: 5, .. })));
    }

    #[tokio::test]
    async fn test_killed_character_respawns_elsewhere() {
        let world = world(&[1, 2]);
        let zone = world.find_zone(ZoneId::new(1)).unwrap();
        add_actor(&zone, BehaviorClass::Aggressive, 100, TilePosition::new(5, 5), SpeedClass::Tier(0));
        let victim = join(&world, 1, 1, 6, 5).await;

        let mut ticker = ticker(&world, 1, fast_config(), Arc::new(FixedHits(50)));
        let report = ticker.tick(Instant::now()).await.unwrap();

        assert_eq!(report.killed, vec![SessionId::new(1)]);
        assert!(!zone.has_occupant(SessionId::new(1)));
        assert_eq!(victim.zone(), Some(ZoneId::new(2)));
        let character = victim.character().unwrap();
        assert_eq!(character.lock().hp, character.lock().max_hp);
        assert_eq!(character.lock().position, TilePosition::new(1, 1));
        assert!(victim.sent().iter().any(|m| matches!(m, ServerMessage::WarpAgree { .. })));
        assert!(zone.actor(0).unwrap().lock().opponents.is_empty());
    }

    #[tokio::test]
    async fn test_ready_actor_that_idles_stays_ready() {
        let world = world(&[1, 2]);
        let zone = world.find_zone(ZoneId::new(1)).unwrap();
        let index = add_actor(&zone, BehaviorClass::Aggressive, 100, TilePosition::new(5, 5), SpeedClass::Tier(0));
        let _watcher = join(&world, 1, 1, 15, 15).await;

        let mut config = fast_config();
        config.act_thresholds = [config.tick * 3; realm_config::SPEED_TIERS];
        config.chase_radius = 0;
        let threshold = config.tick * 3;
        let mut ticker = ticker(&world, 1, config, Arc::new(FixedHits(1)));

        for _ in 0..3 {
            let report = ticker.tick(Instant::now()).await.unwrap();
            assert!(report.attacks.is_empty());
        }
        assert_eq!(zone.actor(index).unwrap().lock().accumulator, threshold);

        let _victim = join(&world, 2, 1, 5, 6).await;
        let report = ticker.tick(Instant::now()).await.unwrap();
        assert_eq!(report.attacks.len(), 1);
        assert_eq!(report.attacks[0].target, SessionId::new(2));
        assert!(zone.actor(index).unwrap().lock().accumulator < threshold);
    }

    #[tokio::test]
    async fn test_moves_reach_nearby_occupants_and_attacks_reach_all() {
        let world = world(&[1, 2]);
        let zone = world.find_zone(ZoneId::new(1)).unwrap();
        let walker = add_actor(&zone, BehaviorClass::Passive, 100, TilePosition::new(2, 2), SpeedClass::Tier(0));
        {
            let actor = zone.actor(walker).unwrap();
            let mut actor = actor.lock();
            actor.behavior = BehaviorState::Circle;
            actor.turn_timer = 0;
        }
        add_actor(&zone, BehaviorClass::Aggressive, 100, TilePosition::new(18, 19), SpeedClass::Tier(0));
        let near = join(&world, 1, 1, 4, 4).await;
        let far = join(&world, 2, 1, 19, 19).await;
        near.clear();
        far.clear();

        let mut ticker = ticker(&world, 1, fast_config(), Arc::new(FixedHits(1)));
        let report = ticker.tick(Instant::now()).await.unwrap();
        assert_eq!(report.moves.len(), 1);
        assert_eq!(report.moves[0].index, walker);
        assert_eq!(report.attacks.len(), 1);
        assert_eq!(report.attacks[0].target, SessionId::new(2));

        let received = |peer: &RecordingPeer| -> (usize, usize) {
            peer.sent()
                .iter()
                .find_map(|m| match m {
                    ServerMessage::NpcPlayer { moves, attacks } => Some((moves.len(), attacks.len())),
                    _ => None,
                })
                .unwrap()
        };
        assert_eq!(received(&*near), (1, 1));
        assert_eq!(received(&*far), (0, 1));
    }

    #[tokio::test]
    async fn test_zones_tick_independently() {
        let world = world(&[1, 2]);
        let first = world.find_zone(ZoneId::new(1)).unwrap();
        let second = world.find_zone(ZoneId::new(2)).unwrap();
        add_actor(&first, BehaviorClass::Aggressive, 100, TilePosition::new(5, 5), SpeedClass::Tier(0));
        let _here = join(&world, 1, 1, 15, 15).await;
        let elsewhere = join(&world, 2, 2, 5, 6).await;
        elsewhere.clear();

        let mut ticker = ticker(&world, 1, fast_config(), Arc::new(FixedHits(50)));
        for _ in 0..5 {
            ticker.tick(Instant::now()).await.unwrap();
        }

        assert_eq!(first.ticks(), 5);
        assert_eq!(second.ticks(), 0);
        assert_eq!(elsewhere.character().unwrap().lock().hp, 10);
        assert!(elsewhere.sent().is_empty());
    }
}
