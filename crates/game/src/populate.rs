//! Initial actor population of a zone

use rand::Rng;
use realm_world::{Actor, ActorTemplates, SpawnPoint, Zone};
use tracing::{debug, warn};

use crate::controller::{ActorController, ZoneView};

/// Spawn every actor listed in the zone's template.
///
/// # Arguments
/// * `zone` - Freshly built zone, normally without actors
/// * `templates` - Actor templates keyed by id
/// * `speed_tiers` - Number of regular speed classes
///
/// # Returns
/// Number of actors added
pub fn populate_zone<R: Rng + ?Sized>(
    zone: &Zone,
    templates: &ActorTemplates,
    controller: &ActorController,
    speed_tiers: usize,
    rng: &mut R,
) -> usize {
    let mut view = ZoneView::capture(zone);
    let mut added = 0;

    for entry in &zone.template().spawns {
        let Some(template) = templates.get(&entry.actor) else {
            warn!("Zone {} spawns unknown actor {}", zone.id(), entry.actor);
            continue;
        };
        let spawn = SpawnPoint::from_entry(entry, speed_tiers);

        for _ in 0..entry.amount {
            let position = controller.spawn_position(&spawn, &view, rng);
            let direction = controller.spawn_direction(&spawn, rng);
            let behavior = controller.choose_behavior(template, &spawn, rng);
            view.place_actor(position);
            zone.add_actor(|index| Actor::new(index, template.clone(), spawn, position, direction, behavior));
            added += 1;
        }
    }

    debug!("Zone {} populated with {} actors", zone.id(), added);
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use realm_config::{SimulationConfig, SPEED_TIERS};
    use realm_core::{Direction, TilePosition, ZoneId};
    use realm_world::{ActorTemplate, BehaviorClass, BehaviorState, SpawnEntry, ZoneTemplate};
    use std::sync::Arc;

    fn templates() -> ActorTemplates {
        let rat = ActorTemplate {
            id: 3,
            name: "rat".into(),
            max_hp: 10,
            accuracy: 1,
            evade: 1,
            armor: 0,
            min_damage: 1,
            max_damage: 2,
            experience: 5,
            class: BehaviorClass::Passive,
            drop: None,
        };
        let mut map = ActorTemplates::new();
        map.insert(rat.id, Arc::new(rat));
        map
    }

    fn spawn(actor: u16, x: i32, y: i32, amount: u32, fixed_facing: Option<Direction>) -> SpawnEntry {
        SpawnEntry { actor, x, y, speed: 2, respawn_secs: 30, amount, fixed_facing }
    }

    #[test]
    fn test_populates_amounts_and_skips_unknown() {
        let mut template = ZoneTemplate::open(ZoneId::new(1), 20, 20);
        template.spawns.push(spawn(3, 10, 10, 4, None));
        template.spawns.push(spawn(99, 2, 2, 1, None));
        template.spawns.push(spawn(3, 1, 1, 1, Some(Direction::Right)));
        let zone = Zone::new(Arc::new(template));

        let controller = ActorController::new(&SimulationConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        let added = populate_zone(&zone, &templates(), &controller, SPEED_TIERS, &mut rng);

        assert_eq!(added, 5);
        assert_eq!(zone.actor_count(), 5);

        let fixed = zone.actor(4).unwrap();
        let fixed = fixed.lock();
        assert_eq!(fixed.position, TilePosition::new(1, 1));
        assert_eq!(fixed.direction, Direction::Right);
        assert_eq!(fixed.behavior, BehaviorState::Stationary);
    }

    #[test]
    fn test_spawned_actors_do_not_stack_when_space_allows() {
        let mut template = ZoneTemplate::open(ZoneId::new(1), 30, 30);
        template.spawns.push(spawn(3, 15, 15, 6, None));
        let zone = Zone::new(Arc::new(template));

        let controller = ActorController::new(&SimulationConfig::default());
        let mut rng = StdRng::seed_from_u64(9);
        populate_zone(&zone, &templates(), &controller, SPEED_TIERS, &mut rng);

        let mut positions: Vec<_> = zone.actor_infos().into_iter().map(|a| a.position).collect();
        positions.sort_by_key(|p| (p.x, p.y));
        positions.dedup();
        assert_eq!(positions.len(), 6);
    }
}
