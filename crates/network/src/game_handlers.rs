//! # Game Message Handlers
//!
//! The standard handler for every [`MessageKind`].
//!
//! Handlers keep character and actor locks inside plain blocks so no guard
//! lives across an `.await`, and never hold both at once.

use parking_lot::Mutex;
use rand::Rng;
use realm_accounts::AccountError;
use realm_core::{RealmError, Result, SitState};
use realm_game::CombatStats;
use realm_protocol::{handshake, ClientMessage, MessageKind, ServerMessage};
use realm_world::{Character, DropEntry, Peer, PickupRefusal, Zone};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::context::ServerContext;
use crate::handlers::HandlerRegistry;
use crate::session::Session;

/// Login refused: no such character
pub const LOGIN_UNKNOWN: u8 = 1;
/// Login refused: the character is already online
pub const LOGIN_ONLINE: u8 = 2;

/// Effect shown when walking through a warp
pub const WARP_EFFECT: u8 = 1;

/// Global chat lines replayed to a character that just logged in
pub const GLOBAL_BACKLOG: usize = 5;

/// Build the handler table used by the server.
pub fn standard_handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register_function(MessageKind::InitRequest, handle_init);
    registry.register_function(MessageKind::ConnectionAccept, handle_accept);
    registry.register_function(MessageKind::ConnectionPing, handle_ping);
    registry.register_function(MessageKind::LoginRequest, handle_login);
    registry.register_function(MessageKind::TalkReport, handle_talk_report);
    registry.register_function(MessageKind::TalkMessage, handle_talk_message);
    registry.register_function(MessageKind::WalkPlayer, handle_walk);
    registry.register_function(MessageKind::FacePlayer, handle_face);
    registry.register_function(MessageKind::SitRequest, handle_sit);
    registry.register_function(MessageKind::AttackUse, handle_attack);
    registry.register_function(MessageKind::ItemGet, handle_item_get);
    registry.register_function(MessageKind::RefreshRequest, handle_refresh);
    registry
}

/// The session's character and the zone it stands in.
fn located(ctx: &ServerContext, session: &Session) -> Option<(Arc<Mutex<Character>>, Arc<Zone>)> {
    let character = session.character()?;
    let zone = ctx.world.find_zone(session.zone()?)?;
    Some((character, zone))
}

// ========== Handshake ==========

async fn handle_init(ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::InitRequest { challenge, version, hdid } = message else {
        return Ok(());
    };
    debug!(
        "Session {} init: version {}.{}.{}, hdid {}",
        session.id(),
        version[0],
        version[1],
        version[2],
        hdid
    );

    let (decode_multiple, encode_multiple, start) = ctx.with_rng_mut(|rng| {
        let (decode, encode) = handshake::generate_multiples(rng);
        (decode, encode, handshake::generate_sequence_start(rng))
    });
    session.begin_handshake(decode_multiple, encode_multiple, start)?;

    let (seq1, seq2) = handshake::init_sequence_bytes(start);
    session
        .send_message(&ServerMessage::InitReply {
            seq1,
            seq2,
            decode_multiple,
            encode_multiple,
            player_id: session.id(),
            challenge_response: handshake::challenge_response(challenge),
        })
        .await
}

async fn handle_accept(_ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::ConnectionAccept { decode_multiple, encode_multiple, player_id } = message else {
        return Ok(());
    };
    session.confirm_handshake(decode_multiple, encode_multiple, player_id)
}

async fn handle_ping(_ctx: Arc<ServerContext>, session: Arc<Session>, _message: ClientMessage) -> Result<()> {
    trace!("Session {} answered keep-alive", session.id());
    session.keepalive_answered();
    Ok(())
}

// ========== Login ==========

async fn handle_login(ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::LoginRequest { name } = message else {
        return Ok(());
    };
    if session.character().is_some() {
        warn!("Session {} sent a second login", session.id());
        return Ok(());
    }
    if ctx.world.is_character_online(&name) {
        info!("Session {} refused: {} is already online", session.id(), name);
        return session.send_message(&ServerMessage::LoginRefused { reason: LOGIN_ONLINE }).await;
    }

    let store = ctx.store.clone();
    let lookup = name.clone();
    let loaded = tokio::task::spawn_blocking(move || store.load(&lookup))
        .await
        .map_err(|e| RealmError::HandlerFault(format!("character load task failed: {}", e)))?;
    let record = match loaded {
        Ok(record) => record,
        Err(AccountError::NotFound(_) | AccountError::InvalidName(_)) => {
            info!("Session {} refused: unknown character {}", session.id(), name);
            return session.send_message(&ServerMessage::LoginRefused { reason: LOGIN_UNKNOWN }).await;
        }
        Err(e) => return Err(e.into()),
    };

    let mut character = Character::from_record(record, session.id());
    let zone = match ctx.world.find_zone(character.zone) {
        Some(zone) => zone,
        None => {
            let respawn = ctx.respawn_point();
            warn!(
                "Session {} character {} saved in unknown zone {}, moving to zone {}",
                session.id(),
                character.name,
                character.zone,
                respawn.zone
            );
            character.zone = respawn.zone;
            character.position = respawn.position;
            ctx.world
                .find_zone(respawn.zone)
                .ok_or_else(|| RealmError::ZoneInconsistency(format!("respawn zone {} missing", respawn.zone)))?
        }
    };

    let info = character.info();
    let character = Arc::new(Mutex::new(character));
    session.set_character(character.clone());

    let nearby = zone.nearby(info.position, ctx.visibility_range());
    session
        .send_message(&ServerMessage::LoginReply { character: info.clone(), nearby })
        .await?;
    for line in ctx.world.recent_global_messages(GLOBAL_BACKLOG) {
        session
            .send_message(&ServerMessage::TalkMessage { author: line.author, message: line.message })
            .await?;
    }

    zone.enter(session.clone(), character, None).await;
    info!("Session {} logged in as {} in zone {}", session.id(), info.name, info.zone_id);
    Ok(())
}

// ========== Chat ==========

async fn handle_talk_report(ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::TalkReport { message } = message else {
        return Ok(());
    };
    let Some((_, zone)) = located(&ctx, &session) else {
        return Ok(());
    };
    if message.trim().is_empty() {
        return Ok(());
    }
    let talk = ServerMessage::TalkPlayer { player_id: session.id(), message };
    zone.broadcast(&talk, Some(session.id())).await;
    Ok(())
}

async fn handle_talk_message(ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::TalkMessage { message } = message else {
        return Ok(());
    };
    let Some(character) = session.character() else {
        return Ok(());
    };
    if message.trim().is_empty() {
        return Ok(());
    }
    let author = character.lock().name.clone();
    let line = ctx.world.add_global_message(&author, &message);
    ctx.world
        .broadcast_all(
            &ServerMessage::TalkMessage { author: line.author, message: line.message },
            Some(session.id()),
        )
        .await;
    Ok(())
}

// ========== Movement ==========

async fn handle_walk(ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::WalkPlayer { direction, destination, .. } = message else {
        return Ok(());
    };
    let Some((character, zone)) = located(&ctx, &session) else {
        return Ok(());
    };

    let target = {
        let character = character.lock();
        if character.is_dead() || character.sit_state.is_sitting() {
            None
        } else {
            Some(character.position.step(direction))
        }
    };
    let target = match target {
        Some(target) if target == destination && zone.is_open_for_character(target) => target,
        _ => {
            debug!("Session {} walk {:?} to ({}, {}) refused", session.id(), direction, destination.x, destination.y);
            return session.send_message(&ServerMessage::WalkReply { accepted: false }).await;
        }
    };

    if let Some(warp) = zone.warp_at(target) {
        let destination = warp.target_position();
        let arrived = ctx
            .world
            .transition(&session, warp.target_zone(), destination, Some(WARP_EFFECT))
            .await
            .map_err(RealmError::from)?;
        let nearby = arrived.nearby(destination, ctx.visibility_range());
        return session
            .send_message(&ServerMessage::WarpAgree {
                zone_id: arrived.id(),
                position: destination,
                effect: Some(WARP_EFFECT),
                nearby,
            })
            .await;
    }

    {
        let mut character = character.lock();
        character.position = target;
        character.direction = direction;
    }
    let walk = ServerMessage::WalkPlayer { player_id: session.id(), position: target, direction };
    zone.broadcast_near(target, ctx.visibility_range(), &walk, Some(session.id())).await;
    session.send_message(&ServerMessage::WalkReply { accepted: true }).await
}

async fn handle_face(ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::FacePlayer { direction } = message else {
        return Ok(());
    };
    let Some((character, zone)) = located(&ctx, &session) else {
        return Ok(());
    };
    let position = {
        let mut character = character.lock();
        character.direction = direction;
        character.position
    };
    let face = ServerMessage::FacePlayer { player_id: session.id(), direction };
    zone.broadcast_near(position, ctx.visibility_range(), &face, Some(session.id())).await;
    Ok(())
}

async fn handle_sit(ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::SitRequest { sit } = message else {
        return Ok(());
    };
    let Some((character, zone)) = located(&ctx, &session) else {
        return Ok(());
    };
    let wanted = if sit { SitState::Floor } else { SitState::Standing };
    let update = {
        let mut character = character.lock();
        if character.sit_state == wanted || character.is_dead() {
            None
        } else {
            character.sit_state = wanted;
            Some((character.position, character.direction))
        }
    };
    let Some((position, direction)) = update else {
        return Ok(());
    };
    let message = ServerMessage::SitPlayer { player_id: session.id(), position, direction, sit_state: wanted };
    zone.broadcast_near(position, ctx.visibility_range(), &message, None).await;
    Ok(())
}

// ========== Combat ==========

/// Roll an actor's drop: `Some((item, amount))` if it happens.
fn roll_drop<R: Rng + ?Sized>(entry: &DropEntry, rng: &mut R) -> Option<(realm_core::ItemId, u32)> {
    if rng.gen_range(0..100) >= entry.chance {
        return None;
    }
    let low = entry.min_amount.max(1);
    let high = entry.max_amount.max(low);
    Some((entry.item_id, rng.gen_range(low..=high)))
}

async fn handle_attack(ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::AttackUse { direction, .. } = message else {
        return Ok(());
    };
    let Some((character, zone)) = located(&ctx, &session) else {
        return Ok(());
    };
    let attacker = {
        let mut character = character.lock();
        if character.is_dead() || character.sit_state.is_sitting() {
            return Ok(());
        }
        character.direction = direction;
        (character.position, CombatStats::from(&*character))
    };
    let (origin, stats) = attacker;
    let range = ctx.visibility_range();
    let target = origin.step(direction);

    let hit = zone.actor_at(target).and_then(|index| zone.actor(index)).and_then(|actor| {
        let mut actor = actor.lock();
        if actor.is_dead() || !actor.template.is_attackable() {
            return None;
        }
        let defender = CombatStats::from(actor.template.as_ref());
        let flanked = actor.direction != direction.opposite();
        let damage = ctx.with_rng_mut(|rng| ctx.formulas.resolve_attack(&stats, &defender, flanked, rng));
        let outcome = actor.take_damage(session.id(), damage, Instant::now());
        Some((actor.index, outcome, actor.hp_percentage(), actor.template.clone()))
    });

    let Some((index, outcome, hp_percentage, template)) = hit else {
        let swing = ServerMessage::AttackPlayer { player_id: session.id(), direction };
        zone.broadcast_near(origin, range, &swing, Some(session.id())).await;
        return Ok(());
    };

    if !outcome.killed {
        let reply = ServerMessage::NpcReply {
            player_id: session.id(),
            direction,
            index,
            damage: outcome.dealt,
            hp_percentage,
        };
        zone.broadcast_near(origin, range, &reply, None).await;
        return Ok(());
    }

    let drop = template
        .drop
        .as_ref()
        .and_then(|entry| ctx.with_rng_mut(|rng| roll_drop(entry, rng)))
        .map(|(item_id, amount)| {
            zone.drop_item(item_id, amount, target, Some(session.id()), ctx.config.simulation.drop_protection_ticks)
                .info()
        });
    {
        let mut character = character.lock();
        character.experience = character.experience.saturating_add(template.experience);
    }
    info!("Session {} killed actor {} ({}) in zone {}", session.id(), index, template.name, zone.id());

    let spec = ServerMessage::NpcSpec {
        player_id: session.id(),
        direction,
        index,
        damage: outcome.dealt,
        drop,
        experience: template.experience,
    };
    zone.broadcast_near(origin, range, &spec, None).await;
    Ok(())
}

// ========== Items ==========

async fn handle_item_get(ctx: Arc<ServerContext>, session: Arc<Session>, message: ClientMessage) -> Result<()> {
    let ClientMessage::ItemGet { slot } = message else {
        return Ok(());
    };
    let Some((character, zone)) = located(&ctx, &session) else {
        return Ok(());
    };
    let position = character.lock().position;

    let item = match zone.pickup(slot, session.id(), position) {
        Ok(item) => item,
        Err(PickupRefusal::Missing) => {
            debug!("Session {} tried to take missing item {}", session.id(), slot);
            return Ok(());
        }
        Err(refusal) => {
            debug!("Session {} pickup of item {} refused: {:?}", session.id(), slot, refusal);
            return Ok(());
        }
    };

    let total = character.lock().add_item(item.item_id, item.amount);
    session
        .send_message(&ServerMessage::ItemGet { slot, item_id: item.item_id, amount: total })
        .await?;
    zone.broadcast(&ServerMessage::ItemRemove { slot }, Some(session.id())).await;
    Ok(())
}

async fn handle_refresh(ctx: Arc<ServerContext>, session: Arc<Session>, _message: ClientMessage) -> Result<()> {
    let Some((character, zone)) = located(&ctx, &session) else {
        return Ok(());
    };
    let position = character.lock().position;
    let nearby = zone.nearby(position, ctx.visibility_range());
    session.send_message(&ServerMessage::RefreshReply { nearby }).await
}
