//! # Message Schemas
//!
//! Typed views of packet bodies. [`MessageKind`] is the schema registry for
//! client packets: it resolves a (category, action) pair to the one message
//! type that may follow. [`ClientMessage::decode`] reads a body for a kind and
//! [`ServerMessage::to_payload`] writes action, category and body for sending.
//!
//! Positions travel as one-byte numbers, so zones are at most 252 tiles wide.

use bytes::BytesMut;
use realm_core::{ActorIndex, Direction, ItemId, ItemSlot, SessionId, SitState, TilePosition, ZoneId};

use crate::codecs::{PacketReader, PacketWriter};
use crate::error::{ProtocolError, Result};
use crate::packets::{PacketAction, PacketCategory, PacketId};

/// Every client packet the server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    InitRequest,
    ConnectionAccept,
    ConnectionPing,
    LoginRequest,
    TalkReport,
    TalkMessage,
    WalkPlayer,
    FacePlayer,
    SitRequest,
    AttackUse,
    ItemGet,
    RefreshRequest,
}

impl MessageKind {
    pub const ALL: [MessageKind; 12] = [
        Self::InitRequest,
        Self::ConnectionAccept,
        Self::ConnectionPing,
        Self::LoginRequest,
        Self::TalkReport,
        Self::TalkMessage,
        Self::WalkPlayer,
        Self::FacePlayer,
        Self::SitRequest,
        Self::AttackUse,
        Self::ItemGet,
        Self::RefreshRequest,
    ];

    pub fn id(self) -> PacketId {
        use PacketAction as A;
        use PacketCategory as C;
        match self {
            Self::InitRequest => PacketId::new(C::Init, A::Init),
            Self::ConnectionAccept => PacketId::new(C::Connection, A::Accept),
            Self::ConnectionPing => PacketId::new(C::Connection, A::Ping),
            Self::LoginRequest => PacketId::new(C::Login, A::Request),
            Self::TalkReport => PacketId::new(C::Talk, A::Report),
            Self::TalkMessage => PacketId::new(C::Talk, A::Message),
            Self::WalkPlayer => PacketId::new(C::Walk, A::Player),
            Self::FacePlayer => PacketId::new(C::Face, A::Player),
            Self::SitRequest => PacketId::new(C::Sit, A::Request),
            Self::AttackUse => PacketId::new(C::Attack, A::Use),
            Self::ItemGet => PacketId::new(C::Item, A::Get),
            Self::RefreshRequest => PacketId::new(C::Refresh, A::Request),
        }
    }

    /// Look up the schema for a packet id.
    pub fn resolve(id: PacketId) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Kinds accepted before the handshake has been confirmed.
    pub fn is_handshake(self) -> bool {
        matches!(self, Self::InitRequest | Self::ConnectionAccept)
    }
}

/// A decoded client packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    InitRequest {
        challenge: u32,
        version: [u8; 3],
        hdid: String,
    },
    /// Echo of the multipliers and id from the init reply
    ConnectionAccept {
        decode_multiple: u8,
        encode_multiple: u8,
        player_id: SessionId,
    },
    ConnectionPing,
    LoginRequest {
        name: String,
    },
    /// Local chat, heard by the zone
    TalkReport {
        message: String,
    },
    /// Global chat, heard by everyone online
    TalkMessage {
        message: String,
    },
    WalkPlayer {
        direction: Direction,
        timestamp: u32,
        destination: TilePosition,
    },
    FacePlayer {
        direction: Direction,
    },
    SitRequest {
        sit: bool,
    },
    AttackUse {
        direction: Direction,
        timestamp: u32,
    },
    ItemGet {
        slot: ItemSlot,
    },
    RefreshRequest,
}

fn read_direction(reader: &mut PacketReader) -> Result<Direction> {
    let value = reader.get_char()?;
    Direction::from_u8(value as u8)
        .filter(|_| value < 4)
        .ok_or(ProtocolError::InvalidValue { field: "direction", value })
}

fn read_position(reader: &mut PacketReader) -> Result<TilePosition> {
    let x = reader.get_char()? as i32;
    let y = reader.get_char()? as i32;
    Ok(TilePosition::new(x, y))
}

impl ClientMessage {
    /// Deserialize the body that follows the sequence bytes.
    pub fn decode(kind: MessageKind, reader: &mut PacketReader) -> Result<Self> {
        Ok(match kind {
            MessageKind::InitRequest => {
                let challenge = reader.get_three()?;
                let version = [
                    reader.get_char()? as u8,
                    reader.get_char()? as u8,
                    reader.get_char()? as u8,
                ];
                let hdid = reader.get_end_string()?;
                Self::InitRequest { challenge, version, hdid }
            }
            MessageKind::ConnectionAccept => Self::ConnectionAccept {
                decode_multiple: reader.get_short()? as u8,
                encode_multiple: reader.get_short()? as u8,
                player_id: SessionId::new(reader.get_short()? as u16),
            },
            MessageKind::ConnectionPing => Self::ConnectionPing,
            MessageKind::LoginRequest => Self::LoginRequest {
                name: reader.get_break_string()?.to_ascii_lowercase(),
            },
            MessageKind::TalkReport => Self::TalkReport { message: reader.get_end_string()? },
            MessageKind::TalkMessage => Self::TalkMessage { message: reader.get_end_string()? },
            MessageKind::WalkPlayer => Self::WalkPlayer {
                direction: read_direction(reader)?,
                timestamp: reader.get_three()?,
                destination: read_position(reader)?,
            },
            MessageKind::FacePlayer => Self::FacePlayer { direction: read_direction(reader)? },
            MessageKind::SitRequest => {
                let action = reader.get_char()?;
                match action {
                    1 => Self::SitRequest { sit: true },
                    2 => Self::SitRequest { sit: false },
                    value => return Err(ProtocolError::InvalidValue { field: "sit action", value }),
                }
            }
            MessageKind::AttackUse => Self::AttackUse {
                direction: read_direction(reader)?,
                timestamp: reader.get_three()?,
            },
            MessageKind::ItemGet => Self::ItemGet { slot: reader.get_short()? as ItemSlot },
            MessageKind::RefreshRequest => Self::RefreshRequest,
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::InitRequest { .. } => MessageKind::InitRequest,
            Self::ConnectionAccept { .. } => MessageKind::ConnectionAccept,
            Self::ConnectionPing => MessageKind::ConnectionPing,
            Self::LoginRequest { .. } => MessageKind::LoginRequest,
            Self::TalkReport { .. } => MessageKind::TalkReport,
            Self::TalkMessage { .. } => MessageKind::TalkMessage,
            Self::WalkPlayer { .. } => MessageKind::WalkPlayer,
            Self::FacePlayer { .. } => MessageKind::FacePlayer,
            Self::SitRequest { .. } => MessageKind::SitRequest,
            Self::AttackUse { .. } => MessageKind::AttackUse,
            Self::ItemGet { .. } => MessageKind::ItemGet,
            Self::RefreshRequest => MessageKind::RefreshRequest,
        }
    }

    /// Serialize the body as a client would. Used by test clients.
    pub fn encode_body(&self, writer: &mut PacketWriter) {
        match self {
            Self::InitRequest { challenge, version, hdid } => {
                writer.add_three(*challenge);
                for part in version {
                    writer.add_char(*part as u32);
                }
                writer.add_string(hdid);
            }
            Self::ConnectionAccept { decode_multiple, encode_multiple, player_id } => {
                writer
                    .add_short(*decode_multiple as u32)
                    .add_short(*encode_multiple as u32)
                    .add_short(player_id.get() as u32);
            }
            Self::ConnectionPing | Self::RefreshRequest => {}
            Self::LoginRequest { name } => {
                writer.add_break_string(name);
            }
            Self::TalkReport { message } | Self::TalkMessage { message } => {
                writer.add_string(message);
            }
            Self::WalkPlayer { direction, timestamp, destination } => {
                writer
                    .add_char(*direction as u32)
                    .add_three(*timestamp)
                    .add_char(destination.x as u32)
                    .add_char(destination.y as u32);
            }
            Self::FacePlayer { direction } => {
                writer.add_char(*direction as u32);
            }
            Self::SitRequest { sit } => {
                writer.add_char(if *sit { 1 } else { 2 });
            }
            Self::AttackUse { direction, timestamp } => {
                writer.add_char(*direction as u32).add_three(*timestamp);
            }
            Self::ItemGet { slot } => {
                writer.add_short(*slot as u32);
            }
        }
    }
}

/// Public view of a character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterInfo {
    pub name: String,
    pub player_id: SessionId,
    pub zone_id: ZoneId,
    pub position: TilePosition,
    pub direction: Direction,
    pub hp: u32,
    pub max_hp: u32,
    pub tp: u32,
    pub max_tp: u32,
    pub sit_state: SitState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorInfo {
    pub index: ActorIndex,
    pub template_id: u16,
    pub position: TilePosition,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemInfo {
    pub slot: ItemSlot,
    pub item_id: ItemId,
    pub position: TilePosition,
    pub amount: u32,
}

/// Everything a character can see on arrival or refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NearbyInfo {
    pub characters: Vec<CharacterInfo>,
    pub actors: Vec<ActorInfo>,
    pub items: Vec<ItemInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorMove {
    pub index: ActorIndex,
    pub position: TilePosition,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorAttack {
    pub index: ActorIndex,
    pub target: SessionId,
    pub direction: Direction,
    pub damage: u32,
    pub killed: bool,
    /// Remaining target hp as a percentage of max
    pub hp_percentage: u32,
}

/// A packet the server sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake reply; the only packet sent without the cipher.
    InitReply {
        seq1: u32,
        seq2: u32,
        decode_multiple: u8,
        encode_multiple: u8,
        player_id: SessionId,
        challenge_response: u32,
    },
    /// Keep-alive challenge
    ConnectionPlayer { seq1: u32, seq2: u32 },
    LoginReply { character: CharacterInfo, nearby: NearbyInfo },
    /// Login refused (unknown or already online)
    LoginRefused { reason: u8 },
    /// Another character appeared
    PlayersAgree { character: CharacterInfo },
    /// Another character left view
    PlayersRemove { player_id: SessionId },
    AvatarRemove { player_id: SessionId, effect: Option<u8> },
    TalkPlayer { player_id: SessionId, message: String },
    TalkMessage { author: String, message: String },
    WalkPlayer { player_id: SessionId, position: TilePosition, direction: Direction },
    WalkReply { accepted: bool },
    FacePlayer { player_id: SessionId, direction: Direction },
    SitPlayer { player_id: SessionId, position: TilePosition, direction: Direction, sit_state: SitState },
    /// Actor moves and attacks for one tick
    NpcPlayer { moves: Vec<ActorMove>, attacks: Vec<ActorAttack> },
    /// Actors (re)appeared
    NpcAgree { actors: Vec<ActorInfo> },
    /// A character hit an actor
    NpcReply { player_id: SessionId, direction: Direction, index: ActorIndex, damage: u32, hp_percentage: u32 },
    /// A character killed an actor
    NpcSpec {
        player_id: SessionId,
        direction: Direction,
        index: ActorIndex,
        damage: u32,
        drop: Option<ItemInfo>,
        experience: u32,
    },
    /// A character swung at nothing
    AttackPlayer { player_id: SessionId, direction: Direction },
    RecoverPlayer { hp: u32, tp: u32 },
    ItemRemove { slot: ItemSlot },
    ItemGet { slot: ItemSlot, item_id: ItemId, amount: u32 },
    /// The receiving character was moved to another zone or position
    WarpAgree { zone_id: ZoneId, position: TilePosition, effect: Option<u8>, nearby: NearbyInfo },
    RefreshReply { nearby: NearbyInfo },
}

fn write_position(writer: &mut PacketWriter, position: TilePosition) {
    writer.add_char(position.x.max(0) as u32).add_char(position.y.max(0) as u32);
}

fn write_character(writer: &mut PacketWriter, info: &CharacterInfo) {
    writer
        .add_break_string(&info.name)
        .add_short(info.player_id.get() as u32)
        .add_short(info.zone_id.get() as u32);
    write_position(writer, info.position);
    writer
        .add_char(info.direction as u32)
        .add_short(info.hp)
        .add_short(info.max_hp)
        .add_short(info.tp)
        .add_short(info.max_tp)
        .add_char(info.sit_state as u32);
}

fn write_actor(writer: &mut PacketWriter, info: &ActorInfo) {
    writer.add_short(info.index as u32).add_short(info.template_id as u32);
    write_position(writer, info.position);
    writer.add_char(info.direction as u32);
}

fn write_item(writer: &mut PacketWriter, info: &ItemInfo) {
    writer.add_short(info.slot as u32).add_short(info.item_id as u32);
    write_position(writer, info.position);
    writer.add_three(info.amount);
}

fn write_nearby(writer: &mut PacketWriter, nearby: &NearbyInfo) {
    writer.add_short(nearby.characters.len() as u32);
    for character in &nearby.characters {
        write_character(writer, character);
    }
    writer.add_short(nearby.actors.len() as u32);
    for actor in &nearby.actors {
        write_actor(writer, actor);
    }
    writer.add_short(nearby.items.len() as u32);
    for item in &nearby.items {
        write_item(writer, item);
    }
}

impl ServerMessage {
    pub fn id(&self) -> PacketId {
        use PacketAction as A;
        use PacketCategory as C;
        match self {
            Self::InitReply { .. } => PacketId::new(C::Init, A::Init),
            Self::ConnectionPlayer { .. } => PacketId::new(C::Connection, A::Player),
            Self::LoginReply { .. } => PacketId::new(C::Login, A::Reply),
            Self::LoginRefused { .. } => PacketId::new(C::Login, A::Remove),
            Self::PlayersAgree { .. } => PacketId::new(C::Players, A::Agree),
            Self::PlayersRemove { .. } => PacketId::new(C::Players, A::Remove),
            Self::AvatarRemove { .. } => PacketId::new(C::Avatar, A::Remove),
            Self::TalkPlayer { .. } => PacketId::new(C::Talk, A::Player),
            Self::TalkMessage { .. } => PacketId::new(C::Talk, A::Message),
            Self::WalkPlayer { .. } => PacketId::new(C::Walk, A::Player),
            Self::WalkReply { .. } => PacketId::new(C::Walk, A::Reply),
            Self::FacePlayer { .. } => PacketId::new(C::Face, A::Player),
            Self::SitPlayer { .. } => PacketId::new(C::Sit, A::Player),
            Self::NpcPlayer { .. } => PacketId::new(C::Npc, A::Player),
            Self::NpcAgree { .. } => PacketId::new(C::Npc, A::Agree),
            Self::NpcReply { .. } => PacketId::new(C::Npc, A::Reply),
            Self::NpcSpec { .. } => PacketId::new(C::Npc, A::Spec),
            Self::AttackPlayer { .. } => PacketId::new(C::Attack, A::Player),
            Self::RecoverPlayer { .. } => PacketId::new(C::Recover, A::Player),
            Self::ItemRemove { .. } => PacketId::new(C::Item, A::Remove),
            Self::ItemGet { .. } => PacketId::new(C::Item, A::Get),
            Self::WarpAgree { .. } => PacketId::new(C::Warp, A::Agree),
            Self::RefreshReply { .. } => PacketId::new(C::Refresh, A::Reply),
        }
    }

    /// The handshake reply goes out before a cipher exists.
    pub fn is_handshake_reply(&self) -> bool {
        matches!(self, Self::InitReply { .. })
    }

    /// Action byte, category byte, then the body.
    pub fn to_payload(&self) -> BytesMut {
        let id = self.id();
        let mut writer = PacketWriter::new();
        writer.add_byte(id.action.as_u8()).add_byte(id.category.as_u8());
        self.encode_body(&mut writer);
        writer.finish()
    }

    fn encode_body(&self, writer: &mut PacketWriter) {
        match self {
            Self::InitReply { seq1, seq2, decode_multiple, encode_multiple, player_id, challenge_response } => {
                writer
                    .add_char(*seq1)
                    .add_char(*seq2)
                    .add_char(*decode_multiple as u32)
                    .add_char(*encode_multiple as u32)
                    .add_short(player_id.get() as u32)
                    .add_three(*challenge_response);
            }
            Self::ConnectionPlayer { seq1, seq2 } => {
                writer.add_short(*seq1).add_char(*seq2);
            }
            Self::LoginReply { character, nearby } => {
                write_character(writer, character);
                write_nearby(writer, nearby);
            }
            Self::LoginRefused { reason } => {
                writer.add_char(*reason as u32);
            }
            Self::PlayersAgree { character } => write_character(writer, character),
            Self::PlayersRemove { player_id } => {
                writer.add_short(player_id.get() as u32);
            }
            Self::AvatarRemove { player_id, effect } => {
                writer.add_short(player_id.get() as u32);
                if let Some(effect) = effect {
                    writer.add_char(*effect as u32);
                }
            }
            Self::TalkPlayer { player_id, message } => {
                writer.add_short(player_id.get() as u32).add_string(message);
            }
            Self::TalkMessage { author, message } => {
                writer.add_break_string(author).add_string(message);
            }
            Self::WalkPlayer { player_id, position, direction } => {
                writer.add_short(player_id.get() as u32).add_char(*direction as u32);
                write_position(writer, *position);
            }
            Self::WalkReply { accepted } => {
                writer.add_char(*accepted as u32);
            }
            Self::FacePlayer { player_id, direction } => {
                writer.add_short(player_id.get() as u32).add_char(*direction as u32);
            }
            Self::SitPlayer { player_id, position, direction, sit_state } => {
                writer.add_short(player_id.get() as u32);
                write_position(writer, *position);
                writer.add_char(*direction as u32).add_char(*sit_state as u32);
            }
            Self::NpcPlayer { moves, attacks } => {
                writer.add_short(moves.len() as u32);
                for step in moves {
                    writer.add_short(step.index as u32);
                    write_position(writer, step.position);
                    writer.add_char(step.direction as u32);
                }
                writer.add_short(attacks.len() as u32);
                for attack in attacks {
                    writer
                        .add_short(attack.index as u32)
                        .add_char(attack.killed as u32)
                        .add_char(attack.direction as u32)
                        .add_short(attack.target.get() as u32)
                        .add_three(attack.damage)
                        .add_char(attack.hp_percentage);
                }
            }
            Self::NpcAgree { actors } => {
                writer.add_short(actors.len() as u32);
                for actor in actors {
                    write_actor(writer, actor);
                }
            }
            Self::NpcReply { player_id, direction, index, damage, hp_percentage } => {
                writer
                    .add_short(player_id.get() as u32)
                    .add_char(*direction as u32)
                    .add_short(*index as u32)
                    .add_three(*damage)
                    .add_char(*hp_percentage);
            }
            Self::NpcSpec { player_id, direction, index, damage, drop, experience } => {
                writer
                    .add_short(player_id.get() as u32)
                    .add_char(*direction as u32)
                    .add_short(*index as u32)
                    .add_three(*damage)
                    .add_int(*experience);
                if let Some(item) = drop {
                    write_item(writer, item);
                }
            }
            Self::AttackPlayer { player_id, direction } => {
                writer.add_short(player_id.get() as u32).add_char(*direction as u32);
            }
            Self::RecoverPlayer { hp, tp } => {
                writer.add_short(*hp).add_short(*tp);
            }
            Self::ItemRemove { slot } => {
                writer.add_short(*slot as u32);
            }
            Self::ItemGet { slot, item_id, amount } => {
                writer.add_short(*slot as u32).add_short(*item_id as u32).add_three(*amount);
            }
            Self::WarpAgree { zone_id, position, effect, nearby } => {
                writer.add_short(zone_id.get() as u32);
                write_position(writer, *position);
                writer.add_char(effect.unwrap_or(0) as u32);
                write_nearby(writer, nearby);
            }
            Self::RefreshReply { nearby } => write_nearby(writer, nearby),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(message: &ClientMessage) -> ClientMessage {
        let mut writer = PacketWriter::new();
        message.encode_body(&mut writer);
        let mut reader = PacketReader::new(writer.finish().freeze());
        ClientMessage::decode(message.kind(), &mut reader).unwrap()
    }

    #[test]
    fn test_registry_covers_every_kind() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::resolve(kind.id()), Some(kind));
        }
        let unknown = PacketId::new(PacketCategory::Chair, PacketAction::Request);
        assert_eq!(MessageKind::resolve(unknown), None);
    }

    #[test]
    fn test_walk_decodes_destination() {
        let walk = ClientMessage::WalkPlayer {
            direction: Direction::Left,
            timestamp: 123_456,
            destination: TilePosition::new(4, 9),
        };
        assert_eq!(decode(&walk), walk);
    }

    #[test]
    fn test_login_name_is_lowercased() {
        let mut writer = PacketWriter::new();
        writer.add_break_string("Alice");
        let mut reader = PacketReader::new(writer.finish().freeze());
        let message = ClientMessage::decode(MessageKind::LoginRequest, &mut reader).unwrap();
        assert_eq!(message, ClientMessage::LoginRequest { name: "alice".into() });
    }

    #[test]
    fn test_bad_direction_rejected() {
        let mut writer = PacketWriter::new();
        writer.add_char(9);
        let mut reader = PacketReader::new(writer.finish().freeze());
        assert!(matches!(
            ClientMessage::decode(MessageKind::FacePlayer, &mut reader),
            Err(ProtocolError::InvalidValue { field: "direction", value: 9 })
        ));
    }

    #[test]
    fn test_payload_starts_with_action_then_category() {
        let payload = ServerMessage::RecoverPlayer { hp: 10, tp: 5 }.to_payload();
        assert_eq!(payload[0], PacketAction::Player.as_u8());
        assert_eq!(payload[1], PacketCategory::Recover.as_u8());
        let mut reader = PacketReader::new(payload.freeze());
        reader.get_byte().unwrap();
        reader.get_byte().unwrap();
        assert_eq!(reader.get_short().unwrap(), 10);
        assert_eq!(reader.get_short().unwrap(), 5);
    }

    #[test]
    fn test_only_init_reply_skips_cipher() {
        let reply = ServerMessage::InitReply {
            seq1: 1,
            seq2: 2,
            decode_multiple: 6,
            encode_multiple: 7,
            player_id: SessionId::new(1),
            challenge_response: 9,
        };
        assert!(reply.is_handshake_reply());
        assert!(!ServerMessage::ConnectionPlayer { seq1: 1, seq2: 1 }.is_handshake_reply());
    }
}
