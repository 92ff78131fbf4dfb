//! # Realm Packet Identifiers
//!
//! Every payload starts with two raw bytes: the action, then the category.
//! The pair selects the message schema (see [`crate::messages::MessageKind`]).
//!
//! Categories group messages by feature (walking, talking, actors, ...) and
//! actions say what happens within that feature. The same action value is
//! reused across categories, so neither byte is meaningful on its own.

use std::fmt;
use std::str::FromStr;

/// Feature group of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketCategory {
    /// Handshake confirmation and keep-alive
    Connection = 1,
    Account = 2,
    Character = 3,
    /// Character selection and entering the world
    Login = 4,
    Welcome = 5,
    Walk = 6,
    Face = 7,
    Chair = 8,
    Emote = 9,
    Attack = 11,
    Item = 14,
    /// Server-wide chat
    Global = 17,
    /// Local and global talk
    Talk = 18,
    Warp = 19,
    /// Other characters appearing and leaving
    Players = 22,
    Avatar = 23,
    Refresh = 25,
    /// Non-player actors
    Npc = 26,
    Sit = 41,
    Recover = 42,
    /// First packet of the handshake. Carries no sequence value.
    Init = 255,
}

impl PacketCategory {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Self::Connection,
            2 => Self::Account,
            3 => Self::Character,
            4 => Self::Login,
            5 => Self::Welcome,
            6 => Self::Walk,
            7 => Self::Face,
            8 => Self::Chair,
            9 => Self::Emote,
            11 => Self::Attack,
            14 => Self::Item,
            17 => Self::Global,
            18 => Self::Talk,
            19 => Self::Warp,
            22 => Self::Players,
            23 => Self::Avatar,
            25 => Self::Refresh,
            26 => Self::Npc,
            41 => Self::Sit,
            42 => Self::Recover,
            255 => Self::Init,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Connection => "Connection",
            Self::Account => "Account",
            Self::Character => "Character",
            Self::Login => "Login",
            Self::Welcome => "Welcome",
            Self::Walk => "Walk",
            Self::Face => "Face",
            Self::Chair => "Chair",
            Self::Emote => "Emote",
            Self::Attack => "Attack",
            Self::Item => "Item",
            Self::Global => "Global",
            Self::Talk => "Talk",
            Self::Warp => "Warp",
            Self::Players => "Players",
            Self::Avatar => "Avatar",
            Self::Refresh => "Refresh",
            Self::Npc => "Npc",
            Self::Sit => "Sit",
            Self::Recover => "Recover",
            Self::Init => "Init",
        }
    }

    const ALL: [PacketCategory; 21] = [
        Self::Connection,
        Self::Account,
        Self::Character,
        Self::Login,
        Self::Welcome,
        Self::Walk,
        Self::Face,
        Self::Chair,
        Self::Emote,
        Self::Attack,
        Self::Item,
        Self::Global,
        Self::Talk,
        Self::Warp,
        Self::Players,
        Self::Avatar,
        Self::Refresh,
        Self::Npc,
        Self::Sit,
        Self::Recover,
        Self::Init,
    ];
}

impl fmt::Display for PacketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PacketCategory {
    type Err = String;

    /// Case-insensitive name lookup, used by the rate limit configuration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown packet category '{}'", s))
    }
}

/// What happens within a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketAction {
    Request = 1,
    Accept = 2,
    Reply = 3,
    Remove = 4,
    Agree = 5,
    Create = 6,
    Add = 7,
    Player = 8,
    Take = 9,
    Use = 10,
    Buy = 11,
    Sell = 12,
    Open = 13,
    Close = 14,
    Message = 15,
    Spec = 16,
    Admin = 17,
    List = 18,
    Tell = 20,
    Report = 21,
    Announce = 22,
    Server = 23,
    Drop = 24,
    Junk = 25,
    Obtain = 26,
    Get = 27,
    Kick = 28,
    Rank = 29,
    TargetSelf = 30,
    TargetOther = 31,
    TargetGroup = 33,
    Dialog = 34,
    Ping = 240,
    Pong = 241,
    Net242 = 242,
    Net243 = 243,
    Net244 = 244,
    Error = 250,
    Init = 255,
}

impl PacketAction {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Self::Request,
            2 => Self::Accept,
            3 => Self::Reply,
            4 => Self::Remove,
            5 => Self::Agree,
            6 => Self::Create,
            7 => Self::Add,
            8 => Self::Player,
            9 => Self::Take,
            10 => Self::Use,
            11 => Self::Buy,
            12 => Self::Sell,
            13 => Self::Open,
            14 => Self::Close,
            15 => Self::Message,
            16 => Self::Spec,
            17 => Self::Admin,
            18 => Self::List,
            20 => Self::Tell,
            21 => Self::Report,
            22 => Self::Announce,
            23 => Self::Server,
            24 => Self::Drop,
            25 => Self::Junk,
            26 => Self::Obtain,
            27 => Self::Get,
            28 => Self::Kick,
            29 => Self::Rank,
            30 => Self::TargetSelf,
            31 => Self::TargetOther,
            33 => Self::TargetGroup,
            34 => Self::Dialog,
            240 => Self::Ping,
            241 => Self::Pong,
            242 => Self::Net242,
            243 => Self::Net243,
            244 => Self::Net244,
            250 => Self::Error,
            255 => Self::Init,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    const ALL: [PacketAction; 39] = [
        Self::Request,
        Self::Accept,
        Self::Reply,
        Self::Remove,
        Self::Agree,
        Self::Create,
        Self::Add,
        Self::Player,
        Self::Take,
        Self::Use,
        Self::Buy,
        Self::Sell,
        Self::Open,
        Self::Close,
        Self::Message,
        Self::Spec,
        Self::Admin,
        Self::List,
        Self::Tell,
        Self::Report,
        Self::Announce,
        Self::Server,
        Self::Drop,
        Self::Junk,
        Self::Obtain,
        Self::Get,
        Self::Kick,
        Self::Rank,
        Self::TargetSelf,
        Self::TargetOther,
        Self::TargetGroup,
        Self::Dialog,
        Self::Ping,
        Self::Pong,
        Self::Net242,
        Self::Net243,
        Self::Net244,
        Self::Error,
        Self::Init,
    ];
}

impl fmt::Display for PacketAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for PacketAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| format!("{:?}", a).eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown packet action '{}'", s))
    }
}

/// The (category, action) pair identifying a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketId {
    pub category: PacketCategory,
    pub action: PacketAction,
}

impl PacketId {
    pub const fn new(category: PacketCategory, action: PacketAction) -> Self {
        Self { category, action }
    }

    /// The very first client packet, which carries no sequence value.
    pub fn is_initial_handshake(&self) -> bool {
        self.category == PacketCategory::Init && self.action == PacketAction::Init
    }

    /// Keep-alive answer; reseeds the sequence instead of being compared.
    pub fn is_keepalive_response(&self) -> bool {
        self.category == PacketCategory::Connection && self.action == PacketAction::Ping
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.action)
    }
}
