//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session ID (16-bit unsigned). Doubles as the player id on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u16);

impl SessionId {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl From<u16> for SessionId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zone ID (16-bit unsigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u16);

impl ZoneId {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl From<u16> for ZoneId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Actor template ID (index into the static actor table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorTemplateId(pub u16);

impl ActorTemplateId {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

/// Slot of a live actor inside its zone. Stable for the zone's lifetime.
pub type ActorIndex = u16;

/// Per-zone unique slot number of a dropped item
pub type ItemSlot = u16;

/// Item template ID
pub type ItemId = u16;

/// How a character is seated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SitState {
    #[default]
    Standing = 0,
    Chair = 1,
    Floor = 2,
}

impl SitState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Standing),
            1 => Some(Self::Chair),
            2 => Some(Self::Floor),
            _ => None,
        }
    }

    pub fn is_sitting(self) -> bool {
        self != Self::Standing
    }
}

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, nothing received yet
    Unestablished,
    /// Handshake reply sent, waiting for the client to confirm
    Handshaking,
    /// Handshake confirmed; all message kinds are routed
    Active,
    /// Receive loop finished and cleanup ran
    Closed,
}
