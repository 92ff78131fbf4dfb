//! # Realm World
//!
//! Zone templates, live zones and the registry that ties zones to
//! connected sessions.
//!
//! - [`templates`]: static zone and actor definitions loaded from JSON
//! - [`zone`]: occupants, actors and dropped items of one live area
//! - [`registry`]: every zone and session, global chat, zone transitions
//! - [`peer`]: the world's view of a connection
//!
//! Connections depend on this crate, never the other way round; the
//! network session plugs in through [`Peer`].

pub mod actor;
pub mod broadcast;
pub mod character;
pub mod error;
pub mod item;
pub mod opponents;
pub mod peer;
pub mod registry;
pub mod templates;
pub mod zone;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use actor::{Actor, BehaviorState, DamageOutcome, SpawnPoint, SpeedClass};
pub use broadcast::{fan_out, fan_out_each};
pub use character::Character;
pub use error::{Result, WorldError};
pub use item::{DroppedItem, PickupRefusal};
pub use opponents::{Opponent, Opponents};
pub use peer::Peer;
pub use registry::{GlobalMessage, WorldRegistry};
pub use templates::{
    ActorTemplate, ActorTemplates, BehaviorClass, DropEntry, SpawnEntry, TemplateLoader, TileKind, Warp, ZoneTemplate,
};
pub use zone::{Occupant, Zone, PICKUP_RANGE};
