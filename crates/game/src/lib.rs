//! # Realm Game Logic Layer
//!
//! The simulation that runs inside each zone.
//!
//! ## Modules
//!
//! - `formulas` - Hit, damage and recovery formulas
//! - `controller` - Per-actor decisions over a zone snapshot
//! - `populate` - Initial actor spawning from zone templates
//! - `ticker` - The per-zone tick loop

pub mod controller;
pub mod formulas;
pub mod populate;
pub mod ticker;

// Re-export commonly used types
pub use controller::{ActorController, AttackDecision, CharacterView, MoveDecision, ZoneView};
pub use formulas::{CombatFormulas, CombatStats, StandardFormulas};
pub use populate::populate_zone;
pub use ticker::{RespawnPoint, TickReport, ZoneTicker};
