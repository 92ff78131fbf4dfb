//! # Realm Character Persistence
//!
//! The persistence collaborator: load and save character records by name.
//!
//! ## Features
//!
//! - [`CharacterStore`] trait used by login and logout handling
//! - [`FileCharacterStore`] reading `characters/NAME.txt` files
//! - Default character fallback for new names
//!
//! ## Usage
//!
//! ```rust,no_run
//! use realm_accounts::{CharacterStore, FileCharacterStore};
//! use std::path::Path;
//!
//! let store = FileCharacterStore::new(Path::new("data"));
//! let record = store.load("alice").unwrap();
//! println!("{} is in zone {}", record.name, record.zone);
//! ```

mod error;
mod loader;
mod record;

pub use error::{AccountError, Result};
pub use loader::FileCharacterStore;
pub use record::CharacterRecord;

/// Load/save of character records by name.
///
/// Implementations do blocking I/O; async callers wrap them in
/// `tokio::task::spawn_blocking`.
pub trait CharacterStore: Send + Sync {
    fn load(&self, name: &str) -> Result<CharacterRecord>;

    fn save(&self, record: &CharacterRecord) -> Result<()>;
}
