//! Character file loading and saving

use super::{
    error::{AccountError, Result},
    record::CharacterRecord,
    CharacterStore,
};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAGIC: &str = "RLCHR001";
const DEFAULT_CHARACTER: &str = "defaultcharacter";

/// File-backed character store
///
/// # Purpose
/// Loads and saves character records as text files.
///
/// # File Format
/// Characters are stored in `characters/NAME.txt`:
/// ```text
/// RLCHR001
/// NAME alice
/// ZONE 1
/// X 10
/// Y 12
/// HP 18
/// ITEM 1 250
/// ... (more fields)
/// ```
pub struct FileCharacterStore {
    /// Base directory for character files
    characters_dir: PathBuf,
}

impl FileCharacterStore {
    /// Create a new character store
    ///
    /// # Arguments
    /// * `data_dir` - Server data directory (contains `characters/`)
    pub fn new(data_dir: &Path) -> Self {
        Self {
            characters_dir: data_dir.join("characters"),
        }
    }

    /// Names are file stems, so only ASCII letters, digits and `_` are allowed.
    fn validate_name(name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name.len() <= 16
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(AccountError::InvalidName(name.to_string()))
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.characters_dir.join(format!("{}.txt", name.to_ascii_lowercase()))
    }

    /// Parse a character file
    fn parse_file(&self, path: &Path) -> Result<CharacterRecord> {
        let content = fs::read_to_string(path)?;

        let first_line = content
            .lines()
            .next()
            .ok_or_else(|| AccountError::InvalidFormat("Empty file".to_string()))?;

        if first_line.trim() != MAGIC {
            return Err(AccountError::InvalidFormat(format!(
                "Invalid magic header: {}",
                first_line
            )));
        }

        let mut record = CharacterRecord::default();
        for line in content.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            parse_field(&mut record, key.trim(), value.trim());
        }

        record.hp = record.hp.min(record.max_hp);
        record.tp = record.tp.min(record.max_tp);
        Ok(record)
    }

    fn render(record: &CharacterRecord) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", MAGIC);
        let _ = writeln!(out, "NAME {}", record.name);
        let _ = writeln!(out, "ZONE {}", record.zone);
        let _ = writeln!(out, "X {}", record.x);
        let _ = writeln!(out, "Y {}", record.y);
        let _ = writeln!(out, "DIR {}", record.direction);
        let _ = writeln!(out, "HP {}", record.hp);
        let _ = writeln!(out, "MAXHP {}", record.max_hp);
        let _ = writeln!(out, "TP {}", record.tp);
        let _ = writeln!(out, "MAXTP {}", record.max_tp);
        let _ = writeln!(out, "ACCURACY {}", record.accuracy);
        let _ = writeln!(out, "EVADE {}", record.evade);
        let _ = writeln!(out, "ARMOR {}", record.armor);
        let _ = writeln!(out, "MINDAMAGE {}", record.min_damage);
        let _ = writeln!(out, "MAXDAMAGE {}", record.max_damage);
        let _ = writeln!(out, "EXP {}", record.experience);
        for (item, amount) in &record.inventory {
            let _ = writeln!(out, "ITEM {} {}", item, amount);
        }
        for (key, value) in &record.extra {
            let _ = writeln!(out, "{} {}", key, value);
        }
        out
    }
}

/// Parse a single character field
fn parse_field(record: &mut CharacterRecord, key: &str, value: &str) {
    match key {
        "NAME" => record.name = value.to_ascii_lowercase(),
        "ZONE" => record.zone = value.parse().unwrap_or(record.zone),
        "X" => record.x = value.parse().unwrap_or(record.x),
        "Y" => record.y = value.parse().unwrap_or(record.y),
        "DIR" => record.direction = value.parse().unwrap_or(record.direction),
        "HP" => record.hp = value.parse().unwrap_or(record.hp),
        "MAXHP" => record.max_hp = value.parse().unwrap_or(record.max_hp),
        "TP" => record.tp = value.parse().unwrap_or(record.tp),
        "MAXTP" => record.max_tp = value.parse().unwrap_or(record.max_tp),
        "ACCURACY" => record.accuracy = value.parse().unwrap_or(record.accuracy),
        "EVADE" => record.evade = value.parse().unwrap_or(record.evade),
        "ARMOR" => record.armor = value.parse().unwrap_or(record.armor),
        "MINDAMAGE" => record.min_damage = value.parse().unwrap_or(record.min_damage),
        "MAXDAMAGE" => record.max_damage = value.parse().unwrap_or(record.max_damage),
        "EXP" => record.experience = value.parse().unwrap_or(record.experience),
        "ITEM" => {
            // Repeated; "ITEM <id> <amount>"
            let mut parts = value.split_whitespace();
            let id = parts.next().and_then(|s| s.parse::<u16>().ok());
            let amount = parts.next().and_then(|s| s.parse::<u32>().ok());
            match (id, amount) {
                (Some(id), Some(amount)) => {
                    *record.inventory.entry(id).or_insert(0) += amount;
                }
                _ => warn!("Ignoring malformed ITEM line: {}", value),
            }
        }
        _ => {
            record.extra.insert(key.to_string(), value.to_string());
        }
    }
}

impl CharacterStore for FileCharacterStore {
    /// Load a character by name
    ///
    /// # Behavior
    /// 1. Reads `characters/NAME.txt` (name lowercased)
    /// 2. If missing, uses `characters/defaultcharacter.txt` renamed to NAME
    /// 3. If neither exists, returns [`AccountError::NotFound`]
    fn load(&self, name: &str) -> Result<CharacterRecord> {
        Self::validate_name(name)?;
        debug!("Loading character: {}", name);

        let path = self.path_for(name);
        if path.exists() {
            let mut record = self.parse_file(&path)?;
            if record.name.is_empty() {
                record.name = name.to_ascii_lowercase();
            }
            return Ok(record);
        }

        let default_path = self.path_for(DEFAULT_CHARACTER);
        if default_path.exists() {
            debug!("Character '{}' not found, using default character", name);
            let mut record = self.parse_file(&default_path)?;
            record.name = name.to_ascii_lowercase();
            return Ok(record);
        }

        Err(AccountError::NotFound(name.to_string()))
    }

    /// Write the record to `characters/NAME.txt`, replacing any previous file.
    fn save(&self, record: &CharacterRecord) -> Result<()> {
        Self::validate_name(&record.name)?;
        fs::create_dir_all(&self.characters_dir)?;

        let path = self.path_for(&record.name);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, Self::render(record))?;
        fs::rename(&tmp, &path)?;

        debug!("Saved character: {} to {:?}", record.name, path);
        Ok(())
    }
}
