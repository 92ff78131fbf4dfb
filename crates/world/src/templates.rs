//! Static zone and actor templates
//!
//! Loaded once at startup from the data directory:
//! - `actors.json`: a list of [`ActorTemplate`]
//! - `zones/*.json`: one [`ZoneFile`] per zone
//!
//! Terrain rows are strings with one character per tile:
//!
//! | char | tile |
//! |------|------|
//! | `.`  | walkable |
//! | `#`  | wall |
//! | `~`  | water |
//! | `x`  | walkable for characters, blocks actors |

use realm_core::{ActorTemplateId, Direction, ItemId, TilePosition, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, WorldError};

/// Terrain classification of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Walkable,
    Wall,
    Water,
    ActorBoundary,
}

impl TileKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' | ' ' => Some(Self::Walkable),
            '#' => Some(Self::Wall),
            '~' => Some(Self::Water),
            'x' => Some(Self::ActorBoundary),
            _ => None,
        }
    }

    #[inline]
    pub fn walkable_for_character(self) -> bool {
        matches!(self, Self::Walkable | Self::ActorBoundary)
    }

    #[inline]
    pub fn walkable_for_actor(self) -> bool {
        self == Self::Walkable
    }
}

/// How an actor reacts to characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorClass {
    /// Attacks and chases anyone nearby
    Aggressive,
    /// Fights back once attacked
    #[default]
    Passive,
    /// Shopkeeper; never moves, cannot be attacked
    Vendor,
    Other,
}

/// Possible item drop when an actor dies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEntry {
    pub item_id: ItemId,
    pub min_amount: u32,
    pub max_amount: u32,
    /// Chance out of 100
    pub chance: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorTemplate {
    pub id: u16,
    pub name: String,
    pub max_hp: u32,
    #[serde(default)]
    pub accuracy: u32,
    #[serde(default)]
    pub evade: u32,
    #[serde(default)]
    pub armor: u32,
    #[serde(default)]
    pub min_damage: u32,
    #[serde(default)]
    pub max_damage: u32,
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub class: BehaviorClass,
    #[serde(default)]
    pub drop: Option<DropEntry>,
}

impl ActorTemplate {
    pub fn template_id(&self) -> ActorTemplateId {
        ActorTemplateId::new(self.id)
    }

    /// Vendors and `Other` actors never take part in combat.
    pub fn is_attackable(&self) -> bool {
        matches!(self.class, BehaviorClass::Aggressive | BehaviorClass::Passive)
    }
}

/// Actor templates keyed by id
pub type ActorTemplates = HashMap<u16, Arc<ActorTemplate>>;

/// Walking onto `(x, y)` moves the character to `zone` at `(to_x, to_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warp {
    pub x: i32,
    pub y: i32,
    pub zone: u16,
    pub to_x: i32,
    pub to_y: i32,
}

impl Warp {
    pub fn target_zone(&self) -> ZoneId {
        ZoneId::new(self.zone)
    }

    pub fn target_position(&self) -> TilePosition {
        TilePosition::new(self.to_x, self.to_y)
    }
}

fn default_amount() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnEntry {
    pub actor: u16,
    pub x: i32,
    pub y: i32,
    /// Speed class 0..=6, anything higher never acts
    pub speed: u8,
    pub respawn_secs: u32,
    #[serde(default = "default_amount")]
    pub amount: u32,
    /// Actors with a fixed facing never move and always face this way
    #[serde(default)]
    pub fixed_facing: Option<Direction>,
}

impl SpawnEntry {
    pub fn origin(&self) -> TilePosition {
        TilePosition::new(self.x, self.y)
    }
}

/// Zone file as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneFile {
    pub id: u16,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub terrain: Vec<String>,
    #[serde(default)]
    pub warps: Vec<Warp>,
    #[serde(default)]
    pub spawns: Vec<SpawnEntry>,
}

/// Validated, immutable zone template
#[derive(Debug, Clone)]
pub struct ZoneTemplate {
    pub id: ZoneId,
    pub name: String,
    pub width: i32,
    pub height: i32,
    tiles: Vec<TileKind>,
    warps: HashMap<TilePosition, Warp>,
    pub spawns: Vec<SpawnEntry>,
}

impl ZoneTemplate {
    /// Build a template from its on-disk form.
    ///
    /// Rows shorter than `width` are padded with walls; extra rows or
    /// columns, unknown tile characters and out-of-bounds warps or spawns
    /// are rejected.
    pub fn from_file(file: ZoneFile, path: &Path) -> Result<Self> {
        let invalid = |message: String| WorldError::InvalidTemplate { path: path.to_path_buf(), message };

        if file.width <= 0 || file.height <= 0 || file.width > 252 || file.height > 252 {
            return Err(invalid(format!("bad dimensions {}x{}", file.width, file.height)));
        }
        if file.terrain.len() > file.height as usize {
            return Err(invalid(format!("{} terrain rows for height {}", file.terrain.len(), file.height)));
        }

        let width = file.width as usize;
        let mut tiles = vec![TileKind::Wall; width * file.height as usize];
        for (y, row) in file.terrain.iter().enumerate() {
            if row.chars().count() > width {
                return Err(invalid(format!("row {} is wider than {}", y, width)));
            }
            for (x, c) in row.chars().enumerate() {
                tiles[y * width + x] = TileKind::from_char(c)
                    .ok_or_else(|| invalid(format!("unknown tile '{}' at ({}, {})", c, x, y)))?;
            }
        }

        let mut template = Self {
            id: ZoneId::new(file.id),
            name: file.name,
            width: file.width,
            height: file.height,
            tiles,
            warps: HashMap::new(),
            spawns: file.spawns,
        };

        for warp in file.warps {
            let at = TilePosition::new(warp.x, warp.y);
            if !template.in_bounds(at) {
                return Err(invalid(format!("warp at ({}, {}) is outside the zone", warp.x, warp.y)));
            }
            template.warps.insert(at, warp);
        }
        if let Some(spawn) = template.spawns.iter().find(|s| !template.in_bounds(s.origin())) {
            return Err(invalid(format!("spawn at ({}, {}) is outside the zone", spawn.x, spawn.y)));
        }

        Ok(template)
    }

    /// A fully walkable zone without warps or spawns.
    pub fn open(id: ZoneId, width: i32, height: i32) -> Self {
        Self {
            id,
            name: format!("zone{}", id),
            width,
            height,
            tiles: vec![TileKind::Walkable; (width * height).max(0) as usize],
            warps: HashMap::new(),
            spawns: Vec::new(),
        }
    }

    #[inline]
    pub fn in_bounds(&self, pos: TilePosition) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Out-of-bounds positions read as walls.
    pub fn tile(&self, pos: TilePosition) -> TileKind {
        if !self.in_bounds(pos) {
            return TileKind::Wall;
        }
        self.tiles[(pos.y * self.width + pos.x) as usize]
    }

    pub fn set_tile(&mut self, pos: TilePosition, kind: TileKind) {
        if self.in_bounds(pos) {
            self.tiles[(pos.y * self.width + pos.x) as usize] = kind;
        }
    }

    pub fn warp_at(&self, pos: TilePosition) -> Option<&Warp> {
        self.warps.get(&pos)
    }

    pub fn add_warp(&mut self, warp: Warp) {
        self.warps.insert(TilePosition::new(warp.x, warp.y), warp);
    }

    pub fn warps(&self) -> impl Iterator<Item = &Warp> {
        self.warps.values()
    }
}

/// Loads templates from a data directory
pub struct TemplateLoader {
    data_dir: PathBuf,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|source| WorldError::File {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| WorldError::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl TemplateLoader {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self { data_dir: data_dir.into() }
    }

    /// Load `actors.json`
    pub fn load_actors(&self) -> Result<ActorTemplates> {
        let path = self.data_dir.join("actors.json");
        let list: Vec<ActorTemplate> = read_json(&path)?;

        let mut templates = ActorTemplates::with_capacity(list.len());
        for mut template in list {
            if template.max_hp == 0 {
                return Err(WorldError::InvalidTemplate {
                    path: path.clone(),
                    message: format!("actor {} has zero max_hp", template.id),
                });
            }
            template.max_damage = template.max_damage.max(template.min_damage);
            if templates.insert(template.id, Arc::new(template)).is_some() {
                return Err(WorldError::InvalidTemplate {
                    path: path.clone(),
                    message: "duplicate actor id".into(),
                });
            }
        }

        info!("Loaded {} actor templates", templates.len());
        Ok(templates)
    }

    /// Load every `zones/*.json`, ordered by file name.
    ///
    /// Spawns naming an unknown actor are rejected.
    pub fn load_zones(&self, actors: &ActorTemplates) -> Result<Vec<ZoneTemplate>> {
        let dir = self.data_dir.join("zones");
        let entries = fs::read_dir(&dir).map_err(|source| WorldError::File { path: dir.clone(), source })?;

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut zones: Vec<ZoneTemplate> = Vec::with_capacity(paths.len());
        for path in paths {
            let file: ZoneFile = read_json(&path)?;
            let template = ZoneTemplate::from_file(file, &path)?;

            if let Some(spawn) = template.spawns.iter().find(|s| !actors.contains_key(&s.actor)) {
                return Err(WorldError::InvalidTemplate {
                    path,
                    message: format!("spawn references unknown actor {}", spawn.actor),
                });
            }
            if zones.iter().any(|z| z.id == template.id) {
                return Err(WorldError::InvalidTemplate {
                    path,
                    message: format!("duplicate zone id {}", template.id),
                });
            }

            debug!("Loaded zone {} '{}' from {:?}", template.id, template.name, path);
            zones.push(template);
        }

        info!("Loaded {} zone templates", zones.len());
        Ok(zones)
    }
}
