//! State shared by every session task

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use realm_accounts::CharacterStore;
use realm_config::ServerConfig;
use realm_core::{IdPool, TilePosition, ZoneId};
use realm_game::{CombatFormulas, RespawnPoint};
use realm_world::WorldRegistry;
use std::sync::Arc;

use crate::config::NetworkConfig;
use crate::game_handlers;
use crate::handlers::HandlerRegistry;
use crate::session::Session;

/// Everything a handler can reach besides its own session
pub struct ServerContext {
    pub config: ServerConfig,
    pub network: NetworkConfig,
    pub world: Arc<WorldRegistry<Session>>,
    pub handlers: HandlerRegistry,
    pub store: Arc<dyn CharacterStore>,
    pub formulas: Arc<dyn CombatFormulas>,
    /// Session ids; one per live connection
    pub ids: IdPool,
    rng: Mutex<StdRng>,
}

impl ServerContext {
    /// Build a context with the standard handler table.
    ///
    /// # Arguments
    /// * `config` - Server options; the network options are derived from it
    /// * `world` - Registry holding every zone
    /// * `store` - Character persistence
    /// * `formulas` - Combat formulas shared with the zone tickers
    pub fn new(
        config: ServerConfig,
        world: Arc<WorldRegistry<Session>>,
        store: Arc<dyn CharacterStore>,
        formulas: Arc<dyn CombatFormulas>,
    ) -> Self {
        let network = NetworkConfig::from(&config);
        let ids = IdPool::new(network.max_connections.min(u16::MAX as usize) as u16);
        Self {
            config,
            network,
            world,
            handlers: game_handlers::standard_handlers(),
            store,
            formulas,
            ids,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the random source, for reproducible runs.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Borrow the shared random source. Never call across an `.await`.
    pub fn with_rng_mut<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut self.rng.lock())
    }

    pub fn respawn_point(&self) -> RespawnPoint {
        RespawnPoint {
            zone: ZoneId::new(self.config.respawn_zone),
            position: TilePosition::new(self.config.respawn_x, self.config.respawn_y),
        }
    }

    pub fn visibility_range(&self) -> i32 {
        self.config.simulation.visibility_range
    }
}
