//! realmd - zone game server
//!
//! Loads `serveroptions.txt` (or the path given as the first argument),
//! the actor and zone templates from the data directory, then serves
//! until Ctrl-C.

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use realm_accounts::FileCharacterStore;
use realm_config::{ServerConfig, SPEED_TIERS};
use realm_game::{populate_zone, ActorController, StandardFormulas, ZoneTicker};
use realm_network::{keepalive, RealmServer, ServerContext};
use realm_world::{TemplateLoader, WorldRegistry, Zone};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "serveroptions.txt";

fn load_config(path: &PathBuf) -> anyhow::Result<ServerConfig> {
    if !path.exists() {
        warn!("{} not found, using default configuration", path.display());
        return Ok(ServerConfig::default());
    }
    ServerConfig::load_from_file(path).with_context(|| format!("failed to load {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("realmd starting up");

    let config_path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = load_config(&config_path)?;
    config.display();

    let loader = TemplateLoader::new(config.data_dir.clone());
    let actors = loader.load_actors().context("failed to load actor templates")?;
    let templates = loader.load_zones(&actors).context("failed to load zone templates")?;
    info!("Loaded {} actor templates and {} zones", actors.len(), templates.len());

    let controller = ActorController::new(&config.simulation);
    let mut rng = StdRng::from_entropy();
    let zones: Vec<Zone> = templates
        .into_iter()
        .map(|template| {
            let zone = Zone::new(Arc::new(template));
            let spawned = populate_zone(&zone, &actors, &controller, SPEED_TIERS, &mut rng);
            info!("Zone {}: {} actors", zone.id(), spawned);
            zone
        })
        .collect();

    let world = Arc::new(WorldRegistry::new(zones, config.global_history));
    let store = Arc::new(FileCharacterStore::new(&config.data_dir));
    let formulas = Arc::new(StandardFormulas);
    let ctx = Arc::new(ServerContext::new(config.clone(), world.clone(), store, formulas.clone()));

    let shutdown = CancellationToken::new();
    let mut tasks = Vec::new();
    for zone in world.zones() {
        let ticker = ZoneTicker::new(
            zone.clone(),
            world.clone(),
            config.simulation.clone(),
            formulas.clone(),
            ctx.respawn_point(),
        )
        .with_rng(StdRng::from_rng(&mut rng).context("failed to seed zone random source")?);
        tasks.push(tokio::spawn(ticker.run(shutdown.clone())));
    }
    tasks.push(tokio::spawn(keepalive::run(ctx.clone(), shutdown.clone())));

    let server = RealmServer::bind(ctx.clone()).await.context("failed to start server")?;

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl-C received, shutting down"),
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
            shutdown.cancel();
        });
    }

    let result = server.run(shutdown.clone()).await;
    shutdown.cancel();
    for task in tasks {
        let _ = task.await;
    }

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Server error: {}", e);
            Err(e.into())
        }
    }
}
