use std::sync::Arc;

use anyhow::{Context, Result};
use claims_engine::engine::ClaimEngine;
use claims_engine::world::World;
use claims_server::config::ServerConfig;
use claims_server::dashboard::{self, DashboardState};
use claims_server::event_bus::EffectBus;
use claims_server::persistence::JsonRepository;
use claims_server::player_registry::PlayerRegistry;
use claims_server::service::{ClaimLimits, ClaimService};
use claims_server::{demo, permissions, rules};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = ServerConfig::from_args(&args)?;

    if config.demo {
        return demo::run(config.engine).await;
    }

    tracing::info!("Claims server for world {}", config.world_id);

    let repo = JsonRepository::open(config.claims_file())?;
    let engine = ClaimEngine::load(
        config.engine,
        config.world_id,
        Box::new(repo),
        permissions::standard()?,
        rules::standard()?,
    )
    .context("loading claims")?;
    tracing::info!("{} claims loaded", engine.registry().len());

    // Stand-in terrain until a game server shares its world.
    let world = Arc::new(World::new());
    demo::generate_flat_world(&world, 16);

    let dashboard = Arc::new(DashboardState::new());
    let dash = Arc::clone(&dashboard);
    let dashboard_port = config.dashboard_port;
    tokio::spawn(async move {
        dashboard::server::start(dash, dashboard_port).await;
    });

    let players = Arc::new(PlayerRegistry::new());
    let limits = ClaimLimits {
        claims: config.claim_limit,
        blocks: config.claim_block_limit,
    };
    let service = ClaimService::new(engine, players, world, EffectBus::new(), dashboard, limits);
    let (handle, task) = service.spawn(config.tick);

    tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;
    tracing::info!("Ctrl+C received, shutting down...");

    // Every mutation is already written through; stopping the service is
    // all that is left.
    drop(handle);
    task.await.context("claim service panicked")?;
    Ok(())
}
