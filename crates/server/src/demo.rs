//! Flat test world and a scripted walkthrough of the claim service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use azalea_registry::builtin::ItemKind;
use claims_engine::actors::ActorId;
use claims_engine::config::EngineConfig;
use claims_engine::engine::ClaimEngine;
use claims_engine::repository::MemoryRepository;
use claims_engine::world::World;
use claims_engine::world::chunk::Chunk;
use claims_engine::world::position::{BlockPos, ChunkPos, Position};
use uuid::Uuid;

use crate::block;
use crate::dashboard::DashboardState;
use crate::event::{EventKind, GameEvent};
use crate::event_bus::{ClientEffect, EffectBus};
use crate::permissions::{self, PermissionKind};
use crate::player_registry::{CLAIM_TOOL, PlayerInfo, PlayerRegistry, offline_uuid};
use crate::rules;
use crate::service::{ClaimLimits, ClaimService};

/// Surface layer of the flat world; players stand one above it.
pub const SURFACE_Y: i64 = 64;

/// Bedrock at y=60, stone y=61-63, grass at y=64.
pub fn generate_flat_world(world: &World, chunk_radius: i32) {
    for cx in -chunk_radius..chunk_radius {
        for cz in -chunk_radius..chunk_radius {
            let mut chunk = Chunk::new();
            chunk.fill_layer(60, block::BEDROCK);
            for y in 61..=63 {
                chunk.fill_layer(y, block::STONE);
            }
            chunk.fill_layer(SURFACE_Y, block::GRASS_BLOCK);
            world.insert_chunk(ChunkPos::new(cx, cz), chunk);
        }
    }
}

/// Two players, one claim: denial, trust, rules, and the border overlay.
pub async fn run(engine_config: EngineConfig) -> Result<()> {
    tracing::info!("Claims demo");

    let world = Arc::new(World::new());
    generate_flat_world(&world, 4);
    tracing::info!("World ready: {} chunks loaded", world.chunk_count());

    let engine = ClaimEngine::load(
        engine_config,
        Uuid::new_v3(&Uuid::NAMESPACE_URL, b"world:demo"),
        Box::new(MemoryRepository::new()),
        permissions::standard()?,
        rules::standard()?,
    )?;
    let players = Arc::new(PlayerRegistry::new());
    let bus = EffectBus::new();
    let mut effects = bus.subscribe();
    let dashboard = Arc::new(DashboardState::new());
    let service = ClaimService::new(
        engine,
        Arc::clone(&players),
        Arc::clone(&world),
        bus,
        Arc::clone(&dashboard),
        ClaimLimits::default(),
    );
    let (handle, task) = service.spawn(Duration::from_millis(50));

    let alice = ActorId(offline_uuid("Alice"));
    let bob = ActorId(offline_uuid("Bob"));
    players.register(PlayerInfo::new(alice, "Alice", 5.5, 65.0, 5.5));
    players.register(PlayerInfo::new(bob, "Bob", 20.5, 65.0, 5.5));

    let farm = handle
        .create_claim(alice, "Alice's farm", Position::flat(0, 0), Position::flat(15, 15))
        .await?;
    tracing::info!("Alice claimed {}", farm);

    let dirt_at = BlockPos::new(5, SURFACE_Y, 5);
    let wheat = block::by_name("wheat").context("wheat missing from the block registry")?;
    world.set_block(BlockPos::new(6, SURFACE_Y + 1, 6), wheat);

    let dig = GameEvent::by_player(EventKind::BlockBreak, bob, dirt_at).with_block(block::GRASS_BLOCK);
    let resolved = handle.dispatch(dig.clone()).await?;
    tracing::info!("Bob digs in the farm: cancelled={}", resolved.cancelled());
    while let Ok(batch) = effects.try_recv() {
        for effect in batch.effects.iter() {
            if let ClientEffect::ActionBar(text) = effect {
                tracing::info!("  -> {}: {}", batch.target, text);
            }
        }
    }

    handle.grant(farm, bob, PermissionKind::Harvest).await?;
    let harvest = GameEvent::by_player(EventKind::BlockBreak, bob, BlockPos::new(6, SURFACE_Y + 1, 6)).with_block(wheat);
    let resolved = handle.dispatch(harvest).await?;
    tracing::info!("Bob harvests wheat with harvest trust: cancelled={}", resolved.cancelled());
    let resolved = handle.dispatch(dig).await?;
    tracing::info!("Bob digs again with harvest trust: cancelled={}", resolved.cancelled());

    let blast = GameEvent::environmental(
        EventKind::Explosion,
        [BlockPos::new(14, SURFACE_Y, 3), BlockPos::new(17, SURFACE_Y, 3)],
    );
    let resolved = handle.dispatch(blast).await?;
    tracing::info!("Creeper at the fence: {:?}", resolved.outcome.rule);

    let push = GameEvent::environmental(EventKind::PistonPush, [BlockPos::new(3, SURFACE_Y + 1, 3)]);
    let resolved = handle.dispatch(push).await?;
    tracing::info!("Piston inside the farm: cancelled={}", resolved.cancelled());

    players.update_held(alice, CLAIM_TOOL, ItemKind::Air);
    handle.tick().await?;
    while let Ok(batch) = effects.try_recv() {
        for effect in batch.effects.iter() {
            if let ClientEffect::BlockOverlay(blocks) = effect {
                tracing::info!("Border overlay for {}: {} blocks", batch.target, blocks.len());
            }
        }
    }

    let snap = dashboard.metrics.snapshot();
    tracing::info!(
        "Checked {} events: {} denied, {} suppressed by rules",
        snap.events_checked,
        snap.denials,
        snap.rule_suppressions
    );

    drop(handle);
    task.await.context("claim service panicked")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_world_layers() {
        let world = World::new();
        generate_flat_world(&world, 1);
        assert_eq!(world.chunk_count(), 4);
        assert!(world.has_chunk(ChunkPos::new(-1, -1)));
        assert!(!world.has_chunk(ChunkPos::new(1, 0)));

        let column = |y| world.get_block(BlockPos::new(-7, y, 3));
        assert_eq!(column(60), block::BEDROCK);
        assert_eq!(column(62), block::STONE);
        assert_eq!(column(SURFACE_Y), block::GRASS_BLOCK);
        assert_eq!(column(SURFACE_Y + 1), block::AIR);
    }
}
