//! Client-effect bus from the claim service to player connections.
//!
//! The claim service publishes an [`EffectBatch`] for every player it has
//! something to show: border overlays after a tick, denial messages after a
//! vetoed action. Connections subscribe to the shared `tokio::sync::broadcast`
//! channel and forward the batches addressed to their own player.

use std::sync::Arc;

use azalea_chat::FormattedText;
use claims_engine::access::{DenialNotice, Notifier};
use claims_engine::actors::ActorId;
use claims_engine::visualiser::OverlayInstruction;
use claims_engine::world::block::BlockId;
use claims_engine::world::position::BlockPos;
use tokio::sync::broadcast;

/// Recommended capacity for the broadcast channel.
/// 256 batches in flight should handle bursty activity without lagging.
pub const BUS_CAPACITY: usize = 256;

/// Something one client should see or be told.
#[derive(Clone, Debug)]
pub enum ClientEffect {
    /// Fake block changes: only this client sees them.
    BlockOverlay(Arc<[(BlockPos, BlockId)]>),
    /// Text above the hotbar.
    ActionBar(FormattedText),
}

/// Effects for one player.
///
/// Uses `Arc<[...]>` so cloning per broadcast subscriber is just a refcount bump.
#[derive(Clone, Debug)]
pub struct EffectBatch {
    pub target: ActorId,
    pub effects: Arc<[ClientEffect]>,
}

#[derive(Clone)]
pub struct EffectBus {
    tx: broadcast::Sender<EffectBatch>,
}

impl EffectBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EffectBatch> {
        self.tx.subscribe()
    }

    /// Best-effort: with no connection listening the batch is dropped.
    pub fn publish(&self, target: ActorId, effects: Vec<ClientEffect>) {
        if effects.is_empty() {
            return;
        }
        let _ = self.tx.send(EffectBatch {
            target,
            effects: effects.into(),
        });
    }

    pub fn publish_overlay(&self, target: ActorId, instructions: &[OverlayInstruction]) {
        let blocks: Arc<[(BlockPos, BlockId)]> = instructions.iter().map(|i| (i.pos, i.block)).collect();
        self.publish(target, vec![ClientEffect::BlockOverlay(blocks)]);
    }
}

impl Default for EffectBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for EffectBus {
    fn deny(&mut self, notice: DenialNotice) {
        self.publish(
            notice.actor,
            vec![ClientEffect::ActionBar(FormattedText::from(notice.message()))],
        );
    }
}
