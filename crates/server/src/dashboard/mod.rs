//! Status dashboard: service counters and the current claim list.
//!
//!   • Metrics: atomic fetch_add from the service task, never blocks it.
//!   • Claim list: published via `tokio::sync::watch` after each claim
//!     mutation (overwrites the previous value, so a slow reader only ever
//!     sees the latest list).
//!   • The web server runs on its own tokio tasks and never touches the
//!     engine directly.

pub mod metrics;
pub mod server;

use serde::Serialize;
use tokio::sync::watch;

use crate::service::ServerEngine;

pub use metrics::Metrics;

/// Central state shared via `Arc<DashboardState>`.
pub struct DashboardState {
    pub metrics: Metrics,
    claims_tx: watch::Sender<ClaimsSnapshot>,
}

impl DashboardState {
    pub fn new() -> Self {
        let (claims_tx, _) = watch::channel(ClaimsSnapshot::default());
        Self {
            metrics: Metrics::new(),
            claims_tx,
        }
    }

    /// Publish a new claim list. Non-blocking (overwrites previous).
    pub fn publish_claims(&self, snapshot: ClaimsSnapshot) {
        self.claims_tx.send_replace(snapshot);
    }

    pub fn claims(&self) -> ClaimsSnapshot {
        self.claims_tx.borrow().clone()
    }

    /// One receiver per WebSocket client.
    pub fn subscribe_claims(&self) -> watch::Receiver<ClaimsSnapshot> {
        self.claims_tx.subscribe()
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Claim snapshot types ─────────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize)]
pub struct ClaimsSnapshot {
    pub world: String,
    pub claims: Vec<ClaimSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClaimSummary {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub owner_name: Option<String>,
    pub partitions: usize,
    pub blocks: i64,
    pub trusted: usize,
    pub rules: Vec<&'static str>,
}

/// Summarise every claim the engine holds.
pub fn snapshot_claims(engine: &ServerEngine) -> ClaimsSnapshot {
    let registry = engine.registry();
    let claims = registry
        .claims()
        .map(|claim| {
            let mut rules: Vec<&'static str> = engine
                .rules()
                .rules_of(claim.id)
                .into_iter()
                .flatten()
                .filter_map(|kind| engine.rule_graph().identifier_of(*kind))
                .collect();
            rules.sort_unstable();
            ClaimSummary {
                id: claim.id.to_string(),
                name: claim.name.clone(),
                owner: claim.owner.to_string(),
                owner_name: engine.actors().name_of(claim.owner).map(str::to_owned),
                partitions: registry.partitions_of(claim.id).len(),
                blocks: registry.block_count(claim.id),
                trusted: engine.grants().trusted_in(claim.id).len(),
                rules,
            }
        })
        .collect();
    ClaimsSnapshot {
        world: engine.world_id().to_string(),
        claims,
    }
}
