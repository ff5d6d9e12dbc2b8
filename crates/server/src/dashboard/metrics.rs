//! Lock-free claim-service counters.
//!
//! The service task updates these with atomic adds; the dashboard reads
//! them at its own pace.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

use claims_engine::engine::Dispatch;

pub struct Metrics {
    // Monotonic counters
    events_checked: AtomicU64,
    denials: AtomicU64,
    rule_suppressions: AtomicU64,
    overlay_batches: AtomicU64,
    overlay_blocks: AtomicU64,
    claims_created: AtomicU64,
    claims_removed: AtomicU64,

    // Resolution latency histogram buckets
    hist_under_1us: AtomicU64,
    hist_1_10us: AtomicU64,
    hist_10_100us: AtomicU64,
    hist_100us_1ms: AtomicU64,
    hist_over_1ms: AtomicU64,

    // Gauges
    players_connected: AtomicU64,

    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            events_checked: AtomicU64::new(0),
            denials: AtomicU64::new(0),
            rule_suppressions: AtomicU64::new(0),
            overlay_batches: AtomicU64::new(0),
            overlay_blocks: AtomicU64::new(0),
            claims_created: AtomicU64::new(0),
            claims_removed: AtomicU64::new(0),
            hist_under_1us: AtomicU64::new(0),
            hist_1_10us: AtomicU64::new(0),
            hist_10_100us: AtomicU64::new(0),
            hist_100us_1ms: AtomicU64::new(0),
            hist_over_1ms: AtomicU64::new(0),
            players_connected: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Called after every dispatched event.
    pub fn record_dispatch<P, R>(&self, outcome: &Dispatch<P, R>, duration: Duration) {
        self.events_checked.fetch_add(1, Relaxed);
        if outcome.permission.is_denied() {
            self.denials.fetch_add(1, Relaxed);
        }
        if !outcome.rule.is_allowed() {
            self.rule_suppressions.fetch_add(1, Relaxed);
        }

        let bucket = match duration.as_micros() {
            0 => &self.hist_under_1us,
            1..=9 => &self.hist_1_10us,
            10..=99 => &self.hist_10_100us,
            100..=999 => &self.hist_100us_1ms,
            _ => &self.hist_over_1ms,
        };
        bucket.fetch_add(1, Relaxed);
    }

    pub fn record_overlay(&self, blocks: usize) {
        self.overlay_batches.fetch_add(1, Relaxed);
        self.overlay_blocks.fetch_add(blocks as u64, Relaxed);
    }

    pub fn claim_created(&self) {
        self.claims_created.fetch_add(1, Relaxed);
    }

    pub fn claim_removed(&self) {
        self.claims_removed.fetch_add(1, Relaxed);
    }

    pub fn player_joined(&self) {
        self.players_connected.fetch_add(1, Relaxed);
    }

    pub fn player_left(&self) {
        self.players_connected.fetch_sub(1, Relaxed);
    }

    /// Read all counters into a serializable snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            events_checked: self.events_checked.load(Relaxed),
            denials: self.denials.load(Relaxed),
            rule_suppressions: self.rule_suppressions.load(Relaxed),
            overlay_batches: self.overlay_batches.load(Relaxed),
            overlay_blocks: self.overlay_blocks.load(Relaxed),
            claims_created: self.claims_created.load(Relaxed),
            claims_removed: self.claims_removed.load(Relaxed),
            players: self.players_connected.load(Relaxed),
            hist: [
                self.hist_under_1us.load(Relaxed),
                self.hist_1_10us.load(Relaxed),
                self.hist_10_100us.load(Relaxed),
                self.hist_100us_1ms.load(Relaxed),
                self.hist_over_1ms.load(Relaxed),
            ],
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of all metrics at a point in time.
/// Clients compute rates by diffing consecutive snapshots.
#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub events_checked: u64,
    pub denials: u64,
    pub rule_suppressions: u64,
    pub overlay_batches: u64,
    pub overlay_blocks: u64,
    pub claims_created: u64,
    pub claims_removed: u64,
    pub players: u64,
    /// `[<1μs, 1-10μs, 10-100μs, 100μs-1ms, >1ms]`
    pub hist: [u64; 5],
}
