//! Claim persistence as a single JSON document.
//!
//! Every mutation rewrites `claims.json` through a temporary file and a
//! rename, so a crash mid-write leaves the previous version intact. The
//! in-memory copy is only updated once the write has landed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use claims_engine::actors::ActorId;
use claims_engine::claims::{Claim, ClaimId, Partition, PartitionId};
use claims_engine::error::RepositoryError;
use claims_engine::repository::{ClaimRepository, DefaultGrantRecord, GrantRecord, RuleRecord};
use claims_engine::world::position::Position;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bumped whenever the document layout changes incompatibly.
const FORMAT_VERSION: u32 = 1;

// ── Document layout ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ClaimsFile {
    version: u32,
    claims: Vec<ClaimEntry>,
    partitions: Vec<PartitionEntry>,
    #[serde(default)]
    grants: Vec<GrantEntry>,
    #[serde(default)]
    default_grants: Vec<DefaultGrantEntry>,
    #[serde(default)]
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct PositionEntry {
    x: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<i64>,
    z: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClaimEntry {
    id: Uuid,
    world: Uuid,
    owner: Uuid,
    /// Milliseconds since the Unix epoch.
    created_at: u64,
    name: String,
    #[serde(default)]
    description: String,
    anchor: PositionEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PartitionEntry {
    id: Uuid,
    claim: Uuid,
    first: PositionEntry,
    second: PositionEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GrantEntry {
    claim: Uuid,
    actor: Uuid,
    permission: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DefaultGrantEntry {
    claim: Uuid,
    permission: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RuleEntry {
    claim: Uuid,
    rule: String,
}

// ── Conversions ──────────────────────────────────────────────────────────

impl From<Position> for PositionEntry {
    fn from(p: Position) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

impl From<PositionEntry> for Position {
    fn from(p: PositionEntry) -> Self {
        Position { x: p.x, y: p.y, z: p.z }
    }
}

fn millis_since_epoch(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

impl From<&Claim> for ClaimEntry {
    fn from(c: &Claim) -> Self {
        Self {
            id: c.id.0,
            world: c.world_id,
            owner: c.owner.0,
            created_at: millis_since_epoch(c.created_at),
            name: c.name.clone(),
            description: c.description.clone(),
            anchor: c.anchor.into(),
        }
    }
}

impl From<&ClaimEntry> for Claim {
    fn from(e: &ClaimEntry) -> Self {
        Claim {
            id: ClaimId(e.id),
            world_id: e.world,
            owner: ActorId(e.owner),
            created_at: UNIX_EPOCH + Duration::from_millis(e.created_at),
            name: e.name.clone(),
            description: e.description.clone(),
            anchor: e.anchor.into(),
        }
    }
}

impl From<&Partition> for PartitionEntry {
    fn from(p: &Partition) -> Self {
        Self {
            id: p.id.0,
            claim: p.claim_id.0,
            first: p.first_corner.into(),
            second: p.second_corner.into(),
        }
    }
}

impl From<&PartitionEntry> for Partition {
    fn from(e: &PartitionEntry) -> Self {
        Partition::with_id(PartitionId(e.id), ClaimId(e.claim), e.first.into(), e.second.into())
    }
}

impl From<&GrantRecord> for GrantEntry {
    fn from(g: &GrantRecord) -> Self {
        Self {
            claim: g.claim.0,
            actor: g.actor.0,
            permission: g.permission.clone(),
        }
    }
}

impl From<&DefaultGrantRecord> for DefaultGrantEntry {
    fn from(g: &DefaultGrantRecord) -> Self {
        Self {
            claim: g.claim.0,
            permission: g.permission.clone(),
        }
    }
}

impl From<&RuleRecord> for RuleEntry {
    fn from(r: &RuleRecord) -> Self {
        Self {
            claim: r.claim.0,
            rule: r.rule.clone(),
        }
    }
}

// ── Repository ───────────────────────────────────────────────────────────

pub struct JsonRepository {
    path: PathBuf,
    data: ClaimsFile,
}

impl JsonRepository {
    /// Open `path`, or start empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            let data: ClaimsFile =
                serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
            anyhow::ensure!(
                data.version == FORMAT_VERSION,
                "{} has format version {}, expected {}",
                path.display(),
                data.version,
                FORMAT_VERSION
            );
            tracing::info!(
                "Loaded {} claims, {} partitions from {}",
                data.claims.len(),
                data.partitions.len(),
                path.display()
            );
            data
        } else {
            tracing::info!("No claim file at {}, starting empty", path.display());
            ClaimsFile {
                version: FORMAT_VERSION,
                ..ClaimsFile::default()
            }
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, data: &ClaimsFile) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(data).context("serializing claims")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    /// Apply `change` to a copy, persist the copy, then adopt it.
    fn commit(&mut self, change: impl FnOnce(&mut ClaimsFile)) -> Result<(), RepositoryError> {
        let mut next = self.data.clone();
        change(&mut next);
        self.write(&next)
            .map_err(|e| RepositoryError::Unavailable(format!("{e:#}")))?;
        self.data = next;
        Ok(())
    }
}

fn upsert<T: PartialEq>(records: &mut Vec<T>, record: T) {
    if !records.contains(&record) {
        records.push(record);
    }
}

impl ClaimRepository for JsonRepository {
    fn load_claims(&self) -> Result<Vec<Claim>, RepositoryError> {
        Ok(self.data.claims.iter().map(Claim::from).collect())
    }

    fn load_partitions(&self) -> Result<Vec<Partition>, RepositoryError> {
        Ok(self.data.partitions.iter().map(Partition::from).collect())
    }

    fn load_grants(&self) -> Result<Vec<GrantRecord>, RepositoryError> {
        Ok(self
            .data
            .grants
            .iter()
            .map(|g| GrantRecord {
                claim: ClaimId(g.claim),
                actor: ActorId(g.actor),
                permission: g.permission.clone(),
            })
            .collect())
    }

    fn load_default_grants(&self) -> Result<Vec<DefaultGrantRecord>, RepositoryError> {
        Ok(self
            .data
            .default_grants
            .iter()
            .map(|g| DefaultGrantRecord {
                claim: ClaimId(g.claim),
                permission: g.permission.clone(),
            })
            .collect())
    }

    fn load_rules(&self) -> Result<Vec<RuleRecord>, RepositoryError> {
        Ok(self
            .data
            .rules
            .iter()
            .map(|r| RuleRecord {
                claim: ClaimId(r.claim),
                rule: r.rule.clone(),
            })
            .collect())
    }

    fn insert_claim(&mut self, claim: &Claim) -> Result<(), RepositoryError> {
        let entry = ClaimEntry::from(claim);
        self.commit(|f| {
            f.claims.retain(|c| c.id != entry.id);
            f.claims.push(entry);
        })
    }

    fn delete_claim(&mut self, id: ClaimId) -> Result<(), RepositoryError> {
        self.commit(|f| {
            f.claims.retain(|c| c.id != id.0);
            f.partitions.retain(|p| p.claim != id.0);
            f.grants.retain(|g| g.claim != id.0);
            f.default_grants.retain(|g| g.claim != id.0);
            f.rules.retain(|r| r.claim != id.0);
        })
    }

    fn insert_partition(&mut self, partition: &Partition) -> Result<(), RepositoryError> {
        let entry = PartitionEntry::from(partition);
        self.commit(|f| {
            f.partitions.retain(|p| p.id != entry.id);
            f.partitions.push(entry);
        })
    }

    fn delete_partition(&mut self, id: PartitionId) -> Result<(), RepositoryError> {
        self.commit(|f| f.partitions.retain(|p| p.id != id.0))
    }

    fn save_grant(&mut self, grant: &GrantRecord) -> Result<(), RepositoryError> {
        let entry = GrantEntry::from(grant);
        self.commit(|f| upsert(&mut f.grants, entry))
    }

    fn delete_grant(&mut self, grant: &GrantRecord) -> Result<(), RepositoryError> {
        let entry = GrantEntry::from(grant);
        self.commit(|f| f.grants.retain(|g| *g != entry))
    }

    fn save_default_grant(&mut self, grant: &DefaultGrantRecord) -> Result<(), RepositoryError> {
        let entry = DefaultGrantEntry::from(grant);
        self.commit(|f| upsert(&mut f.default_grants, entry))
    }

    fn delete_default_grant(&mut self, grant: &DefaultGrantRecord) -> Result<(), RepositoryError> {
        let entry = DefaultGrantEntry::from(grant);
        self.commit(|f| f.default_grants.retain(|g| *g != entry))
    }

    fn save_rule(&mut self, rule: &RuleRecord) -> Result<(), RepositoryError> {
        let entry = RuleEntry::from(rule);
        self.commit(|f| upsert(&mut f.rules, entry))
    }

    fn delete_rule(&mut self, rule: &RuleRecord) -> Result<(), RepositoryError> {
        let entry = RuleEntry::from(rule);
        self.commit(|f| f.rules.retain(|r| *r != entry))
    }
}
