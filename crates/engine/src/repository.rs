//! The persistence collaborator.
//!
//! The engine seeds itself from a repository at startup and writes every
//! successful mutation through to it. Permission and rule kinds cross this
//! boundary as their string identifiers, so storage never depends on the
//! game layer's enumerations.

use indexmap::IndexMap;

use crate::actors::ActorId;
use crate::claims::{Claim, ClaimId, Partition, PartitionId};
use crate::error::RepositoryError;

/// A per-actor trust grant inside one claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrantRecord {
    pub claim: ClaimId,
    pub actor: ActorId,
    pub permission: String,
}

/// A permission every actor without a personal grant receives in a claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefaultGrantRecord {
    pub claim: ClaimId,
    pub permission: String,
}

/// A rule a claim has switched on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleRecord {
    pub claim: ClaimId,
    pub rule: String,
}

pub trait ClaimRepository: Send {
    fn load_claims(&self) -> Result<Vec<Claim>, RepositoryError>;
    fn load_partitions(&self) -> Result<Vec<Partition>, RepositoryError>;
    fn load_grants(&self) -> Result<Vec<GrantRecord>, RepositoryError>;
    fn load_default_grants(&self) -> Result<Vec<DefaultGrantRecord>, RepositoryError>;
    fn load_rules(&self) -> Result<Vec<RuleRecord>, RepositoryError>;

    fn insert_claim(&mut self, claim: &Claim) -> Result<(), RepositoryError>;
    /// Removes the claim together with every partition, grant and rule
    /// record that references it, atomically.
    fn delete_claim(&mut self, id: ClaimId) -> Result<(), RepositoryError>;
    fn insert_partition(&mut self, partition: &Partition) -> Result<(), RepositoryError>;
    fn delete_partition(&mut self, id: PartitionId) -> Result<(), RepositoryError>;

    fn save_grant(&mut self, grant: &GrantRecord) -> Result<(), RepositoryError>;
    fn delete_grant(&mut self, grant: &GrantRecord) -> Result<(), RepositoryError>;
    fn save_default_grant(&mut self, grant: &DefaultGrantRecord) -> Result<(), RepositoryError>;
    fn delete_default_grant(&mut self, grant: &DefaultGrantRecord) -> Result<(), RepositoryError>;
    fn save_rule(&mut self, rule: &RuleRecord) -> Result<(), RepositoryError>;
    fn delete_rule(&mut self, rule: &RuleRecord) -> Result<(), RepositoryError>;
}

/// A repository held entirely in memory.
///
/// Used by tests and the demo. `fail_writes` makes every mutating call fail,
/// for exercising the no-partial-update guarantee.
#[derive(Default, Clone)]
pub struct MemoryRepository {
    pub claims: IndexMap<ClaimId, Claim>,
    pub partitions: IndexMap<PartitionId, Partition>,
    pub grants: Vec<GrantRecord>,
    pub default_grants: Vec<DefaultGrantRecord>,
    pub rules: Vec<RuleRecord>,
    pub fail_writes: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes {
            Err(RepositoryError::Unavailable("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

fn upsert<T: PartialEq + Clone>(records: &mut Vec<T>, record: &T) {
    if !records.contains(record) {
        records.push(record.clone());
    }
}

impl ClaimRepository for MemoryRepository {
    fn load_claims(&self) -> Result<Vec<Claim>, RepositoryError> {
        Ok(self.claims.values().cloned().collect())
    }

    fn load_partitions(&self) -> Result<Vec<Partition>, RepositoryError> {
        Ok(self.partitions.values().cloned().collect())
    }

    fn load_grants(&self) -> Result<Vec<GrantRecord>, RepositoryError> {
        Ok(self.grants.clone())
    }

    fn load_default_grants(&self) -> Result<Vec<DefaultGrantRecord>, RepositoryError> {
        Ok(self.default_grants.clone())
    }

    fn load_rules(&self) -> Result<Vec<RuleRecord>, RepositoryError> {
        Ok(self.rules.clone())
    }

    fn insert_claim(&mut self, claim: &Claim) -> Result<(), RepositoryError> {
        self.writable()?;
        self.claims.insert(claim.id, claim.clone());
        Ok(())
    }

    fn delete_claim(&mut self, id: ClaimId) -> Result<(), RepositoryError> {
        self.writable()?;
        self.claims.shift_remove(&id);
        self.partitions.retain(|_, p| p.claim_id != id);
        self.grants.retain(|g| g.claim != id);
        self.default_grants.retain(|g| g.claim != id);
        self.rules.retain(|r| r.claim != id);
        Ok(())
    }

    fn insert_partition(&mut self, partition: &Partition) -> Result<(), RepositoryError> {
        self.writable()?;
        self.partitions.insert(partition.id, partition.clone());
        Ok(())
    }

    fn delete_partition(&mut self, id: PartitionId) -> Result<(), RepositoryError> {
        self.writable()?;
        self.partitions.shift_remove(&id);
        Ok(())
    }

    fn save_grant(&mut self, grant: &GrantRecord) -> Result<(), RepositoryError> {
        self.writable()?;
        upsert(&mut self.grants, grant);
        Ok(())
    }

    fn delete_grant(&mut self, grant: &GrantRecord) -> Result<(), RepositoryError> {
        self.writable()?;
        self.grants.retain(|g| g != grant);
        Ok(())
    }

    fn save_default_grant(&mut self, grant: &DefaultGrantRecord) -> Result<(), RepositoryError> {
        self.writable()?;
        upsert(&mut self.default_grants, grant);
        Ok(())
    }

    fn delete_default_grant(&mut self, grant: &DefaultGrantRecord) -> Result<(), RepositoryError> {
        self.writable()?;
        self.default_grants.retain(|g| g != grant);
        Ok(())
    }

    fn save_rule(&mut self, rule: &RuleRecord) -> Result<(), RepositoryError> {
        self.writable()?;
        upsert(&mut self.rules, rule);
        Ok(())
    }

    fn delete_rule(&mut self, rule: &RuleRecord) -> Result<(), RepositoryError> {
        self.writable()?;
        self.rules.retain(|r| r != rule);
        Ok(())
    }
}
