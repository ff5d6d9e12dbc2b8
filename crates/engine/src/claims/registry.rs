use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use uuid::Uuid;

use super::claim::{Claim, ClaimId};
use super::partition::{Partition, PartitionId};
use super::store::PartitionStore;
use crate::actors::ActorId;
use crate::error::ClaimError;
use crate::repository::ClaimRepository;
use crate::world::position::Position;

/// Owns the claims of one world and, through the partition store, their
/// shapes.
///
/// Every mutation validates first, writes through to the repository second,
/// and touches memory last. A repository failure therefore leaves the
/// in-memory tables exactly as they were.
#[derive(Default)]
pub struct ClaimRegistry {
    claims: HashMap<ClaimId, Claim>,
    partitions: PartitionStore,
    by_claim: HashMap<ClaimId, IndexSet<PartitionId>>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a registry with the claims of `world_id` and their partitions.
    ///
    /// Partitions whose claim is missing, or that overlap an earlier
    /// partition, mean the stored data is corrupt; loading fails.
    pub fn load(repo: &dyn ClaimRepository, world_id: Uuid) -> Result<Self, ClaimError> {
        let mut registry = Self::new();
        let mut skipped = 0usize;
        let mut elsewhere = HashSet::new();

        for claim in repo.load_claims()? {
            if claim.world_id != world_id {
                elsewhere.insert(claim.id);
                skipped += 1;
                continue;
            }
            registry.by_claim.insert(claim.id, IndexSet::new());
            registry.claims.insert(claim.id, claim);
        }

        let mut foreign = 0usize;
        for partition in repo.load_partitions()? {
            if !registry.claims.contains_key(&partition.claim_id) {
                // Partitions of other worlds' claims are expected; only
                // partitions with no claim anywhere are orphans.
                if elsewhere.contains(&partition.claim_id) {
                    foreign += 1;
                    continue;
                }
                tracing::error!(
                    "Partition {} references missing claim {}",
                    partition.id,
                    partition.claim_id
                );
                return Err(ClaimError::Orphaned {
                    partition: partition.id,
                    claim: partition.claim_id,
                });
            }
            registry.index_partition(partition)?;
        }

        tracing::info!(
            "Loaded {} claims with {} partitions for world {} ({} claims and {} partitions belong to other worlds)",
            registry.claims.len(),
            registry.partitions.len(),
            world_id,
            skipped,
            foreign,
        );
        Ok(registry)
    }

    fn index_partition(&mut self, partition: Partition) -> Result<(), ClaimError> {
        let (id, claim) = (partition.id, partition.claim_id);
        self.partitions.insert(partition)?;
        self.by_claim.entry(claim).or_default().insert(id);
        Ok(())
    }

    pub fn get(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.get(&id)
    }

    pub fn get_mut(&mut self, id: ClaimId) -> Option<&mut Claim> {
        self.claims.get_mut(&id)
    }

    pub fn contains(&self, id: ClaimId) -> bool {
        self.claims.contains_key(&id)
    }

    pub fn add_claim(&mut self, repo: &mut dyn ClaimRepository, claim: Claim) -> Result<(), ClaimError> {
        if self.claims.contains_key(&claim.id) {
            return Err(ClaimError::DuplicateClaim(claim.id));
        }
        repo.insert_claim(&claim)?;
        tracing::debug!("Claim {} created for {}", claim.id, claim.owner);
        self.by_claim.insert(claim.id, IndexSet::new());
        self.claims.insert(claim.id, claim);
        Ok(())
    }

    /// Attach a partition to an existing claim. Overlap with any partition,
    /// of this claim or another, is a conflict.
    pub fn add_partition(
        &mut self,
        repo: &mut dyn ClaimRepository,
        partition: Partition,
    ) -> Result<(), ClaimError> {
        if !self.claims.contains_key(&partition.claim_id) {
            return Err(ClaimError::ClaimNotFound(partition.claim_id));
        }
        self.partitions.check_insert(&partition)?;
        repo.insert_partition(&partition)?;
        self.index_partition(partition)
    }

    /// Remove a single partition. The claim stays, even if this was its last
    /// partition; see [`ClaimRegistry::is_removable`].
    pub fn remove_partition(
        &mut self,
        repo: &mut dyn ClaimRepository,
        id: PartitionId,
    ) -> Result<Partition, ClaimError> {
        let claim = match self.partitions.get(id) {
            Some(partition) => partition.claim_id,
            None => return Err(ClaimError::PartitionNotFound(id)),
        };
        repo.delete_partition(id)?;
        if let Some(ids) = self.by_claim.get_mut(&claim) {
            ids.shift_remove(&id);
        }
        self.partitions
            .remove(id)
            .ok_or(ClaimError::PartitionNotFound(id))
    }

    /// Remove a claim and cascade to every partition it owns.
    pub fn remove_claim(&mut self, repo: &mut dyn ClaimRepository, id: ClaimId) -> Result<Claim, ClaimError> {
        if !self.claims.contains_key(&id) {
            return Err(ClaimError::ClaimNotFound(id));
        }
        repo.delete_claim(id)?;
        for partition in self.by_claim.remove(&id).unwrap_or_default() {
            self.partitions.remove(partition);
        }
        tracing::debug!("Claim {} removed", id);
        self.claims.remove(&id).ok_or(ClaimError::ClaimNotFound(id))
    }

    pub fn partitions_of(&self, id: ClaimId) -> Vec<&Partition> {
        self.by_claim
            .get(&id)
            .map(|ids| ids.iter().filter_map(|p| self.partitions.get(*p)).collect())
            .unwrap_or_default()
    }

    /// A claim with no partitions left has no shape and may be deleted.
    pub fn is_removable(&self, id: ClaimId) -> bool {
        self.by_claim.get(&id).is_none_or(|ids| ids.is_empty())
    }

    /// The claim whose partition contains `pos`.
    pub fn claim_at(&self, pos: &Position) -> Option<&Claim> {
        let partition = self.partitions.find_containing(pos)?;
        self.claims.get(&partition.claim_id)
    }

    pub fn claims_owned_by(&self, owner: ActorId) -> Vec<&Claim> {
        self.claims.values().filter(|c| c.owner == owner).collect()
    }

    /// Total area in blocks covered by a claim's partitions.
    pub fn block_count(&self, id: ClaimId) -> i64 {
        self.partitions_of(id).iter().map(|p| p.area().block_count()).sum()
    }

    pub fn partitions(&self) -> &PartitionStore {
        &self.partitions
    }

    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
