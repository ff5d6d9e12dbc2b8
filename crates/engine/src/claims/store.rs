use std::collections::HashMap;

use indexmap::IndexSet;

use super::claim::ClaimId;
use super::partition::{Partition, PartitionId};
use crate::error::ClaimError;
use crate::world::area::Area;
use crate::world::position::{ChunkPos, Position};

/// Owns every partition and indexes each one under every chunk its
/// rectangle touches.
///
/// Invariant: no two stored partitions overlap. `insert` enforces it, and
/// point queries rely on it by returning the first containing candidate.
/// Chunk buckets keep insertion order so lookups are deterministic.
#[derive(Default)]
pub struct PartitionStore {
    partitions: HashMap<PartitionId, Partition>,
    chunks: HashMap<ChunkPos, IndexSet<PartitionId>>,
}

impl PartitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a partition under its full chunk footprint.
    ///
    /// Fails without touching the store if the id is taken or the rectangle
    /// overlaps an indexed partition. Only the candidate chunks are scanned.
    pub fn insert(&mut self, partition: Partition) -> Result<(), ClaimError> {
        self.check_insert(&partition)?;
        for chunk in partition.area().chunks() {
            self.chunks.entry(chunk).or_default().insert(partition.id);
        }
        self.partitions.insert(partition.id, partition);
        Ok(())
    }

    /// Everything `insert` would reject, without mutating.
    pub fn check_insert(&self, partition: &Partition) -> Result<(), ClaimError> {
        if self.partitions.contains_key(&partition.id) {
            return Err(ClaimError::DuplicatePartition(partition.id));
        }
        if let Some(existing) = self.overlapping(partition.area()) {
            return Err(ClaimError::Conflict {
                partition: partition.id,
                existing: existing.id,
                existing_claim: existing.claim_id,
            });
        }
        Ok(())
    }

    pub fn remove(&mut self, id: PartitionId) -> Option<Partition> {
        let partition = self.partitions.remove(&id)?;
        for chunk in partition.area().chunks() {
            if let Some(bucket) = self.chunks.get_mut(&chunk) {
                bucket.shift_remove(&id);
                if bucket.is_empty() {
                    self.chunks.remove(&chunk);
                }
            }
        }
        Some(partition)
    }

    pub fn get(&self, id: PartitionId) -> Option<&Partition> {
        self.partitions.get(&id)
    }

    /// The partition containing `pos`, if any.
    pub fn find_containing(&self, pos: &Position) -> Option<&Partition> {
        self.chunks
            .get(&pos.chunk())?
            .iter()
            .filter_map(|id| self.partitions.get(id))
            .find(|partition| partition.contains(pos))
    }

    /// Every partition indexed under one chunk.
    pub fn find_in_chunk(&self, chunk: ChunkPos) -> Vec<&Partition> {
        match self.chunks.get(&chunk) {
            Some(bucket) => bucket.iter().filter_map(|id| self.partitions.get(id)).collect(),
            None => Vec::new(),
        }
    }

    /// Partitions indexed under any of `chunks`, each once, in first-seen order.
    pub fn find_in_chunks(&self, chunks: impl IntoIterator<Item = ChunkPos>) -> Vec<&Partition> {
        let mut seen: IndexSet<PartitionId> = IndexSet::new();
        for chunk in chunks {
            if let Some(bucket) = self.chunks.get(&chunk) {
                seen.extend(bucket.iter().copied());
            }
        }
        seen.iter().filter_map(|id| self.partitions.get(id)).collect()
    }

    /// The first indexed partition sharing a cell with `area`.
    pub fn overlapping(&self, area: &Area) -> Option<&Partition> {
        area.chunks()
            .filter_map(|chunk| self.chunks.get(&chunk))
            .flat_map(|bucket| bucket.iter())
            .filter_map(|id| self.partitions.get(id))
            .find(|candidate| candidate.area().overlaps(area))
    }

    /// Distinct claims owning any of `positions`, in first-seen order.
    pub fn claims_at<'a>(&self, positions: impl IntoIterator<Item = &'a Position>) -> IndexSet<ClaimId> {
        positions
            .into_iter()
            .filter_map(|pos| self.find_containing(pos))
            .map(|partition| partition.claim_id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.values()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Number of non-empty chunk buckets.
    pub fn indexed_chunk_count(&self) -> usize {
        self.chunks.len()
    }
}
