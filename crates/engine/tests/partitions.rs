//! Spatial index and claim registry behaviour, driven through the public
//! API with an in-memory repository.

mod common;

use claims_engine::claims::{Claim, ClaimId, ClaimRegistry, Partition, PartitionStore};
use claims_engine::error::ClaimError;
use claims_engine::repository::{ClaimRepository, GrantRecord, MemoryRepository};
use claims_engine::world::position::{ChunkPos, Position};
use claims_engine::actors::ActorId;
use common::WORLD;
use uuid::Uuid;

fn rect(claim: ClaimId, x1: i64, z1: i64, x2: i64, z2: i64) -> Partition {
    Partition::new(claim, Position::flat(x1, z1), Position::flat(x2, z2))
}

// ---------------------------------------------------------------------------
// PartitionStore
// ---------------------------------------------------------------------------

#[test]
fn find_containing_matches_brute_force_over_a_grid() {
    let mut store = PartitionStore::new();
    let claim = ClaimId::random();
    let parts = vec![
        rect(claim, -40, -40, -17, -1),
        rect(claim, -16, -16, 15, 15),
        rect(claim, 16, -3, 16, 30),
        rect(claim, 20, 20, 47, 21),
        // Corners given in "wrong" order are normalised.
        rect(claim, 5, 40, -5, 33),
    ];
    for part in &parts {
        store.insert(part.clone()).unwrap();
    }

    for x in -48..=48 {
        for z in -48..=48 {
            let pos = Position::flat(x, z);
            let expected = parts.iter().find(|p| p.area().contains(x, z)).map(|p| p.id);
            let found = store.find_containing(&pos).map(|p| p.id);
            assert_eq!(found, expected, "mismatch at ({x}, {z})");
        }
    }
}

#[test]
fn overlapping_insert_conflicts_and_changes_nothing() {
    let mut store = PartitionStore::new();
    let (a, b) = (ClaimId::random(), ClaimId::random());
    let first = rect(a, 0, 0, 20, 20);
    let first_id = first.id;
    store.insert(first).unwrap();
    let chunks_before = store.indexed_chunk_count();

    // Shares exactly one corner cell.
    let clash = rect(b, 20, 20, 40, 40);
    match store.insert(clash) {
        Err(ClaimError::Conflict { existing, existing_claim, .. }) => {
            assert_eq!(existing, first_id);
            assert_eq!(existing_claim, a);
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    assert_eq!(store.len(), 1);
    assert_eq!(store.indexed_chunk_count(), chunks_before);
    assert!(store.find_in_chunk(ChunkPos::new(2, 2)).is_empty());
    assert!(store.find_containing(&Position::flat(30, 30)).is_none());

    // Touching edges without sharing a cell is fine.
    store.insert(rect(b, 21, 0, 40, 20)).unwrap();
    assert_eq!(store.len(), 2);
}

#[test]
fn thin_partition_spanning_chunks_is_found_everywhere() {
    let mut store = PartitionStore::new();
    let part = rect(ClaimId::random(), -33, 7, 33, 7);
    let id = part.id;
    store.insert(part).unwrap();

    assert_eq!(store.indexed_chunk_count(), 6);
    for x in [-33, -17, -1, 0, 16, 33] {
        assert_eq!(store.find_containing(&Position::flat(x, 7)).map(|p| p.id), Some(id));
    }
    assert!(store.find_containing(&Position::flat(0, 8)).is_none());
}

// ---------------------------------------------------------------------------
// ClaimRegistry
// ---------------------------------------------------------------------------

#[test]
fn registry_writes_through_and_cascades() {
    let mut repo = MemoryRepository::new();
    let mut registry = ClaimRegistry::new();
    let owner = ActorId::random();

    let claim = Claim::new(WORLD, owner, Position::flat(0, 0)).named("farm");
    let id = claim.id;
    registry.add_claim(&mut repo, claim).unwrap();
    registry.add_partition(&mut repo, rect(id, 0, 0, 9, 9)).unwrap();
    registry.add_partition(&mut repo, rect(id, 10, 0, 19, 9)).unwrap();
    repo.save_grant(&GrantRecord {
        claim: id,
        actor: ActorId::random(),
        permission: "build".into(),
    })
    .unwrap();

    assert_eq!(repo.partitions.len(), 2);
    assert_eq!(registry.partitions_of(id).len(), 2);
    assert_eq!(registry.block_count(id), 200);
    assert_eq!(registry.claim_at(&Position::flat(15, 5)).map(|c| c.id), Some(id));
    assert_eq!(registry.claims_owned_by(owner).len(), 1);

    let removed = registry.remove_claim(&mut repo, id).unwrap();
    assert_eq!(removed.name, "farm");
    assert!(registry.is_empty());
    assert!(registry.partitions().is_empty());
    assert!(repo.claims.is_empty());
    assert!(repo.partitions.is_empty());
    assert!(repo.grants.is_empty());
}

#[test]
fn partition_requires_existing_claim() {
    let mut repo = MemoryRepository::new();
    let mut registry = ClaimRegistry::new();
    let ghost = ClaimId::random();
    assert!(matches!(
        registry.add_partition(&mut repo, rect(ghost, 0, 0, 1, 1)),
        Err(ClaimError::ClaimNotFound(c)) if c == ghost
    ));
    assert!(repo.partitions.is_empty());
}

#[test]
fn removing_last_partition_leaves_a_removable_claim() {
    let mut repo = MemoryRepository::new();
    let mut registry = ClaimRegistry::new();
    let claim = Claim::new(WORLD, ActorId::random(), Position::flat(0, 0));
    let id = claim.id;
    registry.add_claim(&mut repo, claim).unwrap();
    assert!(registry.is_removable(id));

    let part = rect(id, 0, 0, 4, 4);
    let part_id = part.id;
    registry.add_partition(&mut repo, part).unwrap();
    assert!(!registry.is_removable(id));

    registry.remove_partition(&mut repo, part_id).unwrap();
    assert!(registry.contains(id));
    assert!(registry.is_removable(id));
    assert!(matches!(
        registry.remove_partition(&mut repo, part_id),
        Err(ClaimError::PartitionNotFound(_))
    ));
}

#[test]
fn repository_failure_leaves_memory_unchanged() {
    let mut repo = MemoryRepository::new();
    let mut registry = ClaimRegistry::new();
    let claim = Claim::new(WORLD, ActorId::random(), Position::flat(0, 0));
    let id = claim.id;
    registry.add_claim(&mut repo, claim).unwrap();
    let part = rect(id, 0, 0, 4, 4);
    let part_id = part.id;
    registry.add_partition(&mut repo, part).unwrap();

    repo.fail_writes = true;
    assert!(matches!(
        registry.add_partition(&mut repo, rect(id, 10, 10, 12, 12)),
        Err(ClaimError::Repository(_))
    ));
    assert!(registry.claim_at(&Position::flat(11, 11)).is_none());

    assert!(registry.remove_partition(&mut repo, part_id).is_err());
    assert!(registry.partitions().get(part_id).is_some());

    assert!(registry.remove_claim(&mut repo, id).is_err());
    assert!(registry.contains(id));
    assert_eq!(registry.partitions_of(id).len(), 1);

    let other = Claim::new(WORLD, ActorId::random(), Position::flat(50, 50));
    let other_id = other.id;
    assert!(registry.add_claim(&mut repo, other).is_err());
    assert!(!registry.contains(other_id));
}

#[test]
fn load_keeps_only_the_requested_world() {
    let mut repo = MemoryRepository::new();
    let here = Claim::new(WORLD, ActorId::random(), Position::flat(0, 0));
    let there = Claim::new(Uuid::from_u128(7), ActorId::random(), Position::flat(0, 0));
    let (here_id, there_id) = (here.id, there.id);
    repo.insert_claim(&here).unwrap();
    repo.insert_claim(&there).unwrap();
    // Same rectangle in both worlds: no conflict across worlds.
    repo.insert_partition(&rect(here_id, 0, 0, 5, 5)).unwrap();
    repo.insert_partition(&rect(there_id, 0, 0, 5, 5)).unwrap();

    let registry = ClaimRegistry::load(&repo, WORLD).unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.partitions().len(), 1);
    assert_eq!(registry.claim_at(&Position::flat(3, 3)).map(|c| c.id), Some(here_id));
}

#[test]
fn load_rejects_orphaned_partitions() {
    let mut repo = MemoryRepository::new();
    let orphan = rect(ClaimId::random(), 0, 0, 1, 1);
    let orphan_id = orphan.id;
    repo.insert_partition(&orphan).unwrap();

    match ClaimRegistry::load(&repo, WORLD) {
        Err(ClaimError::Orphaned { partition, .. }) => assert_eq!(partition, orphan_id),
        Err(other) => panic!("expected orphan error, got {other}"),
        Ok(_) => panic!("expected orphan error"),
    }
}
