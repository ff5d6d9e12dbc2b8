//! Error taxonomy for claim mutation, static graph construction and the
//! repository collaborator.
//!
//! Read paths never use these: a missing claim or grant is an answer
//! (`None`, "allowed"), not a failure.

use thiserror::Error;

use crate::claims::{ClaimId, PartitionId};

#[derive(Debug, Error)]
pub enum ClaimError {
    /// The new partition would share at least one cell with an indexed one.
    #[error("partition {partition} overlaps existing partition {existing} of claim {existing_claim}")]
    Conflict {
        partition: PartitionId,
        existing: PartitionId,
        existing_claim: ClaimId,
    },

    #[error("claim {0} not found")]
    ClaimNotFound(ClaimId),

    #[error("partition {0} not found")]
    PartitionNotFound(PartitionId),

    #[error("claim {0} already exists")]
    DuplicateClaim(ClaimId),

    #[error("partition {0} already exists")]
    DuplicatePartition(PartitionId),

    /// A partition references a claim the registry does not hold. Only
    /// reachable from corrupt repository data.
    #[error("partition {partition} references missing claim {claim}")]
    Orphaned {
        partition: PartitionId,
        claim: ClaimId,
    },

    /// A kind that was never declared in the static graph.
    #[error("kind {0} is not declared")]
    UnknownKind(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The static permission/rule forest was declared inconsistently.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("kind {kind} declared twice")]
    Duplicate { kind: String },

    #[error("kind {kind} names parent {parent}, which is not declared before it")]
    UnknownParent { kind: String, parent: String },

    #[error("identifier or alias '{name}' is used by more than one kind")]
    NameClash { name: String },
}

/// Failure reported by a `ClaimRepository` implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("repository data is malformed: {0}")]
    Format(String),

    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
