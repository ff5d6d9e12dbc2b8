pub mod claim;
pub mod partition;
pub mod registry;
pub mod store;

pub use claim::{Claim, ClaimId};
pub use partition::{Partition, PartitionId};
pub use registry::ClaimRegistry;
pub use store::PartitionStore;
