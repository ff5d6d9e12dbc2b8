//! Permission and rule resolution.

pub mod grants;
pub mod graph;
pub mod resolver;

pub use grants::{GrantTable, RuleTable};
pub use graph::{Kind, KindGraph};
pub use resolver::{
    Allowance, DenialNotice, Notifier, PermissionFn, PermissionGraph, RuleFn, RuleGraph, RuleVerdict, Verdict,
    WorldEvent,
};
