//! Search tree, node state machine, and search strategies.

pub mod branching;
pub mod fixing;
pub mod queue;
pub mod subproblem;
pub mod tailoff;
pub mod tree;

pub use branching::{BranchCandidate, BranchDecision, BranchRule, BranchingSelector};
pub use fixing::FsVarStat;
pub use queue::OpenNodeQueue;
pub use subproblem::Subproblem;
pub use tailoff::TailOff;
pub use tree::{FathomReason, NodeRecord, NodeStatus, Tree};
