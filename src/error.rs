//! Error types for the branch-and-cut engine.

use thiserror::Error;

/// Errors that can occur while driving the engine.
///
/// Infeasibility, contradictions and exhausted budgets are *not* errors:
/// they resolve into fathoming or forced branching on the affected node.
/// Only conditions that make a bound (or the whole run) unverifiable
/// surface here.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Problem validation failed
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// The LP backend failed or returned a status the engine cannot
    /// interpret. Every bound computed afterwards would be untrustworthy,
    /// so this aborts the whole solve.
    #[error("LP solver failure: {0}")]
    SolverFailure(String),

    /// Internal engine error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
