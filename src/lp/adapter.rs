//! LP backend trait and types.
//!
//! The engine never talks to a concrete LP solver directly; it drives
//! this trait. Rows and columns are addressed by their *current* index,
//! and a removal shifts every later index down, mirroring how the
//! node's active sets are compacted.

use crate::error::EngineResult;
use crate::model::ConSense;

/// Re-solve method requested by the engine.
///
/// The choice encodes what changed since the last solve: added rows keep
/// the basis dual feasible, added columns keep it primal feasible, and
/// the very first solve of a node asks for the most robust method.
/// Backends that always solve from scratch may treat this as advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// Primal simplex (columns were added, or both kinds changed).
    Primal,

    /// Dual simplex (rows were added).
    Dual,

    /// Slower, more robust method for a cold start.
    Barrier,
}

/// Status of an LP solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    /// Optimal solution found; primal and dual values are available.
    Optimal,

    /// The LP is infeasible; a certificate may be available.
    Infeasible,

    /// The LP is unbounded. The engine treats this as a fatal condition
    /// since node relaxations are expected to be bounded.
    Unbounded,
}

/// Basis status of a column or row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisStatus {
    /// In the basis.
    Basic,

    /// Non-basic at its lower bound.
    AtLower,

    /// Non-basic at its upper bound.
    AtUpper,
}

/// A row handed to the backend, with coefficients keyed by column index.
#[derive(Debug, Clone)]
pub struct LpRow {
    /// (column index, coefficient) pairs.
    pub coefs: Vec<(usize, f64)>,

    /// Row sense.
    pub sense: ConSense,

    /// Right-hand side.
    pub rhs: f64,
}

/// A column handed to the backend, with entries keyed by row index.
#[derive(Debug, Clone)]
pub struct LpCol {
    /// Objective coefficient (already sense-adjusted to minimization).
    pub obj: f64,

    /// Lower bound (finite).
    pub lb: f64,

    /// Upper bound (may be `f64::INFINITY`).
    pub ub: f64,

    /// (row index, coefficient) pairs over existing rows.
    pub entries: Vec<(usize, f64)>,
}

/// Certificate of primal infeasibility: the rows that could not be
/// satisfied simultaneously. Used by the engine to attempt repair by
/// pricing in variables with support on these rows.
#[derive(Debug, Clone)]
pub struct InfeasibleCertificate {
    /// Indices of infeasible rows.
    pub rows: Vec<usize>,
}

/// Trait for LP backends.
///
/// The backend always minimizes; the engine adjusts objective signs for
/// maximization problems. Query methods must only be called after an
/// `optimize` that returned `LpStatus::Optimal`.
pub trait LpSolver {
    /// Solve the current LP.
    fn optimize(&mut self, method: SolveMethod) -> EngineResult<LpStatus>;

    /// Objective value of the last optimal solve.
    fn obj_value(&self) -> f64;

    /// Primal value of a column.
    fn x_val(&self, col: usize) -> f64;

    /// Dual value of a row.
    fn y_val(&self, row: usize) -> f64;

    /// Reduced cost of a column with respect to the row duals.
    fn reduced_cost(&self, col: usize) -> f64;

    /// Slack of a row (distance to its right-hand side).
    fn slack(&self, row: usize) -> f64;

    /// Basis status of a column.
    fn col_status(&self, col: usize) -> BasisStatus;

    /// Basis status of a row (basic = non-binding).
    fn row_status(&self, row: usize) -> BasisStatus;

    /// Append rows to the LP.
    fn add_rows(&mut self, rows: Vec<LpRow>);

    /// Append columns to the LP.
    fn add_cols(&mut self, cols: Vec<LpCol>);

    /// Remove rows by index. Later rows shift down.
    fn remove_rows(&mut self, rows: &[usize]);

    /// Remove columns by index. Later columns shift down.
    fn remove_cols(&mut self, cols: &[usize]);

    /// Change the bounds of a column.
    fn change_bounds(&mut self, col: usize, lb: f64, ub: f64);

    /// Number of rows.
    fn num_rows(&self) -> usize;

    /// Number of columns.
    fn num_cols(&self) -> usize;

    /// Infeasibility certificate of the last solve, if infeasible.
    fn infeasible_rows(&self) -> Option<InfeasibleCertificate>;
}
