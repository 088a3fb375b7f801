//! A branch-and-cut engine for mixed-integer optimization.
//!
//! The engine solves a problem by relaxing it to a linear program,
//! tightening the relaxation with separated cutting planes and priced-in
//! variables, and branching when the relaxation alone cannot decide
//! optimality. Its core is the per-node state machine in
//! [`search::subproblem`]: activation of the node's working data, the
//! cutting-plane/pricing loop against an [`lp::LpSolver`] backend, the
//! branch-or-fathom decision, and teardown.
//!
//! Problem-specific algorithms plug in through the [`Callbacks`] trait:
//! separation, pricing, primal heuristics, logical fixing and custom
//! branching all default to no-ops, so plain mixed-integer problems
//! solve out of the box with the bundled [`lp::DenseSimplex`] backend.
//!
//! # Example
//!
//! ```
//! use branchcut::{ConSense, Constraint, EngineSettings, Master, ObjSense, Problem, Variable};
//!
//! // maximize 5x + 4y  subject to  x + y <= 1,  x, y binary
//! let mut prob = Problem::new(ObjSense::Max);
//! let x = prob.push_variable(Variable::binary(5.0));
//! let y = prob.push_variable(Variable::binary(4.0));
//! prob.push_constraint(Constraint::new(vec![(x, 1.0), (y, 1.0)], ConSense::Le, 1.0));
//!
//! let mut master = Master::new(prob, EngineSettings::default()).unwrap();
//! let solution = master.solve().unwrap();
//!
//! assert!((solution.obj_val - 5.0).abs() < 1e-6);
//! assert!((solution.x[x] - 1.0).abs() < 1e-6);
//! ```

pub mod error;
pub mod hooks;
pub mod lp;
pub mod master;
pub mod model;
pub mod pool;
pub mod search;
pub mod settings;

pub use error::{EngineError, EngineResult};
pub use hooks::{Callbacks, NoOpCallbacks, NodeView};
pub use master::{Master, SolveStats};
pub use model::{
    ConSense, Constraint, IncumbentTracker, Problem, Solution, SolveStatus, VarType, Variable,
};
pub use settings::{BranchingRule, EngineSettings, NodeSelection, ObjSense};
