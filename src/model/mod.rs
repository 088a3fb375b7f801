//! Problem, item, and solution types.

mod items;
mod problem;
mod solution;

pub use items::{ConSense, Constraint, VarType, Variable};
pub use problem::{fractionality, Problem};
pub use solution::{relative_gap, IncumbentTracker, Solution, SolveStatus};
