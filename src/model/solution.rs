//! Solution types and the global incumbent tracker.

use crate::settings::ObjSense;

/// Status of a finished solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found and proven.
    Optimal,

    /// Problem is infeasible.
    Infeasible,

    /// The required guarantee was reached before the tree was exhausted.
    GuaranteeReached,

    /// Time limit reached, best solution returned.
    TimeLimit,

    /// Node limit reached, best solution returned.
    NodeLimit,
}

impl SolveStatus {
    /// Returns true if a feasible solution was found.
    pub fn has_solution(&self) -> bool {
        !matches!(self, SolveStatus::Infeasible)
    }
}

/// Complete solve result with diagnostics.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solve status.
    pub status: SolveStatus,

    /// Best solution found, dense over variable pool ids (empty if none).
    pub x: Vec<f64>,

    /// Objective value of the best solution (primal bound).
    pub obj_val: f64,

    /// Best proven dual bound.
    pub bound: f64,

    /// Relative optimality gap.
    pub gap: f64,

    /// Number of tree nodes processed.
    pub nodes_processed: u64,

    /// Number of LPs solved.
    pub lps_solved: u64,

    /// Number of constraints added by separation.
    pub cuts_added: u64,

    /// Number of variables added by pricing.
    pub vars_priced: u64,

    /// Total solve time in milliseconds.
    pub solve_time_ms: u64,
}

/// Relative gap between a primal and a dual bound.
pub fn relative_gap(primal: f64, dual: f64) -> f64 {
    if !primal.is_finite() || !dual.is_finite() {
        return f64::INFINITY;
    }
    let denom = dual.abs().max(1e-10);
    (primal - dual).abs() / denom
}

/// Tracks the best known feasible solution (incumbent).
#[derive(Debug, Clone)]
pub struct IncumbentTracker {
    /// Current best solution, dense over variable pool ids.
    pub solution: Option<Vec<f64>>,

    /// Objective value of the incumbent (primal bound). Initialized to
    /// the worst value for the optimization sense.
    pub obj_val: f64,

    /// Number of times the incumbent was updated.
    pub update_count: u64,

    sense: ObjSense,
}

impl IncumbentTracker {
    /// Create a new incumbent tracker.
    pub fn new(sense: ObjSense) -> Self {
        Self {
            solution: None,
            obj_val: sense.worst(),
            update_count: 0,
            sense,
        }
    }

    /// Check if we have an incumbent.
    pub fn has_incumbent(&self) -> bool {
        self.solution.is_some()
    }

    /// Try to update the incumbent with a new solution.
    ///
    /// Returns true if the incumbent was improved.
    pub fn update(&mut self, x: &[f64], obj: f64) -> bool {
        if self.sense.better(obj, self.obj_val, 1e-9) {
            self.solution = Some(x.to_vec());
            self.obj_val = obj;
            self.update_count += 1;
            true
        } else {
            false
        }
    }

    /// Relative gap of the incumbent to a dual bound.
    pub fn gap(&self, dual_bound: f64) -> f64 {
        relative_gap(self.obj_val, dual_bound)
    }

    /// Check if the gap to a dual bound is within tolerance.
    pub fn gap_closed(&self, dual_bound: f64, tol: f64) -> bool {
        self.has_incumbent() && self.gap(dual_bound) <= tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incumbent_minimization() {
        let mut tracker = IncumbentTracker::new(ObjSense::Min);

        assert!(!tracker.has_incumbent());
        assert_eq!(tracker.obj_val, f64::INFINITY);

        assert!(tracker.update(&[1.0], 10.0));
        assert!(!tracker.update(&[2.0], 15.0));
        assert!(tracker.update(&[0.5], 5.0));
        assert_eq!(tracker.obj_val, 5.0);
        assert_eq!(tracker.update_count, 2);
    }

    #[test]
    fn test_incumbent_maximization() {
        let mut tracker = IncumbentTracker::new(ObjSense::Max);

        assert!(tracker.update(&[1.0], 10.0));
        assert!(!tracker.update(&[2.0], 5.0));
        assert!(tracker.update(&[0.5], 15.0));
        assert_eq!(tracker.obj_val, 15.0);
    }

    #[test]
    fn test_relative_gap() {
        let gap = relative_gap(10.0, 8.0);
        assert!((gap - 0.25).abs() < 1e-10);

        assert!(relative_gap(f64::INFINITY, 8.0).is_infinite());
    }

    #[test]
    fn test_gap_closed() {
        let mut tracker = IncumbentTracker::new(ObjSense::Min);
        assert!(!tracker.gap_closed(9.9, 0.5));

        tracker.update(&[1.0], 10.0);
        assert!(tracker.gap_closed(9.99, 0.01));
        assert!(!tracker.gap_closed(5.0, 0.01));
    }
}
