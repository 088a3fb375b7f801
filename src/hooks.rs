//! Pluggable strategy hooks.
//!
//! Problem-specific algorithms (separation, pricing, heuristics, logical
//! fixing, custom branching) are injected through one trait with no-op
//! defaults. The engine calls every hook synchronously from inside a
//! node's cutting loop; hooks must not retain references into the view.

use crate::model::{Constraint, Problem};
use crate::search::branching::{BranchCandidate, BranchDecision, BranchRule};

/// Read-only snapshot of the node state handed to every hook.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    /// Tree id of the node.
    pub node_id: usize,

    /// Depth of the node in the search tree.
    pub depth: usize,

    /// Current LP point, dense over variable pool ids. Inactive
    /// variables are reported as zero.
    pub x: &'a [f64],

    /// LP objective value in the problem's optimization sense.
    pub lp_value: f64,

    /// The node's proven dual bound.
    pub dual_bound: f64,

    /// Global primal bound (worst value for the sense if no incumbent).
    pub primal_bound: f64,

    /// Whether an incumbent exists.
    pub has_incumbent: bool,
}

/// Strategy hooks invoked by the engine. Every method has a no-op
/// default, so implementors override only what their problem needs.
pub trait Callbacks {
    /// Variable pool ids to activate at the root instead of all problem
    /// variables. Returning a restricted set turns the solve into a
    /// column-generation run: the remaining variables are priced in on
    /// demand.
    fn initialize_variables(&mut self, _problem: &Problem) -> Option<Vec<usize>> {
        None
    }

    /// Constraint pool ids to activate at the root instead of all
    /// problem constraints.
    fn initialize_constraints(&mut self, _problem: &Problem) -> Option<Vec<usize>> {
        None
    }

    /// Primal separation: return cuts violated by the current LP point.
    /// Coefficients are keyed by variable pool id. Cuts below the
    /// configured minimum violation are discarded.
    fn separate(&mut self, _view: &NodeView) -> Vec<Constraint> {
        Vec::new()
    }

    /// Dual separation: pool ids of inactive variables to price into the
    /// node's LP, ahead of the engine's own reduced-cost scan.
    fn pricing(&mut self, _view: &NodeView) -> Vec<usize> {
        Vec::new()
    }

    /// Primal heuristic: a feasible point (dense over variable pool ids)
    /// and its objective value in the problem's sense.
    fn improve(&mut self, _view: &NodeView) -> Option<(Vec<f64>, f64)> {
        None
    }

    /// Logical implications that pin variables permanently, as
    /// (variable pool id, value) pairs. A value conflicting with an
    /// earlier fix fathoms the node.
    fn fix_by_logic(&mut self, _view: &NodeView) -> Vec<(usize, f64)> {
        Vec::new()
    }

    /// Logical implications valid only in the current subtree.
    fn set_by_logic(&mut self, _view: &NodeView) -> Vec<(usize, f64)> {
        Vec::new()
    }

    /// Replace the engine's branching candidate set.
    fn select_candidates(
        &mut self,
        _view: &NodeView,
        _candidates: &[BranchCandidate],
    ) -> Option<Vec<BranchCandidate>> {
        None
    }

    /// Replace the (down, up) rule pair of a branching decision.
    fn branch_rules(
        &mut self,
        _view: &NodeView,
        _decision: &BranchDecision,
    ) -> Option<(BranchRule, BranchRule)> {
        None
    }

    /// Force the node to fathom (checked before every other termination
    /// condition).
    fn exception_fathom(&mut self, _view: &NodeView) -> bool {
        false
    }

    /// Force the node to branch immediately.
    fn exception_branch(&mut self, _view: &NodeView) -> bool {
        false
    }

    /// Ask the node to pause; it goes dormant and returns to the open
    /// queue.
    fn pausing(&mut self, _view: &NodeView) -> bool {
        false
    }

    /// Veto the tailing-off verdict. Returning true resets the
    /// stagnation detector and keeps the cutting loop running.
    fn keep_cutting_on_tailoff(&mut self, _view: &NodeView) -> bool {
        false
    }
}

/// Default hook set: every strategy is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCallbacks;

impl Callbacks for NoOpCallbacks {}
