//! End-to-end tests of the branch-and-cut engine on small instances
//! with known optima.

use branchcut::search::FathomReason;
use branchcut::{
    BranchingRule, Callbacks, ConSense, Constraint, EngineSettings, Master, NodeSelection,
    NodeView, ObjSense, Problem, SolveStatus, Variable,
};

/// max 5x + 4y  s.t.  x + y <= 1,  x, y binary.
///
/// The root relaxation is already integral (x = 1), so the solve
/// finishes in a single node.
fn one_node_problem() -> Problem {
    let mut prob = Problem::new(ObjSense::Max);
    prob.push_variable(Variable::binary(5.0));
    prob.push_variable(Variable::binary(4.0));
    prob.push_constraint(Constraint::new(vec![(0, 1.0), (1, 1.0)], ConSense::Le, 1.0));
    prob
}

/// max x + y  s.t.  2x + 2y <= 3,  x, y binary.
///
/// The root relaxation is fractional (value 1.5) and no cut or column
/// helps, so the engine must branch. The integer optimum is 1.
fn branching_problem() -> Problem {
    let mut prob = Problem::new(ObjSense::Max);
    prob.push_variable(Variable::binary(1.0));
    prob.push_variable(Variable::binary(1.0));
    prob.push_constraint(Constraint::new(vec![(0, 2.0), (1, 2.0)], ConSense::Le, 3.0));
    prob
}

/// The classic 3-item knapsack: values 60/100/120, weights 10/20/30,
/// capacity 50. Optimum 220, packing items 1 and 2.
fn knapsack_problem() -> Problem {
    let mut prob = Problem::new(ObjSense::Max);
    prob.push_variable(Variable::binary(60.0));
    prob.push_variable(Variable::binary(100.0));
    prob.push_variable(Variable::binary(120.0));
    prob.push_constraint(Constraint::new(
        vec![(0, 10.0), (1, 20.0), (2, 30.0)],
        ConSense::Le,
        50.0,
    ));
    prob
}

fn solve(prob: Problem, settings: EngineSettings) -> branchcut::Solution {
    let mut master = Master::new(prob, settings).expect("valid problem");
    master.solve().expect("solve failed")
}

#[test]
fn test_single_node_optimal() {
    let sol = solve(one_node_problem(), EngineSettings::default());

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 5.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    assert!((sol.x[0] - 1.0).abs() < 1e-6);
    assert!(sol.x[1].abs() < 1e-6);
    assert_eq!(sol.nodes_processed, 1);
}

#[test]
fn test_branching_creates_two_children() {
    let mut master = Master::new(branching_problem(), EngineSettings::default()).unwrap();
    let sol = master.solve().unwrap();

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 1.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    // Binary branching on one fractional variable.
    assert_eq!(master.tree.record(0).children.len(), 2);
    assert!(sol.nodes_processed >= 2);
    for &xi in &sol.x {
        assert!((xi - xi.round()).abs() < 1e-6, "not integral: {}", xi);
    }
}

#[test]
fn test_knapsack_best_bound() {
    let sol = solve(knapsack_problem(), EngineSettings::default());

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 220.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    assert!(sol.x[0].abs() < 1e-6);
    assert!((sol.x[1] - 1.0).abs() < 1e-6);
    assert!((sol.x[2] - 1.0).abs() < 1e-6);
    // The proven bound matches the optimum at the end.
    assert!((sol.bound - 220.0).abs() < 1e-6, "bound = {}", sol.bound);
}

#[test]
fn test_knapsack_depth_first() {
    let mut settings = EngineSettings::default();
    settings.node_selection = NodeSelection::DepthFirst;
    let sol = solve(knapsack_problem(), settings);

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 220.0).abs() < 1e-6, "obj = {}", sol.obj_val);
}

#[test]
fn test_strong_branching() {
    let settings = EngineSettings::default()
        .with_branching_rule(BranchingRule::StrongBranching { candidates: 2 });
    let sol = solve(branching_problem(), settings);

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 1.0).abs() < 1e-6, "obj = {}", sol.obj_val);
}

#[test]
fn test_general_integer_bound_split() {
    // max 3x  s.t.  2x <= 5,  x integer in [0, 10]. The relaxation sits
    // at x = 2.5; the up child is infeasible, the down child gives 6.
    let mut prob = Problem::new(ObjSense::Max);
    prob.push_variable(Variable::integer(3.0, 0.0, 10.0));
    prob.push_constraint(Constraint::new(vec![(0, 2.0)], ConSense::Le, 5.0));

    let sol = solve(prob, EngineSettings::default());

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 6.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    assert!((sol.x[0] - 2.0).abs() < 1e-6);
}

#[test]
fn test_infeasible_problem() {
    // min x  s.t.  x >= 2,  x binary. No feasible point exists.
    let mut prob = Problem::new(ObjSense::Min);
    prob.push_variable(Variable::binary(1.0));
    prob.push_constraint(Constraint::new(vec![(0, 1.0)], ConSense::Ge, 2.0));

    let sol = solve(prob, EngineSettings::default());
    assert_eq!(sol.status, SolveStatus::Infeasible);
    assert!(sol.x.is_empty());
}

#[test]
fn test_time_limit_forces_termination() {
    let settings = EngineSettings::default().with_time_limit(0.0);
    let sol = solve(knapsack_problem(), settings);

    assert_eq!(sol.status, SolveStatus::TimeLimit);
    assert_eq!(sol.nodes_processed, 0);
}

#[test]
fn test_node_limit_reports_open_bound() {
    let settings = EngineSettings::default().with_max_nodes(1);
    let sol = solve(branching_problem(), settings);

    assert_eq!(sol.status, SolveStatus::NodeLimit);
    // No incumbent yet; the reported bound comes from the open children
    // of the root, which inherit its relaxation value of 1.5.
    assert!((sol.bound - 1.5).abs() < 1e-6, "bound = {}", sol.bound);
    assert!(sol.x.is_empty());
}

#[test]
fn test_guarantee_terminates_within_gap() {
    let settings = EngineSettings::default().with_guarantee(0.5);
    let sol = solve(knapsack_problem(), settings);

    assert!(sol.status.has_solution(), "status = {:?}", sol.status);
    assert!(sol.gap <= 0.5 + 1e-6, "gap = {}", sol.gap);
    assert!(sol.obj_val >= 110.0, "obj = {}", sol.obj_val);
}

/// Separates x + y <= 1 whenever the LP point violates it. Valid for
/// the binary instance with 2x + 2y <= 3 since no 0-1 point has sum 2.
struct SumCut;

impl Callbacks for SumCut {
    fn separate(&mut self, view: &NodeView) -> Vec<Constraint> {
        if view.x[0] + view.x[1] > 1.0 + 1e-6 {
            vec![Constraint::new(vec![(0, 1.0), (1, 1.0)], ConSense::Le, 1.0).cut()]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn test_separation_closes_root() {
    let mut master = Master::new(branching_problem(), EngineSettings::default())
        .unwrap()
        .with_callbacks(Box::new(SumCut));
    let sol = master.solve().unwrap();

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 1.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    assert!(sol.cuts_added >= 1, "no cut was added");
    // The cut makes the root relaxation integral; no branching needed.
    assert_eq!(sol.nodes_processed, 1);
}

/// min 2a + b  s.t.  a + b >= 1, both continuous in [0, 10].
///
/// Started from column `a` alone the restricted optimum is 2; pricing
/// must bring in `b` to reach the true optimum of 1.
fn covering_problem() -> Problem {
    let mut prob = Problem::new(ObjSense::Min);
    prob.push_variable(Variable::continuous(2.0, 0.0, 10.0));
    prob.push_variable(Variable::continuous(1.0, 0.0, 10.0));
    prob.push_constraint(Constraint::new(vec![(0, 1.0), (1, 1.0)], ConSense::Ge, 1.0));
    prob
}

/// Starts the root LP from a restricted column set.
struct RestrictedStart;

impl Callbacks for RestrictedStart {
    fn initialize_variables(&mut self, _problem: &Problem) -> Option<Vec<usize>> {
        Some(vec![0])
    }
}

#[test]
fn test_column_generation_reduced_cost_scan() {
    let mut master = Master::new(covering_problem(), EngineSettings::default())
        .unwrap()
        .with_callbacks(Box::new(RestrictedStart));
    let sol = master.solve().unwrap();

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 1.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    assert!(sol.vars_priced >= 1, "no variable was priced in");
    assert!((sol.x[1] - 1.0).abs() < 1e-6);
}

/// Restricted start plus an explicit pricing proposal.
struct ProposedPricing;

impl Callbacks for ProposedPricing {
    fn initialize_variables(&mut self, _problem: &Problem) -> Option<Vec<usize>> {
        Some(vec![0])
    }

    fn pricing(&mut self, _view: &NodeView) -> Vec<usize> {
        vec![1]
    }
}

#[test]
fn test_pricing_hook_proposals() {
    let mut master = Master::new(covering_problem(), EngineSettings::default())
        .unwrap()
        .with_callbacks(Box::new(ProposedPricing));
    let sol = master.solve().unwrap();

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 1.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    assert!(sol.vars_priced >= 1);
}

#[test]
fn test_repair_pricing_from_certificate() {
    // As the covering problem, but `a` alone cannot satisfy the cover:
    // the restricted root LP is infeasible and must be repaired by
    // pricing in a column with support on the certificate row.
    let mut prob = Problem::new(ObjSense::Min);
    prob.push_variable(Variable::continuous(2.0, 0.0, 0.5));
    prob.push_variable(Variable::continuous(1.0, 0.0, 10.0));
    prob.push_constraint(Constraint::new(vec![(0, 1.0), (1, 1.0)], ConSense::Ge, 1.0));

    let mut master = Master::new(prob, EngineSettings::default())
        .unwrap()
        .with_callbacks(Box::new(RestrictedStart));
    let sol = master.solve().unwrap();

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 1.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    assert!(sol.vars_priced >= 1, "repair pricing did not fire");
}

#[test]
fn test_non_liftable_blocks_pricing() {
    // The cover row is non-liftable, so pricing may not lift column `b`
    // into it. The engine evicts the row once, finds nothing to price
    // without its duals, takes the row back and settles for the
    // restricted optimum of 2.
    let mut prob = Problem::new(ObjSense::Min);
    prob.push_variable(Variable::continuous(2.0, 0.0, 10.0));
    prob.push_variable(Variable::continuous(1.0, 0.0, 10.0));
    prob.push_constraint(
        Constraint::new(vec![(0, 1.0), (1, 1.0)], ConSense::Ge, 1.0).non_liftable(),
    );

    let mut master = Master::new(prob, EngineSettings::default())
        .unwrap()
        .with_callbacks(Box::new(RestrictedStart));
    let sol = master.solve().unwrap();

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 2.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    assert_eq!(sol.vars_priced, 0);
}

/// Pins the first variable to 0 permanently, then claims it must be 1
/// in this subtree. The contradiction fathoms the node.
struct ContradictoryLogic;

impl Callbacks for ContradictoryLogic {
    fn fix_by_logic(&mut self, _view: &NodeView) -> Vec<(usize, f64)> {
        vec![(0, 0.0)]
    }

    fn set_by_logic(&mut self, _view: &NodeView) -> Vec<(usize, f64)> {
        vec![(0, 1.0)]
    }
}

#[test]
fn test_logical_contradiction_fathoms() {
    let mut master = Master::new(branching_problem(), EngineSettings::default())
        .unwrap()
        .with_callbacks(Box::new(ContradictoryLogic));
    let sol = master.solve().unwrap();

    assert_eq!(sol.status, SolveStatus::Infeasible);
    assert_eq!(sol.nodes_processed, 1);
    assert_eq!(
        master.tree.record(0).fathom_reason,
        Some(FathomReason::Contradiction)
    );
}

/// Asks the first node to pause once, sending it dormant and back to
/// the open queue.
struct PauseOnce {
    paused: bool,
}

impl Callbacks for PauseOnce {
    fn pausing(&mut self, _view: &NodeView) -> bool {
        if self.paused {
            return false;
        }
        self.paused = true;
        true
    }
}

#[test]
fn test_pause_and_resume() {
    let mut master = Master::new(branching_problem(), EngineSettings::default())
        .unwrap()
        .with_callbacks(Box::new(PauseOnce { paused: false }));
    let sol = master.solve().unwrap();

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 1.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    // The root was handed out twice: once to pause, once to finish.
    assert!(sol.nodes_processed >= 2, "nodes = {}", sol.nodes_processed);
}

/// Hands in a feasible (but not optimal) packing at the root.
struct GreedyPacking;

impl Callbacks for GreedyPacking {
    fn improve(&mut self, view: &NodeView) -> Option<(Vec<f64>, f64)> {
        if view.has_incumbent {
            return None;
        }
        // Items 0 and 2: weight 40 <= 50, value 180.
        Some((vec![1.0, 0.0, 1.0], 180.0))
    }
}

#[test]
fn test_heuristic_incumbent_is_improved_on() {
    let mut master = Master::new(knapsack_problem(), EngineSettings::default())
        .unwrap()
        .with_callbacks(Box::new(GreedyPacking));
    let sol = master.solve().unwrap();

    assert_eq!(sol.status, SolveStatus::Optimal);
    assert!((sol.obj_val - 220.0).abs() < 1e-6, "obj = {}", sol.obj_val);
    // The heuristic point was accepted first, then beaten by the search.
    assert!(master.incumbent.update_count >= 2);

    println!(
        "heuristic run: obj={:.1}, nodes={}, lps={}",
        sol.obj_val, sol.nodes_processed, sol.lps_solved
    );
}
