//! Global solve context and driver.
//!
//! The master owns everything shared across nodes: the item pools, the
//! incumbent, the search tree, the open-node queue, budgets and
//! settings. It is threaded explicitly through every node operation;
//! there is no global state.

use std::collections::HashMap;
use std::time::Instant;

use crate::error::{EngineError, EngineResult};
use crate::hooks::{Callbacks, NoOpCallbacks};
use crate::lp::{DenseSimplex, LpSolver};
use crate::model::{relative_gap, Constraint, IncumbentTracker, Problem, Solution, SolveStatus, Variable};
use crate::pool::Pool;
use crate::search::queue::OpenNodeQueue;
use crate::search::subproblem::Subproblem;
use crate::search::tree::{FathomReason, NodeStatus, Tree};
use crate::settings::{EngineSettings, NodeSelection, ObjSense};

/// Counters accumulated over a solve run.
#[derive(Debug, Default, Clone)]
pub struct SolveStats {
    /// Nodes handed to the subproblem engine.
    pub nodes_processed: u64,

    /// LP solves across all nodes.
    pub lps_solved: u64,

    /// Constraints added to node LPs by separation.
    pub cuts_added: u64,

    /// Variables added to node LPs by pricing.
    pub vars_priced: u64,
}

/// The global branch-and-cut context.
pub struct Master {
    /// Engine configuration.
    pub settings: EngineSettings,

    /// Optimization sense, copied from the problem.
    pub sense: ObjSense,

    /// The problem definition (seeds the pools; handed to the
    /// initialization hooks).
    pub problem: Problem,

    /// Global variable pool.
    pub var_pool: Pool<Variable>,

    /// Global constraint pool.
    pub con_pool: Pool<Constraint>,

    /// Best known feasible solution.
    pub incumbent: IncumbentTracker,

    /// The search-tree arena.
    pub tree: Tree,

    /// Variables pinned permanently, by pool id.
    pub global_fixed: HashMap<usize, f64>,

    /// Run statistics.
    pub stats: SolveStats,

    queue: OpenNodeQueue,
    hooks: Option<Box<dyn Callbacks>>,
    lp_factory: Box<dyn Fn() -> Box<dyn LpSolver>>,
    start: Instant,
}

impl Master {
    /// Create a solve context for a problem.
    pub fn new(problem: Problem, settings: EngineSettings) -> EngineResult<Self> {
        problem.validate()?;

        let mut var_pool = Pool::new(settings.var_pool_capacity.max(problem.num_vars()));
        let mut con_pool = Pool::new(settings.con_pool_capacity.max(problem.num_cons()));
        for var in &problem.variables {
            var_pool
                .insert(var.clone())
                .ok_or_else(|| EngineError::InvalidProblem("variable pool full".to_string()))?;
        }
        for con in &problem.constraints {
            con_pool
                .insert(con.clone())
                .ok_or_else(|| EngineError::InvalidProblem("constraint pool full".to_string()))?;
        }

        let sense = problem.sense;
        Ok(Self {
            settings,
            sense,
            problem,
            var_pool,
            con_pool,
            incumbent: IncumbentTracker::new(sense),
            tree: Tree::new(sense),
            global_fixed: HashMap::new(),
            stats: SolveStats::default(),
            queue: OpenNodeQueue::new(),
            hooks: None,
            lp_factory: Box::new(|| Box::new(DenseSimplex::new())),
            start: Instant::now(),
        })
    }

    /// Install strategy hooks.
    pub fn with_callbacks(mut self, hooks: Box<dyn Callbacks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Replace the LP backend factory.
    pub fn with_lp_factory(mut self, factory: Box<dyn Fn() -> Box<dyn LpSolver>>) -> Self {
        self.lp_factory = factory;
        self
    }

    /// Run the branch-and-cut search to completion.
    pub fn solve(&mut self) -> EngineResult<Solution> {
        self.start = Instant::now();
        let mut hooks = self
            .hooks
            .take()
            .unwrap_or_else(|| Box::new(NoOpCallbacks));
        let result = self.run(hooks.as_mut());
        self.hooks = Some(hooks);
        result
    }

    fn run(&mut self, hooks: &mut dyn Callbacks) -> EngineResult<Solution> {
        let all_vars: Vec<usize> = (0..self.problem.num_vars()).collect();
        let all_cons: Vec<usize> = (0..self.problem.num_cons()).collect();
        let root_vars = hooks
            .initialize_variables(&self.problem)
            .map(|ids| ids.into_iter().filter(|&id| self.var_pool.contains(id)).collect())
            .unwrap_or(all_vars);
        let root_cons = hooks
            .initialize_constraints(&self.problem)
            .map(|ids| ids.into_iter().filter(|&id| self.con_pool.contains(id)).collect())
            .unwrap_or(all_cons);

        let root_id = self.tree.add_root(self.sense.best());
        let root = Subproblem::root(root_id, self.sense.best(), root_vars, root_cons);
        self.register_subproblem(root);

        if self.settings.verbose {
            log::info!(
                "solving: {} variables ({} discrete), {} constraints",
                self.problem.num_vars(),
                self.problem.num_discrete(),
                self.problem.num_cons()
            );
        }

        let mut status = SolveStatus::Optimal;
        loop {
            if self.time_exceeded() {
                status = SolveStatus::TimeLimit;
                break;
            }
            if self.stats.nodes_processed >= self.settings.max_nodes {
                status = SolveStatus::NodeLimit;
                break;
            }
            if self.settings.guarantee > 0.0 {
                if let Some(bound) = self.queue.best_bound(self.sense) {
                    if self.incumbent.gap_closed(bound, self.settings.guarantee) {
                        status = SolveStatus::GuaranteeReached;
                        break;
                    }
                }
            }

            let Some(mut node) = self.queue.pop() else {
                break;
            };
            // Lazily skip entries whose subtree was already fathomed.
            if self.tree.is_fathomed(node.tree_id()) {
                node.release_refs(&mut self.var_pool, &mut self.con_pool);
                continue;
            }

            self.stats.nodes_processed += 1;
            if self.settings.verbose && self.stats.nodes_processed % self.settings.log_freq == 0 {
                log::info!(
                    "node {:>6}: open {:>5}, incumbent {:>12.6}, bound {:>12.6}",
                    self.stats.nodes_processed,
                    self.queue.len(),
                    self.incumbent.obj_val,
                    node.dual_bound()
                );
            }

            node.optimize(self, hooks)?;

            if self.tree.status(node.tree_id()) == NodeStatus::Dormant {
                let key = self.queue_key(&node);
                self.queue.push(node, key);
            }
        }

        self.finish(status)
    }

    /// Build the solution report and release any remaining open nodes.
    fn finish(&mut self, mut status: SolveStatus) -> EngineResult<Solution> {
        let open_bound = self.queue.best_bound(self.sense);
        while let Some(mut node) = self.queue.pop() {
            node.release_refs(&mut self.var_pool, &mut self.con_pool);
        }

        let exhausted = open_bound.is_none();
        if exhausted && !self.incumbent.has_incumbent() {
            status = SolveStatus::Infeasible;
        }
        let bound = match open_bound {
            Some(b) => b,
            None => self.incumbent.obj_val,
        };
        let gap = relative_gap(self.incumbent.obj_val, bound);

        let solution = Solution {
            status,
            x: self.incumbent.solution.clone().unwrap_or_default(),
            obj_val: self.incumbent.obj_val,
            bound,
            gap,
            nodes_processed: self.stats.nodes_processed,
            lps_solved: self.stats.lps_solved,
            cuts_added: self.stats.cuts_added,
            vars_priced: self.stats.vars_priced,
            solve_time_ms: self.elapsed_ms(),
        };
        if self.settings.verbose {
            log::info!(
                "finished: {:?}, objective {:.6}, bound {:.6}, {} nodes, {} LPs in {} ms",
                solution.status,
                solution.obj_val,
                solution.bound,
                solution.nodes_processed,
                solution.lps_solved,
                solution.solve_time_ms
            );
        }
        Ok(solution)
    }

    /// Register a new open node: take pool references for its snapshot
    /// and queue it under the configured selection strategy.
    pub fn register_subproblem(&mut self, mut sub: Subproblem) {
        sub.acquire_refs(&mut self.var_pool, &mut self.con_pool);
        let key = self.queue_key(&sub);
        self.queue.push(sub, key);
    }

    fn queue_key(&self, sub: &Subproblem) -> f64 {
        match self.settings.node_selection {
            NodeSelection::BestBound => -self.internal(sub.dual_bound()),
            NodeSelection::DepthFirst => sub.depth() as f64,
        }
    }

    /// Try to improve the incumbent. On success, open nodes that can no
    /// longer beat the new primal bound are pruned and fathomed.
    pub fn update_incumbent(&mut self, x: &[f64], obj: f64) -> bool {
        if !self.incumbent.update(x, obj) {
            return false;
        }
        log::info!(
            "incumbent improved to {:.6} after {} nodes",
            obj,
            self.stats.nodes_processed
        );

        let sense = self.sense;
        let eps = self.settings.eps;
        let primal = self.incumbent.obj_val;
        let pruned = self.queue.prune(|n| !sense.better(n.dual_bound(), primal, eps));
        for mut node in pruned {
            node.release_refs(&mut self.var_pool, &mut self.con_pool);
            self.tree.fathom(node.tree_id(), FathomReason::DualDominated);
        }
        true
    }

    /// Whether a dual bound is already dominated by the primal bound.
    pub fn dual_bound_dominated(&self, bound: f64) -> bool {
        self.incumbent.has_incumbent()
            && !self
                .sense
                .better(bound, self.incumbent.obj_val, self.settings.eps)
    }

    /// Insert a generated constraint into the pool, deduplicating
    /// against parallel rows already stored. Returns `None` when the
    /// pool rejects the insert.
    pub fn insert_constraint(&mut self, con: Constraint) -> Option<usize> {
        for (id, existing) in self.con_pool.iter() {
            if existing.is_duplicate_of(&con) {
                return Some(id);
            }
        }
        let inserted = self.con_pool.insert(con);
        if inserted.is_none() {
            log::warn!("constraint pool full; discarding cut");
        }
        inserted
    }

    /// Map a value from the problem's sense to internal minimization.
    pub(crate) fn internal(&self, v: f64) -> f64 {
        match self.sense {
            ObjSense::Min => v,
            ObjSense::Max => -v,
        }
    }

    /// Map an internal minimization value back to the problem's sense.
    pub(crate) fn external(&self, v: f64) -> f64 {
        match self.sense {
            ObjSense::Min => v,
            ObjSense::Max => -v,
        }
    }

    /// A fresh LP instance from the configured backend factory.
    pub(crate) fn new_lp(&self) -> Box<dyn LpSolver> {
        (self.lp_factory)()
    }

    /// Milliseconds since the solve started.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Whether the wall-clock budget is spent.
    pub fn time_exceeded(&self) -> bool {
        self.settings
            .time_limit_ms
            .map(|limit| self.elapsed_ms() >= limit)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConSense, Constraint, Variable};

    fn toy_problem() -> Problem {
        let mut prob = Problem::new(ObjSense::Max);
        let x = prob.push_variable(Variable::binary(5.0));
        let y = prob.push_variable(Variable::binary(4.0));
        prob.push_constraint(Constraint::new(vec![(x, 1.0), (y, 1.0)], ConSense::Le, 1.0));
        prob
    }

    #[test]
    fn test_new_seeds_pools() {
        let master = Master::new(toy_problem(), EngineSettings::default()).unwrap();
        assert_eq!(master.var_pool.len(), 2);
        assert_eq!(master.con_pool.len(), 1);
        assert_eq!(master.sense, ObjSense::Max);
    }

    #[test]
    fn test_new_rejects_invalid_problem() {
        let prob = Problem::new(ObjSense::Min);
        assert!(Master::new(prob, EngineSettings::default()).is_err());
    }

    #[test]
    fn test_insert_constraint_deduplicates() {
        let mut master = Master::new(toy_problem(), EngineSettings::default()).unwrap();

        // A scaled copy of the seeded row maps to the existing slot.
        let dup = Constraint::new(vec![(0, 2.0), (1, 2.0)], ConSense::Le, 2.0);
        assert_eq!(master.insert_constraint(dup), Some(0));

        let fresh = Constraint::new(vec![(0, 1.0)], ConSense::Le, 1.0).cut();
        assert_eq!(master.insert_constraint(fresh), Some(1));
    }

    #[test]
    fn test_dual_bound_dominated() {
        let mut master = Master::new(toy_problem(), EngineSettings::default()).unwrap();
        assert!(!master.dual_bound_dominated(3.0));

        master.incumbent.update(&[1.0, 0.0], 5.0);
        // Maximization: a bound of 4 cannot beat an incumbent of 5.
        assert!(master.dual_bound_dominated(4.0));
        assert!(!master.dual_bound_dominated(6.0));
    }
}
