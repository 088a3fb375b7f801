//! The subproblem optimization engine: one node of the search tree.
//!
//! `optimize` runs the node through its phases: Activate materializes
//! the working data (LP, active sets, status arrays) from the inherited
//! snapshot and the branch rule; the cutting loop alternates LP solves
//! with separation, pricing, fixing and termination checks until it
//! yields a verdict; Branch or Fathom executes the verdict; Deactivate
//! releases every pool activation on every exit path.
//!
//! A queued node holds plain pool ids plus a reference count on each, so
//! its inherited items survive pool reclamation while it waits. The
//! heavyweight working data exists only between Activate and Deactivate.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::hooks::{Callbacks, NodeView};
use crate::lp::{BasisStatus, LpCol, LpRow, LpSolver, LpStatus, SolveMethod};
use crate::master::Master;
use crate::model::{fractionality, VarType};
use crate::pool::ActiveSet;
use crate::search::branching::{BranchCandidate, BranchRule, BranchingSelector};
use crate::search::fixing::FsVarStat;
use crate::search::tailoff::TailOff;
use crate::search::tree::{FathomReason, NodeStatus};

/// Outcome of the cutting loop.
enum Verdict {
    Branch,
    Fathom(FathomReason),
    Pause,
}

/// Outcome of activation.
enum Activation {
    Ready(NodeCore),
    Abort(FathomReason),
}

/// Outcome of the non-liftable eviction check before pricing.
enum Eviction {
    /// No non-liftable constraints are active.
    Clear,
    /// This many rows were buffered for removal; retry pricing after the
    /// next flush.
    Buffered(usize),
    /// Non-liftable rows returned after an earlier eviction. Pricing
    /// stays off for the rest of this activation.
    Blocked,
}

/// Outcome of a fixing/setting pass.
enum FixOutcome {
    Applied(usize),
    Contradiction,
}

/// Working data of an active node. Allocated by Activate, dropped by
/// Deactivate; the status and bound arrays are parallel to the active
/// variable set, index == LP column.
struct NodeCore {
    lp: Box<dyn LpSolver>,
    active_vars: ActiveSet,
    active_cons: ActiveSet,

    var_stat: Vec<FsVarStat>,
    local_lb: Vec<f64>,
    local_ub: Vec<f64>,

    /// Buffered pool ids to add (flushed after removals).
    add_vars: Vec<usize>,
    add_cons: Vec<usize>,

    /// Buffered LP indices to remove.
    remove_vars: Vec<usize>,
    remove_cons: Vec<usize>,

    /// Last LP point, dense over variable pool ids.
    x: Vec<f64>,

    /// Last LP value in the problem's optimization sense.
    lp_value: f64,

    solved_once: bool,
    rows_added: bool,
    cols_added: bool,

    /// Pricing was blocked by non-liftable constraints and must be
    /// retried after the eviction flush.
    retry_pricing: bool,

    /// Non-liftable constraints were already evicted once. If they come
    /// back (re-added as violated), pricing stays blocked: their absent
    /// coefficients are unknown, so new columns cannot be lifted.
    evicted_non_liftable: bool,

    tailoff: TailOff,
}

/// One node of the branch-and-bound tree.
pub struct Subproblem {
    pub(crate) tree_id: usize,
    pub(crate) depth: usize,

    /// Proven dual bound in the problem's sense.
    pub(crate) dual_bound: f64,

    branch_rule: Option<BranchRule>,

    /// Inherited snapshot: pool ids, pinned statuses and local bounds
    /// from the parent at branching time.
    inherited_vars: Vec<usize>,
    inherited_cons: Vec<usize>,
    inherited_stats: Vec<(usize, FsVarStat)>,
    inherited_bounds: Vec<(usize, f64, f64)>,

    /// Pool ids this node holds a reference on while queued.
    ref_vars: Vec<usize>,
    ref_cons: Vec<usize>,
    holds_refs: bool,

    /// Total cutting-loop iterations across activations.
    iters: u64,
}

impl Subproblem {
    /// Create the root node over the given initial pool ids.
    pub(crate) fn root(
        tree_id: usize,
        dual_bound: f64,
        vars: Vec<usize>,
        cons: Vec<usize>,
    ) -> Self {
        Self {
            tree_id,
            depth: 0,
            dual_bound,
            branch_rule: None,
            inherited_vars: vars,
            inherited_cons: cons,
            inherited_stats: Vec::new(),
            inherited_bounds: Vec::new(),
            ref_vars: Vec::new(),
            ref_cons: Vec::new(),
            holds_refs: false,
            iters: 0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn child(
        tree_id: usize,
        depth: usize,
        dual_bound: f64,
        rule: BranchRule,
        vars: Vec<usize>,
        cons: Vec<usize>,
        stats: Vec<(usize, FsVarStat)>,
        bounds: Vec<(usize, f64, f64)>,
    ) -> Self {
        Self {
            tree_id,
            depth,
            dual_bound,
            branch_rule: Some(rule),
            inherited_vars: vars,
            inherited_cons: cons,
            inherited_stats: stats,
            inherited_bounds: bounds,
            ref_vars: Vec::new(),
            ref_cons: Vec::new(),
            holds_refs: false,
            iters: 0,
        }
    }

    /// Tree id of this node.
    pub fn tree_id(&self) -> usize {
        self.tree_id
    }

    /// Depth of this node.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Proven dual bound of this node.
    pub fn dual_bound(&self) -> f64 {
        self.dual_bound
    }

    /// Take a reference on every inherited pool item so none of them is
    /// reclaimed while the node waits in the open queue.
    pub(crate) fn acquire_refs(
        &mut self,
        var_pool: &mut crate::pool::Pool<crate::model::Variable>,
        con_pool: &mut crate::pool::Pool<crate::model::Constraint>,
    ) {
        debug_assert!(!self.holds_refs);
        self.ref_vars = self.inherited_vars.clone();
        self.ref_cons = self.inherited_cons.clone();
        for &id in &self.ref_vars {
            var_pool.activate(id);
        }
        for &id in &self.ref_cons {
            con_pool.activate(id);
        }
        self.holds_refs = true;
    }

    /// Release the queued references. Idempotent.
    pub(crate) fn release_refs(
        &mut self,
        var_pool: &mut crate::pool::Pool<crate::model::Variable>,
        con_pool: &mut crate::pool::Pool<crate::model::Constraint>,
    ) {
        if !self.holds_refs {
            return;
        }
        for &id in &self.ref_vars {
            var_pool.deactivate(id);
        }
        for &id in &self.ref_cons {
            con_pool.deactivate(id);
        }
        self.ref_vars.clear();
        self.ref_cons.clear();
        self.holds_refs = false;
    }

    /// Optimize this node: Activate, cutting loop, Branch/Fathom/Pause,
    /// Deactivate. Working data is torn down on every exit path.
    pub fn optimize(
        &mut self,
        master: &mut Master,
        hooks: &mut dyn Callbacks,
    ) -> EngineResult<()> {
        master.tree.set_status(self.tree_id, NodeStatus::Active);
        log::debug!(
            "node {}: activating at depth {} (bound {:.6})",
            self.tree_id,
            self.depth,
            self.dual_bound
        );

        let mut core = match self.activate(master) {
            Activation::Ready(core) => core,
            Activation::Abort(reason) => {
                master.tree.fathom(self.tree_id, reason);
                self.release_refs(&mut master.var_pool, &mut master.con_pool);
                return Ok(());
            }
        };

        let outcome = self.drive(&mut core, master, hooks);

        let mut paused = false;
        let finish = match outcome {
            Ok(Verdict::Branch) => self.branch(&mut core, master, hooks),
            Ok(Verdict::Fathom(reason)) => {
                master.tree.fathom(self.tree_id, reason);
                Ok(())
            }
            Ok(Verdict::Pause) => {
                self.snapshot_from(&core);
                master.tree.set_status(self.tree_id, NodeStatus::Dormant);
                log::debug!("node {}: pausing", self.tree_id);
                paused = true;
                Ok(())
            }
            Err(e) => Err(e),
        };

        // Deactivate: runs on every exit path, including errors.
        core.active_vars.release(&mut master.var_pool);
        core.active_cons.release(&mut master.con_pool);
        self.release_refs(&mut master.var_pool, &mut master.con_pool);
        if paused {
            // A dormant node keeps its (refreshed) snapshot alive.
            self.acquire_refs(&mut master.var_pool, &mut master.con_pool);
        }

        finish
    }

    /// Refresh the inherited snapshot from the current working data,
    /// used when the node goes dormant mid-optimization.
    fn snapshot_from(&mut self, core: &NodeCore) {
        self.inherited_vars = core.active_vars.iter().collect();
        self.inherited_cons = core.active_cons.iter().collect();
        self.inherited_stats = self
            .inherited_vars
            .iter()
            .enumerate()
            .filter(|&(j, _)| core.var_stat[j].is_pinned())
            .map(|(j, &id)| (id, core.var_stat[j]))
            .collect();
        self.inherited_bounds = self
            .inherited_vars
            .iter()
            .enumerate()
            .map(|(j, &id)| (id, core.local_lb[j], core.local_ub[j]))
            .collect();
    }

    /// Materialize the node's working data.
    ///
    /// Fails (to a Fathom verdict) on a bound crash, on a branch rule or
    /// global fixing that contradicts the inherited state, and never
    /// raises an error of its own.
    fn activate(&mut self, master: &mut Master) -> Activation {
        if master.dual_bound_dominated(self.dual_bound) {
            return Activation::Abort(FathomReason::BoundCrash);
        }

        let eps = master.settings.eps;
        let stat_of: HashMap<usize, FsVarStat> = self.inherited_stats.iter().copied().collect();
        let bnd_of: HashMap<usize, (f64, f64)> = self
            .inherited_bounds
            .iter()
            .map(|&(id, lb, ub)| (id, (lb, ub)))
            .collect();

        let mut var_stat = Vec::with_capacity(self.inherited_vars.len());
        let mut local_lb = Vec::with_capacity(self.inherited_vars.len());
        let mut local_ub = Vec::with_capacity(self.inherited_vars.len());

        for &id in &self.inherited_vars {
            let var = master.var_pool.get(id);
            let (lb, ub) = bnd_of.get(&id).copied().unwrap_or((var.lb, var.ub));
            var_stat.push(stat_of.get(&id).copied().unwrap_or(FsVarStat::Free));
            local_lb.push(lb);
            local_ub.push(ub);
        }

        // Apply this node's branch rule.
        if let Some(rule) = self.branch_rule {
            let Some(j) = self.inherited_vars.iter().position(|&id| id == rule.var()) else {
                // The branched variable was active in the parent, so it
                // must be in the snapshot.
                return Activation::Abort(FathomReason::Contradiction);
            };
            match rule {
                BranchRule::SetBinary { value, .. } => {
                    let v = if value { 1.0 } else { 0.0 };
                    if var_stat[j].contradicts(v, eps) {
                        return Activation::Abort(FathomReason::Contradiction);
                    }
                    var_stat[j] = FsVarStat::Set(v);
                    local_lb[j] = v;
                    local_ub[j] = v;
                }
                BranchRule::BoundSplit { lower, bound, .. } => {
                    if lower {
                        local_lb[j] = local_lb[j].max(bound);
                    } else {
                        local_ub[j] = local_ub[j].min(bound);
                    }
                    if local_lb[j] > local_ub[j] + eps {
                        return Activation::Abort(FathomReason::Contradiction);
                    }
                    if let Some(v) = var_stat[j].value() {
                        if v < local_lb[j] - eps || v > local_ub[j] + eps {
                            return Activation::Abort(FathomReason::Contradiction);
                        }
                    }
                }
            }
        }

        // Reconcile with globally fixed variables.
        for (j, &id) in self.inherited_vars.iter().enumerate() {
            let Some(&v) = master.global_fixed.get(&id) else {
                continue;
            };
            if var_stat[j].contradicts(v, eps)
                || v < local_lb[j] - eps
                || v > local_ub[j] + eps
            {
                return Activation::Abort(FathomReason::Contradiction);
            }
            var_stat[j] = FsVarStat::Fixed(v);
        }

        // Collapse pinned bounds.
        for j in 0..var_stat.len() {
            if let Some(v) = var_stat[j].value() {
                local_lb[j] = v;
                local_ub[j] = v;
            }
        }

        // Build the active sets and the LP: columns first, then rows
        // mapped through the variable positions.
        let active_vars = ActiveSet::from_ids(&mut master.var_pool, &self.inherited_vars);
        let active_cons = ActiveSet::from_ids(&mut master.con_pool, &self.inherited_cons);

        let mut lp = master.new_lp();
        let infinity = master.settings.infinity;
        let mut cols = Vec::with_capacity(self.inherited_vars.len());
        for (j, &id) in self.inherited_vars.iter().enumerate() {
            let var = master.var_pool.get(id);
            let ub = if local_ub[j] >= infinity {
                f64::INFINITY
            } else {
                local_ub[j]
            };
            cols.push(LpCol {
                obj: master.internal(var.obj),
                lb: local_lb[j],
                ub,
                entries: Vec::new(),
            });
        }
        lp.add_cols(cols);

        let mut rows = Vec::with_capacity(self.inherited_cons.len());
        for &id in &self.inherited_cons {
            let con = master.con_pool.get(id);
            let coefs = con
                .row
                .iter()
                .filter_map(|(vid, &a)| active_vars.lp_index(vid).map(|c| (c, a)))
                .collect();
            rows.push(LpRow {
                coefs,
                sense: con.sense,
                rhs: con.rhs,
            });
        }
        lp.add_rows(rows);

        Activation::Ready(NodeCore {
            lp,
            active_vars,
            active_cons,
            var_stat,
            local_lb,
            local_ub,
            add_vars: Vec::new(),
            add_cons: Vec::new(),
            remove_vars: Vec::new(),
            remove_cons: Vec::new(),
            x: Vec::new(),
            lp_value: master.sense.worst(),
            solved_once: false,
            rows_added: false,
            cols_added: false,
            retry_pricing: false,
            evicted_non_liftable: false,
            tailoff: TailOff::new(
                master.settings.tailoff_len,
                master.settings.tailoff_percent,
            ),
        })
    }

    /// The cutting-plane loop. Runs until a verdict is reached.
    fn drive(
        &mut self,
        core: &mut NodeCore,
        master: &mut Master,
        hooks: &mut dyn Callbacks,
    ) -> EngineResult<Verdict> {
        let mut local_iter: u64 = 0;
        loop {
            local_iter += 1;
            self.iters += 1;

            // 1. Flush buffered removals, then additions.
            self.flush(core, master);

            // 2. Pick a re-solve method from what changed.
            let method = if !core.solved_once {
                SolveMethod::Barrier
            } else if core.rows_added && !core.cols_added {
                SolveMethod::Dual
            } else {
                SolveMethod::Primal
            };
            core.rows_added = false;
            core.cols_added = false;

            // 3. Solve and classify.
            master.stats.lps_solved += 1;
            match core.lp.optimize(method)? {
                LpStatus::Optimal => {}
                LpStatus::Infeasible => {
                    if self.repair_pricing(core, master) > 0 {
                        continue;
                    }
                    return Ok(Verdict::Fathom(FathomReason::LpInfeasible));
                }
                LpStatus::Unbounded => {
                    return Err(EngineError::SolverFailure(format!(
                        "node {}: relaxation is unbounded",
                        self.tree_id
                    )));
                }
            }
            core.solved_once = true;
            self.extract(core, master);
            core.tailoff.update(core.lp_value);
            self.age_items(core, master);

            // 4. Prune against the primal bound.
            if master.dual_bound_dominated(core.lp_value) {
                return Ok(Verdict::Fathom(FathomReason::DualDominated));
            }
            if master.settings.guarantee > 0.0
                && master
                    .incumbent
                    .gap_closed(core.lp_value, master.settings.guarantee)
            {
                return Ok(Verdict::Fathom(FathomReason::GuaranteeReached));
            }

            // 5. A discrete-feasible LP point updates the incumbent; the
            // node is solved unless pricing still finds columns.
            if self.integer_feasible(core, master) {
                // A pending pricing retry runs before evicted rows are
                // pulled back in, while the lifting path is still clear.
                if core.retry_pricing && self.price(core, master, hooks) > 0 {
                    continue;
                }
                if self.add_violated_pool_cons(core, master) > 0 {
                    continue;
                }
                let obj = self.objective_of(core, master);
                master.update_incumbent(&core.x, obj);
                if self.price(core, master, hooks) == 0 {
                    return Ok(Verdict::Fathom(FathomReason::IntegerOptimal));
                }
                continue;
            }

            // 6. Primal heuristic.
            let improved = {
                let heur = {
                    let view = self.view(core, master);
                    hooks.improve(&view)
                };
                match heur {
                    Some((hx, hobj)) => master.update_incumbent(&hx, hobj),
                    None => false,
                }
            };
            if improved {
                core.tailoff.reset();
            }

            // Fixing and setting: reduced costs plus logical hooks.
            match self.fix_and_set(core, master, hooks) {
                FixOutcome::Contradiction => {
                    return Ok(Verdict::Fathom(FathomReason::Contradiction));
                }
                FixOutcome::Applied(n) if n > 0 => continue,
                FixOutcome::Applied(_) => {}
            }

            // 7. Termination checks apply only when nothing was added.
            if self.has_pending(core) {
                continue;
            }
            if let Some(verdict) = self.check_termination(core, master, hooks) {
                // A final pricing pass may cancel the verdict.
                if self.price(core, master, hooks) > 0 {
                    continue;
                }
                return Ok(verdict);
            }

            // 8. Separate or price; nothing found either way means the
            // relaxation cannot be tightened further here.
            let pricing_due = core.retry_pricing
                || (master.settings.pricing_freq > 0
                    && local_iter % master.settings.pricing_freq == 0);
            let found = if pricing_due {
                self.price(core, master, hooks) > 0 || self.separate(core, master, hooks) > 0
            } else {
                self.separate(core, master, hooks) > 0 || self.price(core, master, hooks) > 0
            };
            if !found {
                return Ok(Verdict::Branch);
            }
        }
    }

    /// Flush buffered removals, then additions, into the active sets and
    /// the LP. Removals go first so the buffered LP indices stay valid.
    fn flush(&mut self, core: &mut NodeCore, master: &mut Master) {
        if !core.remove_cons.is_empty() && !core.add_cons.is_empty() {
            log::warn!(
                "node {}: simultaneous constraint additions and removals",
                self.tree_id
            );
        }
        if !core.remove_vars.is_empty() && !core.add_vars.is_empty() {
            log::warn!(
                "node {}: simultaneous variable additions and removals",
                self.tree_id
            );
        }

        if !core.remove_cons.is_empty() {
            let mut rows = std::mem::take(&mut core.remove_cons);
            rows.sort_unstable();
            rows.dedup();
            core.lp.remove_rows(&rows);
            core.active_cons.remove_many(&mut master.con_pool, &rows);
        }
        if !core.remove_vars.is_empty() {
            let mut cols = std::mem::take(&mut core.remove_vars);
            cols.sort_unstable();
            cols.dedup();
            core.lp.remove_cols(&cols);
            core.active_vars.remove_many(&mut master.var_pool, &cols);
            for &c in cols.iter().rev() {
                core.var_stat.remove(c);
                core.local_lb.remove(c);
                core.local_ub.remove(c);
            }
        }

        // Rows first; the columns added below carry their entries for
        // these new rows, so no cross term is lost.
        if !core.add_cons.is_empty() {
            let ids = std::mem::take(&mut core.add_cons);
            let mut rows = Vec::with_capacity(ids.len());
            for &id in &ids {
                let con = master.con_pool.get(id);
                let coefs = con
                    .row
                    .iter()
                    .filter_map(|(vid, &a)| core.active_vars.lp_index(vid).map(|c| (c, a)))
                    .collect();
                rows.push(LpRow {
                    coefs,
                    sense: con.sense,
                    rhs: con.rhs,
                });
            }
            for &id in &ids {
                core.active_cons.insert(&mut master.con_pool, id);
            }
            core.lp.add_rows(rows);
            core.rows_added = true;
            master.stats.cuts_added += ids.len() as u64;
        }
        if !core.add_vars.is_empty() {
            let ids = std::mem::take(&mut core.add_vars);
            let mut cols = Vec::with_capacity(ids.len());
            for &id in &ids {
                let var = master.var_pool.get(id);
                let mut lb = var.lb;
                let mut ub = if var.ub >= master.settings.infinity {
                    f64::INFINITY
                } else {
                    var.ub
                };
                let mut stat = FsVarStat::Free;
                if let Some(&v) = master.global_fixed.get(&id) {
                    stat = FsVarStat::Fixed(v);
                    lb = v;
                    ub = v;
                }
                let entries = core
                    .active_cons
                    .iter()
                    .enumerate()
                    .filter_map(|(r, cid)| {
                        let a = master.con_pool.get(cid).coef(id);
                        (a != 0.0).then_some((r, a))
                    })
                    .collect();
                cols.push(LpCol {
                    obj: master.internal(var.obj),
                    lb,
                    ub,
                    entries,
                });
                core.var_stat.push(stat);
                core.local_lb.push(lb);
                core.local_ub.push(ub);
            }
            for &id in &ids {
                core.active_vars.insert(&mut master.var_pool, id);
            }
            core.lp.add_cols(cols);
            core.cols_added = true;
            master.stats.vars_priced += ids.len() as u64;
        }

        debug_assert_eq!(core.active_vars.len(), core.lp.num_cols());
        debug_assert_eq!(core.active_cons.len(), core.lp.num_rows());
        debug_assert_eq!(core.active_vars.len(), core.var_stat.len());
    }

    /// Cache the LP point keyed by pool id and report the new bound.
    fn extract(&mut self, core: &mut NodeCore, master: &mut Master) {
        core.x.clear();
        core.x.resize(master.var_pool.len(), 0.0);
        for (j, id) in core.active_vars.iter().enumerate() {
            core.x[id] = core.lp.x_val(j);
        }
        let z = core.lp.obj_value();
        core.lp_value = master.external(z);
        master.tree.set_dual_bound(self.tree_id, core.lp_value);
        self.dual_bound = master.tree.dual_bound(self.tree_id);
    }

    /// Age dynamic items that look redundant at the current optimum and
    /// buffer the over-aged ones for removal.
    fn age_items(&self, core: &mut NodeCore, master: &Master) {
        let s = &master.settings;
        for r in 0..core.active_cons.len() {
            let id = core.active_cons.pool_id(r);
            let con = master.con_pool.get(id);
            let redundant = con.dynamic
                && core.lp.y_val(r).abs() <= s.eps
                && core.lp.row_status(r) == BasisStatus::Basic;
            if redundant {
                core.active_cons.age_item(r);
                if core.active_cons.age(r) > s.max_con_age {
                    core.remove_cons.push(r);
                }
            } else {
                core.active_cons.reset_age(r);
            }
        }

        for j in 0..core.active_vars.len() {
            let id = core.active_vars.pool_id(j);
            let var = master.var_pool.get(id);
            let redundant = var.dynamic
                && !core.var_stat[j].is_pinned()
                && core.lp.col_status(j) == BasisStatus::AtLower
                && core.local_lb[j] == 0.0
                && core.lp.reduced_cost(j) > s.eps;
            if redundant {
                core.active_vars.age_item(j);
                if core.active_vars.age(j) > s.max_var_age {
                    core.remove_vars.push(j);
                }
            } else {
                core.active_vars.reset_age(j);
            }
        }
    }

    /// Check whether every active discrete variable is integral.
    fn integer_feasible(&self, core: &NodeCore, master: &Master) -> bool {
        for (j, id) in core.active_vars.iter().enumerate() {
            let var = master.var_pool.get(id);
            if var.vtype.is_discrete()
                && fractionality(core.lp.x_val(j)) > master.settings.int_feas_tol
            {
                return false;
            }
        }
        true
    }

    /// Buffer inactive pool constraints violated by the current point.
    fn add_violated_pool_cons(&self, core: &mut NodeCore, master: &Master) -> usize {
        let mut found = 0;
        for (id, con) in master.con_pool.iter() {
            if found >= master.settings.max_con_add {
                break;
            }
            if core.active_cons.contains(id) || core.add_cons.contains(&id) {
                continue;
            }
            if con.violation(&core.x) > master.settings.min_violation {
                core.add_cons.push(id);
                found += 1;
            }
        }
        found
    }

    /// Objective value of the cached point in the problem's sense.
    fn objective_of(&self, core: &NodeCore, master: &Master) -> f64 {
        core.active_vars
            .iter()
            .map(|id| master.var_pool.get(id).obj * core.x[id])
            .sum()
    }

    /// Fixing and setting pass: reduced-cost fixing plus the logical
    /// implication hooks. A contradiction is fatal to the node.
    fn fix_and_set(
        &self,
        core: &mut NodeCore,
        master: &mut Master,
        hooks: &mut dyn Callbacks,
    ) -> FixOutcome {
        let eps = master.settings.eps;
        let mut applied = 0;

        // Reduced-cost fixing: a non-basic discrete variable whose unit
        // bound flip pushes the objective past the primal bound cannot
        // move in any improving solution.
        if master.incumbent.has_incumbent() {
            let z = master.internal(core.lp_value);
            let primal = master.internal(master.incumbent.obj_val);
            let at_root = self.tree_id == master.tree.root();
            for j in 0..core.active_vars.len() {
                let id = core.active_vars.pool_id(j);
                let var = master.var_pool.get(id);
                if !var.vtype.is_discrete() || core.var_stat[j].is_pinned() {
                    continue;
                }
                let status = core.lp.col_status(j);
                if status == BasisStatus::Basic {
                    continue;
                }
                let d = core.lp.reduced_cost(j).abs();
                if z + d <= primal - eps {
                    continue;
                }
                let val = if status == BasisStatus::AtLower {
                    core.local_lb[j]
                } else {
                    core.local_ub[j]
                };
                if !val.is_finite() {
                    continue;
                }
                core.var_stat[j] = if at_root {
                    FsVarStat::Fixed(val)
                } else {
                    FsVarStat::Set(val)
                };
                core.local_lb[j] = val;
                core.local_ub[j] = val;
                core.lp.change_bounds(j, val, val);
                if at_root {
                    master.global_fixed.insert(id, val);
                }
                applied += 1;
            }
            if applied > 0 {
                log::debug!(
                    "node {}: reduced-cost pinned {} variables",
                    self.tree_id,
                    applied
                );
            }
        }

        let (fixes, sets) = {
            let view = self.view(core, master);
            (hooks.fix_by_logic(&view), hooks.set_by_logic(&view))
        };
        for (id, val) in fixes {
            match self.apply_pin(core, master, id, val, true) {
                None => return FixOutcome::Contradiction,
                Some(true) => applied += 1,
                Some(false) => {}
            }
        }
        for (id, val) in sets {
            match self.apply_pin(core, master, id, val, false) {
                None => return FixOutcome::Contradiction,
                Some(true) => applied += 1,
                Some(false) => {}
            }
        }

        FixOutcome::Applied(applied)
    }

    /// Pin a variable to a value. Returns `None` on a contradiction,
    /// `Some(true)` if the pin changed state.
    fn apply_pin(
        &self,
        core: &mut NodeCore,
        master: &mut Master,
        id: usize,
        val: f64,
        permanent: bool,
    ) -> Option<bool> {
        let eps = master.settings.eps;

        let Some(j) = core.active_vars.lp_index(id) else {
            if permanent {
                if let Some(&old) = master.global_fixed.get(&id) {
                    if (old - val).abs() > eps {
                        return None;
                    }
                    return Some(false);
                }
                master.global_fixed.insert(id, val);
                return Some(true);
            }
            log::debug!(
                "node {}: ignoring set of inactive variable {}",
                self.tree_id,
                id
            );
            return Some(false);
        };

        if core.var_stat[j].contradicts(val, eps) {
            return None;
        }
        if val < core.local_lb[j] - eps || val > core.local_ub[j] + eps {
            return None;
        }
        let already = core.var_stat[j].value().is_some();
        core.var_stat[j] = if permanent {
            FsVarStat::Fixed(val)
        } else {
            FsVarStat::Set(val)
        };
        core.local_lb[j] = val;
        core.local_ub[j] = val;
        core.lp.change_bounds(j, val, val);
        if permanent {
            master.global_fixed.insert(id, val);
        }
        Some(!already)
    }

    /// Whether any add/remove buffer is non-empty.
    fn has_pending(&self, core: &NodeCore) -> bool {
        !core.add_vars.is_empty()
            || !core.add_cons.is_empty()
            || !core.remove_vars.is_empty()
            || !core.remove_cons.is_empty()
    }

    /// Evaluate the forced-termination conditions in priority order.
    fn check_termination(
        &self,
        core: &mut NodeCore,
        master: &Master,
        hooks: &mut dyn Callbacks,
    ) -> Option<Verdict> {
        let tailing = core.tailoff.tailing_off(master.sense);
        let mut keep_cutting = false;
        {
            let view = self.view(core, master);
            if hooks.exception_fathom(&view) {
                return Some(Verdict::Fathom(FathomReason::ExceptionFathom));
            }
            if hooks.exception_branch(&view) {
                return Some(Verdict::Branch);
            }
            if master.time_exceeded() {
                return Some(Verdict::Fathom(FathomReason::TimeLimit));
            }
            if tailing {
                keep_cutting = hooks.keep_cutting_on_tailoff(&view);
                if !keep_cutting {
                    log::debug!("node {}: tailing off, branching", self.tree_id);
                    return Some(Verdict::Branch);
                }
            }
            if hooks.pausing(&view) {
                return Some(Verdict::Pause);
            }
        }
        if tailing && keep_cutting {
            core.tailoff.reset();
        }
        if let Some(cap) = master.settings.max_iterations {
            if self.iters >= cap {
                return Some(Verdict::Branch);
            }
        }
        None
    }

    /// Price inactive pool variables into the node.
    ///
    /// Active non-liftable constraints block lifting new columns; they
    /// are buffered for eviction first and pricing retried after the
    /// flush. Returns the number of buffered changes.
    fn price(&self, core: &mut NodeCore, master: &mut Master, hooks: &mut dyn Callbacks) -> usize {
        match self.evict_non_liftable(core, master) {
            Eviction::Buffered(n) => {
                core.retry_pricing = true;
                return n;
            }
            Eviction::Blocked => return 0,
            Eviction::Clear => {}
        }
        core.retry_pricing = false;

        let max_add = master.settings.max_var_add;
        let mut buffered = 0;

        // Hook-proposed columns first.
        let proposed = {
            let view = self.view(core, master);
            hooks.pricing(&view)
        };
        for id in proposed {
            if buffered >= max_add {
                break;
            }
            if !master.var_pool.contains(id)
                || core.active_vars.contains(id)
                || core.add_vars.contains(&id)
            {
                continue;
            }
            core.add_vars.push(id);
            buffered += 1;
        }

        // Default scan: inactive columns violating dual feasibility,
        // ranked by violation.
        let mut cands: Vec<(usize, f64)> = Vec::new();
        for (id, var) in master.var_pool.iter() {
            if core.active_vars.contains(id) || core.add_vars.contains(&id) {
                continue;
            }
            let mut rc = master.internal(var.obj);
            for (r, cid) in core.active_cons.iter().enumerate() {
                let a = master.con_pool.get(cid).coef(id);
                if a != 0.0 {
                    rc -= core.lp.y_val(r) * a;
                }
            }
            if rc < -master.settings.eps {
                cands.push((id, -rc));
            }
        }
        cands.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        for (id, _viol) in cands.into_iter().take(max_add.saturating_sub(buffered)) {
            core.add_vars.push(id);
            buffered += 1;
        }

        if buffered > 0 {
            log::debug!("node {}: priced {} variables", self.tree_id, buffered);
        }
        buffered
    }

    /// Buffer eviction of the active non-liftable constraints, once per
    /// activation. Pricing is blocked for good if they return.
    fn evict_non_liftable(&self, core: &mut NodeCore, master: &Master) -> Eviction {
        let evict: Vec<usize> = core
            .active_cons
            .iter()
            .enumerate()
            .filter(|&(_, id)| !master.con_pool.get(id).liftable)
            .map(|(r, _)| r)
            .collect();
        if evict.is_empty() {
            return Eviction::Clear;
        }
        if core.evicted_non_liftable {
            return Eviction::Blocked;
        }
        log::debug!(
            "node {}: evicting {} non-liftable constraints before pricing",
            self.tree_id,
            evict.len()
        );
        core.evicted_non_liftable = true;
        let n = evict.len();
        core.remove_cons.extend(evict);
        Eviction::Buffered(n)
    }

    /// Attempt to repair an infeasible LP by pricing in variables with
    /// support on the certificate rows.
    fn repair_pricing(&self, core: &mut NodeCore, master: &mut Master) -> usize {
        match self.evict_non_liftable(core, master) {
            Eviction::Buffered(n) => {
                core.retry_pricing = true;
                return n;
            }
            Eviction::Blocked => return 0,
            Eviction::Clear => {}
        }

        let Some(cert) = core.lp.infeasible_rows() else {
            return 0;
        };
        let max_add = master.settings.max_var_add;
        let mut buffered = 0;
        for &row in &cert.rows {
            if row >= core.active_cons.len() {
                continue;
            }
            let cid = core.active_cons.pool_id(row);
            let con = master.con_pool.get(cid);
            for (vid, _) in con.row.iter() {
                if buffered >= max_add {
                    break;
                }
                if !master.var_pool.contains(vid)
                    || core.active_vars.contains(vid)
                    || core.add_vars.contains(&vid)
                {
                    continue;
                }
                core.add_vars.push(vid);
                buffered += 1;
            }
        }
        if buffered > 0 {
            log::debug!(
                "node {}: repair pricing buffered {} variables",
                self.tree_id,
                buffered
            );
        }
        buffered
    }

    /// Primal separation: violated inactive pool constraints plus the
    /// separation hook. Returns the number of buffered cuts.
    fn separate(&self, core: &mut NodeCore, master: &mut Master, hooks: &mut dyn Callbacks) -> usize {
        let mut found = self.add_violated_pool_cons(core, master);

        let cuts = {
            let view = self.view(core, master);
            hooks.separate(&view)
        };
        for cut in cuts {
            if found >= master.settings.max_con_add {
                break;
            }
            if cut.violation(&core.x) < master.settings.min_violation {
                continue;
            }
            let Some(id) = master.insert_constraint(cut) else {
                continue;
            };
            if core.active_cons.contains(id) || core.add_cons.contains(&id) {
                continue;
            }
            core.add_cons.push(id);
            found += 1;
        }
        if found > 0 {
            log::debug!("node {}: separated {} constraints", self.tree_id, found);
        }
        found
    }

    /// Execute the branch verdict: select a variable, create two
    /// children, and register them with the master.
    fn branch(
        &mut self,
        core: &mut NodeCore,
        master: &mut Master,
        hooks: &mut dyn Callbacks,
    ) -> EngineResult<()> {
        let int_tol = master.settings.int_feas_tol;
        let eps = master.settings.eps;

        let mut cands: Vec<BranchCandidate> = Vec::new();
        for j in 0..core.active_vars.len() {
            let id = core.active_vars.pool_id(j);
            let var = master.var_pool.get(id);
            if !var.vtype.is_discrete() || core.var_stat[j].is_pinned() {
                continue;
            }
            if core.local_ub[j] - core.local_lb[j] <= eps {
                continue;
            }
            let value = core.x[id];
            cands.push(BranchCandidate {
                var: id,
                lp_col: j,
                value,
                frac: fractionality(value),
                obj: var.obj.abs(),
                lb: core.local_lb[j],
                ub: core.local_ub[j],
                binary: var.vtype == VarType::Binary,
            });
        }

        // Prefer fractional candidates; under numeric slack any
        // splittable discrete variable will do.
        let fractional: Vec<BranchCandidate> =
            cands.iter().copied().filter(|c| c.frac > int_tol).collect();
        let defaults = if fractional.is_empty() { cands } else { fractional };
        let finalists = {
            let view = self.view(core, master);
            hooks.select_candidates(&view, &defaults).unwrap_or(defaults)
        };

        let selector = BranchingSelector::new(master.settings.branching_rule, int_tol);
        let parent_internal = master.internal(core.lp_value);
        let decision = selector.select(&finalists, parent_internal, core.lp.as_mut())?;

        let Some(mut decision) = decision else {
            master.tree.fathom(self.tree_id, FathomReason::NoBranchCandidate);
            return Ok(());
        };
        let custom = {
            let view = self.view(core, master);
            hooks.branch_rules(&view, &decision)
        };
        if let Some((down, up)) = custom {
            decision.down = down;
            decision.up = up;
        }
        log::debug!(
            "node {}: branching on variable {} at {:.6}",
            self.tree_id,
            decision.var,
            decision.value
        );

        // Snapshot the working state for both children.
        let vars: Vec<usize> = core.active_vars.iter().collect();
        let cons: Vec<usize> = core.active_cons.iter().collect();
        let stats: Vec<(usize, FsVarStat)> = vars
            .iter()
            .enumerate()
            .filter(|&(j, _)| core.var_stat[j].is_pinned())
            .map(|(j, &id)| (id, core.var_stat[j]))
            .collect();
        let bounds: Vec<(usize, f64, f64)> = vars
            .iter()
            .enumerate()
            .map(|(j, &id)| (id, core.local_lb[j], core.local_ub[j]))
            .collect();

        for rule in [decision.down, decision.up] {
            let child_id = master.tree.add_child(self.tree_id, self.dual_bound);
            let child = Subproblem::child(
                child_id,
                self.depth + 1,
                self.dual_bound,
                rule,
                vars.clone(),
                cons.clone(),
                stats.clone(),
                bounds.clone(),
            );
            master.register_subproblem(child);
        }
        master.tree.set_status(self.tree_id, NodeStatus::Processed);
        Ok(())
    }

    /// Build the read-only view handed to hooks.
    fn view<'a>(&self, core: &'a NodeCore, master: &Master) -> NodeView<'a> {
        NodeView {
            node_id: self.tree_id,
            depth: self.depth,
            x: &core.x,
            lp_value: core.lp_value,
            dual_bound: self.dual_bound,
            primal_bound: master.incumbent.obj_val,
            has_incumbent: master.incumbent.has_incumbent(),
        }
    }
}
