//! Configuration settings for the branch-and-cut engine.

/// Optimization sense of the objective function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjSense {
    /// Minimize the objective.
    #[default]
    Min,

    /// Maximize the objective.
    Max,
}

impl ObjSense {
    /// Returns true if `a` is a strictly better objective value than `b`.
    pub fn better(&self, a: f64, b: f64, eps: f64) -> bool {
        match self {
            ObjSense::Min => a < b - eps,
            ObjSense::Max => a > b + eps,
        }
    }

    /// The worst representable objective value for this sense.
    pub fn worst(&self) -> f64 {
        match self {
            ObjSense::Min => f64::INFINITY,
            ObjSense::Max => f64::NEG_INFINITY,
        }
    }

    /// The best representable objective value for this sense.
    pub fn best(&self) -> f64 {
        match self {
            ObjSense::Min => f64::NEG_INFINITY,
            ObjSense::Max => f64::INFINITY,
        }
    }
}

/// Branching variable selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchingRule {
    /// Select the variable whose fractional part is closest to 0.5.
    #[default]
    CloseHalf,

    /// Like `CloseHalf`, but ties are broken towards variables with a
    /// large absolute objective coefficient.
    CloseHalfExpensive,

    /// Rank the top candidates by bounded trial LP re-solves and pick
    /// the one with the best worst-child bound change.
    StrongBranching {
        /// Number of candidate variables to evaluate with trial LPs.
        candidates: usize,
    },
}

/// Node selection strategy for the open-node queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Always select the open node with the best dual bound.
    #[default]
    BestBound,

    /// Depth-first search (helps find feasible solutions quickly).
    DepthFirst,
}

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    // === Termination criteria ===
    /// Maximum number of nodes to process.
    pub max_nodes: u64,

    /// Time limit in milliseconds (None = unlimited). Polled once per
    /// cutting-loop iteration; exceeding it forces a fathom verdict.
    pub time_limit_ms: Option<u64>,

    /// Required guarantee: a node whose relative gap to the primal
    /// bound drops below this fraction terminates successfully.
    pub guarantee: f64,

    /// Maximum cutting-loop iterations per node (None = unlimited).
    /// Exceeding it forces a branch verdict.
    pub max_iterations: Option<u64>,

    // === Tolerances ===
    /// Integer feasibility tolerance.
    pub int_feas_tol: f64,

    /// General numeric tolerance (reduced costs, bound comparisons).
    pub eps: f64,

    /// Value treated as infinity for variable bounds.
    pub infinity: f64,

    // === Search strategy ===
    /// Branching variable selection rule.
    pub branching_rule: BranchingRule,

    /// Node selection strategy.
    pub node_selection: NodeSelection,

    // === Tailing off ===
    /// Length of the LP value history window.
    pub tailoff_len: usize,

    /// Minimum relative improvement across the window; below this the
    /// node is considered to be tailing off.
    pub tailoff_percent: f64,

    // === Separation and pricing ===
    /// Run a pricing (dual separation) cycle every N cutting iterations
    /// instead of primal separation. 0 disables periodic pricing.
    pub pricing_freq: u64,

    /// Maximum constraints buffered for addition per iteration.
    pub max_con_add: usize,

    /// Maximum variables buffered for addition per iteration.
    pub max_var_add: usize,

    /// Remove a dynamic constraint after this many consecutive
    /// iterations with a near-zero dual value.
    pub max_con_age: u32,

    /// Remove a dynamic variable after this many consecutive
    /// iterations non-basic at a bound with a comfortable reduced cost.
    pub max_var_age: u32,

    /// Minimum violation for a separated constraint to be added.
    pub min_violation: f64,

    // === Pools ===
    /// Capacity of the global variable pool.
    pub var_pool_capacity: usize,

    /// Capacity of the global constraint pool.
    pub con_pool_capacity: usize,

    // === Output ===
    /// Print progress information.
    pub verbose: bool,

    /// Log frequency (print every N nodes).
    pub log_freq: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_nodes: 1_000_000,
            time_limit_ms: None,
            guarantee: 0.0,
            max_iterations: None,

            int_feas_tol: 1e-6,
            eps: 1e-7,
            infinity: 1e20,

            branching_rule: BranchingRule::default(),
            node_selection: NodeSelection::default(),

            tailoff_len: 10,
            tailoff_percent: 1e-4,

            pricing_freq: 0,
            max_con_add: 100,
            max_var_add: 100,
            max_con_age: 10,
            max_var_age: 10,
            min_violation: 1e-7,

            var_pool_capacity: 100_000,
            con_pool_capacity: 100_000,

            verbose: false,
            log_freq: 100,
        }
    }
}

impl EngineSettings {
    /// Create settings with verbose output enabled.
    pub fn verbose() -> Self {
        let mut s = Self::default();
        s.verbose = true;
        s.log_freq = 1;
        s
    }

    /// Set time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_ms = Some((seconds * 1000.0) as u64);
        self
    }

    /// Set maximum nodes.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = nodes;
        self
    }

    /// Set the required guarantee (relative gap).
    pub fn with_guarantee(mut self, guarantee: f64) -> Self {
        self.guarantee = guarantee;
        self
    }

    /// Set the branching rule.
    pub fn with_branching_rule(mut self, rule: BranchingRule) -> Self {
        self.branching_rule = rule;
        self
    }

    /// Set the per-node iteration cap.
    pub fn with_max_iterations(mut self, iters: u64) -> Self {
        self.max_iterations = Some(iters);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sense_comparisons() {
        assert!(ObjSense::Min.better(1.0, 2.0, 1e-9));
        assert!(!ObjSense::Min.better(2.0, 1.0, 1e-9));
        assert!(ObjSense::Max.better(2.0, 1.0, 1e-9));
        assert!(!ObjSense::Max.better(1.0, 1.0, 1e-9));

        assert_eq!(ObjSense::Min.worst(), f64::INFINITY);
        assert_eq!(ObjSense::Max.worst(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_builder_methods() {
        let s = EngineSettings::default()
            .with_time_limit(1.5)
            .with_max_nodes(42)
            .with_guarantee(0.01);

        assert_eq!(s.time_limit_ms, Some(1500));
        assert_eq!(s.max_nodes, 42);
        assert_eq!(s.guarantee, 0.01);
    }
}
