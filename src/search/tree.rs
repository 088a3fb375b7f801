//! Search-tree bookkeeping.
//!
//! Nodes live in an index arena; parent and children are stored as
//! indices, never references. The arena records per-node status and
//! dual bound and implements the upward fathoming walk: when the last
//! live child of a parent is fathomed the parent is fathomed too, and
//! when exactly one live child remains under the effective root, that
//! child is promoted (tree compaction).

use crate::settings::ObjSense;

/// Status of a search-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Created but never activated.
    Unprocessed,

    /// Currently being optimized.
    Active,

    /// Paused; waiting in the open queue to be reactivated.
    Dormant,

    /// Optimization finished by branching; children exist.
    Processed,

    /// Terminal: the node's region needs no further exploration.
    Fathomed,
}

/// Why a node was fathomed. Recorded for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FathomReason {
    /// The node's LP was infeasible and could not be repaired.
    LpInfeasible,

    /// The node's bound cannot beat the primal bound.
    DualDominated,

    /// The node's LP optimum was feasible for the discrete problem.
    IntegerOptimal,

    /// A fix/set/branch-rule conflict was detected.
    Contradiction,

    /// The required guarantee was reached.
    GuaranteeReached,

    /// The time budget expired (forced termination).
    TimeLimit,

    /// The exception-fathom hook fired.
    ExceptionFathom,

    /// No branching candidate existed.
    NoBranchCandidate,

    /// The dual bound was already dominated at activation.
    BoundCrash,

    /// All children were fathomed (propagated upward).
    ChildrenExhausted,

    /// Externally triggered subtree abort without re-optimization.
    SubtreeAbort,
}

/// Arena record for one node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    /// Parent index (None for the original root).
    pub parent: Option<usize>,

    /// Child indices.
    pub children: Vec<usize>,

    /// Depth in the tree.
    pub depth: usize,

    /// Current status.
    pub status: NodeStatus,

    /// Best proven dual bound for the node's region.
    pub dual_bound: f64,

    /// Recorded fathoming reason, if fathomed.
    pub fathom_reason: Option<FathomReason>,
}

/// The search-tree arena.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<NodeRecord>,
    root: usize,
    sense: ObjSense,
}

impl Tree {
    /// Create an empty tree.
    pub fn new(sense: ObjSense) -> Self {
        Self {
            nodes: Vec::new(),
            root: 0,
            sense,
        }
    }

    /// Create the root node, returning its id (always 0).
    pub fn add_root(&mut self, dual_bound: f64) -> usize {
        debug_assert!(self.nodes.is_empty());
        self.nodes.push(NodeRecord {
            parent: None,
            children: Vec::new(),
            depth: 0,
            status: NodeStatus::Unprocessed,
            dual_bound,
            fathom_reason: None,
        });
        self.root = 0;
        0
    }

    /// Create a child node under `parent`, returning its id.
    pub fn add_child(&mut self, parent: usize, dual_bound: f64) -> usize {
        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(NodeRecord {
            parent: Some(parent),
            children: Vec::new(),
            depth,
            status: NodeStatus::Unprocessed,
            dual_bound,
            fathom_reason: None,
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// The effective root (may differ from node 0 after compaction).
    pub fn root(&self) -> usize {
        self.root
    }

    /// Node record accessor.
    pub fn record(&self, id: usize) -> &NodeRecord {
        &self.nodes[id]
    }

    /// Status of a node.
    pub fn status(&self, id: usize) -> NodeStatus {
        self.nodes[id].status
    }

    /// Set the status of a node.
    pub fn set_status(&mut self, id: usize, status: NodeStatus) {
        self.nodes[id].status = status;
    }

    /// Dual bound of a node.
    pub fn dual_bound(&self, id: usize) -> f64 {
        self.nodes[id].dual_bound
    }

    /// Check whether a node is fathomed.
    pub fn is_fathomed(&self, id: usize) -> bool {
        self.nodes[id].status == NodeStatus::Fathomed
    }

    /// Number of nodes ever created.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of fathomed nodes.
    pub fn num_fathomed(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Fathomed)
            .count()
    }

    /// Update a node's dual bound, keeping it monotone.
    ///
    /// An attempt to set a looser bound than what is already proven is
    /// logged and ignored; the tighter bound is kept. Returns true if
    /// the bound was applied.
    pub fn set_dual_bound(&mut self, id: usize, bound: f64) -> bool {
        let current = self.nodes[id].dual_bound;
        let tighter = match self.sense {
            ObjSense::Min => bound >= current,
            ObjSense::Max => bound <= current,
        };
        if tighter {
            self.nodes[id].dual_bound = bound;
            true
        } else {
            log::debug!(
                "node {}: ignoring dual bound {:.6e} looser than proven {:.6e}",
                id,
                bound,
                current
            );
            false
        }
    }

    /// Fathom a node and propagate upward.
    pub fn fathom(&mut self, id: usize, reason: FathomReason) {
        if self.nodes[id].status == NodeStatus::Fathomed {
            return;
        }
        self.nodes[id].status = NodeStatus::Fathomed;
        self.nodes[id].fathom_reason = Some(reason);
        log::debug!("node {} fathomed: {:?}", id, reason);

        self.propagate_up(id);
        self.promote_root();
    }

    /// Fathom a whole subtree without re-optimizing any node.
    pub fn fathom_subtree(&mut self, id: usize, reason: FathomReason) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if self.nodes[n].status != NodeStatus::Fathomed {
                self.nodes[n].status = NodeStatus::Fathomed;
                self.nodes[n].fathom_reason = Some(reason);
            }
            stack.extend(self.nodes[n].children.iter().copied());
        }
        self.propagate_up(id);
        self.promote_root();
    }

    fn all_children_fathomed(&self, id: usize) -> bool {
        !self.nodes[id].children.is_empty()
            && self.nodes[id]
                .children
                .iter()
                .all(|&c| self.nodes[c].status == NodeStatus::Fathomed)
    }

    /// Walk upward: a parent whose children are all fathomed is itself
    /// fathomed, with its bound set to the valid bound of the union of
    /// the child regions.
    fn propagate_up(&mut self, from: usize) {
        let mut cur = from;
        while let Some(parent) = self.nodes[cur].parent {
            if self.nodes[parent].status == NodeStatus::Fathomed
                || !self.all_children_fathomed(parent)
            {
                break;
            }

            let bound = self.nodes[parent]
                .children
                .iter()
                .map(|&c| self.nodes[c].dual_bound)
                .fold(self.sense.worst(), |acc, b| match self.sense {
                    ObjSense::Min => acc.min(b),
                    ObjSense::Max => acc.max(b),
                });

            self.nodes[parent].dual_bound = bound;
            self.nodes[parent].status = NodeStatus::Fathomed;
            self.nodes[parent].fathom_reason = Some(FathomReason::ChildrenExhausted);
            log::debug!("node {} fathomed: all children exhausted", parent);
            cur = parent;
        }
    }

    /// Promote a sole surviving child of the effective root.
    fn promote_root(&mut self) {
        loop {
            let live: Vec<usize> = self.nodes[self.root]
                .children
                .iter()
                .copied()
                .filter(|&c| self.nodes[c].status != NodeStatus::Fathomed)
                .collect();
            if live.len() == 1 && self.nodes[self.root].status == NodeStatus::Fathomed {
                break; // nothing to promote out of a dead tree
            }
            if live.len() == 1
                && matches!(
                    self.nodes[self.root].status,
                    NodeStatus::Processed | NodeStatus::Fathomed
                )
            {
                log::debug!("promoting node {} to effective root", live[0]);
                self.root = live[0];
            } else {
                break;
            }
        }
    }
}
