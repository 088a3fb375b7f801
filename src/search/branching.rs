//! Branching rules and candidate selection.

use crate::error::EngineResult;
use crate::lp::{LpSolver, LpStatus, SolveMethod};
use crate::settings::BranchingRule as Rule;

/// The delta between a child node and its parent.
///
/// A rule is owned by the child and consumed when the child activates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BranchRule {
    /// Force a binary variable to a bound.
    SetBinary {
        /// Variable pool id.
        var: usize,
        /// The bound the variable is set to.
        value: bool,
    },

    /// Tighten one side of a general integer variable's interval.
    BoundSplit {
        /// Variable pool id.
        var: usize,
        /// True: the rule is `var >= bound`; false: `var <= bound`.
        lower: bool,
        /// The new bound.
        bound: f64,
    },
}

impl BranchRule {
    /// The branched variable's pool id.
    pub fn var(&self) -> usize {
        match self {
            BranchRule::SetBinary { var, .. } => *var,
            BranchRule::BoundSplit { var, .. } => *var,
        }
    }
}

/// A branching candidate assembled by the node.
#[derive(Debug, Clone, Copy)]
pub struct BranchCandidate {
    /// Variable pool id.
    pub var: usize,

    /// LP column index in the node's LP.
    pub lp_col: usize,

    /// Current LP value.
    pub value: f64,

    /// Fractionality (distance to the nearest integer).
    pub frac: f64,

    /// Absolute objective coefficient.
    pub obj: f64,

    /// Local lower bound.
    pub lb: f64,

    /// Local upper bound.
    pub ub: f64,

    /// Whether the variable is binary.
    pub binary: bool,
}

/// A branching decision: exactly two rules splitting the parent region.
#[derive(Debug, Clone)]
pub struct BranchDecision {
    /// Branched variable pool id.
    pub var: usize,

    /// LP value the split was derived from.
    pub value: f64,

    /// Selection score (for logging).
    pub score: f64,

    /// Rule of the "down" child.
    pub down: BranchRule,

    /// Rule of the "up" child.
    pub up: BranchRule,
}

/// Builds the rule pair for a candidate.
///
/// Binary variables get a set-to-bound pair. General integers get a
/// disjoint interval split: around the fractional value when there is
/// one, otherwise (numeric-slack fallback on an integral value) around
/// the domain midpoint.
pub fn rules_for(cand: &BranchCandidate, int_tol: f64) -> (BranchRule, BranchRule) {
    if cand.binary {
        return (
            BranchRule::SetBinary {
                var: cand.var,
                value: false,
            },
            BranchRule::SetBinary {
                var: cand.var,
                value: true,
            },
        );
    }

    let split = if cand.frac > int_tol {
        cand.value.floor()
    } else {
        ((cand.lb + cand.ub) / 2.0).floor()
    };

    (
        BranchRule::BoundSplit {
            var: cand.var,
            lower: false,
            bound: split,
        },
        BranchRule::BoundSplit {
            var: cand.var,
            lower: true,
            bound: split + 1.0,
        },
    )
}

/// Branching variable selector.
pub struct BranchingSelector {
    rule: Rule,
    int_tol: f64,
}

impl BranchingSelector {
    /// Create a selector for the configured rule.
    pub fn new(rule: Rule, int_tol: f64) -> Self {
        Self { rule, int_tol }
    }

    /// Select a branching decision from the candidate set.
    ///
    /// `parent_val` is the node's LP value in internal (minimization)
    /// form; `lp` is used for trial re-solves under strong branching.
    pub fn select(
        &self,
        candidates: &[BranchCandidate],
        parent_val: f64,
        lp: &mut dyn LpSolver,
    ) -> EngineResult<Option<BranchDecision>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let chosen = match self.rule {
            Rule::CloseHalf => self.pick_by(candidates, |c| c.frac),
            Rule::CloseHalfExpensive => self.pick_by(candidates, |c| c.frac * (1.0 + c.obj)),
            Rule::StrongBranching { candidates: k } => {
                self.pick_strong(candidates, k.max(1), parent_val, lp)?
            }
        };

        Ok(chosen.map(|(cand, score)| {
            let (down, up) = rules_for(&cand, self.int_tol);
            BranchDecision {
                var: cand.var,
                value: cand.value,
                score,
                down,
                up,
            }
        }))
    }

    fn pick_by(
        &self,
        candidates: &[BranchCandidate],
        score: impl Fn(&BranchCandidate) -> f64,
    ) -> Option<(BranchCandidate, f64)> {
        candidates
            .iter()
            .map(|c| (*c, score(c)))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Rank the most fractional finalists by trial LP re-solves.
    ///
    /// Score = the worse of the two child bound degradations; an
    /// infeasible child counts as an infinite degradation (branching
    /// there closes one side immediately).
    fn pick_strong(
        &self,
        candidates: &[BranchCandidate],
        max_candidates: usize,
        parent_val: f64,
        lp: &mut dyn LpSolver,
    ) -> EngineResult<Option<(BranchCandidate, f64)>> {
        let mut finalists: Vec<BranchCandidate> = candidates.to_vec();
        finalists.sort_by(|a, b| {
            b.frac
                .partial_cmp(&a.frac)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        finalists.truncate(max_candidates);

        let mut best: Option<(BranchCandidate, f64)> = None;
        for cand in &finalists {
            let (down, up) = rules_for(cand, self.int_tol);
            let d = self.trial(cand, &down, parent_val, lp)?;
            let u = self.trial(cand, &up, parent_val, lp)?;
            let score = d.min(u);

            log::debug!(
                "strong branch trial var {}: down {:.6e}, up {:.6e}",
                cand.var,
                d,
                u
            );

            if best.as_ref().map(|&(_, s)| score > s).unwrap_or(true) {
                best = Some((*cand, score));
            }
        }
        Ok(best)
    }

    fn trial(
        &self,
        cand: &BranchCandidate,
        rule: &BranchRule,
        parent_val: f64,
        lp: &mut dyn LpSolver,
    ) -> EngineResult<f64> {
        let (lb, ub) = match rule {
            BranchRule::SetBinary { value, .. } => {
                let v = if *value { 1.0 } else { 0.0 };
                (v, v)
            }
            BranchRule::BoundSplit { lower, bound, .. } => {
                if *lower {
                    (*bound, cand.ub)
                } else {
                    (cand.lb, *bound)
                }
            }
        };

        lp.change_bounds(cand.lp_col, lb, ub);
        let status = lp.optimize(SolveMethod::Primal);
        lp.change_bounds(cand.lp_col, cand.lb, cand.ub);

        match status? {
            LpStatus::Optimal => Ok(lp.obj_value() - parent_val),
            LpStatus::Infeasible => Ok(f64::INFINITY),
            LpStatus::Unbounded => Ok(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::DenseSimplex;

    fn cand(var: usize, value: f64, obj: f64) -> BranchCandidate {
        BranchCandidate {
            var,
            lp_col: var,
            value,
            frac: (value - value.round()).abs(),
            obj,
            lb: 0.0,
            ub: 1.0,
            binary: true,
        }
    }

    #[test]
    fn test_close_half_picks_most_fractional() {
        let selector = BranchingSelector::new(Rule::CloseHalf, 1e-6);
        let mut lp = DenseSimplex::new();
        let cands = vec![cand(0, 0.9, 1.0), cand(1, 0.5, 1.0), cand(2, 0.2, 1.0)];

        let d = selector.select(&cands, 0.0, &mut lp).unwrap().unwrap();
        assert_eq!(d.var, 1);
    }

    #[test]
    fn test_close_half_expensive_breaks_ties_by_cost() {
        let selector = BranchingSelector::new(Rule::CloseHalfExpensive, 1e-6);
        let mut lp = DenseSimplex::new();
        let cands = vec![cand(0, 0.5, 1.0), cand(1, 0.5, 10.0)];

        let d = selector.select(&cands, 0.0, &mut lp).unwrap().unwrap();
        assert_eq!(d.var, 1);
    }

    #[test]
    fn test_binary_rules_are_disjoint() {
        let c = cand(3, 0.5, 1.0);
        let (down, up) = rules_for(&c, 1e-6);
        assert_eq!(
            down,
            BranchRule::SetBinary {
                var: 3,
                value: false
            }
        );
        assert_eq!(up, BranchRule::SetBinary { var: 3, value: true });
    }

    #[test]
    fn test_integer_split_rules() {
        let c = BranchCandidate {
            var: 0,
            lp_col: 0,
            value: 2.7,
            frac: 0.3,
            obj: 1.0,
            lb: 0.0,
            ub: 5.0,
            binary: false,
        };
        let (down, up) = rules_for(&c, 1e-6);
        assert_eq!(
            down,
            BranchRule::BoundSplit {
                var: 0,
                lower: false,
                bound: 2.0
            }
        );
        assert_eq!(
            up,
            BranchRule::BoundSplit {
                var: 0,
                lower: true,
                bound: 3.0
            }
        );
    }

    #[test]
    fn test_fallback_split_on_integral_value() {
        // Integral LP value but unfixed domain: split at the midpoint.
        let c = BranchCandidate {
            var: 0,
            lp_col: 0,
            value: 2.0,
            frac: 0.0,
            obj: 1.0,
            lb: 0.0,
            ub: 5.0,
            binary: false,
        };
        let (down, up) = rules_for(&c, 1e-6);
        assert_eq!(
            down,
            BranchRule::BoundSplit {
                var: 0,
                lower: false,
                bound: 2.0
            }
        );
        assert_eq!(
            up,
            BranchRule::BoundSplit {
                var: 0,
                lower: true,
                bound: 3.0
            }
        );
    }

    #[test]
    fn test_no_candidates() {
        let selector = BranchingSelector::new(Rule::CloseHalf, 1e-6);
        let mut lp = DenseSimplex::new();
        assert!(selector.select(&[], 0.0, &mut lp).unwrap().is_none());
    }
}
