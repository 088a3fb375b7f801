//! Problem representation.

use crate::error::{EngineError, EngineResult};
use crate::settings::ObjSense;

use super::items::{Constraint, Variable};

/// A mixed-integer optimization problem.
///
/// Holds the initial variables and constraints that seed the global
/// pools. Further columns and rows may be generated during the solve by
/// pricing and separation.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Optimization sense.
    pub sense: ObjSense,

    /// Initial variables; the index in this vector becomes the
    /// variable's global pool id.
    pub variables: Vec<Variable>,

    /// Initial constraints.
    pub constraints: Vec<Constraint>,
}

impl Problem {
    /// Create an empty problem.
    pub fn new(sense: ObjSense) -> Self {
        Self {
            sense,
            variables: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add a variable, returning its id.
    pub fn push_variable(&mut self, var: Variable) -> usize {
        self.variables.push(var);
        self.variables.len() - 1
    }

    /// Add a constraint, returning its index.
    pub fn push_constraint(&mut self, con: Constraint) -> usize {
        self.constraints.push(con);
        self.constraints.len() - 1
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints.
    pub fn num_cons(&self) -> usize {
        self.constraints.len()
    }

    /// Number of discrete (integer or binary) variables.
    pub fn num_discrete(&self) -> usize {
        self.variables.iter().filter(|v| v.vtype.is_discrete()).count()
    }

    /// Validate the problem before solving.
    ///
    /// The reference LP backend shifts variables by their lower bound,
    /// so every lower bound must be finite. Constraint coefficients must
    /// reference existing variables and all numbers must be finite.
    pub fn validate(&self) -> EngineResult<()> {
        if self.variables.is_empty() {
            return Err(EngineError::InvalidProblem("no variables".to_string()));
        }

        for (i, v) in self.variables.iter().enumerate() {
            if !v.lb.is_finite() {
                return Err(EngineError::InvalidProblem(format!(
                    "variable {} has a non-finite lower bound",
                    i
                )));
            }
            if !v.obj.is_finite() {
                return Err(EngineError::InvalidProblem(format!(
                    "variable {} has a non-finite objective coefficient",
                    i
                )));
            }
            if v.lb > v.ub {
                return Err(EngineError::InvalidProblem(format!(
                    "variable {} has lb {} > ub {}",
                    i, v.lb, v.ub
                )));
            }
        }

        let n = self.variables.len();
        for (c, con) in self.constraints.iter().enumerate() {
            if !con.rhs.is_finite() {
                return Err(EngineError::InvalidProblem(format!(
                    "constraint {} has a non-finite right-hand side",
                    c
                )));
            }
            for (i, &a) in con.row.iter() {
                if i >= n {
                    return Err(EngineError::InvalidProblem(format!(
                        "constraint {} references variable {} but only {} exist",
                        c, i, n
                    )));
                }
                if !a.is_finite() {
                    return Err(EngineError::InvalidProblem(format!(
                        "constraint {} has a non-finite coefficient for variable {}",
                        c, i
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Fractionality of a value: its distance to the nearest integer.
pub fn fractionality(val: f64) -> f64 {
    (val - val.round()).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::items::ConSense;

    #[test]
    fn test_problem_construction() {
        let mut prob = Problem::new(ObjSense::Max);
        let x = prob.push_variable(Variable::binary(5.0));
        let y = prob.push_variable(Variable::binary(4.0));
        prob.push_constraint(Constraint::new(vec![(x, 1.0), (y, 1.0)], ConSense::Le, 1.0));

        assert_eq!(prob.num_vars(), 2);
        assert_eq!(prob.num_cons(), 1);
        assert_eq!(prob.num_discrete(), 2);
        assert!(prob.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_free_lower_bound() {
        let mut prob = Problem::new(ObjSense::Min);
        prob.push_variable(Variable::continuous(1.0, f64::NEG_INFINITY, 1.0));
        assert!(prob.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_constraint_index() {
        let mut prob = Problem::new(ObjSense::Min);
        prob.push_variable(Variable::binary(1.0));
        prob.push_constraint(Constraint::new(vec![(3, 1.0)], ConSense::Le, 1.0));
        assert!(prob.validate().is_err());
    }

    #[test]
    fn test_fractionality() {
        assert!((fractionality(0.5) - 0.5).abs() < 1e-12);
        assert!((fractionality(2.3) - 0.3).abs() < 1e-12);
        assert!(fractionality(3.0) < 1e-12);
    }
}
