//! Variables and constraints as stored in the global pools.
//!
//! Constraint coefficients are keyed by *global variable id* (the
//! variable's slot in the variable pool), not by LP column index. A
//! node's active set owns the mapping between the two, so the same
//! pooled constraint can be materialized in different LPs.

use sprs::CsVec;

/// Type of a variable's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    /// Continuous variable.
    Continuous,

    /// General integer variable.
    Integer,

    /// Binary variable (implicit [0, 1] bounds).
    Binary,
}

impl VarType {
    /// Returns true for integer and binary variables.
    pub fn is_discrete(&self) -> bool {
        matches!(self, VarType::Integer | VarType::Binary)
    }
}

/// A variable (a column of the problem).
#[derive(Debug, Clone)]
pub struct Variable {
    /// Objective coefficient.
    pub obj: f64,

    /// Lower bound. Must be finite (see `Problem::validate`).
    pub lb: f64,

    /// Upper bound.
    pub ub: f64,

    /// Domain type.
    pub vtype: VarType,

    /// Whether this variable may be removed from a node's LP again
    /// (priced-in columns are dynamic; initial columns usually are not).
    pub dynamic: bool,
}

impl Variable {
    /// Create a continuous variable.
    pub fn continuous(obj: f64, lb: f64, ub: f64) -> Self {
        Self {
            obj,
            lb,
            ub,
            vtype: VarType::Continuous,
            dynamic: false,
        }
    }

    /// Create a general integer variable.
    pub fn integer(obj: f64, lb: f64, ub: f64) -> Self {
        Self {
            obj,
            lb,
            ub,
            vtype: VarType::Integer,
            dynamic: false,
        }
    }

    /// Create a binary variable.
    pub fn binary(obj: f64) -> Self {
        Self {
            obj,
            lb: 0.0,
            ub: 1.0,
            vtype: VarType::Binary,
            dynamic: false,
        }
    }

    /// Mark this variable as dynamic (removable from node LPs).
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }
}

/// Sense of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConSense {
    /// a^T x <= rhs
    Le,

    /// a^T x >= rhs
    Ge,

    /// a^T x == rhs
    Eq,
}

/// A linear constraint (a row), with coefficients keyed by variable id.
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Sparse coefficient row over variable ids.
    pub row: CsVec<f64>,

    /// Constraint sense.
    pub sense: ConSense,

    /// Right-hand side.
    pub rhs: f64,

    /// Whether the coefficient of a variable not present in `row` is
    /// known to be zero. Non-liftable constraints block pricing: new
    /// columns cannot be lifted into them, so they must be evicted from
    /// the LP before variables are priced in.
    pub liftable: bool,

    /// Whether this constraint may be removed from a node's LP again
    /// (separated cuts are dynamic; initial constraints are not).
    pub dynamic: bool,
}

impl Constraint {
    /// Create a constraint from (variable id, coefficient) pairs.
    pub fn new(mut coefs: Vec<(usize, f64)>, sense: ConSense, rhs: f64) -> Self {
        coefs.sort_by_key(|&(i, _)| i);
        coefs.dedup_by_key(|&mut (i, _)| i);
        let dim = coefs.last().map(|&(i, _)| i + 1).unwrap_or(0);
        let (indices, data): (Vec<usize>, Vec<f64>) = coefs.into_iter().unzip();

        Self {
            row: CsVec::new(dim, indices, data),
            sense,
            rhs,
            liftable: true,
            dynamic: false,
        }
    }

    /// Mark this constraint as a dynamic cut.
    pub fn cut(mut self) -> Self {
        self.dynamic = true;
        self
    }

    /// Mark this constraint as non-liftable.
    pub fn non_liftable(mut self) -> Self {
        self.liftable = false;
        self
    }

    /// Coefficient of a variable (zero if absent).
    pub fn coef(&self, var: usize) -> f64 {
        if var >= self.row.dim() {
            return 0.0;
        }
        self.row.get(var).copied().unwrap_or(0.0)
    }

    /// Evaluate a^T x for a dense point keyed by variable id.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.row
            .iter()
            .map(|(i, &a)| if i < x.len() { a * x[i] } else { 0.0 })
            .sum()
    }

    /// Signed violation of the constraint at `x` (positive = violated).
    pub fn violation(&self, x: &[f64]) -> f64 {
        let lhs = self.activity(x);
        match self.sense {
            ConSense::Le => lhs - self.rhs,
            ConSense::Ge => self.rhs - lhs,
            ConSense::Eq => (lhs - self.rhs).abs(),
        }
    }

    /// Check whether `x` satisfies the constraint within `tol`.
    pub fn satisfied(&self, x: &[f64], tol: f64) -> bool {
        self.violation(x) <= tol
    }

    /// Check if two constraints are parallel duplicates of each other.
    ///
    /// Two rows are duplicates when their normalized coefficient vectors
    /// align and the normalized right-hand sides match.
    pub fn is_duplicate_of(&self, other: &Constraint) -> bool {
        if self.sense != other.sense {
            return false;
        }
        if self.row.nnz() != other.row.nnz() {
            return false;
        }

        let a_norm: f64 = self.row.data().iter().map(|v| v * v).sum::<f64>().sqrt();
        let b_norm: f64 = other.row.data().iter().map(|v| v * v).sum::<f64>().sqrt();

        if a_norm < 1e-10 || b_norm < 1e-10 {
            return a_norm < 1e-10 && b_norm < 1e-10;
        }

        let mut dot = 0.0;
        for (i, &a) in self.row.iter() {
            dot += a * other.coef(i);
        }

        let cos_angle = dot / (a_norm * b_norm);
        if cos_angle > 0.9999 {
            let rhs_diff = (self.rhs / a_norm - other.rhs / b_norm).abs();
            return rhs_diff < 1e-8;
        }

        false
    }
}
