//! Reference LP backend: a dense two-phase tableau simplex.
//!
//! This backend exists so the engine can run end to end without an
//! external solver. It solves from scratch on every `optimize` call and
//! treats the requested `SolveMethod` as advisory. Bland's rule is used
//! for both pivot choices, so the method terminates on degenerate LPs.
//!
//! Variables are shifted by their (finite) lower bound; finite upper
//! bounds become explicit rows. Every internal row receives an
//! artificial column, which doubles as the unit vector used to recover
//! row duals after phase two.

use crate::error::{EngineError, EngineResult};
use crate::model::ConSense;

use super::adapter::{
    BasisStatus, InfeasibleCertificate, LpCol, LpRow, LpSolver, SolveMethod, LpStatus,
};

const TOL: f64 = 1e-9;
const MAX_PIVOTS: usize = 50_000;

#[derive(Debug, Clone)]
struct ColRec {
    obj: f64,
    lb: f64,
    ub: f64,
}

#[derive(Debug, Clone)]
struct RowRec {
    coefs: Vec<(usize, f64)>,
    sense: ConSense,
    rhs: f64,
}

/// Dense two-phase simplex implementing [`LpSolver`].
pub struct DenseSimplex {
    cols: Vec<ColRec>,
    rows: Vec<RowRec>,

    // Last solution
    x: Vec<f64>,
    y: Vec<f64>,
    rc: Vec<f64>,
    slacks: Vec<f64>,
    obj_val: f64,
    status: Option<LpStatus>,
    certificate: Option<InfeasibleCertificate>,

    /// Total number of solves performed.
    pub solves: u64,
}

impl Default for DenseSimplex {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseSimplex {
    /// Create an empty LP.
    pub fn new() -> Self {
        Self {
            cols: Vec::new(),
            rows: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
            rc: Vec::new(),
            slacks: Vec::new(),
            obj_val: 0.0,
            status: None,
            certificate: None,
            solves: 0,
        }
    }

    fn invalidate(&mut self) {
        self.status = None;
        self.certificate = None;
    }

    /// Run the simplex on the tableau with the given costs.
    ///
    /// `banned` columns may never enter the basis. Returns false if an
    /// unbounded direction was found.
    fn pivot_loop(
        tableau: &mut [Vec<f64>],
        b: &mut [f64],
        basis: &mut [usize],
        costs: &[f64],
        banned_from: usize,
    ) -> EngineResult<bool> {
        let m = tableau.len();
        if m == 0 {
            // No rows at all: optimal at the origin unless some column
            // could decrease the objective without restraint.
            return Ok(!costs.iter().any(|&c| c < -TOL));
        }
        let n_total = tableau[0].len();

        for _pivot in 0..MAX_PIVOTS {
            // Reduced costs: rc_j = c_j - sum_k c_basis[k] * T[k][j].
            let mut entering = None;
            for j in 0..n_total {
                if j >= banned_from {
                    continue;
                }
                let mut z = 0.0;
                for k in 0..m {
                    let cb = costs[basis[k]];
                    if cb != 0.0 {
                        z += cb * tableau[k][j];
                    }
                }
                let rc = costs[j] - z;
                if rc < -TOL {
                    entering = Some(j);
                    break; // Bland: smallest eligible index
                }
            }

            let e = match entering {
                Some(e) => e,
                None => return Ok(true), // optimal for these costs
            };

            // Ratio test with Bland tie-breaking.
            let mut leave: Option<usize> = None;
            let mut best_ratio = f64::INFINITY;
            for k in 0..m {
                let t = tableau[k][e];
                if t > TOL {
                    let ratio = b[k] / t;
                    let better = ratio < best_ratio - TOL
                        || (ratio < best_ratio + TOL
                            && leave.map(|l| basis[k] < basis[l]).unwrap_or(true));
                    if better {
                        best_ratio = ratio.min(best_ratio);
                        leave = Some(k);
                    }
                }
            }

            let r = match leave {
                Some(r) => r,
                None => return Ok(false), // unbounded direction
            };

            // Pivot on (r, e).
            let piv = tableau[r][e];
            for v in tableau[r].iter_mut() {
                *v /= piv;
            }
            b[r] /= piv;
            for k in 0..m {
                if k == r {
                    continue;
                }
                let f = tableau[k][e];
                if f.abs() > 1e-14 {
                    for j in 0..n_total {
                        tableau[k][j] -= f * tableau[r][j];
                    }
                    b[k] -= f * b[r];
                }
            }
            basis[r] = e;
        }

        Err(EngineError::SolverFailure(
            "simplex pivot limit exceeded".to_string(),
        ))
    }
}

impl LpSolver for DenseSimplex {
    fn optimize(&mut self, _method: SolveMethod) -> EngineResult<LpStatus> {
        self.solves += 1;
        self.invalidate();

        let n = self.cols.len();
        for (j, c) in self.cols.iter().enumerate() {
            if !c.lb.is_finite() {
                return Err(EngineError::SolverFailure(format!(
                    "column {} has no finite lower bound",
                    j
                )));
            }
        }

        // Internal rows: external constraints first, then finite upper
        // bound rows. Everything is expressed over shifted variables
        // x' = x - lb, converted to <= / == form.
        struct IntRow {
            coefs: Vec<f64>, // dense over structural columns
            rhs: f64,
            eq: bool,
            /// Sign relating internal duals back to the external row.
            dual_sign: f64,
            /// External row index, if this is a constraint row.
            ext: Option<usize>,
        }

        let mut int_rows: Vec<IntRow> = Vec::new();

        for (r, row) in self.rows.iter().enumerate() {
            let mut coefs = vec![0.0; n];
            let mut shift = 0.0;
            for &(j, a) in &row.coefs {
                coefs[j] += a;
                shift += a * self.cols[j].lb;
            }
            let mut rhs = row.rhs - shift;
            let mut sign = 1.0;
            let eq = row.sense == ConSense::Eq;
            if row.sense == ConSense::Ge {
                for c in coefs.iter_mut() {
                    *c = -*c;
                }
                rhs = -rhs;
                sign = -1.0;
            }
            int_rows.push(IntRow {
                coefs,
                rhs,
                eq,
                dual_sign: sign,
                ext: Some(r),
            });
        }

        for (j, c) in self.cols.iter().enumerate() {
            if c.ub.is_finite() {
                let mut coefs = vec![0.0; n];
                coefs[j] = 1.0;
                int_rows.push(IntRow {
                    coefs,
                    rhs: c.ub - c.lb,
                    eq: false,
                    dual_sign: 1.0,
                    ext: None,
                });
            }
        }

        let m = int_rows.len();

        // Slack columns for inequality rows, then one artificial per row.
        let n_slack = int_rows.iter().filter(|r| !r.eq).count();
        let n_total = n + n_slack + m;
        let art_from = n + n_slack;

        let mut tableau: Vec<Vec<f64>> = Vec::with_capacity(m);
        let mut b = Vec::with_capacity(m);
        let mut row_flip = vec![1.0; m];
        let mut slack_idx = n;

        for (k, row) in int_rows.iter().enumerate() {
            let mut t = vec![0.0; n_total];
            t[..n].copy_from_slice(&row.coefs);
            if !row.eq {
                t[slack_idx] = 1.0;
                slack_idx += 1;
            }
            let mut rhs = row.rhs;
            if rhs < 0.0 {
                for v in t.iter_mut() {
                    *v = -*v;
                }
                rhs = -rhs;
                row_flip[k] = -1.0;
            }
            t[art_from + k] = 1.0;
            tableau.push(t);
            b.push(rhs);
        }

        let mut basis: Vec<usize> = (0..m).map(|k| art_from + k).collect();

        // Phase 1: minimize the sum of artificials.
        let mut costs1 = vec![0.0; n_total];
        for c in costs1.iter_mut().skip(art_from) {
            *c = 1.0;
        }
        if !Self::pivot_loop(&mut tableau, &mut b, &mut basis, &costs1, n_total)? {
            // Phase 1 cannot be unbounded: the objective is bounded below by 0.
            return Err(EngineError::SolverFailure(
                "phase-1 unbounded direction".to_string(),
            ));
        }

        let infeas: f64 = basis
            .iter()
            .zip(b.iter())
            .filter(|(&v, _)| v >= art_from)
            .map(|(_, &bv)| bv)
            .sum();

        if infeas > 1e-7 {
            let mut bad_rows = Vec::new();
            for (k, (&v, &bv)) in basis.iter().zip(b.iter()).enumerate() {
                if v >= art_from && bv > 1e-7 {
                    if let Some(ext) = int_rows[k].ext {
                        bad_rows.push(ext);
                    }
                }
            }
            bad_rows.sort_unstable();
            bad_rows.dedup();
            self.certificate = Some(InfeasibleCertificate { rows: bad_rows });
            self.status = Some(LpStatus::Infeasible);
            return Ok(LpStatus::Infeasible);
        }

        // Drive degenerate artificials out of the basis where possible.
        for k in 0..m {
            if basis[k] < art_from {
                continue;
            }
            let pivot_col = (0..art_from).find(|&j| tableau[k][j].abs() > TOL);
            if let Some(e) = pivot_col {
                let piv = tableau[k][e];
                for v in tableau[k].iter_mut() {
                    *v /= piv;
                }
                b[k] /= piv;
                for kk in 0..m {
                    if kk == k {
                        continue;
                    }
                    let f = tableau[kk][e];
                    if f.abs() > 1e-14 {
                        for j in 0..n_total {
                            tableau[kk][j] -= f * tableau[k][j];
                        }
                        b[kk] -= f * b[k];
                    }
                }
                basis[k] = e;
            }
            // All-zero row: redundant constraint, artificial stays at 0.
        }

        // Phase 2: minimize the real objective; artificials are banned.
        let mut costs2 = vec![0.0; n_total];
        for (j, c) in self.cols.iter().enumerate() {
            costs2[j] = c.obj;
        }
        if !Self::pivot_loop(&mut tableau, &mut b, &mut basis, &costs2, art_from)? {
            self.status = Some(LpStatus::Unbounded);
            return Ok(LpStatus::Unbounded);
        }

        // Extract the primal point.
        let mut x_shift = vec![0.0; n];
        for (k, &v) in basis.iter().enumerate() {
            if v < n {
                x_shift[v] = b[k];
            }
        }
        self.x = (0..n).map(|j| x_shift[j] + self.cols[j].lb).collect();
        self.obj_val = (0..n).map(|j| self.cols[j].obj * self.x[j]).sum();

        // Row duals via the artificial unit columns: y_k = c_B^T B^-1 e_k.
        let num_ext = self.rows.len();
        self.y = vec![0.0; num_ext];
        for (k, row) in int_rows.iter().enumerate() {
            let ext = match row.ext {
                Some(e) => e,
                None => continue,
            };
            let mut z = 0.0;
            for kk in 0..m {
                let cb = costs2[basis[kk]];
                if cb != 0.0 {
                    z += cb * tableau[kk][art_from + k];
                }
            }
            self.y[ext] = row.dual_sign * row_flip[k] * z;
        }

        // Reduced costs against the constraint-row duals only; bound
        // activity is reflected in the basis status instead.
        self.rc = (0..n)
            .map(|j| {
                let mut v = self.cols[j].obj;
                for (r, row) in self.rows.iter().enumerate() {
                    for &(jj, a) in &row.coefs {
                        if jj == j {
                            v -= self.y[r] * a;
                        }
                    }
                }
                v
            })
            .collect();

        self.slacks = self
            .rows
            .iter()
            .map(|row| {
                let act = row
                    .coefs
                    .iter()
                    .map(|&(j, a)| a * self.x[j])
                    .sum::<f64>();
                match row.sense {
                    ConSense::Le => row.rhs - act,
                    ConSense::Ge => act - row.rhs,
                    ConSense::Eq => row.rhs - act,
                }
            })
            .collect();

        self.status = Some(LpStatus::Optimal);
        Ok(LpStatus::Optimal)
    }

    fn obj_value(&self) -> f64 {
        self.obj_val
    }

    fn x_val(&self, col: usize) -> f64 {
        self.x[col]
    }

    fn y_val(&self, row: usize) -> f64 {
        self.y[row]
    }

    fn reduced_cost(&self, col: usize) -> f64 {
        self.rc[col]
    }

    fn slack(&self, row: usize) -> f64 {
        self.slacks[row]
    }

    fn col_status(&self, col: usize) -> BasisStatus {
        let c = &self.cols[col];
        let v = self.x[col];
        if (v - c.lb).abs() <= 1e-7 {
            BasisStatus::AtLower
        } else if c.ub.is_finite() && (c.ub - v).abs() <= 1e-7 {
            BasisStatus::AtUpper
        } else {
            BasisStatus::Basic
        }
    }

    fn row_status(&self, row: usize) -> BasisStatus {
        if self.slacks[row].abs() <= 1e-7 {
            BasisStatus::AtLower
        } else {
            BasisStatus::Basic
        }
    }

    fn add_rows(&mut self, rows: Vec<LpRow>) {
        self.invalidate();
        for r in rows {
            self.rows.push(RowRec {
                coefs: r.coefs,
                sense: r.sense,
                rhs: r.rhs,
            });
        }
    }

    fn add_cols(&mut self, cols: Vec<LpCol>) {
        self.invalidate();
        for c in cols {
            let j = self.cols.len();
            self.cols.push(ColRec {
                obj: c.obj,
                lb: c.lb,
                ub: c.ub,
            });
            for (row, a) in c.entries {
                self.rows[row].coefs.push((j, a));
            }
        }
    }

    fn remove_rows(&mut self, rows: &[usize]) {
        self.invalidate();
        let mut sorted = rows.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for &r in sorted.iter().rev() {
            self.rows.remove(r);
        }
    }

    fn remove_cols(&mut self, cols: &[usize]) {
        self.invalidate();
        let mut sorted = cols.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for &c in sorted.iter().rev() {
            self.cols.remove(c);
            for row in self.rows.iter_mut() {
                row.coefs.retain(|&(j, _)| j != c);
                for e in row.coefs.iter_mut() {
                    if e.0 > c {
                        e.0 -= 1;
                    }
                }
            }
        }
    }

    fn change_bounds(&mut self, col: usize, lb: f64, ub: f64) {
        self.invalidate();
        self.cols[col].lb = lb;
        self.cols[col].ub = ub;
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn num_cols(&self) -> usize {
        self.cols.len()
    }

    fn infeasible_rows(&self) -> Option<InfeasibleCertificate> {
        self.certificate.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(obj: f64, lb: f64, ub: f64) -> LpCol {
        LpCol {
            obj,
            lb,
            ub,
            entries: Vec::new(),
        }
    }

    #[test]
    fn test_simple_lp() {
        // min -x - y  s.t. x + y <= 1, x,y in [0,1]
        let mut lp = DenseSimplex::new();
        lp.add_cols(vec![col(-1.0, 0.0, 1.0), col(-1.0, 0.0, 1.0)]);
        lp.add_rows(vec![LpRow {
            coefs: vec![(0, 1.0), (1, 1.0)],
            sense: ConSense::Le,
            rhs: 1.0,
        }]);

        let status = lp.optimize(SolveMethod::Barrier).unwrap();
        assert_eq!(status, LpStatus::Optimal);
        assert!((lp.obj_value() + 1.0).abs() < 1e-6);
        assert!((lp.x_val(0) + lp.x_val(1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_asymmetric_objective() {
        // min -5x - 4y  s.t. x + y <= 1, binaries relaxed
        let mut lp = DenseSimplex::new();
        lp.add_cols(vec![col(-5.0, 0.0, 1.0), col(-4.0, 0.0, 1.0)]);
        lp.add_rows(vec![LpRow {
            coefs: vec![(0, 1.0), (1, 1.0)],
            sense: ConSense::Le,
            rhs: 1.0,
        }]);

        assert_eq!(lp.optimize(SolveMethod::Primal).unwrap(), LpStatus::Optimal);
        assert!((lp.x_val(0) - 1.0).abs() < 1e-6);
        assert!(lp.x_val(1).abs() < 1e-6);
        assert!((lp.obj_value() + 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_ge_and_eq_rows() {
        // min x + y  s.t. x + y >= 2, x - y == 0, x,y in [0, 10]
        let mut lp = DenseSimplex::new();
        lp.add_cols(vec![col(1.0, 0.0, 10.0), col(1.0, 0.0, 10.0)]);
        lp.add_rows(vec![
            LpRow {
                coefs: vec![(0, 1.0), (1, 1.0)],
                sense: ConSense::Ge,
                rhs: 2.0,
            },
            LpRow {
                coefs: vec![(0, 1.0), (1, -1.0)],
                sense: ConSense::Eq,
                rhs: 0.0,
            },
        ]);

        assert_eq!(lp.optimize(SolveMethod::Barrier).unwrap(), LpStatus::Optimal);
        assert!((lp.x_val(0) - 1.0).abs() < 1e-6);
        assert!((lp.x_val(1) - 1.0).abs() < 1e-6);
        assert!((lp.obj_value() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_with_certificate() {
        // x >= 2 and x <= 1 cannot both hold.
        let mut lp = DenseSimplex::new();
        lp.add_cols(vec![col(1.0, 0.0, 1.0)]);
        lp.add_rows(vec![LpRow {
            coefs: vec![(0, 1.0)],
            sense: ConSense::Ge,
            rhs: 2.0,
        }]);

        assert_eq!(
            lp.optimize(SolveMethod::Barrier).unwrap(),
            LpStatus::Infeasible
        );
        let cert = lp.infeasible_rows().unwrap();
        assert_eq!(cert.rows, vec![0]);
    }

    #[test]
    fn test_unbounded() {
        // min -x with x >= 0 and no upper bound.
        let mut lp = DenseSimplex::new();
        lp.add_cols(vec![col(-1.0, 0.0, f64::INFINITY)]);
        assert_eq!(
            lp.optimize(SolveMethod::Barrier).unwrap(),
            LpStatus::Unbounded
        );
    }

    #[test]
    fn test_duals_and_reduced_costs() {
        // min -x  s.t. x <= 5 (row), x in [0, 100].
        let mut lp = DenseSimplex::new();
        lp.add_cols(vec![col(-1.0, 0.0, 100.0)]);
        lp.add_rows(vec![LpRow {
            coefs: vec![(0, 1.0)],
            sense: ConSense::Le,
            rhs: 5.0,
        }]);

        assert_eq!(lp.optimize(SolveMethod::Barrier).unwrap(), LpStatus::Optimal);
        assert!((lp.x_val(0) - 5.0).abs() < 1e-6);
        // Binding row with dual -1: rc = c - y*a = -1 - (-1) = 0.
        assert!((lp.y_val(0) + 1.0).abs() < 1e-6);
        assert!(lp.reduced_cost(0).abs() < 1e-6);
        assert!(lp.slack(0).abs() < 1e-6);
        assert_eq!(lp.row_status(0), BasisStatus::AtLower);
    }

    #[test]
    fn test_add_remove_rows_and_cols() {
        let mut lp = DenseSimplex::new();
        lp.add_cols(vec![col(-1.0, 0.0, 2.0), col(-1.0, 0.0, 2.0)]);
        lp.add_rows(vec![LpRow {
            coefs: vec![(0, 1.0), (1, 1.0)],
            sense: ConSense::Le,
            rhs: 3.0,
        }]);
        assert_eq!(lp.optimize(SolveMethod::Barrier).unwrap(), LpStatus::Optimal);
        assert!((lp.obj_value() + 3.0).abs() < 1e-6);

        // Tighten with an extra row, then remove it again.
        lp.add_rows(vec![LpRow {
            coefs: vec![(0, 1.0)],
            sense: ConSense::Le,
            rhs: 0.5,
        }]);
        assert_eq!(lp.optimize(SolveMethod::Dual).unwrap(), LpStatus::Optimal);
        assert!((lp.obj_value() + 2.5).abs() < 1e-6);

        lp.remove_rows(&[1]);
        assert_eq!(lp.num_rows(), 1);
        assert_eq!(lp.optimize(SolveMethod::Primal).unwrap(), LpStatus::Optimal);
        assert!((lp.obj_value() + 3.0).abs() < 1e-6);

        // Remove the first column; the row must remap its coefficients.
        lp.remove_cols(&[0]);
        assert_eq!(lp.num_cols(), 1);
        assert_eq!(lp.optimize(SolveMethod::Primal).unwrap(), LpStatus::Optimal);
        assert!((lp.obj_value() + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_change_bounds_fixes_variable() {
        let mut lp = DenseSimplex::new();
        lp.add_cols(vec![col(-1.0, 0.0, 1.0)]);
        lp.change_bounds(0, 1.0, 1.0);
        assert_eq!(lp.optimize(SolveMethod::Primal).unwrap(), LpStatus::Optimal);
        assert!((lp.x_val(0) - 1.0).abs() < 1e-6);
    }
}
