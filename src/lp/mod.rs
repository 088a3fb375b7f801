//! LP backend trait and the reference dense simplex.

mod adapter;
mod simplex;

pub use adapter::{
    BasisStatus, InfeasibleCertificate, LpCol, LpRow, LpSolver, LpStatus, SolveMethod,
};
pub use simplex::DenseSimplex;
