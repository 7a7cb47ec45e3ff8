#![allow(non_snake_case)]

use nalgebra::linalg::{Cholesky, LU};
use nalgebra::Dyn;
use serde::{Deserialize, Serialize};

use crate::error::check_size;
use crate::prelude::*;

/// Factor-once, solve-many dense linear solver.
pub trait LinearSolver {
    /// Factorizes `A`; later solves reuse the factorization until the next call.
    fn factor(&mut self, A: &MatrixD) -> Result<()>;

    /// Solves `A·x = b` with the last factorization.
    fn solve(&self, b: &VectorD) -> Result<VectorD>;
}

/// Selects a [`LinearSolver`] from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    #[default]
    Lu,
    Cholesky,
}

impl LinearSolverKind {
    pub fn build(&self) -> Box<dyn LinearSolver> {
        match self {
            LinearSolverKind::Lu => Box::new(DenseLu::default()),
            LinearSolverKind::Cholesky => Box::new(DenseCholesky::default()),
        }
    }
}

//------------------------------------------------------------------------------
// LU
//------------------------------------------------------------------------------

/// LU with partial pivoting; handles any nonsingular tangent.
#[derive(Debug, Clone, Default)]
pub struct DenseLu {
    lu: Option<LU<f64, Dyn, Dyn>>,
    size: usize,
}

impl LinearSolver for DenseLu {
    fn factor(&mut self, A: &MatrixD) -> Result<()> {
        check_square(A)?;
        let lu = A.clone().lu();
        if !lu.is_invertible() {
            self.lu = None;
            return Err(IntegrationError::SingularSystem);
        }
        self.lu = Some(lu);
        self.size = A.nrows();
        Ok(())
    }

    fn solve(&self, b: &VectorD) -> Result<VectorD> {
        let lu = self.lu.as_ref().ok_or(IntegrationError::NotInitialized {
            operation: "solve",
        })?;
        check_size(self.size, b.len())?;
        lu.solve(b).ok_or(IntegrationError::SingularSystem)
    }
}

//------------------------------------------------------------------------------
// Cholesky
//------------------------------------------------------------------------------

/// Cholesky factorization for symmetric positive definite tangents.
#[derive(Debug, Clone, Default)]
pub struct DenseCholesky {
    chol: Option<Cholesky<f64, Dyn>>,
}

impl LinearSolver for DenseCholesky {
    fn factor(&mut self, A: &MatrixD) -> Result<()> {
        check_square(A)?;
        self.chol = A.clone().cholesky();
        if self.chol.is_none() {
            return Err(IntegrationError::SingularSystem);
        }
        Ok(())
    }

    fn solve(&self, b: &VectorD) -> Result<VectorD> {
        let chol = self.chol.as_ref().ok_or(IntegrationError::NotInitialized {
            operation: "solve",
        })?;
        check_size(chol.l_dirty().nrows(), b.len())?;
        Ok(chol.solve(b))
    }
}

fn check_square(A: &MatrixD) -> Result<()> {
    check_size(A.nrows(), A.ncols())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spd() -> MatrixD {
        MatrixD::from_row_slice(3, 3, &[4., 1., 0., 1., 3., 1., 0., 1., 2.])
    }

    #[test]
    fn test_solvers_agree() {
        let A = spd();
        let b = VectorD::from_vec(vec![1., 2., 3.]);
        for kind in [LinearSolverKind::Lu, LinearSolverKind::Cholesky] {
            let mut solver = kind.build();
            solver.factor(&A).unwrap();
            let x = solver.solve(&b).unwrap();
            assert_relative_eq!(&A * x, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_singular() {
        let A = MatrixD::from_row_slice(2, 2, &[1., 2., 2., 4.]);
        assert!(matches!(
            DenseLu::default().factor(&A),
            Err(IntegrationError::SingularSystem)
        ));

        // Indefinite
        let A = MatrixD::from_row_slice(2, 2, &[1., 2., 2., 1.]);
        assert!(matches!(
            DenseCholesky::default().factor(&A),
            Err(IntegrationError::SingularSystem)
        ));
    }

    #[test]
    fn test_solve_before_factor() {
        assert!(matches!(
            DenseLu::default().solve(&VectorD::zeros(2)),
            Err(IntegrationError::NotInitialized { .. })
        ));
    }

    #[test]
    fn test_size_mismatch() {
        let mut solver = DenseLu::default();
        solver.factor(&spd()).unwrap();
        assert!(matches!(
            solver.solve(&VectorD::zeros(2)),
            Err(IntegrationError::IncompatibleSize { expected: 3, found: 2 })
        ));
    }
}
