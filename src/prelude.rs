pub use itertools::{izip, Itertools};

pub use crate::error::{IntegrationError, Result};

//------------------------------------------------------------------------------
// Types
//------------------------------------------------------------------------------

/// Matrix (DOFs x DOFs)
pub type MatrixD = nalgebra::DMatrix<f64>;

/// Column vector (Degrees of Freedom)
pub type VectorD = nalgebra::DVector<f64>;

/// Map from a local DOF index to its global equation number, `None` when the
/// DOF is constrained.
pub type EquationMap = [Option<usize>];

//------------------------------------------------------------------------------
// Assembly helpers
//------------------------------------------------------------------------------

/// Adds a local vector into a global vector through an equation map.
pub fn scatter_vector(global: &mut VectorD, equations: &EquationMap, local: &VectorD) {
    for (eq, &v) in equations.iter().zip(local.iter()) {
        if let Some(i) = *eq {
            global[i] += v;
        }
    }
}

/// Adds a local matrix into a global matrix through an equation map.
pub fn scatter_matrix(global: &mut MatrixD, equations: &EquationMap, local: &MatrixD) {
    for (a, row) in equations.iter().enumerate() {
        let Some(i) = *row else { continue };
        for (b, col) in equations.iter().enumerate() {
            if let Some(j) = *col {
                global[(i, j)] += local[(a, b)];
            }
        }
    }
}

/// Reads the global entries selected by an equation map; constrained DOFs read zero.
pub fn gather_vector(global: &VectorD, equations: &EquationMap) -> VectorD {
    VectorD::from_iterator(
        equations.len(),
        equations.iter().map(|eq| eq.map_or(0., |i| global[i])),
    )
}
