//! Element and DOF-group contracts, with the lumped reference implementations.

pub mod node;
pub mod spring;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Which stiffness an element contributes to the effective tangent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TangentKind {
    /// Tangent at the current trial response.
    #[default]
    Current,
    /// Tangent at the undeformed reference configuration.
    Initial,
}

/// A finite element seen from the integrator: a tangent accumulator plus a
/// residual at the response last pushed into the model.
pub trait FeElement {
    /// Global equation of each local DOF.
    fn equations(&self) -> &EquationMap;

    fn zero_tangent(&mut self);

    /// Adds `factor` times the current stiffness.
    fn add_kt_to_tang(&mut self, factor: f64);

    /// Adds `factor` times the initial stiffness.
    fn add_ki_to_tang(&mut self, factor: f64);

    fn add_c_to_tang(&mut self, factor: f64);

    fn add_m_to_tang(&mut self, factor: f64);

    /// Accumulated tangent in local DOF order.
    fn tangent(&self) -> &MatrixD;

    /// Unbalanced force contribution (external minus resisting, including
    /// inertia and damping) in local DOF order.
    fn residual(&self) -> VectorD;
}
