//! Contracts between the time integrator and the structural model it advances.

pub mod lumped;

use crate::element::FeElement;
use crate::prelude::*;

/// A node-level group of DOFs: supplies committed response for
/// initialization and contributes nodal mass and damping.
pub trait DofGroup {
    /// Global equation of each local DOF.
    fn equations(&self) -> &EquationMap;

    fn committed_disp(&self) -> &VectorD;
    fn committed_vel(&self) -> &VectorD;
    fn committed_accel(&self) -> &VectorD;

    fn zero_tangent(&mut self);
    fn add_c_to_tang(&mut self, factor: f64);
    fn add_m_to_tang(&mut self, factor: f64);

    /// Accumulated tangent in local DOF order.
    fn tangent(&self) -> &MatrixD;

    /// Applied load minus nodal inertia and damping forces in local DOF order.
    fn unbalance(&self) -> VectorD;
}

/// The structural model as seen by a time integrator.
///
/// Response vectors are indexed by global equation number and have length
/// [`AnalysisModel::num_equations`].
pub trait AnalysisModel {
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, time: f64);

    /// Number of active (unconstrained) equations.
    fn num_equations(&self) -> usize;

    fn set_disp(&mut self, disp: &VectorD);
    fn set_vel(&mut self, vel: &VectorD);
    fn set_accel(&mut self, accel: &VectorD);

    /// Sets the whole trial response at once.
    fn set_response(&mut self, disp: &VectorD, vel: &VectorD, accel: &VectorD) {
        self.set_disp(disp);
        self.set_vel(vel);
        self.set_accel(accel);
    }

    /// Adds an increment to the trial displacement.
    fn incr_disp(&mut self, delta: &VectorD);

    /// Evaluates the applied loads at `time`.
    fn apply_load(&mut self, time: f64);

    fn dof_groups(&self) -> Box<dyn Iterator<Item = &dyn DofGroup> + '_>;
    fn dof_groups_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn DofGroup> + '_>;
    fn elements(&self) -> Box<dyn Iterator<Item = &dyn FeElement> + '_>;
    fn elements_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn FeElement> + '_>;

    /// Accepts the current trial response as the committed response.
    fn commit(&mut self) -> Result<()>;
}
