use serde::{Deserialize, Serialize};

use crate::error::check_size;
use crate::prelude::*;

/// Adds `other * scale` to `vec` in place.
///
/// Every predictor and corrector is written in terms of this primitive so all
/// schemes share the same floating-point semantics.
pub fn add_scaled(vec: &mut VectorD, other: &VectorD, scale: f64) -> Result<()> {
    check_size(vec.len(), other.len())?;
    vec.axpy(scale, other, 1.);
    Ok(())
}

/// Displacement, velocity and acceleration over the active equations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVectorSet {
    pub displacement: VectorD,
    pub velocity: VectorD,
    pub acceleration: VectorD,
}

impl StateVectorSet {
    pub fn new(num_equations: usize) -> Self {
        StateVectorSet {
            displacement: VectorD::zeros(num_equations),
            velocity: VectorD::zeros(num_equations),
            acceleration: VectorD::zeros(num_equations),
        }
    }

    pub fn len(&self) -> usize {
        self.displacement.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reallocates all three vectors to `num_equations`, zero filled.
    pub fn resize(&mut self, num_equations: usize) {
        *self = StateVectorSet::new(num_equations);
    }

    /// Zeroes all three vectors without reallocating.
    pub fn clear(&mut self) {
        self.displacement.fill(0.);
        self.velocity.fill(0.);
        self.acceleration.fill(0.);
    }

    /// Checks that the three vectors share a single length.
    pub fn validate(&self) -> Result<()> {
        check_size(self.len(), self.velocity.len())?;
        check_size(self.len(), self.acceleration.len())
    }

    /// Seeds the entries of one DOF group from its committed response.
    ///
    /// Values are addressed through the group's equation map, constrained DOFs
    /// are skipped.
    pub fn set_from_committed(
        &mut self,
        equations: &EquationMap,
        displacement: &VectorD,
        velocity: &VectorD,
        acceleration: &VectorD,
    ) -> Result<()> {
        check_size(equations.len(), displacement.len())?;
        check_size(equations.len(), velocity.len())?;
        check_size(equations.len(), acceleration.len())?;
        if let Some(&eq) = equations.iter().flatten().find(|&&eq| eq >= self.len()) {
            return Err(IntegrationError::IncompatibleSize {
                expected: self.len(),
                found: eq + 1,
            });
        }
        for (eq, &u, &v, &a) in izip!(equations, displacement, velocity, acceleration) {
            if let Some(i) = *eq {
                self.displacement[i] = u;
                self.velocity[i] = v;
                self.acceleration[i] = a;
            }
        }
        Ok(())
    }

    /// Copies `other` into `self` without resizing.
    pub fn assign(&mut self, other: &StateVectorSet) -> Result<()> {
        check_size(self.len(), other.len())?;
        other.validate()?;
        self.displacement.copy_from(&other.displacement);
        self.velocity.copy_from(&other.velocity);
        self.acceleration.copy_from(&other.acceleration);
        Ok(())
    }

    /// Sets `self` to the convex combination of `from` and `to`.
    ///
    /// Displacement and velocity use the weight `alpha_f` on `to`, acceleration
    /// uses `alpha_i`.
    pub fn interpolate(
        &mut self,
        from: &StateVectorSet,
        to: &StateVectorSet,
        alpha_f: f64,
        alpha_i: f64,
    ) -> Result<()> {
        check_size(self.len(), from.len())?;
        check_size(self.len(), to.len())?;
        self.clear();
        add_scaled(&mut self.displacement, &from.displacement, 1. - alpha_f)?;
        add_scaled(&mut self.displacement, &to.displacement, alpha_f)?;
        add_scaled(&mut self.velocity, &from.velocity, 1. - alpha_f)?;
        add_scaled(&mut self.velocity, &to.velocity, alpha_f)?;
        add_scaled(&mut self.acceleration, &from.acceleration, 1. - alpha_i)?;
        add_scaled(&mut self.acceleration, &to.acceleration, alpha_i)
    }
}
