use crate::model::DofGroup;
use crate::prelude::*;

/// Node with lumped mass and dashpots to ground on each of its DOFs.
#[derive(Debug, Clone)]
pub struct Node {
    mass: VectorD,
    damping: VectorD,
    fixed: Vec<bool>,
    equations: Vec<Option<usize>>,
    committed_disp: VectorD,
    committed_vel: VectorD,
    committed_accel: VectorD,
    disp: VectorD,
    vel: VectorD,
    accel: VectorD,
    load: VectorD,
    tangent: MatrixD,
}

impl Node {
    pub fn new(num_dofs: usize) -> Self {
        Node {
            mass: VectorD::zeros(num_dofs),
            damping: VectorD::zeros(num_dofs),
            fixed: vec![false; num_dofs],
            equations: vec![None; num_dofs],
            committed_disp: VectorD::zeros(num_dofs),
            committed_vel: VectorD::zeros(num_dofs),
            committed_accel: VectorD::zeros(num_dofs),
            disp: VectorD::zeros(num_dofs),
            vel: VectorD::zeros(num_dofs),
            accel: VectorD::zeros(num_dofs),
            load: VectorD::zeros(num_dofs),
            tangent: MatrixD::zeros(num_dofs, num_dofs),
        }
    }

    /// Same lumped mass on every DOF.
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass.fill(mass);
        self
    }

    /// Same dashpot-to-ground coefficient on every DOF.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping.fill(damping);
        self
    }

    /// Initial committed response; vectors longer or shorter than the node are truncated or zero padded.
    pub fn with_initial_state(mut self, disp: &[f64], vel: &[f64], accel: &[f64]) -> Self {
        for (target, values) in [
            (&mut self.committed_disp, disp),
            (&mut self.committed_vel, vel),
            (&mut self.committed_accel, accel),
        ] {
            for (t, &v) in target.iter_mut().zip(values) {
                *t = v;
            }
        }
        self.disp.copy_from(&self.committed_disp);
        self.vel.copy_from(&self.committed_vel);
        self.accel.copy_from(&self.committed_accel);
        self
    }

    pub fn num_dofs(&self) -> usize {
        self.fixed.len()
    }

    pub fn fix(&mut self, dof: usize) {
        self.fixed[dof] = true;
    }

    pub fn is_fixed(&self, dof: usize) -> bool {
        self.fixed[dof]
    }

    pub fn mass(&self) -> &VectorD {
        &self.mass
    }

    pub fn disp(&self) -> &VectorD {
        &self.disp
    }

    pub fn vel(&self) -> &VectorD {
        &self.vel
    }

    pub fn accel(&self) -> &VectorD {
        &self.accel
    }

    pub fn load(&self) -> &VectorD {
        &self.load
    }

    pub(crate) fn set_equations(&mut self, equations: Vec<Option<usize>>) {
        self.equations = equations;
    }

    pub(crate) fn set_trial(&mut self, disp: &VectorD, vel: &VectorD, accel: &VectorD) {
        self.disp = gather_vector(disp, &self.equations);
        self.vel = gather_vector(vel, &self.equations);
        self.accel = gather_vector(accel, &self.equations);
    }

    pub(crate) fn zero_load(&mut self) {
        self.load.fill(0.);
    }

    pub(crate) fn add_load(&mut self, dof: usize, value: f64) {
        self.load[dof] += value;
    }

    pub(crate) fn commit(&mut self) {
        self.committed_disp.copy_from(&self.disp);
        self.committed_vel.copy_from(&self.vel);
        self.committed_accel.copy_from(&self.accel);
    }
}

impl DofGroup for Node {
    fn equations(&self) -> &EquationMap {
        &self.equations
    }

    fn committed_disp(&self) -> &VectorD {
        &self.committed_disp
    }

    fn committed_vel(&self) -> &VectorD {
        &self.committed_vel
    }

    fn committed_accel(&self) -> &VectorD {
        &self.committed_accel
    }

    fn zero_tangent(&mut self) {
        self.tangent.fill(0.);
    }

    fn add_c_to_tang(&mut self, factor: f64) {
        for (i, &c) in self.damping.iter().enumerate() {
            self.tangent[(i, i)] += factor * c;
        }
    }

    fn add_m_to_tang(&mut self, factor: f64) {
        for (i, &m) in self.mass.iter().enumerate() {
            self.tangent[(i, i)] += factor * m;
        }
    }

    fn tangent(&self) -> &MatrixD {
        &self.tangent
    }

    fn unbalance(&self) -> VectorD {
        &self.load - self.mass.component_mul(&self.accel) - self.damping.component_mul(&self.vel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbalance() {
        let mut node = Node::new(2).with_mass(2.).with_damping(0.5);
        node.set_equations(vec![Some(1), Some(0)]);
        node.set_trial(
            &VectorD::from_vec(vec![0., 0.]),
            &VectorD::from_vec(vec![4., 2.]),
            &VectorD::from_vec(vec![1., 3.]),
        );
        node.add_load(0, 10.);
        // dof 0 reads equation 1: 10 - 2·3 - 0.5·2
        assert_eq!(node.unbalance(), VectorD::from_vec(vec![3., -4.]));
    }

    #[test]
    fn test_tangent() {
        let mut node = Node::new(1).with_mass(3.).with_damping(2.);
        node.add_m_to_tang(10.);
        node.add_c_to_tang(0.5);
        assert_eq!(node.tangent()[(0, 0)], 31.);
        node.zero_tangent();
        assert_eq!(node.tangent()[(0, 0)], 0.);
    }

    #[test]
    fn test_commit() {
        let mut node = Node::new(1).with_initial_state(&[1.], &[2.], &[3.]);
        assert_eq!(node.committed_disp()[0], 1.);
        node.set_equations(vec![Some(0)]);
        node.set_trial(
            &VectorD::from_element(1, 5.),
            &VectorD::from_element(1, 6.),
            &VectorD::from_element(1, 7.),
        );
        assert_eq!(node.committed_vel()[0], 2.);
        node.commit();
        assert_eq!(node.committed_accel()[0], 7.);
    }
}
