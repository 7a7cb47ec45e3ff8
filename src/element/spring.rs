use crate::element::FeElement;
use crate::prelude::*;

/// Axial spring with parallel dashpot acting along one DOF between two
/// nodes, or between a node and ground.
///
/// Elongation is `e = u_i - u_j`; the resisting force is
/// `f = k·e + k3·e³ + c·ė`.
#[derive(Debug, Clone)]
pub struct Spring {
    node_i: usize,
    node_j: Option<usize>,
    dof: usize,
    stiffness: f64,
    cubic: f64,
    damping: f64,
    equations: [Option<usize>; 2],
    disp: [f64; 2],
    vel: [f64; 2],
    tangent: MatrixD,
}

impl Spring {
    pub fn new(node_i: usize, node_j: usize, dof: usize, stiffness: f64) -> Self {
        Self::build(node_i, Some(node_j), dof, stiffness)
    }

    /// Spring from a node to a fixed point.
    pub fn grounded(node: usize, dof: usize, stiffness: f64) -> Self {
        Self::build(node, None, dof, stiffness)
    }

    fn build(node_i: usize, node_j: Option<usize>, dof: usize, stiffness: f64) -> Self {
        Spring {
            node_i,
            node_j,
            dof,
            stiffness,
            cubic: 0.,
            damping: 0.,
            equations: [None; 2],
            disp: [0.; 2],
            vel: [0.; 2],
            tangent: MatrixD::zeros(2, 2),
        }
    }

    /// Cubic hardening coefficient k3.
    pub fn with_cubic(mut self, cubic: f64) -> Self {
        self.cubic = cubic;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn nodes(&self) -> (usize, Option<usize>) {
        (self.node_i, self.node_j)
    }

    pub fn dof(&self) -> usize {
        self.dof
    }

    /// Linear and cubic stiffness coefficients `(k, k3)`.
    pub fn stiffness_coefficients(&self) -> (f64, f64) {
        (self.stiffness, self.cubic)
    }

    pub fn elongation(&self) -> f64 {
        self.disp[0] - self.disp[1]
    }

    pub fn elongation_rate(&self) -> f64 {
        self.vel[0] - self.vel[1]
    }

    /// Resisting force at the last response pushed into the spring.
    pub fn force(&self) -> f64 {
        let e = self.elongation();
        self.stiffness * e + self.cubic * e.powi(3) + self.damping * self.elongation_rate()
    }

    pub(crate) fn set_equations(&mut self, equations: [Option<usize>; 2]) {
        self.equations = equations;
    }

    pub(crate) fn set_trial(&mut self, disp: &VectorD, vel: &VectorD) {
        for (local, eq) in self.equations.iter().enumerate() {
            self.disp[local] = eq.map_or(0., |i| disp[i]);
            self.vel[local] = eq.map_or(0., |i| vel[i]);
        }
    }

    fn add_pattern(&mut self, factor: f64) {
        self.tangent[(0, 0)] += factor;
        self.tangent[(0, 1)] -= factor;
        self.tangent[(1, 0)] -= factor;
        self.tangent[(1, 1)] += factor;
    }
}

impl FeElement for Spring {
    fn equations(&self) -> &EquationMap {
        &self.equations
    }

    fn zero_tangent(&mut self) {
        self.tangent.fill(0.);
    }

    fn add_kt_to_tang(&mut self, factor: f64) {
        let e = self.elongation();
        self.add_pattern(factor * (self.stiffness + 3. * self.cubic * e * e));
    }

    fn add_ki_to_tang(&mut self, factor: f64) {
        self.add_pattern(factor * self.stiffness);
    }

    fn add_c_to_tang(&mut self, factor: f64) {
        self.add_pattern(factor * self.damping);
    }

    // Massless
    fn add_m_to_tang(&mut self, _factor: f64) {}

    fn tangent(&self) -> &MatrixD {
        &self.tangent
    }

    fn residual(&self) -> VectorD {
        let f = self.force();
        VectorD::from_vec(vec![-f, f])
    }
}
