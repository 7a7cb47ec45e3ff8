use serde::{Deserialize, Serialize};

use crate::element::node::Node;
use crate::element::spring::Spring;
use crate::element::FeElement;
use crate::model::{AnalysisModel, DofGroup};
use crate::prelude::*;

/// Time variation of a nodal load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeSeries {
    Constant { value: f64 },
    Linear { slope: f64 },
    /// `amplitude·sin(omega·t + phase)`
    Sine { amplitude: f64, omega: f64, phase: f64 },
}

impl TimeSeries {
    pub fn value(&self, time: f64) -> f64 {
        match *self {
            TimeSeries::Constant { value } => value,
            TimeSeries::Linear { slope } => slope * time,
            TimeSeries::Sine {
                amplitude,
                omega,
                phase,
            } => amplitude * (omega * time + phase).sin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodalLoad {
    pub node: usize,
    pub dof: usize,
    pub series: TimeSeries,
}

/// Lumped-parameter model: nodes with mass and dashpots, springs between
/// them and time-varying nodal loads.
///
/// Free DOFs are numbered node by node in insertion order. Adding a node or
/// fixing a DOF renumbers the equations and changes
/// [`AnalysisModel::num_equations`].
#[derive(Debug, Clone)]
pub struct LumpedModel {
    time: f64,
    nodes: Vec<Node>,
    springs: Vec<Spring>,
    loads: Vec<NodalLoad>,
    num_equations: usize,
    disp: VectorD,
    vel: VectorD,
    accel: VectorD,
}

impl LumpedModel {
    pub fn new() -> Self {
        LumpedModel {
            time: 0.,
            nodes: vec![],
            springs: vec![],
            loads: vec![],
            num_equations: 0,
            disp: VectorD::zeros(0),
            vel: VectorD::zeros(0),
            accel: VectorD::zeros(0),
        }
    }

    //--------------------------------------------------------------------------
    // Construction
    //--------------------------------------------------------------------------

    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.number_equations();
        self.nodes.len() - 1
    }

    pub fn add_spring(&mut self, spring: Spring) -> Result<usize> {
        let (node_i, node_j) = spring.nodes();
        self.check_dof(node_i, spring.dof())?;
        if let Some(node_j) = node_j {
            self.check_dof(node_j, spring.dof())?;
        }
        self.springs.push(spring);
        self.number_equations();
        Ok(self.springs.len() - 1)
    }

    pub fn add_load(&mut self, load: NodalLoad) -> Result<()> {
        self.check_dof(load.node, load.dof)?;
        self.loads.push(load);
        Ok(())
    }

    pub fn fix(&mut self, node: usize, dof: usize) -> Result<()> {
        self.check_dof(node, dof)?;
        self.nodes[node].fix(dof);
        self.number_equations();
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Access
    //--------------------------------------------------------------------------

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    /// Trial displacement by global equation.
    pub fn displacement(&self) -> &VectorD {
        &self.disp
    }

    pub fn velocity(&self) -> &VectorD {
        &self.vel
    }

    pub fn acceleration(&self) -> &VectorD {
        &self.accel
    }

    /// Global equation of a node DOF, `None` if fixed.
    pub fn equation(&self, node: usize, dof: usize) -> Option<usize> {
        self.nodes.get(node)?.equations().get(dof).copied().flatten()
    }

    /// Kinetic energy from the nodal masses at the trial velocity.
    pub fn kinetic_energy(&self) -> f64 {
        self.nodes
            .iter()
            .map(|n| 0.5 * n.mass().dot(&n.vel().component_mul(n.vel())))
            .sum()
    }

    /// Strain energy stored in the springs' linear and cubic parts.
    pub fn strain_energy(&self) -> f64 {
        self.springs
            .iter()
            .map(|s| {
                let e = s.elongation();
                let (k, k3) = s.stiffness_coefficients();
                0.5 * k * e * e + 0.25 * k3 * e.powi(4)
            })
            .sum()
    }

    //--------------------------------------------------------------------------
    // Internals
    //--------------------------------------------------------------------------

    fn check_dof(&self, node: usize, dof: usize) -> Result<()> {
        match self.nodes.get(node) {
            Some(n) if dof < n.num_dofs() => Ok(()),
            Some(_) => Err(IntegrationError::InvalidParameter(format!(
                "node {node} has no DOF {dof}"
            ))),
            None => Err(IntegrationError::InvalidParameter(format!(
                "node {node} does not exist"
            ))),
        }
    }

    fn number_equations(&mut self) {
        let mut next = 0;
        for node in self.nodes.iter_mut() {
            let equations = (0..node.num_dofs())
                .map(|dof| {
                    (!node.is_fixed(dof)).then(|| {
                        next += 1;
                        next - 1
                    })
                })
                .collect_vec();
            node.set_equations(equations);
        }
        self.num_equations = next;

        for spring in self.springs.iter_mut() {
            let (node_i, node_j) = spring.nodes();
            let dof = spring.dof();
            let eq_i = self.nodes[node_i].equations()[dof];
            let eq_j = node_j.and_then(|j| self.nodes[j].equations()[dof]);
            spring.set_equations([eq_i, eq_j]);
        }

        // Rebuild the global response from the nodes' trial state
        self.disp = VectorD::zeros(next);
        self.vel = VectorD::zeros(next);
        self.accel = VectorD::zeros(next);
        for node in self.nodes.iter() {
            scatter_vector(&mut self.disp, node.equations(), node.disp());
            scatter_vector(&mut self.vel, node.equations(), node.vel());
            scatter_vector(&mut self.accel, node.equations(), node.accel());
        }
        self.distribute();
    }

    /// Pushes the global trial response into nodes and springs.
    fn distribute(&mut self) {
        for node in self.nodes.iter_mut() {
            node.set_trial(&self.disp, &self.vel, &self.accel);
        }
        for spring in self.springs.iter_mut() {
            spring.set_trial(&self.disp, &self.vel);
        }
    }
}

impl Default for LumpedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisModel for LumpedModel {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn set_current_time(&mut self, time: f64) {
        self.time = time;
    }

    fn num_equations(&self) -> usize {
        self.num_equations
    }

    fn set_disp(&mut self, disp: &VectorD) {
        self.disp.copy_from(disp);
        self.distribute();
    }

    fn set_vel(&mut self, vel: &VectorD) {
        self.vel.copy_from(vel);
        self.distribute();
    }

    fn set_accel(&mut self, accel: &VectorD) {
        self.accel.copy_from(accel);
        self.distribute();
    }

    fn set_response(&mut self, disp: &VectorD, vel: &VectorD, accel: &VectorD) {
        self.disp.copy_from(disp);
        self.vel.copy_from(vel);
        self.accel.copy_from(accel);
        self.distribute();
    }

    fn incr_disp(&mut self, delta: &VectorD) {
        self.disp += delta;
        self.distribute();
    }

    fn apply_load(&mut self, time: f64) {
        self.nodes.iter_mut().for_each(|n| n.zero_load());
        for load in self.loads.iter() {
            self.nodes[load.node].add_load(load.dof, load.series.value(time));
        }
    }

    fn dof_groups(&self) -> Box<dyn Iterator<Item = &dyn DofGroup> + '_> {
        Box::new(self.nodes.iter().map(|n| n as &dyn DofGroup))
    }

    fn dof_groups_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn DofGroup> + '_> {
        Box::new(self.nodes.iter_mut().map(|n| n as &mut dyn DofGroup))
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &dyn FeElement> + '_> {
        Box::new(self.springs.iter().map(|s| s as &dyn FeElement))
    }

    fn elements_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn FeElement> + '_> {
        Box::new(self.springs.iter_mut().map(|s| s as &mut dyn FeElement))
    }

    fn commit(&mut self) -> Result<()> {
        self.nodes.iter_mut().for_each(|n| n.commit());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_mass_chain() -> LumpedModel {
        let mut model = LumpedModel::new();
        let ground = model.add_node(Node::new(1));
        let a = model.add_node(Node::new(1).with_mass(1.).with_initial_state(&[0.5], &[], &[]));
        let b = model.add_node(Node::new(1).with_mass(2.));
        model.fix(ground, 0).unwrap();
        model.add_spring(Spring::new(ground, a, 0, 10.)).unwrap();
        model.add_spring(Spring::new(a, b, 0, 20.)).unwrap();
        model
    }

    #[test]
    fn test_numbering() {
        let model = two_mass_chain();
        assert_eq!(model.num_equations(), 2);
        assert_eq!(model.equation(0, 0), None);
        assert_eq!(model.equation(1, 0), Some(0));
        assert_eq!(model.equation(2, 0), Some(1));
        assert_eq!(model.displacement(), &VectorD::from_vec(vec![0.5, 0.]));
        assert_eq!(model.springs()[0].equations().to_vec(), vec![None, Some(0)]);
    }

    #[test]
    fn test_add_node_changes_size() {
        let mut model = two_mass_chain();
        model.add_node(Node::new(2));
        assert_eq!(model.num_equations(), 4);
        assert_eq!(model.displacement()[0], 0.5);
    }

    #[test]
    fn test_invalid_references() {
        let mut model = two_mass_chain();
        assert!(matches!(
            model.add_spring(Spring::grounded(7, 0, 1.)),
            Err(IntegrationError::InvalidParameter(_))
        ));
        assert!(matches!(
            model.fix(1, 3),
            Err(IntegrationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_response_and_commit() {
        let mut model = two_mass_chain();
        model.set_response(
            &VectorD::from_vec(vec![1., 0.25]),
            &VectorD::from_vec(vec![2., 0.]),
            &VectorD::from_vec(vec![0., 3.]),
        );
        assert_relative_eq!(model.springs()[1].elongation(), 0.75);
        assert_eq!(model.node(1).committed_disp()[0], 0.5);

        model.incr_disp(&VectorD::from_vec(vec![0.5, 0.]));
        assert_relative_eq!(model.springs()[0].elongation(), -1.5);

        model.commit().unwrap();
        assert_eq!(model.node(1).committed_disp()[0], 1.5);
        assert_eq!(model.node(2).committed_accel()[0], 3.);
        assert_relative_eq!(model.kinetic_energy(), 2.);
    }

    #[test]
    fn test_loads() {
        let mut model = two_mass_chain();
        model
            .add_load(NodalLoad {
                node: 2,
                dof: 0,
                series: TimeSeries::Sine {
                    amplitude: 2.,
                    omega: std::f64::consts::PI,
                    phase: 0.,
                },
            })
            .unwrap();
        model.apply_load(0.5);
        assert_relative_eq!(model.node(2).load()[0], 2., epsilon = 1e-14);
        model.apply_load(1.);
        assert_relative_eq!(model.node(2).load()[0], 0., epsilon = 1e-14);
    }

    #[test]
    fn test_time_series_json() {
        let series: TimeSeries =
            serde_json::from_str(r#"{"type":"linear","slope":3.0}"#).unwrap();
        assert_eq!(series, TimeSeries::Linear { slope: 3. });
        assert_eq!(series.value(2.), 6.);
    }
}
