#![allow(non_snake_case)]

//! Equilibrium iteration within a time step.

pub mod linear;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::element::TangentKind;
use crate::integrator::{IterationPolicy, TimeIntegrationScheme};
use crate::model::AnalysisModel;
use crate::prelude::*;

pub use linear::{DenseCholesky, DenseLu, LinearSolver, LinearSolverKind};

/// Norm checked after every update of an iterated step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvergenceTest {
    /// Euclidean norm of the last solved increment.
    NormDispIncr { tolerance: f64 },
    /// Euclidean norm of the unbalance after the last update.
    NormUnbalance { tolerance: f64 },
}

impl ConvergenceTest {
    pub fn tolerance(&self) -> f64 {
        match *self {
            ConvergenceTest::NormDispIncr { tolerance }
            | ConvergenceTest::NormUnbalance { tolerance } => tolerance,
        }
    }
}

impl Default for ConvergenceTest {
    fn default() -> Self {
        ConvergenceTest::NormDispIncr { tolerance: 1e-8 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionAlgorithm {
    /// Re-form and re-factor the tangent every iteration.
    #[default]
    Newton,
    /// Form and factor the tangent once per step.
    ModifiedNewton,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverOptions {
    pub test: ConvergenceTest,
    pub max_iterations: usize,
    pub algorithm: SolutionAlgorithm,
    pub tangent: TangentKind,
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            test: ConvergenceTest::default(),
            max_iterations: 25,
            algorithm: SolutionAlgorithm::default(),
            tangent: TangentKind::default(),
        }
    }
}

/// Outcome of a solved step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Number of solves and updates performed.
    pub iterations: usize,
    /// Final value of the convergence norm, or of the last increment's norm
    /// when the scheme does not test convergence.
    pub norm: f64,
}

/// Assembles the effective system of an open step and drives the scheme's
/// updates until the step is solved.
#[derive(Debug, Clone)]
pub struct EquilibriumDriver {
    options: DriverOptions,
    St: MatrixD, // effective tangent
    R: VectorD,  // unbalance
}

impl EquilibriumDriver {
    pub fn new(options: DriverOptions) -> Self {
        EquilibriumDriver {
            options,
            St: MatrixD::zeros(0, 0),
            R: VectorD::zeros(0),
        }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub fn tangent(&self) -> &MatrixD {
        &self.St
    }

    pub fn unbalance(&self) -> &VectorD {
        &self.R
    }

    /// Resizes the scratch system to `num_equations`.
    pub fn domain_changed(&mut self, num_equations: usize) {
        if self.R.len() != num_equations {
            self.St = MatrixD::zeros(num_equations, num_equations);
            self.R = VectorD::zeros(num_equations);
        }
    }

    /// Assembles the effective tangent from every element and DOF group.
    pub fn form_tangent(
        &mut self,
        scheme: &TimeIntegrationScheme,
        model: &mut dyn AnalysisModel,
    ) -> Result<()> {
        self.domain_changed(model.num_equations());
        self.St.fill(0.);
        for element in model.elements_mut() {
            scheme.form_ele_tangent(element, self.options.tangent)?;
            scatter_matrix(&mut self.St, element.equations(), element.tangent());
        }
        for group in model.dof_groups_mut() {
            scheme.form_nod_tangent(group)?;
            scatter_matrix(&mut self.St, group.equations(), group.tangent());
        }
        Ok(())
    }

    /// Assembles the unbalance at the response last pushed into the model.
    pub fn form_unbalance(&mut self, model: &dyn AnalysisModel) {
        self.domain_changed(model.num_equations());
        self.R.fill(0.);
        for element in model.elements() {
            scatter_vector(&mut self.R, element.equations(), &element.residual());
        }
        for group in model.dof_groups() {
            scatter_vector(&mut self.R, group.equations(), &group.unbalance());
        }
    }

    /// Solves the open step following the scheme's iteration policy.
    ///
    /// The step is left open; the caller commits or reverts it.
    pub fn solve_current_step(
        &mut self,
        scheme: &mut TimeIntegrationScheme,
        model: &mut dyn AnalysisModel,
        solver: &mut dyn LinearSolver,
    ) -> Result<StepReport> {
        let (limit, tested) = match scheme.iteration_policy() {
            IterationPolicy::SingleShot => (1, false),
            IterationPolicy::Fixed(n) => (n, false),
            IterationPolicy::UntilConverged => (self.options.max_iterations, true),
        };

        self.form_unbalance(model);
        let mut norm = f64::INFINITY;
        for iteration in 1..=limit {
            if iteration == 1 || self.options.algorithm == SolutionAlgorithm::Newton {
                self.form_tangent(scheme, model)?;
                solver.factor(&self.St)?;
            }

            let x = solver.solve(&self.R)?;
            scheme.update(model, &x)?;

            if iteration < limit || tested {
                self.form_unbalance(model);
            }
            norm = match self.options.test {
                ConvergenceTest::NormUnbalance { .. } if tested => self.R.norm(),
                _ => x.norm(),
            };
            debug!("iteration {}: norm {:.3e}", iteration, norm);

            if !tested {
                if iteration == limit {
                    return Ok(StepReport {
                        iterations: iteration,
                        norm,
                    });
                }
            } else if norm <= self.options.test.tolerance() {
                return Ok(StepReport {
                    iterations: iteration,
                    norm,
                });
            }
        }

        warn!(
            "step failed to converge in {} iterations (norm {:.3e})",
            limit, norm
        );
        Err(IntegrationError::ConvergenceFailure {
            iterations: limit,
            norm,
        })
    }
}
