//! Step-by-step transient analysis of a model.

use log::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::check_size;
use crate::integrator::{Checkpoint, Phase, SchemeParameters, TimeIntegrationScheme};
use crate::model::AnalysisModel;
use crate::prelude::*;
use crate::solver::{
    DriverOptions, EquilibriumDriver, LinearSolver, LinearSolverKind, StepReport,
};

/// Owns a model together with the scheme, equilibrium driver and linear
/// solver that advance it.
pub struct TransientAnalysis<M: AnalysisModel> {
    model: M,
    scheme: TimeIntegrationScheme,
    driver: EquilibriumDriver,
    solver: Box<dyn LinearSolver>,
    max_subdivisions: usize,
}

impl<M: AnalysisModel> TransientAnalysis<M> {
    pub fn builder() -> TransientAnalysisBuilder<M> {
        TransientAnalysisBuilder::new()
    }

    pub fn from_config(model: M, config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Self::builder()
            .model(model)
            .scheme(config.scheme.build()?)
            .driver(config.driver)
            .linear_solver(config.linear_solver)
            .max_subdivisions(config.max_subdivisions)
            .build()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable model access; a change in equation count is picked up at the next step.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn scheme(&self) -> &TimeIntegrationScheme {
        &self.scheme
    }

    pub fn time(&self) -> f64 {
        self.model.current_time()
    }

    /// Reloads the scheme and driver from the model's current DOF layout and committed response.
    pub fn domain_changed(&mut self) -> Result<()> {
        self.scheme.domain_changed(&self.model)?;
        self.driver.domain_changed(self.model.num_equations());
        Ok(())
    }

    /// Advances the model by `delta_t`.
    ///
    /// A step that fails to converge is reverted and, while subdivisions
    /// remain, retried as two half steps. Half steps that already succeeded
    /// stay committed when a later one fails.
    pub fn analyze_step(&mut self, delta_t: f64) -> Result<StepReport> {
        if !(delta_t > 0. && delta_t.is_finite()) {
            return Err(IntegrationError::InvalidTimeStep(delta_t));
        }
        if self.scheme.phase() == Phase::Uninitialized
            || self.scheme.num_equations() != self.model.num_equations()
        {
            self.domain_changed()?;
        }
        self.advance(delta_t, self.max_subdivisions)
    }

    /// Runs `num_steps` steps of `delta_t`, stopping at the first failure.
    pub fn analyze(&mut self, num_steps: usize, delta_t: f64) -> Result<Vec<StepReport>> {
        let reports = (0..num_steps)
            .map(|_| self.analyze_step(delta_t))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "{} steps done at t={:.6}, {} iterations",
            num_steps,
            self.time(),
            reports.iter().map(|r| r.iterations).sum::<usize>()
        );
        Ok(reports)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.scheme.checkpoint()
    }

    /// Restores the scheme from `checkpoint` and moves the model to its
    /// committed response and time.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        check_size(self.model.num_equations(), checkpoint.committed.len())?;
        if self.scheme.phase() == Phase::Uninitialized
            || self.scheme.num_equations() != self.model.num_equations()
        {
            self.domain_changed()?;
        }
        self.scheme.restore(checkpoint)?;
        let committed = self.scheme.committed();
        self.model.set_current_time(self.scheme.current_time());
        self.model.set_response(
            &committed.displacement,
            &committed.velocity,
            &committed.acceleration,
        );
        self.model.commit()
    }

    //--------------------------------------------------------------------------
    // Internals
    //--------------------------------------------------------------------------

    fn advance(&mut self, delta_t: f64, subdivisions: usize) -> Result<StepReport> {
        match self.try_step(delta_t) {
            Err(err) if subdivisions > 0 && is_recoverable(&err) => {
                warn!(
                    "step of {:.3e} at t={:.6} failed ({}); retrying as two half steps",
                    delta_t,
                    self.time(),
                    err
                );
                let first = self.advance(0.5 * delta_t, subdivisions - 1)?;
                let second = self.advance(0.5 * delta_t, subdivisions - 1)?;
                Ok(StepReport {
                    iterations: first.iterations + second.iterations,
                    norm: second.norm,
                })
            }
            result => result,
        }
    }

    fn try_step(&mut self, delta_t: f64) -> Result<StepReport> {
        self.scheme.new_step(&mut self.model, delta_t)?;
        let result = match self.driver.solve_current_step(
            &mut self.scheme,
            &mut self.model,
            self.solver.as_mut(),
        ) {
            Ok(report) => self.scheme.commit(&mut self.model).map(|_| report),
            Err(err) => Err(err),
        };
        if result.is_err() {
            self.scheme.revert_to_last_step(&mut self.model)?;
        }
        result
    }
}

/// Failures a shorter step may cure.
fn is_recoverable(err: &IntegrationError) -> bool {
    matches!(
        err,
        IntegrationError::ConvergenceFailure { .. } | IntegrationError::SingularSystem
    )
}

//------------------------------------------------------------------------------
// Builder
//------------------------------------------------------------------------------

pub struct TransientAnalysisBuilder<M: AnalysisModel> {
    model: Option<M>,
    scheme: Option<SchemeParameters>,
    driver: DriverOptions,
    linear_solver: LinearSolverKind,
    max_subdivisions: usize,
}

impl<M: AnalysisModel> TransientAnalysisBuilder<M> {
    fn new() -> Self {
        TransientAnalysisBuilder {
            model: None,
            scheme: None,
            driver: DriverOptions::default(),
            linear_solver: LinearSolverKind::default(),
            max_subdivisions: 0,
        }
    }

    pub fn model(mut self, model: M) -> Self {
        self.model = Some(model);
        self
    }

    /// Defaults to average-acceleration Newmark.
    pub fn scheme(mut self, scheme: SchemeParameters) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn driver(mut self, driver: DriverOptions) -> Self {
        self.driver = driver;
        self
    }

    pub fn linear_solver(mut self, kind: LinearSolverKind) -> Self {
        self.linear_solver = kind;
        self
    }

    pub fn max_subdivisions(mut self, max_subdivisions: usize) -> Self {
        self.max_subdivisions = max_subdivisions;
        self
    }

    pub fn build(self) -> Result<TransientAnalysis<M>> {
        let model = self.model.ok_or(IntegrationError::NoModel)?;
        let scheme = self
            .scheme
            .unwrap_or_else(SchemeParameters::average_acceleration);
        Ok(TransientAnalysis {
            model,
            scheme: TimeIntegrationScheme::new(scheme),
            driver: EquilibriumDriver::new(self.driver),
            solver: self.linear_solver.build(),
            max_subdivisions: self.max_subdivisions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::node::Node;
    use crate::element::spring::Spring;
    use crate::model::lumped::LumpedModel;
    use crate::model::DofGroup;
    use approx::assert_relative_eq;

    fn oscillator() -> LumpedModel {
        let mut model = LumpedModel::new();
        let node = model.add_node(
            Node::new(1)
                .with_mass(1.)
                .with_initial_state(&[1.], &[0.], &[-4.]),
        );
        model.add_spring(Spring::grounded(node, 0, 4.)).unwrap();
        model
    }

    #[test]
    fn test_no_model() {
        let result = TransientAnalysis::<LumpedModel>::builder()
            .scheme(SchemeParameters::central_difference())
            .build();
        assert!(matches!(result, Err(IntegrationError::NoModel)));
    }

    #[test]
    fn test_auto_domain_changed() {
        let mut analysis = TransientAnalysis::builder().model(oscillator()).build().unwrap();
        assert_eq!(analysis.scheme().phase(), Phase::Uninitialized);
        analysis.analyze_step(0.01).unwrap();
        assert_eq!(analysis.scheme().num_equations(), 1);

        analysis.model_mut().add_node(Node::new(2).with_mass(1.));
        analysis.analyze_step(0.01).unwrap();
        assert_eq!(analysis.scheme().num_equations(), 3);
        assert_relative_eq!(analysis.time(), 0.02, epsilon = 1e-15);
    }

    #[test]
    fn test_invalid_step() {
        let mut analysis = TransientAnalysis::builder().model(oscillator()).build().unwrap();
        assert!(matches!(
            analysis.analyze_step(-0.1),
            Err(IntegrationError::InvalidTimeStep(_))
        ));
        assert_eq!(analysis.scheme().phase(), Phase::Uninitialized);
    }

    #[test]
    fn test_from_config() {
        let config = AnalysisConfig::explicit(0.01);
        let mut analysis = TransientAnalysis::from_config(oscillator(), &config).unwrap();
        let reports = analysis.analyze(10, config.time_step).unwrap();
        assert!(reports.iter().all(|r| r.iterations == 1));
        assert_relative_eq!(analysis.time(), 0.1, epsilon = 1e-12);
        // cos(2·0.1)
        assert_relative_eq!(analysis.model().displacement()[0], 0.2f64.cos(), epsilon = 1e-3);
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut analysis = TransientAnalysis::builder().model(oscillator()).build().unwrap();
        analysis.analyze(5, 0.01).unwrap();
        let checkpoint = analysis.checkpoint();
        let disp = analysis.model().displacement().clone();

        analysis.analyze(5, 0.01).unwrap();
        analysis.restore(&checkpoint).unwrap();
        assert_relative_eq!(analysis.time(), 0.05, epsilon = 1e-15);
        assert_eq!(analysis.model().displacement(), &disp);
        assert_eq!(analysis.model().node(0).committed_disp()[0], disp[0]);
    }

    #[test]
    fn test_restore_after_resize() {
        let mut analysis = TransientAnalysis::builder().model(oscillator()).build().unwrap();
        analysis.analyze(3, 0.01).unwrap();
        let checkpoint = analysis.checkpoint();
        let disp = analysis.model().displacement().clone();

        analysis.model_mut().add_node(Node::new(2).with_mass(1.));
        assert!(matches!(
            analysis.restore(&checkpoint),
            Err(IntegrationError::IncompatibleSize { expected: 3, found: 1 })
        ));
        assert_eq!(analysis.model().num_equations(), 3);
        assert_eq!(analysis.model().displacement()[0], disp[0]);
        assert_relative_eq!(analysis.time(), 0.03, epsilon = 1e-15);

        // Still usable on the new equation set
        analysis.analyze_step(0.01).unwrap();
        assert_eq!(analysis.scheme().num_equations(), 3);
    }
}
