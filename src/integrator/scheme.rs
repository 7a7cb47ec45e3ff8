use log::{debug, warn};

use super::checkpoint::Checkpoint;
use super::kinematics::rules;
use super::params::{Family, SchemeParameters, StepConstants};
use super::state::StateVectorSet;
use crate::element::{FeElement, TangentKind};
use crate::error::check_size;
use crate::model::{AnalysisModel, DofGroup};
use crate::prelude::*;

/// Lifecycle phase of a [`TimeIntegrationScheme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `domain_changed` has not run yet.
    Uninitialized,
    /// Between steps.
    Ready,
    /// Between `new_step` and `commit`/`revert_to_last_step`.
    StepOpen,
}

/// How the equilibrium driver must iterate a step of this scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationPolicy {
    /// Exactly one solve and one update.
    SingleShot,
    /// Exactly this many solves and updates, without a convergence test.
    Fixed(usize),
    /// Iterate until the convergence test passes.
    UntilConverged,
}

/// Step-advancing state machine for one member of the Newmark / generalized-α family.
#[derive(Debug, Clone)]
pub struct TimeIntegrationScheme {
    params: SchemeParameters,
    constants: StepConstants,
    committed: StateVectorSet,
    trial: StateVectorSet,
    evaluation: StateVectorSet,
    phase: Phase,
    delta_t: f64,
    step_start_time: f64,
    current_time: f64,
    update_count: usize,
    increment: VectorD, // scratch for scaled hybrid increments
}

impl TimeIntegrationScheme {
    pub fn new(params: SchemeParameters) -> Self {
        TimeIntegrationScheme {
            params,
            constants: StepConstants::default(),
            committed: StateVectorSet::new(0),
            trial: StateVectorSet::new(0),
            evaluation: StateVectorSet::new(0),
            phase: Phase::Uninitialized,
            delta_t: 0.,
            step_start_time: 0.,
            current_time: 0.,
            update_count: 0,
            increment: VectorD::zeros(0),
        }
    }

    pub fn params(&self) -> &SchemeParameters {
        &self.params
    }

    pub fn constants(&self) -> &StepConstants {
        &self.constants
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn committed(&self) -> &StateVectorSet {
        &self.committed
    }

    pub fn trial(&self) -> &StateVectorSet {
        &self.trial
    }

    pub fn evaluation(&self) -> &StateVectorSet {
        &self.evaluation
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn update_count(&self) -> usize {
        self.update_count
    }

    pub fn num_equations(&self) -> usize {
        self.committed.len()
    }

    pub fn iteration_policy(&self) -> IterationPolicy {
        match self.params.max_iterations() {
            Some(n) => IterationPolicy::Fixed(n),
            None if self.params.is_single_shot() => IterationPolicy::SingleShot,
            None => IterationPolicy::UntilConverged,
        }
    }

    //--------------------------------------------------------------------------
    // Lifecycle
    //--------------------------------------------------------------------------

    /// Resizes the state to the model's equation count and reloads the
    /// committed response from the model's DOF groups.
    pub fn domain_changed(&mut self, model: &dyn AnalysisModel) -> Result<()> {
        let n = model.num_equations();
        let mut committed = StateVectorSet::new(n);
        for group in model.dof_groups() {
            committed.set_from_committed(
                group.equations(),
                group.committed_disp(),
                group.committed_vel(),
                group.committed_accel(),
            )?;
        }

        if n != self.committed.len() {
            debug!("resizing integrator state from {} to {} equations", self.committed.len(), n);
            self.committed.resize(n);
            self.trial.resize(n);
            self.evaluation.resize(n);
            self.increment = VectorD::zeros(n);
        }
        self.committed.assign(&committed)?;
        self.trial.assign(&committed)?;
        self.evaluation.assign(&committed)?;

        self.current_time = model.current_time();
        self.step_start_time = self.current_time;
        self.update_count = 0;
        self.phase = Phase::Ready;
        Ok(())
    }

    /// Opens a step of `delta_t`: predicts the trial state and moves the
    /// model to the evaluation time.
    pub fn new_step(&mut self, model: &mut dyn AnalysisModel, delta_t: f64) -> Result<()> {
        if !(delta_t > 0. && delta_t.is_finite()) {
            return Err(IntegrationError::InvalidTimeStep(delta_t));
        }
        match self.phase {
            Phase::Uninitialized => {
                return Err(IntegrationError::NotInitialized {
                    operation: "new_step",
                })
            }
            Phase::StepOpen => return Err(IntegrationError::StepInProgress),
            Phase::Ready => {}
        }
        check_size(self.committed.len(), model.num_equations())?;
        let constants = self.params.derive_step_constants(delta_t)?;

        // Carry the last converged state forward as the base of the step
        self.committed.assign(&self.trial)?;

        let kinematics = rules(self.params.kind());
        (kinematics.predict)(&self.params, delta_t, &self.committed, &mut self.trial)?;
        self.evaluation.interpolate(
            &self.committed,
            &self.trial,
            self.params.alpha_f(),
            self.params.alpha_i(),
        )?;

        // Advance to the evaluation time and apply loads there
        self.step_start_time = model.current_time();
        self.current_time = self.step_start_time + self.params.evaluation_fraction() * delta_t;
        model.set_current_time(self.current_time);
        model.apply_load(self.current_time);

        match self.params.family() {
            Family::Implicit => {
                model.set_vel(&self.evaluation.velocity);
                model.set_accel(&self.evaluation.acceleration);
            }
            Family::Explicit => model.set_response(
                &self.evaluation.displacement,
                &self.evaluation.velocity,
                &self.evaluation.acceleration,
            ),
        }

        self.constants = constants;
        self.delta_t = delta_t;
        self.update_count = 0;
        self.phase = Phase::StepOpen;
        debug!(
            "step opened: dt={:.3e}, evaluation time {:.6}",
            delta_t, self.current_time
        );
        Ok(())
    }

    /// Zeroes the element tangent and adds the scheme-weighted stiffness,
    /// damping and mass.
    pub fn form_ele_tangent(&self, element: &mut dyn FeElement, kind: TangentKind) -> Result<()> {
        self.require_open("form_ele_tangent")?;
        let (k, c, m) = self.tangent_factors();
        element.zero_tangent();
        if k != 0. {
            match kind {
                TangentKind::Current => element.add_kt_to_tang(k),
                TangentKind::Initial => element.add_ki_to_tang(k),
            }
        }
        if c != 0. {
            element.add_c_to_tang(c);
        }
        if m != 0. {
            element.add_m_to_tang(m);
        }
        Ok(())
    }

    /// Zeroes the nodal tangent and adds the scheme-weighted damping and mass.
    pub fn form_nod_tangent(&self, group: &mut dyn DofGroup) -> Result<()> {
        self.require_open("form_nod_tangent")?;
        let (_, c, m) = self.tangent_factors();
        group.zero_tangent();
        if c != 0. {
            group.add_c_to_tang(c);
        }
        if m != 0. {
            group.add_m_to_tang(m);
        }
        Ok(())
    }

    /// Applies a solved increment to the trial state and pushes the new
    /// evaluation state into the model.
    pub fn update(&mut self, model: &mut dyn AnalysisModel, delta: &VectorD) -> Result<()> {
        self.require_open("update")?;
        check_size(self.trial.len(), delta.len())?;
        if self.params.is_single_shot() && self.update_count > 0 {
            warn!("update called {} times in a single-shot step", self.update_count + 1);
            return Err(IntegrationError::MultipleUpdateNotAllowed);
        }

        self.increment.copy_from(delta);
        if let Some(max_iterations) = self.params.max_iterations() {
            // Spread the remaining increment over the remaining iterations
            let iteration = self.update_count + 1;
            let remaining = max_iterations.saturating_sub(iteration) + 1;
            self.increment /= remaining as f64;
        }

        let kinematics = rules(self.params.kind());
        (kinematics.correct)(&self.constants, &self.increment, &mut self.trial)?;
        self.evaluation.interpolate(
            &self.committed,
            &self.trial,
            self.params.alpha_f(),
            self.params.alpha_i(),
        )?;
        model.set_response(
            &self.evaluation.displacement,
            &self.evaluation.velocity,
            &self.evaluation.acceleration,
        );

        self.update_count += 1;
        Ok(())
    }

    /// Accepts the trial state as the response at t + Δt.
    pub fn commit(&mut self, model: &mut dyn AnalysisModel) -> Result<()> {
        self.require_open("commit")?;

        let kinematics = rules(self.params.kind());
        (kinematics.finalize)(&self.params, self.delta_t, &self.committed, &mut self.trial)?;
        model.set_response(
            &self.trial.displacement,
            &self.trial.velocity,
            &self.trial.acceleration,
        );

        // Advance by the part of the step not covered in new_step
        self.current_time = self.step_start_time + self.delta_t;
        model.set_current_time(self.current_time);
        model.commit()?;

        self.committed.assign(&self.trial)?;
        self.evaluation.assign(&self.trial)?;
        self.step_start_time = self.current_time;
        self.phase = Phase::Ready;
        debug!(
            "step committed at t={:.6} after {} updates",
            self.current_time, self.update_count
        );
        Ok(())
    }

    /// Discards the open step, restoring the committed state in the scheme
    /// and the model. Calling it again has no further effect.
    pub fn revert_to_last_step(&mut self, model: &mut dyn AnalysisModel) -> Result<()> {
        if self.phase == Phase::Uninitialized {
            return Err(IntegrationError::NotInitialized {
                operation: "revert_to_last_step",
            });
        }
        self.trial.assign(&self.committed)?;
        self.evaluation.assign(&self.committed)?;

        self.current_time = self.step_start_time;
        model.set_current_time(self.current_time);
        model.set_response(
            &self.committed.displacement,
            &self.committed.velocity,
            &self.committed.acceleration,
        );

        self.update_count = 0;
        self.phase = Phase::Ready;
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Checkpoints
    //--------------------------------------------------------------------------

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            kind: *self.params.kind(),
            c1: self.constants.c1,
            c2: self.constants.c2,
            c3: self.constants.c3,
            delta_t: self.delta_t,
            current_time: self.current_time,
            committed: self.committed.clone(),
            trial: self.trial.clone(),
            evaluation: self.evaluation.clone(),
        }
    }

    /// Restores a checkpoint taken from a scheme of the same kind and size.
    ///
    /// The scheme must already match the model (`domain_changed`); the
    /// restored scheme is left between steps.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        if self.phase == Phase::Uninitialized {
            return Err(IntegrationError::NotInitialized { operation: "restore" });
        }
        if checkpoint.kind != *self.params.kind() {
            return Err(IntegrationError::InvalidParameter(format!(
                "checkpoint of {:?} cannot restore a {:?} scheme",
                checkpoint.kind,
                self.params.kind()
            )));
        }
        for set in [&checkpoint.committed, &checkpoint.trial, &checkpoint.evaluation] {
            set.validate()?;
            check_size(self.committed.len(), set.len())?;
        }

        self.constants = StepConstants {
            c1: checkpoint.c1,
            c2: checkpoint.c2,
            c3: checkpoint.c3,
        };
        self.delta_t = checkpoint.delta_t;
        self.current_time = checkpoint.current_time;
        self.step_start_time = checkpoint.current_time;
        self.committed.assign(&checkpoint.committed)?;
        self.trial.assign(&checkpoint.trial)?;
        self.evaluation.assign(&checkpoint.evaluation)?;
        self.update_count = 0;
        self.phase = Phase::Ready;
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Helpers
    //--------------------------------------------------------------------------

    fn require_open(&self, operation: &'static str) -> Result<()> {
        match self.phase {
            Phase::StepOpen => Ok(()),
            Phase::Uninitialized => Err(IntegrationError::NotInitialized { operation }),
            Phase::Ready => Err(IntegrationError::StepNotOpen { operation }),
        }
    }

    /// Stiffness, damping and mass factors of the effective tangent.
    fn tangent_factors(&self) -> (f64, f64, f64) {
        let StepConstants { c1, c2, c3 } = self.constants;
        let (alpha_f, alpha_i) = (self.params.alpha_f(), self.params.alpha_i());
        (alpha_f * c1, alpha_f * c2, alpha_i * c3)
    }
}
