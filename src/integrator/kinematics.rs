//! Predictor, corrector and commit rules shared by the scheme variants.
//!
//! Each rule is a free function over [`StateVectorSet`]s and
//! [`SchemeParameters`]; [`rules`] selects the set used by a [`SchemeKind`].

use super::params::{SchemeKind, SchemeParameters, StepConstants};
use super::state::{add_scaled, StateVectorSet};
use crate::prelude::*;

type Predict = fn(&SchemeParameters, f64, &StateVectorSet, &mut StateVectorSet) -> Result<()>;
type Correct = fn(&StepConstants, &VectorD, &mut StateVectorSet) -> Result<()>;
type Finalize = fn(&SchemeParameters, f64, &StateVectorSet, &mut StateVectorSet) -> Result<()>;

/// The kinematic rules of one scheme variant.
pub(crate) struct Rules {
    /// Extrapolates the trial state from the committed state at the start of a step.
    pub predict: Predict,
    /// Applies a solved increment to the trial state.
    pub correct: Correct,
    /// Produces the state at t + Δt from the converged trial state.
    pub finalize: Finalize,
}

const IMPLICIT: Rules = Rules {
    predict: predict_implicit,
    correct: correct_implicit,
    finalize: finalize_none,
};

const EXPLICIT: Rules = Rules {
    predict: predict_explicit,
    correct: correct_explicit,
    finalize: finalize_none,
};

const COLLOCATION: Rules = Rules {
    predict: predict_implicit,
    correct: correct_implicit,
    finalize: finalize_collocation,
};

const HYBRID: Rules = Rules {
    predict: predict_implicit,
    correct: correct_implicit,
    finalize: finalize_consistent,
};

pub(crate) fn rules(kind: &SchemeKind) -> &'static Rules {
    match kind {
        SchemeKind::Newmark { .. }
        | SchemeKind::Hht { .. }
        | SchemeKind::GeneralizedAlpha { .. } => &IMPLICIT,
        SchemeKind::NewmarkExplicit { .. } | SchemeKind::GeneralizedAlphaExplicit { .. } => {
            &EXPLICIT
        }
        SchemeKind::Collocation { .. } => &COLLOCATION,
        SchemeKind::HybridSimulation { .. } => &HYBRID,
    }
}

//------------------------------------------------------------------------------
// Predictors
//------------------------------------------------------------------------------

/// Constant-displacement predictor over the (possibly θ-scaled) step.
fn predict_implicit(
    params: &SchemeParameters,
    delta_t: f64,
    committed: &StateVectorSet,
    trial: &mut StateVectorSet,
) -> Result<()> {
    let (beta, gamma) = (params.beta(), params.gamma());
    let h = params.theta() * delta_t;

    trial.assign(committed)?;

    // Velocity
    trial.velocity.fill(0.);
    add_scaled(&mut trial.velocity, &committed.velocity, 1. - gamma / beta)?;
    add_scaled(
        &mut trial.velocity,
        &committed.acceleration,
        h * (1. - 0.5 * gamma / beta),
    )?;

    // Acceleration
    trial.acceleration.fill(0.);
    add_scaled(&mut trial.acceleration, &committed.acceleration, 1. - 0.5 / beta)?;
    add_scaled(&mut trial.acceleration, &committed.velocity, -1. / (beta * h))
}

/// Displacement and velocity from the committed state, zero acceleration.
fn predict_explicit(
    params: &SchemeParameters,
    delta_t: f64,
    committed: &StateVectorSet,
    trial: &mut StateVectorSet,
) -> Result<()> {
    let (beta, gamma) = (params.beta(), params.gamma());
    let h = delta_t;

    trial.assign(committed)?;

    // Displacement
    add_scaled(&mut trial.displacement, &committed.velocity, h)?;
    add_scaled(
        &mut trial.displacement,
        &committed.acceleration,
        h * h * (0.5 - beta),
    )?;

    // Velocity
    add_scaled(&mut trial.velocity, &committed.acceleration, h * (1. - gamma))?;

    // Acceleration is the step unknown
    trial.acceleration.fill(0.);
    Ok(())
}

//------------------------------------------------------------------------------
// Correctors
//------------------------------------------------------------------------------

/// Displacement increment: every quantity accumulates.
fn correct_implicit(c: &StepConstants, delta: &VectorD, trial: &mut StateVectorSet) -> Result<()> {
    add_scaled(&mut trial.displacement, delta, c.c1)?;
    add_scaled(&mut trial.velocity, delta, c.c2)?;
    add_scaled(&mut trial.acceleration, delta, c.c3)
}

/// Acceleration unknown: displacement and velocity accumulate, acceleration is replaced.
fn correct_explicit(c: &StepConstants, delta: &VectorD, trial: &mut StateVectorSet) -> Result<()> {
    add_scaled(&mut trial.displacement, delta, c.c1)?;
    add_scaled(&mut trial.velocity, delta, c.c2)?;
    trial.acceleration.fill(0.);
    add_scaled(&mut trial.acceleration, delta, c.c3)
}

//------------------------------------------------------------------------------
// Finalizers
//------------------------------------------------------------------------------

fn finalize_none(
    _params: &SchemeParameters,
    _delta_t: f64,
    _committed: &StateVectorSet,
    _trial: &mut StateVectorSet,
) -> Result<()> {
    Ok(())
}

/// Maps the state collocated at t + θΔt back to t + Δt.
fn finalize_collocation(
    params: &SchemeParameters,
    delta_t: f64,
    committed: &StateVectorSet,
    trial: &mut StateVectorSet,
) -> Result<()> {
    let theta = params.theta();

    // a_{n+1} = a_n + (a_{n+θ} - a_n) / θ
    trial.acceleration *= 1. / theta;
    add_scaled(
        &mut trial.acceleration,
        &committed.acceleration,
        (theta - 1.) / theta,
    )?;

    newmark_from_acceleration(params, delta_t, committed, trial)
}

/// Re-derives velocity and acceleration from the final displacement so the
/// committed response is kinematically consistent after scaled increments.
fn finalize_consistent(
    params: &SchemeParameters,
    delta_t: f64,
    committed: &StateVectorSet,
    trial: &mut StateVectorSet,
) -> Result<()> {
    let beta = params.beta();
    let h = delta_t;

    // a_{n+1} = (d_{n+1} - d_n - h·v_n - h²(1/2 - β)·a_n) / (β·h²)
    let mut acceleration = trial.displacement.clone();
    add_scaled(&mut acceleration, &committed.displacement, -1.)?;
    add_scaled(&mut acceleration, &committed.velocity, -h)?;
    add_scaled(&mut acceleration, &committed.acceleration, -h * h * (0.5 - beta))?;
    acceleration /= beta * h * h;
    trial.acceleration = acceleration;

    newmark_from_acceleration(params, delta_t, committed, trial)
}

/// Sets trial velocity and displacement from the Newmark relations given the
/// trial acceleration.
fn newmark_from_acceleration(
    params: &SchemeParameters,
    delta_t: f64,
    committed: &StateVectorSet,
    trial: &mut StateVectorSet,
) -> Result<()> {
    let (beta, gamma) = (params.beta(), params.gamma());
    let h = delta_t;

    trial.velocity.copy_from(&committed.velocity);
    add_scaled(&mut trial.velocity, &committed.acceleration, h * (1. - gamma))?;
    add_scaled(&mut trial.velocity, &trial.acceleration, h * gamma)?;

    trial.displacement.copy_from(&committed.displacement);
    add_scaled(&mut trial.displacement, &committed.velocity, h)?;
    add_scaled(
        &mut trial.displacement,
        &committed.acceleration,
        h * h * (0.5 - beta),
    )?;
    add_scaled(&mut trial.displacement, &trial.acceleration, h * h * beta)
}
