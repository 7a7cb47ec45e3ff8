//! Error type shared by the integrators, drivers and reference collaborators.

use thiserror::Error;

/// Errors raised while advancing a transient analysis.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// A non-positive or non-finite time step was passed to `new_step`.
    #[error("invalid time step {0}: must be positive and finite")]
    InvalidTimeStep(f64),

    /// A step-phase method was called before `domain_changed`, or a solve before `factor`.
    #[error("{operation} called before initialization")]
    NotInitialized { operation: &'static str },

    /// A vector does not have the length of the current equation set.
    #[error("incompatible size: expected {expected}, found {found}")]
    IncompatibleSize { expected: usize, found: usize },

    /// `update` was called twice within one step of a single-shot scheme.
    #[error("update called more than once in a step of a single-shot scheme")]
    MultipleUpdateNotAllowed,

    /// Scheme shape parameters or analysis options are out of bounds.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The analysis was built without a model.
    #[error("no analysis model bound")]
    NoModel,

    /// `update`, `commit` or a tangent form was called with no step open.
    #[error("{operation} requires an open step")]
    StepNotOpen { operation: &'static str },

    /// `new_step` was called while the previous step was neither committed nor reverted.
    #[error("new_step called while a step is already open")]
    StepInProgress,

    /// The effective system could not be factored.
    #[error("effective system matrix is singular")]
    SingularSystem,

    /// The equilibrium iteration did not converge.
    #[error("no convergence after {iterations} iterations (norm: {norm:.3e})")]
    ConvergenceFailure { iterations: usize, norm: f64 },

    /// Checkpoint or configuration (de)serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, IntegrationError>`.
pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Fails with `IncompatibleSize` unless `found == expected`.
pub(crate) fn check_size(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(IntegrationError::IncompatibleSize { expected, found })
    }
}
