//! Transient time-integration schemes.
//!
//! A [`TimeIntegrationScheme`] advances `M·a + C·v + f_int(u) = f_ext(t)` one
//! step at a time:
//!
//! ```text
//! domain_changed -> new_step -> (form tangents, solve, update)* -> commit
//!                                                               \-> revert_to_last_step
//! ```
//!
//! The variant is selected by [`SchemeKind`]; predictor and corrector rules
//! are shared free functions chosen per kind.

mod checkpoint;
mod kinematics;
mod params;
mod scheme;
mod state;

pub use checkpoint::Checkpoint;
pub use params::{
    collocation_beta, collocation_beta_bounds, Family, SchemeKind, SchemeParameters,
    StepConstants, MIN_EXPLICIT_RHO_B,
};
pub use scheme::{IterationPolicy, Phase, TimeIntegrationScheme};
pub use state::{add_scaled, StateVectorSet};
