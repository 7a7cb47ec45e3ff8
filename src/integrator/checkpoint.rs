use serde::{Deserialize, Serialize};

use super::params::SchemeKind;
use super::state::StateVectorSet;
use crate::prelude::*;

/// Persisted integrator state.
///
/// Fields are written and read back in declaration order: shape parameters,
/// step constants, step size and time, then the committed, trial and
/// evaluation states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub kind: SchemeKind,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub delta_t: f64,
    pub current_time: f64,
    pub committed: StateVectorSet,
    pub trial: StateVectorSet,
    pub evaluation: StateVectorSet,
}

impl Checkpoint {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
