//! Analysis configuration.
//!
//! Scheme choice, step size and equilibrium options, decodable from JSON.

use serde::{Deserialize, Serialize};

use crate::integrator::{collocation_beta, SchemeParameters};
use crate::prelude::*;
use crate::solver::{DriverOptions, LinearSolverKind, SolutionAlgorithm};

/// Scheme selection by named constructor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemeConfig {
    #[default]
    AverageAcceleration,
    LinearAcceleration,
    Newmark {
        beta: f64,
        gamma: f64,
    },
    Hht {
        alpha: f64,
    },
    GeneralizedAlpha {
        rho_inf: f64,
    },
    CentralDifference,
    NewmarkExplicit {
        gamma: f64,
    },
    GeneralizedAlphaExplicit {
        rho_b: f64,
    },
    /// β defaults to the minimum-ρ∞ value for θ, γ to ½.
    Collocation {
        theta: f64,
        #[serde(default)]
        beta: Option<f64>,
        #[serde(default)]
        gamma: Option<f64>,
    },
    HybridNewmark {
        beta: f64,
        gamma: f64,
        max_iterations: usize,
    },
    HybridGeneralizedAlpha {
        rho_inf: f64,
        max_iterations: usize,
    },
}

impl SchemeConfig {
    /// Validates the parameters and builds the scheme.
    pub fn build(&self) -> Result<SchemeParameters> {
        match *self {
            SchemeConfig::AverageAcceleration => Ok(SchemeParameters::average_acceleration()),
            SchemeConfig::LinearAcceleration => Ok(SchemeParameters::linear_acceleration()),
            SchemeConfig::Newmark { beta, gamma } => SchemeParameters::newmark(beta, gamma),
            SchemeConfig::Hht { alpha } => SchemeParameters::hht(alpha),
            SchemeConfig::GeneralizedAlpha { rho_inf } => {
                SchemeParameters::generalized_alpha(rho_inf)
            }
            SchemeConfig::CentralDifference => Ok(SchemeParameters::central_difference()),
            SchemeConfig::NewmarkExplicit { gamma } => SchemeParameters::newmark_explicit(gamma),
            SchemeConfig::GeneralizedAlphaExplicit { rho_b } => {
                SchemeParameters::generalized_alpha_explicit(rho_b)
            }
            SchemeConfig::Collocation {
                theta,
                beta: None,
                gamma: None,
            } => SchemeParameters::collocation(theta),
            SchemeConfig::Collocation { theta, beta, gamma } => SchemeParameters::collocation_with(
                theta,
                beta.unwrap_or_else(|| collocation_beta(theta)),
                gamma.unwrap_or(0.5),
            ),
            SchemeConfig::HybridNewmark {
                beta,
                gamma,
                max_iterations,
            } => SchemeParameters::hybrid_newmark(beta, gamma, max_iterations),
            SchemeConfig::HybridGeneralizedAlpha {
                rho_inf,
                max_iterations,
            } => SchemeParameters::hybrid_generalized_alpha(rho_inf, max_iterations),
        }
    }
}

/// Configuration of a transient analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub scheme: SchemeConfig,

    /// Time step Δt.
    pub time_step: f64,

    /// Number of steps run by `analyze`.
    pub num_steps: usize,

    /// Equilibrium iteration options.
    pub driver: DriverOptions,

    pub linear_solver: LinearSolverKind,

    /// How many times a failed step may be halved before the analysis gives up.
    pub max_subdivisions: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            scheme: SchemeConfig::default(),
            time_step: 0.01,
            num_steps: 100,
            driver: DriverOptions::default(),
            linear_solver: LinearSolverKind::default(),
            max_subdivisions: 0,
        }
    }
}

impl AnalysisConfig {
    /// Explicit central difference with a Cholesky solve of the mass-dominated system.
    pub fn explicit(time_step: f64) -> Self {
        Self {
            scheme: SchemeConfig::CentralDifference,
            time_step,
            linear_solver: LinearSolverKind::Cholesky,
            ..Default::default()
        }
    }

    /// Generalized-α with strong high-frequency dissipation, modified Newton and step halving.
    pub fn dissipative(time_step: f64) -> Self {
        Self {
            scheme: SchemeConfig::GeneralizedAlpha { rho_inf: 0.5 },
            time_step,
            driver: DriverOptions {
                algorithm: SolutionAlgorithm::ModifiedNewton,
                max_iterations: 50,
                ..Default::default()
            },
            max_subdivisions: 4,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.time_step > 0. && self.time_step.is_finite()) {
            return Err(IntegrationError::InvalidTimeStep(self.time_step));
        }
        if self.driver.max_iterations == 0 {
            return Err(IntegrationError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        let tolerance = self.driver.test.tolerance();
        if !(tolerance > 0. && tolerance.is_finite()) {
            return Err(IntegrationError::InvalidParameter(format!(
                "convergence tolerance {tolerance} must be positive"
            )));
        }
        self.scheme.build()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::SchemeKind;
    use crate::solver::ConvergenceTest;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.driver.test,
            ConvergenceTest::NormDispIncr { tolerance: 1e-8 }
        );
        AnalysisConfig::explicit(1e-3).validate().unwrap();
        AnalysisConfig::dissipative(1e-2).validate().unwrap();
    }

    #[test]
    fn test_from_json() {
        let config = AnalysisConfig::from_json(
            r#"{
                "scheme": {"type": "generalized_alpha", "rho_inf": 0.8},
                "time_step": 0.005,
                "driver": {"test": {"type": "norm_unbalance", "tolerance": 1e-6}},
                "linear_solver": "cholesky"
            }"#,
        )
        .unwrap();
        assert_eq!(config.num_steps, 100);
        assert_eq!(config.driver.max_iterations, 25);
        assert_eq!(config.linear_solver, LinearSolverKind::Cholesky);
        let params = config.scheme.build().unwrap();
        assert!(matches!(params.kind(), SchemeKind::GeneralizedAlpha { .. }));
    }

    #[test]
    fn test_round_trip() {
        let config = AnalysisConfig::dissipative(0.02);
        let decoded = AnalysisConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_collocation_defaults() {
        let params = SchemeConfig::Collocation {
            theta: 1.4,
            beta: None,
            gamma: Some(0.5),
        }
        .build()
        .unwrap();
        assert_relative_eq!(params.beta(), collocation_beta(1.4));
        assert_eq!(params.theta(), 1.4);
    }

    #[test]
    fn test_rejects() {
        let config = AnalysisConfig {
            time_step: 0.,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(IntegrationError::InvalidTimeStep(_))
        ));

        let config = AnalysisConfig {
            scheme: SchemeConfig::Hht { alpha: 0.5 },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(IntegrationError::InvalidParameter(_))
        ));

        assert!(matches!(
            AnalysisConfig::from_json(r#"{"scheme": {"type": "runge_kutta"}}"#),
            Err(IntegrationError::Json(_))
        ));
    }
}
