//! Shape parameters of the Newmark / generalized-α / collocation family and
//! the step constants derived from them.
//!
//! All α weights use the convention that the weight multiplies the *new*
//! (trial) state: an evaluation quantity is `(1 - α)·x_n + α·x_{n+1}`, so the
//! plain Newmark method has `α_I = α_F = 1`.

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Smallest bifurcation spectral radius accepted by the explicit generalized-α method.
pub const MIN_EXPLICIT_RHO_B: f64 = 0.381_966_011_250_105_1;

/// Monomial coefficients (ascending powers of θ) of the fitted minimum-ρ∞
/// collocation β, valid for 1 ≤ θ ≤ 2.
const COLLOCATION_BETA_FIT: [f64; 10] = [
    1.880577447449743e+02,
    -1.119269806428484e+03,
    2.967206882262780e+03,
    -4.584097010431043e+03,
    4.542362301677331e+03,
    -2.991372605928106e+03,
    1.308498993492082e+03,
    -3.664495387071200e+02,
    5.960145545042226e+01,
    -4.288416132836970e+00,
];

/// Shape parameters of one member of the integrator family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemeKind {
    Newmark {
        beta: f64,
        gamma: f64,
    },
    Hht {
        alpha: f64,
        beta: f64,
        gamma: f64,
    },
    GeneralizedAlpha {
        alpha_i: f64,
        alpha_f: f64,
        beta: f64,
        gamma: f64,
    },
    NewmarkExplicit {
        gamma: f64,
    },
    GeneralizedAlphaExplicit {
        alpha_i: f64,
        beta: f64,
        gamma: f64,
    },
    Collocation {
        theta: f64,
        beta: f64,
        gamma: f64,
    },
    HybridSimulation {
        alpha_i: f64,
        alpha_f: f64,
        beta: f64,
        gamma: f64,
        max_iterations: usize,
    },
}

/// Whether the step unknown is a displacement (implicit) or an acceleration (explicit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Implicit,
    Explicit,
}

/// Step-scaling coefficients for stiffness, damping and mass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepConstants {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
}

/// Validated, immutable scheme parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemeParameters {
    kind: SchemeKind,
}

impl SchemeParameters {
    /// Validates a directly specified kind.
    pub fn from_kind(kind: SchemeKind) -> Result<Self> {
        validate(&kind)?;
        Ok(SchemeParameters { kind })
    }

    //--------------------------------------------------------------------------
    // Newmark
    //--------------------------------------------------------------------------

    pub fn newmark(beta: f64, gamma: f64) -> Result<Self> {
        Self::from_kind(SchemeKind::Newmark { beta, gamma })
    }

    /// Trapezoidal rule, unconditionally stable and energy conserving.
    pub fn average_acceleration() -> Self {
        SchemeParameters {
            kind: SchemeKind::Newmark {
                beta: 0.25,
                gamma: 0.5,
            },
        }
    }

    pub fn linear_acceleration() -> Self {
        SchemeParameters {
            kind: SchemeKind::Newmark {
                beta: 1. / 6.,
                gamma: 0.5,
            },
        }
    }

    /// Hilber-Hughes-Taylor method, `2/3 <= alpha <= 1`.
    pub fn hht(alpha: f64) -> Result<Self> {
        if !(2. / 3. ..=1.).contains(&alpha) {
            return Err(invalid(format!("HHT alpha {alpha} outside [2/3, 1]")));
        }
        Self::from_kind(SchemeKind::Hht {
            alpha,
            beta: 0.25 * (2. - alpha).powi(2),
            gamma: 1.5 - alpha,
        })
    }

    //--------------------------------------------------------------------------
    // Generalized-α
    //--------------------------------------------------------------------------

    /// Implicit generalized-α from the spectral radius at infinite frequency.
    pub fn generalized_alpha(rho_inf: f64) -> Result<Self> {
        if !(0. ..=1.).contains(&rho_inf) {
            return Err(invalid(format!("rho_inf {rho_inf} outside [0, 1]")));
        }
        let (alpha_i, alpha_f) = alphas_from_rho_inf(rho_inf);
        Self::generalized_alpha_from_alphas(alpha_i, alpha_f)
    }

    /// Implicit generalized-α with β and γ chosen for second-order accuracy.
    pub fn generalized_alpha_from_alphas(alpha_i: f64, alpha_f: f64) -> Result<Self> {
        let gamma = 0.5 + alpha_i - alpha_f;
        let beta = 0.25 * (1. + alpha_i - alpha_f).powi(2);
        Self::from_kind(SchemeKind::GeneralizedAlpha {
            alpha_i,
            alpha_f,
            beta,
            gamma,
        })
    }

    //--------------------------------------------------------------------------
    // Explicit
    //--------------------------------------------------------------------------

    pub fn newmark_explicit(gamma: f64) -> Result<Self> {
        Self::from_kind(SchemeKind::NewmarkExplicit { gamma })
    }

    pub fn central_difference() -> Self {
        SchemeParameters {
            kind: SchemeKind::NewmarkExplicit { gamma: 0.5 },
        }
    }

    /// Explicit generalized-α from the spectral radius at the bifurcation limit.
    pub fn generalized_alpha_explicit(rho_b: f64) -> Result<Self> {
        if !(MIN_EXPLICIT_RHO_B..=1.).contains(&rho_b) {
            return Err(invalid(format!(
                "rho_b {rho_b} outside [{MIN_EXPLICIT_RHO_B}, 1]"
            )));
        }
        let alpha_m = (2. * rho_b - 1.) / (1. + rho_b);
        Self::from_kind(SchemeKind::GeneralizedAlphaExplicit {
            alpha_i: 1. - alpha_m,
            beta: (5. - 3. * rho_b) / ((1. + rho_b).powi(2) * (2. - rho_b)),
            gamma: 1.5 - alpha_m,
        })
    }

    //--------------------------------------------------------------------------
    // Collocation
    //--------------------------------------------------------------------------

    /// θ-collocation with γ = 1/2 and the fitted β(θ), `1 <= theta <= 2`.
    pub fn collocation(theta: f64) -> Result<Self> {
        if !(1. ..=2.).contains(&theta) {
            return Err(invalid(format!("collocation theta {theta} outside [1, 2]")));
        }
        Self::from_kind(SchemeKind::Collocation {
            theta,
            beta: collocation_beta(theta),
            gamma: 0.5,
        })
    }

    pub fn collocation_with(theta: f64, beta: f64, gamma: f64) -> Result<Self> {
        Self::from_kind(SchemeKind::Collocation { theta, beta, gamma })
    }

    //--------------------------------------------------------------------------
    // Hybrid simulation
    //--------------------------------------------------------------------------

    /// Newmark scheme run for a fixed number of increment-reducing iterations.
    pub fn hybrid_newmark(beta: f64, gamma: f64, max_iterations: usize) -> Result<Self> {
        Self::from_kind(SchemeKind::HybridSimulation {
            alpha_i: 1.,
            alpha_f: 1.,
            beta,
            gamma,
            max_iterations,
        })
    }

    /// Generalized-α scheme run for a fixed number of increment-reducing iterations.
    pub fn hybrid_generalized_alpha(rho_inf: f64, max_iterations: usize) -> Result<Self> {
        let ga = Self::generalized_alpha(rho_inf)?;
        Self::from_kind(SchemeKind::HybridSimulation {
            alpha_i: ga.alpha_i(),
            alpha_f: ga.alpha_f(),
            beta: ga.beta(),
            gamma: ga.gamma(),
            max_iterations,
        })
    }

    //--------------------------------------------------------------------------
    // Accessors
    //--------------------------------------------------------------------------

    pub fn kind(&self) -> &SchemeKind {
        &self.kind
    }

    pub fn family(&self) -> Family {
        match self.kind {
            SchemeKind::NewmarkExplicit { .. } | SchemeKind::GeneralizedAlphaExplicit { .. } => {
                Family::Explicit
            }
            _ => Family::Implicit,
        }
    }

    /// Weight of the trial state in the evaluation displacement and velocity.
    pub fn alpha_f(&self) -> f64 {
        match self.kind {
            SchemeKind::Hht { alpha, .. } => alpha,
            SchemeKind::GeneralizedAlpha { alpha_f, .. }
            | SchemeKind::HybridSimulation { alpha_f, .. } => alpha_f,
            SchemeKind::GeneralizedAlphaExplicit { .. } => 0.,
            _ => 1.,
        }
    }

    /// Weight of the trial state in the evaluation acceleration.
    pub fn alpha_i(&self) -> f64 {
        match self.kind {
            SchemeKind::GeneralizedAlpha { alpha_i, .. }
            | SchemeKind::GeneralizedAlphaExplicit { alpha_i, .. }
            | SchemeKind::HybridSimulation { alpha_i, .. } => alpha_i,
            _ => 1.,
        }
    }

    pub fn beta(&self) -> f64 {
        match self.kind {
            SchemeKind::Newmark { beta, .. }
            | SchemeKind::Hht { beta, .. }
            | SchemeKind::GeneralizedAlpha { beta, .. }
            | SchemeKind::GeneralizedAlphaExplicit { beta, .. }
            | SchemeKind::Collocation { beta, .. }
            | SchemeKind::HybridSimulation { beta, .. } => beta,
            SchemeKind::NewmarkExplicit { .. } => 0.,
        }
    }

    pub fn gamma(&self) -> f64 {
        match self.kind {
            SchemeKind::Newmark { gamma, .. }
            | SchemeKind::Hht { gamma, .. }
            | SchemeKind::GeneralizedAlpha { gamma, .. }
            | SchemeKind::NewmarkExplicit { gamma }
            | SchemeKind::GeneralizedAlphaExplicit { gamma, .. }
            | SchemeKind::Collocation { gamma, .. }
            | SchemeKind::HybridSimulation { gamma, .. } => gamma,
        }
    }

    /// Collocation factor on the step size, 1 for every other kind.
    pub fn theta(&self) -> f64 {
        match self.kind {
            SchemeKind::Collocation { theta, .. } => theta,
            _ => 1.,
        }
    }

    /// Fraction of the step at which loads and residuals are evaluated.
    pub fn evaluation_fraction(&self) -> f64 {
        self.alpha_f() * self.theta()
    }

    /// Fixed iteration count of hybrid-simulation schemes.
    pub fn max_iterations(&self) -> Option<usize> {
        match self.kind {
            SchemeKind::HybridSimulation { max_iterations, .. } => Some(max_iterations),
            _ => None,
        }
    }

    /// Whether the formulation admits exactly one `update` per step.
    pub fn is_single_shot(&self) -> bool {
        self.family() == Family::Explicit
    }

    /// Derives c1 (stiffness), c2 (damping) and c3 (mass) for a step of `delta_t`.
    pub fn derive_step_constants(&self, delta_t: f64) -> Result<StepConstants> {
        if !(delta_t > 0. && delta_t.is_finite()) {
            return Err(invalid(format!("time step {delta_t} must be positive")));
        }
        let (beta, gamma) = (self.beta(), self.gamma());
        match self.family() {
            Family::Implicit => {
                if beta == 0. || gamma == 0. {
                    return Err(invalid(format!(
                        "implicit scheme requires non-zero beta and gamma (beta={beta}, gamma={gamma})"
                    )));
                }
                let h = self.theta() * delta_t;
                Ok(StepConstants {
                    c1: 1.,
                    c2: gamma / (beta * h),
                    c3: 1. / (beta * h * h),
                })
            }
            Family::Explicit => Ok(StepConstants {
                c1: beta * delta_t * delta_t,
                c2: gamma * delta_t,
                c3: 1.,
            }),
        }
    }
}

/// Fitted β(θ) minimizing the spectral radius at infinite frequency for
/// γ = 1/2, clamped to the unconditional-stability interval.
pub fn collocation_beta(theta: f64) -> f64 {
    let beta = COLLOCATION_BETA_FIT
        .iter()
        .rev()
        .fold(0., |acc, &c| acc * theta + c);
    let (lower, upper) = collocation_beta_bounds(theta);
    beta.max(lower).min(upper)
}

/// Interval of β giving unconditional stability for θ-collocation with γ = 1/2.
pub fn collocation_beta_bounds(theta: f64) -> (f64, f64) {
    let lower = (2. * theta * theta - 1.) / (4. * (2. * theta.powi(3) - 1.));
    let upper = theta / (2. * (theta + 1.));
    (lower, upper)
}

/// Chung-Hulbert weights (on the new state) for a spectral radius `rho_inf`.
fn alphas_from_rho_inf(rho_inf: f64) -> (f64, f64) {
    ((2. - rho_inf) / (1. + rho_inf), 1. / (1. + rho_inf))
}

fn invalid(msg: String) -> IntegrationError {
    IntegrationError::InvalidParameter(msg)
}

fn validate(kind: &SchemeKind) -> Result<()> {
    let finite = |name: &str, v: f64| -> Result<()> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(invalid(format!("{name} must be finite, got {v}")))
        }
    };
    let positive = |name: &str, v: f64| -> Result<()> {
        finite(name, v)?;
        if v > 0. {
            Ok(())
        } else {
            Err(invalid(format!("{name} must be positive, got {v}")))
        }
    };

    match *kind {
        SchemeKind::Newmark { beta, gamma } => {
            positive("beta", beta)?;
            positive("gamma", gamma)
        }
        SchemeKind::Hht { alpha, beta, gamma } => {
            positive("alpha", alpha)?;
            positive("beta", beta)?;
            positive("gamma", gamma)
        }
        SchemeKind::GeneralizedAlpha {
            alpha_i,
            alpha_f,
            beta,
            gamma,
        } => {
            positive("alpha_i", alpha_i)?;
            positive("alpha_f", alpha_f)?;
            positive("beta", beta)?;
            positive("gamma", gamma)
        }
        SchemeKind::NewmarkExplicit { gamma } => positive("gamma", gamma),
        SchemeKind::GeneralizedAlphaExplicit {
            alpha_i,
            beta,
            gamma,
        } => {
            positive("alpha_i", alpha_i)?;
            finite("beta", beta)?;
            if beta < 0. {
                return Err(invalid(format!("beta must be non-negative, got {beta}")));
            }
            positive("gamma", gamma)
        }
        SchemeKind::Collocation { theta, beta, gamma } => {
            finite("theta", theta)?;
            if theta < 1. {
                return Err(invalid(format!("collocation theta {theta} must be >= 1")));
            }
            positive("beta", beta)?;
            positive("gamma", gamma)
        }
        SchemeKind::HybridSimulation {
            alpha_i,
            alpha_f,
            beta,
            gamma,
            max_iterations,
        } => {
            positive("alpha_i", alpha_i)?;
            positive("alpha_f", alpha_f)?;
            positive("beta", beta)?;
            positive("gamma", gamma)?;
            if max_iterations == 0 {
                return Err(invalid("hybrid max_iterations must be at least 1".into()));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_newmark_constants() {
        let p = SchemeParameters::average_acceleration();
        let c = p.derive_step_constants(0.1).unwrap();
        assert_relative_eq!(c.c1, 1.);
        assert_relative_eq!(c.c2, 20., max_relative = 1e-12);
        assert_relative_eq!(c.c3, 400., max_relative = 1e-12);
    }

    #[test]
    fn test_explicit_constants() {
        let p = SchemeParameters::generalized_alpha_explicit(0.5).unwrap();
        let c = p.derive_step_constants(0.01).unwrap();
        assert_relative_eq!(c.c1, p.beta() * 1e-4, max_relative = 1e-12);
        assert_relative_eq!(c.c2, p.gamma() * 0.01, max_relative = 1e-12);
        assert_relative_eq!(c.c3, 1.);

        let c = SchemeParameters::central_difference()
            .derive_step_constants(0.01)
            .unwrap();
        assert_eq!(c.c1, 0.);
    }

    #[test]
    fn test_constants_reject_bad_time_step() {
        let p = SchemeParameters::average_acceleration();
        for dt in [0., -1., f64::NAN, f64::INFINITY] {
            assert!(matches!(
                p.derive_step_constants(dt),
                Err(IntegrationError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_constants_are_finite() {
        let schemes = vec![
            SchemeParameters::average_acceleration(),
            SchemeParameters::linear_acceleration(),
            SchemeParameters::hht(0.7).unwrap(),
            SchemeParameters::generalized_alpha(0.).unwrap(),
            SchemeParameters::generalized_alpha(1.).unwrap(),
            SchemeParameters::central_difference(),
            SchemeParameters::generalized_alpha_explicit(MIN_EXPLICIT_RHO_B).unwrap(),
            SchemeParameters::collocation(1.4).unwrap(),
            SchemeParameters::hybrid_generalized_alpha(0.5, 3).unwrap(),
        ];
        for p in schemes {
            for dt in [1e-6, 1e-3, 1., 1e3] {
                let c = p.derive_step_constants(dt).unwrap();
                assert!(c.c1.is_finite() && c.c2.is_finite() && c.c3.is_finite());
            }
        }
    }

    #[test]
    fn test_zero_beta_or_gamma_rejected() {
        assert!(SchemeParameters::newmark(0., 0.5).is_err());
        assert!(SchemeParameters::newmark(0.25, 0.).is_err());
        assert!(SchemeParameters::newmark_explicit(0.).is_err());

        // Bypassing construction validation still fails at derivation time
        let p = SchemeParameters {
            kind: SchemeKind::Newmark {
                beta: 0.,
                gamma: 0.5,
            },
        };
        assert!(matches!(
            p.derive_step_constants(0.1),
            Err(IntegrationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_generalized_alpha_from_rho_inf() {
        // rho_inf = 1 recovers the trapezoidal rule
        let p = SchemeParameters::generalized_alpha(1.).unwrap();
        assert_relative_eq!(p.alpha_i(), 0.5);
        assert_relative_eq!(p.alpha_f(), 0.5);
        assert_relative_eq!(p.gamma(), 0.5);
        assert_relative_eq!(p.beta(), 0.25);

        let p = SchemeParameters::generalized_alpha(0.).unwrap();
        assert_relative_eq!(p.alpha_i(), 2.);
        assert_relative_eq!(p.alpha_f(), 1.);
        assert_relative_eq!(p.gamma(), 1.5);
        assert_relative_eq!(p.beta(), 1.);

        assert!(SchemeParameters::generalized_alpha(1.5).is_err());
        assert!(SchemeParameters::generalized_alpha(-0.1).is_err());
    }

    #[test]
    fn test_hht() {
        let p = SchemeParameters::hht(0.9).unwrap();
        assert_relative_eq!(p.alpha_f(), 0.9);
        assert_relative_eq!(p.alpha_i(), 1.);
        assert_relative_eq!(p.gamma(), 0.6);
        assert_relative_eq!(p.beta(), 0.3025);
        assert!(SchemeParameters::hht(0.5).is_err());
    }

    #[test]
    fn test_explicit_generalized_alpha() {
        // rho_b = 1 reduces to alpha_m = 1/2, beta = 1/2, gamma = 1
        let p = SchemeParameters::generalized_alpha_explicit(1.).unwrap();
        assert_relative_eq!(p.alpha_i(), 0.5);
        assert_relative_eq!(p.alpha_f(), 0.);
        assert_relative_eq!(p.beta(), 0.5);
        assert_relative_eq!(p.gamma(), 1.);
        assert!(p.is_single_shot());
        assert!(SchemeParameters::generalized_alpha_explicit(0.2).is_err());
    }

    #[test]
    fn test_collocation_beta_fit() {
        // theta = 1 degenerates to the trapezoidal rule
        assert_relative_eq!(collocation_beta(1.), 0.25, epsilon = 1e-12);
        assert_relative_eq!(collocation_beta(1.4), 0.16840, epsilon = 1e-4);
        assert_relative_eq!(collocation_beta(2.), 0.141179, epsilon = 1e-5);
        for i in 0..=100 {
            let theta = 1. + i as f64 / 100.;
            let (lower, upper) = collocation_beta_bounds(theta);
            let beta = collocation_beta(theta);
            assert!(beta >= lower && beta <= upper);
        }

        let p = SchemeParameters::collocation(1.5).unwrap();
        assert_relative_eq!(p.evaluation_fraction(), 1.5);
        let c = p.derive_step_constants(0.1).unwrap();
        assert_relative_eq!(c.c3, 1. / (p.beta() * 0.0225), max_relative = 1e-12);
        assert!(SchemeParameters::collocation(0.9).is_err());
        assert!(SchemeParameters::collocation_with(0.9, 0.25, 0.5).is_err());
    }

    #[test]
    fn test_hybrid() {
        let p = SchemeParameters::hybrid_newmark(0.25, 0.5, 4).unwrap();
        assert_eq!(p.max_iterations(), Some(4));
        assert_eq!(p.family(), Family::Implicit);
        assert!(!p.is_single_shot());
        assert!(SchemeParameters::hybrid_newmark(0.25, 0.5, 0).is_err());

        let p = SchemeParameters::hybrid_generalized_alpha(0.8, 2).unwrap();
        assert_relative_eq!(p.alpha_f(), 1. / 1.8);
    }

    #[test]
    fn test_evaluation_fraction() {
        assert_eq!(SchemeParameters::average_acceleration().evaluation_fraction(), 1.);
        assert_eq!(
            SchemeParameters::generalized_alpha_explicit(0.5)
                .unwrap()
                .evaluation_fraction(),
            0.
        );
        assert_relative_eq!(
            SchemeParameters::generalized_alpha(0.5)
                .unwrap()
                .evaluation_fraction(),
            1. / 1.5
        );
    }
}
