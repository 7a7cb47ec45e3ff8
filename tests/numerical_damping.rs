use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use dynastep::{
    analysis::TransientAnalysis,
    element::{node::Node, spring::Spring},
    integrator::SchemeParameters,
    model::lumped::LumpedModel,
};

const SOFT: f64 = 4. * PI * PI;
const STIFF: f64 = 4. * PI * PI * 1e6;

/// Two uncoupled unit masses, 1 Hz and 1 kHz, both released from x = 1.
fn soft_and_stiff() -> LumpedModel {
    let mut model = LumpedModel::new();
    for k in [SOFT, STIFF] {
        let node = model.add_node(
            Node::new(1)
                .with_mass(1.)
                .with_initial_state(&[1.], &[0.], &[-k]),
        );
        model.add_spring(Spring::grounded(node, 0, k)).unwrap();
    }
    model
}

#[test]
fn test_generalized_alpha_annihilates_stiff_mode() {
    let mut analysis = TransientAnalysis::builder()
        .model(soft_and_stiff())
        .scheme(SchemeParameters::generalized_alpha(0.).unwrap())
        .build()
        .unwrap();

    let mut max_soft_error: f64 = 0.;
    for step in 1..=100 {
        analysis.analyze_step(0.01).unwrap();
        let x = analysis.model().displacement();
        max_soft_error = max_soft_error.max((x[0] - (2. * PI * analysis.time()).cos()).abs());
        if step >= 8 {
            assert!(x[1].abs() < 1e-4, "step {step}: stiff mode at {}", x[1]);
        }
    }

    let x = analysis.model().displacement();
    assert_abs_diff_eq!(x[0], 1., epsilon = 2e-3);
    assert!(max_soft_error < 1e-2, "soft mode error {max_soft_error}");
}

#[test]
fn test_average_acceleration_keeps_stiff_mode() {
    let mut analysis = TransientAnalysis::builder()
        .model(soft_and_stiff())
        .scheme(SchemeParameters::average_acceleration())
        .build()
        .unwrap();
    analysis.analyze(100, 0.01).unwrap();

    // No dissipation: the stiff mode keeps its energy
    let x = analysis.model().displacement();
    let v = analysis.model().velocity();
    let energy = 0.5 * v[1] * v[1] + 0.5 * STIFF * x[1] * x[1];
    assert_abs_diff_eq!(energy, 0.5 * STIFF, epsilon = 1e-6 * STIFF);
}
