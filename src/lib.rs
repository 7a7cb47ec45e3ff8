//! Transient time integration for structural dynamics: the Newmark,
//! generalized-α, explicit generalized-α, collocation and hybrid-simulation
//! members of one scheme family, with the equilibrium driver and lumped
//! reference model that exercise them.

pub mod analysis;
pub mod config;
pub mod element;
pub mod error;
pub mod integrator;
pub mod model;
pub mod prelude;
pub mod solver;
