//! Compute module - Kinetic simulation and evolutionary search.

mod integrator;
mod kinetics;

pub mod evolution;

pub use integrator::*;
pub use kinetics::*;
