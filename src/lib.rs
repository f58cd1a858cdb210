//! crn-evolver - Evolutionary search for chemical reaction networks.
//!
//! This crate evolves small reaction networks whose mass-action kinetics
//! reproduce a target time series or function. Candidate networks are
//! simulated with an adaptive ODE integrator and scored by how closely their
//! best-matching species follows the target.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, target data and the network representation
//! - `compute`: Numerical computation (integrator, kinetics, evolutionary search)
//!
//! # Example
//!
//! ```rust,no_run
//! use crn_evolver::{
//!     EvolutionEngine,
//!     schema::{EvolutionConfig, TargetFunction, TargetSeries},
//! };
//!
//! // Fit an exponential decay
//! let config = EvolutionConfig {
//!     target: TargetSeries::Function {
//!         function: TargetFunction::ExponentialDecay { amplitude: 1.0, rate: 0.3 },
//!         start: 0.5,
//!         end: 10.0,
//!         num_points: 20,
//!     },
//!     random_seed: Some(7),
//!     ..Default::default()
//! };
//!
//! let mut engine = EvolutionEngine::new(config).expect("valid config");
//! let result = engine.run();
//!
//! println!("Best fitness after {} generations: {:.3e}",
//!     result.stats.generations, result.stats.best_fitness);
//! println!("{}", result.best);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, FitnessEvaluator, NetworkRng, Population};
pub use schema::{EvolutionConfig, Network, Reaction};
