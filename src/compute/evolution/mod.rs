//! Evolutionary search for reaction networks that fit a target.
//!
//! # Overview
//!
//! The evolutionary search system consists of:
//!
//! - **Genome Operations** (`genome`): Random networks and reactions, mutation
//! - **Fitness Evaluation** (`fitness`): Kinetic simulation scored against target data
//! - **Population** (`population`): Ranked selection and elitist replacement
//! - **Search Driver** (`search`): Generation loop, termination and reporting
//!
//! # Example
//!
//! ```rust,no_run
//! use crn_evolver::schema::EvolutionConfig;
//! use crn_evolver::compute::evolution::EvolutionEngine;
//!
//! let config = EvolutionConfig::default();
//! let mut engine = EvolutionEngine::new(config).expect("valid config");
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best fitness = {:.3e}",
//!         progress.generation, progress.best_fitness);
//! });
//!
//! println!("{}", result.best);
//! ```
//!
//! # Selection Methods
//!
//! - `Tournament`: Lowest fitness among `size` random picks
//! - `RankBased`: Probability proportional to reversed rank
//! - `RouletteWheel`: Probability proportional to `1 / (1 + fitness)`

mod fitness;
mod genome;
mod population;
mod search;

pub use fitness::{EvaluationError, FitnessEvaluator};
pub use genome::{Mutation, NetworkRng};
pub use population::{Population, PopulationReport, PopulationSummary};
pub use search::EvolutionEngine;
