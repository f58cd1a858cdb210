//! Evolution configuration types for reaction network search.
//!
//! This module provides the top-level configuration for an evolutionary run
//! together with the progress and result types reported by the search driver.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::network::fitness_serde;
use super::{
    ConfigError, FitnessMode, KineticsConfig, Network, NetworkConfig, Species, TargetError,
    TargetSeries,
};

/// Top-level configuration for an evolutionary search.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionConfig {
    /// Network structure, mutation probabilities and reaction settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Initial concentrations and integrator settings.
    #[serde(default)]
    pub kinetics: KineticsConfig,
    /// Data or function to fit.
    #[serde(default)]
    pub target: TargetSeries,
    /// How simulated behaviour is compared to the target.
    #[serde(default)]
    pub fitness_mode: FitnessMode,
    /// Population and termination settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Selection and replacement settings.
    #[serde(default)]
    pub algorithm: GeneticAlgorithmConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of networks in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop once the best fitness drops below this value.
    #[serde(default = "default_fit_threshold")]
    pub fit_threshold: f64,
    /// Stop if the best fitness has not improved for N generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
    /// Log a generation summary every N generations.
    #[serde(default = "default_output_interval")]
    pub output_interval: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            fit_threshold: default_fit_threshold(),
            stagnation_limit: None,
            output_interval: default_output_interval(),
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_max_generations() -> usize {
    200
}
fn default_fit_threshold() -> f64 {
    1e-4
}
fn default_output_interval() -> usize {
    10
}

/// Elitist replacement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Selection method for parents.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Number of best networks carried over unchanged.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            selection: SelectionMethod::default(),
            elitism: default_elitism(),
        }
    }
}

fn default_elitism() -> usize {
    2
}

/// Parent selection method. Lower fitness is preferred by all methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Probability proportional to reversed rank.
    RankBased,
    /// Probability proportional to `1 / (1 + fitness)`.
    RouletteWheel,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Progress update emitted after each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current generation number.
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Best fitness of the current population.
    #[serde(with = "fitness_serde")]
    pub best_fitness: f64,
    /// Mean fitness over usable networks.
    #[serde(with = "fitness_serde")]
    pub mean_fitness: f64,
    /// Networks with infinite fitness.
    pub unusable: usize,
    /// Generations since last improvement.
    pub stagnation_count: usize,
    /// Current phase of the algorithm.
    pub phase: EvolutionPhase,
}

impl EvolutionProgress {
    /// Whether this update should be reported at the given generation interval.
    ///
    /// The final `Complete`/`Stopped` update repeats a generation that was
    /// already emitted, so it is never due.
    pub fn is_report_due(&self, output_interval: usize) -> bool {
        matches!(
            self.phase,
            EvolutionPhase::Initializing | EvolutionPhase::Evolving
        ) && self.generation % output_interval.max(1) == 0
    }
}

/// Per-generation statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation (`None` when every network was unusable).
    pub best_fitness: Vec<Option<f64>>,
    /// Mean usable fitness per generation.
    pub mean_fitness: Vec<Option<f64>>,
    /// Unusable network count per generation.
    pub unusable: Vec<usize>,
    /// Mean reaction count per generation.
    pub mean_reactions: Vec<f64>,
}

/// Current phase of evolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    /// Building generation 0.
    #[default]
    Initializing,
    /// Producing and evaluating generations.
    Evolving,
    /// Evolution complete.
    Complete,
    /// Evolution stopped early.
    Stopped,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best network found.
    pub best: Network,
    /// Species whose trajectory produced the best fitness.
    pub best_output_species: Option<Species>,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations produced after generation 0.
    pub generations: usize,
    /// Total network evaluations performed.
    pub total_evaluations: u64,
    /// Best fitness achieved.
    #[serde(with = "fitness_serde")]
    pub best_fitness: f64,
    /// Mean usable fitness of the final population.
    #[serde(with = "fitness_serde")]
    pub final_mean_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Best fitness fell below the threshold.
    ThresholdReached,
    /// Stagnation limit hit.
    Stagnation,
    /// User cancelled.
    Cancelled,
}

// ============================================================================
// Validation and Loading
// ============================================================================

/// Evolution configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Elitism must keep between 1 and population size - 1 networks, got {0}")]
    InvalidElitism(usize),
    #[error("Tournament size must be positive")]
    InvalidTournamentSize,
    #[error("Output interval must be positive")]
    InvalidOutputInterval,
    #[error("Network config validation failed: {0}")]
    Config(#[from] ConfigError),
    #[error("Target validation failed: {0}")]
    Target(#[from] TargetError),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl EvolutionConfig {
    /// Validate the whole configuration before any generation is built.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.network.validate()?;

        let num_species = self.network.reaction.num_species;
        self.kinetics.validate(num_species)?;
        self.fitness_mode.validate(num_species)?;
        self.target.validate(&self.fitness_mode)?;

        if self.population.size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }
        if self.algorithm.elitism == 0 || self.algorithm.elitism >= self.population.size {
            return Err(EvolutionConfigError::InvalidElitism(self.algorithm.elitism));
        }
        if let SelectionMethod::Tournament { size: 0 } = self.algorithm.selection {
            return Err(EvolutionConfigError::InvalidTournamentSize);
        }
        if self.population.output_interval == 0 {
            return Err(EvolutionConfigError::InvalidOutputInterval);
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, EvolutionConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EvolutionConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
