//! Configuration types for reactions, networks and kinetic simulation.

use serde::{Deserialize, Serialize};

/// Settings for randomly generated and mutated reactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionConfig {
    /// Size of the species alphabet. Species ids are `0..num_species`.
    #[serde(default = "default_num_species")]
    pub num_species: usize,
    /// Maximum reagents per side of a reaction (1 = unary only, 2 = unary or binary).
    #[serde(default = "default_num_reagents")]
    pub num_reagents: usize,
    /// Lower bound for rate constants.
    #[serde(default = "default_min_rate_constant")]
    pub min_rate_constant: f64,
    /// Upper bound for rate constants.
    #[serde(default = "default_max_rate_constant")]
    pub max_rate_constant: f64,
    /// Largest rate constant perturbation, in percent of the current value.
    #[serde(default = "default_max_percent_rate_change")]
    pub max_percent_rate_change: f64,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            num_species: default_num_species(),
            num_reagents: default_num_reagents(),
            min_rate_constant: default_min_rate_constant(),
            max_rate_constant: default_max_rate_constant(),
            max_percent_rate_change: default_max_percent_rate_change(),
        }
    }
}

fn default_num_species() -> usize {
    4
}
fn default_num_reagents() -> usize {
    2
}
fn default_min_rate_constant() -> f64 {
    0.01
}
fn default_max_rate_constant() -> f64 {
    10.0
}
/// Upper bound on `max_percent_rate_change`; wider ranges overflow the sampler.
pub const MAX_PERCENT_RATE_CHANGE: f64 = 1e6;

fn default_max_percent_rate_change() -> f64 {
    20.0
}

/// Structural bounds and mutation probabilities for networks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Reaction settings used when new reactions are created.
    #[serde(default)]
    pub reaction: ReactionConfig,
    /// Smallest reaction count for a random network (inclusive).
    #[serde(default = "default_min_num_reactions")]
    pub min_num_reactions: usize,
    /// Largest reaction count for a random network (exclusive).
    #[serde(default = "default_max_num_reactions")]
    pub max_num_reactions: usize,
    /// Hard limit on the number of reactions a network may hold.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Probability that a mutation appends a random reaction.
    #[serde(default = "default_prob_add_reaction")]
    pub prob_add_reaction: f64,
    /// Probability that a mutation removes the last reaction.
    #[serde(default = "default_prob_remove_reaction")]
    pub prob_remove_reaction: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            reaction: ReactionConfig::default(),
            min_num_reactions: default_min_num_reactions(),
            max_num_reactions: default_max_num_reactions(),
            capacity: default_capacity(),
            prob_add_reaction: default_prob_add_reaction(),
            prob_remove_reaction: default_prob_remove_reaction(),
        }
    }
}

fn default_min_num_reactions() -> usize {
    1
}
fn default_max_num_reactions() -> usize {
    6
}
fn default_capacity() -> usize {
    16
}
fn default_prob_add_reaction() -> f64 {
    0.1
}
fn default_prob_remove_reaction() -> f64 {
    0.1
}

/// Settings for the kinetic simulation of a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KineticsConfig {
    /// Initial concentration applied to every species.
    #[serde(default = "default_initial_concentration")]
    pub initial_concentration: f64,
    /// Optional per-species initial concentrations, overriding the uniform value.
    #[serde(default)]
    pub initial_concentrations: Option<Vec<f64>>,
    /// ODE integrator settings.
    #[serde(default)]
    pub integrator: IntegratorConfig,
}

impl Default for KineticsConfig {
    fn default() -> Self {
        Self {
            initial_concentration: default_initial_concentration(),
            initial_concentrations: None,
            integrator: IntegratorConfig::default(),
        }
    }
}

fn default_initial_concentration() -> f64 {
    1.0
}

impl KineticsConfig {
    /// Initial state vector for `num_species` species.
    pub fn initial_state(&self, num_species: usize) -> Vec<f64> {
        match &self.initial_concentrations {
            Some(values) => values.clone(),
            None => vec![self.initial_concentration; num_species],
        }
    }
}

/// Adaptive Dormand-Prince integrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegratorConfig {
    /// Relative error tolerance per step.
    #[serde(default = "default_relative_tolerance")]
    pub relative_tolerance: f64,
    /// Absolute error tolerance per step.
    #[serde(default = "default_absolute_tolerance")]
    pub absolute_tolerance: f64,
    /// First trial step size of a run.
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,
    /// Step budget for a single `advance_to` call.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: default_relative_tolerance(),
            absolute_tolerance: default_absolute_tolerance(),
            initial_step: default_initial_step(),
            max_steps: default_max_steps(),
        }
    }
}

fn default_relative_tolerance() -> f64 {
    1e-6
}
fn default_absolute_tolerance() -> f64 {
    1e-9
}
fn default_initial_step() -> f64 {
    1e-3
}
fn default_max_steps() -> usize {
    50_000
}

impl ReactionConfig {
    /// Validate reaction parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_species == 0 {
            return Err(ConfigError::NoSpecies);
        }
        if !(1..=2).contains(&self.num_reagents) {
            return Err(ConfigError::InvalidReagentCount(self.num_reagents));
        }
        if !(self.min_rate_constant > 0.0) || !self.max_rate_constant.is_finite() {
            return Err(ConfigError::InvalidRateBounds {
                min: self.min_rate_constant,
                max: self.max_rate_constant,
            });
        }
        if self.min_rate_constant > self.max_rate_constant {
            return Err(ConfigError::InvalidRateBounds {
                min: self.min_rate_constant,
                max: self.max_rate_constant,
            });
        }
        if !(0.0..=MAX_PERCENT_RATE_CHANGE).contains(&self.max_percent_rate_change) {
            return Err(ConfigError::InvalidRateChange(self.max_percent_rate_change));
        }
        Ok(())
    }
}

impl NetworkConfig {
    /// Validate network bounds, mutation probabilities and nested reaction settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reaction.validate()?;

        if self.min_num_reactions >= self.max_num_reactions {
            return Err(ConfigError::InvalidReactionCount {
                min: self.min_num_reactions,
                max: self.max_num_reactions,
            });
        }
        if self.max_num_reactions > self.capacity {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
                max: self.max_num_reactions,
            });
        }

        let check_probability = |p: f64, name: &'static str| {
            if (0.0..=1.0).contains(&p) {
                Ok(())
            } else {
                Err(ConfigError::InvalidProbability { name, value: p })
            }
        };
        check_probability(self.prob_add_reaction, "prob_add_reaction")?;
        check_probability(self.prob_remove_reaction, "prob_remove_reaction")?;

        if self.prob_add_reaction + self.prob_remove_reaction > 1.0 {
            return Err(ConfigError::ProbabilitiesExceedOne(
                self.prob_add_reaction + self.prob_remove_reaction,
            ));
        }
        Ok(())
    }
}

impl KineticsConfig {
    /// Validate initial concentrations and integrator settings for `num_species` species.
    pub fn validate(&self, num_species: usize) -> Result<(), ConfigError> {
        if !(self.initial_concentration >= 0.0) || !self.initial_concentration.is_finite() {
            return Err(ConfigError::InvalidConcentration(self.initial_concentration));
        }
        if let Some(values) = &self.initial_concentrations {
            if values.len() != num_species {
                return Err(ConfigError::ConcentrationCount {
                    expected: num_species,
                    found: values.len(),
                });
            }
            if let Some(&bad) = values.iter().find(|v| !(**v >= 0.0) || !v.is_finite()) {
                return Err(ConfigError::InvalidConcentration(bad));
            }
        }

        let integrator = &self.integrator;
        if !(integrator.relative_tolerance > 0.0) || !(integrator.absolute_tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance);
        }
        if !(integrator.initial_step > 0.0) || !integrator.initial_step.is_finite() {
            return Err(ConfigError::InvalidStepSize);
        }
        if integrator.max_steps == 0 {
            return Err(ConfigError::InvalidStepSize);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Species count must be non-zero")]
    NoSpecies,
    #[error("Reagent count must be 1 or 2, got {0}")]
    InvalidReagentCount(usize),
    #[error("Rate constant bounds [{min}, {max}] must be positive, finite and ordered")]
    InvalidRateBounds { min: f64, max: f64 },
    #[error("Maximum percent rate change must lie in [0, 1e6], got {0}")]
    InvalidRateChange(f64),
    #[error("Reaction count range [{min}, {max}) is empty")]
    InvalidReactionCount { min: usize, max: usize },
    #[error("Network capacity {capacity} is below the maximum random reaction count {max}")]
    CapacityTooSmall { capacity: usize, max: usize },
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Structural mutation probabilities sum to {0}, above 1")]
    ProbabilitiesExceedOne(f64),
    #[error("Initial concentration must be finite and non-negative, got {0}")]
    InvalidConcentration(f64),
    #[error("Expected {expected} initial concentrations, found {found}")]
    ConcentrationCount { expected: usize, found: usize },
    #[error("Integrator tolerances must be positive")]
    InvalidTolerance,
    #[error("Integrator step settings are invalid")]
    InvalidStepSize,
}
