//! Fixed-size population of networks and its generational lifecycle.

use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::schema::{EvolutionConfig, Network, SelectionMethod, Species};

use super::fitness::FitnessEvaluator;
use super::genome::NetworkRng;

/// A generation of networks.
///
/// A `Population` only exists once generation 0 has been built and scored,
/// and [`Population::terminate`] consumes it, so operations on an
/// uninitialized or terminated population cannot be expressed.
#[derive(Debug, Clone)]
pub struct Population {
    networks: Vec<Network>,
    generation: usize,
}

impl Population {
    /// Build and score generation 0 from random networks.
    pub fn initialize(
        config: &EvolutionConfig,
        evaluator: &FitnessEvaluator,
        rng: &mut NetworkRng,
    ) -> Self {
        let mut networks: Vec<Network> = (0..config.population.size)
            .map(|_| rng.random_network(&config.network))
            .collect();
        evaluate_all(&mut networks, evaluator);

        Self {
            networks,
            generation: 0,
        }
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Lowest fitness currently held.
    pub fn best_fitness(&self) -> f64 {
        self.networks
            .iter()
            .map(|n| n.fitness)
            .fold(f64::INFINITY, f64::min)
    }

    /// Network with the lowest fitness.
    pub fn best(&self) -> Option<&Network> {
        self.networks
            .iter()
            .min_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    /// Sort networks by ascending fitness.
    pub fn rank(&mut self) {
        self.networks
            .sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
    }

    /// Replace the population with the next generation.
    ///
    /// The `elitism` best networks survive unchanged; every other slot is
    /// filled with a mutated copy of a parent selected from the ranked
    /// population, then scored. The best fitness never increases.
    pub fn advance_generation(
        &mut self,
        config: &EvolutionConfig,
        evaluator: &FitnessEvaluator,
        rng: &mut NetworkRng,
    ) {
        self.rank();

        let size = config.population.size;
        let elites = config.algorithm.elitism.min(self.networks.len());

        let mut offspring = Vec::with_capacity(size.saturating_sub(elites));
        while elites + offspring.len() < size {
            let parent = select_index(&self.networks, &config.algorithm.selection, rng);
            let mut child = self.networks[parent].clone();
            rng.mutate(&mut child, &config.network);
            child.fitness = f64::INFINITY;
            offspring.push(child);
        }

        evaluate_all(&mut offspring, evaluator);

        // Drops the non-elite remainder of the previous generation.
        self.networks.truncate(elites);
        self.networks.extend(offspring);
        self.generation += 1;
    }

    /// Summary statistics of the current generation.
    pub fn small_status(&self) -> PopulationSummary {
        let finite: Vec<f64> = self
            .networks
            .iter()
            .map(|n| n.fitness)
            .filter(|f| f.is_finite())
            .collect();

        let mean_fitness = if finite.is_empty() {
            f64::INFINITY
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        };
        let worst_fitness = finite
            .iter()
            .copied()
            .reduce(f64::max)
            .unwrap_or(f64::INFINITY);
        let mean_reactions = if self.networks.is_empty() {
            0.0
        } else {
            self.networks.iter().map(|n| n.len()).sum::<usize>() as f64
                / self.networks.len() as f64
        };

        PopulationSummary {
            generation: self.generation,
            size: self.networks.len(),
            best_fitness: self.best_fitness(),
            mean_fitness,
            worst_fitness,
            unusable: self.networks.len() - finite.len(),
            mean_reactions,
        }
    }

    /// Summary plus the best network and the species it fits with.
    pub fn large_status(&self, evaluator: &FitnessEvaluator) -> PopulationReport {
        let best = self.best().cloned();
        let output_species = best
            .as_ref()
            .and_then(|network| evaluator.best_output_species(network));

        PopulationReport {
            summary: self.small_status(),
            best,
            output_species,
        }
    }

    /// Release all networks, returning the final summary.
    pub fn terminate(self) -> PopulationSummary {
        self.small_status()
    }
}

/// Select a parent index from a population ranked by ascending fitness.
fn select_index(networks: &[Network], method: &SelectionMethod, rng: &mut NetworkRng) -> usize {
    let len = networks.len();
    match method {
        SelectionMethod::Tournament { size } => {
            let mut best = rng.index(len);
            for _ in 1..*size {
                let idx = rng.index(len);
                if networks[idx].fitness < networks[best].fitness {
                    best = idx;
                }
            }
            best
        }
        SelectionMethod::RankBased => {
            // Rank-based: the best network gets weight len, the worst 1
            let total_rank = len * (len + 1) / 2;
            let mut target = ((rng.unit() * total_rank as f64) as usize).min(total_rank - 1);
            for i in 0..len {
                let rank = len - i;
                if target < rank {
                    return i;
                }
                target -= rank;
            }
            0
        }
        SelectionMethod::RouletteWheel => {
            let weight = |n: &Network| {
                if n.fitness.is_finite() {
                    1.0 / (1.0 + n.fitness.max(0.0))
                } else {
                    0.0
                }
            };
            let total: f64 = networks.iter().map(weight).sum();
            if total <= 0.0 {
                return rng.index(len);
            }

            let target = rng.unit() * total;
            let mut cumulative = 0.0;
            for (i, network) in networks.iter().enumerate() {
                let w = weight(network);
                cumulative += w;
                if w > 0.0 && cumulative > target {
                    return i;
                }
            }
            networks.iter().rposition(|n| weight(n) > 0.0).unwrap_or(0)
        }
    }
}

/// Score every network, each with its own integrator.
#[cfg(feature = "parallel")]
fn evaluate_all(networks: &mut [Network], evaluator: &FitnessEvaluator) {
    networks.par_iter_mut().for_each(|network| {
        evaluator.evaluate(network);
    });
}

#[cfg(not(feature = "parallel"))]
fn evaluate_all(networks: &mut [Network], evaluator: &FitnessEvaluator) {
    for network in networks {
        evaluator.evaluate(network);
    }
}

/// Generation summary statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationSummary {
    pub generation: usize,
    pub size: usize,
    pub best_fitness: f64,
    /// Mean over usable networks.
    pub mean_fitness: f64,
    /// Worst usable fitness.
    pub worst_fitness: f64,
    /// Networks with infinite fitness.
    pub unusable: usize,
    pub mean_reactions: f64,
}

impl fmt::Display for PopulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "best {:.6e}, mean {:.6e}, worst {:.6e}, unusable {}/{}, reactions {:.2}",
            self.best_fitness,
            self.mean_fitness,
            self.worst_fitness,
            self.unusable,
            self.size,
            self.mean_reactions
        )
    }
}

/// Detailed end-of-run report.
#[derive(Debug, Clone)]
pub struct PopulationReport {
    pub summary: PopulationSummary,
    pub best: Option<Network>,
    pub output_species: Option<Species>,
}

impl fmt::Display for PopulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Generation {}", self.summary.generation)?;
        writeln!(f, "  {}", self.summary)?;
        match &self.best {
            Some(network) => {
                match self.output_species {
                    Some(s) => writeln!(f, "Best network (output species S{}):", s)?,
                    None => writeln!(f, "Best network (no usable output species):")?,
                }
                write!(f, "{}", network)
            }
            None => writeln!(f, "Population is empty"),
        }
    }
}
