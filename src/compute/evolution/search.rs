//! Search driver running the generational loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::schema::{
    EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionPhase, EvolutionProgress,
    EvolutionResult, EvolutionStats, StopReason,
};

use super::fitness::FitnessEvaluator;
use super::genome::NetworkRng;
use super::population::{Population, PopulationSummary};

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    rng: NetworkRng,
    evaluator: FitnessEvaluator,
    population: Option<Population>,
    history: EvolutionHistory,
    best_fitness: f64,
    stagnation_count: usize,
    total_evaluations: u64,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine. The configuration is validated first.
    pub fn new(config: EvolutionConfig) -> Result<Self, EvolutionConfigError> {
        config.validate()?;

        let rng = match config.random_seed {
            Some(seed) => NetworkRng::new(seed),
            None => NetworkRng::random(),
        };
        let evaluator = FitnessEvaluator::new(&config);

        Ok(Self {
            config,
            rng,
            evaluator,
            population: None,
            history: EvolutionHistory::default(),
            best_fitness: f64::INFINITY,
            stagnation_count: 0,
            total_evaluations: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Current population, once initialized.
    pub fn population(&self) -> Option<&Population> {
        self.population.as_ref()
    }

    /// Build and score generation 0.
    pub fn initialize(&mut self) {
        let population = Population::initialize(&self.config, &self.evaluator, &mut self.rng);
        self.total_evaluations = population.len() as u64;
        self.history = EvolutionHistory::default();
        self.best_fitness = f64::INFINITY;
        self.stagnation_count = 0;

        let summary = population.small_status();
        self.population = Some(population);
        self.record(&summary);
    }

    /// Produce and score the next generation.
    fn step_generation(&mut self) {
        let Some(population) = self.population.as_mut() else {
            return;
        };

        population.advance_generation(&self.config, &self.evaluator, &mut self.rng);
        self.total_evaluations += (population.len() - self.config.algorithm.elitism) as u64;

        let summary = population.small_status();
        self.record(&summary);
    }

    /// Update best fitness, stagnation and history from a generation summary.
    fn record(&mut self, summary: &PopulationSummary) {
        if summary.best_fitness < self.best_fitness {
            self.best_fitness = summary.best_fitness;
            self.stagnation_count = 0;
        } else if summary.generation > 0 {
            self.stagnation_count += 1;
        }

        let finite = |f: f64| f.is_finite().then_some(f);
        self.history.best_fitness.push(finite(summary.best_fitness));
        self.history.mean_fitness.push(finite(summary.mean_fitness));
        self.history.unusable.push(summary.unusable);
        self.history.mean_reactions.push(summary.mean_reactions);

        if summary.unusable == summary.size {
            log::warn!("generation {}: every network is unusable", summary.generation);
        }
        if summary.generation % self.config.population.output_interval == 0 {
            log::info!("generation {}: {}", summary.generation, summary);
        }
        if self.stagnation_count > 0 {
            log::debug!(
                "no improvement for {} generations",
                self.stagnation_count
            );
        }
    }

    /// Get current progress.
    pub fn progress(&self, phase: EvolutionPhase) -> EvolutionProgress {
        let summary = self.population.as_ref().map(Population::small_status);

        EvolutionProgress {
            generation: summary.as_ref().map_or(0, |s| s.generation),
            total_generations: self.config.population.max_generations,
            best_fitness: self.best_fitness,
            mean_fitness: summary.as_ref().map_or(f64::INFINITY, |s| s.mean_fitness),
            unusable: summary.as_ref().map_or(0, |s| s.unusable),
            stagnation_count: self.stagnation_count,
            phase,
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.best_fitness < self.config.population.fit_threshold {
            return Some(StopReason::ThresholdReached);
        }

        let generation = self.population.as_ref().map_or(0, Population::generation);
        if generation >= self.config.population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(limit) = self.config.population.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> EvolutionResult
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        log::info!(
            "evolving {} networks over {} species for up to {} generations",
            self.config.population.size,
            self.config.network.reaction.num_species,
            self.config.population.max_generations
        );

        self.initialize();
        callback(&self.progress(EvolutionPhase::Initializing));

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.step_generation();
            callback(&self.progress(EvolutionPhase::Evolving));
        };

        let phase = if stop_reason == StopReason::Cancelled {
            EvolutionPhase::Stopped
        } else {
            EvolutionPhase::Complete
        };
        callback(&self.progress(phase));

        let elapsed = start_time.elapsed().as_secs_f64();
        let (best, best_output_species, summary) = match self.population.take() {
            Some(population) => {
                let report = population.large_status(&self.evaluator);
                log::info!("stopped ({:?}):\n{}", stop_reason, report);
                (
                    report.best.unwrap_or_default(),
                    report.output_species,
                    population.terminate(),
                )
            }
            None => (Default::default(), None, empty_summary()),
        };

        EvolutionResult {
            best,
            best_output_species,
            stats: EvolutionStats {
                generations: summary.generation,
                total_evaluations: self.total_evaluations,
                best_fitness: self.best_fitness,
                final_mean_fitness: summary.mean_fitness,
                elapsed_seconds: elapsed,
                evaluations_per_second: self.total_evaluations as f64 / elapsed.max(1e-9),
                stop_reason,
            },
            history: self.history.clone(),
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> EvolutionResult {
        self.run_with_callback(|_| {})
    }
}

fn empty_summary() -> PopulationSummary {
    PopulationSummary {
        generation: 0,
        size: 0,
        best_fitness: f64::INFINITY,
        mean_fitness: f64::INFINITY,
        worst_fitness: f64::INFINITY,
        unusable: 0,
        mean_reactions: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NetworkConfig, PopulationConfig, ReactionConfig};

    fn config(max_generations: usize) -> EvolutionConfig {
        EvolutionConfig {
            network: NetworkConfig {
                reaction: ReactionConfig {
                    num_species: 3,
                    ..Default::default()
                },
                ..Default::default()
            },
            population: PopulationConfig {
                size: 8,
                max_generations,
                fit_threshold: 0.0,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config(3);
        config.population.size = 1;
        assert!(matches!(
            EvolutionEngine::new(config),
            Err(EvolutionConfigError::PopulationTooSmall)
        ));
    }

    #[test]
    fn test_stagnation_counts_from_first_generation() {
        // A one-step budget makes every simulation fail.
        let mut config = config(5);
        config.kinetics.integrator.max_steps = 1;
        let mut engine = EvolutionEngine::new(config).unwrap();

        engine.initialize();
        let progress = engine.progress(EvolutionPhase::Initializing);
        assert_eq!(progress.best_fitness, f64::INFINITY);
        assert_eq!(progress.stagnation_count, 0);

        engine.step_generation();
        assert_eq!(engine.progress(EvolutionPhase::Evolving).stagnation_count, 1);
    }

    #[test]
    fn test_evolution_run() {
        let mut engine = EvolutionEngine::new(config(4)).unwrap();
        let mut reports = 0;
        let result = engine.run_with_callback(|_| reports += 1);

        assert_eq!(result.stats.generations, 4);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        // initial + one per generation + final
        assert_eq!(reports, 6);
        assert_eq!(result.history.best_fitness.len(), 5);
        assert_eq!(result.stats.total_evaluations, 8 + 4 * 6);
        assert_eq!(result.best.fitness, result.stats.best_fitness);
        assert!(engine.population().is_none());
    }

    #[test]
    fn test_history_monotonic() {
        let mut engine = EvolutionEngine::new(config(10)).unwrap();
        let result = engine.run();

        let best: Vec<f64> = result
            .history
            .best_fitness
            .iter()
            .map(|f| f.unwrap_or(f64::INFINITY))
            .collect();
        assert!(best.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_seeded_runs_match() {
        let a = EvolutionEngine::new(config(5)).unwrap().run();
        let b = EvolutionEngine::new(config(5)).unwrap().run();
        assert_eq!(a.stats.best_fitness, b.stats.best_fitness);
        assert_eq!(a.best.reactions(), b.best.reactions());
    }

    #[test]
    fn test_threshold_stops_early() {
        let mut config = config(50);
        config.population.fit_threshold = f64::MAX;
        let result = EvolutionEngine::new(config).unwrap().run();

        assert_eq!(result.stats.stop_reason, StopReason::ThresholdReached);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_stagnation_limit() {
        let mut config = config(1000);
        config.population.stagnation_limit = Some(3);
        let result = EvolutionEngine::new(config).unwrap().run();

        assert!(matches!(
            result.stats.stop_reason,
            StopReason::Stagnation | StopReason::MaxGenerations
        ));
        assert!(result.stats.generations < 1000);
    }

    #[test]
    fn test_cancellation() {
        let mut engine = EvolutionEngine::new(config(100)).unwrap();
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_result_export_roundtrip() {
        let result = EvolutionEngine::new(config(2)).unwrap().run();

        let file = tempfile::NamedTempFile::new().unwrap();
        serde_json::to_writer_pretty(file.as_file(), &result).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let parsed: EvolutionResult = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed.best.reactions(), result.best.reactions());
        assert_eq!(parsed.stats.stop_reason, result.stats.stop_reason);
        assert_eq!(parsed.history.best_fitness, result.history.best_fitness);
    }
}
