//! Fitness evaluation of reaction networks against target data.
//!
//! A network is simulated with mass-action kinetics and every changing species
//! is scored by its summed squared error against the target outputs. The best
//! scoring species stands in for the network's output, so the network fitness
//! is the minimum over species. Lower is better; `INFINITY` marks a network
//! that could not be simulated or has no changing species.

use crate::compute::{DormandPrince, IntegrationError, Integrator, MassActionSystem};
use crate::schema::{
    DataPoint, EvolutionConfig, FitnessMode, IntegratorConfig, Network, Species,
};

/// Reasons a network cannot be scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("Integration failed: {0}")]
    Integration(#[from] IntegrationError),
    #[error("No steady state reached by t = {max_time} for input {input}")]
    NoSteadyState { input: f64, max_time: f64 },
}

/// Scores networks against a fixed target.
pub struct FitnessEvaluator {
    mode: FitnessMode,
    target: Vec<DataPoint>,
    num_species: usize,
    initial_state: Vec<f64>,
    integrator: IntegratorConfig,
}

impl FitnessEvaluator {
    /// Create an evaluator, sampling the target once.
    pub fn new(config: &EvolutionConfig) -> Self {
        let num_species = config.network.reaction.num_species;
        Self {
            mode: config.fitness_mode.clone(),
            target: config.target.sample(),
            num_species,
            initial_state: config.kinetics.initial_state(num_species),
            integrator: config.kinetics.integrator.clone(),
        }
    }

    pub fn target(&self) -> &[DataPoint] {
        &self.target
    }

    pub fn num_species(&self) -> usize {
        self.num_species
    }

    /// A fresh integrator, ready for use by a single evaluation.
    pub fn integrator(&self) -> DormandPrince {
        let mut integrator = DormandPrince::new(self.integrator.clone());
        integrator.prepare_for_first_use(self.num_species);
        integrator
    }

    /// Score a network with a private integrator and store the fitness on it.
    pub fn evaluate(&self, network: &mut Network) -> f64 {
        let mut integrator = self.integrator();
        self.evaluate_with(network, &mut integrator)
    }

    /// Score a network with the given integrator and store the fitness on it.
    pub fn evaluate_with(&self, network: &mut Network, integrator: &mut dyn Integrator) -> f64 {
        network.fitness = match self.species_scores(network, integrator) {
            Ok(scores) => scores.into_iter().fold(f64::INFINITY, f64::min),
            Err(e) => {
                log::debug!("network with {} reactions unusable: {}", network.len(), e);
                f64::INFINITY
            }
        };
        network.fitness
    }

    /// Per-species accumulated error. Non-changing species score `INFINITY`.
    pub fn species_scores(
        &self,
        network: &Network,
        integrator: &mut dyn Integrator,
    ) -> Result<Vec<f64>, EvaluationError> {
        match self.mode {
            FitnessMode::TimeSeries => self.scores_vs_time(network, integrator),
            FitnessMode::SteadyState {
                input_species,
                time_step,
                max_time,
                tolerance,
            } => self.scores_vs_concentration(
                network,
                integrator,
                SteadyStateSearch {
                    input_species,
                    time_step,
                    max_time,
                    tolerance,
                },
            ),
        }
    }

    /// The species whose trajectory gives the network its fitness.
    pub fn best_output_species(&self, network: &Network) -> Option<Species> {
        let mut integrator = self.integrator();
        let scores = self.species_scores(network, &mut integrator).ok()?;
        scores
            .iter()
            .enumerate()
            .filter(|(_, score)| score.is_finite())
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(s, _)| s)
    }

    /// Simulate from the initial concentrations and record the state at each time.
    pub fn simulate(
        &self,
        network: &Network,
        times: &[f64],
    ) -> Result<Vec<Vec<f64>>, IntegrationError> {
        let system = MassActionSystem::new(network, self.num_species);
        let mut integrator = self.integrator();
        integrator.prepare_for_next_run(&self.initial_state);

        times
            .iter()
            .map(|&t| -> Result<Vec<f64>, IntegrationError> {
                integrator.advance_to(&system, t)?;
                Ok(integrator.current_state().to_vec())
            })
            .collect()
    }

    fn scores_vs_time(
        &self,
        network: &Network,
        integrator: &mut dyn Integrator,
    ) -> Result<Vec<f64>, EvaluationError> {
        let system = MassActionSystem::new(network, self.num_species);
        integrator.prepare_for_next_run(&self.initial_state);

        let mut scores = vec![0.0; self.num_species];
        for point in &self.target {
            integrator.advance_to(&system, point.input)?;
            accumulate(network, &mut scores, integrator.current_state(), point.output);
        }
        Ok(scores)
    }

    fn scores_vs_concentration(
        &self,
        network: &Network,
        integrator: &mut dyn Integrator,
        search: SteadyStateSearch,
    ) -> Result<Vec<f64>, EvaluationError> {
        let system = MassActionSystem::new(network, self.num_species);

        let mut scores = vec![0.0; self.num_species];
        let mut initial = self.initial_state.clone();
        let mut previous = vec![0.0; self.num_species];

        for point in &self.target {
            initial[search.input_species] = point.input;
            integrator.prepare_for_next_run(&initial);
            previous.copy_from_slice(&initial);

            let mut window_end = 0.0;
            loop {
                window_end = (window_end + search.time_step).min(search.max_time);
                integrator.advance_to(&system, window_end)?;

                let state = integrator.current_state();
                let change = state
                    .iter()
                    .zip(&previous)
                    .map(|(now, before)| (now - before).abs())
                    .fold(0.0, f64::max);
                if change <= search.tolerance {
                    break;
                }
                if window_end >= search.max_time {
                    return Err(EvaluationError::NoSteadyState {
                        input: point.input,
                        max_time: search.max_time,
                    });
                }
                previous.copy_from_slice(state);
            }

            accumulate(network, &mut scores, integrator.current_state(), point.output);
        }

        // The input species is set by the data, so it cannot be the output.
        scores[search.input_species] = f64::INFINITY;
        Ok(scores)
    }
}

#[derive(Debug, Clone, Copy)]
struct SteadyStateSearch {
    input_species: Species,
    time_step: f64,
    max_time: f64,
    tolerance: f64,
}

/// Add squared errors for changing species; fixed species can never be the output.
fn accumulate(network: &Network, scores: &mut [f64], state: &[f64], target: f64) {
    for (species, score) in scores.iter_mut().enumerate() {
        if network.is_changing(species) {
            *score += (state[species] - target).powi(2);
        } else {
            *score = f64::INFINITY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::OdeSystem;
    use crate::schema::{
        KineticsConfig, NetworkConfig, Reaction, ReactionConfig, TargetSeries,
    };

    fn config(num_species: usize, points: Vec<DataPoint>, initial: Vec<f64>) -> EvolutionConfig {
        EvolutionConfig {
            network: NetworkConfig {
                reaction: ReactionConfig {
                    num_species,
                    ..Default::default()
                },
                ..Default::default()
            },
            kinetics: KineticsConfig {
                initial_concentrations: Some(initial),
                ..Default::default()
            },
            target: TargetSeries::Points { points },
            ..Default::default()
        }
    }

    fn unary(a: Species, b: Species, k: f64) -> Reaction {
        Reaction::new((a, None), (b, None), k)
    }

    /// Integrator that fails on a chosen call and counts how often it was advanced.
    struct FailingIntegrator {
        state: Vec<f64>,
        time: f64,
        fail_on: usize,
        calls: usize,
    }

    impl Integrator for FailingIntegrator {
        fn prepare_for_first_use(&mut self, _dimension: usize) {}

        fn prepare_for_next_run(&mut self, initial_state: &[f64]) {
            self.state = initial_state.to_vec();
            self.time = 0.0;
        }

        fn advance_to(
            &mut self,
            _system: &dyn OdeSystem,
            target_time: f64,
        ) -> Result<f64, IntegrationError> {
            self.calls += 1;
            if self.calls == self.fail_on {
                return Err(IntegrationError::StepSizeUnderflow { time: self.time });
            }
            self.time = target_time;
            Ok(target_time)
        }

        fn current_state(&self) -> &[f64] {
            &self.state
        }

        fn time(&self) -> f64 {
            self.time
        }
    }

    #[test]
    fn test_intermediate_species_fits_exactly() {
        // S0 -> S1 -> S2 with unit rates gives S1(t) = t * exp(-t).
        let points = (1..=8)
            .map(|i| {
                let t = i as f64 * 0.5;
                DataPoint::new(t, t * (-t).exp())
            })
            .collect();
        let evaluator = FitnessEvaluator::new(&config(3, points, vec![1.0, 0.0, 0.0]));
        let mut network =
            Network::from_reactions(vec![unary(0, 1, 1.0), unary(1, 2, 1.0)], f64::INFINITY, 4);

        let fitness = evaluator.evaluate(&mut network);
        assert!(fitness < 1e-8, "fitness {}", fitness);
        assert_eq!(network.fitness, fitness);
        assert_eq!(evaluator.best_output_species(&network), Some(1));
    }

    #[test]
    fn test_wrong_rate_scores_worse() {
        let points: Vec<DataPoint> = (1..=8)
            .map(|i| {
                let t = i as f64 * 0.5;
                DataPoint::new(t, t * (-t).exp())
            })
            .collect();
        let evaluator = FitnessEvaluator::new(&config(3, points, vec![1.0, 0.0, 0.0]));
        let mut good =
            Network::from_reactions(vec![unary(0, 1, 1.0), unary(1, 2, 1.0)], f64::INFINITY, 4);
        let mut bad =
            Network::from_reactions(vec![unary(0, 1, 3.0), unary(1, 2, 0.2)], f64::INFINITY, 4);

        assert!(evaluator.evaluate(&mut good) < evaluator.evaluate(&mut bad));
        assert!(bad.fitness.is_finite());
    }

    #[test]
    fn test_no_changing_species_is_infinite() {
        let points = vec![DataPoint::new(1.0, 0.5), DataPoint::new(2.0, 0.25)];
        let evaluator = FitnessEvaluator::new(&config(2, points, vec![1.0, 0.0]));
        let mut network = Network::from_reactions(vec![unary(0, 1, 1.0)], 0.0, 4);

        assert!(evaluator.evaluate(&mut network).is_infinite());
        assert!(network.fitness.is_infinite());
        assert_eq!(evaluator.best_output_species(&network), None);
    }

    #[test]
    fn test_integration_failure_stops_evaluation() {
        let points = (1..=5).map(|i| DataPoint::new(i as f64, 0.0)).collect();
        let evaluator = FitnessEvaluator::new(&config(3, points, vec![1.0, 0.0, 0.0]));
        let mut network =
            Network::from_reactions(vec![unary(0, 1, 1.0), unary(1, 0, 1.0)], 0.0, 4);
        let mut integrator = FailingIntegrator {
            state: Vec::new(),
            time: 0.0,
            fail_on: 3,
            calls: 0,
        };

        let fitness = evaluator.evaluate_with(&mut network, &mut integrator);
        assert!(fitness.is_infinite());
        assert!(network.fitness.is_infinite());
        assert_eq!(integrator.calls, 3);
    }

    #[test]
    fn test_simulate_trajectory() {
        let evaluator = FitnessEvaluator::new(&config(
            2,
            vec![DataPoint::new(1.0, 0.0)],
            vec![1.0, 0.0],
        ));
        let network = Network::from_reactions(vec![unary(0, 1, 1.0)], 0.0, 4);

        let trajectory = evaluator.simulate(&network, &[0.0, 1.0]).unwrap();
        assert_eq!(trajectory[0], vec![1.0, 0.0]);
        assert!((trajectory[1][0] - (-1.0f64).exp()).abs() < 1e-6);
        assert!((trajectory[1][0] + trajectory[1][1] - 1.0).abs() < 1e-9);
    }

    fn steady_config(points: Vec<DataPoint>, max_time: f64) -> EvolutionConfig {
        let mut config = config(2, points, vec![0.0, 0.0]);
        config.fitness_mode = FitnessMode::SteadyState {
            input_species: 0,
            time_step: 1.0,
            max_time,
            tolerance: 1e-6,
        };
        config
    }

    #[test]
    fn test_steady_state_equilibrium() {
        // S0 <-> S1 with equal rates settles at half the input in each species.
        let points = [1.0, 2.0, 4.0]
            .iter()
            .map(|&x| DataPoint::new(x, x / 2.0))
            .collect();
        let evaluator = FitnessEvaluator::new(&steady_config(points, 50.0));
        let mut network =
            Network::from_reactions(vec![unary(0, 1, 1.0), unary(1, 0, 1.0)], 0.0, 4);

        let fitness = evaluator.evaluate(&mut network);
        assert!(fitness < 1e-8, "fitness {}", fitness);
        assert_eq!(evaluator.best_output_species(&network), Some(1));
    }

    #[test]
    fn test_steady_state_not_reached() {
        let points = vec![DataPoint::new(1.0, 0.5)];
        let evaluator = FitnessEvaluator::new(&steady_config(points, 1.0));
        let mut network =
            Network::from_reactions(vec![unary(0, 1, 0.01), unary(1, 0, 0.01)], 0.0, 4);

        let mut integrator = evaluator.integrator();
        assert!(matches!(
            evaluator.species_scores(&network, &mut integrator),
            Err(EvaluationError::NoSteadyState { .. })
        ));
        assert!(evaluator.evaluate(&mut network).is_infinite());
    }
}
