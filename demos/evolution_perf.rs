//! Quick evolution performance test

use crn_evolver::{
    EvolutionConfig, EvolutionEngine,
    schema::{
        GeneticAlgorithmConfig, NetworkConfig, PopulationConfig, ReactionConfig, SelectionMethod,
        TargetFunction, TargetSeries,
    },
};
use std::time::Instant;

fn main() {
    println!("=== Evolution Performance Test ===\n");

    // Test different species alphabets
    for num_species in [3, 6, 12] {
        println!("Species: {}", num_species);

        let config = EvolutionConfig {
            network: NetworkConfig {
                reaction: ReactionConfig {
                    num_species,
                    ..Default::default()
                },
                ..Default::default()
            },
            population: PopulationConfig {
                size: 40,
                max_generations: 50,
                fit_threshold: 0.0,
                ..Default::default()
            },
            algorithm: GeneticAlgorithmConfig {
                selection: SelectionMethod::Tournament { size: 3 },
                elitism: 2,
            },
            random_seed: Some(42),
            ..Default::default()
        };

        let start = Instant::now();
        let mut engine = match EvolutionEngine::new(config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("  Invalid config: {}", e);
                continue;
            }
        };
        let result = engine.run();
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!("  Generations:    {}", result.stats.generations);
        println!("  Evaluations:    {}", total_evals);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Evals/sec:      {:.1}", evals_per_sec);
        println!("  Best fitness:   {:.4e}", result.stats.best_fitness);
        println!();
    }

    println!("=== Scalability Test (sine target) ===\n");

    // Test different population sizes
    for pop_size in [10, 20, 40, 80] {
        let config = EvolutionConfig {
            target: TargetSeries::Function {
                function: TargetFunction::Sine {
                    amplitude: 0.5,
                    frequency: 0.1,
                    offset: 1.0,
                },
                start: 0.0,
                end: 20.0,
                num_points: 40,
            },
            population: PopulationConfig {
                size: pop_size,
                max_generations: 20,
                fit_threshold: 0.0,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };

        let start = Instant::now();
        let mut engine = match EvolutionEngine::new(config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Invalid config: {}", e);
                continue;
            }
        };
        let result = engine.run();
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!(
            "Population {}: {} evals in {:.2}s ({:.1} evals/sec)",
            pop_size,
            total_evals,
            elapsed.as_secs_f64(),
            evals_per_sec
        );
    }
}
