//! crn-evolver CLI - Evolve reaction networks from a JSON configuration.

use std::fs;
use std::path::PathBuf;

use crn_evolver::{EvolutionConfig, EvolutionEngine};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage(&args[0]);
        return;
    }

    if args.iter().any(|a| a == "--example") {
        print_example_config();
        return;
    }

    let mut config_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        if arg == "--output" {
            match rest.next() {
                Some(path) => output_path = Some(PathBuf::from(path)),
                None => {
                    print_usage(&args[0]);
                    std::process::exit(1);
                }
            }
        } else if config_path.is_none() {
            config_path = Some(PathBuf::from(arg));
        } else {
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }

    // Load configuration, or run the default search
    let config = match &config_path {
        Some(path) => EvolutionConfig::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {}", path.display(), e);
            std::process::exit(1);
        }),
        None => EvolutionConfig::default(),
    };
    let output_interval = config.population.output_interval;

    println!("Reaction Network Evolution");
    println!("==========================");
    println!(
        "Species: {}, reactions: {}..{} (capacity {})",
        config.network.reaction.num_species,
        config.network.min_num_reactions,
        config.network.max_num_reactions,
        config.network.capacity
    );
    println!(
        "Population: {}, max generations: {}, threshold: {:e}",
        config.population.size, config.population.max_generations, config.population.fit_threshold
    );
    println!();

    let mut engine = EvolutionEngine::new(config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let result = engine.run_with_callback(|progress| {
        if progress.is_report_due(output_interval) {
            println!(
                "Generation: {}, best {:.6e}, mean {:.6e}, unusable {}",
                progress.generation, progress.best_fitness, progress.mean_fitness, progress.unusable
            );
        }
    });

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!(
        "Generations: {}, evaluations: {} ({:.1}/s)",
        result.stats.generations, result.stats.total_evaluations, result.stats.evaluations_per_second
    );
    match result.best_output_species {
        Some(s) => println!("Best network (output species S{}):", s),
        None => println!("Best network (no usable output species):"),
    }
    print!("{}", result.best);

    if let Some(path) = output_path {
        let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
            eprintln!("Error serializing result: {}", e);
            std::process::exit(1);
        });
        if let Err(e) = fs::write(&path, json) {
            eprintln!("Error writing {}: {}", path.display(), e);
            std::process::exit(1);
        }
        println!("Result written to {}", path.display());
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [config.json] [--output result.json]", program);
    eprintln!();
    eprintln!("Evolves a set of reactions to fit data or a function.");
    eprintln!("Without a configuration file the default run is executed.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --output PATH  Write the result as JSON");
    eprintln!("  --example      Print the default configuration");
}

fn print_example_config() {
    let config = EvolutionConfig::default();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
