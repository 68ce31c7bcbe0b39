//! City Evolver CLI - Run a genetic search from JSON configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use city_evolver::{
    compute::evolution::EvolutionEngine,
    schema::{EvolutionConfig, EvolutionProgress},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Evolve city layouts with a genetic algorithm")]
struct Cli {
    /// Path to the evolution configuration JSON (defaults are used when omitted)
    config: Option<PathBuf>,

    /// Print the default configuration and exit
    #[arg(long)]
    example: bool,

    /// Override the number of generations
    #[arg(long)]
    generations: Option<usize>,

    /// Override the population size
    #[arg(long)]
    population: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of simulation worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Write the full result (best city, stats, history) as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.example {
        print_example_config()?;
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => EvolutionConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => EvolutionConfig::default(),
    };
    if let Some(generations) = cli.generations {
        config.generations = generations;
    }
    if let Some(population) = cli.population {
        config.population_size = population;
    }
    if let Some(seed) = cli.seed {
        config.random_seed = Some(seed);
    }
    if let Some(workers) = cli.workers {
        config.workers = Some(workers);
    }

    println!("City Evolver");
    println!("============");
    println!(
        "Grid: {}x{} ({} houses, {} shops, {} offices)",
        config.city.width,
        config.city.height,
        config.city.houses,
        config.city.shops,
        config.city.offices
    );
    println!(
        "Population: {}, generations: {}, days: {}",
        config.population_size, config.generations, config.simulation_days
    );
    println!(
        "Selection: {:?} {:?}, crossover: {:?}, mutation: {}",
        config.selection, config.selection_parameter, config.crossover, config.mutation_chance
    );
    println!();

    let mut engine = EvolutionEngine::new(config)?;
    let result = engine.run_with_callback(print_progress)?;

    println!();
    println!("Best city (fitness {:.2}):", result.best.fitness);
    for row in &result.best.grid {
        println!("  {row}");
    }
    println!();
    println!(
        "  Residents: {} active, {} broke, {:.2} total money",
        result.best.active_residents, result.best.inactive_residents, result.best.total_money
    );
    if let Some(richest) = &result.best.wealthiest {
        println!("  Wealthiest: {} with {:.2}", richest.name, richest.money);
    }
    println!(
        "  Stopped: {:?} after {} generations, {} offspring discarded",
        result.stats.stop_reason, result.stats.generations, result.stats.discarded_offspring
    );
    println!(
        "Time: {:.2}s ({:.1} evaluations/s)",
        result.stats.elapsed_seconds, result.stats.evaluations_per_second
    );

    if let Some(path) = &cli.output {
        result
            .save(path)
            .with_context(|| format!("writing result {}", path.display()))?;
        println!("Result written to {}", path.display());
    }

    Ok(())
}

fn print_progress(progress: &EvolutionProgress) {
    println!(
        "  Generation {}/{}: best={:.2}, avg={:.2}, overall best={:.2}",
        progress.generation,
        progress.total_generations,
        progress.generation_best,
        progress.avg_fitness,
        progress.best_fitness
    );
}

fn print_example_config() -> Result<()> {
    let config = EvolutionConfig::default();

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
