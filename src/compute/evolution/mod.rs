//! Genetic search over city layouts.
//!
//! # Overview
//!
//! Each generation the engine simulates every city, scores it, and breeds
//! the next population:
//!
//! - **Genes** (`gene`): flat encoding of a city's layout and economy
//! - **Fitness** (`fitness`): money held minus a penalty per broke resident
//! - **Selection** (`selection`): fitness proportional, linear ranking,
//!   tournament and Boltzmann parent selection
//! - **Crossover** (`crossover`): one-point, two-point and uniform
//!   recombination plus collision repair
//! - **Mutation** (`mutation`): economic, relocation and retyping operators
//! - **Search** (`search`): the generational loop
//!
//! # Example
//!
//! ```rust,no_run
//! use city_evolver::schema::EvolutionConfig;
//! use city_evolver::compute::evolution::EvolutionEngine;
//!
//! let config = EvolutionConfig::default();
//!
//! let mut engine = EvolutionEngine::new(config).unwrap();
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best fitness = {:.2}",
//!         progress.generation, progress.best_fitness);
//! }).unwrap();
//!
//! println!("Best city fitness: {:.2}", result.best.fitness);
//! for row in &result.best.grid {
//!     println!("{row}");
//! }
//! ```

mod crossover;
mod fitness;
mod gene;
mod mutation;
mod rng;
mod search;
mod selection;

pub use crossover::{
    CrossoverError, MAX_RESOLUTION_STEPS, Offspring, crossover_pair, crossover_population,
    one_point, resolve_conflicts, two_point, uniform,
};
pub use fitness::{
    INACTIVE_PENALTY, PopulationStats, evaluate, evaluate_population, fitness, rank_descending,
};
pub use gene::GeneError;
pub use mutation::{
    MutationKind, apply as apply_mutation, mutate, mutate_population, perturb_economic_values,
    perturb_starting_money, perturb_travel_cost, relocate_buildings, retype_buildings,
};
pub use rng::{GenomeRng, chance};
pub use search::{Candidate, EvolutionEngine, EvolutionError, MAX_REPLACEMENT_ATTEMPTS};
pub use selection::{
    PARENT_FRACTION, SelectionError, SelectionStrategy, parent_count, select_parents, select_with,
};
