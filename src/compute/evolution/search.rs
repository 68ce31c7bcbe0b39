//! Generational genetic search over city layouts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::{info, warn};
use rayon::prelude::*;

use crate::compute::{City, CityError};
use crate::schema::{
    BuildingKind, CitySnapshot, EvolutionConfig, EvolutionConfigError, EvolutionHistory,
    EvolutionProgress, EvolutionResult, EvolutionStats, Gene, StopReason,
};

use super::crossover::{CrossoverError, crossover_population};
use super::fitness::{self, PopulationStats};
use super::mutation::mutate_population;
use super::rng::GenomeRng;
use super::selection::{SelectionError, SelectionStrategy, select_with};

/// Random cities generated for one discarded offspring before giving up.
pub const MAX_REPLACEMENT_ATTEMPTS: usize = 100;

/// A city in the population.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Unique identifier.
    pub id: u64,
    /// The city, carrying its fitness once evaluated.
    pub city: City,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl Candidate {
    #[inline]
    pub fn fitness(&self) -> f64 {
        self.city.fitness()
    }

    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self) -> CitySnapshot {
        let city = &self.city;
        CitySnapshot {
            id: self.id,
            fitness: city.fitness(),
            total_money: city.total_money(),
            active_residents: city.count_active(),
            inactive_residents: city.count_inactive(),
            wealthiest: city
                .wealthiest_person()
                .map(|p| p.snapshot(city.buildings())),
            grid: city.grid_rows(),
            gene: Gene::encode(city),
            generation: self.generation,
            parents: self.parents.clone(),
        }
    }
}

impl AsRef<City> for Candidate {
    fn as_ref(&self) -> &City {
        &self.city
    }
}

impl AsMut<City> for Candidate {
    fn as_mut(&mut self) -> &mut City {
        &mut self.city
    }
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid evolution configuration: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Selection failed: {0}")]
    Selection(#[from] SelectionError),
    #[error("Crossover failed: {0}")]
    Crossover(#[from] CrossoverError),
    #[error("City generation failed: {0}")]
    City(#[from] CityError),
    #[error("Failed to build the simulation thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("No random city with an office and a shop after {attempts} attempts")]
    NoViableCity { attempts: usize },
    #[error("Population is empty")]
    EmptyPopulation,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    strategy: SelectionStrategy,
    rng: GenomeRng,
    pool: rayon::ThreadPool,
    population: Vec<Candidate>,
    history: EvolutionHistory,
    generation: usize,
    best_fitness: f64,
    discarded_offspring: usize,
    total_evaluations: u64,
    next_id: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    ///
    /// Validates the configuration, resolves the selection parameter and
    /// builds a worker pool of `min(population_size, workers)` threads.
    pub fn new(config: EvolutionConfig) -> Result<Self, EvolutionError> {
        config.validate()?;
        let strategy = SelectionStrategy::resolve(config.selection, config.selection_parameter)?;

        let workers = config
            .workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .min(config.population_size)
            .max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("city-sim-{i}"))
            .build()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        info!(
            "Evolving {} cities of {}x{} for {} generations ({} workers, seed {})",
            config.population_size,
            config.city.width,
            config.city.height,
            config.generations,
            workers,
            seed
        );

        Ok(Self {
            config,
            strategy,
            rng: GenomeRng::new(seed),
            pool,
            population: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            best_fitness: f64::NEG_INFINITY,
            discarded_offspring: 0,
            total_evaluations: 0,
            next_id: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current population, fittest first once evaluated.
    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Generate and populate a fresh random city.
    fn random_city(&mut self) -> Result<City, CityError> {
        let mut city = City::generate(&self.config.city, &mut self.rng)?;
        city.populate(
            self.config.city.starting_money,
            self.config.city.travel_cost,
            &mut self.rng,
        );
        Ok(city)
    }

    /// Random city with at least one office and one shop, to stand in for a
    /// discarded offspring.
    fn viable_random_city(&mut self) -> Result<City, EvolutionError> {
        for _ in 0..MAX_REPLACEMENT_ATTEMPTS {
            let city = self.random_city()?;
            if !city.indices_of(BuildingKind::Office).is_empty()
                && !city.indices_of(BuildingKind::Shop).is_empty()
            {
                return Ok(city);
            }
        }
        Err(EvolutionError::NoViableCity {
            attempts: MAX_REPLACEMENT_ATTEMPTS,
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Initialize the population.
    pub fn initialize(&mut self) -> Result<(), EvolutionError> {
        self.population.clear();
        self.history = EvolutionHistory::default();
        self.generation = 0;
        self.best_fitness = f64::NEG_INFINITY;
        self.discarded_offspring = 0;
        self.total_evaluations = 0;

        for _ in 0..self.config.population_size {
            let city = self.random_city()?;
            let id = self.next_id();
            self.population.push(Candidate {
                id,
                city,
                generation: 0,
                parents: Vec::new(),
            });
        }
        Ok(())
    }

    /// Simulate every city on the worker pool, score it and sort the
    /// population fittest first.
    pub fn evaluate_population(&mut self) {
        let days = self.config.simulation_days;
        let population = &mut self.population;
        self.pool.install(|| {
            population
                .par_iter_mut()
                .for_each(|candidate| candidate.city.simulate(days));
            fitness::evaluate_population(population);
        });
        self.total_evaluations += self.population.len() as u64;

        let scores: Vec<f64> = self.population.iter().map(Candidate::fitness).collect();
        let stats = PopulationStats::from_fitness(&scores);
        self.best_fitness = self.best_fitness.max(stats.best);

        self.history.best_fitness.push(stats.best);
        self.history.avg_fitness.push(stats.mean);
        self.history.fitness_std.push(stats.std);
        self.history.best_inactive.push(
            self.population
                .first()
                .map_or(0, |c| c.city.count_inactive()),
        );

        info!(
            "Generation {}: best {:.2}, avg {:.2}, std {:.2}",
            self.generation, stats.best, stats.mean, stats.std
        );
    }

    /// Breed the next generation from the evaluated, sorted population.
    ///
    /// Offspring that decode without an office or a shop are replaced by a
    /// fresh random city that has both.
    pub fn step_generation(&mut self) -> Result<(), EvolutionError> {
        let scores: Vec<f64> = self.population.iter().map(Candidate::fitness).collect();
        let selected = select_with(&self.strategy, &scores, &mut self.rng)?;
        let pool_genes: Vec<Gene> = selected
            .iter()
            .map(|&i| Gene::encode(&self.population[i].city))
            .collect();
        let pool_ids: Vec<u64> = selected.iter().map(|&i| self.population[i].id).collect();

        let elites = self.config.elitism.min(self.population.len());
        let offspring = crossover_population(
            &pool_genes,
            self.config.crossover,
            self.config.population_size - elites,
            &mut self.rng,
        )?;
        let (mut genes, lineage): (Vec<Gene>, Vec<[usize; 2]>) = offspring
            .into_iter()
            .map(|child| (child.gene, child.parents))
            .unzip();
        mutate_population(&mut genes, self.config.mutation_chance, &mut self.rng);

        let next_generation = self.generation + 1;
        let mut next = Vec::with_capacity(self.config.population_size);

        // Elitism: keep best individuals
        for elite in &self.population[..elites] {
            let mut elite = elite.clone();
            elite.city.reset_residents();
            next.push(elite);
        }

        for (gene, [a, b]) in genes.into_iter().zip(lineage) {
            let city = match gene.decode(&mut self.rng) {
                Ok(city) => city,
                Err(err) => {
                    warn!("Discarding offspring: {err}");
                    self.discarded_offspring += 1;
                    self.viable_random_city()?
                }
            };
            let id = self.next_id();
            next.push(Candidate {
                id,
                city,
                generation: next_generation,
                parents: vec![pool_ids[a], pool_ids[b]],
            });
        }

        self.population = next;
        self.generation = next_generation;
        Ok(())
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        let scores: Vec<f64> = self.population.iter().map(Candidate::fitness).collect();
        let stats = PopulationStats::from_fitness(&scores);

        let best_candidate = self
            .population
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
            .map(Candidate::to_snapshot);

        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.generations,
            best_fitness: self.best_fitness.max(0.0),
            avg_fitness: stats.mean,
            generation_best: stats.best,
            discarded_offspring: self.discarded_offspring,
            best_candidate,
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.generation >= self.config.generations {
            return Some(StopReason::MaxGenerations);
        }

        None
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<EvolutionResult, EvolutionError>
    where
        F: Fn(&EvolutionProgress),
    {
        let start_time = std::time::Instant::now();

        // Initialize and evaluate the first population
        self.initialize()?;
        self.evaluate_population();
        callback(&self.progress());

        // Evolution loop
        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.step_generation()?;
            self.evaluate_population();
            callback(&self.progress());
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        let best = self
            .population
            .first()
            .map(Candidate::to_snapshot)
            .ok_or(EvolutionError::EmptyPopulation)?;
        let final_avg_fitness = self.history.avg_fitness.last().copied().unwrap_or(0.0);

        info!(
            "Stopped after {} generations ({:?}): best {:.2}, {} offspring discarded",
            self.generation, stop_reason, best.fitness, self.discarded_offspring
        );

        Ok(EvolutionResult {
            best,
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.total_evaluations,
                best_fitness: self.best_fitness.max(0.0),
                final_avg_fitness,
                discarded_offspring: self.discarded_offspring,
                elapsed_seconds: elapsed,
                evaluations_per_second: if elapsed > 0.0 {
                    self.total_evaluations as f64 / elapsed
                } else {
                    0.0
                },
                stop_reason,
            },
            history: self.history.clone(),
        })
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(|_| {})
    }
}
