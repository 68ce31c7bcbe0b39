//! Evolution configuration, genome and result types.
//!
//! This module provides the types for configuring the genetic search over
//! city layouts and for reporting its progress and outcome.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Building, CityConfig, ConfigError, Position};

/// Top-level configuration for a genetic search run.
///
/// Missing JSON fields take defaults. An omitted selection method falls back
/// to a size 3 tournament, but a named method never receives a default
/// parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "EvolutionConfigFile")]
pub struct EvolutionConfig {
    /// City generation and economy parameters.
    pub city: CityConfig,
    /// Number of generations to evolve.
    pub generations: usize,
    /// Simulated days per generation before fitness is taken.
    pub simulation_days: usize,
    /// Number of cities in the population.
    pub population_size: usize,
    /// Parent selection method.
    pub selection: SelectionMethod,
    /// Extra argument required by the selection method
    /// (selection pressure, tournament size or temperature).
    pub selection_parameter: Option<SelectionParameter>,
    /// Genome recombination method.
    pub crossover: CrossoverMethod,
    /// Probability that an offspring genome is mutated.
    pub mutation_chance: f64,
    /// Number of best cities copied unchanged into the next generation.
    pub elitism: usize,
    /// Simulation worker threads. Defaults to the available parallelism,
    /// never more than the population size.
    pub workers: Option<usize>,
    /// Random seed for reproducibility.
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            city: CityConfig::default(),
            generations: default_generations(),
            simulation_days: default_simulation_days(),
            population_size: default_population_size(),
            selection: SelectionMethod::default(),
            selection_parameter: default_selection_parameter(),
            crossover: CrossoverMethod::default(),
            mutation_chance: default_mutation_chance(),
            elitism: 0,
            workers: None,
            random_seed: None,
        }
    }
}

/// On-disk form of [`EvolutionConfig`].
#[derive(Deserialize)]
struct EvolutionConfigFile {
    #[serde(default)]
    city: CityConfig,
    #[serde(default = "default_generations")]
    generations: usize,
    #[serde(default = "default_simulation_days")]
    simulation_days: usize,
    #[serde(default = "default_population_size")]
    population_size: usize,
    #[serde(default)]
    selection: Option<SelectionMethod>,
    #[serde(default)]
    selection_parameter: Option<SelectionParameter>,
    #[serde(default)]
    crossover: CrossoverMethod,
    #[serde(default = "default_mutation_chance")]
    mutation_chance: f64,
    #[serde(default)]
    elitism: usize,
    #[serde(default)]
    workers: Option<usize>,
    #[serde(default)]
    random_seed: Option<u64>,
}

impl From<EvolutionConfigFile> for EvolutionConfig {
    fn from(file: EvolutionConfigFile) -> Self {
        let (selection, selection_parameter) = match file.selection {
            None => (
                SelectionMethod::default(),
                file.selection_parameter.or_else(default_selection_parameter),
            ),
            Some(method) => (method, file.selection_parameter),
        };
        Self {
            city: file.city,
            generations: file.generations,
            simulation_days: file.simulation_days,
            population_size: file.population_size,
            selection,
            selection_parameter: selection_parameter.map(|p| p.coerce_for(selection)),
            crossover: file.crossover,
            mutation_chance: file.mutation_chance,
            elitism: file.elitism,
            workers: file.workers,
            random_seed: file.random_seed,
        }
    }
}

fn default_generations() -> usize {
    50
}
fn default_simulation_days() -> usize {
    10
}
fn default_population_size() -> usize {
    40
}
fn default_selection_parameter() -> Option<SelectionParameter> {
    Some(SelectionParameter::Integer(3))
}
fn default_mutation_chance() -> f64 {
    0.05
}

/// Parent selection method.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SelectionMethod {
    /// Roulette wheel over raw fitness.
    FitnessProportional,
    /// Roulette wheel over linear rank probabilities. Takes a `Float` pressure.
    LinearRanking,
    /// Best of `k` uniform draws. Takes an `Integer` size.
    #[default]
    Tournament,
    /// Roulette wheel over `exp(fitness / T)`. Takes a `Float` temperature.
    Boltzmann,
}

impl SelectionMethod {
    /// Whether the method's parameter is a `Float`.
    pub fn takes_float(self) -> bool {
        matches!(self, Self::LinearRanking | Self::Boltzmann)
    }
}

/// The single scalar argument a selection method may need.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SelectionParameter {
    Integer(usize),
    Float(f64),
}

impl SelectionParameter {
    /// Read a whole number as a float for methods that take one, so JSON
    /// `2` and `2.0` mean the same pressure or temperature.
    pub fn coerce_for(self, method: SelectionMethod) -> Self {
        match self {
            Self::Integer(value) if method.takes_float() => Self::Float(value as f64),
            other => other,
        }
    }
}

/// Genome recombination method.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CrossoverMethod {
    OnePoint,
    TwoPoint,
    #[default]
    Uniform,
}

// ============================================================================
// Genome
// ============================================================================

/// Flat, order-sensitive serialization of a city's layout and economy.
///
/// Residents are not part of the genome; decoding re-creates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gene {
    pub width: usize,
    pub height: usize,
    pub starting_money: f64,
    pub travel_cost: f64,
    /// Houses, shops and offices in city placement order.
    pub buildings: Vec<Building>,
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Summary of one resident, for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonSnapshot {
    pub name: String,
    pub money: f64,
    pub active: bool,
    pub home: Position,
    pub workplace: Option<Position>,
}

/// Snapshot of an evaluated city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitySnapshot {
    /// Unique identifier.
    pub id: u64,
    /// Fitness score.
    pub fitness: f64,
    /// Money held by all residents.
    pub total_money: f64,
    /// Residents still solvent.
    pub active_residents: usize,
    /// Residents that went broke.
    pub inactive_residents: usize,
    /// The richest resident, if any.
    pub wealthiest: Option<PersonSnapshot>,
    /// Symbol grid, one string per x column.
    pub grid: Vec<String>,
    /// Genome of the city.
    pub gene: Gene,
    /// Generation this city was created.
    pub generation: usize,
    /// Parent IDs (for genealogy).
    pub parents: Vec<u64>,
}

/// Progress update, emitted once per generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current generation number.
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Best fitness seen so far.
    pub best_fitness: f64,
    /// Average fitness of current population.
    pub avg_fitness: f64,
    /// Best fitness this generation.
    pub generation_best: f64,
    /// Offspring discarded so far for lacking a shop or office.
    pub discarded_offspring: usize,
    /// Current best city.
    pub best_candidate: Option<CitySnapshot>,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f64>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f64>,
    /// Standard deviation per generation.
    pub fitness_std: Vec<f64>,
    /// Inactive residents in the best city per generation.
    pub best_inactive: Vec<usize>,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Fittest city of the final population.
    pub best: CitySnapshot,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Total generations run.
    pub generations: usize,
    /// Total city simulations performed.
    pub total_evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: f64,
    /// Average fitness of final population.
    pub final_avg_fitness: f64,
    /// Offspring replaced because they lacked a shop or office.
    pub discarded_offspring: usize,
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
    /// Reached the configured generation count.
    MaxGenerations,
    /// User cancelled.
    Cancelled,
}

impl EvolutionConfig {
    /// Read a configuration from a JSON file. Missing fields take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl EvolutionResult {
    /// Write the result as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Simulation days must be positive")]
    InvalidDays,
    #[error("Mutation chance {0} must lie in [0, 1]")]
    InvalidMutationChance(f64),
    #[error("Elitism {elitism} must be smaller than the population size {population}")]
    InvalidElitism { elitism: usize, population: usize },
    #[error("Worker count must be positive")]
    InvalidWorkers,
    #[error("Cities need at least one shop and one office to be viable")]
    NonViableCity,
    #[error("City config validation failed: {0}")]
    CityConfigError(#[from] ConfigError),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    ///
    /// Selection parameters are checked separately when the engine resolves
    /// the selection strategy.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.city.validate()?;

        if self.population_size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }
        if self.simulation_days == 0 {
            return Err(EvolutionConfigError::InvalidDays);
        }
        if !(0.0..=1.0).contains(&self.mutation_chance) {
            return Err(EvolutionConfigError::InvalidMutationChance(
                self.mutation_chance,
            ));
        }
        if self.elitism >= self.population_size {
            return Err(EvolutionConfigError::InvalidElitism {
                elitism: self.elitism,
                population: self.population_size,
            });
        }
        if self.workers == Some(0) {
            return Err(EvolutionConfigError::InvalidWorkers);
        }
        if self.city.shops == 0 || self.city.offices == 0 {
            return Err(EvolutionConfigError::NonViableCity);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = EvolutionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_population_too_small() {
        let config = EvolutionConfig {
            population_size: 1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(EvolutionConfigError::PopulationTooSmall)
        );
    }

    #[test]
    fn test_capacity_error_propagates() {
        let config = EvolutionConfig {
            city: CityConfig {
                width: 5,
                height: 5,
                houses: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::CityConfigError(
                ConfigError::Capacity { .. }
            ))
        ));
    }

    #[test]
    fn test_selection_parameter_untagged() {
        let int: SelectionParameter = serde_json::from_str("4").unwrap();
        assert_eq!(int, SelectionParameter::Integer(4));
        let float: SelectionParameter = serde_json::from_str("1.5").unwrap();
        assert_eq!(float, SelectionParameter::Float(1.5));
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"generations": 7, "selection": "Boltzmann", "selection_parameter": 40.0,
                "city": {"width": 15, "height": 15, "houses": 20, "shops": 10, "offices": 5}}"#,
        )
        .unwrap();

        let config = EvolutionConfig::load(&path).unwrap();
        assert_eq!(config.generations, 7);
        assert_eq!(config.population_size, 40);
        assert_eq!(config.selection, SelectionMethod::Boltzmann);
        assert_eq!(config.selection_parameter, Some(SelectionParameter::Float(40.0)));
        assert_eq!(config.city.width, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = EvolutionConfig::load(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(EvolutionConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_default_tournament_size_only_when_selection_omitted() {
        let config: EvolutionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.selection, SelectionMethod::Tournament);
        assert_eq!(config.selection_parameter, Some(SelectionParameter::Integer(3)));

        let config: EvolutionConfig = serde_json::from_str(r#"{"selection_parameter": 5}"#).unwrap();
        assert_eq!(config.selection_parameter, Some(SelectionParameter::Integer(5)));

        for method in ["Boltzmann", "LinearRanking", "Tournament"] {
            let json = format!(r#"{{"selection": "{method}"}}"#);
            let config: EvolutionConfig = serde_json::from_str(&json).unwrap();
            assert_eq!(config.selection_parameter, None, "{method}");
        }
    }

    #[test]
    fn test_whole_number_read_as_float_parameter() {
        let config: EvolutionConfig =
            serde_json::from_str(r#"{"selection": "Boltzmann", "selection_parameter": 50}"#)
                .unwrap();
        assert_eq!(config.selection_parameter, Some(SelectionParameter::Float(50.0)));

        let config: EvolutionConfig =
            serde_json::from_str(r#"{"selection": "Tournament", "selection_parameter": 2.0}"#)
                .unwrap();
        assert_eq!(config.selection_parameter, Some(SelectionParameter::Float(2.0)));
    }

    #[test]
    fn test_config_json_round_trip_keeps_selection() {
        let config = EvolutionConfig {
            selection: SelectionMethod::LinearRanking,
            selection_parameter: Some(SelectionParameter::Float(1.5)),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: EvolutionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.selection, SelectionMethod::LinearRanking);
        assert_eq!(back.selection_parameter, Some(SelectionParameter::Float(1.5)));
    }

    #[test]
    fn test_save_result() {
        let result = EvolutionResult {
            best: CitySnapshot {
                id: 3,
                fitness: 172.0,
                total_money: 172.0,
                active_residents: 1,
                inactive_residents: 0,
                wealthiest: None,
                grid: vec!["+ + +".into()],
                gene: Gene {
                    width: 3,
                    height: 3,
                    starting_money: 100.0,
                    travel_cost: 1.0,
                    buildings: vec![Building::house(Position::new(1, 1))],
                },
                generation: 2,
                parents: vec![0, 1],
            },
            stats: EvolutionStats {
                generations: 2,
                total_evaluations: 6,
                best_fitness: 172.0,
                final_avg_fitness: 100.0,
                discarded_offspring: 0,
                elapsed_seconds: 0.5,
                evaluations_per_second: 12.0,
                stop_reason: StopReason::MaxGenerations,
            },
            history: EvolutionHistory::default(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        result.save(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["best"]["fitness"], 172.0);
        assert_eq!(json["stats"]["stop_reason"], "MaxGenerations");
        assert_eq!(json["best"]["gene"]["buildings"][0]["kind"], "House");
    }

    #[test]
    fn test_serialization() {
        let config = EvolutionConfig {
            selection: SelectionMethod::Boltzmann,
            selection_parameter: Some(SelectionParameter::Float(50.0)),
            crossover: CrossoverMethod::TwoPoint,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EvolutionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.population_size, config.population_size);
        assert_eq!(parsed.selection, SelectionMethod::Boltzmann);
        assert_eq!(parsed.crossover, CrossoverMethod::TwoPoint);
        assert_eq!(
            parsed.selection_parameter,
            Some(SelectionParameter::Float(50.0))
        );
    }
}
