//! Fitness of a simulated city.
//!
//! Fitness is the money held by all residents, less a fixed penalty per
//! resident that went broke, rounded down to cents and floored at zero.

use rayon::prelude::*;

use crate::compute::City;
use crate::schema::floor_cents;

/// Penalty subtracted for every inactive resident.
pub const INACTIVE_PENALTY: f64 = 100.0;

/// Fitness of a city in its current (usually post-simulation) state.
pub fn fitness(city: &City) -> f64 {
    let raw = city.total_money() - INACTIVE_PENALTY * city.count_inactive() as f64;
    floor_cents(raw).max(0.0)
}

/// Compute and store a city's fitness.
pub fn evaluate(city: &mut City) -> f64 {
    let value = fitness(city);
    city.set_fitness(value);
    value
}

/// Stable sort, fittest first. Equal fitness keeps the existing order.
pub fn rank_descending<T>(items: &mut [T], fitness: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| fitness(b).total_cmp(&fitness(a)));
}

/// Evaluate every city in parallel, then sort the population fittest first.
///
/// Runs on the current rayon pool, so callers can scope it with
/// `ThreadPool::install`.
pub fn evaluate_population<T>(population: &mut [T])
where
    T: AsRef<City> + AsMut<City> + Send,
{
    population.par_iter_mut().for_each(|item| {
        evaluate(item.as_mut());
    });
    rank_descending(population, |item| item.as_ref().fitness());
}

/// Summary statistics of a population's fitness.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PopulationStats {
    pub best: f64,
    pub mean: f64,
    pub std: f64,
}

impl PopulationStats {
    pub fn from_fitness(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            best,
            mean,
            std: variance.sqrt(),
        }
    }
}
