//! Parent selection schemes.
//!
//! All schemes work on a fitness slice already sorted fittest first and
//! return indices into it. Parents are drawn independently, so the same
//! individual can be picked more than once.

use rand::Rng;

use crate::schema::{SelectionMethod, SelectionParameter};

/// Fraction of the population chosen as parents each generation.
pub const PARENT_FRACTION: f64 = 0.1;

/// Selection configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    #[error("{method:?} selection needs a parameter")]
    MissingParameter { method: SelectionMethod },
    #[error("{method:?} selection expects {expected} parameter, got {found:?}")]
    WrongParameterKind {
        method: SelectionMethod,
        expected: &'static str,
        found: SelectionParameter,
    },
    #[error("Invalid {method:?} parameter: {reason}")]
    InvalidParameter {
        method: SelectionMethod,
        reason: String,
    },
    #[error("Cannot select from an empty population")]
    EmptyPopulation,
}

/// A selection method with its parameter resolved and checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionStrategy {
    FitnessProportional,
    LinearRanking { pressure: f64 },
    Tournament { size: usize },
    Boltzmann { temperature: f64 },
}

impl SelectionStrategy {
    /// Pair a method with its parameter.
    ///
    /// Linear ranking and Boltzmann take a `Float`, tournament an `Integer`.
    /// Configs read from JSON already carry whole-number floats as `Float`.
    pub fn resolve(
        method: SelectionMethod,
        parameter: Option<SelectionParameter>,
    ) -> Result<Self, SelectionError> {
        match method {
            SelectionMethod::FitnessProportional => Ok(Self::FitnessProportional),
            SelectionMethod::LinearRanking => {
                let pressure = float_parameter(method, parameter)?;
                if !pressure.is_finite() || !(0.0..=2.0).contains(&pressure) {
                    return Err(SelectionError::InvalidParameter {
                        method,
                        reason: format!("selection pressure {pressure} must lie in [0, 2]"),
                    });
                }
                Ok(Self::LinearRanking { pressure })
            }
            SelectionMethod::Tournament => match parameter {
                None => Err(SelectionError::MissingParameter { method }),
                Some(SelectionParameter::Integer(0)) => Err(SelectionError::InvalidParameter {
                    method,
                    reason: "tournament size must be at least 1".into(),
                }),
                Some(SelectionParameter::Integer(size)) => Ok(Self::Tournament { size }),
                Some(found) => Err(SelectionError::WrongParameterKind {
                    method,
                    expected: "an integer",
                    found,
                }),
            },
            SelectionMethod::Boltzmann => {
                let temperature = float_parameter(method, parameter)?;
                if !temperature.is_finite() || temperature <= 0.0 {
                    return Err(SelectionError::InvalidParameter {
                        method,
                        reason: format!("temperature {temperature} must be positive"),
                    });
                }
                Ok(Self::Boltzmann { temperature })
            }
        }
    }

    /// Pick one index from a fitness slice sorted fittest first.
    pub fn select_one<R: Rng + ?Sized>(
        &self,
        fitness: &[f64],
        rng: &mut R,
    ) -> Result<usize, SelectionError> {
        let n = fitness.len();
        if n == 0 {
            return Err(SelectionError::EmptyPopulation);
        }
        if n == 1 {
            return Ok(0);
        }

        let index = match *self {
            Self::FitnessProportional => {
                let weights: Vec<f64> = fitness.iter().map(|f| f.max(0.0)).collect();
                roulette(&weights, rng)
            }
            Self::LinearRanking { pressure } => {
                let n = n as f64;
                let weights: Vec<f64> = (1..=fitness.len())
                    .map(|rank| {
                        (2.0 - pressure) / n
                            + 2.0 * (rank as f64 - 1.0) * (pressure - 1.0) / (n * (n - 1.0))
                    })
                    .map(|p| p.max(0.0))
                    .collect();
                roulette(&weights, rng)
            }
            Self::Tournament { size } => {
                let mut best = rng.gen_range(0..n);
                for _ in 1..size {
                    let idx = rng.gen_range(0..n);
                    if fitness[idx] > fitness[best] {
                        best = idx;
                    }
                }
                best
            }
            Self::Boltzmann { temperature } => {
                let max = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let weights: Vec<f64> = fitness
                    .iter()
                    .map(|f| ((f - max) / temperature).exp())
                    .collect();
                roulette(&weights, rng)
            }
        };
        Ok(index)
    }
}

/// Number of parents selected from a population of `population_size`.
pub fn parent_count(population_size: usize) -> usize {
    ((population_size as f64 * PARENT_FRACTION).round() as usize).max(2)
}

/// Select `parent_count(fitness.len())` parents, one independent draw each.
pub fn select_parents<R: Rng + ?Sized>(
    fitness: &[f64],
    method: SelectionMethod,
    parameter: Option<SelectionParameter>,
    rng: &mut R,
) -> Result<Vec<usize>, SelectionError> {
    let strategy = SelectionStrategy::resolve(method, parameter)?;
    select_with(&strategy, fitness, rng)
}

/// Like [`select_parents`] with an already resolved strategy.
pub fn select_with<R: Rng + ?Sized>(
    strategy: &SelectionStrategy,
    fitness: &[f64],
    rng: &mut R,
) -> Result<Vec<usize>, SelectionError> {
    (0..parent_count(fitness.len()))
        .map(|_| strategy.select_one(fitness, rng))
        .collect()
}

fn float_parameter(
    method: SelectionMethod,
    parameter: Option<SelectionParameter>,
) -> Result<f64, SelectionError> {
    match parameter {
        None => Err(SelectionError::MissingParameter { method }),
        Some(SelectionParameter::Float(value)) => Ok(value),
        Some(found) => Err(SelectionError::WrongParameterKind {
            method,
            expected: "a float",
            found,
        }),
    }
}

/// Cumulative roulette over non-negative weights. Falls back to a uniform
/// pick when the weights carry no usable mass.
fn roulette<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return rng.gen_range(0..weights.len());
    }

    let target = rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if target < cumulative {
            return i;
        }
    }
    // Rounding left the target past the last bucket.
    weights
        .iter()
        .rposition(|w| *w > 0.0)
        .unwrap_or(weights.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::GenomeRng;

    const ALL: [(SelectionMethod, Option<SelectionParameter>); 4] = [
        (SelectionMethod::FitnessProportional, None),
        (
            SelectionMethod::LinearRanking,
            Some(SelectionParameter::Float(1.5)),
        ),
        (SelectionMethod::Tournament, Some(SelectionParameter::Integer(3))),
        (SelectionMethod::Boltzmann, Some(SelectionParameter::Float(50.0))),
    ];

    fn sorted_fitness() -> Vec<f64> {
        vec![500.0, 320.5, 300.0, 120.0, 80.0, 40.0, 10.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn test_parent_count() {
        assert_eq!(parent_count(2), 2);
        assert_eq!(parent_count(10), 2);
        assert_eq!(parent_count(25), 3);
        assert_eq!(parent_count(40), 4);
        assert_eq!(parent_count(100), 10);
    }

    #[test]
    fn test_all_methods_return_valid_indices() {
        let mut rng = GenomeRng::new(3);
        let fitness = sorted_fitness();
        for (method, parameter) in ALL {
            for _ in 0..50 {
                let parents = select_parents(&fitness, method, parameter, &mut rng).unwrap();
                assert_eq!(parents.len(), 2);
                assert!(parents.iter().all(|&i| i < fitness.len()));
            }
        }
    }

    #[test]
    fn test_fitness_proportional_single_mass() {
        let mut rng = GenomeRng::new(5);
        let fitness = [0.0, 0.0, 42.0, 0.0];
        let strategy = SelectionStrategy::FitnessProportional;
        for _ in 0..100 {
            assert_eq!(strategy.select_one(&fitness, &mut rng).unwrap(), 2);
        }
    }

    #[test]
    fn test_fitness_proportional_all_zero_is_uniform() {
        let mut rng = GenomeRng::new(5);
        let fitness = [0.0; 4];
        let strategy = SelectionStrategy::FitnessProportional;
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[strategy.select_one(&fitness, &mut rng).unwrap()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_linear_ranking_extremes() {
        let mut rng = GenomeRng::new(8);
        let fitness = [30.0, 20.0, 10.0];

        // Pressure 2 gives rank 1 zero probability.
        let strategy = SelectionStrategy::LinearRanking { pressure: 2.0 };
        for _ in 0..200 {
            assert_ne!(strategy.select_one(&fitness, &mut rng).unwrap(), 0);
        }

        // Pressure 0 gives the last rank zero probability.
        let strategy = SelectionStrategy::LinearRanking { pressure: 0.0 };
        for _ in 0..200 {
            assert_ne!(strategy.select_one(&fitness, &mut rng).unwrap(), 2);
        }
    }

    #[test]
    fn test_tournament_large_size_finds_best() {
        let mut rng = GenomeRng::new(13);
        let fitness = [9.0, 7.0, 5.0, 3.0, 1.0];
        let strategy = SelectionStrategy::Tournament { size: 200 };
        for _ in 0..20 {
            assert_eq!(strategy.select_one(&fitness, &mut rng).unwrap(), 0);
        }
    }

    #[test]
    fn test_boltzmann_large_fitness_does_not_overflow() {
        let mut rng = GenomeRng::new(21);
        let fitness = [1.0e6, 0.0, 0.0];
        let strategy = SelectionStrategy::Boltzmann { temperature: 1.0 };
        for _ in 0..50 {
            assert_eq!(strategy.select_one(&fitness, &mut rng).unwrap(), 0);
        }
    }

    #[test]
    fn test_parameter_errors() {
        assert_eq!(
            SelectionStrategy::resolve(SelectionMethod::Tournament, None),
            Err(SelectionError::MissingParameter {
                method: SelectionMethod::Tournament
            })
        );
        assert!(matches!(
            SelectionStrategy::resolve(
                SelectionMethod::Tournament,
                Some(SelectionParameter::Float(2.5))
            ),
            Err(SelectionError::WrongParameterKind { .. })
        ));
        assert!(matches!(
            SelectionStrategy::resolve(
                SelectionMethod::Tournament,
                Some(SelectionParameter::Integer(0))
            ),
            Err(SelectionError::InvalidParameter { .. })
        ));
        assert!(matches!(
            SelectionStrategy::resolve(
                SelectionMethod::Boltzmann,
                Some(SelectionParameter::Float(0.0))
            ),
            Err(SelectionError::InvalidParameter { .. })
        ));
        assert!(matches!(
            SelectionStrategy::resolve(
                SelectionMethod::LinearRanking,
                Some(SelectionParameter::Float(3.0))
            ),
            Err(SelectionError::InvalidParameter { .. })
        ));
        assert_eq!(
            SelectionStrategy::resolve(
                SelectionMethod::Boltzmann,
                Some(SelectionParameter::Float(50.0))
            ),
            Ok(SelectionStrategy::Boltzmann { temperature: 50.0 })
        );
    }

    #[test]
    fn test_float_methods_reject_integer_parameter() {
        for method in [SelectionMethod::LinearRanking, SelectionMethod::Boltzmann] {
            assert_eq!(
                SelectionStrategy::resolve(method, Some(SelectionParameter::Integer(1))),
                Err(SelectionError::WrongParameterKind {
                    method,
                    expected: "a float",
                    found: SelectionParameter::Integer(1),
                })
            );
        }
    }

    #[test]
    fn test_empty_population() {
        let mut rng = GenomeRng::new(0);
        assert_eq!(
            SelectionStrategy::FitnessProportional.select_one(&[], &mut rng),
            Err(SelectionError::EmptyPopulation)
        );
    }
}
