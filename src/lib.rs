//! City Evolver - Genetic search over city layouts.
//!
//! Cities are grids of roads, houses, shops and offices. Every house holds a
//! resident who commutes to an office, shops at the nearest shop and returns
//! home each simulated day, paying for every tile travelled. A genetic
//! algorithm evolves the layouts toward cities whose residents end up richer.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, building catalog, genome and result types
//! - `compute`: City model, resident simulation and the genetic search
//!
//! # Example
//!
//! ```rust,no_run
//! use city_evolver::{
//!     compute::{City, evolution::{GenomeRng, evaluate}},
//!     schema::CityConfig,
//! };
//!
//! let config = CityConfig::default();
//! let mut rng = GenomeRng::new(42);
//!
//! // Generate a city and move residents in
//! let mut city = City::generate(&config, &mut rng).unwrap();
//! city.populate(config.starting_money, config.travel_cost, &mut rng);
//!
//! // Simulate ten days and score the result
//! city.simulate(10);
//! println!("{}", city.render());
//! println!("Fitness after 10 days: {:.2}", evaluate(&mut city));
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::City;
pub use compute::evolution::{EvolutionEngine, GenomeRng};
pub use schema::{CityConfig, EvolutionConfig, Gene};
