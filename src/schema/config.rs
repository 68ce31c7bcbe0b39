//! Configuration types for city generation and the agent economy.

use serde::{Deserialize, Serialize};

/// Parameters for randomly generating and populating a city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityConfig {
    /// Grid width in cells (X dimension).
    pub width: usize,
    /// Grid height in cells (Y dimension).
    pub height: usize,
    /// Number of houses to place. One resident per house.
    pub houses: usize,
    /// Number of shops to place.
    pub shops: usize,
    /// Number of offices to place.
    pub offices: usize,
    /// Mean amount spent per shop visit.
    #[serde(default = "default_shop_average_spend")]
    pub shop_average_spend: f64,
    /// Mean salary paid per working day.
    #[serde(default = "default_office_average_salary")]
    pub office_average_salary: f64,
    /// Half-width of the uniform noise applied to spend and salary.
    #[serde(default)]
    pub variation: f64,
    /// Strength of the Gaussian pull of buildings toward the grid center.
    #[serde(default = "default_center_bias")]
    pub center_bias: f64,
    /// Money every resident starts with.
    #[serde(default = "default_starting_money")]
    pub starting_money: f64,
    /// Cost per tile travelled.
    #[serde(default = "default_travel_cost")]
    pub travel_cost: f64,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            width: 21,
            height: 21,
            houses: 40,
            shops: 25,
            offices: 15,
            shop_average_spend: default_shop_average_spend(),
            office_average_salary: default_office_average_salary(),
            variation: 0.1,
            center_bias: default_center_bias(),
            starting_money: default_starting_money(),
            travel_cost: default_travel_cost(),
        }
    }
}

fn default_shop_average_spend() -> f64 {
    40.0
}
fn default_office_average_salary() -> f64 {
    100.0
}
fn default_center_bias() -> f64 {
    2.5
}
fn default_starting_money() -> f64 {
    100.0
}
fn default_travel_cost() -> f64 {
    5.5
}

impl CityConfig {
    /// Number of odd/odd cells that can host a building.
    #[inline]
    pub fn lattice_capacity(&self) -> usize {
        (self.width / 2) * (self.height / 2)
    }

    /// Total number of buildings requested.
    #[inline]
    pub fn requested_buildings(&self) -> usize {
        self.houses + self.shops + self.offices
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 3 || self.height < 3 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.requested_buildings() > self.lattice_capacity() {
            return Err(ConfigError::Capacity {
                requested: self.requested_buildings(),
                capacity: self.lattice_capacity(),
            });
        }
        let finite_non_negative = [
            ("shop_average_spend", self.shop_average_spend),
            ("office_average_salary", self.office_average_salary),
            ("variation", self.variation),
            ("center_bias", self.center_bias),
            ("travel_cost", self.travel_cost),
        ];
        for (name, value) in finite_non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("{value} must be finite and non-negative"),
                });
            }
        }
        if !self.starting_money.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "starting_money",
                reason: "must be finite".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid must be at least 3x3 to hold a building, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("Requested {requested} buildings but the lattice only has {capacity} spots")]
    Capacity { requested: usize, capacity: usize },
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}
