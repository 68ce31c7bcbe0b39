//! Compute module - City model, resident simulation and genetic search.

mod city;
mod person;

pub mod evolution;

pub use city::*;
pub use person::*;
