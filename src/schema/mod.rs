//! Schema module - Configuration, genome and catalog types for city evolution.

mod building;
mod config;
mod evolution;

pub use building::*;
pub use config::*;
pub use evolution::*;
