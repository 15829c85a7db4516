//! Configuration loading
//!
//! Defaults merged with `.pupilfit/*.yaml` and `PUPILFIT_*` environment
//! variables through figment, then validated.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
