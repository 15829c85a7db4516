use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid poll interval: must be at least 1 ms")]
    InvalidPollInterval,

    #[error("Invalid render cadence: must be at least 1 iteration")]
    InvalidRenderCadence,

    #[error("Invalid max_iterations: must be at least 1")]
    InvalidMaxIterations,

    #[error("Invalid zernike_terms: must be at least 1")]
    InvalidZernikeTerms,

    #[error("Invalid {name}: {value}. Must be positive")]
    InvalidTolerance { name: &'static str, value: f64 },
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["json", "pretty"];
const ROTATIONS: [&str; 3] = ["daily", "hourly", "never"];

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .pupilfit/config.yaml
    /// 3. .pupilfit/local.yaml (optional overrides)
    /// 4. Environment variables (PUPILFIT_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".pupilfit/config.yaml"))
            .merge(Yaml::file(".pupilfit/local.yaml"))
            .merge(Env::prefixed("PUPILFIT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load from an explicit file; environment variables still win
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("PUPILFIT_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let logging = &config.logging;
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(logging.level.clone()));
        }
        if !LOG_FORMATS.contains(&logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(logging.format.clone()));
        }
        if !ROTATIONS.contains(&logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(logging.rotation.clone()));
        }

        if config.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        if config.monitor.render_every == 0 {
            return Err(ConfigError::InvalidRenderCadence);
        }

        let fit = &config.fit;
        if fit.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations);
        }
        if fit.zernike_terms == 0 {
            return Err(ConfigError::InvalidZernikeTerms);
        }
        for (name, value) in [
            ("pupil_tolerance", fit.pupil_tolerance),
            ("mse_tolerance", fit.mse_tolerance),
            ("phase_tolerance", fit.phase_tolerance),
        ] {
            // written so NaN is rejected too
            if !(value > 0.0) {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }

        Ok(())
    }
}
