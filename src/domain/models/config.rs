use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure for pupilfit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Defaults applied to the fit parameters
    #[serde(default)]
    pub fit: FitDefaults,

    /// Poll and re-render cadence
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Where reports and images are written (defaults to the PSF's directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation of file logs (daily, hourly, never)
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Fit parameter defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FitDefaults {
    /// Central emission wavelength in nm; never read from the PSF file
    #[serde(default)]
    pub emission_wavelength_nm: Option<u32>,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_pupil_tolerance")]
    pub pupil_tolerance: f64,

    #[serde(default = "default_mse_tolerance")]
    pub mse_tolerance: f64,

    /// Display threshold for Zernike coefficients, in wavelengths
    #[serde(default = "default_phase_tolerance")]
    pub phase_tolerance: f64,

    /// Number of polynomial terms requested from the fit
    #[serde(default = "default_zernike_terms")]
    pub zernike_terms: usize,
}

const fn default_max_iterations() -> u32 {
    100
}

const fn default_pupil_tolerance() -> f64 {
    1e-8
}

const fn default_mse_tolerance() -> f64 {
    1e-6
}

const fn default_phase_tolerance() -> f64 {
    0.5
}

const fn default_zernike_terms() -> usize {
    120
}

impl Default for FitDefaults {
    fn default() -> Self {
        Self {
            emission_wavelength_nm: None,
            max_iterations: default_max_iterations(),
            pupil_tolerance: default_pupil_tolerance(),
            mse_tolerance: default_mse_tolerance(),
            phase_tolerance: default_phase_tolerance(),
            zernike_terms: default_zernike_terms(),
        }
    }
}

/// Cadence of the external poller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Re-render artifacts every N completed iterations
    #[serde(default = "default_render_every")]
    pub render_every: u32,
}

const fn default_poll_interval_ms() -> u64 {
    250
}

const fn default_render_every() -> u32 {
    5
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            render_every: default_render_every(),
        }
    }
}
