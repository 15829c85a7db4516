//! Domain errors for fit runs, acquisition and reporting.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use super::models::parameters::ParameterKey;

/// A single reason why a parameter set cannot start a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Required parameter was never set
    Missing(ParameterKey),

    /// Parameter is present but zero or negative
    NotPositive(ParameterKey),

    /// No image dimensions recorded (no PSF loaded)
    MissingImageSize,

    /// Pixel stack does not match `(z_size, xy_size, xy_size)`
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{} is not set", key.display_name()),
            Self::NotPositive(key) => write!(f, "{} must be positive", key.display_name()),
            Self::MissingImageSize => write!(f, "image dimensions are unknown"),
            Self::ShapeMismatch { expected, actual } => write!(
                f,
                "PSF data is shaped {actual:?}, expected {expected:?}"
            ),
        }
    }
}

/// Parameter validation failed; the run was not started
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid PSF parameters: {}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Whether any issue refers to the given parameter
    pub fn mentions(&self, key: ParameterKey) -> bool {
        self.issues.iter().any(|issue| {
            matches!(issue, ValidationIssue::Missing(k) | ValidationIssue::NotPositive(k) if *k == key)
        })
    }
}

/// Errors from the image/metadata acquisition service
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("File format not supported: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid PSF file path {path}: {source}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PSF file parameters or data not read correctly: {0}")]
    InvalidMetadata(String),

    #[error("Acquisition bridge has been shut down")]
    BridgeClosed,
}

/// Errors raised by the external solver
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    #[error("solver could not be prepared: {0}")]
    Setup(String),

    #[error("solver step failed at iteration {iteration}: {message}")]
    Step { iteration: u32, message: String },

    #[error("polynomial fit failed: {0}")]
    Finalize(String),
}

/// Errors returned when starting a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Phase retrieval run {0} is still active")]
    AlreadyActive(Uuid),

    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Errors raised by raster rendering
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("nothing to plot: {0}")]
    EmptySeries(&'static str),

    #[error("image encoding failed: {0}")]
    Encoding(#[from] image::ImageError),
}

/// Errors raised while writing reports and artifacts
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Cannot write reports while a phase retrieval run is active")]
    RunActive,

    #[error("No PSF file loaded")]
    NoSource,

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Saving results as .xlsx failed: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Creating a .pdf-report failed: {0}")]
    Pdf(String),

    #[error("Image artifact {0} could not be decoded: {1}")]
    Image(String, image::ImageError),

    #[error("Image artifact {0} is empty")]
    MissingArtifact(String),
}
