pub mod artifact;
pub mod catalog;
pub mod config;
pub mod parameters;
pub mod progress;
pub mod stack;

pub use artifact::{ArtifactKind, ImageArtifactStore};
pub use catalog::{CatalogEntry, ToleranceFlag, ZernikeCatalog, NOLL_NAMES, SALIENT_ORDERS};
pub use config::{Config, FitDefaults, LoggingConfig, MonitorConfig};
pub use parameters::{
    FitParameters, ImageSize, ParameterKey, ParameterValue, SolverParameters, Unit,
};
pub use progress::{scientific, ProgressState, StatusMessage, TerminationReason};
pub use stack::{PixelStack, Plane};
