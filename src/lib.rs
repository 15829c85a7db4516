//! pupilfit - background phase retrieval with Zernike decomposition reports
//!
//! A measured point spread function is fitted by an iterative phase
//! retrieval solver running on a worker thread. The caller polls progress,
//! may cancel cooperatively, and once the run ends the pupil phase is
//! decomposed into the first Zernike polynomials, classified against a
//! phase tolerance and written out as a workbook and a one-page PDF.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): parameters, catalog, progress, ports
//! - **Application Layer** (`application`): run coordination, monitoring, sessions
//! - **Service Layer** (`services`): classification and report emitters
//! - **Infrastructure Layer** (`infrastructure`): config, logging, acquisition, solvers, rendering
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use pupilfit::application::{RunCoordinator, RunMonitor};
//!
//! let handle = coordinator.start(&parameters, stack)?;
//! let status = RunMonitor::default().watch(&handle, |_| {}).await;
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{
    ConvergencePolicy, FitSession, RunCoordinator, RunHandle, RunMonitor, RunResult, RunStatus,
};
pub use domain::error::{ReportError, RunError, SolverError, ValidationError};
pub use domain::models::{
    Config, FitParameters, ImageArtifactStore, PixelStack, ProgressState, ToleranceFlag,
    ZernikeCatalog,
};
pub use domain::ports::{PhaseSolver, PlotRenderer, SolverFactory};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ReportEmitter, ResultClassifier};
