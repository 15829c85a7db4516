//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces of the external collaborators:
//! - PhaseSolver / SolverFactory: the iterative phase-retrieval solver
//! - AcquisitionService: PSF file reading
//! - PlotRenderer: raster rendering of data series
//!
//! These traits keep the run coordinator and report emitters independent
//! of any specific solver, file format or plotting backend.

pub mod acquisition;
pub mod renderer;
pub mod solver;

pub use acquisition::{AcquiredPsf, AcquisitionService};
pub use renderer::{Plot, PlotRenderer};
pub use solver::{PhaseSolver, SolverFactory, StepReport};
