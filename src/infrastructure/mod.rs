//! Infrastructure layer module
//!
//! Adapters and ambient services:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Acquisition of PSF files
//! - Replay solver
//! - Raster plot rendering
//!
//! Adapters implement the port traits defined in the domain layer.

pub mod acquisition;
pub mod config;
pub mod logging;
pub mod render;
pub mod solver;
