//! Domain layer for pupilfit
//!
//! This module contains the fit data model, errors and port traits.

pub mod error;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use error::{
    AcquisitionError, RenderError, ReportError, RunError, SolverError, ValidationError,
    ValidationIssue,
};
