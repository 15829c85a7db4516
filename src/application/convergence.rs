//! Termination policy evaluated after every completed iteration.

use serde::{Deserialize, Serialize};

use crate::domain::models::{SolverParameters, TerminationReason};

/// What the loop knows after an iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationObservation {
    pub pupil_diff: f64,
    pub mse_diff: f64,
    pub iteration: u32,
    pub cancelled: bool,
}

/// Thresholds deciding when a run stops
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePolicy {
    pub max_iterations: u32,
    pub pupil_tolerance: f64,
    pub mse_tolerance: f64,
}

impl ConvergencePolicy {
    pub const fn new(max_iterations: u32, pupil_tolerance: f64, mse_tolerance: f64) -> Self {
        Self {
            max_iterations,
            pupil_tolerance,
            mse_tolerance,
        }
    }

    /// Classify an iteration; `None` means keep going.
    ///
    /// Checks run in a fixed order and the first match wins: cancellation,
    /// pupil convergence, MSE convergence, iteration limit.
    pub fn evaluate(&self, observation: &IterationObservation) -> Option<TerminationReason> {
        if observation.cancelled {
            Some(TerminationReason::Cancelled)
        } else if observation.pupil_diff < self.pupil_tolerance {
            Some(TerminationReason::PupilConverged)
        } else if observation.mse_diff < self.mse_tolerance {
            Some(TerminationReason::MseConverged)
        } else if observation.iteration >= self.max_iterations {
            Some(TerminationReason::MaxIterations)
        } else {
            None
        }
    }
}

impl From<&SolverParameters> for ConvergencePolicy {
    fn from(params: &SolverParameters) -> Self {
        Self::new(
            params.max_iterations,
            params.pupil_tolerance,
            params.mse_tolerance,
        )
    }
}
