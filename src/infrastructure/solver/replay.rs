//! Solver that replays a recorded fit trace.
//!
//! Used to regenerate reports for a past fit and to exercise the run
//! coordinator without the numerical solver.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::error::SolverError;
use crate::domain::models::{PixelStack, Plane, SolverParameters};
use crate::domain::ports::{PhaseSolver, SolverFactory, StepReport};

/// Recorded per-iteration differences and the final coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitTrace {
    pub pupil_diffs: Vec<f64>,
    pub mse_diffs: Vec<f64>,
    /// Zernike coefficients in Noll order, in units of the wavelength
    pub coefficients: Vec<f64>,
    /// Iteration (1-based) whose step fails
    #[serde(default)]
    pub fail_at: Option<u32>,
    #[serde(default)]
    pub pupil_phase: Option<Plane>,
    /// Artificial duration of every step
    #[serde(default)]
    pub step_delay_ms: u64,
}

impl FitTrace {
    pub fn load(path: &Path) -> Result<Self, SolverError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SolverError::Setup(format!("{}: {err}", path.display())))?;
        let trace: Self = serde_json::from_str(&raw)
            .map_err(|err| SolverError::Setup(format!("{}: {err}", path.display())))?;
        trace.check()?;
        Ok(trace)
    }

    fn check(&self) -> Result<(), SolverError> {
        if self.pupil_diffs.is_empty() || self.mse_diffs.is_empty() {
            return Err(SolverError::Setup(
                "fit trace holds no iterations".to_string(),
            ));
        }
        Ok(())
    }
}

/// Steps through a [`FitTrace`]; past its end the last differences repeat
#[derive(Debug)]
pub struct ReplaySolver {
    trace: Arc<FitTrace>,
    iteration: u32,
}

impl ReplaySolver {
    pub fn new(trace: Arc<FitTrace>) -> Result<Self, SolverError> {
        trace.check()?;
        Ok(Self {
            trace,
            iteration: 0,
        })
    }

    fn sample(series: &[f64], index: usize) -> f64 {
        series
            .get(index)
            .or_else(|| series.last())
            .copied()
            .unwrap_or(f64::NAN)
    }
}

impl PhaseSolver for ReplaySolver {
    fn step(&mut self) -> Result<StepReport, SolverError> {
        let iteration = self.iteration + 1;
        if self.trace.step_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.trace.step_delay_ms));
        }
        if self.trace.fail_at == Some(iteration) {
            return Err(SolverError::Step {
                iteration,
                message: "recorded failure".to_string(),
            });
        }

        let index = self.iteration as usize;
        self.iteration = iteration;
        Ok(StepReport {
            pupil_diff: Self::sample(&self.trace.pupil_diffs, index),
            mse_diff: Self::sample(&self.trace.mse_diffs, index),
        })
    }

    fn finalize(&mut self, max_terms: usize) -> Result<Vec<f64>, SolverError> {
        Ok(self
            .trace
            .coefficients
            .iter()
            .take(max_terms)
            .copied()
            .collect())
    }

    fn pupil_phase(&self) -> Option<Plane> {
        self.trace.pupil_phase.clone()
    }
}

/// Hands out a fresh [`ReplaySolver`] for every run
#[derive(Debug, Clone)]
pub struct ReplaySolverFactory {
    trace: Arc<FitTrace>,
}

impl ReplaySolverFactory {
    pub fn new(trace: FitTrace) -> Self {
        Self {
            trace: Arc::new(trace),
        }
    }
}

impl SolverFactory for ReplaySolverFactory {
    fn prepare(
        &self,
        params: &SolverParameters,
        stack: PixelStack,
    ) -> Result<Box<dyn PhaseSolver>, SolverError> {
        debug!(
            shape = ?stack.shape(),
            wavelength_nm = params.emission_wavelength_nm,
            recorded_iterations = self.trace.pupil_diffs.len(),
            "Preparing replay solver"
        );
        Ok(Box::new(ReplaySolver::new(Arc::clone(&self.trace))?))
    }
}
