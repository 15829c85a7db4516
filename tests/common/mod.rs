//! Common test utilities for integration tests
//!
//! Provides solver doubles, parameter fixtures and helpers shared across
//! the integration test files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use pupilfit::domain::error::SolverError;
use pupilfit::domain::models::{FitParameters, ImageSize, PixelStack, SolverParameters};
use pupilfit::domain::ports::{PhaseSolver, SolverFactory, StepReport};
use pupilfit::RunCoordinator;
use tempfile::TempDir;
use tokio::runtime::Handle;

pub const ZERNIKE_TERMS: usize = 15;

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Fully populated parameters for a 2 x 4 x 4 stack
pub fn fixture_parameters() -> FitParameters {
    FitParameters {
        emission_wavelength: Some(520),
        numerical_aperture: Some(1.4),
        refractive_index: Some(1.518),
        xy_resolution: Some(52),
        z_resolution: Some(200),
        max_iterations: Some(5),
        pupil_tolerance: Some(1e-8),
        mse_tolerance: Some(1e-8),
        phase_tolerance: Some(0.5),
        image_size: Some(ImageSize { xy: 4, z: 2 }),
    }
}

pub fn fixture_stack() -> PixelStack {
    PixelStack::zeros(2, 4, 4)
}

/// Solver reporting the same differences every step; optionally fails a step
pub struct ConstantSolver {
    diff: f64,
    fail_at: Option<u32>,
    steps: u32,
}

impl PhaseSolver for ConstantSolver {
    fn step(&mut self) -> Result<StepReport, SolverError> {
        self.steps += 1;
        if self.fail_at == Some(self.steps) {
            return Err(SolverError::Step {
                iteration: self.steps,
                message: "singular pupil".to_string(),
            });
        }
        Ok(StepReport {
            pupil_diff: self.diff,
            mse_diff: self.diff,
        })
    }

    fn finalize(&mut self, max_terms: usize) -> Result<Vec<f64>, SolverError> {
        Ok((0..max_terms).map(|i| i as f64 * 0.1).collect())
    }
}

pub struct ConstantFactory {
    pub diff: f64,
    pub fail_at: Option<u32>,
}

impl ConstantFactory {
    pub fn never_improving() -> Arc<Self> {
        Arc::new(Self {
            diff: 1e-3,
            fail_at: None,
        })
    }

    pub fn failing_at(step: u32) -> Arc<Self> {
        Arc::new(Self {
            diff: 1e-3,
            fail_at: Some(step),
        })
    }
}

impl SolverFactory for ConstantFactory {
    fn prepare(
        &self,
        _params: &SolverParameters,
        _stack: PixelStack,
    ) -> Result<Box<dyn PhaseSolver>, SolverError> {
        Ok(Box::new(ConstantSolver {
            diff: self.diff,
            fail_at: self.fail_at,
            steps: 0,
        }))
    }
}

/// Solver whose every step blocks until the test hands out a permit
pub struct GatedSolver {
    permits: Receiver<()>,
}

impl PhaseSolver for GatedSolver {
    fn step(&mut self) -> Result<StepReport, SolverError> {
        self.permits.recv().map_err(|_| SolverError::Step {
            iteration: 0,
            message: "gate closed".to_string(),
        })?;
        Ok(StepReport {
            pupil_diff: 1.0,
            mse_diff: 1.0,
        })
    }

    fn finalize(&mut self, max_terms: usize) -> Result<Vec<f64>, SolverError> {
        Ok(vec![0.0; max_terms])
    }
}

/// Hands out a single [`GatedSolver`]; the sender stays with the test
pub struct GatedFactory {
    receiver: Mutex<Option<Receiver<()>>>,
}

impl GatedFactory {
    pub fn new() -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let factory = Arc::new(Self {
            receiver: Mutex::new(Some(rx)),
        });
        (factory, tx)
    }
}

impl SolverFactory for GatedFactory {
    fn prepare(
        &self,
        _params: &SolverParameters,
        _stack: PixelStack,
    ) -> Result<Box<dyn PhaseSolver>, SolverError> {
        let permits = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SolverError::Setup("gate already handed out".to_string()))?;
        Ok(Box::new(GatedSolver { permits }))
    }
}

pub fn coordinator(factory: Arc<dyn SolverFactory>) -> RunCoordinator {
    RunCoordinator::new(factory, Handle::current(), ZERNIKE_TERMS)
}

/// Write a 2 x 4 x 4 acquisition record into `dir`
pub fn write_record(dir: &Path, name: &str) -> PathBuf {
    let plane: Vec<Vec<u16>> = (0..4u16)
        .map(|y| (0..4u16).map(|x| x * 10 + y).collect())
        .collect();
    let record = serde_json::json!({
        "metadata": {
            "pixels": {
                "size_x": 4,
                "size_y": 4,
                "size_z": 2,
                "physical_size_x": 52.0,
                "physical_size_x_unit": "nm",
                "physical_size_y": 52.0,
                "physical_size_y_unit": "nm",
                "physical_size_z": 0.2,
                "physical_size_z_unit": "um"
            },
            "objective": { "lens_na": 1.4, "immersion": "Oil" }
        },
        "planes": [plane.clone(), plane]
    });
    let path = dir.join(name);
    std::fs::write(&path, record.to_string()).unwrap();
    path
}

/// Write a replayable fit trace into `dir`
pub fn write_trace(dir: &Path, pupil_diffs: &[f64], coefficients: &[f64]) -> PathBuf {
    let trace = serde_json::json!({
        "pupil_diffs": pupil_diffs,
        "mse_diffs": pupil_diffs,
        "coefficients": coefficients,
    });
    let path = dir.join("trace.json");
    std::fs::write(&path, trace.to_string()).unwrap();
    path
}
