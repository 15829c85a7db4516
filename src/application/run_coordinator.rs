//! RunCoordinator - drives the phase-retrieval solver in the background
//!
//! - One blocking worker per run, stepping the solver until the
//!   [`ConvergencePolicy`] reports a termination reason
//! - Progress published as a complete snapshot per iteration over a
//!   `watch` channel; `poll` reads the latest snapshot without blocking
//! - Cooperative cancellation through a `CancellationToken` checked at
//!   every iteration boundary
//! - A single active run at a time; a second `start` is rejected

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::convergence::{ConvergencePolicy, IterationObservation};
use crate::domain::error::RunError;
use crate::domain::models::{FitParameters, PixelStack, Plane, ProgressState, TerminationReason};
use crate::domain::ports::{PhaseSolver, SolverFactory};

/// Differences recorded after one iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvergenceSample {
    pub iteration: u32,
    pub pupil_diff: f64,
    pub mse_diff: f64,
}

/// Terminal state of a run plus whatever the solver produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub progress: ProgressState,
    /// Raw polynomial coefficients in Noll order; empty when the solver failed
    pub coefficients: Vec<f64>,
    pub pupil_phase: Option<Plane>,
    pub history: Vec<ConvergenceSample>,
}

/// What a poller observes
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Running(ProgressState),
    Completed(RunResult),
    Cancelled(RunResult),
    Failed(RunResult),
}

impl RunStatus {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running(_))
    }

    pub const fn progress(&self) -> &ProgressState {
        match self {
            Self::Running(progress) => progress,
            Self::Completed(result) | Self::Cancelled(result) | Self::Failed(result) => {
                &result.progress
            }
        }
    }

    pub const fn result(&self) -> Option<&RunResult> {
        match self {
            Self::Running(_) => None,
            Self::Completed(result) | Self::Cancelled(result) | Self::Failed(result) => {
                Some(result)
            }
        }
    }

    pub fn into_result(self) -> Option<RunResult> {
        match self {
            Self::Running(_) => None,
            Self::Completed(result) | Self::Cancelled(result) | Self::Failed(result) => {
                Some(result)
            }
        }
    }
}

impl From<RunResult> for RunStatus {
    fn from(result: RunResult) -> Self {
        match result.progress.reason() {
            Some(TerminationReason::Cancelled) => Self::Cancelled(result),
            Some(TerminationReason::SolverFailure(_)) => Self::Failed(result),
            _ => Self::Completed(result),
        }
    }
}

/// Caller-side handle to a run
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: Uuid,
    status: watch::Receiver<RunStatus>,
    cancel: CancellationToken,
    history: Arc<Mutex<Vec<ConvergenceSample>>>,
    max_iterations: u32,
}

impl RunHandle {
    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub const fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Latest published status; never blocks on the solver
    pub fn poll(&self) -> RunStatus {
        self.status.borrow().clone()
    }

    pub fn progress(&self) -> ProgressState {
        self.status.borrow().progress().clone()
    }

    pub fn is_active(&self) -> bool {
        !self.status.borrow().is_terminal()
    }

    /// Request cancellation; observed at the next iteration boundary
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!(run_id = %self.id, "Phase retrieval cancellation requested");
        }
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Differences of every completed iteration so far
    pub fn history(&self) -> Vec<ConvergenceSample> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait until the run reaches a terminal status
    pub async fn wait(&self) -> RunStatus {
        let mut status = self.status.clone();
        let terminal = status
            .wait_for(RunStatus::is_terminal)
            .await
            .map(|s| s.clone());
        terminal.unwrap_or_else(|_| status.borrow().clone())
    }
}

/// Starts runs and enforces the single-active-run policy
pub struct RunCoordinator {
    factory: Arc<dyn SolverFactory>,
    runtime: Handle,
    zernike_terms: usize,
    active: Mutex<Option<RunHandle>>,
}

impl RunCoordinator {
    /// Create a coordinator spawning its workers on `runtime`
    pub fn new(factory: Arc<dyn SolverFactory>, runtime: Handle, zernike_terms: usize) -> Self {
        Self {
            factory,
            runtime,
            zernike_terms,
            active: Mutex::new(None),
        }
    }

    /// Validate the parameters and start a background run.
    ///
    /// Returns immediately. Fails without spawning anything when a required
    /// parameter is missing, the stack shape is wrong, another run is still
    /// active, or the solver cannot be prepared.
    pub fn start(&self, params: &FitParameters, stack: PixelStack) -> Result<RunHandle, RunError> {
        let solver_params = params.validate(&stack)?;

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = active.as_ref().filter(|h| h.is_active()) {
            warn!(run_id = %current.id(), "Rejected start while a run is active");
            return Err(RunError::AlreadyActive(current.id()));
        }

        let solver = self.factory.prepare(&solver_params, stack)?;
        let policy = ConvergencePolicy::from(&solver_params);

        let (status_tx, status_rx) =
            watch::channel(RunStatus::Running(ProgressState::started(policy.max_iterations)));
        let cancel = CancellationToken::new();
        let history = Arc::new(Mutex::new(Vec::new()));
        let id = Uuid::new_v4();

        let handle = RunHandle {
            id,
            status: status_rx,
            cancel: cancel.clone(),
            history: Arc::clone(&history),
            max_iterations: policy.max_iterations,
        };

        let worker = RunWorker {
            id,
            solver,
            policy,
            publisher: StatusPublisher::new(status_tx),
            cancel,
            history,
            zernike_terms: self.zernike_terms,
        };

        info!(
            run_id = %id,
            max_iterations = policy.max_iterations,
            pupil_tolerance = policy.pupil_tolerance,
            mse_tolerance = policy.mse_tolerance,
            "Starting phase retrieval"
        );
        self.runtime.spawn_blocking(move || worker.run());

        *active = Some(handle.clone());
        Ok(handle)
    }

    /// Handle of the current run, if one is still active
    pub fn active_run(&self) -> Option<RunHandle> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|h| h.is_active())
            .cloned()
    }

    pub fn is_active(&self) -> bool {
        self.active_run().is_some()
    }
}

/// Sole writer of a run's status.
///
/// If the worker unwinds before publishing a terminal status, dropping the
/// publisher marks the run failed so `finished` still ends up true.
struct StatusPublisher {
    tx: watch::Sender<RunStatus>,
    terminal: bool,
}

impl StatusPublisher {
    const fn new(tx: watch::Sender<RunStatus>) -> Self {
        Self { tx, terminal: false }
    }

    fn progress(&self, progress: ProgressState) {
        self.tx.send_replace(RunStatus::Running(progress));
    }

    fn finish(&mut self, result: RunResult) {
        self.terminal = true;
        self.tx.send_replace(RunStatus::from(result));
    }
}

impl Drop for StatusPublisher {
    fn drop(&mut self) {
        if self.terminal {
            return;
        }
        self.tx.send_modify(|status| {
            let progress = status
                .progress()
                .stopped(TerminationReason::SolverFailure("run aborted".to_string()));
            *status = RunStatus::Failed(RunResult {
                progress,
                coefficients: Vec::new(),
                pupil_phase: None,
                history: Vec::new(),
            });
        });
    }
}

struct RunWorker {
    id: Uuid,
    solver: Box<dyn PhaseSolver>,
    policy: ConvergencePolicy,
    publisher: StatusPublisher,
    cancel: CancellationToken,
    history: Arc<Mutex<Vec<ConvergenceSample>>>,
    zernike_terms: usize,
}

impl RunWorker {
    fn run(mut self) {
        let mut progress = ProgressState::started(self.policy.max_iterations);

        let reason = loop {
            if self.cancel.is_cancelled() {
                break TerminationReason::Cancelled;
            }

            let report = match self.solver.step() {
                Ok(report) => report,
                Err(err) => {
                    error!(run_id = %self.id, iteration = progress.iteration + 1, "Solver step failed: {err}");
                    break TerminationReason::SolverFailure(err.to_string());
                }
            };

            progress.iteration += 1;
            progress.pupil_diff = report.pupil_diff;
            progress.mse_diff = report.mse_diff;
            self.record(ConvergenceSample {
                iteration: progress.iteration,
                pupil_diff: report.pupil_diff,
                mse_diff: report.mse_diff,
            });
            self.publisher.progress(progress.clone());
            debug!(
                run_id = %self.id,
                iteration = progress.iteration,
                pupil_diff = report.pupil_diff,
                mse_diff = report.mse_diff,
                "Iteration completed"
            );

            let observation = IterationObservation {
                pupil_diff: report.pupil_diff,
                mse_diff: report.mse_diff,
                iteration: progress.iteration,
                cancelled: self.cancel.is_cancelled(),
            };
            if let Some(reason) = self.policy.evaluate(&observation) {
                break reason;
            }
        };

        let result = self.conclude(&progress, reason);
        info!(
            run_id = %self.id,
            iteration = result.progress.iteration,
            status = %result.progress.status_summary(),
            "Phase retrieval stopped"
        );
        self.publisher.finish(result);
    }

    fn record(&self, sample: ConvergenceSample) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sample);
    }

    fn conclude(&mut self, progress: &ProgressState, reason: TerminationReason) -> RunResult {
        let history = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if matches!(reason, TerminationReason::SolverFailure(_)) {
            return RunResult {
                progress: progress.stopped(reason),
                coefficients: Vec::new(),
                pupil_phase: None,
                history,
            };
        }

        match self.solver.finalize(self.zernike_terms) {
            Ok(coefficients) => RunResult {
                progress: progress.stopped(reason),
                coefficients,
                pupil_phase: self.solver.pupil_phase(),
                history,
            },
            Err(err) => {
                warn!(run_id = %self.id, "Polynomial fit failed: {err}");
                RunResult {
                    progress: progress.stopped(TerminationReason::SolverFailure(err.to_string())),
                    coefficients: Vec::new(),
                    pupil_phase: None,
                    history,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::SolverError;
    use crate::domain::models::{ImageSize, SolverParameters};
    use crate::domain::ports::StepReport;
    use std::time::Duration;

    struct Decaying {
        diff: f64,
    }

    impl PhaseSolver for Decaying {
        fn step(&mut self) -> Result<StepReport, SolverError> {
            self.diff /= 10.0;
            Ok(StepReport {
                pupil_diff: self.diff,
                mse_diff: 1.0,
            })
        }

        fn finalize(&mut self, max_terms: usize) -> Result<Vec<f64>, SolverError> {
            Ok(vec![0.1; max_terms])
        }
    }

    struct DecayingFactory;

    impl SolverFactory for DecayingFactory {
        fn prepare(
            &self,
            _params: &SolverParameters,
            _stack: PixelStack,
        ) -> Result<Box<dyn PhaseSolver>, SolverError> {
            Ok(Box::new(Decaying { diff: 1.0 }))
        }
    }

    fn params() -> FitParameters {
        FitParameters {
            emission_wavelength: Some(520),
            numerical_aperture: Some(1.4),
            refractive_index: Some(1.518),
            xy_resolution: Some(52),
            z_resolution: Some(200),
            max_iterations: Some(100),
            pupil_tolerance: Some(1e-4),
            mse_tolerance: Some(1e-6),
            phase_tolerance: Some(0.5),
            image_size: Some(ImageSize { xy: 2, z: 1 }),
        }
    }

    #[tokio::test]
    async fn test_run_converges_on_pupil() {
        let coordinator = RunCoordinator::new(Arc::new(DecayingFactory), Handle::current(), 15);
        let handle = coordinator.start(&params(), PixelStack::zeros(1, 2, 2)).unwrap();

        let status = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap();

        let RunStatus::Completed(result) = status else {
            panic!("expected completion, got {status:?}");
        };
        // 1e-5 is the first value below 1e-4
        assert_eq!(result.progress.iteration, 5);
        assert_eq!(result.progress.reason(), Some(&TerminationReason::PupilConverged));
        assert!(result.progress.finished);
        assert_eq!(result.coefficients.len(), 15);
        assert_eq!(result.history.len(), 5);
        assert!(!coordinator.is_active());
    }

    #[tokio::test]
    async fn test_invalid_parameters_never_spawn() {
        let coordinator = RunCoordinator::new(Arc::new(DecayingFactory), Handle::current(), 15);
        let params = FitParameters {
            refractive_index: None,
            ..params()
        };
        let err = coordinator
            .start(&params, PixelStack::zeros(1, 2, 2))
            .unwrap_err();
        assert!(matches!(err, RunError::Validation(_)));
        assert!(coordinator.active_run().is_none());
    }

    #[test]
    fn test_status_from_result() {
        let result = |reason| RunResult {
            progress: ProgressState::started(3).stopped(reason),
            coefficients: Vec::new(),
            pupil_phase: None,
            history: Vec::new(),
        };
        assert!(matches!(
            RunStatus::from(result(TerminationReason::Cancelled)),
            RunStatus::Cancelled(_)
        ));
        assert!(matches!(
            RunStatus::from(result(TerminationReason::SolverFailure("x".into()))),
            RunStatus::Failed(_)
        ));
        assert!(matches!(
            RunStatus::from(result(TerminationReason::MaxIterations)),
            RunStatus::Completed(_)
        ));
    }
}
