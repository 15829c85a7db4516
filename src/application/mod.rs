pub mod convergence;
pub mod fit_session;
pub mod run_coordinator;
pub mod run_monitor;

pub use convergence::{ConvergencePolicy, IterationObservation};
pub use fit_session::FitSession;
pub use run_coordinator::{
    ConvergenceSample, RunCoordinator, RunHandle, RunResult, RunStatus,
};
pub use run_monitor::{MonitorEvent, RunMonitor};
