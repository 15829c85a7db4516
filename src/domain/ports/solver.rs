use crate::domain::error::SolverError;
use crate::domain::models::{PixelStack, Plane, SolverParameters};

/// Differences reported by one solver iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Difference between successive pupil estimates
    pub pupil_diff: f64,

    /// Relative difference between successive mean-square errors
    pub mse_diff: f64,
}

/// Port for the iterative phase-retrieval solver
///
/// The solver owns its internal state; each `step` advances it by one
/// indivisible iteration. Implementations run on a blocking worker thread,
/// never on the async executor.
///
/// # Examples
///
/// ```no_run
/// use pupilfit::domain::ports::PhaseSolver;
///
/// fn drive(solver: &mut dyn PhaseSolver) -> Result<Vec<f64>, pupilfit::domain::error::SolverError> {
///     for _ in 0..10 {
///         let report = solver.step()?;
///         if report.pupil_diff < 1e-8 {
///             break;
///         }
///     }
///     solver.finalize(120)
/// }
/// ```
pub trait PhaseSolver: Send {
    /// Run one iteration
    fn step(&mut self) -> Result<StepReport, SolverError>;

    /// Fit the retrieved phase to `max_terms` polynomials, in Noll order
    fn finalize(&mut self, max_terms: usize) -> Result<Vec<f64>, SolverError>;

    /// Current pupil phase estimate, when the solver can expose one
    fn pupil_phase(&self) -> Option<Plane> {
        None
    }
}

/// Port that prepares a solver for a validated parameter set
pub trait SolverFactory: Send + Sync {
    fn prepare(
        &self,
        params: &SolverParameters,
        stack: PixelStack,
    ) -> Result<Box<dyn PhaseSolver>, SolverError>;
}
