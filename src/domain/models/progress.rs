//! Progress of a phase-retrieval run as seen by pollers and reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TerminationReason {
    Cancelled,
    PupilConverged,
    MseConverged,
    MaxIterations,
    SolverFailure(String),
}

impl TerminationReason {
    pub const fn is_convergence(&self) -> bool {
        matches!(self, Self::PupilConverged | Self::MseConverged)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("Phase retrieval cancelled by user."),
            Self::PupilConverged => f.write_str("Pupil function converged."),
            Self::MseConverged => f.write_str("Mean-square error converged."),
            Self::MaxIterations => f.write_str("Maximum iterations reached."),
            Self::SolverFailure(message) => write!(f, "Phase retrieval failed: {message}."),
        }
    }
}

/// Structured status shown next to the iteration counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusMessage {
    NotStarted,
    Running { max_iterations: u32 },
    Stopped { reason: TerminationReason, iteration: u32 },
}

/// Snapshot of a run's progress.
///
/// Published as a whole by the run loop, so a reader never sees a new
/// iteration paired with stale differences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub iteration: u32,
    pub pupil_diff: f64,
    pub mse_diff: f64,
    pub status: StatusMessage,
    pub finished: bool,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            iteration: 0,
            pupil_diff: 0.0,
            mse_diff: 0.0,
            status: StatusMessage::NotStarted,
            finished: false,
        }
    }
}

impl ProgressState {
    /// State published before the first solver step
    pub const fn started(max_iterations: u32) -> Self {
        Self {
            iteration: 0,
            pupil_diff: 0.0,
            mse_diff: 0.0,
            status: StatusMessage::Running { max_iterations },
            finished: false,
        }
    }

    /// Terminal copy of this state; `finished` is set here and nowhere else
    pub fn stopped(&self, reason: TerminationReason) -> Self {
        Self {
            status: StatusMessage::Stopped {
                reason,
                iteration: self.iteration,
            },
            finished: true,
            ..self.clone()
        }
    }

    pub fn reason(&self) -> Option<&TerminationReason> {
        match &self.status {
            StatusMessage::Stopped { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Human-readable status: one line once stopped, two while running
    pub fn status_lines(&self) -> Vec<String> {
        match &self.status {
            StatusMessage::NotStarted => vec!["Phase retrieval not started yet".to_string()],
            StatusMessage::Running { .. } => vec![
                "Phase retrieval running...".to_string(),
                format!(
                    "Pupil diff {}, MSE diff {}",
                    scientific(self.pupil_diff),
                    scientific(self.mse_diff)
                ),
            ],
            StatusMessage::Stopped { reason, .. } => vec![reason.to_string()],
        }
    }

    /// Status lines joined by a space
    pub fn status_summary(&self) -> String {
        self.status_lines().join(" ")
    }
}

/// Format as `1.23E-04`
pub fn scientific(value: f64) -> String {
    let raw = format!("{value:.2E}");
    match raw.split_once('E') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = exponent
                .strip_prefix('-')
                .map_or(("+", exponent), |d| ("-", d));
            format!("{mantissa}E{sign}{digits:0>2}")
        }
        None => raw,
    }
}
