//! Progress bar for a running fit, using indicatif

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::domain::models::{scientific, ProgressState};

const PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";
const PROGRESS_CHARS: &str = "█▓▒░ ";

/// Progress bar over the iteration budget
pub fn create_progress_bar(max_iterations: u64) -> ProgressBar {
    let pb = ProgressBar::new(max_iterations);
    if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
        pb.set_style(style.progress_chars(PROGRESS_CHARS));
    }
    pb
}

/// A bar that draws nothing, for JSON output
pub fn hidden_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_draw_target(ProgressDrawTarget::hidden());
    pb
}

/// Extension trait mirroring run progress onto a bar
pub trait ProgressBarExt {
    fn show_progress(&self, progress: &ProgressState);
    fn finish_with_status(&self, progress: &ProgressState);
}

impl ProgressBarExt for ProgressBar {
    fn show_progress(&self, progress: &ProgressState) {
        self.set_position(u64::from(progress.iteration));
        if progress.iteration > 0 {
            self.set_message(format!(
                "pupil {} mse {}",
                scientific(progress.pupil_diff),
                scientific(progress.mse_diff)
            ));
        }
    }

    fn finish_with_status(&self, progress: &ProgressState) {
        self.set_position(u64::from(progress.iteration));
        self.abandon_with_message(progress.status_summary());
    }
}
