//! Cadence-driven poller for a running fit.
//!
//! The coordinator never pushes updates; the monitor re-reads the latest
//! snapshot on a fixed interval and tells the caller when the intermediate
//! plots are due for re-rendering.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::application::run_coordinator::{RunHandle, RunStatus};
use crate::domain::models::{MonitorConfig, ProgressState};

/// What the monitor reports on each poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorEvent<'a> {
    /// Emitted on every poll
    Tick(&'a ProgressState),
    /// Emitted once per qualifying iteration, after its tick
    Render(&'a ProgressState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMonitor {
    poll_interval: Duration,
    render_every: u32,
}

impl RunMonitor {
    pub const fn new(poll_interval: Duration, render_every: u32) -> Self {
        Self {
            poll_interval,
            render_every,
        }
    }

    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Whether `iteration` should trigger a re-render given the last
    /// iteration that already did
    pub fn should_render(&self, iteration: u32, last_rendered: Option<u32>) -> bool {
        self.render_every != 0
            && iteration != 0
            && iteration % self.render_every == 0
            && last_rendered != Some(iteration)
    }

    /// Poll `handle` until it reaches a terminal status and return that status
    pub async fn watch<F>(&self, handle: &RunHandle, mut on_event: F) -> RunStatus
    where
        F: FnMut(MonitorEvent<'_>),
    {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_rendered = None;

        loop {
            ticker.tick().await;
            let status = handle.poll();
            let progress = status.progress();

            on_event(MonitorEvent::Tick(progress));
            if self.should_render(progress.iteration, last_rendered) {
                debug!(run_id = %handle.id(), iteration = progress.iteration, "Re-rendering intermediate plots");
                on_event(MonitorEvent::Render(progress));
                last_rendered = Some(progress.iteration);
            }

            if status.is_terminal() {
                return status;
            }
        }
    }
}

impl From<&MonitorConfig> for RunMonitor {
    fn from(config: &MonitorConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            config.render_every,
        )
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}
