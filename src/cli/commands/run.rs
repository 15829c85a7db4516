use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::application::{FitSession, MonitorEvent, RunCoordinator, RunMonitor, RunStatus};
use crate::cli::output::progress::{create_progress_bar, hidden_progress_bar, ProgressBarExt};
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::RunArgs;
use crate::domain::models::{CatalogEntry, Config, FitParameters};
use crate::infrastructure::acquisition::{AcquisitionBridge, RecordedAcquisition};
use crate::infrastructure::render::RasterPlotRenderer;
use crate::infrastructure::solver::{FitTrace, ReplaySolverFactory};

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub run_id: String,
    pub outcome: &'static str,
    pub iteration: u32,
    pub max_iterations: u32,
    pub status: Vec<String>,
    pub coefficients: Vec<CatalogEntry>,
    pub written: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut out = format!(
            "Run {} {} ({}/{} iterations)\n",
            self.run_id, self.outcome, self.iteration, self.max_iterations
        );
        for line in &self.status {
            out.push_str(&format!("  {line}\n"));
        }
        out.push('\n');
        out.push_str(&TableFormatter::new().format_catalog(&self.coefficients, true));
        out.push('\n');

        if !self.written.is_empty() {
            out.push_str("\nWritten:\n");
            for path in &self.written {
                out.push_str(&format!("  {}\n", path.display()));
            }
        }
        if !self.errors.is_empty() {
            out.push_str("\nNot written:\n");
            for err in &self.errors {
                out.push_str(&format!("  {err}\n"));
            }
        }
        out
    }
}

/// Command-line values take precedence over configured defaults and the
/// acquisition metadata
pub fn apply_overrides(args: &RunArgs, parameters: &mut FitParameters) {
    if let Some(wavelength) = args.wavelength {
        parameters.emission_wavelength = Some(wavelength);
    }
    if let Some(max_iterations) = args.max_iterations {
        parameters.max_iterations = Some(max_iterations);
    }
    if let Some(tolerance) = args.pupil_tolerance {
        parameters.pupil_tolerance = Some(tolerance);
    }
    if let Some(tolerance) = args.mse_tolerance {
        parameters.mse_tolerance = Some(tolerance);
    }
    if let Some(tolerance) = args.phase_tolerance {
        parameters.phase_tolerance = Some(tolerance);
    }
}

const fn outcome(status: &RunStatus) -> &'static str {
    match status {
        RunStatus::Running(_) => "running",
        RunStatus::Completed(_) => "completed",
        RunStatus::Cancelled(_) => "cancelled",
        RunStatus::Failed(_) => "failed",
    }
}

pub async fn execute(args: RunArgs, config: Config, json: bool) -> Result<()> {
    let trace = FitTrace::load(&args.trace)
        .with_context(|| format!("Failed to load fit trace {}", args.trace.display()))?;

    let coordinator = RunCoordinator::new(
        Arc::new(ReplaySolverFactory::new(trace)),
        Handle::current(),
        config.fit.zernike_terms,
    );
    let bridge = AcquisitionBridge::start(Arc::new(RecordedAcquisition::new()));
    let mut session = FitSession::new(
        &config,
        coordinator,
        bridge,
        Arc::new(RasterPlotRenderer::new()),
    );
    if args.output_dir.is_some() {
        session.set_output_dir(args.output_dir.clone());
    }

    session
        .load_psf(&args.record)
        .with_context(|| format!("Failed to load PSF {}", args.record.display()))?;
    apply_overrides(&args, session.parameters_mut());

    let handle = session.start()?;
    info!(run_id = %handle.id(), record = %args.record.display(), "Phase retrieval started");

    let monitor = RunMonitor::from(&config.monitor);
    let bar = if json {
        hidden_progress_bar()
    } else {
        create_progress_bar(u64::from(handle.max_iterations()))
    };

    let status = {
        let session = &session;
        let watch = monitor.watch(&handle, |event| match event {
            MonitorEvent::Tick(progress) => bar.show_progress(progress),
            MonitorEvent::Render(_) => session.render_progress(&handle),
        });

        tokio::select! {
            status = watch => status,
            _ = tokio::signal::ctrl_c() => {
                warn!(run_id = %handle.id(), "Interrupted, cancelling run");
                handle.cancel();
                handle.wait().await
            }
        }
    };

    let run_outcome = outcome(&status);
    let result = status
        .into_result()
        .context("Run ended without a result")?;
    bar.finish_with_status(&result.progress);
    session.complete(result);

    let mut written = Vec::new();
    let mut errors = Vec::new();
    for saved in [session.save_workbook(), session.save_pdf()] {
        match saved {
            Ok(path) => written.push(path),
            Err(err) => {
                error!("Report not written: {err}");
                errors.push(err.to_string());
            }
        }
    }
    match session.save_result_images() {
        Ok(paths) => written.extend(paths),
        Err(err) => {
            error!("Result images not written: {err}");
            errors.push(err.to_string());
        }
    }

    let progress = session.progress();
    let out = RunOutput {
        run_id: handle.id().to_string(),
        outcome: run_outcome,
        iteration: progress.iteration,
        max_iterations: handle.max_iterations(),
        status: progress.status_lines(),
        coefficients: session.catalog().entries().to_vec(),
        written,
        errors,
    };
    output(&out, json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            record: PathBuf::from("psf.json"),
            trace: PathBuf::from("trace.json"),
            wavelength: None,
            max_iterations: Some(40),
            pupil_tolerance: None,
            mse_tolerance: None,
            phase_tolerance: Some(0.25),
            output_dir: None,
        }
    }

    #[test]
    fn test_overrides_only_touch_given_values() {
        let mut parameters = FitParameters {
            emission_wavelength: Some(510),
            max_iterations: Some(100),
            mse_tolerance: Some(1e-6),
            ..FitParameters::default()
        };
        apply_overrides(&args(), &mut parameters);

        assert_eq!(parameters.emission_wavelength, Some(510));
        assert_eq!(parameters.max_iterations, Some(40));
        assert_eq!(parameters.mse_tolerance, Some(1e-6));
        assert_eq!(parameters.phase_tolerance, Some(0.25));
    }

    #[test]
    fn test_human_output_lists_failures() {
        let out = RunOutput {
            run_id: "r1".to_string(),
            outcome: "failed",
            iteration: 3,
            max_iterations: 10,
            status: vec!["Phase retrieval failed".to_string()],
            coefficients: Vec::new(),
            written: vec![PathBuf::from("/out/psf_zd_results.xlsx")],
            errors: vec!["disk full".to_string()],
        };
        let human = out.to_human();
        assert!(human.starts_with("Run r1 failed (3/10 iterations)"));
        assert!(human.contains("/out/psf_zd_results.xlsx"));
        assert!(human.contains("Not written:\n  disk full"));
    }
}
