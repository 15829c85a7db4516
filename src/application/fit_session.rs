//! FitSession - one user's working state across runs
//!
//! Ties together the parameters, the loaded PSF, the coordinator, the
//! Zernike catalog and the image artifacts, and gates report generation on
//! the run being finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::application::run_coordinator::{RunCoordinator, RunHandle, RunResult, RunStatus};
use crate::domain::error::{AcquisitionError, ReportError, RunError};
use crate::domain::models::{
    ArtifactKind, Config, FitParameters, ImageArtifactStore, ImageSize, PixelStack,
    ProgressState, ZernikeCatalog,
};
use crate::domain::ports::{Plot, PlotRenderer};
use crate::infrastructure::acquisition::AcquisitionBridge;
use crate::services::{ReportContext, ReportEmitter, ReportPaths, ResultClassifier};

pub struct FitSession {
    parameters: FitParameters,
    source: Option<PathBuf>,
    stack: Option<PixelStack>,
    catalog: ZernikeCatalog,
    progress: ProgressState,
    artifacts: Arc<ImageArtifactStore>,
    coordinator: RunCoordinator,
    acquisition: AcquisitionBridge,
    renderer: Arc<dyn PlotRenderer>,
    current: Option<RunHandle>,
    output_dir: Option<PathBuf>,
}

impl FitSession {
    pub fn new(
        config: &Config,
        coordinator: RunCoordinator,
        acquisition: AcquisitionBridge,
        renderer: Arc<dyn PlotRenderer>,
    ) -> Self {
        let fit = &config.fit;
        let parameters = FitParameters {
            emission_wavelength: fit.emission_wavelength_nm,
            max_iterations: Some(fit.max_iterations),
            pupil_tolerance: Some(fit.pupil_tolerance),
            mse_tolerance: Some(fit.mse_tolerance),
            phase_tolerance: Some(fit.phase_tolerance),
            ..FitParameters::default()
        };

        Self {
            parameters,
            source: None,
            stack: None,
            catalog: ResultClassifier::initialize_catalog(),
            progress: ProgressState::default(),
            artifacts: Arc::new(ImageArtifactStore::new()),
            coordinator,
            acquisition,
            renderer,
            current: None,
            output_dir: config.output_dir.clone(),
        }
    }

    pub const fn parameters(&self) -> &FitParameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut FitParameters {
        &mut self.parameters
    }

    pub const fn catalog(&self) -> &ZernikeCatalog {
        &self.catalog
    }

    pub const fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn artifacts(&self) -> &ImageArtifactStore {
        &self.artifacts
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn set_output_dir(&mut self, dir: Option<PathBuf>) {
        self.output_dir = dir;
    }

    pub fn is_active(&self) -> bool {
        self.coordinator.is_active()
    }

    /// Load a PSF file and take over its acquisition parameters.
    ///
    /// Results of a previous run are discarded; the emission wavelength and
    /// the fit settings are kept.
    pub fn load_psf(&mut self, path: &Path) -> Result<(), AcquisitionError> {
        let psf = self.acquisition.acquire(path)?;

        self.parameters.numerical_aperture = Some(psf.numerical_aperture);
        self.parameters.refractive_index = psf.refractive_index;
        self.parameters.xy_resolution = Some(psf.pixel_size_xy);
        self.parameters.z_resolution = Some(psf.pixel_size_z);
        self.parameters.image_size = Some(ImageSize {
            xy: psf.image_size_xy,
            z: psf.image_size_z,
        });
        if psf.refractive_index.is_none() {
            warn!(path = %path.display(), "No refractive index or known immersion in metadata");
        }

        let (z, y, _) = psf.stack.shape();
        self.render(ArtifactKind::PsfXy, psf.stack.xy_plane(z / 2).map(Plot::Intensity));
        self.render(ArtifactKind::PsfXz, psf.stack.xz_plane(y / 2).map(Plot::Intensity));

        self.stack = Some(psf.stack);
        self.source = Some(path.to_path_buf());
        self.reset_results();
        Ok(())
    }

    /// Start a run on the loaded PSF
    pub fn start(&mut self) -> Result<RunHandle, RunError> {
        let stack = self
            .stack
            .clone()
            .unwrap_or_else(|| PixelStack::zeros(0, 0, 0));
        let handle = self.coordinator.start(&self.parameters, stack)?;

        self.reset_results();
        self.progress = handle.progress();
        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Latest status of the current run
    pub fn poll(&mut self) -> Option<RunStatus> {
        let status = self.current.as_ref()?.poll();
        self.progress = status.progress().clone();
        Some(status)
    }

    pub fn cancel(&self) {
        if let Some(handle) = &self.current {
            handle.cancel();
        }
    }

    /// Redraw the convergence plot from the history so far
    pub fn render_progress(&self, handle: &RunHandle) {
        let history = handle.history();
        let plot = (!history.is_empty()).then(|| Plot::Convergence {
            pupil_diffs: history.iter().map(|s| s.pupil_diff).collect(),
            mse_diffs: history.iter().map(|s| s.mse_diff).collect(),
            max_iterations: handle.max_iterations(),
        });
        self.render(ArtifactKind::Convergence, plot);
    }

    /// Take over a finished run: classify its coefficients and redraw the
    /// result plots
    pub fn complete(&mut self, result: RunResult) {
        let tolerance = self.parameters.phase_tolerance.unwrap_or_default();
        self.catalog = ResultClassifier::classify(
            &result.coefficients,
            &ResultClassifier::initialize_catalog(),
            tolerance,
        );
        self.progress = result.progress;

        self.render(ArtifactKind::FitResult, result.pupil_phase.map(Plot::Intensity));
        let convergence = (!result.history.is_empty()).then(|| Plot::Convergence {
            pupil_diffs: result.history.iter().map(|s| s.pupil_diff).collect(),
            mse_diffs: result.history.iter().map(|s| s.mse_diff).collect(),
            max_iterations: self.parameters.max_iterations.unwrap_or_default(),
        });
        self.render(ArtifactKind::Convergence, convergence);
        self.render(
            ArtifactKind::Decomposition,
            Some(Plot::Coefficients {
                values: self.catalog.values(),
                salient: self.catalog.entries().iter().map(|e| e.is_salient()).collect(),
                tolerance,
            }),
        );

        info!(
            status = %self.progress.status_summary(),
            iteration = self.progress.iteration,
            coefficients = result.coefficients.len(),
            "Fit results classified"
        );
    }

    /// Output paths for the loaded PSF
    pub fn report_paths(&self) -> Result<ReportPaths, ReportError> {
        let source = self.source.as_deref().ok_or(ReportError::NoSource)?;
        Ok(ReportPaths::for_source(source, self.output_dir.as_deref()))
    }

    pub fn save_workbook(&self) -> Result<PathBuf, ReportError> {
        self.ensure_idle()?;
        let path = self.report_paths()?.workbook;
        ReportEmitter::write_workbook(&self.report_context()?, &path)?;
        Ok(path)
    }

    pub fn save_pdf(&self) -> Result<PathBuf, ReportError> {
        self.ensure_idle()?;
        let path = self.report_paths()?.pdf;
        ReportEmitter::write_pdf(&self.report_context()?, &path)?;
        Ok(path)
    }

    /// Write the fit result and decomposition plots that exist
    pub fn save_result_images(&self) -> Result<Vec<PathBuf>, ReportError> {
        self.ensure_idle()?;
        let paths = self.report_paths()?;
        let mut written = Vec::new();
        for (kind, path) in [
            (ArtifactKind::FitResult, paths.fit_image),
            (ArtifactKind::Decomposition, paths.decomposition_image),
        ] {
            if !self.artifacts.contains(kind) {
                warn!(artifact = %kind, "No image to save");
                continue;
            }
            ReportEmitter::write_artifact(&self.artifacts, kind, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    fn ensure_idle(&self) -> Result<(), ReportError> {
        if self.is_active() {
            return Err(ReportError::RunActive);
        }
        Ok(())
    }

    fn report_context(&self) -> Result<ReportContext<'_>, ReportError> {
        Ok(ReportContext {
            source: self.source.as_deref().ok_or(ReportError::NoSource)?,
            parameters: &self.parameters,
            progress: &self.progress,
            catalog: &self.catalog,
            artifacts: &self.artifacts,
            generated_at: Local::now(),
        })
    }

    fn reset_results(&mut self) {
        self.catalog.reset();
        self.progress = ProgressState::default();
        for kind in ArtifactKind::RUN_OUTPUTS {
            self.artifacts.clear(kind);
        }
    }

    /// Render `plot` into the `kind` slot; failures only cost the picture
    fn render(&self, kind: ArtifactKind, plot: Option<Plot>) {
        let Some(plot) = plot else {
            return;
        };
        match self.renderer.render(&plot) {
            Ok(bytes) => self.artifacts.replace(kind, bytes),
            Err(err) => warn!(artifact = %kind, "Plot rendering failed: {err}"),
        }
    }
}
