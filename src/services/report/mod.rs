//! Report emitters
//!
//! Two independent serializers over the same inputs:
//! - `workbook`: `.xlsx` sheet with a fixed cell map
//! - `page`: single-page PDF with a fixed coordinate layout
//!
//! Both only read their inputs.

pub mod fonts;
pub mod page;
pub mod workbook;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

pub use page::{status_block, DrawOp, PageLayout, Rgb};
pub use workbook::{Cell, CellStyle, CellValue, SheetLayout, CATALOG_FIRST_ROW, SHEET_NAME};

use crate::domain::error::ReportError;
use crate::domain::models::{
    ArtifactKind, FitParameters, ImageArtifactStore, ProgressState, ZernikeCatalog,
};

/// Snapshot handed to both emitters
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    /// Path of the analysed PSF file
    pub source: &'a Path,
    pub parameters: &'a FitParameters,
    pub progress: &'a ProgressState,
    pub catalog: &'a ZernikeCatalog,
    pub artifacts: &'a ImageArtifactStore,
    pub generated_at: DateTime<Local>,
}

/// Output file names derived from the PSF file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub workbook: PathBuf,
    pub pdf: PathBuf,
    pub fit_image: PathBuf,
    pub decomposition_image: PathBuf,
}

impl ReportPaths {
    /// Paths next to `source`, or inside `output_dir` when given
    pub fn for_source(source: &Path, output_dir: Option<&Path>) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "psf".to_string());
        let dir = output_dir
            .map(Path::to_path_buf)
            .or_else(|| source.parent().map(Path::to_path_buf))
            .unwrap_or_default();

        Self {
            workbook: dir.join(format!("{stem}_zd_results.xlsx")),
            pdf: dir.join(format!("{stem}_report.pdf")),
            fit_image: dir.join(format!("{stem}_pr_results.png")),
            decomposition_image: dir.join(format!("{stem}_zd_results.png")),
        }
    }
}

pub struct ReportEmitter;

impl ReportEmitter {
    pub fn write_workbook(ctx: &ReportContext<'_>, path: &Path) -> Result<(), ReportError> {
        SheetLayout::build(ctx).save(path)?;
        info!(path = %path.display(), "Wrote Zernike decomposition workbook");
        Ok(())
    }

    pub fn write_pdf(ctx: &ReportContext<'_>, path: &Path) -> Result<(), ReportError> {
        PageLayout::build(ctx).save(ctx, path)?;
        info!(path = %path.display(), "Wrote PDF report");
        Ok(())
    }

    /// Write one stored artifact as a PNG file
    pub fn write_artifact(
        artifacts: &ImageArtifactStore,
        kind: ArtifactKind,
        path: &Path,
    ) -> Result<(), ReportError> {
        let bytes = artifacts
            .get(kind)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ReportError::MissingArtifact(kind.to_string()))?;
        std::fs::write(path, &bytes[..]).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), artifact = %kind, "Wrote result image");
        Ok(())
    }
}
