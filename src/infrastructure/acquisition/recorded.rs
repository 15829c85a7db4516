//! Acquisition from JSON records (metadata plus the raw z-stack).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::metadata::ImageMetadata;
use crate::domain::error::AcquisitionError;
use crate::domain::models::PixelStack;
use crate::domain::ports::{AcquiredPsf, AcquisitionService};

/// On-disk layout of an acquisition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionRecord {
    pub metadata: ImageMetadata,
    /// Planes indexed `[z][y][x]`
    pub planes: Vec<Vec<Vec<u16>>>,
}

impl AcquisitionRecord {
    /// Check the metadata and flatten the planes into a stack
    pub fn into_psf(self) -> Result<AcquiredPsf, AcquisitionError> {
        let normalized = self.metadata.normalize()?;
        let (z, xy) = (normalized.image_size_z, normalized.image_size_xy);

        if self.planes.len() != z {
            return Err(AcquisitionError::InvalidMetadata(format!(
                "expected {z} planes, found {}",
                self.planes.len()
            )));
        }

        let mut data = Vec::with_capacity(z * xy * xy);
        for (index, plane) in self.planes.into_iter().enumerate() {
            if plane.len() != xy || plane.iter().any(|row| row.len() != xy) {
                return Err(AcquisitionError::InvalidMetadata(format!(
                    "plane {index} is not {xy} x {xy} pixels"
                )));
            }
            data.extend(plane.into_iter().flatten());
        }

        let stack = PixelStack::new(z, xy, xy, data).ok_or_else(|| {
            AcquisitionError::InvalidMetadata("PSF data array is not shaped correctly".to_string())
        })?;

        Ok(AcquiredPsf {
            numerical_aperture: normalized.numerical_aperture,
            refractive_index: normalized.refractive_index,
            pixel_size_xy: normalized.pixel_size_xy,
            pixel_size_z: normalized.pixel_size_z,
            image_size_xy: xy,
            image_size_z: z,
            stack,
        })
    }
}

/// Reads `.json` acquisition records
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedAcquisition;

impl RecordedAcquisition {
    pub const EXTENSION: &'static str = "json";

    pub const fn new() -> Self {
        Self
    }
}

impl AcquisitionService for RecordedAcquisition {
    fn acquire(&self, path: &Path) -> Result<AcquiredPsf, AcquisitionError> {
        let supported = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(Self::EXTENSION));
        if !supported {
            return Err(AcquisitionError::UnsupportedFormat(path.to_path_buf()));
        }

        let raw = std::fs::read_to_string(path).map_err(|source| AcquisitionError::InvalidPath {
            path: path.to_path_buf(),
            source,
        })?;
        let record: AcquisitionRecord = serde_json::from_str(&raw)
            .map_err(|err| AcquisitionError::InvalidMetadata(err.to_string()))?;
        let psf = record.into_psf()?;

        info!(
            path = %path.display(),
            image_size_xy = psf.image_size_xy,
            image_size_z = psf.image_size_z,
            pixel_size_xy = psf.pixel_size_xy,
            pixel_size_z = psf.pixel_size_z,
            "Loaded PSF"
        );
        Ok(psf)
    }
}
