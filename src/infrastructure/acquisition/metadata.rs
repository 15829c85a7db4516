//! Normalization of microscope image metadata into fit parameters.

use serde::{Deserialize, Serialize};

use crate::domain::error::AcquisitionError;

/// Physical and pixel dimensions of the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelsMetadata {
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,
    #[serde(default = "one")]
    pub size_c: usize,
    #[serde(default = "one")]
    pub size_t: usize,
    pub physical_size_x: f64,
    pub physical_size_x_unit: String,
    pub physical_size_y: f64,
    pub physical_size_y_unit: String,
    pub physical_size_z: f64,
    pub physical_size_z_unit: String,
}

const fn one() -> usize {
    1
}

/// Objective description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveMetadata {
    pub lens_na: f64,
    #[serde(default)]
    pub immersion: Option<String>,
}

/// Metadata as recorded with the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub pixels: PixelsMetadata,
    pub objective: ObjectiveMetadata,
    /// Refractive index from the per-image objective settings
    #[serde(default)]
    pub refractive_index: Option<f64>,
}

/// Metadata converted to the units the fit works in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedMetadata {
    pub pixel_size_xy: u32,
    pub pixel_size_z: u32,
    pub image_size_xy: usize,
    pub image_size_z: usize,
    pub numerical_aperture: f64,
    pub refractive_index: Option<f64>,
}

impl ImageMetadata {
    pub fn normalize(&self) -> Result<NormalizedMetadata, AcquisitionError> {
        let pixels = &self.pixels;

        let size_x = to_nanometers(pixels.physical_size_x, &pixels.physical_size_x_unit)?;
        let size_y = to_nanometers(pixels.physical_size_y, &pixels.physical_size_y_unit)?;
        if size_x != size_y {
            return Err(invalid("Identical pixel size required for X and Y"));
        }
        let size_z = to_nanometers(pixels.physical_size_z, &pixels.physical_size_z_unit)?;

        if pixels.size_c != 1 || pixels.size_t != 1 {
            return Err(invalid(
                "Only single channel images and no time series are supported",
            ));
        }
        if pixels.size_x != pixels.size_y {
            return Err(invalid(
                "Images with equal pixel numbers for X and Y are required",
            ));
        }

        let refractive_index = self.refractive_index.or_else(|| {
            self.objective
                .immersion
                .as_deref()
                .and_then(immersion_refractive_index)
        });

        Ok(NormalizedMetadata {
            pixel_size_xy: truncate_nm(size_x),
            pixel_size_z: truncate_nm(size_z),
            image_size_xy: pixels.size_x,
            image_size_z: pixels.size_z,
            numerical_aperture: round_numerical_aperture(self.objective.lens_na),
            refractive_index,
        })
    }
}

/// Convert a physical size to nm; micrometre spellings are scaled by 1000
pub fn to_nanometers(value: f64, unit: &str) -> Result<f64, AcquisitionError> {
    match unit {
        "nm" => Ok(value),
        "um" | "µm" | "μm" | "micron" => Ok(value * 1000.0),
        other => Err(invalid(&format!(
            "Unit of pixel size not recognized: {other} (must be um, µm, micron or nm)"
        ))),
    }
}

fn truncate_nm(value: f64) -> u32 {
    // saturating cast: negative sizes become 0 and fail parameter validation
    value.trunc() as u32
}

/// Three decimals for immersion objectives (NA >= 1), two otherwise
pub fn round_numerical_aperture(na: f64) -> f64 {
    let scale = if na >= 1.0 { 1000.0 } else { 100.0 };
    (na * scale).round() / scale
}

pub fn immersion_refractive_index(immersion: &str) -> Option<f64> {
    match immersion.to_lowercase().as_str() {
        "oil" => Some(1.518),
        "glycerol" => Some(1.472),
        "water" => Some(1.333),
        "air" => Some(1.0),
        _ => None,
    }
}

fn invalid(message: &str) -> AcquisitionError {
    AcquisitionError::InvalidMetadata(message.to_string())
}
