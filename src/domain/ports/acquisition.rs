use std::path::Path;

use crate::domain::error::AcquisitionError;
use crate::domain::models::PixelStack;

/// Acquisition parameters and pixel data read from a PSF file
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredPsf {
    pub numerical_aperture: f64,
    /// Unknown when the file names neither an index nor a known immersion medium
    pub refractive_index: Option<f64>,
    /// Lateral pixel size in nm
    pub pixel_size_xy: u32,
    /// Axial step in nm
    pub pixel_size_z: u32,
    pub image_size_xy: usize,
    pub image_size_z: usize,
    pub stack: PixelStack,
}

/// Port for the image/metadata acquisition service
///
/// Some services need a helper runtime for the lifetime of the process;
/// `shutdown` releases it and is called exactly once by the owning bridge.
pub trait AcquisitionService: Send + Sync {
    /// Read parameters and pixel data from `path`
    fn acquire(&self, path: &Path) -> Result<AcquiredPsf, AcquisitionError>;

    /// Release any process-wide resources held by the service
    fn shutdown(&self) {}
}
