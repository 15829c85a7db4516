use crate::domain::error::RenderError;
use crate::domain::models::Plane;

/// Data series handed to the raster renderer
#[derive(Debug, Clone, PartialEq)]
pub enum Plot {
    /// Grayscale intensity map (PSF sections, pupil phase)
    Intensity(Plane),

    /// Per-iteration pupil and MSE differences
    Convergence {
        pupil_diffs: Vec<f64>,
        mse_diffs: Vec<f64>,
        max_iterations: u32,
    },

    /// Named Zernike coefficients, salient ones highlighted
    Coefficients {
        values: Vec<f64>,
        salient: Vec<bool>,
        tolerance: f64,
    },
}

/// Port for plot rendering; returns an encoded PNG
pub trait PlotRenderer: Send + Sync {
    fn render(&self, plot: &Plot) -> Result<Vec<u8>, RenderError>;
}
