use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ValidationError, ValidationIssue};
use crate::domain::models::stack::PixelStack;

/// Physical unit attached to a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Dimensionless,
    Nanometer,
    Wavelength,
}

impl Unit {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Dimensionless => "",
            Self::Nanometer => "nm",
            Self::Wavelength => "λ",
        }
    }
}

/// Identifies one field of [`FitParameters`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    EmissionWavelength,
    NumericalAperture,
    RefractiveIndex,
    XyResolution,
    ZResolution,
    MaxIterations,
    PupilTolerance,
    MseTolerance,
    PhaseTolerance,
}

impl ParameterKey {
    /// Acquisition (PSF) parameters, in report order
    pub const PSF: [Self; 5] = [
        Self::EmissionWavelength,
        Self::NumericalAperture,
        Self::RefractiveIndex,
        Self::XyResolution,
        Self::ZResolution,
    ];

    /// Parameters handed to the solver loop, in report order
    pub const FIT: [Self; 3] = [Self::MaxIterations, Self::PupilTolerance, Self::MseTolerance];

    /// Every parameter in legend order
    pub const ALL: [Self; 9] = [
        Self::EmissionWavelength,
        Self::NumericalAperture,
        Self::RefractiveIndex,
        Self::XyResolution,
        Self::ZResolution,
        Self::MaxIterations,
        Self::PupilTolerance,
        Self::MseTolerance,
        Self::PhaseTolerance,
    ];

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::EmissionWavelength => "Emission wavelength",
            Self::NumericalAperture => "Numerical aperture",
            Self::RefractiveIndex => "Refractive index",
            Self::XyResolution => "xy-Resolution",
            Self::ZResolution => "z-Resolution",
            Self::MaxIterations => "Maximum iterations",
            Self::PupilTolerance => "Minimal pupil function difference",
            Self::MseTolerance => "Minimal relative MSE difference",
            Self::PhaseTolerance => "Tolerable phase deviation",
        }
    }

    pub const fn unit(self) -> Unit {
        match self {
            Self::EmissionWavelength | Self::XyResolution | Self::ZResolution => Unit::Nanometer,
            Self::PhaseTolerance => Unit::Wavelength,
            _ => Unit::Dimensionless,
        }
    }

    /// Label with the unit appended, e.g. `Emission wavelength in nm`
    pub fn label_with_unit(self) -> String {
        match self.unit() {
            Unit::Dimensionless => self.display_name().to_string(),
            unit => format!("{} in {}", self.display_name(), unit.symbol()),
        }
    }
}

/// A parameter value as entered or acquired
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Integer(u32),
    Real(f64),
}

impl ParameterValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => f64::from(v),
            Self::Real(v) => v,
        }
    }

    fn is_positive(self) -> bool {
        match self {
            Self::Integer(v) => v > 0,
            Self::Real(v) => v > 0.0,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => f.write_str(&format_real(*v)),
        }
    }
}

/// Shortest round-trip rendering; tiny and huge magnitudes switch to `1e-08` notation.
fn format_real(value: f64) -> String {
    let magnitude = value.abs();
    if value != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let raw = format!("{value:e}");
        return match raw.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = exponent
                    .strip_prefix('-')
                    .map_or(("+", exponent), |d| ("-", d));
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => raw,
        };
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Image dimensions reported by the acquisition service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub xy: usize,
    pub z: usize,
}

/// PSF and fit parameters; every field may still be unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitParameters {
    pub emission_wavelength: Option<u32>,
    pub numerical_aperture: Option<f64>,
    pub refractive_index: Option<f64>,
    pub xy_resolution: Option<u32>,
    pub z_resolution: Option<u32>,
    pub max_iterations: Option<u32>,
    pub pupil_tolerance: Option<f64>,
    pub mse_tolerance: Option<f64>,
    pub phase_tolerance: Option<f64>,
    pub image_size: Option<ImageSize>,
}

impl FitParameters {
    pub fn value(&self, key: ParameterKey) -> Option<ParameterValue> {
        use ParameterValue::{Integer, Real};
        match key {
            ParameterKey::EmissionWavelength => self.emission_wavelength.map(Integer),
            ParameterKey::NumericalAperture => self.numerical_aperture.map(Real),
            ParameterKey::RefractiveIndex => self.refractive_index.map(Real),
            ParameterKey::XyResolution => self.xy_resolution.map(Integer),
            ParameterKey::ZResolution => self.z_resolution.map(Integer),
            ParameterKey::MaxIterations => self.max_iterations.map(Integer),
            ParameterKey::PupilTolerance => self.pupil_tolerance.map(Real),
            ParameterKey::MseTolerance => self.mse_tolerance.map(Real),
            ParameterKey::PhaseTolerance => self.phase_tolerance.map(Real),
        }
    }

    pub fn is_present(&self, key: ParameterKey) -> bool {
        self.value(key).is_some()
    }

    /// Ratio between z stepping and xy pixel size
    pub fn voxel_aspect(&self) -> Option<f64> {
        match (self.z_resolution, self.xy_resolution) {
            (Some(z), Some(xy)) if xy > 0 => Some(f64::from(z) / f64::from(xy)),
            _ => None,
        }
    }

    /// Check every solver-required field and the stack shape.
    ///
    /// All problems are collected; the phase tolerance is display-only and
    /// not required here.
    pub fn validate(&self, stack: &PixelStack) -> Result<SolverParameters, ValidationError> {
        let mut issues = Vec::new();
        for key in ParameterKey::PSF.iter().chain(ParameterKey::FIT.iter()) {
            match self.value(*key) {
                None => issues.push(ValidationIssue::Missing(*key)),
                Some(value) if !value.is_positive() => {
                    issues.push(ValidationIssue::NotPositive(*key));
                }
                Some(_) => {}
            }
        }

        match self.image_size {
            None => issues.push(ValidationIssue::MissingImageSize),
            Some(size) => {
                let expected = (size.z, size.xy, size.xy);
                if stack.shape() != expected {
                    issues.push(ValidationIssue::ShapeMismatch {
                        expected,
                        actual: stack.shape(),
                    });
                }
            }
        }

        match (
            self.emission_wavelength,
            self.numerical_aperture,
            self.refractive_index,
            self.xy_resolution,
            self.z_resolution,
            self.max_iterations,
            self.pupil_tolerance,
            self.mse_tolerance,
        ) {
            (Some(wl), Some(na), Some(ni), Some(res), Some(zres), Some(max), Some(pupil), Some(mse))
                if issues.is_empty() =>
            {
                Ok(SolverParameters {
                    emission_wavelength_nm: wl,
                    numerical_aperture: na,
                    refractive_index: ni,
                    xy_resolution_nm: res,
                    z_resolution_nm: zres,
                    max_iterations: max,
                    pupil_tolerance: pupil,
                    mse_tolerance: mse,
                })
            }
            _ => Err(ValidationError { issues }),
        }
    }
}

/// Fully populated parameter set accepted by the solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverParameters {
    pub emission_wavelength_nm: u32,
    pub numerical_aperture: f64,
    pub refractive_index: f64,
    pub xy_resolution_nm: u32,
    pub z_resolution_nm: u32,
    pub max_iterations: u32,
    pub pupil_tolerance: f64,
    pub mse_tolerance: f64,
}
