//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pupilfit")]
#[command(about = "Phase retrieval and Zernike decomposition reports for measured PSFs", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .pupilfit/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit a PSF and write the workbook, PDF report and result images
    Run(RunArgs),

    /// List the Zernike polynomials reported after a fit
    Catalog,

    /// Show the effective configuration
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Acquisition record of the PSF (.json)
    pub record: PathBuf,

    /// Recorded fit trace to replay
    #[arg(short, long)]
    pub trace: PathBuf,

    /// Central emission wavelength in nm
    #[arg(short, long)]
    pub wavelength: Option<u32>,

    /// Maximum number of phase retrieval iterations
    #[arg(short = 'n', long)]
    pub max_iterations: Option<u32>,

    /// Minimal pupil function difference
    #[arg(long)]
    pub pupil_tolerance: Option<f64>,

    /// Minimal relative MSE difference
    #[arg(long)]
    pub mse_tolerance: Option<f64>,

    /// Tolerable phase deviation in wavelengths
    #[arg(long)]
    pub phase_tolerance: Option<f64>,

    /// Directory for the reports (defaults to the record's directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}
