//! Acquisition adapters
//!
//! - `metadata`: unit conversion and sanity checks on image metadata
//! - `recorded`: JSON acquisition records
//! - `bridge`: scoped, process-wide owner of the acquisition service

pub mod bridge;
pub mod metadata;
pub mod recorded;

pub use bridge::AcquisitionBridge;
pub use metadata::{ImageMetadata, NormalizedMetadata, ObjectiveMetadata, PixelsMetadata};
pub use recorded::{AcquisitionRecord, RecordedAcquisition};
