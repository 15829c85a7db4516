pub mod report;
pub mod result_classifier;

pub use report::{ReportContext, ReportEmitter, ReportPaths};
pub use result_classifier::ResultClassifier;
