use std::path::PathBuf;

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::Local;
use pupilfit::domain::models::{
    FitParameters, ImageArtifactStore, ImageSize, ProgressState, TerminationReason,
};
use pupilfit::services::report::{CATALOG_FIRST_ROW, SHEET_NAME};
use pupilfit::services::{ReportContext, ReportEmitter, ResultClassifier};

fn parameters() -> FitParameters {
    FitParameters {
        emission_wavelength: Some(520),
        numerical_aperture: Some(1.4),
        refractive_index: Some(1.518),
        xy_resolution: Some(52),
        z_resolution: Some(200),
        max_iterations: Some(100),
        pupil_tolerance: Some(1e-8),
        mse_tolerance: Some(1e-6),
        phase_tolerance: Some(0.5),
        image_size: Some(ImageSize { xy: 64, z: 32 }),
    }
}

fn text(value: Option<&Data>) -> String {
    match value {
        Some(Data::String(text)) => text.clone(),
        other => panic!("expected a string cell, got {other:?}"),
    }
}

fn number(value: Option<&Data>) -> f64 {
    match value {
        Some(Data::Float(number)) => *number,
        Some(Data::Int(number)) => *number as f64,
        other => panic!("expected a number cell, got {other:?}"),
    }
}

#[test]
fn test_workbook_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let source = PathBuf::from("/data/beads/psf_01.json");
    let parameters = parameters();
    let progress = ProgressState {
        iteration: 17,
        ..ProgressState::started(100)
    }
    .stopped(TerminationReason::PupilConverged);
    let catalog = ResultClassifier::classify(
        &[0.31, -0.6, 0.004],
        &ResultClassifier::initialize_catalog(),
        0.5,
    );
    let artifacts = ImageArtifactStore::new();
    let ctx = ReportContext {
        source: &source,
        parameters: &parameters,
        progress: &progress,
        catalog: &catalog,
        artifacts: &artifacts,
        generated_at: Local::now(),
    };

    let path = dir.path().join("psf_01_zd_results.xlsx");
    ReportEmitter::write_workbook(&ctx, &path).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);
    let range = workbook.worksheet_range(SHEET_NAME).unwrap();

    assert_eq!(text(range.get_value((0, 0))), "/data/beads/psf_01.json");
    assert_eq!(text(range.get_value((2, 0))), "PSF Parameters");
    assert_eq!(text(range.get_value((2, 2))), "Phase Retrieval Parameters");
    assert!((number(range.get_value((3, 1))) - 520.0).abs() < f64::EPSILON);
    assert!((number(range.get_value((4, 1))) - 1.4).abs() < 1e-12);
    assert!((number(range.get_value((3, 3))) - 100.0).abs() < f64::EPSILON);
    assert_eq!(
        text(range.get_value((6, 2))),
        "Phase retrieval stopped after iteration 17 out of 100."
    );
    assert_eq!(text(range.get_value((7, 2))), "Pupil function converged.");

    assert_eq!(text(range.get_value((10, 0))), "Noll Order");
    let first = CATALOG_FIRST_ROW;
    assert!((number(range.get_value((first, 0))) - 1.0).abs() < f64::EPSILON);
    assert_eq!(text(range.get_value((first, 1))), "Piston");
    assert!((number(range.get_value((first, 2))) - 0.31).abs() < 1e-12);
    assert!((number(range.get_value((first + 1, 2))) + 0.6).abs() < 1e-12);

    let last = first + 14;
    assert_eq!(text(range.get_value((last, 1))), "Oblique quadrafoil");
    assert!(number(range.get_value((last, 2))).abs() < f64::EPSILON);
}

#[test]
fn test_unwritable_destination_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let source = PathBuf::from("psf.json");
    let parameters = parameters();
    let progress = ProgressState::default();
    let catalog = ResultClassifier::initialize_catalog();
    let artifacts = ImageArtifactStore::new();
    let ctx = ReportContext {
        source: &source,
        parameters: &parameters,
        progress: &progress,
        catalog: &catalog,
        artifacts: &artifacts,
        generated_at: Local::now(),
    };

    let path = dir.path().join("missing").join("out.xlsx");
    assert!(ReportEmitter::write_workbook(&ctx, &path).is_err());
}
