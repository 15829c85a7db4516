mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    coordinator, fixture_parameters, fixture_stack, ConstantFactory, GatedFactory, ZERNIKE_TERMS,
};
use proptest::prelude::*;
use pupilfit::domain::error::{RunError, ValidationIssue};
use pupilfit::domain::models::{
    FitParameters, ImageSize, ParameterKey, PixelStack, TerminationReason,
};
use pupilfit::{RunCoordinator, RunMonitor, RunStatus};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_for_iteration(handle: &pupilfit::RunHandle, iteration: u32) {
    timeout(WAIT, async {
        while handle.progress().iteration < iteration {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("run did not reach the iteration in time");
}

#[tokio::test]
async fn test_max_iterations_reached() {
    common::setup_test_logging();
    let coordinator = coordinator(ConstantFactory::never_improving());

    let handle = coordinator
        .start(&fixture_parameters(), fixture_stack())
        .unwrap();
    let status = timeout(WAIT, handle.wait()).await.unwrap();

    let RunStatus::Completed(result) = status else {
        panic!("expected completion, got {status:?}");
    };
    assert_eq!(result.progress.iteration, 5);
    assert_eq!(
        result.progress.reason(),
        Some(&TerminationReason::MaxIterations)
    );
    assert!(result.progress.finished);
    assert_eq!(result.coefficients.len(), ZERNIKE_TERMS);
    assert_eq!(result.history.len(), 5);
    assert_eq!(
        result.progress.status_lines(),
        vec!["Maximum iterations reached.".to_string()]
    );
}

#[tokio::test]
async fn test_cancel_stops_within_one_step() {
    let (factory, permits) = GatedFactory::new();
    let coordinator = coordinator(factory);
    let params = FitParameters {
        max_iterations: Some(100),
        ..fixture_parameters()
    };
    let handle = coordinator.start(&params, fixture_stack()).unwrap();

    for _ in 0..3 {
        permits.send(()).unwrap();
    }
    wait_for_iteration(&handle, 3).await;
    let k = handle.progress().iteration;

    handle.cancel();
    assert!(handle.is_cancel_requested());
    // the loop may already be blocked inside the next step
    let _ = permits.send(());

    let status = timeout(WAIT, handle.wait()).await.unwrap();
    let RunStatus::Cancelled(result) = status else {
        panic!("expected cancellation, got {status:?}");
    };
    assert!(
        result.progress.iteration == k || result.progress.iteration == k + 1,
        "terminal iteration {} not in {{{k}, {}}}",
        result.progress.iteration,
        k + 1
    );
    assert_eq!(result.progress.reason(), Some(&TerminationReason::Cancelled));
    assert!(result.progress.finished);
    assert_eq!(
        result.progress.status_lines(),
        vec!["Phase retrieval cancelled by user.".to_string()]
    );
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let (factory, permits) = GatedFactory::new();
    let coordinator = coordinator(factory);
    let params = FitParameters {
        max_iterations: Some(1),
        ..fixture_parameters()
    };

    let first = coordinator.start(&params, fixture_stack()).unwrap();
    assert!(coordinator.is_active());

    match coordinator.start(&params, fixture_stack()) {
        Err(RunError::AlreadyActive(id)) => assert_eq!(id, first.id()),
        other => panic!("expected AlreadyActive, got {other:?}"),
    }

    permits.send(()).unwrap();
    let status = timeout(WAIT, first.wait()).await.unwrap();
    assert!(status.is_terminal());
    assert!(!coordinator.is_active());
    assert!(coordinator.active_run().is_none());
}

#[tokio::test]
async fn test_solver_failure_still_finishes() {
    let coordinator = coordinator(ConstantFactory::failing_at(3));
    let handle = coordinator
        .start(&fixture_parameters(), fixture_stack())
        .unwrap();

    let status = timeout(WAIT, handle.wait()).await.unwrap();
    let RunStatus::Failed(result) = status else {
        panic!("expected failure, got {status:?}");
    };
    assert_eq!(result.progress.iteration, 2);
    assert!(result.progress.finished);
    assert!(result.coefficients.is_empty());
    assert!(matches!(
        result.progress.reason(),
        Some(TerminationReason::SolverFailure(message)) if message.contains("singular pupil")
    ));
    assert!(!coordinator.is_active());
}

#[tokio::test]
async fn test_polled_iterations_never_decrease() {
    let coordinator = coordinator(ConstantFactory::never_improving());
    let params = FitParameters {
        max_iterations: Some(50),
        ..fixture_parameters()
    };
    let handle = coordinator.start(&params, fixture_stack()).unwrap();

    let monitor = RunMonitor::new(Duration::from_millis(1), 5);
    let mut seen = Vec::new();
    let status = timeout(
        WAIT,
        monitor.watch(&handle, |event| {
            if let pupilfit::application::MonitorEvent::Tick(progress) = event {
                seen.push(progress.iteration);
            }
        }),
    )
    .await
    .unwrap();

    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(status.progress().iteration, 50);
    assert!(status.progress().finished);
    assert_eq!(seen.last(), Some(&50));
}

#[tokio::test]
async fn test_shape_mismatch_rejected() {
    let coordinator = coordinator(ConstantFactory::never_improving());
    let params = FitParameters {
        image_size: Some(ImageSize { xy: 8, z: 2 }),
        ..fixture_parameters()
    };

    match coordinator.start(&params, fixture_stack()) {
        Err(RunError::Validation(err)) => {
            assert_eq!(
                err.issues,
                vec![ValidationIssue::ShapeMismatch {
                    expected: (2, 8, 8),
                    actual: (2, 4, 4),
                }]
            );
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(!coordinator.is_active());
}

const REQUIRED: [ParameterKey; 8] = [
    ParameterKey::EmissionWavelength,
    ParameterKey::NumericalAperture,
    ParameterKey::RefractiveIndex,
    ParameterKey::XyResolution,
    ParameterKey::ZResolution,
    ParameterKey::MaxIterations,
    ParameterKey::PupilTolerance,
    ParameterKey::MseTolerance,
];

fn clear(params: &mut FitParameters, key: ParameterKey) {
    match key {
        ParameterKey::EmissionWavelength => params.emission_wavelength = None,
        ParameterKey::NumericalAperture => params.numerical_aperture = None,
        ParameterKey::RefractiveIndex => params.refractive_index = None,
        ParameterKey::XyResolution => params.xy_resolution = None,
        ParameterKey::ZResolution => params.z_resolution = None,
        ParameterKey::MaxIterations => params.max_iterations = None,
        ParameterKey::PupilTolerance => params.pupil_tolerance = None,
        ParameterKey::MseTolerance => params.mse_tolerance = None,
        ParameterKey::PhaseTolerance => params.phase_tolerance = None,
    }
}

proptest! {
    #[test]
    fn prop_missing_parameters_never_start(mask in prop::collection::vec(any::<bool>(), REQUIRED.len())) {
        prop_assume!(mask.iter().any(|missing| *missing));

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let coordinator = RunCoordinator::new(
            ConstantFactory::never_improving(),
            runtime.handle().clone(),
            ZERNIKE_TERMS,
        );

        let mut params = fixture_parameters();
        for (key, missing) in REQUIRED.iter().zip(&mask) {
            if *missing {
                clear(&mut params, *key);
            }
        }

        match coordinator.start(&params, fixture_stack()) {
            Err(RunError::Validation(err)) => {
                for (key, missing) in REQUIRED.iter().zip(&mask) {
                    prop_assert_eq!(err.mentions(*key), *missing);
                }
            }
            other => prop_assert!(false, "expected validation error, got {:?}", other),
        }
        prop_assert!(!coordinator.is_active());
    }

    #[test]
    fn prop_stack_shape_must_match(z in 1usize..4, y in 1usize..6, x in 1usize..6) {
        prop_assume!((z, y, x) != (2, 4, 4));

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let coordinator = RunCoordinator::new(
            Arc::new(ConstantFactory { diff: 1e-3, fail_at: None }),
            runtime.handle().clone(),
            ZERNIKE_TERMS,
        );

        let result = coordinator.start(&fixture_parameters(), PixelStack::zeros(z, y, x));
        prop_assert!(matches!(result, Err(RunError::Validation(_))));
    }
}
