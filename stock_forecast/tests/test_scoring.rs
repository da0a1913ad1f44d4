use approx::assert_relative_eq;
use rstest::rstest;
use stock_forecast::scoring::{score, ErrorMetrics};
use stock_forecast::ForecastError;

#[rstest]
#[case::identical(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 0.0, 0.0)]
#[case::unit_offset(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0], 1.0, 1.0)]
#[case::single_outlier(&[10.0, 10.0, 10.0, 10.0], &[10.0, 10.0, 10.0, 14.0], 1.0, 2.0)]
#[case::mixed_signs(&[0.0, 0.0], &[3.0, -4.0], 3.5, 12.5f64.sqrt())]
fn test_score(
    #[case] actual: &[f64],
    #[case] predicted: &[f64],
    #[case] mae: f64,
    #[case] rmse: f64,
) {
    let metrics = score(actual, predicted).unwrap();
    assert_relative_eq!(metrics.mae, mae, epsilon = 1e-12);
    assert_relative_eq!(metrics.rmse, rmse, epsilon = 1e-12);
    assert!(metrics.rmse >= metrics.mae);
}

#[rstest]
#[case::shorter_prediction(&[1.0, 2.0, 3.0], &[1.0, 2.0])]
#[case::longer_prediction(&[1.0], &[1.0, 2.0])]
#[case::both_empty(&[], &[])]
fn test_score_misaligned(#[case] actual: &[f64], #[case] predicted: &[f64]) {
    match score(actual, predicted) {
        Err(ForecastError::MisalignedSeriesError {
            actual: a,
            predicted: p,
        }) => {
            assert_eq!(a, actual.len());
            assert_eq!(p, predicted.len());
        }
        other => panic!("expected MisalignedSeriesError, got {:?}", other),
    }
}

#[test]
fn test_beats_requires_both_metrics() {
    let better = ErrorMetrics { mae: 1.0, rmse: 1.0 };
    let worse = ErrorMetrics { mae: 2.0, rmse: 2.0 };
    let split = ErrorMetrics { mae: 0.5, rmse: 3.0 };

    assert!(better.beats(&worse));
    assert!(!worse.beats(&better));
    assert!(!split.beats(&worse));
    assert!(!better.beats(&better));

    let nan = ErrorMetrics {
        mae: f64::NAN,
        rmse: 0.0,
    };
    assert!(!nan.beats(&worse));
    assert!(!worse.beats(&nan));
}

#[test]
fn test_metrics_display() {
    let metrics = ErrorMetrics {
        mae: 1.23456,
        rmse: 2.0,
    };
    assert_eq!(metrics.to_string(), "MAE: 1.2346, RMSE: 2.0000");
}
