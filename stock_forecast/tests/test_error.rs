use std::io;
use std::time::Duration;
use stock_forecast::error::ForecastError;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    match ForecastError::from(io_error) {
        ForecastError::IoError(_) => {}
        other => panic!("Expected IoError variant, got {:?}", other),
    }

    let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    match ForecastError::from(json_error) {
        ForecastError::SerializationError(_) => {}
        other => panic!("Expected SerializationError variant, got {:?}", other),
    }

    let polars_error = polars::prelude::DataFrame::default()
        .column("Close")
        .unwrap_err();
    match ForecastError::from(polars_error) {
        ForecastError::PolarsError(message) => assert!(message.contains("Close")),
        other => panic!("Expected PolarsError variant, got {:?}", other),
    }
}

#[test]
fn test_error_display() {
    let error = ForecastError::InvalidInputError("Required column 'Close' not found".to_string());
    assert!(error.to_string().contains("Invalid input"));
    assert!(error.to_string().contains("Close"));

    let error = ForecastError::MisalignedSeriesError {
        actual: 10,
        predicted: 7,
    };
    assert_eq!(
        error.to_string(),
        "Misaligned series: 10 actual values vs 7 predictions"
    );

    let error = ForecastError::FitTimeoutError {
        model: "Seasonal".to_string(),
        timeout: Duration::from_secs(5),
    };
    assert!(error.to_string().contains("Seasonal"));
    assert!(error.to_string().contains("5s"));

    let error = ForecastError::from(io::Error::new(
        io::ErrorKind::PermissionDenied,
        "permission denied",
    ));
    assert!(error.to_string().contains("IO error"));
    assert!(error.to_string().contains("permission denied"));
}
