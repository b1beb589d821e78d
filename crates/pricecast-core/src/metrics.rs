//! Forecast accuracy metrics.
//!
//! Candidate models are compared on a single metric, MAPE, so every family
//! and the ensemble score on the same held-out window with the same units.

use crate::error::{ForecastError, Result};

/// Calculates Mean Absolute Percentage Error.
///
/// MAPE expresses error as a percentage of the actual values, which makes
/// scores comparable across commodities with very different price levels.
/// Actuals at or near zero are skipped; returns NaN if every actual is zero.
///
/// # Arguments
/// * `actual` - Slice of actual observed values (non-zero values used)
/// * `forecast` - Slice of forecasted/predicted values
///
/// # Returns
/// The MAPE as a percentage (0-100+), or an error if inputs are invalid
///
/// # Formula
/// MAPE = (100/n) * Σ|actual_i - forecast_i| / |actual_i|
pub fn mape(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .filter(|(a, _)| a.abs() > f64::EPSILON)
        .map(|(a, f)| ((a - f) / a).abs())
        .sum();
    let count = actual.iter().filter(|a| a.abs() > f64::EPSILON).count();
    if count == 0 {
        return Ok(f64::NAN);
    }
    Ok(sum / count as f64 * 100.0)
}

fn validate_inputs(actual: &[f64], forecast: &[f64]) -> Result<()> {
    if actual.len() != forecast.len() {
        return Err(ForecastError::InvalidInput(format!(
            "Actual and forecast arrays must have the same length: {} vs {}",
            actual.len(),
            forecast.len()
        )));
    }
    if actual.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    Ok(())
}
