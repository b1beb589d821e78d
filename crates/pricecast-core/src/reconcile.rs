//! Serve-time forecast reconstruction.
//!
//! Given a single-model descriptor, refit (seasonal AR, smoothing) or reuse
//! (trend) the model on its stored history, forecast far enough past the end
//! of training to reach the present, and return the requested window. The
//! caller injects `today` so the clock is not ambient state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{add_months, month_sequence, months_between, start_of_month};
use crate::descriptor::ModelDescriptor;
use crate::error::{ForecastError, Result};
use crate::panel::MonthlySeries;
use crate::sarima::SarimaModel;
use crate::smoothing::HoltWinters;

/// Half-width fraction of the synthesized smoothing band.
const SMOOTHING_BAND: f64 = 0.1;

/// Elapsed months after which a stale artifact is flagged in logs.
const STALENESS_WARN_MONTHS: i64 = 12;

/// One forecast month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Produce up to `months_to_predict` rows dated on/after the first of
/// `today`'s month. Zero surviving rows is a valid empty result.
///
/// Ensemble descriptors are combined member-wise by
/// [`crate::ensemble::combine`]; feeding one here is a configuration error.
pub fn reconcile(
    descriptor: &ModelDescriptor,
    months_to_predict: usize,
    today: NaiveDate,
) -> Result<Vec<ForecastRow>> {
    if months_to_predict == 0 {
        return Err(ForecastError::InvalidInput(
            "months_to_predict must be at least 1".to_string(),
        ));
    }

    let history = descriptor.history().ok_or_else(|| {
        ForecastError::Configuration(format!(
            "model type '{}' cannot be reconciled directly",
            descriptor.model_type()
        ))
    })?;
    let last_trained = history
        .last_month()
        .ok_or_else(|| ForecastError::Artifact("descriptor history is empty".to_string()))?;

    let current_month = start_of_month(today);
    let elapsed = months_between(last_trained, current_month);
    if elapsed > STALENESS_WARN_MONTHS {
        tracing::warn!(
            model_type = descriptor.model_type(),
            months_stale = elapsed,
            "artifact has not been retrained for over a year"
        );
    }

    let periods = total_periods(elapsed, months_to_predict);
    let (point, lower, upper, log_transformed) = project(descriptor, history, periods)?;
    let dates = month_sequence(add_months(last_trained, 1), periods);

    let mut rows = Vec::new();
    for (i, date) in dates.iter().enumerate() {
        if *date < current_month {
            continue;
        }
        if rows.len() == months_to_predict {
            break;
        }
        let (mut yhat, mut lo, mut hi) = (point[i], lower[i], upper[i]);
        if log_transformed {
            yhat = yhat.exp();
            lo = lo.exp();
            hi = hi.exp();
        }
        rows.push(ForecastRow {
            date: *date,
            yhat,
            yhat_lower: lo.max(0.0),
            yhat_upper: hi,
        });
    }
    Ok(rows)
}

/// Horizon long enough to reach from the end of training past the present,
/// but never shorter than the requested window.
fn total_periods(elapsed_months: i64, months_to_predict: usize) -> usize {
    let span = elapsed_months + months_to_predict as i64;
    if span <= 0 {
        months_to_predict
    } else {
        span.max(months_to_predict as i64) as usize
    }
}

/// Model-scale forecast columns for one single-model descriptor. The
/// smoothing family has no native interval, so a ±10% band is synthesized in
/// model scale before any exponentiation.
fn project(
    descriptor: &ModelDescriptor,
    history: &MonthlySeries,
    periods: usize,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>, bool)> {
    match descriptor {
        ModelDescriptor::SeasonalAr {
            log_transformed,
            params,
            ..
        } => {
            let model = SarimaModel::fit(&history.values, params)?;
            let bands = model.forecast(periods)?;
            Ok((bands.point, bands.lower, bands.upper, *log_transformed))
        }
        ModelDescriptor::Smoothing {
            log_transformed,
            params,
            ..
        } => {
            let model = HoltWinters::fit(&history.values, params)?;
            let point = model.forecast(periods);
            let lower = point.iter().map(|p| p * (1.0 - SMOOTHING_BAND)).collect();
            let upper = point.iter().map(|p| p * (1.0 + SMOOTHING_BAND)).collect();
            Ok((point, lower, upper, *log_transformed))
        }
        ModelDescriptor::TrendSeasonal {
            log_transformed,
            model,
            ..
        } => {
            let bands = model.forecast(periods)?;
            Ok((bands.point, bands.lower, bands.upper, *log_transformed))
        }
        ModelDescriptor::Ensemble { .. } => Err(ForecastError::Configuration(
            "ensemble descriptors are combined member-wise".to_string(),
        )),
    }
}
