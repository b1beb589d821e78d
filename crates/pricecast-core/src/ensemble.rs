//! Weighted combination of ensemble members.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::descriptor::ModelDescriptor;
use crate::error::{ForecastError, Result};
use crate::reconcile::{reconcile, ForecastRow};

/// Serve one artifact of any family: ensembles combine their members, every
/// other descriptor reconciles directly.
pub fn predict(
    descriptor: &ModelDescriptor,
    months_to_predict: usize,
    today: NaiveDate,
) -> Result<Vec<ForecastRow>> {
    match descriptor {
        ModelDescriptor::Ensemble { weights, members } => {
            combine(weights, members, months_to_predict, today)
        }
        _ => reconcile(descriptor, months_to_predict, today),
    }
}

/// Combine member forecasts by weighted sum over the union of their dates.
///
/// Members reconcile independently; a failing member is warn-logged and
/// dropped rather than failing the request. A date missing from some members
/// sums only the present contributions, with no weight renormalization. Errors
/// only when every member fails or returns zero rows.
pub fn combine(
    weights: &[f64],
    members: &[ModelDescriptor],
    months_to_predict: usize,
    today: NaiveDate,
) -> Result<Vec<ForecastRow>> {
    if members.is_empty() {
        return Err(ForecastError::Configuration(
            "ensemble has no members".to_string(),
        ));
    }
    if weights.len() != members.len() {
        return Err(ForecastError::Configuration(format!(
            "ensemble has {} weights for {} members",
            weights.len(),
            members.len()
        )));
    }

    let mut combined: BTreeMap<NaiveDate, ForecastRow> = BTreeMap::new();
    let mut contributing = 0usize;
    for (weight, member) in weights.iter().zip(members) {
        let rows = match reconcile(member, months_to_predict, today) {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(model_type = member.model_type(), %err, "ensemble member failed");
                continue;
            }
        };
        if rows.is_empty() {
            tracing::debug!(
                model_type = member.model_type(),
                "ensemble member produced no rows"
            );
            continue;
        }
        contributing += 1;
        for row in rows {
            let entry = combined.entry(row.date).or_insert_with(|| ForecastRow {
                date: row.date,
                yhat: 0.0,
                yhat_lower: 0.0,
                yhat_upper: 0.0,
            });
            entry.yhat += weight * row.yhat;
            entry.yhat_lower += weight * row.yhat_lower;
            entry.yhat_upper += weight * row.yhat_upper;
        }
    }

    if contributing == 0 {
        return Err(ForecastError::EnsembleExhausted);
    }
    Ok(combined.into_values().collect())
}
