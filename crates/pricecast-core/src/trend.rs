//! Decomposable trend + yearly seasonality model family.
//!
//! A piecewise-linear trend (hinge terms at evenly spaced changepoints) plus
//! Fourier terms over the seasonal cycle, fit in one least-squares pass.
//! Unlike the other families this model is persisted fitted: the artifact
//! embeds the whole object and serving calls [`TrendSeasonalModel::forecast`]
//! directly instead of refitting.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::regress::fit_ols;
use crate::sarima::{normal_quantile, sample_std, ForecastBands, INTERVAL_CONFIDENCE};

/// Changepoint counts tried by the candidate sweep, least to most flexible.
pub const FLEXIBILITY_GRID: [usize; 3] = [0, 2, 5];

/// Fourier harmonics used for the seasonal component.
const HARMONICS: usize = 3;

/// A fitted (and serializable) trend + seasonality model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeasonalModel {
    /// Normalized changepoint locations in (0, 1), possibly empty.
    breakpoints: Vec<f64>,
    intercept: f64,
    /// Trend slope, one hinge slope per breakpoint, then sin/cos pairs.
    betas: Vec<f64>,
    harmonics: usize,
    period: usize,
    train_len: usize,
    /// Cycle position (0-based month) of the first training observation.
    phase: usize,
    residual_std: f64,
}

impl TrendSeasonalModel {
    /// Fit with `changepoints` interior trend knots. `phase` anchors the
    /// seasonal cycle to the calendar (0 = January for monthly data).
    pub fn fit(
        values: &[f64],
        phase: usize,
        changepoints: usize,
        period: usize,
    ) -> Result<TrendSeasonalModel> {
        if period < 2 {
            return Err(ForecastError::InvalidInput(format!(
                "seasonal period must be at least 2, got {period}"
            )));
        }
        let n = values.len();
        let n_cols = 1 + changepoints + 2 * HARMONICS;
        if n < n_cols + 2 {
            return Err(ForecastError::InsufficientData {
                needed: n_cols + 2,
                got: n,
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(
                "series contains non-finite values".to_string(),
            ));
        }

        let breakpoints: Vec<f64> = (1..=changepoints)
            .map(|j| j as f64 / (changepoints + 1) as f64)
            .collect();

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(n_cols);
        let scale = (n - 1) as f64;
        columns.push((0..n).map(|i| i as f64 / scale).collect());
        for b in &breakpoints {
            columns.push((0..n).map(|i| (i as f64 / scale - b).max(0.0)).collect());
        }
        for k in 1..=HARMONICS {
            let (sin_col, cos_col) = fourier_pair(k, phase, period, n);
            columns.push(sin_col);
            columns.push(cos_col);
        }

        let fit = fit_ols(values, &columns, true)?;
        let residual_std = sample_std(&fit.residuals);
        if !residual_std.is_finite() {
            return Err(ForecastError::Computation(
                "non-finite residual spread in trend fit".to_string(),
            ));
        }

        Ok(TrendSeasonalModel {
            breakpoints,
            intercept: fit.intercept,
            betas: fit.betas,
            harmonics: HARMONICS,
            period,
            train_len: n,
            phase,
            residual_std,
        })
    }

    pub fn changepoints(&self) -> usize {
        self.breakpoints.len()
    }

    /// Forecast `horizon` steps past the end of training. The trend
    /// extrapolates its final segment; seasonality continues its cycle.
    pub fn forecast(&self, horizon: usize) -> Result<ForecastBands> {
        if self.train_len < 2 || self.betas.len() != 1 + self.breakpoints.len() + 2 * self.harmonics
        {
            return Err(ForecastError::Artifact(
                "trend model state is inconsistent".to_string(),
            ));
        }
        let point: Vec<f64> = (1..=horizon)
            .map(|h| self.predict_index(self.train_len - 1 + h))
            .collect();
        if point.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Computation(
                "trend forecast produced non-finite values".to_string(),
            ));
        }

        let z_score = normal_quantile(1.0 - (1.0 - INTERVAL_CONFIDENCE) / 2.0)?;
        let margin = z_score * self.residual_std;
        let lower = point.iter().map(|p| p - margin).collect();
        let upper = point.iter().map(|p| p + margin).collect();

        Ok(ForecastBands {
            point,
            lower,
            upper,
        })
    }

    fn predict_index(&self, i: usize) -> f64 {
        let t = i as f64 / (self.train_len - 1) as f64;
        let mut value = self.intercept + self.betas[0] * t;
        for (j, b) in self.breakpoints.iter().enumerate() {
            value += self.betas[1 + j] * (t - b).max(0.0);
        }
        let seasonal_base = 1 + self.breakpoints.len();
        let m = (self.phase + i) % self.period;
        let angle_base = 2.0 * std::f64::consts::PI * m as f64 / self.period as f64;
        for k in 1..=self.harmonics {
            let angle = angle_base * k as f64;
            value += self.betas[seasonal_base + 2 * (k - 1)] * angle.sin();
            value += self.betas[seasonal_base + 2 * (k - 1) + 1] * angle.cos();
        }
        value
    }
}

/// Sin/cos regressor pair for harmonic `k` over the first `n` indices.
fn fourier_pair(k: usize, phase: usize, period: usize, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut sin_col = Vec::with_capacity(n);
    let mut cos_col = Vec::with_capacity(n);
    for i in 0..n {
        let m = (phase + i) % period;
        let angle = 2.0 * std::f64::consts::PI * (k * m) as f64 / period as f64;
        sin_col.push(angle.sin());
        cos_col.push(angle.cos());
    }
    (sin_col, cos_col)
}
