//! Seasonal autoregressive model family.
//!
//! A light SARIMA: seasonal and non-seasonal differencing, AR coefficients
//! estimated by conditional least squares at the active lags, MA coefficients
//! from residual autocorrelations. The candidate grid keeps every order in
//! {0, 1}, so active lags are at most {1, period} for each side. There is no
//! constant term; with every order at zero the model predicts zero on the
//! differenced scale.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{ForecastError, Result};
use crate::regress::fit_ols;

/// Confidence level for forecast intervals across all families.
pub const INTERVAL_CONFIDENCE: f64 = 0.95;

/// Non-seasonal (p, d, q) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal (P, D, Q) order with its period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

/// Hyperparameters that fully determine a refit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarimaParams {
    pub order: ArimaOrder,
    pub seasonal: SeasonalOrder,
}

impl SarimaParams {
    /// The candidate search space: every (p,d,q) x (P,D,Q) combination over
    /// {0,1} with the given seasonal period, in a fixed deterministic order.
    pub fn grid(period: usize) -> Vec<SarimaParams> {
        let mut combos = Vec::with_capacity(64);
        for p in 0..=1 {
            for d in 0..=1 {
                for q in 0..=1 {
                    for sp in 0..=1 {
                        for sd in 0..=1 {
                            for sq in 0..=1 {
                                combos.push(SarimaParams {
                                    order: ArimaOrder { p, d, q },
                                    seasonal: SeasonalOrder {
                                        p: sp,
                                        d: sd,
                                        q: sq,
                                        period,
                                    },
                                });
                            }
                        }
                    }
                }
            }
        }
        combos
    }
}

/// Point forecasts with symmetric confidence bounds, all in model scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBands {
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl ForecastBands {
    pub fn len(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }
}

/// A fitted seasonal AR model over one (typically log-scale) series.
#[derive(Debug, Clone)]
pub struct SarimaModel {
    params: SarimaParams,
    /// (lag, coefficient) pairs for the AR side, ascending by lag.
    ar: Vec<(usize, f64)>,
    /// (lag, coefficient) pairs for the MA side, ascending by lag.
    ma: Vec<(usize, f64)>,
    residual_std: f64,
    /// Training values in model scale.
    train: Vec<f64>,
    /// Seasonally differenced series (equals `train` when D = 0).
    z: Vec<f64>,
    /// Fully differenced series the AR/MA recursion runs on.
    w: Vec<f64>,
    /// One-step residuals per `w` entry, zero through the warmup prefix.
    residuals: Vec<f64>,
}

impl SarimaModel {
    /// Fit by conditional least squares. Fails on short or degenerate input;
    /// grid-search callers skip the combination and move on.
    pub fn fit(values: &[f64], params: &SarimaParams) -> Result<SarimaModel> {
        let s = params.seasonal.period;
        let d = params.order.d;
        let sd = params.seasonal.d;

        if d > 1 || sd > 1 {
            return Err(ForecastError::InvalidInput(
                "differencing orders above 1 are not supported".to_string(),
            ));
        }
        let seasonal_active =
            params.seasonal.p > 0 || params.seasonal.d > 0 || params.seasonal.q > 0;
        if seasonal_active && s < 2 {
            return Err(ForecastError::InvalidInput(format!(
                "seasonal period must be at least 2, got {s}"
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(
                "series contains non-finite values".to_string(),
            ));
        }

        let min_len = d + sd * s + 3;
        if values.len() < min_len {
            return Err(ForecastError::InsufficientData {
                needed: min_len,
                got: values.len(),
            });
        }

        let z = if sd == 1 {
            difference(values, s)
        } else {
            values.to_vec()
        };
        let w = if d == 1 { difference(&z, 1) } else { z.clone() };

        let ar_lags: Vec<usize> = (1..=params.order.p)
            .chain((1..=params.seasonal.p).map(|k| k * s))
            .collect();
        let ma_lags: Vec<usize> = (1..=params.order.q)
            .chain((1..=params.seasonal.q).map(|k| k * s))
            .collect();

        let ar = estimate_ar(&w, &ar_lags)?;
        let ar_residuals = recursion_residuals(&w, &ar, &[]);
        let ma: Vec<(usize, f64)> = ma_lags
            .iter()
            .map(|&lag| (lag, autocorrelation(&ar_residuals, lag).clamp(-0.99, 0.99)))
            .collect();

        let residuals = recursion_residuals(&w, &ar, &ma);
        let warmup = warmup_len(&ar, &ma);
        let effective = &residuals[warmup.min(residuals.len())..];
        if effective.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: warmup + 2,
                got: residuals.len(),
            });
        }
        let residual_std = sample_std(effective);
        if !residual_std.is_finite() {
            return Err(ForecastError::Computation(
                "non-finite residual spread in seasonal AR fit".to_string(),
            ));
        }

        Ok(SarimaModel {
            params: *params,
            ar,
            ma,
            residual_std,
            train: values.to_vec(),
            z,
            w,
            residuals,
        })
    }

    pub fn params(&self) -> &SarimaParams {
        &self.params
    }

    /// One-step-ahead in-sample predictions for the last `tail` training
    /// points, integrated back to model scale. Used to score the candidate
    /// grid against the final training year.
    pub fn predict_in_sample_tail(&self, tail: usize) -> Vec<f64> {
        let n = self.train.len();
        let tail = tail.min(n);
        let s = self.params.seasonal.period;
        let d = self.params.order.d;
        let sd = self.params.seasonal.d;
        let shift = d + sd * s;

        (n - tail..n)
            .map(|t| {
                if t < shift.max(1) {
                    // consumed by differencing warmup; fall back to a naive
                    // one-step prediction
                    return self.train[t.saturating_sub(1)];
                }
                let w_pred = self.predict_differenced(t - shift);
                let level_z = if d == 1 {
                    let u = t - sd * s;
                    w_pred + self.z[u - 1]
                } else {
                    w_pred
                };
                if sd == 1 {
                    level_z + self.train[t - s]
                } else {
                    level_z
                }
            })
            .collect()
    }

    /// Forecast `horizon` steps past the end of training, with symmetric
    /// intervals that widen with the step distance.
    pub fn forecast(&self, horizon: usize) -> Result<ForecastBands> {
        if horizon == 0 {
            return Ok(ForecastBands {
                point: vec![],
                lower: vec![],
                upper: vec![],
            });
        }
        let s = self.params.seasonal.period;
        let d = self.params.order.d;
        let sd = self.params.seasonal.d;

        // Extend the differenced series step by step; future shocks are zero.
        let n_w = self.w.len();
        let mut w_ext = self.w.clone();
        let mut e_ext = self.residuals.clone();
        for k in 0..horizon {
            let idx = n_w + k;
            let mut pred = 0.0;
            for (lag, phi) in &self.ar {
                if idx >= *lag {
                    pred += phi * w_ext[idx - lag];
                }
            }
            for (lag, theta) in &self.ma {
                if idx >= *lag {
                    pred += theta * e_ext[idx - lag];
                }
            }
            w_ext.push(pred);
            e_ext.push(0.0);
        }

        // Integrate back: first the non-seasonal difference, then the
        // seasonal one.
        let mut future_z = Vec::with_capacity(horizon);
        if d == 1 {
            let mut prev = match self.z.last() {
                Some(v) => *v,
                None => {
                    return Err(ForecastError::Computation(
                        "empty differenced series".to_string(),
                    ))
                }
            };
            for w_val in &w_ext[n_w..] {
                prev += w_val;
                future_z.push(prev);
            }
        } else {
            future_z.extend_from_slice(&w_ext[n_w..]);
        }

        let mut y_ext = self.train.clone();
        for z_val in &future_z {
            let idx = y_ext.len();
            let y_val = if sd == 1 { z_val + y_ext[idx - s] } else { *z_val };
            y_ext.push(y_val);
        }
        let point: Vec<f64> = y_ext[self.train.len()..].to_vec();
        if point.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Computation(
                "seasonal AR forecast diverged".to_string(),
            ));
        }

        let z_score = normal_quantile(1.0 - (1.0 - INTERVAL_CONFIDENCE) / 2.0)?;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (k, p) in point.iter().enumerate() {
            let margin = z_score * self.residual_std * ((k + 1) as f64).sqrt();
            lower.push(p - margin);
            upper.push(p + margin);
        }

        Ok(ForecastBands {
            point,
            lower,
            upper,
        })
    }

    /// AR/MA prediction for one index of the differenced series, using only
    /// lags that exist.
    fn predict_differenced(&self, v: usize) -> f64 {
        let mut pred = 0.0;
        for (lag, phi) in &self.ar {
            if v >= *lag {
                pred += phi * self.w[v - lag];
            }
        }
        for (lag, theta) in &self.ma {
            if v >= *lag {
                pred += theta * self.residuals[v - lag];
            }
        }
        pred
    }
}

fn difference(values: &[f64], lag: usize) -> Vec<f64> {
    (lag..values.len()).map(|i| values[i] - values[i - lag]).collect()
}

/// Conditional least squares at the given lags, no intercept.
fn estimate_ar(w: &[f64], lags: &[usize]) -> Result<Vec<(usize, f64)>> {
    if lags.is_empty() {
        return Ok(vec![]);
    }
    let max_lag = lags.iter().copied().max().unwrap_or(0);
    if w.len() <= max_lag + 1 {
        return Err(ForecastError::InsufficientData {
            needed: max_lag + 2,
            got: w.len(),
        });
    }
    let rows = w.len() - max_lag;
    let y: Vec<f64> = w[max_lag..].to_vec();
    let x: Vec<Vec<f64>> = lags
        .iter()
        .map(|&lag| (0..rows).map(|r| w[max_lag + r - lag]).collect())
        .collect();
    let fit = fit_ols(&y, &x, false)?;
    Ok(lags.iter().copied().zip(fit.betas).collect())
}

/// One-step residuals of the AR/MA recursion over the differenced series.
/// Entries before the warmup horizon are zero.
fn recursion_residuals(w: &[f64], ar: &[(usize, f64)], ma: &[(usize, f64)]) -> Vec<f64> {
    let warmup = warmup_len(ar, ma);
    let mut residuals = vec![0.0; w.len()];
    for t in 0..w.len() {
        if t < warmup {
            continue;
        }
        let mut pred = 0.0;
        for (lag, phi) in ar {
            pred += phi * w[t - lag];
        }
        for (lag, theta) in ma {
            pred += theta * residuals[t - lag];
        }
        residuals[t] = w[t] - pred;
    }
    residuals
}

fn warmup_len(ar: &[(usize, f64)], ma: &[(usize, f64)]) -> usize {
    ar.iter()
        .chain(ma.iter())
        .map(|(lag, _)| *lag)
        .max()
        .unwrap_or(0)
}

fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag >= n {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let denom: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    let num: f64 = (lag..n)
        .map(|i| (values[i] - mean) * (values[i - lag] - mean))
        .sum();
    num / denom
}

pub(crate) fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Standard normal quantile via statrs.
pub(crate) fn normal_quantile(p: f64) -> Result<f64> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::Computation(format!("normal distribution: {e}")))?;
    Ok(normal.inverse_cdf(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(p: usize, d: usize, q: usize, sp: usize, sd: usize, sq: usize) -> SarimaParams {
        SarimaParams {
            order: ArimaOrder { p, d, q },
            seasonal: SeasonalOrder {
                p: sp,
                d: sd,
                q: sq,
                period: 12,
            },
        }
    }

    /// Deterministic wiggle so fits never see an exactly collinear system.
    fn noise(i: usize) -> f64 {
        ((i * 37) % 11) as f64 * 0.1 - 0.5
    }

    #[test]
    fn test_grid_size_and_order() {
        let grid = SarimaParams::grid(12);
        assert_eq!(grid.len(), 64);
        assert_eq!(grid[0], params(0, 0, 0, 0, 0, 0));
        assert_eq!(grid[63], params(1, 1, 1, 1, 1, 1));
        assert!(grid.iter().all(|p| p.seasonal.period == 12));
    }

    #[test]
    fn test_random_walk_forecasts_flat() {
        let values: Vec<f64> = (0..40).map(|i| 10.0 + i as f64 + noise(i)).collect();
        let model = SarimaModel::fit(&values, &params(0, 1, 0, 0, 0, 0)).unwrap();
        let bands = model.forecast(4).unwrap();

        // No AR/MA terms and one plain difference: the forecast repeats the
        // last observed level.
        for p in &bands.point {
            assert_relative_eq!(*p, values[39], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_seasonal_difference_repeats_last_season() {
        let values: Vec<f64> = (0..48).map(|i| 100.0 + ((i % 12) as f64) * 5.0).collect();
        let model = SarimaModel::fit(&values, &params(0, 0, 0, 0, 1, 0)).unwrap();
        let bands = model.forecast(12).unwrap();

        for (k, p) in bands.point.iter().enumerate() {
            assert_relative_eq!(*p, values[36 + k], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_double_difference_continues_trend_and_season() {
        // linear trend + seasonal pattern: d=1, D=1 with no AR/MA extends both
        let values: Vec<f64> = (0..60)
            .map(|i| 50.0 + 2.0 * i as f64 + ((i % 12) as f64) * 3.0)
            .collect();
        let model = SarimaModel::fit(&values, &params(0, 1, 0, 0, 1, 0)).unwrap();
        let bands = model.forecast(6).unwrap();

        for (k, p) in bands.point.iter().enumerate() {
            let i = 60 + k;
            let expected = 50.0 + 2.0 * i as f64 + ((i % 12) as f64) * 3.0;
            assert_relative_eq!(*p, expected, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_ar_fit_produces_bounded_intervals() {
        let values: Vec<f64> = (0..60)
            .map(|i| 20.0 + (i as f64 * 0.4) + noise(i) + noise(i + 3))
            .collect();
        let model = SarimaModel::fit(&values, &params(1, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(model.ar.len(), 1);
        assert_eq!(model.ma.len(), 1);

        let bands = model.forecast(6).unwrap();
        assert_eq!(bands.len(), 6);
        for k in 0..6 {
            assert!(bands.lower[k] <= bands.point[k]);
            assert!(bands.point[k] <= bands.upper[k]);
        }
        // margins widen with the horizon
        let first = bands.upper[0] - bands.lower[0];
        let last = bands.upper[5] - bands.lower[5];
        assert!(last >= first);
    }

    #[test]
    fn test_in_sample_tail_length_and_accuracy() {
        let values: Vec<f64> = (0..48)
            .map(|i| 100.0 + 2.0 * i as f64 + ((i % 12) as f64) * 3.0)
            .collect();
        let model = SarimaModel::fit(&values, &params(0, 1, 0, 0, 1, 0)).unwrap();
        let preds = model.predict_in_sample_tail(12);
        assert_eq!(preds.len(), 12);
        // exact structure, so one-step predictions reproduce the series
        for (k, p) in preds.iter().enumerate() {
            assert_relative_eq!(*p, values[36 + k], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_insufficient_data() {
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let err = SarimaModel::fit(&values, &params(0, 1, 0, 0, 1, 0)).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { .. }));
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let values: Vec<f64> = (0..40).map(|i| i as f64 + noise(i)).collect();
        let model = SarimaModel::fit(&values, &params(0, 1, 0, 0, 0, 0)).unwrap();
        assert!(model.forecast(0).unwrap().is_empty());
    }
}
