//! Holt-Winters exponential smoothing family.
//!
//! Additive trend with either additive or multiplicative seasonality. The
//! smoothing weights are not free parameters of the artifact: a refit chooses
//! them again with the same deterministic grid, so history plus
//! [`SmoothingParams`] reproduce the model exactly.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

const ALPHA_GRID: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];
const BETA_GRID: [f64; 4] = [0.05, 0.1, 0.2, 0.3];
const GAMMA_GRID: [f64; 4] = [0.05, 0.1, 0.2, 0.3];

/// Trend component mode. Only additive trend is used by this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMode {
    Additive,
}

/// Seasonal component mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalMode {
    Additive,
    Multiplicative,
}

/// Hyperparameters that fully determine a refit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub trend: TrendMode,
    pub seasonal: SeasonalMode,
    pub period: usize,
}

impl SmoothingParams {
    pub fn new(seasonal: SeasonalMode, period: usize) -> SmoothingParams {
        SmoothingParams {
            trend: TrendMode::Additive,
            seasonal,
            period,
        }
    }
}

/// A fitted Holt-Winters model.
#[derive(Debug, Clone)]
pub struct HoltWinters {
    params: SmoothingParams,
    alpha: f64,
    beta: f64,
    gamma: f64,
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
    train_len: usize,
    sse: f64,
}

struct SmoothingState {
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
    sse: f64,
}

impl HoltWinters {
    /// Fit on `values`, choosing smoothing weights by one-step-ahead squared
    /// error over a fixed grid. Needs two full seasonal cycles; multiplicative
    /// seasonality additionally needs strictly positive values.
    pub fn fit(values: &[f64], params: &SmoothingParams) -> Result<HoltWinters> {
        let p = params.period;
        if p < 2 {
            return Err(ForecastError::InvalidInput(format!(
                "seasonal period must be at least 2, got {p}"
            )));
        }
        if values.len() < 2 * p {
            return Err(ForecastError::InsufficientData {
                needed: 2 * p,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(
                "series contains non-finite values".to_string(),
            ));
        }
        if params.seasonal == SeasonalMode::Multiplicative && values.iter().any(|v| *v <= 0.0) {
            return Err(ForecastError::Computation(
                "multiplicative seasonality requires strictly positive values".to_string(),
            ));
        }

        let mut best: Option<(f64, f64, f64, SmoothingState)> = None;
        for &alpha in &ALPHA_GRID {
            for &beta in &BETA_GRID {
                for &gamma in &GAMMA_GRID {
                    let state = run_smoothing(values, params.seasonal, p, alpha, beta, gamma);
                    let Some(state) = state else { continue };
                    let better = match &best {
                        Some((_, _, _, b)) => state.sse < b.sse,
                        None => true,
                    };
                    if better {
                        best = Some((alpha, beta, gamma, state));
                    }
                }
            }
        }

        let Some((alpha, beta, gamma, state)) = best else {
            return Err(ForecastError::Computation(
                "no smoothing weight combination produced a finite fit".to_string(),
            ));
        };

        Ok(HoltWinters {
            params: *params,
            alpha,
            beta,
            gamma,
            level: state.level,
            trend: state.trend,
            seasonal: state.seasonal,
            train_len: values.len(),
            sse: state.sse,
        })
    }

    pub fn params(&self) -> &SmoothingParams {
        &self.params
    }

    pub fn weights(&self) -> (f64, f64, f64) {
        (self.alpha, self.beta, self.gamma)
    }

    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// Point forecasts for `horizon` steps past the end of training. This
    /// family has no native interval machinery.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let p = self.params.period;
        (1..=horizon)
            .map(|h| {
                let base = self.level + self.trend * h as f64;
                let seas = self.seasonal[(self.train_len + h - 1) % p];
                match self.params.seasonal {
                    SeasonalMode::Additive => base + seas,
                    SeasonalMode::Multiplicative => base * seas,
                }
            })
            .collect()
    }
}

/// One pass of the Holt-Winters recursion, returning the final state and the
/// one-step-ahead SSE. Returns `None` when the recursion degenerates.
fn run_smoothing(
    values: &[f64],
    mode: SeasonalMode,
    p: usize,
    alpha: f64,
    beta: f64,
    gamma: f64,
) -> Option<SmoothingState> {
    let initial_level: f64 = values[..p].iter().sum::<f64>() / p as f64;
    let mut level = initial_level;
    let mut trend = (values[p..2 * p].iter().sum::<f64>() / p as f64 - initial_level) / p as f64;

    let mut seasonal: Vec<f64> = match mode {
        SeasonalMode::Additive => values[..p].iter().map(|v| v - initial_level).collect(),
        SeasonalMode::Multiplicative => values[..p]
            .iter()
            .map(|v| v / initial_level.max(0.001))
            .collect(),
    };

    let mut sse = 0.0;
    for (i, &v) in values.iter().enumerate().skip(p) {
        let s_idx = i % p;
        let one_step = match mode {
            SeasonalMode::Additive => level + trend + seasonal[s_idx],
            SeasonalMode::Multiplicative => (level + trend) * seasonal[s_idx],
        };
        sse += (v - one_step).powi(2);

        let prev_level = level;
        match mode {
            SeasonalMode::Additive => {
                level = alpha * (v - seasonal[s_idx]) + (1.0 - alpha) * (level + trend);
                trend = beta * (level - prev_level) + (1.0 - beta) * trend;
                seasonal[s_idx] = gamma * (v - level) + (1.0 - gamma) * seasonal[s_idx];
            }
            SeasonalMode::Multiplicative => {
                level = alpha * (v / seasonal[s_idx].max(0.001)) + (1.0 - alpha) * (level + trend);
                trend = beta * (level - prev_level) + (1.0 - beta) * trend;
                seasonal[s_idx] = gamma * (v / level.max(0.001)) + (1.0 - gamma) * seasonal[s_idx];
            }
        }
    }

    if !level.is_finite() || !trend.is_finite() || !sse.is_finite() {
        return None;
    }
    Some(SmoothingState {
        level,
        trend,
        seasonal,
        sse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERN: [f64; 4] = [0.0, 5.0, 2.0, -4.0];

    fn additive_series(n: usize) -> Vec<f64> {
        (0..n).map(|i| 50.0 + i as f64 + PATTERN[i % 4]).collect()
    }

    #[test]
    fn test_additive_fit_continues_pattern() {
        let values = additive_series(40);
        let params = SmoothingParams::new(SeasonalMode::Additive, 4);
        let model = HoltWinters::fit(&values, &params).unwrap();
        let forecast = model.forecast(4);

        assert_eq!(forecast.len(), 4);
        for (h, f) in forecast.iter().enumerate() {
            let i = 40 + h;
            let expected = 50.0 + i as f64 + PATTERN[i % 4];
            assert!(
                (f - expected).abs() < 2.0,
                "step {h}: forecast {f} vs expected {expected}"
            );
        }
    }

    #[test]
    fn test_multiplicative_fit_tracks_scale() {
        let pattern = [1.0, 1.2, 0.9, 0.9];
        let values: Vec<f64> = (0..40)
            .map(|i| (100.0 + 2.0 * i as f64) * pattern[i % 4])
            .collect();
        let params = SmoothingParams::new(SeasonalMode::Multiplicative, 4);
        let model = HoltWinters::fit(&values, &params).unwrap();
        let forecast = model.forecast(4);

        for (h, f) in forecast.iter().enumerate() {
            let i = 40 + h;
            let expected = (100.0 + 2.0 * i as f64) * pattern[i % 4];
            let rel = (f - expected).abs() / expected;
            assert!(rel < 0.1, "step {h}: forecast {f} vs expected {expected}");
        }
    }

    #[test]
    fn test_multiplicative_rejects_nonpositive() {
        let mut values = additive_series(40);
        values[10] = 0.0;
        let params = SmoothingParams::new(SeasonalMode::Multiplicative, 4);
        assert!(matches!(
            HoltWinters::fit(&values, &params),
            Err(ForecastError::Computation(_))
        ));
    }

    #[test]
    fn test_deterministic_refit() {
        let values = additive_series(40);
        let params = SmoothingParams::new(SeasonalMode::Additive, 4);
        let a = HoltWinters::fit(&values, &params).unwrap();
        let b = HoltWinters::fit(&values, &params).unwrap();

        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.forecast(6), b.forecast(6));
    }

    #[test]
    fn test_requires_two_cycles() {
        let values = additive_series(7);
        let params = SmoothingParams::new(SeasonalMode::Additive, 4);
        assert!(matches!(
            HoltWinters::fit(&values, &params),
            Err(ForecastError::InsufficientData { needed: 8, got: 7 })
        ));
    }

    #[test]
    fn test_rejects_degenerate_period() {
        let values = additive_series(40);
        let params = SmoothingParams::new(SeasonalMode::Additive, 1);
        assert!(matches!(
            HoltWinters::fit(&values, &params),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_zero_horizon() {
        let values = additive_series(40);
        let params = SmoothingParams::new(SeasonalMode::Additive, 4);
        let model = HoltWinters::fit(&values, &params).unwrap();
        assert!(model.forecast(0).is_empty());
    }
}
