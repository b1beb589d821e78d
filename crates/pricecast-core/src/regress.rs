//! Shared least-squares helper for the model families.

use anofox_regression::prelude::*;

use crate::error::{ForecastError, Result};

/// A fitted ordinary least squares regression.
///
/// `intercept` is zero when the model was fit without one, so callers can
/// always predict as `intercept + betas . row`.
#[derive(Debug, Clone)]
pub(crate) struct OlsFit {
    pub intercept: f64,
    pub betas: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
}

/// Fit y = X * beta (+ intercept) using anofox-regression over faer.
///
/// `x` holds one column per regressor. Fails on shape mismatches,
/// underdetermined systems, and singular or non-finite fits; grid-search
/// callers treat those failures as a skipped combination.
pub(crate) fn fit_ols(y: &[f64], x: &[Vec<f64>], with_intercept: bool) -> Result<OlsFit> {
    let n = y.len();
    let k = x.len();

    if n == 0 || k == 0 {
        return Err(ForecastError::InvalidInput(
            "regression needs at least one observation and one regressor".to_string(),
        ));
    }
    if x.iter().any(|col| col.len() != n) {
        return Err(ForecastError::InvalidInput(
            "regressor columns must match the length of y".to_string(),
        ));
    }
    let min_rows = k + usize::from(with_intercept);
    if n <= min_rows {
        return Err(ForecastError::InsufficientData {
            needed: min_rows + 1,
            got: n,
        });
    }

    // Design matrix: n observations x k regressors
    let x_mat = faer::Mat::from_fn(n, k, |i, j| x[j][i]);
    let y_col = faer::Col::from_fn(n, |i| y[i]);

    let fitted = OlsRegressor::builder()
        .with_intercept(with_intercept)
        .build()
        .fit(&x_mat, &y_col)
        .map_err(|_| {
            ForecastError::Computation("singular or ill-conditioned regression system".to_string())
        })?;

    let intercept = if with_intercept {
        fitted.intercept().unwrap_or(0.0)
    } else {
        0.0
    };
    let coeffs_col = fitted.coefficients();
    let mut betas = Vec::with_capacity(coeffs_col.nrows());
    for i in 0..coeffs_col.nrows() {
        betas.push(coeffs_col[i]);
    }

    if !intercept.is_finite() || betas.iter().any(|b| !b.is_finite()) {
        return Err(ForecastError::Computation(
            "regression produced non-finite coefficients".to_string(),
        ));
    }

    let predictions = fitted.predict(&x_mat);
    let fitted_vals: Vec<f64> = (0..n).map(|i| predictions[i]).collect();
    let residuals: Vec<f64> = (0..n).map(|i| y[i] - fitted_vals[i]).collect();

    Ok(OlsFit {
        intercept,
        betas,
        fitted: fitted_vals,
        residuals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_linear_relationship() {
        // y = 2 + 3x, exactly
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 + 3.0 * v).collect();
        let fit = fit_ols(&y, &[x], true).unwrap();

        assert_relative_eq!(fit.intercept, 2.0, epsilon = 1e-6);
        assert_relative_eq!(fit.betas[0], 3.0, epsilon = 1e-6);
        for r in &fit.residuals {
            assert!(r.abs() < 1e-6);
        }
    }

    #[test]
    fn test_no_intercept_passes_through_origin() {
        let x: Vec<f64> = (1..30).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.5 * v).collect();
        let fit = fit_ols(&y, &[x], false).unwrap();

        assert_relative_eq!(fit.intercept, 0.0, epsilon = 1e-12);
        assert_relative_eq!(fit.betas[0], 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let y = vec![1.0, 2.0, 3.0];
        let x = vec![vec![1.0, 2.0]];
        assert!(fit_ols(&y, &x, true).is_err());
    }

    #[test]
    fn test_rejects_underdetermined_system() {
        let y = vec![1.0, 2.0];
        let x = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(matches!(
            fit_ols(&y, &x, true),
            Err(ForecastError::InsufficientData { .. })
        ));
    }
}
