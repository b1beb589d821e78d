//! Candidate fitting, scoring and model selection.
//!
//! The offline path: split each commodity series into a training prefix and a
//! held-out suffix, fit every family on the prefix, score each candidate by
//! MAPE on the suffix (plus a fixed-weight ensemble of all three) and keep the
//! winner as a persistable descriptor. Candidate failures are absorbed here;
//! a commodity only fails outright when no family fits at all.

use chrono::Datelike;

use crate::descriptor::ModelDescriptor;
use crate::error::{ForecastError, Result};
use crate::metrics::mape;
use crate::panel::{MonthlySeries, Panel};
use crate::sarima::{SarimaModel, SarimaParams};
use crate::smoothing::{HoltWinters, SeasonalMode, SmoothingParams};
use crate::store::ArtifactStore;
use crate::trend::{TrendSeasonalModel, FLEXIBILITY_GRID};

/// Ensemble combination weights, in family order.
pub const ENSEMBLE_WEIGHTS: [f64; 3] = [0.4, 0.3, 0.3];

/// Seasonal cycle length for monthly data.
pub const SEASONAL_PERIOD: usize = 12;

/// Training months used to rank seasonal AR grid combinations in-sample.
const SARIMA_RANKING_WINDOW: usize = 12;

/// Options governing the offline sweep.
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    /// Fraction of each series used as the training prefix.
    pub split_ratio: f64,
    /// Minimum resampled months a commodity needs to be trained at all.
    pub min_months: usize,
    /// Commodities whose smoothing family is fit on log prices.
    pub log_smoothing: Vec<String>,
}

impl Default for TrainingOptions {
    fn default() -> TrainingOptions {
        TrainingOptions {
            split_ratio: 0.8,
            min_months: 36,
            log_smoothing: Vec::new(),
        }
    }
}

/// Model families in fixed evaluation order. Score ties go to the earliest
/// family in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    SeasonalAr,
    Smoothing,
    TrendSeasonal,
    Ensemble,
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelFamily::SeasonalAr => "seasonal_ar",
            ModelFamily::Smoothing => "smoothing",
            ModelFamily::TrendSeasonal => "trend_seasonal",
            ModelFamily::Ensemble => "ensemble",
        };
        f.write_str(name)
    }
}

/// A candidate family and its held-out error.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub family: ModelFamily,
    pub mape: f64,
}

/// The selection result for one commodity.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub commodity: String,
    pub winner: ModelFamily,
    pub mape: f64,
    /// Full score table in evaluation order, absent families omitted.
    pub scores: Vec<CandidateScore>,
    pub descriptor: ModelDescriptor,
}

struct SarimaCandidate {
    params: SarimaParams,
    history: MonthlySeries,
    test_pred: Vec<f64>,
    test_mape: f64,
}

struct SmoothingCandidate {
    params: SmoothingParams,
    log_transformed: bool,
    history: MonthlySeries,
    test_pred: Vec<f64>,
    test_mape: f64,
}

struct TrendCandidate {
    model: TrendSeasonalModel,
    history: MonthlySeries,
    test_pred: Vec<f64>,
    test_mape: f64,
}

/// Fit and score every candidate family for one resampled commodity series,
/// returning the winning descriptor with its score table.
pub fn select_model(
    commodity: &str,
    series: &MonthlySeries,
    options: &TrainingOptions,
) -> Result<SelectionOutcome> {
    if series.len() < options.min_months {
        return Err(ForecastError::InsufficientData {
            needed: options.min_months,
            got: series.len(),
        });
    }
    let (train, test) = series.split(options.split_ratio);

    let sarima = fit_seasonal_ar(commodity, &train, &test);
    let smoothing = fit_smoothing(commodity, &train, &test, options);
    let trend = fit_trend(commodity, &train, &test);

    let mut scores = Vec::with_capacity(4);
    if let Some(c) = &sarima {
        scores.push(CandidateScore {
            family: ModelFamily::SeasonalAr,
            mape: c.test_mape,
        });
    }
    if let Some(c) = &smoothing {
        scores.push(CandidateScore {
            family: ModelFamily::Smoothing,
            mape: c.test_mape,
        });
    }
    if let Some(c) = &trend {
        scores.push(CandidateScore {
            family: ModelFamily::TrendSeasonal,
            mape: c.test_mape,
        });
    }
    if let Some(score) = ensemble_score(&test, &sarima, &smoothing, &trend) {
        scores.push(CandidateScore {
            family: ModelFamily::Ensemble,
            mape: score,
        });
    }

    let winner = pick_winner(&scores).cloned().ok_or_else(|| {
        ForecastError::Computation(format!("no candidate model could be fit for '{commodity}'"))
    })?;
    let descriptor = build_descriptor(winner.family, sarima, smoothing, trend)?;

    Ok(SelectionOutcome {
        commodity: commodity.to_string(),
        winner: winner.family,
        mape: winner.mape,
        scores,
        descriptor,
    })
}

/// Sweep every commodity in the panel, persisting each winner's artifact.
/// Commodities that are too short or fail every candidate are skipped with a
/// warning; store failures abort the batch.
pub fn train_panel(
    panel: &Panel,
    store: &ArtifactStore,
    options: &TrainingOptions,
) -> Result<Vec<SelectionOutcome>> {
    let mut outcomes = Vec::new();
    for commodity in panel.commodities() {
        let series = panel.series(&commodity)?;
        match select_model(&commodity, &series, options) {
            Ok(outcome) => {
                store.save(&commodity, &outcome.descriptor)?;
                tracing::info!(
                    commodity = %commodity,
                    winner = %outcome.winner,
                    mape = outcome.mape,
                    "model selected"
                );
                outcomes.push(outcome);
            }
            Err(err) if err.is_recoverable() => {
                tracing::warn!(commodity = %commodity, %err, "commodity skipped");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(outcomes)
}

/// Seasonal AR family: grid over every (p,d,q)(P,D,Q) combination on log
/// prices, ranked by one-step in-sample MAPE over the last year of training,
/// then scored once on the held-out suffix.
fn fit_seasonal_ar(
    commodity: &str,
    train: &MonthlySeries,
    test: &MonthlySeries,
) -> Option<SarimaCandidate> {
    let train_log = train.ln();
    let window = SARIMA_RANKING_WINDOW.min(train.len());
    let actual_tail = &train.values[train.len() - window..];

    let mut best: Option<(f64, SarimaModel)> = None;
    for params in SarimaParams::grid(SEASONAL_PERIOD) {
        let model = match SarimaModel::fit(&train_log.values, &params) {
            Ok(model) => model,
            Err(err) => {
                tracing::debug!(commodity = %commodity, ?params, %err, "grid combination skipped");
                continue;
            }
        };
        let pred: Vec<f64> = model
            .predict_in_sample_tail(window)
            .iter()
            .map(|v| v.exp())
            .collect();
        let score = match mape(actual_tail, &pred) {
            Ok(score) if score.is_finite() => score,
            _ => continue,
        };
        if best.as_ref().is_none_or(|(b, _)| score < *b) {
            best = Some((score, model));
        }
    }

    let (_, model) = best?;
    let bands = match model.forecast(test.len()) {
        Ok(bands) => bands,
        Err(err) => {
            tracing::debug!(commodity = %commodity, %err, "seasonal AR held-out forecast failed");
            return None;
        }
    };
    let test_pred: Vec<f64> = bands.point.iter().map(|v| v.exp()).collect();
    let test_mape = match mape(&test.values, &test_pred) {
        Ok(m) if m.is_finite() => m,
        _ => return None,
    };
    Some(SarimaCandidate {
        params: *model.params(),
        history: train_log,
        test_pred,
        test_mape,
    })
}

/// Smoothing family: a log-domain additive fit for commodities in the
/// override list (falling back to the grid on failure), otherwise a grid over
/// the seasonal mode on raw prices.
fn fit_smoothing(
    commodity: &str,
    train: &MonthlySeries,
    test: &MonthlySeries,
    options: &TrainingOptions,
) -> Option<SmoothingCandidate> {
    if options.log_smoothing.iter().any(|name| name == commodity) {
        let train_log = train.ln();
        let params = SmoothingParams::new(SeasonalMode::Additive, SEASONAL_PERIOD);
        match HoltWinters::fit(&train_log.values, &params) {
            Ok(model) => {
                let pred: Vec<f64> = model
                    .forecast(test.len())
                    .iter()
                    .map(|v| v.exp())
                    .collect();
                if let Ok(test_mape) = mape(&test.values, &pred) {
                    if test_mape.is_finite() {
                        tracing::debug!(commodity = %commodity, "smoothing fit on log prices");
                        return Some(SmoothingCandidate {
                            params,
                            log_transformed: true,
                            history: train_log,
                            test_pred: pred,
                            test_mape,
                        });
                    }
                }
            }
            Err(err) => {
                tracing::debug!(commodity = %commodity, %err, "log smoothing failed, using the seasonal-mode grid");
            }
        }
    }

    let mut best: Option<SmoothingCandidate> = None;
    for seasonal in [SeasonalMode::Additive, SeasonalMode::Multiplicative] {
        let params = SmoothingParams::new(seasonal, SEASONAL_PERIOD);
        let model = match HoltWinters::fit(&train.values, &params) {
            Ok(model) => model,
            Err(err) => {
                tracing::debug!(commodity = %commodity, ?seasonal, %err, "smoothing combination skipped");
                continue;
            }
        };
        let test_pred = model.forecast(test.len());
        let test_mape = match mape(&test.values, &test_pred) {
            Ok(m) if m.is_finite() => m,
            _ => continue,
        };
        if best.as_ref().is_none_or(|b| test_mape < b.test_mape) {
            best = Some(SmoothingCandidate {
                params,
                log_transformed: false,
                history: train.clone(),
                test_pred,
                test_mape,
            });
        }
    }
    best
}

/// Trend family: three flexibility settings (changepoint counts), scored on
/// the held-out suffix. Never log-transformed.
fn fit_trend(
    commodity: &str,
    train: &MonthlySeries,
    test: &MonthlySeries,
) -> Option<TrendCandidate> {
    let phase = train.months.first().map(|m| m.month0() as usize)?;

    let mut best: Option<TrendCandidate> = None;
    for changepoints in FLEXIBILITY_GRID {
        let model =
            match TrendSeasonalModel::fit(&train.values, phase, changepoints, SEASONAL_PERIOD) {
                Ok(model) => model,
                Err(err) => {
                    tracing::debug!(commodity = %commodity, changepoints, %err, "trend flexibility skipped");
                    continue;
                }
            };
        let bands = match model.forecast(test.len()) {
            Ok(bands) => bands,
            Err(err) => {
                tracing::debug!(commodity = %commodity, changepoints, %err, "trend forecast failed");
                continue;
            }
        };
        let test_mape = match mape(&test.values, &bands.point) {
            Ok(m) if m.is_finite() => m,
            _ => continue,
        };
        if best.as_ref().is_none_or(|b| test_mape < b.test_mape) {
            best = Some(TrendCandidate {
                model,
                history: train.clone(),
                test_pred: bands.point,
                test_mape,
            });
        }
    }
    best
}

/// Held-out MAPE of the fixed-weight combination, present only when all
/// three families produced a candidate.
fn ensemble_score(
    test: &MonthlySeries,
    sarima: &Option<SarimaCandidate>,
    smoothing: &Option<SmoothingCandidate>,
    trend: &Option<TrendCandidate>,
) -> Option<f64> {
    let (sar, hw, tr) = match (sarima, smoothing, trend) {
        (Some(sar), Some(hw), Some(tr)) => (sar, hw, tr),
        _ => return None,
    };
    let combined: Vec<f64> = (0..test.len())
        .map(|i| {
            ENSEMBLE_WEIGHTS[0] * sar.test_pred[i]
                + ENSEMBLE_WEIGHTS[1] * hw.test_pred[i]
                + ENSEMBLE_WEIGHTS[2] * tr.test_pred[i]
        })
        .collect();
    mape(&test.values, &combined).ok().filter(|m| m.is_finite())
}

/// Strict minimum over the score table; the first entry wins ties.
fn pick_winner(scores: &[CandidateScore]) -> Option<&CandidateScore> {
    let mut winner: Option<&CandidateScore> = None;
    for candidate in scores {
        match winner {
            Some(best) if candidate.mape < best.mape => winner = Some(candidate),
            None => winner = Some(candidate),
            _ => {}
        }
    }
    winner
}

fn build_descriptor(
    family: ModelFamily,
    sarima: Option<SarimaCandidate>,
    smoothing: Option<SmoothingCandidate>,
    trend: Option<TrendCandidate>,
) -> Result<ModelDescriptor> {
    let descriptor = match family {
        ModelFamily::SeasonalAr => sarima.map(|c| ModelDescriptor::SeasonalAr {
            log_transformed: true,
            params: c.params,
            history: c.history,
        }),
        ModelFamily::Smoothing => smoothing.map(|c| ModelDescriptor::Smoothing {
            log_transformed: c.log_transformed,
            params: c.params,
            history: c.history,
        }),
        ModelFamily::TrendSeasonal => trend.map(|c| ModelDescriptor::TrendSeasonal {
            log_transformed: false,
            model: c.model,
            history: c.history,
        }),
        ModelFamily::Ensemble => match (sarima, smoothing, trend) {
            (Some(sar), Some(hw), Some(tr)) => Some(ModelDescriptor::Ensemble {
                weights: ENSEMBLE_WEIGHTS.to_vec(),
                members: vec![
                    ModelDescriptor::SeasonalAr {
                        log_transformed: true,
                        params: sar.params,
                        history: sar.history,
                    },
                    ModelDescriptor::Smoothing {
                        log_transformed: hw.log_transformed,
                        params: hw.params,
                        history: hw.history,
                    },
                    ModelDescriptor::TrendSeasonal {
                        log_transformed: false,
                        model: tr.model,
                        history: tr.history,
                    },
                ],
            }),
            _ => None,
        },
    };
    descriptor.ok_or_else(|| {
        ForecastError::Computation("selected family has no fitted candidate".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly_series(start_year: i32, n: usize, gen: impl Fn(usize) -> f64) -> MonthlySeries {
        let months = (0..n)
            .map(|i| {
                NaiveDate::from_ymd_opt(start_year + (i / 12) as i32, (i % 12 + 1) as u32, 1)
                    .unwrap()
            })
            .collect();
        MonthlySeries {
            months,
            values: (0..n).map(gen).collect(),
        }
    }

    fn seasonal_prices(i: usize) -> f64 {
        let angle = 2.0 * std::f64::consts::PI * (i % 12) as f64 / 12.0;
        let noise = ((i * 37) % 11) as f64 * 0.1 - 0.5;
        12_000.0 + 45.0 * i as f64 + 600.0 * angle.sin() + noise
    }

    #[test]
    fn test_tie_break_prefers_earliest_family() {
        let scores = vec![
            CandidateScore {
                family: ModelFamily::SeasonalAr,
                mape: 8.2,
            },
            CandidateScore {
                family: ModelFamily::Smoothing,
                mape: 6.5,
            },
            CandidateScore {
                family: ModelFamily::TrendSeasonal,
                mape: 9.0,
            },
            CandidateScore {
                family: ModelFamily::Ensemble,
                mape: 6.5,
            },
        ];
        let winner = pick_winner(&scores).unwrap();
        assert_eq!(winner.family, ModelFamily::Smoothing);
    }

    #[test]
    fn test_two_years_of_data_is_not_enough() {
        let series = monthly_series(2023, 24, seasonal_prices);
        let err = select_model("Beras", &series, &TrainingOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientData { needed: 36, got: 24 }
        ));
    }

    #[test]
    fn test_selects_a_model_on_a_seasonal_series() {
        let series = monthly_series(2021, 48, seasonal_prices);
        let outcome = select_model("Beras", &series, &TrainingOptions::default()).unwrap();

        assert!(!outcome.scores.is_empty());
        assert_eq!(outcome.descriptor.model_type(), outcome.winner.to_string());
        assert!(outcome.mape.is_finite() && outcome.mape >= 0.0);
        // winner holds the strict minimum of the table
        for score in &outcome.scores {
            assert!(outcome.mape <= score.mape);
        }
    }

    #[test]
    fn test_log_override_fits_smoothing_on_log_prices() {
        let series = monthly_series(2021, 48, seasonal_prices);
        let (train, test) = series.split(0.8);
        let options = TrainingOptions {
            log_smoothing: vec!["Cabai Rawit Hijau".to_string()],
            ..TrainingOptions::default()
        };

        let candidate = fit_smoothing("Cabai Rawit Hijau", &train, &test, &options).unwrap();
        assert!(candidate.log_transformed);
        assert_relative_eq_history(&candidate.history, &train.ln());

        let plain = fit_smoothing("Beras", &train, &test, &options).unwrap();
        assert!(!plain.log_transformed);
    }

    fn assert_relative_eq_history(got: &MonthlySeries, want: &MonthlySeries) {
        assert_eq!(got.months, want.months);
        for (g, w) in got.values.iter().zip(&want.values) {
            approx::assert_relative_eq!(*g, *w, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ensemble_descriptor_needs_every_family() {
        let series = monthly_series(2021, 48, seasonal_prices);
        let (train, test) = series.split(0.8);
        let sar = fit_seasonal_ar("Beras", &train, &test).unwrap();
        let tr = fit_trend("Beras", &train, &test).unwrap();

        let err = build_descriptor(ModelFamily::Ensemble, Some(sar), None, Some(tr)).unwrap_err();
        assert!(matches!(err, ForecastError::Computation(_)));
    }

    #[test]
    fn test_train_panel_skips_short_commodities() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let mut rows = Vec::new();
        for i in 0..48usize {
            let label = format!("01/{:02}/{}", i % 12 + 1, 2021 + i / 12);
            let long = format!("{:.2}", seasonal_prices(i));
            // second commodity only has two years of quotes
            let short = if i < 24 {
                format!("{:.2}", 900.0 + i as f64)
            } else {
                "-".to_string()
            };
            rows.push((label, vec![long, short]));
        }
        let table = crate::panel::WideTable {
            commodities: vec!["Beras".to_string(), "Garam".to_string()],
            rows,
        };
        let panel = crate::panel::build_panel(&table);

        let outcomes = train_panel(&panel, &store, &TrainingOptions::default()).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].commodity, "Beras");
        assert_eq!(store.list().unwrap(), vec!["Beras"]);
    }
}
