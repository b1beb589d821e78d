//! Persisted model artifacts.
//!
//! A descriptor is everything serving needs without the raw panel: the chosen
//! family, its hyperparameters (or the fitted model itself for the trend
//! family) and the training history the model is refit from. Descriptors are
//! immutable once written; every prediction request reconstructs from scratch.

use serde::{Deserialize, Serialize};

use crate::panel::MonthlySeries;
use crate::sarima::SarimaParams;
use crate::smoothing::SmoothingParams;
use crate::trend::TrendSeasonalModel;

/// Tagged artifact record, one variant per model family.
///
/// `log_transformed` marks that `history` and the model operate on natural-log
/// prices and every forecast column must be exponentiated before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum ModelDescriptor {
    SeasonalAr {
        log_transformed: bool,
        params: SarimaParams,
        history: MonthlySeries,
    },
    Smoothing {
        log_transformed: bool,
        params: SmoothingParams,
        history: MonthlySeries,
    },
    TrendSeasonal {
        log_transformed: bool,
        model: TrendSeasonalModel,
        history: MonthlySeries,
    },
    Ensemble {
        weights: Vec<f64>,
        members: Vec<ModelDescriptor>,
    },
}

impl ModelDescriptor {
    /// The wire tag, for logs and reports.
    pub fn model_type(&self) -> &'static str {
        match self {
            ModelDescriptor::SeasonalAr { .. } => "seasonal_ar",
            ModelDescriptor::Smoothing { .. } => "smoothing",
            ModelDescriptor::TrendSeasonal { .. } => "trend_seasonal",
            ModelDescriptor::Ensemble { .. } => "ensemble",
        }
    }

    /// Training history, `None` for ensembles (members carry their own).
    pub fn history(&self) -> Option<&MonthlySeries> {
        match self {
            ModelDescriptor::SeasonalAr { history, .. }
            | ModelDescriptor::Smoothing { history, .. }
            | ModelDescriptor::TrendSeasonal { history, .. } => Some(history),
            ModelDescriptor::Ensemble { .. } => None,
        }
    }
}
