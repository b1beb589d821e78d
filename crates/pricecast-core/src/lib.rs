//! Core library for monthly commodity price forecasting.
//!
//! This crate provides the offline model-selection pipeline (panel building,
//! candidate fitting, held-out scoring, artifact persistence) and the online
//! serving path (forecast reconciliation and ensemble combination).

pub mod calendar;
pub mod descriptor;
pub mod ensemble;
pub mod error;
pub mod metrics;
pub mod panel;
pub mod reconcile;
mod regress;
pub mod sarima;
pub mod selection;
pub mod smoothing;
pub mod store;
pub mod trend;

// Re-exports for convenience
pub use calendar::{months_between, parse_month_label, start_of_month};
pub use descriptor::ModelDescriptor;
pub use ensemble::{combine, predict};
pub use error::{ForecastError, Result};
pub use metrics::mape;
pub use panel::{build_panel, MonthlySeries, Panel, PanelEntry, WideTable};
pub use reconcile::{reconcile, ForecastRow};
pub use sarima::{ArimaOrder, ForecastBands, SarimaModel, SarimaParams, SeasonalOrder};
pub use selection::{
    select_model, train_panel, CandidateScore, ModelFamily, SelectionOutcome, TrainingOptions,
    ENSEMBLE_WEIGHTS, SEASONAL_PERIOD,
};
pub use smoothing::{HoltWinters, SeasonalMode, SmoothingParams, TrendMode};
pub use store::ArtifactStore;
pub use trend::{TrendSeasonalModel, FLEXIBILITY_GRID};
