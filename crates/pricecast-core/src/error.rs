//! Error types for the pricecast pipeline.

use thiserror::Error;

/// Result type for pricecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Error types for training and serving operations.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("No model artifact found for commodity '{0}'")]
    CommodityNotFound(String),

    #[error("All ensemble members failed or produced no rows")]
    EnsembleExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl ForecastError {
    /// True for failures that a grid search absorbs by skipping the
    /// combination instead of aborting the sweep.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ForecastError::Computation(_) | ForecastError::InsufficientData { .. }
        )
    }
}
