//! Configuration file handling and flag/file/default resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pricecast_core::TrainingOptions;
use serde::Deserialize;

/// Models directory used when neither a flag nor the config names one.
pub const DEFAULT_MODELS_DIR: &str = "models";

/// On-disk configuration. Every field is optional: command-line flags win
/// over file values, library defaults fill the rest.
///
/// ```toml
/// data = "prices.csv"
/// models_dir = "models"
///
/// [training]
/// split_ratio = 0.8
/// min_months = 36
/// log_smoothing = ["Cabai Rawit Hijau"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub data: Option<PathBuf>,
    pub models_dir: Option<PathBuf>,
    #[serde(default)]
    pub training: TrainingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingSection {
    pub split_ratio: Option<f64>,
    pub min_months: Option<usize>,
    pub log_smoothing: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<FileConfig> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Load the given file, or start from an empty config without one.
    pub fn load_or_default(path: Option<&Path>) -> Result<FileConfig> {
        match path {
            Some(path) => FileConfig::load(path),
            None => Ok(FileConfig::default()),
        }
    }

    /// Models directory with flag-over-file-over-default precedence.
    pub fn models_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.models_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR))
    }

    /// Training options with file values over library defaults.
    pub fn training_options(&self) -> TrainingOptions {
        let defaults = TrainingOptions::default();
        TrainingOptions {
            split_ratio: self.training.split_ratio.unwrap_or(defaults.split_ratio),
            min_months: self.training.min_months.unwrap_or(defaults.min_months),
            log_smoothing: self
                .training
                .log_smoothing
                .clone()
                .unwrap_or(defaults.log_smoothing),
        }
    }
}
