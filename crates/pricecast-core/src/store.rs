//! File-backed artifact storage.
//!
//! One pretty-printed JSON descriptor per commodity under a models directory.
//! The file stem is the commodity name with spaces replaced by underscores,
//! so listing is the inverse mapping over `*.json` entries.

use std::fs;
use std::path::{Path, PathBuf};

use crate::descriptor::ModelDescriptor;
use crate::error::{ForecastError, Result};

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> ArtifactStore {
        ArtifactStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path for a commodity, whether or not it exists yet.
    pub fn path_for(&self, commodity: &str) -> PathBuf {
        self.dir.join(artifact_file_name(commodity))
    }

    /// Persist a descriptor, creating the models directory if needed.
    pub fn save(&self, commodity: &str, descriptor: &ModelDescriptor) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(commodity);
        let json = serde_json::to_string_pretty(descriptor)?;
        fs::write(&path, json)?;
        tracing::debug!(commodity = %commodity, path = %path.display(), "artifact written");
        Ok(path)
    }

    pub fn load(&self, commodity: &str) -> Result<ModelDescriptor> {
        let path = self.path_for(commodity);
        if !path.is_file() {
            return Err(ForecastError::CommodityNotFound(commodity.to_string()));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Commodities with a stored artifact, sorted by name. A missing models
    /// directory lists as empty rather than erroring.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.dir.is_dir() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.dir)? {
            let file_name = entry?.file_name();
            if let Some(commodity) = commodity_from_file_name(&file_name.to_string_lossy()) {
                names.push(commodity);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn artifact_file_name(commodity: &str) -> String {
    format!("{}.json", commodity.replace(' ', "_"))
}

fn commodity_from_file_name(name: &str) -> Option<String> {
    name.strip_suffix(".json")
        .map(|stem| stem.replace('_', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::MonthlySeries;
    use crate::smoothing::{SeasonalMode, SmoothingParams};
    use chrono::NaiveDate;

    fn sample_descriptor() -> ModelDescriptor {
        let months: Vec<NaiveDate> = (0..24)
            .map(|i| {
                NaiveDate::from_ymd_opt(2023 + i / 12, (i % 12 + 1) as u32, 1)
                    .unwrap()
            })
            .collect();
        ModelDescriptor::Smoothing {
            log_transformed: false,
            params: SmoothingParams::new(SeasonalMode::Additive, 12),
            history: MonthlySeries {
                months,
                values: (0..24).map(|i| 12_000.0 + 10.0 * i as f64).collect(),
            },
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let descriptor = sample_descriptor();
        let path = store.save("Beras Premium", &descriptor).unwrap();
        assert_eq!(path.file_name().unwrap(), "Beras_Premium.json");

        let loaded = store.load("Beras Premium").unwrap();
        assert_eq!(loaded, descriptor);
    }

    #[test]
    fn test_load_unknown_commodity() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            store.load("Cabai Rawit"),
            Err(ForecastError::CommodityNotFound(name)) if name == "Cabai Rawit"
        ));
    }

    #[test]
    fn test_list_reverses_the_key_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let descriptor = sample_descriptor();
        store.save("Minyak Goreng Curah", &descriptor).unwrap();
        store.save("Beras", &descriptor).unwrap();
        fs::write(dir.path().join("notes.txt"), "not an artifact").unwrap();

        assert_eq!(store.list().unwrap(), vec!["Beras", "Minyak Goreng Curah"]);
    }

    #[test]
    fn test_list_is_empty_without_a_models_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("never_created"));
        assert!(store.list().unwrap().is_empty());
    }
}
