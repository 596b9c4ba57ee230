use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SEARCH_ROOT: &str = ".trackio";
pub const DEFAULT_BIND: &str = "127.0.0.1:7860";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CohortSpec {
    pub label: String,
    pub marker: String,
}

impl CohortSpec {
    pub fn new(label: &str, marker: &str) -> Self {
        Self {
            label: label.to_string(),
            marker: marker.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DashboardConfig {
    /// Explicit database file. When unset the first `*.db` under `search_root` is used.
    pub database: Option<PathBuf>,
    pub search_root: PathBuf,
    pub bind: String,
    pub log_dir: Option<PathBuf>,
    pub cohort_a: CohortSpec,
    pub cohort_b: CohortSpec,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            database: None,
            search_root: PathBuf::from(DEFAULT_SEARCH_ROOT),
            bind: DEFAULT_BIND.to_string(),
            log_dir: None,
            cohort_a: CohortSpec::new("Q8", "q8"),
            cohort_b: CohortSpec::new("Q3", "q3"),
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read {}: {}", path.display(), err)))?;
        let config = Self::from_yaml(&raw)?;
        tracing::debug!(path = %path.display(), "loaded dashboard config");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> AppResult<Self> {
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        for cohort in [&self.cohort_a, &self.cohort_b] {
            if cohort.marker.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "cohort '{}' needs a non-empty marker",
                    cohort.label
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DashboardConfig, DEFAULT_SEARCH_ROOT};
    use crate::errors::AppError;
    use std::path::PathBuf;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = DashboardConfig::from_yaml("database: runs/metrics.db\n").expect("config");
        assert_eq!(config.database, Some(PathBuf::from("runs/metrics.db")));
        assert_eq!(config.search_root, PathBuf::from(DEFAULT_SEARCH_ROOT));
        assert_eq!(config.cohort_a.marker, "q8");
        assert_eq!(config.cohort_b.label, "Q3");
    }

    #[test]
    fn empty_file_is_default_config() {
        assert_eq!(DashboardConfig::from_yaml("  \n").expect("config"), DashboardConfig::default());
    }

    #[test]
    fn rejects_blank_marker() {
        let err = DashboardConfig::from_yaml("cohort_b:\n  label: Q3\n  marker: ''\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dashboard.yaml");
        std::fs::write(&path, "bind: 0.0.0.0:9000\ncohort_a:\n  label: Octal\n  marker: q8\n").expect("write");
        let config = DashboardConfig::load(&path).expect("load");
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.cohort_a.label, "Octal");
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = DashboardConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
