use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::{Deserialize, Serialize};

use loom_core::{DEFAULT_MIN_CLUSTER_SIZE, MAX_MIN_CLUSTER_SIZE, Strategy};

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "records.db";
pub const DEFAULT_MAX_RECORDS: usize = 500;

/// Default base directory for all loom storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".loom")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

pub fn db_path(base_dir: &Path) -> PathBuf {
    base_dir.join(DB_FILE)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub clustering: ClusteringConfig,
    pub graph: GraphConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusteringConfig {
    pub strategy: Strategy,
    pub min_cluster_size: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Cap on records fed to graph building and clustering.
    pub max_records: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

impl Config {
    /// Read `<base_dir>/config.toml`. A missing file yields defaults.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let config = Self::parse(&text)
                    .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
                tracing::debug!("loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.clustering.min_cluster_size = config
            .clustering
            .min_cluster_size
            .clamp(1, MAX_MIN_CLUSTER_SIZE);
        if config.graph.max_records == 0 {
            return Err("graph.max_records must be at least 1".to_string());
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.clustering.strategy, Strategy::Smart);
        assert_eq!(config.clustering.min_cluster_size, 2);
        assert_eq!(config.graph.max_records, 500);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse("[clustering]\nstrategy = \"temporal\"\n").unwrap();
        assert_eq!(config.clustering.strategy, Strategy::Temporal);
        assert_eq!(config.clustering.min_cluster_size, 2);
        assert_eq!(config.graph.max_records, 500);
    }

    #[test]
    fn test_min_cluster_size_clamped() {
        let high = Config::parse("[clustering]\nmin_cluster_size = 50\n").unwrap();
        assert_eq!(high.clustering.min_cluster_size, 10);
        let zero = Config::parse("[clustering]\nmin_cluster_size = 0\n").unwrap();
        assert_eq!(zero.clustering.min_cluster_size, 1);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[clustering]\nstrategy = \"vibes\"\n").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)), "{err}");

        assert!(Config::parse("[graph]\nmax_records = 0\n").is_err());
        assert!(Config::parse("[graph]\nunknown = 1\n").is_err());
        assert!(Config::parse("not = [toml").is_err());
    }

    #[test]
    fn test_to_toml_parses_back() {
        let mut config = Config::default();
        config.clustering.strategy = Strategy::Content;
        let text = config.to_toml().unwrap();
        assert!(text.contains("strategy = \"content\""));
        assert_eq!(Config::parse(&text).unwrap(), config);
    }

    #[test]
    fn test_db_path() {
        assert_eq!(
            db_path(Path::new("/tmp/loom")),
            PathBuf::from("/tmp/loom/records.db")
        );
        assert!(default_base_dir().ends_with(".loom"));
    }
}
