//! Explorer settings.
//!
//! Loaded from `dashkit.toml`:
//!
//! ```toml
//! tables = ["samples_mart.results"]
//! row_limit = 5000
//! value_field = "value"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ExplorerError, ExplorerResult};

/// File name looked up by [`ExplorerConfig::discover`].
pub const CONFIG_FILE: &str = "dashkit.toml";

/// Where queries read from and how many rows they return.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Tables listed in FROM.
    pub tables: Vec<String>,
    /// Row cap applied as LIMIT.
    pub row_limit: usize,
    /// Field the aggregations summarize.
    pub value_field: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            tables: vec!["samples_mart.results".to_string()],
            row_limit: 5000,
            value_field: "value".to_string(),
        }
    }
}

impl ExplorerConfig {
    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> ExplorerResult<Self> {
        let config: ExplorerConfig =
            toml::from_str(content).map_err(|e| ExplorerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a file.
    pub fn load(path: impl AsRef<Path>) -> ExplorerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExplorerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded settings from {}", path.display());
        Self::from_toml(&content)
    }

    /// Load `dashkit.toml` from the working directory, then from the user
    /// config directory; defaults when neither exists.
    pub fn discover() -> ExplorerResult<Self> {
        match Self::candidate_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("dashkit").join(CONFIG_FILE));
        }
        paths
    }

    fn validate(&self) -> ExplorerResult<()> {
        if self.tables.is_empty() {
            return Err(ExplorerError::Config("tables must not be empty".to_string()));
        }
        if self.tables.iter().any(|t| t.trim().is_empty()) {
            return Err(ExplorerError::Config("tables must not contain blank names".to_string()));
        }
        if self.row_limit == 0 {
            return Err(ExplorerError::Config("row_limit must be positive".to_string()));
        }
        if self.value_field.trim().is_empty() {
            return Err(ExplorerError::Config("value_field must not be empty".to_string()));
        }
        Ok(())
    }
}
