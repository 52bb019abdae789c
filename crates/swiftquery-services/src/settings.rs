//! Workbench settings persisted as JSON in the user's config directory

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use swiftquery_core::DEFAULT_PAGE_SIZE;
use swiftquery_query::CoordinatorConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkbenchSettings {
    pub execution: ExecutionSettings,
    pub schema: SchemaSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Rows per result page; zero falls back to the default
    pub page_size: usize,
    /// Maximum number of executions kept in history
    pub history_limit: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            history_limit: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// How long a loaded schema tree is reused before reloading
    pub cache_ttl_secs: u64,
    /// LIMIT of queries generated from the schema browser
    pub generated_query_limit: usize,
    /// Schema whose name is left out of generated queries
    pub default_schema: String,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            generated_query_limit: 100,
            default_schema: "main".to_string(),
        }
    }
}

impl WorkbenchSettings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Self =
            serde_json::from_str(&content).with_context(|| "Failed to parse settings JSON")?;
        Ok(settings.normalized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;
        Ok(config_dir.join("swiftquery").join("settings.json"))
    }

    /// Replace out-of-range values with their defaults
    pub fn normalized(mut self) -> Self {
        if self.execution.page_size == 0 {
            tracing::warn!("page_size of 0 in settings, using default");
            self.execution.page_size = DEFAULT_PAGE_SIZE;
        }
        self
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            page_size: self.execution.page_size.max(1),
            history_limit: self.execution.history_limit,
        }
    }

    pub fn schema_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.schema.cache_ttl_secs)
    }
}
