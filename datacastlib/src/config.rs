//! Deployment configuration.
//!
//! Read from TOML; every key is optional:
//!
//! ```toml
//! [formats]
//! enabled = ["json", "csv", "xlsx"]   # resolution order
//! default = "csv"
//!
//! [json]
//! nested = false
//! separator = "/"
//!
//! [chart]
//! width = 640
//! height = 400
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DatacastError;
use crate::output::{ChartOptions, FormatRegistry, JsonOptions};
use crate::Result;

/// Which formats are offered, in which order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatsConfig {
    /// Enabled format ids; empty means all built-in formats
    pub enabled: Vec<String>,
    /// Fallback format id
    pub default: String,
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            enabled: Vec::new(),
            default: "csv".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub formats: FormatsConfig,
    pub json: JsonOptions,
    pub chart: ChartOptions,
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| DatacastError::Config(e.to_string()))
    }

    /// Build the format registry this configuration describes.
    ///
    /// The default format must be one of the enabled formats.
    pub fn registry(&self) -> Result<FormatRegistry> {
        let mut registry = FormatRegistry::builtin(self.json.clone(), self.chart)
            .default_format(self.formats.default.as_str());
        if !self.formats.enabled.is_empty() {
            registry = registry.enable(&self.formats.enabled)?;
        }
        if registry
            .formats()
            .iter()
            .all(|r| !r.format_id().eq_ignore_ascii_case(&self.formats.default))
        {
            return Err(DatacastError::Config(format!(
                "default format '{}' is not an enabled format",
                self.formats.default
            )));
        }
        Ok(registry)
    }
}
