//! Layered analytics configuration.
//!
//! Values are resolved from, lowest precedence first: built-in defaults, an
//! optional TOML file, then `ANKARA_*` environment variables. Nested keys use
//! a double underscore, e.g. `ANKARA_RISK__WINDOW_OBSERVATIONS=200`.

use crate::error::Result;
use ankara_performance::PerformanceConfig;
use ankara_risk::RiskConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of the environment variables read by [`AnalyticsConfig::load`].
pub const ENV_PREFIX: &str = "ANKARA";

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ankara.toml";

/// Configuration of a full analytics run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// SQLite database path; the binary picks a per-user location when unset
    pub database: Option<PathBuf>,

    /// Calendar days of price history loaded into a snapshot (default: 400)
    pub history_days: u32,

    /// Calendar days of prices kept by `prune` (default: 400)
    pub retention_days: u32,

    /// Risk engine settings
    pub risk: RiskConfig,

    /// Performance engine settings
    pub performance: PerformanceConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            database: None,
            history_days: 400,
            retention_days: 400,
            risk: RiskConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Load the layered configuration.
    ///
    /// With `path` the file must exist; without it `ankara.toml` is used when
    /// present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => ::config::File::from(path.to_path_buf()).required(true),
            None => ::config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false),
        };

        let config = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?;

        config.risk.validate()?;
        config.performance.validate()?;
        Ok(config)
    }
}
