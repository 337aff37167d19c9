//! Application configuration

use std::path::Path;

use hourglass_core::MonitorConfig;
use hourglass_domain::{HourglassError, Result};
use serde::{Deserialize, Serialize};

/// OAuth client settings for one calendar provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Which calendar providers are configured; an absent provider is simply
/// never consulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub google: Option<OAuthClientConfig>,
    pub outlook: Option<OAuthClientConfig>,
}

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HourglassConfig {
    pub database_path: String,
    pub providers: ProvidersConfig,
    pub monitor: MonitorConfig,
}

impl Default for HourglassConfig {
    fn default() -> Self {
        Self {
            database_path: "hourglass.db".to_string(),
            providers: ProvidersConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl HourglassConfig {
    /// Load configuration from a TOML file; missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HourglassError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw)
            .map_err(|e| HourglassError::Config(format!("invalid configuration: {e}")))
    }
}
