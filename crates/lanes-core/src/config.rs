use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the optional per-feature config.
pub const CONFIG_FILE: &str = "status.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureConfig {
    #[serde(default)]
    pub compat: CompatConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

/// Rollout state of the legacy bridge for this feature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatConfig {
    /// 0 = disabled, 1 = mirror lanes, 2 = generated-only.
    #[serde(default)]
    pub phase: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

const fn default_lock_timeout_ms() -> u64 {
    5_000
}

pub fn load_feature_config(feature_dir: &Path) -> Result<FeatureConfig> {
    let path = feature_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(FeatureConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<FeatureConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}
