//! poolkeeper.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no config is given.
pub const DEFAULT_CONFIG_FILE: &str = "poolkeeper.toml";

/// Snapshot file used when neither the config nor the CLI names one.
pub const DEFAULT_POOL_FILE: &str = "pooldata.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PoolKeeperConfig {
    pub registry: RegistryConfig,
    pub allocator: AllocatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// JSON snapshot holding every registered slot.
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_POOL_FILE),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AllocatorConfig {
    /// How much worse named slots must be than the least-loaded ones before
    /// the allocator overrides the request. Unset uses the built-in default.
    pub fallback_ratio: Option<f64>,
}

impl PoolKeeperConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PoolKeeperConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `poolkeeper.toml` in the working directory
    /// if it exists, else the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(ratio) = self.allocator.fallback_ratio {
            if !(ratio.is_finite() && ratio > 0.0) {
                anyhow::bail!("allocator.fallback_ratio must be a positive number, got {ratio}");
            }
        }
        if self.registry.path.as_os_str().is_empty() {
            anyhow::bail!("registry.path must not be empty");
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
