pub mod call;
pub mod cluster;
pub mod manifest;
pub mod slots;

use std::path::PathBuf;

use poolkeeper_api::{ApiError, PoolApi};
use poolkeeper_core::PoolKeeperConfig;
use poolkeeper_placement::{AllocationPolicy, DEFAULT_FALLBACK_RATIO};
use poolkeeper_state::SlotRegistry;
use serde::Serialize;

/// Global flags shared by every subcommand.
pub struct Options {
    pub config: Option<PathBuf>,
    pub pool_file: Option<PathBuf>,
}

impl Options {
    /// Snapshot path: `--pool-file` wins over `[registry].path`.
    pub fn pool_path(&self, config: &PoolKeeperConfig) -> PathBuf {
        self.pool_file
            .clone()
            .unwrap_or_else(|| config.registry.path.clone())
    }

    pub fn open(&self) -> anyhow::Result<PoolApi> {
        let config = PoolKeeperConfig::load(self.config.as_deref())?;
        let path = self.pool_path(&config);
        let registry = SlotRegistry::open(&path)?;
        tracing::debug!(path = %path.display(), slots = registry.len(), "registry opened");

        let policy = AllocationPolicy {
            fallback_ratio: config
                .allocator
                .fallback_ratio
                .unwrap_or(DEFAULT_FALLBACK_RATIO),
        };
        Ok(PoolApi::with_policy(registry, policy))
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Attach the status a transport would report to a handler error.
pub fn api_failure(err: ApiError) -> anyhow::Error {
    anyhow::anyhow!("{} ({})", err, err.status_code())
}
