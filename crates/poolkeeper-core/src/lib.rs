pub mod config;
pub mod manifest;

pub use config::PoolKeeperConfig;
pub use manifest::{InstanceManifest, ManifestSpec};
