//! Instance manifests — JSON lists of slots used to seed a registry.
//!
//! A manifest describes `number` database instances laid out on one host:
//! instance `i` (0-based) lives in `{root}/datadirs/vmpool/dbfast{i+1}` and
//! listens on `base_port + i + 2`.

use std::path::{Path, PathBuf};

use poolkeeper_state::NewSlot;
use serde::{Deserialize, Serialize};

/// Parameters for generating a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSpec {
    pub hostname: String,
    /// Directory under which `datadirs/vmpool/` is laid out.
    pub root: PathBuf,
    pub base_port: u16,
    pub number: u32,
    pub maxload: u32,
}

/// Ordered list of slots to register.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct InstanceManifest {
    pub instances: Vec<NewSlot>,
}

impl InstanceManifest {
    pub fn generate(spec: &ManifestSpec) -> anyhow::Result<Self> {
        if spec.hostname.trim().is_empty() {
            anyhow::bail!("hostname must not be empty");
        }
        if spec.maxload == 0 {
            anyhow::bail!("maxload must be positive");
        }

        let vmpool = spec.root.join("datadirs").join("vmpool");
        let mut instances = Vec::with_capacity(spec.number as usize);
        for i in 0..spec.number {
            let port = u32::from(spec.base_port) + i + 2;
            let port = u16::try_from(port)
                .map_err(|_| anyhow::anyhow!("port {port} for instance {i} is out of range"))?;
            instances.push(NewSlot {
                hostname: spec.hostname.clone(),
                port,
                datadir: vmpool.join(format!("dbfast{}", i + 1)).display().to_string(),
                maxload: spec.maxload,
            });
        }
        Ok(Self { instances })
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
