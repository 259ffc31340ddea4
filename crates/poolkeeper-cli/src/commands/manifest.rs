use std::path::Path;

use poolkeeper_api::AddSlotRequest;
use poolkeeper_core::{InstanceManifest, ManifestSpec};
use tracing::info;

use super::{Options, api_failure, print_json};

pub fn make_conf(spec: ManifestSpec, output: &Path) -> anyhow::Result<()> {
    let manifest = InstanceManifest::generate(&spec)?;
    manifest.write_to(output)?;
    info!(
        instances = manifest.len(),
        hostname = %spec.hostname,
        output = %output.display(),
        "instance manifest written"
    );
    Ok(())
}

pub fn import(opts: &Options, path: &Path) -> anyhow::Result<()> {
    let manifest = InstanceManifest::from_file(path)?;
    let api = opts.open()?;

    let mut added = Vec::with_capacity(manifest.len());
    for slot in manifest.instances {
        let record = api
            .add_slot(AddSlotRequest {
                hostname: slot.hostname,
                port: slot.port,
                datadir: slot.datadir,
                maxload: slot.maxload,
            })
            .map_err(api_failure)?;
        added.push(record);
    }
    info!(count = added.len(), manifest = %path.display(), "manifest imported");
    print_json(&added)
}
