use poolkeeper_api::Operation;

use super::{Options, print_json};

/// Run one boundary operation and print its response envelope.
pub fn call(opts: &Options, operation: &str, payload: &str) -> anyhow::Result<()> {
    let op: Operation = operation.parse().map_err(super::api_failure)?;
    let payload: serde_json::Value = serde_json::from_str(payload)?;

    let api = opts.open()?;
    let reply = api.dispatch(op, payload);
    print_json(&reply.body)?;

    if reply.status >= 400 {
        anyhow::bail!("{op} failed with status {}", reply.status);
    }
    Ok(())
}
