use poolkeeper_api::{AddSlotRequest, RemoveSlotRequest};

use super::{Options, api_failure, print_json};

pub fn list(opts: &Options) -> anyhow::Result<()> {
    let api = opts.open()?;
    print_json(&api.list_slots())
}

pub fn get(opts: &Options, id: u32) -> anyhow::Result<()> {
    let api = opts.open()?;
    let record = api.get_slot(id).map_err(api_failure)?;
    print_json(&record)
}

pub fn add(
    opts: &Options,
    hostname: String,
    port: u16,
    datadir: String,
    maxload: u32,
) -> anyhow::Result<()> {
    let api = opts.open()?;
    let record = api
        .add_slot(AddSlotRequest {
            hostname,
            port,
            datadir,
            maxload,
        })
        .map_err(api_failure)?;
    print_json(&record)
}

pub fn remove(opts: &Options, hostname: String, datadir: String) -> anyhow::Result<()> {
    let api = opts.open()?;
    let reply = api
        .remove_slot_by_location(&RemoveSlotRequest { hostname, datadir })
        .map_err(api_failure)?;
    print_json(&reply)
}
