use crate::util;
use anyhow::Result;
use shale::Snapshotter;
use std::path::PathBuf;

pub fn exec(path: PathBuf, key: String, json: bool) -> Result<()> {
    let s = Snapshotter::open(&path)?;
    let mounts = s.mounts(&key)?;
    util::print_mounts(&mounts, json)
}
