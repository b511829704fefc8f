use crate::util;
use anyhow::Result;
use shale::Snapshotter;
use std::path::PathBuf;

pub fn exec(path: PathBuf, key: String, parent: String, label: Vec<String>, json: bool) -> Result<()> {
    let labels = util::parse_labels(&label)?;
    let s = Snapshotter::open(&path)?;
    let mounts = s.prepare(&key, &parent, labels)?;
    util::print_mounts(&mounts, json)
}
