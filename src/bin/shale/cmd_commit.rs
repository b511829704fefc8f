use crate::util;
use anyhow::Result;
use shale::Snapshotter;
use std::path::PathBuf;

pub fn exec(path: PathBuf, key: String, name: String, label: Vec<String>) -> Result<()> {
    let labels = util::parse_labels(&label)?;
    let s = Snapshotter::open(&path)?;
    s.commit(&name, &key, labels)?;
    let usage = s.usage(&name)?;
    println!(
        "Committed {:?} as {:?} ({} bytes, {} inodes)",
        key, name, usage.size, usage.inodes
    );
    Ok(())
}
