use crate::util;
use anyhow::Result;
use shale::Snapshotter;
use std::path::PathBuf;

pub fn exec(path: PathBuf, key: String, json: bool) -> Result<()> {
    let s = Snapshotter::open(&path)?;
    let info = s.stat(&key)?;
    if json {
        util::print_info_json(&info)?;
    } else {
        util::print_info(&info);
    }
    Ok(())
}
