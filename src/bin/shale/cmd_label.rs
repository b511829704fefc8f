use crate::util;
use anyhow::{anyhow, Result};
use shale::Snapshotter;
use std::path::PathBuf;

pub fn exec(
    path: PathBuf,
    key: String,
    set: Vec<String>,
    unset: Vec<String>,
    json: bool,
) -> Result<()> {
    if set.is_empty() && unset.is_empty() {
        return Err(anyhow!("nothing to do: pass --set key=value or --unset key"));
    }

    let s = Snapshotter::open(&path)?;
    let mut info = s.stat(&key)?;

    // The update call reads only the named paths, so carry exactly the
    // set-values and list both set and unset keys as paths. An unset key
    // is absent from the map, which deletes it.
    let mut fieldpaths = Vec::new();
    info.labels.clear();
    for item in &set {
        let (k, v) = util::parse_label(item)?;
        fieldpaths.push(format!("labels.{k}"));
        info.labels.insert(k, v);
    }
    for k in &unset {
        fieldpaths.push(format!("labels.{k}"));
    }

    let updated = s.update(&info, &fieldpaths)?;
    if json {
        util::print_info_json(&updated)?;
    } else {
        util::print_info(&updated);
    }
    Ok(())
}
