use anyhow::Result;
use serde_json::json;
use shale::Snapshotter;
use std::path::PathBuf;

pub fn exec(path: PathBuf, key: String, json: bool) -> Result<()> {
    let s = Snapshotter::open(&path)?;
    let usage = s.usage(&key)?;
    if json {
        let v = json!({
            "key": key,
            "size": usage.size,
            "inodes": usage.inodes,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!("{} bytes, {} inodes", usage.size, usage.inodes);
    }
    Ok(())
}
