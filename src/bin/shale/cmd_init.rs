use anyhow::Result;
use shale::{consts, Snapshotter};
use std::path::PathBuf;

pub fn exec(path: PathBuf) -> Result<()> {
    let existed = path.join(consts::METADATA_FILE).exists();
    let s = Snapshotter::open(&path)?;
    if existed {
        println!("Snapshot root already initialized at {}", path.display());
    } else {
        println!("Initialized snapshot root at {}", path.display());
    }
    s.close();
    Ok(())
}
