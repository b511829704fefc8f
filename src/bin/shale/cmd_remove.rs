use anyhow::Result;
use shale::{RemovalPolicy, Snapshotter};
use std::path::PathBuf;

pub fn exec(path: PathBuf, key: String) -> Result<()> {
    let s = Snapshotter::open(&path)?;
    s.remove(&key)?;
    match s.config().removal {
        RemovalPolicy::Synchronous => println!("Removed {:?}", key),
        RemovalPolicy::Deferred => {
            println!("Removed {:?} (directories deferred to cleanup)", key)
        }
    }
    Ok(())
}
