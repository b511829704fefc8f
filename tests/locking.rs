use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use shale::Snapshotter;

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("shale-{}-{}-{}", prefix, pid, t))
}

#[test]
fn root_is_single_holder() -> Result<()> {
    let root = unique_root("lock");
    fs::create_dir_all(&root)?;

    let first = Snapshotter::open(&root)?;
    first.prepare("work", "", BTreeMap::new())?;

    // a second holder is refused while the first is alive
    let err = Snapshotter::open(&root).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("lock"), "error should point at the lock: {msg}");

    // releasing the first lets the next one in, state intact
    first.close();
    let second = Snapshotter::open(&root)?;
    assert!(second.stat("work").is_ok());

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
