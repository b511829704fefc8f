use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use shale::{RemovalPolicy, Snapshotter};

// Single test in this file: it mutates process-wide environment.
#[test]
fn env_vars_drive_open() -> Result<()> {
    std::env::set_var("SHALE_ASYNC_REMOVE", "yes");
    std::env::set_var("SHALE_UPPERDIR_LABEL", "1");

    let root = unique_root("env");
    fs::create_dir_all(&root)?;
    let s = Snapshotter::open(&root)?;

    assert_eq!(s.config().removal, RemovalPolicy::Deferred);
    assert!(s.config().upperdir_label);

    // deferred removal + derived label, end to end
    let mounts = s.prepare("work", "", BTreeMap::new())?;
    let fs_dir = PathBuf::from(&mounts[0].source);
    let info = s.stat("work")?;
    assert_eq!(
        info.labels.get("shale.dev/overlay.upperdir"),
        Some(&mounts[0].source)
    );

    s.remove("work")?;
    assert!(fs_dir.exists(), "deferred removal keeps the dir");
    s.cleanup()?;
    assert!(!fs_dir.exists());

    std::env::remove_var("SHALE_ASYNC_REMOVE");
    std::env::remove_var("SHALE_UPPERDIR_LABEL");
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("shale-{}-{}-{}", prefix, pid, t))
}
