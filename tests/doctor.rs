use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use shale::Snapshotter;

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("shale-{}-{}-{}", prefix, pid, t))
}

fn none() -> BTreeMap<String, String> {
    BTreeMap::new()
}

#[test]
fn doctor_is_clean_on_healthy_root() -> Result<()> {
    let root = unique_root("doc-clean");
    fs::create_dir_all(&root)?;
    let s = Snapshotter::open(&root)?;

    s.prepare("work", "", none())?;
    s.commit("base", "work", none())?;
    s.prepare("top", "base", none())?;

    let report = s.doctor()?;
    assert_eq!(report.records, 2);
    assert!(report.is_clean(), "got {report:?}");
    assert_eq!(report.issues(), 0);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn doctor_reports_missing_dirs_and_orphans() -> Result<()> {
    let root = unique_root("doc-dirty");
    fs::create_dir_all(&root)?;
    let s = Snapshotter::open(&root)?;

    s.prepare("work", "", none())?;
    s.commit("base", "work", none())?;
    let top = s.prepare("top", "base", none())?;

    // break things behind the snapshotter's back
    let top_upper = top[0]
        .options
        .iter()
        .find_map(|o| o.strip_prefix("upperdir="))
        .map(PathBuf::from)
        .unwrap();
    let top_work = top[0]
        .options
        .iter()
        .find_map(|o| o.strip_prefix("workdir="))
        .map(PathBuf::from)
        .unwrap();
    fs::remove_dir_all(&top_upper)?;
    fs::remove_dir_all(&top_work)?;
    fs::create_dir_all(root.join("snapshots").join("999").join("fs"))?;

    let report = s.doctor()?;
    assert!(!report.is_clean());
    assert_eq!(report.missing_fs, vec!["top".to_string()]);
    assert_eq!(report.missing_work, vec!["top".to_string()]);
    assert_eq!(report.orphan_dirs.len(), 1);
    assert!(report.orphan_dirs[0].ends_with("999"));
    assert!(report.bad_parents.is_empty());

    // doctor only reports; cleanup fixes the orphan but not the snapshot
    s.cleanup()?;
    let report = s.doctor()?;
    assert!(report.orphan_dirs.is_empty());
    assert_eq!(report.missing_fs, vec!["top".to_string()]);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn doctor_stays_clean_under_create_churn() -> Result<()> {
    let root = unique_root("doc-churn");
    fs::create_dir_all(&root)?;
    let s = Arc::new(Snapshotter::open(&root)?);

    let stop = Arc::new(AtomicBool::new(false));
    let auditor = {
        let s = Arc::clone(&s);
        let stop = Arc::clone(&stop);
        thread::spawn(move || -> shale::Result<()> {
            while !stop.load(Ordering::Relaxed) {
                let report = s.doctor()?;
                assert!(report.is_clean(), "transient finding: {report:?}");
                thread::yield_now();
            }
            Ok(())
        })
    };

    // creates and commits never detach a record from its directory, so
    // no audit in between may show findings
    for i in 0..40 {
        s.prepare(&format!("w{i}"), "", none())?;
        s.commit(&format!("l{i}"), &format!("w{i}"), none())?;
    }

    stop.store(true, Ordering::Relaxed);
    auditor.join().unwrap()?;

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn doctor_flags_whole_missing_snapshot_dir() -> Result<()> {
    let root = unique_root("doc-gone");
    fs::create_dir_all(&root)?;
    let s = Snapshotter::open(&root)?;

    let m = s.prepare("lost", "", none())?;
    let fs_dir = PathBuf::from(&m[0].source);
    let snap_dir = fs_dir.parent().map(PathBuf::from).unwrap();
    fs::remove_dir_all(&snap_dir)?;

    let report = s.doctor()?;
    assert_eq!(report.missing_dirs, vec!["lost".to_string()]);
    // the dir-level finding subsumes the fs/work ones
    assert!(report.missing_fs.is_empty());
    assert!(report.missing_work.is_empty());

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
