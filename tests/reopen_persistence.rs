use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use shale::{consts, Kind, Snapshotter};

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
fn index_survives_reopen() -> Result<()> {
    let root = unique_root("reopen");
    fs::create_dir_all(&root)?;

    let overlay_opts;
    {
        let s = Snapshotter::open(&root)?;
        s.prepare("work", "", none())?;
        s.commit("base", "work", none())?;
        overlay_opts = s.prepare("top", "base", none())?;
    }

    // 1) records and mounts are identical after reopen
    {
        let s = Snapshotter::open(&root)?;
        assert_eq!(s.stat("base")?.kind, Kind::Committed);
        assert_eq!(s.stat("top")?.kind, Kind::Active);
        assert_eq!(s.mounts("top")?, overlay_opts);

        let mut names = Vec::new();
        s.walk(
            |info| {
                names.push(info.name);
                Ok(())
            },
            &[],
        )?;
        assert_eq!(names, vec!["base".to_string(), "top".to_string()]);
    }

    // 2) ids keep advancing after reopen: a new snapshot never reuses the
    //    directory of an old one
    {
        let s = Snapshotter::open(&root)?;
        let m = s.prepare("later", "", none())?;
        let new_fs = PathBuf::from(&m[0].source);
        let old_upper = overlay_opts[0]
            .options
            .iter()
            .find_map(|o| o.strip_prefix("upperdir="))
            .unwrap();
        assert_ne!(new_fs, PathBuf::from(old_upper));
    }

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn oversized_strings_are_rejected_not_persisted() -> Result<()> {
    let root = unique_root("oversize");
    fs::create_dir_all(&root)?;
    let cap = 1usize << 20;

    {
        let s = Snapshotter::open(&root)?;
        s.prepare("work", "", none())?;

        let mut big = BTreeMap::new();
        big.insert("note".to_string(), "v".repeat(cap + 1));

        // keys, names and labels past the codec limit fail up front
        let err = s.prepare(&"k".repeat(cap + 1), "", none()).unwrap_err();
        assert!(err.is_invalid_argument(), "got {err}");
        let err = s.prepare("other", "", big.clone()).unwrap_err();
        assert!(err.is_invalid_argument(), "got {err}");
        let err = s.commit(&"n".repeat(cap + 1), "work", none()).unwrap_err();
        assert!(err.is_invalid_argument(), "got {err}");
        let mut info = s.stat("work")?;
        info.labels = big;
        let err = s.update(&info, &[]).unwrap_err();
        assert!(err.is_invalid_argument(), "got {err}");

        // a value at the limit is legal
        let mut edge = BTreeMap::new();
        edge.insert("note".to_string(), "v".repeat(cap));
        s.prepare("edge", "", edge)?;
    }

    // nothing oversized reached the file: the root reopens and the
    // records are intact
    let s = Snapshotter::open(&root)?;
    assert!(s.stat("work")?.labels.is_empty());
    assert_eq!(s.stat("edge")?.labels["note"].len(), cap);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn truncated_index_is_rejected() -> Result<()> {
    let root = unique_root("truncate");
    fs::create_dir_all(&root)?;
    {
        let s = Snapshotter::open(&root)?;
        s.prepare("work", "", none())?;
        s.commit("base", "work", none())?;
    }

    let db = root.join(consts::METADATA_FILE);
    let raw = fs::read(&db)?;
    fs::write(&db, &raw[..raw.len() - 1])?;

    let err = Snapshotter::open(&root).unwrap_err();
    assert!(err.is_corrupt(), "got {err}");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn flipped_byte_fails_open() -> Result<()> {
    let root = unique_root("bitflip");
    fs::create_dir_all(&root)?;
    {
        let s = Snapshotter::open(&root)?;
        s.prepare("work", "", none())?;
        s.commit("base", "work", none())?;
    }

    let db = root.join(consts::METADATA_FILE);
    let mut raw = fs::read(&db)?;
    let last = raw.len() - 1;
    raw[last] ^= 0x01;
    fs::write(&db, &raw)?;

    let err = Snapshotter::open(&root).unwrap_err();
    assert!(err.is_corrupt(), "got {err}");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
