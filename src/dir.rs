//! Layout of the `<root>/snapshots/` tree and its lifecycle primitives.
//!
//! Every live record owns exactly one `snapshots/<id>` directory holding
//! `fs/` (upper content) and, for Active snapshots, `work/` (overlay
//! scratch). New directories are staged under `snapshots/new-<hex>` and
//! renamed into place only after the index accepts the record, so a crash
//! can leak an orphan directory but never a half-built live one.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::consts::{FS_DIR, SNAPSHOTS_DIR, STAGING_PREFIX, WORK_DIR};
use crate::error::{Error, Result};
use crate::store::Kind;
use crate::util::random_suffix;

#[inline]
pub(crate) fn snapshots_dir(root: &Path) -> PathBuf {
    root.join(SNAPSHOTS_DIR)
}

#[inline]
pub(crate) fn snapshot_dir(root: &Path, id: u64) -> PathBuf {
    snapshots_dir(root).join(id.to_string())
}

/// Upper (writable or committed content) directory of a snapshot.
#[inline]
pub(crate) fn fs_dir(root: &Path, id: u64) -> PathBuf {
    snapshot_dir(root, id).join(FS_DIR)
}

/// Overlay scratch directory; exists only for Active snapshots.
#[inline]
pub(crate) fn work_dir(root: &Path, id: u64) -> PathBuf {
    snapshot_dir(root, id).join(WORK_DIR)
}

/// A snapshot directory being assembled under a transient name. Removed on
/// drop unless renamed into its final place with [`StagingDir::into_final`].
pub(crate) struct StagingDir {
    path: PathBuf,
    armed: bool,
}

impl StagingDir {
    pub(crate) fn create(root: &Path, kind: Kind) -> Result<Self> {
        let path = snapshots_dir(root).join(format!("{STAGING_PREFIX}{}", random_suffix()));
        let fs_path = path.join(FS_DIR);
        fs::create_dir_all(&fs_path).map_err(|e| Error::io(e, "create staging fs", &fs_path))?;
        if kind == Kind::Active {
            let work = path.join(WORK_DIR);
            fs::create_dir(&work).map_err(|e| Error::io(e, "create staging work", &work))?;
        }
        debug!("staged snapshot dir {}", path.display());
        Ok(Self { path, armed: true })
    }

    pub(crate) fn fs_path(&self) -> PathBuf {
        self.path.join(FS_DIR)
    }

    /// Rename into `snapshots/<id>`, disarming removal-on-drop.
    pub(crate) fn into_final(mut self, root: &Path, id: u64) -> Result<PathBuf> {
        let dst = snapshot_dir(root, id);
        fs::rename(&self.path, &dst).map_err(|e| Error::io(e, "rename staging", &dst))?;
        self.armed = false;
        Ok(dst)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("failed to remove staging dir {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

/// Copy (uid, gid) of `src` onto `dst` so a parented snapshot's upper dir
/// starts out owned like its parent's content.
#[cfg(unix)]
pub(crate) fn chown_like(src: &Path, dst: &Path) -> Result<()> {
    use std::os::unix::fs::MetadataExt;
    let md = fs::metadata(src).map_err(|e| Error::io(e, "stat", src))?;
    std::os::unix::fs::chown(dst, Some(md.uid()), Some(md.gid()))
        .map_err(|e| Error::io(e, "chown", dst))
}

#[cfg(not(unix))]
pub(crate) fn chown_like(_src: &Path, _dst: &Path) -> Result<()> {
    Ok(())
}

/// Directories under `snapshots/` that no live record references: leaked
/// staging dirs plus snapshot dirs whose record is gone. Stray plain files
/// are left alone.
pub(crate) fn orphan_directories(root: &Path, live: &HashSet<u64>) -> Result<Vec<PathBuf>> {
    let dir = snapshots_dir(root);
    let rd = match fs::read_dir(&dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(e, "read_dir", &dir)),
    };
    let live_names: HashSet<String> = live.iter().map(|id| id.to_string()).collect();
    let mut out = Vec::new();
    for entry in rd {
        let entry = entry.map_err(|e| Error::io(e, "read_dir entry", &dir))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if !live_names.contains(name.to_string_lossy().as_ref()) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

pub(crate) fn remove_directory(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        // already gone counts as removed
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(e, "remove snapshot dir", path)),
    }
}
