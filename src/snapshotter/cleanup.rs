//! Reconciliation of the snapshots tree against the index, plus the doctor
//! consistency audit.
//!
//! The index is authoritative. Directories that no live record references
//! (leaked staging dirs, remnants of removed or crashed snapshots) are
//! reclaimed best-effort: each removal stands alone, failures are logged
//! and counted but never abort the sweep.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;

use crate::dir;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::store::{Kind, ReadTxn};

/// Remove orphan directories one by one. Returns how many went away.
pub(crate) fn remove_dirs(dirs: &[PathBuf], metrics: &Metrics) -> u64 {
    let mut removed = 0u64;
    for d in dirs {
        match dir::remove_directory(d) {
            Ok(()) => {
                debug!("removed orphan dir {}", d.display());
                metrics.record_orphan_removed();
                removed += 1;
            }
            Err(e) => {
                warn!("failed to remove orphan dir {}: {}", d.display(), e);
                metrics.record_orphan_remove_failure();
            }
        }
    }
    removed
}

/// Findings of a read-only consistency audit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorReport {
    /// Live records inspected.
    pub records: u64,
    /// Keys whose `snapshots/<id>` directory is missing.
    pub missing_dirs: Vec<String>,
    /// Keys whose `fs/` subdirectory is missing.
    pub missing_fs: Vec<String>,
    /// Active keys whose `work/` subdirectory is missing.
    pub missing_work: Vec<String>,
    /// Unreferenced directories under `snapshots/`.
    pub orphan_dirs: Vec<String>,
    /// Parent references that are missing or not committed.
    pub bad_parents: Vec<String>,
}

impl DoctorReport {
    pub fn is_clean(&self) -> bool {
        self.issues() == 0
    }

    /// Total findings across all categories.
    pub fn issues(&self) -> usize {
        self.missing_dirs.len()
            + self.missing_fs.len()
            + self.missing_work.len()
            + self.orphan_dirs.len()
            + self.bad_parents.len()
    }
}

/// Audit every live record against the directory tree and the parent graph.
/// Reports, never repairs.
pub(crate) fn doctor(root: &Path, txn: &ReadTxn) -> Result<DoctorReport> {
    let mut entries = Vec::new();
    txn.walk(|id, info| {
        entries.push((id, info));
        Ok(())
    })?;

    let kinds: HashMap<&str, Kind> = entries
        .iter()
        .map(|(_, info)| (info.name.as_str(), info.kind))
        .collect();

    let mut report = DoctorReport {
        records: entries.len() as u64,
        ..DoctorReport::default()
    };
    for (id, info) in &entries {
        if !dir::snapshot_dir(root, *id).is_dir() {
            report.missing_dirs.push(info.name.clone());
            continue;
        }
        if !dir::fs_dir(root, *id).is_dir() {
            report.missing_fs.push(info.name.clone());
        }
        if info.kind == Kind::Active && !dir::work_dir(root, *id).is_dir() {
            report.missing_work.push(info.name.clone());
        }
        if !info.parent.is_empty() {
            match kinds.get(info.parent.as_str()) {
                None => report
                    .bad_parents
                    .push(format!("{} -> {} (missing)", info.name, info.parent)),
                Some(k) if *k != Kind::Committed => report
                    .bad_parents
                    .push(format!("{} -> {} (not committed)", info.name, info.parent)),
                Some(_) => {}
            }
        }
    }

    let live: HashSet<u64> = entries.iter().map(|(id, _)| *id).collect();
    for p in dir::orphan_directories(root, &live)? {
        report.orphan_dirs.push(p.to_string_lossy().into_owned());
    }
    Ok(report)
}
