//! Overlay snapshotter: the public operation surface.
//!
//! Coordinates the snapshot index and the `snapshots/` directory tree so
//! that, from the caller's side, metadata and disk state change together:
//! directories are staged and renamed into place under the writer gate,
//! before the transaction that publishes them commits, and physical
//! deletion happens only after a deleting transaction is durable.
//!
//! Constructors:
//! - Snapshotter::open(root): config from env (SHALE_* variables).
//! - Snapshotter::open_with_config(root, cfg): explicit config.
//! - Snapshotter::open_with_metrics(root, cfg, metrics): preferred for
//!   embedding; shares a caller-owned metrics instance.

mod cleanup;
mod usage;

pub use cleanup::DoctorReport;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::config::{RemovalPolicy, ShaleConfig};
use crate::consts::LABEL_UPPERDIR;
use crate::dir;
use crate::error::{Error, Result};
use crate::lock::RootLock;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::mount::{self, Mount};
use crate::store::{filters_match, Filter, Info, Kind, MetaStore, Usage};

/// Overlay snapshot manager rooted at one directory.
///
/// All operations take `&self`; the type is Send + Sync. The instance holds
/// the exclusive root lock for its whole lifetime.
pub struct Snapshotter {
    root: PathBuf,
    store: MetaStore,
    config: ShaleConfig,
    metrics: Arc<Metrics>,
    _lock: RootLock,
}

impl Snapshotter {
    /// Open (creating on first use) the snapshot root, with configuration
    /// read from the environment.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(root, ShaleConfig::from_env())
    }

    pub fn open_with_config(root: impl AsRef<Path>, config: ShaleConfig) -> Result<Self> {
        Self::open_with_metrics(root, config, Arc::new(Metrics::new()))
    }

    /// Preferred constructor for embedding: explicit config and a shared
    /// metrics instance. Fails fast if another process holds the root.
    pub fn open_with_metrics(
        root: impl AsRef<Path>,
        config: ShaleConfig,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let snapshots = dir::snapshots_dir(&root);
        fs::create_dir_all(&snapshots)
            .map_err(|e| Error::io(e, "create snapshots dir", &snapshots))?;
        let lock = RootLock::try_acquire(&root)?;
        let store = MetaStore::open(&root, Arc::clone(&metrics))?;
        debug!("opened snapshot root {} ({})", root.display(), config);
        Ok(Self {
            root,
            store,
            config,
            metrics,
            _lock: lock,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ShaleConfig {
        &self.config
    }

    /// Point-in-time copy of this instance's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Describe the snapshot at `key`.
    pub fn stat(&self, key: &str) -> Result<Info> {
        let (snap, mut info) = self.store.read().get(key)?;
        self.decorate(snap.id, &mut info);
        Ok(info)
    }

    /// Apply label changes from `info` along `fieldpaths`: `"labels"`
    /// replaces the whole map, `"labels.<key>"` one entry, and empty
    /// fieldpaths replaces the map. Everything else on a record is
    /// immutable.
    pub fn update(&self, info: &Info, fieldpaths: &[String]) -> Result<Info> {
        // the reserved label is derived, never persisted
        let mut incoming = info.clone();
        incoming.labels.remove(LABEL_UPPERDIR);

        let mut txn = self.store.write();
        let mut updated = txn.update(&incoming, fieldpaths)?;
        let (snap, _) = txn.get(&updated.name)?;
        txn.commit()?;
        self.decorate(snap.id, &mut updated);
        Ok(updated)
    }

    /// Disk usage of the snapshot at `key`. Active snapshots are measured
    /// by scanning their upper directory; committed ones return the value
    /// computed at commit time.
    pub fn usage(&self, key: &str) -> Result<Usage> {
        let (snap, info) = self.store.read().get(key)?;
        if snap.kind == Kind::Active {
            let upper = dir::fs_dir(&self.root, snap.id);
            let (usage, entries) = usage::scan(&upper)?;
            self.metrics.record_usage_scan(entries);
            Ok(usage)
        } else {
            Ok(Usage {
                size: info.size,
                inodes: info.inodes,
            })
        }
    }

    /// Create a writable snapshot under `key`, optionally layered on the
    /// committed snapshot named `parent` (empty for a root layer). Returns
    /// the mounts that expose it.
    pub fn prepare(
        &self,
        key: &str,
        parent: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<Vec<Mount>> {
        let mounts = self.create_snapshot(Kind::Active, key, parent, labels)?;
        self.metrics.record_prepare();
        Ok(mounts)
    }

    /// Like [`Snapshotter::prepare`] but read-only: the snapshot can never
    /// be committed.
    pub fn view(
        &self,
        key: &str,
        parent: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<Vec<Mount>> {
        let mounts = self.create_snapshot(Kind::View, key, parent, labels)?;
        self.metrics.record_view();
        Ok(mounts)
    }

    /// Recompose the mounts for the Active or View snapshot at `key`.
    /// Idempotent; performs no disk mutation.
    pub fn mounts(&self, key: &str) -> Result<Vec<Mount>> {
        let (snap, _) = self.store.read().get(key)?;
        if snap.kind == Kind::Committed {
            return Err(Error::FailedPrecondition(format!(
                "snapshot {key:?} is not active or view"
            )));
        }
        Ok(mount::compose(&self.root, &snap))
    }

    /// Promote the Active snapshot at `key` to a committed layer named
    /// `name`. Usage of the upper directory is computed here, once, and
    /// becomes the stored value. Labels replace the record's labels.
    pub fn commit(&self, name: &str, key: &str, labels: BTreeMap<String, String>) -> Result<()> {
        let mut labels = labels;
        labels.remove(LABEL_UPPERDIR);

        let mut txn = self.store.write();
        // the target name is vetted before the source key resolves, so a
        // collision reports AlreadyExists even when `key` is bad
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "commit name must not be empty".to_string(),
            ));
        }
        if txn.get(name).is_ok() {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let (snap, _) = txn.get(key)?;
        if snap.kind != Kind::Active {
            return Err(Error::FailedPrecondition(format!(
                "snapshot {key:?} is not active"
            )));
        }
        let upper = dir::fs_dir(&self.root, snap.id);
        let (usage, entries) = usage::scan(&upper)?;
        self.metrics.record_usage_scan(entries);
        txn.commit_active(key, name, usage, labels)?;
        txn.commit()?;
        self.metrics.record_commit();
        debug!("committed snapshot {key:?} as {name:?} ({} bytes)", usage.size);
        Ok(())
    }

    /// Delete the snapshot at `key`. With synchronous removal the orphaned
    /// directories are gone when this returns; with deferred removal they
    /// wait for [`Snapshotter::cleanup`]. Fails while other snapshots still
    /// build on `key`.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut txn = self.store.write();
        let (id, kind) = txn.remove(key)?;
        let orphans = match self.config.removal {
            RemovalPolicy::Synchronous => {
                // computed against the working copy, where `key` is gone
                dir::orphan_directories(&self.root, &txn.ids())?
            }
            RemovalPolicy::Deferred => Vec::new(),
        };
        txn.commit()?;
        cleanup::remove_dirs(&orphans, &self.metrics);
        self.metrics.record_remove();
        debug!("removed snapshot {key:?} (id {id}, kind {kind})");
        Ok(())
    }

    /// Invoke `f` for every live snapshot, in name order, that passes
    /// `filters` (clauses ANDed within a filter, filters ORed, empty slice
    /// matches all). An error from `f` aborts the walk.
    pub fn walk<F>(&self, mut f: F, filters: &[Filter]) -> Result<()>
    where
        F: FnMut(Info) -> Result<()>,
    {
        let txn = self.store.read();
        txn.walk(|id, mut info| {
            self.decorate(id, &mut info);
            if filters_match(filters, &info) {
                f(info)
            } else {
                Ok(())
            }
        })
    }

    /// Reconcile the directory tree with the index: remove every directory
    /// under `snapshots/` that no live record references. The live id set
    /// and the directory listing are taken together under the writer gate,
    /// so a concurrent create can never be diffed away. Each removal is
    /// independent and best-effort.
    pub fn cleanup(&self) -> Result<()> {
        // live set and listing are one observation under the writer gate;
        // the unlinking runs after the gate is released
        let orphans = {
            let txn = self.store.read_quiesced();
            dir::orphan_directories(&self.root, &txn.ids())?
        };
        if !orphans.is_empty() {
            debug!("cleanup found {} orphan dir(s)", orphans.len());
        }
        cleanup::remove_dirs(&orphans, &self.metrics);
        self.metrics.record_cleanup_run();
        Ok(())
    }

    /// Read-only consistency audit of index against disk, taken under the
    /// writer gate as one observation.
    pub fn doctor(&self) -> Result<DoctorReport> {
        let txn = self.store.read_quiesced();
        cleanup::doctor(&self.root, txn.view())
    }

    /// Release the root. Every committed change is already durable; this
    /// performs no flush.
    pub fn close(self) {}

    fn create_snapshot(
        &self,
        kind: Kind,
        key: &str,
        parent: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<Vec<Mount>> {
        let mut labels = labels;
        labels.remove(LABEL_UPPERDIR);

        // all directory work happens under the writer gate, so concurrent
        // reconciliation (remove, cleanup) cannot mistake the staging dir
        // for an orphan
        let mut txn = self.store.write();
        let snap = txn.create(kind, key, parent, labels)?;
        let staging = dir::StagingDir::create(&self.root, kind)?;
        if let Some(parent_id) = snap.parent_ids.first() {
            dir::chown_like(&dir::fs_dir(&self.root, *parent_id), &staging.fs_path())?;
        }
        let final_dir = staging.into_final(&self.root, snap.id)?;
        if let Err(e) = txn.commit() {
            // the record never became visible; reclaim the directory now,
            // or leave it for cleanup() if that fails too
            if let Err(rm) = fs::remove_dir_all(&final_dir) {
                warn!(
                    "leaked snapshot dir {} after failed commit: {}",
                    final_dir.display(),
                    rm
                );
            }
            return Err(e);
        }
        debug!("created {kind} snapshot {key:?} (id {})", snap.id);
        Ok(mount::compose(&self.root, &snap))
    }

    fn decorate(&self, id: u64, info: &mut Info) {
        if self.config.upperdir_label && info.kind == Kind::Active {
            info.labels.insert(
                LABEL_UPPERDIR.to_string(),
                dir::fs_dir(&self.root, id).to_string_lossy().into_owned(),
            );
        }
    }
}

impl std::fmt::Debug for Snapshotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshotter")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish()
    }
}
