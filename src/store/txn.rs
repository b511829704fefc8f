//! Scoped transaction handles over the snapshot index.
//!
//! ReadTxn is a frozen point-in-time view (an Arc of the published state):
//! cheap, never blocks, never sees later commits. WriteTxn holds the single
//! writer gate and a working copy of the state; `commit(self)` persists the
//! copy durably and publishes it, any other exit path (early return, drop,
//! panic unwinding) discards the copy. Rollback is the default, not an
//! action. QuiescedTxn is a ReadTxn that keeps the writer gate held, so
//! reconciliation can diff the index against the directory tree without a
//! write slipping in between.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, MutexGuard};

use crate::error::{Error, Result};
use crate::store::record::{check_labels, check_str, Info, Kind, Record, Snapshot, Usage};
use crate::store::{MetaStore, State};
use crate::util::now_millis;

/// Read-only view of the index at one point in time.
pub struct ReadTxn {
    state: Arc<State>,
}

impl ReadTxn {
    pub(crate) fn new(state: Arc<State>) -> Self {
        Self { state }
    }

    /// Resolve a key to its identity and description.
    pub fn get(&self, key: &str) -> Result<(Snapshot, Info)> {
        self.state.lookup(key)
    }

    /// Complete live id set (reconciliation input).
    pub fn ids(&self) -> HashSet<u64> {
        self.state.ids()
    }

    /// Invoke `f` for every live record in name order. An error from `f`
    /// aborts the walk.
    pub fn walk<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(u64, Info) -> Result<()>,
    {
        for rec in self.state.records.values() {
            f(rec.id, rec.info())?;
        }
        Ok(())
    }
}

/// Read view that additionally holds the writer gate: while it lives no
/// write transaction can begin or commit, so the view stays consistent
/// with anything read off the directory tree alongside it.
pub struct QuiescedTxn<'a> {
    txn: ReadTxn,
    _gate: MutexGuard<'a, ()>,
}

impl<'a> QuiescedTxn<'a> {
    pub(crate) fn new(txn: ReadTxn, gate: MutexGuard<'a, ()>) -> Self {
        Self { txn, _gate: gate }
    }

    pub fn ids(&self) -> HashSet<u64> {
        self.txn.ids()
    }

    /// The underlying point-in-time view.
    pub fn view(&self) -> &ReadTxn {
        &self.txn
    }
}

/// Exclusive mutation scope. All reads go through the working copy, so a
/// writer observes its own uncommitted changes.
pub struct WriteTxn<'a> {
    store: &'a MetaStore,
    work: State,
    committed: bool,
    _gate: MutexGuard<'a, ()>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(store: &'a MetaStore, gate: MutexGuard<'a, ()>, work: State) -> Self {
        Self {
            store,
            work,
            committed: false,
            _gate: gate,
        }
    }

    pub fn get(&self, key: &str) -> Result<(Snapshot, Info)> {
        self.work.lookup(key)
    }

    pub fn ids(&self) -> HashSet<u64> {
        self.work.ids()
    }

    /// Insert a new Active or View record under `key`.
    ///
    /// `parent` may be empty (root layer); otherwise it must name a
    /// committed record. Allocates the id and returns the identity view
    /// with the nearest-first ancestor chain.
    pub fn create(
        &mut self,
        kind: Kind,
        key: &str,
        parent: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<Snapshot> {
        if !matches!(kind, Kind::Active | Kind::View) {
            return Err(Error::InvalidArgument(format!(
                "cannot create snapshot with kind {kind}"
            )));
        }
        if key.is_empty() {
            return Err(Error::InvalidArgument(
                "snapshot key must not be empty".to_string(),
            ));
        }
        check_str("snapshot key", key)?;
        check_labels(&labels)?;
        if self.work.records.contains_key(key) {
            return Err(Error::AlreadyExists(key.to_string()));
        }
        if !parent.is_empty() {
            match self.work.records.get(parent) {
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "parent {parent:?} does not exist"
                    )))
                }
                Some(p) if p.kind != Kind::Committed => {
                    return Err(Error::InvalidArgument(format!(
                        "parent {parent:?} is not committed"
                    )))
                }
                Some(_) => {}
            }
        }
        let parent_ids = self.work.chain_ids(parent)?;

        let id = self.work.next_id;
        self.work.next_id += 1;
        let now = now_millis();
        self.work.records.insert(
            key.to_string(),
            Record {
                id,
                kind,
                name: key.to_string(),
                parent: parent.to_string(),
                created_ms: now,
                updated_ms: now,
                size: 0,
                inodes: 0,
                labels,
            },
        );
        Ok(Snapshot {
            id,
            kind,
            parent_ids,
        })
    }

    /// Promote the Active record at `key` to a Committed record named
    /// `name`, storing its computed usage. The id is kept; the old key
    /// becomes free. Labels replace, they do not inherit.
    pub fn commit_active(
        &mut self,
        key: &str,
        name: &str,
        usage: Usage,
        labels: BTreeMap<String, String>,
    ) -> Result<u64> {
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "commit name must not be empty".to_string(),
            ));
        }
        check_str("commit name", name)?;
        check_labels(&labels)?;
        if self.work.records.contains_key(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let kind = match self.work.records.get(key) {
            None => return Err(Error::NotFound(key.to_string())),
            Some(r) => r.kind,
        };
        if kind != Kind::Active {
            return Err(Error::FailedPrecondition(format!(
                "snapshot {key:?} is not active"
            )));
        }
        let mut rec = match self.work.records.remove(key) {
            Some(r) => r,
            None => return Err(Error::NotFound(key.to_string())),
        };
        let now = now_millis();
        rec.kind = Kind::Committed;
        rec.name = name.to_string();
        rec.created_ms = now;
        rec.updated_ms = now;
        rec.size = usage.size;
        rec.inodes = usage.inodes;
        rec.labels = labels;
        let id = rec.id;
        self.work.records.insert(name.to_string(), rec);
        Ok(id)
    }

    /// Delete the record at `key`. Fails while any live record still names
    /// it as parent. Returns the prior (id, kind) so the caller can plan
    /// directory reclamation.
    pub fn remove(&mut self, key: &str) -> Result<(u64, Kind)> {
        let (id, kind) = match self.work.records.get(key) {
            None => return Err(Error::NotFound(key.to_string())),
            Some(r) => (r.id, r.kind),
        };
        if self.work.records.values().any(|r| r.parent == key) {
            return Err(Error::FailedPrecondition(format!(
                "cannot remove snapshot {key:?}: has children"
            )));
        }
        self.work.records.remove(key);
        Ok((id, kind))
    }

    /// Apply label changes from `info` along `fieldpaths` to the record
    /// named `info.name`.
    ///
    /// Paths: `"labels"` replaces the whole map; `"labels.<key>"` sets the
    /// one key from `info.labels` (absence there deletes it). An empty
    /// `fieldpaths` replaces the labels map. Everything else on a record is
    /// immutable and any other path is rejected.
    pub fn update(&mut self, info: &Info, fieldpaths: &[String]) -> Result<Info> {
        let rec = self
            .work
            .records
            .get_mut(&info.name)
            .ok_or_else(|| Error::NotFound(info.name.clone()))?;
        check_labels(&info.labels)?;
        if fieldpaths.is_empty() {
            rec.labels = info.labels.clone();
        } else {
            for path in fieldpaths {
                if let Some(label_key) = path.strip_prefix("labels.") {
                    match info.labels.get(label_key) {
                        Some(v) => {
                            rec.labels.insert(label_key.to_string(), v.clone());
                        }
                        None => {
                            rec.labels.remove(label_key);
                        }
                    }
                } else if path == "labels" {
                    rec.labels = info.labels.clone();
                } else {
                    return Err(Error::InvalidArgument(format!(
                        "cannot update {path:?} field on snapshot {:?}",
                        info.name
                    )));
                }
            }
        }
        rec.updated_ms = now_millis();
        Ok(rec.info())
    }

    /// Persist the working copy and publish it as the current index view.
    /// Consumes the transaction; the writer gate is released on return.
    pub fn commit(mut self) -> Result<()> {
        let state = std::mem::take(&mut self.work);
        self.store.persist_and_publish(state)?;
        self.committed = true;
        self.store.metrics().record_txn_commit();
        Ok(())
    }
}

impl Drop for WriteTxn<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.store.metrics().record_txn_rollback();
        }
    }
}
