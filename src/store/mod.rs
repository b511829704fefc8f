//! Durable snapshot index.
//!
//! Format of `<root>/metadata.db` (LE):
//! MAGIC8 = "SHALEDB1"
//! u32 version = 1
//! u32 crc32 over body
//! body: u64 next_id, u32 record count, then records (see `record.rs`)
//!
//! Policy:
//! - Atomic rewrite on every transaction commit: tmp+rename, fsync of the
//!   tmp file, then fsync of the parent directory (best-effort on Windows).
//! - A missing file is an empty index; bad magic/version/CRC or malformed
//!   records are `Corrupt`.
//! - The whole live state is held in memory behind an Arc and republished
//!   on commit. Readers clone the Arc and never block.

pub mod record;
pub mod txn;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::consts::{METADATA_FILE, META_HDR_SIZE, META_MAGIC, META_VERSION};
use crate::error::{Error, Result};
use crate::metrics::Metrics;

pub use record::{filters_match, Filter, Info, Kind, Record, Snapshot, Usage};
pub use txn::{QuiescedTxn, ReadTxn, WriteTxn};

/// Complete index state. Published behind an Arc; never mutated in place
/// after publication.
#[derive(Debug, Clone)]
pub(crate) struct State {
    /// Next id to allocate. Ids are never reused.
    pub(crate) next_id: u64,
    /// Live records keyed by name; BTreeMap gives walks name order.
    pub(crate) records: BTreeMap<String, Record>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: BTreeMap::new(),
        }
    }
}

impl State {
    pub(crate) fn lookup(&self, key: &str) -> Result<(Snapshot, Info)> {
        let rec = self
            .records
            .get(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok((self.snapshot_of(rec)?, rec.info()))
    }

    pub(crate) fn snapshot_of(&self, rec: &Record) -> Result<Snapshot> {
        Ok(Snapshot {
            id: rec.id,
            kind: rec.kind,
            parent_ids: self.chain_ids(&rec.parent)?,
        })
    }

    /// Ordered ancestor ids, nearest parent first. Every referenced parent
    /// must exist and be committed; anything else is index corruption.
    pub(crate) fn chain_ids(&self, parent: &str) -> Result<Vec<u64>> {
        let mut out = Vec::new();
        let mut cursor = parent;
        while !cursor.is_empty() {
            let rec = self
                .records
                .get(cursor)
                .ok_or_else(|| Error::Corrupt(format!("dangling parent {cursor:?}")))?;
            if rec.kind != Kind::Committed {
                return Err(Error::Corrupt(format!("parent {cursor:?} is not committed")));
            }
            out.push(rec.id);
            cursor = &rec.parent;
        }
        Ok(out)
    }

    pub(crate) fn ids(&self) -> HashSet<u64> {
        self.records.values().map(|r| r.id).collect()
    }
}

/// Shared index handle: current state plus the single writer gate.
pub(crate) struct MetaStore {
    path: PathBuf,
    state: RwLock<Arc<State>>,
    writer: Mutex<()>,
    metrics: Arc<Metrics>,
}

impl MetaStore {
    /// Load the index at `<root>/metadata.db`. A missing file is an empty
    /// index and is materialized on the spot, so an opened root always has
    /// a valid index file on disk.
    pub(crate) fn open(root: &Path, metrics: Arc<Metrics>) -> Result<Self> {
        let path = root.join(METADATA_FILE);
        let state = load_state(&path)?;
        if !path.exists() {
            persist_state(&path, &state)?;
        }
        Ok(Self {
            path,
            state: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
            metrics,
        })
    }

    /// Begin a read transaction: a frozen point-in-time view.
    pub(crate) fn read(&self) -> ReadTxn {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        ReadTxn::new(Arc::clone(&guard))
    }

    /// Begin a write transaction. Blocks until the writer gate is free.
    /// Dropping the returned value without calling `commit` rolls back.
    pub(crate) fn write(&self) -> WriteTxn<'_> {
        let gate = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let work = {
            let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (**guard).clone()
        };
        WriteTxn::new(self, gate, work)
    }

    pub(crate) fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Begin a read transaction that keeps the writer gate held for its
    /// whole lifetime. No write transaction can begin or commit while it
    /// lives, so its view is the definitive one to diff the directory
    /// tree against.
    pub(crate) fn read_quiesced(&self) -> QuiescedTxn<'_> {
        let gate = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let state = {
            let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(&guard)
        };
        QuiescedTxn::new(ReadTxn::new(state), gate)
    }

    /// Persist `state` durably, then publish it as the current view.
    /// Called by `WriteTxn::commit` while the writer gate is still held.
    pub(crate) fn persist_and_publish(&self, state: State) -> Result<()> {
        persist_state(&self.path, &state)?;
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(state);
        Ok(())
    }
}

// ---- File I/O ----

fn encode_state(state: &State) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::with_capacity(64 + state.records.len() * 128);
    body.write_u64::<LittleEndian>(state.next_id)?;
    body.write_u32::<LittleEndian>(state.records.len() as u32)?;
    for rec in state.records.values() {
        record::encode_record(&mut body, rec)?;
    }
    Ok(body)
}

fn load_state(path: &Path) -> Result<State> {
    let raw = match fs::read(path) {
        Ok(v) => v,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(State::default()),
        Err(e) => return Err(Error::io(e, "read metadata", path)),
    };
    if raw.len() < META_HDR_SIZE {
        return Err(Error::Corrupt(format!(
            "metadata file truncated ({} bytes)",
            raw.len()
        )));
    }
    if &raw[0..8] != META_MAGIC {
        return Err(Error::Corrupt(format!(
            "bad magic (expected {:?}, got {:?})",
            META_MAGIC,
            &raw[0..8]
        )));
    }
    let version = LittleEndian::read_u32(&raw[8..12]);
    if version != META_VERSION {
        return Err(Error::Corrupt(format!(
            "unsupported metadata version {version} (expected {META_VERSION})"
        )));
    }
    let stored_crc = LittleEndian::read_u32(&raw[12..16]);
    let body = &raw[META_HDR_SIZE..];
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(body);
    let computed = hasher.finalize();
    if computed != stored_crc {
        return Err(Error::Corrupt(format!(
            "checksum mismatch (stored {stored_crc:#010x}, computed {computed:#010x})"
        )));
    }

    let mut cursor = body;
    let next_id = read_u64(&mut cursor, "next_id")?;
    let count = read_u32(&mut cursor, "record count")?;
    let mut records = BTreeMap::new();
    let mut seen_ids = HashSet::new();
    for _ in 0..count {
        let rec = record::decode_record(&mut cursor)?;
        if rec.id >= next_id {
            return Err(Error::Corrupt(format!(
                "record id {} not below next_id {}",
                rec.id, next_id
            )));
        }
        if !seen_ids.insert(rec.id) {
            return Err(Error::Corrupt(format!("duplicate record id {}", rec.id)));
        }
        let name = rec.name.clone();
        if records.insert(name.clone(), rec).is_some() {
            return Err(Error::Corrupt(format!("duplicate record name {name:?}")));
        }
    }
    if !cursor.is_empty() {
        return Err(Error::Corrupt(format!(
            "{} trailing bytes after {} records",
            cursor.len(),
            count
        )));
    }
    Ok(State { next_id, records })
}

fn persist_state(path: &Path, state: &State) -> Result<()> {
    let body = encode_state(state).map_err(|e| Error::io(e, "encode metadata", path))?;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&body);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(META_HDR_SIZE + body.len());
    out.extend_from_slice(META_MAGIC);
    let mut hdr = [0u8; 8];
    LittleEndian::write_u32(&mut hdr[0..4], META_VERSION);
    LittleEndian::write_u32(&mut hdr[4..8], crc);
    out.extend_from_slice(&hdr);
    out.extend_from_slice(&body);

    let tmp = tmp_path(path);
    let _ = fs::remove_file(&tmp);
    {
        let mut f = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| Error::io(e, "open metadata tmp", &tmp))?;
        f.write_all(&out)
            .map_err(|e| Error::io(e, "write metadata tmp", &tmp))?;
        f.sync_all()
            .map_err(|e| Error::io(e, "fsync metadata tmp", &tmp))?;
    }
    fs::rename(&tmp, path).map_err(|e| Error::io(e, "rename metadata tmp", path))?;
    let _ = fsync_dir(path);
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = fs::File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn read_u64(cursor: &mut &[u8], what: &str) -> Result<u64> {
    if cursor.len() < 8 {
        return Err(Error::Corrupt(format!("truncated {what}")));
    }
    let v = LittleEndian::read_u64(&cursor[..8]);
    *cursor = &cursor[8..];
    Ok(v)
}

fn read_u32(cursor: &mut &[u8], what: &str) -> Result<u32> {
    if cursor.len() < 4 {
        return Err(Error::Corrupt(format!("truncated {what}")));
    }
    let v = LittleEndian::read_u32(&cursor[..4]);
    *cursor = &cursor[4..];
    Ok(v)
}
