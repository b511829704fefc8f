//! Snapshot records, public views and the record codec.
//!
//! Record layout in `metadata.db` (LE, strings as u32 len + utf8 bytes):
//! u64 id
//! u8  kind            (1=view, 2=active, 3=committed)
//! str name
//! str parent          (empty = root layer)
//! u64 created_ms
//! u64 updated_ms
//! u64 size
//! u64 inodes
//! u32 label_count, then (str key, str value) pairs
//!
//! Decoding runs over a body that already passed the CRC check, so any
//! malformed field maps to Error::Corrupt rather than a plain I/O error.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use crate::consts::{KIND_ACTIVE, KIND_COMMITTED, KIND_VIEW};
use crate::error::{Error, Result};

/// Upper bound on any encoded string (names, label keys/values) and on
/// the label count. Enforced on encode and decode alike.
const MAX_STR_LEN: u32 = 1 << 20;

/// Lifecycle state of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    View,
    Active,
    Committed,
}

impl Kind {
    pub fn as_u8(self) -> u8 {
        match self {
            Kind::View => KIND_VIEW,
            Kind::Active => KIND_ACTIVE,
            Kind::Committed => KIND_COMMITTED,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            KIND_VIEW => Some(Kind::View),
            KIND_ACTIVE => Some(Kind::Active),
            KIND_COMMITTED => Some(Kind::Committed),
            _ => None,
        }
    }

    /// Parse a user-facing kind name (CLI filters).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Some(Kind::View),
            "active" => Some(Kind::Active),
            "committed" => Some(Kind::Committed),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::View => write!(f, "view"),
            Kind::Active => write!(f, "active"),
            Kind::Committed => write!(f, "committed"),
        }
    }
}

/// Disk consumption of a snapshot's upper directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub size: u64,
    pub inodes: u64,
}

impl Usage {
    pub fn add(&mut self, other: Usage) {
        self.size += other.size;
        self.inodes += other.inodes;
    }
}

/// One persisted index entry. Internal to the store; callers see [`Info`]
/// and [`Snapshot`] projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: u64,
    pub kind: Kind,
    pub name: String,
    /// Parent key name, empty for a root layer. Parents are committed and
    /// committed names never change, so this reference is stable.
    pub parent: String,
    pub created_ms: u64,
    pub updated_ms: u64,
    pub size: u64,
    pub inodes: u64,
    pub labels: BTreeMap<String, String>,
}

impl Record {
    pub fn info(&self) -> Info {
        Info {
            kind: self.kind,
            name: self.name.clone(),
            parent: self.parent.clone(),
            labels: self.labels.clone(),
            created_ms: self.created_ms,
            updated_ms: self.updated_ms,
            size: self.size,
            inodes: self.inodes,
        }
    }
}

/// Caller-facing description of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Info {
    pub kind: Kind,
    pub name: String,
    /// Parent key, empty string if the snapshot has no parent.
    pub parent: String,
    pub labels: BTreeMap<String, String>,
    pub created_ms: u64,
    pub updated_ms: u64,
    pub size: u64,
    pub inodes: u64,
}

/// Identity view consumed by the mount composer: the numeric id mapped to
/// the on-disk directory plus the ordered ancestor ids (nearest parent
/// first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: u64,
    pub kind: Kind,
    pub parent_ids: Vec<u64>,
}

/// One walk filter: clauses are ANDed, a slice of filters is ORed, an empty
/// slice matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub name: Option<String>,
    pub kind: Option<Kind>,
    pub parent: Option<String>,
    /// (key, Some(value)) requires equality; (key, None) requires presence.
    pub labels: Vec<(String, Option<String>)>,
}

impl Filter {
    pub fn matches(&self, info: &Info) -> bool {
        if let Some(name) = &self.name {
            if info.name != *name {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if info.kind != kind {
                return false;
            }
        }
        if let Some(parent) = &self.parent {
            if info.parent != *parent {
                return false;
            }
        }
        for (key, want) in &self.labels {
            match (info.labels.get(key), want) {
                (None, _) => return false,
                (Some(_), None) => {}
                (Some(have), Some(want)) => {
                    if have != want {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// True if `info` passes the filter set (empty set passes everything).
pub fn filters_match(filters: &[Filter], info: &Info) -> bool {
    filters.is_empty() || filters.iter().any(|f| f.matches(info))
}

// ---- Record codec ----

/// Reject a string the codec will not round-trip.
pub(crate) fn check_str(what: &str, s: &str) -> Result<()> {
    if s.len() > MAX_STR_LEN as usize {
        return Err(Error::InvalidArgument(format!(
            "{what} is {} bytes, limit is {MAX_STR_LEN}",
            s.len()
        )));
    }
    Ok(())
}

/// Reject a label map the codec will not round-trip.
pub(crate) fn check_labels(labels: &BTreeMap<String, String>) -> Result<()> {
    if labels.len() > MAX_STR_LEN as usize {
        return Err(Error::InvalidArgument(format!(
            "{} labels, limit is {MAX_STR_LEN}",
            labels.len()
        )));
    }
    for (k, v) in labels {
        check_str("label key", k)?;
        check_str("label value", v)?;
    }
    Ok(())
}

fn write_str<W: Write>(w: &mut W, s: &str) -> std::io::Result<()> {
    // nothing read_str refuses may ever reach the file
    if s.len() > MAX_STR_LEN as usize {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("string length {} over codec limit", s.len()),
        ));
    }
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())
}

fn read_str<R: Read>(r: &mut R, what: &str) -> Result<String> {
    let len = r
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::Corrupt(format!("truncated {what} length")))?;
    if len > MAX_STR_LEN {
        return Err(Error::Corrupt(format!("{what} length {len} out of range")));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)
        .map_err(|_| Error::Corrupt(format!("truncated {what}")))?;
    String::from_utf8(buf).map_err(|_| Error::Corrupt(format!("{what} is not utf-8")))
}

pub(crate) fn encode_record<W: Write>(w: &mut W, rec: &Record) -> std::io::Result<()> {
    w.write_u64::<LittleEndian>(rec.id)?;
    w.write_u8(rec.kind.as_u8())?;
    write_str(w, &rec.name)?;
    write_str(w, &rec.parent)?;
    w.write_u64::<LittleEndian>(rec.created_ms)?;
    w.write_u64::<LittleEndian>(rec.updated_ms)?;
    w.write_u64::<LittleEndian>(rec.size)?;
    w.write_u64::<LittleEndian>(rec.inodes)?;
    w.write_u32::<LittleEndian>(rec.labels.len() as u32)?;
    for (k, v) in &rec.labels {
        write_str(w, k)?;
        write_str(w, v)?;
    }
    Ok(())
}

pub(crate) fn decode_record<R: Read>(r: &mut R) -> Result<Record> {
    let id = r
        .read_u64::<LittleEndian>()
        .map_err(|_| Error::Corrupt("truncated record id".into()))?;
    let kind_raw = r
        .read_u8()
        .map_err(|_| Error::Corrupt("truncated record kind".into()))?;
    let kind = Kind::from_u8(kind_raw)
        .ok_or_else(|| Error::Corrupt(format!("invalid kind byte {kind_raw}")))?;
    let name = read_str(r, "record name")?;
    let parent = read_str(r, "record parent")?;
    let created_ms = r
        .read_u64::<LittleEndian>()
        .map_err(|_| Error::Corrupt("truncated created_ms".into()))?;
    let updated_ms = r
        .read_u64::<LittleEndian>()
        .map_err(|_| Error::Corrupt("truncated updated_ms".into()))?;
    let size = r
        .read_u64::<LittleEndian>()
        .map_err(|_| Error::Corrupt("truncated size".into()))?;
    let inodes = r
        .read_u64::<LittleEndian>()
        .map_err(|_| Error::Corrupt("truncated inodes".into()))?;
    let label_count = r
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::Corrupt("truncated label count".into()))?;
    if label_count > MAX_STR_LEN {
        return Err(Error::Corrupt(format!(
            "label count {label_count} out of range"
        )));
    }
    let mut labels = BTreeMap::new();
    for _ in 0..label_count {
        let k = read_str(r, "label key")?;
        let v = read_str(r, "label value")?;
        labels.insert(k, v);
    }
    Ok(Record {
        id,
        kind,
        name,
        parent,
        created_ms,
        updated_ms,
        size,
        inodes,
        labels,
    })
}
