//! Mount composition for snapshot chains.
//!
//! Pure projection of a snapshot identity onto mount instructions; nothing
//! here touches mount(2). Three shapes:
//! - no parents: bind of the snapshot's own `fs` dir (rw only when Active);
//! - one parent and not Active: read-only bind of the parent's `fs` dir.
//!   A committed layer is self-contained, so even a parent with its own
//!   deep chain collapses to this single bind;
//! - otherwise: one overlay mount, `workdir=`/`upperdir=` for Active, then
//!   `lowerdir=` joining the ancestor dirs nearest-first with `:`.

use std::path::Path;

use serde::Serialize;

use crate::dir;
use crate::store::{Kind, Snapshot};

/// One mount instruction for the caller to execute or forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mount {
    /// Filesystem type: "bind" or "overlay".
    pub fstype: String,
    /// Mount source: a directory for binds, the literal "overlay" otherwise.
    pub source: String,
    /// Options in mount(8) order.
    pub options: Vec<String>,
}

impl std::fmt::Display for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.fstype, self.source, self.options.join(","))
    }
}

pub(crate) fn compose(root: &Path, snap: &Snapshot) -> Vec<Mount> {
    if snap.parent_ids.is_empty() {
        let rw_flag = if snap.kind == Kind::Active { "rw" } else { "ro" };
        return vec![Mount {
            fstype: "bind".to_string(),
            source: path_str(&dir::fs_dir(root, snap.id)),
            options: vec![rw_flag.to_string(), "rbind".to_string()],
        }];
    }

    if snap.parent_ids.len() == 1 && snap.kind != Kind::Active {
        return vec![Mount {
            fstype: "bind".to_string(),
            source: path_str(&dir::fs_dir(root, snap.parent_ids[0])),
            options: vec!["ro".to_string(), "rbind".to_string()],
        }];
    }

    let mut options = Vec::with_capacity(3);
    if snap.kind == Kind::Active {
        options.push(format!("workdir={}", path_str(&dir::work_dir(root, snap.id))));
        options.push(format!("upperdir={}", path_str(&dir::fs_dir(root, snap.id))));
    }
    let lower: Vec<String> = snap
        .parent_ids
        .iter()
        .map(|id| path_str(&dir::fs_dir(root, *id)))
        .collect();
    options.push(format!("lowerdir={}", lower.join(":")));

    vec![Mount {
        fstype: "overlay".to_string(),
        source: "overlay".to_string(),
        options,
    }]
}

fn path_str(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}
