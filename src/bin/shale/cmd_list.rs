use crate::util;
use anyhow::{anyhow, Result};
use shale::{Filter, Info, Kind, Snapshotter};
use std::path::PathBuf;

pub fn exec(
    path: PathBuf,
    name: Option<String>,
    kind: Option<String>,
    parent: Option<String>,
    label: Vec<String>,
    json: bool,
) -> Result<()> {
    let kind = match kind {
        Some(k) => {
            Some(Kind::parse(&k).ok_or_else(|| anyhow!("unknown kind {k:?}, expected view | active | committed"))?)
        }
        None => None,
    };
    let mut labels = Vec::new();
    for clause in &label {
        labels.push(util::parse_filter_label(clause)?);
    }

    let filters = if name.is_none() && kind.is_none() && parent.is_none() && labels.is_empty() {
        Vec::new()
    } else {
        vec![Filter {
            name,
            kind,
            parent,
            labels,
        }]
    };

    let s = Snapshotter::open(&path)?;
    let mut found: Vec<Info> = Vec::new();
    s.walk(
        |info| {
            found.push(info);
            Ok(())
        },
        &filters,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }
    if found.is_empty() {
        println!("no snapshots");
        return Ok(());
    }
    for info in &found {
        let parent = if info.parent.is_empty() {
            "-"
        } else {
            info.parent.as_str()
        };
        println!("{:<9} {:<24} parent={}", info.kind.to_string(), info.name, parent);
    }
    Ok(())
}
