use anyhow::{anyhow, Result};
use shale::{Info, Mount};
use std::collections::BTreeMap;

/// Parse `key=value` into a label pair. The key must be non-empty.
pub fn parse_label(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(anyhow!("label must be key=value, got {s:?}")),
    }
}

pub fn parse_labels(items: &[String]) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for item in items {
        let (k, v) = parse_label(item)?;
        out.insert(k, v);
    }
    Ok(out)
}

/// Parse a filter clause: `key` matches presence, `key=value` matches equality.
pub fn parse_filter_label(s: &str) -> Result<(String, Option<String>)> {
    match s.split_once('=') {
        Some((k, _)) if k.is_empty() => Err(anyhow!("label clause must not start with '=': {s:?}")),
        Some((k, v)) => Ok((k.to_string(), Some(v.to_string()))),
        None if s.is_empty() => Err(anyhow!("empty label clause")),
        None => Ok((s.to_string(), None)),
    }
}

pub fn print_info(info: &Info) {
    println!("Snapshot {:?}", info.name);
    println!("  kind       = {}", info.kind);
    let parent = if info.parent.is_empty() {
        "(none)"
    } else {
        info.parent.as_str()
    };
    println!("  parent     = {}", parent);
    println!("  created_ms = {}", info.created_ms);
    println!("  updated_ms = {}", info.updated_ms);
    println!("  size       = {}", info.size);
    println!("  inodes     = {}", info.inodes);
    if !info.labels.is_empty() {
        println!("  labels:");
        for (k, v) in &info.labels {
            println!("    {} = {}", k, v);
        }
    }
}

pub fn print_info_json(info: &Info) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

pub fn print_mounts(mounts: &[Mount], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(mounts)?);
    } else {
        for m in mounts {
            println!("{}", m);
        }
    }
    Ok(())
}
