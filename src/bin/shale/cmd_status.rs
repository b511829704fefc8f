use anyhow::Result;
use serde_json::json;
use shale::{Kind, Snapshotter};
use std::path::PathBuf;

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let s = Snapshotter::open(&path)?;

    let mut views = 0u64;
    let mut active = 0u64;
    let mut committed = 0u64;
    s.walk(
        |info| {
            match info.kind {
                Kind::View => views += 1,
                Kind::Active => active += 1,
                Kind::Committed => committed += 1,
            }
            Ok(())
        },
        &[],
    )?;
    let total = views + active + committed;
    let m = s.metrics();

    if json {
        let v = json!({
            "root": s.root().display().to_string(),
            "removal": s.config().removal.to_string(),
            "upperdir_label": s.config().upperdir_label,
            "records": {
                "total": total,
                "view": views,
                "active": active,
                "committed": committed,
            },
            "metrics": m,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }

    println!("Snapshot root {}", s.root().display());
    println!("  removal        = {}", s.config().removal);
    println!("  upperdir_label = {}", s.config().upperdir_label);
    println!(
        "  records        = {} ({} view, {} active, {} committed)",
        total, views, active, committed
    );
    println!("Metrics:");
    println!("  prepares               = {}", m.prepares);
    println!("  views                  = {}", m.views);
    println!("  commits                = {}", m.commits);
    println!("  removes                = {}", m.removes);
    println!("  cleanup_runs           = {}", m.cleanup_runs);
    println!("  orphans_removed        = {}", m.orphans_removed);
    println!("  orphan_remove_failures = {}", m.orphan_remove_failures);
    println!("  usage_scans            = {}", m.usage_scans);
    println!("  usage_entries_walked   = {}", m.usage_entries_walked);
    println!("  txn_commits            = {}", m.txn_commits);
    println!("  txn_rollbacks          = {}", m.txn_rollbacks);
    Ok(())
}
