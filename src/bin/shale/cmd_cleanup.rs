use anyhow::Result;
use shale::Snapshotter;
use std::path::PathBuf;

pub fn exec(path: PathBuf) -> Result<()> {
    let s = Snapshotter::open(&path)?;
    s.cleanup()?;
    // This process opened the root just now, so the counters cover
    // exactly this run.
    let m = s.metrics();
    if m.orphan_remove_failures > 0 {
        println!(
            "Cleanup removed {} orphan dir(s), {} failed (see log)",
            m.orphans_removed, m.orphan_remove_failures
        );
    } else {
        println!("Cleanup removed {} orphan dir(s)", m.orphans_removed);
    }
    Ok(())
}
