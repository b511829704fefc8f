use anyhow::{anyhow, Result};
use shale::Snapshotter;
use std::path::PathBuf;

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let s = Snapshotter::open(&path)?;
    let report = s.doctor()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Doctor inspected {} record(s)", report.records);
        print_list("missing snapshot dir", &report.missing_dirs);
        print_list("missing fs dir", &report.missing_fs);
        print_list("missing work dir", &report.missing_work);
        print_list("orphan dir", &report.orphan_dirs);
        print_list("bad parent", &report.bad_parents);
        if report.is_clean() {
            println!("ok");
        }
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(anyhow!("doctor found {} issue(s)", report.issues()))
    }
}

fn print_list(what: &str, items: &[String]) {
    for item in items {
        println!("  {}: {}", what, item);
    }
}
