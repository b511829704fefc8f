use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use shale::{Error, Filter, Kind, Snapshotter};

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("shale-{}-{}-{}", prefix, pid, t))
}

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn seeded(root: &PathBuf) -> Result<Snapshotter> {
    let s = Snapshotter::open(root)?;
    s.prepare("work", "", labels(&[("tier", "base"), ("os", "linux")]))?;
    s.commit("base", "work", labels(&[("tier", "base"), ("os", "linux")]))?;
    s.prepare("app-build", "base", labels(&[("tier", "app")]))?;
    s.view("audit", "base", labels(&[("os", "linux")]))?;
    Ok(s)
}

fn names(s: &Snapshotter, filters: &[Filter]) -> Vec<String> {
    let mut out = Vec::new();
    s.walk(
        |info| {
            out.push(info.name);
            Ok(())
        },
        filters,
    )
    .unwrap();
    out
}

#[test]
fn walk_is_name_ordered_and_filterable() -> Result<()> {
    let root = unique_root("filters");
    fs::create_dir_all(&root)?;
    let s = seeded(&root)?;

    // no filters: everything, in name order
    assert_eq!(names(&s, &[]), vec!["app-build", "audit", "base"]);

    // kind clause
    let active_only = Filter {
        kind: Some(Kind::Active),
        ..Filter::default()
    };
    assert_eq!(names(&s, &[active_only.clone()]), vec!["app-build"]);

    // clauses AND within one filter
    let active_app = Filter {
        kind: Some(Kind::Active),
        labels: vec![("tier".to_string(), Some("app".to_string()))],
        ..Filter::default()
    };
    assert_eq!(names(&s, &[active_app]), vec!["app-build"]);

    let active_base = Filter {
        kind: Some(Kind::Active),
        labels: vec![("tier".to_string(), Some("base".to_string()))],
        ..Filter::default()
    };
    assert_eq!(names(&s, &[active_base]), Vec::<String>::new());

    // filters OR across the slice
    let views = Filter {
        kind: Some(Kind::View),
        ..Filter::default()
    };
    assert_eq!(
        names(&s, &[active_only, views]),
        vec!["app-build", "audit"]
    );

    // presence clause: label key with no value
    let has_os = Filter {
        labels: vec![("os".to_string(), None)],
        ..Filter::default()
    };
    assert_eq!(names(&s, &[has_os]), vec!["audit", "base"]);

    // parent clause
    let children_of_base = Filter {
        parent: Some("base".to_string()),
        ..Filter::default()
    };
    assert_eq!(names(&s, &[children_of_base]), vec!["app-build", "audit"]);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn walk_aborts_on_callback_error() -> Result<()> {
    let root = unique_root("abort");
    fs::create_dir_all(&root)?;
    let s = seeded(&root)?;

    let mut visited = 0;
    let err = s
        .walk(
            |_| {
                visited += 1;
                if visited == 2 {
                    Err(Error::InvalidArgument("stop".to_string()))
                } else {
                    Ok(())
                }
            },
            &[],
        )
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(visited, 2, "the walk must stop at the first error");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
