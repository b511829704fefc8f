//! Disk usage scans of snapshot upper directories.

use std::collections::HashSet;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::store::Usage;

/// Recursively measure `dir`, the directory itself included.
///
/// Hard-linked files are counted once, keyed by (device, inode). On unix
/// the size is allocated 512-byte blocks (sparse files measure small);
/// elsewhere it is the byte length. Returns the usage plus the raw number
/// of entries walked.
pub(crate) fn scan(dir: &Path) -> Result<(Usage, u64)> {
    let mut usage = Usage::default();
    let mut entries = 0u64;
    #[cfg(unix)]
    let mut seen: HashSet<(u64, u64)> = HashSet::new();

    for item in WalkDir::new(dir) {
        let entry = item.map_err(|e| walk_error(e, dir))?;
        let md = entry.metadata().map_err(|e| walk_error(e, dir))?;
        entries += 1;
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            if seen.insert((md.dev(), md.ino())) {
                usage.inodes += 1;
                usage.size += md.blocks() * 512;
            }
        }
        #[cfg(not(unix))]
        {
            usage.inodes += 1;
            usage.size += md.len();
        }
    }
    Ok((usage, entries))
}

fn walk_error(e: walkdir::Error, dir: &Path) -> Error {
    let io = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk failed"));
    Error::io(io, "scan usage", dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let pid = std::process::id();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!("shale-usage-{tag}-{pid}-{nanos}"));
        fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn missing_directory_is_an_error() {
        let p = temp_dir("missing").join("nope");
        let err = scan(&p).unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "{err}");
    }

    #[test]
    fn counts_files_and_directories() {
        let dir = temp_dir("count");
        fs::write(dir.join("a"), vec![0x61u8; 5000]).unwrap();
        fs::create_dir(dir.join("sub")).unwrap();
        fs::write(dir.join("sub/b"), b"tiny").unwrap();

        let (usage, entries) = scan(&dir).unwrap();
        assert_eq!(entries, 4); // root, a, sub, sub/b
        assert_eq!(usage.inodes, 4);
        assert!(usage.size >= 5004, "size {}", usage.size);
        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn hard_links_count_once() {
        let dir = temp_dir("hardlink");
        fs::write(dir.join("a"), vec![0u8; 8192]).unwrap();
        fs::hard_link(dir.join("a"), dir.join("b")).unwrap();

        let (usage, entries) = scan(&dir).unwrap();
        assert_eq!(entries, 3); // root, a, b
        assert_eq!(usage.inodes, 2); // root + the shared inode
        assert!(usage.size >= 8192, "size {}", usage.size);
        assert!(usage.size < 2 * 8192 + 4096, "size {}", usage.size);
        let _ = fs::remove_dir_all(&dir);
    }
}
