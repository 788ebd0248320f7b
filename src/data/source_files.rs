/// Discovery of aggregator snapshot files eligible for a run
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::utils::time::file_date_prefix;

pub const SOURCE_EXTENSION: &str = "gz";

/// A `.gz` file whose name starts with a date on or after `start`
pub fn is_eligible(path: &Path, start: NaiveDate) -> bool {
    if path.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION) {
        return false;
    }

    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(file_date_prefix)
        .map_or(false, |date| date >= start)
}

/// Walk `root` recursively and return eligible files sorted by path.
/// Unreadable directories are logged and skipped. Symlinked directories are
/// not descended into, so link cycles cannot repeat files.
pub fn discover_sources(root: &Path, start: NaiveDate) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️  Cannot read directory {}: {}", dir.display(), e);
                continue;
            }
        };

        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            // file_type() does not follow symlinks
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!("⚠️  Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_symlink() && path.is_dir() {
                debug!("Not following directory link {}", path.display());
            } else if is_eligible(&path, start) {
                found.push(path);
            }
        }
    }

    found.sort();
    debug!("Discovered {} eligible files under {}", found.len(), root.display());
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_eligibility() {
        let start = date(2025, 3, 4);

        assert!(is_eligible(Path::new("a/b/2025-03-04-10.gz"), start));
        assert!(is_eligible(Path::new("a/b/2025-03-05.gz"), start));
        assert!(!is_eligible(Path::new("a/b/2025-03-03-23.gz"), start));
        assert!(!is_eligible(Path::new("a/b/2025-03-05-10"), start));
        assert!(!is_eligible(Path::new("a/b/2025-03-05-10.csv"), start));
        assert!(!is_eligible(Path::new("a/b/latest.gz"), start));
    }

    #[test]
    fn test_recursive_discovery_is_sorted() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "BINANCE/btcusdt/2025-03-05-00.gz",
            "BINANCE/btcusdt/2025-03-04-12.gz",
            "BINANCE/btcusdt/2025-03-01-00.gz",
            "BYBIT/BTCUSDT/2025-03-04-00.gz",
            "BYBIT/BTCUSDT/notes.txt",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"").unwrap();
        }

        let found = discover_sources(root, date(2025, 3, 4));
        let relative: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(relative, vec![
            "BINANCE/btcusdt/2025-03-04-12.gz",
            "BINANCE/btcusdt/2025-03-05-00.gz",
            "BYBIT/BTCUSDT/2025-03-04-00.gz",
        ]);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_link_cycle_is_not_followed() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let leaf = root.join("BINANCE/btcusdt");
        fs::create_dir_all(&leaf).unwrap();
        fs::write(leaf.join("2025-03-04-00.gz"), b"").unwrap();
        std::os::unix::fs::symlink(root, leaf.join("loop")).unwrap();

        let found = discover_sources(root, date(2025, 3, 4));

        assert_eq!(found, vec![leaf.join("2025-03-04-00.gz")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_links_are_still_picked_up() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let real = root.join("archive/2025-03-04-00.gz");
        fs::create_dir_all(real.parent().unwrap()).unwrap();
        fs::write(&real, b"").unwrap();
        let linked = root.join("2025-03-05-00.gz");
        std::os::unix::fs::symlink(&real, &linked).unwrap();

        let found = discover_sources(root, date(2025, 3, 5));

        assert_eq!(found, vec![linked]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        assert!(discover_sources(Path::new("/nonexistent/aggr/data"), date(2025, 1, 1)).is_empty());
    }
}
