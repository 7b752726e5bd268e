//! Loading the rest of a package from disk.

use std::path::Path;

use tracing::warn;

use crate::hir::SourceIndex;

/// Feeds the on-disk siblings of a queried file into a [`SourceIndex`],
/// so package-level names declared in other files of the directory
/// resolve too.
pub struct PackageLoader;

impl PackageLoader {
    /// Add every file in `dir` sharing `skip`'s extension, except `skip`
    /// itself (its buffer content is already indexed).
    ///
    /// Per-file failures are logged and skipped; a half-loaded package
    /// still answers queries for the names it did see.
    pub fn load_siblings(dir: &Path, skip: &Path, index: &SourceIndex) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), %err, "cannot read package directory");
                return;
            }
        };

        let mut paths: Vec<_> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension() == skip.extension() && path.as_path() != skip)
            .collect();
        // Directory iteration order is OS-dependent; sorting keeps the
        // index order, and with it cross-file tie-breaks, stable.
        paths.sort();

        for path in paths {
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable sibling");
                    continue;
                }
            };
            if let Err(err) = index.add_file(&path.to_string_lossy(), &content) {
                warn!(path = %path.display(), %err, "skipping unparseable sibling");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_siblings_and_skips_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.go");
        std::fs::write(&main, "package p\nfunc F() {}\n").unwrap();
        std::fs::write(dir.path().join("util.go"), "package p\nvar x int\n").unwrap();
        std::fs::write(dir.path().join("broken.go"), "func {").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not source").unwrap();

        let index = SourceIndex::new();
        index
            .add_file(&main.to_string_lossy(), "package p\nfunc F() {}\n")
            .unwrap();
        PackageLoader::load_siblings(dir.path(), &main, &index);

        // main.go (already present) + util.go; broken.go and notes.txt
        // are skipped.
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_missing_directory_is_not_fatal() {
        let index = SourceIndex::new();
        PackageLoader::load_siblings(Path::new("/nonexistent-dir"), Path::new("a.go"), &index);
        assert!(index.is_empty());
    }
}
