//! The source index: all files known to the engine, parsed and mapped
//! into one shared byte-offset space.
//!
//! Each file is assigned a disjoint slice `[base, base + len]` of a global
//! offset space, with a one-byte gap between consecutive files so every
//! global offset belongs to at most one file. Queries against an
//! already-added file are read-only and take the read lock; `add_file` is
//! the single writer.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::base::{FileId, Interner, LineCol, LineIndex, TextSize};
use crate::syntax::{ParseError, SyntaxTree, parse};

/// A global offset translated back into file-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePosition {
    pub file: FileId,
    /// File-local byte offset.
    pub offset: TextSize,
    pub line_col: LineCol,
}

struct FileData {
    path: String,
    text: Arc<str>,
    tree: Arc<SyntaxTree>,
    line_index: Arc<LineIndex>,
    /// Start of this file's slice in the global offset space.
    base: TextSize,
}

#[derive(Default)]
struct Inner {
    /// Path to id, in insertion order. Iteration order of this map is what
    /// makes cross-file tie-breaks deterministic.
    by_path: IndexMap<String, FileId>,
    files: Vec<FileData>,
    next_base: TextSize,
}

/// Owner of all parsed files and the shared name interner.
#[derive(Default)]
pub struct SourceIndex {
    interner: Interner,
    inner: RwLock<Inner>,
}

impl SourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The interner shared by every file in this index.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Parse `content` and register it under `path`.
    ///
    /// Adding a path that is already present reparses the new content under
    /// the same [`FileId`], replacing the old tree; the file is assigned a
    /// fresh slice of the global offset space since its length may have
    /// changed. A parse failure leaves the previous content in place.
    pub fn add_file(&self, path: &str, content: &str) -> Result<FileId, ParseError> {
        let mut inner = self.inner.write();
        let file = match inner.by_path.get(path) {
            Some(&existing) => existing,
            None => FileId::new(inner.files.len() as u32),
        };

        let tree = parse(file, content, &self.interner)?;
        let len = TextSize::of(content);
        let base = inner.next_base;
        inner.next_base = base + len + TextSize::from(1);

        let data = FileData {
            path: path.to_string(),
            text: Arc::from(content),
            tree: Arc::new(tree),
            line_index: Arc::new(LineIndex::new(content)),
            base,
        };
        if (file.index() as usize) < inner.files.len() {
            inner.files[file.index() as usize] = data;
        } else {
            inner.files.push(data);
            inner.by_path.insert(path.to_string(), file);
        }
        tracing::debug!(path, file = file.index(), "indexed file");
        Ok(file)
    }

    /// Look up a file by the path it was added under.
    pub fn file_at_path(&self, path: &str) -> Option<FileId> {
        self.inner.read().by_path.get(path).copied()
    }

    /// All files, in the order they were added.
    pub fn files(&self) -> Vec<FileId> {
        self.inner.read().by_path.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The parsed tree of a file.
    pub fn tree(&self, file: FileId) -> Arc<SyntaxTree> {
        Arc::clone(&self.inner.read().files[file.index() as usize].tree)
    }

    /// The source text of a file.
    pub fn text(&self, file: FileId) -> Arc<str> {
        Arc::clone(&self.inner.read().files[file.index() as usize].text)
    }

    /// The line index of a file.
    pub fn line_index(&self, file: FileId) -> Arc<LineIndex> {
        Arc::clone(&self.inner.read().files[file.index() as usize].line_index)
    }

    /// The path a file was added under.
    pub fn path(&self, file: FileId) -> String {
        self.inner.read().files[file.index() as usize].path.clone()
    }

    /// Translate a file-local offset into the shared global offset space.
    pub fn global_offset(&self, file: FileId, local: TextSize) -> TextSize {
        self.inner.read().files[file.index() as usize].base + local
    }

    /// Translate a global offset back into file-local coordinates.
    ///
    /// Returns `None` when the offset falls into no file's slice (for
    /// example into the gap left by a replaced file).
    pub fn position_at(&self, global: TextSize) -> Option<FilePosition> {
        let inner = self.inner.read();
        for &file in inner.by_path.values() {
            let data = &inner.files[file.index() as usize];
            let len = TextSize::of(&*data.text);
            if global >= data.base && global <= data.base + len {
                let offset = global - data.base;
                return Some(FilePosition {
                    file,
                    offset,
                    line_col: data.line_index.line_col(offset),
                });
            }
        }
        None
    }

    /// Snap a file-local offset into the file's valid range.
    ///
    /// Offsets at or past end of file come back pointing at the last byte,
    /// so a query at the very end of a buffer still lands on the final
    /// token instead of failing.
    pub fn clamp_offset(&self, file: FileId, offset: TextSize) -> TextSize {
        let inner = self.inner.read();
        let len = TextSize::of(&*inner.files[file.index() as usize].text);
        if len == TextSize::from(0) {
            TextSize::from(0)
        } else {
            offset.min(len - TextSize::from(1))
        }
    }
}

impl std::fmt::Debug for SourceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceIndex")
            .field("files", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_look_up() {
        let index = SourceIndex::new();
        let a = index.add_file("a.go", "package p\n").unwrap();
        let b = index.add_file("b.go", "package p\nvar x int\n").unwrap();

        assert_ne!(a, b);
        assert_eq!(index.file_at_path("a.go"), Some(a));
        assert_eq!(index.files(), vec![a, b]);
        assert_eq!(&*index.text(b), "package p\nvar x int\n");
    }

    #[test]
    fn test_global_offsets_are_disjoint() {
        let index = SourceIndex::new();
        let a = index.add_file("a.go", "package p\n").unwrap();
        let b = index.add_file("b.go", "package p\n").unwrap();

        let end_a = index.global_offset(a, TextSize::from(10));
        let start_b = index.global_offset(b, TextSize::from(0));
        assert!(end_a < start_b);
    }

    #[test]
    fn test_position_at_round_trip() {
        let index = SourceIndex::new();
        index.add_file("a.go", "package p\n").unwrap();
        let b = index.add_file("b.go", "package p\nvar x int\n").unwrap();

        let global = index.global_offset(b, TextSize::from(14));
        let pos = index.position_at(global).unwrap();
        assert_eq!(pos.file, b);
        assert_eq!(pos.offset, TextSize::from(14));
        assert_eq!(pos.line_col, LineCol::new(1, 4));
    }

    #[test]
    fn test_position_at_gap_is_none() {
        let index = SourceIndex::new();
        let a = index.add_file("a.go", "package p\n").unwrap();
        index.add_file("b.go", "package p\n").unwrap();

        // One past the end-of-slice marker of file `a` is the gap byte.
        let gap = index.global_offset(a, TextSize::from(10)) + TextSize::from(1);
        assert!(index.position_at(gap).is_none() || index.position_at(gap).unwrap().file != a);
    }

    #[test]
    fn test_replace_keeps_file_id() {
        let index = SourceIndex::new();
        let a = index.add_file("a.go", "package p\n").unwrap();
        let a2 = index.add_file("a.go", "package p\nvar x int\n").unwrap();

        assert_eq!(a, a2);
        assert_eq!(index.len(), 1);
        assert_eq!(&*index.text(a), "package p\nvar x int\n");
    }

    #[test]
    fn test_replace_with_parse_error_keeps_old_tree() {
        let index = SourceIndex::new();
        let a = index.add_file("a.go", "package p\n").unwrap();
        assert!(index.add_file("a.go", "func broken {").is_err());
        assert_eq!(&*index.text(a), "package p\n");
    }

    #[test]
    fn test_clamp_offset() {
        let index = SourceIndex::new();
        let a = index.add_file("a.go", "package p\n").unwrap();

        assert_eq!(index.clamp_offset(a, TextSize::from(3)), TextSize::from(3));
        assert_eq!(
            index.clamp_offset(a, TextSize::from(10_000)),
            TextSize::from(9)
        );
    }
}
