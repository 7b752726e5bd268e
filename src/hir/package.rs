//! Package aggregation: the files of one directory that share a
//! `package` clause name.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::base::{FileId, Name};
use crate::hir::resolve::DeclSite;
use crate::hir::source::SourceIndex;

/// A group of files forming one package.
///
/// Holds only [`FileId`]s; the trees stay owned by the [`SourceIndex`].
/// The package-wide declaration table is computed once on demand and
/// cached.
pub struct Package {
    name: Option<Name>,
    files: Vec<FileId>,
    decls: RwLock<Option<Arc<FxHashMap<Name, DeclSite>>>>,
}

impl Package {
    /// The package containing `file`: every indexed file in the same
    /// directory whose `package` clause names the same package, in index
    /// order.
    pub fn for_file(index: &SourceIndex, file: FileId) -> Self {
        let name = index.tree(file).package_name();
        let dir = parent_dir(&index.path(file));
        let files = index
            .files()
            .into_iter()
            .filter(|&f| {
                parent_dir(&index.path(f)) == dir && index.tree(f).package_name() == name
            })
            .collect();
        Self {
            name,
            files,
            decls: RwLock::new(None),
        }
    }

    /// The name from the members' `package` clause.
    pub fn name(&self) -> Option<Name> {
        self.name
    }

    /// Member files, in index order.
    pub fn files(&self) -> &[FileId] {
        &self.files
    }

    /// Union of every member file's top-level declarations.
    ///
    /// Per-file collection is fanned out with rayon; the merge is
    /// sequential in file order, so when two files declare the same name
    /// the one in the earlier-indexed file wins.
    pub fn top_level_decls(&self, index: &SourceIndex) -> Arc<FxHashMap<Name, DeclSite>> {
        if let Some(cached) = self.decls.read().as_ref() {
            return Arc::clone(cached);
        }

        let per_file: Vec<(FileId, Vec<(Name, crate::syntax::NodeId)>)> = self
            .files
            .par_iter()
            .map(|&f| (f, index.tree(f).top_level_decls()))
            .collect();

        let mut merged = FxHashMap::default();
        for (file, decls) in per_file {
            for (name, node) in decls {
                merged.entry(name).or_insert(DeclSite { file, node });
            }
        }
        let merged = Arc::new(merged);

        let mut slot = self.decls.write();
        if let Some(cached) = slot.as_ref() {
            return Arc::clone(cached);
        }
        *slot = Some(Arc::clone(&merged));
        merged
    }
}

fn parent_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("files", &self.files)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_by_dir_and_package_name() {
        let index = SourceIndex::new();
        let a = index.add_file("pkg/a.go", "package p\n").unwrap();
        let b = index.add_file("pkg/b.go", "package p\n").unwrap();
        let other_pkg = index.add_file("pkg/c.go", "package q\n").unwrap();
        let other_dir = index.add_file("elsewhere/d.go", "package p\n").unwrap();

        let package = Package::for_file(&index, a);
        assert_eq!(package.files(), &[a, b]);
        assert!(!package.files().contains(&other_pkg));
        assert!(!package.files().contains(&other_dir));
        assert_eq!(package.name(), Some(index.interner().intern("p")));
    }

    #[test]
    fn test_top_level_decls_union() {
        let index = SourceIndex::new();
        let a = index.add_file("pkg/a.go", "package p\nfunc F() {}\n").unwrap();
        let b = index.add_file("pkg/b.go", "package p\nvar x int\n").unwrap();

        let package = Package::for_file(&index, a);
        let decls = package.top_level_decls(&index);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[&index.interner().intern("F")].file, a);
        assert_eq!(decls[&index.interner().intern("x")].file, b);
    }

    #[test]
    fn test_duplicate_name_first_file_wins() {
        let index = SourceIndex::new();
        let a = index.add_file("pkg/a.go", "package p\nvar dup = 1\n").unwrap();
        index.add_file("pkg/b.go", "package p\nvar dup = 2\n").unwrap();

        let package = Package::for_file(&index, a);
        let decls = package.top_level_decls(&index);
        assert_eq!(decls[&index.interner().intern("dup")].file, a);
    }

    #[test]
    fn test_methods_not_in_package_scope() {
        let index = SourceIndex::new();
        let a = index
            .add_file("pkg/a.go", "package p\ntype T struct{}\nfunc (t T) M() {}\n")
            .unwrap();

        let package = Package::for_file(&index, a);
        let decls = package.top_level_decls(&index);
        assert!(decls.contains_key(&index.interner().intern("T")));
        assert!(!decls.contains_key(&index.interner().intern("M")));
    }
}
