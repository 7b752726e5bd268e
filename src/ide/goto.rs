//! The "go to declaration" query.

use std::path::Path;

use smol_str::SmolStr;
use thiserror::Error;
use tracing::debug;

use crate::base::{FileId, LineIndex, TextSize};
use crate::hir::{Resolver, SourceIndex, refine, resolve::ResolveFailure};
use crate::project::PackageLoader;
use crate::syntax::ParseError;

/// A point in a file: byte offset plus 1-based line and column for
/// display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: TextSize,
    pub line: u32,
    pub column: u32,
}

impl Position {
    fn at(line_index: &LineIndex, offset: TextSize) -> Self {
        let lc = line_index.line_col(offset);
        Self {
            offset,
            line: lc.line_one_indexed(),
            column: lc.col_one_indexed(),
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Where a declaration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSpan {
    pub file: FileId,
    pub path: String,
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Error)]
pub enum DeclError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The offset survived clamping but no node covers it. This indicates
    /// an internal inconsistency, not bad input.
    #[error("no syntax node at offset {0}")]
    NoNodeAtOffset(u32),
    #[error("position is not on an identifier")]
    NotAnIdentifier,
    #[error("unresolved identifier `{0}`")]
    UnresolvedIdentifier(SmolStr),
}

impl From<ResolveFailure> for DeclError {
    fn from(err: ResolveFailure) -> Self {
        match err {
            ResolveFailure::NotAnIdentifier => DeclError::NotAnIdentifier,
            ResolveFailure::Unresolved(name) => DeclError::UnresolvedIdentifier(name),
        }
    }
}

/// Find the declaration of the identifier at `offset` in `file`.
///
/// The offset is clamped into the file, the covering node must be an
/// identifier, and the resolved declaration is refined down to the
/// declared name before its span is reported.
pub fn goto_declaration(
    index: &SourceIndex,
    file: FileId,
    offset: TextSize,
) -> Result<DeclarationSpan, DeclError> {
    let offset = index.clamp_offset(file, offset);
    let tree = index.tree(file);
    let node = tree
        .covering_node(offset)
        .ok_or_else(|| DeclError::NoNodeAtOffset(offset.into()))?;
    let name = tree.ident_name(node).ok_or(DeclError::NotAnIdentifier)?;

    let resolver = Resolver::new(index, file);
    let site = resolver.resolve_declaration(node)?;

    let decl_tree = index.tree(site.file);
    let refined = refine(&decl_tree, site.node, name);
    let range = decl_tree.range(refined);
    let line_index = index.line_index(site.file);

    let span = DeclarationSpan {
        file: site.file,
        path: index.path(site.file),
        start: Position::at(&line_index, range.start()),
        end: Position::at(&line_index, range.end()),
    };
    debug!(path = %span.path, start = %span.start, "declaration found");
    Ok(span)
}

/// One-shot query over a single buffer.
///
/// Builds a transient index from `content` (which may be unsaved editor
/// state) plus whatever same-extension siblings of `path` exist on disk,
/// then runs [`goto_declaration`]. The buffer content wins over the
/// on-disk version of `path`.
pub fn locate_declaration(
    path: &Path,
    content: &str,
    offset: TextSize,
) -> Result<DeclarationSpan, DeclError> {
    let index = SourceIndex::new();
    let file = index.add_file(&path.to_string_lossy(), content)?;
    if let Some(dir) = path.parent() {
        PackageLoader::load_siblings(dir, path, &index);
    }
    goto_declaration(&index, file, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_of(src: &str, needle: &str) -> TextSize {
        TextSize::from(src.find(needle).expect("needle in src") as u32)
    }

    #[test]
    fn test_goto_reports_one_based_positions() {
        let src = "package p\nfunc Target() {}\nfunc F() {\n\tTarget()\n}\n";
        let index = SourceIndex::new();
        let file = index.add_file("a.go", src).unwrap();

        let span = goto_declaration(&index, file, offset_of(src, "Target()")).unwrap();
        assert_eq!(span.start.line, 2);
        assert_eq!(span.start.column, 6);
        assert_eq!(span.end.column, 12);
        assert_eq!(span.path, "a.go");
    }

    #[test]
    fn test_goto_on_keyword_is_not_an_identifier() {
        let src = "package p\nfunc F() {\n\treturn\n}\n";
        let index = SourceIndex::new();
        let file = index.add_file("a.go", src).unwrap();

        let err = goto_declaration(&index, file, offset_of(src, "return")).unwrap_err();
        assert!(matches!(err, DeclError::NotAnIdentifier));
    }

    #[test]
    fn test_goto_past_end_of_file_is_clamped() {
        let src = "package p\nvar x = y\nvar y = 1\n";
        let index = SourceIndex::new();
        let file = index.add_file("a.go", src).unwrap();

        // Far past EOF clamps to the last byte (a newline), which is not
        // an identifier; the query degrades gracefully instead of
        // panicking.
        let err = goto_declaration(&index, file, TextSize::from(10_000)).unwrap_err();
        assert!(matches!(err, DeclError::NotAnIdentifier));
    }

    #[test]
    fn test_goto_unresolved_carries_name() {
        let src = "package p\nvar x = missing\n";
        let index = SourceIndex::new();
        let file = index.add_file("a.go", src).unwrap();

        let err = goto_declaration(&index, file, offset_of(src, "missing")).unwrap_err();
        match err {
            DeclError::UnresolvedIdentifier(name) => assert_eq!(name.as_str(), "missing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_locate_declaration_single_buffer() {
        let src = "package p\nvar answer = 42\nvar twice = answer + answer\n";
        let span =
            locate_declaration(Path::new("/no-such-dir/a.go"), src, offset_of(src, "answer +"))
                .unwrap();
        assert_eq!(span.start.line, 2);
        assert_eq!(span.start.column, 5);
    }
}
