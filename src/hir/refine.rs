//! Narrowing a resolved declaration node to the declared name itself.
//!
//! The resolver answers with whole declaration nodes (a `FuncDecl`, a
//! `ValueSpec`, ...). For reporting, the interesting span is the name
//! being declared, not the entire statement.

use crate::base::Name;
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Return the identifier node within `decl` that declares `name`.
///
/// Unknown declaration shapes degrade to the declaration node itself
/// rather than failing; a wider-than-ideal span is still a correct
/// answer.
pub fn refine(tree: &SyntaxTree, decl: NodeId, name: Name) -> NodeId {
    match &tree.node(decl).kind {
        NodeKind::FuncDecl { name: n, .. } | NodeKind::TypeDecl { name: n, .. } => *n,
        NodeKind::ShortAssign { lhs, .. } => matching_ident(tree, lhs, name).unwrap_or(decl),
        NodeKind::ValueSpec { names, .. } | NodeKind::Field { names, .. } => {
            matching_ident(tree, names, name).unwrap_or(decl)
        }
        NodeKind::ImportSpec { alias: Some(a), .. } => *a,
        _ => decl,
    }
}

fn matching_ident(tree: &SyntaxTree, candidates: &[NodeId], name: Name) -> Option<NodeId> {
    candidates
        .iter()
        .copied()
        .find(|&id| tree.ident_name(id) == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{FileId, Interner, TextRange};
    use crate::syntax::parse;

    fn parsed(src: &str) -> (SyntaxTree, Interner) {
        let interner = Interner::new();
        let tree = parse(FileId::new(0), src, &interner).expect("parse");
        (tree, interner)
    }

    fn span_text<'a>(src: &'a str, range: TextRange) -> &'a str {
        &src[usize::from(range.start())..usize::from(range.end())]
    }

    #[test]
    fn test_refine_func_decl_to_name() {
        let src = "package p\nfunc Compute() int { return 1 }\n";
        let (tree, interner) = parsed(src);
        let (_, decl) = tree.top_level_decls()[0];
        let refined = refine(&tree, decl, interner.intern("Compute"));
        assert_eq!(span_text(src, tree.range(refined)), "Compute");
    }

    #[test]
    fn test_refine_grouped_value_spec_picks_matching_name() {
        let src = "package p\nvar a, b, c = 1, 2, 3\n";
        let (tree, interner) = parsed(src);
        let (_, decl) = tree.top_level_decls()[0];
        let refined = refine(&tree, decl, interner.intern("b"));
        assert_eq!(span_text(src, tree.range(refined)), "b");
    }

    #[test]
    fn test_refine_type_decl_to_name() {
        let src = "package p\ntype Config struct{}\n";
        let (tree, interner) = parsed(src);
        let (_, decl) = tree.top_level_decls()[0];
        let refined = refine(&tree, decl, interner.intern("Config"));
        assert_eq!(span_text(src, tree.range(refined)), "Config");
    }

    #[test]
    fn test_refine_unknown_name_degrades_to_decl() {
        let src = "package p\nvar a = 1\n";
        let (tree, interner) = parsed(src);
        let (_, decl) = tree.top_level_decls()[0];
        let refined = refine(&tree, decl, interner.intern("missing"));
        assert_eq!(refined, decl);
    }
}
