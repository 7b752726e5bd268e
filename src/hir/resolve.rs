//! Scope construction and identifier resolution.
//!
//! Scopes are built lazily along the ancestor chain of the queried
//! identifier, innermost first, and only for that chain. Each scope is a
//! flat name table; the first scope that knows the name wins, which gives
//! lexical shadowing for free.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::base::{FileId, Name, TextSize};
use crate::hir::package::Package;
use crate::hir::source::SourceIndex;
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Where a name is declared: the declaration node and the file holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclSite {
    pub file: FileId,
    pub node: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// A brace block or an `if`/`for` header.
    Block,
    /// A function body, hosting receiver, parameters, and named results.
    Function,
    /// One file: imports plus that file's top-level declarations.
    File,
    /// All top-level declarations of the package.
    Package,
}

/// One level of name visibility.
pub struct Scope {
    pub kind: ScopeKind,
    names: FxHashMap<Name, DeclSite>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            names: FxHashMap::default(),
        }
    }

    /// First declaration of a name wins; later ones in the same scope are
    /// redeclarations or reassignments.
    fn insert_if_absent(&mut self, name: Name, site: DeclSite) {
        self.names.entry(name).or_insert(site);
    }

    pub fn get(&self, name: Name) -> Option<DeclSite> {
        self.names.get(&name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("kind", &self.kind)
            .field("names", &self.names.len())
            .finish()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveFailure {
    #[error("not an identifier")]
    NotAnIdentifier,
    #[error("unresolved identifier `{0}`")]
    Unresolved(SmolStr),
}

/// Resolves identifiers of one file against its package.
pub struct Resolver<'a> {
    index: &'a SourceIndex,
    file: FileId,
    tree: Arc<SyntaxTree>,
    package: Package,
    blank: Name,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a SourceIndex, file: FileId) -> Self {
        Self {
            index,
            file,
            tree: index.tree(file),
            package: Package::for_file(index, file),
            blank: index.interner().intern("_"),
        }
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Find the unique declaration an identifier occurrence refers to.
    ///
    /// A declaring occurrence (the name being introduced) resolves to its
    /// own declaration node without any scope walk. Everything else walks
    /// the enclosing scopes innermost to outermost.
    pub fn resolve_declaration(&self, ident: NodeId) -> Result<DeclSite, ResolveFailure> {
        let name = self
            .tree
            .ident_name(ident)
            .ok_or(ResolveFailure::NotAnIdentifier)?;
        debug!(name = %self.index.interner().get(name), "resolving identifier");

        if let Some(node) = self.declaring_occurrence(ident, name) {
            debug!("identifier is its own declaring occurrence");
            return Ok(DeclSite {
                file: self.file,
                node,
            });
        }

        if let Some(parent) = self.tree.parent(ident) {
            if let NodeKind::Selector { base, member } = &self.tree.node(parent).kind {
                if *member == ident {
                    return self.resolve_member(*base, name);
                }
            }
        }

        for scope in self.scopes_enclosing(ident) {
            if let Some(site) = scope.get(name) {
                debug!(kind = ?scope.kind, "resolved in scope");
                return Ok(site);
            }
        }
        Err(ResolveFailure::Unresolved(self.index.interner().get(name)))
    }

    /// If `ident` is the name being introduced by its parent declaration,
    /// return that declaration node.
    fn declaring_occurrence(&self, ident: NodeId, name: Name) -> Option<NodeId> {
        if name == self.blank {
            return None;
        }
        let parent = self.tree.parent(ident)?;
        match &self.tree.node(parent).kind {
            NodeKind::FuncDecl { name: n, .. } if *n == ident => Some(parent),
            NodeKind::TypeDecl { name: n, .. } if *n == ident => Some(parent),
            NodeKind::ValueSpec { names, .. } if names.contains(&ident) => Some(parent),
            NodeKind::Field { names, .. } if names.contains(&ident) => Some(parent),
            NodeKind::ImportSpec { alias: Some(a), .. } if *a == ident => Some(parent),
            NodeKind::ShortAssign { lhs, .. } if lhs.contains(&ident) => {
                let new_names = self.short_assign_new_names(parent);
                if new_names.is_empty() {
                    warn!("short assignment declares no new names");
                }
                new_names.contains(&name).then_some(parent)
            }
            _ => None,
        }
    }

    /// The left-hand names a `:=` statement actually declares: those not
    /// already bound in the statement's own block before it. In an
    /// `if`/`for` header the statement opens a fresh implicit scope, so
    /// every name is new there.
    fn short_assign_new_names(&self, stmt: NodeId) -> Vec<Name> {
        let NodeKind::ShortAssign { lhs, .. } = &self.tree.node(stmt).kind else {
            return Vec::new();
        };
        let in_header = matches!(
            self.tree
                .parent(stmt)
                .map(|p| &self.tree.node(p).kind),
            Some(NodeKind::IfStmt { .. } | NodeKind::ForStmt { .. })
        );

        let mut bound_before = FxHashMap::default();
        if !in_header {
            let cutoff = self.tree.range(stmt).start();
            for anc in self.tree.ancestors(stmt).skip(1) {
                if matches!(
                    self.tree.node(anc).kind,
                    NodeKind::Block { .. } | NodeKind::FuncBody { .. }
                ) {
                    bound_before = self.block_scope(anc, cutoff).names;
                    break;
                }
            }
        }

        lhs.iter()
            .filter_map(|&id| self.tree.ident_name(id))
            .filter(|&n| n != self.blank && !bound_before.contains_key(&n))
            .collect()
    }

    /// The scopes visible from `ident`, innermost first, package last.
    pub fn scopes_enclosing(&self, ident: NodeId) -> Vec<Scope> {
        let cutoff = self.tree.range(ident).start();
        let mut scopes = Vec::new();
        for anc in self.tree.ancestors(ident).skip(1) {
            match &self.tree.node(anc).kind {
                NodeKind::Block { .. } | NodeKind::FuncBody { .. } => {
                    scopes.push(self.block_scope(anc, cutoff));
                }
                NodeKind::IfStmt {
                    init: Some(init), ..
                }
                | NodeKind::ForStmt {
                    init: Some(init), ..
                } => {
                    if self.tree.range(*init).end() <= cutoff {
                        let mut scope = Scope::new(ScopeKind::Block);
                        self.register_header_init(&mut scope, *init);
                        scopes.push(scope);
                    }
                }
                NodeKind::FileRoot { .. } => scopes.push(self.file_scope()),
                _ => {}
            }
        }
        scopes.push(self.package_scope());
        scopes
    }

    /// Bindings of one block, seen from a query at `cutoff`.
    ///
    /// Value and short-assignment bindings are visible only after their
    /// statement ends; type declarations are visible block-wide. A function
    /// body additionally hosts the receiver, parameters, and named results
    /// of its declaration.
    fn block_scope(&self, block: NodeId, cutoff: TextSize) -> Scope {
        let (kind, stmts) = match &self.tree.node(block).kind {
            NodeKind::FuncBody { stmts } => (ScopeKind::Function, stmts),
            NodeKind::Block { stmts } => (ScopeKind::Block, stmts),
            _ => return Scope::new(ScopeKind::Block),
        };
        let mut scope = Scope::new(kind);

        if matches!(kind, ScopeKind::Function) {
            if let Some(parent) = self.tree.parent(block) {
                if let NodeKind::FuncDecl {
                    receiver,
                    params,
                    results,
                    ..
                } = &self.tree.node(parent).kind
                {
                    for &field in receiver.iter().chain(params.iter()).chain(results.iter()) {
                        self.insert_field_names(&mut scope, field);
                    }
                }
            }
        }

        for &stmt in stmts {
            self.register_stmt(&mut scope, stmt, cutoff);
        }
        scope
    }

    fn register_stmt(&self, scope: &mut Scope, stmt: NodeId, cutoff: TextSize) {
        let ends_before = self.tree.range(stmt).end() <= cutoff;
        match &self.tree.node(stmt).kind {
            NodeKind::TypeDecl { name, .. } => {
                self.insert_ident(scope, *name, stmt);
            }
            NodeKind::ValueSpec { names, .. } if ends_before => {
                for &name in names {
                    self.insert_ident(scope, name, stmt);
                }
            }
            NodeKind::ShortAssign { lhs, .. } if ends_before => {
                for &name in lhs {
                    self.insert_ident(scope, name, stmt);
                }
            }
            _ => {}
        }
    }

    fn register_header_init(&self, scope: &mut Scope, init: NodeId) {
        if let NodeKind::ShortAssign { lhs, .. } = &self.tree.node(init).kind {
            for &name in lhs {
                self.insert_ident(scope, name, init);
            }
        }
    }

    fn insert_field_names(&self, scope: &mut Scope, field: NodeId) {
        if let NodeKind::Field { names, .. } = &self.tree.node(field).kind {
            for &name in names {
                self.insert_ident(scope, name, field);
            }
        }
    }

    fn insert_ident(&self, scope: &mut Scope, ident: NodeId, decl: NodeId) {
        if let Some(name) = self.tree.ident_name(ident) {
            if name != self.blank {
                scope.insert_if_absent(
                    name,
                    DeclSite {
                        file: self.file,
                        node: decl,
                    },
                );
            }
        }
    }

    /// Imports plus this file's own top-level declarations.
    fn file_scope(&self) -> Scope {
        let mut scope = Scope::new(ScopeKind::File);
        for (name, node) in self.tree.top_level_decls() {
            if name != self.blank {
                scope.insert_if_absent(
                    name,
                    DeclSite {
                        file: self.file,
                        node,
                    },
                );
            }
        }
        let NodeKind::FileRoot { decls, .. } = &self.tree.node(self.tree.root()).kind else {
            return scope;
        };
        for &decl in decls {
            let NodeKind::ImportDecl { specs } = &self.tree.node(decl).kind else {
                continue;
            };
            for &spec in specs {
                let NodeKind::ImportSpec { alias, path } = &self.tree.node(spec).kind else {
                    continue;
                };
                let binding = match alias {
                    Some(a) => self.tree.ident_name(*a),
                    None => {
                        let segment = path.rsplit('/').next().unwrap_or(path.as_str());
                        Some(self.index.interner().intern(segment))
                    }
                };
                if let Some(binding) = binding {
                    scope.insert_if_absent(
                        binding,
                        DeclSite {
                            file: self.file,
                            node: spec,
                        },
                    );
                }
            }
        }
        scope
    }

    fn package_scope(&self) -> Scope {
        let mut scope = Scope::new(ScopeKind::Package);
        for (&name, &site) in self.package.top_level_decls(self.index).iter() {
            if name != self.blank {
                scope.insert_if_absent(name, site);
            }
        }
        scope
    }

    /// Resolve the member of `base.member`.
    ///
    /// When the base names an import, the member lives in another package
    /// and is out of reach. Otherwise this is a best-effort search over the
    /// package's struct type declarations, first match in file-then-source
    /// order, without any type inference on the base.
    fn resolve_member(&self, base: NodeId, name: Name) -> Result<DeclSite, ResolveFailure> {
        if let Some(base_name) = self.tree.ident_name(base) {
            for scope in self.scopes_enclosing(base) {
                let Some(site) = scope.get(base_name) else {
                    continue;
                };
                if matches!(
                    self.index.tree(site.file).node(site.node).kind,
                    NodeKind::ImportSpec { .. }
                ) {
                    debug!("selector base is an import, member is package-qualified");
                    return Err(ResolveFailure::Unresolved(self.index.interner().get(name)));
                }
                break;
            }
        }

        for &file in self.package.files() {
            let tree = self.index.tree(file);
            let NodeKind::FileRoot { decls, .. } = &tree.node(tree.root()).kind else {
                continue;
            };
            for &decl in decls {
                let NodeKind::TypeDecl { ty, .. } = &tree.node(decl).kind else {
                    continue;
                };
                let NodeKind::StructType { fields } = &tree.node(*ty).kind else {
                    continue;
                };
                for &field in fields {
                    let NodeKind::Field { names, .. } = &tree.node(field).kind else {
                        continue;
                    };
                    if names.iter().any(|&n| tree.ident_name(n) == Some(name)) {
                        debug!("resolved selector member to a struct field");
                        return Ok(DeclSite { file, node: field });
                    }
                }
            }
        }
        Err(ResolveFailure::Unresolved(self.index.interner().get(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Resolve the identifier starting at the `n`-th whole-word
    /// occurrence of `needle` in the file's text.
    fn resolve_nth(
        index: &SourceIndex,
        file: FileId,
        needle: &str,
        n: usize,
    ) -> Result<DeclSite, ResolveFailure> {
        let text = index.text(file);
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        let offset = text
            .match_indices(needle)
            .filter(|(i, _)| {
                let before = text[..*i].chars().next_back();
                let after = text[i + needle.len()..].chars().next();
                !before.is_some_and(is_word) && !after.is_some_and(is_word)
            })
            .nth(n)
            .map(|(i, _)| TextSize::from(i as u32))
            .expect("needle not found");
        let tree = index.tree(file);
        let ident = tree.covering_node(offset).expect("no node at offset");
        Resolver::new(index, file).resolve_declaration(ident)
    }

    fn single(src: &str) -> (SourceIndex, FileId) {
        let index = SourceIndex::new();
        let file = index.add_file("pkg/a.go", src).unwrap();
        (index, file)
    }

    #[test]
    fn test_resolve_local_var() {
        let src = "package p\nfunc F() {\n\tvar count int\n\tuse(count)\n}\nfunc use(int) {}\n";
        let (index, file) = single(src);
        let site = resolve_nth(&index, file, "count", 1).unwrap();
        assert!(matches!(
            index.tree(file).node(site.node).kind,
            NodeKind::ValueSpec { .. }
        ));
    }

    #[test]
    fn test_resolve_parameter() {
        let src = "package p\nfunc F(count int) int {\n\treturn count\n}\n";
        let (index, file) = single(src);
        let site = resolve_nth(&index, file, "count", 1).unwrap();
        assert!(matches!(
            index.tree(file).node(site.node).kind,
            NodeKind::Field { .. }
        ));
    }

    #[test]
    fn test_inner_decl_shadows_outer() {
        let src = "package p\nvar v = 1\nfunc F() int {\n\tv := 2\n\treturn v\n}\n";
        let (index, file) = single(src);
        let site = resolve_nth(&index, file, "v", 2).unwrap();
        assert_eq!(site.file, file);
        assert!(matches!(
            index.tree(file).node(site.node).kind,
            NodeKind::ShortAssign { .. }
        ));
    }

    #[test]
    fn test_short_assign_mixed_new_and_reused() {
        let src = "package p\nfunc F() {\n\ta, b := 1, 2\n\ta, c := 3, 4\n\tuse(a, b, c)\n}\nfunc use(x, y, z int) {}\n";
        let (index, file) = single(src);
        let tree = index.tree(file);

        // `a` on the second line is a reassignment: it resolves to the
        // first statement.
        let a_reused = resolve_nth(&index, file, "a", 1).unwrap();
        let a_first = resolve_nth(&index, file, "a", 0).unwrap();
        assert_eq!(a_reused.node, a_first.node);

        // `c` is new there: it resolves to the second statement.
        let c = resolve_nth(&index, file, "c", 0).unwrap();
        assert_ne!(c.node, a_first.node);
        assert!(matches!(tree.node(c.node).kind, NodeKind::ShortAssign { .. }));
    }

    #[test]
    fn test_short_assign_of_parameter_is_reassignment() {
        let src = "package p\nfunc F(x int) int {\n\tx := 2\n\treturn x\n}\n";
        let (index, file) = single(src);
        // Both the `:=` occurrence and the later read resolve to the
        // parameter, since the body block is the parameter scope.
        let at_assign = resolve_nth(&index, file, "x", 1).unwrap();
        let at_read = resolve_nth(&index, file, "x", 2).unwrap();
        let tree = index.tree(file);
        assert!(matches!(tree.node(at_assign.node).kind, NodeKind::Field { .. }));
        assert_eq!(at_assign.node, at_read.node);
    }

    #[test]
    fn test_cross_file_package_resolution() {
        let index = SourceIndex::new();
        let a = index
            .add_file("pkg/a.go", "package p\nfunc Helper() {}\n")
            .unwrap();
        let b = index
            .add_file("pkg/b.go", "package p\nfunc F() {\n\tHelper()\n}\n")
            .unwrap();
        let site = resolve_nth(&index, b, "Helper", 0).unwrap();
        assert_eq!(site.file, a);
    }

    #[test]
    fn test_type_decl_visible_before_use_in_block() {
        let src = "package p\nfunc F() {\n\tvar v T\n\ttype T struct{}\n\t_ = v\n}\n";
        let (index, file) = single(src);
        let site = resolve_nth(&index, file, "T", 0).unwrap();
        assert!(matches!(
            index.tree(file).node(site.node).kind,
            NodeKind::TypeDecl { .. }
        ));
    }

    #[test]
    fn test_import_alias_resolves_to_spec() {
        let src = "package p\nimport fmtx \"fmt\"\nfunc F() {\n\tfmtx.Println()\n}\n";
        let (index, file) = single(src);
        let site = resolve_nth(&index, file, "fmtx", 1).unwrap();
        assert!(matches!(
            index.tree(file).node(site.node).kind,
            NodeKind::ImportSpec { .. }
        ));
    }

    #[test]
    fn test_package_qualified_member_is_unresolved() {
        let src = "package p\nimport \"fmt\"\nfunc F() {\n\tfmt.Println()\n}\n";
        let (index, file) = single(src);
        let err = resolve_nth(&index, file, "Println", 0).unwrap_err();
        assert!(matches!(err, ResolveFailure::Unresolved(_)));
    }

    #[test]
    fn test_struct_field_member_best_effort() {
        let src = "package p\ntype User struct {\n\tName string\n}\nfunc F(u User) string {\n\treturn u.Name\n}\n";
        let (index, file) = single(src);
        let site = resolve_nth(&index, file, "Name", 1).unwrap();
        assert!(matches!(
            index.tree(file).node(site.node).kind,
            NodeKind::Field { .. }
        ));
    }

    #[test]
    fn test_builtin_is_unresolved() {
        let src = "package p\nfunc F() {\n\tprintln(1)\n}\n";
        let (index, file) = single(src);
        let err = resolve_nth(&index, file, "println", 0).unwrap_err();
        assert_eq!(
            err,
            ResolveFailure::Unresolved(SmolStr::new("println"))
        );
    }

    #[test]
    fn test_rhs_of_short_assign_sees_outer_binding() {
        let src = "package p\nvar n = 1\nfunc F() {\n\tn := n + 1\n\t_ = n\n}\n";
        let (index, file) = single(src);
        // The `n` on the right-hand side refers to the package-level var.
        let rhs = resolve_nth(&index, file, "n", 2).unwrap();
        assert!(matches!(
            index.tree(file).node(rhs.node).kind,
            NodeKind::ValueSpec { .. }
        ));
    }

    #[test]
    fn test_if_init_binding_visible_in_condition_and_body() {
        let src = "package p\nfunc g() int { return 1 }\nfunc F() {\n\tif v := g(); v > 0 {\n\t\t_ = v\n\t}\n}\n";
        let (index, file) = single(src);
        let tree = index.tree(file);
        let in_cond = resolve_nth(&index, file, "v", 1).unwrap();
        let in_body = resolve_nth(&index, file, "v", 2).unwrap();
        assert!(matches!(tree.node(in_cond.node).kind, NodeKind::ShortAssign { .. }));
        assert_eq!(in_cond.node, in_body.node);
    }
}
