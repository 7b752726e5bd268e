//! Arena-based syntax tree.
//!
//! Each parsed file owns one flat arena of nodes. Nodes refer to their
//! children and to their parent by [`NodeId`] index, so upward walks for
//! scope construction need no cyclic pointers and the whole tree is freed
//! in one deallocation.

use std::fmt;

use crate::base::{FileId, Name, TextRange, TextSize};

/// Index of a node within its file's [`SyntaxTree`] arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Get the raw arena index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// The closed set of node kinds relevant to declaration resolution.
///
/// Declaration forms the resolver dispatches over are explicit variants;
/// exhaustive matching over this enum is what keeps the resolver honest
/// when a new form is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of one parsed file.
    FileRoot {
        package: Option<NodeId>,
        decls: Vec<NodeId>,
    },
    /// `package p` header.
    PackageClause { name: NodeId },
    /// `import ( ... )` or a single import.
    ImportDecl { specs: Vec<NodeId> },
    /// One imported path, with an optional local alias.
    ImportSpec {
        alias: Option<NodeId>,
        path: smol_str::SmolStr,
    },
    /// `func (recv T) Name(params) (results) { ... }`.
    FuncDecl {
        receiver: Option<NodeId>,
        name: NodeId,
        params: Vec<NodeId>,
        results: Vec<NodeId>,
        body: Option<NodeId>,
    },
    /// `type Name T`.
    TypeDecl { name: NodeId, ty: NodeId },
    /// One `var`/`const` spec: names with an optional shared type and
    /// initializers. A grouped declaration produces one of these per line.
    ValueSpec {
        names: Vec<NodeId>,
        ty: Option<NodeId>,
        values: Vec<NodeId>,
        is_const: bool,
    },
    /// `a, b := x, y` — may declare new names and reassign old ones.
    ShortAssign { lhs: Vec<NodeId>, rhs: Vec<NodeId> },
    /// `a, b = x, y` — plain reassignment, declares nothing.
    Assign { lhs: Vec<NodeId>, rhs: Vec<NodeId> },
    /// A struct field, parameter, result, or interface method: zero or
    /// more names sharing one type.
    Field {
        names: Vec<NodeId>,
        ty: Option<NodeId>,
    },
    /// `struct { ... }`.
    StructType { fields: Vec<NodeId> },
    /// `interface { ... }`.
    InterfaceType { methods: Vec<NodeId> },
    /// `*T`.
    PointerType { inner: NodeId },
    /// `[n]T` or `[]T`.
    ArrayType {
        len: Option<NodeId>,
        elem: NodeId,
    },
    /// `map[K]V`.
    MapType { key: NodeId, value: NodeId },
    /// `func(params) (results)` used as a type.
    FuncType {
        params: Vec<NodeId>,
        results: Vec<NodeId>,
    },
    /// Brace-delimited statement list inside control flow.
    Block { stmts: Vec<NodeId> },
    /// A function's body block; scope-wise it also hosts the parameters.
    FuncBody { stmts: Vec<NodeId> },
    /// A single identifier occurrence.
    Ident { name: Name },
    /// `base.member`.
    Selector { base: NodeId, member: NodeId },
    /// `callee(args)`.
    Call { callee: NodeId, args: Vec<NodeId> },
    /// `base[index]`.
    Index { base: NodeId, index: NodeId },
    /// `(inner)`.
    Paren { inner: NodeId },
    /// Prefix operator application.
    Unary { operand: NodeId },
    /// Infix operator application.
    Binary { lhs: NodeId, rhs: NodeId },
    /// `T{...}`.
    CompositeLit {
        ty: Option<NodeId>,
        elems: Vec<NodeId>,
    },
    /// `key: value` inside a composite literal.
    KeyValue { key: NodeId, value: NodeId },
    /// Any literal token (number, string, rune).
    Literal,
    /// An expression used as a statement.
    ExprStmt { expr: NodeId },
    /// `return ...`.
    ReturnStmt { exprs: Vec<NodeId> },
    /// `if init; cond { ... } else ...`.
    IfStmt {
        init: Option<NodeId>,
        cond: NodeId,
        then_block: NodeId,
        else_branch: Option<NodeId>,
    },
    /// `for init; cond; post { ... }` and its reduced forms.
    ForStmt {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        post: Option<NodeId>,
        body: NodeId,
    },
    /// `break` / `continue`.
    BranchStmt,
}

impl NodeKind {
    /// Visit every direct child id, in source order.
    pub fn for_each_child(&self, mut f: impl FnMut(NodeId)) {
        let mut opt = |id: &Option<NodeId>, f: &mut dyn FnMut(NodeId)| {
            if let Some(id) = id {
                f(*id);
            }
        };
        let mut all = |ids: &[NodeId], f: &mut dyn FnMut(NodeId)| {
            for id in ids {
                f(*id);
            }
        };
        match self {
            NodeKind::FileRoot { package, decls } => {
                opt(package, &mut f);
                all(decls, &mut f);
            }
            NodeKind::PackageClause { name } => f(*name),
            NodeKind::ImportDecl { specs } => all(specs, &mut f),
            NodeKind::ImportSpec { alias, .. } => opt(alias, &mut f),
            NodeKind::FuncDecl {
                receiver,
                name,
                params,
                results,
                body,
            } => {
                opt(receiver, &mut f);
                f(*name);
                all(params, &mut f);
                all(results, &mut f);
                opt(body, &mut f);
            }
            NodeKind::TypeDecl { name, ty } => {
                f(*name);
                f(*ty);
            }
            NodeKind::ValueSpec {
                names, ty, values, ..
            } => {
                all(names, &mut f);
                opt(ty, &mut f);
                all(values, &mut f);
            }
            NodeKind::ShortAssign { lhs, rhs } | NodeKind::Assign { lhs, rhs } => {
                all(lhs, &mut f);
                all(rhs, &mut f);
            }
            NodeKind::Field { names, ty } => {
                all(names, &mut f);
                opt(ty, &mut f);
            }
            NodeKind::StructType { fields } => all(fields, &mut f),
            NodeKind::InterfaceType { methods } => all(methods, &mut f),
            NodeKind::PointerType { inner } => f(*inner),
            NodeKind::ArrayType { len, elem } => {
                opt(len, &mut f);
                f(*elem);
            }
            NodeKind::MapType { key, value } => {
                f(*key);
                f(*value);
            }
            NodeKind::FuncType { params, results } => {
                all(params, &mut f);
                all(results, &mut f);
            }
            NodeKind::Block { stmts } | NodeKind::FuncBody { stmts } => all(stmts, &mut f),
            NodeKind::Ident { .. } | NodeKind::Literal | NodeKind::BranchStmt => {}
            NodeKind::Selector { base, member } => {
                f(*base);
                f(*member);
            }
            NodeKind::Call { callee, args } => {
                f(*callee);
                all(args, &mut f);
            }
            NodeKind::Index { base, index } => {
                f(*base);
                f(*index);
            }
            NodeKind::Paren { inner } => f(*inner),
            NodeKind::Unary { operand } => f(*operand),
            NodeKind::Binary { lhs, rhs } => {
                f(*lhs);
                f(*rhs);
            }
            NodeKind::CompositeLit { ty, elems } => {
                opt(ty, &mut f);
                all(elems, &mut f);
            }
            NodeKind::KeyValue { key, value } => {
                f(*key);
                f(*value);
            }
            NodeKind::ExprStmt { expr } => f(*expr),
            NodeKind::ReturnStmt { exprs } => all(exprs, &mut f),
            NodeKind::IfStmt {
                init,
                cond,
                then_block,
                else_branch,
            } => {
                opt(init, &mut f);
                f(*cond);
                f(*then_block);
                opt(else_branch, &mut f);
            }
            NodeKind::ForStmt {
                init,
                cond,
                post,
                body,
            } => {
                opt(init, &mut f);
                opt(cond, &mut f);
                opt(post, &mut f);
                f(*body);
            }
        }
    }

    /// Collect the direct children into a Vec (allocating convenience).
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.for_each_child(|id| out.push(id));
        out
    }
}

/// One node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Byte span within the owning file (file-local coordinates).
    pub range: TextRange,
    /// Non-owning back-reference for upward walks; `None` for the root.
    pub parent: Option<NodeId>,
}

/// A parsed file: flat node arena plus the root id.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    file: FileId,
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    pub(crate) fn new(file: FileId, nodes: Vec<Node>, root: NodeId) -> Self {
        Self { file, nodes, root }
    }

    /// The file this tree was parsed from.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// The `FileRoot` node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Access a node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// The node's byte span.
    pub fn range(&self, id: NodeId) -> TextRange {
        self.node(id).range
    }

    /// The node's parent, if any.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (never true for a parsed file).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate the ancestor chain starting with `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&cur| self.parent(cur))
    }

    /// The interned name of an `Ident` node.
    pub fn ident_name(&self, id: NodeId) -> Option<Name> {
        match self.node(id).kind {
            NodeKind::Ident { name } => Some(name),
            _ => None,
        }
    }

    /// Find the most specific node whose `[start, end)` span contains the
    /// offset.
    ///
    /// Descends from the root, always preferring a strictly smaller child
    /// over its parent. Sibling spans never overlap, and because
    /// containment is half-open the child that *starts* at the offset wins
    /// over the one that ends there, matching left-to-right reading order.
    pub fn covering_node(&self, offset: TextSize) -> Option<NodeId> {
        let mut cur = self.root;
        if !self.range(cur).contains(offset) {
            return None;
        }
        'descend: loop {
            let mut next = None;
            self.node(cur).kind.for_each_child(|child| {
                if next.is_none() && self.range(child).contains(offset) {
                    next = Some(child);
                }
            });
            match next {
                Some(child) => cur = child,
                None => break 'descend,
            }
        }
        Some(cur)
    }

    /// Top-level declared names of this file, in source order.
    ///
    /// Methods (functions with a receiver) are not package-level names and
    /// are skipped, matching the language's scope rules.
    pub fn top_level_decls(&self) -> Vec<(Name, NodeId)> {
        let mut out = Vec::new();
        let NodeKind::FileRoot { decls, .. } = &self.node(self.root).kind else {
            return out;
        };
        for &decl in decls {
            match &self.node(decl).kind {
                NodeKind::FuncDecl {
                    receiver: None,
                    name,
                    ..
                } => {
                    if let Some(n) = self.ident_name(*name) {
                        out.push((n, decl));
                    }
                }
                NodeKind::TypeDecl { name, .. } => {
                    if let Some(n) = self.ident_name(*name) {
                        out.push((n, decl));
                    }
                }
                NodeKind::ValueSpec { names, .. } => {
                    for &name in names {
                        if let Some(n) = self.ident_name(name) {
                            out.push((n, decl));
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// The name of the `package` clause, if the file has one.
    pub fn package_name(&self) -> Option<Name> {
        let NodeKind::FileRoot { package, .. } = &self.node(self.root).kind else {
            return None;
        };
        let package = (*package)?;
        match &self.node(package).kind {
            NodeKind::PackageClause { name } => self.ident_name(*name),
            _ => None,
        }
    }
}
