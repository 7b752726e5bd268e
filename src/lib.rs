//! # gosource-base
//!
//! Declaration resolution ("go to definition") for a Go-style,
//! package-organized source language.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide     → the goto-declaration query
//!   ↓
//! hir     → source index, packages, scopes, resolver, span refiner
//!   ↓
//! syntax  → logos lexer + hand-written parser, flat arena tree
//!   ↓
//! base    → primitives (FileId, spans, Name interning)
//! ```
//!
//! `project` sits beside `ide` and pulls a queried file's on-disk package
//! mates into the index.
//!
//! The engine answers exactly one question: given a byte offset in a
//! file, where is the declaration of the identifier under it? Everything
//! else (type checking, cross-package resolution, code generation) is out
//! of scope.

/// Foundation types: FileId, spans, Name interning
pub mod base;

/// Semantic model: source index, packages, scope-based resolution
pub mod hir;

/// Editor-facing queries
pub mod ide;

/// On-disk package loading
pub mod project;

/// Lexer, arena syntax tree, parser
pub mod syntax;

// Re-export foundation types
pub use base::{FileId, Interner, LineCol, LineIndex, Name, TextRange, TextSize};

// Re-export the main query surface
pub use hir::{DeclSite, Package, Resolver, SourceIndex};
pub use ide::{DeclError, DeclarationSpan, Position, goto_declaration, locate_declaration};
pub use syntax::{ParseError, SyntaxTree, parse};
