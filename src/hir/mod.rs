//! Semantic layer on top of the syntax trees.
//!
//! [`SourceIndex`] owns the parsed files and maps them into one shared
//! byte-offset space. [`Package`] groups the files of one directory that
//! share a `package` clause. [`Resolver`] walks scopes built on demand
//! along the ancestor chain of a queried identifier, and [`refine`]
//! narrows a resolved declaration node down to the declared name itself.

pub mod package;
pub mod refine;
pub mod resolve;
pub mod source;

pub use package::Package;
pub use refine::refine;
pub use resolve::{DeclSite, ResolveFailure, Resolver, Scope, ScopeKind};
pub use source::{FilePosition, SourceIndex};
