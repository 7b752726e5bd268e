//! Editor-facing entry points.

pub mod goto;

pub use goto::{DeclError, DeclarationSpan, Position, goto_declaration, locate_declaration};
