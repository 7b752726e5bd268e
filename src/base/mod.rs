//! Foundation types for the resolution engine.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`FileId`] - Interned file identifiers
//! - [`TextRange`], [`TextSize`] - Source positions
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`Name`], [`Interner`] - Identifier interning
//!
//! This module has NO dependencies on other gosource modules.

mod file_id;
mod intern;
mod span;

pub use file_id::FileId;
pub use intern::{Interner, Name};
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
