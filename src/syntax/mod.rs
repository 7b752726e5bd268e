//! Syntax layer: lexer, arena-based syntax tree, and parser for Go-style
//! source files.
//!
//! The parser is hand-written recursive descent over a logos token stream.
//! It produces a flat per-file arena ([`SyntaxTree`]) in which nodes refer
//! to each other by index, with non-owning parent back-references for
//! upward walks.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Node, NodeId, NodeKind, SyntaxTree};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{ParseError, parse};
