//! Logos-based lexer for Go-style source.
//!
//! Fast tokenization using the logos crate. Trivia (whitespace and
//! comments) is kept in the stream so the parser can apply the automatic
//! semicolon insertion rule at line ends.

use crate::base::{TextRange, TextSize};
use logos::Logos;

/// A token with its kind, text, and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub range: TextRange,
}

impl<'a> Token<'a> {
    /// Whether this token is whitespace or a comment.
    pub fn is_trivia(self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }
}

/// Lexer wrapping the logos-generated tokenizer.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(input),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = match self.inner.next()? {
            Ok(k) => k,
            Err(()) => TokenKind::Error,
        };
        let span = self.inner.span();
        let range = TextRange::new(
            TextSize::from(span.start as u32),
            TextSize::from(span.end as u32),
        );
        Some(Token {
            kind,
            text: self.inner.slice(),
            range,
        })
    }
}

/// Tokenize an entire string into a Vec, trivia included.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Token kinds for the Go-style surface syntax.
///
/// Keywords the resolver has no use for (`go`, `defer`, `switch`, ...) are
/// not reserved here and lex as plain identifiers.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ------------------------------------------------------------------
    // Trivia
    // ------------------------------------------------------------------
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/")]
    BlockComment,

    // ------------------------------------------------------------------
    // Literals and identifiers
    // ------------------------------------------------------------------
    #[regex(r"[\p{L}_][\p{L}\p{Nd}_]*")]
    Ident,

    #[regex(r"[0-9][0-9_]*")]
    Int,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?")]
    Float,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r"`[^`]*`")]
    RawString,

    #[regex(r"'([^'\\\n]|\\.)*'")]
    Rune,

    // ------------------------------------------------------------------
    // Keywords
    // ------------------------------------------------------------------
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("func")]
    Func,
    #[token("type")]
    Type,
    #[token("struct")]
    Struct,
    #[token("interface")]
    Interface,
    #[token("map")]
    Map,
    #[token("var")]
    Var,
    #[token("const")]
    Const,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("range")]
    Range,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,

    // ------------------------------------------------------------------
    // Multi-character punctuation (listed before single-char)
    // ------------------------------------------------------------------
    #[token(":=")]
    ColonEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("<-")]
    Arrow,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("...")]
    Ellipsis,

    // ------------------------------------------------------------------
    // Single-character punctuation
    // ------------------------------------------------------------------
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("!")]
    Bang,

    /// Unrecognized input byte.
    Error,
}

impl TokenKind {
    /// Whether a line ending directly after a token of this kind triggers
    /// automatic semicolon insertion.
    pub fn ends_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::String
                | TokenKind::RawString
                | TokenKind::Rune
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .into_iter()
            .filter(|t| !t.is_trivia())
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            kinds("package main"),
            vec![TokenKind::Package, TokenKind::Ident]
        );
        // Unreserved keywords stay identifiers
        assert_eq!(kinds("go defer"), vec![TokenKind::Ident, TokenKind::Ident]);
    }

    #[test]
    fn test_short_assign_token() {
        assert_eq!(
            kinds("x := 1"),
            vec![TokenKind::Ident, TokenKind::ColonEq, TokenKind::Int]
        );
    }

    #[test]
    fn test_multi_char_before_single() {
        assert_eq!(kinds("<="), vec![TokenKind::LtEq]);
        assert_eq!(kinds("< ="), vec![TokenKind::Lt, TokenKind::Eq]);
        assert_eq!(kinds("=="), vec![TokenKind::EqEq]);
    }

    #[test]
    fn test_token_ranges() {
        let toks = tokenize("ab cd");
        assert_eq!(toks[0].text, "ab");
        assert_eq!(toks[0].range, TextRange::new(0.into(), 2.into()));
        assert_eq!(toks[2].text, "cd");
        assert_eq!(toks[2].range, TextRange::new(3.into(), 5.into()));
    }

    #[test]
    fn test_comments_are_trivia() {
        let toks = tokenize("x // trailing\n/* block */ y");
        let non_trivia: Vec<_> = toks.iter().filter(|t| !t.is_trivia()).collect();
        assert_eq!(non_trivia.len(), 2);
        assert_eq!(non_trivia[0].text, "x");
        assert_eq!(non_trivia[1].text, "y");
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(kinds(r#""hi \"there\"""#), vec![TokenKind::String]);
        assert_eq!(kinds("`raw`"), vec![TokenKind::RawString]);
        assert_eq!(kinds(r"'\n'"), vec![TokenKind::Rune]);
    }

    #[test]
    fn test_unicode_identifier() {
        assert_eq!(kinds("größe"), vec![TokenKind::Ident]);
    }
}
