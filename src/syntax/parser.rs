//! Hand-written recursive descent parser.
//!
//! Consumes the logos token stream with Go-style automatic semicolon
//! insertion applied, and produces a flat [`SyntaxTree`] arena. There is no
//! error recovery: the first malformed construct aborts the parse with a
//! [`ParseError`], which is what the resolution engine wants — a broken
//! snapshot is reported, not guessed at.

use smol_str::SmolStr;
use thiserror::Error;

use crate::base::{FileId, Interner, LineCol, LineIndex, TextRange, TextSize};
use crate::syntax::ast::{Node, NodeId, NodeKind, SyntaxTree};
use crate::syntax::lexer::{Token, TokenKind, tokenize};

/// A fatal parse failure.
#[derive(Debug, Clone, Error)]
#[error("parse error at {line_col}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line_col: LineCol,
    pub offset: TextSize,
}

/// Parse one file into a syntax tree.
pub fn parse(file: FileId, content: &str, interner: &Interner) -> Result<SyntaxTree, ParseError> {
    let line_index = LineIndex::new(content);
    let toks = insert_semicolons(content);
    let mut parser = Parser {
        toks,
        pos: 0,
        nodes: Vec::new(),
        interner,
        line_index: &line_index,
        src_len: TextSize::of(content),
        prev_end: TextSize::from(0),
        no_composite: false,
    };
    let root = parser.parse_file()?;
    Ok(SyntaxTree::new(file, parser.nodes, root))
}

/// Apply the automatic semicolon insertion rule: a line break directly
/// after a statement-ending token acts as a `;`, as does end of input.
fn insert_semicolons(content: &str) -> Vec<Token<'_>> {
    let mut out: Vec<Token<'_>> = Vec::new();
    let mut prev_end = TextSize::from(0);
    for tok in tokenize(content) {
        if tok.is_trivia() {
            let needs_semi = tok.text.contains('\n')
                && out.last().is_some_and(|t| t.kind.ends_statement());
            if needs_semi {
                out.push(Token {
                    kind: TokenKind::Semi,
                    text: ";",
                    range: TextRange::empty(prev_end),
                });
            }
            continue;
        }
        prev_end = tok.range.end();
        out.push(tok);
    }
    if out.last().is_some_and(|t| t.kind.ends_statement()) {
        out.push(Token {
            kind: TokenKind::Semi,
            text: ";",
            range: TextRange::empty(prev_end),
        });
    }
    out
}

/// A parsed header clause of an `if`/`for` statement, before we know
/// whether it is the init statement or the condition expression.
enum Header {
    Stmt(NodeId),
    Expr(NodeId),
}

struct Parser<'a> {
    toks: Vec<Token<'a>>,
    pos: usize,
    nodes: Vec<Node>,
    interner: &'a Interner,
    line_index: &'a LineIndex,
    src_len: TextSize,
    /// End of the last consumed token, for span construction.
    prev_end: TextSize,
    /// Set while parsing `if`/`for` headers, where `ident {` opens the
    /// statement body rather than a composite literal.
    no_composite: bool,
}

impl<'a> Parser<'a> {
    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn kind(&self) -> Option<TokenKind> {
        self.toks.get(self.pos).map(|t| t.kind)
    }

    fn nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.toks.get(self.pos + n).map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == Some(kind)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn bump(&mut self) -> Token<'a> {
        match self.toks.get(self.pos) {
            Some(&tok) => {
                self.pos += 1;
                self.prev_end = tok.range.end();
                tok
            }
            // Callers check `at` first; this keeps the parser panic-free
            // even if they slip.
            None => Token {
                kind: TokenKind::Error,
                text: "",
                range: TextRange::empty(self.src_len),
            },
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    /// A statement terminator: an explicit or inserted `;`, or the closing
    /// token of the surrounding construct.
    fn expect_semi(&mut self) -> Result<(), ParseError> {
        if self.at(TokenKind::Semi) {
            self.bump();
            Ok(())
        } else if self.at(TokenKind::RBrace) || self.at(TokenKind::RParen) || self.at_eof() {
            Ok(())
        } else {
            Err(self.error("expected ';'".to_string()))
        }
    }

    fn error(&self, message: String) -> ParseError {
        let offset = self
            .toks
            .get(self.pos)
            .map(|t| t.range.start())
            .unwrap_or(self.src_len);
        ParseError {
            message,
            line_col: self.line_index.line_col(offset),
            offset,
        }
    }

    // ------------------------------------------------------------------
    // Arena plumbing
    // ------------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        kind.for_each_child(|child| self.nodes[child.index()].parent = Some(id));
        self.nodes.push(Node {
            kind,
            range,
            parent: None,
        });
        id
    }

    fn start(&self) -> TextSize {
        self.toks
            .get(self.pos)
            .map(|t| t.range.start())
            .unwrap_or(self.src_len)
    }

    fn span_from(&self, start: TextSize) -> TextRange {
        TextRange::new(start, self.prev_end.max(start))
    }

    fn is_ident(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()].kind, NodeKind::Ident { .. })
    }

    // ------------------------------------------------------------------
    // File structure
    // ------------------------------------------------------------------

    fn parse_file(&mut self) -> Result<NodeId, ParseError> {
        if !self.at(TokenKind::Package) {
            return Err(self.error("expected package clause".to_string()));
        }
        let package = self.parse_package_clause()?;
        self.expect_semi()?;

        let mut decls = Vec::new();
        while self.at(TokenKind::Import) {
            decls.push(self.parse_import_decl()?);
            self.expect_semi()?;
        }
        while !self.at_eof() {
            if self.at(TokenKind::Semi) {
                self.bump();
                continue;
            }
            self.parse_top_decl(&mut decls)?;
            self.expect_semi()?;
        }

        let range = TextRange::new(TextSize::from(0), self.src_len);
        Ok(self.alloc(
            NodeKind::FileRoot {
                package: Some(package),
                decls,
            },
            range,
        ))
    }

    fn parse_package_clause(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect(TokenKind::Package, "'package'")?;
        let name = self.parse_ident()?;
        Ok(self.alloc(NodeKind::PackageClause { name }, self.span_from(start)))
    }

    fn parse_ident(&mut self) -> Result<NodeId, ParseError> {
        let tok = self.expect(TokenKind::Ident, "identifier")?;
        let name = self.interner.intern(tok.text);
        Ok(self.alloc(NodeKind::Ident { name }, tok.range))
    }

    fn parse_import_decl(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect(TokenKind::Import, "'import'")?;
        let mut specs = Vec::new();
        if self.at(TokenKind::LParen) {
            self.bump();
            while !self.at(TokenKind::RParen) {
                if self.at(TokenKind::Semi) {
                    self.bump();
                    continue;
                }
                if self.at_eof() {
                    return Err(self.error("unexpected end of file in import group".to_string()));
                }
                specs.push(self.parse_import_spec()?);
                self.expect_semi()?;
            }
            self.expect(TokenKind::RParen, "')'")?;
        } else {
            specs.push(self.parse_import_spec()?);
        }
        Ok(self.alloc(NodeKind::ImportDecl { specs }, self.span_from(start)))
    }

    fn parse_import_spec(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let alias = if self.at(TokenKind::Ident) {
            Some(self.parse_ident()?)
        } else {
            if self.at(TokenKind::Dot) {
                // Dot imports dump the package's scope into the file; the
                // engine does not model cross-package members, so the spec
                // is recorded without a binding name.
                self.bump();
            }
            None
        };
        let tok = if self.at(TokenKind::String) || self.at(TokenKind::RawString) {
            self.bump()
        } else {
            return Err(self.error("expected import path string".to_string()));
        };
        let path = unquote(tok.text);
        Ok(self.alloc(NodeKind::ImportSpec { alias, path }, self.span_from(start)))
    }

    fn parse_top_decl(&mut self, out: &mut Vec<NodeId>) -> Result<(), ParseError> {
        match self.kind() {
            Some(TokenKind::Func) => {
                let decl = self.parse_func_decl()?;
                out.push(decl);
                Ok(())
            }
            Some(TokenKind::Var) | Some(TokenKind::Const) => self.parse_value_decl(out),
            Some(TokenKind::Type) => self.parse_type_decl(out),
            _ => Err(self.error("expected declaration".to_string())),
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn parse_func_decl(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect(TokenKind::Func, "'func'")?;

        let receiver = if self.at(TokenKind::LParen) {
            self.bump();
            let field = self.parse_receiver_field()?;
            self.expect(TokenKind::RParen, "')'")?;
            Some(field)
        } else {
            None
        };

        let name = self.parse_ident()?;
        let (params, results) = self.parse_signature()?;
        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_stmt_list(true)?)
        } else {
            None
        };

        Ok(self.alloc(
            NodeKind::FuncDecl {
                receiver,
                name,
                params,
                results,
                body,
            },
            self.span_from(start),
        ))
    }

    fn parse_receiver_field(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let (names, ty) = if self.at(TokenKind::Ident) && self.nth_kind(1) != Some(TokenKind::RParen)
        {
            let name = self.parse_ident()?;
            let ty = self.parse_type()?;
            (vec![name], Some(ty))
        } else {
            let ty = self.parse_type()?;
            (Vec::new(), Some(ty))
        };
        Ok(self.alloc(NodeKind::Field { names, ty }, self.span_from(start)))
    }

    fn parse_signature(&mut self) -> Result<(Vec<NodeId>, Vec<NodeId>), ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let params = self.parse_field_list()?;
        self.expect(TokenKind::RParen, "')'")?;

        let results = if self.at(TokenKind::LParen) {
            self.bump();
            let r = self.parse_field_list()?;
            self.expect(TokenKind::RParen, "')'")?;
            r
        } else if self.starts_type() {
            let start = self.start();
            let ty = self.parse_type()?;
            vec![self.alloc(
                NodeKind::Field {
                    names: Vec::new(),
                    ty: Some(ty),
                },
                self.span_from(start),
            )]
        } else {
            Vec::new()
        };

        Ok((params, results))
    }

    /// Parameter lists mix named groups (`a, b int`) and unnamed types
    /// (`int, string`). Both lex as comma-separated type items; two
    /// adjacent items without a comma mean the earlier bare identifiers
    /// were names and the trailing item is their type.
    fn parse_field_list(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut fields = Vec::new();
        let mut pending: Vec<NodeId> = Vec::new();

        while !self.at(TokenKind::RParen) {
            if self.at_eof() {
                return Err(self.error("unexpected end of file in parameter list".to_string()));
            }
            let item_start = self.start();
            let item = self.parse_type()?;

            if self.at(TokenKind::Comma) {
                self.bump();
                pending.push(item);
                continue;
            }
            if self.at(TokenKind::RParen) {
                pending.push(item);
                break;
            }

            // Another type follows directly: pending + item are names.
            let mut names = std::mem::take(&mut pending);
            names.push(item);
            let group_start = names
                .first()
                .map(|&id| self.nodes[id.index()].range.start())
                .unwrap_or(item_start);
            for &name in &names {
                if !self.is_ident(name) {
                    return Err(self.error("expected parameter name".to_string()));
                }
            }
            let ty = self.parse_type()?;
            fields.push(self.alloc(
                NodeKind::Field {
                    names,
                    ty: Some(ty),
                },
                self.span_from(group_start),
            ));
            if self.at(TokenKind::Comma) {
                self.bump();
            }
        }

        // Whatever is left is a run of unnamed types, one field each.
        for item in pending {
            let range = self.nodes[item.index()].range;
            fields.push(self.alloc(
                NodeKind::Field {
                    names: Vec::new(),
                    ty: Some(item),
                },
                range,
            ));
        }
        Ok(fields)
    }

    fn parse_value_decl(&mut self, out: &mut Vec<NodeId>) -> Result<(), ParseError> {
        let kw = self.bump();
        let is_const = kw.kind == TokenKind::Const;
        if self.at(TokenKind::LParen) {
            self.bump();
            while !self.at(TokenKind::RParen) {
                if self.at(TokenKind::Semi) {
                    self.bump();
                    continue;
                }
                if self.at_eof() {
                    return Err(self.error("unexpected end of file in declaration group".to_string()));
                }
                out.push(self.parse_value_spec(is_const, kw.range.start())?);
                self.expect_semi()?;
            }
            self.expect(TokenKind::RParen, "')'")?;
        } else {
            out.push(self.parse_value_spec(is_const, kw.range.start())?);
        }
        Ok(())
    }

    fn parse_value_spec(&mut self, is_const: bool, kw_start: TextSize) -> Result<NodeId, ParseError> {
        let start = self.start().min(kw_start);
        let mut names = vec![self.parse_ident()?];
        while self.at(TokenKind::Comma) {
            self.bump();
            names.push(self.parse_ident()?);
        }
        let ty = if !self.at(TokenKind::Eq) && self.starts_type() {
            Some(self.parse_type()?)
        } else {
            None
        };
        let values = if self.at(TokenKind::Eq) {
            self.bump();
            self.parse_expr_list()?
        } else {
            Vec::new()
        };
        Ok(self.alloc(
            NodeKind::ValueSpec {
                names,
                ty,
                values,
                is_const,
            },
            self.span_from(start),
        ))
    }

    fn parse_type_decl(&mut self, out: &mut Vec<NodeId>) -> Result<(), ParseError> {
        let kw = self.expect(TokenKind::Type, "'type'")?;
        if self.at(TokenKind::LParen) {
            self.bump();
            while !self.at(TokenKind::RParen) {
                if self.at(TokenKind::Semi) {
                    self.bump();
                    continue;
                }
                if self.at_eof() {
                    return Err(self.error("unexpected end of file in type group".to_string()));
                }
                out.push(self.parse_type_spec(kw.range.start())?);
                self.expect_semi()?;
            }
            self.expect(TokenKind::RParen, "')'")?;
        } else {
            out.push(self.parse_type_spec(kw.range.start())?);
        }
        Ok(())
    }

    fn parse_type_spec(&mut self, kw_start: TextSize) -> Result<NodeId, ParseError> {
        let start = self.start().min(kw_start);
        let name = self.parse_ident()?;
        let ty = self.parse_type()?;
        Ok(self.alloc(NodeKind::TypeDecl { name, ty }, self.span_from(start)))
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn starts_type(&self) -> bool {
        matches!(
            self.kind(),
            Some(
                TokenKind::Ident
                    | TokenKind::Star
                    | TokenKind::LBracket
                    | TokenKind::Map
                    | TokenKind::Func
                    | TokenKind::Struct
                    | TokenKind::Interface
                    | TokenKind::LParen
            )
        )
    }

    fn parse_type(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        match self.kind() {
            Some(TokenKind::Star) => {
                self.bump();
                let inner = self.parse_type()?;
                Ok(self.alloc(NodeKind::PointerType { inner }, self.span_from(start)))
            }
            Some(TokenKind::LBracket) => {
                self.bump();
                let len = if !self.at(TokenKind::RBracket) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(TokenKind::RBracket, "']'")?;
                let elem = self.parse_type()?;
                Ok(self.alloc(NodeKind::ArrayType { len, elem }, self.span_from(start)))
            }
            Some(TokenKind::Map) => {
                self.bump();
                self.expect(TokenKind::LBracket, "'['")?;
                let key = self.parse_type()?;
                self.expect(TokenKind::RBracket, "']'")?;
                let value = self.parse_type()?;
                Ok(self.alloc(NodeKind::MapType { key, value }, self.span_from(start)))
            }
            Some(TokenKind::Func) => {
                self.bump();
                let (params, results) = self.parse_signature()?;
                Ok(self.alloc(NodeKind::FuncType { params, results }, self.span_from(start)))
            }
            Some(TokenKind::Struct) => {
                self.bump();
                let fields = self.parse_struct_body()?;
                Ok(self.alloc(NodeKind::StructType { fields }, self.span_from(start)))
            }
            Some(TokenKind::Interface) => {
                self.bump();
                let methods = self.parse_interface_body()?;
                Ok(self.alloc(NodeKind::InterfaceType { methods }, self.span_from(start)))
            }
            Some(TokenKind::LParen) => {
                self.bump();
                let inner = self.parse_type()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(self.alloc(NodeKind::Paren { inner }, self.span_from(start)))
            }
            Some(TokenKind::Ident) => {
                let ident = self.parse_ident()?;
                if self.at(TokenKind::Dot) && self.nth_kind(1) == Some(TokenKind::Ident) {
                    self.bump();
                    let member = self.parse_ident()?;
                    Ok(self.alloc(
                        NodeKind::Selector {
                            base: ident,
                            member,
                        },
                        self.span_from(start),
                    ))
                } else {
                    Ok(ident)
                }
            }
            _ => Err(self.error("expected type".to_string())),
        }
    }

    fn parse_struct_body(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Semi) {
                self.bump();
                continue;
            }
            if self.at_eof() {
                return Err(self.error("unexpected end of file in struct body".to_string()));
            }
            fields.push(self.parse_struct_field()?);
            self.expect_semi()?;
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(fields)
    }

    /// One struct field line: `Name Type`, `A, B Type`, or an embedded
    /// type. An optional trailing string tag is consumed and dropped.
    fn parse_struct_field(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let first = self.parse_type()?;

        let field = if self.is_ident(first) && (self.at(TokenKind::Comma) || self.starts_type()) {
            let mut names = vec![first];
            while self.at(TokenKind::Comma) {
                self.bump();
                names.push(self.parse_ident()?);
            }
            let ty = self.parse_type()?;
            self.alloc(
                NodeKind::Field {
                    names,
                    ty: Some(ty),
                },
                self.span_from(start),
            )
        } else {
            // Embedded field: the type itself is the name.
            self.alloc(
                NodeKind::Field {
                    names: Vec::new(),
                    ty: Some(first),
                },
                self.span_from(start),
            )
        };

        if self.at(TokenKind::String) || self.at(TokenKind::RawString) {
            self.bump();
            self.nodes[field.index()].range = self.span_from(start);
        }
        Ok(field)
    }

    fn parse_interface_body(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Semi) {
                self.bump();
                continue;
            }
            if self.at_eof() {
                return Err(self.error("unexpected end of file in interface body".to_string()));
            }
            let start = self.start();
            let name = self.parse_ident()?;
            let method = if self.at(TokenKind::LParen) {
                let (params, results) = self.parse_signature()?;
                let fn_ty = self.alloc(NodeKind::FuncType { params, results }, self.span_from(start));
                self.alloc(
                    NodeKind::Field {
                        names: vec![name],
                        ty: Some(fn_ty),
                    },
                    self.span_from(start),
                )
            } else {
                // Embedded interface.
                self.alloc(
                    NodeKind::Field {
                        names: Vec::new(),
                        ty: Some(name),
                    },
                    self.span_from(start),
                )
            };
            methods.push(method);
            self.expect_semi()?;
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(methods)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// `{ stmt; ... }` — as a `FuncBody` when it is a function's body,
    /// otherwise as a plain `Block`.
    fn parse_stmt_list(&mut self, is_func_body: bool) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Semi) {
                self.bump();
                continue;
            }
            if self.at_eof() {
                return Err(self.error("unexpected end of file, expected '}'".to_string()));
            }
            self.parse_stmt(&mut stmts)?;
            self.expect_semi()?;
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        let kind = if is_func_body {
            NodeKind::FuncBody { stmts }
        } else {
            NodeKind::Block { stmts }
        };
        Ok(self.alloc(kind, self.span_from(start)))
    }

    fn parse_stmt(&mut self, out: &mut Vec<NodeId>) -> Result<(), ParseError> {
        match self.kind() {
            Some(TokenKind::Var) | Some(TokenKind::Const) => self.parse_value_decl(out),
            Some(TokenKind::Type) => self.parse_type_decl(out),
            Some(TokenKind::Return) => {
                let start = self.start();
                self.bump();
                let exprs = if self.at(TokenKind::Semi) || self.at(TokenKind::RBrace) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                out.push(self.alloc(NodeKind::ReturnStmt { exprs }, self.span_from(start)));
                Ok(())
            }
            Some(TokenKind::Break) | Some(TokenKind::Continue) => {
                let start = self.start();
                self.bump();
                if self.at(TokenKind::Ident) {
                    // Label, not modeled.
                    self.bump();
                }
                out.push(self.alloc(NodeKind::BranchStmt, self.span_from(start)));
                Ok(())
            }
            Some(TokenKind::LBrace) => {
                out.push(self.parse_stmt_list(false)?);
                Ok(())
            }
            Some(TokenKind::If) => {
                out.push(self.parse_if_stmt()?);
                Ok(())
            }
            Some(TokenKind::For) => {
                out.push(self.parse_for_stmt()?);
                Ok(())
            }
            _ => {
                let stmt = match self.parse_header()? {
                    Header::Stmt(s) => s,
                    Header::Expr(e) => {
                        let range = self.nodes[e.index()].range;
                        self.alloc(NodeKind::ExprStmt { expr: e }, range)
                    }
                };
                out.push(stmt);
                Ok(())
            }
        }
    }

    /// Parse a simple statement or bare expression without committing to a
    /// statement node, so `if`/`for` headers can decide afterwards.
    fn parse_header(&mut self) -> Result<Header, ParseError> {
        let start = self.start();
        let lhs = self.parse_expr_list()?;
        match self.kind() {
            Some(TokenKind::ColonEq) => {
                self.bump();
                let rhs = self.parse_assign_rhs()?;
                Ok(Header::Stmt(self.alloc(
                    NodeKind::ShortAssign { lhs, rhs },
                    self.span_from(start),
                )))
            }
            Some(TokenKind::Eq) => {
                self.bump();
                let rhs = self.parse_assign_rhs()?;
                Ok(Header::Stmt(self.alloc(
                    NodeKind::Assign { lhs, rhs },
                    self.span_from(start),
                )))
            }
            Some(TokenKind::PlusPlus) | Some(TokenKind::MinusMinus) if lhs.len() == 1 => {
                self.bump();
                let expr = lhs[0];
                Ok(Header::Stmt(
                    self.alloc(NodeKind::ExprStmt { expr }, self.span_from(start)),
                ))
            }
            _ if lhs.len() == 1 => Ok(Header::Expr(lhs[0])),
            _ => Err(self.error("expected assignment".to_string())),
        }
    }

    fn parse_assign_rhs(&mut self) -> Result<Vec<NodeId>, ParseError> {
        if self.at(TokenKind::Range) {
            self.bump();
            Ok(vec![self.parse_expr()?])
        } else {
            self.parse_expr_list()
        }
    }

    fn parse_if_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect(TokenKind::If, "'if'")?;
        let saved = std::mem::replace(&mut self.no_composite, true);

        let first = self.parse_header()?;
        let (init, cond) = if self.at(TokenKind::Semi) {
            self.bump();
            let init = match first {
                Header::Stmt(s) => s,
                Header::Expr(e) => {
                    let range = self.nodes[e.index()].range;
                    self.alloc(NodeKind::ExprStmt { expr: e }, range)
                }
            };
            (Some(init), self.parse_expr()?)
        } else {
            match first {
                Header::Expr(e) => (None, e),
                Header::Stmt(_) => {
                    self.no_composite = saved;
                    return Err(self.error("expected condition expression".to_string()));
                }
            }
        };
        self.no_composite = saved;

        let then_block = self.parse_stmt_list(false)?;
        let else_branch = if self.at(TokenKind::Else) {
            self.bump();
            if self.at(TokenKind::If) {
                Some(self.parse_if_stmt()?)
            } else {
                Some(self.parse_stmt_list(false)?)
            }
        } else {
            None
        };

        Ok(self.alloc(
            NodeKind::IfStmt {
                init,
                cond,
                then_block,
                else_branch,
            },
            self.span_from(start),
        ))
    }

    fn parse_for_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect(TokenKind::For, "'for'")?;
        let saved = std::mem::replace(&mut self.no_composite, true);

        let (init, cond, post) = if self.at(TokenKind::LBrace) {
            (None, None, None)
        } else if self.at(TokenKind::Range) {
            self.bump();
            (None, Some(self.parse_expr()?), None)
        } else {
            let first = self.parse_header()?;
            if self.at(TokenKind::Semi) {
                self.bump();
                let init = match first {
                    Header::Stmt(s) => s,
                    Header::Expr(e) => {
                        let range = self.nodes[e.index()].range;
                        self.alloc(NodeKind::ExprStmt { expr: e }, range)
                    }
                };
                let cond = if !self.at(TokenKind::Semi) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(TokenKind::Semi, "';'")?;
                let post = if !self.at(TokenKind::LBrace) {
                    Some(match self.parse_header()? {
                        Header::Stmt(s) => s,
                        Header::Expr(e) => {
                            let range = self.nodes[e.index()].range;
                            self.alloc(NodeKind::ExprStmt { expr: e }, range)
                        }
                    })
                } else {
                    None
                };
                (Some(init), cond, post)
            } else {
                match first {
                    // `for cond { ... }`
                    Header::Expr(e) => (None, Some(e), None),
                    // `for k, v := range m { ... }`
                    Header::Stmt(s) => (Some(s), None, None),
                }
            }
        };
        self.no_composite = saved;

        let body = self.parse_stmt_list(false)?;
        Ok(self.alloc(
            NodeKind::ForStmt {
                init,
                cond,
                post,
                body,
            },
            self.span_from(start),
        ))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr_list(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.at(TokenKind::Comma) {
            self.bump();
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_expr(&mut self) -> Result<NodeId, ParseError> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<NodeId, ParseError> {
        let start = self.start();
        let mut lhs = self.parse_unary()?;
        while let Some(prec) = self.kind().and_then(binary_prec) {
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(prec + 1)?;
            lhs = self.alloc(NodeKind::Binary { lhs, rhs }, self.span_from(start));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<NodeId, ParseError> {
        match self.kind() {
            Some(
                TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Bang
                | TokenKind::Caret
                | TokenKind::Star
                | TokenKind::Amp
                | TokenKind::Arrow,
            ) => {
                let start = self.start();
                self.bump();
                let operand = self.parse_unary()?;
                Ok(self.alloc(NodeKind::Unary { operand }, self.span_from(start)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let mut base = self.parse_operand()?;
        loop {
            match self.kind() {
                Some(TokenKind::Dot) => {
                    self.bump();
                    let member = self.parse_ident()?;
                    base = self.alloc(NodeKind::Selector { base, member }, self.span_from(start));
                }
                Some(TokenKind::LParen) => {
                    self.bump();
                    let saved = std::mem::replace(&mut self.no_composite, false);
                    let args = if !self.at(TokenKind::RParen) {
                        self.parse_expr_list()?
                    } else {
                        Vec::new()
                    };
                    self.no_composite = saved;
                    self.expect(TokenKind::RParen, "')'")?;
                    base = self.alloc(NodeKind::Call { callee: base, args }, self.span_from(start));
                }
                Some(TokenKind::LBracket) => {
                    self.bump();
                    let saved = std::mem::replace(&mut self.no_composite, false);
                    let index = self.parse_expr()?;
                    self.no_composite = saved;
                    self.expect(TokenKind::RBracket, "']'")?;
                    base = self.alloc(NodeKind::Index { base, index }, self.span_from(start));
                }
                Some(TokenKind::LBrace)
                    if !self.no_composite && self.is_composite_type(base) =>
                {
                    let elems = self.parse_composite_elems()?;
                    base = self.alloc(
                        NodeKind::CompositeLit {
                            ty: Some(base),
                            elems,
                        },
                        self.span_from(start),
                    );
                }
                _ => break,
            }
        }
        Ok(base)
    }

    fn is_composite_type(&self, id: NodeId) -> bool {
        matches!(
            self.nodes[id.index()].kind,
            NodeKind::Ident { .. } | NodeKind::Selector { .. }
        )
    }

    fn parse_composite_elems(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let saved = std::mem::replace(&mut self.no_composite, false);
        let mut elems = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Semi) {
                self.bump();
                continue;
            }
            if self.at_eof() {
                self.no_composite = saved;
                return Err(self.error("unexpected end of file in composite literal".to_string()));
            }
            let start = self.start();
            let expr = self.parse_expr()?;
            let elem = if self.at(TokenKind::Colon) {
                self.bump();
                let value = self.parse_expr()?;
                self.alloc(NodeKind::KeyValue { key: expr, value }, self.span_from(start))
            } else {
                expr
            };
            elems.push(elem);
            if self.at(TokenKind::Comma) {
                self.bump();
            }
        }
        self.no_composite = saved;
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(elems)
    }

    fn parse_operand(&mut self) -> Result<NodeId, ParseError> {
        match self.kind() {
            Some(TokenKind::Ident) => self.parse_ident(),
            Some(
                TokenKind::Int
                | TokenKind::Float
                | TokenKind::String
                | TokenKind::RawString
                | TokenKind::Rune,
            ) => {
                let tok = self.bump();
                Ok(self.alloc(NodeKind::Literal, tok.range))
            }
            Some(TokenKind::LParen) => {
                let start = self.start();
                self.bump();
                let saved = std::mem::replace(&mut self.no_composite, false);
                let inner = self.parse_expr()?;
                self.no_composite = saved;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(self.alloc(NodeKind::Paren { inner }, self.span_from(start)))
            }
            _ => Err(self.error("expected expression".to_string())),
        }
    }
}

fn binary_prec(kind: TokenKind) -> Option<u8> {
    match kind {
        TokenKind::PipePipe => Some(1),
        TokenKind::AmpAmp => Some(2),
        TokenKind::EqEq
        | TokenKind::BangEq
        | TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq => Some(3),
        TokenKind::Plus | TokenKind::Minus | TokenKind::Pipe | TokenKind::Caret => Some(4),
        TokenKind::Star
        | TokenKind::Slash
        | TokenKind::Percent
        | TokenKind::Shl
        | TokenKind::Shr
        | TokenKind::Amp => Some(5),
        _ => None,
    }
}

fn unquote(text: &str) -> SmolStr {
    if text.len() >= 2 {
        SmolStr::new(&text[1..text.len() - 1])
    } else {
        SmolStr::new(text)
    }
}
