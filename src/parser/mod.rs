//! Recursive-descent parser building nodes directly into an [`Ast`].

use crate::ast::{
    Access, Ast, BinaryExpr, BinaryOp, Block, ClassDecl, FArg, FieldAccess, ForEach, Function, IfStmt, Literal,
    Metadata, Method, MethodCall, NodeId, Program, Property, ReturnStmt, TypeRef, VarAssign, VarDecl, VarRef,
    function::MAIN, var_ref::THIS,
};
use crate::diagnostics::{CompileError, CompileResult};
use crate::lexer::{lex, token::Token};
use crate::span::{Span, Spanned};

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
    ast: &'a mut Ast,
}

/// Parse a query. Top-level statements become the body of a synthesized `main` function.
pub fn parse_program(source: &str) -> CompileResult<(Ast, NodeId)> {
    let tokens = lex(source)?;
    let mut ast = Ast::new();
    let root = Parser::new(&tokens, source, &mut ast).parse_program()?;
    Ok((ast, root))
}

/// Parse a comma-separated parameter list such as `Path path, Map<Int, Result> data`
/// into unowned `FArg` nodes of `ast`.
pub fn parse_params(ast: &mut Ast, source: &str) -> CompileResult<Vec<NodeId>> {
    let tokens = lex(source)?;
    let mut parser = Parser::new(&tokens, source, ast);
    let mut args = Vec::new();
    while !parser.is_at_end() {
        if !args.is_empty() {
            parser.expect(&Token::Comma)?;
        }
        args.push(parser.parse_param()?);
    }
    Ok(args)
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str, ast: &'a mut Ast) -> Self {
        Self { tokens, source, pos: 0, ast }
    }

    fn peek(&self) -> Option<&'a Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(&t.node) == std::mem::discriminant(expected))
    }

    fn advance(&mut self) -> Option<&'a Spanned<Token>> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> CompileResult<Span> {
        match self.peek() {
            Some(tok) if std::mem::discriminant(&tok.node) == std::mem::discriminant(expected) => {
                self.pos += 1;
                Ok(tok.span)
            }
            Some(tok) => Err(CompileError::syntax(format!("expected {expected}, found {}", tok.node), tok.span)),
            None => Err(CompileError::syntax(format!("expected {expected}, found end of input"), self.eof_span())),
        }
    }

    fn expect_ident(&mut self) -> CompileResult<Spanned<String>> {
        match self.peek() {
            Some(tok) if matches!(tok.node, Token::Ident) => {
                self.pos += 1;
                Ok(Spanned::new(self.source[tok.span.start..tok.span.end].to_string(), tok.span))
            }
            Some(tok) => Err(CompileError::syntax(format!("expected identifier, found {}", tok.node), tok.span)),
            None => Err(CompileError::syntax("expected identifier, found end of input", self.eof_span())),
        }
    }

    fn eof_span(&self) -> Span {
        match self.tokens.last() {
            Some(last) => Span::with_position(last.span.end, last.span.end, last.span.line, last.span.column),
            None => Span::with_position(0, 0, 1, 1),
        }
    }

    fn unexpected<T>(&self, what: &str) -> CompileResult<T> {
        match self.peek() {
            Some(tok) => Err(CompileError::syntax(format!("expected {what}, found {}", tok.node), tok.span)),
            None => Err(CompileError::syntax(format!("expected {what}, found end of input"), self.eof_span())),
        }
    }

    pub fn parse_program(&mut self) -> CompileResult<NodeId> {
        let mut classes = Vec::new();
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            if self.check(&Token::LBracket) || self.check(&Token::Class) {
                classes.push(self.parse_class()?);
            } else {
                stmts.push(self.parse_stmt()?);
            }
        }

        let whole = match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => Span::with_position(0, 0, 1, 1),
        };
        let body = self.ast.synthesize(Block::new(stmts), whole)?;
        let main = self.ast.synthesize(Function::new(MAIN, Vec::new(), None, Some(body)), whole)?;
        self.ast.create(Program::new(classes, main), whole)
    }

    fn parse_class(&mut self) -> CompileResult<NodeId> {
        let start = self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span());
        let mut metadatas = Vec::new();
        while self.check(&Token::LBracket) {
            metadatas.push(self.parse_metadata()?);
        }
        self.expect(&Token::Class)?;
        let name = self.expect_ident()?;
        self.expect(&Token::LBrace)?;
        let mut members = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.is_at_end() {
                return self.unexpected("'}'");
            }
            members.push(self.parse_member()?);
        }
        let end = self.expect(&Token::RBrace)?;
        self.ast.create(ClassDecl::new(name.node, metadatas, members), start.to(end))
    }

    fn parse_metadata(&mut self) -> CompileResult<NodeId> {
        let start = self.expect(&Token::LBracket)?;
        let name = self.expect_ident()?;
        let mut args = Vec::new();
        if self.eat(&Token::LParen) {
            loop {
                match self.advance() {
                    Some(Spanned { node: Token::StringLit(s), .. }) => args.push(s.clone()),
                    Some(tok) => {
                        return Err(CompileError::syntax(format!("expected string, found {}", tok.node), tok.span));
                    }
                    None => return self.unexpected("string"),
                }
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
        }
        let end = self.expect(&Token::RBracket)?;
        self.ast.create(Metadata::new(name.node, args), start.to(end))
    }

    fn parse_member(&mut self) -> CompileResult<NodeId> {
        let start = self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span());
        let access = if self.eat(&Token::Public) {
            Access::Public
        } else if self.eat(&Token::Private) {
            Access::Private
        } else {
            return self.unexpected("'public' or 'private'");
        };
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;

        if self.eat(&Token::LParen) {
            let mut args = Vec::new();
            while !self.check(&Token::RParen) {
                if !args.is_empty() {
                    self.expect(&Token::Comma)?;
                }
                args.push(self.parse_param()?);
            }
            let close = self.expect(&Token::RParen)?;
            let (body, end) = if self.check(&Token::LBrace) {
                let body = self.parse_block()?;
                (Some(body), self.ast.span(body))
            } else {
                (None, self.expect(&Token::Semi)?)
            };
            let function = self
                .ast
                .create(Function::new(name.node, args, Some(ty), body), name.span.to(close))?;
            self.ast.create(Method::new(access, function), start.to(end))
        } else {
            let end = self.expect(&Token::Semi)?;
            let decl = self.ast.create(VarDecl::new(Some(ty), name.node, None), name.span)?;
            self.ast.create(Property::new(access, decl), start.to(end))
        }
    }

    fn parse_param(&mut self) -> CompileResult<NodeId> {
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        let span = self.ast.span(ty).to(name.span);
        let decl = self.ast.create(VarDecl::new(Some(ty), name.node, None), span)?;
        self.ast.create(FArg::new(Some(decl)), span)
    }

    fn parse_type(&mut self) -> CompileResult<NodeId> {
        let name = self.expect_ident()?;
        if !self.eat(&Token::Lt) {
            return self.ast.create(TypeRef::named(name.node), name.span);
        }
        let mut subtypes = vec![self.parse_type()?];
        while self.eat(&Token::Comma) {
            subtypes.push(self.parse_type()?);
        }
        let end = self.expect(&Token::Gt)?;
        self.ast.create(TypeRef::generic(name.node, subtypes), name.span.to(end))
    }

    /// Token index just past a type starting at `i`, if one is there.
    fn skip_type(&self, mut i: usize) -> Option<usize> {
        if !matches!(self.tokens.get(i)?.node, Token::Ident) {
            return None;
        }
        i += 1;
        if !matches!(self.tokens.get(i).map(|t| &t.node), Some(Token::Lt)) {
            return Some(i);
        }
        i = self.skip_type(i + 1)?;
        while matches!(self.tokens.get(i)?.node, Token::Comma) {
            i = self.skip_type(i + 1)?;
        }
        matches!(self.tokens.get(i)?.node, Token::Gt).then_some(i + 1)
    }

    /// A declaration is a type followed directly by the declared name.
    fn is_declaration_ahead(&self) -> bool {
        self.skip_type(self.pos)
            .is_some_and(|end| matches!(self.tokens.get(end).map(|t| &t.node), Some(Token::Ident)))
    }

    fn parse_block(&mut self) -> CompileResult<NodeId> {
        let start = self.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.is_at_end() {
                return self.unexpected("'}'");
            }
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(&Token::RBrace)?;
        self.ast.create(Block::new(stmts), start.to(end))
    }

    fn parse_stmt(&mut self) -> CompileResult<NodeId> {
        match self.peek().map(|t| &t.node) {
            Some(Token::Return) => self.parse_return_stmt(),
            Some(Token::For) => self.parse_for_each(),
            Some(Token::If) => self.parse_if_stmt(),
            Some(Token::Var) => self.parse_var_decl(),
            Some(Token::Ident) if self.is_declaration_ahead() => self.parse_var_decl(),
            Some(_) => {
                let target = self.parse_expr(0)?;
                let stmt = if self.eat(&Token::Eq) {
                    let value = self.parse_expr(0)?;
                    let span = self.ast.span(target).to(self.ast.span(value));
                    self.ast.create(VarAssign::new(target, value), span)?
                } else {
                    target
                };
                self.expect(&Token::Semi)?;
                Ok(stmt)
            }
            None => self.unexpected("statement"),
        }
    }

    fn parse_var_decl(&mut self) -> CompileResult<NodeId> {
        let (ty, start) = if self.check(&Token::Var) {
            (None, self.expect(&Token::Var)?)
        } else {
            let ty = self.parse_type()?;
            (Some(ty), self.ast.span(ty))
        };
        let name = self.expect_ident()?;
        let init = if self.eat(&Token::Eq) { Some(self.parse_expr(0)?) } else { None };
        let end = self.expect(&Token::Semi)?;
        if ty.is_none() && init.is_none() {
            return Err(CompileError::syntax(
                format!("'var {}' needs an initializer to infer its type", name.node),
                start.to(end),
            ));
        }
        self.ast.create(VarDecl::new(ty, name.node, init), start.to(end))
    }

    fn parse_return_stmt(&mut self) -> CompileResult<NodeId> {
        let start = self.expect(&Token::Return)?;
        let value = if self.check(&Token::Semi) { None } else { Some(self.parse_expr(0)?) };
        let end = self.expect(&Token::Semi)?;
        self.ast.create(ReturnStmt::new(value), start.to(end))
    }

    fn parse_for_each(&mut self) -> CompileResult<NodeId> {
        let start = self.expect(&Token::For)?;
        self.expect(&Token::Each)?;
        self.expect(&Token::LParen)?;
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        let decl_span = self.ast.span(ty).to(name.span);
        let decl = self.ast.create(VarDecl::new(Some(ty), name.node, None), decl_span)?;
        self.expect(&Token::In)?;
        let iterator = self.parse_expr(0)?;
        self.expect(&Token::RParen)?;
        let block = self.parse_block()?;
        let span = start.to(self.ast.span(block));
        self.ast.create(ForEach::new(decl, iterator, block), span)
    }

    fn parse_if_stmt(&mut self) -> CompileResult<NodeId> {
        let start = self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let condition = self.parse_expr(0)?;
        self.expect(&Token::RParen)?;
        let then_block = self.parse_block()?;
        let else_branch = if self.eat(&Token::Else) {
            if self.check(&Token::If) { Some(self.parse_if_stmt()?) } else { Some(self.parse_block()?) }
        } else {
            None
        };
        let end = self.ast.span(else_branch.unwrap_or(then_block));
        self.ast.create(IfStmt::new(condition, then_block, else_branch), start.to(end))
    }

    fn parse_expr(&mut self, min_bp: u8) -> CompileResult<NodeId> {
        let mut lhs = self.parse_postfix()?;
        loop {
            let Some(op) = self.peek().and_then(|t| binary_op(&t.node)) else {
                break;
            };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            let span = self.ast.span(lhs).to(self.ast.span(rhs));
            lhs = self.ast.create(BinaryExpr::new(op, lhs, rhs), span)?;
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> CompileResult<NodeId> {
        let mut expr = self.parse_primary()?;
        while self.eat(&Token::Dot) {
            let name = self.expect_ident()?;
            let start = self.ast.span(expr);
            if self.eat(&Token::LParen) {
                let mut args = Vec::new();
                while !self.check(&Token::RParen) {
                    if !args.is_empty() {
                        self.expect(&Token::Comma)?;
                    }
                    args.push(self.parse_expr(0)?);
                }
                let end = self.expect(&Token::RParen)?;
                expr = self.ast.create(MethodCall::new(expr, name.node, args), start.to(end))?;
            } else {
                expr = self.ast.create(FieldAccess::new(expr, name.node), start.to(name.span))?;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> CompileResult<NodeId> {
        let Some(tok) = self.advance() else {
            return self.unexpected("expression");
        };
        match &tok.node {
            Token::IntLit(n) => self.ast.create(Literal::int(*n), tok.span),
            Token::FloatLit(n) => self.ast.create(Literal::float(*n), tok.span),
            Token::True => self.ast.create(Literal::boolean(true), tok.span),
            Token::False => self.ast.create(Literal::boolean(false), tok.span),
            Token::This => self.ast.create(VarRef::new(THIS), tok.span),
            Token::Ident => {
                if self.check(&Token::LParen) {
                    return Err(CompileError::syntax("functions can only be called as methods", tok.span));
                }
                let name = &self.source[tok.span.start..tok.span.end];
                self.ast.create(VarRef::new(name), tok.span)
            }
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Minus => match self.advance() {
                Some(Spanned { node: Token::IntLit(n), span }) => {
                    self.ast.create(Literal::int(n.wrapping_neg()), tok.span.to(*span))
                }
                Some(Spanned { node: Token::FloatLit(n), span }) => {
                    self.ast.create(Literal::float(-n), tok.span.to(*span))
                }
                _ => Err(CompileError::syntax("unary minus only applies to numeric literals", tok.span)),
            },
            other => Err(CompileError::syntax(format!("expected expression, found {other}"), tok.span)),
        }
    }
}

fn binary_op(tok: &Token) -> Option<BinaryOp> {
    Some(match tok {
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Mod,
        Token::EqEq => BinaryOp::Eq,
        Token::BangEq => BinaryOp::NotEq,
        Token::Lt => BinaryOp::Lt,
        Token::LtEq => BinaryOp::LtEq,
        Token::Gt => BinaryOp::Gt,
        Token::GtEq => BinaryOp::GtEq,
        Token::AmpAmp => BinaryOp::And,
        Token::PipePipe => BinaryOp::Or,
        _ => return None,
    })
}

fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Or => (1, 2),
        BinaryOp::And => (3, 4),
        BinaryOp::Eq | BinaryOp::NotEq => (5, 6),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => (7, 8),
        BinaryOp::Add | BinaryOp::Sub => (9, 10),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (11, 12),
    }
}
