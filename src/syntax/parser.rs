//! Recursive-descent parser for Opal.
//!
//! Produces a full-fidelity syntax tree; the first error aborts the file.

use super::ast::*;
use super::lexer::{self, Token, TokenKind};
use super::{ParseError, Span};

/// Statements/expressions deeper than this abort with a parse error instead
/// of risking a stack overflow on adversarial input.
const MAX_NESTING_DEPTH: usize = 256;

/// Parse a complete Opal source file.
pub fn parse(source: &str) -> Result<SourceFile, ParseError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.parse_file()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Token {
        self.tokens[self.pos]
    }

    fn nth_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos];
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            let tok = self.peek();
            Err(ParseError::new(
                format!("expected {}, found '{}'", what, self.token_text(tok)),
                tok.span.start,
            ))
        }
    }

    fn token_text(&self, tok: Token) -> &'a str {
        if tok.kind == TokenKind::Eof {
            "<eof>"
        } else {
            tok.span.text(self.source)
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                "nesting too deep",
                self.peek().span.start,
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_file(&mut self) -> Result<SourceFile, ParseError> {
        let mut uses = Vec::new();
        let mut functions = Vec::new();

        while self.at(TokenKind::KwUse) {
            uses.push(self.parse_use()?);
        }
        while !self.at(TokenKind::Eof) {
            functions.push(self.parse_function()?);
        }

        Ok(SourceFile {
            uses,
            functions,
            span: Span::new(0, self.source.len()),
        })
    }

    fn parse_use(&mut self) -> Result<UseDecl, ParseError> {
        let kw = self.expect(TokenKind::KwUse, "'use'")?;
        let name = self.expect(TokenKind::Ident, "a module name")?;
        let semi = self.expect(TokenKind::Semi, "';'")?;
        Ok(UseDecl {
            module: name.text(self.source).to_string(),
            span: kw.span.join(semi.span),
        })
    }

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        let ret = self.parse_type()?;
        let name = self.expect(TokenKind::Ident, "a function name")?;
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                let pname = self.expect(TokenKind::Ident, "a parameter name")?;
                params.push(Param {
                    span: ty.span.join(pname.span),
                    ty,
                    name: pname.text(self.source).to_string(),
                    name_span: pname.span,
                });
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Function {
            span: ret.span.join(body.span),
            ret,
            name: name.text(self.source).to_string(),
            name_span: name.span,
            params,
            body,
        })
    }

    fn parse_type(&mut self) -> Result<TypeRef, ParseError> {
        let name = self.expect(TokenKind::Ident, "a type name")?;
        let mut span = name.span;
        let mut args = Vec::new();
        if self.at(TokenKind::Lt) {
            self.bump();
            loop {
                args.push(self.parse_type()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            let gt = self.expect(TokenKind::Gt, "'>'")?;
            span = span.join(gt.span);
        }
        Ok(TypeRef {
            name: name.text(self.source).to_string(),
            args,
            span,
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        let close = self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Block {
            stmts,
            span: open.span.join(close.span),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.enter()?;
        let stmt = self.parse_stmt_inner();
        self.leave();
        stmt
    }

    fn parse_stmt_inner(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().kind {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwVar => self.parse_var_local(),
            TokenKind::Ident => {
                if let Some(local) = self.try_parse_typed_local()? {
                    Ok(Stmt::Local(local))
                } else {
                    self.parse_expr_stmt()
                }
            }
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenKind::KwIf, "'if'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_branch = self.parse_stmt()?;
        let mut span = kw.span.join(then_branch.span());
        let else_branch = if self.eat(TokenKind::KwElse).is_some() {
            let stmt = self.parse_stmt()?;
            span = span.join(stmt.span());
            Some(stmt)
        } else {
            None
        };
        Ok(Stmt::If(Box::new(IfStmt {
            cond,
            then_branch,
            else_branch,
            span,
        })))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenKind::KwWhile, "'while'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_stmt()?;
        let span = kw.span.join(body.span());
        Ok(Stmt::While(Box::new(WhileStmt { cond, body, span })))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenKind::KwReturn, "'return'")?;
        let value = if self.at(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let semi = self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt::Return(ReturnStmt {
            value,
            span: kw.span.join(semi.span),
        }))
    }

    fn parse_var_local(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenKind::KwVar, "'var'")?;
        let name = self.expect(TokenKind::Ident, "a variable name")?;
        self.expect(TokenKind::Assign, "'='")?;
        let init = self.parse_expr()?;
        let semi = self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt::Local(LocalStmt {
            ty: None,
            name: name.text(self.source).to_string(),
            name_span: name.span,
            init: Some(init),
            span: kw.span.join(semi.span),
        }))
    }

    /// Disambiguate `Type name = ...;` from an expression statement. Backs
    /// off without consuming anything when the lookahead does not commit to
    /// a declaration (e.g. `a < b` is a comparison, not a generic type).
    fn try_parse_typed_local(&mut self) -> Result<Option<LocalStmt>, ParseError> {
        let checkpoint = self.pos;
        let ty = match self.parse_type() {
            Ok(ty) => ty,
            Err(_) => {
                self.pos = checkpoint;
                return Ok(None);
            }
        };
        if !self.at(TokenKind::Ident)
            || !matches!(self.nth_kind(1), TokenKind::Assign | TokenKind::Semi)
        {
            self.pos = checkpoint;
            return Ok(None);
        }
        let name = self.bump();
        let init = if self.eat(TokenKind::Assign).is_some() {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let semi = self.expect(TokenKind::Semi, "';'")?;
        Ok(Some(LocalStmt {
            span: ty.span.join(semi.span),
            ty: Some(ty),
            name: name.text(self.source).to_string(),
            name_span: name.span,
            init,
        }))
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expr()?;
        let semi = self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt::Expr(ExprStmt {
            span: expr.span().join(semi.span),
            expr,
        }))
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.parse_assign();
        self.leave();
        expr
    }

    fn parse_assign(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_ternary()?;
        if self.eat(TokenKind::Assign).is_some() {
            let value = self.parse_expr()?;
            let span = target.span().join(value.span());
            return Ok(Expr::Assign(Box::new(AssignExpr {
                target,
                value,
                span,
            })));
        }
        Ok(target)
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_binary(0)?;
        if self.eat(TokenKind::Question).is_some() {
            let when_true = self.parse_expr()?;
            self.expect(TokenKind::Colon, "':'")?;
            let when_false = self.parse_expr()?;
            let span = cond.span().join(when_false.span());
            return Ok(Expr::Ternary(Box::new(TernaryExpr {
                cond,
                when_true,
                when_false,
                span,
            })));
        }
        Ok(cond)
    }

    fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
        Some(match kind {
            TokenKind::OrOr => (BinaryOp::Or, 1),
            TokenKind::AndAnd => (BinaryOp::And, 2),
            TokenKind::EqEq => (BinaryOp::Eq, 3),
            TokenKind::Ne => (BinaryOp::Ne, 3),
            TokenKind::Lt => (BinaryOp::Lt, 4),
            TokenKind::Le => (BinaryOp::Le, 4),
            TokenKind::Gt => (BinaryOp::Gt, 4),
            TokenKind::Ge => (BinaryOp::Ge, 4),
            TokenKind::Plus => (BinaryOp::Add, 5),
            TokenKind::Minus => (BinaryOp::Sub, 5),
            TokenKind::Star => (BinaryOp::Mul, 6),
            TokenKind::Slash => (BinaryOp::Div, 6),
            TokenKind::Percent => (BinaryOp::Rem, 6),
            _ => return None,
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = Self::binary_op(self.peek().kind) {
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span().join(rhs.span());
            lhs = Expr::Binary(Box::new(BinaryExpr { op, lhs, rhs, span }));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let tok = self.bump();
            self.enter()?;
            let operand = self.parse_unary();
            self.leave();
            let operand = operand?;
            let span = tok.span.join(operand.span());
            return Ok(Expr::Unary(Box::new(UnaryExpr { op, operand, span })));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.bump();
                    let name = self.expect(TokenKind::Ident, "a member name")?;
                    let span = expr.span().join(name.span);
                    expr = Expr::Member(Box::new(MemberExpr {
                        recv: expr,
                        name: name.text(self.source).to_string(),
                        name_span: name.span,
                        span,
                    }));
                }
                TokenKind::LParen => {
                    let (args, args_span, full) = self.parse_args()?;
                    let span = expr.span().join(full);
                    expr = Expr::Call(Box::new(CallExpr {
                        callee: expr,
                        args,
                        args_span,
                        span,
                    }));
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_expr()?;
                    let close = self.expect(TokenKind::RBracket, "']'")?;
                    let span = expr.span().join(close.span);
                    expr = Expr::Index(Box::new(IndexExpr {
                        recv: expr,
                        index,
                        span,
                    }));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<(Vec<Expr>, Span, Span), ParseError> {
        let open = self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RParen, "')'")?;
        let interior = Span::new(open.span.end, close.span.start);
        Ok((args, interior, open.span.join(close.span)))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Int => {
                self.bump();
                let text = tok.text(self.source);
                let (digits, long) = match text.strip_suffix(['L']) {
                    Some(d) => (d, true),
                    None => (text, false),
                };
                let value: i64 = digits.parse().map_err(|_| {
                    ParseError::new("integer literal out of range", tok.span.start)
                })?;
                let kind = if long {
                    LitKind::Long(value)
                } else {
                    LitKind::Int(value)
                };
                Ok(Expr::Lit(Lit {
                    kind,
                    span: tok.span,
                }))
            }
            TokenKind::Float => {
                self.bump();
                let text = tok.text(self.source);
                let kind = match text.strip_suffix(['f', 'F']) {
                    Some(d) => {
                        let value: f32 = d.parse().map_err(|_| {
                            ParseError::new("invalid float literal", tok.span.start)
                        })?;
                        LitKind::Float(value)
                    }
                    None => {
                        let value: f64 = text.parse().map_err(|_| {
                            ParseError::new("invalid float literal", tok.span.start)
                        })?;
                        LitKind::Double(value)
                    }
                };
                Ok(Expr::Lit(Lit {
                    kind,
                    span: tok.span,
                }))
            }
            TokenKind::Str => {
                self.bump();
                let value = lexer::unescape_string(tok.text(self.source)).ok_or_else(|| {
                    ParseError::new("invalid escape in string literal", tok.span.start)
                })?;
                Ok(Expr::Lit(Lit {
                    kind: LitKind::Str(value),
                    span: tok.span,
                }))
            }
            TokenKind::Char => {
                self.bump();
                let value = lexer::unescape_char(tok.text(self.source)).ok_or_else(|| {
                    ParseError::new("invalid char literal", tok.span.start)
                })?;
                Ok(Expr::Lit(Lit {
                    kind: LitKind::Char(value),
                    span: tok.span,
                }))
            }
            TokenKind::KwTrue | TokenKind::KwFalse => {
                self.bump();
                Ok(Expr::Lit(Lit {
                    kind: LitKind::Bool(tok.kind == TokenKind::KwTrue),
                    span: tok.span,
                }))
            }
            TokenKind::KwNull => {
                self.bump();
                Ok(Expr::Lit(Lit {
                    kind: LitKind::Null,
                    span: tok.span,
                }))
            }
            TokenKind::KwNew => {
                self.bump();
                let ty = self.parse_type()?;
                let (args, args_span, full) = self.parse_args()?;
                Ok(Expr::New(Box::new(NewExpr {
                    span: tok.span.join(full),
                    ty,
                    args,
                    args_span,
                })))
            }
            TokenKind::KwDefault => {
                self.bump();
                if self.at(TokenKind::LParen) {
                    self.bump();
                    let ty = self.parse_type()?;
                    let close = self.expect(TokenKind::RParen, "')'")?;
                    Ok(Expr::Default(DefaultExpr {
                        ty: Some(ty),
                        span: tok.span.join(close.span),
                    }))
                } else {
                    Ok(Expr::Default(DefaultExpr {
                        ty: None,
                        span: tok.span,
                    }))
                }
            }
            TokenKind::LParen => {
                let open = self.bump();
                let inner = self.parse_expr()?;
                let close = self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::Paren(Box::new(ParenExpr {
                    inner,
                    span: open.span.join(close.span),
                })))
            }
            TokenKind::Ident => {
                if self.nth_kind(1) == TokenKind::Arrow {
                    let param = self.bump();
                    self.bump(); // =>
                    let body = self.parse_expr()?;
                    let span = param.span.join(body.span());
                    return Ok(Expr::Lambda(Box::new(LambdaExpr {
                        param: param.text(self.source).to_string(),
                        param_span: param.span,
                        body,
                        span,
                    })));
                }
                self.bump();
                Ok(Expr::Ident(Ident {
                    name: tok.text(self.source).to_string(),
                    span: tok.span,
                }))
            }
            _ => Err(ParseError::new(
                format!("expected an expression, found '{}'", self.token_text(tok)),
                tok.span.start,
            )),
        }
    }
}
