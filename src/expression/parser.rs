use crate::expression::ast::{BinaryOp, Expr, FunctionDecl, Lit, Stmt, UnaryOp};
use crate::expression::error::CompileError;
use crate::expression::lexer::{Span, Token, TokenKind, lex};

/// Maximum block/expression nesting accepted from user source.
const MAX_DEPTH: usize = 64;

/// Maximum binary operators in one function. Operator chains build left-deep
/// trees, so this also bounds the tree height seen by lowering and drop.
pub(crate) const MAX_OPERATORS: usize = 1024;

pub(crate) fn parse_function(src: &str) -> Result<FunctionDecl, CompileError> {
    let tokens = lex(src)?;
    let mut p = Parser {
        tokens,
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let decl = p.parse_decl()?;
    p.expect(TokenKind::Eof)?;
    Ok(decl)
}

#[cfg(test)]
pub(crate) fn parse_expr(src: &str) -> Result<Expr, CompileError> {
    let tokens = lex(src)?;
    let mut p = Parser {
        tokens,
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let expr = p.parse_expr()?;
    p.expect(TokenKind::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        let i = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn span(&self) -> Span {
        self.peek().span
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Span, CompileError> {
        if self.peek().kind == kind {
            Ok(self.bump().span)
        } else {
            Err(CompileError::new(
                self.span().start,
                format!("expected {}, found {}", describe(&kind), describe(&self.peek().kind)),
            ))
        }
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, usize), CompileError> {
        let t = self.bump();
        match t.kind {
            TokenKind::Ident(s) => Ok((s, t.span.start)),
            other => Err(CompileError::new(
                t.span.start,
                format!("expected {what}, found {}", describe(&other)),
            )),
        }
    }

    fn enter(&mut self) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CompileError::new(self.span().start, "nesting is too deep"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Result<Expr, CompileError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(CompileError::new(
                self.span().start,
                format!("too many operators (limit {MAX_OPERATORS})"),
            ));
        }
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_decl(&mut self) -> Result<FunctionDecl, CompileError> {
        self.expect(TokenKind::Fn)?;
        let (name, name_offset) = self.expect_ident("function name")?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.consume(TokenKind::RParen) {
            loop {
                params.push(self.expect_ident("parameter name")?);
                if self.consume(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen)?;
                break;
            }
        }
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            name,
            name_offset,
            params,
            body,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.enter()?;
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.consume(TokenKind::RBrace) {
            if self.peek().kind == TokenKind::Eof {
                return Err(CompileError::new(self.span().start, "unclosed block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.leave();
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        match self.peek().kind.clone() {
            TokenKind::Let => {
                self.bump();
                let (name, offset) = self.expect_ident("variable name")?;
                self.expect(TokenKind::Assign)?;
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Let {
                    name,
                    offset,
                    value,
                })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let body = self.parse_block()?;
                Ok(Stmt::While { cond, body })
            }
            TokenKind::Return => {
                let offset = self.bump().span.start;
                if self.peek().kind == TokenKind::LBrace {
                    let (x, y) = self.parse_vec_literal()?;
                    self.expect(TokenKind::Semicolon)?;
                    return Ok(Stmt::ReturnVec { offset, x, y });
                }
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return { offset, value })
            }
            TokenKind::Ident(name) => {
                let op = match self.peek_at(1) {
                    TokenKind::Assign => None,
                    TokenKind::PlusAssign => Some(BinaryOp::Add),
                    TokenKind::MinusAssign => Some(BinaryOp::Sub),
                    TokenKind::StarAssign => Some(BinaryOp::Mul),
                    TokenKind::SlashAssign => Some(BinaryOp::Div),
                    _ => {
                        return Err(CompileError::new(
                            self.span().start,
                            "expected a statement (let, assignment, if, while or return)",
                        ));
                    }
                };
                let offset = self.bump().span.start;
                self.bump();
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Assign {
                    name,
                    offset,
                    op,
                    value,
                })
            }
            other => Err(CompileError::new(
                self.span().start,
                format!("unexpected {} at start of statement", describe(&other)),
            )),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then = self.parse_block()?;
        let otherwise = if self.consume(TokenKind::Else) {
            if self.peek().kind == TokenKind::If {
                self.enter()?;
                let nested = self.parse_if()?;
                self.leave();
                vec![nested]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    /// `{ x: expr, y: expr }` in either key order.
    fn parse_vec_literal(&mut self) -> Result<(Expr, Expr), CompileError> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut x = None;
        let mut y = None;
        loop {
            let (key, offset) = self.expect_ident("'x' or 'y'")?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expr()?;
            let slot = match key.as_str() {
                "x" => &mut x,
                "y" => &mut y,
                other => {
                    return Err(CompileError::new(
                        offset,
                        format!("unexpected key '{other}' (expected 'x' or 'y')"),
                    ));
                }
            };
            if slot.is_some() {
                return Err(CompileError::new(offset, format!("duplicate key '{key}'")));
            }
            *slot = Some(value);
            if self.consume(TokenKind::Comma) && self.peek().kind != TokenKind::RBrace {
                continue;
            }
            self.expect(TokenKind::RBrace)?;
            break;
        }
        match (x, y) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(CompileError::new(
                open.start,
                "returned object must have both 'x' and 'y'",
            )),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.enter()?;
        let e = self.parse_ternary();
        self.leave();
        e
    }

    fn parse_ternary(&mut self) -> Result<Expr, CompileError> {
        let cond = self.parse_or()?;
        if !self.consume(TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.parse_expr()?;
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut e = self.parse_and()?;
        while self.consume(TokenKind::OrOr) {
            let r = self.parse_and()?;
            e = self.binary(BinaryOp::Or, e, r)?;
        }
        Ok(e)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut e = self.parse_equality()?;
        while self.consume(TokenKind::AndAnd) {
            let r = self.parse_equality()?;
            e = self.binary(BinaryOp::And, e, r)?;
        }
        Ok(e)
    }

    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        let mut e = self.parse_comparison()?;
        loop {
            let op = if self.consume(TokenKind::EqEq) {
                BinaryOp::Eq
            } else if self.consume(TokenKind::Ne) {
                BinaryOp::Ne
            } else {
                break;
            };
            let r = self.parse_comparison()?;
            e = self.binary(op, e, r)?;
        }
        Ok(e)
    }

    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let mut e = self.parse_term()?;
        loop {
            let op = if self.consume(TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.consume(TokenKind::Le) {
                BinaryOp::Le
            } else if self.consume(TokenKind::Gt) {
                BinaryOp::Gt
            } else if self.consume(TokenKind::Ge) {
                BinaryOp::Ge
            } else {
                break;
            };
            let r = self.parse_term()?;
            e = self.binary(op, e, r)?;
        }
        Ok(e)
    }

    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let mut e = self.parse_factor()?;
        loop {
            let op = if self.consume(TokenKind::Plus) {
                BinaryOp::Add
            } else if self.consume(TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let r = self.parse_factor()?;
            e = self.binary(op, e, r)?;
        }
        Ok(e)
    }

    fn parse_factor(&mut self) -> Result<Expr, CompileError> {
        let mut e = self.parse_unary()?;
        loop {
            let op = if self.consume(TokenKind::Star) {
                BinaryOp::Mul
            } else if self.consume(TokenKind::Slash) {
                BinaryOp::Div
            } else if self.consume(TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let r = self.parse_unary()?;
            e = self.binary(op, e, r)?;
        }
        Ok(e)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let op = if self.consume(TokenKind::Minus) {
            UnaryOp::Neg
        } else if self.consume(TokenKind::Bang) {
            UnaryOp::Not
        } else {
            return self.parse_postfix();
        };
        self.enter()?;
        let e = self.parse_unary();
        self.leave();
        Ok(Expr::Unary {
            op,
            expr: Box::new(e?),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let e = self.parse_primary()?;

        if self.peek().kind == TokenKind::Dot {
            return Err(CompileError::new(
                self.span().start,
                "member access is not allowed in motion functions",
            ));
        }

        if self.consume(TokenKind::LParen) {
            let (func, offset) = match e {
                Expr::Ident { name, offset } => (name, offset),
                _ => {
                    return Err(CompileError::new(
                        self.span().start,
                        "call target must be an identifier",
                    ));
                }
            };
            let args = self.parse_args()?;
            if self.peek().kind == TokenKind::LParen {
                return Err(CompileError::new(
                    self.span().start,
                    "call target must be an identifier",
                ));
            }
            return Ok(Expr::Call { func, offset, args });
        }

        Ok(e)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        if self.consume(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.consume(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen)?;
            return Ok(args);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let t = self.bump();
        match t.kind {
            TokenKind::Number(v) => Ok(Expr::Lit(Lit::F64(v))),
            TokenKind::True => Ok(Expr::Lit(Lit::Bool(true))),
            TokenKind::False => Ok(Expr::Lit(Lit::Bool(false))),
            TokenKind::Ident(name) => Ok(Expr::Ident {
                name,
                offset: t.span.start,
            }),
            TokenKind::LParen => {
                let e = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            other => Err(CompileError::new(
                t.span.start,
                format!("unexpected {}", describe(&other)),
            )),
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    let s = match kind {
        TokenKind::Ident(name) => return format!("identifier '{name}'"),
        TokenKind::Number(v) => return format!("number {v}"),
        TokenKind::True => "'true'",
        TokenKind::False => "'false'",
        TokenKind::Fn => "'fn'",
        TokenKind::Let => "'let'",
        TokenKind::If => "'if'",
        TokenKind::Else => "'else'",
        TokenKind::While => "'while'",
        TokenKind::Return => "'return'",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::LBrace => "'{'",
        TokenKind::RBrace => "'}'",
        TokenKind::Comma => "','",
        TokenKind::Dot => "'.'",
        TokenKind::Semicolon => "';'",
        TokenKind::Plus => "'+'",
        TokenKind::Minus => "'-'",
        TokenKind::Star => "'*'",
        TokenKind::Slash => "'/'",
        TokenKind::Percent => "'%'",
        TokenKind::Bang => "'!'",
        TokenKind::Assign => "'='",
        TokenKind::PlusAssign => "'+='",
        TokenKind::MinusAssign => "'-='",
        TokenKind::StarAssign => "'*='",
        TokenKind::SlashAssign => "'/='",
        TokenKind::EqEq => "'=='",
        TokenKind::Ne => "'!='",
        TokenKind::Lt => "'<'",
        TokenKind::Le => "'<='",
        TokenKind::Gt => "'>'",
        TokenKind::Ge => "'>='",
        TokenKind::AndAnd => "'&&'",
        TokenKind::OrOr => "'||'",
        TokenKind::Question => "'?'",
        TokenKind::Colon => "':'",
        TokenKind::Eof => "end of input",
    };
    s.to_owned()
}

#[cfg(test)]
#[path = "../../tests/unit/expression/parser.rs"]
mod tests;
