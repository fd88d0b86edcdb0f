//! Tokenizer and recursive-descent parser for expressions.
//!
//! Offsets in errors are absolute: every entry point takes the byte offset
//! of the expression inside the template so the caller can report a
//! template line/column without re-scanning.

use super::{BinOp, Expr};
use crate::value::Value;

/// Expression syntax error at an absolute byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprSyntaxError {
    pub message: String,
    pub offset: usize,
}

impl ExprSyntaxError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

type ParseResult<T> = Result<T, ExprSyntaxError>;

/// Deepest expression tree the parser builds. Evaluation recurses over
/// the tree, so this also bounds evaluation stack use.
pub const MAX_EXPR_DEPTH: usize = 128;

/// Parse a complete expression.
pub fn parse_expr(src: &str, base: usize) -> ParseResult<Expr> {
    let mut parser = Parser::new(src, base)?;
    let expr = parser.parse_or()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse the body of a `{...}` hole: an expression with an optional
/// `| directive` suffix. Returns the directive name and its offset.
pub fn parse_hole(src: &str, base: usize) -> ParseResult<(Expr, Option<(String, usize)>)> {
    let mut parser = Parser::new(src, base)?;
    let expr = parser.parse_or()?;
    let directive = if parser.eat(&Tok::Pipe) {
        let offset = parser.offset();
        match parser.next() {
            Tok::Ident(name) => Some((name, offset)),
            _ => return Err(ExprSyntaxError::new("expected a directive name after `|`", offset)),
        }
    } else {
        None
    };
    parser.expect_end()?;
    Ok((expr, directive))
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Pipe,
    Plus,
    Minus,
    Eof,
}

const RESERVED: &[&str] = &["and", "or", "not", "in", "for", "if"];

fn tokenize(src: &str, base: usize) -> ParseResult<Vec<(Tok, usize)>> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let two = bytes.get(i + 1).copied();
        let tok = match c {
            b'(' => Tok::LParen,
            b')' => Tok::RParen,
            b'[' => Tok::LBracket,
            b']' => Tok::RBracket,
            b'{' => Tok::LBrace,
            b'}' => Tok::RBrace,
            b',' => Tok::Comma,
            b':' => Tok::Colon,
            b'.' => Tok::Dot,
            b'+' => Tok::Plus,
            b'-' => Tok::Minus,
            b'=' if two == Some(b'=') => {
                i += 1;
                Tok::EqEq
            }
            b'!' if two == Some(b'=') => {
                i += 1;
                Tok::NotEq
            }
            b'!' => Tok::Bang,
            b'<' if two == Some(b'=') => {
                i += 1;
                Tok::Le
            }
            b'<' => Tok::Lt,
            b'>' if two == Some(b'=') => {
                i += 1;
                Tok::Ge
            }
            b'>' => Tok::Gt,
            b'&' if two == Some(b'&') => {
                i += 1;
                Tok::AndAnd
            }
            b'|' if two == Some(b'|') => {
                i += 1;
                Tok::OrOr
            }
            b'|' => Tok::Pipe,
            b'"' | b'\'' => {
                let (s, end) = scan_string(src, i, base)?;
                tokens.push((Tok::Str(s), base + start));
                i = end;
                continue;
            }
            b'0'..=b'9' => {
                let (tok, end) = scan_number(src, i, base)?;
                tokens.push((tok, base + start));
                i = end;
                continue;
            }
            c if c == b'_' || c.is_ascii_alphabetic() => {
                let mut end = i;
                while end < bytes.len() && (bytes[end] == b'_' || bytes[end].is_ascii_alphanumeric())
                {
                    end += 1;
                }
                tokens.push((Tok::Ident(src[i..end].to_string()), base + start));
                i = end;
                continue;
            }
            _ => {
                let ch = src[i..].chars().next().unwrap_or('?');
                return Err(ExprSyntaxError::new(
                    format!("unexpected character `{ch}` in expression"),
                    base + i,
                ));
            }
        };
        tokens.push((tok, base + start));
        i += 1;
    }

    tokens.push((Tok::Eof, base + src.len()));
    Ok(tokens)
}

/// Scan a quoted string starting at `start`; returns content and end index.
fn scan_string(src: &str, start: usize, base: usize) -> ParseResult<(String, usize)> {
    let mut chars = src[start..].char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('"' | '\''))) => q,
        _ => return Err(ExprSyntaxError::new("expected a string literal", base + start)),
    };
    let mut out = String::new();
    while let Some((off, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((out, start + off + c.len_utf8())),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '0')) => out.push('\0'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(ExprSyntaxError::new("unterminated string literal", base + start))
}

fn scan_number(src: &str, start: usize, base: usize) -> ParseResult<(Tok, usize)> {
    let bytes = src.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let is_float = end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit();
    if is_float {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let f = src[start..end]
            .parse::<f64>()
            .map_err(|_| ExprSyntaxError::new("invalid float literal", base + start))?;
        Ok((Tok::Float(f), end))
    } else {
        let i = src[start..end]
            .parse::<i64>()
            .map_err(|_| ExprSyntaxError::new("integer literal out of range", base + start))?;
        Ok((Tok::Int(i), end))
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(src: &str, base: usize) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(src, base)?,
            pos: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> &Tok {
        &self.tokens[self.pos].0
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].1
    }

    fn next(&mut self) -> Tok {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.next();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Tok::Ident(name) if name == kw) {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok, what: &str) -> ParseResult<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_end(&self) -> ParseResult<()> {
        match self.peek() {
            Tok::Eof => Ok(()),
            _ => Err(self.error("unexpected trailing input in expression")),
        }
    }

    fn error(&self, message: impl Into<String>) -> ExprSyntaxError {
        ExprSyntaxError::new(message, self.offset())
    }

    /// One level deeper in the tree being built; undone with `leave`.
    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_EXPR_DEPTH {
            return Err(self.error(format!(
                "expression nested too deeply (limit {MAX_EXPR_DEPTH})"
            )));
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        let mut chained = 0;
        while self.eat(&Tok::OrOr) || self.eat_keyword("or") {
            self.enter()?;
            chained += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        self.leave(chained);
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_not()?;
        let mut chained = 0;
        while self.eat(&Tok::AndAnd) || self.eat_keyword("and") {
            self.enter()?;
            chained += 1;
            let rhs = self.parse_not()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        self.leave(chained);
        Ok(lhs)
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.eat(&Tok::Bang) || self.eat_keyword("not") {
            self.enter()?;
            let inner = self.parse_not()?;
            self.leave(1);
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_add()?;
        let op = match self.peek() {
            Tok::EqEq => BinOp::Eq,
            Tok::NotEq => BinOp::Ne,
            Tok::Lt => BinOp::Lt,
            Tok::Le => BinOp::Le,
            Tok::Gt => BinOp::Gt,
            Tok::Ge => BinOp::Ge,
            Tok::Ident(kw) if kw == "in" => BinOp::In,
            _ => return Ok(lhs),
        };
        self.next();
        self.enter()?;
        let rhs = self.parse_add()?;
        self.leave(1);
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_add(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_postfix()?;
        let mut chained = 0;
        while self.eat(&Tok::Plus) {
            self.enter()?;
            chained += 1;
            let rhs = self.parse_postfix()?;
            lhs = Expr::Binary(BinOp::Add, Box::new(lhs), Box::new(rhs));
        }
        self.leave(chained);
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        let mut chained = 0;
        loop {
            if matches!(self.peek(), Tok::Dot | Tok::LBracket | Tok::LParen) {
                self.enter()?;
                chained += 1;
            }
            if self.eat(&Tok::Dot) {
                match self.next() {
                    Tok::Ident(name) => expr = Expr::Field(Box::new(expr), name),
                    _ => return Err(self.error("expected a field name after `.`")),
                }
            } else if self.eat(&Tok::LBracket) {
                let key = self.parse_or()?;
                self.expect(&Tok::RBracket, "`]`")?;
                expr = Expr::Index(Box::new(expr), Box::new(key));
            } else if self.eat(&Tok::LParen) {
                let args = self.parse_list_items(&Tok::RParen, "`)`")?;
                expr = Expr::Call(Box::new(expr), args);
            } else {
                self.leave(chained);
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        if matches!(self.peek(), Tok::LParen | Tok::LBracket | Tok::LBrace) {
            self.enter()?;
            let expr = self.parse_atom();
            self.leave(1);
            return expr;
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let offset = self.offset();
        match self.next() {
            Tok::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Tok::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Tok::Str(s) => Ok(Expr::Literal(Value::from(s))),
            Tok::Minus => match self.next() {
                Tok::Int(i) => Ok(Expr::Literal(Value::Int(-i))),
                Tok::Float(f) => Ok(Expr::Literal(Value::Float(-f))),
                _ => Err(ExprSyntaxError::new("`-` must be followed by a number", offset)),
            },
            Tok::Ident(name) => match name.as_str() {
                "True" | "true" => Ok(Expr::Literal(Value::Bool(true))),
                "False" | "false" => Ok(Expr::Literal(Value::Bool(false))),
                "None" | "null" => Ok(Expr::Literal(Value::Null)),
                kw if RESERVED.contains(&kw) => Err(ExprSyntaxError::new(
                    format!("unexpected keyword `{kw}`"),
                    offset,
                )),
                _ => Ok(Expr::Var(name)),
            },
            Tok::LParen => {
                let inner = self.parse_or()?;
                self.expect(&Tok::RParen, "`)`")?;
                Ok(inner)
            }
            Tok::LBracket => self.parse_list_or_comprehension(),
            Tok::LBrace => self.parse_map(),
            Tok::Eof => Err(ExprSyntaxError::new("expected an expression", offset)),
            tok => Err(ExprSyntaxError::new(
                format!("unexpected token {tok:?} in expression"),
                offset,
            )),
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn parse_list_items(&mut self, close: &Tok, what: &str) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.parse_or()?);
            if !self.eat(&Tok::Comma) {
                self.expect(close, what)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_list_or_comprehension(&mut self) -> ParseResult<Expr> {
        if self.eat(&Tok::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.parse_or()?;
        if self.eat_keyword("for") {
            let var = match self.next() {
                Tok::Ident(name) if !RESERVED.contains(&name.as_str()) => name,
                _ => return Err(self.error("expected a loop variable after `for`")),
            };
            if !self.eat_keyword("in") {
                return Err(self.error("expected `in` in comprehension"));
            }
            let iter = self.parse_or()?;
            let cond = if self.eat_keyword("if") {
                Some(Box::new(self.parse_or()?))
            } else {
                None
            };
            self.expect(&Tok::RBracket, "`]` closing the comprehension")?;
            return Ok(Expr::Comprehension {
                item: Box::new(first),
                var,
                iter: Box::new(iter),
                cond,
            });
        }
        let mut items = vec![first];
        if self.eat(&Tok::Comma) {
            items.extend(self.parse_list_items(&Tok::RBracket, "`]`")?);
        } else {
            self.expect(&Tok::RBracket, "`]`")?;
        }
        Ok(Expr::List(items))
    }

    fn parse_map(&mut self) -> ParseResult<Expr> {
        let mut entries = Vec::new();
        while !self.eat(&Tok::RBrace) {
            let key = match self.next() {
                Tok::Str(s) | Tok::Ident(s) => s,
                _ => return Err(self.error("expected a mapping key")),
            };
            self.expect(&Tok::Colon, "`:` after mapping key")?;
            let value = self.parse_or()?;
            entries.push((key, value));
            if !self.eat(&Tok::Comma) {
                self.expect(&Tok::RBrace, "`}`")?;
                break;
            }
        }
        Ok(Expr::Map(entries))
    }
}
