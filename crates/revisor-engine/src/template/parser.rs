//! Template snippet parsing
//!
//! A snippet is one expression, or one statement: `return`-led,
//! `;`-terminated, a `Type name = init` declaration, or a bare `@Name`
//! annotation. Placeholders `${N}` and `${N:Type}` lex as atoms. Whitespace
//! between tokens folds into node trivia, so an applied template prints
//! exactly as written.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use revisor_core::{build, BinaryOp, Node, UnaryOp};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateParseError {
    #[error("unexpected token `{0}` in template")]
    UnexpectedToken(String),

    #[error("template ended unexpectedly")]
    UnexpectedEnd,

    #[error("unparsed trailing input starting at `{0}`")]
    TrailingInput(String),

    #[error("malformed placeholder near `{0}`")]
    BadPlaceholder(String),
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Int(String),
    Str(String),
    Placeholder {
        index: usize,
        expected: Option<String>,
    },
    Op(&'static str),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    /// Verbatim lexeme, for error messages.
    text: String,
    /// Whitespace between the previous token and this one.
    ws: String,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\$\{(\d+)(?::([A-Za-z_][A-Za-z0-9_.]*))?\}")
            .unwrap_or_else(|e| panic!("invalid placeholder pattern: {e}"))
    })
}

const MULTI_OPS: [&str; 6] = ["==", "!=", "<=", ">=", "&&", "||"];

fn single_op(ch: char) -> Option<&'static str> {
    Some(match ch {
        '=' => "=",
        '<' => "<",
        '>' => ">",
        '+' => "+",
        '-' => "-",
        '*' => "*",
        '/' => "/",
        '%' => "%",
        '!' => "!",
        '?' => "?",
        ':' => ":",
        '.' => ".",
        ',' => ",",
        '(' => "(",
        ')' => ")",
        ';' => ";",
        '@' => "@",
        _ => return None,
    })
}

fn snippet_of(rest: &str) -> String {
    rest.chars().take(12).collect()
}

fn next_token(rest: &str) -> Result<(TokenKind, usize), TemplateParseError> {
    let first = rest
        .chars()
        .next()
        .ok_or(TemplateParseError::UnexpectedEnd)?;
    if first == '$' {
        let caps = placeholder_re()
            .captures(rest)
            .ok_or_else(|| TemplateParseError::BadPlaceholder(snippet_of(rest)))?;
        let index = caps[1]
            .parse::<usize>()
            .map_err(|_| TemplateParseError::BadPlaceholder(snippet_of(rest)))?;
        let expected = caps.get(2).map(|m| m.as_str().to_string());
        return Ok((TokenKind::Placeholder { index, expected }, caps[0].len()));
    }
    for op in MULTI_OPS {
        if rest.starts_with(op) {
            return Ok((TokenKind::Op(op), op.len()));
        }
    }
    if let Some(op) = single_op(first) {
        return Ok((TokenKind::Op(op), op.len()));
    }
    if first == '"' {
        let mut escaped = false;
        for (i, ch) in rest.char_indices().skip(1) {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return Ok((TokenKind::Str(rest[..=i].to_string()), i + 1));
            }
        }
        return Err(TemplateParseError::UnexpectedEnd);
    }
    if first.is_ascii_digit() {
        let len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        return Ok((TokenKind::Int(rest[..len].to_string()), len));
    }
    if first.is_alphabetic() || first == '_' {
        let len = rest
            .find(|c: char| !c.is_alphanumeric() && c != '_')
            .unwrap_or(rest.len());
        return Ok((TokenKind::Ident(rest[..len].to_string()), len));
    }
    Err(TemplateParseError::UnexpectedToken(first.to_string()))
}

fn lex(text: &str) -> Result<Vec<Token>, TemplateParseError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    loop {
        let trimmed = rest.trim_start();
        let ws = rest[..rest.len() - trimmed.len()].to_string();
        rest = trimmed;
        if rest.is_empty() {
            break;
        }
        let (kind, len) = next_token(rest)?;
        tokens.push(Token {
            kind,
            text: rest[..len].to_string(),
            ws,
        });
        rest = &rest[len..];
    }
    Ok(tokens)
}

/// Parse a snippet into an unattributed node with trivia in place.
pub(crate) fn parse_snippet(text: &str) -> Result<Node, TemplateParseError> {
    let tokens = lex(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.snippet()?;
    if let Some(token) = parser.peek() {
        return Err(TemplateParseError::TrailingInput(token.text.clone()));
    }
    Ok(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Result<Token, TemplateParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(TemplateParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn eat_op(&mut self, sym: &str) -> Option<String> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Op(op),
                ws,
                ..
            }) if *op == sym => {
                let ws = ws.clone();
                self.pos += 1;
                Some(ws)
            }
            _ => None,
        }
    }

    fn expect_op(&mut self, sym: &'static str) -> Result<String, TemplateParseError> {
        self.eat_op(sym).ok_or_else(|| match self.tokens.get(self.pos) {
            Some(token) => TemplateParseError::UnexpectedToken(token.text.clone()),
            None => TemplateParseError::UnexpectedEnd,
        })
    }

    fn eat_any(&mut self, ops: &[(&'static str, BinaryOp)]) -> Option<(BinaryOp, String)> {
        if let Some(Token {
            kind: TokenKind::Op(sym),
            ws,
            ..
        }) = self.peek()
        {
            for (candidate, op) in ops {
                if *sym == *candidate {
                    let ws = ws.clone();
                    self.pos += 1;
                    return Some((*op, ws));
                }
            }
        }
        None
    }

    fn expect_ident(&mut self) -> Result<(String, String), TemplateParseError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ws,
                ..
            }) => {
                let pair = (name.clone(), ws.clone());
                self.pos += 1;
                Ok(pair)
            }
            Some(token) => Err(TemplateParseError::UnexpectedToken(token.text.clone())),
            None => Err(TemplateParseError::UnexpectedEnd),
        }
    }

    fn is_var_decl_head(&self) -> bool {
        let is_plain_ident = |t: Option<&Token>| {
            matches!(t, Some(Token { kind: TokenKind::Ident(name), .. })
                if !matches!(name.as_str(), "return" | "new" | "true" | "false" | "null"))
        };
        is_plain_ident(self.peek())
            && is_plain_ident(self.peek_at(1))
            && matches!(
                self.peek_at(2),
                Some(Token {
                    kind: TokenKind::Op("="),
                    ..
                })
            )
    }

    fn snippet(&mut self) -> Result<Node, TemplateParseError> {
        if let Some(ws) = self.eat_op("@") {
            let (name, _) = self.expect_ident()?;
            return Ok(build::annotation(&name).with_leading(ws));
        }
        if matches!(self.peek(), Some(Token { kind: TokenKind::Ident(name), .. }) if name == "return")
        {
            let token = self.next()?;
            let value = if self.peek().is_none() || self.peek().is_some_and(is_semicolon) {
                None
            } else {
                Some(self.assignment()?)
            };
            let value = match (value, self.eat_op(";")) {
                (Some(v), Some(ws)) => Some(v.push_trailing(&ws)),
                (value, _) => value,
            };
            return Ok(build::ret(value).with_leading(token.ws));
        }
        if self.is_var_decl_head() {
            let (ty, ty_ws) = self.expect_ident()?;
            let (name, _) = self.expect_ident()?;
            self.expect_op("=")?;
            let init = self.assignment()?;
            let init = match self.eat_op(";") {
                Some(ws) => init.push_trailing(&ws),
                None => init,
            };
            return Ok(build::var_decl(
                &name,
                build::type_name(&ty).with_leading(ty_ws),
                Some(init),
            ));
        }
        let expr = self.assignment()?;
        if let Some(ws) = self.eat_op(";") {
            return Ok(build::expr_stmt(expr.push_trailing(&ws)));
        }
        Ok(expr)
    }

    // ==================== Expressions, loosest first ====================

    fn assignment(&mut self) -> Result<Node, TemplateParseError> {
        let lhs = self.ternary()?;
        if let Some(ws) = self.eat_op("=") {
            let rhs = self.assignment()?;
            return Ok(build::assign(lhs.push_trailing(&ws), rhs));
        }
        Ok(lhs)
    }

    fn ternary(&mut self) -> Result<Node, TemplateParseError> {
        let condition = self.or()?;
        if let Some(ws) = self.eat_op("?") {
            let condition = condition.push_trailing(&ws);
            let then_value = self.ternary()?;
            let colon_ws = self.expect_op(":")?;
            let then_value = then_value.push_trailing(&colon_ws);
            let else_value = self.ternary()?;
            return Ok(build::ternary(condition, then_value, else_value));
        }
        Ok(condition)
    }

    fn or(&mut self) -> Result<Node, TemplateParseError> {
        self.tier(&[("||", BinaryOp::Or)], Self::and)
    }

    fn and(&mut self) -> Result<Node, TemplateParseError> {
        self.tier(&[("&&", BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Result<Node, TemplateParseError> {
        self.tier(
            &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Node, TemplateParseError> {
        self.tier(
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Node, TemplateParseError> {
        self.tier(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Node, TemplateParseError> {
        self.tier(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn tier(
        &mut self,
        ops: &[(&'static str, BinaryOp)],
        next: fn(&mut Self) -> Result<Node, TemplateParseError>,
    ) -> Result<Node, TemplateParseError> {
        let mut lhs = next(self)?;
        while let Some((op, ws)) = self.eat_any(ops) {
            let rhs = next(self)?;
            lhs = build::binary(op, lhs.push_trailing(&ws), rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Node, TemplateParseError> {
        if let Some(ws) = self.eat_op("!") {
            return Ok(build::unary(UnaryOp::Not, self.unary()?).with_leading(ws));
        }
        if let Some(ws) = self.eat_op("-") {
            return Ok(build::unary(UnaryOp::Neg, self.unary()?).with_leading(ws));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Node, TemplateParseError> {
        let mut node = self.primary()?;
        while let Some(ws) = self.eat_op(".") {
            node = node.push_trailing(&ws);
            let (name, _) = self.expect_ident()?;
            node = if self.eat_op("(").is_some() {
                let args = self.arguments()?;
                build::call(&name, node, args)
            } else {
                build::field(&name, node)
            };
        }
        Ok(node)
    }

    fn arguments(&mut self) -> Result<Vec<Node>, TemplateParseError> {
        let mut args = Vec::new();
        if self.eat_op(")").is_some() {
            return Ok(args);
        }
        loop {
            let arg = self.assignment()?;
            if let Some(ws) = self.eat_op(",") {
                args.push(arg.push_trailing(&ws));
                continue;
            }
            let ws = self.expect_op(")")?;
            args.push(arg.push_trailing(&ws));
            return Ok(args);
        }
    }

    fn primary(&mut self) -> Result<Node, TemplateParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Op("(") => {
                let inner = self.assignment()?;
                let ws = self.expect_op(")")?;
                Ok(build::paren(inner.push_trailing(&ws)).with_leading(token.ws))
            }
            TokenKind::Ident(ref name) if name == "new" => {
                let (ty, ty_ws) = self.expect_ident()?;
                self.expect_op("(")?;
                let args = self.arguments()?;
                Ok(
                    build::new_expr(build::type_name(&ty).with_leading(ty_ws), args)
                        .with_leading(token.ws),
                )
            }
            TokenKind::Ident(ref name) if matches!(name.as_str(), "true" | "false" | "null") => {
                Ok(build::lit(name).with_leading(token.ws))
            }
            TokenKind::Ident(name) => Ok(build::ident(&name).with_leading(token.ws)),
            TokenKind::Int(text) | TokenKind::Str(text) => {
                Ok(build::lit(&text).with_leading(token.ws))
            }
            TokenKind::Placeholder { index, expected } => {
                Ok(build::placeholder(index, expected).with_leading(token.ws))
            }
            TokenKind::Op(_) => Err(TemplateParseError::UnexpectedToken(token.text)),
        }
    }
}

fn is_semicolon(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Op(";"))
}
