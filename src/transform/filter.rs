//! Row-predicate filter compiled to a polars expression.
//!
//! Accepts the comparison/boolean grammar of typical query strings:
//!
//! ```text
//! amount > 100 and (status == 'active' or vip)
//! ```
//!
//! Operators: `== = != <> > >= < <=`, `and`/`&&`/`&`, `or`/`||`/`|`,
//! `not`/`!`, parentheses. Operands are column names, numbers, and
//! single- or double-quoted string literals. A bare column name is used as
//! a boolean predicate.

use polars::prelude::*;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::transform::Transformer;

pub struct FilterTransformer {
    expression: String,
}

impl FilterTransformer {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

impl Transformer for FilterTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let predicate = compile_predicate(&self.expression)?;
        let before = df.height();
        let filtered = df.lazy().filter(predicate).collect()?;
        info!(
            "[FilterTransformer] '{}': kept {} of {} rows",
            self.expression,
            filtered.height(),
            before
        );
        Ok(filtered)
    }
}

/// Compile a predicate string into a polars [`Expr`].
pub fn compile_predicate(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EtlError::Config("empty filter expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(EtlError::Config(format!(
            "unexpected trailing input in filter expression '{}'",
            input
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Str(String),
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' => {
                // accept both `=` and `==`
                i += if chars.get(i + 1) == Some(&'=') { 2 } else { 1 };
                tokens.push(Token::Eq);
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else if chars.get(i + 1) == Some(&'>') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '&' => {
                i += if chars.get(i + 1) == Some(&'&') { 2 } else { 1 };
                tokens.push(Token::And);
            }
            '|' => {
                i += if chars.get(i + 1) == Some(&'|') { 2 } else { 1 };
                tokens.push(Token::Or);
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    s.push(chars[i]);
                    i += 1;
                }
                if i == chars.len() {
                    return Err(EtlError::Config(format!(
                        "unterminated string literal in filter expression '{}'",
                        input
                    )));
                }
                i += 1;
                tokens.push(Token::Str(s));
            }
            '0'..='9' | '.' | '-' => {
                let mut s = String::new();
                s.push(c);
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == 'e')
                {
                    s.push(chars[i]);
                    i += 1;
                }
                tokens.push(Token::Number(s));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut s = String::new();
                s.push(c);
                i += 1;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    s.push(chars[i]);
                    i += 1;
                }
                match s.to_lowercase().as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    _ => tokens.push(Token::Ident(s)),
                }
            }
            other => {
                return Err(EtlError::Config(format!(
                    "unexpected character '{}' in filter expression '{}'",
                    other, input
                )));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            return Ok(self.parse_not()?.not());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::LParen) {
            self.advance();
            let inner = self.parse_or()?;
            if self.advance() != Some(Token::RParen) {
                return Err(EtlError::Config(
                    "missing closing parenthesis in filter expression".to_string(),
                ));
            }
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_operand()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(Token::Eq),
            Some(Token::Ne) => Some(Token::Ne),
            Some(Token::Gt) => Some(Token::Gt),
            Some(Token::Ge) => Some(Token::Ge),
            Some(Token::Lt) => Some(Token::Lt),
            Some(Token::Le) => Some(Token::Le),
            _ => None,
        };

        let Some(op) = op else {
            // bare column used as a boolean predicate
            return Ok(left);
        };
        self.advance();
        let right = self.parse_operand()?;

        Ok(match op {
            Token::Eq => left.eq(right),
            Token::Ne => left.neq(right),
            Token::Gt => left.gt(right),
            Token::Ge => left.gt_eq(right),
            Token::Lt => left.lt(right),
            Token::Le => left.lt_eq(right),
            _ => unreachable!(),
        })
    }

    fn parse_operand(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(col(&name)),
            Some(Token::Str(s)) => Ok(lit(s)),
            Some(Token::Number(raw)) => {
                if raw.contains('.') || raw.contains('e') {
                    raw.parse::<f64>()
                        .map(lit)
                        .map_err(|_| EtlError::Config(format!("invalid number '{}'", raw)))
                } else {
                    raw.parse::<i64>()
                        .map(lit)
                        .map_err(|_| EtlError::Config(format!("invalid number '{}'", raw)))
                }
            }
            other => Err(EtlError::Config(format!(
                "expected column, number or string in filter expression, found {:?}",
                other
            ))),
        }
    }
}
