//! Recursive-descent parser.
//!
//! ```text
//! or      := and ( '|' and )*
//! and     := unary ( '&' unary )*
//! unary   := '!' unary | primary
//! primary := WORD | QUOTED | '(' or ')'
//! ```
//!
//! Binary operators associate to the left, so a chain of `n` terms is a tree
//! `n - 1` levels tall. Trees taller than [`MAX_DEPTH`] are rejected, which
//! bounds the recursion of everything that later walks the tree.

use crate::ast::{BinaryOp, QueryNode};
use crate::error::QuerySyntaxError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Limit on both parser recursion and the height of the resulting tree.
pub const MAX_DEPTH: usize = 256;

/// A parsed subtree and its height.
type Subtree = (QueryNode, usize);

/// Parse an already-lowercased query string.
pub fn parse(input: &str) -> Result<QueryNode, QuerySyntaxError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(QuerySyntaxError::new("empty query", 0));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end: input.len(),
    };
    let (root, _) = parser.parse_or()?;

    match parser.peek() {
        None => Ok(root),
        Some(Token {
            kind: TokenKind::RParen,
            position,
        }) => Err(QuerySyntaxError::new("unmatched ')'", *position)),
        Some(token) => Err(QuerySyntaxError::new(
            format!("unexpected {}", describe(&token.kind)),
            token.position,
        )),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume a token of `kind`, returning its position.
    fn eat_position(&mut self, kind: &TokenKind) -> Option<usize> {
        let position = self.peek().filter(|t| &t.kind == kind)?.position;
        self.pos += 1;
        Some(position)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Subtree, QuerySyntaxError> {
        let mut left = self.parse_and()?;
        while let Some(position) = self.eat_position(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = combine(BinaryOp::Or, left, right, position)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Subtree, QuerySyntaxError> {
        let mut left = self.parse_unary()?;
        while let Some(position) = self.eat_position(&TokenKind::And) {
            let right = self.parse_unary()?;
            left = combine(BinaryOp::And, left, right, position)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Subtree, QuerySyntaxError> {
        if let Some(position) = self.eat_position(&TokenKind::Not) {
            self.descend(position)?;
            let argument = self.parse_unary();
            self.depth -= 1;
            let (argument, height) = argument?;
            return Ok((QueryNode::not(argument), grow(height, position)?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Subtree, QuerySyntaxError> {
        let Some(token) = self.next() else {
            return Err(QuerySyntaxError::new("unexpected end of query", self.end));
        };

        match token.kind {
            TokenKind::Word(word) if word.chars().all(|c| c.is_ascii_digit()) => {
                Ok((QueryNode::Literal { value: word }, 1))
            }
            TokenKind::Word(word) => Ok((QueryNode::Identifier { name: word }, 1)),
            TokenKind::Quoted(value) => Ok((QueryNode::Literal { value }, 1)),
            TokenKind::LParen => {
                self.descend(token.position)?;
                let inner = self.parse_or();
                self.depth -= 1;
                let inner = inner?;
                if !self.eat(&TokenKind::RParen) {
                    let position = self.peek().map_or(self.end, |t| t.position);
                    return Err(QuerySyntaxError::new(
                        format!("missing ')' for '(' at position {}", token.position),
                        position,
                    ));
                }
                Ok(inner)
            }
            other => Err(QuerySyntaxError::new(
                format!("expected a word or '(' but found {}", describe(&other)),
                token.position,
            )),
        }
    }

    fn descend(&mut self, position: usize) -> Result<(), QuerySyntaxError> {
        if self.depth >= MAX_DEPTH {
            return Err(QuerySyntaxError::new("query nested too deeply", position));
        }
        self.depth += 1;
        Ok(())
    }
}

fn combine(op: BinaryOp, left: Subtree, right: Subtree, position: usize) -> Result<Subtree, QuerySyntaxError> {
    let height = grow(left.1.max(right.1), position)?;
    Ok((QueryNode::binary(op, left.0, right.0), height))
}

fn grow(height: usize, position: usize) -> Result<usize, QuerySyntaxError> {
    if height >= MAX_DEPTH {
        return Err(QuerySyntaxError::new("query nested too deeply", position));
    }
    Ok(height + 1)
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Word(w) => format!("word '{w}'"),
        TokenKind::Quoted(v) => format!("literal \"{v}\""),
        TokenKind::And => "'&'".to_string(),
        TokenKind::Or => "'|'".to_string(),
        TokenKind::Not => "'!'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
    }
}
