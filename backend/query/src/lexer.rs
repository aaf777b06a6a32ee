//! Query tokenizer.
//!
//! Words are runs of letters, digits, `_` and `-`, the same alphabet the word
//! extractor keeps, so a hyphenated word like `re-bake` is one token. Any
//! character outside that alphabet, the operators, parentheses and quotes is
//! rejected here rather than left for evaluation to trip over.

use crate::error::QuerySyntaxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word(String),
    Quoted(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub position: usize,
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, QuerySyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        let kind = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '&' => TokenKind::And,
            '|' => TokenKind::Or,
            '!' => TokenKind::Not,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '"' | '\'' => {
                chars.next();
                let start = position + c.len_utf8();
                let mut end = None;
                for (idx, next) in chars.by_ref() {
                    if next == c {
                        end = Some(idx);
                        break;
                    }
                }
                let Some(end) = end else {
                    return Err(QuerySyntaxError::new("unterminated quoted literal", position));
                };
                if end == start {
                    return Err(QuerySyntaxError::new("empty quoted literal", position));
                }
                tokens.push(Token {
                    kind: TokenKind::Quoted(input[start..end].to_string()),
                    position,
                });
                continue;
            }
            c if is_word_char(c) => {
                let mut end = position;
                while let Some(&(idx, next)) = chars.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    end = idx + next.len_utf8();
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Word(input[position..end].to_string()),
                    position,
                });
                continue;
            }
            other => {
                return Err(QuerySyntaxError::new(
                    format!("unexpected character '{other}'"),
                    position,
                ));
            }
        };
        chars.next();
        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}
