// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lexer for the query language
//!
//! Every parser in the `token` chain must either consume input or return an
//! error; the tokenize loop rejects a parser that reports success without
//! advancing. More specific patterns come before general ones: floats
//! before integers, two-character operators before one-character ones,
//! keywords before identifiers.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1},
    combinator::{map, map_res, recognize},
    multi::many0,
    sequence::{pair, tuple},
    IResult,
};
use std::fmt;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Select,
    From,
    Where,
    Limit,
    As,
    Let,
    And,
    Or,
    Not,
    True,
    False,
    Null,

    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    Identifier(String),

    // Operators
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Regex,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Punctuation
    Dot,
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    // Skipped by tokenize
    Whitespace,
    Comment,

    EOF,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "integer {}", n),
            Token::Float(x) => write!(f, "float {}", x),
            Token::String(s) => write!(f, "string '{}'", s),
            Token::Identifier(s) => write!(f, "identifier '{}'", s),
            Token::EOF => write!(f, "end of input"),
            other => {
                let text = match other {
                    Token::Select => "SELECT",
                    Token::From => "FROM",
                    Token::Where => "WHERE",
                    Token::Limit => "LIMIT",
                    Token::As => "AS",
                    Token::Let => "LET",
                    Token::And => "AND",
                    Token::Or => "OR",
                    Token::Not => "NOT",
                    Token::True => "TRUE",
                    Token::False => "FALSE",
                    Token::Null => "NULL",
                    Token::Equal => "=",
                    Token::NotEqual => "!=",
                    Token::LessThan => "<",
                    Token::LessEqual => "<=",
                    Token::GreaterThan => ">",
                    Token::GreaterEqual => ">=",
                    Token::Regex => "=~",
                    Token::Plus => "+",
                    Token::Minus => "-",
                    Token::Star => "*",
                    Token::Slash => "/",
                    Token::Percent => "%",
                    Token::Dot => ".",
                    Token::Comma => ",",
                    Token::Semicolon => ";",
                    Token::LeftParen => "(",
                    Token::RightParen => ")",
                    Token::LeftBracket => "[",
                    Token::RightBracket => "]",
                    Token::Whitespace => "whitespace",
                    _ => "comment",
                };
                write!(f, "'{}'", text)
            }
        }
    }
}

/// Lexer failure with the byte offset it occurred at
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at offset {position}")]
pub struct LexError {
    pub message: String,
    pub position: usize,
}

impl LexError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Tokens and the byte offset each one starts at
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStream {
    pub tokens: Vec<Token>,
    pub positions: Vec<usize>,
}

impl TokenStream {
    /// Byte offset of the token at `index`, or of the end of input
    pub fn position_of(&self, index: usize) -> usize {
        self.positions
            .get(index)
            .or_else(|| self.positions.last())
            .copied()
            .unwrap_or(0)
    }

    /// True when the stream holds nothing but EOF
    pub fn is_empty(&self) -> bool {
        matches!(self.tokens.as_slice(), [] | [Token::EOF])
    }
}

const KEYWORDS: &[(&str, Token)] = &[
    ("SELECT", Token::Select),
    ("FROM", Token::From),
    ("WHERE", Token::Where),
    ("LIMIT", Token::Limit),
    ("FALSE", Token::False),
    ("TRUE", Token::True),
    ("NULL", Token::Null),
    ("LET", Token::Let),
    ("AND", Token::And),
    ("NOT", Token::Not),
    ("AS", Token::As),
    ("OR", Token::Or),
];

/// Parse one token
fn token(input: &str) -> IResult<&str, Token> {
    alt((
        whitespace,
        map(comment, |_| Token::Comment),
        map(float_literal, Token::Float),
        map(integer_literal, Token::Integer),
        map(backtick_identifier, Token::Identifier),
        map(string_literal, Token::String),
        simple_patterns,
        keyword,
        map(identifier, |s| Token::Identifier(s.to_string())),
    ))(input)
}

fn is_word_boundary(c: char) -> bool {
    !c.is_alphanumeric() && c != '_'
}

/// Case-insensitive keyword match that ends at a word boundary
fn is_keyword_match(input: &str, keyword: &str) -> bool {
    match input.get(..keyword.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(keyword) => input[keyword.len()..]
            .chars()
            .next()
            .map_or(true, is_word_boundary),
        _ => false,
    }
}

fn keyword(input: &str) -> IResult<&str, Token> {
    for (word, token) in KEYWORDS {
        if is_keyword_match(input, word) {
            return Ok((&input[word.len()..], token.clone()));
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Tag,
    )))
}

/// Operators and punctuation, two-character operators first
fn simple_patterns(input: &str) -> IResult<&str, Token> {
    const TWO_CHAR: &[(&str, Token)] = &[
        ("!=", Token::NotEqual),
        ("<>", Token::NotEqual),
        ("<=", Token::LessEqual),
        (">=", Token::GreaterEqual),
        ("=~", Token::Regex),
    ];
    for (op, token) in TWO_CHAR {
        if input.starts_with(op) {
            return Ok((&input[2..], token.clone()));
        }
    }

    let token = match input.chars().next() {
        Some('=') => Token::Equal,
        Some('<') => Token::LessThan,
        Some('>') => Token::GreaterThan,
        Some('+') => Token::Plus,
        Some('-') => Token::Minus,
        Some('*') => Token::Star,
        Some('/') => Token::Slash,
        Some('%') => Token::Percent,
        Some('.') => Token::Dot,
        Some(',') => Token::Comma,
        Some(';') => Token::Semicolon,
        Some('(') => Token::LeftParen,
        Some(')') => Token::RightParen,
        Some('[') => Token::LeftBracket,
        Some(']') => Token::RightBracket,
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )))
        }
    };
    Ok((&input[1..], token))
}

/// Whitespace; returns an error when nothing was consumed
fn whitespace(input: &str) -> IResult<&str, Token> {
    let (remaining, whitespace_chars) = take_while(|c: char| c.is_whitespace())(input)?;
    if whitespace_chars.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Space,
        )));
    }
    Ok((remaining, Token::Whitespace))
}

/// `// line` and `/* block */` comments
fn comment(input: &str) -> IResult<&str, &str> {
    if input.starts_with("/*") && !input.contains("*/") {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeUntil,
        )));
    }
    alt((
        recognize(pair(tag("//"), take_while(|c| c != '\n'))),
        recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
    ))(input)
}

/// Single- or double-quoted string, unescaped
fn string_literal(input: &str) -> IResult<&str, String> {
    let quote = match input.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Char,
            )))
        }
    };

    let mut value = String::new();
    let mut chars = input[1..].char_indices();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((&input[1 + i + 1..], value));
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, other)) => value.push(other),
                None => break,
            }
        } else {
            value.push(c);
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Backtick-delimited identifier; a doubled backtick is a literal backtick
fn backtick_identifier(input: &str) -> IResult<&str, String> {
    let (rest, _) = char('`')(input)?;
    let mut name = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '`' {
            if matches!(chars.peek(), Some((_, '`'))) {
                chars.next();
                name.push('`');
                continue;
            }
            return Ok((&rest[i + 1..], name));
        }
        name.push(c);
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn integer_literal(input: &str) -> IResult<&str, i64> {
    map_res(digit1, |s: &str| s.parse::<i64>())(input)
}

fn float_literal(input: &str) -> IResult<&str, f64> {
    map_res(recognize(tuple((digit1, char('.'), digit1))), |s: &str| {
        s.parse::<f64>()
    })(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// Explain why no token parser matched at `input`
fn diagnose(input: &str, position: usize) -> LexError {
    match input.chars().next() {
        Some('\'' | '"') => LexError::new("unterminated string literal", position),
        Some('`') => LexError::new("unterminated quoted identifier", position),
        Some(c) if c.is_ascii_digit() => LexError::new("integer literal out of range", position),
        Some(_) if input.starts_with("/*") => LexError::new("unterminated comment", position),
        Some(c) => LexError::new(format!("unexpected character {:?}", c), position),
        None => LexError::new("unexpected end of input", position),
    }
}

/// Tokenize `input`, dropping whitespace and comments and appending EOF
pub fn tokenize(input: &str) -> Result<TokenStream, LexError> {
    let mut tokens = Vec::new();
    let mut positions = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() {
        let position = input.len() - remaining.len();
        let (rest, token) = token(remaining).map_err(|_| diagnose(remaining, position))?;
        if rest.len() >= remaining.len() {
            return Err(LexError::new("lexer made no progress", position));
        }
        remaining = rest;
        if !matches!(token, Token::Whitespace | Token::Comment) {
            tokens.push(token);
            positions.push(position);
        }
    }

    tokens.push(Token::EOF);
    positions.push(input.len());
    Ok(TokenStream { tokens, positions })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().tokens
    }

    #[test]
    fn test_select_statement_tokens() {
        assert_eq!(
            kinds("SELECT Name, x.y AS z FROM environ() LIMIT 5"),
            vec![
                Token::Select,
                Token::Identifier("Name".to_string()),
                Token::Comma,
                Token::Identifier("x".to_string()),
                Token::Dot,
                Token::Identifier("y".to_string()),
                Token::As,
                Token::Identifier("z".to_string()),
                Token::From,
                Token::Identifier("environ".to_string()),
                Token::LeftParen,
                Token::RightParen,
                Token::Limit,
                Token::Integer(5),
                Token::EOF,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive_and_bounded() {
        assert_eq!(kinds("select")[0], Token::Select);
        assert_eq!(kinds("Or")[0], Token::Or);
        assert_eq!(kinds("order")[0], Token::Identifier("order".to_string()));
        assert_eq!(kinds("letter")[0], Token::Identifier("letter".to_string()));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a != b <> c <= d =~ e"),
            vec![
                Token::Identifier("a".to_string()),
                Token::NotEqual,
                Token::Identifier("b".to_string()),
                Token::NotEqual,
                Token::Identifier("c".to_string()),
                Token::LessEqual,
                Token::Identifier("d".to_string()),
                Token::Regex,
                Token::Identifier("e".to_string()),
                Token::EOF,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds(r#"1.5 42 'it\'s' "tab\t" `odd name`"#),
            vec![
                Token::Float(1.5),
                Token::Integer(42),
                Token::String("it's".to_string()),
                Token::String("tab\t".to_string()),
                Token::Identifier("odd name".to_string()),
                Token::EOF,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("SELECT /* block */ * // trailing\nFROM x"),
            vec![
                Token::Select,
                Token::Star,
                Token::From,
                Token::Identifier("x".to_string()),
                Token::EOF
            ]
        );
    }

    #[test]
    fn test_positions() {
        let stream = tokenize("SELECT  foo").unwrap();
        assert_eq!(stream.positions, vec![0, 8, 11]);
        assert_eq!(stream.position_of(99), 11);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("SELECT 'abc").unwrap_err();
        assert_eq!(err.position, 7);
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("SELECT #").unwrap_err();
        assert_eq!(err.position, 7);
        assert!(err.message.contains("unexpected character"));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = tokenize("SELECT * /* open").unwrap_err();
        assert_eq!(err.position, 9);
        assert!(err.message.contains("unterminated comment"));
    }

    #[test]
    fn test_non_ascii_input_does_not_panic() {
        assert!(tokenize("é").is_err());
        assert_eq!(kinds("'é'")[0], Token::String("é".to_string()));
    }

    #[test]
    fn test_empty_stream() {
        assert!(tokenize("  // nothing\n").unwrap().is_empty());
    }
}
