//! Tokenizer that converts an expression string into a lazy stream of
//! [`Token`]s.
//!
//! Scanning of numbers, string literals and identifiers is built from [nom]
//! primitives; classification is driven by the previous token and the
//! operator registry. An identifier followed by `(` resolves to a registered
//! operator or else a function; a run of symbol characters backtracks to the
//! longest registered operator prefix; an operator in a position where no
//! left operand can exist becomes a unary operator and gets a `u` appended
//! to its surface so the unary and binary registry keys stay distinct.
//!
//! The stream is forward-only and non-restartable: construct a fresh
//! [`Tokenizer`] to re-scan.
//!
//! [nom]: https://crates.io/crates/nom

use std::fmt;

use nom::bytes::complete::take_while;
use nom::character::complete::satisfy;
use nom::combinator::recognize;
use nom::sequence::preceded;
use nom::IResult;

use crate::registry::Registry;
use crate::Error;

/// Lexical classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Function,
    Operator,
    UnaryOperator,
    Number,
    String,
    Variable,
    OpenParen,
    CloseParen,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Function => "Function",
            TokenKind::Operator => "Operator",
            TokenKind::UnaryOperator => "UnaryOperator",
            TokenKind::Number => "Number",
            TokenKind::String => "String",
            TokenKind::Variable => "Variable",
            TokenKind::OpenParen => "OpenParen",
            TokenKind::CloseParen => "CloseParen",
            TokenKind::Comma => "Comma",
        };
        f.write_str(name)
    }
}

/// An immutable lexical unit: kind, surface text and byte span in the
/// source. `end > start` for every token produced by the tokenizer; only the
/// synthetic implicit-multiplication token injected by the parser has no
/// span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub surface: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    fn new<S: Into<String>>(kind: TokenKind, surface: S, start: usize, end: usize) -> Token {
        Token {
            kind,
            surface: surface.into(),
            start,
            end,
        }
    }

    /// A parser-injected token with no source span.
    pub(crate) fn synthetic(kind: TokenKind, surface: &str) -> Token {
        Token {
            kind,
            surface: surface.to_string(),
            start: 0,
            end: 0,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.surface)
    }
}

/// Lazy scanner over an expression string.
pub struct Tokenizer<'e> {
    input: &'e str,
    pos: usize,
    previous: Option<TokenKind>,
    registry: &'e Registry,
}

impl<'e> Tokenizer<'e> {
    pub fn new(input: &'e str, registry: &'e Registry) -> Tokenizer<'e> {
        Tokenizer {
            input,
            pos: 0,
            previous: None,
            registry,
        }
    }

    fn rest(&self) -> &'e str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    /// Consumes the longest prefix of the remaining input matching `pred`.
    fn take_run(&mut self, pred: impl Fn(char) -> bool) -> &'e str {
        let scanned: IResult<&str, &str> = take_while(pred)(self.rest());
        let taken = match scanned {
            Ok((_, taken)) => taken,
            Err(_) => "",
        };
        self.pos += taken.len();
        taken
    }

    fn skip_whitespace(&mut self) {
        self.take_run(char::is_whitespace);
    }

    fn scan_number(&mut self, start: usize) -> Token {
        let surface = self.take_run(|c| c.is_ascii_digit() || c == '.');
        Token::new(TokenKind::Number, surface, start, self.pos)
    }

    /// Scans a string literal, leaving the closing quote unconsumed; the
    /// rescan step for a quote following a String token steps over it.
    fn scan_string(&mut self, start: usize) -> Result<Token, Error> {
        let scanned: IResult<&str, &str> =
            preceded(nom::character::complete::char('"'), take_while(|c| c != '"'))(self.rest());
        let body = match scanned {
            Ok((_, body)) => body,
            Err(_) => "",
        };
        self.pos += 1 + body.len();
        if !self.rest().starts_with('"') {
            return Err(Error::Expression(format!(
                "unterminated string literal at character position {}",
                start
            )));
        }
        Ok(Token::new(TokenKind::String, body, start, self.pos))
    }

    fn scan_identifier(&mut self, start: usize, first_chars: &str) -> Token {
        let scanned: IResult<&str, &str> = recognize(preceded(
            satisfy(|c| c.is_alphabetic() || first_chars.contains(c)),
            take_while(char::is_alphanumeric),
        ))(self.rest());
        let surface = match scanned {
            Ok((_, surface)) => surface,
            Err(_) => "",
        };
        self.pos += surface.len();
        let end = self.pos;
        // whitespace between a name and `(` is discarded so `foo (` still
        // resolves as a call
        self.skip_whitespace();
        let kind = if self.peek() == Some('(') {
            if self.registry.has_operator(surface) {
                TokenKind::Operator
            } else {
                TokenKind::Function
            }
        } else {
            TokenKind::Variable
        };
        Token::new(kind, surface, start, end)
    }

    /// Greedy symbol scan: extend over every character that cannot belong to
    /// another token class, remembering the longest prefix that names a
    /// registered operator, and backtrack to it.
    fn scan_operator(&mut self, start: usize, first_chars: &str) -> Token {
        let mut greedy = String::new();
        let mut longest_match: Option<(usize, usize)> = None;
        let mut pos = self.pos;
        for ch in self.rest().chars() {
            if ch.is_alphanumeric()
                || ch.is_whitespace()
                || first_chars.contains(ch)
                || matches!(ch, '(' | ')' | ',')
            {
                break;
            }
            greedy.push(ch);
            pos += ch.len_utf8();
            if self.registry.has_operator(&greedy) {
                longest_match = Some((pos, greedy.len()));
            }
        }
        let surface = match longest_match {
            Some((end_pos, len)) => {
                self.pos = end_pos;
                greedy[..len].to_string()
            }
            None => {
                self.pos = pos;
                greedy
            }
        };
        let end = self.pos;
        let unary = matches!(
            self.previous,
            None | Some(TokenKind::Operator) | Some(TokenKind::OpenParen) | Some(TokenKind::Comma)
        );
        if unary {
            Token::new(TokenKind::UnaryOperator, format!("{}u", surface), start, end)
        } else {
            Token::new(TokenKind::Operator, surface, start, end)
        }
    }

    fn next_token(&mut self) -> Option<Result<Token, Error>> {
        self.skip_whitespace();
        let ch = self.peek()?;
        let start = self.pos;
        let registry = self.registry;
        let first_chars = registry.first_var_chars();

        if ch.is_ascii_digit()
            || (ch == '.' && self.peek_second().map_or(false, |c| c.is_ascii_digit()))
        {
            return Some(Ok(self.scan_number(start)));
        }
        if ch == '"' {
            if self.previous == Some(TokenKind::String) {
                // the closing quote of the previous literal is still
                // pending: step over it and rescan
                self.pos += 1;
                return self.next_token();
            }
            return Some(self.scan_string(start));
        }
        if ch.is_alphabetic() || first_chars.contains(ch) {
            return Some(Ok(self.scan_identifier(start, first_chars)));
        }
        if let Some(kind) = match ch {
            '(' => Some(TokenKind::OpenParen),
            ')' => Some(TokenKind::CloseParen),
            ',' => Some(TokenKind::Comma),
            _ => None,
        } {
            self.pos += 1;
            return Some(Ok(Token::new(kind, ch, start, self.pos)));
        }
        Some(Ok(self.scan_operator(start, first_chars)))
    }
}

impl<'e> Iterator for Tokenizer<'e> {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.next_token();
        if let Some(Ok(token)) = &item {
            self.previous = Some(token.kind);
        }
        item
    }
}
