//! Module `scanner` turns Lox source text into tokens in a single pass.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   A lexer over the input.  Every token's `lexeme` borrows from `src`.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token<'a>, LoxError>`.  A lexical error is yielded in
//!   place of the offending lexeme and scanning carries on after it.  The
//!   last item is always one `EOF` token; the iterator is fused.
//!
//! - `scan(src) -> (Vec<Token>, Diagnostics)`
//!   Drains the iterator, splitting tokens from diagnostics.
//!
//! # How a token is produced
//!
//! 1. `skip_trivia` consumes whitespace, newlines (counting lines) and `//`
//!    comments.  Comment bodies are jumped over with `memchr`.
//! 2. `lex_token` consumes one lexeme and decides its [`TokenType`]:
//!    punctuators, one‑ or two‑byte operators, strings (which may span
//!    lines), numbers and identifiers.  Keywords come from a perfect‑hash
//!    table built at compile time.
//! 3. `next` wraps the kind, the lexeme slice and the position into a
//!    [`Token`].
//!
//! Lexical errors:
//! - `Unexpected character.` once per offending character, however many
//!   bytes its UTF‑8 encoding takes;
//! - `Unterminated string.` when input ends inside a string;
//! - `Unexpected character in number.` when a letter or `_` directly follows
//!   a number.  No number token is produced and the letters are scanned
//!   again as the next lexeme.
//!
//! # Example
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! let source = "print 123; // example";
//! for result in Scanner::new(source) {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Scan a whole source text.  Returns every token (always ending with `EOF`)
/// together with the lexical diagnostics met along the way.
pub fn scan(src: &str) -> (Vec<Token<'_>>, Diagnostics) {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut diagnostics: Diagnostics = Diagnostics::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => diagnostics.push(e),
        }
    }

    info!(
        "Scanned {} token(s) with {} error(s)",
        tokens.len(),
        diagnostics.len()
    );

    (tokens, diagnostics)
}

#[inline(always)]
fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

#[inline(always)]
fn is_identifier_part(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Streaming lexer over a borrowed source text.
pub struct Scanner<'a> {
    text: &'a str,
    src: &'a [u8],
    start: usize, // first byte of the lexeme being scanned
    curr: usize,  // next byte to examine
    line: usize,  // 1‑based
    finished: bool,
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `text`.
    #[inline]
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            src: text.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            finished: false,
        }
    }

    // ───────────────────────────── byte cursor ─────────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Current byte, or `0` past the end.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.src.get(self.curr).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.src.get(self.curr + 1).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b: u8 = self.peek();
        self.curr += 1;
        b
    }

    /// `matched` if the next byte is `second` (consuming it), else `single`.
    #[inline(always)]
    fn either(&mut self, second: u8, matched: TokenType, single: TokenType) -> TokenType {
        if !self.is_at_end() && self.peek() == second {
            self.curr += 1;
            matched
        } else {
            single
        }
    }

    /// Lexeme boundaries always sit on ASCII bytes, so the slice is valid
    /// UTF‑8; the fallback is never taken.
    #[inline(always)]
    fn slice(&self, from: usize, to: usize) -> &'a str {
        self.text.get(from..to).unwrap_or("")
    }

    // ───────────────────────────── lexing ──────────────────────────────────

    /// Consume everything that never becomes a token.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' => self.curr += 1,

                b'\n' => {
                    self.line += 1;
                    self.curr += 1;
                }

                // The newline ending a comment is left for the arm above.
                b'/' if self.peek_next() == b'/' => {
                    self.curr = match memchr(b'\n', &self.src[self.curr..]) {
                        Some(pos) => self.curr + pos,
                        None => self.src.len(),
                    };
                }

                _ => return,
            }
        }
    }

    /// Consume one lexeme starting at `self.start` and classify it.
    fn lex_token(&mut self) -> Result<TokenType> {
        let kind: TokenType = match self.advance() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'/' => TokenType::SLASH,

            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'"' => return self.string(),

            b'0'..=b'9' => return self.number(),

            b if is_identifier_start(b) => self.identifier(),

            _ => {
                // Swallow UTF‑8 continuation bytes: one diagnostic per char.
                while self.peek() & 0xC0 == 0x80 {
                    self.curr += 1;
                }

                debug!(
                    "Unexpected character {:?} on line {}",
                    self.slice(self.start, self.curr),
                    self.line
                );

                return Err(LoxError::lex(self.line, "Unexpected character."));
            }
        };

        Ok(kind)
    }

    /// The opening quote has been consumed.  On success the cursor sits
    /// past the closing quote and the payload excludes both quotes.
    fn string(&mut self) -> Result<TokenType> {
        let close: usize = loop {
            match self.src.get(self.curr) {
                None => return Err(LoxError::lex(self.line, "Unterminated string.")),
                Some(b'"') => break self.curr,
                Some(b'\n') => self.line += 1,
                Some(_) => {}
            }

            self.curr += 1;
        };

        self.curr = close + 1;

        Ok(TokenType::STRING(
            self.slice(self.start + 1, close).to_owned(),
        ))
    }

    /// Integer part, then a fraction only if a digit follows the `.`, so
    /// `1.foo` stays a property access.
    fn number(&mut self) -> Result<TokenType> {
        self.skip_digits();

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.curr += 1;
            self.skip_digits();
        }

        if is_identifier_start(self.peek()) {
            return Err(LoxError::lex(self.line, "Unexpected character in number."));
        }

        // Only ASCII digits and at most one '.', which always parses.
        let value: f64 = self
            .slice(self.start, self.curr)
            .parse::<f64>()
            .unwrap_or_default();

        Ok(TokenType::NUMBER(value))
    }

    #[inline(always)]
    fn skip_digits(&mut self) {
        while self.peek().is_ascii_digit() {
            self.curr += 1;
        }
    }

    fn identifier(&mut self) -> TokenType {
        while is_identifier_part(self.peek()) {
            self.curr += 1;
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.skip_trivia();
        self.start = self.curr;

        if self.is_at_end() {
            self.finished = true;
            return Some(Ok(Token::new(
                TokenType::EOF,
                "",
                self.line,
                self.src.len(),
            )));
        }

        Some(self.lex_token().map(|kind| {
            debug!("Scanned token ({:?}) on line {}", kind, self.line);

            Token::new(kind, self.slice(self.start, self.curr), self.line, self.start)
        }))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
