//! Lexer and parser for wire terms.
//!
//! The grammar is deliberately small: lists, double-quoted strings,
//! signed integers, `true`/`false`, and bare symbols. Every error
//! carries the byte offset where it was detected.

use crate::error::SexpError;
use crate::sexp::{Atom, Sexp};

/// Parse exactly one term; trailing non-whitespace input is an error.
pub fn parse_sexp(input: &str) -> Result<Sexp, SexpError> {
    let mut parser = Parser::new(input);
    let term = parser.term()?;
    parser.skip_whitespace();
    if !parser.at_eof() {
        return Err(SexpError::TrailingInput { offset: parser.pos });
    }
    Ok(term)
}

/// Parse zero or more whitespace-separated terms until end of input.
pub fn parse_many(input: &str) -> Result<Vec<Sexp>, SexpError> {
    let mut parser = Parser::new(input);
    let mut terms = Vec::new();
    loop {
        parser.skip_whitespace();
        if parser.at_eof() {
            return Ok(terms);
        }
        terms.push(parser.term()?);
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn term(&mut self) -> Result<Sexp, SexpError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(SexpError::UnexpectedEof { offset: self.pos }),
            Some(b'(') => self.list(),
            Some(b')') => Err(SexpError::UnbalancedParen { offset: self.pos }),
            Some(b'"') => self.string(),
            Some(_) => self.atom(),
        }
    }

    fn list(&mut self) -> Result<Sexp, SexpError> {
        // Caller guarantees the opening paren.
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(SexpError::UnexpectedEof { offset: self.pos }),
                Some(b')') => {
                    self.bump();
                    return Ok(Sexp::List(items));
                }
                Some(_) => items.push(self.term()?),
            }
        }
    }

    fn string(&mut self) -> Result<Sexp, SexpError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(SexpError::UnexpectedEof { offset: start }),
                Some(b'"') => return Ok(Sexp::Atom(Atom::Str(out))),
                Some(b'\\') => {
                    let offset = self.pos - 1;
                    match self.bump() {
                        None => return Err(SexpError::UnexpectedEof { offset }),
                        Some(b'"') => out.push('"'),
                        Some(b'\\') => out.push('\\'),
                        Some(b'n') => out.push('\n'),
                        Some(b't') => out.push('\t'),
                        Some(other) => {
                            return Err(SexpError::BadEscape {
                                offset,
                                escape: other as char,
                            });
                        }
                    }
                }
                Some(byte) => {
                    // Multi-byte UTF-8 passes through unchanged.
                    let rest = &self.bytes[self.pos - 1..];
                    let ch_len = utf8_len(byte);
                    if ch_len == 1 {
                        out.push(byte as char);
                    } else {
                        let chunk = std::str::from_utf8(&rest[..ch_len.min(rest.len())])
                            .map_err(|_| SexpError::BadToken {
                                offset: self.pos - 1,
                                token: format!("0x{byte:02x}"),
                            })?;
                        out.push_str(chunk);
                        self.pos += ch_len - 1;
                    }
                }
            }
        }
    }

    fn atom(&mut self) -> Result<Sexp, SexpError> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() || byte == b'(' || byte == b')' || byte == b'"' {
                break;
            }
            self.pos += 1;
        }
        let token = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| SexpError::BadToken {
                offset: start,
                token: String::from("<invalid utf-8>"),
            })?
            .to_string();

        match token.as_str() {
            "true" => return Ok(Sexp::Atom(Atom::Bool(true))),
            "false" => return Ok(Sexp::Atom(Atom::Bool(false))),
            _ => {}
        }

        if looks_numeric(&token) {
            return token
                .parse::<i64>()
                .map(|n| Sexp::Atom(Atom::Int(n)))
                .map_err(|_| SexpError::BadToken {
                    offset: start,
                    token,
                });
        }

        Ok(Sexp::Atom(Atom::Sym(token)))
    }
}

fn looks_numeric(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}
