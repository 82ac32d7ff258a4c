//! Regex lexer.
//!
//! Splits a regex into [`Token`]s. The lexer never fails: malformed
//! constructs degrade to literal bytes (an unparsable `{...}` is a literal
//! `{`, an incomplete `\x` is a literal backslash followed by `x`).

use crate::charset::CharSet;
use crate::syntax::tree::Repeat;

/// Structural symbols outside of a character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    Open,
    Close,
    Alternate,
    Dot,
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// One literal byte.
    Literal(u8),
    /// A built-in class escape: `\w \d \s \W \D \S`.
    Class(CharSet),
    /// One of `( ) | . ^ $`.
    Special(Special),
    /// `[` or `[^`.
    ClassOpen { negated: bool },
    /// `]` closing a class.
    ClassClose,
    /// `-` between two members of a class.
    RangeDash,
    /// `? + * {n,m}`
    Repeat(Repeat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the regex.
    pub offset: usize,
}

/// Lazy token stream over a regex. Cloning restarts from the current position.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    in_class: bool,
    can_range: bool,
    pending: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(regex: &'a str) -> Self {
        Self {
            bytes: regex.as_bytes(),
            pos: 0,
            in_class: false,
            can_range: false,
            pending: None,
        }
    }

    fn token(&self, kind: TokenKind, offset: usize) -> Token {
        Token { kind, offset }
    }

    /// A literal member; inside a class it may start a range.
    fn literal(&mut self, byte: u8, offset: usize) -> Token {
        if self.in_class {
            self.can_range = true;
        }
        self.token(TokenKind::Literal(byte), offset)
    }

    fn lex_escape(&mut self, start: usize) -> Token {
        let Some(&escaped) = self.bytes.get(start + 1) else {
            self.pos += 1;
            return self.literal(b'\\', start);
        };
        if let Some(byte) = common_escape(escaped) {
            self.pos += 2;
            return self.literal(byte, start);
        }
        if escaped == b'x' {
            return match self.bytes.get(start + 2..start + 4).and_then(parse_hex) {
                Some(byte) => {
                    self.pos += 4;
                    self.literal(byte, start)
                }
                None => {
                    self.pos += 1;
                    self.literal(b'\\', start)
                }
            };
        }
        self.pos += 2;
        match class_escape(escaped) {
            Some(set) => {
                self.can_range = false;
                self.token(TokenKind::Class(set), start)
            }
            // Unknown escapes stand for the escaped byte itself.
            None => self.literal(escaped, start),
        }
    }

    fn lex_in_class(&mut self, byte: u8, start: usize) -> Token {
        self.pos += 1;
        match byte {
            b']' => {
                self.in_class = false;
                self.can_range = false;
                self.token(TokenKind::ClassClose, start)
            }
            b'-' if self.can_range
                && self.bytes.get(self.pos).is_some_and(|&next| next != b']') =>
            {
                self.can_range = false;
                self.token(TokenKind::RangeDash, start)
            }
            _ => self.literal(byte, start),
        }
    }

    fn lex_braces(&mut self, start: usize) -> Token {
        self.pos += 1;
        let body = &self.bytes[self.pos..];
        let repeat = body
            .iter()
            .position(|&b| b == b'}')
            .and_then(|close| parse_braces(&body[..close]).map(|repeat| (close, repeat)));
        match repeat {
            Some((close, repeat)) => {
                self.pos += close + 1;
                self.token(TokenKind::Repeat(repeat), start)
            }
            None => self.literal(b'{', start),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }
        let start = self.pos;
        let &byte = self.bytes.get(start)?;
        if byte == b'\\' {
            return Some(self.lex_escape(start));
        }
        if self.in_class {
            return Some(self.lex_in_class(byte, start));
        }
        let next = self.bytes.get(start + 1).copied();
        let kind = match (byte, next) {
            // `[]` is not a class: it is the two literal brackets.
            (b'[', Some(b']')) => {
                self.pos += 2;
                self.pending = Some(self.token(TokenKind::Literal(b']'), start + 1));
                TokenKind::Literal(b'[')
            }
            (b'[', Some(b'^')) => {
                self.pos += 2;
                self.in_class = true;
                self.can_range = false;
                TokenKind::ClassOpen { negated: true }
            }
            (b'[', _) => {
                self.pos += 1;
                self.in_class = true;
                self.can_range = false;
                TokenKind::ClassOpen { negated: false }
            }
            (b'{', _) => return Some(self.lex_braces(start)),
            _ => {
                self.pos += 1;
                match byte {
                    b'?' => TokenKind::Repeat(Repeat::OPTIONAL),
                    b'+' => TokenKind::Repeat(Repeat::PLUS),
                    b'*' => TokenKind::Repeat(Repeat::STAR),
                    b'(' => TokenKind::Special(Special::Open),
                    b')' => TokenKind::Special(Special::Close),
                    b'|' => TokenKind::Special(Special::Alternate),
                    b'.' => TokenKind::Special(Special::Dot),
                    b'^' => TokenKind::Special(Special::Start),
                    b'$' => TokenKind::Special(Special::End),
                    _ => TokenKind::Literal(byte),
                }
            }
        };
        Some(self.token(kind, start))
    }
}

fn common_escape(byte: u8) -> Option<u8> {
    Some(match byte {
        b'\\' => b'\\',
        b'0' => 0x00,
        b'a' => 0x07,
        b'b' => 0x08,
        b'e' => 0x1b,
        b'f' => 0x0c,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'v' => 0x0b,
        _ => return None,
    })
}

fn class_escape(byte: u8) -> Option<CharSet> {
    Some(match byte {
        b'w' => CharSet::WORDS,
        b'd' => CharSet::DIGITS,
        b's' => CharSet::SPACES,
        b'W' => CharSet::NON_WORDS,
        b'D' => CharSet::NON_DIGITS,
        b'S' => CharSet::NON_SPACES,
        _ => return None,
    })
}

fn parse_hex(digits: &[u8]) -> Option<u8> {
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u8::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()
}

/// Parse the inside of `{...}`: `n`, `n,`, `,m`, `n,m` or `,`.
fn parse_braces(body: &[u8]) -> Option<Repeat> {
    let text = std::str::from_utf8(body).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    let mut parts = text.split(',');
    let low = parts.next()?.trim();
    let high = parts.next().map(str::trim);
    if parts.next().is_some() {
        return None;
    }
    let min = if low.is_empty() { 0 } else { low.parse().ok()? };
    match high {
        None => Some(Repeat::new(min, Some(min))),
        Some("") => Some(Repeat::new(min, None)),
        Some(high) => {
            let max: u32 = high.parse().ok()?;
            (max > 0 && min <= max).then_some(Repeat::new(min, Some(max)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(regex: &str) -> Vec<TokenKind> {
        Lexer::new(regex).map(|token| token.kind).collect()
    }

    #[test]
    fn test_literals_and_specials() {
        assert_eq!(
            kinds("a(b|.)^$"),
            vec![
                TokenKind::Literal(b'a'),
                TokenKind::Special(Special::Open),
                TokenKind::Literal(b'b'),
                TokenKind::Special(Special::Alternate),
                TokenKind::Special(Special::Dot),
                TokenKind::Special(Special::Close),
                TokenKind::Special(Special::Start),
                TokenKind::Special(Special::End),
            ]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            kinds(r"\w\n\(\z\x41"),
            vec![
                TokenKind::Class(CharSet::WORDS),
                TokenKind::Literal(b'\n'),
                TokenKind::Literal(b'('),
                TokenKind::Literal(b'z'),
                TokenKind::Literal(b'A'),
            ]
        );
    }

    #[test]
    fn test_bad_hex_escape_is_literal() {
        assert_eq!(
            kinds(r"\x4g"),
            vec![
                TokenKind::Literal(b'\\'),
                TokenKind::Literal(b'x'),
                TokenKind::Literal(b'4'),
                TokenKind::Literal(b'g'),
            ]
        );
        assert_eq!(kinds("\\"), vec![TokenKind::Literal(b'\\')]);
    }

    #[test]
    fn test_class_tokens() {
        assert_eq!(
            kinds("[^a-z-]"),
            vec![
                TokenKind::ClassOpen { negated: true },
                TokenKind::Literal(b'a'),
                TokenKind::RangeDash,
                TokenKind::Literal(b'z'),
                TokenKind::Literal(b'-'),
                TokenKind::ClassClose,
            ]
        );
        // Specials are plain members inside a class.
        assert_eq!(
            kinds("[(*]"),
            vec![
                TokenKind::ClassOpen { negated: false },
                TokenKind::Literal(b'('),
                TokenKind::Literal(b'*'),
                TokenKind::ClassClose,
            ]
        );
    }

    #[test]
    fn test_empty_brackets_are_literals() {
        assert_eq!(
            kinds("[]"),
            vec![TokenKind::Literal(b'['), TokenKind::Literal(b']')]
        );
        let offsets: Vec<usize> = Lexer::new("x[]").map(|t| t.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[test]
    fn test_quantifiers() {
        assert_eq!(
            kinds("a{2}b{2,}c{,3}d{1,4}?+*"),
            vec![
                TokenKind::Literal(b'a'),
                TokenKind::Repeat(Repeat::new(2, Some(2))),
                TokenKind::Literal(b'b'),
                TokenKind::Repeat(Repeat::new(2, None)),
                TokenKind::Literal(b'c'),
                TokenKind::Repeat(Repeat::new(0, Some(3))),
                TokenKind::Literal(b'd'),
                TokenKind::Repeat(Repeat::new(1, Some(4))),
                TokenKind::Repeat(Repeat::OPTIONAL),
                TokenKind::Repeat(Repeat::PLUS),
                TokenKind::Repeat(Repeat::STAR),
            ]
        );
    }

    #[test]
    fn test_malformed_braces_degrade() {
        for regex in ["a{x}", "a{3,1}", "a{-1}", "a{}", "a{1,2,3}", "a{0,0}"] {
            let tokens = kinds(regex);
            assert_eq!(tokens[1], TokenKind::Literal(b'{'), "{regex}");
            assert_eq!(*tokens.last().unwrap(), TokenKind::Literal(b'}'), "{regex}");
        }
        assert_eq!(
            kinds("a{2"),
            vec![
                TokenKind::Literal(b'a'),
                TokenKind::Literal(b'{'),
                TokenKind::Literal(b'2'),
            ]
        );
    }

    #[test]
    fn test_lexer_restarts_from_clone() {
        let mut lexer = Lexer::new("ab");
        lexer.next();
        let rest: Vec<Token> = lexer.clone().collect();
        assert_eq!(rest, lexer.collect::<Vec<_>>());
    }
}
