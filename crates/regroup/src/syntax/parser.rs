//! Regex parser: turns the token stream into flat syntax [`Item`]s.
//!
//! Every atom becomes a non-empty [`CharSet`]; a whole `[...]` class is
//! folded into a single set. Anchors become [`CharSet::BORDER`].

use crate::charset::CharSet;
use crate::error::{ParseError, ParseErrorKind};
use crate::syntax::lexer::{Lexer, Special, Token, TokenKind};
use crate::syntax::tree::Repeat;

/// One syntax item of a regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Set(CharSet),
    Repeat(Repeat),
    Open,
    Close,
    Alternate,
}

/// An open `[...]` being accumulated.
#[derive(Debug, Clone, Copy)]
struct Class {
    set: CharSet,
    negated: bool,
    offset: usize,
}

/// Lazy stream of syntax items, yielding an error at most once.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    class: Option<Class>,
    last_byte: u8,
    range_pending: bool,
    failed: bool,
    offset: usize,
}

impl<'a> Parser<'a> {
    pub fn new(regex: &'a str) -> Self {
        Self {
            lexer: Lexer::new(regex),
            class: None,
            last_byte: 0xff,
            range_pending: false,
            failed: false,
            offset: 0,
        }
    }

    /// Byte offset of the token that produced the last item.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Handle one token; `Some` when it completes an item.
    fn feed(&mut self, token: Token) -> Option<Result<Item, ParseError>> {
        self.offset = token.offset;
        let range_pending = std::mem::replace(&mut self.range_pending, false);
        let set = match token.kind {
            TokenKind::Special(Special::Open) => return Some(Ok(Item::Open)),
            TokenKind::Special(Special::Close) => return Some(Ok(Item::Close)),
            TokenKind::Special(Special::Alternate) => return Some(Ok(Item::Alternate)),
            TokenKind::Special(Special::Start | Special::End) => {
                return Some(Ok(Item::Set(CharSet::BORDER)));
            }
            TokenKind::Repeat(repeat) => return Some(Ok(Item::Repeat(repeat))),
            TokenKind::Special(Special::Dot) => CharSet::DOT,
            TokenKind::Class(set) => set,
            TokenKind::Literal(byte) => {
                let set = if range_pending {
                    CharSet::range(self.last_byte.into(), byte.into())
                } else {
                    CharSet::singleton(byte.into())
                };
                self.last_byte = byte;
                set
            }
            TokenKind::RangeDash => {
                self.range_pending = true;
                return None;
            }
            TokenKind::ClassOpen { negated } => {
                self.class = Some(Class {
                    set: CharSet::EMPTY,
                    negated,
                    offset: token.offset,
                });
                return None;
            }
            TokenKind::ClassClose => return self.class.take().map(close_class),
        };
        match self.class.as_mut() {
            Some(class) => {
                // A dash that is not followed by a literal is a member itself.
                if range_pending && !matches!(token.kind, TokenKind::Literal(_)) {
                    class.set = class.set | CharSet::singleton(b'-'.into());
                }
                class.set = class.set | set;
                None
            }
            None => Some(Ok(Item::Set(set))),
        }
    }
}

fn close_class(class: Class) -> Result<Item, ParseError> {
    let set = if class.negated {
        CharSet::DOT.exclude(class.set)
    } else {
        class.set
    };
    if set.is_empty() {
        return Err(ParseError::new(ParseErrorKind::EmptyClass, class.offset));
    }
    Ok(Item::Set(set))
}

impl Iterator for Parser<'_> {
    type Item = Result<Item, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let Some(token) = self.lexer.next() else {
                let class = self.class.take()?;
                self.failed = true;
                return Some(Err(ParseError::new(
                    ParseErrorKind::UnterminatedClass,
                    class.offset,
                )));
            };
            if let Some(item) = self.feed(token) {
                self.failed = item.is_err();
                return Some(item);
            }
        }
    }
}

/// Parse a whole regex into its items.
pub fn parse(regex: &str) -> Result<Vec<Item>, ParseError> {
    Parser::new(regex).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    fn byte(b: u8) -> Item {
        Item::Set(CharSet::singleton(b.into()))
    }

    #[test]
    fn test_structure() {
        assert_eq!(
            parse("(a|b)+").unwrap(),
            vec![
                Item::Open,
                byte(b'a'),
                Item::Alternate,
                byte(b'b'),
                Item::Close,
                Item::Repeat(Repeat::PLUS),
            ]
        );
    }

    #[test]
    fn test_anchors_are_border() {
        assert_eq!(
            parse("^a$").unwrap(),
            vec![Item::Set(CharSet::BORDER), byte(b'a'), Item::Set(CharSet::BORDER)]
        );
    }

    #[test]
    fn test_class_accumulates() {
        let items = parse("[a-cx\\d]").unwrap();
        assert_eq!(
            items,
            vec![Item::Set(CharSet::from_bytes(b"abcx") | CharSet::DIGITS)]
        );
    }

    #[test]
    fn test_negated_class() {
        let items = parse("[^a]").unwrap();
        assert_eq!(
            items,
            vec![Item::Set(CharSet::DOT.exclude(CharSet::from_bytes(b"a")))]
        );
        assert!(!matches!(items[0], Item::Set(set) if set.contains(crate::charset::BORDER)));
    }

    #[test]
    fn test_dash_before_class_escape_is_member() {
        assert_eq!(
            parse("[a-\\d]").unwrap(),
            vec![Item::Set(CharSet::from_bytes(b"a-") | CharSet::DIGITS)]
        );
    }

    #[test]
    fn test_empty_class_fails() {
        let err = parse("ab[^\\x00-\\xff]").unwrap_err();
        assert_eq!(err, ParseError::new(ParseErrorKind::EmptyClass, 2));
    }

    #[test]
    fn test_unterminated_class_fails() {
        let err = parse("x[abc").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedClass);
        assert_eq!(err.offset, 1);
    }

    #[test]
    fn test_parser_stops_after_error() {
        let mut parser = Parser::new("[^\\x00-\\xff]a");
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    quickcheck! {
        fn prop_literal_round_trip(input: Vec<u8>) -> bool {
            let plain = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
            let text: String = input
                .iter()
                .map(|b| plain[*b as usize % plain.len()] as char)
                .collect();
            let rebuilt: Option<Vec<u8>> = parse(&text)
                .unwrap()
                .into_iter()
                .map(|item| match item {
                    Item::Set(set) if set.count() == 1 => set.iter().next().map(|s| s as u8),
                    _ => None,
                })
                .collect();
            rebuilt.as_deref() == Some(text.as_bytes())
        }
    }
}
