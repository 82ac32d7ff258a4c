//! Error types.

use std::fmt;

use thiserror::Error;

use crate::automaton::StateId;

/// Why a single regex could not be turned into a syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// `[...]` or `[^...]` that denotes no character at all.
    EmptyClass,
    /// `[` without a closing `]`.
    UnterminatedClass,
    /// `)` without a matching `(`.
    UnbalancedParen,
    /// The regex yields no syntax tree (e.g. `""` or `()`).
    EmptyRegex,
}

/// A parse failure for one regex, with the byte offset where it was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseErrorKind::EmptyClass => "empty character class",
            ParseErrorKind::UnterminatedClass => "unterminated character class",
            ParseErrorKind::UnbalancedParen => "unbalanced parenthesis",
            ParseErrorKind::EmptyRegex => "empty regex",
        })
    }
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A regex of the input set failed to parse.
    #[error("regex #{index} `{regex}`: {source}")]
    Regex {
        index: usize,
        regex: String,
        #[source]
        source: ParseError,
    },
    /// A homomorphic NFA was required but this state is reached by edges
    /// carrying different character sets.
    #[error("state {state} has incoming edges with different character sets")]
    NotHomomorphic { state: StateId },
    /// An automaton invariant does not hold. This is a bug, not bad input.
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
