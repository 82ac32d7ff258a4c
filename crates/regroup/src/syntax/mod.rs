//! Regex front end: lexer, parser and syntax tree.

pub mod lexer;
pub mod parser;
mod tree;

pub use parser::{Item, Parser, parse};
pub use tree::{Chain, Content, Repeat, SyntaxNode, build_syntax_tree};
