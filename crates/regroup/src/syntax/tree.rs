//! Syntax tree of one regex.
//!
//! A regex becomes a chain of [`SyntaxNode`]s linked by `next`; each node is
//! either a character set leaf or a group of alternative chains, and carries
//! its own [`Repeat`] range.

use std::fmt;

use crate::charset::CharSet;
use crate::error::{ParseError, ParseErrorKind};
use crate::syntax::parser::{Item, Parser};

/// Repetition range `{min,max}`; `max == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Repeat {
    pub min: u32,
    pub max: Option<u32>,
}

impl Repeat {
    pub const ONCE: Repeat = Repeat::new(1, Some(1));
    pub const OPTIONAL: Repeat = Repeat::new(0, Some(1));
    pub const PLUS: Repeat = Repeat::new(1, None);
    pub const STAR: Repeat = Repeat::new(0, None);

    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn is_once(self) -> bool {
        self == Repeat::ONCE
    }

    /// A node never repeats at most zero times; `{n,0}` reads as `{n,1}`.
    fn clamped(self) -> Repeat {
        Repeat::new(self.min, self.max.map(|max| max.max(1)))
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min && max == 1 => Ok(()),
            Some(max) if max == self.min => write!(f, "{{{max}}}"),
            Some(max) => write!(f, "{{{},{max}}}", self.min),
            None => write!(f, "{{{},∞}}", self.min),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Leaf matching one symbol of the set.
    Set(CharSet),
    /// Alternative chains, any of which may match.
    Group(Vec<SyntaxNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub content: Content,
    pub repeat: Repeat,
    /// The node matched right after this one.
    pub next: Option<Box<SyntaxNode>>,
}

impl SyntaxNode {
    pub fn set(set: CharSet, repeat: Repeat) -> Self {
        Self {
            content: Content::Set(set),
            repeat: repeat.clamped(),
            next: None,
        }
    }

    pub fn group(alternatives: Vec<SyntaxNode>, repeat: Repeat) -> Self {
        Self {
            content: Content::Group(alternatives),
            repeat: repeat.clamped(),
            next: None,
        }
    }

    /// This node followed by its successors.
    pub fn chain(&self) -> Chain<'_> {
        Chain { node: Some(self) }
    }

    fn write_chain(&self, f: &mut fmt::Formatter<'_>, depth: usize, number: usize) -> fmt::Result {
        for (position, node) in self.chain().enumerate() {
            let indent = "    ".repeat(depth);
            if position == 0 && number > 0 {
                write!(f, "{indent} {number:2}:")?;
            } else {
                write!(f, "{indent}    ")?;
            }
            match &node.content {
                Content::Set(set) => writeln!(f, "{set} {}", node.repeat)?,
                Content::Group(alternatives) => {
                    writeln!(f, "{}-subs {}", alternatives.len(), node.repeat)?;
                    for (i, alternative) in alternatives.iter().enumerate() {
                        alternative.write_chain(f, depth + 1, i + 1)?;
                    }
                }
            }
        }
        Ok(())
    }
}

// Chains can be as long as the regex; unlink them iteratively.
impl Drop for SyntaxNode {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
    }
}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_chain(f, 0, 0)
    }
}

/// Iterator over a node and its successors.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    node: Option<&'a SyntaxNode>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<&'a SyntaxNode> {
        let node = self.node?;
        self.node = node.next.as_deref();
        Some(node)
    }
}

/// Link a sequence of nodes into one chain.
fn link(sequence: Vec<SyntaxNode>) -> Option<SyntaxNode> {
    sequence.into_iter().rev().reduce(|tail, mut node| {
        node.next = Some(Box::new(tail));
        node
    })
}

/// Alternatives repeated `repeat` times, as the sequence of nodes it
/// contributes to the enclosing chain.
///
/// A single alternative repeated once is spliced into the enclosing chain; a
/// single unquantified node takes `repeat` itself.
///
/// Empty alternatives are not passed in: the caller drops them and makes
/// the group optional instead, so `x(a|)` reads as `xa?` and `(|)` adds
/// nothing.
fn alternation(mut alternatives: Vec<Vec<SyntaxNode>>, repeat: Repeat) -> Vec<SyntaxNode> {
    let repeat = repeat.clamped();
    if alternatives.len() == 1 {
        if repeat.is_once() {
            return alternatives.pop().unwrap_or_default();
        }
        if alternatives[0].len() == 1 && alternatives[0][0].repeat.is_once() {
            let mut sequence = alternatives.pop().unwrap_or_default();
            for node in &mut sequence {
                node.repeat = repeat;
            }
            return sequence;
        }
    }
    let chains: Vec<SyntaxNode> = alternatives.into_iter().filter_map(link).collect();
    if chains.is_empty() {
        return Vec::new();
    }
    vec![SyntaxNode::group(chains, repeat)]
}

/// Consumes syntax items (stored reversed, so `pop` yields the next one).
struct TreeBuilder {
    items: Vec<(Item, usize)>,
}

impl TreeBuilder {
    /// Build the alternatives up to the matching `)` (or the end of input).
    fn group(&mut self, nested: bool) -> Result<Vec<SyntaxNode>, ParseError> {
        let mut alternatives = Vec::new();
        let mut sequence = Vec::new();
        let mut has_empty = false;
        while let Some((item, offset)) = self.items.pop() {
            let atom = match item {
                Item::Close if nested => break,
                Item::Close => {
                    return Err(ParseError::new(ParseErrorKind::UnbalancedParen, offset));
                }
                Item::Alternate => {
                    let done = std::mem::take(&mut sequence);
                    push_alternative(&mut alternatives, &mut has_empty, done);
                    continue;
                }
                // A quantifier with nothing to repeat.
                Item::Repeat(_) => continue,
                Item::Set(set) => vec![SyntaxNode::set(set, Repeat::ONCE)],
                Item::Open => self.group(true)?,
            };
            sequence.extend(self.quantified(atom));
        }
        push_alternative(&mut alternatives, &mut has_empty, sequence);
        let repeat = if has_empty { Repeat::OPTIONAL } else { Repeat::ONCE };
        Ok(alternation(alternatives, repeat))
    }

    /// Apply the quantifiers that follow an atom, innermost first.
    fn quantified(&mut self, mut atom: Vec<SyntaxNode>) -> Vec<SyntaxNode> {
        while let Some(&(Item::Repeat(repeat), _)) = self.items.last() {
            self.items.pop();
            if !atom.is_empty() {
                atom = alternation(vec![atom], repeat);
            }
        }
        atom
    }
}

fn push_alternative(
    alternatives: &mut Vec<Vec<SyntaxNode>>,
    has_empty: &mut bool,
    sequence: Vec<SyntaxNode>,
) {
    if sequence.is_empty() {
        *has_empty = true;
    } else {
        alternatives.push(sequence);
    }
}

/// Parse a regex and build its syntax tree.
pub fn build_syntax_tree(regex: &str) -> Result<SyntaxNode, ParseError> {
    let mut parser = Parser::new(regex);
    let mut items = Vec::new();
    while let Some(item) = parser.next() {
        items.push((item?, parser.offset()));
    }
    items.reverse();
    let sequence = TreeBuilder { items }.group(false)?;
    link(sequence).ok_or(ParseError::new(ParseErrorKind::EmptyRegex, 0))
}
