use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Byte span of a node in the mini-notation source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        SourceSpan { start, end }
    }

    pub fn merge(&self, other: SourceSpan) -> SourceSpan {
        SourceSpan::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for SourceSpan {
    fn from(range: Range<usize>) -> Self {
        SourceSpan::new(range.start, range.end)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Euclidean rhythm arguments; each may itself be a pattern node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EuclidArgs {
    pub pulse: Box<Node>,
    pub step: Box<Node>,
    pub rotation: Option<Box<Node>>,
}

/// Numeric modifiers shared by atoms, subdivisions, alternations and
/// polymetric groups. All optional; the parser fills in only what the
/// source spells out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mods {
    /// `*n`: play n times faster (n may be a pattern)
    pub repeat: Option<Box<Node>>,
    /// `/n`: play n times slower
    pub division: Option<Box<Node>>,
    /// `@w`: relative width within the enclosing sequence
    pub weight: Option<f64>,
    /// `!n`: occupy n sequence slots
    pub replicate: Option<usize>,
    /// `?p`: drop probability
    pub probability: Option<f64>,
    /// `(k,n,off)`: Euclidean rhythm
    pub euclid: Option<EuclidArgs>,
}

impl Mods {
    pub fn is_empty(&self) -> bool {
        *self == Mods::default()
    }
}

/// A leaf value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AtomValue {
    Number(f64),
    Name(String),
}

/// Mini-notation syntax tree.
///
/// The interpreter consumes this shape; parsers other than the bundled
/// one may produce it as well (it round-trips through serde).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Space-separated items sharing one cycle, weighted
    Sequence { items: Vec<Node>, loc: SourceSpan },
    /// Comma-separated layers playing simultaneously
    Stack { children: Vec<Node>, loc: SourceSpan },
    /// `[...]`: a sequence playable as a single sequence slot
    Subdivision {
        children: Vec<Node>,
        mods: Mods,
        loc: SourceSpan,
    },
    /// `<...>`: one child per cycle
    Alternation {
        children: Vec<Node>,
        mods: Mods,
        loc: SourceSpan,
    },
    /// `{...}` with optional `%n`: groups aligned to a shared step grid
    Polymetric {
        groups: Vec<Node>,
        steps: Option<Box<Node>>,
        mods: Mods,
        loc: SourceSpan,
    },
    /// `|`-separated choices, one picked per cycle
    RandomChoice {
        children: Vec<Node>,
        seed: u64,
        loc: SourceSpan,
    },
    /// A sound name or number, with optional `:n` sample index
    Atom {
        value: AtomValue,
        sample: Option<i64>,
        mods: Mods,
        loc: SourceSpan,
    },
    /// `~` or `-`
    Rest { loc: SourceSpan },
    /// `_`: stretches the preceding sequence item
    Elongation { loc: SourceSpan },
}

impl Node {
    pub fn loc(&self) -> SourceSpan {
        match self {
            Node::Sequence { loc, .. }
            | Node::Stack { loc, .. }
            | Node::Subdivision { loc, .. }
            | Node::Alternation { loc, .. }
            | Node::Polymetric { loc, .. }
            | Node::RandomChoice { loc, .. }
            | Node::Atom { loc, .. }
            | Node::Rest { loc }
            | Node::Elongation { loc } => *loc,
        }
    }

    pub fn mods(&self) -> Option<&Mods> {
        match self {
            Node::Subdivision { mods, .. }
            | Node::Alternation { mods, .. }
            | Node::Polymetric { mods, .. }
            | Node::Atom { mods, .. } => Some(mods),
            _ => None,
        }
    }

    pub fn mods_mut(&mut self) -> Option<&mut Mods> {
        match self {
            Node::Subdivision { mods, .. }
            | Node::Alternation { mods, .. }
            | Node::Polymetric { mods, .. }
            | Node::Atom { mods, .. } => Some(mods),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let merged = SourceSpan::new(0, 5).merge(SourceSpan::new(3, 10));
        assert_eq!(merged, SourceSpan::new(0, 10));
    }

    #[test]
    fn test_node_accessors() {
        let atom = Node::Atom {
            value: AtomValue::Name("bd".to_string()),
            sample: None,
            mods: Mods::default(),
            loc: SourceSpan::new(0, 2),
        };
        assert_eq!(atom.loc(), SourceSpan::new(0, 2));
        assert!(atom.mods().unwrap().is_empty());
        assert!(Node::Rest {
            loc: SourceSpan::new(0, 1)
        }
        .mods()
        .is_none());
    }

    #[test]
    fn test_ast_serde_roundtrip() {
        let node = Node::Sequence {
            items: vec![
                Node::Atom {
                    value: AtomValue::Name("bd".to_string()),
                    sample: Some(3),
                    mods: Mods {
                        replicate: Some(2),
                        ..Mods::default()
                    },
                    loc: SourceSpan::new(0, 4),
                },
                Node::Rest {
                    loc: SourceSpan::new(5, 6),
                },
            ],
            loc: SourceSpan::new(0, 6),
        };
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }
}
