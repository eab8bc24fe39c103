//! Resolved sequence types.
//!
//! Values in this module are produced once by the resolver and are immutable afterwards;
//! they are shared read-only by every evaluation of the annotation they came from.

pub mod hierarchy;

pub use hierarchy::{AtomicTypeId, ListTypeId, TypeHierarchy};

use crate::model::NodeKind;
use crate::runtime::Error;
use crate::xdm::ExpandedName;
use core::fmt;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    /// Inclusive item-count bounds; `None` means unbounded.
    pub const fn bounds(self) -> (usize, Option<usize>) {
        match self {
            Occurrence::ExactlyOne => (1, Some(1)),
            Occurrence::ZeroOrOne => (0, Some(1)),
            Occurrence::ZeroOrMore => (0, None),
            Occurrence::OneOrMore => (1, None),
        }
    }

    pub const fn allows_empty(self) -> bool {
        matches!(self, Occurrence::ZeroOrOne | Occurrence::ZeroOrMore)
    }

    pub const fn allows_many(self) -> bool {
        matches!(self, Occurrence::ZeroOrMore | Occurrence::OneOrMore)
    }

    /// `true` when every count accepted by `self` is accepted by `other`.
    pub const fn is_within(self, other: Occurrence) -> bool {
        (other.allows_empty() || !self.allows_empty()) && (other.allows_many() || !self.allows_many())
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Occurrence::ExactlyOne => "",
            Occurrence::ZeroOrOne => "?",
            Occurrence::ZeroOrMore => "*",
            Occurrence::OneOrMore => "+",
        }
    }
}

/// Node kinds that can be tested; `AnyKind` is `node()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKindTest {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    AnyKind,
}

impl NodeKindTest {
    pub fn accepts(self, kind: NodeKind) -> bool {
        match self {
            NodeKindTest::AnyKind => true,
            NodeKindTest::Document => kind == NodeKind::Document,
            NodeKindTest::Element => kind == NodeKind::Element,
            NodeKindTest::Attribute => kind == NodeKind::Attribute,
            NodeKindTest::Text => kind == NodeKind::Text,
            NodeKindTest::Comment => kind == NodeKind::Comment,
            NodeKindTest::ProcessingInstruction => kind == NodeKind::ProcessingInstruction,
        }
    }

    const fn keyword(self) -> &'static str {
        match self {
            NodeKindTest::Document => "document-node",
            NodeKindTest::Element => "element",
            NodeKindTest::Attribute => "attribute",
            NodeKindTest::Text => "text",
            NodeKindTest::Comment => "comment",
            NodeKindTest::ProcessingInstruction => "processing-instruction",
            NodeKindTest::AnyKind => "node",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameTest {
    Wildcard,
    Exact(ExpandedName),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeTest {
    pub kind: NodeKindTest,
    pub name: NameTest,
}

impl NodeTest {
    pub fn kind(kind: NodeKindTest) -> Self {
        Self { kind, name: NameTest::Wildcard }
    }

    pub fn named(kind: NodeKindTest, name: ExpandedName) -> Self {
        Self { kind, name: NameTest::Exact(name) }
    }
}

/// Declared signature of a function item or of a `function(...) as ...` test.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub params: SmallVec<[SequenceType; 4]>,
    pub result: SequenceType,
}

impl FunctionSignature {
    pub fn new(params: impl IntoIterator<Item = SequenceType>, result: SequenceType) -> Self {
        Self { params: params.into_iter().collect(), result }
    }

    /// `function(item()*, ...) as item()*` with the given arity.
    pub fn untyped(arity: usize) -> Self {
        Self::new((0..arity).map(|_| SequenceType::any()), SequenceType::any())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionTest {
    AnySignature,
    Typed(Box<FunctionSignature>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemType {
    AnyItem,
    Atomic(AtomicTypeId),
    Node(NodeTest),
    Function(FunctionTest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceType {
    /// `empty-sequence()`: exactly zero items, no occurrence indicator.
    Empty,
    Typed { item: ItemType, occurrence: Occurrence },
}

impl SequenceType {
    pub fn new(item: ItemType, occurrence: Occurrence) -> Self {
        SequenceType::Typed { item, occurrence }
    }

    pub fn one(item: ItemType) -> Self {
        Self::new(item, Occurrence::ExactlyOne)
    }

    pub fn atomic(id: AtomicTypeId, occurrence: Occurrence) -> Self {
        Self::new(ItemType::Atomic(id), occurrence)
    }

    /// `item()*`
    pub fn any() -> Self {
        Self::new(ItemType::AnyItem, Occurrence::ZeroOrMore)
    }

    /// Item-count bounds implied by this type.
    pub fn bounds(&self) -> (usize, Option<usize>) {
        match self {
            SequenceType::Empty => (0, Some(0)),
            SequenceType::Typed { occurrence, .. } => occurrence.bounds(),
        }
    }
}

/// Result of testing a single item against an item type.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Match,
    NoMatch,
    DynamicError(Error),
}

impl MatchOutcome {
    pub fn from_bool(b: bool) -> Self {
        if b { MatchOutcome::Match } else { MatchOutcome::NoMatch }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Match)
    }
}

impl fmt::Display for NameTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameTest::Wildcard => f.write_str("*"),
            NameTest::Exact(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            NameTest::Wildcard => write!(f, "{}()", self.kind.keyword()),
            NameTest::Exact(name) => write!(f, "{}({})", self.kind.keyword(), name),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::AnyItem => f.write_str("item()"),
            ItemType::Atomic(id) => write!(f, "{id}"),
            ItemType::Node(test) => write!(f, "{test}"),
            ItemType::Function(FunctionTest::AnySignature) => f.write_str("function(*)"),
            ItemType::Function(FunctionTest::Typed(sig)) => {
                f.write_str("function(")?;
                for (i, p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") as {}", sig.result)
            }
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceType::Empty => f.write_str("empty-sequence()"),
            // a typed function test needs parentheses before an indicator
            SequenceType::Typed { item: item @ ItemType::Function(FunctionTest::Typed(_)), occurrence }
                if *occurrence != Occurrence::ExactlyOne =>
            {
                write!(f, "({item}){}", occurrence.suffix())
            }
            SequenceType::Typed { item, occurrence } => write!(f, "{item}{}", occurrence.suffix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Occurrence::ExactlyOne, Occurrence::ZeroOrOne, true)]
    #[case(Occurrence::ExactlyOne, Occurrence::OneOrMore, true)]
    #[case(Occurrence::ZeroOrOne, Occurrence::ZeroOrMore, true)]
    #[case(Occurrence::OneOrMore, Occurrence::ZeroOrMore, true)]
    #[case(Occurrence::ZeroOrOne, Occurrence::OneOrMore, false)]
    #[case(Occurrence::ZeroOrMore, Occurrence::OneOrMore, false)]
    #[case(Occurrence::ZeroOrMore, Occurrence::ExactlyOne, false)]
    fn occurrence_nesting(#[case] a: Occurrence, #[case] b: Occurrence, #[case] expected: bool) {
        assert_eq!(a.is_within(b), expected);
    }

    #[test]
    fn display_forms() {
        assert_eq!(SequenceType::atomic(AtomicTypeId::Integer, Occurrence::OneOrMore).to_string(), "xs:integer+");
        assert_eq!(SequenceType::Empty.to_string(), "empty-sequence()");
        let e = NodeTest::named(NodeKindTest::Element, ExpandedName::new(None, "e"));
        assert_eq!(SequenceType::new(ItemType::Node(e), Occurrence::ZeroOrOne).to_string(), "element(e)?");
        let sig = FunctionSignature::new(
            [SequenceType::atomic(AtomicTypeId::String, Occurrence::ExactlyOne)],
            SequenceType::any(),
        );
        let t = SequenceType::new(ItemType::Function(FunctionTest::Typed(Box::new(sig))), Occurrence::ZeroOrMore);
        assert_eq!(t.to_string(), "(function(xs:string) as item()*)*");
    }
}
