//! Single-item type matching and static type subsumption.

use crate::model::XdmNode;
use crate::types::{
    FunctionSignature, FunctionTest, ItemType, MatchOutcome, NameTest, NodeKindTest, NodeTest,
    SequenceType, TypeHierarchy,
};
use crate::xdm::{FunctionItem, XdmItem};

/// Decides whether one item satisfies one item type.
///
/// Matching is a pure predicate over item metadata: no atomization, casting or promotion
/// takes place, so `"false"` is not an `xs:boolean` and an `xs:integer` is not an
/// `xs:double`. `empty-sequence()` is a cardinality constraint and never reaches this type.
#[derive(Debug, Clone, Copy)]
pub struct ItemTypeMatcher<'h> {
    hierarchy: &'h TypeHierarchy,
}

impl Default for ItemTypeMatcher<'static> {
    fn default() -> Self {
        Self::new(TypeHierarchy::global())
    }
}

impl<'h> ItemTypeMatcher<'h> {
    pub fn new(hierarchy: &'h TypeHierarchy) -> Self {
        Self { hierarchy }
    }

    pub fn hierarchy(&self) -> &'h TypeHierarchy {
        self.hierarchy
    }

    pub fn matches<N: XdmNode>(&self, item: &XdmItem<N>, t: &ItemType) -> MatchOutcome {
        match (item, t) {
            (_, ItemType::AnyItem) => MatchOutcome::Match,
            (XdmItem::Atomic(a), ItemType::Atomic(expected)) => {
                MatchOutcome::from_bool(self.hierarchy.is_subtype_of(a.type_id, *expected))
            }
            (XdmItem::Node(n), ItemType::Node(test)) => self.node_matches(n, test),
            (XdmItem::Function(f), ItemType::Function(test)) => {
                MatchOutcome::from_bool(self.function_matches(f, test))
            }
            _ => MatchOutcome::NoMatch,
        }
    }

    fn node_matches<N: XdmNode>(&self, node: &N, test: &NodeTest) -> MatchOutcome {
        if !test.kind.accepts(node.kind()) {
            return MatchOutcome::NoMatch;
        }
        let NameTest::Exact(expected) = &test.name else {
            return MatchOutcome::Match;
        };
        let name = match node.try_name() {
            Ok(name) => name,
            Err(e) => return MatchOutcome::DynamicError(e),
        };
        let Some(name) = name else {
            return MatchOutcome::NoMatch;
        };
        if test.kind == NodeKindTest::ProcessingInstruction {
            // PI targets are NCNames without a namespace
            return MatchOutcome::from_bool(name.local == expected.local);
        }
        MatchOutcome::from_bool(name.local == expected.local && name.ns_uri == expected.ns_uri)
    }

    fn function_matches(&self, f: &FunctionItem, test: &FunctionTest) -> bool {
        match test {
            FunctionTest::AnySignature => true,
            FunctionTest::Typed(expected) => self.signature_subsumes(&f.signature, expected),
        }
    }

    /// `true` when a function declared with `sub` may be used wherever `sup` is expected:
    /// same arity, parameters contravariant, result covariant.
    pub fn signature_subsumes(&self, sub: &FunctionSignature, sup: &FunctionSignature) -> bool {
        sub.params.len() == sup.params.len()
            && sup
                .params
                .iter()
                .zip(sub.params.iter())
                .all(|(expected, declared)| self.sequence_type_subsumes(expected, declared))
            && self.sequence_type_subsumes(&sub.result, &sup.result)
    }

    /// Static item type subsumption: every item matching `sub` also matches `sup`.
    pub fn item_type_subsumes(&self, sub: &ItemType, sup: &ItemType) -> bool {
        match (sub, sup) {
            (_, ItemType::AnyItem) => true,
            (ItemType::AnyItem, _) => false,
            (ItemType::Atomic(a), ItemType::Atomic(b)) => self.hierarchy.is_subtype_of(*a, *b),
            (ItemType::Node(a), ItemType::Node(b)) => node_test_subsumes(a, b),
            (ItemType::Function(_), ItemType::Function(FunctionTest::AnySignature)) => true,
            (ItemType::Function(FunctionTest::Typed(a)), ItemType::Function(FunctionTest::Typed(b))) => {
                self.signature_subsumes(a, b)
            }
            _ => false,
        }
    }

    /// Static sequence type subsumption: every sequence matching `sub` also matches `sup`.
    pub fn sequence_type_subsumes(&self, sub: &SequenceType, sup: &SequenceType) -> bool {
        match (sub, sup) {
            (SequenceType::Empty, SequenceType::Empty) => true,
            (SequenceType::Empty, SequenceType::Typed { occurrence, .. }) => occurrence.allows_empty(),
            (SequenceType::Typed { .. }, SequenceType::Empty) => false,
            (
                SequenceType::Typed { item: a, occurrence: oa },
                SequenceType::Typed { item: b, occurrence: ob },
            ) => oa.is_within(*ob) && self.item_type_subsumes(a, b),
        }
    }
}

fn node_test_subsumes(sub: &NodeTest, sup: &NodeTest) -> bool {
    if sup.kind == NodeKindTest::AnyKind {
        return true;
    }
    if sub.kind != sup.kind {
        return false;
    }
    match (&sub.name, &sup.name) {
        (_, NameTest::Wildcard) => true,
        (NameTest::Wildcard, NameTest::Exact(_)) => false,
        (NameTest::Exact(a), NameTest::Exact(b)) => a == b,
    }
}
