use proptest::prelude::*;
use xqtype::{
    AtomicTypeId, AtomicValue, DynamicContext, ItemType, ItemTypeMatcher, Occurrence, SequenceType,
    SequenceTypeEvaluator, SimpleNode, TypeHierarchy, XdmAtomicValue, XdmItem,
};

fn arb_type() -> impl Strategy<Value = AtomicTypeId> {
    prop::sample::select(AtomicTypeId::ALL)
}

fn arb_occurrence() -> impl Strategy<Value = Occurrence> {
    prop::sample::select(vec![
        Occurrence::ExactlyOne,
        Occurrence::ZeroOrOne,
        Occurrence::ZeroOrMore,
        Occurrence::OneOrMore,
    ])
}

fn atom(t: AtomicTypeId) -> XdmItem<SimpleNode> {
    // the payload does not take part in type matching
    XdmItem::Atomic(AtomicValue::new(t, XdmAtomicValue::Lexical(String::new())))
}

fn instance_of(items: &[XdmItem<SimpleNode>], t: &SequenceType) -> bool {
    let ctx: DynamicContext<SimpleNode> = DynamicContext::default();
    SequenceTypeEvaluator::new(&ctx)
        .instance_of(items.iter().cloned().map(Ok), t)
        .unwrap()
}

proptest! {
    #[test]
    fn subtyping_is_reflexive(a in arb_type()) {
        prop_assert!(TypeHierarchy::global().is_subtype_of(a, a));
    }

    #[test]
    fn subtyping_is_transitive(a in arb_type(), b in arb_type(), c in arb_type()) {
        let h = TypeHierarchy::global();
        if h.is_subtype_of(a, b) && h.is_subtype_of(b, c) {
            prop_assert!(h.is_subtype_of(a, c), "{a} <: {b} <: {c}");
        }
    }

    #[test]
    fn subtyping_is_antisymmetric(a in arb_type(), b in arb_type()) {
        let h = TypeHierarchy::global();
        if a != b && h.is_subtype_of(a, b) {
            prop_assert!(!h.is_subtype_of(b, a), "{a} and {b}");
        }
    }

    #[test]
    fn every_type_derives_from_any_atomic_type(a in arb_type()) {
        prop_assert!(TypeHierarchy::global().is_subtype_of(a, AtomicTypeId::AnyAtomicType));
    }

    #[test]
    fn atomic_match_follows_the_hierarchy(a in arb_type(), t in arb_type()) {
        let matched = ItemTypeMatcher::default().matches(&atom(a), &ItemType::Atomic(t)).is_match();
        prop_assert_eq!(matched, TypeHierarchy::global().is_subtype_of(a, t));
    }

    #[test]
    fn widening_the_occurrence_preserves_conformance(
        a in arb_type(),
        n in 0usize..4,
        narrow in arb_occurrence(),
        wide in arb_occurrence(),
    ) {
        prop_assume!(narrow.is_within(wide));
        let items: Vec<_> = (0..n).map(|_| atom(a)).collect();
        let narrow_t = SequenceType::atomic(a, narrow);
        if instance_of(&items, &narrow_t) {
            prop_assert!(instance_of(&items, &SequenceType::atomic(a, wide)));
        }
    }

    #[test]
    fn verdict_is_count_within_bounds_and_every_item_matching(
        types in prop::collection::vec(arb_type(), 0..5),
        target in arb_type(),
        occ in arb_occurrence(),
    ) {
        let h = TypeHierarchy::global();
        let items: Vec<_> = types.iter().copied().map(atom).collect();
        let (min, max) = occ.bounds();
        let expected = types.len() >= min
            && max.is_none_or(|m| types.len() <= m)
            && types.iter().all(|&t| h.is_subtype_of(t, target));
        prop_assert_eq!(instance_of(&items, &SequenceType::atomic(target, occ)), expected);
    }

    #[test]
    fn only_the_empty_sequence_is_empty(types in prop::collection::vec(arb_type(), 0..4)) {
        let items: Vec<_> = types.iter().copied().map(atom).collect();
        prop_assert_eq!(instance_of(&items, &SequenceType::Empty), items.is_empty());
    }
}
