use rstest::rstest;
use std::sync::Arc;
use xqtype::{
    ConsumptionPolicy, DynamicContextBuilder, Error, ErrorCode, ExpandedName, ItemType, NodeKind, NodeKindTest,
    NodeTest, Occurrence, QName, SequenceType, SequenceTypeEvaluator, XdmItem, XdmNode,
};

/// A node backed by a remote tree; the name lookup may fail once the element is gone.
#[derive(Debug, Clone)]
struct RemoteNode {
    kind: NodeKind,
    name: Option<&'static str>,
    stale: bool,
    id: Arc<()>,
}

impl PartialEq for RemoteNode {
    fn eq(&self, o: &Self) -> bool {
        Arc::ptr_eq(&self.id, &o.id)
    }
}
impl Eq for RemoteNode {}

impl XdmNode for RemoteNode {
    fn kind(&self) -> NodeKind {
        self.kind
    }
    fn name(&self) -> Option<QName> {
        self.name.map(QName::local)
    }
    fn string_value(&self) -> String {
        String::new()
    }
    fn try_name(&self) -> Result<Option<QName>, Error> {
        if self.stale {
            return Err(Error::new_qname(Error::parse_code("Q{urn:remote}STALE"), "element is gone"));
        }
        Ok(self.name())
    }
}

fn node(kind: NodeKind, name: &'static str, stale: bool) -> XdmItem<RemoteNode> {
    XdmItem::Node(RemoteNode { kind, name: Some(name), stale, id: Arc::new(()) })
}

fn element_named(local: &str, occ: Occurrence) -> SequenceType {
    SequenceType::new(ItemType::Node(NodeTest::named(NodeKindTest::Element, ExpandedName::new(None, local))), occ)
}

#[rstest]
fn failed_name_lookup_is_a_dynamic_error(
    #[values(ConsumptionPolicy::Lazy, ConsumptionPolicy::Eager)] policy: ConsumptionPolicy,
) {
    let ctx = DynamicContextBuilder::<RemoteNode>::new().with_policy(policy).build();
    let items = vec![node(NodeKind::Element, "button", false), node(NodeKind::Element, "button", true)];
    let err = SequenceTypeEvaluator::new(&ctx)
        .instance_of(items.into_iter().map(Ok), &element_named("button", Occurrence::ZeroOrMore))
        .unwrap_err();
    assert_eq!(err.format_code(), "Q{urn:remote}STALE");
    assert_eq!(err.code_enum(), ErrorCode::Unknown);
    assert_eq!(ctx.active_scopes(), 0);
}

#[test]
fn kind_mismatch_is_decided_without_the_name() {
    let ctx = DynamicContextBuilder::<RemoteNode>::new().build();
    let items = vec![node(NodeKind::Attribute, "button", true)];
    let verdict = SequenceTypeEvaluator::new(&ctx)
        .instance_of(items.into_iter().map(Ok), &element_named("button", Occurrence::ExactlyOne))
        .unwrap();
    assert!(!verdict);
}

#[test]
fn wildcard_tests_never_ask_for_the_name() {
    let ctx = DynamicContextBuilder::<RemoteNode>::new().build();
    let t = SequenceType::new(ItemType::Node(NodeTest::kind(NodeKindTest::Element)), Occurrence::OneOrMore);
    let items = vec![node(NodeKind::Element, "a", true), node(NodeKind::Element, "b", true)];
    let verdict = SequenceTypeEvaluator::new(&ctx).instance_of(items.into_iter().map(Ok), &t).unwrap();
    assert!(verdict);
}
