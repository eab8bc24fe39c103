use rstest::rstest;
use xqtype::{
    AtomicValue, DynamicContext, ErrorCode, SimpleNode, StaticContext, XdmAtomicValue, XdmItem, evaluate_query,
};

fn eval_bool(query: &str) -> bool {
    let ctx: DynamicContext<SimpleNode> = DynamicContext::default();
    let out = evaluate_query(query, &StaticContext::default(), &ctx).unwrap_or_else(|e| panic!("{query}: {e}"));
    match out.as_slice() {
        [XdmItem::Atomic(AtomicValue { value: XdmAtomicValue::Boolean(b), .. })] => *b,
        other => panic!("{query}: expected a boolean, got {other:?}"),
    }
}

fn eval_err(query: &str) -> ErrorCode {
    let ctx: DynamicContext<SimpleNode> = DynamicContext::default();
    evaluate_query(query, &StaticContext::default(), &ctx)
        .expect_err(query)
        .code_enum()
}

#[rstest]
#[case::a_integers_plus("(1, 2, 3, 4, 5) instance of xs:integer+", true)]
#[case::b_mixed_star("(1, 2, \"a string\", 4, 5) instance of xs:integer*", false)]
#[case::c_empty_is_empty("() instance of empty-sequence()", true)]
#[case::c_items_are_not_empty("(1, 2, 3) instance of empty-sequence()", false)]
#[case::d_direct_element("<e/> instance of element(e)", true)]
#[case::d_attribute_is_no_element("attribute e {\"content\"} instance of element(e)", false)]
#[case::f_decimal("1.1 instance of xs:decimal", true)]
#[case::f_decimal_is_no_integer("1.1 instance of xs:integer", false)]
fn conformance_scenarios(#[case] query: &str, #[case] expected: bool) {
    assert_eq!(eval_bool(query), expected, "{query}");
}

#[rstest]
#[case::e_unknown_type("3 instance of xs:doesNotExist", ErrorCode::XPST0051)]
#[case::e_unbound_prefix("3 instance of prefixDoesNotExist:integer", ErrorCode::XPST0081)]
#[case::e_list_type("xs:NMTOKEN('abc') instance of xs:NMTOKENS", ErrorCode::XPST0051)]
#[case::case_sensitive("1 instance of xs:Integer", ErrorCode::XPST0051)]
#[case::not_a_kind_test("1 instance of none()", ErrorCode::XPST0051)]
fn static_type_errors(#[case] query: &str, #[case] expected: ErrorCode) {
    assert_eq!(eval_err(query), expected, "{query}");
}

#[rstest]
#[case("xs:byte(1) instance of xs:short", true)]
#[case("xs:short(1) instance of xs:byte", false)]
#[case("xs:unsignedByte(1) instance of xs:nonNegativeInteger", true)]
#[case("xs:NCName('a') instance of xs:Name", true)]
#[case("xs:NMTOKEN('a') instance of xs:Name", false)]
#[case("xs:anyURI('http://x') instance of xs:string", false)]
#[case("xs:untypedAtomic('1') instance of xs:string", false)]
#[case("xs:dayTimeDuration('PT1S') instance of xs:duration", true)]
#[case("'false' instance of xs:boolean", false)]
#[case("fn:false() instance of xs:boolean", true)]
#[case("1e0 instance of xs:decimal", false)]
#[case("xs:float(1) instance of xs:double", false)]
#[case("xs:date('2024-02-29') instance of xs:anyAtomicType", true)]
fn atomic_derivation(#[case] query: &str, #[case] expected: bool) {
    assert_eq!(eval_bool(query), expected, "{query}");
}

#[rstest]
#[case("<e/> instance of node()", true)]
#[case("<e/> instance of element()", true)]
#[case("<e/> instance of element(*)", true)]
#[case("<e/> instance of element(f)", false)]
#[case("<e/> instance of item()", true)]
#[case("<e/> instance of xs:anyAtomicType", false)]
#[case("attribute a {1} instance of attribute(a)", true)]
#[case("attribute a {1} instance of attribute()", true)]
#[case("text {'t'} instance of text()", true)]
#[case("comment {'c'} instance of comment()", true)]
#[case("comment {'c'} instance of text()", false)]
#[case("processing-instruction pi {'d'} instance of processing-instruction(pi)", true)]
#[case("processing-instruction pi {'d'} instance of processing-instruction('pi')", true)]
#[case("processing-instruction pi {'d'} instance of processing-instruction(other)", false)]
#[case("document {<e/>} instance of document-node()", true)]
#[case("document {<e/>} instance of element()", false)]
#[case("(<e/>, attribute a {1}) instance of element()*", false)]
#[case("element (: comment :) e {} instance of element( e )", true)]
fn node_kinds_and_names(#[case] query: &str, #[case] expected: bool) {
    assert_eq!(eval_bool(query), expected, "{query}");
}

#[rstest]
#[case("fn:true#0 instance of function(*)", true)]
#[case("fn:not#1 instance of function(item()*) as xs:boolean", true)]
#[case("fn:not#1 instance of function(xs:string) as xs:boolean", true)]
#[case("fn:not#1 instance of function(xs:string) as xs:anyAtomicType", true)]
#[case("fn:not#1 instance of function(xs:string) as xs:string", false)]
#[case("fn:not#1 instance of function() as xs:boolean", false)]
#[case("xs:integer#1 instance of function(xs:anyAtomicType?) as xs:integer?", true)]
#[case("xs:integer#1 instance of function(xs:anyAtomicType) as xs:decimal*", true)]
#[case("function($a as xs:decimal) as xs:integer { $a } instance of function(xs:integer) as xs:decimal", true)]
#[case("function($a as xs:integer) as xs:integer { 1 } instance of function(xs:decimal) as xs:integer", false)]
#[case("function($a) { $a } instance of function(item()*) as item()*", true)]
#[case("function() { 1 } instance of xs:anyAtomicType", false)]
fn function_item_variance(#[case] query: &str, #[case] expected: bool) {
    assert_eq!(eval_bool(query), expected, "{query}");
}

#[rstest]
#[case("(1, 2) instance of xs:integer", false)]
#[case("(1, 2) instance of xs:integer?", false)]
#[case("(1, 2) instance of xs:integer*", true)]
#[case("() instance of xs:integer", false)]
#[case("() instance of xs:integer?", true)]
#[case("() instance of xs:integer+", false)]
#[case("() instance of item()*", true)]
#[case("((1, 2), (), (3)) instance of xs:integer+", true)]
fn occurrence_indicators(#[case] query: &str, #[case] expected: bool) {
    assert_eq!(eval_bool(query), expected, "{query}");
}
