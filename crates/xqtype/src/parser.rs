use pest::Parser;
use pest::iterators::Pair;
use std::sync::Arc;

use crate::runtime::{Error, ErrorCode};
use crate::types::Occurrence;

pub mod ast;
pub mod literal;

#[derive(pest_derive::Parser)]
#[grammar = "xquery.pest"]
pub struct XQueryParser;

fn syntax_error(e: pest::error::Error<Rule>) -> Error {
    let msg = e.to_string();
    Error::static_err(ErrorCode::XPST0003, msg)
        .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
}

fn malformed(pair: &Pair<Rule>) -> Error {
    Error::static_err(
        ErrorCode::XPST0003,
        format!("unexpected {:?} at offset {}", pair.as_rule(), pair.as_span().start()),
    )
}

fn first_inner<'i>(pair: &Pair<'i, Rule>) -> Result<Pair<'i, Rule>, Error> {
    pair.clone().into_inner().next().ok_or_else(|| malformed(pair))
}

impl XQueryParser {
    /// Parse a whole query into the expression tree.
    pub fn parse_to_ast(input: &str) -> Result<ast::Expr, Error> {
        let mut pairs = Self::parse(Rule::query, input).map_err(syntax_error)?;
        let root = pairs.next().ok_or_else(|| Error::static_err(ErrorCode::XPST0003, "empty query"))?;
        debug_assert_eq!(root.as_rule(), Rule::query);
        let expr = first_inner(&root)?;
        Self::build_expr(&expr)
    }

    /// Parse a standalone SequenceType annotation such as `xs:integer+`.
    pub fn parse_sequence_type(input: &str) -> Result<ast::SequenceType, Error> {
        let mut pairs = Self::parse(Rule::sequence_type_only, input).map_err(syntax_error)?;
        let root = pairs
            .next()
            .ok_or_else(|| Error::static_err(ErrorCode::XPST0003, "empty sequence type"))?;
        Self::build_sequence_type(&first_inner(&root)?)
    }

    // ====== expressions ======

    fn build_expr(pair: &Pair<Rule>) -> Result<ast::Expr, Error> {
        match pair.as_rule() {
            Rule::expr => {
                let mut items = pair
                    .clone()
                    .into_inner()
                    .map(|p| Self::build_expr(&p))
                    .collect::<Result<Vec<_>, _>>()?;
                if items.len() == 1 {
                    return items.pop().ok_or_else(|| malformed(pair));
                }
                Ok(ast::Expr::Sequence(items))
            }
            Rule::expr_single | Rule::primary_expr | Rule::literal => Self::build_expr(&first_inner(pair)?),
            Rule::instanceof_expr | Rule::treat_expr => {
                let mut inner = pair.clone().into_inner();
                let operand = inner.next().ok_or_else(|| malformed(pair))?;
                let operand = Self::build_expr(&operand)?;
                // keyword tokens, then the type
                let Some(ty) = inner.find(|p| p.as_rule() == Rule::sequence_type) else {
                    return Ok(operand);
                };
                let ty = Self::build_sequence_type(&ty)?;
                Ok(if pair.as_rule() == Rule::instanceof_expr {
                    ast::Expr::InstanceOf { expr: Box::new(operand), ty }
                } else {
                    ast::Expr::TreatAs { expr: Box::new(operand), ty }
                })
            }
            Rule::unary_expr => {
                let mut negations = 0usize;
                let mut operand = None;
                for p in pair.clone().into_inner() {
                    match p.as_rule() {
                        Rule::minus => negations += 1,
                        _ => operand = Some(Self::build_expr(&p)?),
                    }
                }
                let mut e = operand.ok_or_else(|| malformed(pair))?;
                if negations % 2 == 1 {
                    e = ast::Expr::Negate(Box::new(e));
                }
                Ok(e)
            }
            Rule::parenthesized_expr | Rule::enclosed_expr => match pair.clone().into_inner().next() {
                Some(inner) => Self::build_expr(&inner),
                None => Ok(ast::Expr::empty()),
            },
            Rule::integer_literal => {
                Ok(ast::Expr::Literal(ast::Literal::Integer(literal::parse_integer(pair.as_str())?)))
            }
            Rule::decimal_literal => {
                Ok(ast::Expr::Literal(ast::Literal::Decimal(literal::parse_decimal(pair.as_str())?)))
            }
            Rule::double_literal => {
                Ok(ast::Expr::Literal(ast::Literal::Double(literal::parse_double(pair.as_str())?)))
            }
            Rule::string_literal => Ok(ast::Expr::Literal(ast::Literal::String(Self::build_string(pair)?))),
            Rule::var_ref => Ok(ast::Expr::VarRef(Self::build_qname(&first_inner(pair)?)?)),
            Rule::function_call => {
                let mut inner = pair.clone().into_inner();
                let name = Self::build_qname(&inner.next().ok_or_else(|| malformed(pair))?)?;
                let args = inner.map(|p| Self::build_expr(&p)).collect::<Result<Vec<_>, _>>()?;
                Ok(ast::Expr::FunctionCall { name, args })
            }
            Rule::named_function_ref => {
                let mut inner = pair.clone().into_inner();
                let name = Self::build_qname(&inner.next().ok_or_else(|| malformed(pair))?)?;
                let arity = inner.next().ok_or_else(|| malformed(pair))?;
                let arity = arity
                    .as_str()
                    .parse::<usize>()
                    .map_err(|e| Error::static_err(ErrorCode::XPST0003, format!("invalid arity: {e}")))?;
                Ok(ast::Expr::NamedFunctionRef { name, arity })
            }
            Rule::inline_function => Self::build_inline_function(pair),
            Rule::direct_element => Ok(ast::Expr::DirectElement { name: Self::build_qname(&first_inner(pair)?)? }),
            Rule::computed_constructor => Self::build_constructor(&first_inner(pair)?),
            _ => Err(malformed(pair)),
        }
    }

    fn build_string(pair: &Pair<Rule>) -> Result<String, Error> {
        let Some(content) = pair.clone().into_inner().next() else {
            return Ok(String::new());
        };
        let delim = if content.as_rule() == Rule::sgl_string_inner { '\'' } else { '"' };
        literal::unescape_string(content.as_str(), delim)
    }

    fn build_inline_function(pair: &Pair<Rule>) -> Result<ast::Expr, Error> {
        let mut params = Vec::new();
        let mut ret = None;
        let mut body = ast::Expr::empty();
        for p in pair.clone().into_inner() {
            match p.as_rule() {
                Rule::param_list => {
                    for param in p.into_inner() {
                        let mut inner = param.clone().into_inner();
                        let name = Self::build_qname(&inner.next().ok_or_else(|| malformed(&param))?)?;
                        let ty = inner.next().map(|d| Self::build_type_declaration(&d)).transpose()?;
                        params.push(ast::Param { name, ty });
                    }
                }
                Rule::type_declaration => ret = Some(Self::build_type_declaration(&p)?),
                Rule::enclosed_expr => body = Self::build_expr(&p)?,
                _ => {}
            }
        }
        Ok(ast::Expr::InlineFunction { params, ret, body: Box::new(body) })
    }

    fn build_type_declaration(pair: &Pair<Rule>) -> Result<ast::SequenceType, Error> {
        let ty = pair
            .clone()
            .into_inner()
            .find(|p| p.as_rule() == Rule::sequence_type)
            .ok_or_else(|| malformed(pair))?;
        Self::build_sequence_type(&ty)
    }

    fn build_constructor(pair: &Pair<Rule>) -> Result<ast::Expr, Error> {
        let mut name = None;
        let mut target = None;
        let mut content = ast::Expr::empty();
        for p in pair.clone().into_inner() {
            match p.as_rule() {
                Rule::eq_name => name = Some(Self::build_qname(&p)?),
                Rule::nc_name => target = Some(p.as_str().to_string()),
                Rule::enclosed_expr => content = Self::build_expr(&p)?,
                _ => {}
            }
        }
        let content = Box::new(content);
        let named = |name: Option<ast::QName>| name.ok_or_else(|| malformed(pair));
        Ok(match pair.as_rule() {
            Rule::comp_doc => ast::Expr::ComputedDocument(content),
            Rule::comp_elem => ast::Expr::ComputedElement { name: named(name)?, content },
            Rule::comp_attr => ast::Expr::ComputedAttribute { name: named(name)?, content },
            Rule::comp_text => ast::Expr::ComputedText(content),
            Rule::comp_comment => ast::Expr::ComputedComment(content),
            Rule::comp_pi => ast::Expr::ComputedPi { target: target.ok_or_else(|| malformed(pair))?, content },
            _ => return Err(malformed(pair)),
        })
    }

    fn build_qname(pair: &Pair<Rule>) -> Result<ast::QName, Error> {
        let pair = if pair.as_rule() == Rule::eq_name { first_inner(pair)? } else { pair.clone() };
        let mut inner = pair.clone().into_inner();
        match pair.as_rule() {
            Rule::unprefixed_name => Ok(ast::QName::local(pair.as_str())),
            Rule::prefixed_name => {
                let prefix = inner.next().ok_or_else(|| malformed(&pair))?;
                let local = inner.next().ok_or_else(|| malformed(&pair))?;
                Ok(ast::QName::prefixed(prefix.as_str(), local.as_str()))
            }
            Rule::uri_qualified_name => {
                let uri = inner.next().ok_or_else(|| malformed(&pair))?;
                let local = inner.next().ok_or_else(|| malformed(&pair))?;
                Ok(ast::QName {
                    prefix: None,
                    local: local.as_str().to_string(),
                    ns_uri: Some(uri.as_str().to_string()),
                })
            }
            _ => Err(malformed(&pair)),
        }
    }

    // ====== sequence types ======

    fn build_sequence_type(pair: &Pair<Rule>) -> Result<ast::SequenceType, Error> {
        debug_assert_eq!(pair.as_rule(), Rule::sequence_type);
        let mut inner = pair.clone().into_inner();
        let first = inner.next().ok_or_else(|| malformed(pair))?;
        if first.as_rule() == Rule::empty_sequence_type {
            return Ok(ast::SequenceType::EmptySequence);
        }
        let item = Self::build_item_type(&first)?;
        let occ = match inner.next().map(|p| p.as_str()) {
            None => Occurrence::ExactlyOne,
            Some("?") => Occurrence::ZeroOrOne,
            Some("*") => Occurrence::ZeroOrMore,
            Some("+") => Occurrence::OneOrMore,
            Some(_) => return Err(malformed(pair)),
        };
        Ok(ast::SequenceType::Typed { item, occ })
    }

    fn build_item_type(pair: &Pair<Rule>) -> Result<ast::ItemType, Error> {
        debug_assert_eq!(pair.as_rule(), Rule::item_type);
        let inner = first_inner(pair)?;
        match inner.as_rule() {
            Rule::kind_test => Self::build_kind_test(&inner).map(ast::ItemType::Kind),
            Rule::item_test => Ok(ast::ItemType::Item),
            Rule::parenthesized_item_type => Self::build_item_type(&first_inner(&inner)?),
            Rule::unknown_kind_test => Ok(ast::ItemType::UnknownKindTest(Self::build_qname(&first_inner(&inner)?)?)),
            Rule::atomic_type => Ok(ast::ItemType::Atomic(Self::build_qname(&first_inner(&inner)?)?)),
            Rule::function_test => {
                let test = first_inner(&inner)?;
                match test.as_rule() {
                    Rule::any_function_test => Ok(ast::ItemType::AnyFunction),
                    Rule::typed_function_test => {
                        let mut types = test
                            .clone()
                            .into_inner()
                            .filter(|p| p.as_rule() == Rule::sequence_type)
                            .map(|p| Self::build_sequence_type(&p))
                            .collect::<Result<Vec<_>, _>>()?;
                        // the last sequence type is the result
                        let result = types.pop().ok_or_else(|| malformed(&test))?;
                        Ok(ast::ItemType::TypedFunction { params: types, result: Box::new(result) })
                    }
                    _ => Err(malformed(&test)),
                }
            }
            _ => Err(malformed(&inner)),
        }
    }

    fn build_kind_test(pair: &Pair<Rule>) -> Result<ast::KindTest, Error> {
        debug_assert_eq!(pair.as_rule(), Rule::kind_test);
        let kind = first_inner(pair)?;
        let arg = kind.clone().into_inner().next();
        match kind.as_rule() {
            Rule::any_kind_test => Ok(ast::KindTest::AnyKind),
            Rule::document_test => Ok(ast::KindTest::Document),
            Rule::text_test => Ok(ast::KindTest::Text),
            Rule::comment_test => Ok(ast::KindTest::Comment),
            Rule::pi_test => match arg {
                None => Ok(ast::KindTest::ProcessingInstruction(None)),
                Some(p) if p.as_rule() == Rule::string_literal => {
                    // the literal form is normalized and must be an NCName
                    let target = Self::build_string(&p)?.trim().to_string();
                    Ok(ast::KindTest::ProcessingInstruction(Some(target)))
                }
                Some(p) => Ok(ast::KindTest::ProcessingInstruction(Some(p.as_str().to_string()))),
            },
            Rule::element_test => arg.map(|p| Self::build_name_or_wildcard(&p)).transpose().map(ast::KindTest::Element),
            Rule::attribute_test => {
                arg.map(|p| Self::build_name_or_wildcard(&p)).transpose().map(ast::KindTest::Attribute)
            }
            _ => Err(malformed(&kind)),
        }
    }

    fn build_name_or_wildcard(pair: &Pair<Rule>) -> Result<ast::NameOrWildcard, Error> {
        let inner = first_inner(pair)?;
        match inner.as_rule() {
            Rule::wildcard => Ok(ast::NameOrWildcard::Wildcard),
            _ => Self::build_qname(&inner).map(ast::NameOrWildcard::Name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ast::{Expr, ItemType, KindTest, Literal, NameOrWildcard, QName, SequenceType};
    use super::*;
    use rstest::rstest;

    fn st(input: &str) -> SequenceType {
        XQueryParser::parse_sequence_type(input).unwrap()
    }

    #[rstest]
    #[case("xs:integer", ItemType::Atomic(QName::prefixed("xs", "integer")), Occurrence::ExactlyOne)]
    #[case("xs:integer+", ItemType::Atomic(QName::prefixed("xs", "integer")), Occurrence::OneOrMore)]
    #[case("item()*", ItemType::Item, Occurrence::ZeroOrMore)]
    #[case("node()?", ItemType::Kind(KindTest::AnyKind), Occurrence::ZeroOrOne)]
    #[case("element( (: any :) )", ItemType::Kind(KindTest::Element(None)), Occurrence::ExactlyOne)]
    #[case("element(*)", ItemType::Kind(KindTest::Element(Some(NameOrWildcard::Wildcard))), Occurrence::ExactlyOne)]
    #[case(
        "attribute(a)",
        ItemType::Kind(KindTest::Attribute(Some(NameOrWildcard::Name(QName::local("a"))))),
        Occurrence::ExactlyOne
    )]
    #[case(
        "processing-instruction('t')",
        ItemType::Kind(KindTest::ProcessingInstruction(Some("t".into()))),
        Occurrence::ExactlyOne
    )]
    #[case("document-node()", ItemType::Kind(KindTest::Document), Occurrence::ExactlyOne)]
    #[case("function(*)", ItemType::AnyFunction, Occurrence::ExactlyOne)]
    #[case("none()", ItemType::UnknownKindTest(QName::local("none")), Occurrence::ExactlyOne)]
    #[case("(text())+", ItemType::Kind(KindTest::Text), Occurrence::OneOrMore)]
    fn sequence_types(#[case] input: &str, #[case] item: ItemType, #[case] occ: Occurrence) {
        assert_eq!(st(input), SequenceType::Typed { item, occ });
    }

    #[test]
    fn empty_sequence_takes_no_indicator() {
        assert_eq!(st("empty-sequence()"), SequenceType::EmptySequence);
        let err = XQueryParser::parse_sequence_type("empty-sequence()?").unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPST0003);
    }

    #[test]
    fn typed_function_test_splits_params_and_result() {
        let SequenceType::Typed { item: ItemType::TypedFunction { params, result }, .. } =
            st("function(xs:string, node()) as item()*")
        else {
            panic!("expected a typed function test");
        };
        assert_eq!(params.len(), 2);
        assert_eq!(*result, SequenceType::Typed { item: ItemType::Item, occ: Occurrence::ZeroOrMore });
    }

    #[test]
    fn instance_of_binds_tighter_than_comma() {
        let e = XQueryParser::parse_to_ast("1 instance of xs:integer, 'a'").unwrap();
        let Expr::Sequence(items) = e else { panic!("expected a sequence") };
        assert!(matches!(items[0], Expr::InstanceOf { .. }));
        assert_eq!(items[1], Expr::Literal(Literal::String("a".into())));
    }

    #[rstest]
    #[case("1", Expr::Literal(Literal::Integer(1)))]
    #[case("1.5", Expr::Literal(Literal::Decimal(1.5)))]
    #[case("1e0", Expr::Literal(Literal::Double(1.0)))]
    #[case("'a&amp;b'", Expr::Literal(Literal::String("a&b".into())))]
    #[case("()", Expr::Sequence(vec![]))]
    #[case("-1", Expr::Negate(Box::new(Expr::Literal(Literal::Integer(1)))))]
    #[case("fn:true#0", Expr::NamedFunctionRef { name: QName::prefixed("fn", "true"), arity: 0 })]
    #[case("<e/>", Expr::DirectElement { name: QName::local("e") })]
    #[case("text {'x'}", Expr::ComputedText(Box::new(Expr::Literal(Literal::String("x".into())))))]
    fn operands(#[case] input: &str, #[case] expected: Expr) {
        assert_eq!(XQueryParser::parse_to_ast(input).unwrap(), expected);
    }

    #[test]
    fn inline_function_keeps_its_signature() {
        let e = XQueryParser::parse_to_ast("function($a as xs:decimal) as xs:integer { $a }").unwrap();
        let Expr::InlineFunction { params, ret, body } = e else { panic!("expected an inline function") };
        assert_eq!(params.len(), 1);
        assert!(ret.is_some());
        assert_eq!(*body, Expr::VarRef(QName::local("a")));
    }

    #[rstest]
    #[case("1 instance xs:integer")]
    #[case("1 instance of")]
    #[case("element(")]
    #[case("(1, 2")]
    fn syntax_errors(#[case] input: &str) {
        assert_eq!(XQueryParser::parse_to_ast(input).unwrap_err().code_enum(), ErrorCode::XPST0003);
    }
}
