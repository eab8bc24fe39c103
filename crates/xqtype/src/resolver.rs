//! Static resolution of parsed SequenceType annotations.
//!
//! Lexical names are bound against the in-scope namespaces exactly once, before any operand
//! is evaluated. Every failure here is a static error.

use crate::consts::XS;
use crate::parser::ast;
use crate::runtime::{Error, ErrorCode, NamespaceBindings, StaticContext};
use crate::types::{
    AtomicTypeId, FunctionSignature, FunctionTest, ItemType, ListTypeId, NameTest, NodeKindTest,
    NodeTest, SequenceType, TypeHierarchy,
};
use crate::xdm::ExpandedName;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StaticError {
    #[error("namespace prefix '{0}' is not bound")]
    UnresolvablePrefix(String),
    #[error("{0} is not a known atomic type")]
    UnknownType(String),
    #[error("list type {0} cannot be used as an item type")]
    ListTypeNotAllowed(String),
}

impl StaticError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StaticError::UnresolvablePrefix(_) => ErrorCode::XPST0081,
            StaticError::UnknownType(_) | StaticError::ListTypeNotAllowed(_) => ErrorCode::XPST0051,
        }
    }
}

impl From<StaticError> for Error {
    fn from(e: StaticError) -> Self {
        Error::static_err(e.code(), e.to_string())
    }
}

/// Binds type names (`xs:integer`, `integer`, `Q{uri}local`) to built-in atomic types.
#[derive(Debug, Clone, Default)]
pub struct TypeNameResolver {
    /// Namespace of unprefixed type and element names.
    default_type_namespace: Option<String>,
}

impl TypeNameResolver {
    pub fn new(default_type_namespace: Option<String>) -> Self {
        Self { default_type_namespace }
    }

    pub fn for_context(ctx: &StaticContext) -> Self {
        Self::new(ctx.default_element_namespace.clone())
    }

    /// Resolve a lexical type name. Names are case sensitive.
    pub fn resolve(&self, lexical: &str, namespaces: &NamespaceBindings) -> Result<ItemType, StaticError> {
        let qname = split_lexical(lexical).ok_or_else(|| StaticError::UnknownType(lexical.to_string()))?;
        self.resolve_qname(&qname, namespaces).map(ItemType::Atomic)
    }

    pub fn resolve_qname(
        &self,
        qname: &ast::QName,
        namespaces: &NamespaceBindings,
    ) -> Result<AtomicTypeId, StaticError> {
        let expanded = expand(qname, namespaces, self.default_type_namespace.as_deref())?;
        if expanded.ns_uri.as_deref() == Some(XS) {
            if let Some(id) = TypeHierarchy::global().by_local_name(&expanded.local) {
                return Ok(id);
            }
            if ListTypeId::from_local_name(&expanded.local).is_some() {
                return Err(StaticError::ListTypeNotAllowed(qname.to_string()));
            }
        }
        Err(StaticError::UnknownType(qname.to_string()))
    }

    /// Resolve a whole annotation. Node and function forms are resolved structurally.
    pub fn resolve_sequence_type(
        &self,
        ty: &ast::SequenceType,
        namespaces: &NamespaceBindings,
    ) -> Result<SequenceType, StaticError> {
        match ty {
            ast::SequenceType::EmptySequence => Ok(SequenceType::Empty),
            ast::SequenceType::Typed { item, occ } => {
                Ok(SequenceType::new(self.resolve_item_type(item, namespaces)?, *occ))
            }
        }
    }

    fn resolve_item_type(&self, item: &ast::ItemType, namespaces: &NamespaceBindings) -> Result<ItemType, StaticError> {
        match item {
            ast::ItemType::Item => Ok(ItemType::AnyItem),
            ast::ItemType::Atomic(q) => self.resolve_qname(q, namespaces).map(ItemType::Atomic),
            ast::ItemType::UnknownKindTest(q) => Err(StaticError::UnknownType(format!("{q}()"))),
            ast::ItemType::AnyFunction => Ok(ItemType::Function(FunctionTest::AnySignature)),
            ast::ItemType::TypedFunction { params, result } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_sequence_type(p, namespaces))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = self.resolve_sequence_type(result, namespaces)?;
                Ok(ItemType::Function(FunctionTest::Typed(Box::new(FunctionSignature::new(params, result)))))
            }
            ast::ItemType::Kind(k) => self.resolve_kind_test(k, namespaces).map(ItemType::Node),
        }
    }

    fn resolve_kind_test(&self, k: &ast::KindTest, namespaces: &NamespaceBindings) -> Result<NodeTest, StaticError> {
        let name_test = |name: &Option<ast::NameOrWildcard>, default: Option<&str>| match name {
            None | Some(ast::NameOrWildcard::Wildcard) => Ok(NameTest::Wildcard),
            Some(ast::NameOrWildcard::Name(q)) => expand(q, namespaces, default).map(NameTest::Exact),
        };
        Ok(match k {
            ast::KindTest::AnyKind => NodeTest::kind(NodeKindTest::AnyKind),
            ast::KindTest::Document => NodeTest::kind(NodeKindTest::Document),
            ast::KindTest::Text => NodeTest::kind(NodeKindTest::Text),
            ast::KindTest::Comment => NodeTest::kind(NodeKindTest::Comment),
            ast::KindTest::ProcessingInstruction(None) => NodeTest::kind(NodeKindTest::ProcessingInstruction),
            ast::KindTest::ProcessingInstruction(Some(target)) => {
                NodeTest::named(NodeKindTest::ProcessingInstruction, ExpandedName::new(None, target.clone()))
            }
            ast::KindTest::Element(name) => NodeTest {
                kind: NodeKindTest::Element,
                name: name_test(name, self.default_type_namespace.as_deref())?,
            },
            // unprefixed attribute names are in no namespace
            ast::KindTest::Attribute(name) => NodeTest { kind: NodeKindTest::Attribute, name: name_test(name, None)? },
        })
    }
}

/// Resolve a parsed annotation against a static context.
pub fn resolve_sequence_type(ty: &ast::SequenceType, ctx: &StaticContext) -> Result<SequenceType, Error> {
    let resolved = TypeNameResolver::for_context(ctx).resolve_sequence_type(ty, &ctx.namespaces)?;
    tracing::trace!(sequence_type = %resolved, "sequence type resolved");
    Ok(resolved)
}

/// Expand a parsed name. `default` applies to unprefixed names.
pub(crate) fn expand(
    q: &ast::QName,
    namespaces: &NamespaceBindings,
    default: Option<&str>,
) -> Result<ExpandedName, StaticError> {
    if let Some(ns) = &q.ns_uri {
        // Q{}local is explicitly in no namespace
        let ns = (!ns.is_empty()).then(|| ns.clone());
        return Ok(ExpandedName::new(ns, q.local.clone()));
    }
    match &q.prefix {
        Some(p) => namespaces
            .lookup(p)
            .map(|uri| ExpandedName::ns(uri, q.local.clone()))
            .ok_or_else(|| StaticError::UnresolvablePrefix(p.clone())),
        None => Ok(ExpandedName::new(default.map(str::to_string), q.local.clone())),
    }
}

fn split_lexical(lexical: &str) -> Option<ast::QName> {
    let lexical = lexical.trim();
    if let Some(rest) = lexical.strip_prefix("Q{") {
        let (uri, local) = rest.split_once('}')?;
        return (!local.is_empty()).then(|| ast::QName {
            prefix: None,
            local: local.to_string(),
            ns_uri: Some(uri.to_string()),
        });
    }
    match lexical.split_once(':') {
        Some((p, l)) if !p.is_empty() && !l.is_empty() && !l.contains(':') => Some(ast::QName::prefixed(p, l)),
        Some(_) => None,
        None if !lexical.is_empty() => Some(ast::QName::local(lexical)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::XQueryParser;
    use crate::runtime::StaticContextBuilder;
    use crate::types::Occurrence;
    use rstest::rstest;

    fn bindings() -> NamespaceBindings {
        StaticContext::default().namespaces
    }

    #[rstest]
    #[case("xs:integer", AtomicTypeId::Integer)]
    #[case("xs:NMTOKEN", AtomicTypeId::NmToken)]
    #[case("xs:anyAtomicType", AtomicTypeId::AnyAtomicType)]
    #[case("Q{http://www.w3.org/2001/XMLSchema}QName", AtomicTypeId::QName)]
    fn known_types(#[case] lexical: &str, #[case] expected: AtomicTypeId) {
        let r = TypeNameResolver::default().resolve(lexical, &bindings());
        assert_eq!(r, Ok(ItemType::Atomic(expected)));
    }

    #[rstest]
    #[case("xs:qname", ErrorCode::XPST0051)]
    #[case("xs:NMTOKENS", ErrorCode::XPST0051)]
    #[case("xs:IDREFS", ErrorCode::XPST0051)]
    #[case("xs:anyType", ErrorCode::XPST0051)]
    #[case("integer", ErrorCode::XPST0051)]
    #[case("nope:integer", ErrorCode::XPST0081)]
    #[case("fn:string", ErrorCode::XPST0051)]
    fn failures(#[case] lexical: &str, #[case] code: ErrorCode) {
        let err = TypeNameResolver::default().resolve(lexical, &bindings()).unwrap_err();
        assert_eq!(err.code(), code);
        assert_eq!(Error::from(err).code_enum(), code);
    }

    #[test]
    fn default_type_namespace_applies_to_unprefixed_names() {
        let ctx = StaticContextBuilder::new().with_default_element_namespace(XS).build();
        let r = TypeNameResolver::for_context(&ctx).resolve("integer", &ctx.namespaces);
        assert_eq!(r, Ok(ItemType::Atomic(AtomicTypeId::Integer)));
    }

    #[test]
    fn list_type_is_distinct_from_unknown() {
        let r = TypeNameResolver::default().resolve("xs:ENTITIES", &bindings());
        assert_eq!(r, Err(StaticError::ListTypeNotAllowed("xs:ENTITIES".into())));
    }

    fn resolve(input: &str, ctx: &StaticContext) -> Result<SequenceType, Error> {
        resolve_sequence_type(&XQueryParser::parse_sequence_type(input)?, ctx)
    }

    #[test]
    fn structural_resolution() {
        let ctx = StaticContextBuilder::new().with_namespace("p", "urn:p").build();
        let t = resolve("element(p:e)*", &ctx).unwrap();
        let expected = NodeTest::named(NodeKindTest::Element, ExpandedName::ns("urn:p", "e"));
        assert_eq!(t, SequenceType::new(ItemType::Node(expected), Occurrence::ZeroOrMore));

        let t = resolve("function(xs:string) as xs:boolean?", &ctx).unwrap();
        assert_eq!(t.to_string(), "function(xs:string) as xs:boolean?");
    }

    #[rstest]
    #[case("none()", ErrorCode::XPST0051)]
    #[case("element(q:e)", ErrorCode::XPST0081)]
    #[case("function(xs:nope) as item()", ErrorCode::XPST0051)]
    #[case("xs:integer+ +", ErrorCode::XPST0003)]
    fn structural_failures(#[case] input: &str, #[case] code: ErrorCode) {
        assert_eq!(resolve(input, &StaticContext::default()).unwrap_err().code_enum(), code);
    }
}
