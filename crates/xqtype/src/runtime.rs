use crate::consts::{ERR_NS, FNS, XML_URI, XS};
use crate::model::XdmNode;
use crate::types::FunctionSignature;
use crate::xdm::{ExpandedName, XdmSequence};
use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub type Arity = usize;

pub struct CallCtx<'a, N> {
    pub dyn_ctx: &'a DynamicContext<N>,
    pub static_ctx: &'a StaticContext,
}

pub type FunctionImpl<N> =
    Arc<dyn Fn(&CallCtx<N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> + Send + Sync>;

/// One registered arity of a function: its declared signature and implementation.
pub struct FunctionOverload<N> {
    pub signature: Arc<FunctionSignature>,
    pub func: FunctionImpl<N>,
}

impl<N> Clone for FunctionOverload<N> {
    fn clone(&self) -> Self {
        Self {
            signature: Arc::clone(&self.signature),
            func: Arc::clone(&self.func),
        }
    }
}

/// Error type returned by function resolution.
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// No function with the (possibly default-namespace resolved) name exists.
    Unknown(ExpandedName),
    /// Function exists, but not for the requested arity. Provides known arities.
    WrongArity {
        name: ExpandedName,
        available: Vec<Arity>,
    },
}

impl From<ResolveError> for Error {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Unknown(name) => {
                Error::static_err(ErrorCode::XPST0017, format!("unknown function {name}"))
            }
            ResolveError::WrongArity { name, available } => {
                let arities = available
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Error::static_err(
                    ErrorCode::XPST0017,
                    format!("function {name} is not available with this arity (known arities: {arities})"),
                )
            }
        }
    }
}

/// Functions keyed by expanded name; each name holds one overload per arity.
pub struct FunctionRegistry<N> {
    fns: HashMap<ExpandedName, Vec<(Arity, FunctionOverload<N>)>>,
}

impl<N> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }
}

impl<N> FunctionRegistry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the overload of `name` whose arity is the signature's arity.
    pub fn register(&mut self, name: ExpandedName, signature: FunctionSignature, func: FunctionImpl<N>) {
        let arity = signature.params.len();
        let overload = FunctionOverload {
            signature: Arc::new(signature),
            func,
        };
        let entries = self.fns.entry(name).or_default();
        match entries.iter_mut().find(|(a, _)| *a == arity) {
            Some(slot) => slot.1 = overload,
            None => {
                entries.push((arity, overload));
                entries.sort_by_key(|(a, _)| *a);
            }
        }
    }

    /// Convenience: register a function in a namespace with a plain closure.
    pub fn register_ns<F>(&mut self, ns_uri: &str, local: &str, signature: FunctionSignature, f: F)
    where
        F: 'static
            + Send
            + Sync
            + Fn(&CallCtx<N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error>,
    {
        self.register(ExpandedName::ns(ns_uri, local), signature, Arc::new(f));
    }

    pub fn contains(&self, name: &ExpandedName, arity: Arity) -> bool {
        self.fns
            .get(name)
            .is_some_and(|c| c.iter().any(|(a, _)| *a == arity))
    }

    /// Resolve a function by name/arity with optional default function namespace fallback.
    /// On success returns the overload; otherwise returns a typed error describing whether
    /// the function is unknown or known with different arities.
    pub fn resolve(
        &self,
        name: &ExpandedName,
        arity: Arity,
        default_ns: Option<&str>,
    ) -> Result<&FunctionOverload<N>, ResolveError> {
        // Only allocate when the default function namespace needs to be applied.
        let effective_buf: Option<ExpandedName> = if name.ns_uri.is_none() {
            default_ns.map(|ns| ExpandedName::ns(ns, name.local.clone()))
        } else {
            None
        };
        let effective: &ExpandedName = effective_buf.as_ref().unwrap_or(name);
        // Locally registered no-namespace functions win over the default namespace.
        if let Some(cands) = self.fns.get(name)
            && let Some((_, f)) = cands.iter().find(|(a, _)| *a == arity)
        {
            return Ok(f);
        }
        if let Some(cands) = self.fns.get(effective) {
            if let Some((_, f)) = cands.iter().find(|(a, _)| *a == arity) {
                return Ok(f);
            }
            return Err(ResolveError::WrongArity {
                name: effective.clone(),
                available: cands.iter().map(|(a, _)| *a).collect(),
            });
        }
        Err(ResolveError::Unknown(effective.clone()))
    }
}

/// Error codes emitted by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FOER0000, // fn:error default
    FORG0001, // invalid lexical form / constructor failure
    FORG0006, // invalid argument type
    XPTY0004, // type error
    XPDY0050, // treat as: dynamic type does not match
    XPST0003, // syntax error
    XPST0008, // undeclared name
    XPST0017, // unknown function / wrong arity
    XPST0051, // unknown or disallowed type name
    XPST0081, // unbound namespace prefix
    // Fallback / unknown (kept last)
    Unknown,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FOER0000 => "err:FOER0000",
            ErrorCode::FORG0001 => "err:FORG0001",
            ErrorCode::FORG0006 => "err:FORG0006",
            ErrorCode::XPTY0004 => "err:XPTY0004",
            ErrorCode::XPDY0050 => "err:XPDY0050",
            ErrorCode::XPST0003 => "err:XPST0003",
            ErrorCode::XPST0008 => "err:XPST0008",
            ErrorCode::XPST0017 => "err:XPST0017",
            ErrorCode::XPST0051 => "err:XPST0051",
            ErrorCode::XPST0081 => "err:XPST0081",
            ErrorCode::Unknown => "err:UNKNOWN",
        }
    }

    /// Returns the QName of this code in the xqt-errors namespace.
    pub fn qname(&self) -> ExpandedName {
        let local = self.as_str().trim_start_matches("err:");
        ExpandedName::ns(ERR_NS, local)
    }

    pub fn from_code(s: &str) -> Self {
        use ErrorCode::*;
        match s {
            "err:FOER0000" => FOER0000,
            "err:FORG0001" => FORG0001,
            "err:FORG0006" => FORG0006,
            "err:XPTY0004" => XPTY0004,
            "err:XPDY0050" => XPDY0050,
            "err:XPST0003" => XPST0003,
            "err:XPST0008" => XPST0008,
            "err:XPST0017" => XPST0017,
            "err:XPST0051" => XPST0051,
            "err:XPST0081" => XPST0081,
            _ => Unknown,
        }
    }

    /// Static errors are raised from the query text alone, before any item is evaluated.
    pub const fn is_static(&self) -> bool {
        matches!(
            self,
            ErrorCode::XPST0003
                | ErrorCode::XPST0008
                | ErrorCode::XPST0017
                | ErrorCode::XPST0051
                | ErrorCode::XPST0081
        )
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ExpandedName,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new_qname(code: ExpandedName, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            source: None,
        }
    }

    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::new_qname(code.qname(), msg)
    }

    pub fn static_err(code: ErrorCode, msg: impl Into<String>) -> Self {
        debug_assert!(code.is_static(), "{} is not a static error code", code.as_str());
        Self::from_code(code, msg)
    }

    pub fn dynamic(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::from_code(code, msg)
    }

    pub fn code_enum(&self) -> ErrorCode {
        // Only ERR_NS codes map to the enum; others are Unknown.
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            ErrorCode::from_code(&format!("err:{}", self.code.local))
        } else {
            ErrorCode::Unknown
        }
    }

    /// Format the code as a human-readable string (err:LOCAL or Q{ns}local).
    pub fn format_code(&self) -> String {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            format!("err:{}", self.code.local)
        } else {
            self.code.to_string()
        }
    }

    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }

    /// Parse an error code string (`err:FOER0000`, `Q{ns}local` or a bare local name).
    pub fn parse_code(s: &str) -> ExpandedName {
        if let Some(rest) = s.strip_prefix("err:") {
            return ExpandedName::ns(ERR_NS, rest);
        }
        if let Some((ns, local)) = s
            .strip_prefix('Q')
            .and_then(|t| t.strip_prefix('{'))
            .and_then(|t| t.split_once('}'))
        {
            return ExpandedName::ns(ns, local);
        }
        ExpandedName::new(None, s)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.format_code())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceBindings {
    pub by_prefix: HashMap<String, String>,
}

impl NamespaceBindings {
    pub fn lookup(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct StaticContext {
    pub default_function_namespace: Option<String>,
    /// Namespace for unprefixed element and type names (`None` = no namespace).
    pub default_element_namespace: Option<String>,
    pub namespaces: NamespaceBindings,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut ns = NamespaceBindings::default();
        for (prefix, uri) in [("xml", XML_URI), ("xs", XS), ("fn", FNS), ("err", ERR_NS)] {
            ns.by_prefix.insert(prefix.to_string(), uri.to_string());
        }
        Self {
            default_function_namespace: Some(FNS.to_string()),
            default_element_namespace: None,
            namespaces: ns,
        }
    }
}

/// Builder for `StaticContext`: allows explicit namespace registrations
/// and default settings while preserving required implicit bindings.
pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    /// The resulting `StaticContext` is captured by a compiled query; supplying a different
    /// one at evaluation time has no effect.
    pub fn new() -> Self {
        Self {
            ctx: StaticContext::default(),
        }
    }

    pub fn with_default_function_namespace(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_function_namespace = Some(uri.into());
        self
    }

    pub fn with_default_element_namespace(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_element_namespace = Some(uri.into());
        self
    }

    /// Register a namespace prefix → URI mapping. Attempts to override the reserved `xml`
    /// prefix are ignored.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let p = prefix.into();
        if p == "xml" {
            return self;
        }
        self.ctx.namespaces.by_prefix.insert(p, uri.into());
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

/// How much of an operand sequence is evaluated before a verdict is returned.
///
/// Both policies are conformant; they differ only when an item that is not needed for the
/// verdict would raise a dynamic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsumptionPolicy {
    /// Pull items only until the verdict is known. Errors in unpulled items never surface.
    #[default]
    Lazy,
    /// Evaluate the whole operand first; the first error wins, then the verdict is computed.
    Eager,
}

#[derive(Clone)]
pub struct DynamicContext<N> {
    pub functions: Arc<FunctionRegistry<N>>,
    pub policy: ConsumptionPolicy,
    active_scopes: Arc<AtomicUsize>,
}

impl<N: XdmNode> Default for DynamicContext<N> {
    fn default() -> Self {
        Self {
            functions: Arc::new(crate::functions::default_function_registry::<N>()),
            policy: ConsumptionPolicy::default(),
            active_scopes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl<N> DynamicContext<N> {
    /// Acquire an evaluation scope. It is released when the guard is dropped, on every exit
    /// path of the evaluation (verdict, mismatch or propagated error).
    pub fn enter_scope(&self) -> EvaluationScope {
        let depth = self.active_scopes.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(depth, "evaluation scope acquired");
        EvaluationScope {
            active: Arc::clone(&self.active_scopes),
        }
    }

    /// Number of evaluation scopes currently held.
    pub fn active_scopes(&self) -> usize {
        self.active_scopes.load(Ordering::Acquire)
    }
}

/// Guard for one evaluation; see [`DynamicContext::enter_scope`].
#[must_use = "the scope is released as soon as the guard is dropped"]
pub struct EvaluationScope {
    active: Arc<AtomicUsize>,
}

impl Drop for EvaluationScope {
    fn drop(&mut self) {
        let remaining = self.active.fetch_sub(1, Ordering::AcqRel) - 1;
        tracing::trace!(remaining, "evaluation scope released");
    }
}

pub struct DynamicContextBuilder<N> {
    ctx: DynamicContext<N>,
}

impl<N: XdmNode> Default for DynamicContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: XdmNode> DynamicContextBuilder<N> {
    pub fn new() -> Self {
        Self {
            ctx: DynamicContext::default(),
        }
    }

    pub fn with_functions(mut self, reg: Arc<FunctionRegistry<N>>) -> Self {
        self.ctx.functions = reg;
        self
    }

    pub fn with_policy(mut self, policy: ConsumptionPolicy) -> Self {
        self.ctx.policy = policy;
        self
    }

    pub fn build(self) -> DynamicContext<N> {
        self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::SimpleNode;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorCode::FOER0000)]
    #[case(ErrorCode::XPST0051)]
    #[case(ErrorCode::XPST0081)]
    #[case(ErrorCode::XPDY0050)]
    fn code_round_trip(#[case] code: ErrorCode) {
        assert_eq!(ErrorCode::from_code(code.as_str()), code);
        assert_eq!(Error::from_code(code, "x").code_enum(), code);
    }

    #[test]
    fn foreign_codes_format_as_eqname() {
        let e = Error::new_qname(Error::parse_code("Q{urn:app}oops"), "boom");
        assert_eq!(e.code_enum(), ErrorCode::Unknown);
        assert_eq!(e.format_code(), "Q{urn:app}oops");
        assert_eq!(e.to_string(), "error: boom (Q{urn:app}oops)");
    }

    #[test]
    fn xml_prefix_cannot_be_rebound() {
        let ctx = StaticContextBuilder::new()
            .with_namespace("xml", "urn:other")
            .with_namespace("p", "urn:p")
            .build();
        assert_eq!(ctx.namespaces.lookup("xml"), Some(XML_URI));
        assert_eq!(ctx.namespaces.lookup("p"), Some("urn:p"));
        assert_eq!(ctx.namespaces.lookup("xs"), Some(XS));
    }

    #[test]
    fn scopes_are_released_on_drop() {
        let ctx: DynamicContext<SimpleNode> = DynamicContext::default();
        {
            let _outer = ctx.enter_scope();
            let _inner = ctx.enter_scope();
            assert_eq!(ctx.active_scopes(), 2);
        }
        assert_eq!(ctx.active_scopes(), 0);
    }
}
