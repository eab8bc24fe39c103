//! Query front end: `Expr instance of SequenceType` and `Expr treat as SequenceType` over a
//! small operand language.
//!
//! Compilation is the static phase: the query is parsed, every annotation is resolved and
//! every function name is looked up, so static errors surface before any operand is touched.
//! Evaluation is the dynamic phase and produces items lazily; an operand of a comma sequence
//! is evaluated only when the consumer pulls past the items before it.

use std::sync::Arc;

use crate::evaluator::SequenceTypeEvaluator;
use crate::model::{NodeFactory, QName, XdmNode};
use crate::parser::{XQueryParser, ast};
use crate::resolver::{self, TypeNameResolver};
use crate::runtime::{CallCtx, DynamicContext, Error, ErrorCode, FunctionRegistry, StaticContext};
use crate::types::{FunctionSignature, SequenceType, TypeHierarchy};
use crate::xdm::{AtomicValue, ExpandedName, FunctionItem, XdmAtomicValue, XdmItem, XdmSequence, XdmStream};

#[derive(Debug, Clone)]
enum Op {
    Literal(AtomicValue),
    Sequence(Vec<Op>),
    Negate(Box<Op>),
    Call { name: ExpandedName, args: Vec<Op> },
    Function(Arc<FunctionItem>),
    Document(Box<Op>),
    Element { name: QName, content: Box<Op> },
    Attribute { name: QName, content: Box<Op> },
    Text(Box<Op>),
    Comment(Box<Op>),
    ProcessingInstruction { target: String, content: Box<Op> },
    InstanceOf { operand: Box<Op>, ty: SequenceType },
    TreatAs { operand: Box<Op>, ty: SequenceType },
}

/// A query whose static phase has completed.
///
/// The static context is captured at compile time; evaluation only needs a dynamic context.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    source: String,
    static_ctx: Arc<StaticContext>,
    root: Op,
}

/// Parse and statically check `query`. Function names are checked against `functions`.
pub fn compile_query<N>(
    query: &str,
    static_ctx: &StaticContext,
    functions: &FunctionRegistry<N>,
) -> Result<CompiledQuery, Error> {
    let ast = XQueryParser::parse_to_ast(query)?;
    let compiler = Compiler {
        ctx: static_ctx,
        types: TypeNameResolver::for_context(static_ctx),
        functions,
    };
    let root = compiler.lower(&ast, &[])?;
    tracing::debug!(query, "query compiled");
    Ok(CompiledQuery {
        source: query.to_string(),
        static_ctx: Arc::new(static_ctx.clone()),
        root,
    })
}

/// Compile against the context's function registry and evaluate.
pub fn evaluate_query<N: NodeFactory>(
    query: &str,
    static_ctx: &StaticContext,
    dyn_ctx: &DynamicContext<N>,
) -> Result<XdmSequence<N>, Error> {
    compile_query(query, static_ctx, &dyn_ctx.functions)?.evaluate(dyn_ctx)
}

struct Compiler<'a, N> {
    ctx: &'a StaticContext,
    types: TypeNameResolver,
    functions: &'a FunctionRegistry<N>,
}

impl<N> Compiler<'_, N> {
    fn sequence_type(&self, ty: &ast::SequenceType) -> Result<SequenceType, Error> {
        Ok(self.types.resolve_sequence_type(ty, &self.ctx.namespaces)?)
    }

    fn function_name(&self, q: &ast::QName) -> Result<ExpandedName, Error> {
        // unprefixed function names fall back to the default function namespace on lookup
        Ok(resolver::expand(q, &self.ctx.namespaces, None)?)
    }

    fn node_name(&self, q: &ast::QName, default: Option<&str>) -> Result<QName, Error> {
        let expanded = resolver::expand(q, &self.ctx.namespaces, default)?;
        Ok(QName {
            prefix: q.prefix.clone(),
            local: expanded.local,
            ns_uri: expanded.ns_uri,
        })
    }

    fn boxed(&self, e: &ast::Expr, scope: &[ExpandedName]) -> Result<Box<Op>, Error> {
        self.lower(e, scope).map(Box::new)
    }

    /// `scope` holds the parameters visible in an inline function body.
    fn lower(&self, e: &ast::Expr, scope: &[ExpandedName]) -> Result<Op, Error> {
        Ok(match e {
            ast::Expr::Literal(l) => Op::Literal(match l {
                ast::Literal::Integer(i) => AtomicValue::integer(*i),
                ast::Literal::Decimal(d) => AtomicValue::decimal(*d),
                ast::Literal::Double(d) => AtomicValue::double(*d),
                ast::Literal::String(s) => AtomicValue::string(s.clone()),
            }),
            ast::Expr::Sequence(items) => {
                Op::Sequence(items.iter().map(|i| self.lower(i, scope)).collect::<Result<_, _>>()?)
            }
            ast::Expr::Negate(inner) => Op::Negate(self.boxed(inner, scope)?),
            ast::Expr::VarRef(q) => {
                let name = resolver::expand(q, &self.ctx.namespaces, None)?;
                if !scope.contains(&name) {
                    return Err(Error::static_err(ErrorCode::XPST0008, format!("variable ${q} is not declared")));
                }
                // only inline function bodies can see parameters, and those are never evaluated
                Op::Sequence(Vec::new())
            }
            ast::Expr::FunctionCall { name, args } => {
                let name = self.function_name(name)?;
                self.functions
                    .resolve(&name, args.len(), self.ctx.default_function_namespace.as_deref())?;
                let args = args.iter().map(|a| self.lower(a, scope)).collect::<Result<_, _>>()?;
                Op::Call { name, args }
            }
            ast::Expr::NamedFunctionRef { name, arity } => {
                let name = self.function_name(name)?;
                let default_ns = self.ctx.default_function_namespace.as_deref();
                let overload = self.functions.resolve(&name, *arity, default_ns)?;
                let name = if name.ns_uri.is_none()
                    && !self.functions.contains(&name, *arity)
                    && let Some(ns) = default_ns
                {
                    ExpandedName::ns(ns, name.local)
                } else {
                    name
                };
                Op::Function(Arc::new(FunctionItem {
                    name: Some(name),
                    signature: Arc::clone(&overload.signature),
                }))
            }
            ast::Expr::InlineFunction { params, ret, body } => {
                let mut inner_scope = scope.to_vec();
                let mut param_types = Vec::with_capacity(params.len());
                for p in params {
                    let name = resolver::expand(&p.name, &self.ctx.namespaces, None)?;
                    if inner_scope[scope.len()..].contains(&name) {
                        return Err(Error::static_err(
                            ErrorCode::XPST0003,
                            format!("duplicate parameter ${}", p.name),
                        ));
                    }
                    inner_scope.push(name);
                    param_types.push(match &p.ty {
                        Some(t) => self.sequence_type(t)?,
                        None => SequenceType::any(),
                    });
                }
                let result = match ret {
                    Some(t) => self.sequence_type(t)?,
                    None => SequenceType::any(),
                };
                // the body is checked for static errors only
                self.lower(body, &inner_scope)?;
                Op::Function(Arc::new(FunctionItem {
                    name: None,
                    signature: Arc::new(FunctionSignature::new(param_types, result)),
                }))
            }
            ast::Expr::DirectElement { name } => Op::Element {
                name: self.node_name(name, self.ctx.default_element_namespace.as_deref())?,
                content: Box::new(Op::Sequence(Vec::new())),
            },
            ast::Expr::ComputedElement { name, content } => Op::Element {
                name: self.node_name(name, self.ctx.default_element_namespace.as_deref())?,
                content: self.boxed(content, scope)?,
            },
            ast::Expr::ComputedAttribute { name, content } => Op::Attribute {
                name: self.node_name(name, None)?,
                content: self.boxed(content, scope)?,
            },
            ast::Expr::ComputedText(content) => Op::Text(self.boxed(content, scope)?),
            ast::Expr::ComputedComment(content) => Op::Comment(self.boxed(content, scope)?),
            ast::Expr::ComputedPi { target, content } => Op::ProcessingInstruction {
                target: target.clone(),
                content: self.boxed(content, scope)?,
            },
            ast::Expr::ComputedDocument(content) => Op::Document(self.boxed(content, scope)?),
            ast::Expr::InstanceOf { expr, ty } => Op::InstanceOf {
                operand: self.boxed(expr, scope)?,
                ty: self.sequence_type(ty)?,
            },
            ast::Expr::TreatAs { expr, ty } => Op::TreatAs {
                operand: self.boxed(expr, scope)?,
                ty: self.sequence_type(ty)?,
            },
        })
    }
}

/// Defer `f` until the first item is pulled.
fn deferred<'a, N: 'a>(f: impl FnOnce() -> Result<XdmSequence<N>, Error> + 'a) -> XdmStream<'a, N> {
    Box::new(std::iter::once_with(f).flat_map(|r| match r {
        Ok(items) => items.into_iter().map(Ok).collect::<Vec<_>>(),
        Err(e) => vec![Err(e)],
    }))
}

fn atomized_string<N: XdmNode>(items: &XdmSequence<N>) -> Result<String, Error> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            XdmItem::Atomic(a) => parts.push(a.to_string()),
            XdmItem::Node(n) => parts.push(n.string_value()),
            XdmItem::Function(_) => {
                return Err(Error::dynamic(ErrorCode::XPTY0004, "function items cannot be atomized"));
            }
        }
    }
    Ok(parts.join(" "))
}

impl CompiledQuery {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn static_context(&self) -> &StaticContext {
        &self.static_ctx
    }

    /// Evaluate to a fully materialized sequence.
    pub fn evaluate<N: NodeFactory>(&self, ctx: &DynamicContext<N>) -> Result<XdmSequence<N>, Error> {
        let _scope = ctx.enter_scope();
        let items = self.stream(ctx).collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(query = %self.source, items = items.len(), "query evaluated");
        Ok(items)
    }

    /// Lazily evaluate the query.
    pub fn stream<'a, N: NodeFactory>(&'a self, ctx: &'a DynamicContext<N>) -> XdmStream<'a, N> {
        self.eval(&self.root, ctx)
    }

    fn eval<'a, N: NodeFactory>(&'a self, op: &'a Op, ctx: &'a DynamicContext<N>) -> XdmStream<'a, N> {
        match op {
            Op::Literal(v) => Box::new(std::iter::once(Ok(XdmItem::Atomic(v.clone())))),
            Op::Function(f) => Box::new(std::iter::once(Ok(XdmItem::Function(Arc::clone(f))))),
            Op::Sequence(ops) => Box::new(ops.iter().flat_map(move |o| self.eval(o, ctx))),
            Op::Negate(inner) => deferred(move || self.negate(inner, ctx)),
            Op::Call { name, args } => deferred(move || self.call(name, args, ctx)),
            Op::InstanceOf { operand, ty } => deferred(move || {
                let verdict = SequenceTypeEvaluator::new(ctx).instance_of(self.eval(operand, ctx), ty)?;
                Ok(vec![XdmItem::Atomic(AtomicValue::boolean(verdict))])
            }),
            Op::TreatAs { operand, ty } => {
                deferred(move || SequenceTypeEvaluator::new(ctx).treat_as(self.eval(operand, ctx), ty))
            }
            Op::Document(content) => deferred(move || {
                let children = self.content_nodes(content, ctx)?.1;
                Ok(vec![XdmItem::Node(N::document(children))])
            }),
            Op::Element { name, content } => deferred(move || {
                let (attributes, children) = self.content_nodes(content, ctx)?;
                Ok(vec![XdmItem::Node(N::element(name.clone(), attributes, children))])
            }),
            Op::Attribute { name, content } => deferred(move || {
                let value = atomized_string(&self.materialize(content, ctx)?)?;
                Ok(vec![XdmItem::Node(N::attribute(name.clone(), value))])
            }),
            Op::Text(content) => deferred(move || {
                let items = self.materialize(content, ctx)?;
                if items.is_empty() {
                    return Ok(vec![]);
                }
                Ok(vec![XdmItem::Node(N::text(atomized_string(&items)?))])
            }),
            Op::Comment(content) => deferred(move || {
                let value = atomized_string(&self.materialize(content, ctx)?)?;
                Ok(vec![XdmItem::Node(N::comment(value))])
            }),
            Op::ProcessingInstruction { target, content } => deferred(move || {
                let value = atomized_string(&self.materialize(content, ctx)?)?;
                Ok(vec![XdmItem::Node(N::processing_instruction(target.clone(), value.trim_start().to_string()))])
            }),
        }
    }

    fn materialize<N: NodeFactory>(&self, op: &Op, ctx: &DynamicContext<N>) -> Result<XdmSequence<N>, Error> {
        self.eval(op, ctx).collect()
    }

    fn call<N: NodeFactory>(
        &self,
        name: &ExpandedName,
        args: &[Op],
        ctx: &DynamicContext<N>,
    ) -> Result<XdmSequence<N>, Error> {
        let overload = ctx
            .functions
            .resolve(name, args.len(), self.static_ctx.default_function_namespace.as_deref())?;
        let values = args.iter().map(|a| self.materialize(a, ctx)).collect::<Result<Vec<_>, _>>()?;
        let call_ctx = CallCtx {
            dyn_ctx: ctx,
            static_ctx: &self.static_ctx,
        };
        (overload.func)(&call_ctx, &values)
    }

    fn negate<N: NodeFactory>(&self, inner: &Op, ctx: &DynamicContext<N>) -> Result<XdmSequence<N>, Error> {
        let items = self.materialize(inner, ctx)?;
        let value = match items.as_slice() {
            [] => return Ok(vec![]),
            [XdmItem::Atomic(a)] => a,
            _ => {
                return Err(Error::dynamic(ErrorCode::XPTY0004, "unary minus expects a single numeric value"));
            }
        };
        let negated = match value.value {
            XdmAtomicValue::Integer(i) => XdmAtomicValue::Integer(
                i.checked_neg()
                    .ok_or_else(|| Error::dynamic(ErrorCode::FORG0001, "integer overflow in unary minus"))?,
            ),
            XdmAtomicValue::Decimal(d) => XdmAtomicValue::Decimal(-d),
            XdmAtomicValue::Double(d) => XdmAtomicValue::Double(-d),
            XdmAtomicValue::Float(f) => XdmAtomicValue::Float(-f),
            _ => {
                return Err(Error::dynamic(
                    ErrorCode::XPTY0004,
                    format!("unary minus is not defined for {}", value.type_id),
                ));
            }
        };
        let type_id = TypeHierarchy::global().numeric_result_of(value.type_id);
        Ok(vec![XdmItem::Atomic(AtomicValue::new(type_id, negated))])
    }

    /// Split constructor content into attribute nodes and children. Runs of atomic values
    /// become one text node, separated by single spaces.
    fn content_nodes<N: NodeFactory>(&self, content: &Op, ctx: &DynamicContext<N>) -> Result<(Vec<N>, Vec<N>), Error> {
        let mut attributes = Vec::new();
        let mut children = Vec::new();
        let mut pending_text: Option<String> = None;
        for item in self.eval(content, ctx) {
            match item? {
                XdmItem::Atomic(a) => {
                    let text = pending_text.get_or_insert_with(String::new);
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&a.to_string());
                }
                XdmItem::Node(n) => {
                    if let Some(text) = pending_text.take() {
                        children.push(N::text(text));
                    }
                    if n.kind() == crate::model::NodeKind::Attribute {
                        attributes.push(n);
                    } else {
                        children.push(n);
                    }
                }
                XdmItem::Function(_) => {
                    return Err(Error::dynamic(ErrorCode::XPTY0004, "function items cannot be node content"));
                }
            }
        }
        if let Some(text) = pending_text {
            children.push(N::text(text));
        }
        Ok((attributes, children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ConsumptionPolicy, DynamicContextBuilder, StaticContextBuilder};
    use crate::simple_node::SimpleNode;
    use rstest::rstest;

    fn run(query: &str) -> Result<XdmSequence<SimpleNode>, Error> {
        let ctx: DynamicContext<SimpleNode> = DynamicContext::default();
        evaluate_query(query, &StaticContext::default(), &ctx)
    }

    fn verdict(query: &str) -> bool {
        match run(query).unwrap().as_slice() {
            [XdmItem::Atomic(AtomicValue { value: XdmAtomicValue::Boolean(b), .. })] => *b,
            other => panic!("expected a single boolean, got {other:?}"),
        }
    }

    #[rstest]
    #[case("1 instance of xs:integer", true)]
    #[case("1.1 instance of xs:integer", false)]
    #[case("1e0 instance of xs:double", true)]
    #[case("() instance of empty-sequence()", true)]
    #[case("(1, 2) instance of xs:integer+", true)]
    #[case("<e/> instance of element(e)", true)]
    #[case("attribute e {'x'} instance of element()", false)]
    #[case("-1 instance of xs:integer", true)]
    #[case("xs:short(3) instance of xs:int", true)]
    #[case("fn:true#0 instance of function() as xs:boolean", true)]
    #[case("(1 treat as xs:integer) instance of xs:decimal", true)]
    fn verdicts(#[case] query: &str, #[case] expected: bool) {
        assert_eq!(verdict(query), expected, "{query}");
    }

    #[rstest]
    #[case("1 instance of xs:nope", ErrorCode::XPST0051)]
    #[case("1 instance of p:integer", ErrorCode::XPST0081)]
    #[case("nosuch(1) instance of xs:integer", ErrorCode::XPST0017)]
    #[case("fn:true#3", ErrorCode::XPST0017)]
    #[case("$x instance of xs:integer", ErrorCode::XPST0008)]
    #[case("1 instance of", ErrorCode::XPST0003)]
    fn static_errors(#[case] query: &str, #[case] code: ErrorCode) {
        let reg = crate::functions::default_function_registry::<SimpleNode>();
        let err = compile_query(query, &StaticContext::default(), &reg).unwrap_err();
        assert_eq!(err.code_enum(), code, "{query}");
    }

    #[test]
    fn static_errors_do_not_wait_for_dead_operands() {
        // the bad type name is reported even though error() would fail first at run time
        let reg = crate::functions::default_function_registry::<SimpleNode>();
        let err = compile_query("error() instance of xs:nope", &StaticContext::default(), &reg).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPST0051);
    }

    #[test]
    fn comma_operands_are_evaluated_on_demand() {
        let ctx: DynamicContext<SimpleNode> = DynamicContextBuilder::new().with_policy(ConsumptionPolicy::Lazy).build();
        let q = compile_query("(1, error())", &StaticContext::default(), &ctx.functions).unwrap();
        let mut stream = q.stream(&ctx);
        assert!(stream.next().is_some_and(|r| r.is_ok()));
        assert!(stream.next().is_some_and(|r| r.is_err()));
    }

    #[test]
    fn constructors_build_nodes() {
        let out = run("element e { attribute a {1}, 'x', 2, text {'y'} }").unwrap();
        let [XdmItem::Node(e)] = out.as_slice() else { panic!("expected one node") };
        assert_eq!(e.attributes().len(), 1);
        assert_eq!(e.string_value(), "x 2y");
    }

    #[test]
    fn compiled_query_keeps_its_static_context() {
        let sc = StaticContextBuilder::new().with_namespace("p", "urn:p").build();
        let ctx: DynamicContext<SimpleNode> = DynamicContext::default();
        let q = compile_query("element p:e {} instance of element(p:e)", &sc, &ctx.functions).unwrap();
        assert_eq!(q.source(), "element p:e {} instance of element(p:e)");
        assert!(q.static_context().namespaces.lookup("p").is_some());
        assert_eq!(q.evaluate(&ctx).unwrap(), vec![XdmItem::Atomic(AtomicValue::boolean(true))]);
    }
}
