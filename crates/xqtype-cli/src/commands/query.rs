use crate::util::{CliResult, map_query_error, parse_namespace_bindings};
use crate::{OutputFormat, PolicyArg};
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use std::fmt::Write;
use xqtype::{
    DynamicContext, DynamicContextBuilder, FunctionItem, NodeKind, SimpleNode, StaticContext, StaticContextBuilder,
    XdmItem, XdmNode, evaluate_query,
};

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(value_name = "QUERY")]
    pub query: String,
    /// Additional namespace binding, `PREFIX=URI`. May be repeated.
    #[arg(long = "namespace", value_name = "PREFIX=URI")]
    pub namespaces: Vec<String>,
    #[arg(long = "default-element-namespace", value_name = "URI")]
    pub default_element_namespace: Option<String>,
    #[arg(long = "policy", value_enum, default_value_t = PolicyArg::Lazy)]
    pub policy: PolicyArg,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ItemSummary {
    Atomic { type_name: String, value: String },
    Node { kind: String, name: Option<String>, string_value: String },
    Function { name: Option<String>, arity: usize, signature: String },
}

pub fn run(args: &QueryArgs) -> CliResult<String> {
    let static_ctx = static_context(args)?;
    let dyn_ctx: DynamicContext<SimpleNode> = DynamicContextBuilder::new().with_policy(args.policy.into()).build();
    tracing::debug!(query = %args.query, policy = ?args.policy, "evaluating");

    let items = evaluate_query(&args.query, &static_ctx, &dyn_ctx).map_err(map_query_error)?;
    let summaries: Vec<ItemSummary> = items.iter().map(summarize).collect();

    let output = match args.format {
        OutputFormat::Text => render_text(&summaries),
        OutputFormat::Json => render_json(&summaries)?,
    };
    Ok(output)
}

fn static_context(args: &QueryArgs) -> CliResult<StaticContext> {
    let mut builder = StaticContextBuilder::new();
    for (prefix, uri) in parse_namespace_bindings(&args.namespaces)? {
        builder = builder.with_namespace(prefix, uri);
    }
    if let Some(uri) = &args.default_element_namespace {
        builder = builder.with_default_element_namespace(uri.clone());
    }
    Ok(builder.build())
}

pub(crate) fn summarize(item: &XdmItem<SimpleNode>) -> ItemSummary {
    match item {
        XdmItem::Atomic(a) => ItemSummary::Atomic { type_name: a.type_id.to_string(), value: a.to_string() },
        XdmItem::Node(n) => ItemSummary::Node {
            kind: kind_name(n.kind()).to_owned(),
            name: n.name().map(|q| match q.prefix {
                Some(p) => format!("{p}:{}", q.local),
                None => q.local,
            }),
            string_value: n.string_value(),
        },
        XdmItem::Function(f) => ItemSummary::Function {
            name: f.name.as_ref().map(ToString::to_string),
            arity: f.arity(),
            signature: signature_text(f),
        },
    }
}

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Document => "document-node",
        NodeKind::Element => "element",
        NodeKind::Attribute => "attribute",
        NodeKind::Text => "text",
        NodeKind::Comment => "comment",
        NodeKind::ProcessingInstruction => "processing-instruction",
        NodeKind::Namespace => "namespace-node",
    }
}

fn signature_text(f: &FunctionItem) -> String {
    let params = f.signature.params.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
    format!("function({params}) as {}", f.signature.result)
}

pub(crate) fn render_text(items: &[ItemSummary]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            ItemSummary::Atomic { type_name, value } => {
                let _ = writeln!(out, "{} {}", colorize_value(value), colorize_type(type_name));
            }
            ItemSummary::Node { kind, name, string_value } => {
                let label = match name {
                    Some(name) => format!("{kind}({name})"),
                    None => format!("{kind}()"),
                };
                if string_value.is_empty() {
                    let _ = writeln!(out, "{}", colorize_type(&label));
                } else {
                    let _ = writeln!(out, "{} {}", colorize_type(&label), colorize_value(&format!("{string_value:?}")));
                }
            }
            ItemSummary::Function { name, arity, signature } => {
                let name = name.clone().unwrap_or_else(|| "(anonymous)".to_owned());
                let _ = writeln!(out, "{}#{arity} {}", colorize_value(&name), colorize_type(signature));
            }
        }
    }
    if out.is_empty() {
        out.push_str("()");
    }
    out.trim_end().to_owned()
}

pub(crate) fn render_json(items: &[ItemSummary]) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(items)?)
}

fn colorize_value(value: &str) -> String {
    value
        .if_supports_color(Stream::Stdout, |text| text.fg_rgb::<136, 192, 74>().to_string())
        .to_string()
}

fn colorize_type(label: &str) -> String {
    label
        .if_supports_color(Stream::Stdout, |text| text.bold().fg_rgb::<79, 166, 255>().to_string())
        .to_string()
}
