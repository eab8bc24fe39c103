//! Syntax tree produced by the parser. Names are kept lexical; the resolver binds them.

use crate::types::Occurrence;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i128),
    Decimal(f64),
    Double(f64),
    String(String),
}

/// A name as written: `prefix:local`, `local` or `Q{uri}local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    /// Set only for braced URI literals, which need no prefix resolution.
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: None }
    }

    pub fn prefixed(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()), local: local.into(), ns_uri: None }
    }
}

impl core::fmt::Display for QName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match (&self.ns_uri, &self.prefix) {
            (Some(ns), _) => write!(f, "Q{{{ns}}}{}", self.local),
            (None, Some(p)) => write!(f, "{p}:{}", self.local),
            (None, None) => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameOrWildcard {
    Name(QName),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    AnyKind,
    Document,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
    Element(Option<NameOrWildcard>),
    Attribute(Option<NameOrWildcard>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemType {
    Item,
    Kind(KindTest),
    Atomic(QName),
    AnyFunction,
    TypedFunction { params: Vec<SequenceType>, result: Box<SequenceType> },
    /// `name()` where `name` is not a kind test keyword.
    UnknownKindTest(QName),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceType {
    EmptySequence,
    Typed { item: ItemType, occ: Occurrence },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: QName,
    pub ty: Option<SequenceType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// `()` and `(a, b, ...)`, also the top-level comma operator.
    Sequence(Vec<Expr>),
    Negate(Box<Expr>),
    VarRef(QName),
    FunctionCall { name: QName, args: Vec<Expr> },
    NamedFunctionRef { name: QName, arity: usize },
    InlineFunction { params: Vec<Param>, ret: Option<SequenceType>, body: Box<Expr> },
    DirectElement { name: QName },
    ComputedElement { name: QName, content: Box<Expr> },
    ComputedAttribute { name: QName, content: Box<Expr> },
    ComputedText(Box<Expr>),
    ComputedComment(Box<Expr>),
    ComputedPi { target: String, content: Box<Expr> },
    ComputedDocument(Box<Expr>),
    InstanceOf { expr: Box<Expr>, ty: SequenceType },
    TreatAs { expr: Box<Expr>, ty: SequenceType },
}

impl Expr {
    pub fn empty() -> Self {
        Expr::Sequence(Vec::new())
    }
}
