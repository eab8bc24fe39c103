use crate::runtime::Error;
use crate::types::{AtomicTypeId, FunctionSignature};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use core::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self {
            ns_uri,
            local: local.into(),
        }
    }

    pub fn ns(ns_uri: &str, local: impl Into<String>) -> Self {
        Self::new(Some(ns_uri.to_string()), local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Typed payload of an atomic value.
///
/// The payload says how the value is stored; the dynamic type lives next to it in
/// [`AtomicValue::type_id`]. All integer-derived types share `Integer`, all string-derived
/// types (and `xs:anyURI`, `xs:untypedAtomic`) share `String`.
#[derive(Debug, Clone, PartialEq)]
pub enum XdmAtomicValue {
    Boolean(bool),
    Integer(i128),
    Decimal(f64),
    Double(f64),
    Float(f32),
    String(String),
    QName {
        ns_uri: Option<String>,
        prefix: Option<String>,
        local: String,
    },
    DateTime(DateTime<FixedOffset>),
    Date {
        date: NaiveDate,
        tz: Option<FixedOffset>,
    },
    Time {
        time: NaiveTime,
        tz: Option<FixedOffset>,
    },
    // months and milliseconds carry the same sign
    Duration {
        months: i32,
        millis: i64,
    },
    // g* fragments, binary types and NOTATION keep their lexical form
    Lexical(String),
}

/// An atomic item: a payload annotated with its dynamic type.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicValue {
    pub type_id: AtomicTypeId,
    pub value: XdmAtomicValue,
}

impl AtomicValue {
    pub fn new(type_id: AtomicTypeId, value: XdmAtomicValue) -> Self {
        Self { type_id, value }
    }
    pub fn boolean(b: bool) -> Self {
        Self::new(AtomicTypeId::Boolean, XdmAtomicValue::Boolean(b))
    }
    pub fn integer(i: i128) -> Self {
        Self::new(AtomicTypeId::Integer, XdmAtomicValue::Integer(i))
    }
    pub fn decimal(d: f64) -> Self {
        Self::new(AtomicTypeId::Decimal, XdmAtomicValue::Decimal(d))
    }
    pub fn double(d: f64) -> Self {
        Self::new(AtomicTypeId::Double, XdmAtomicValue::Double(d))
    }
    pub fn string(s: impl Into<String>) -> Self {
        Self::new(AtomicTypeId::String, XdmAtomicValue::String(s.into()))
    }
    pub fn untyped(s: impl Into<String>) -> Self {
        Self::new(AtomicTypeId::UntypedAtomic, XdmAtomicValue::String(s.into()))
    }
}

impl fmt::Display for AtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            XdmAtomicValue::Boolean(b) => write!(f, "{b}"),
            XdmAtomicValue::Integer(i) => write!(f, "{i}"),
            XdmAtomicValue::Decimal(d) | XdmAtomicValue::Double(d) => write!(f, "{d}"),
            XdmAtomicValue::Float(x) => write!(f, "{x}"),
            XdmAtomicValue::String(s) | XdmAtomicValue::Lexical(s) => f.write_str(s),
            XdmAtomicValue::QName { prefix: Some(p), local, .. } => write!(f, "{p}:{local}"),
            XdmAtomicValue::QName { local, .. } => f.write_str(local),
            XdmAtomicValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            XdmAtomicValue::Date { date, .. } => write!(f, "{date}"),
            XdmAtomicValue::Time { time, .. } => write!(f, "{time}"),
            XdmAtomicValue::Duration { months, millis } => {
                write!(f, "duration({months} months, {millis} ms)")
            }
        }
    }
}

/// A function item. Arity is derived from the declared signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionItem {
    pub name: Option<ExpandedName>,
    pub signature: Arc<FunctionSignature>,
}

impl FunctionItem {
    pub fn arity(&self) -> usize {
        self.signature.params.len()
    }
}

pub type XdmSequence<N> = Vec<XdmItem<N>>;

/// Lazily produced operand sequence. Pulling an item may evaluate an upstream expression and
/// fail; items are observed strictly in sequence order.
pub type XdmStream<'a, N> = Box<dyn Iterator<Item = Result<XdmItem<N>, Error>> + 'a>;

#[derive(Debug, Clone, PartialEq)]
pub enum XdmItem<N> {
    Node(N),
    Atomic(AtomicValue),
    Function(Arc<FunctionItem>),
}

impl<N> From<AtomicValue> for XdmItem<N> {
    fn from(a: AtomicValue) -> Self {
        XdmItem::Atomic(a)
    }
}

impl<N> fmt::Display for XdmItem<N>
where
    N: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdmItem::Node(_) => write!(f, "<node>"),
            XdmItem::Atomic(a) => write!(f, "{a}"),
            XdmItem::Function(func) => match &func.name {
                Some(name) => write!(f, "{}#{}", name, func.arity()),
                None => write!(f, "(anonymous function)#{}", func.arity()),
            },
        }
    }
}
