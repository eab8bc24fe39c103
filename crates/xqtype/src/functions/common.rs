use crate::model::XdmNode;
use crate::runtime::{Error, ErrorCode};
use crate::types::AtomicTypeId;
use crate::xdm::{AtomicValue, XdmAtomicValue, XdmItem, XdmSequence};

/// Atomize an argument declared `xs:anyAtomicType?`.
pub(super) fn atomize_optional<N: XdmNode>(arg: &XdmSequence<N>) -> Result<Option<AtomicValue>, Error> {
    match arg.as_slice() {
        [] => Ok(None),
        [item] => atomize_item(item).map(Some),
        _ => Err(Error::dynamic(
            ErrorCode::XPTY0004,
            format!("expected at most one item, got {}", arg.len()),
        )),
    }
}

pub(super) fn atomize_item<N: XdmNode>(item: &XdmItem<N>) -> Result<AtomicValue, Error> {
    match item {
        XdmItem::Atomic(a) => Ok(a.clone()),
        XdmItem::Node(n) => Ok(AtomicValue::untyped(n.string_value())),
        XdmItem::Function(_) => Err(Error::dynamic(ErrorCode::XPTY0004, "function items cannot be atomized")),
    }
}

pub(super) fn is_numeric(t: AtomicTypeId) -> bool {
    let h = crate::types::TypeHierarchy::global();
    [AtomicTypeId::Decimal, AtomicTypeId::Double, AtomicTypeId::Float]
        .into_iter()
        .any(|n| h.is_subtype_of(t, n))
}

/// Effective boolean value.
pub(super) fn ebv<N: XdmNode>(seq: &XdmSequence<N>) -> Result<bool, Error> {
    let Some(first) = seq.first() else {
        return Ok(false);
    };
    if let XdmItem::Node(_) = first {
        return Ok(true);
    }
    if seq.len() > 1 {
        return Err(Error::dynamic(
            ErrorCode::FORG0006,
            "effective boolean value is not defined for a sequence of two or more atomic items",
        ));
    }
    match first {
        XdmItem::Atomic(a) => match &a.value {
            XdmAtomicValue::Boolean(b) => Ok(*b),
            XdmAtomicValue::String(s) => Ok(!s.is_empty()),
            XdmAtomicValue::Integer(i) => Ok(*i != 0),
            XdmAtomicValue::Decimal(d) | XdmAtomicValue::Double(d) => Ok(*d != 0.0 && !d.is_nan()),
            XdmAtomicValue::Float(f) => Ok(*f != 0.0 && !f.is_nan()),
            _ => Err(Error::dynamic(
                ErrorCode::FORG0006,
                format!("effective boolean value is not defined for {}", a.type_id),
            )),
        },
        _ => Err(Error::dynamic(
            ErrorCode::FORG0006,
            "effective boolean value is not defined for a function item",
        )),
    }
}

pub(super) fn single<N>(v: AtomicValue) -> XdmSequence<N> {
    vec![XdmItem::Atomic(v)]
}
