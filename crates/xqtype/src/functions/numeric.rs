use super::common::{atomize_optional, is_numeric};
use crate::model::XdmNode;
use crate::runtime::{CallCtx, Error, ErrorCode};
use crate::types::TypeHierarchy;
use crate::xdm::{AtomicValue, XdmAtomicValue, XdmItem, XdmSequence};

/// `fn:abs`: integer subtypes widen to `xs:integer`, other numeric types are kept.
pub(super) fn abs_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let Some(a) = atomize_optional(&args[0])? else {
        return Ok(vec![]);
    };
    if !is_numeric(a.type_id) {
        return Err(Error::dynamic(
            ErrorCode::XPTY0004,
            format!("fn:abs expects a numeric argument, got {}", a.type_id),
        ));
    }
    let value = match a.value {
        XdmAtomicValue::Integer(i) => XdmAtomicValue::Integer(
            i.checked_abs()
                .ok_or_else(|| Error::dynamic(ErrorCode::FORG0001, "integer overflow in fn:abs"))?,
        ),
        XdmAtomicValue::Decimal(d) => XdmAtomicValue::Decimal(d.abs()),
        XdmAtomicValue::Double(d) => XdmAtomicValue::Double(d.abs()),
        XdmAtomicValue::Float(f) => XdmAtomicValue::Float(f.abs()),
        other => {
            return Err(Error::dynamic(
                ErrorCode::XPTY0004,
                format!("fn:abs cannot handle payload {other:?}"),
            ));
        }
    };
    let type_id = TypeHierarchy::global().numeric_result_of(a.type_id);
    Ok(vec![XdmItem::Atomic(AtomicValue::new(type_id, value))])
}
