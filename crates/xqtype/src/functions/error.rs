use super::common::atomize_optional;
use crate::model::XdmNode;
use crate::runtime::{CallCtx, Error, ErrorCode};
use crate::xdm::{ExpandedName, XdmAtomicValue, XdmSequence};

/// `fn:error#0..2`. Never returns a value.
pub(super) fn error_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let description = match args.get(1) {
        Some(desc) => atomize_optional(desc)?.map(|d| d.to_string()),
        None => None,
    };
    let code = match args.first() {
        Some(code) => atomize_optional(code)?,
        None => None,
    };
    let Some(code) = code else {
        let msg = description.unwrap_or_else(|| "fn:error() called".to_string());
        return Err(Error::dynamic(ErrorCode::FOER0000, msg));
    };
    let XdmAtomicValue::QName { ns_uri, local, .. } = code.value else {
        return Err(Error::dynamic(
            ErrorCode::XPTY0004,
            format!("fn:error expects an xs:QName error code, got {}", code.type_id),
        ));
    };
    let msg = description.unwrap_or_else(|| format!("fn:error({local}) called"));
    Err(Error::new_qname(ExpandedName::new(ns_uri, local), msg))
}
