use super::common::{ebv, single};
use crate::model::XdmNode;
use crate::runtime::{CallCtx, Error};
use crate::xdm::{AtomicValue, XdmSequence};

pub(super) fn fn_true<N: XdmNode>(_ctx: &CallCtx<N>, _args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    Ok(single(AtomicValue::boolean(true)))
}

pub(super) fn fn_false<N: XdmNode>(_ctx: &CallCtx<N>, _args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    Ok(single(AtomicValue::boolean(false)))
}

pub(super) fn fn_not<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let b = ebv(&args[0])?;
    Ok(single(AtomicValue::boolean(!b)))
}
