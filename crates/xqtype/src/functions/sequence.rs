use super::common::single;
use crate::model::XdmNode;
use crate::runtime::{CallCtx, Error};
use crate::xdm::{AtomicValue, XdmSequence};

pub(super) fn exists_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    Ok(single(AtomicValue::boolean(!args[0].is_empty())))
}

pub(super) fn empty_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    Ok(single(AtomicValue::boolean(args[0].is_empty())))
}

pub(super) fn count_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let n = i128::try_from(args[0].len()).unwrap_or(i128::MAX);
    Ok(single(AtomicValue::integer(n)))
}
