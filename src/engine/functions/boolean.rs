//! `fn:true`, `fn:false`, `fn:not`, `fn:boolean`.

use crate::engine::runtime::{CallCtx, Error};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence, effective_boolean_value};

fn wrap<N: crate::model::XdmNode>(b: bool) -> XdmSequence<N> {
    vec![XdmItem::Atomic(XdmAtomicValue::Boolean(b))]
}

pub(super) fn true_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(true))
}

pub(super) fn false_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(false))
}

pub(super) fn not_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(!effective_boolean_value(&args[0])?))
}

pub(super) fn boolean_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(effective_boolean_value(&args[0])?))
}
