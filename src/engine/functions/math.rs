//! The `math:` namespace (XPath 3.0+). All functions work on xs:double.

use crate::engine::runtime::{CallCtx, Error};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

use super::opt_atom;

fn wrap<N: crate::model::XdmNode>(d: f64) -> XdmSequence<N> {
    vec![XdmItem::Atomic(XdmAtomicValue::Double(d))]
}

fn double_arg<N: XdmNode>(seq: &XdmSequence<N>) -> Result<Option<f64>, Error> {
    Ok(opt_atom(seq)?.map(|a| a.double_value().unwrap_or(f64::NAN)))
}

pub(super) fn pi_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(std::f64::consts::PI))
}

pub(super) fn unary_impl<N: XdmNode>(
    name: &'static str,
) -> impl Fn(&CallCtx<'_, N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> + Send + Sync {
    move |_ctx, args| {
        let Some(x) = double_arg(&args[0])? else {
            return Ok(Vec::new());
        };
        let r = match name {
            "exp" => x.exp(),
            "exp10" => 10f64.powf(x),
            "log" => x.ln(),
            "log10" => x.log10(),
            "sqrt" => x.sqrt(),
            "sin" => x.sin(),
            "cos" => x.cos(),
            "tan" => x.tan(),
            "asin" => x.asin(),
            "acos" => x.acos(),
            _ => x.atan(),
        };
        Ok(wrap(r))
    }
}

pub(super) fn pow_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(x) = double_arg(&args[0])? else {
        return Ok(Vec::new());
    };
    let y = double_arg(&args[1])?.unwrap_or(f64::NAN);
    // 1.0 raised to anything, including NaN, is 1.0 per F&O.
    if x == 1.0 {
        return Ok(wrap(1.0));
    }
    Ok(wrap(x.powf(y)))
}

pub(super) fn atan2_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let y = double_arg(&args[0])?.unwrap_or(f64::NAN);
    let x = double_arg(&args[1])?.unwrap_or(f64::NAN);
    Ok(wrap(y.atan2(x)))
}
