//! Higher-order functions (XPath 3.0/3.1). Function items, maps, and
//! arrays are all callable here.

use crate::engine::evaluator::apply_function;
use crate::engine::ops::{self, CompareOp};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{ExpandedName, FunctionItem, XdmAtomicValue, XdmItem, XdmSequence};

use super::{opt_atom, opt_string};

fn callable<N: XdmNode>(seq: &XdmSequence<N>) -> Result<&XdmItem<N>, Error> {
    match seq.as_slice() {
        [item @ (XdmItem::Function(_) | XdmItem::Map(_) | XdmItem::Array(_))] => Ok(item),
        _ => Err(Error::from_code(
            ErrorCode::XPTY0004,
            "expected a single function item",
        )),
    }
}

pub(super) fn for_each_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let f = callable(&args[1])?;
    let mut out = Vec::new();
    for item in &args[0] {
        out.extend(apply_function(ctx, f, vec![vec![item.clone()]])?);
    }
    Ok(out)
}

pub(super) fn filter_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let f = callable(&args[1])?;
    let mut out = Vec::new();
    for item in &args[0] {
        let verdict = apply_function(ctx, f, vec![vec![item.clone()]])?;
        match verdict.as_slice() {
            [XdmItem::Atomic(XdmAtomicValue::Boolean(true))] => out.push(item.clone()),
            [XdmItem::Atomic(XdmAtomicValue::Boolean(false))] => {}
            _ => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "filter predicate must return a single xs:boolean",
                ));
            }
        }
    }
    Ok(out)
}

pub(super) fn fold_left_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let f = callable(&args[2])?;
    let mut acc = args[1].clone();
    for item in &args[0] {
        acc = apply_function(ctx, f, vec![acc, vec![item.clone()]])?;
    }
    Ok(acc)
}

pub(super) fn fold_right_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let f = callable(&args[2])?;
    let mut acc = args[1].clone();
    for item in args[0].iter().rev() {
        acc = apply_function(ctx, f, vec![vec![item.clone()], acc])?;
    }
    Ok(acc)
}

pub(super) fn for_each_pair_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let f = callable(&args[2])?;
    let mut out = Vec::new();
    for (a, b) in args[0].iter().zip(args[1].iter()) {
        out.extend(apply_function(
            ctx,
            f,
            vec![vec![a.clone()], vec![b.clone()]],
        )?);
    }
    Ok(out)
}

pub(super) fn function_lookup_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let name = match opt_atom(&args[0])? {
        Some(XdmAtomicValue::QName { ns_uri, local, .. }) => ExpandedName::new(ns_uri, local),
        _ => {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                "function-lookup expects an xs:QName",
            ));
        }
    };
    let arity = opt_atom(&args[1])?
        .and_then(|a| a.integer_value())
        .ok_or_else(|| Error::from_code(ErrorCode::XPTY0004, "arity must be an integer"))?;
    let Ok(arity) = usize::try_from(arity) else {
        return Ok(Vec::new());
    };
    Ok(match ctx.env.functions.resolve(&name, arity) {
        Some(def) => vec![XdmItem::Function(FunctionItem::native(
            Some(name),
            arity,
            def.body.clone(),
        ))],
        None => Vec::new(),
    })
}

pub(super) fn function_name_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    match callable(&args[0])? {
        XdmItem::Function(f) => Ok(match f.name() {
            Some(n) => vec![XdmItem::Atomic(XdmAtomicValue::QName {
                prefix: None,
                ns_uri: n.ns_uri.clone(),
                local: n.local.clone(),
            })],
            None => Vec::new(),
        }),
        _ => Ok(Vec::new()),
    }
}

pub(super) fn function_arity_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let arity = match callable(&args[0])? {
        XdmItem::Function(f) => f.arity(),
        // Maps and arrays are functions of arity 1.
        _ => 1,
    };
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Integer(arity as i64))])
}

/// `fn:apply(f, array)`: the array's members become the arguments.
pub(super) fn apply_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let f = callable(&args[0])?;
    let arr = match args[1].as_slice() {
        [XdmItem::Array(a)] => a.clone(),
        _ => {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                "apply expects an array of arguments",
            ));
        }
    };
    apply_function(ctx, f, arr.members().to_vec())
}

/// `fn:sort`: stable sort on atomized sort keys under `lt`.
pub(super) fn sort_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let collation = match args.get(1) {
        Some(seq) => {
            let uri = opt_string(seq)?;
            ctx.env
                .collations
                .resolve(uri.as_deref(), ctx.default_collation())?
        }
        None => ctx
            .env
            .collations
            .resolve(None, ctx.default_collation())?,
    };
    let key_fn = args.get(2).map(|seq| callable(seq)).transpose()?;
    let tz = ctx.implicit_timezone();
    let mut keyed: Vec<(Vec<XdmAtomicValue>, XdmItem<N>)> = Vec::with_capacity(args[0].len());
    for item in &args[0] {
        let key_items = match key_fn {
            Some(f) => apply_function(ctx, f, vec![vec![item.clone()]])?,
            None => vec![item.clone()],
        };
        keyed.push((crate::xdm::atomize(&key_items)?, item.clone()));
    }
    let mut failure: Option<Error> = None;
    keyed.sort_by(|(ka, _), (kb, _)| {
        for (a, b) in ka.iter().zip(kb.iter()) {
            let lt = ops::value_compare(CompareOp::Lt, a, b, collation.as_ref(), tz);
            let gt = ops::value_compare(CompareOp::Gt, a, b, collation.as_ref(), tz);
            match (lt, gt) {
                (Ok(true), _) => return core::cmp::Ordering::Less,
                (_, Ok(true)) => return core::cmp::Ordering::Greater,
                (Ok(false), Ok(false)) => continue,
                (Err(e), _) | (_, Err(e)) => {
                    failure.get_or_insert(e);
                    return core::cmp::Ordering::Equal;
                }
            }
        }
        ka.len().cmp(&kb.len())
    });
    if let Some(e) = failure {
        return Err(e);
    }
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}
