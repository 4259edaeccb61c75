//! The `array:` function namespace (XPath 3.1).

use crate::engine::evaluator::apply_function;
use crate::engine::ops::{self, CompareOp};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmArray, XdmAtomicValue, XdmItem, XdmSequence};

use super::{opt_atom, opt_string};

fn array_arg<N: XdmNode>(seq: &XdmSequence<N>) -> Result<XdmArray<N>, Error> {
    match seq.as_slice() {
        [XdmItem::Array(a)] => Ok(a.clone()),
        _ => Err(Error::from_code(
            ErrorCode::XPTY0004,
            "expected a single array",
        )),
    }
}

fn position_arg<N: XdmNode>(seq: &XdmSequence<N>) -> Result<i64, Error> {
    opt_atom(seq)?
        .and_then(|a| a.integer_value())
        .ok_or_else(|| Error::from_code(ErrorCode::XPTY0004, "position must be an integer"))
}

fn function_arg<N: XdmNode>(seq: &XdmSequence<N>) -> Result<&XdmItem<N>, Error> {
    match seq.as_slice() {
        [item @ (XdmItem::Function(_) | XdmItem::Map(_) | XdmItem::Array(_))] => Ok(item),
        _ => Err(Error::from_code(
            ErrorCode::XPTY0004,
            "expected a single function item",
        )),
    }
}

pub(super) fn size_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Integer(
        array_arg(&args[0])?.size() as i64,
    ))])
}

pub(super) fn get_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    a.get(position_arg(&args[1])?).cloned()
}

pub(super) fn put_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    Ok(vec![XdmItem::Array(
        a.put(position_arg(&args[1])?, args[2].clone())?,
    )])
}

pub(super) fn append_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    Ok(vec![XdmItem::Array(a.append(args[1].clone()))])
}

pub(super) fn subarray_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    let start = position_arg(&args[1])?;
    let length = match args.get(2) {
        Some(seq) => {
            let l = position_arg(seq)?;
            if l < 0 {
                return Err(Error::from_code(
                    ErrorCode::FOAY0002,
                    "negative subarray length",
                ));
            }
            l
        }
        None => a.size() as i64 - start + 1,
    };
    if start < 1 || start + length - 1 > a.size() as i64 || length < 0 {
        return Err(Error::from_code(
            ErrorCode::FOAY0001,
            "subarray bounds out of range",
        ));
    }
    let members = a.members()[(start - 1) as usize..(start + length - 1) as usize].to_vec();
    Ok(vec![XdmItem::Array(XdmArray::new(members))])
}

pub(super) fn remove_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    let mut drop = Vec::new();
    for key in crate::xdm::atomize(&args[1])? {
        let p = key.integer_value().ok_or_else(|| {
            Error::from_code(ErrorCode::XPTY0004, "positions must be integers")
        })?;
        if p < 1 || p > a.size() as i64 {
            return Err(Error::from_code(
                ErrorCode::FOAY0001,
                format!("position {p} out of bounds"),
            ));
        }
        drop.push(p as usize);
    }
    let members = a
        .members()
        .iter()
        .enumerate()
        .filter(|(i, _)| !drop.contains(&(i + 1)))
        .map(|(_, m)| m.clone())
        .collect();
    Ok(vec![XdmItem::Array(XdmArray::new(members))])
}

pub(super) fn insert_before_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    let pos = position_arg(&args[1])?;
    if pos < 1 || pos > a.size() as i64 + 1 {
        return Err(Error::from_code(
            ErrorCode::FOAY0001,
            format!("position {pos} out of bounds"),
        ));
    }
    let mut members = a.members().to_vec();
    members.insert((pos - 1) as usize, args[2].clone());
    Ok(vec![XdmItem::Array(XdmArray::new(members))])
}

pub(super) fn head_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    a.get(1).cloned()
}

pub(super) fn tail_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    if a.size() == 0 {
        return Err(Error::from_code(ErrorCode::FOAY0001, "tail of an empty array"));
    }
    Ok(vec![XdmItem::Array(XdmArray::new(
        a.members()[1..].to_vec(),
    ))])
}

pub(super) fn reverse_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    let mut members = a.members().to_vec();
    members.reverse();
    Ok(vec![XdmItem::Array(XdmArray::new(members))])
}

pub(super) fn join_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let mut members = Vec::new();
    for item in &args[0] {
        let XdmItem::Array(a) = item else {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                "array:join expects arrays",
            ));
        };
        members.extend(a.members().to_vec());
    }
    Ok(vec![XdmItem::Array(XdmArray::new(members))])
}

/// `array:flatten`: arrays flatten recursively into a plain sequence.
pub(super) fn flatten_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    fn flatten<N: XdmNode>(seq: &XdmSequence<N>, out: &mut XdmSequence<N>) {
        for item in seq {
            match item {
                XdmItem::Array(a) => {
                    for member in a.members() {
                        flatten(member, out);
                    }
                }
                other => out.push(other.clone()),
            }
        }
    }
    let mut out = Vec::new();
    flatten(&args[0], &mut out);
    Ok(out)
}

pub(super) fn for_each_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    let f = function_arg(&args[1])?;
    let mut members = Vec::with_capacity(a.size());
    for member in a.members() {
        members.push(apply_function(ctx, f, vec![member.clone()])?);
    }
    Ok(vec![XdmItem::Array(XdmArray::new(members))])
}

pub(super) fn filter_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    let f = function_arg(&args[1])?;
    let mut members = Vec::new();
    for member in a.members() {
        let verdict = apply_function(ctx, f, vec![member.clone()])?;
        match verdict.as_slice() {
            [XdmItem::Atomic(XdmAtomicValue::Boolean(true))] => members.push(member.clone()),
            [XdmItem::Atomic(XdmAtomicValue::Boolean(false))] => {}
            _ => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "array:filter predicate must return a single xs:boolean",
                ));
            }
        }
    }
    Ok(vec![XdmItem::Array(XdmArray::new(members))])
}

pub(super) fn fold_left_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    let f = function_arg(&args[2])?;
    let mut acc = args[1].clone();
    for member in a.members() {
        acc = apply_function(ctx, f, vec![acc, member.clone()])?;
    }
    Ok(acc)
}

pub(super) fn fold_right_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    let f = function_arg(&args[2])?;
    let mut acc = args[1].clone();
    for member in a.members().iter().rev() {
        acc = apply_function(ctx, f, vec![member.clone(), acc])?;
    }
    Ok(acc)
}

pub(super) fn for_each_pair_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
    let b = array_arg(&args[1])?;
    let f = function_arg(&args[2])?;
    let mut members = Vec::new();
    for (x, y) in a.members().iter().zip(b.members()) {
        members.push(apply_function(ctx, f, vec![x.clone(), y.clone()])?);
    }
    Ok(vec![XdmItem::Array(XdmArray::new(members))])
}

pub(super) fn sort_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = array_arg(&args[0])?;
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
    let key_fn = args.get(2).map(|seq| function_arg(seq)).transpose()?;
    let tz = ctx.implicit_timezone();
    let mut keyed: Vec<(Vec<XdmAtomicValue>, XdmSequence<N>)> = Vec::with_capacity(a.size());
    for member in a.members() {
        let key_items = match key_fn {
            Some(f) => apply_function(ctx, f, vec![member.clone()])?,
            None => member.clone(),
        };
        keyed.push((crate::xdm::atomize(&key_items)?, member.clone()));
    }
    let mut failure: Option<Error> = None;
    keyed.sort_by(|(ka, _), (kb, _)| {
        for (x, y) in ka.iter().zip(kb.iter()) {
            match (
                ops::value_compare(CompareOp::Lt, x, y, collation.as_ref(), tz),
                ops::value_compare(CompareOp::Gt, x, y, collation.as_ref(), tz),
            ) {
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
    Ok(vec![XdmItem::Array(XdmArray::new(
        keyed.into_iter().map(|(_, m)| m).collect(),
    ))])
}
