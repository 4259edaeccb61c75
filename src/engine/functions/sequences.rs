//! Sequence functions and `fn:error`/`fn:trace`.

use crate::engine::ops::{self, CompareOp};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::function::MapKey;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence, atomize};

use super::{opt_atom, opt_string};

pub(super) fn count_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Integer(
        args[0].len() as i64,
    ))])
}

pub(super) fn empty_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(
        args[0].is_empty(),
    ))])
}

pub(super) fn exists_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(
        !args[0].is_empty(),
    ))])
}

pub(super) fn head_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(args[0].first().cloned().into_iter().collect())
}

pub(super) fn tail_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(args[0].iter().skip(1).cloned().collect())
}

pub(super) fn reverse_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let mut seq = args[0].clone();
    seq.reverse();
    Ok(seq)
}

pub(super) fn insert_before_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let target = &args[0];
    let pos = opt_atom(&args[1])?
        .and_then(|a| a.integer_value())
        .ok_or_else(|| Error::from_code(ErrorCode::XPTY0004, "position must be an integer"))?;
    let inserts = &args[2];
    // Positions clamp to the sequence bounds.
    let at = pos.max(1).min(target.len() as i64 + 1) as usize - 1;
    let mut out = Vec::with_capacity(target.len() + inserts.len());
    out.extend_from_slice(&target[..at]);
    out.extend_from_slice(inserts);
    out.extend_from_slice(&target[at..]);
    Ok(out)
}

pub(super) fn remove_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let pos = opt_atom(&args[1])?
        .and_then(|a| a.integer_value())
        .ok_or_else(|| Error::from_code(ErrorCode::XPTY0004, "position must be an integer"))?;
    Ok(args[0]
        .iter()
        .enumerate()
        .filter(|(i, _)| (*i + 1) as i64 != pos)
        .map(|(_, item)| item.clone())
        .collect())
}

/// `fn:subsequence`: 1-based with rounded, clipped bounds; no errors for
/// out-of-range positions.
pub(super) fn subsequence_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let start = opt_atom(&args[1])?
        .and_then(|a| a.double_value())
        .unwrap_or(f64::NAN)
        .round_ties_even();
    if start.is_nan() {
        return Ok(Vec::new());
    }
    let end = match args.get(2) {
        None => f64::INFINITY,
        Some(seq) => {
            let len = opt_atom(seq)?
                .and_then(|a| a.double_value())
                .unwrap_or(f64::NAN)
                .round_ties_even();
            if len.is_nan() {
                return Ok(Vec::new());
            }
            start + len
        }
    };
    Ok(args[0]
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (*i + 1) as f64;
            pos >= start && pos < end
        })
        .map(|(_, item)| item.clone())
        .collect())
}

pub(super) fn distinct_values_fn<N: XdmNode>(
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
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for a in atomize(&args[0])? {
        // The same-key normalization gives eq-semantics across numeric
        // types; strings fold through the collation key.
        let key = match &a {
            XdmAtomicValue::String(s) | XdmAtomicValue::UntypedAtomic(s) => {
                MapKey::Str(collation.key(s))
            }
            other => MapKey::from_atomic(other),
        };
        if seen.insert(key) {
            out.push(XdmItem::Atomic(a));
        }
    }
    Ok(out)
}

pub(super) fn index_of_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let needle = opt_atom(&args[1])?.ok_or_else(|| {
        Error::from_code(ErrorCode::XPTY0004, "index-of needs a single search value")
    })?;
    let collation = match args.get(2) {
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
    let tz = ctx.implicit_timezone();
    let mut out = Vec::new();
    for (i, a) in atomize(&args[0])?.into_iter().enumerate() {
        // Incomparable pairs are skipped, not raised.
        if ops::value_compare(CompareOp::Eq, &a, &needle, collation.as_ref(), tz).unwrap_or(false)
        {
            out.push(XdmItem::Atomic(XdmAtomicValue::Integer((i + 1) as i64)));
        }
    }
    Ok(out)
}

/// Structural equality over two sequences: pairwise atomics under `eq`,
/// nodes by name/kind/children recursion.
pub(super) fn deep_equal_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let collation = match args.get(2) {
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
    let tz = ctx.implicit_timezone();
    let eq = deep_equal_sequences(&args[0], &args[1], collation.as_ref(), tz);
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(eq))])
}

pub(crate) fn deep_equal_sequences<N: XdmNode>(
    a: &[XdmItem<N>],
    b: &[XdmItem<N>],
    collation: &dyn crate::engine::collation::Collation,
    tz: chrono::FixedOffset,
) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .all(|(x, y)| deep_equal_items(x, y, collation, tz))
}

fn deep_equal_items<N: XdmNode>(
    a: &XdmItem<N>,
    b: &XdmItem<N>,
    collation: &dyn crate::engine::collation::Collation,
    tz: chrono::FixedOffset,
) -> bool {
    match (a, b) {
        (XdmItem::Atomic(x), XdmItem::Atomic(y)) => {
            // NaN equals NaN under deep-equal.
            let nan = |v: &XdmAtomicValue| {
                matches!(v, XdmAtomicValue::Double(d) if d.is_nan())
                    || matches!(v, XdmAtomicValue::Float(f) if f.is_nan())
            };
            if nan(x) && nan(y) {
                return true;
            }
            ops::value_compare(CompareOp::Eq, x, y, collation, tz).unwrap_or(false)
        }
        (XdmItem::Node(x), XdmItem::Node(y)) => deep_equal_nodes(x, y, collation, tz),
        (XdmItem::Map(x), XdmItem::Map(y)) => {
            x.size() == y.size()
                && x.entries().iter().all(|(k, v)| {
                    y.get(k)
                        .is_some_and(|w| deep_equal_sequences(v, w, collation, tz))
                })
        }
        (XdmItem::Array(x), XdmItem::Array(y)) => {
            x.size() == y.size()
                && x.members()
                    .iter()
                    .zip(y.members())
                    .all(|(v, w)| deep_equal_sequences(v, w, collation, tz))
        }
        _ => false,
    }
}

fn deep_equal_nodes<N: XdmNode>(
    a: &N,
    b: &N,
    collation: &dyn crate::engine::collation::Collation,
    tz: chrono::FixedOffset,
) -> bool {
    use crate::model::NodeKind;
    if a.kind() != b.kind() {
        return false;
    }
    match a.kind() {
        NodeKind::Text | NodeKind::Comment => {
            collation.key(&a.string_value()) == collation.key(&b.string_value())
        }
        NodeKind::ProcessingInstruction | NodeKind::Namespace | NodeKind::Attribute => {
            a.name() == b.name()
                && collation.key(&a.string_value()) == collation.key(&b.string_value())
        }
        NodeKind::Element => {
            if a.name() != b.name() {
                return false;
            }
            // Attributes compare as unordered sets.
            let attrs_a = a.attributes();
            let attrs_b = b.attributes();
            if attrs_a.len() != attrs_b.len() {
                return false;
            }
            for attr in &attrs_a {
                if !attrs_b.iter().any(|other| {
                    attr.name() == other.name()
                        && collation.key(&attr.string_value())
                            == collation.key(&other.string_value())
                }) {
                    return false;
                }
            }
            deep_equal_children(a, b, collation, tz)
        }
        NodeKind::Document => deep_equal_children(a, b, collation, tz),
    }
}

fn deep_equal_children<N: XdmNode>(
    a: &N,
    b: &N,
    collation: &dyn crate::engine::collation::Collation,
    tz: chrono::FixedOffset,
) -> bool {
    use crate::model::NodeKind;
    // Comments and PIs are ignored in content comparison.
    let significant = |n: &N| {
        !matches!(
            n.kind(),
            NodeKind::Comment | NodeKind::ProcessingInstruction
        )
    };
    let ca: Vec<N> = a.children().into_iter().filter(|n| significant(n)).collect();
    let cb: Vec<N> = b.children().into_iter().filter(|n| significant(n)).collect();
    ca.len() == cb.len()
        && ca
            .iter()
            .zip(cb.iter())
            .all(|(x, y)| deep_equal_nodes(x, y, collation, tz))
}

pub(super) fn zero_or_one_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    if args[0].len() > 1 {
        return Err(Error::from_code(
            ErrorCode::FORG0003,
            "zero-or-one: more than one item",
        ));
    }
    Ok(args[0].clone())
}

pub(super) fn one_or_more_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    if args[0].is_empty() {
        return Err(Error::from_code(
            ErrorCode::FORG0004,
            "one-or-more: empty sequence",
        ));
    }
    Ok(args[0].clone())
}

pub(super) fn exactly_one_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    if args[0].len() != 1 {
        return Err(Error::from_code(
            ErrorCode::FORG0005,
            format!("exactly-one: {} items", args[0].len()),
        ));
    }
    Ok(args[0].clone())
}

pub(super) fn data_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let seq = match args.first() {
        Some(seq) => seq.clone(),
        None => vec![ctx.focus.item_or_absent()?.clone()],
    };
    Ok(atomize(&seq)?.into_iter().map(XdmItem::Atomic).collect())
}

pub(super) fn unordered_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(args[0].clone())
}

/// `fn:error`: raises `FOER0000` or the supplied code QName.
pub(super) fn error_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let code = match args.first().map(|seq| opt_atom(seq)).transpose()?.flatten() {
        Some(XdmAtomicValue::QName { ns_uri, local, .. }) => {
            crate::xdm::ExpandedName::new(ns_uri, local)
        }
        Some(other) => crate::xdm::ExpandedName::new(
            Some(crate::consts::ERR_NS.to_string()),
            other.string_value(),
        ),
        None => ErrorCode::FOER0000.qname(),
    };
    let message = match args.get(1) {
        Some(seq) => opt_string(seq)?.unwrap_or_default(),
        None => "error raised by fn:error".to_string(),
    };
    Err(Error::with_qname(code, message))
}

/// `fn:trace` is the identity; the label and value surface through the
/// error chain's Debug only, the engine does no logging of its own.
pub(super) fn trace_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(args[0].clone())
}
