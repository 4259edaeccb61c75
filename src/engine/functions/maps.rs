//! The `map:` function namespace (XPath 3.1).

use crate::engine::evaluator::apply_function;
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmMap, XdmSequence};

use super::opt_atom;

fn map_arg<N: XdmNode>(seq: &XdmSequence<N>) -> Result<XdmMap<N>, Error> {
    match seq.as_slice() {
        [XdmItem::Map(m)] => Ok(m.clone()),
        _ => Err(Error::from_code(ErrorCode::XPTY0004, "expected a single map")),
    }
}

fn key_arg<N: XdmNode>(seq: &XdmSequence<N>) -> Result<XdmAtomicValue, Error> {
    opt_atom(seq)?.ok_or_else(|| {
        Error::from_code(ErrorCode::XPTY0004, "map keys must be single atomic values")
    })
}

pub(super) fn size_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Integer(
        map_arg(&args[0])?.size() as i64,
    ))])
}

pub(super) fn keys_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(map_arg(&args[0])?
        .entries()
        .iter()
        .map(|(k, _)| XdmItem::Atomic(k.clone()))
        .collect())
}

pub(super) fn contains_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let m = map_arg(&args[0])?;
    let key = key_arg(&args[1])?;
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(
        m.contains(&key),
    ))])
}

pub(super) fn get_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let m = map_arg(&args[0])?;
    let key = key_arg(&args[1])?;
    Ok(m.get(&key).cloned().unwrap_or_default())
}

pub(super) fn put_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let m = map_arg(&args[0])?;
    let key = key_arg(&args[1])?;
    Ok(vec![XdmItem::Map(m.put(key, args[2].clone()))])
}

pub(super) fn entry_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let key = key_arg(&args[0])?;
    let m = XdmMap::from_entries(vec![(key, args[1].clone())])?;
    Ok(vec![XdmItem::Map(m)])
}

pub(super) fn remove_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let m = map_arg(&args[0])?;
    let keys = crate::xdm::atomize(&args[1])?;
    Ok(vec![XdmItem::Map(m.remove(&keys))])
}

/// `map:merge` with the five duplicate policies; `use-first` is the
/// default.
pub(super) fn merge_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let policy = match args.get(1) {
        Some(seq) => {
            let options = map_arg(seq)?;
            options
                .get(&XdmAtomicValue::String("duplicates".into()))
                .and_then(|v| v.first().cloned())
                .map(|item| match item {
                    XdmItem::Atomic(a) => a.string_value(),
                    _ => String::new(),
                })
                .unwrap_or_else(|| "use-first".to_string())
        }
        None => "use-first".to_string(),
    };
    if !matches!(
        policy.as_str(),
        "use-first" | "use-last" | "use-any" | "combine" | "reject"
    ) {
        return Err(Error::from_code(
            ErrorCode::FOJS0005,
            format!("invalid duplicates policy {policy:?}"),
        ));
    }
    let mut merged: XdmMap<N> = XdmMap::new();
    for item in &args[0] {
        let XdmItem::Map(m) = item else {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                "map:merge expects a sequence of maps",
            ));
        };
        for (k, v) in m.entries() {
            if let Some(existing) = merged.get(k) {
                match policy.as_str() {
                    "use-first" | "use-any" => {}
                    "use-last" => merged = merged.put(k.clone(), v.clone()),
                    "combine" => {
                        let mut combined = existing.clone();
                        combined.extend(v.clone());
                        merged = merged.put(k.clone(), combined);
                    }
                    _ => {
                        return Err(Error::from_code(
                            ErrorCode::FOJS0003,
                            format!("duplicate key {:?}", k.string_value()),
                        ));
                    }
                }
            } else {
                merged = merged.put(k.clone(), v.clone());
            }
        }
    }
    Ok(vec![XdmItem::Map(merged)])
}

pub(super) fn for_each_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let m = map_arg(&args[0])?;
    let f = match args[1].as_slice() {
        [item @ XdmItem::Function(_)] => item,
        _ => {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                "map:for-each expects a function",
            ));
        }
    };
    let mut out = Vec::new();
    for (k, v) in m.entries() {
        out.extend(apply_function(
            ctx,
            f,
            vec![vec![XdmItem::Atomic(k.clone())], v.clone()],
        )?);
    }
    Ok(out)
}

/// `map:find`: depth-first search for a key through maps nested inside
/// sequences, maps, and arrays; results collect into an array.
pub(super) fn find_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let key = key_arg(&args[1])?;
    let mut found: Vec<XdmSequence<N>> = Vec::new();
    fn walk<N: XdmNode>(
        seq: &XdmSequence<N>,
        key: &XdmAtomicValue,
        found: &mut Vec<XdmSequence<N>>,
    ) {
        for item in seq {
            match item {
                XdmItem::Map(m) => {
                    if let Some(v) = m.get(key) {
                        found.push(v.clone());
                    }
                    for (_, v) in m.entries() {
                        walk(v, key, found);
                    }
                }
                XdmItem::Array(a) => {
                    for member in a.members() {
                        walk(member, key, found);
                    }
                }
                _ => {}
            }
        }
    }
    walk(&args[0], &key, &mut found);
    Ok(vec![XdmItem::Array(crate::xdm::XdmArray::new(found))])
}
