//! String functions. All positions and lengths are codepoint-based;
//! `substring` follows the round-half-to-even-then-clip rules, so
//! out-of-range arguments never raise.

use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

use super::{arg_or_context_string, opt_string};

fn wrap<N: crate::model::XdmNode>(s: String) -> XdmSequence<N> {
    vec![XdmItem::Atomic(XdmAtomicValue::String(s))]
}

fn collation_arg<'c, N: XdmNode>(
    ctx: &CallCtx<'c, N>,
    args: &[XdmSequence<N>],
    index: usize,
) -> Result<std::sync::Arc<dyn crate::engine::collation::Collation>, Error> {
    let uri = match args.get(index) {
        Some(seq) => opt_string(seq)?,
        None => None,
    };
    ctx.env
        .collations
        .resolve(uri.as_deref(), ctx.default_collation())
}

pub(super) fn string_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(arg_or_context_string(ctx, args)?.unwrap_or_default()))
}

pub(super) fn concat_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let mut out = String::new();
    for arg in args {
        if let Some(s) = opt_string(arg)? {
            out.push_str(&s);
        }
    }
    Ok(wrap(out))
}

pub(super) fn string_join_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let sep = match args.get(1) {
        Some(seq) => opt_string(seq)?.unwrap_or_default(),
        None => String::new(),
    };
    let parts: Vec<String> = crate::xdm::atomize(&args[0])?
        .iter()
        .map(|a| a.string_value())
        .collect();
    Ok(wrap(parts.join(&sep)))
}

/// `fn:substring` with the 1-based, round-half-to-even, clipped-range
/// semantics: `substring("12345", 1.5, 2.6)` is `"234"`.
pub(super) fn substring_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(s) = opt_string(&args[0])? else {
        return Ok(wrap(String::new()));
    };
    let start = match super::opt_atom(&args[1])? {
        Some(a) => a.double_value().unwrap_or(f64::NAN),
        None => f64::NAN,
    };
    let length = match args.get(2) {
        Some(seq) => match super::opt_atom(seq)? {
            Some(a) => Some(a.double_value().unwrap_or(f64::NAN)),
            None => Some(f64::NAN),
        },
        None => None,
    };
    let start = start.round_ties_even();
    if start.is_nan() {
        return Ok(wrap(String::new()));
    }
    let end = match length {
        None => f64::INFINITY,
        Some(l) => {
            let l = l.round_ties_even();
            if l.is_nan() {
                return Ok(wrap(String::new()));
            }
            start + l
        }
    };
    let out: String = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (*i + 1) as f64;
            pos >= start && pos < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(wrap(out))
}

pub(super) fn string_length_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = arg_or_context_string(ctx, args)?.unwrap_or_default();
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Integer(
        s.chars().count() as i64,
    ))])
}

pub(super) fn normalize_space_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = arg_or_context_string(ctx, args)?.unwrap_or_default();
    Ok(wrap(s.split_whitespace().collect::<Vec<_>>().join(" ")))
}

pub(super) fn normalize_unicode_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    use unicode_normalization::UnicodeNormalization;
    let Some(s) = opt_string(&args[0])? else {
        return Ok(wrap(String::new()));
    };
    let form = match args.get(1) {
        Some(seq) => opt_string(seq)?.unwrap_or_default(),
        None => "NFC".to_string(),
    };
    let normalized = match form.trim().to_ascii_uppercase().as_str() {
        "" => s,
        "NFC" => s.nfc().collect(),
        "NFD" => s.nfd().collect(),
        "NFKC" => s.nfkc().collect(),
        "NFKD" => s.nfkd().collect(),
        other => {
            return Err(Error::from_code(
                ErrorCode::FOCH0003,
                format!("unsupported normalization form {other:?}"),
            ));
        }
    };
    Ok(wrap(normalized))
}

pub(super) fn upper_case_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(opt_string(&args[0])?.unwrap_or_default().to_uppercase()))
}

pub(super) fn lower_case_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(opt_string(&args[0])?.unwrap_or_default().to_lowercase()))
}

pub(super) fn translate_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = opt_string(&args[0])?.unwrap_or_default();
    let from: Vec<char> = opt_string(&args[1])?.unwrap_or_default().chars().collect();
    let to: Vec<char> = opt_string(&args[2])?.unwrap_or_default().chars().collect();
    let out = s
        .chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect();
    Ok(wrap(out))
}

fn with_collation_pair<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
    apply: impl Fn(&str, &str) -> bool,
) -> Result<XdmSequence<N>, Error> {
    let a = opt_string(&args[0])?.unwrap_or_default();
    let b = opt_string(&args[1])?.unwrap_or_default();
    let collation = collation_arg(ctx, args, 2)?;
    let ka = collation.key(&a);
    let kb = collation.key(&b);
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(apply(
        &ka, &kb,
    )))])
}

pub(super) fn contains_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    with_collation_pair(ctx, args, |a, b| a.contains(b))
}

pub(super) fn starts_with_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    with_collation_pair(ctx, args, |a, b| a.starts_with(b))
}

pub(super) fn ends_with_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    with_collation_pair(ctx, args, |a, b| a.ends_with(b))
}

pub(super) fn substring_before_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = opt_string(&args[0])?.unwrap_or_default();
    let b = opt_string(&args[1])?.unwrap_or_default();
    let collation = collation_arg(ctx, args, 2)?;
    let ka = collation.key(&a);
    let kb = collation.key(&b);
    // Collation keys locate the match; the slice comes from the original.
    Ok(wrap(match ka.find(&kb) {
        Some(i) if !b.is_empty() => a.chars().take(ka[..i].chars().count()).collect(),
        _ => String::new(),
    }))
}

pub(super) fn substring_after_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let a = opt_string(&args[0])?.unwrap_or_default();
    let b = opt_string(&args[1])?.unwrap_or_default();
    if b.is_empty() {
        return Ok(wrap(a));
    }
    let collation = collation_arg(ctx, args, 2)?;
    let ka = collation.key(&a);
    let kb = collation.key(&b);
    Ok(wrap(match ka.find(&kb) {
        Some(i) => {
            let skip = ka[..i + kb.len()].chars().count();
            a.chars().skip(skip).collect()
        }
        None => String::new(),
    }))
}

pub(super) fn codepoints_to_string_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let mut out = String::new();
    for a in crate::xdm::atomize(&args[0])? {
        let cp = a.integer_value().ok_or_else(|| {
            Error::from_code(ErrorCode::XPTY0004, "codepoints must be integers")
        })?;
        let c = u32::try_from(cp)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| {
                Error::from_code(
                    ErrorCode::FOCH0001,
                    format!("{cp} is not a valid codepoint"),
                )
            })?;
        out.push(c);
    }
    Ok(wrap(out))
}

pub(super) fn string_to_codepoints_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(s) = opt_string(&args[0])? else {
        return Ok(Vec::new());
    };
    Ok(s.chars()
        .map(|c| XdmItem::Atomic(XdmAtomicValue::Integer(c as i64)))
        .collect())
}

pub(super) fn codepoint_equal_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let (Some(a), Some(b)) = (opt_string(&args[0])?, opt_string(&args[1])?) else {
        return Ok(Vec::new());
    };
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(a == b))])
}

pub(super) fn compare_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let (Some(a), Some(b)) = (opt_string(&args[0])?, opt_string(&args[1])?) else {
        return Ok(Vec::new());
    };
    let collation = collation_arg(ctx, args, 2)?;
    let r = match collation.compare(&a, &b) {
        core::cmp::Ordering::Less => -1,
        core::cmp::Ordering::Equal => 0,
        core::cmp::Ordering::Greater => 1,
    };
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Integer(r))])
}

/// `fn:contains-token` (3.1): whitespace-separated token membership.
pub(super) fn contains_token_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let token = opt_string(&args[1])?.unwrap_or_default();
    let token = token.trim();
    if token.is_empty() {
        return Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(false))]);
    }
    let collation = collation_arg(ctx, args, 2)?;
    let needle = collation.key(token);
    for a in crate::xdm::atomize(&args[0])? {
        let hay = a.string_value();
        if hay
            .split_whitespace()
            .any(|t| collation.key(t) == needle)
        {
            return Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(true))]);
        }
    }
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(false))])
}
