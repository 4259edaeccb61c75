//! URI functions.

use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

use super::opt_string;

fn wrap_uri<N: crate::model::XdmNode>(s: String) -> XdmSequence<N> {
    vec![XdmItem::Atomic(XdmAtomicValue::AnyUri(s))]
}

pub(super) fn static_base_uri_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(ctx
        .static_ctx
        .base_uri
        .clone()
        .map(|u| XdmItem::Atomic(XdmAtomicValue::AnyUri(u)))
        .into_iter()
        .collect())
}

/// RFC 3986-lite resolution: absolute references pass through, otherwise
/// the reference replaces the base's last path segment.
pub(super) fn resolve_uri_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(relative) = opt_string(&args[0])? else {
        return Ok(Vec::new());
    };
    let base = match args.get(1) {
        Some(seq) => opt_string(seq)?,
        None => ctx.static_ctx.base_uri.clone(),
    };
    if relative.contains("://") || relative.starts_with("urn:") {
        return Ok(wrap_uri(relative));
    }
    let Some(base) = base else {
        return Err(Error::from_code(
            ErrorCode::FONS0005,
            "no base URI available for resolution",
        ));
    };
    if relative.is_empty() {
        return Ok(wrap_uri(base));
    }
    if let Some(rest) = relative.strip_prefix('/') {
        // Scheme-and-authority from the base, path from the reference.
        if let Some(scheme_end) = base.find("://") {
            let after = &base[scheme_end + 3..];
            let authority_end = after.find('/').map(|i| scheme_end + 3 + i).unwrap_or(base.len());
            return Ok(wrap_uri(format!("{}/{}", &base[..authority_end], rest)));
        }
        return Ok(wrap_uri(relative));
    }
    match base.rfind('/') {
        Some(i) => Ok(wrap_uri(format!("{}/{relative}", &base[..i]))),
        None => Err(Error::from_code(
            ErrorCode::FORG0009,
            format!("cannot resolve {relative:?} against {base:?}"),
        )),
    }
}

fn percent_encode(s: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if keep(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{b:02X}"));
            }
        }
    }
    out
}

pub(super) fn encode_for_uri_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = opt_string(&args[0])?.unwrap_or_default();
    let encoded = percent_encode(&s, |c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
    });
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::String(encoded))])
}

pub(super) fn iri_to_uri_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = opt_string(&args[0])?.unwrap_or_default();
    let encoded = percent_encode(&s, |c| c.is_ascii_graphic() && c != '<' && c != '>' && c != '"');
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::String(encoded))])
}

pub(super) fn escape_html_uri_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = opt_string(&args[0])?.unwrap_or_default();
    let encoded = percent_encode(&s, |c| (' '..='~').contains(&c));
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::String(encoded))])
}
