//! Focus and environment accessors: `position`, `last`,
//! `default-collation`, `doc`, `doc-available`.

use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

use super::opt_string;

pub(super) fn position_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    if ctx.focus.item.is_none() {
        return Err(Error::from_code(ErrorCode::XPDY0002, "no context item"));
    }
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Integer(
        ctx.focus.position as i64,
    ))])
}

pub(super) fn last_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    if ctx.focus.item.is_none() {
        return Err(Error::from_code(ErrorCode::XPDY0002, "no context item"));
    }
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Integer(
        ctx.focus.size as i64,
    ))])
}

pub(super) fn default_collation_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::AnyUri(
        ctx.static_ctx.default_collation.clone(),
    ))])
}

fn resolve_doc_uri<N: XdmNode>(ctx: &CallCtx<'_, N>, uri: &str) -> String {
    // Relative URIs resolve against the static base URI when one exists.
    if uri.contains("://") || ctx.static_ctx.base_uri.is_none() {
        return uri.to_string();
    }
    let base = ctx.static_ctx.base_uri.as_deref().unwrap_or("");
    match base.rfind('/') {
        Some(i) => format!("{}/{}", &base[..i], uri),
        None => uri.to_string(),
    }
}

/// `fn:doc`: consult the context document cache, then the loader callback.
/// No implicit I/O happens here; a missing loader means a missing document.
pub(super) fn doc_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(uri) = opt_string(&args[0])? else {
        return Ok(Vec::new());
    };
    let abs = resolve_doc_uri(ctx, &uri);
    if let Some(doc) = ctx.env.cached_document(&abs) {
        return Ok(vec![XdmItem::Node(doc)]);
    }
    if let Some(loader) = &ctx.env.loader
        && let Some(doc) = loader.load(&abs)?
    {
        ctx.env.cache_document(&abs, doc.clone());
        return Ok(vec![XdmItem::Node(doc)]);
    }
    Err(Error::from_code(
        ErrorCode::FODC0002,
        format!("document {abs:?} is not available"),
    ))
}

pub(super) fn doc_available_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let available = match opt_string(&args[0])? {
        None => false,
        Some(uri) => {
            let abs = resolve_doc_uri(ctx, &uri);
            ctx.env.cached_document(&abs).is_some()
                || match &ctx.env.loader {
                    Some(loader) => loader.load(&abs).map(|d| d.is_some()).unwrap_or(false),
                    None => false,
                }
        }
    };
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(available))])
}
