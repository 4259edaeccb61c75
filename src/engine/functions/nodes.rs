//! Node functions: names, roots, URIs, `lang`, `id`, `generate-id`,
//! `has-children`, `innermost`/`outermost`, `path`.

use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::{NodeKind, XdmNode};
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

use super::{node_arg_or_context, opt_string};

fn wrap_string<N: crate::model::XdmNode>(s: String) -> XdmSequence<N> {
    vec![XdmItem::Atomic(XdmAtomicValue::String(s))]
}

pub(super) fn name_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(wrap_string(String::new()));
    };
    let name = match n.name() {
        Some(q) => match &q.prefix {
            Some(p) => format!("{p}:{}", q.local),
            None => q.local,
        },
        None => String::new(),
    };
    Ok(wrap_string(name))
}

pub(super) fn local_name_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(wrap_string(String::new()));
    };
    Ok(wrap_string(n.name().map(|q| q.local).unwrap_or_default()))
}

pub(super) fn namespace_uri_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(vec![XdmItem::Atomic(XdmAtomicValue::AnyUri(String::new()))]);
    };
    let uri = n.name().and_then(|q| q.ns_uri).unwrap_or_default();
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::AnyUri(uri))])
}

pub(super) fn node_name_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(Vec::new());
    };
    Ok(match n.name() {
        Some(q) => vec![XdmItem::Atomic(XdmAtomicValue::QName {
            prefix: q.prefix,
            ns_uri: q.ns_uri,
            local: q.local,
        })],
        None => Vec::new(),
    })
}

pub(super) fn root_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(Vec::new());
    };
    Ok(vec![XdmItem::Node(n.root())])
}

pub(super) fn base_uri_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(Vec::new());
    };
    Ok(n.base_uri()
        .map(|u| XdmItem::Atomic(XdmAtomicValue::AnyUri(u)))
        .into_iter()
        .collect())
}

pub(super) fn document_uri_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(Vec::new());
    };
    Ok(n.document_uri()
        .filter(|_| n.kind() == NodeKind::Document)
        .map(|u| XdmItem::Atomic(XdmAtomicValue::AnyUri(u)))
        .into_iter()
        .collect())
}

pub(super) fn nilled_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    // Untyped trees never carry xsi:nil semantics.
    match args[0].as_slice() {
        [] => Ok(Vec::new()),
        [XdmItem::Node(n)] if n.kind() == NodeKind::Element => {
            Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(false))])
        }
        [XdmItem::Node(_)] => Ok(Vec::new()),
        _ => Err(Error::from_code(ErrorCode::XPTY0004, "nilled expects a node")),
    }
}

/// `fn:lang`: language test against the nearest xml:lang attribute, with
/// range subsumption (`lang('en')` matches `en-US`).
pub(super) fn lang_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let wanted = opt_string(&args[0])?.unwrap_or_default();
    let node = match args.get(1) {
        Some(_) => node_arg_or_context(ctx, &args[1..])?,
        None => node_arg_or_context(ctx, &[])?,
    };
    let Some(node) = node else {
        return Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(false))]);
    };
    let mut cur = Some(node);
    let mut found: Option<String> = None;
    while let Some(n) = cur {
        for attr in n.attributes() {
            if let Some(q) = attr.name()
                && q.local == "lang"
                && (q.prefix.as_deref() == Some("xml")
                    || q.ns_uri.as_deref() == Some(crate::consts::XML_NS))
            {
                found = Some(attr.string_value());
            }
        }
        if found.is_some() {
            break;
        }
        cur = n.parent();
    }
    let matches = match found {
        Some(actual) => {
            let actual = actual.to_ascii_lowercase();
            let wanted = wanted.to_ascii_lowercase();
            actual == wanted || actual.starts_with(&format!("{wanted}-"))
        }
        None => false,
    };
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(matches))])
}

/// `fn:id` over untyped trees matches `id` and `xml:id` attributes.
pub(super) fn id_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let mut wanted: Vec<String> = Vec::new();
    for a in crate::xdm::atomize(&args[0])? {
        for token in a.string_value().split_whitespace() {
            wanted.push(token.to_string());
        }
    }
    let start = match args.get(1) {
        Some(_) => node_arg_or_context(ctx, &args[1..])?,
        None => node_arg_or_context(ctx, &[])?,
    };
    let Some(start) = start else {
        return Ok(Vec::new());
    };
    let root = start.root();
    let mut out = Vec::new();
    fn walk<N: XdmNode>(n: &N, wanted: &[String], out: &mut Vec<N>) {
        if n.kind() == NodeKind::Element {
            for attr in n.attributes() {
                let is_id = attr.name().is_some_and(|q| {
                    q.local == "id"
                        && (q.prefix.is_none() || q.prefix.as_deref() == Some("xml"))
                });
                if is_id && wanted.iter().any(|w| *w == attr.string_value()) {
                    out.push(n.clone());
                    break;
                }
            }
        }
        for c in n.children() {
            walk(&c, wanted, out);
        }
    }
    walk(&root, &wanted, &mut out);
    Ok(out.into_iter().map(XdmItem::Node).collect())
}

/// `fn:generate-id`: stable within one tree via the document-order key, or
/// a hash of the node handle otherwise.
pub(super) fn generate_id_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(wrap_string(String::new()));
    };
    let id = match n.doc_order_key() {
        Some(k) => format!("id{k}"),
        None => {
            use std::hash::Hasher;
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            n.hash(&mut hasher);
            format!("idh{:x}", hasher.finish())
        }
    };
    Ok(wrap_string(id))
}

pub(super) fn has_children_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(false))]);
    };
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(
        !n.children().is_empty(),
    ))])
}

fn node_sequence<N: XdmNode>(seq: &XdmSequence<N>) -> Result<Vec<N>, Error> {
    seq.iter()
        .map(|item| match item {
            XdmItem::Node(n) => Ok(n.clone()),
            _ => Err(Error::from_code(ErrorCode::XPTY0004, "expected nodes only")),
        })
        .collect()
}

/// Nodes with no listed descendant, in document order.
pub(super) fn innermost_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let nodes = node_sequence(&args[0])?;
    let set: std::collections::HashSet<N> = nodes.iter().cloned().collect();
    let keep: Vec<N> = nodes
        .into_iter()
        .filter(|n| {
            // A node is innermost when no strict descendant is in the set.
            let mut stack = n.children();
            while let Some(d) = stack.pop() {
                if set.contains(&d) {
                    return false;
                }
                stack.extend(d.children());
            }
            true
        })
        .collect();
    Ok(crate::engine::ops::document_order_dedup(keep)?
        .into_iter()
        .map(XdmItem::Node)
        .collect())
}

/// Nodes with no listed ancestor, in document order.
pub(super) fn outermost_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let nodes = node_sequence(&args[0])?;
    let set: std::collections::HashSet<N> = nodes.iter().cloned().collect();
    let keep: Vec<N> = nodes
        .into_iter()
        .filter(|n| {
            let mut cur = n.parent();
            while let Some(p) = cur {
                if set.contains(&p) {
                    return false;
                }
                cur = p.parent();
            }
            true
        })
        .collect();
    Ok(crate::engine::ops::document_order_dedup(keep)?
        .into_iter()
        .map(XdmItem::Node)
        .collect())
}

/// `fn:path`: an XPath 3.0 path expression locating the node.
pub(super) fn path_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(n) = node_arg_or_context(ctx, args)? else {
        return Ok(Vec::new());
    };
    let mut segments: Vec<String> = Vec::new();
    let mut cur = n.clone();
    while let Some(parent) = cur.parent() {
        let segment = match cur.kind() {
            NodeKind::Element => {
                let name = cur.name().map(|q| q.local).unwrap_or_default();
                let position = parent
                    .children()
                    .iter()
                    .filter(|c| c.kind() == NodeKind::Element && c.name() == cur.name())
                    .position(|c| c == &cur)
                    .map(|i| i + 1)
                    .unwrap_or(1);
                format!("{name}[{position}]")
            }
            NodeKind::Attribute => format!(
                "@{}",
                cur.name().map(|q| q.local).unwrap_or_default()
            ),
            NodeKind::Text => {
                let position = parent
                    .children()
                    .iter()
                    .filter(|c| c.kind() == NodeKind::Text)
                    .position(|c| c == &cur)
                    .map(|i| i + 1)
                    .unwrap_or(1);
                format!("text()[{position}]")
            }
            NodeKind::Comment => "comment()".to_string(),
            NodeKind::ProcessingInstruction => format!(
                "processing-instruction({})",
                cur.name().map(|q| q.local).unwrap_or_default()
            ),
            NodeKind::Namespace => "namespace::*".to_string(),
            NodeKind::Document => String::new(),
        };
        segments.push(segment);
        cur = parent;
    }
    segments.reverse();
    let path = if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    };
    Ok(wrap_string(path))
}
