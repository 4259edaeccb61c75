//! QName functions.

use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::{NodeKind, XdmNode};
use crate::xdm::cast::is_ncname;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

use super::{opt_atom, opt_string};

pub(super) fn qname_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let uri = opt_string(&args[0])?.filter(|u| !u.is_empty());
    let lexical = opt_string(&args[1])?.unwrap_or_default();
    let (prefix, local) = match lexical.split_once(':') {
        Some((p, l)) => (Some(p.to_string()), l.to_string()),
        None => (None, lexical.clone()),
    };
    if !is_ncname(&local) || prefix.as_deref().is_some_and(|p| !is_ncname(p)) {
        return Err(Error::from_code(
            ErrorCode::FOCA0002,
            format!("{lexical:?} is not a lexical QName"),
        ));
    }
    if prefix.is_some() && uri.is_none() {
        return Err(Error::from_code(
            ErrorCode::FOCA0002,
            "a prefixed QName needs a namespace URI",
        ));
    }
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::QName {
        prefix,
        ns_uri: uri,
        local,
    })])
}

/// `fn:resolve-QName`: resolve a lexical QName against the in-scope
/// namespaces of an element.
pub(super) fn resolve_qname_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(lexical) = opt_string(&args[0])? else {
        return Ok(Vec::new());
    };
    let element = match args[1].as_slice() {
        [XdmItem::Node(n)] if n.kind() == NodeKind::Element => n.clone(),
        _ => {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                "resolve-QName requires an element",
            ));
        }
    };
    let (prefix, local) = match lexical.split_once(':') {
        Some((p, l)) => (Some(p.to_string()), l.to_string()),
        None => (None, lexical.clone()),
    };
    if !is_ncname(&local) || prefix.as_deref().is_some_and(|p| !is_ncname(p)) {
        return Err(Error::from_code(
            ErrorCode::FOCA0002,
            format!("{lexical:?} is not a lexical QName"),
        ));
    }
    let ns_uri = match &prefix {
        Some(p) => Some(element.lookup_namespace_uri(p).ok_or_else(|| {
            Error::from_code(
                ErrorCode::FONS0004,
                format!("no in-scope namespace for prefix {p:?}"),
            )
        })?),
        None => None,
    };
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::QName {
        prefix,
        ns_uri,
        local,
    })])
}

fn qname_arg<N: XdmNode>(
    args: &[XdmSequence<N>],
) -> Result<Option<(Option<String>, Option<String>, String)>, Error> {
    match opt_atom(&args[0])? {
        None => Ok(None),
        Some(XdmAtomicValue::QName {
            prefix,
            ns_uri,
            local,
        }) => Ok(Some((prefix, ns_uri, local))),
        Some(other) => Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("expected xs:QName, got xs:{}", other.type_of().local_name()),
        )),
    }
}

pub(super) fn local_name_from_qname_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(match qname_arg(args)? {
        None => Vec::new(),
        Some((_, _, local)) => vec![XdmItem::Atomic(XdmAtomicValue::NCName(local))],
    })
}

pub(super) fn namespace_uri_from_qname_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(match qname_arg(args)? {
        None => Vec::new(),
        Some((_, ns_uri, _)) => vec![XdmItem::Atomic(XdmAtomicValue::AnyUri(
            ns_uri.unwrap_or_default(),
        ))],
    })
}

pub(super) fn prefix_from_qname_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(match qname_arg(args)? {
        Some((Some(prefix), _, _)) => vec![XdmItem::Atomic(XdmAtomicValue::NCName(prefix))],
        _ => Vec::new(),
    })
}

pub(super) fn namespace_uri_for_prefix_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let prefix = opt_string(&args[0])?.unwrap_or_default();
    let element = match args[1].as_slice() {
        [XdmItem::Node(n)] if n.kind() == NodeKind::Element => n.clone(),
        _ => {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                "namespace-uri-for-prefix requires an element",
            ));
        }
    };
    Ok(element
        .lookup_namespace_uri(&prefix)
        .map(|u| XdmItem::Atomic(XdmAtomicValue::AnyUri(u)))
        .into_iter()
        .collect())
}

pub(super) fn in_scope_prefixes_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let element = match args[0].as_slice() {
        [XdmItem::Node(n)] if n.kind() == NodeKind::Element => n.clone(),
        _ => {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                "in-scope-prefixes requires an element",
            ));
        }
    };
    let mut prefixes = vec!["xml".to_string()];
    let mut cur = Some(element);
    while let Some(n) = cur {
        for ns in n.namespaces() {
            if let Some(q) = ns.name()
                && !prefixes.contains(&q.local)
            {
                prefixes.push(q.local);
            }
        }
        cur = n.parent();
    }
    Ok(prefixes
        .into_iter()
        .map(|p| XdmItem::Atomic(XdmAtomicValue::NCName(p)))
        .collect())
}
