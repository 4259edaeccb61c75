//! Regular expression functions over the XPath F&O regex flavor.
//!
//! Patterns are translated onto `fancy-regex`. The supported flags are
//! `s m i x q`: `q` turns the pattern into a literal, `x` strips unescaped
//! whitespace outside character classes. Back-references work through the
//! backtracking engine; the character-class subtraction syntax
//! (`[a-z-[aeiou]]`) is not translated and surfaces as `FORX0002`.

use std::sync::Arc;

use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmArray, XdmAtomicValue, XdmItem, XdmMap, XdmSequence};

use super::opt_string;

pub(crate) fn build_regex(pattern: &str, flags: &str) -> Result<fancy_regex::Regex, Error> {
    let mut literal = false;
    let mut free_spacing = false;
    let mut builder_flags = String::new();
    for f in flags.chars() {
        match f {
            'q' => literal = true,
            'x' => free_spacing = true,
            's' | 'm' | 'i' => builder_flags.push(f),
            other => {
                return Err(Error::from_code(
                    ErrorCode::FORX0001,
                    format!("invalid regex flag {other:?}"),
                ));
            }
        }
    }
    let mut pat = if literal {
        escape_literal(pattern)
    } else if free_spacing {
        strip_free_spacing(pattern)
    } else {
        pattern.to_string()
    };
    if !builder_flags.is_empty() {
        pat = format!("(?{builder_flags}){pat}");
    }
    fancy_regex::Regex::new(&pat).map_err(|e| {
        Error::from_code(
            ErrorCode::FORX0002,
            format!("invalid regex pattern {pattern:?}"),
        )
        .with_source(Arc::new(e))
    })
}

fn escape_literal(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        if "\\.^$*+?()[]{}|-".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Remove unescaped whitespace outside character classes (flag `x`).
fn strip_free_spacing(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut in_class = false;
    let mut escaped = false;
    for c in pattern.chars() {
        if escaped {
            out.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                out.push(c);
                escaped = true;
            }
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            c if c.is_whitespace() && !in_class => {}
            c => out.push(c),
        }
    }
    out
}

pub(super) fn matches_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let input = opt_string(&args[0])?.unwrap_or_default();
    let pattern = opt_string(&args[1])?.unwrap_or_default();
    let flags = match args.get(2) {
        Some(seq) => opt_string(seq)?.unwrap_or_default(),
        None => String::new(),
    };
    let re = build_regex(&pattern, &flags)?;
    let hit = re.is_match(&input).map_err(|e| {
        Error::from_code(ErrorCode::FORX0002, "regex evaluation failed").with_source(Arc::new(e))
    })?;
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(hit))])
}

/// Expand `$n` group references; `\$` and `\\` are the only escapes.
fn expand_replacement(
    replacement: &str,
    caps: &fancy_regex::Captures<'_>,
    group_count: usize,
) -> Result<String, Error> {
    let chars: Vec<char> = replacement.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let next = chars.get(i + 1).ok_or_else(|| {
                    Error::from_code(ErrorCode::FORX0004, "dangling backslash in replacement")
                })?;
                if *next != '\\' && *next != '$' {
                    return Err(Error::from_code(
                        ErrorCode::FORX0004,
                        format!("invalid escape \\{next} in replacement"),
                    ));
                }
                out.push(*next);
                i += 2;
            }
            '$' => {
                // Longest digit run that still names an existing group.
                let mut j = i + 1;
                let mut group: Option<usize> = None;
                let mut end = j;
                while j < chars.len() && chars[j].is_ascii_digit() {
                    let candidate = group.unwrap_or(0) * 10 + chars[j].to_digit(10).expect("digit") as usize;
                    if candidate <= group_count {
                        group = Some(candidate);
                        end = j + 1;
                        j += 1;
                    } else {
                        break;
                    }
                }
                let Some(g) = group else {
                    return Err(Error::from_code(
                        ErrorCode::FORX0004,
                        "$ must be followed by a group number in replacement",
                    ));
                };
                if let Some(m) = caps.get(g) {
                    out.push_str(m.as_str());
                }
                i = end;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

pub(super) fn replace_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let input = opt_string(&args[0])?.unwrap_or_default();
    let pattern = opt_string(&args[1])?.unwrap_or_default();
    let replacement = opt_string(&args[2])?.unwrap_or_default();
    let flags = match args.get(3) {
        Some(seq) => opt_string(seq)?.unwrap_or_default(),
        None => String::new(),
    };
    let re = build_regex(&pattern, &flags)?;
    let mut out = String::new();
    let mut last = 0usize;
    for caps in re.captures_iter(&input) {
        let caps = caps.map_err(|e| {
            Error::from_code(ErrorCode::FORX0002, "regex evaluation failed")
                .with_source(Arc::new(e))
        })?;
        let group_count = caps.len().saturating_sub(1);
        let m = caps.get(0).expect("overall match");
        if m.start() == m.end() {
            return Err(Error::from_code(
                ErrorCode::FORX0003,
                "pattern matches the zero-length string",
            ));
        }
        out.push_str(&input[last..m.start()]);
        out.push_str(&expand_replacement(&replacement, &caps, group_count)?);
        last = m.end();
    }
    out.push_str(&input[last..]);
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::String(out))])
}

pub(super) fn tokenize_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let input = opt_string(&args[0])?.unwrap_or_default();
    // The single-argument form splits on whitespace after trimming.
    let (input, pattern, flags) = if args.len() == 1 {
        (
            input.trim().to_string(),
            " ".to_string(),
            String::new(),
        )
    } else {
        let pattern = opt_string(&args[1])?.unwrap_or_default();
        let flags = match args.get(2) {
            Some(seq) => opt_string(seq)?.unwrap_or_default(),
            None => String::new(),
        };
        (input, pattern, flags)
    };
    if input.is_empty() {
        return Ok(Vec::new());
    }
    let re = build_regex(&pattern, &flags)?;
    if re.is_match("").unwrap_or(false) {
        return Err(Error::from_code(
            ErrorCode::FORX0003,
            "tokenize pattern matches the zero-length string",
        ));
    }
    let mut out = Vec::new();
    for part in re.split(&input) {
        let part = part.map_err(|e| {
            Error::from_code(ErrorCode::FORX0002, "regex evaluation failed")
                .with_source(Arc::new(e))
        })?;
        out.push(XdmItem::Atomic(XdmAtomicValue::String(part.to_string())));
    }
    Ok(out)
}

/// `fn:analyze-string`, rendered as a sequence of maps instead of
/// constructed elements (the tree adapter has no node construction):
/// each map carries `is-match`, `string`, and for matches a `groups`
/// array of captured strings.
pub(super) fn analyze_string_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let input = opt_string(&args[0])?.unwrap_or_default();
    let pattern = opt_string(&args[1])?.unwrap_or_default();
    let flags = match args.get(2) {
        Some(seq) => opt_string(seq)?.unwrap_or_default(),
        None => String::new(),
    };
    let re = build_regex(&pattern, &flags)?;
    if re.is_match("").unwrap_or(false) {
        return Err(Error::from_code(
            ErrorCode::FORX0003,
            "analyze-string pattern matches the zero-length string",
        ));
    }
    let part = |is_match: bool, text: &str, groups: Option<XdmArray<N>>| -> Result<XdmItem<N>, Error> {
        let mut entries: Vec<(XdmAtomicValue, XdmSequence<N>)> = vec![
            (
                XdmAtomicValue::String("is-match".into()),
                vec![XdmItem::Atomic(XdmAtomicValue::Boolean(is_match))],
            ),
            (
                XdmAtomicValue::String("string".into()),
                vec![XdmItem::Atomic(XdmAtomicValue::String(text.to_string()))],
            ),
        ];
        if let Some(g) = groups {
            entries.push((
                XdmAtomicValue::String("groups".into()),
                vec![XdmItem::Array(g)],
            ));
        }
        Ok(XdmItem::Map(XdmMap::from_entries(entries)?))
    };
    let mut out = Vec::new();
    let mut last = 0usize;
    for caps in re.captures_iter(&input) {
        let caps = caps.map_err(|e| {
            Error::from_code(ErrorCode::FORX0002, "regex evaluation failed")
                .with_source(Arc::new(e))
        })?;
        let m = caps.get(0).expect("overall match");
        if m.start() > last {
            out.push(part(false, &input[last..m.start()], None)?);
        }
        let groups: Vec<XdmSequence<N>> = (1..caps.len())
            .map(|g| {
                vec![XdmItem::Atomic(XdmAtomicValue::String(
                    caps.get(g).map(|m| m.as_str().to_string()).unwrap_or_default(),
                ))]
            })
            .collect();
        out.push(part(true, m.as_str(), Some(XdmArray::new(groups)))?);
        last = m.end();
    }
    if last < input.len() {
        out.push(part(false, &input[last..], None)?);
    }
    Ok(out)
}
