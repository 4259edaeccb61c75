//! The built-in function library.
//!
//! One module per function family; this module owns the registration
//! tables. Registration is version-gated the same way parser dialects are:
//! each version adds to what the previous one registered. The same walk
//! produces the arity signatures the parser checks `XPST0017` against and
//! the callable registry the evaluator dispatches through.

use std::sync::Arc;

use crate::consts::{ARRAY_NS, FN_NS, MAP_NS, MATH_NS};
use crate::engine::runtime::{
    CallCtx, Error, FunctionRegistry, FunctionSignatures, NativeFn,
};
use crate::model::XdmNode;
use crate::parser::dialects::DialectVersion;
use crate::xdm::XdmSequence;
use crate::xdm::types::{AtomicType, ItemType, Occurrence, SequenceType};

pub mod arrays;
pub mod boolean;
pub mod constructors;
pub mod context;
pub mod datetime;
pub mod durations;
pub mod higher_order;
pub mod maps;
pub mod math;
pub mod nodes;
pub mod numeric;
pub mod qnames;
pub mod regex;
pub mod sequences;
pub mod strings;
pub mod uris;

// Parameter-spec shorthands for the conversion rules.
pub(crate) fn p(t: AtomicType, occ: Occurrence) -> SequenceType {
    SequenceType::atomic(t, occ)
}
pub(crate) fn any(occ: Occurrence) -> SequenceType {
    SequenceType::Typed {
        item: ItemType::AnyItem,
        occ,
    }
}
pub(crate) fn fun(occ: Occurrence) -> SequenceType {
    SequenceType::Typed {
        item: ItemType::AnyFunction,
        occ,
    }
}

use Occurrence::{One, ZeroOrMore, ZeroOrOne};

/// Build the callable registry for a version.
pub fn registry_for<N: XdmNode>(version: DialectVersion) -> FunctionRegistry<N> {
    let mut reg = FunctionRegistry::new();
    register_all::<N>(version, Some(&mut reg), None);
    reg
}

/// Build the static arity table for a version.
pub fn signatures_for(version: DialectVersion) -> FunctionSignatures {
    let mut sigs = FunctionSignatures::default();
    // The signature walk is type-independent; any adapter instantiates it.
    register_all::<crate::model::simple::SimpleNode>(version, None, Some(&mut sigs));
    sigs
}

#[allow(clippy::too_many_lines)]
fn register_all<N: XdmNode>(
    version: DialectVersion,
    mut reg: Option<&mut FunctionRegistry<N>>,
    mut sigs: Option<&mut FunctionSignatures>,
) {
    macro_rules! f {
        ($ns:expr, $local:expr, $min:expr, $max:expr, $params:expr, $body:expr) => {{
            if let Some(s) = sigs.as_deref_mut() {
                s.register($ns, $local, $min, $max);
            }
            if let Some(r) = reg.as_deref_mut() {
                let body: NativeFn<N> = Arc::new($body);
                r.register($ns, $local, $min, $max, $params, body);
            }
        }};
    }

    // ===== XPath 1.0 core =====
    f!(FN_NS, "true", 0, Some(0), None, boolean::true_fn::<N>);
    f!(FN_NS, "false", 0, Some(0), None, boolean::false_fn::<N>);
    f!(FN_NS, "not", 1, Some(1), Some(vec![any(ZeroOrMore)]), boolean::not_fn::<N>);
    f!(FN_NS, "boolean", 1, Some(1), Some(vec![any(ZeroOrMore)]), boolean::boolean_fn::<N>);
    f!(FN_NS, "position", 0, Some(0), None, context::position_fn::<N>);
    f!(FN_NS, "last", 0, Some(0), None, context::last_fn::<N>);
    f!(FN_NS, "count", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::count_fn::<N>);
    f!(FN_NS, "number", 0, Some(1), None, numeric::number_fn::<N>);
    f!(FN_NS, "sum", 1, Some(2), None, numeric::sum_fn::<N>);
    f!(FN_NS, "floor", 1, Some(1), None, numeric::floor_fn::<N>);
    f!(FN_NS, "ceiling", 1, Some(1), None, numeric::ceiling_fn::<N>);
    f!(FN_NS, "round", 1, Some(2), None, numeric::round_fn::<N>);
    f!(FN_NS, "string", 0, Some(1), None, strings::string_fn::<N>);
    f!(FN_NS, "concat", 2, None, None, strings::concat_fn::<N>);
    f!(
        FN_NS, "starts-with", 2, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One)]),
        strings::starts_with_fn::<N>
    );
    f!(
        FN_NS, "ends-with", 2, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One)]),
        strings::ends_with_fn::<N>
    );
    f!(
        FN_NS, "contains", 2, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One)]),
        strings::contains_fn::<N>
    );
    f!(
        FN_NS, "substring-before", 2, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One)]),
        strings::substring_before_fn::<N>
    );
    f!(
        FN_NS, "substring-after", 2, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One)]),
        strings::substring_after_fn::<N>
    );
    f!(
        FN_NS, "substring", 2, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::Double, One), p(AtomicType::Double, One)]),
        strings::substring_fn::<N>
    );
    f!(FN_NS, "string-length", 0, Some(1), None, strings::string_length_fn::<N>);
    f!(FN_NS, "normalize-space", 0, Some(1), None, strings::normalize_space_fn::<N>);
    f!(
        FN_NS, "translate", 3, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One), p(AtomicType::String, One)]),
        strings::translate_fn::<N>
    );
    f!(FN_NS, "lang", 1, Some(2), None, nodes::lang_fn::<N>);
    f!(FN_NS, "name", 0, Some(1), None, nodes::name_fn::<N>);
    f!(FN_NS, "local-name", 0, Some(1), None, nodes::local_name_fn::<N>);
    f!(FN_NS, "namespace-uri", 0, Some(1), None, nodes::namespace_uri_fn::<N>);
    f!(FN_NS, "id", 1, Some(2), None, nodes::id_fn::<N>);

    if version < DialectVersion::V2_0 {
        return;
    }

    // ===== XPath 2.0 =====
    f!(FN_NS, "abs", 1, Some(1), None, numeric::abs_fn::<N>);
    f!(FN_NS, "round-half-to-even", 1, Some(2), None, numeric::round_half_to_even_fn::<N>);
    f!(FN_NS, "avg", 1, Some(1), None, numeric::avg_fn::<N>);
    f!(FN_NS, "max", 1, Some(2), None, numeric::max_fn::<N>);
    f!(FN_NS, "min", 1, Some(2), None, numeric::min_fn::<N>);
    f!(
        FN_NS, "string-join", 1, Some(2),
        Some(vec![p(AtomicType::String, ZeroOrMore), p(AtomicType::String, One)]),
        strings::string_join_fn::<N>
    );
    f!(FN_NS, "upper-case", 1, Some(1), Some(vec![p(AtomicType::String, ZeroOrOne)]), strings::upper_case_fn::<N>);
    f!(FN_NS, "lower-case", 1, Some(1), Some(vec![p(AtomicType::String, ZeroOrOne)]), strings::lower_case_fn::<N>);
    f!(
        FN_NS, "codepoints-to-string", 1, Some(1),
        Some(vec![p(AtomicType::Integer, ZeroOrMore)]),
        strings::codepoints_to_string_fn::<N>
    );
    f!(
        FN_NS, "string-to-codepoints", 1, Some(1),
        Some(vec![p(AtomicType::String, ZeroOrOne)]),
        strings::string_to_codepoints_fn::<N>
    );
    f!(
        FN_NS, "codepoint-equal", 2, Some(2),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, ZeroOrOne)]),
        strings::codepoint_equal_fn::<N>
    );
    f!(
        FN_NS, "compare", 2, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One)]),
        strings::compare_fn::<N>
    );
    f!(
        FN_NS, "normalize-unicode", 1, Some(2),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One)]),
        strings::normalize_unicode_fn::<N>
    );
    f!(
        FN_NS, "matches", 2, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One), p(AtomicType::String, One)]),
        regex::matches_fn::<N>
    );
    f!(
        FN_NS, "replace", 3, Some(4),
        Some(vec![
            p(AtomicType::String, ZeroOrOne),
            p(AtomicType::String, One),
            p(AtomicType::String, One),
            p(AtomicType::String, One),
        ]),
        regex::replace_fn::<N>
    );
    f!(
        FN_NS, "tokenize", 1, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrOne), p(AtomicType::String, One), p(AtomicType::String, One)]),
        regex::tokenize_fn::<N>
    );
    f!(FN_NS, "empty", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::empty_fn::<N>);
    f!(FN_NS, "exists", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::exists_fn::<N>);
    f!(FN_NS, "reverse", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::reverse_fn::<N>);
    f!(
        FN_NS, "insert-before", 3, Some(3),
        Some(vec![any(ZeroOrMore), p(AtomicType::Integer, One), any(ZeroOrMore)]),
        sequences::insert_before_fn::<N>
    );
    f!(
        FN_NS, "remove", 2, Some(2),
        Some(vec![any(ZeroOrMore), p(AtomicType::Integer, One)]),
        sequences::remove_fn::<N>
    );
    f!(
        FN_NS, "subsequence", 2, Some(3),
        Some(vec![any(ZeroOrMore), p(AtomicType::Double, One), p(AtomicType::Double, One)]),
        sequences::subsequence_fn::<N>
    );
    f!(FN_NS, "distinct-values", 1, Some(2), None, sequences::distinct_values_fn::<N>);
    f!(FN_NS, "index-of", 2, Some(3), None, sequences::index_of_fn::<N>);
    f!(FN_NS, "deep-equal", 2, Some(3), None, sequences::deep_equal_fn::<N>);
    f!(FN_NS, "zero-or-one", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::zero_or_one_fn::<N>);
    f!(FN_NS, "one-or-more", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::one_or_more_fn::<N>);
    f!(FN_NS, "exactly-one", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::exactly_one_fn::<N>);
    f!(FN_NS, "data", 0, Some(1), None, sequences::data_fn::<N>);
    f!(FN_NS, "unordered", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::unordered_fn::<N>);
    f!(FN_NS, "error", 0, Some(3), None, sequences::error_fn::<N>);
    f!(FN_NS, "trace", 1, Some(2), None, sequences::trace_fn::<N>);
    f!(FN_NS, "current-dateTime", 0, Some(0), None, datetime::current_date_time_fn::<N>);
    f!(FN_NS, "current-date", 0, Some(0), None, datetime::current_date_fn::<N>);
    f!(FN_NS, "current-time", 0, Some(0), None, datetime::current_time_fn::<N>);
    f!(FN_NS, "implicit-timezone", 0, Some(0), None, datetime::implicit_timezone_fn::<N>);
    f!(FN_NS, "dateTime", 2, Some(2), None, datetime::date_time_fn::<N>);
    for component in [
        "year-from-dateTime",
        "month-from-dateTime",
        "day-from-dateTime",
        "hours-from-dateTime",
        "minutes-from-dateTime",
        "seconds-from-dateTime",
        "timezone-from-dateTime",
        "year-from-date",
        "month-from-date",
        "day-from-date",
        "timezone-from-date",
        "hours-from-time",
        "minutes-from-time",
        "seconds-from-time",
        "timezone-from-time",
    ] {
        f!(FN_NS, component, 1, Some(1), None, datetime::component_impl::<N>(component));
    }
    for adjust in [
        "adjust-dateTime-to-timezone",
        "adjust-date-to-timezone",
        "adjust-time-to-timezone",
    ] {
        f!(FN_NS, adjust, 1, Some(2), None, datetime::adjust_impl::<N>());
    }
    for component in [
        "years-from-duration",
        "months-from-duration",
        "days-from-duration",
        "hours-from-duration",
        "minutes-from-duration",
        "seconds-from-duration",
    ] {
        f!(FN_NS, component, 1, Some(1), None, durations::component_impl::<N>(component));
    }
    f!(FN_NS, "QName", 2, Some(2), None, qnames::qname_fn::<N>);
    f!(FN_NS, "resolve-QName", 2, Some(2), None, qnames::resolve_qname_fn::<N>);
    f!(FN_NS, "local-name-from-QName", 1, Some(1), None, qnames::local_name_from_qname_fn::<N>);
    f!(FN_NS, "namespace-uri-from-QName", 1, Some(1), None, qnames::namespace_uri_from_qname_fn::<N>);
    f!(FN_NS, "prefix-from-QName", 1, Some(1), None, qnames::prefix_from_qname_fn::<N>);
    f!(FN_NS, "namespace-uri-for-prefix", 2, Some(2), None, qnames::namespace_uri_for_prefix_fn::<N>);
    f!(FN_NS, "in-scope-prefixes", 1, Some(1), None, qnames::in_scope_prefixes_fn::<N>);
    f!(FN_NS, "resolve-uri", 1, Some(2), None, uris::resolve_uri_fn::<N>);
    f!(FN_NS, "encode-for-uri", 1, Some(1), Some(vec![p(AtomicType::String, ZeroOrOne)]), uris::encode_for_uri_fn::<N>);
    f!(FN_NS, "iri-to-uri", 1, Some(1), Some(vec![p(AtomicType::String, ZeroOrOne)]), uris::iri_to_uri_fn::<N>);
    f!(FN_NS, "escape-html-uri", 1, Some(1), Some(vec![p(AtomicType::String, ZeroOrOne)]), uris::escape_html_uri_fn::<N>);
    f!(FN_NS, "static-base-uri", 0, Some(0), None, uris::static_base_uri_fn::<N>);
    f!(FN_NS, "default-collation", 0, Some(0), None, context::default_collation_fn::<N>);
    f!(FN_NS, "doc", 1, Some(1), None, context::doc_fn::<N>);
    f!(FN_NS, "doc-available", 1, Some(1), None, context::doc_available_fn::<N>);
    f!(FN_NS, "root", 0, Some(1), None, nodes::root_fn::<N>);
    f!(FN_NS, "base-uri", 0, Some(1), None, nodes::base_uri_fn::<N>);
    f!(FN_NS, "document-uri", 0, Some(1), None, nodes::document_uri_fn::<N>);
    f!(FN_NS, "node-name", 0, Some(1), None, nodes::node_name_fn::<N>);
    f!(FN_NS, "nilled", 1, Some(1), None, nodes::nilled_fn::<N>);

    // Constructor functions for every castable atomic type.
    constructors::register::<N>(&mut reg, &mut sigs);

    if version < DialectVersion::V3_0 {
        return;
    }

    // ===== XPath 3.0 =====
    f!(FN_NS, "head", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::head_fn::<N>);
    f!(FN_NS, "tail", 1, Some(1), Some(vec![any(ZeroOrMore)]), sequences::tail_fn::<N>);
    f!(FN_NS, "analyze-string", 2, Some(3), None, regex::analyze_string_fn::<N>);
    f!(FN_NS, "generate-id", 0, Some(1), None, nodes::generate_id_fn::<N>);
    f!(FN_NS, "has-children", 0, Some(1), None, nodes::has_children_fn::<N>);
    f!(FN_NS, "innermost", 1, Some(1), None, nodes::innermost_fn::<N>);
    f!(FN_NS, "outermost", 1, Some(1), None, nodes::outermost_fn::<N>);
    f!(FN_NS, "path", 0, Some(1), None, nodes::path_fn::<N>);
    f!(FN_NS, "for-each", 2, Some(2), Some(vec![any(ZeroOrMore), fun(One)]), higher_order::for_each_fn::<N>);
    f!(FN_NS, "filter", 2, Some(2), Some(vec![any(ZeroOrMore), fun(One)]), higher_order::filter_fn::<N>);
    f!(
        FN_NS, "fold-left", 3, Some(3),
        Some(vec![any(ZeroOrMore), any(ZeroOrMore), fun(One)]),
        higher_order::fold_left_fn::<N>
    );
    f!(
        FN_NS, "fold-right", 3, Some(3),
        Some(vec![any(ZeroOrMore), any(ZeroOrMore), fun(One)]),
        higher_order::fold_right_fn::<N>
    );
    f!(
        FN_NS, "for-each-pair", 3, Some(3),
        Some(vec![any(ZeroOrMore), any(ZeroOrMore), fun(One)]),
        higher_order::for_each_pair_fn::<N>
    );
    f!(FN_NS, "function-lookup", 2, Some(2), None, higher_order::function_lookup_fn::<N>);
    f!(FN_NS, "function-name", 1, Some(1), Some(vec![fun(One)]), higher_order::function_name_fn::<N>);
    f!(FN_NS, "function-arity", 1, Some(1), Some(vec![fun(One)]), higher_order::function_arity_fn::<N>);
    f!(MATH_NS, "pi", 0, Some(0), None, math::pi_fn::<N>);
    for unary in [
        "exp", "exp10", "log", "log10", "sqrt", "sin", "cos", "tan", "asin", "acos", "atan",
    ] {
        f!(MATH_NS, unary, 1, Some(1), Some(vec![p(AtomicType::Double, ZeroOrOne)]), math::unary_impl::<N>(unary));
    }
    f!(
        MATH_NS, "pow", 2, Some(2),
        Some(vec![p(AtomicType::Double, ZeroOrOne), p(AtomicType::Double, One)]),
        math::pow_fn::<N>
    );
    f!(
        MATH_NS, "atan2", 2, Some(2),
        Some(vec![p(AtomicType::Double, One), p(AtomicType::Double, One)]),
        math::atan2_fn::<N>
    );

    if version < DialectVersion::V3_1 {
        return;
    }

    // ===== XPath 3.1 =====
    f!(
        FN_NS, "contains-token", 2, Some(3),
        Some(vec![p(AtomicType::String, ZeroOrMore), p(AtomicType::String, One), p(AtomicType::String, One)]),
        strings::contains_token_fn::<N>
    );
    f!(FN_NS, "apply", 2, Some(2), None, higher_order::apply_fn::<N>);
    f!(FN_NS, "sort", 1, Some(3), None, higher_order::sort_fn::<N>);
    f!(MAP_NS, "size", 1, Some(1), None, maps::size_fn::<N>);
    f!(MAP_NS, "keys", 1, Some(1), None, maps::keys_fn::<N>);
    f!(MAP_NS, "contains", 2, Some(2), None, maps::contains_fn::<N>);
    f!(MAP_NS, "get", 2, Some(2), None, maps::get_fn::<N>);
    f!(MAP_NS, "put", 3, Some(3), None, maps::put_fn::<N>);
    f!(MAP_NS, "entry", 2, Some(2), None, maps::entry_fn::<N>);
    f!(MAP_NS, "remove", 2, Some(2), None, maps::remove_fn::<N>);
    f!(MAP_NS, "merge", 1, Some(2), None, maps::merge_fn::<N>);
    f!(MAP_NS, "for-each", 2, Some(2), None, maps::for_each_fn::<N>);
    f!(MAP_NS, "find", 2, Some(2), None, maps::find_fn::<N>);
    f!(ARRAY_NS, "size", 1, Some(1), None, arrays::size_fn::<N>);
    f!(ARRAY_NS, "get", 2, Some(2), None, arrays::get_fn::<N>);
    f!(ARRAY_NS, "put", 3, Some(3), None, arrays::put_fn::<N>);
    f!(ARRAY_NS, "append", 2, Some(2), None, arrays::append_fn::<N>);
    f!(ARRAY_NS, "subarray", 2, Some(3), None, arrays::subarray_fn::<N>);
    f!(ARRAY_NS, "remove", 2, Some(2), None, arrays::remove_fn::<N>);
    f!(ARRAY_NS, "insert-before", 3, Some(3), None, arrays::insert_before_fn::<N>);
    f!(ARRAY_NS, "head", 1, Some(1), None, arrays::head_fn::<N>);
    f!(ARRAY_NS, "tail", 1, Some(1), None, arrays::tail_fn::<N>);
    f!(ARRAY_NS, "reverse", 1, Some(1), None, arrays::reverse_fn::<N>);
    f!(ARRAY_NS, "join", 1, Some(1), None, arrays::join_fn::<N>);
    f!(ARRAY_NS, "flatten", 1, Some(1), None, arrays::flatten_fn::<N>);
    f!(ARRAY_NS, "for-each", 2, Some(2), None, arrays::for_each_fn::<N>);
    f!(ARRAY_NS, "filter", 2, Some(2), None, arrays::filter_fn::<N>);
    f!(ARRAY_NS, "fold-left", 3, Some(3), None, arrays::fold_left_fn::<N>);
    f!(ARRAY_NS, "fold-right", 3, Some(3), None, arrays::fold_right_fn::<N>);
    f!(ARRAY_NS, "for-each-pair", 3, Some(3), None, arrays::for_each_pair_fn::<N>);
    f!(ARRAY_NS, "sort", 1, Some(3), None, arrays::sort_fn::<N>);
}

/// Atomize an argument and insist on at most one value.
pub(crate) fn opt_atom<N: XdmNode>(
    seq: &XdmSequence<N>,
) -> Result<Option<crate::xdm::XdmAtomicValue>, Error> {
    let atoms = crate::xdm::atomize(seq)?;
    match atoms.len() {
        0 => Ok(None),
        1 => Ok(atoms.into_iter().next()),
        n => Err(Error::from_code(
            crate::engine::runtime::ErrorCode::XPTY0004,
            format!("expected at most one atomic value, got {n}"),
        )),
    }
}

/// Optional string argument (zero-or-one, already converted or atomizable).
pub(crate) fn opt_string<N: XdmNode>(seq: &XdmSequence<N>) -> Result<Option<String>, Error> {
    Ok(opt_atom(seq)?.map(|a| a.string_value()))
}

/// A `node()?` argument defaulting to the context item (name(), root(), …).
pub(crate) fn node_arg_or_context<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<Option<N>, Error> {
    use crate::engine::runtime::ErrorCode;
    use crate::xdm::XdmItem;
    let item = match args.first() {
        Some(seq) => match seq.as_slice() {
            [] => return Ok(None),
            [item] => item.clone(),
            _ => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "expected at most one node",
                ));
            }
        },
        None => ctx.focus.item_or_absent()?.clone(),
    };
    match item {
        XdmItem::Node(n) => Ok(Some(n)),
        _ => Err(Error::from_code(ErrorCode::XPTY0004, "expected a node")),
    }
}

/// Shared helper: the string value of an optional first argument, with the
/// context item as the default (string(), string-length(), …).
pub(crate) fn arg_or_context_string<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<Option<String>, Error> {
    match args.first() {
        Some(seq) => match seq.as_slice() {
            [] => Ok(None),
            [item] => Ok(Some(crate::xdm::item_string_value(item)?)),
            _ => Err(Error::from_code(
                crate::engine::runtime::ErrorCode::XPTY0004,
                "expected at most one item",
            )),
        },
        None => {
            let item = ctx.focus.item_or_absent()?;
            Ok(Some(crate::xdm::item_string_value(item)?))
        }
    }
}
