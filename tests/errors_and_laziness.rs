//! Error surface and the lazy `select` contract.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use xdmpath::engine::runtime::DynamicContextBuilder;
use xdmpath::model::simple::SimpleNode;
use xdmpath::parser::dialects::DialectVersion;
use xdmpath::parser::parse_xpath;
use xdmpath::{ErrorCode, XdmItem};

use common::{eval, ints};

#[test]
fn absent_context_item_is_xpdy0002() {
    let err = eval(".", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::XPDY0002));
    let err = eval("position()", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::XPDY0002));
    let err = eval("/a", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::XPDY0002));
}

#[test]
fn unknown_function_at_runtime_registry() {
    // Statically known (caller-declared signature) but absent from the
    // runtime registry.
    let static_ctx = xdmpath::StaticContextBuilder::new()
        .function_signature("urn:me", "mine", 0, Some(0))
        .namespace("me", "urn:me")
        .build();
    let parsed =
        xdmpath::parse_with_context("me:mine()", DialectVersion::V2_0, &static_ctx).unwrap();
    let ctx = DynamicContextBuilder::<SimpleNode>::new().build();
    let err = parsed.evaluate(&ctx).unwrap_err();
    assert!(err.is_code(ErrorCode::XPST0017));
}

#[test]
fn errors_carry_spans_and_codes() {
    let err = eval("1 + (2 div 0)", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FOAR0001));
    let span = err.span.expect("span recorded");
    // The span covers the failing division, not the whole expression.
    assert!(span.start >= 4);
    assert_eq!(err.format_code(), "err:FOAR0001");
}

#[test]
fn user_supplied_variables_via_context() {
    let static_ctx = xdmpath::StaticContextBuilder::new()
        .variable(xdmpath::ExpandedName::local("n"))
        .build();
    let parsed = xdmpath::parse_with_context("$n * 2", DialectVersion::V2_0, &static_ctx).unwrap();
    let ctx = DynamicContextBuilder::<SimpleNode>::new()
        .variable(
            xdmpath::ExpandedName::local("n"),
            vec![XdmItem::Atomic(xdmpath::XdmAtomicValue::Integer(21))],
        )
        .build();
    assert_eq!(ints(&parsed.evaluate(&ctx).unwrap()), vec![42]);
    // Bound statically but missing dynamically: XPST0008 at evaluation.
    let empty = DynamicContextBuilder::<SimpleNode>::new().build();
    let err = parsed.evaluate(&empty).unwrap_err();
    assert!(err.is_code(ErrorCode::XPST0008));
}

#[test]
fn cancellation_flag_stops_evaluation() {
    let parsed = parse_xpath("sum(1 to 100000)", DialectVersion::V2_0).unwrap();
    let flag = Arc::new(AtomicBool::new(true));
    let ctx = DynamicContextBuilder::<SimpleNode>::new()
        .cancel_flag(flag.clone())
        .build();
    let err = parsed.evaluate(&ctx).unwrap_err();
    assert!(err.is_code(ErrorCode::FOER0000));
    // Cleared flag evaluates normally.
    flag.store(false, Ordering::Relaxed);
    assert!(parsed.evaluate(&ctx).is_ok());
}

#[test]
fn select_streams_ranges_lazily() {
    let parsed = parse_xpath("1 to 1000000000", DialectVersion::V2_0).unwrap();
    let ctx = DynamicContextBuilder::<SimpleNode>::new().build();
    // Materializing a billion integers would be hopeless; streaming the
    // first three must be instant.
    let first: Vec<i64> = parsed
        .select(&ctx)
        .take(3)
        .map(|r| match r.unwrap() {
            XdmItem::Atomic(a) => a.integer_value().unwrap(),
            other => panic!("unexpected item {other:?}"),
        })
        .collect();
    assert_eq!(first, vec![1, 2, 3]);
}

#[test]
fn select_defers_errors_in_later_branches() {
    let parsed = parse_xpath("1, 2, 1 div 0", DialectVersion::V2_0).unwrap();
    let ctx = DynamicContextBuilder::<SimpleNode>::new().build();
    let mut stream = parsed.select(&ctx);
    assert!(stream.next().unwrap().is_ok());
    assert!(stream.next().unwrap().is_ok());
    let third = stream.next().unwrap();
    assert!(third.unwrap_err().is_code(ErrorCode::FOAR0001));
}

#[test]
fn select_and_evaluate_agree() {
    let parsed = parse_xpath("(1 to 4)[. mod 2 = 0]", DialectVersion::V2_0).unwrap();
    let ctx = DynamicContextBuilder::<SimpleNode>::new().build();
    let streamed: Vec<_> = parsed.select(&ctx).map(|r| r.unwrap()).collect();
    let materialized = parsed.evaluate(&ctx).unwrap();
    assert_eq!(streamed, materialized);
}

#[test]
fn parse_is_reusable_across_evaluations() {
    let parsed = parse_xpath("2 + 3", DialectVersion::V2_0).unwrap();
    let ctx = DynamicContextBuilder::<SimpleNode>::new().build();
    for _ in 0..3 {
        assert_eq!(ints(&parsed.evaluate(&ctx).unwrap()), vec![5]);
    }
}

#[test]
fn doc_consults_cache_and_loader_only() {
    use common::abc_tree;
    let parsed = parse_xpath("doc('urn:doc:a')//C2", DialectVersion::V2_0).unwrap();
    // Cached document: served without any loader.
    let ctx = DynamicContextBuilder::new()
        .document("urn:doc:a", abc_tree())
        .build();
    assert_eq!(parsed.evaluate(&ctx).unwrap().len(), 1);
    // No cache entry and no loader: FODC0002, never implicit I/O.
    let empty = DynamicContextBuilder::<SimpleNode>::new().build();
    let err = parsed.evaluate(&empty).unwrap_err();
    assert!(err.is_code(ErrorCode::FODC0002));
    // doc-available reports without raising.
    let avail = parse_xpath("doc-available('urn:doc:a')", DialectVersion::V2_0).unwrap();
    let out = avail.evaluate(&empty).unwrap();
    assert_eq!(
        out,
        vec![XdmItem::Atomic(xdmpath::XdmAtomicValue::Boolean(false))]
    );
}

#[test]
fn evaluated_result_shape() {
    use xdmpath::Evaluated;
    let parsed = parse_xpath("21 * 2", DialectVersion::V2_0).unwrap();
    let ctx = DynamicContextBuilder::<SimpleNode>::new().build();
    let shaped = Evaluated::from_sequence(parsed.evaluate(&ctx).unwrap());
    assert!(matches!(
        shaped,
        Evaluated::Atomic(xdmpath::XdmAtomicValue::Integer(42))
    ));
    assert_eq!(shaped.as_number(), 42.0);
    assert_eq!(shaped.as_string(), "42");
    let empty = Evaluated::<SimpleNode>::from_sequence(Vec::new());
    assert!(matches!(empty, Evaluated::Sequence(ref s) if s.is_empty()));
}

#[test]
fn shared_ast_across_threads() {
    let parsed = Arc::new(parse_xpath("sum(1 to 100)", DialectVersion::V2_0).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let parsed = Arc::clone(&parsed);
            std::thread::spawn(move || {
                let ctx = DynamicContextBuilder::<SimpleNode>::new().build();
                ints(&parsed.evaluate(&ctx).unwrap())
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), vec![5050]);
    }
}
