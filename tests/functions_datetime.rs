//! Date/time values, arithmetic, components, and timezone handling.

mod common;

use rstest::rstest;
use xdmpath::engine::runtime::DynamicContextBuilder;
use xdmpath::model::simple::SimpleNode;
use xdmpath::parser::dialects::DialectVersion;
use xdmpath::parser::parse_xpath;
use xdmpath::xdm::XdmAtomicValue;

use common::{Seq, atomics, booleans, eval, ints, strings};

fn eval_at(expr: &str, now: &str) -> Result<Seq, xdmpath::Error> {
    let parsed = parse_xpath(expr, DialectVersion::V3_1)?;
    let now = chrono::DateTime::parse_from_rfc3339(now).unwrap();
    let ctx = DynamicContextBuilder::<SimpleNode>::new().now(now).build();
    parsed.evaluate(&ctx)
}

#[test]
fn leap_day_plus_year_clamps_to_month_end() {
    let out = eval(
        "string(xs:date('2024-02-29') + xs:yearMonthDuration('P1Y'))",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["2025-02-28"]);
}

#[rstest]
#[case("xs:date('2024-01-31') + xs:yearMonthDuration('P1M')", "2024-02-29")]
#[case("xs:date('2024-01-15') + xs:dayTimeDuration('P2D')", "2024-01-17")]
#[case("xs:date('2024-01-01') - xs:dayTimeDuration('PT24H')", "2023-12-31")]
#[case(
    "xs:dateTime('2024-01-01T10:30:00') + xs:dayTimeDuration('PT2H45M')",
    "2024-01-01T13:15:00"
)]
#[case("xs:time('23:00:00') + xs:dayTimeDuration('PT2H')", "01:00:00")]
fn temporal_plus_duration(#[case] src: &str, #[case] expected: &str) {
    let out = eval(&format!("string({src})"), DialectVersion::V2_0).unwrap();
    assert_eq!(strings(&out), vec![expected], "source: {src:?}");
}

#[test]
fn date_subtraction_gives_day_time_duration() {
    let out = eval(
        "string(xs:date('2024-03-01') - xs:date('2024-02-01'))",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["P29D"]);
}

#[test]
fn duration_scaling_and_division() {
    let out = eval(
        "string(xs:yearMonthDuration('P1Y6M') * 2)",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["P3Y"]);
    let out = eval(
        "xs:dayTimeDuration('P2D') div xs:dayTimeDuration('PT12H')",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(
        atomics(&out),
        vec![XdmAtomicValue::Decimal("4".parse().unwrap())]
    );
}

#[rstest]
#[case("year-from-date(xs:date('2024-02-29'))", 2024)]
#[case("month-from-date(xs:date('2024-02-29'))", 2)]
#[case("day-from-date(xs:date('2024-02-29'))", 29)]
#[case("hours-from-dateTime(xs:dateTime('2024-01-01T13:20:10'))", 13)]
#[case("minutes-from-dateTime(xs:dateTime('2024-01-01T13:20:10'))", 20)]
#[case("hours-from-time(xs:time('07:08:09'))", 7)]
#[case("years-from-duration(xs:yearMonthDuration('P2Y6M'))", 2)]
#[case("months-from-duration(xs:yearMonthDuration('P2Y6M'))", 6)]
#[case("days-from-duration(xs:dayTimeDuration('P3DT10H'))", 3)]
#[case("hours-from-duration(xs:dayTimeDuration('P3DT10H'))", 10)]
fn component_extraction(#[case] src: &str, #[case] expected: i64) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![expected], "source: {src:?}");
}

#[test]
fn seconds_preserve_fraction() {
    let out = eval(
        "seconds-from-dateTime(xs:dateTime('2024-01-01T00:00:10.5'))",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(
        atomics(&out),
        vec![XdmAtomicValue::Decimal("10.5".parse().unwrap())]
    );
}

#[test]
fn timezone_components() {
    let out = eval(
        "string(timezone-from-dateTime(xs:dateTime('2024-01-01T00:00:00+05:30')))",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["PT5H30M"]);
    let out = eval(
        "timezone-from-date(xs:date('2024-01-01'))",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert!(out.is_empty());
}

#[test]
fn current_date_time_is_frozen_and_stable() {
    let out = eval_at(
        "string(current-dateTime())",
        "2026-08-02T12:00:00+02:00",
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["2026-08-02T12:00:00+02:00"]);
    let out = eval_at("current-dateTime() eq current-dateTime()", "2026-08-02T12:00:00+02:00")
        .unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval_at("string(current-date())", "2026-08-02T12:00:00+02:00").unwrap();
    assert_eq!(strings(&out), vec!["2026-08-02+02:00"]);
}

#[test]
fn implicit_timezone_fills_in_for_comparisons() {
    // One operand with timezone, one without: the implicit timezone (from
    // the frozen instant, here UTC) applies to the bare one.
    let out = eval_at(
        "xs:dateTime('2024-01-01T12:00:00') eq xs:dateTime('2024-01-01T12:00:00Z')",
        "2026-01-01T00:00:00+00:00",
    )
    .unwrap();
    assert_eq!(booleans(&out), vec![true]);
}

#[test]
fn adjust_to_timezone() {
    let out = eval(
        "string(adjust-dateTime-to-timezone(xs:dateTime('2024-01-01T12:00:00Z'), xs:dayTimeDuration('PT5H')))",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["2024-01-01T17:00:00+05:00"]);
    // Empty timezone argument strips the zone.
    let out = eval(
        "string(adjust-dateTime-to-timezone(xs:dateTime('2024-01-01T12:00:00Z'), ()))",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["2024-01-01T12:00:00"]);
}

#[test]
fn date_time_constructor_function() {
    let out = eval(
        "string(dateTime(xs:date('2024-05-06'), xs:time('07:08:09')))",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["2024-05-06T07:08:09"]);
}

#[test]
fn temporal_ordering_uses_timezones() {
    let out = eval(
        "xs:dateTime('2024-01-01T10:00:00+02:00') lt xs:dateTime('2024-01-01T10:00:00Z')",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(booleans(&out), vec![true]);
}
