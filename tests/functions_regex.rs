//! `fn:matches`, `fn:replace`, `fn:tokenize`, `fn:analyze-string`.

mod common;

use rstest::rstest;
use xdmpath::ErrorCode;
use xdmpath::parser::dialects::DialectVersion;
use xdmpath::xdm::XdmItem;

use common::{booleans, eval, eval31, strings};

#[rstest]
#[case("matches('abracadabra', 'bra')", true)]
#[case("matches('abracadabra', '^a.*a$')", true)]
#[case("matches('abracadabra', '^bra')", false)]
#[case("matches('ABC', 'abc', 'i')", true)]
#[case("matches('a.b', 'a.b', 'q')", true)]
#[case("matches('axb', 'a.b', 'q')", false)]
#[case("matches('hello world', 'hello   world', 'x')", true)]
fn matches_with_flags(#[case] src: &str, #[case] expected: bool) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![expected], "source: {src:?}");
}

#[test]
fn multiline_and_dotall_flags() {
    let out = eval("matches('a\nb', '^b$', 'm')", DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval("matches('a\nb', 'a.b', 's')", DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![true]);
}

#[rstest]
#[case("replace('abracadabra', 'bra', '*')", "a*cada*")]
#[case("replace('abracadabra', 'a.*a', '*')", "*")]
#[case("replace('abracadabra', 'a.*?a', '*')", "*cadabra")]
#[case("replace('darted', '^(.*?)d(.*)$', '$1c$2')", "carted")]
#[case("replace('abc', 'q', 'x')", "abc")]
fn replace_with_groups(#[case] src: &str, #[case] expected: &str) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(strings(&out), vec![expected], "source: {src:?}");
}

#[test]
fn replace_zero_length_match_raises() {
    let err = eval("replace('abc', 'x?', '-')", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FORX0003));
}

#[test]
fn invalid_pattern_and_flags() {
    let err = eval("matches('a', '(unclosed')", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FORX0002));
    let err = eval("matches('a', 'a', 'z')", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FORX0001));
}

#[test]
fn invalid_replacement_raises_forx0004() {
    let err = eval("replace('abc', 'b', '\\x')", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FORX0004));
}

#[test]
fn tokenize_splits_and_rejects_empty_matches() {
    let out = eval(
        "tokenize('2006-12-25', '-')",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["2006", "12", "25"]);
    let out = eval("tokenize('', '-')", DialectVersion::V2_0).unwrap();
    assert!(out.is_empty());
    let err = eval("tokenize('abc', 'x?')", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FORX0003));
}

#[test]
fn single_argument_tokenize_splits_on_whitespace() {
    let out = eval31("tokenize('  red  green blue ')").unwrap();
    assert_eq!(strings(&out), vec!["red", "green", "blue"]);
}

#[test]
fn analyze_string_yields_match_maps() {
    let out = eval31("analyze-string('ab12cd', '[0-9]+')").unwrap();
    assert_eq!(out.len(), 3);
    let flags: Vec<bool> = out
        .iter()
        .map(|item| match item {
            XdmItem::Map(m) => {
                let v = m
                    .get(&xdmpath::XdmAtomicValue::String("is-match".into()))
                    .cloned()
                    .unwrap_or_default();
                matches!(
                    v.as_slice(),
                    [XdmItem::Atomic(xdmpath::XdmAtomicValue::Boolean(true))]
                )
            }
            _ => false,
        })
        .collect();
    assert_eq!(flags, vec![false, true, false]);
}

#[test]
fn back_references_are_supported() {
    let out = eval(
        "matches('hello-hello', '^(\\w+)-\\1$')",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(booleans(&out), vec![true]);
}
