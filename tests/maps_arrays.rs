//! Maps, arrays, constructors, and the lookup operator (XPath 3.1).

mod common;

use rstest::rstest;
use xdmpath::ErrorCode;

use common::{booleans, eval31, ints, strings};

#[test]
fn map_constructor_and_application() {
    let out = eval31("map { 'a': 1, 'b': 2 }('b')").unwrap();
    assert_eq!(ints(&out), vec![2]);
    let out = eval31("map { 'a': 1 }('missing')").unwrap();
    assert!(out.is_empty());
}

#[test]
fn map_keys_collide_under_eq() {
    // Integer 1 and double 1.0 are the same key.
    let err = eval31("map { 1: 'x', 1.0e0: 'y' }").unwrap_err();
    assert!(err.is_code(ErrorCode::XQDY0137));
    let out = eval31("map { 1: 'x' }(1.0e0)").unwrap();
    assert_eq!(strings(&out), vec!["x"]);
}

#[rstest]
#[case("map:size(map { 'a': 1, 'b': 2 })", 2)]
#[case("map:size(map:put(map { 'a': 1 }, 'b', 2))", 2)]
#[case("map:size(map:put(map { 'a': 1 }, 'a', 2))", 1)]
#[case("map:size(map:remove(map { 'a': 1, 'b': 2 }, 'a'))", 1)]
#[case("map:size(map:entry('k', 'v'))", 1)]
fn map_function_sizes(#[case] src: &str, #[case] expected: i64) {
    let out = eval31(src).unwrap();
    assert_eq!(ints(&out), vec![expected], "source: {src:?}");
}

#[test]
fn map_get_contains_keys() {
    let out = eval31("map:get(map { 'a': (1, 2) }, 'a')").unwrap();
    assert_eq!(ints(&out), vec![1, 2]);
    let out = eval31("map:contains(map { 'a': 1 }, 'a')").unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval31("sort(map:keys(map { 'b': 2, 'a': 1 }))").unwrap();
    assert_eq!(strings(&out), vec!["a", "b"]);
}

#[rstest]
#[case("use-first", 1)]
#[case("use-last", 2)]
fn map_merge_policies(#[case] policy: &str, #[case] expected: i64) {
    let src = format!(
        "map:get(map:merge((map {{ 'k': 1 }}, map {{ 'k': 2 }}), map {{ 'duplicates': '{policy}' }}), 'k')"
    );
    let out = eval31(&src).unwrap();
    assert_eq!(ints(&out), vec![expected]);
}

#[test]
fn map_merge_combine_and_reject() {
    let out = eval31(
        "map:get(map:merge((map { 'k': 1 }, map { 'k': 2 }), map { 'duplicates': 'combine' }), 'k')",
    )
    .unwrap();
    assert_eq!(ints(&out), vec![1, 2]);
    let err = eval31(
        "map:merge((map { 'k': 1 }, map { 'k': 2 }), map { 'duplicates': 'reject' })",
    )
    .unwrap_err();
    assert!(err.is_code(ErrorCode::FOJS0003));
}

#[test]
fn square_and_curly_array_constructors() {
    // Square brackets: one member per expression, members may be sequences.
    let out = eval31("array:size([ (1, 2), 3 ])").unwrap();
    assert_eq!(ints(&out), vec![2]);
    // Curly braces: one member per item of the flattened sequence.
    let out = eval31("array:size(array { (1, 2), 3 })").unwrap();
    assert_eq!(ints(&out), vec![3]);
}

#[test]
fn array_get_is_one_indexed() {
    let out = eval31("array:get([10, 20, 30], 2)").unwrap();
    assert_eq!(ints(&out), vec![20]);
    let err = eval31("array:get([10], 0)").unwrap_err();
    assert!(err.is_code(ErrorCode::FOAY0001));
    let err = eval31("array:get([10], 2)").unwrap_err();
    assert!(err.is_code(ErrorCode::FOAY0001));
}

#[rstest]
#[case("array:size(array:append([1], (2, 3)))", 2)]
#[case("array:size(array:subarray([1, 2, 3, 4], 2, 2))", 2)]
#[case("array:size(array:remove([1, 2, 3], 2))", 2)]
#[case("array:size(array:insert-before([1, 3], 2, 2))", 3)]
#[case("array:size(array:join(([1], [2, 3])))", 3)]
#[case("array:size(array:tail([1, 2]))", 1)]
fn array_function_sizes(#[case] src: &str, #[case] expected: i64) {
    let out = eval31(src).unwrap();
    assert_eq!(ints(&out), vec![expected], "source: {src:?}");
}

#[test]
fn array_flatten_recurses() {
    let out = eval31("array:flatten([ [1, 2], [3, [4]] ])").unwrap();
    assert_eq!(ints(&out), vec![1, 2, 3, 4]);
}

#[test]
fn array_higher_order() {
    let out = eval31("array:flatten(array:for-each([1, 2, 3], function($x) { $x * 2 }))").unwrap();
    assert_eq!(ints(&out), vec![2, 4, 6]);
    let out = eval31("array:flatten(array:filter([1, 2, 3, 4], function($x) { $x gt 2 }))").unwrap();
    assert_eq!(ints(&out), vec![3, 4]);
    let out = eval31("array:fold-left([1, 2, 3], 0, function($a, $b) { $a + $b })").unwrap();
    assert_eq!(ints(&out), vec![6]);
}

#[test]
fn array_reverse_and_head() {
    let out = eval31("array:flatten(array:reverse([1, 2, 3]))").unwrap();
    assert_eq!(ints(&out), vec![3, 2, 1]);
    let out = eval31("array:head([7, 8])").unwrap();
    assert_eq!(ints(&out), vec![7]);
}

#[test]
fn lookup_operator_on_maps() {
    let out = eval31("map { 'a': 5 }?a").unwrap();
    assert_eq!(ints(&out), vec![5]);
    let out = eval31("map { 'a': 1, 'b': 2 }?*").unwrap();
    assert_eq!(out.len(), 2);
    let out = eval31("map { 'a': 1 }?('a')").unwrap();
    assert_eq!(ints(&out), vec![1]);
}

#[test]
fn lookup_operator_on_arrays() {
    let out = eval31("[10, 20, 30]?2").unwrap();
    assert_eq!(ints(&out), vec![20]);
    let out = eval31("[10, 20]?*").unwrap();
    assert_eq!(ints(&out), vec![10, 20]);
}

#[test]
fn lookup_distributes_over_sequences() {
    let out = eval31("(map { 'k': 1 }, map { 'k': 2 })?k").unwrap();
    assert_eq!(ints(&out), vec![1, 2]);
}

#[test]
fn maps_and_arrays_do_not_atomize() {
    let err = eval31("map { 'a': 1 } + 1").unwrap_err();
    assert!(err.is_code(ErrorCode::FOTY0013));
    // Arrays flatten through atomization instead.
    let out = eval31("[1, 2] + 1").unwrap_err();
    assert!(out.is_code(ErrorCode::XPTY0004)); // two items after flattening
    let out = eval31("[5] + 1").unwrap();
    assert_eq!(ints(&out), vec![6]);
}

#[test]
fn map_find_searches_nested_structures() {
    let out = eval31("array:size(map:find(([ map { 'k': 1 } ], map { 'k': 2 }), 'k'))").unwrap();
    assert_eq!(ints(&out), vec![2]);
}

#[test]
fn deep_equal_on_maps_and_arrays() {
    let out = eval31("deep-equal(map { 'a': 1 }, map { 'a': 1 })").unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval31("deep-equal([1, 2], [1, 2])").unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval31("deep-equal([1, 2], [2, 1])").unwrap();
    assert_eq!(booleans(&out), vec![false]);
}
