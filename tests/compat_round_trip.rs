// compat_round_trip.rs - Parse-then-print tests over Oniguruma syntax.
//
// rt() asserts a pattern already in canonical form prints back unchanged;
// rt_as() asserts the canonical form of a pattern written another way.

use ferroni_syntax::api::{generate, to_oniguruma_ast};
use rstest::rstest;
use ferroni_syntax::parser::ParseOptions;

fn print_with(pattern: &str, flags: &str) -> String {
    let options = ParseOptions::builder().flags(flags).build();
    let ast = to_oniguruma_ast(pattern, &options)
        .unwrap_or_else(|e| panic!("parse failed for {:?}: {}", pattern, e));
    generate(&ast)
        .unwrap_or_else(|e| panic!("generate failed for {:?}: {}", pattern, e))
        .pattern
}

fn rt(pattern: &str) {
    assert_eq!(print_with(pattern, ""), pattern, "rt: {:?} did not round-trip", pattern);
}

fn rt_as(pattern: &str, expected: &str) {
    assert_eq!(print_with(pattern, ""), expected, "rt_as: wrong canonical form for {:?}", pattern);
}

// === Literals and escapes ===

#[test]
fn literals() {
    rt("abc");
    rt("😀");
    rt(r"\.\*\+\?\(\)\[\{\|\^\$\\");
    rt("a]b}c-");
    rt(r"\t\n\r\f\v\a\e");
}

#[test]
fn escapes_canonicalize() {
    rt_as(r"\x41", "A");
    rt_as(r"B", "B");
    rt_as(r"\x{43}", "C");
    rt_as(r"\0", r"\x00");
    rt_as(r"\x7f", r"\x7F");
    rt_as(r"\}", "}");
}

// === Character sets and classes ===

#[test]
fn sets() {
    rt(r"\d\D\w\W\s\S\h\H");
    rt(r"\p{L}\P{Lu}");
    rt(r".\O\X\R\N");
    rt("[[:alpha:]]");
}

#[test]
fn classes() {
    rt("[abc]");
    rt("[^a-z]");
    rt(r"[a-z&&[^aeiou]]");
    rt("[[:^digit:]_]");
    rt(r"[\d\p{Lu}]");
    rt("[-a]");
    rt("[a-]");
    rt_as(r"[\-a]", "[-a]");
    rt_as(r"[a\-z]", r"[a\-z]");
    rt_as(r"[\]a]", "[]a]");
}

// === Groups ===

#[test]
fn groups() {
    rt("(?:a)(?>b)(c)");
    rt("(?<name>a)");
    rt("(?i:a)(?-i:b)(?im:c)(?i-m:d)");
    rt("(?=a)(?!b)(?<=c)(?<!d)");
    rt("(?~abc)");
    rt("a|b|");
}

#[test]
fn extended_modifier_is_elided() {
    rt_as("(?x:a b)", "(?:ab)");
    rt_as("(?ix:a b)", "(?i:ab)");
}

#[test]
fn free_spacing_flag() {
    assert_eq!(print_with("a b # note\nc", "x"), "abc");
    assert_eq!(print_with(r"a\ b[ ]", "x"), r"a b[ ]");
}

// === Assertions and directives ===

#[test]
fn assertions() {
    rt(r"^$\A\z\Z\G\b\B");
    rt(r"a\Kb");
    rt("(?i)a");
}

// === Quantifiers ===

#[test]
fn quantifiers() {
    rt("a*b+c?");
    rt("a*?b+?c??");
    rt("a*+b++c?+");
    rt("a{2}b{2,}c{2,3}");
    rt("a{2,}?b{2,3}?");
    rt("(?:ab)*");
}

#[test]
fn quantifier_canonical_forms() {
    rt_as("a{0,}", "a*");
    rt_as("a{1,}", "a+");
    rt_as("a{0,1}", "a?");
    rt_as("a{3,3}", "a{3}");
}

// === References ===

#[test]
fn references() {
    rt(r"(a)\1");
    rt(r"(?<n>a)\k<n>\g<n>");
    rt(r"(a)\g<1>");
    rt(r"a\g<0>?");
}

#[test]
fn digit_after_backreference() {
    rt_as(r"(a)\1\x31", r"(a)\1\x31");
}

// === Callouts ===

#[rstest]
#[case("(*FAIL)")]
#[case("(*MAX{3})")]
#[case("(*MAX{3,X})")]
#[case("(*SKIP)")]
#[case("(*COUNT[t]{>})")]
#[case("(*COUNT{X})")]
#[case("(*TOTAL_COUNT[n]{<})")]
#[case("(*CMP{a,==,b})")]
#[case("(*ERROR{-2})")]
fn callouts(#[case] pattern: &str) {
    rt(pattern);
}

#[test]
fn callout_arguments_canonicalize() {
    rt_as("(*MAX{+3})", "(*MAX{3})");
    rt_as("(*SKIP{})", "(*SKIP{})");
}
