// classes.rs - Character class passes.

use crate::ast::{
    Alternative, Character, CharacterClass, CharacterClassRange, CharacterSet, CharacterSetKind,
    ClassKind, Node, QuantifierKind,
};
use crate::error::RegexError;
use crate::traverser::{Parent, Path, Visitor};

use super::holds_flag_directive;

fn in_class(path: &Path<'_>) -> bool {
    matches!(path.parent(), Some(Parent::CharacterClass { .. }))
}

/// `[[a]]` → `[a]`, `[^[^a]]` → `[a]`, `[a[bc]]` → `[abc]`, `[[a]&&b]` → `[a&&b]`.
pub(super) struct UnnestUselessClasses;

impl Visitor for UnnestUselessClasses {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Node::CharacterClass(class) = path.node_mut() else {
            return Ok(());
        };
        if let [Node::CharacterClass(inner)] = class.body.as_slice() {
            let inner = inner.clone();
            class.negate ^= inner.negate;
            class.kind = inner.kind;
            class.body = inner.body;
        }
        let body = std::mem::take(&mut class.body);
        let mut out = Vec::with_capacity(body.len());
        for node in body {
            match (class.kind, node) {
                (ClassKind::Union, Node::CharacterClass(c)) if c.kind == ClassKind::Union && !c.negate => {
                    out.extend(c.body)
                }
                (ClassKind::Intersection, Node::CharacterClass(mut c)) if !c.negate && c.body.len() == 1 => {
                    match c.body.pop() {
                        Some(only) if c.kind == ClassKind::Union => out.push(only),
                        Some(only) => {
                            c.body.push(only);
                            out.push(Node::CharacterClass(c));
                        }
                        None => out.push(Node::CharacterClass(c)),
                    }
                }
                (ClassKind::Intersection, Node::CharacterClass(c))
                    if !c.negate && c.kind == ClassKind::Intersection =>
                {
                    out.extend(c.body)
                }
                (_, node) => out.push(node),
            }
        }
        class.body = out;
        Ok(())
    }
}

/// `[a]` → `a` outside a class.
pub(super) struct UnwrapUselessClasses;

impl Visitor for UnwrapUselessClasses {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if in_class(path) {
            return Ok(());
        }
        let Node::CharacterClass(class) = path.node() else {
            return Ok(());
        };
        if class.negate || class.kind != ClassKind::Union {
            return Ok(());
        }
        if let [only @ (Node::Character(_) | Node::CharacterSet(_))] = class.body.as_slice() {
            let only = only.clone();
            *path.node_mut() = only;
        }
        Ok(())
    }
}

/// `[^\d]` → `\D`; `[^\n]` → `\N` outside classes unless greedily or
/// possessively quantified.
pub(super) struct UnwrapNegationWrappers;

impl Visitor for UnwrapNegationWrappers {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let nested = in_class(path);
        let quantified_eagerly = matches!(
            path.parent(),
            Some(Parent::Quantifier { kind, .. }) if *kind != QuantifierKind::Lazy
        );
        let Node::CharacterClass(class) = path.node() else {
            return Ok(());
        };
        if !class.negate || class.kind != ClassKind::Union {
            return Ok(());
        }
        let replacement = match class.body.as_slice() {
            [Node::CharacterSet(set)] if set.kind.is_universally_negatable() => {
                Node::CharacterSet(CharacterSet { negate: !set.negate, ..set.clone() })
            }
            [Node::Character(c)] if c.value == u32::from(b'\n') && !nested && !quantified_eagerly => {
                Node::CharacterSet(CharacterSet::new(CharacterSetKind::Newline, true))
            }
            _ => return Ok(()),
        };
        *path.node_mut() = replacement;
        Ok(())
    }
}

/// Drop repeated members of a union class, first occurrence wins.
pub(super) struct DedupeClasses;

impl Visitor for DedupeClasses {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Node::CharacterClass(class) = path.node_mut() else {
            return Ok(());
        };
        if class.kind != ClassKind::Union {
            return Ok(());
        }
        let mut kept: Vec<Node> = Vec::with_capacity(class.body.len());
        for node in std::mem::take(&mut class.body) {
            if !kept.contains(&node) {
                kept.push(node);
            }
        }
        class.body = kept;
        Ok(())
    }
}

/// Sort and merge characters and ranges of a union class into minimal
/// ranges. `]` goes first and `-` last so neither needs escaping.
pub(super) struct MergeRanges;

impl Visitor for MergeRanges {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Node::CharacterClass(class) = path.node_mut() else {
            return Ok(());
        };
        if class.kind != ClassKind::Union {
            return Ok(());
        }
        let mut spans: Vec<(u32, u32)> = Vec::new();
        let mut others = Vec::new();
        for node in std::mem::take(&mut class.body) {
            match node {
                Node::Character(c) => spans.push((c.value, c.value)),
                Node::CharacterClassRange(r) => spans.push((r.min.value, r.max.value)),
                other => others.push(other),
            }
        }
        spans.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(spans.len());
        for (lo, hi) in spans {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        let bracket = u32::from(b']');
        let hyphen = u32::from(b'-');
        let mut body = Vec::with_capacity(merged.len() + others.len());
        let mut tail = None;
        for (lo, hi) in merged {
            if lo == hi && lo == hyphen {
                tail = Some(Node::Character(Character { value: lo }));
            } else if lo == hi && lo == bracket {
                body.insert(0, Node::Character(Character { value: lo }));
            } else if lo == hi {
                body.push(Node::Character(Character { value: lo }));
            } else if hi == lo + 1 {
                body.push(Node::Character(Character { value: lo }));
                body.push(Node::Character(Character { value: hi }));
            } else {
                let range = CharacterClassRange::new(Character { value: lo }, Character { value: hi })?;
                body.push(Node::CharacterClassRange(range));
            }
        }
        body.extend(others);
        body.extend(tail);
        class.body = body;
        Ok(())
    }
}

fn mergeable_into_class(node: &Node) -> bool {
    match node {
        Node::Character(_) | Node::CharacterClass(_) => true,
        Node::CharacterSet(set) => set.kind.is_universally_negatable(),
        _ => false,
    }
}

/// `a|b|\d` → `[ab\d]` for runs of single-character alternatives.
pub(super) struct AlternationToClass;

impl Visitor for AlternationToClass {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        match path.node().alternatives() {
            Some(alternatives) if alternatives.len() > 1 && !holds_flag_directive(alternatives) => {}
            _ => return Ok(()),
        }
        let Some(alternatives) = path.node_mut().alternatives_mut() else {
            return Ok(());
        };
        let mut out = Vec::with_capacity(alternatives.len());
        let mut run: Vec<Node> = Vec::new();
        for alt in std::mem::take(alternatives) {
            match alt.elements().map(Vec::as_slice) {
                Some([only]) if mergeable_into_class(only) => run.push(only.clone()),
                _ => {
                    flush_run(&mut run, &mut out);
                    out.push(alt);
                }
            }
        }
        flush_run(&mut run, &mut out);
        *alternatives = out;
        Ok(())
    }
}

fn flush_run(run: &mut Vec<Node>, out: &mut Vec<Node>) {
    match run.len() {
        0 => {}
        1 => out.push(Node::Alternative(Alternative::new(std::mem::take(run)))),
        _ => {
            let class = CharacterClass::union(std::mem::take(run));
            out.push(Node::Alternative(Alternative::new(vec![Node::CharacterClass(class)])));
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::optimizer::test_support::only;
    use crate::optimizer::Pass;

    #[rstest]
    #[case("[[^[^a]]&&[b]]", "[a&&b]")]
    #[case("[a[bc]]", "[abc]")]
    #[case("[^[^a]]", "[a]")]
    #[case("[[a]]", "[a]")]
    #[case("[a[^b]]", "[a[^b]]")]
    #[case("[^[ab]]", "[^ab]")]
    fn unnest_useless_classes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(only(Pass::UnnestUselessClasses, input), expected);
    }

    #[rstest]
    #[case(r"[a]b[\d]*", r"ab\d*")]
    #[case("[^a]", "[^a]")]
    #[case("[[a]b]", "[[a]b]")]
    #[case("[.]", r"\.")]
    fn unwrap_useless_classes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(only(Pass::UnwrapUselessClasses, input), expected);
    }

    #[rstest]
    #[case(r"[^\d]", r"\D")]
    #[case(r"[^\P{L}]", r"\p{L}")]
    #[case(r"[^\n]+", r"[^\n]+")]
    #[case(r"[^\n]", r"\N")]
    #[case(r"[^\n]+?", r"\N+?")]
    #[case(r"[a[^\s]]", r"[a\S]")]
    #[case(r"[a[^\n]]", r"[a[^\n]]")]
    fn unwrap_negation_wrappers(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(only(Pass::UnwrapNegationWrappers, input), expected);
    }

    #[test]
    fn dedupe_classes() {
        assert_eq!(only(Pass::DedupeClasses, r"[aba\d\da-c]"), r"[ab\da-c]");
    }

    #[rstest]
    #[case("[c-ea-bf]", "[a-f]")]
    #[case("[-a]", "[a-]")]
    #[case(r"[a\]]", "[]a]")]
    #[case(r"[ba\d-]", r"[ab\d-]")]
    #[case("[a-cb]", "[a-c]")]
    #[case("[ab]", "[ab]")]
    #[case("[abc]", "[a-c]")]
    fn merge_ranges(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(only(Pass::MergeRanges, input), expected);
    }

    #[rstest]
    #[case(r"a|b|\d|(?:x)|c|d", r"[ab\d]|(?:x)|[cd]")]
    #[case("a|bc", "a|bc")]
    #[case("a|[^b]", "[a[^b]]")]
    #[case("a|.", "a|.")]
    #[case("(?i)a|b", "(?i)a|b")]
    fn alternation_to_class(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(only(Pass::AlternationToClass, input), expected);
    }
}
