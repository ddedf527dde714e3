// quantifiers.rs - preventReDoS.

use crate::ast::{Node, QuantifierKind};
use crate::error::RegexError;
use crate::traverser::{Path, Visitor};

/// `(?:X*)+` → `(?:X?)+` and `(?:X+)+` → `(?:X)+`: inside an unbounded
/// repetition, an unbounded nested repetition of the first alternative's
/// only element adds nothing but backtracking paths.
pub(super) struct PreventReDoS;

impl Visitor for PreventReDoS {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Node::Quantifier(outer) = path.node_mut() else {
            return Ok(());
        };
        if outer.max.is_some() {
            return Ok(());
        }
        let Node::Group(group) = outer.body.as_mut() else {
            return Ok(());
        };
        if group.atomic || group.flags.is_some() {
            return Ok(());
        }
        let Some(elements) = group.body.first_mut().and_then(Node::elements_mut) else {
            return Ok(());
        };
        let [Node::Quantifier(inner)] = elements.as_mut_slice() else {
            return Ok(());
        };
        if inner.kind == QuantifierKind::Possessive || inner.max.is_some() {
            return Ok(());
        }
        match inner.min {
            0 => inner.max = Some(1),
            1 => {
                let body = std::mem::replace(inner.body.as_mut(), Node::alternative(Vec::new()));
                elements[0] = body;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::optimizer::test_support::only;
    use crate::optimizer::Pass;

    #[rstest]
    #[case("(?:.*)+!", "(?:.?)+!")]
    #[case("(?:a+)*", "(?:a)*")]
    #[case("(?:a*?)*", "(?:a??)*")]
    #[case("(?:a*|b)+", "(?:a?|b)+")]
    #[case("(?:a*b)+", "(?:a*b)+")]
    #[case("(?:a*+)+", "(?:a*+)+")]
    #[case("(a*)+", "(a*)+")]
    #[case("(?>a*)+", "(?>a*)+")]
    #[case("(?:a*){2}", "(?:a*){2}")]
    #[case("(?:a{2,})+", "(?:a{2,})+")]
    fn prevent_redos(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(only(Pass::PreventReDoS, input), expected);
    }
}
