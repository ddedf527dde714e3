// callouts.rs - Named callout passes.

use crate::ast::{Alternative, CalloutArg, CalloutKind, LookaroundAssertion, LookaroundKind, Node};
use crate::error::RegexError;
use crate::traverser::{Path, Visitor};

/// `(*FAIL)` → `(?!)`.
pub(super) struct SimplifyCallouts;

impl Visitor for SimplifyCallouts {
    fn enter_named_callout(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if let Node::NamedCallout(c) = path.node() {
            if c.kind == CalloutKind::Fail && c.tag.is_none() && c.arguments.is_none() {
                let fail = LookaroundAssertion::new(LookaroundKind::Lookahead, true, vec![Alternative::default()]);
                path.replace_with(Node::LookaroundAssertion(fail), false)?;
            }
        }
        Ok(())
    }
}

/// Drop trailing empty arguments and arguments equal to their defaults:
/// `>` for the counters, `X` as the second argument of `MAX`.
pub(super) struct RemoveUselessCalloutArguments;

impl Visitor for RemoveUselessCalloutArguments {
    fn enter_named_callout(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Node::NamedCallout(c) = path.node_mut() else {
            return Ok(());
        };
        let Some(args) = &mut c.arguments else {
            return Ok(());
        };
        while args.last() == Some(&CalloutArg::Empty) {
            args.pop();
        }
        match c.kind {
            CalloutKind::Count | CalloutKind::TotalCount if is_symbol(args, '>') => args.clear(),
            CalloutKind::Max if args.len() == 2 && args[1] == CalloutArg::Str("X".into()) => {
                args.pop();
            }
            _ => {}
        }
        if args.is_empty() {
            c.arguments = None;
        }
        Ok(())
    }
}

fn is_symbol(args: &[CalloutArg], symbol: char) -> bool {
    matches!(args, [CalloutArg::Str(s)] if s.len() == 1 && s.starts_with(symbol))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::optimizer::test_support::only;
    use crate::optimizer::Pass;

    #[test]
    fn fail_becomes_negative_lookahead() {
        assert_eq!(only(Pass::SimplifyCallouts, "a(*FAIL)|b"), "a(?!)|b");
        assert_eq!(only(Pass::SimplifyCallouts, "(*FAIL[t])"), "(*FAIL[t])");
    }

    #[rstest]
    #[case::signed_max("(*MAX{+3,})", "(*MAX{3})")]
    #[case::max_default_mode("(*MAX{3,X})", "(*MAX{3})")]
    #[case::max_other_mode("(*MAX{3,<})", "(*MAX{3,<})")]
    #[case::counter_default("(*COUNT{>})", "(*COUNT)")]
    #[case::tagged_counter_default("(*COUNT[t]{>})", "(*COUNT[t])")]
    #[case::total_count_default("(*TOTAL_COUNT{>})", "(*TOTAL_COUNT)")]
    #[case::count_decrement_kept("(*COUNT{X})", "(*COUNT{X})")]
    #[case::count_retraction_kept("(*COUNT{<})", "(*COUNT{<})")]
    #[case::cmp_kept("(*CMP{a,==,b})", "(*CMP{a,==,b})")]
    #[case::empty_braces("(*SKIP{})", "(*SKIP)")]
    fn callout_arguments(#[case] pattern: &str, #[case] expected: &str) {
        assert_eq!(only(Pass::RemoveUselessCalloutArguments, pattern), expected);
    }
}
