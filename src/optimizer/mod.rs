// optimizer/mod.rs - Fixpoint driver and pass catalogue.
//
// Every pass is a `Visitor`. A round runs each active pass once over the
// AST, then prints it; rounds repeat until the printed pattern stops
// changing.

mod alternation;
mod callouts;
mod classes;
mod flags;
mod groups;
mod quantifiers;
mod sets;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::ast::{DirectiveKind, Node};
use crate::error::RegexError;
use crate::generator::{generate, Generated};
use crate::parser::ParseOptions;
use crate::traverser::{traverse, Visitor};
use crate::unicode::PropertyMap;

/// Rounds before optimization is declared non-convergent.
const MAX_ROUNDS: usize = 200;

/// A named rewrite. All passes are on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pass {
    RemoveUselessFlags,
    SimplifyCallouts,
    RemoveUselessCalloutArguments,
    RemoveEmptyGroups,
    UnnestUselessClasses,
    UnwrapUselessClasses,
    UnwrapNegationWrappers,
    UseShorthands,
    UseUnicodeProps,
    UseUnicodeAliases,
    DedupeClasses,
    MergeRanges,
    AlternationToClass,
    ExtractPrefix,
    ExtractPrefix2,
    ExtractSuffix,
    Optionalize,
    PreventReDoS,
    ExposeAnchors,
    UnwrapUselessGroups,
    Ungroup,
}

const ALL_PASSES: [Pass; 21] = [
    Pass::RemoveUselessFlags,
    Pass::SimplifyCallouts,
    Pass::RemoveUselessCalloutArguments,
    Pass::RemoveEmptyGroups,
    Pass::UnnestUselessClasses,
    Pass::UnwrapUselessClasses,
    Pass::UnwrapNegationWrappers,
    Pass::UseShorthands,
    Pass::UseUnicodeProps,
    Pass::UseUnicodeAliases,
    Pass::DedupeClasses,
    Pass::MergeRanges,
    Pass::AlternationToClass,
    Pass::ExtractPrefix,
    Pass::ExtractPrefix2,
    Pass::ExtractSuffix,
    Pass::Optionalize,
    Pass::PreventReDoS,
    Pass::ExposeAnchors,
    Pass::UnwrapUselessGroups,
    Pass::Ungroup,
];

impl Pass {
    /// Every pass, in the order a round applies them.
    pub fn all() -> &'static [Pass] {
        &ALL_PASSES
    }

    pub fn name(self) -> &'static str {
        match self {
            Pass::RemoveUselessFlags => "removeUselessFlags",
            Pass::SimplifyCallouts => "simplifyCallouts",
            Pass::RemoveUselessCalloutArguments => "removeUselessCalloutArguments",
            Pass::RemoveEmptyGroups => "removeEmptyGroups",
            Pass::UnnestUselessClasses => "unnestUselessClasses",
            Pass::UnwrapUselessClasses => "unwrapUselessClasses",
            Pass::UnwrapNegationWrappers => "unwrapNegationWrappers",
            Pass::UseShorthands => "useShorthands",
            Pass::UseUnicodeProps => "useUnicodeProps",
            Pass::UseUnicodeAliases => "useUnicodeAliases",
            Pass::DedupeClasses => "dedupeClasses",
            Pass::MergeRanges => "mergeRanges",
            Pass::AlternationToClass => "alternationToClass",
            Pass::ExtractPrefix => "extractPrefix",
            Pass::ExtractPrefix2 => "extractPrefix2",
            Pass::ExtractSuffix => "extractSuffix",
            Pass::Optionalize => "optionalize",
            Pass::PreventReDoS => "preventReDoS",
            Pass::ExposeAnchors => "exposeAnchors",
            Pass::UnwrapUselessGroups => "unwrapUselessGroups",
            Pass::Ungroup => "ungroup",
        }
    }

    fn visitor(self, properties: &PropertyMap) -> Box<dyn Visitor + '_> {
        match self {
            Pass::RemoveUselessFlags => Box::new(flags::RemoveUselessFlags::default()),
            Pass::SimplifyCallouts => Box::new(callouts::SimplifyCallouts),
            Pass::RemoveUselessCalloutArguments => Box::new(callouts::RemoveUselessCalloutArguments),
            Pass::RemoveEmptyGroups => Box::new(groups::RemoveEmptyGroups),
            Pass::UnnestUselessClasses => Box::new(classes::UnnestUselessClasses),
            Pass::UnwrapUselessClasses => Box::new(classes::UnwrapUselessClasses),
            Pass::UnwrapNegationWrappers => Box::new(classes::UnwrapNegationWrappers),
            Pass::UseShorthands => Box::new(sets::UseShorthands),
            Pass::UseUnicodeProps => Box::new(sets::UseUnicodeProps),
            Pass::UseUnicodeAliases => Box::new(sets::UseUnicodeAliases { properties }),
            Pass::DedupeClasses => Box::new(classes::DedupeClasses),
            Pass::MergeRanges => Box::new(classes::MergeRanges),
            Pass::AlternationToClass => Box::new(classes::AlternationToClass),
            Pass::ExtractPrefix => Box::new(alternation::ExtractPrefix),
            Pass::ExtractPrefix2 => Box::new(alternation::ExtractPrefix2),
            Pass::ExtractSuffix => Box::new(alternation::ExtractSuffix),
            Pass::Optionalize => Box::new(alternation::Optionalize),
            Pass::PreventReDoS => Box::new(quantifiers::PreventReDoS),
            Pass::ExposeAnchors => Box::new(groups::ExposeAnchors),
            Pass::UnwrapUselessGroups => Box::new(groups::UnwrapUselessGroups),
            Pass::Ungroup => Box::new(groups::Ungroup),
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pass {
    type Err = RegexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_PASSES
            .iter()
            .copied()
            .find(|pass| pass.name() == s)
            .ok_or_else(|| RegexError::policy(format!("unknown optimization \"{}\"", s)))
    }
}

/// Options for `optimize`: parse options plus per-pass on/off overrides.
#[derive(Debug, Clone, Default)]
pub struct OptimizeOptions {
    pub parse: ParseOptions,
    pub overrides: HashMap<Pass, bool>,
}

impl OptimizeOptions {
    /// Passes that run, in round order.
    pub fn active_passes(&self) -> Vec<Pass> {
        ALL_PASSES
            .iter()
            .copied()
            .filter(|pass| self.overrides.get(pass).copied().unwrap_or(true))
            .collect()
    }
}

/// Parse `pattern`, rewrite it to a fixpoint, and print the result.
pub fn optimize(pattern: &str, options: &OptimizeOptions) -> Result<Generated, RegexError> {
    let mut ast = crate::api::to_oniguruma_ast(pattern, &options.parse)?;
    let passes = options.active_passes();
    let builtin;
    let properties = match &options.parse.unicode_property_map {
        Some(map) => map,
        None => {
            builtin = PropertyMap::default();
            &builtin
        }
    };
    let mut previous = generate(&ast)?;
    for round in 1..=MAX_ROUNDS {
        for &pass in &passes {
            trace!(%pass, round, "applying pass");
            let mut visitor = pass.visitor(properties);
            traverse(&mut ast, visitor.as_mut())?;
        }
        let generated = generate(&ast)?;
        debug!(round, pattern = %generated.pattern, "optimizer round");
        if generated == previous {
            return Ok(generated);
        }
        previous = generated;
    }
    Err(RegexError::bug(format!(
        "optimization did not converge after {} rounds",
        MAX_ROUNDS
    )))
}

// === Helpers shared by passes ===

/// A flag directive scopes over the rest of its group, so alternatives that
/// hold one cannot be restructured.
pub(crate) fn holds_flag_directive(alternatives: &[Node]) -> bool {
    alternatives.iter().any(|alt| {
        alt.elements().is_some_and(|elements| {
            elements
                .iter()
                .any(|node| matches!(node, Node::Directive(d) if d.kind == DirectiveKind::Flags))
        })
    })
}

/// Node kinds whose match never depends on backtracking into them.
pub(crate) fn is_simple(node: &Node) -> bool {
    matches!(node, Node::Assertion(_) | Node::Character(_) | Node::CharacterSet(_))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn only(pass: Pass, pattern: &str) -> String {
        only_with_flags(pass, pattern, "")
    }

    pub fn only_with_flags(pass: Pass, pattern: &str, flags: &str) -> String {
        let overrides = Pass::all().iter().map(|&p| (p, p == pass)).collect();
        let options = OptimizeOptions {
            parse: ParseOptions { flags: flags.to_string(), ..Default::default() },
            overrides,
        };
        optimize(pattern, &options).unwrap().pattern
    }
}
