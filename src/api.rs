// api.rs - Idiomatic entry points for the pattern pipeline.
//
// Wraps tokenize → parse → (optimize) → generate behind builders:
// ParseOptionsBuilder for parsing, Optimizer for the fixpoint rewrite.

use crate::ast::OnigurumaAst;
use crate::error::RegexError;
use crate::optimizer::OptimizeOptions;
use crate::parser::{parse, ParseOptions};
use crate::tokenizer::{tokenize, Rules};
use crate::unicode::PropertyMap;

pub use crate::generator::{generate, Generated};
pub use crate::optimizer::{optimize, Pass};

/// Tokenize and parse `pattern` under `options`.
///
/// # Examples
///
/// ```
/// use ferroni_syntax::api::to_oniguruma_ast;
/// use ferroni_syntax::parser::ParseOptions;
///
/// let ast = to_oniguruma_ast("a|b", &ParseOptions::default()).unwrap();
/// assert_eq!(ast.pattern.body.len(), 2);
/// assert!(!ast.flags.ignore_case);
/// ```
pub fn to_oniguruma_ast(pattern: &str, options: &ParseOptions) -> Result<OnigurumaAst, RegexError> {
    let tokenized = tokenize(pattern, &options.flags, &options.rules)?;
    parse(tokenized, options)
}

impl ParseOptions {
    /// Create a [`ParseOptionsBuilder`] starting from the defaults.
    pub fn builder() -> ParseOptionsBuilder {
        ParseOptionsBuilder::default()
    }
}

/// Builder for [`ParseOptions`].
///
/// ```
/// use ferroni_syntax::parser::ParseOptions;
///
/// let options = ParseOptions::builder().flags("i").allow_orphan_backrefs(true).build();
/// assert_eq!(options.flags, "i");
/// assert!(options.rules.allow_orphan_backrefs);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParseOptionsBuilder {
    options: ParseOptions,
}

impl ParseOptionsBuilder {
    /// Set the flags string (`i`, `m`, `x`, `D`, `S`, `W`, `P`, `y{g}`, `y{w}`).
    pub fn flags(mut self, flags: &str) -> Self {
        self.options.flags = flags.to_string();
        self
    }

    /// Replace all syntax rules at once.
    pub fn rules(mut self, rules: Rules) -> Self {
        self.options.rules = rules;
        self
    }

    /// Keep unnamed groups capturing when named groups exist.
    pub fn capture_group(mut self, yes: bool) -> Self {
        self.options.rules.capture_group = yes;
        self
    }

    /// Lex `^` as `\A` and `$` as `\Z`.
    pub fn singleline(mut self, yes: bool) -> Self {
        self.options.rules.singleline = yes;
        self
    }

    /// Turn numbered references to missing groups into orphans.
    pub fn allow_orphan_backrefs(mut self, yes: bool) -> Self {
        self.options.rules.allow_orphan_backrefs = yes;
        self
    }

    pub fn normalize_unknown_property_names(mut self, yes: bool) -> Self {
        self.options.normalize_unknown_property_names = yes;
        self
    }

    pub fn skip_lookbehind_validation(mut self, yes: bool) -> Self {
        self.options.skip_lookbehind_validation = yes;
        self
    }

    pub fn skip_property_name_validation(mut self, yes: bool) -> Self {
        self.options.skip_property_name_validation = yes;
        self
    }

    /// Use `map` instead of the built-in property names.
    pub fn unicode_property_map(mut self, map: PropertyMap) -> Self {
        self.options.unicode_property_map = Some(map);
        self
    }

    pub fn build(self) -> ParseOptions {
        self.options
    }
}

/// Configured optimizer.
///
/// # Examples
///
/// ```
/// use ferroni_syntax::api::{Optimizer, Pass};
///
/// let out = Optimizer::new().optimize("[[^[^a]]&&[b]]").unwrap();
/// assert_eq!(out.pattern, "[a&&b]");
///
/// let out = Optimizer::new()
///     .only(&[Pass::UseUnicodeAliases])
///     .optimize(r"\p{Uppercase_Letter}")
///     .unwrap();
/// assert_eq!(out.pattern, r"\p{Lu}");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    options: OptimizeOptions,
}

impl Optimizer {
    /// All passes enabled, default parse options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(mut self, flags: &str) -> Self {
        self.options.parse.flags = flags.to_string();
        self
    }

    pub fn rules(mut self, rules: Rules) -> Self {
        self.options.parse.rules = rules;
        self
    }

    /// Replace the parse options wholesale. Keeps pass overrides.
    pub fn parse_options(mut self, parse: ParseOptions) -> Self {
        self.options.parse = parse;
        self
    }

    pub fn enable(mut self, pass: Pass) -> Self {
        self.options.overrides.insert(pass, true);
        self
    }

    pub fn disable(mut self, pass: Pass) -> Self {
        self.options.overrides.insert(pass, false);
        self
    }

    /// Run exactly `passes`, every other pass off.
    pub fn only(mut self, passes: &[Pass]) -> Self {
        self.options.overrides = Pass::all().iter().map(|&p| (p, passes.contains(&p))).collect();
        self
    }

    pub fn options(&self) -> &OptimizeOptions {
        &self.options
    }

    pub fn optimize(&self, pattern: &str) -> Result<Generated, RegexError> {
        optimize(pattern, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn builder_sets_every_option() {
        let options = ParseOptions::builder()
            .flags("x")
            .capture_group(true)
            .singleline(true)
            .skip_lookbehind_validation(true)
            .skip_property_name_validation(true)
            .normalize_unknown_property_names(true)
            .unicode_property_map(PropertyMap::from_names(["Foo"]))
            .build();
        assert_eq!(options.flags, "x");
        assert!(options.rules.capture_group);
        assert!(options.rules.singleline);
        assert!(!options.rules.allow_orphan_backrefs);
        assert!(options.skip_lookbehind_validation);
        assert!(options.skip_property_name_validation);
        assert!(options.normalize_unknown_property_names);
        assert!(options.unicode_property_map.is_some_and(|m| m.contains("Foo")));
    }

    #[test]
    fn to_ast_then_generate() {
        let ast = to_oniguruma_ast("(?i:a)b", &ParseOptions::default()).unwrap();
        assert_eq!(generate(&ast).unwrap().pattern, "(?i:a)b");
    }

    #[test]
    fn bad_flags_are_rejected() {
        let err = to_oniguruma_ast("a", &ParseOptions::builder().flags("q").build()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lex);
    }

    #[test]
    fn enable_after_only() {
        let optimizer = Optimizer::new().only(&[Pass::MergeRanges]).enable(Pass::DedupeClasses);
        assert_eq!(optimizer.options().active_passes(), vec![Pass::DedupeClasses, Pass::MergeRanges]);
        assert_eq!(optimizer.optimize("[aab-c]").unwrap().pattern, "[a-c]");
    }

    #[test]
    fn disable_single_pass() {
        let out = Optimizer::new().disable(Pass::UseUnicodeAliases).optimize(r"\p{Greek}").unwrap();
        assert_eq!(out.pattern, r"\p{Greek}");
    }
}
