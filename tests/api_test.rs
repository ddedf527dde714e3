// api_test.rs - Integration tests for the idiomatic Rust API.

use ferroni_syntax::ast::{Node, Reference};
use ferroni_syntax::error::{ErrorKind, RegexError};
use ferroni_syntax::prelude::*;
use ferroni_syntax::unicode::PropertyMap;

fn print(pattern: &str, options: &ParseOptions) -> Result<Generated, RegexError> {
    generate(&to_oniguruma_ast(pattern, options)?)
}

// === to_oniguruma_ast ===

#[test]
fn simple_pattern() {
    let ast = to_oniguruma_ast(r"\d+", &ParseOptions::default()).unwrap();
    assert_eq!(ast.pattern.body.len(), 1);
    let elements = ast.pattern.body[0].elements().unwrap();
    assert!(matches!(elements[0], Node::Quantifier(_)));
}

#[test]
fn empty_pattern() {
    let ast = to_oniguruma_ast("", &ParseOptions::default()).unwrap();
    assert_eq!(ast.pattern.body.len(), 1);
    assert!(ast.pattern.body[0].elements().unwrap().is_empty());
}

#[test]
fn flags_are_resolved() {
    let options = ParseOptions::builder().flags("imxDy{g}").build();
    let ast = to_oniguruma_ast("a b # comment", &options).unwrap();
    assert!(ast.flags.ignore_case);
    assert!(ast.flags.dot_all);
    assert!(ast.flags.extended);
    assert!(ast.flags.digit_is_ascii);
    assert_eq!(print("a b # comment", &options).unwrap().pattern, "ab");
}

#[test]
fn invalid_pattern_structure_error() {
    let err = to_oniguruma_ast("(unclosed", &ParseOptions::default()).unwrap_err();
    match err {
        RegexError::Structure { .. } => {}
        other => panic!("expected Structure error, got {:?}", other),
    }
}

#[test]
fn orphan_backref_is_marked() {
    let options = ParseOptions::builder().allow_orphan_backrefs(true).build();
    let ast = to_oniguruma_ast(r"\2a", &options).unwrap();
    match &ast.pattern.body[0].elements().unwrap()[0] {
        Node::Backreference(b) => {
            assert!(b.orphan);
            assert_eq!(b.reference, Reference::Number(2));
        }
        other => panic!("expected backreference, got {:?}", other),
    }
}

#[test]
fn custom_property_map() {
    let options = ParseOptions::builder()
        .unicode_property_map(PropertyMap::from_names(["Hiragana"]))
        .build();
    assert!(to_oniguruma_ast(r"\p{Hiragana}+", &options).is_ok());
    assert_eq!(
        to_oniguruma_ast(r"\p{Greek}", &options).unwrap_err().kind(),
        ErrorKind::Lex
    );
}

// === generate ===

#[test]
fn generate_keeps_flags() {
    let options = ParseOptions::builder().flags("iW").build();
    let out = print("(?i:a)b", &options).unwrap();
    assert_eq!(out.pattern, "(?i:a)b");
    assert_eq!(out.flags, "iW");
}

#[test]
fn generate_is_stable_on_own_output() {
    let options = ParseOptions::default();
    let first = print(r"[\-a]\x7F(?<n>x)\k<n>", &options).unwrap();
    let second = print(&first.pattern, &options).unwrap();
    assert_eq!(first, second);
}

// === Optimizer ===

#[test]
fn optimizer_defaults() {
    let out = Optimizer::new().optimize("[[^[^a]]&&[b]]").unwrap();
    assert_eq!(out, Generated { pattern: "[a&&b]".to_string(), flags: String::new() });
}

#[test]
fn optimizer_with_flags() {
    let out = Optimizer::new().flags("ix").optimize("").unwrap();
    assert_eq!(out.pattern, "");
    assert_eq!(out.flags, "i");
}

#[test]
fn optimizer_only() {
    let out = Optimizer::new().only(&[Pass::ExtractPrefix]).optimize("^a|^ab|^ac").unwrap();
    assert_eq!(out.pattern, "^a(?:|b|c)");
}

#[test]
fn optimizer_disable() {
    let out = Optimizer::new().disable(Pass::MergeRanges).optimize("[abc]").unwrap();
    assert_eq!(out.pattern, "[abc]");
    let out = Optimizer::new().optimize("[abc]").unwrap();
    assert_eq!(out.pattern, "[a-c]");
}

#[test]
fn optimizer_parse_options() {
    let parse = ParseOptions::builder().allow_orphan_backrefs(true).build();
    let out = Optimizer::new().parse_options(parse).optimize(r"\2a").unwrap();
    assert_eq!(out.pattern, r"\2a");
}

#[test]
fn free_function_optimize() {
    let mut options = OptimizeOptions::default();
    options.overrides.insert(Pass::UseUnicodeAliases, false);
    let out = optimize(r"\p{Greek}", &options).unwrap();
    assert_eq!(out.pattern, r"\p{Greek}");
}

#[test]
fn pass_names() {
    assert_eq!(Pass::all().len(), 21);
    assert_eq!("extractPrefix2".parse::<Pass>().unwrap(), Pass::ExtractPrefix2);
    assert_eq!(Pass::PreventReDoS.to_string(), "preventReDoS");
    assert_eq!("nope".parse::<Pass>().unwrap_err().kind(), ErrorKind::Policy);
}

// === Visitor ===

#[derive(Default)]
struct CountCharacters {
    count: usize,
}

impl Visitor for CountCharacters {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if matches!(path.node(), Node::Character(_)) {
            self.count += 1;
        }
        Ok(())
    }
}

struct DropAssertions;

impl Visitor for DropAssertions {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if matches!(path.node(), Node::Assertion(_)) {
            path.remove()?;
        }
        Ok(())
    }
}

struct SwapAForB;

impl Visitor for SwapAForB {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if path.node().as_character().is_some_and(|c| c.value == u32::from(b'a')) {
            *path.node_mut() = Node::character('b');
        }
        Ok(())
    }
}

#[test]
fn visitor_counts() {
    let mut ast = to_oniguruma_ast("ab(c|d)*", &ParseOptions::default()).unwrap();
    let mut counter = CountCharacters::default();
    traverse(&mut ast, &mut counter).unwrap();
    assert_eq!(counter.count, 4);
}

#[test]
fn visitor_removes() {
    let mut ast = to_oniguruma_ast(r"^a\b$", &ParseOptions::default()).unwrap();
    traverse(&mut ast, &mut DropAssertions).unwrap();
    assert_eq!(generate(&ast).unwrap().pattern, "a");
}

#[test]
fn visitor_replaces() {
    let mut ast = to_oniguruma_ast("a(?:xa)+", &ParseOptions::default()).unwrap();
    traverse(&mut ast, &mut SwapAForB).unwrap();
    assert_eq!(generate(&ast).unwrap().pattern, "b(?:xb)+");
}

// === Typed hooks and root ===

#[derive(Default)]
struct HookLog(Vec<String>);

impl Visitor for HookLog {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        self.0.push(format!("+{:?}", path.node().kind()));
        Ok(())
    }

    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        self.0.push(format!("-{:?}", path.node().kind()));
        Ok(())
    }

    fn enter_group(&mut self, _path: &mut Path<'_>) -> Result<(), RegexError> {
        self.0.push("+group".into());
        Ok(())
    }

    fn exit_group(&mut self, _path: &mut Path<'_>) -> Result<(), RegexError> {
        self.0.push("-group".into());
        Ok(())
    }

    fn enter_character(&mut self, _path: &mut Path<'_>) -> Result<(), RegexError> {
        self.0.push("+char".into());
        Ok(())
    }
}

#[test]
fn typed_hooks_nest_inside_wildcard_hooks() {
    let mut ast = to_oniguruma_ast("(?:a)", &ParseOptions::default()).unwrap();
    let mut log = HookLog::default();
    traverse(&mut ast, &mut log).unwrap();
    let expected = [
        "+Pattern", "+Alternative", "+Group", "+group", "+Alternative", "+Character", "+char",
        "-Character", "-Alternative", "-group", "-Group", "-Alternative", "-Pattern",
    ];
    assert_eq!(log.0, expected);
}

struct UnwrapQuantifiers;

impl Visitor for UnwrapQuantifiers {
    fn enter_quantifier(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Node::Quantifier(q) = path.node() else {
            return Ok(());
        };
        let body = (*q.body).clone();
        path.replace_with(body, true)
    }
}

#[test]
fn typed_hook_edits_the_tree() {
    let mut ast = to_oniguruma_ast("a*(?:b+)?c", &ParseOptions::default()).unwrap();
    traverse(&mut ast, &mut UnwrapQuantifiers).unwrap();
    assert_eq!(generate(&ast).unwrap().pattern, "a(?:b)c");
}

/// Drops `a` and checks the root snapshot at every other character.
struct RootReader {
    wants_root: bool,
    seen: Vec<Option<(usize, bool)>>,
}

impl Visitor for RootReader {
    fn wants_root(&self) -> bool {
        self.wants_root
    }

    fn enter_character(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if path.node().as_character().is_some_and(|c| c.value == u32::from(b'a')) {
            return path.remove();
        }
        let root = path.root();
        self.seen.push(root.map(|r| (r.pattern.body[0].elements().map_or(0, Vec::len), r.flags.ignore_case)));
        Ok(())
    }
}

#[test]
fn path_root_is_the_snapshot_from_the_start_of_the_walk() {
    let options = ParseOptions::builder().flags("i").build();
    let mut ast = to_oniguruma_ast("abc", &options).unwrap();
    let mut reader = RootReader { wants_root: true, seen: Vec::new() };
    traverse(&mut ast, &mut reader).unwrap();
    assert_eq!(reader.seen, vec![Some((3, true)), Some((3, true))]);
    assert_eq!(generate(&ast).unwrap().pattern, "bc");
}

#[test]
fn path_root_is_absent_unless_requested() {
    let mut ast = to_oniguruma_ast("bc", &ParseOptions::default()).unwrap();
    let mut reader = RootReader { wants_root: false, seen: Vec::new() };
    traverse(&mut ast, &mut reader).unwrap();
    assert_eq!(reader.seen, vec![None, None]);
}
