// parser.rs - Token list to AST.
//
// Recursive descent over the token stream. Group context (open capture
// count, group names, lookbehind nesting) is threaded through the descent;
// subroutine targets are checked once every group is known, and the groups
// they call are marked afterwards with a traversal.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ast::{
    AbsentFunction, Alternative, Backreference, CalloutArg, CapturingGroup, Character,
    CharacterClass, CharacterClassRange, CharacterSet, CharacterSetKind, ClassKind, Directive,
    Group, LookaroundAssertion, LookaroundKind, NamedCallout, Node, OnigurumaAst, Pattern,
    Quantifier, Reference, Subroutine,
};
use crate::error::RegexError;
use crate::flags::FlagGroupModifiers;
use crate::tokenizer::{GroupOpenKind, RefTarget, Rules, Token, TokenKind, TokenizerResult};
use crate::traverser::{traverse, Path, Visitor};
use crate::unicode::{is_posix_class, normalize_property_name, slug, PropertyMap};

/// Options for turning a pattern into an AST.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Flags string, e.g. `"ix"`.
    pub flags: String,
    pub rules: Rules,
    /// Pass unknown `\p{..}` names through in `Title_Case` form.
    pub normalize_unknown_property_names: bool,
    /// Allow constructs Oniguruma rejects inside lookbehind.
    pub skip_lookbehind_validation: bool,
    /// Pass unknown `\p{..}` names through as written.
    pub skip_property_name_validation: bool,
    /// Known property names; the built-in map when `None`.
    pub unicode_property_map: Option<PropertyMap>,
}

/// Deepest nesting of groups, classes and quantifiers a pattern may have.
///
/// Every later stage walks the tree recursively, so the limit bounds their
/// stack use as well. Lower than Oniguruma's parse depth limit of 4096.
pub const MAX_NESTING_DEPTH: u32 = 256;

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    /// Groups and classes enclosing the current position.
    depth: u32,
    in_lookbehind: bool,
    in_positive_lookbehind: bool,
    in_negative_lookbehind: bool,
    in_absent: bool,
}

struct Parser<'o> {
    tokens: std::vec::IntoIter<Token>,
    options: &'o ParseOptions,
    properties: &'o PropertyMap,
    has_named: bool,
    /// Number of the most recently opened capturing group.
    opened: u32,
    names: HashMap<String, Vec<u32>>,
    subroutines: Vec<Reference>,
}

enum ClassItem {
    Node(Node),
    Hyphen,
}

/// Build the AST for a token list.
pub fn parse(tokenized: TokenizerResult, options: &ParseOptions) -> Result<OnigurumaAst, RegexError> {
    let builtin;
    let properties = match &options.unicode_property_map {
        Some(map) => map,
        None => {
            builtin = PropertyMap::default();
            &builtin
        }
    };
    let has_named = tokenized.tokens.iter().any(|t| {
        matches!(&t.kind, TokenKind::GroupOpen { kind: GroupOpenKind::Capturing, name: Some(_), .. })
    });
    let mut parser = Parser {
        tokens: tokenized.tokens.into_iter(),
        options,
        properties,
        has_named,
        opened: 0,
        names: HashMap::new(),
        subroutines: Vec::new(),
    };
    let (alternatives, _) = parser.alternatives(Scope::default(), false)?;
    let targets = parser.resolve_subroutines()?;
    let mut ast = OnigurumaAst { pattern: Pattern::new(alternatives), flags: tokenized.flags };
    if !targets.is_empty() {
        traverse(&mut ast, &mut MarkSubroutined { targets })?;
    }
    Ok(ast)
}

impl<'o> Parser<'o> {
    /// Parse alternatives up to the closing parenthesis (or the end); also
    /// returns the nesting height of the tallest element.
    fn alternatives(&mut self, scope: Scope, closing: bool) -> Result<(Vec<Alternative>, u32), RegexError> {
        let mut alternatives = vec![Alternative::default()];
        let mut height = 0;
        let mut last = 0;
        loop {
            let Some(token) = self.tokens.next() else {
                if closing {
                    return Err(RegexError::structure("unclosed group"));
                }
                break;
            };
            match token.kind {
                TokenKind::GroupClose if closing => break,
                TokenKind::GroupClose => return Err(RegexError::structure("unmatched close parenthesis")),
                TokenKind::Alternator => {
                    alternatives.push(Alternative::default());
                    last = 0;
                }
                kind => {
                    // `alternatives` starts non-empty and only grows.
                    let Some(current) = alternatives.last_mut() else {
                        return Err(RegexError::bug("alternative list is empty"));
                    };
                    last = self.element(kind, &mut current.body, last, scope)?;
                    height = height.max(last);
                }
            }
        }
        Ok((alternatives, height))
    }

    /// Push the node for one token onto `body`; returns its nesting height.
    /// `last` is the height of the element a quantifier would wrap.
    fn element(
        &mut self,
        kind: TokenKind,
        body: &mut Vec<Node>,
        last: u32,
        scope: Scope,
    ) -> Result<u32, RegexError> {
        let mut height = 0;
        let node = match kind {
            TokenKind::Assertion { kind, negate } => Node::Assertion(crate::ast::Assertion { kind, negate }),
            TokenKind::Backreference { target } => self.backreference(target)?,
            TokenKind::Character { value } => Node::Character(Character::new(value)?),
            TokenKind::CharacterClassOpen { negate } => {
                let (node, h) = self.class(negate, scope.depth)?;
                height = h;
                node
            }
            TokenKind::CharacterSet { kind, negate, value } => self.character_set(kind, negate, value)?,
            TokenKind::Directive { kind, flags } => Node::Directive(Directive { kind, flags }),
            TokenKind::GroupOpen { kind, name, number, negate, flags } => {
                let (node, h) = self.group(kind, name, number, negate, flags, scope)?;
                height = h;
                node
            }
            TokenKind::NamedCallout { kind, tag, arguments } => Node::NamedCallout(NamedCallout {
                kind,
                tag,
                arguments: arguments.map(|raw| raw.split(',').map(CalloutArg::parse).collect()),
            }),
            TokenKind::Quantifier { kind, min, max } => {
                let target = body
                    .pop()
                    .ok_or_else(|| RegexError::structure("target of quantifier is not specified"))?;
                height = last + 1;
                check_depth(scope.depth + height)?;
                Node::Quantifier(Quantifier::new(target, min, max, kind)?)
            }
            TokenKind::Subroutine { target } => self.subroutine(target, scope)?,
            other => return Err(RegexError::bug(format!("unexpected token {:?}", other))),
        };
        body.push(node);
        Ok(height)
    }

    fn group(
        &mut self,
        kind: GroupOpenKind,
        name: Option<String>,
        number: Option<u32>,
        negate: bool,
        flags: Option<FlagGroupModifiers>,
        scope: Scope,
    ) -> Result<(Node, u32), RegexError> {
        check_depth(scope.depth + 1)?;
        if !self.options.skip_lookbehind_validation {
            match kind {
                GroupOpenKind::Lookahead if scope.in_lookbehind => {
                    return Err(RegexError::policy("lookahead is not allowed inside lookbehind"));
                }
                GroupOpenKind::Lookbehind if negate && scope.in_positive_lookbehind => {
                    return Err(RegexError::policy(
                        "negative lookbehind is not allowed inside positive lookbehind",
                    ));
                }
                GroupOpenKind::Capturing if scope.in_negative_lookbehind => {
                    return Err(RegexError::policy("capturing group is not allowed inside negative lookbehind"));
                }
                _ => {}
            }
        }
        let mut inner = scope;
        inner.depth += 1;
        match kind {
            GroupOpenKind::Lookbehind => {
                inner.in_lookbehind = true;
                if negate {
                    inner.in_negative_lookbehind = true;
                } else {
                    inner.in_positive_lookbehind = true;
                }
            }
            GroupOpenKind::Absent => inner.in_absent = true,
            GroupOpenKind::Capturing => {
                let number = number.ok_or_else(|| RegexError::bug("capturing group without a number"))?;
                self.opened = number;
                if let Some(name) = &name {
                    self.names.entry(name.clone()).or_default().push(number);
                }
            }
            _ => {}
        }
        let (alternatives, height) = self.alternatives(inner, true)?;
        let node = match kind {
            GroupOpenKind::Absent => Node::AbsentFunction(AbsentFunction::new(alternatives)),
            GroupOpenKind::Atomic => Node::Group(Group::atomic(alternatives)),
            GroupOpenKind::Capturing => {
                Node::CapturingGroup(CapturingGroup::new(self.opened_number(number)?, name, alternatives)?)
            }
            GroupOpenKind::Group => match flags {
                Some(flags) => Node::Group(Group::with_flags(flags, alternatives)),
                None => Node::Group(Group::new(alternatives)),
            },
            GroupOpenKind::Lookahead => {
                Node::LookaroundAssertion(LookaroundAssertion::new(LookaroundKind::Lookahead, negate, alternatives))
            }
            GroupOpenKind::Lookbehind => {
                Node::LookaroundAssertion(LookaroundAssertion::new(LookaroundKind::Lookbehind, negate, alternatives))
            }
        };
        Ok((node, height + 1))
    }

    fn opened_number(&self, number: Option<u32>) -> Result<u32, RegexError> {
        number.ok_or_else(|| RegexError::bug("capturing group without a number"))
    }

    fn check_numbered(&self, what: &str) -> Result<(), RegexError> {
        if self.has_named && !self.options.rules.capture_group {
            return Err(RegexError::reference(format!(
                "numbered {} is not allowed when named groups are used",
                what
            )));
        }
        Ok(())
    }

    fn resolve_relative(&self, offset: i32) -> Result<u32, RegexError> {
        let base = i64::from(self.opened);
        let n = if offset < 0 { base + 1 + i64::from(offset) } else { base + i64::from(offset) };
        u32::try_from(n)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| RegexError::reference(format!("invalid relative group reference {}", offset)))
    }

    fn backreference(&mut self, target: RefTarget) -> Result<Node, RegexError> {
        let allow_orphan = self.options.rules.allow_orphan_backrefs;
        let (reference, defined) = match target {
            RefTarget::Name(name) => {
                let defined = self.names.contains_key(&name);
                (Reference::Name(name), defined)
            }
            RefTarget::Number(0) => return Err(RegexError::reference("invalid backreference number 0")),
            RefTarget::Number(n) => {
                self.check_numbered("backreference")?;
                (Reference::Number(n), n <= self.opened)
            }
            RefTarget::Relative(offset) => {
                self.check_numbered("backreference")?;
                (Reference::Number(self.resolve_relative(offset)?), true)
            }
        };
        if !defined {
            if !allow_orphan {
                return Err(RegexError::reference(format!(
                    "backreference to undefined group {:?}",
                    reference
                )));
            }
            debug!(?reference, "keeping orphan backreference");
        }
        Ok(Node::Backreference(Backreference { reference, orphan: !defined }))
    }

    fn subroutine(&mut self, target: RefTarget, scope: Scope) -> Result<Node, RegexError> {
        if scope.in_absent {
            return Err(RegexError::policy("subroutine is not supported inside absent function"));
        }
        let reference = match target {
            RefTarget::Name(name) => Reference::Name(name),
            RefTarget::Number(0) => Reference::Number(0),
            RefTarget::Number(n) => {
                self.check_numbered("subroutine")?;
                Reference::Number(n)
            }
            RefTarget::Relative(offset) => {
                self.check_numbered("subroutine")?;
                Reference::Number(self.resolve_relative(offset)?)
            }
        };
        self.subroutines.push(reference.clone());
        Ok(Node::Subroutine(Subroutine { reference }))
    }

    /// Check every subroutine target; returns the group numbers called.
    fn resolve_subroutines(&self) -> Result<HashSet<u32>, RegexError> {
        let mut targets = HashSet::new();
        for reference in &self.subroutines {
            match reference {
                Reference::Number(0) => {}
                Reference::Number(n) if *n > self.opened => {
                    return Err(RegexError::reference(format!("subroutine to undefined group {}", n)));
                }
                Reference::Number(n) => {
                    targets.insert(*n);
                }
                Reference::Name(name) => match self.names.get(name).map(Vec::as_slice) {
                    Some([number]) => {
                        targets.insert(*number);
                    }
                    Some(_) => {
                        return Err(RegexError::reference(format!(
                            "subroutine to duplicate group name \"{}\"",
                            name
                        )))
                    }
                    None => {
                        return Err(RegexError::reference(format!(
                            "subroutine to undefined group name \"{}\"",
                            name
                        )))
                    }
                },
            }
        }
        Ok(targets)
    }

    fn character_set(
        &self,
        kind: CharacterSetKind,
        negate: bool,
        value: Option<String>,
    ) -> Result<Node, RegexError> {
        if kind != CharacterSetKind::Property {
            return Ok(Node::CharacterSet(CharacterSet { kind, negate, value }));
        }
        let name = value.ok_or_else(|| RegexError::bug("property without a name"))?;
        let set = if let Some(canonical) = self.properties.get(&name) {
            CharacterSet::named(CharacterSetKind::Property, negate, canonical)
        } else if is_posix_class(&name) {
            CharacterSet::named(CharacterSetKind::Posix, negate, slug(&name))
        } else if self.options.normalize_unknown_property_names {
            CharacterSet::named(CharacterSetKind::Property, negate, normalize_property_name(&name))
        } else if self.options.skip_property_name_validation {
            debug!(%name, "passing through unknown property name");
            CharacterSet::named(CharacterSetKind::Property, negate, name)
        } else {
            return Err(RegexError::lex(format!("invalid Unicode property \"{}\"", name)));
        };
        Ok(Node::CharacterSet(set))
    }

    /// Parse a class opened at nesting `depth`; returns it with its height.
    fn class(&mut self, negate: bool, depth: u32) -> Result<(Node, u32), RegexError> {
        check_depth(depth + 1)?;
        let mut segments: Vec<Vec<ClassItem>> = vec![Vec::new()];
        loop {
            let token = self
                .tokens
                .next()
                .ok_or_else(|| RegexError::lex("unclosed character class"))?;
            let item = match token.kind {
                TokenKind::CharacterClassClose => break,
                TokenKind::CharacterClassIntersector => {
                    segments.push(Vec::new());
                    continue;
                }
                TokenKind::CharacterClassHyphen => ClassItem::Hyphen,
                TokenKind::CharacterClassOpen { negate } => {
                    let (nested, _) = self.class(negate, depth + 1)?;
                    ClassItem::Node(nested)
                }
                TokenKind::Character { value } => ClassItem::Node(Node::Character(Character::new(value)?)),
                TokenKind::CharacterSet { kind, negate, value } => {
                    ClassItem::Node(self.character_set(kind, negate, value)?)
                }
                other => {
                    return Err(RegexError::bug(format!("unexpected token {:?} in character class", other)))
                }
            };
            if let Some(segment) = segments.last_mut() {
                segment.push(item);
            }
        }
        let mut segments = segments
            .into_iter()
            .map(class_segment)
            .collect::<Result<Vec<_>, _>>()?;
        let class = if segments.len() == 1 {
            CharacterClass::new(ClassKind::Union, negate, segments.pop().unwrap_or_default())
        } else {
            let body = segments.into_iter().map(segment_node).collect();
            CharacterClass::new(ClassKind::Intersection, negate, body)
        };
        let height = class_height(&class);
        check_depth(depth + height)?;
        Ok((Node::CharacterClass(class), height))
    }
}

fn check_depth(depth: u32) -> Result<(), RegexError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(RegexError::structure(format!(
            "parse depth limit over: nesting deeper than {}",
            MAX_NESTING_DEPTH
        )));
    }
    Ok(())
}

/// Levels of nested classes and ranges below and including `class`.
fn class_height(class: &CharacterClass) -> u32 {
    let inner = class
        .body
        .iter()
        .map(|item| match item {
            Node::CharacterClass(c) => class_height(c),
            Node::CharacterClassRange(_) => 1,
            _ => 0,
        })
        .max()
        .unwrap_or(0);
    inner + 1
}

/// Resolve hyphens in one `&&`-delimited segment: `a-z` becomes a range,
/// any other hyphen a literal `-`.
fn class_segment(items: Vec<ClassItem>) -> Result<Vec<Node>, RegexError> {
    let mut out: Vec<ClassItem> = Vec::with_capacity(items.len());
    for item in items {
        if let ClassItem::Node(Node::Character(max)) = &item {
            if let [.., ClassItem::Node(Node::Character(min)), ClassItem::Hyphen] = out.as_slice() {
                let range = CharacterClassRange::new(*min, *max)?;
                out.truncate(out.len() - 2);
                out.push(ClassItem::Node(Node::CharacterClassRange(range)));
                continue;
            }
        }
        out.push(item);
    }
    Ok(out
        .into_iter()
        .map(|item| match item {
            ClassItem::Node(node) => node,
            ClassItem::Hyphen => Node::character('-'),
        })
        .collect())
}

fn segment_node(mut segment: Vec<Node>) -> Node {
    if segment.len() == 1 {
        if let Some(node) = segment.pop() {
            return node;
        }
    }
    Node::CharacterClass(CharacterClass::union(segment))
}

struct MarkSubroutined {
    targets: HashSet<u32>,
}

impl Visitor for MarkSubroutined {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if let Node::CapturingGroup(group) = path.node_mut() {
            if self.targets.contains(&group.number) {
                group.is_subroutined = true;
            }
        }
        Ok(())
    }
}
