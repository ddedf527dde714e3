// sets.rs - Character set spelling passes.

use crate::ast::{CharacterClassRange, CharacterSet, CharacterSetKind, ClassKind, Node, MAX_CODE_POINT};
use crate::error::RegexError;
use crate::traverser::{Path, Visitor};
use crate::unicode::{slug, PropertyMap};

fn set_slug(set: &CharacterSet) -> Option<String> {
    set.value.as_deref().map(slug)
}

/// Properties that together make up `\w`.
const WORD_PARTS: [&[&str]; 4] = [
    &["l", "letter"],
    &["m", "mark", "combiningmark"],
    &["n", "number"],
    &["pc", "connectorpunctuation"],
];

/// `\p{Nd}` → `\d`, `[[:xdigit:]]` → `\h`, `\p{White_Space}` → `\s`, and the
/// POSIX `digit`/`space`/`word` classes to their shorthands, each unless an
/// ASCII-restricting flag changes the shorthand's meaning.
pub(super) struct UseShorthands;

impl Visitor for UseShorthands {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let flags = *path.flags();
        let Node::CharacterSet(set) = path.node_mut() else {
            return Ok(());
        };
        let name = set_slug(set);
        let kind = match (set.kind, name.as_deref()) {
            (CharacterSetKind::Property, Some("nd" | "decimalnumber")) if !flags.digit_is_ascii => {
                CharacterSetKind::Digit
            }
            (CharacterSetKind::Property, Some("whitespace" | "wspace")) if !flags.space_is_ascii => {
                CharacterSetKind::Space
            }
            (CharacterSetKind::Posix, Some("xdigit")) => CharacterSetKind::Hex,
            (CharacterSetKind::Posix, Some("digit")) if !flags.posix_is_ascii && !flags.digit_is_ascii => {
                CharacterSetKind::Digit
            }
            (CharacterSetKind::Posix, Some("space")) if !flags.posix_is_ascii && !flags.space_is_ascii => {
                CharacterSetKind::Space
            }
            (CharacterSetKind::Posix, Some("word")) if !flags.posix_is_ascii && !flags.word_is_ascii => {
                CharacterSetKind::Word
            }
            _ => return Ok(()),
        };
        set.kind = kind;
        set.value = None;
        Ok(())
    }

    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if path.flags().word_is_ascii {
            return Ok(());
        }
        let Node::CharacterClass(class) = path.node_mut() else {
            return Ok(());
        };
        if class.kind != ClassKind::Union {
            return Ok(());
        }
        let mut positions = Vec::with_capacity(WORD_PARTS.len());
        for names in WORD_PARTS {
            let found = class.body.iter().position(|node| match node {
                Node::CharacterSet(set) if set.kind == CharacterSetKind::Property && !set.negate => {
                    set_slug(set).is_some_and(|s| names.contains(&s.as_str()))
                }
                _ => false,
            });
            match found {
                Some(i) => positions.push(i),
                None => return Ok(()),
            }
        }
        positions.sort_unstable_by(|a, b| b.cmp(a));
        let first = positions.last().copied().unwrap_or(0);
        for i in positions {
            class.body.remove(i);
        }
        class.body.insert(first, Node::CharacterSet(CharacterSet::new(CharacterSetKind::Word, false)));
        Ok(())
    }
}

/// `[[:cntrl:]]` → `\p{Cc}`; a set next to its own negation, or the full
/// code point range, → `\p{Any}`.
pub(super) struct UseUnicodeProps;

fn any() -> Node {
    Node::CharacterSet(CharacterSet::named(CharacterSetKind::Property, false, "Any"))
}

fn is_full_range(range: &CharacterClassRange) -> bool {
    range.min.value == 0 && range.max.value == MAX_CODE_POINT
}

impl Visitor for UseUnicodeProps {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let posix_is_ascii = path.flags().posix_is_ascii;
        if let Node::CharacterSet(set) = path.node_mut() {
            if set.kind == CharacterSetKind::Posix && !posix_is_ascii && set_slug(set).as_deref() == Some("cntrl") {
                set.kind = CharacterSetKind::Property;
                set.value = Some("Cc".to_string());
            }
        }
        Ok(())
    }

    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Node::CharacterClass(class) = path.node_mut() else {
            return Ok(());
        };
        if class.kind != ClassKind::Union {
            return Ok(());
        }
        for node in class.body.iter_mut() {
            if matches!(node, Node::CharacterClassRange(r) if is_full_range(r)) {
                *node = any();
            }
        }
        let pair = class.body.iter().enumerate().find_map(|(i, a)| {
            let Node::CharacterSet(a) = a else { return None };
            if !a.kind.is_universally_negatable() {
                return None;
            }
            class.body[i + 1..]
                .iter()
                .position(|b| matches!(b, Node::CharacterSet(b) if b.kind == a.kind && b.value == a.value && b.negate != a.negate))
                .map(|j| (i, i + 1 + j))
        });
        if let Some((i, j)) = pair {
            class.body.remove(j);
            class.body[i] = any();
        }
        Ok(())
    }
}

/// `\p{Uppercase_Letter}` → `\p{Lu}`, using the aliases of the active property map.
pub(super) struct UseUnicodeAliases<'m> {
    pub(super) properties: &'m PropertyMap,
}

impl Visitor for UseUnicodeAliases<'_> {
    fn enter_character_set(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if let Node::CharacterSet(set) = path.node_mut() {
            if set.kind == CharacterSetKind::Property {
                let alias = set.value.as_deref().and_then(|v| self.properties.shortest_alias(v));
                if let Some(alias) = alias.map(str::to_string) {
                    set.value = Some(alias);
                }
            }
        }
        Ok(())
    }
}
