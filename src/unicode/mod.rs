// unicode/mod.rs - Unicode property and POSIX class name lookup service.
//
// The parser and the optimizer never embed property data directly; they are
// handed a `PropertyMap` through their options. The default map carries the
// general categories, a set of binary properties and common scripts.

use std::collections::HashMap;

/// POSIX bracket class names accepted by Oniguruma.
pub const POSIX_CLASS_NAMES: &[&str] = &[
    "alnum", "alpha", "ascii", "blank", "cntrl", "digit", "graph", "lower", "print", "punct",
    "space", "upper", "word", "xdigit",
];

// (long name, short alias). Binary properties whose alias collides with a
// POSIX class name (Alpha, Upper, Lower) are absent.
const PROPERTY_ALIASES: &[(&str, &str)] = &[
    ("Letter", "L"),
    ("Cased_Letter", "LC"),
    ("Uppercase_Letter", "Lu"),
    ("Lowercase_Letter", "Ll"),
    ("Titlecase_Letter", "Lt"),
    ("Modifier_Letter", "Lm"),
    ("Other_Letter", "Lo"),
    ("Mark", "M"),
    ("Nonspacing_Mark", "Mn"),
    ("Spacing_Mark", "Mc"),
    ("Enclosing_Mark", "Me"),
    ("Number", "N"),
    ("Decimal_Number", "Nd"),
    ("Letter_Number", "Nl"),
    ("Other_Number", "No"),
    ("Punctuation", "P"),
    ("Connector_Punctuation", "Pc"),
    ("Dash_Punctuation", "Pd"),
    ("Open_Punctuation", "Ps"),
    ("Close_Punctuation", "Pe"),
    ("Initial_Punctuation", "Pi"),
    ("Final_Punctuation", "Pf"),
    ("Other_Punctuation", "Po"),
    ("Symbol", "S"),
    ("Math_Symbol", "Sm"),
    ("Currency_Symbol", "Sc"),
    ("Modifier_Symbol", "Sk"),
    ("Other_Symbol", "So"),
    ("Separator", "Z"),
    ("Space_Separator", "Zs"),
    ("Line_Separator", "Zl"),
    ("Paragraph_Separator", "Zp"),
    ("Other", "C"),
    ("Control", "Cc"),
    ("Format", "Cf"),
    ("Surrogate", "Cs"),
    ("Private_Use", "Co"),
    ("Unassigned", "Cn"),
    ("ASCII_Hex_Digit", "AHex"),
    ("Hex_Digit", "Hex"),
    ("Ideographic", "Ideo"),
    ("White_Space", "WSpace"),
    ("Default_Ignorable_Code_Point", "DI"),
    ("Emoji_Presentation", "EPres"),
    ("Extended_Pictographic", "ExtPict"),
    ("Arabic", "Arab"),
    ("Armenian", "Armn"),
    ("Bengali", "Beng"),
    ("Cyrillic", "Cyrl"),
    ("Devanagari", "Deva"),
    ("Georgian", "Geor"),
    ("Greek", "Grek"),
    ("Han", "Hani"),
    ("Hangul", "Hang"),
    ("Hebrew", "Hebr"),
    ("Hiragana", "Hira"),
    ("Inherited", "Zinh"),
    ("Katakana", "Kana"),
    ("Latin", "Latn"),
    ("Common", "Zyyy"),
    ("Ethiopic", "Ethi"),
    ("Tamil", "Taml"),
    ("Telugu", "Telu"),
];

// Names without a shorter alias.
const PROPERTY_NAMES: &[&str] = &[
    "Any", "Assigned", "ASCII", "Alphabetic", "Uppercase", "Lowercase", "Cased", "Dash",
    "Diacritic", "Emoji", "Extender", "Math", "Thai",
];

/// Lowercase and drop spaces, hyphens and underscores.
pub fn slug(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether `name` (after slugging) is a POSIX bracket class name.
pub fn is_posix_class(name: &str) -> bool {
    POSIX_CLASS_NAMES.contains(&slug(name).as_str())
}

/// `some name` → `Some_Name`, used when an unknown property name is passed through.
pub fn normalize_property_name(name: &str) -> String {
    name.trim()
        .split(|c| matches!(c, ' ' | '-' | '_'))
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Slug → canonical spelling map for Unicode property names, plus the
/// short alias of each long name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMap {
    by_slug: HashMap<String, String>,
    /// Slug of either spelling → short alias.
    aliases: HashMap<String, String>,
}

impl PropertyMap {
    /// An empty map: every `\p{..}` name is unknown unless it is a POSIX class.
    pub fn empty() -> Self {
        PropertyMap { by_slug: HashMap::new(), aliases: HashMap::new() }
    }

    /// Build a map from canonical spellings.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = PropertyMap::empty();
        for name in names {
            map.insert(name);
        }
        map
    }

    /// Register a canonical spelling under its slug.
    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.by_slug.insert(slug(&name), name);
    }

    /// Register `long` and `short` as two spellings of one property.
    pub fn insert_alias(&mut self, long: impl Into<String>, short: impl Into<String>) {
        let (long, short) = (long.into(), short.into());
        self.aliases.insert(slug(&long), short.clone());
        self.aliases.insert(slug(&short), short.clone());
        self.insert(long);
        self.insert(short);
    }

    /// The short alias of `name`, if one is registered and it is shorter than `name`.
    pub fn shortest_alias(&self, name: &str) -> Option<&str> {
        self.aliases
            .get(&slug(name))
            .map(String::as_str)
            .filter(|short| short.len() < name.len())
    }

    /// Look up the canonical spelling of any spelling of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_slug.get(&slug(name)).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_slug.contains_key(&slug(name))
    }

    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }
}

impl Default for PropertyMap {
    fn default() -> Self {
        let mut map = PropertyMap::from_names(PROPERTY_NAMES.iter().copied());
        for (long, short) in PROPERTY_ALIASES {
            map.insert_alias(*long, *short);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_strips_separators() {
        assert_eq!(slug("Decimal_Number"), "decimalnumber");
        assert_eq!(slug("decimal-number"), "decimalnumber");
        assert_eq!(slug("Decimal Number"), "decimalnumber");
    }

    #[test]
    fn default_map_resolves_any_spelling() {
        let map = PropertyMap::default();
        assert_eq!(map.get("decimal number"), Some("Decimal_Number"));
        assert_eq!(map.get("LU"), Some("Lu"));
        assert_eq!(map.get("greek"), Some("Greek"));
        assert!(!map.contains("punct"));
        assert!(!map.contains("alpha"));
    }

    #[test]
    fn posix_names() {
        assert!(is_posix_class("Alnum"));
        assert!(is_posix_class("x_digit"));
        assert!(!is_posix_class("Letter"));
    }

    #[test]
    fn aliases_only_when_shorter() {
        let map = PropertyMap::default();
        assert_eq!(map.shortest_alias("Uppercase_Letter"), Some("Lu"));
        assert_eq!(map.shortest_alias("greek"), Some("Grek"));
        assert_eq!(map.shortest_alias("Lu"), None);
        assert_eq!(map.shortest_alias("Any"), None);
    }

    #[test]
    fn custom_aliases() {
        let mut map = PropertyMap::from_names(["Greek"]);
        assert_eq!(map.shortest_alias("Greek"), None);
        map.insert_alias("Hiragana", "Hira");
        assert_eq!(map.get("hira"), Some("Hira"));
        assert_eq!(map.get("HIRAGANA"), Some("Hiragana"));
        assert_eq!(map.shortest_alias("hiragana"), Some("Hira"));
    }

    #[test]
    fn normalizes_unknown_names() {
        assert_eq!(normalize_property_name("some-odd name"), "Some_Odd_Name");
    }
}
