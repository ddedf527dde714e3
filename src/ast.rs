// ast.rs - AST node model.
//
// One variant per node kind. Alternative containers (Pattern, Group,
// CapturingGroup, LookaroundAssertion, AbsentFunction) hold their
// alternatives as `Node::Alternative` entries in `body`, so the traverser can
// address every child list the same way. Nodes never point at their parent.

use crate::error::RegexError;
use crate::flags::{FlagGroupModifiers, Flags};

/// Highest valid code point.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

// === Scalar kinds ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssertionKind {
    /// `$`
    LineEnd,
    /// `^`
    LineStart,
    /// `\G`
    SearchStart,
    /// `\z`
    StringEnd,
    /// `\Z`
    StringEndNewline,
    /// `\A`
    StringStart,
    /// `\y` / `\Y`
    TextSegmentBoundary,
    /// `\b` / `\B`
    WordBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterSetKind {
    /// `\O`
    Any,
    /// `\d`
    Digit,
    /// `.`
    Dot,
    /// `\X`
    Grapheme,
    /// `\h`
    Hex,
    /// `\R` (`negate == false`) and `\N` (`negate == true`)
    Newline,
    /// `[:name:]`
    Posix,
    /// `\p{Name}`
    Property,
    /// `\s`
    Space,
    /// `\w`
    Word,
}

impl CharacterSetKind {
    /// Kinds valid both inside and outside a class and invertible through `negate`.
    pub fn is_universally_negatable(self) -> bool {
        matches!(
            self,
            CharacterSetKind::Digit
                | CharacterSetKind::Hex
                | CharacterSetKind::Posix
                | CharacterSetKind::Property
                | CharacterSetKind::Space
                | CharacterSetKind::Word
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantifierKind {
    Greedy,
    Lazy,
    Possessive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookaroundKind {
    Lookahead,
    Lookbehind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Union,
    Intersection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `\K`
    Keep,
    /// `(?imx-imx)`
    Flags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbsentKind {
    /// `(?~...)`
    Repeater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalloutKind {
    Fail,
    Mismatch,
    Skip,
    Error,
    Max,
    Count,
    TotalCount,
    Cmp,
}

impl CalloutKind {
    pub fn from_name(name: &str) -> Option<CalloutKind> {
        Some(match name {
            "FAIL" => CalloutKind::Fail,
            "MISMATCH" => CalloutKind::Mismatch,
            "SKIP" => CalloutKind::Skip,
            "ERROR" => CalloutKind::Error,
            "MAX" => CalloutKind::Max,
            "COUNT" => CalloutKind::Count,
            "TOTAL_COUNT" => CalloutKind::TotalCount,
            "CMP" => CalloutKind::Cmp,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            CalloutKind::Fail => "FAIL",
            CalloutKind::Mismatch => "MISMATCH",
            CalloutKind::Skip => "SKIP",
            CalloutKind::Error => "ERROR",
            CalloutKind::Max => "MAX",
            CalloutKind::Count => "COUNT",
            CalloutKind::TotalCount => "TOTAL_COUNT",
            CalloutKind::Cmp => "CMP",
        }
    }
}

/// Target of a backreference or subroutine after relative numbers are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Number(u32),
    Name(String),
}

/// One comma-separated named-callout argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CalloutArg {
    Empty,
    Int(i64),
    Str(String),
}

impl CalloutArg {
    pub fn parse(raw: &str) -> CalloutArg {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CalloutArg::Empty;
        }
        let digits = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = trimmed.trim_start_matches('+').parse::<i64>() {
                return CalloutArg::Int(n);
            }
        }
        CalloutArg::Str(trimmed.to_string())
    }
}

// === Node structs ===

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alternative {
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub atomic: bool,
    pub flags: Option<FlagGroupModifiers>,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturingGroup {
    pub number: u32,
    pub name: Option<String>,
    pub is_subroutined: bool,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookaroundAssertion {
    pub kind: LookaroundKind,
    pub negate: bool,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsentFunction {
    pub kind: AbsentKind,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assertion {
    pub kind: AssertionKind,
    pub negate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backreference {
    pub reference: Reference,
    pub orphan: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Character {
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterClass {
    pub kind: ClassKind,
    pub negate: bool,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacterClassRange {
    pub min: Character,
    pub max: Character,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharacterSet {
    pub kind: CharacterSetKind,
    pub negate: bool,
    /// Property or POSIX class name.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub flags: Option<FlagGroupModifiers>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCallout {
    pub kind: CalloutKind,
    pub tag: Option<String>,
    pub arguments: Option<Vec<CalloutArg>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantifier {
    pub kind: QuantifierKind,
    pub min: u32,
    /// `None` is unbounded.
    pub max: Option<u32>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subroutine {
    pub reference: Reference,
}

/// AST root: exactly one pattern plus the pattern-wide flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnigurumaAst {
    pub pattern: Pattern,
    pub flags: Flags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    AbsentFunction(AbsentFunction),
    Alternative(Alternative),
    Assertion(Assertion),
    Backreference(Backreference),
    CapturingGroup(CapturingGroup),
    Character(Character),
    CharacterClass(CharacterClass),
    CharacterClassRange(CharacterClassRange),
    CharacterSet(CharacterSet),
    Directive(Directive),
    Group(Group),
    LookaroundAssertion(LookaroundAssertion),
    NamedCallout(NamedCallout),
    Pattern(Pattern),
    Quantifier(Quantifier),
    Subroutine(Subroutine),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    AbsentFunction,
    Alternative,
    Assertion,
    Backreference,
    CapturingGroup,
    Character,
    CharacterClass,
    CharacterClassRange,
    CharacterSet,
    Directive,
    Group,
    LookaroundAssertion,
    NamedCallout,
    Pattern,
    Quantifier,
    Subroutine,
}

// === Constructors ===

/// Wrap alternatives as container body, guaranteeing at least one.
fn alternatives_body(alternatives: Vec<Alternative>) -> Vec<Node> {
    if alternatives.is_empty() {
        return vec![Node::Alternative(Alternative::default())];
    }
    alternatives.into_iter().map(Node::Alternative).collect()
}

/// `[alpha-or-connector][^)]*`
pub fn is_valid_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || is_connector_punctuation(first) => {}
        _ => return false,
    }
    chars.all(|c| c != ')')
}

fn is_connector_punctuation(c: char) -> bool {
    matches!(
        c,
        '_' | '\u{203F}' | '\u{2040}' | '\u{2054}' | '\u{FE33}' | '\u{FE34}' | '\u{FE4D}'
            | '\u{FE4E}' | '\u{FE4F}' | '\u{FF3F}'
    )
}

impl Alternative {
    pub fn new(body: Vec<Node>) -> Self {
        Alternative { body }
    }
}

impl Pattern {
    pub fn new(alternatives: Vec<Alternative>) -> Self {
        Pattern { body: alternatives_body(alternatives) }
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::new(Vec::new())
    }
}

impl Group {
    pub fn new(alternatives: Vec<Alternative>) -> Self {
        Group { atomic: false, flags: None, body: alternatives_body(alternatives) }
    }

    pub fn atomic(alternatives: Vec<Alternative>) -> Self {
        Group { atomic: true, flags: None, body: alternatives_body(alternatives) }
    }

    pub fn with_flags(flags: FlagGroupModifiers, alternatives: Vec<Alternative>) -> Self {
        Group { atomic: false, flags: Some(flags), body: alternatives_body(alternatives) }
    }
}

impl CapturingGroup {
    pub fn new(
        number: u32,
        name: Option<String>,
        alternatives: Vec<Alternative>,
    ) -> Result<Self, RegexError> {
        if let Some(name) = &name {
            if !is_valid_group_name(name) {
                return Err(RegexError::lex(format!("invalid group name \"{}\"", name)));
            }
        }
        Ok(CapturingGroup { number, name, is_subroutined: false, body: alternatives_body(alternatives) })
    }
}

impl LookaroundAssertion {
    pub fn new(kind: LookaroundKind, negate: bool, alternatives: Vec<Alternative>) -> Self {
        LookaroundAssertion { kind, negate, body: alternatives_body(alternatives) }
    }
}

impl AbsentFunction {
    pub fn new(alternatives: Vec<Alternative>) -> Self {
        AbsentFunction { kind: AbsentKind::Repeater, body: alternatives_body(alternatives) }
    }
}

impl Character {
    /// Rejects values above U+10FFFF.
    pub fn new(value: u32) -> Result<Self, RegexError> {
        if value > MAX_CODE_POINT {
            return Err(RegexError::lex(format!("invalid code point \\x{{{:X}}}", value)));
        }
        Ok(Character { value })
    }

    /// Clamps values above U+10FFFF.
    pub fn clamped(value: u32) -> Self {
        Character { value: value.min(MAX_CODE_POINT) }
    }

    pub fn from_char(c: char) -> Self {
        Character { value: c as u32 }
    }
}

impl CharacterClass {
    pub fn new(kind: ClassKind, negate: bool, body: Vec<Node>) -> Self {
        CharacterClass { kind, negate, body }
    }

    pub fn union(body: Vec<Node>) -> Self {
        CharacterClass::new(ClassKind::Union, false, body)
    }
}

impl CharacterClassRange {
    pub fn new(min: Character, max: Character) -> Result<Self, RegexError> {
        if max.value < min.value {
            return Err(RegexError::structure("character class range out of order"));
        }
        Ok(CharacterClassRange { min, max })
    }
}

impl CharacterSet {
    pub fn new(kind: CharacterSetKind, negate: bool) -> Self {
        CharacterSet { kind, negate, value: None }
    }

    pub fn named(kind: CharacterSetKind, negate: bool, value: impl Into<String>) -> Self {
        CharacterSet { kind, negate, value: Some(value.into()) }
    }
}

impl Quantifier {
    /// Builds a quantifier, normalizing a reversed range into the possessive
    /// kind and a lazy or possessive fixed count into a greedy one.
    pub fn new(
        body: Node,
        min: u32,
        max: Option<u32>,
        kind: QuantifierKind,
    ) -> Result<Self, RegexError> {
        if !body.is_quantifiable() {
            return Err(RegexError::structure(format!(
                "quantifier target {:?} is not quantifiable",
                body.kind()
            )));
        }
        let (min, max, kind) = match max {
            Some(max) if max < min => (max, Some(min), QuantifierKind::Possessive),
            Some(max) if max == min => (min, Some(max), QuantifierKind::Greedy),
            _ => (min, max, kind),
        };
        Ok(Quantifier { kind, min, max, body: Box::new(body) })
    }
}

// === Node helpers ===

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::AbsentFunction(_) => NodeKind::AbsentFunction,
            Node::Alternative(_) => NodeKind::Alternative,
            Node::Assertion(_) => NodeKind::Assertion,
            Node::Backreference(_) => NodeKind::Backreference,
            Node::CapturingGroup(_) => NodeKind::CapturingGroup,
            Node::Character(_) => NodeKind::Character,
            Node::CharacterClass(_) => NodeKind::CharacterClass,
            Node::CharacterClassRange(_) => NodeKind::CharacterClassRange,
            Node::CharacterSet(_) => NodeKind::CharacterSet,
            Node::Directive(_) => NodeKind::Directive,
            Node::Group(_) => NodeKind::Group,
            Node::LookaroundAssertion(_) => NodeKind::LookaroundAssertion,
            Node::NamedCallout(_) => NodeKind::NamedCallout,
            Node::Pattern(_) => NodeKind::Pattern,
            Node::Quantifier(_) => NodeKind::Quantifier,
            Node::Subroutine(_) => NodeKind::Subroutine,
        }
    }

    pub fn character(c: char) -> Node {
        Node::Character(Character::from_char(c))
    }

    pub fn alternative(body: Vec<Node>) -> Node {
        Node::Alternative(Alternative::new(body))
    }

    pub fn is_quantifiable(&self) -> bool {
        !matches!(
            self,
            Node::Alternative(_)
                | Node::Assertion(_)
                | Node::CharacterClassRange(_)
                | Node::Directive(_)
                | Node::NamedCallout(_)
                | Node::Pattern(_)
        )
    }

    pub fn is_alternative_container(&self) -> bool {
        self.alternatives().is_some()
    }

    /// Alternatives of a container node.
    pub fn alternatives(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Pattern(n) => Some(&n.body),
            Node::Group(n) => Some(&n.body),
            Node::CapturingGroup(n) => Some(&n.body),
            Node::LookaroundAssertion(n) => Some(&n.body),
            Node::AbsentFunction(n) => Some(&n.body),
            _ => None,
        }
    }

    pub fn alternatives_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Pattern(n) => Some(&mut n.body),
            Node::Group(n) => Some(&mut n.body),
            Node::CapturingGroup(n) => Some(&mut n.body),
            Node::LookaroundAssertion(n) => Some(&mut n.body),
            Node::AbsentFunction(n) => Some(&mut n.body),
            _ => None,
        }
    }

    /// Elements of an alternative.
    pub fn elements(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Alternative(n) => Some(&n.body),
            _ => None,
        }
    }

    pub fn elements_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Alternative(n) => Some(&mut n.body),
            _ => None,
        }
    }

    pub fn as_character(&self) -> Option<Character> {
        match self {
            Node::Character(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_quantifier(&self) -> Option<&Quantifier> {
        match self {
            Node::Quantifier(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&CharacterClass> {
        match self {
            Node::CharacterClass(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&CharacterSet> {
        match self {
            Node::CharacterSet(s) => Some(s),
            _ => None,
        }
    }
}
