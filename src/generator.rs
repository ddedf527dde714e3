// generator.rs - AST back to pattern text.
//
// Escaping is contextual: one set of metacharacters outside classes, and
// position-sensitive rules inside them. Quantifier chains pick between the
// symbol and interval spellings so that adjacent quantifiers never fuse into
// a lazy or possessive suffix they did not mean.

use crate::ast::{
    Assertion, AssertionKind, Backreference, CalloutArg, CharacterClass, CharacterSet,
    CharacterSetKind, ClassKind, Directive, DirectiveKind, LookaroundKind, NamedCallout, Node,
    OnigurumaAst, Quantifier, QuantifierKind, Reference,
};
use crate::error::RegexError;

/// Printed pattern and the flags it needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Generated {
    pub pattern: String,
    pub flags: String,
}

/// Print `ast`. Fails only on ASTs no parse can produce.
pub fn generate(ast: &OnigurumaAst) -> Result<Generated, RegexError> {
    let mut gen = Generator { out: String::new(), after_numbered_backref: false };
    gen.alternatives(&ast.pattern.body)?;
    Ok(Generated { pattern: gen.out, flags: ast.flags.to_flag_string() })
}

/// Print a run of sibling elements as they would appear inside one alternative.
pub(crate) fn print_elements(elements: &[Node]) -> Result<String, RegexError> {
    let mut gen = Generator { out: String::new(), after_numbered_backref: false };
    for element in elements {
        gen.node(element, false)?;
    }
    Ok(gen.out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Symbol,
    Interval,
}

/// Position of a character inside a class, for the context rules.
#[derive(Debug, Clone, Copy, Default)]
struct ClassPos {
    first: bool,
    last: bool,
    negate: bool,
    in_range: bool,
    next_is_amp: bool,
}

struct Generator {
    out: String,
    /// The previous output was `\1`..`\9`; a digit now would extend it.
    after_numbered_backref: bool,
}

impl Generator {
    fn alternatives(&mut self, alternatives: &[Node]) -> Result<(), RegexError> {
        for (i, alt) in alternatives.iter().enumerate() {
            if i > 0 {
                self.out.push('|');
            }
            let elements = alt
                .elements()
                .ok_or_else(|| RegexError::bug(format!("{:?} in place of an alternative", alt.kind())))?;
            self.after_numbered_backref = false;
            for element in elements {
                self.node(element, false)?;
            }
        }
        self.after_numbered_backref = false;
        Ok(())
    }

    fn container(&mut self, open: &str, body: &[Node]) -> Result<(), RegexError> {
        self.out.push_str(open);
        self.alternatives(body)?;
        self.out.push(')');
        Ok(())
    }

    fn node(&mut self, node: &Node, forced_interval: bool) -> Result<(), RegexError> {
        let after_backref = match node {
            Node::Quantifier(_) => self.after_numbered_backref,
            _ => std::mem::take(&mut self.after_numbered_backref),
        };
        match node {
            Node::AbsentFunction(n) => self.container("(?~", &n.body),
            Node::Assertion(a) => {
                self.out.push_str(assertion(a));
                Ok(())
            }
            Node::Backreference(b) => {
                self.backreference(b);
                Ok(())
            }
            Node::CapturingGroup(g) => match &g.name {
                Some(name) => self.container(&format!("(?<{}>", name), &g.body),
                None => self.container("(", &g.body),
            },
            Node::Character(c) => {
                if after_backref && (u32::from(b'0')..=u32::from(b'9')).contains(&c.value) {
                    self.out.push_str(&format!("\\x{:02X}", c.value));
                } else {
                    self.outside_char(c.value);
                }
                Ok(())
            }
            Node::CharacterClass(c) => self.class(c),
            Node::CharacterSet(s) => self.set(s, false),
            Node::Directive(d) => {
                self.directive(d);
                Ok(())
            }
            Node::Group(g) => {
                let open = if g.atomic {
                    "(?>".to_string()
                } else {
                    match g.flags.map(|f| f.to_modifier_string()) {
                        Some(mods) if !mods.is_empty() => format!("(?{}:", mods),
                        _ => "(?:".to_string(),
                    }
                };
                self.container(&open, &g.body)
            }
            Node::LookaroundAssertion(l) => {
                let open = match (l.kind, l.negate) {
                    (LookaroundKind::Lookahead, false) => "(?=",
                    (LookaroundKind::Lookahead, true) => "(?!",
                    (LookaroundKind::Lookbehind, false) => "(?<=",
                    (LookaroundKind::Lookbehind, true) => "(?<!",
                };
                self.container(open, &l.body)
            }
            Node::NamedCallout(c) => {
                self.callout(c);
                Ok(())
            }
            Node::Quantifier(q) => self.quantifier(q, forced_interval),
            Node::Subroutine(s) => {
                match &s.reference {
                    Reference::Number(n) => self.out.push_str(&format!("\\g<{}>", n)),
                    Reference::Name(name) => self.out.push_str(&format!("\\g<{}>", name)),
                }
                Ok(())
            }
            Node::Alternative(_) | Node::CharacterClassRange(_) | Node::Pattern(_) => Err(RegexError::bug(
                format!("{:?} cannot appear as an element", node.kind()),
            )),
        }
    }

    fn backreference(&mut self, b: &Backreference) {
        match &b.reference {
            Reference::Number(n) if (1..=9).contains(n) => {
                self.out.push_str(&format!("\\{}", n));
                self.after_numbered_backref = true;
            }
            Reference::Number(n) => self.out.push_str(&format!("\\k<{}>", n)),
            Reference::Name(name) => self.out.push_str(&format!("\\k<{}>", name)),
        }
    }

    fn directive(&mut self, d: &Directive) {
        match d.kind {
            DirectiveKind::Keep => self.out.push_str("\\K"),
            DirectiveKind::Flags => {
                let mods = d.flags.map(|f| f.to_modifier_string()).unwrap_or_default();
                if !mods.is_empty() {
                    self.out.push_str(&format!("(?{})", mods));
                }
            }
        }
    }

    fn callout(&mut self, c: &NamedCallout) {
        self.out.push_str("(*");
        self.out.push_str(c.kind.name());
        if let Some(tag) = &c.tag {
            self.out.push_str(&format!("[{}]", tag));
        }
        if let Some(args) = &c.arguments {
            let args: Vec<String> = args
                .iter()
                .map(|a| match a {
                    CalloutArg::Empty => String::new(),
                    CalloutArg::Int(n) => n.to_string(),
                    CalloutArg::Str(s) => s.clone(),
                })
                .collect();
            self.out.push_str(&format!("{{{}}}", args.join(",")));
        }
        self.out.push(')');
    }

    // === Quantifiers ===

    fn quantifier(&mut self, q: &Quantifier, forced_interval: bool) -> Result<(), RegexError> {
        if let Some(max) = q.max {
            if q.min > max {
                return Err(RegexError::bug(format!("quantifier min {} exceeds max {}", q.min, max)));
            }
        }
        let mut form = if forced_interval || !symbol_shaped(q) { Form::Interval } else { Form::Symbol };
        let mut force_child = false;
        if let Node::Quantifier(child) = q.body.as_ref() {
            let suffix = quantifier_suffix(q, form)?;
            if chains_badly(child, &suffix) {
                if form == Form::Symbol && quantifier_suffix(q, Form::Interval).is_ok() {
                    form = Form::Interval;
                } else {
                    force_child = true;
                }
            }
        }
        self.node(&q.body, force_child)?;
        self.after_numbered_backref = false;
        let suffix = quantifier_suffix(q, form)?;
        self.out.push_str(&suffix);
        Ok(())
    }

    // === Classes ===

    fn class(&mut self, c: &CharacterClass) -> Result<(), RegexError> {
        self.out.push('[');
        if c.negate {
            self.out.push('^');
        }
        match c.kind {
            ClassKind::Union => self.class_items(&c.body, c.negate, true, false)?,
            ClassKind::Intersection => {
                let count = c.body.len();
                for (i, operand) in c.body.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str("&&");
                    }
                    let followed_by_amp = i + 1 < count;
                    match operand {
                        Node::CharacterClass(inner)
                            if inner.kind == ClassKind::Union && !inner.negate && inner.body.len() != 1 =>
                        {
                            self.class_items(&inner.body, false, false, followed_by_amp)?
                        }
                        other => self.class_items(std::slice::from_ref(other), false, false, followed_by_amp)?,
                    }
                }
            }
        }
        self.out.push(']');
        Ok(())
    }

    fn class_items(
        &mut self,
        items: &[Node],
        negate: bool,
        bracketed: bool,
        followed_by_amp: bool,
    ) -> Result<(), RegexError> {
        for (i, item) in items.iter().enumerate() {
            let pos = ClassPos {
                first: bracketed && i == 0,
                last: bracketed && i + 1 == items.len(),
                negate,
                in_range: false,
                next_is_amp: items.get(i + 1).map_or(followed_by_amp, starts_with_amp),
            };
            match item {
                Node::Character(c) => self.class_char(c.value, pos),
                Node::CharacterClassRange(r) => {
                    self.class_char(r.min.value, ClassPos { in_range: true, last: false, next_is_amp: false, ..pos });
                    self.out.push('-');
                    self.class_char(r.max.value, ClassPos { in_range: true, first: false, ..pos });
                }
                Node::CharacterSet(s) => self.set(s, true)?,
                Node::CharacterClass(inner) => self.class(inner)?,
                other => {
                    return Err(RegexError::bug(format!("{:?} cannot appear in a character class", other.kind())))
                }
            }
        }
        Ok(())
    }

    fn class_char(&mut self, value: u32, pos: ClassPos) {
        let escape = match char::from_u32(value) {
            Some('\\' | '[') => true,
            Some(']') => pos.in_range || !pos.first,
            Some('-') => pos.in_range || !(pos.first || pos.last),
            Some('^') => pos.first && !pos.negate,
            Some('&') => self.out.ends_with('&') || pos.next_is_amp,
            _ => false,
        };
        if escape {
            self.out.push('\\');
        }
        self.plain_char(value);
    }

    fn outside_char(&mut self, value: u32) {
        if let Some(c) = char::from_u32(value) {
            if "$()*+.?[\\^{|".contains(c) {
                self.out.push('\\');
            }
        }
        self.plain_char(value);
    }

    fn plain_char(&mut self, value: u32) {
        match control_escape(value) {
            Some(esc) => self.out.push_str(esc),
            None => match char::from_u32(value).filter(|_| !needs_hex(value)) {
                Some(c) => self.out.push(c),
                None if value <= 0x7F => self.out.push_str(&format!("\\x{:02X}", value)),
                None => self.out.push_str(&format!("\\x{{{:X}}}", value)),
            },
        }
    }

    fn set(&mut self, s: &CharacterSet, in_class: bool) -> Result<(), RegexError> {
        let letter = |lower: &'static str, upper: &'static str| if s.negate { upper } else { lower };
        let text = match s.kind {
            CharacterSetKind::Any => "\\O".to_string(),
            CharacterSetKind::Digit => letter("\\d", "\\D").to_string(),
            CharacterSetKind::Dot => ".".to_string(),
            CharacterSetKind::Grapheme => "\\X".to_string(),
            CharacterSetKind::Hex => letter("\\h", "\\H").to_string(),
            CharacterSetKind::Newline => letter("\\R", "\\N").to_string(),
            CharacterSetKind::Space => letter("\\s", "\\S").to_string(),
            CharacterSetKind::Word => letter("\\w", "\\W").to_string(),
            CharacterSetKind::Property => {
                let name = s.value.as_deref().ok_or_else(|| RegexError::bug("property without a name"))?;
                format!("{}{{{}}}", letter("\\p", "\\P"), name)
            }
            CharacterSetKind::Posix => {
                let name = s.value.as_deref().ok_or_else(|| RegexError::bug("POSIX class without a name"))?;
                let inner = format!("[:{}{}:]", if s.negate { "^" } else { "" }, name);
                if in_class {
                    inner
                } else {
                    format!("[{}]", inner)
                }
            }
        };
        self.out.push_str(&text);
        Ok(())
    }
}

fn assertion(a: &Assertion) -> &'static str {
    match (a.kind, a.negate) {
        (AssertionKind::LineEnd, _) => "$",
        (AssertionKind::LineStart, _) => "^",
        (AssertionKind::SearchStart, _) => "\\G",
        (AssertionKind::StringEnd, _) => "\\z",
        (AssertionKind::StringEndNewline, _) => "\\Z",
        (AssertionKind::StringStart, _) => "\\A",
        (AssertionKind::TextSegmentBoundary, false) => "\\y",
        (AssertionKind::TextSegmentBoundary, true) => "\\Y",
        (AssertionKind::WordBoundary, false) => "\\b",
        (AssertionKind::WordBoundary, true) => "\\B",
    }
}

fn starts_with_amp(node: &Node) -> bool {
    match node {
        Node::Character(c) => c.value == u32::from(b'&'),
        Node::CharacterClassRange(r) => r.min.value == u32::from(b'&'),
        _ => false,
    }
}

fn control_escape(value: u32) -> Option<&'static str> {
    Some(match value {
        7 => "\\a",
        9 => "\\t",
        10 => "\\n",
        11 => "\\v",
        12 => "\\f",
        13 => "\\r",
        27 => "\\e",
        _ => return None,
    })
}

/// Code points printed as hex: controls, surrogates, private use,
/// noncharacters and the unassigned planes.
fn needs_hex(value: u32) -> bool {
    matches!(value, 0..=0x1F | 0x7F..=0x9F | 0xD800..=0xDFFF | 0xE000..=0xF8FF | 0xFDD0..=0xFDEF)
        || (0x40000..=0xDFFFF).contains(&value)
        || value >= 0xF0000
        || value & 0xFFFE == 0xFFFE
}

fn symbol_shaped(q: &Quantifier) -> bool {
    matches!((q.min, q.max), (0, None) | (1, None) | (0, Some(1)))
}

/// Suffix text for `q` in the requested form.
fn quantifier_suffix(q: &Quantifier, form: Form) -> Result<String, RegexError> {
    if form == Form::Symbol && symbol_shaped(q) {
        let base = match (q.min, q.max) {
            (0, None) => "*",
            (1, None) => "+",
            _ => "?",
        };
        return Ok(match q.kind {
            QuantifierKind::Greedy => base.to_string(),
            QuantifierKind::Lazy => format!("{}?", base),
            QuantifierKind::Possessive => format!("{}+", base),
        });
    }
    match (q.kind, q.max) {
        (QuantifierKind::Possessive, Some(max)) if max > q.min => Ok(format!("{{{},{}}}", max, q.min)),
        (QuantifierKind::Possessive, _) => Err(RegexError::bug(format!(
            "possessive quantifier {{{},{:?}}} has no interval form",
            q.min, q.max
        ))),
        (kind, max) => {
            let interval = match max {
                Some(max) if max == q.min => format!("{{{}}}", max),
                Some(max) => format!("{{{},{}}}", q.min, max),
                None => format!("{{{},}}", q.min),
            };
            Ok(match kind {
                QuantifierKind::Lazy => format!("{}?", interval),
                _ => interval,
            })
        }
    }
}

/// Whether `child` printed in its default form, followed by `parent_suffix`,
/// would be read as a single lazy or possessive quantifier.
fn chains_badly(child: &Quantifier, parent_suffix: &str) -> bool {
    if child.kind != QuantifierKind::Greedy {
        return false;
    }
    if symbol_shaped(child) {
        parent_suffix.starts_with(['?', '+'])
    } else {
        child.max != Some(child.min) && parent_suffix.starts_with('?')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Alternative, Backreference, Character, Pattern};
    use crate::flags::Flags;
    use crate::parser::{parse, ParseOptions};
    use crate::tokenizer::tokenize;

    fn round_trip(pattern: &str) -> String {
        let options = ParseOptions::default();
        let ast = parse(tokenize(pattern, "", &options.rules).unwrap(), &options).unwrap();
        generate(&ast).unwrap().pattern
    }

    fn print(elements: Vec<Node>) -> Result<String, RegexError> {
        let ast = OnigurumaAst { pattern: Pattern::new(vec![Alternative::new(elements)]), flags: Flags::default() };
        generate(&ast).map(|g| g.pattern)
    }

    fn quant(body: Node, min: u32, max: Option<u32>, kind: QuantifierKind) -> Node {
        Node::Quantifier(Quantifier::new(body, min, max, kind).unwrap())
    }

    #[test]
    fn canonical_patterns_print_unchanged() {
        for p in [
            "a|b|",
            r"(?<n>a)\k<n>",
            r"[^a-z\d]",
            r"[a&&[^b]]",
            "(?i:a)(?>b)(?=c)(?<!d)",
            "a*?b+c??d*+",
            "a{2,3}b{2,}c{3}d{2,3}?",
            r"\p{Greek}\P{L}[[:alpha:]][[:^digit:]]",
            "(*FAIL)(*MAX[t]{3,X})",
            "(?~abc)",
            r"(a)\1\g<1>",
            r"^\A\z\Z\G\b\B\y\Y$",
            r"\O\X\R\N\h\H.",
            r"[a\]b\-c^]",
            r"[-a^]",
            r"\(\)\*\+\.\?\[\{\|\$\\",
            "a**",
            ".{2,1}?",
        ] {
            assert_eq!(round_trip(p), p, "pattern {}", p);
        }
    }

    #[test]
    fn reversed_interval_prints_as_symbol_when_possible() {
        assert_eq!(round_trip(".{1,0}"), ".?+");
        assert_eq!(round_trip(".{5,2}"), ".{5,2}");
    }

    #[test]
    fn escapes_controls_and_special_planes() {
        assert_eq!(round_trip(r"\x01\t\x{7F}\x{85}\x{E000}\x{FFFF}é"), r"\x01\t\x7F\x{85}\x{E000}\x{FFFF}é");
    }

    #[test]
    fn digit_after_numbered_backref() {
        let backref = Node::Backreference(Backreference { reference: Reference::Number(1), orphan: true });
        assert_eq!(print(vec![backref.clone(), Node::character('0')]).unwrap(), r"\1\x30");
        let q = quant(Node::character('2'), 0, None, QuantifierKind::Greedy);
        assert_eq!(print(vec![backref, q]).unwrap(), r"\1\x32*");
    }

    #[test]
    fn quantifier_chains_stay_distinct() {
        let star = quant(Node::character('a'), 0, None, QuantifierKind::Greedy);
        assert_eq!(print(vec![quant(star.clone(), 0, Some(1), QuantifierKind::Greedy)]).unwrap(), "a*{0,1}");
        let opt = quant(Node::character('a'), 0, Some(1), QuantifierKind::Greedy);
        assert_eq!(print(vec![quant(opt, 1, None, QuantifierKind::Possessive)]).unwrap(), "a{0,1}++");
        let interval = quant(Node::character('a'), 2, Some(3), QuantifierKind::Greedy);
        assert_eq!(print(vec![quant(interval, 0, Some(1), QuantifierKind::Greedy)]).unwrap(), "a{2,3}{0,1}");
        assert_eq!(print(vec![quant(star, 1, None, QuantifierKind::Greedy)]).unwrap(), "a*{1,}");
    }

    #[test]
    fn invariant_violations() {
        let bad = Node::Quantifier(Quantifier {
            kind: QuantifierKind::Greedy,
            min: 3,
            max: Some(1),
            body: Box::new(Node::character('a')),
        });
        assert!(print(vec![bad]).is_err());
        let open = Node::Quantifier(Quantifier {
            kind: QuantifierKind::Possessive,
            min: 2,
            max: None,
            body: Box::new(Node::character('a')),
        });
        assert!(print(vec![open]).is_err());
    }

    #[test]
    fn intersection_operands() {
        assert_eq!(round_trip("[ab&&c]"), "[ab&&c]");
        assert_eq!(round_trip("[[a]&&c]"), "[[a]&&c]");
        let amp = Node::Character(Character::from_char('&'));
        let class = CharacterClass::new(ClassKind::Intersection, false, vec![amp.clone(), amp]);
        assert_eq!(print(vec![Node::CharacterClass(class)]).unwrap(), r"[\&&&\&]");
    }

    #[test]
    fn flags_elide_extended() {
        let options = ParseOptions::default();
        let ast = parse(tokenize("a b", "ix", &options.rules).unwrap(), &options).unwrap();
        assert_eq!(generate(&ast).unwrap(), Generated { pattern: "ab".into(), flags: "i".into() });
        assert_eq!(round_trip("(?x)a(?ix:b)(?x:c)"), "a(?i:b)(?:c)");
    }
}
