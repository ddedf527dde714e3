// tokenizer.rs - Pattern string to token list.
//
// Structure: main scanner (outside classes) → class sub-scanner → escapes →
// group openers → quantifier chains → second pass (group numbering and
// escaped-number resolution).

use memchr::{memchr, memchr2};
use smallvec::SmallVec;

use crate::ast::{
    AssertionKind, CalloutKind, CharacterSetKind, DirectiveKind, QuantifierKind,
    MAX_CODE_POINT,
};
use crate::error::RegexError;
use crate::flags::{FlagGroupModifiers, FlagMods, Flags};
use crate::unicode::POSIX_CLASS_NAMES;

/// Oniguruma's repeat range limit.
pub const MAX_REPEAT_NUM: u32 = 100_000;

/// Compatibility rules shared by the tokenizer and the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rules {
    /// Keep unnamed groups capturing even when named groups exist
    /// (`ONIG_OPTION_CAPTURE_GROUP`).
    pub capture_group: bool,
    /// `^` means `\A` and `$` means `\Z` (`ONIG_OPTION_SINGLELINE`).
    pub singleline: bool,
    /// Numbered backreferences to missing groups become orphans instead of errors.
    pub allow_orphan_backrefs: bool,
}

/// Reference as written, before relative numbers are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    Number(u32),
    /// `-n` or `+n`
    Relative(i32),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOpenKind {
    Absent,
    Atomic,
    Capturing,
    Group,
    Lookahead,
    Lookbehind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Alternator,
    Assertion {
        kind: AssertionKind,
        negate: bool,
    },
    Backreference {
        target: RefTarget,
    },
    Character {
        value: u32,
    },
    CharacterClassClose,
    CharacterClassHyphen,
    CharacterClassIntersector,
    CharacterClassOpen {
        negate: bool,
    },
    CharacterSet {
        kind: CharacterSetKind,
        negate: bool,
        value: Option<String>,
    },
    Directive {
        kind: DirectiveKind,
        flags: Option<FlagGroupModifiers>,
    },
    GroupClose,
    GroupOpen {
        kind: GroupOpenKind,
        name: Option<String>,
        number: Option<u32>,
        negate: bool,
        flags: Option<FlagGroupModifiers>,
    },
    NamedCallout {
        kind: CalloutKind,
        tag: Option<String>,
        arguments: Option<String>,
    },
    Quantifier {
        kind: QuantifierKind,
        min: u32,
        max: Option<u32>,
    },
    Subroutine {
        target: RefTarget,
    },
    /// `\1`-`\999`; resolved to a backreference or characters before
    /// `tokenize` returns.
    EscapedNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Lexeme as written.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerResult {
    pub tokens: Vec<Token>,
    pub flags: Flags,
}

/// Tokenize `pattern` under `flags` (a flags string such as `"imx"`).
pub fn tokenize(pattern: &str, flags: &str, rules: &Rules) -> Result<TokenizerResult, RegexError> {
    let flags = Flags::parse(flags)?;
    let mut lexer = Lexer {
        src: pattern,
        pos: 0,
        x_stack: SmallVec::new(),
        tokens: Vec::new(),
        rules: *rules,
    };
    lexer.x_stack.push(flags.extended);
    lexer.run()?;
    let tokens = finalize(lexer.tokens, rules)?;
    Ok(TokenizerResult { tokens, flags })
}

fn is_x_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r')
}

struct Lexer<'p> {
    src: &'p str,
    pos: usize,
    x_stack: SmallVec<[bool; 8]>,
    tokens: Vec<Token>,
    rules: Rules,
}

impl<'p> Lexer<'p> {
    // === Cursor helpers ===

    fn rest(&self) -> &'p str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn extended(&self) -> bool {
        self.x_stack.last().copied().unwrap_or(false)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token { kind, raw: self.src[start..self.pos].to_string() });
    }

    fn push_char(&mut self, value: u32, start: usize) {
        self.push(TokenKind::Character { value }, start);
    }

    // === Main scanner ===

    fn run(&mut self) -> Result<(), RegexError> {
        while let Some(c) = self.peek() {
            if self.extended() {
                if is_x_whitespace(c) {
                    self.bump();
                    continue;
                }
                if c == '#' {
                    self.pos = match memchr(b'\n', self.rest().as_bytes()) {
                        Some(i) => self.pos + i + 1,
                        None => self.src.len(),
                    };
                    continue;
                }
            }
            let start = self.pos;
            self.bump();
            match c {
                '\\' => self.escape(start)?,
                '[' => self.class(start)?,
                '(' => self.group_open(start)?,
                ')' => {
                    if self.x_stack.len() > 1 {
                        self.x_stack.pop();
                    }
                    self.push(TokenKind::GroupClose, start);
                }
                '|' => self.push(TokenKind::Alternator, start),
                '^' => {
                    let kind = if self.rules.singleline {
                        AssertionKind::StringStart
                    } else {
                        AssertionKind::LineStart
                    };
                    self.push(TokenKind::Assertion { kind, negate: false }, start);
                }
                '$' => {
                    let kind = if self.rules.singleline {
                        AssertionKind::StringEndNewline
                    } else {
                        AssertionKind::LineEnd
                    };
                    self.push(TokenKind::Assertion { kind, negate: false }, start);
                }
                '.' => self.push(
                    TokenKind::CharacterSet { kind: CharacterSetKind::Dot, negate: false, value: None },
                    start,
                ),
                '*' | '+' | '?' => {
                    self.pos = start;
                    self.quantifier_chain()?;
                }
                '{' if scan_interval(&self.src[start..]).is_some() => {
                    self.pos = start;
                    self.quantifier_chain()?;
                }
                _ => self.push_char(c as u32, start),
            }
        }
        Ok(())
    }

    // === Quantifiers ===

    fn quantifier_chain(&mut self) -> Result<(), RegexError> {
        let mut chain: SmallVec<[Token; 2]> = SmallVec::new();
        while let Some((kind, len)) = scan_quantifier(self.rest())? {
            let raw = self.rest()[..len].to_string();
            self.pos += len;
            chain.push(Token { kind, raw });
        }
        self.tokens.extend(chain);
        Ok(())
    }

    // === Groups ===

    fn group_open(&mut self, start: usize) -> Result<(), RegexError> {
        if self.peek() == Some('*') && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
            return self.named_callout(start);
        }
        if !self.eat('?') {
            return self.open_group(GroupOpenKind::Capturing, None, false, None, start);
        }
        let c = self.bump().ok_or_else(|| RegexError::lex("invalid group"))?;
        match c {
            '#' => self.comment_group(),
            ':' => self.open_group(GroupOpenKind::Group, None, false, None, start),
            '>' => self.open_group(GroupOpenKind::Atomic, None, false, None, start),
            '=' => self.open_group(GroupOpenKind::Lookahead, None, false, None, start),
            '!' => self.open_group(GroupOpenKind::Lookahead, None, true, None, start),
            '<' if self.eat('=') => self.open_group(GroupOpenKind::Lookbehind, None, false, None, start),
            '<' if self.eat('!') => self.open_group(GroupOpenKind::Lookbehind, None, true, None, start),
            '<' | '\'' => {
                let close = if c == '<' { '>' } else { '\'' };
                let name = self.group_name(close)?;
                self.open_group(GroupOpenKind::Capturing, Some(name), false, None, start)
            }
            '~' => {
                if self.peek() == Some('|') {
                    return Err(RegexError::lex("unsupported absent function form \"(?~|\""));
                }
                self.open_group(GroupOpenKind::Absent, None, false, None, start)
            }
            '(' => Err(RegexError::lex("unsupported conditional group \"(?(\"")),
            '{' => Err(RegexError::lex("unsupported callout \"(?{\"")),
            _ => {
                self.pos -= c.len_utf8();
                self.flag_group(start)
            }
        }
    }

    fn open_group(
        &mut self,
        kind: GroupOpenKind,
        name: Option<String>,
        negate: bool,
        flags: Option<FlagGroupModifiers>,
        start: usize,
    ) -> Result<(), RegexError> {
        let mut x = self.extended();
        if let Some(mods) = flags {
            x = (x || mods.enable.contains(FlagMods::EXTENDED))
                && !mods.disable.contains(FlagMods::EXTENDED);
        }
        self.x_stack.push(x);
        self.push(TokenKind::GroupOpen { kind, name, number: None, negate, flags }, start);
        Ok(())
    }

    fn group_name(&mut self, close: char) -> Result<String, RegexError> {
        let rest = self.rest();
        let end = rest
            .find(close)
            .ok_or_else(|| RegexError::lex("unterminated group name"))?;
        let name = &rest[..end];
        if !crate::ast::is_valid_group_name(name) {
            return Err(RegexError::lex(format!("invalid group name \"{}\"", name)));
        }
        self.pos += end + close.len_utf8();
        Ok(name.to_string())
    }

    fn comment_group(&mut self) -> Result<(), RegexError> {
        loop {
            let bytes = self.rest().as_bytes();
            match memchr2(b')', b'\\', bytes) {
                Some(i) if bytes[i] == b')' => {
                    self.pos += i + 1;
                    return Ok(());
                }
                Some(i) => {
                    self.pos += i + 1;
                    if self.bump().is_none() {
                        break;
                    }
                }
                None => break,
            }
        }
        Err(RegexError::lex("unterminated comment group \"(?#\""))
    }

    fn flag_group(&mut self, start: usize) -> Result<(), RegexError> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_ascii_alphabetic() || c == '-'))
            .ok_or_else(|| RegexError::lex("invalid group"))?;
        if end == 0 {
            return Err(RegexError::lex(format!("invalid group \"{}\"", &self.src[start..])));
        }
        let mods = FlagGroupModifiers::parse(&rest[..end])?;
        self.pos += end;
        match self.bump() {
            Some(')') => {
                if let Some(top) = self.x_stack.last_mut() {
                    if mods.enable.contains(FlagMods::EXTENDED) {
                        *top = true;
                    }
                    if mods.disable.contains(FlagMods::EXTENDED) {
                        *top = false;
                    }
                }
                self.push(TokenKind::Directive { kind: DirectiveKind::Flags, flags: Some(mods) }, start);
                Ok(())
            }
            Some(':') => self.open_group(GroupOpenKind::Group, None, false, Some(mods), start),
            _ => Err(RegexError::lex(format!("invalid group \"{}\"", &self.src[start..self.pos]))),
        }
    }

    fn named_callout(&mut self, start: usize) -> Result<(), RegexError> {
        let rest = self.rest();
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let name = &rest[..name_len];
        self.pos += name_len;
        let kind = CalloutKind::from_name(name).ok_or_else(|| {
            RegexError::lex(format!("unsupported named callout \"(*{}\"", name))
        })?;
        let mut tag = None;
        if self.eat('[') {
            let rest = self.rest();
            let end = rest.find(']').ok_or_else(|| RegexError::lex("unterminated callout tag"))?;
            let t = &rest[..end];
            let valid = t.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && t.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(RegexError::lex(format!("invalid callout tag \"{}\"", t)));
            }
            tag = Some(t.to_string());
            self.pos += end + 1;
        }
        let mut arguments = None;
        if self.eat('{') {
            let rest = self.rest();
            let end = rest
                .find('}')
                .ok_or_else(|| RegexError::lex("unterminated callout arguments"))?;
            let args = &rest[..end];
            if args.contains(['{', '(', ')']) {
                return Err(RegexError::lex(format!("invalid callout arguments \"{}\"", args)));
            }
            arguments = Some(args.to_string());
            self.pos += end + 1;
        }
        if !self.eat(')') {
            return Err(RegexError::lex(format!(
                "invalid named callout \"{}\"",
                &self.src[start..self.pos]
            )));
        }
        self.push(TokenKind::NamedCallout { kind, tag, arguments }, start);
        Ok(())
    }

    // === Escapes ===

    fn escape(&mut self, start: usize) -> Result<(), RegexError> {
        let c = self
            .bump()
            .ok_or_else(|| RegexError::lex("incomplete escape \"\\\""))?;
        let assertion = |kind, negate| TokenKind::Assertion { kind, negate };
        let set = |kind, negate| TokenKind::CharacterSet { kind, negate, value: None };
        let kind = match c {
            'A' => assertion(AssertionKind::StringStart, false),
            'z' => assertion(AssertionKind::StringEnd, false),
            'Z' => assertion(AssertionKind::StringEndNewline, false),
            'G' => assertion(AssertionKind::SearchStart, false),
            'b' | 'B' => assertion(AssertionKind::WordBoundary, c == 'B'),
            'y' | 'Y' => assertion(AssertionKind::TextSegmentBoundary, c == 'Y'),
            'K' => TokenKind::Directive { kind: DirectiveKind::Keep, flags: None },
            'N' => set(CharacterSetKind::Newline, true),
            'R' => set(CharacterSetKind::Newline, false),
            'X' => set(CharacterSetKind::Grapheme, false),
            'O' => set(CharacterSetKind::Any, false),
            'k' => TokenKind::Backreference { target: self.reference(false)? },
            'g' => TokenKind::Subroutine { target: self.reference(true)? },
            '1'..='9' => {
                while self.peek().is_some_and(|d| d.is_ascii_digit()) {
                    self.bump();
                }
                TokenKind::EscapedNumber
            }
            '0' => TokenKind::Character { value: self.octal_digits(0, 2) },
            _ => return self.shared_escape(c, start, false),
        };
        self.push(kind, start);
        Ok(())
    }

    /// Consume up to `max` further octal digits after an initial value.
    fn octal_digits(&mut self, mut value: u32, max: usize) -> u32 {
        for _ in 0..max {
            match self.peek().and_then(|d| d.to_digit(8)) {
                Some(d) => {
                    value = value * 8 + d;
                    self.bump();
                }
                None => break,
            }
        }
        value
    }

    fn reference(&mut self, subroutine: bool) -> Result<RefTarget, RegexError> {
        let what = if subroutine { "subroutine" } else { "backreference" };
        let close = match self.bump() {
            Some('<') => '>',
            Some('\'') => '\'',
            _ => return Err(RegexError::lex(format!("invalid {}", what))),
        };
        let rest = self.rest();
        let end = rest
            .find(close)
            .ok_or_else(|| RegexError::lex(format!("unterminated {}", what)))?;
        let inner = &rest[..end];
        self.pos += end + close.len_utf8();
        parse_reference(inner, subroutine)
    }

    /// Escapes valid both inside and outside classes.
    fn shared_escape(&mut self, c: char, start: usize, in_class: bool) -> Result<(), RegexError> {
        let set = |kind, negate| TokenKind::CharacterSet { kind, negate, value: None };
        let kind = match c {
            'd' | 'D' => set(CharacterSetKind::Digit, c == 'D'),
            'h' | 'H' => set(CharacterSetKind::Hex, c == 'H'),
            's' | 'S' => set(CharacterSetKind::Space, c == 'S'),
            'w' | 'W' => set(CharacterSetKind::Word, c == 'W'),
            'p' | 'P' => self.property(c == 'P')?,
            'x' => return self.hex_escape(start),
            'u' => {
                let rest = self.rest();
                let hex = rest.get(..4).filter(|h| h.chars().all(|d| d.is_ascii_hexdigit()));
                let hex = hex.ok_or_else(|| RegexError::lex("incomplete escape \"\\u\""))?;
                let value = u32::from_str_radix(hex, 16)
                    .map_err(|_| RegexError::lex("invalid escape \"\\u\""))?;
                self.pos += 4;
                TokenKind::Character { value }
            }
            'o' => {
                if !self.eat('{') {
                    return Err(RegexError::lex("incomplete escape \"\\o\""));
                }
                let value = self.braced_number(8, "\\o")?;
                TokenKind::Character { value }
            }
            'c' => TokenKind::Character { value: self.control_char()? },
            'C' => {
                if !self.eat('-') {
                    return Err(RegexError::lex("invalid escape \"\\C\""));
                }
                TokenKind::Character { value: self.control_char()? }
            }
            'M' => return Err(RegexError::lex("unsupported meta escape \"\\M-\"")),
            'a' => TokenKind::Character { value: 0x07 },
            'e' => TokenKind::Character { value: 0x1B },
            'f' => TokenKind::Character { value: 0x0C },
            'n' => TokenKind::Character { value: 0x0A },
            'r' => TokenKind::Character { value: 0x0D },
            't' => TokenKind::Character { value: 0x09 },
            'v' => TokenKind::Character { value: 0x0B },
            c if c.is_ascii_alphanumeric() => {
                let context = if in_class { " in character class" } else { "" };
                return Err(RegexError::lex(format!("invalid escape \"\\{}\"{}", c, context)));
            }
            c => TokenKind::Character { value: c as u32 },
        };
        self.push(kind, start);
        Ok(())
    }

    fn control_char(&mut self) -> Result<u32, RegexError> {
        match self.bump() {
            Some('?') => Ok(0x7F),
            Some(c) if c.is_ascii() && c != '\\' => Ok(c as u32 & 0x1F),
            _ => Err(RegexError::lex("invalid control-code syntax")),
        }
    }

    fn braced_number(&mut self, radix: u32, what: &str) -> Result<u32, RegexError> {
        let rest = self.rest();
        let end = rest
            .find('}')
            .ok_or_else(|| RegexError::lex(format!("incomplete escape \"{}\"", what)))?;
        let digits = rest[..end].trim();
        if digits.is_empty() || digits.len() > 8 || !digits.chars().all(|d| d.is_digit(radix)) {
            return Err(RegexError::lex(format!("invalid escape \"{}{{{}}}\"", what, &rest[..end])));
        }
        let value = u32::from_str_radix(digits, radix)
            .map_err(|_| RegexError::lex(format!("invalid escape \"{}\"", what)))?;
        if value > MAX_CODE_POINT {
            return Err(RegexError::lex(format!("invalid code point {}{{{}}}", what, digits)));
        }
        self.pos += end + 1;
        Ok(value)
    }

    fn property(&mut self, negate: bool) -> Result<TokenKind, RegexError> {
        if !self.eat('{') {
            return Err(RegexError::lex("invalid property escape"));
        }
        let negate = if self.eat('^') { !negate } else { negate };
        let rest = self.rest();
        let end = rest
            .find('}')
            .ok_or_else(|| RegexError::lex("unterminated property escape"))?;
        let name = &rest[..end];
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_')) {
            return Err(RegexError::lex(format!("invalid property name \"{}\"", name)));
        }
        self.pos += end + 1;
        Ok(TokenKind::CharacterSet {
            kind: CharacterSetKind::Property,
            negate,
            value: Some(name.to_string()),
        })
    }

    /// `\x{H..}`, `\xHH`, or a run of `\xHH` bytes forming one UTF-8 character.
    fn hex_escape(&mut self, start: usize) -> Result<(), RegexError> {
        if self.eat('{') {
            let value = self.braced_number(16, "\\x")?;
            self.push_char(value, start);
            return Ok(());
        }
        let lead = self
            .hex_byte()
            .ok_or_else(|| RegexError::lex("incomplete escape \"\\x\""))?;
        if lead < 0x80 {
            self.push_char(lead as u32, start);
            return Ok(());
        }
        let needed = match lead {
            0xC2..=0xDF => 1,
            0xE0..=0xEF => 2,
            0xF0..=0xF4 => 3,
            _ => return Err(RegexError::lex(format!("invalid multibyte code \\x{:02X}", lead))),
        };
        let mut bytes: SmallVec<[u8; 4]> = SmallVec::new();
        bytes.push(lead);
        for _ in 0..needed {
            if !self.eat_str("\\x") {
                return Err(RegexError::lex("incomplete multibyte code"));
            }
            let b = self
                .hex_byte()
                .filter(|b| (0x80..=0xBF).contains(b))
                .ok_or_else(|| RegexError::lex("invalid multibyte code"))?;
            bytes.push(b);
        }
        let decoded = std::str::from_utf8(&bytes)
            .map_err(|_| RegexError::lex("invalid multibyte code"))?;
        let value = decoded.chars().next().map(|c| c as u32).unwrap_or(0);
        self.push_char(value, start);
        Ok(())
    }

    /// One or two hex digits.
    fn hex_byte(&mut self) -> Option<u8> {
        let rest = self.rest().as_bytes();
        let len = rest.iter().take(2).take_while(|b| b.is_ascii_hexdigit()).count();
        if len == 0 {
            return None;
        }
        let digits = &self.rest()[..len];
        self.pos += len;
        u8::from_str_radix(digits, 16).ok()
    }

    // === Character classes ===

    fn class(&mut self, start: usize) -> Result<(), RegexError> {
        let negate = self.eat('^');
        self.push(TokenKind::CharacterClassOpen { negate }, start);
        let mut depth = 1usize;
        let mut first = true;
        while depth > 0 {
            let start = self.pos;
            let c = self
                .bump()
                .ok_or_else(|| RegexError::lex("unclosed character class"))?;
            match c {
                '[' => {
                    if let Some((name, negate, len)) = scan_posix(&self.src[start..]) {
                        if !POSIX_CLASS_NAMES.contains(&name) {
                            return Err(RegexError::lex(format!("invalid POSIX class \"{}\"", name)));
                        }
                        self.pos = start + len;
                        self.push(
                            TokenKind::CharacterSet {
                                kind: CharacterSetKind::Posix,
                                negate,
                                value: Some(name.to_string()),
                            },
                            start,
                        );
                    } else {
                        let negate = self.eat('^');
                        self.push(TokenKind::CharacterClassOpen { negate }, start);
                        depth += 1;
                        first = true;
                        continue;
                    }
                }
                ']' if first => self.push_char(']' as u32, start),
                ']' => {
                    self.push(TokenKind::CharacterClassClose, start);
                    depth -= 1;
                }
                '&' if self.peek() == Some('&') => {
                    self.bump();
                    self.push(TokenKind::CharacterClassIntersector, start);
                }
                '-' => self.push(TokenKind::CharacterClassHyphen, start),
                '\\' => self.class_escape(start)?,
                _ => self.push_char(c as u32, start),
            }
            first = false;
        }
        Ok(())
    }

    fn class_escape(&mut self, start: usize) -> Result<(), RegexError> {
        let c = self
            .bump()
            .ok_or_else(|| RegexError::lex("incomplete escape \"\\\""))?;
        match c {
            'b' => self.push_char(0x08, start),
            '0'..='7' => {
                let value = self.octal_digits(c as u32 - '0' as u32, 2);
                self.push_char(value, start);
            }
            '8' | '9' => self.push_char(c as u32, start),
            _ => return self.shared_escape(c, start, true),
        }
        Ok(())
    }
}

/// Parse the inside of `\k<..>` / `\g<..>`.
fn parse_reference(inner: &str, subroutine: bool) -> Result<RefTarget, RegexError> {
    let what = if subroutine { "subroutine" } else { "backreference" };
    if inner.is_empty() {
        return Err(RegexError::lex(format!("empty {} reference", what)));
    }
    let (sign, digits) = match inner.as_bytes()[0] {
        b'-' => (-1, &inner[1..]),
        b'+' => (1, &inner[1..]),
        _ => (0, inner),
    };
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        let n: u32 = digits
            .parse()
            .map_err(|_| RegexError::lex(format!("invalid {} \"{}\"", what, inner)))?;
        return match sign {
            0 if n == 0 && !subroutine => Err(RegexError::lex("invalid backreference \"\\k<0>\"")),
            0 => Ok(RefTarget::Number(n)),
            1 if !subroutine => Err(RegexError::lex(format!(
                "invalid relative backreference \"{}\"",
                inner
            ))),
            _ if n == 0 => Err(RegexError::lex(format!("invalid relative {} \"{}\"", what, inner))),
            _ => Ok(RefTarget::Relative(sign * n as i32)),
        };
    }
    // `name+1`, `1-2`: recursion-level qualified.
    if let Some(i) = inner.rfind(['+', '-']) {
        let level = &inner[i + 1..];
        if i > 0 && !level.is_empty() && level.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RegexError::lex(format!(
                "recursion-level {} \"{}\" is not supported",
                what, inner
            )));
        }
    }
    if !crate::ast::is_valid_group_name(inner) {
        return Err(RegexError::lex(format!("invalid group name \"{}\"", inner)));
    }
    Ok(RefTarget::Name(inner.to_string()))
}

/// `[:name:]` / `[:^name:]` at the start of `s`: (name, negate, byte length).
fn scan_posix(s: &str) -> Option<(&str, bool, usize)> {
    let body = s.strip_prefix("[:")?;
    let (negate, body) = match body.strip_prefix('^') {
        Some(b) => (true, b),
        None => (false, body),
    };
    let name_len = body.bytes().take_while(|b| b.is_ascii_alphabetic()).count();
    if name_len == 0 || !body[name_len..].starts_with(":]") {
        return None;
    }
    let total = s.len() - body.len() + name_len + 2;
    Some((&body[..name_len], negate, total))
}

/// `{n}`, `{n,}`, `{,n}`, `{n,m}` at the start of `s`: (min, max, byte length).
/// `max` is `None` for an open range.
fn scan_interval(s: &str) -> Option<(Option<u32>, Option<u32>, bool, usize)> {
    let body = s.strip_prefix('{')?;
    let close = body.find('}')?;
    let inner = &body[..close];
    let number = |t: &str| -> Option<Option<u32>> {
        if t.is_empty() {
            Some(None)
        } else if t.bytes().all(|b| b.is_ascii_digit()) {
            // Overflow saturates so the repeat limit rejects it.
            Some(Some(t.parse::<u32>().unwrap_or(u32::MAX)))
        } else {
            None
        }
    };
    let (min, max, has_comma) = match inner.split_once(',') {
        Some((lo, hi)) => {
            let (lo, hi) = (number(lo)?, number(hi)?);
            if lo.is_none() && hi.is_none() {
                return None;
            }
            (lo, hi, true)
        }
        None => (Some(number(inner)??), None, false),
    };
    Some((min, max, has_comma, close + 2))
}

/// One quantifier at the start of `s`: its token kind and byte length.
fn scan_quantifier(s: &str) -> Result<Option<(TokenKind, usize)>, RegexError> {
    let q = |kind, min, max| TokenKind::Quantifier { kind, min, max };
    let symbol = match s.as_bytes().first() {
        Some(b'?') => Some((0, Some(1))),
        Some(b'*') => Some((0, None)),
        Some(b'+') => Some((1, None)),
        _ => None,
    };
    if let Some((min, max)) = symbol {
        return Ok(Some(match s.as_bytes().get(1) {
            Some(b'?') => (q(QuantifierKind::Lazy, min, max), 2),
            Some(b'+') => (q(QuantifierKind::Possessive, min, max), 2),
            _ => (q(QuantifierKind::Greedy, min, max), 1),
        }));
    }
    let Some((min, max, has_comma, len)) = scan_interval(s) else {
        return Ok(None);
    };
    for n in [min, max].into_iter().flatten() {
        if n > MAX_REPEAT_NUM {
            return Err(RegexError::lex("too big number for repeat range"));
        }
    }
    let min_v = min.unwrap_or(0);
    if !has_comma {
        // `{n}` is greedy only; a following `?` or `+` is its own quantifier.
        return Ok(Some((q(QuantifierKind::Greedy, min_v, Some(min_v)), len)));
    }
    match max {
        Some(max_v) if max_v < min_v => {
            // Reversed interval: possessive, never followed by a modifier.
            Ok(Some((q(QuantifierKind::Possessive, max_v, Some(min_v)), len)))
        }
        _ => {
            if s.as_bytes().get(len) == Some(&b'?') {
                Ok(Some((q(QuantifierKind::Lazy, min_v, max), len + 1)))
            } else {
                Ok(Some((q(QuantifierKind::Greedy, min_v, max), len)))
            }
        }
    }
}

// === Second pass ===

fn finalize(tokens: Vec<Token>, rules: &Rules) -> Result<Vec<Token>, RegexError> {
    let has_named = tokens.iter().any(|t| {
        matches!(&t.kind, TokenKind::GroupOpen { kind: GroupOpenKind::Capturing, name: Some(_), .. })
    });
    let mut tokens = tokens;
    let mut count = 0u32;
    for token in tokens.iter_mut() {
        if let TokenKind::GroupOpen { kind, name, number, .. } = &mut token.kind {
            if *kind != GroupOpenKind::Capturing {
                continue;
            }
            if name.is_none() && has_named && !rules.capture_group {
                *kind = GroupOpenKind::Group;
            } else {
                count += 1;
                *number = Some(count);
            }
        }
    }
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.kind == TokenKind::EscapedNumber {
            split_escaped_number(&token.raw, count, &mut out);
        } else {
            out.push(token);
        }
    }
    Ok(out)
}

/// `\N`: a backreference when N is 1-9 or within the group count, else an
/// octal escape (up to three digits, at most `\377`) followed by literal digits.
fn split_escaped_number(raw: &str, captures: u32, out: &mut Vec<Token>) {
    let digits = &raw[1..];
    if let Ok(n) = digits.parse::<u32>() {
        if n <= 9 || n <= captures {
            out.push(Token {
                kind: TokenKind::Backreference { target: RefTarget::Number(n) },
                raw: raw.to_string(),
            });
            return;
        }
    }
    let octal_len = digits.bytes().take(3).take_while(|b| (b'0'..=b'7').contains(b)).count();
    let mut octal_len = octal_len;
    if octal_len == 3 && u32::from_str_radix(&digits[..3], 8).unwrap_or(0) > 0o377 {
        octal_len = 2;
    }
    let mut rest = digits;
    if octal_len > 0 {
        let value = u32::from_str_radix(&digits[..octal_len], 8).unwrap_or(0);
        out.push(Token {
            kind: TokenKind::Character { value },
            raw: format!("\\{}", &digits[..octal_len]),
        });
        rest = &digits[octal_len..];
    } else if let Some(first) = digits.chars().next() {
        // `\8`, `\9` as identity escapes.
        out.push(Token {
            kind: TokenKind::Character { value: first as u32 },
            raw: format!("\\{}", first),
        });
        rest = &digits[1..];
    }
    for d in rest.chars() {
        out.push(Token { kind: TokenKind::Character { value: d as u32 }, raw: d.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(pattern: &str) -> Vec<TokenKind> {
        tokenize(pattern, "", &Rules::default())
            .unwrap()
            .tokens
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn quant(kind: QuantifierKind, min: u32, max: Option<u32>) -> TokenKind {
        TokenKind::Quantifier { kind, min, max }
    }

    #[test]
    fn quantifier_chain_splits_reversed_interval() {
        let k = kinds(".{2,1}?");
        assert_eq!(k[1], quant(QuantifierKind::Possessive, 1, Some(2)));
        assert_eq!(k[2], quant(QuantifierKind::Greedy, 0, Some(1)));
        assert_eq!(k.len(), 3);
    }

    #[test]
    fn quantifier_symbols_and_modifiers() {
        let k = kinds("a*?b++c?+d{2,}?e{3}?");
        assert!(k.contains(&quant(QuantifierKind::Lazy, 0, None)));
        assert!(k.contains(&quant(QuantifierKind::Possessive, 1, None)));
        assert!(k.contains(&quant(QuantifierKind::Possessive, 0, Some(1))));
        assert!(k.contains(&quant(QuantifierKind::Lazy, 2, None)));
        // `{3}?` is a fixed greedy interval followed by a greedy `?`
        let tail = &k[k.len() - 2..];
        assert_eq!(tail[0], quant(QuantifierKind::Greedy, 3, Some(3)));
        assert_eq!(tail[1], quant(QuantifierKind::Greedy, 0, Some(1)));
    }

    #[test]
    fn brace_without_interval_is_literal() {
        let k = kinds("a{,}b{x}");
        assert_eq!(k[1], TokenKind::Character { value: '{' as u32 });
        assert!(kinds("a{,3}").contains(&quant(QuantifierKind::Greedy, 0, Some(3))));
    }

    #[test]
    fn repeat_limit() {
        assert!(tokenize("a{100001}", "", &Rules::default()).is_err());
        assert!(tokenize("a{100000}", "", &Rules::default()).is_ok());
        for pattern in ["a{99999999999999999999}", "a{1,99999999999999999999}"] {
            let err = tokenize(pattern, "", &Rules::default()).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Lex, "{}", pattern);
        }
    }

    #[test]
    fn free_spacing_is_scoped_per_group() {
        let result = tokenize("a b(?-x: c )d # comment\n e", "x", &Rules::default()).unwrap();
        let chars: String = result
            .tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Character { value } => char::from_u32(value),
                _ => None,
            })
            .collect();
        assert_eq!(chars, "ab c de");
        assert!(result.flags.extended);
    }

    #[test]
    fn flag_directive_toggles_free_spacing() {
        let k = kinds("(?x) a (?-x) b");
        let chars = k
            .iter()
            .filter(|t| matches!(t, TokenKind::Character { .. }))
            .count();
        assert_eq!(chars, 3); // "a", " ", "b"
    }

    #[test]
    fn class_subgrammar() {
        let k = kinds("[]a[:alpha:][^b]&&c-]");
        assert_eq!(k[0], TokenKind::CharacterClassOpen { negate: false });
        assert_eq!(k[1], TokenKind::Character { value: ']' as u32 });
        assert!(matches!(&k[3], TokenKind::CharacterSet { kind: CharacterSetKind::Posix, value: Some(v), .. } if v == "alpha"));
        assert_eq!(k[4], TokenKind::CharacterClassOpen { negate: true });
        assert!(k.contains(&TokenKind::CharacterClassIntersector));
        assert!(k.contains(&TokenKind::CharacterClassHyphen));
        assert_eq!(k.last(), Some(&TokenKind::CharacterClassClose));
    }

    #[test]
    fn class_errors() {
        assert!(tokenize("[abc", "", &Rules::default()).is_err());
        assert!(tokenize("[[:foo:]]", "", &Rules::default()).is_err());
        assert!(tokenize("[\\A]", "", &Rules::default()).is_err());
    }

    #[test]
    fn escaped_numbers_resolve_against_group_count() {
        let k = kinds("(a)\\1\\18");
        assert_eq!(k[3], TokenKind::Backreference { target: RefTarget::Number(1) });
        assert_eq!(k[4], TokenKind::Character { value: 1 });
        assert_eq!(k[5], TokenKind::Character { value: '8' as u32 });
        let k = kinds("\\2");
        assert_eq!(k[0], TokenKind::Backreference { target: RefTarget::Number(2) });
        let k = kinds("\\81");
        assert_eq!(k, vec![TokenKind::Character { value: '8' as u32 }, TokenKind::Character { value: '1' as u32 }]);
    }

    #[test]
    fn unnamed_groups_lose_numbers_next_to_named() {
        let k = kinds("()(?<n>)");
        assert!(matches!(k[0], TokenKind::GroupOpen { kind: GroupOpenKind::Group, number: None, .. }));
        assert!(matches!(k[2], TokenKind::GroupOpen { kind: GroupOpenKind::Capturing, number: Some(1), .. }));
        let rules = Rules { capture_group: true, ..Rules::default() };
        let k = tokenize("()(?<n>)", "", &rules).unwrap().tokens;
        assert!(matches!(k[0].kind, TokenKind::GroupOpen { number: Some(1), .. }));
        assert!(matches!(k[2].kind, TokenKind::GroupOpen { number: Some(2), .. }));
    }

    #[test]
    fn utf8_byte_sequences() {
        assert_eq!(kinds("\\xE2\\x82\\xAC"), vec![TokenKind::Character { value: 0x20AC }]);
        assert!(tokenize("\\xE2\\x82", "", &Rules::default()).is_err());
        assert!(tokenize("\\xFF", "", &Rules::default()).is_err());
        assert_eq!(kinds("\\x{1F600}"), vec![TokenKind::Character { value: 0x1F600 }]);
    }

    #[test]
    fn unsupported_constructs() {
        for p in ["(?{x})", "(?~|a)", "(?(1)a)", "\\M-a", "(?#abc", "(*FOO)", "(*MAX{1)"] {
            assert!(tokenize(p, "", &Rules::default()).is_err(), "{} should fail", p);
        }
    }

    #[test]
    fn references() {
        assert_eq!(kinds("\\k<-1>"), vec![TokenKind::Backreference { target: RefTarget::Relative(-1) }]);
        assert_eq!(kinds("\\g'+2'"), vec![TokenKind::Subroutine { target: RefTarget::Relative(2) }]);
        assert_eq!(kinds("\\g<0>"), vec![TokenKind::Subroutine { target: RefTarget::Number(0) }]);
        assert!(tokenize("\\k<a+1>", "", &Rules::default()).is_err());
        assert!(tokenize("\\k<+1>", "", &Rules::default()).is_err());
    }

    #[test]
    fn named_callouts() {
        let k = kinds("(*MAX[t]{+3,X})(*FAIL)");
        assert_eq!(
            k[0],
            TokenKind::NamedCallout {
                kind: CalloutKind::Max,
                tag: Some("t".into()),
                arguments: Some("+3,X".into())
            }
        );
        assert_eq!(k[1], TokenKind::NamedCallout { kind: CalloutKind::Fail, tag: None, arguments: None });
    }

    #[test]
    fn singleline_anchors() {
        let rules = Rules { singleline: true, ..Rules::default() };
        let k: Vec<_> = tokenize("^$", "", &rules).unwrap().tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(k[0], TokenKind::Assertion { kind: AssertionKind::StringStart, negate: false });
        assert_eq!(k[1], TokenKind::Assertion { kind: AssertionKind::StringEndNewline, negate: false });
    }

    #[test]
    fn invalid_flags() {
        assert!(tokenize("a", "q", &Rules::default()).is_err());
    }
}
