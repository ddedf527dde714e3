// flags.rs - Pattern-wide flags and group-level flag modifiers.

use bitflags::bitflags;

use crate::error::RegexError;

/// Text-segment mode selected by the `y{g}` / `y{w}` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextSegmentMode {
    Grapheme,
    Word,
}

/// Pattern-wide flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags {
    /// `i`
    pub ignore_case: bool,
    /// `m` (Oniguruma's "multiline": `.` matches newline)
    pub dot_all: bool,
    /// `x`
    pub extended: bool,
    /// `D`
    pub digit_is_ascii: bool,
    /// `P`
    pub posix_is_ascii: bool,
    /// `S`
    pub space_is_ascii: bool,
    /// `W`
    pub word_is_ascii: bool,
    /// `y{g}` / `y{w}`
    pub text_segment_mode: Option<TextSegmentMode>,
}

impl Flags {
    /// Parse a flags string drawn from `imxDPSW` plus `y{g}` / `y{w}`.
    pub fn parse(flags: &str) -> Result<Flags, RegexError> {
        let mut out = Flags::default();
        let mut rest = flags;
        while let Some(c) = rest.chars().next() {
            rest = &rest[c.len_utf8()..];
            match c {
                'i' => out.ignore_case = true,
                'm' => out.dot_all = true,
                'x' => out.extended = true,
                'D' => out.digit_is_ascii = true,
                'P' => out.posix_is_ascii = true,
                'S' => out.space_is_ascii = true,
                'W' => out.word_is_ascii = true,
                'y' => {
                    out.text_segment_mode = Some(if let Some(r) = rest.strip_prefix("{g}") {
                        rest = r;
                        TextSegmentMode::Grapheme
                    } else if let Some(r) = rest.strip_prefix("{w}") {
                        rest = r;
                        TextSegmentMode::Word
                    } else {
                        return Err(RegexError::lex(format!(
                            "invalid text segment mode flag in \"{}\"",
                            flags
                        )));
                    });
                }
                _ => return Err(RegexError::lex(format!("invalid flag \"{}\"", c))),
            }
        }
        Ok(out)
    }

    /// Render the flags that have an observable effect. Free-spacing is never
    /// rendered because whitespace and comments are already resolved.
    pub fn to_flag_string(&self) -> String {
        let mut s = String::new();
        if self.ignore_case {
            s.push('i');
        }
        if self.dot_all {
            s.push('m');
        }
        if self.digit_is_ascii {
            s.push('D');
        }
        if self.posix_is_ascii {
            s.push('P');
        }
        if self.space_is_ascii {
            s.push('S');
        }
        if self.word_is_ascii {
            s.push('W');
        }
        match self.text_segment_mode {
            Some(TextSegmentMode::Grapheme) => s.push_str("y{g}"),
            Some(TextSegmentMode::Word) => s.push_str("y{w}"),
            None => {}
        }
        s
    }
}

bitflags! {
    /// Flags that may be toggled inside a pattern with `(?imx-imx)`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FlagMods: u8 {
        const IGNORE_CASE = 1 << 0;
        const DOT_ALL = 1 << 1;
        const EXTENDED = 1 << 2;
    }
}

impl FlagMods {
    fn from_char(c: char) -> Option<FlagMods> {
        match c {
            'i' => Some(FlagMods::IGNORE_CASE),
            'm' => Some(FlagMods::DOT_ALL),
            'x' => Some(FlagMods::EXTENDED),
            _ => None,
        }
    }

    /// Letters in canonical order, skipping `x`.
    pub fn to_letters(self) -> String {
        let mut s = String::new();
        if self.contains(FlagMods::IGNORE_CASE) {
            s.push('i');
        }
        if self.contains(FlagMods::DOT_ALL) {
            s.push('m');
        }
        s
    }
}

/// The `enable-disable` pair of a flag group or flag directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlagGroupModifiers {
    pub enable: FlagMods,
    pub disable: FlagMods,
}

impl FlagGroupModifiers {
    /// Parse the `imx-imx` part between `(?` and `)` or `:`.
    pub fn parse(raw: &str) -> Result<FlagGroupModifiers, RegexError> {
        let mut mods = FlagGroupModifiers::default();
        let mut disabling = false;
        for c in raw.chars() {
            if c == '-' {
                if disabling {
                    return Err(RegexError::lex(format!("invalid flag modifiers \"{}\"", raw)));
                }
                disabling = true;
                continue;
            }
            let flag = FlagMods::from_char(c).ok_or_else(|| {
                RegexError::lex(format!("unsupported flag modifier \"{}\" in \"{}\"", c, raw))
            })?;
            if disabling {
                mods.disable |= flag;
            } else {
                mods.enable |= flag;
            }
        }
        Ok(mods)
    }

    /// Whether the modifiers only touch free-spacing (or nothing at all).
    pub fn is_effectless(&self) -> bool {
        (self.enable | self.disable) - FlagMods::EXTENDED == FlagMods::empty()
    }

    /// Render as `i-m`, eliding `x`. Empty when only `x` was set.
    pub fn to_modifier_string(&self) -> String {
        let mut s = self.enable.to_letters();
        let off = self.disable.to_letters();
        if !off.is_empty() {
            s.push('-');
            s.push_str(&off);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_letters() {
        let f = Flags::parse("imxDPSWy{w}").unwrap();
        assert!(f.ignore_case && f.dot_all && f.extended);
        assert!(f.digit_is_ascii && f.posix_is_ascii && f.space_is_ascii && f.word_is_ascii);
        assert_eq!(f.text_segment_mode, Some(TextSegmentMode::Word));
        assert_eq!(f.to_flag_string(), "imDPSWy{w}");
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(Flags::parse("g").is_err());
        assert!(Flags::parse("y{x}").is_err());
        assert!(Flags::parse("y").is_err());
    }

    #[test]
    fn modifiers_elide_extended() {
        let m = FlagGroupModifiers::parse("ix-m").unwrap();
        assert_eq!(m.to_modifier_string(), "i-m");
        assert!(!m.is_effectless());
        let x = FlagGroupModifiers::parse("x").unwrap();
        assert!(x.is_effectless());
        assert_eq!(x.to_modifier_string(), "");
    }

    #[test]
    fn modifiers_reject_bad_input() {
        assert!(FlagGroupModifiers::parse("i-m-x").is_err());
        assert!(FlagGroupModifiers::parse("W").is_err());
    }
}
