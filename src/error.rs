// error.rs - Error taxonomy for tokenizing, parsing, optimizing and generating.
//
// Every failure aborts the whole call. The variant says which stage rejected
// the pattern; the message carries the detail.

use std::fmt;

/// Coarse classification of a [`RegexError`], for matching without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token-level syntax.
    Lex,
    /// A token appears where the grammar forbids it.
    Structure,
    /// Backreference or subroutine target missing, duplicated or disallowed.
    Reference,
    /// Content disallowed by the surrounding lookbehind context.
    Policy,
    /// Should be unreachable given correct parsing.
    InternalBug,
}

/// Error type for every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexError {
    /// Unterminated group/class/comment, invalid escape, invalid flag, unsupported construct.
    Lex { message: String },
    /// Quantifier without target, unmatched parenthesis and the like.
    Structure { message: String },
    /// Unresolvable or ambiguous backreference/subroutine.
    Reference { message: String },
    /// Lookbehind content restriction.
    Policy { message: String },
    /// Internal invariant violation (reversed quantifier in the generator, non-convergence).
    InternalBug { message: String },
}

impl RegexError {
    pub(crate) fn lex(message: impl Into<String>) -> Self {
        RegexError::Lex { message: message.into() }
    }

    pub(crate) fn structure(message: impl Into<String>) -> Self {
        RegexError::Structure { message: message.into() }
    }

    pub(crate) fn reference(message: impl Into<String>) -> Self {
        RegexError::Reference { message: message.into() }
    }

    pub(crate) fn policy(message: impl Into<String>) -> Self {
        RegexError::Policy { message: message.into() }
    }

    pub(crate) fn bug(message: impl Into<String>) -> Self {
        RegexError::InternalBug { message: message.into() }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegexError::Lex { .. } => ErrorKind::Lex,
            RegexError::Structure { .. } => ErrorKind::Structure,
            RegexError::Reference { .. } => ErrorKind::Reference,
            RegexError::Policy { .. } => ErrorKind::Policy,
            RegexError::InternalBug { .. } => ErrorKind::InternalBug,
        }
    }

    /// The detail message without the stage prefix.
    pub fn message(&self) -> &str {
        match self {
            RegexError::Lex { message }
            | RegexError::Structure { message }
            | RegexError::Reference { message }
            | RegexError::Policy { message }
            | RegexError::InternalBug { message } => message,
        }
    }
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexError::Lex { message } => write!(f, "syntax error: {}", message),
            RegexError::Structure { message } => write!(f, "syntax error: {}", message),
            RegexError::Reference { message } => write!(f, "reference error: {}", message),
            RegexError::Policy { message } => write!(f, "invalid pattern: {}", message),
            RegexError::InternalBug { message } => write!(f, "internal error: {}", message),
        }
    }
}

impl std::error::Error for RegexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(RegexError::lex("x").kind(), ErrorKind::Lex);
        assert_eq!(RegexError::structure("x").kind(), ErrorKind::Structure);
        assert_eq!(RegexError::reference("x").kind(), ErrorKind::Reference);
        assert_eq!(RegexError::policy("x").kind(), ErrorKind::Policy);
        assert_eq!(RegexError::bug("x").kind(), ErrorKind::InternalBug);
    }

    #[test]
    fn display_impl() {
        let err = RegexError::lex("unterminated comment");
        assert_eq!(format!("{}", err), "syntax error: unterminated comment");
        assert_eq!(err.message(), "unterminated comment");
    }

    #[test]
    fn error_trait() {
        let err: Box<dyn std::error::Error> = Box::new(RegexError::bug("did not converge"));
        assert_eq!(err.to_string(), "internal error: did not converge");
    }
}
