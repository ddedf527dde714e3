// prelude.rs - Convenient re-exports for the idiomatic API.
//
//! # Prelude
//!
//! ```
//! use ferroni_syntax::prelude::*;
//!
//! let out = Optimizer::new().optimize("a|ab").unwrap();
//! assert_eq!(out.pattern, "ab??");
//! ```

pub use crate::api::{
    generate, optimize, to_oniguruma_ast, Generated, Optimizer, ParseOptionsBuilder, Pass,
};
pub use crate::ast::OnigurumaAst;
pub use crate::error::{ErrorKind, RegexError};
pub use crate::optimizer::OptimizeOptions;
pub use crate::parser::ParseOptions;
pub use crate::tokenizer::Rules;
pub use crate::traverser::{traverse, Path, Visitor};
