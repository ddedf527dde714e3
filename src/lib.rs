//! # Ferroni Syntax
//!
//! Pure-Rust toolkit for [Oniguruma](https://github.com/kkos/oniguruma) pattern
//! text: tokenize it, parse it into a typed AST, rewrite the AST with
//! meaning-preserving optimization passes, and print it back.
//!
//! Nothing here matches strings. The output is always another Oniguruma
//! pattern plus the flags it needs.
//!
//! ## Quick Start
//!
//! ```rust
//! use ferroni_syntax::prelude::*;
//!
//! let out = Optimizer::new().optimize(r"(?:a|b|c)+\p{Decimal_Number}").unwrap();
//! assert_eq!(out.pattern, r"[a-c]+\d");
//! assert_eq!(out.flags, "");
//! ```
//!
//! Parse and print without rewriting:
//!
//! ```rust
//! use ferroni_syntax::prelude::*;
//!
//! let options = ParseOptions::builder().flags("i").build();
//! let ast = to_oniguruma_ast(r"(?<year>\d{4})-\k<year>", &options).unwrap();
//! let printed = generate(&ast).unwrap();
//! assert_eq!(printed.pattern, r"(?<year>\d{4})-\k<year>");
//! assert_eq!(printed.flags, "i");
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`tokenizer`] | Pattern text to tokens, flag resolution, free-spacing |
//! | [`parser`] | Tokens to [`ast::OnigurumaAst`], reference validation |
//! | [`ast`] | Node model and checked constructors |
//! | [`traverser`] | Visitor walk with deferred sibling edits |
//! | [`optimizer`] | Fixpoint driver and the rewrite passes |
//! | [`generator`] | AST back to pattern text |
//! | [`flags`] | Pattern flags and group modifiers |
//! | [`unicode`] | Property names, aliases, POSIX classes |
//! | [`error`] | [`RegexError`](error::RegexError) |

pub mod api;
pub mod ast;
pub mod error;
pub mod flags;
pub mod generator;
pub mod optimizer;
pub mod parser;
pub mod prelude;
pub mod tokenizer;
pub mod traverser;
pub mod unicode;
