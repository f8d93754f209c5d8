//! Parsing, symbolic differentiation and simplification of polynomial
//! expressions over `+` and `*`.
//!
//! ```
//! use symexpr::{Environment, Expression};
//!
//! let e = Expression::parse("x*x + y").unwrap();
//! assert_eq!(e.differentiate("x").to_string(), "((x*1.0000 + x*1.0000) + 0.0000)");
//!
//! let env = Environment::try_from_iter([("x", 2.0)]).unwrap();
//! assert_eq!(e.simplify(&env).to_string(), "(4.0000 + y)");
//! ```

pub mod commands;
mod diff;
pub mod expr;
pub mod lex;
pub mod parse;
pub mod repl;
pub mod simplify;

pub use commands::{CommandError, differentiate_text, simplify_text};
pub use expr::{Expression, InvalidValueError, Number, UnsupportedOperationError, Variable};
pub use lex::{Lexer, SyntaxError};
pub use parse::Parser;
pub use simplify::Environment;
