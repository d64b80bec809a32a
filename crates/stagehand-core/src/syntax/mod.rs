//! Syntax model for Go test packages.
//!
//! The model is deliberately shallow: it keeps just enough of the source to
//! drive stage extraction. Function bodies are lowered to their call
//! statements; everything else (assignments, control flow, non-call
//! expressions) is dropped at parse time. Statements inside `if`, `for` and
//! `switch` blocks are not traversed, so stages declared there are not seen.

mod error;
mod model;
mod parser;

pub use error::ParseError;
pub use model::{Arg, BodyCall, CallExpr, Callee, FuncBody, GoFile, GoPackage};
pub use parser::parse_package;
