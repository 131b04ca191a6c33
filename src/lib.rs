//! Extract key-value records from line-oriented text with a small,
//! indentation-based rule language.
//!
//! ```
//! use logrec::{extract, Options, Record};
//!
//! let rules = r#"
//! /^(\w+) (\w+)$/
//!     fname = _g1
//!     lname = _g2
//!     /^(Helen|Maria)/
//!         message = "Hello " + _g1
//!     flush
//!     clear message
//! "#;
//!
//! let records = extract(rules, "Helen Smith\nJane Doe\n", Options::default()).unwrap();
//! assert_eq!(records, vec![
//!     Record::new().set("fname", "Helen").set("lname", "Smith").set("message", "Hello Helen"),
//!     Record::new().set("fname", "Jane").set("lname", "Doe"),
//! ]);
//! ```

mod compile;
mod engine;
mod error;
mod evaluate;
mod interpret;
pub mod parse;
mod source;
mod stream;
mod types;

pub use engine::{extract, Engine, Options};
pub use error::LogrecError;
pub use parse::ParseError;
pub use source::{Boundary, FileSource, LineSource, MultiSource, PathSources, ReaderSource};
pub use stream::Records;
pub use types::{
    ArithOp, Bindings, Capture, Command, CompareOp, CompileError, EvalContext, EvalError, Expr,
    ExprError, Function, Pattern, Position, Record, Rule, Ruleset, Value, RECORD_PREFIX,
};
