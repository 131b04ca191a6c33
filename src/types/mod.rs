mod context;
mod error;
mod expr;
mod pattern;
mod record;
mod rule;
mod ruleset;
mod value;

pub use context::{EvalContext, Position, RECORD_PREFIX};
pub use error::{CompileError, EvalError, ExprError};
pub use expr::{ArithOp, CompareOp, Expr, Function};
pub use pattern::{Capture, Pattern};
pub use record::{Bindings, Record};
pub use rule::{Command, Rule};
pub use ruleset::Ruleset;
pub use value::Value;
