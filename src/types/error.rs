use thiserror::Error;

use crate::parse::ParseError;

/// Errors raised while turning rule text into a [`Ruleset`](crate::Ruleset).
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid pattern /{pattern}/ at line {line}: {source}")]
    InvalidPattern {
        line: usize,
        pattern: String,
        source: regex::Error,
    },

    #[error("function '{function}' at line {line} takes {expected} argument(s), found {found}")]
    Arity {
        line: usize,
        function: &'static str,
        expected: String,
        found: usize,
    },

    #[error("function '{function}' at line {line} is only available in eval commands")]
    EvalOnly { line: usize, function: &'static str },
}

/// Failure evaluating an expression against a concrete match.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("unsupported operand types for {op}: {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("bad operand type for unary {op}: {operand}")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("invalid argument to {function}(): {message}")]
    InvalidArgument {
        function: &'static str,
        message: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {op}")]
    Overflow { op: String },

    #[error("{function}() cannot modify globals outside eval commands")]
    ReadOnly { function: &'static str },
}

/// An `Assign` or `Eval` command failed while processing input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("failed to evaluate '{key} = {expr}' at input line {line}: {reason}")]
    Assign {
        key: String,
        expr: String,
        line: usize,
        #[source]
        reason: ExprError,
    },

    #[error("failed to evaluate 'eval {expr}' at input line {line}: {reason}")]
    Eval {
        expr: String,
        line: usize,
        #[source]
        reason: ExprError,
    },
}

impl EvalError {
    /// The underlying expression failure.
    #[must_use]
    pub fn reason(&self) -> &ExprError {
        match self {
            EvalError::Assign { reason, .. } | EvalError::Eval { reason, .. } => reason,
        }
    }
}
