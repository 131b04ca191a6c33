use thiserror::Error;

use crate::{CompileError, EvalError};

/// Unified error type covering compilation, evaluation and I/O.
///
/// Returned by [`Ruleset::from_file()`](crate::Ruleset::from_file), the
/// [`Records`](crate::Records) stream and [`extract()`](crate::extract).
#[derive(Debug, Error)]
pub enum LogrecError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
