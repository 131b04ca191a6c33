use std::fmt;

use super::expr::Expr;
use super::pattern::Pattern;

/// A compiled pattern and the commands to run when it matches.
///
/// Top-level rules are tried against every input line; nested rules (see
/// [`Command::Nested`]) are tried against the text matched by their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub(crate) pattern: Pattern,
    pub(crate) commands: Vec<Command>,
}

impl Rule {
    #[must_use]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

/// One step of a rule's command block.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `key = expression`
    Assign {
        key: String,
        expr: Expr,
        source: String,
    },
    /// `flush`: emit a copy of the record if it has any fields.
    Flush,
    /// `clear` (all fields) or `clear a b` (only the named ones).
    Clear(Option<Vec<String>>),
    /// An indented `/pattern/` with its own block.
    Nested(Rule),
    /// `eval expression`, run for its side effects.
    Eval { expr: Expr, source: String },
    /// `exit`: stop processing the stream.
    Exit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Assign { key, source, .. } => write!(f, "{key} = {source}"),
            Command::Flush => write!(f, "flush"),
            Command::Clear(None) => write!(f, "clear"),
            Command::Clear(Some(keys)) => write!(f, "clear {}", keys.join(" ")),
            Command::Nested(rule) => write!(f, "{}", rule.pattern),
            Command::Eval { source, .. } => write!(f, "eval {source}"),
            Command::Exit => write!(f, "exit"),
        }
    }
}
