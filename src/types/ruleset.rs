use std::collections::BTreeSet;
use std::fmt;

use super::rule::{Command, Rule};

/// A compiled, immutable rule tree. Thread-safe and designed to live behind `Arc`.
///
/// # Example
///
/// ```
/// use logrec::Ruleset;
///
/// let ruleset = Ruleset::from_dsl(r"
/// /^(\w+) (\w+)$/
///     fname = _g1
///     lname = _g2
///     flush
/// ").unwrap();
///
/// assert_eq!(ruleset.rules().len(), 1);
/// assert_eq!(ruleset.fields().collect::<Vec<_>>(), ["fname", "lname"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    pub(crate) rules: Vec<Rule>,
    pub(crate) fields: BTreeSet<String>,
}

impl Ruleset {
    /// Parse and compile rule text.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`](crate::CompileError) if a line cannot be
    /// parsed or a pattern fails to compile.
    pub fn from_dsl(input: &str) -> Result<Self, crate::CompileError> {
        let parsed = crate::parse::parse(input)?;
        crate::compile::compile(parsed)
    }

    /// Read a rule file and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`LogrecError`](crate::LogrecError) on I/O or compile failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::LogrecError> {
        let input = std::fs::read_to_string(path)?;
        Ok(Self::from_dsl(&input)?)
    }

    /// Top-level rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Every field name assigned anywhere in the rules, sorted.
    ///
    /// Informational only: assignment is not restricted to this set.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Total number of rules, nested ones included.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        fn count(commands: &[Command]) -> usize {
            commands
                .iter()
                .map(|command| match command {
                    Command::Nested(rule) => 1 + count(&rule.commands),
                    _ => 0,
                })
                .sum()
        }
        self.rules.iter().map(|rule| 1 + count(&rule.commands)).sum()
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ruleset({} top-level rules, {} total, {} fields)",
            self.rules.len(),
            self.rule_count(),
            self.fields.len(),
        )
    }
}
