use std::fmt;

/// Errors produced when parsing rule text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    line: usize,
    text: String,
    message: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, text: &str, message: impl Into<String>) -> Self {
        Self {
            line,
            text: text.trim_end().to_owned(),
            message: message.into(),
        }
    }

    /// 1-based line number in the rule text.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// The offending line, without its line terminator.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at line {}: {} <{}>",
            self.line, self.message, self.text
        )
    }
}

impl std::error::Error for ParseError {}
