mod cursor;
mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::{ParsedCommand, ParsedRule, ParsedRuleSet};

use crate::Expr;

/// Parse rule text into a [`ParsedRuleSet`]. Patterns are not compiled yet.
///
/// # Errors
///
/// Returns [`ParseError`] if the text is not valid rule syntax.
pub fn parse(input: &str) -> Result<ParsedRuleSet, ParseError> {
    parser::BlockParser::new(input).parse()
}

/// Parse a single expression as it would appear on the right of `key =`.
///
/// # Errors
///
/// Returns [`ParseError`] (reported as line 1) if the text is not a valid
/// expression.
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    use winnow::Parser;
    if grammar::nesting_depth(input) > grammar::MAX_NESTING {
        return Err(ParseError::new(
            1,
            input,
            format!("expression nested too deeply (limit {})", grammar::MAX_NESTING),
        ));
    }
    grammar::full_expr
        .parse(input)
        .map_err(|e| ParseError::new(1, input, e.inner().to_string().replace('\n', "; ")))
}
