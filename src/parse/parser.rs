use winnow::Parser;

use crate::Command;

use super::cursor::{LineCursor, SourceLine};
use super::error::ParseError;
use super::grammar;

/// The result of parsing rule text: patterns are still uncompiled text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRuleSet {
    pub rules: Vec<ParsedRule>,
}

/// A `/pattern/` header with its command block.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRule {
    /// Line number of the header.
    pub line: usize,
    pub pattern: String,
    pub commands: Vec<ParsedCommand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    /// Any command other than a nested rule. Never holds [`Command::Nested`].
    Command { line: usize, command: Command },
    Nested(ParsedRule),
}

/// Recursive-descent parser over significant lines.
///
/// `indents` holds the indentation prefix of every block currently open,
/// innermost last. A line belongs to the innermost block when it starts with
/// that block's prefix; otherwise the block ends and the line is left on the
/// cursor for an enclosing block to claim.
pub(crate) struct BlockParser<'i> {
    cursor: LineCursor<'i>,
    indents: Vec<&'i str>,
}

impl<'i> BlockParser<'i> {
    pub fn new(input: &'i str) -> Self {
        Self {
            cursor: LineCursor::new(input),
            indents: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<ParsedRuleSet, ParseError> {
        let mut rules = Vec::new();
        while let Some(line) = self.cursor.advance() {
            let pattern = if line.indent().is_empty() {
                pattern_header(&line)
            } else {
                None
            };
            let Some(pattern) = pattern else {
                return Err(ParseError::new(
                    line.number,
                    line.text,
                    "expected a /pattern/ header",
                ));
            };
            rules.push(self.rule(&line, pattern)?);
        }
        Ok(ParsedRuleSet { rules })
    }

    fn rule(&mut self, header: &SourceLine<'i>, pattern: &str) -> Result<ParsedRule, ParseError> {
        let commands = self.block(header)?;
        Ok(ParsedRule {
            line: header.number,
            pattern: pattern.to_owned(),
            commands,
        })
    }

    /// Parse the block that follows `header`. Its first line fixes the
    /// block's prefix, which must strictly extend the enclosing one.
    fn block(&mut self, header: &SourceLine<'i>) -> Result<Vec<ParsedCommand>, ParseError> {
        if self.indents.len() >= grammar::MAX_NESTING {
            return Err(ParseError::new(
                header.number,
                header.text,
                format!("rules nested too deeply (limit {})", grammar::MAX_NESTING),
            ));
        }
        let parent = self.indents.last().copied().unwrap_or("");
        let indent = match self.cursor.peek() {
            Some(first) if first.indent().len() > parent.len() && first.indent().starts_with(parent) => {
                first.indent()
            }
            _ => {
                return Err(ParseError::new(
                    header.number,
                    header.text,
                    "missing command block: a pattern must be followed by more-indented commands",
                ));
            }
        };

        self.indents.push(indent);
        let mut commands = Vec::new();
        while let Some(line) = self.cursor.peek() {
            if !line.text.starts_with(indent) {
                break;
            }
            self.cursor.advance();

            if let Some(pattern) = pattern_header(&line) {
                commands.push(ParsedCommand::Nested(self.rule(&line, pattern)?));
                continue;
            }

            if grammar::nesting_depth(line.body()) > grammar::MAX_NESTING {
                return Err(ParseError::new(
                    line.number,
                    line.text,
                    format!("expression nested too deeply (limit {})", grammar::MAX_NESTING),
                ));
            }
            let command = grammar::command.parse(line.body()).map_err(|e| {
                let detail = e.inner().to_string().replace('\n', "; ");
                let message = if detail.is_empty() {
                    format!("not a valid command (column {})", e.offset() + 1)
                } else {
                    format!("not a valid command (column {}): {detail}", e.offset() + 1)
                };
                ParseError::new(line.number, line.text, message)
            })?;
            commands.push(ParsedCommand::Command {
                line: line.number,
                command,
            });
        }
        self.indents.pop();
        Ok(commands)
    }
}

/// `/PATTERN/` with surrounding whitespace ignored; returns `PATTERN`.
fn pattern_header<'i>(line: &SourceLine<'i>) -> Option<&'i str> {
    let body = line.body();
    if body.len() >= 2 && body.starts_with('/') && body.ends_with('/') {
        Some(&body[1..body.len() - 1])
    } else {
        None
    }
}
