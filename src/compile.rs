use std::collections::BTreeSet;

use crate::parse::{ParsedCommand, ParsedRule, ParsedRuleSet};
use crate::{Command, CompileError, Expr, Pattern, Rule, Ruleset};

pub(crate) fn compile(parsed: ParsedRuleSet) -> Result<Ruleset, CompileError> {
    let mut fields = BTreeSet::new();
    let rules = parsed
        .rules
        .into_iter()
        .map(|rule| compile_rule(rule, &mut fields))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Ruleset { rules, fields })
}

fn compile_rule(rule: ParsedRule, fields: &mut BTreeSet<String>) -> Result<Rule, CompileError> {
    let pattern = Pattern::new(&rule.pattern).map_err(|source| CompileError::InvalidPattern {
        line: rule.line,
        pattern: rule.pattern.clone(),
        source,
    })?;

    let mut commands = Vec::with_capacity(rule.commands.len());
    for parsed in rule.commands {
        let command = match parsed {
            ParsedCommand::Nested(nested) => Command::Nested(compile_rule(nested, fields)?),
            ParsedCommand::Command { line, command } => {
                check_command(&command, line)?;
                if let Command::Assign { key, .. } = &command {
                    fields.insert(key.clone());
                }
                command
            }
        };
        commands.push(command);
    }
    Ok(Rule { pattern, commands })
}

fn check_command(command: &Command, line: usize) -> Result<(), CompileError> {
    match command {
        Command::Assign { expr, .. } => check_calls(expr, line, false),
        Command::Eval { expr, .. } => check_calls(expr, line, true),
        Command::Flush | Command::Clear(_) | Command::Nested(_) | Command::Exit => Ok(()),
    }
}

/// Reject calls with the wrong number of arguments, and global-mutating
/// calls outside `eval`.
fn check_calls(expr: &Expr, line: usize, in_eval: bool) -> Result<(), CompileError> {
    let mut result = Ok(());
    expr.for_each_call(&mut |function, found| {
        if result.is_err() {
            return;
        }
        let (min, max) = function.arity();
        if found < min || found > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            result = Err(CompileError::Arity {
                line,
                function: function.name(),
                expected,
                found,
            });
        } else if function.mutates_globals() && !in_eval {
            result = Err(CompileError::EvalOnly {
                line,
                function: function.name(),
            });
        }
    });
    result
}
