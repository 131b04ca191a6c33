use tracing::debug;

use crate::evaluate::evaluate;
use crate::{Bindings, Capture, Command, EvalContext, EvalError, Position, Record, Rule};

/// Mutable state shared by every rule of one engine.
#[derive(Debug, Clone, Default)]
pub(crate) struct State {
    pub record: Record,
    pub globals: Bindings,
}

/// What the interpreter produced before pausing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    /// A flushed copy of the record; call `resume` again to continue.
    Emit(Record),
    /// `exit` ran. The interpreter has no work left.
    Halt,
    /// Every command of the rule has run.
    Done,
}

/// Result of executing one command.
enum Flow<'r> {
    Continue,
    Emit(Record),
    Enter(Frame<'r>),
    Halt,
}

struct Frame<'r> {
    commands: &'r [Command],
    pc: usize,
    capture: Capture,
}

/// Runs one matched top-level rule, pausing at every emitted record.
///
/// Nested rules push a frame holding their own capture, so the walk needs no
/// recursion and can be suspended at any depth between two commands.
pub(crate) struct Interpreter<'r> {
    frames: Vec<Frame<'r>>,
}

impl<'r> Interpreter<'r> {
    pub fn new(rule: &'r Rule, capture: Capture) -> Self {
        Self {
            frames: vec![Frame {
                commands: &rule.commands,
                pc: 0,
                capture,
            }],
        }
    }

    /// Execute commands until one emits a record, `exit` runs, or the rule
    /// is finished.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] if an assignment or `eval` expression fails.
    pub fn resume(
        &mut self,
        state: &mut State,
        position: Position<'_>,
        debug: bool,
    ) -> Result<Step, EvalError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(Step::Done);
            };
            let commands = frame.commands;
            let Some(command) = commands.get(frame.pc) else {
                self.frames.pop();
                continue;
            };
            frame.pc += 1;

            match execute(command, &frame.capture, state, position, debug)? {
                Flow::Continue => {}
                Flow::Emit(record) => return Ok(Step::Emit(record)),
                Flow::Enter(nested) => self.frames.push(nested),
                Flow::Halt => {
                    self.frames.clear();
                    return Ok(Step::Halt);
                }
            }
        }
    }
}

fn execute<'r>(
    command: &'r Command,
    capture: &Capture,
    state: &mut State,
    position: Position<'_>,
    debug: bool,
) -> Result<Flow<'r>, EvalError> {
    match command {
        Command::Assign { key, expr, source } => {
            let value = {
                let mut ctx = EvalContext::for_assign(capture, position, &state.globals);
                evaluate(expr, &mut ctx).map_err(|reason| EvalError::Assign {
                    key: key.clone(),
                    expr: source.clone(),
                    line: position.number,
                    reason,
                })?
            };
            if debug {
                debug!(line = position.number, key = %key, value = %value, "assign");
            }
            state.record.insert(key, value);
            Ok(Flow::Continue)
        }
        Command::Flush => {
            if state.record.is_empty() {
                if debug {
                    debug!(line = position.number, "flush skipped, record is empty");
                }
                return Ok(Flow::Continue);
            }
            if debug {
                debug!(line = position.number, record = %state.record, "flush");
            }
            Ok(Flow::Emit(state.record.clone()))
        }
        Command::Clear(keys) => {
            match keys {
                None => state.record.clear(),
                Some(keys) => {
                    for key in keys {
                        state.record.remove(key);
                    }
                }
            }
            if debug {
                debug!(line = position.number, command = %command, "clear");
            }
            Ok(Flow::Continue)
        }
        Command::Nested(rule) => {
            let Some(nested) = rule.pattern.captures(capture.text()) else {
                if debug {
                    debug!(line = position.number, pattern = %rule.pattern, "nested rule did not match");
                }
                return Ok(Flow::Continue);
            };
            if debug {
                debug!(line = position.number, pattern = %rule.pattern, matched = nested.text(), "nested rule matched");
            }
            Ok(Flow::Enter(Frame {
                commands: &rule.commands,
                pc: 0,
                capture: nested,
            }))
        }
        Command::Eval { expr, source } => {
            let mut ctx =
                EvalContext::for_eval(capture, position, &state.record, &mut state.globals);
            let value = evaluate(expr, &mut ctx).map_err(|reason| EvalError::Eval {
                expr: source.clone(),
                line: position.number,
                reason,
            })?;
            if debug {
                debug!(line = position.number, expr = %source, result = %value, "eval");
            }
            Ok(Flow::Continue)
        }
        Command::Exit => {
            if debug {
                debug!(line = position.number, "exit");
            }
            Ok(Flow::Halt)
        }
    }
}
