use tracing::debug;

use crate::interpret::{Interpreter, State, Step};
use crate::{LineSource, LogrecError, Position, Record, Ruleset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    /// Input is exhausted or `exit` ran; only the end-of-input flush is left.
    Finishing,
    Halted,
}

/// The line being processed and how far through the top-level rules it got.
struct CurrentLine<'e> {
    text: String,
    next_rule: usize,
    active: Option<Interpreter<'e>>,
}

/// Lazy stream of records produced by [`Engine::records`](crate::Engine::records).
///
/// Each call to `next` reads only as many lines as it takes to produce one
/// record. After an error, or once the stream has ended, `next` returns
/// `None` for good.
pub struct Records<'e, S> {
    ruleset: &'e Ruleset,
    state: &'e mut State,
    source: S,
    eof_flush: bool,
    debug: bool,
    phase: Phase,
    lineno: usize,
    current: Option<CurrentLine<'e>>,
}

impl<'e, S: LineSource> Records<'e, S> {
    pub(crate) fn new(
        ruleset: &'e Ruleset,
        state: &'e mut State,
        source: S,
        eof_flush: bool,
        debug: bool,
    ) -> Self {
        if debug {
            debug!(rules = ruleset.rules().len(), source = ?source.name(), "stream started");
        }
        Self {
            ruleset,
            state,
            source,
            eof_flush,
            debug,
            phase: Phase::Running,
            lineno: 0,
            current: None,
        }
    }

    /// Number of input lines read so far.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.lineno
    }

    /// The line source being read.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Advance by one unit of work: read a line, try one rule, or resume the
    /// running rule. Returns a record when one is emitted.
    fn step(&mut self) -> Result<Option<Record>, LogrecError> {
        if self.current.is_none() {
            match self.source.next_line()? {
                Some(text) => {
                    self.lineno += 1;
                    self.current = Some(CurrentLine {
                        text,
                        next_rule: 0,
                        active: None,
                    });
                }
                None => {
                    if self.debug {
                        debug!(lines = self.lineno, "end of input");
                    }
                    self.phase = Phase::Finishing;
                }
            }
            return Ok(None);
        }

        let ruleset = self.ruleset;
        let Some(current) = self.current.as_mut() else {
            return Ok(None);
        };

        if let Some(interpreter) = current.active.as_mut() {
            let position = Position {
                line: &current.text,
                number: self.lineno,
                source: self.source.name(),
            };
            match interpreter.resume(self.state, position, self.debug)? {
                Step::Emit(record) => return Ok(Some(record)),
                Step::Done => current.active = None,
                Step::Halt => {
                    if self.debug {
                        debug!(line = self.lineno, "stream halted by exit");
                    }
                    self.current = None;
                    self.phase = Phase::Finishing;
                }
            }
            return Ok(None);
        }

        match ruleset.rules().get(current.next_rule) {
            Some(rule) => {
                current.next_rule += 1;
                if let Some(capture) = rule.pattern().captures(&current.text) {
                    if self.debug {
                        debug!(line = self.lineno, pattern = %rule.pattern(), "rule matched");
                    }
                    current.active = Some(Interpreter::new(rule, capture));
                }
            }
            None => self.current = None,
        }
        Ok(None)
    }
}

impl<S: LineSource> Iterator for Records<'_, S> {
    type Item = Result<Record, LogrecError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.phase {
                Phase::Halted => return None,
                Phase::Finishing => {
                    self.phase = Phase::Halted;
                    if !self.eof_flush {
                        return None;
                    }
                    if self.debug {
                        debug!(record = %self.state.record, "end of input flush");
                    }
                    return Some(Ok(self.state.record.clone()));
                }
                Phase::Running => {}
            }
            match self.step() {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => {}
                Err(err) => {
                    self.phase = Phase::Halted;
                    self.current = None;
                    return Some(Err(err));
                }
            }
        }
    }
}
