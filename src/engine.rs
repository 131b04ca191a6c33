use std::sync::Arc;

use tracing::debug;

use crate::interpret::State;
use crate::{
    Bindings, Command, CompileError, LineSource, LogrecError, ReaderSource, Record, Records, Rule,
    Ruleset, Value,
};

/// Engine configuration.
///
/// ```
/// use logrec::{Options, Value};
///
/// let options = Options::default()
///     .eof_flush(true)
///     .global("greeting", "Hello");
/// assert!(options.is_eof_flush());
/// assert_eq!(options.global_bindings()["greeting"], Value::from("Hello"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    debug: bool,
    eof_flush: bool,
    globals: Bindings,
}

impl Options {
    /// Emit `tracing` debug events for every executed command.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Emit the in-flight record once more when the input ends, even if it
    /// is empty.
    #[must_use]
    pub fn eof_flush(mut self, enabled: bool) -> Self {
        self.eof_flush = enabled;
        self
    }

    /// Bind a global name visible to every expression.
    #[must_use]
    pub fn global(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.globals.insert(name.to_owned(), value.into());
        self
    }

    /// Replace all global bindings.
    #[must_use]
    pub fn globals(mut self, globals: Bindings) -> Self {
        self.globals = globals;
        self
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn is_eof_flush(&self) -> bool {
        self.eof_flush
    }

    #[must_use]
    pub fn global_bindings(&self) -> &Bindings {
        &self.globals
    }
}

/// A compiled rule tree plus the state it accumulates while streaming.
///
/// The in-flight record and the globals live in the engine, so they carry
/// over from one call to [`records`](Engine::records) to the next. The rule
/// tree itself is immutable and can be shared between engines with
/// [`Engine::with_ruleset`].
///
/// # Example
///
/// ```
/// use logrec::{Engine, Options, Record};
///
/// let mut engine = Engine::new(r"
/// /^(\w+)=(\d+)$/
///     key = _g1
///     value = int(_g2)
///     flush
/// ", Options::default()).unwrap();
///
/// let records = engine.collect_str("a=1\nnoise\nb=2\n").unwrap();
/// assert_eq!(records, vec![
///     Record::new().set("key", "a").set("value", 1_i64),
///     Record::new().set("key", "b").set("value", 2_i64),
/// ]);
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    ruleset: Arc<Ruleset>,
    debug: bool,
    eof_flush: bool,
    state: State,
}

impl Engine {
    /// Compile `rules` and build an engine.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if the rule text is invalid.
    pub fn new(rules: &str, options: Options) -> Result<Self, CompileError> {
        let ruleset = Ruleset::from_dsl(rules)?;
        Ok(Self::with_ruleset(Arc::new(ruleset), options))
    }

    /// Build an engine around an already compiled, possibly shared, rule tree.
    #[must_use]
    pub fn with_ruleset(ruleset: Arc<Ruleset>, options: Options) -> Self {
        if options.debug {
            debug!(%ruleset, "engine created");
            log_rules(ruleset.rules(), 0);
        }
        Self {
            ruleset,
            debug: options.debug,
            eof_flush: options.eof_flush,
            state: State {
                record: Record::new(),
                globals: options.globals,
            },
        }
    }

    /// Stream records lazily from `source`.
    pub fn records<S: LineSource>(&mut self, source: S) -> Records<'_, S> {
        Records::new(
            &self.ruleset,
            &mut self.state,
            source,
            self.eof_flush,
            self.debug,
        )
    }

    /// Stream every record from `source` into a `Vec`.
    ///
    /// # Errors
    ///
    /// Returns the first I/O or evaluation error; records emitted before it
    /// are discarded.
    pub fn collect<S: LineSource>(&mut self, source: S) -> Result<Vec<Record>, LogrecError> {
        self.records(source).collect()
    }

    /// [`collect`](Engine::collect) over the lines of a string.
    ///
    /// # Errors
    ///
    /// Returns the first evaluation error.
    pub fn collect_str(&mut self, input: &str) -> Result<Vec<Record>, LogrecError> {
        self.collect(ReaderSource::from(input))
    }

    /// The in-flight record.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.state.record
    }

    /// Current global bindings, including values written by `set`/`incr`.
    #[must_use]
    pub fn globals(&self) -> &Bindings {
        &self.state.globals
    }

    #[must_use]
    pub fn ruleset(&self) -> &Arc<Ruleset> {
        &self.ruleset
    }

    /// Every field name the rules can assign.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.ruleset.fields()
    }
}

fn log_rules(rules: &[Rule], depth: usize) {
    for rule in rules {
        debug!(depth, pattern = %rule.pattern(), commands = rule.commands().len(), "compiled rule");
        for command in rule.commands() {
            if let Command::Nested(nested) = command {
                log_rules(std::slice::from_ref(nested), depth + 1);
            }
        }
    }
}

/// Compile `rules`, run them over `input` and collect the records.
///
/// ```
/// use logrec::{extract, Options};
///
/// let records = extract("/^(\\w+)/\n  word = _g1\n  flush\n", "hello world", Options::default())?;
/// assert_eq!(records[0].get("word").and_then(|v| v.as_str()), Some("hello"));
/// # Ok::<(), logrec::LogrecError>(())
/// ```
///
/// # Errors
///
/// Returns [`LogrecError`] on compile or evaluation failure.
pub fn extract(rules: &str, input: &str, options: Options) -> Result<Vec<Record>, LogrecError> {
    Engine::new(rules, options)?.collect_str(input)
}
