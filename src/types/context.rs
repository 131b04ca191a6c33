use std::borrow::Cow;

use super::error::ExprError;
use super::pattern::Capture;
use super::record::{Bindings, Record};
use super::Value;

/// Prefix under which `eval` commands see the current record's fields.
pub const RECORD_PREFIX: &str = "rec.";

/// Where in the input stream the current line came from.
#[derive(Debug, Clone, Copy)]
pub struct Position<'a> {
    pub line: &'a str,
    /// 1-based line number within the stream.
    pub number: usize,
    pub source: Option<&'a str>,
}

/// The binding environment for a single expression evaluation.
///
/// Built fresh for every `Assign` or `Eval` command. Assignments get a
/// read-only view of the globals. `Eval` additionally sees the record's
/// fields under `rec.` and holds the live globals, which `set()` and
/// `incr()` write through while name lookups keep reading the snapshot
/// taken when the context was built.
#[derive(Debug)]
pub struct EvalContext<'a> {
    capture: &'a Capture,
    position: Position<'a>,
    globals: Cow<'a, Bindings>,
    record: Option<&'a Record>,
    shared: Option<&'a mut Bindings>,
}

impl<'a> EvalContext<'a> {
    /// Context for an assignment: groups, globals and input handles only.
    #[must_use]
    pub fn for_assign(capture: &'a Capture, position: Position<'a>, globals: &'a Bindings) -> Self {
        Self {
            capture,
            position,
            globals: Cow::Borrowed(globals),
            record: None,
            shared: None,
        }
    }

    /// Context for an `eval` command, with record fields and writable globals.
    #[must_use]
    pub fn for_eval(
        capture: &'a Capture,
        position: Position<'a>,
        record: &'a Record,
        globals: &'a mut Bindings,
    ) -> Self {
        Self {
            capture,
            position,
            globals: Cow::Owned(globals.clone()),
            record: Some(record),
            shared: Some(globals),
        }
    }

    #[must_use]
    pub fn capture(&self) -> &Capture {
        self.capture
    }

    #[must_use]
    pub fn position(&self) -> Position<'a> {
        self.position
    }

    /// Resolve an identifier: capture groups (`_g1`..), then record fields
    /// (`rec.name`, eval only), then globals.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::UnknownName`] if nothing is bound to `name`.
    pub fn lookup(&self, name: &str) -> Result<Value, ExprError> {
        if let Some(group) = group_index(name).and_then(|index| self.capture.group(index)) {
            return Ok(Value::from(group));
        }
        if let (Some(record), Some(field)) = (self.record, name.strip_prefix(RECORD_PREFIX)) {
            return Ok(record.get(field).cloned().unwrap_or(Value::Null));
        }
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::UnknownName(name.to_owned()))
    }

    /// Writable handle on the engine's global bindings, if this context has one.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::ReadOnly`] outside `eval` commands.
    pub fn shared_globals(&mut self, function: &'static str) -> Result<&mut Bindings, ExprError> {
        self.shared
            .as_deref_mut()
            .ok_or(ExprError::ReadOnly { function })
    }
}

/// Parse `_gN` into `N` (N >= 1).
fn group_index(name: &str) -> Option<usize> {
    let digits = name.strip_prefix("_g")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pattern;

    fn capture() -> Capture {
        Pattern::new(r"(\w+) (\w+)( x)?")
            .unwrap()
            .captures("Helen Smith")
            .unwrap()
    }

    fn position() -> Position<'static> {
        Position {
            line: "Helen Smith",
            number: 1,
            source: None,
        }
    }

    #[test]
    fn groups_resolve_first() {
        let capture = capture();
        let globals = Bindings::from([("_g1".to_owned(), Value::from("shadowed"))]);
        let ctx = EvalContext::for_assign(&capture, position(), &globals);
        assert_eq!(ctx.lookup("_g1").unwrap(), Value::from("Helen"));
        assert_eq!(ctx.lookup("_g2").unwrap(), Value::from("Smith"));
        assert_eq!(ctx.lookup("_g3").unwrap(), Value::Null);
    }

    #[test]
    fn missing_group_falls_back_to_globals() {
        let capture = capture();
        let globals = Bindings::from([("_g9".to_owned(), Value::Int(9))]);
        let ctx = EvalContext::for_assign(&capture, position(), &globals);
        assert_eq!(ctx.lookup("_g9").unwrap(), Value::Int(9));
        assert_eq!(
            ctx.lookup("_g10"),
            Err(ExprError::UnknownName("_g10".to_owned()))
        );
    }

    #[test]
    fn record_fields_only_visible_in_eval() {
        let capture = capture();
        let record = Record::new().set("fname", "Helen");
        let mut globals = Bindings::new();
        {
            let ctx = EvalContext::for_eval(&capture, position(), &record, &mut globals);
            assert_eq!(ctx.lookup("rec.fname").unwrap(), Value::from("Helen"));
            assert_eq!(ctx.lookup("rec.absent").unwrap(), Value::Null);
        }
        let ctx = EvalContext::for_assign(&capture, position(), &globals);
        assert!(matches!(ctx.lookup("rec.fname"), Err(ExprError::UnknownName(_))));
    }

    #[test]
    fn assign_context_is_read_only() {
        let capture = capture();
        let globals = Bindings::new();
        let mut ctx = EvalContext::for_assign(&capture, position(), &globals);
        assert_eq!(
            ctx.shared_globals("set").unwrap_err(),
            ExprError::ReadOnly { function: "set" }
        );
    }

    #[test]
    fn eval_writes_do_not_change_the_snapshot() {
        let capture = capture();
        let record = Record::new();
        let mut globals = Bindings::from([("n".to_owned(), Value::Int(1))]);
        {
            let mut ctx = EvalContext::for_eval(&capture, position(), &record, &mut globals);
            ctx.shared_globals("set")
                .unwrap()
                .insert("n".to_owned(), Value::Int(2));
            assert_eq!(ctx.lookup("n").unwrap(), Value::Int(1));
        }
        assert_eq!(globals["n"], Value::Int(2));
    }

    #[test]
    fn group_index_parsing() {
        assert_eq!(group_index("_g1"), Some(1));
        assert_eq!(group_index("_g12"), Some(12));
        assert_eq!(group_index("_g0"), None);
        assert_eq!(group_index("_g"), None);
        assert_eq!(group_index("_gx"), None);
        assert_eq!(group_index("g1"), None);
    }
}
