
use std::sync::Arc;

use logrec::{Engine, LineSource, Options, ReaderSource, Record, Ruleset};
use proptest::prelude::*;
use strategies::{arb_lines, arb_program, GenProgram};

/// Helper: newline-terminate every line so empty lines survive.
fn text(lines: &[&str]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}

/// Helper: run a generated program over `lines` with a fresh engine.
fn run(gen: &GenProgram, lines: &[&str], eof_flush: bool) -> Vec<Record> {
    let mut engine = Engine::with_ruleset(
        Arc::new(gen.compile()),
        Options::default().eof_flush(eof_flush),
    );
    engine.collect_str(&text(lines)).unwrap()
}

// ---------------------------------------------------------------------------
// Invariant 1: Determinism
//
// Compiling the same text twice yields the same ruleset, and running it twice
// over the same input yields the same records.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn compile_is_deterministic(gen in arb_program()) {
        let text = gen.to_dsl();
        let a = Ruleset::from_dsl(&text).unwrap();
        let b = Ruleset::from_dsl(&text).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.rule_count(), gen.rule_count());
    }

    #[test]
    fn runs_are_deterministic(gen in arb_program(), lines in arb_lines()) {
        let first = run(&gen, &lines, false);
        let again = run(&gen, &lines, false);
        prop_assert_eq!(first, again);
    }

    #[test]
    fn fields_are_the_assigned_keys(gen in arb_program()) {
        let ruleset = gen.compile();
        let fields: Vec<String> = ruleset.fields().map(str::to_owned).collect();
        prop_assert_eq!(fields, gen.keys());
    }
}

// ---------------------------------------------------------------------------
// Invariant 2: Agreement with the recursive model
//
// Record persistence, flush snapshots, full and partial clears, nested rules
// matching only their parent's text, and exit all behave exactly as the
// straightforward recursive walk in `strategies::GenProgram::run_model`.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn engine_agrees_with_model(gen in arb_program(), lines in arb_lines()) {
        let expected = gen.run_model(&lines, false);
        let actual = run(&gen, &lines, false);
        prop_assert_eq!(actual, expected, "rules:\n{}", gen.to_dsl());
    }

    #[test]
    fn engine_agrees_with_model_eof_flush(gen in arb_program(), lines in arb_lines()) {
        let expected = gen.run_model(&lines, true);
        let actual = run(&gen, &lines, true);
        prop_assert_eq!(actual, expected, "rules:\n{}", gen.to_dsl());
    }
}

// ---------------------------------------------------------------------------
// Invariant 3: Flush snapshots
//
// Without eof flush, every emitted record is non-empty and only holds keys
// the rules assign.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn flushed_records_are_non_empty(gen in arb_program(), lines in arb_lines()) {
        let keys = gen.keys();
        for record in run(&gen, &lines, false) {
            prop_assert!(!record.is_empty());
            for (key, _) in record.iter() {
                prop_assert!(keys.iter().any(|k| k == key), "unexpected key {}", key);
            }
        }
    }

    #[test]
    fn eof_flush_adds_exactly_one_record(gen in arb_program(), lines in arb_lines()) {
        let without = run(&gen, &lines, false);
        let with = run(&gen, &lines, true);
        prop_assert_eq!(with.len(), without.len() + 1);
        prop_assert_eq!(&with[..without.len()], &without[..]);
    }
}

// ---------------------------------------------------------------------------
// Invariant 4: Exit halts reading
//
// Once `exit` runs, no further line is pulled from the source; the remaining
// lines are still available to the caller.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn exit_leaves_the_rest_unread(lines in arb_lines(), tail in arb_lines()) {
        let rules = "/stop/\n    exit\n/(\\w+)/\n    w = _g1\n    flush\n";
        let mut input: Vec<&str> = lines.iter().copied().filter(|l| *l != "stop").collect();
        input.push("stop");
        input.extend(tail.iter().copied());

        let input_text = text(&input);
        let mut engine = Engine::new(rules, Options::default()).unwrap();
        let mut source = ReaderSource::from(input_text.as_str());
        let records = engine.collect(&mut source).unwrap();

        let before = input.iter().take_while(|l| **l != "stop").filter(|l| !l.is_empty()).count();
        prop_assert_eq!(records.len(), before);

        let mut rest = Vec::new();
        while let Some(line) = source.next_line().unwrap() {
            rest.push(line);
        }
        prop_assert_eq!(rest, tail.iter().map(|l| (*l).to_owned()).collect::<Vec<_>>());
    }
}
