use winnow::ascii::{digit1, till_line_ending};
use winnow::combinator::{
    alt, cut_err, delimited, fail, not, opt, preceded, repeat, separated, terminated,
};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::{ArithOp, Command, CompareOp, Expr, Function, Value};

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., char::is_whitespace).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

fn space1<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., char::is_whitespace).parse_next(input)
}

// -- Identifiers & keywords -------------------------------------------------

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

const RESERVED: &[&str] = &["and", "AND", "or", "OR", "not", "NOT"];

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (one_of(is_ident_start), take_while(0.., is_ident_char))
        .take()
        .parse_next(input)
}

/// Match `word` only when it is not the prefix of a longer identifier.
fn keyword<'i>(word: &'static str) -> impl FnMut(&mut &'i str) -> ModalResult<&'i str> {
    move |input: &mut &'i str| terminated(word, not(one_of(is_ident_char))).parse_next(input)
}

// -- Literals ---------------------------------------------------------------

fn quoted(input: &mut &str, quote: char) -> ModalResult<String> {
    one_of(quote).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any)
            .context(StrContext::Expected(StrContextValue::CharLiteral(quote)))
            .parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => {
                let esc = cut_err(any).parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\'' => s.push('\''),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

fn string_literal(input: &mut &str) -> ModalResult<String> {
    alt((|i: &mut &str| quoted(i, '"'), |i: &mut &str| quoted(i, '\''))).parse_next(input)
}

fn float_literal(input: &mut &str) -> ModalResult<f64> {
    // Only match floats that contain a decimal point
    (digit1, '.', digit1)
        .take()
        .try_map(|s: &str| s.parse::<f64>())
        .parse_next(input)
}

fn named_constant(input: &mut &str) -> ModalResult<Value> {
    match ident.parse_next(input)? {
        "true" | "True" => Ok(Value::Bool(true)),
        "false" | "False" => Ok(Value::Bool(false)),
        "null" | "None" => Ok(Value::Null),
        _ => Err(ErrMode::from_input(input)),
    }
}

fn literal(input: &mut &str) -> ModalResult<Value> {
    alt((
        string_literal.map(Value::String),
        float_literal.map(Value::Float),
        digit1.try_map(str::parse::<i64>).map(Value::Int),
        named_constant,
    ))
    .parse_next(input)
}

// -- Operators --------------------------------------------------------------

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    ws.parse_next(input)?;
    alt((
        ">=".value(CompareOp::Gte),
        ">".value(CompareOp::Gt),
        "<=".value(CompareOp::Lte),
        "<".value(CompareOp::Lt),
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Neq),
    ))
    .parse_next(input)
}

fn additive_op(input: &mut &str) -> ModalResult<ArithOp> {
    ws.parse_next(input)?;
    alt(('+'.value(ArithOp::Add), '-'.value(ArithOp::Sub))).parse_next(input)
}

fn multiplicative_op(input: &mut &str) -> ModalResult<ArithOp> {
    ws.parse_next(input)?;
    alt((
        '*'.value(ArithOp::Mul),
        '/'.value(ArithOp::Div),
        '%'.value(ArithOp::Rem),
    ))
    .parse_next(input)
}

// -- Nesting guard ----------------------------------------------------------

/// Deepest nesting accepted for expressions and for rule blocks.
pub(crate) const MAX_NESTING: usize = 64;

/// Upper bound on the depth of the expression tree `text` parses into.
///
/// Every operator adds a level to the parenthesis group it appears in, and
/// every `(` opens a group one level below the current one. String literals
/// and trailing comments are skipped. The count is conservative: it never
/// underestimates how deep the parsers below recurse.
pub(crate) fn nesting_depth(text: &str) -> usize {
    let mut levels = vec![0_usize];
    let mut deepest = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let current = levels.last().copied().unwrap_or(0);
        match c {
            '"' | '\'' => {
                while let Some((_, d)) = chars.next() {
                    if d == '\\' {
                        chars.next();
                    } else if d == c {
                        break;
                    }
                }
            }
            '#' => break,
            '(' => levels.push(current + 1),
            ')' => {
                if levels.len() > 1 {
                    levels.pop();
                }
            }
            '+' | '-' | '*' | '/' | '%' | '<' | '>' | '=' | '!' => {
                if let Some(level) = levels.last_mut() {
                    *level += 1;
                }
            }
            c if is_ident_start(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, d)) = chars.peek() {
                    if !is_ident_char(d) {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                if RESERVED.contains(&&text[start..end]) {
                    if let Some(level) = levels.last_mut() {
                        *level += 1;
                    }
                }
            }
            _ => {}
        }
        deepest = deepest.max(levels.last().copied().unwrap_or(0));
    }
    deepest
}

// -- Expressions ------------------------------------------------------------
//
// Precedence, loosest first: or < and < not < comparison < + - < * / % <
// unary minus < primary.

fn call_or_name(input: &mut &str) -> ModalResult<Expr> {
    let name = ident.parse_next(input)?;
    if RESERVED.contains(&name) {
        return Err(ErrMode::from_input(input));
    }
    let checkpoint = input.checkpoint();
    ws.parse_next(input)?;
    if opt('(').parse_next(input)?.is_none() {
        input.reset(&checkpoint);
        return Ok(Expr::Name(name.to_owned()));
    }
    let Some(function) = Function::from_name(name) else {
        return cut_err(fail)
            .context(StrContext::Expected(StrContextValue::Description(
                "a known function name",
            )))
            .parse_next(input);
    };
    let args: Vec<Expr> = separated(0.., expr, (ws, ',')).parse_next(input)?;
    (ws, cut_err(')'))
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .parse_next(input)?;
    Ok(Expr::Call { function, args })
}

fn primary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', cut_err(expr), (ws, cut_err(')'))),
        literal.map(Expr::Literal),
        call_or_name,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

fn unary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    if opt('-').parse_next(input)?.is_some() {
        let inner = cut_err(unary).parse_next(input)?;
        return Ok(Expr::Neg(Box::new(inner)));
    }
    primary(input)
}

fn product(input: &mut &str) -> ModalResult<Expr> {
    let first = unary(input)?;
    let rest: Vec<(ArithOp, Expr)> =
        repeat(0.., (multiplicative_op, cut_err(unary))).parse_next(input)?;
    Ok(rest.into_iter().fold(first, |lhs, (op, rhs)| Expr::Arith {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }))
}

fn sum(input: &mut &str) -> ModalResult<Expr> {
    let first = product(input)?;
    let rest: Vec<(ArithOp, Expr)> =
        repeat(0.., (additive_op, cut_err(product))).parse_next(input)?;
    Ok(rest.into_iter().fold(first, |lhs, (op, rhs)| Expr::Arith {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }))
}

fn comparison(input: &mut &str) -> ModalResult<Expr> {
    let lhs = sum(input)?;
    match opt((compare_op, cut_err(sum))).parse_next(input)? {
        Some((op, rhs)) => Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }),
        None => Ok(lhs),
    }
}

fn not_expr(input: &mut &str) -> ModalResult<Expr> {
    if opt(preceded(ws, alt((keyword("not"), keyword("NOT")))))
        .parse_next(input)?
        .is_some()
    {
        let inner = cut_err(not_expr).parse_next(input)?;
        return Ok(Expr::Not(Box::new(inner)));
    }
    comparison(input)
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = not_expr(input)?;
    let rest: Vec<Expr> = repeat(
        0..,
        preceded(
            (ws, alt((keyword("and"), keyword("AND")))),
            cut_err(not_expr),
        ),
    )
    .parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = and_expr(input)?;
    let rest: Vec<Expr> = repeat(
        0..,
        preceded((ws, alt((keyword("or"), keyword("OR")))), cut_err(and_expr)),
    )
    .parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::Or(Box::new(acc), Box::new(r))))
}

pub(crate) fn expr(input: &mut &str) -> ModalResult<Expr> {
    or_expr(input)
}

/// An expression together with its source text, trimmed.
fn expr_with_source(input: &mut &str) -> ModalResult<(Expr, String)> {
    let (expr, taken) = cut_err(expr.with_taken())
        .context(StrContext::Expected(StrContextValue::Description(
            "expression",
        )))
        .parse_next(input)?;
    Ok((expr, taken.trim().to_owned()))
}

// -- Commands ---------------------------------------------------------------

fn assignment(input: &mut &str) -> ModalResult<Command> {
    let key = (
        one_of(is_word_char),
        take_while(0.., |c: char| !c.is_whitespace() && c != '=' && c != '#'),
    )
        .take()
        .parse_next(input)?;
    ws.parse_next(input)?;
    ('=', not('=')).parse_next(input)?;
    let (expr, source) = expr_with_source(input)?;
    Ok(Command::Assign {
        key: key.to_owned(),
        expr,
        source,
    })
}

fn flush(input: &mut &str) -> ModalResult<Command> {
    keyword("flush").value(Command::Flush).parse_next(input)
}

fn clear(input: &mut &str) -> ModalResult<Command> {
    keyword("clear").parse_next(input)?;
    let keys: Vec<&str> = repeat(
        0..,
        preceded(space1, take_while(1.., is_word_char)),
    )
    .parse_next(input)?;
    if keys.is_empty() {
        Ok(Command::Clear(None))
    } else {
        Ok(Command::Clear(Some(
            keys.into_iter().map(str::to_owned).collect(),
        )))
    }
}

fn eval(input: &mut &str) -> ModalResult<Command> {
    (keyword("eval"), space1).parse_next(input)?;
    let (expr, source) = expr_with_source(input)?;
    Ok(Command::Eval { expr, source })
}

fn exit(input: &mut &str) -> ModalResult<Command> {
    keyword("exit").value(Command::Exit).parse_next(input)
}

/// A single command line, indentation already stripped. Alternatives are
/// tried in a fixed order: assignment, flush, clear, eval, exit.
pub(crate) fn command(input: &mut &str) -> ModalResult<Command> {
    let command = alt((assignment, flush, clear, eval, exit))
        .context(StrContext::Label("command"))
        .parse_next(input)?;
    ws.parse_next(input)?;
    Ok(command)
}

/// A standalone expression, allowing surrounding whitespace and a trailing comment.
pub(crate) fn full_expr(input: &mut &str) -> ModalResult<Expr> {
    let expr = expr.parse_next(input)?;
    ws.parse_next(input)?;
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(input: &str) -> Expr {
        full_expr.parse(input).unwrap()
    }

    fn parse_command(input: &str) -> Command {
        command.parse(input).unwrap()
    }

    fn lit(value: impl Into<Value>) -> Box<Expr> {
        Box::new(Expr::Literal(value.into()))
    }

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_owned()))
    }

    #[test]
    fn parse_all_literal_types() {
        let cases = [
            ("42", Value::Int(42)),
            ("2.5", Value::Float(2.5)),
            ("true", Value::Bool(true)),
            ("True", Value::Bool(true)),
            ("False", Value::Bool(false)),
            ("None", Value::Null),
            (r#""hello""#, Value::String("hello".into())),
            ("'single'", Value::String("single".into())),
        ];
        for (text, expected) in cases {
            assert_eq!(parse_expr(text), Expr::Literal(expected), "failed for {text}");
        }
    }

    #[test]
    fn parse_string_with_escapes() {
        assert_eq!(
            parse_expr(r#""a\"b\\c\n""#),
            Expr::Literal(Value::String("a\"b\\c\n".into()))
        );
    }

    #[test]
    fn hash_inside_string_is_not_a_comment() {
        assert_eq!(
            parse_expr(r##""#1" # trailing"##),
            Expr::Literal(Value::String("#1".into()))
        );
    }

    #[test]
    fn parse_concatenation() {
        assert_eq!(
            parse_expr(r#""Hello " + _g1"#),
            Expr::Arith {
                op: ArithOp::Add,
                lhs: lit("Hello "),
                rhs: name("_g1"),
            }
        );
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse_expr("1 + 2 * 3"),
            Expr::Arith {
                op: ArithOp::Add,
                lhs: lit(1_i64),
                rhs: Box::new(Expr::Arith {
                    op: ArithOp::Mul,
                    lhs: lit(2_i64),
                    rhs: lit(3_i64),
                }),
            }
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(
            parse_expr("10 - 3 - 2"),
            Expr::Arith {
                op: ArithOp::Sub,
                lhs: Box::new(Expr::Arith {
                    op: ArithOp::Sub,
                    lhs: lit(10_i64),
                    rhs: lit(3_i64),
                }),
                rhs: lit(2_i64),
            }
        );
    }

    #[test]
    fn parse_unary_minus() {
        assert_eq!(parse_expr("-5"), Expr::Neg(lit(5_i64)));
        assert_eq!(parse_expr("--x"), Expr::Neg(Box::new(Expr::Neg(name("x")))));
    }

    #[test]
    fn parse_all_comparison_ops() {
        let ops = [
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Neq),
            (">", CompareOp::Gt),
            (">=", CompareOp::Gte),
            ("<", CompareOp::Lt),
            ("<=", CompareOp::Lte),
        ];
        for (sym, expected_op) in ops {
            match parse_expr(&format!("x {sym} 1")) {
                Expr::Compare { op, .. } => assert_eq!(op, expected_op, "failed for {sym}"),
                other => panic!("expected Compare for {sym}, got {other:?}"),
            }
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        match parse_expr("a or b and c") {
            Expr::Or(left, right) => {
                assert_eq!(left, name("a"));
                assert!(matches!(*right, Expr::And(_, _)));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn keywords_need_a_word_boundary() {
        assert_eq!(parse_expr("notes"), Expr::Name("notes".into()));
        assert_eq!(parse_expr("android"), Expr::Name("android".into()));
        assert!(matches!(parse_expr("not x"), Expr::Not(_)));
        assert!(matches!(parse_expr("a AND b"), Expr::And(_, _)));
    }

    #[test]
    fn parse_parenthesized_grouping() {
        assert!(matches!(parse_expr("(a or b) and c"), Expr::And(_, _)));
    }

    #[test]
    fn dotted_names() {
        assert_eq!(parse_expr("rec.fname"), Expr::Name("rec.fname".into()));
    }

    #[test]
    fn parse_function_calls() {
        assert_eq!(
            parse_expr("replace(_g1, \"a\", 'b')"),
            Expr::Call {
                function: Function::Replace,
                args: vec![
                    Expr::Name("_g1".into()),
                    Expr::Literal(Value::from("a")),
                    Expr::Literal(Value::from("b")),
                ],
            }
        );
        assert_eq!(
            parse_expr("line ( )"),
            Expr::Call {
                function: Function::Line,
                args: vec![],
            }
        );
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = full_expr.parse("system(\"rm\")").unwrap_err();
        assert!(err.to_string().contains("a known function name"), "{err}");
    }

    #[test]
    fn reserved_words_are_not_names() {
        assert!(full_expr.parse("and").is_err());
        assert!(full_expr.parse("x or").is_err());
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(full_expr.parse("\"open").is_err());
    }

    #[test]
    fn parse_assignment() {
        assert_eq!(
            parse_command("message = \"Hello \" + _g1   # greet"),
            Command::Assign {
                key: "message".into(),
                expr: Expr::Arith {
                    op: ArithOp::Add,
                    lhs: lit("Hello "),
                    rhs: name("_g1"),
                },
                source: "\"Hello \" + _g1".into(),
            }
        );
    }

    #[test]
    fn assignment_without_spaces() {
        match parse_command("from=_g1") {
            Command::Assign { key, source, .. } => {
                assert_eq!(key, "from");
                assert_eq!(source, "_g1");
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn double_equals_is_not_an_assignment() {
        assert!(command.parse("count == 1").is_err());
    }

    #[test]
    fn parse_flush_and_exit() {
        assert_eq!(parse_command("flush"), Command::Flush);
        assert_eq!(parse_command("exit  # done"), Command::Exit);
        assert!(command.parse("flushed").is_err());
        assert!(command.parse("flush now").is_err());
    }

    #[test]
    fn keywords_can_still_be_assigned() {
        assert!(matches!(
            parse_command("flush = 1"),
            Command::Assign { key, .. } if key == "flush"
        ));
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("clear"), Command::Clear(None));
        assert_eq!(
            parse_command("clear message patch"),
            Command::Clear(Some(vec!["message".into(), "patch".into()]))
        );
        assert!(command.parse("clear a-b").is_err());
    }

    #[test]
    fn parse_eval() {
        match parse_command("eval incr(\"count\")") {
            Command::Eval { expr, source } => {
                assert_eq!(source, "incr(\"count\")");
                assert!(matches!(expr, Expr::Call { function: Function::Incr, .. }));
            }
            other => panic!("expected Eval, got {other:?}"),
        }
        assert!(command.parse("eval").is_err());
    }

    #[test]
    fn garbage_is_not_a_command() {
        assert!(command.parse("print hello").is_err());
        assert!(command.parse("= 3").is_err());
    }

    #[test]
    fn nesting_depth_counts_groups_and_operators() {
        assert_eq!(nesting_depth("x"), 0);
        assert_eq!(nesting_depth("((1))"), 2);
        assert_eq!(nesting_depth("-(-1)"), 3);
        assert_eq!(nesting_depth("not not a"), 2);
        assert_eq!(nesting_depth("upper(_g1) + 1"), 1);
        assert_eq!(nesting_depth("\"((((\" + 'a\\'' # (((("), 1);
        assert_eq!(nesting_depth("notice and android"), 1);
    }

    #[test]
    fn unbalanced_text_does_not_confuse_the_count() {
        assert_eq!(nesting_depth(")))(("), 2);
        assert_eq!(nesting_depth("\"unterminated ((("), 0);
    }
}
