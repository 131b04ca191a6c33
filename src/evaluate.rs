use crate::{ArithOp, EvalContext, Expr, ExprError, Function, Value};

pub(crate) fn evaluate(expr: &Expr, ctx: &mut EvalContext<'_>) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => ctx.lookup(name),
        Expr::Neg(inner) => match evaluate(inner, ctx)? {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| ExprError::Overflow { op: "-".into() }),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(ExprError::BadOperand {
                op: "-",
                operand: other.type_name(),
            }),
        },
        Expr::Not(inner) => Ok(Value::Bool(!evaluate(inner, ctx)?.is_truthy())),
        Expr::And(a, b) => {
            let truthy = evaluate(a, ctx)?.is_truthy() && evaluate(b, ctx)?.is_truthy();
            Ok(Value::Bool(truthy))
        }
        Expr::Or(a, b) => {
            let truthy = evaluate(a, ctx)?.is_truthy() || evaluate(b, ctx)?.is_truthy();
            Ok(Value::Bool(truthy))
        }
        Expr::Compare { op, lhs, rhs } => {
            let left = evaluate(lhs, ctx)?;
            let right = evaluate(rhs, ctx)?;
            left.compare(*op, &right)
                .map(Value::Bool)
                .ok_or_else(|| ExprError::TypeMismatch {
                    op: op.to_string(),
                    left: left.type_name(),
                    right: right.type_name(),
                })
        }
        Expr::Arith { op, lhs, rhs } => {
            let left = evaluate(lhs, ctx)?;
            let right = evaluate(rhs, ctx)?;
            arith(*op, &left, &right)
        }
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call(*function, &args, ctx)
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn arith(op: ArithOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let overflow = || ExprError::Overflow { op: op.to_string() };
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                ArithOp::Add => a.checked_add(*b),
                ArithOp::Sub => a.checked_sub(*b),
                ArithOp::Mul => a.checked_mul(*b),
                ArithOp::Div | ArithOp::Rem if *b == 0 => return Err(ExprError::DivisionByZero),
                ArithOp::Div => a.checked_div(*b),
                ArithOp::Rem => a.checked_rem(*b),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = as_float(left);
            let b = as_float(right);
            Ok(Value::Float(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div | ArithOp::Rem if b == 0.0 => return Err(ExprError::DivisionByZero),
                ArithOp::Div => a / b,
                ArithOp::Rem => a % b,
            }))
        }
        (Value::String(a), Value::String(b)) if op == ArithOp::Add => {
            Ok(Value::String(format!("{a}{b}")))
        }
        _ => Err(ExprError::TypeMismatch {
            op: op.to_string(),
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_float(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

fn call(function: Function, args: &[Value], ctx: &mut EvalContext<'_>) -> Result<Value, ExprError> {
    let invalid = |message: String| ExprError::InvalidArgument {
        function: function.name(),
        message,
    };
    let text = |index: usize| string_arg(function, &args[index]);

    match function {
        Function::Int => to_int(&args[0]).map_err(invalid),
        Function::Float => to_float(&args[0]).map_err(invalid),
        Function::Str => Ok(Value::String(args[0].to_text())),
        Function::Len => {
            let len = text(0)?.chars().count();
            Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
        }
        Function::Lower => Ok(Value::String(text(0)?.to_lowercase())),
        Function::Upper => Ok(Value::String(text(0)?.to_uppercase())),
        Function::Strip => Ok(Value::String(text(0)?.trim().to_owned())),
        Function::Replace => Ok(Value::String(text(0)?.replace(text(1)?, text(2)?))),
        Function::Contains => Ok(Value::Bool(text(0)?.contains(text(1)?))),
        Function::StartsWith => Ok(Value::Bool(text(0)?.starts_with(text(1)?))),
        Function::EndsWith => Ok(Value::Bool(text(0)?.ends_with(text(1)?))),
        Function::Default => Ok(match &args[0] {
            Value::Null => args[1].clone(),
            value => value.clone(),
        }),
        Function::Group => {
            let Value::Int(index) = args[0] else {
                return Err(invalid(format!(
                    "expected an int, found {}",
                    args[0].type_name()
                )));
            };
            usize::try_from(index)
                .ok()
                .and_then(|index| ctx.capture().group(index))
                .map(Value::from)
                .ok_or_else(|| invalid(format!("no group {index} in this match")))
        }
        Function::Matched => Ok(Value::from(ctx.capture().text())),
        Function::Line => Ok(Value::from(ctx.position().line)),
        Function::LineNo => Ok(Value::Int(
            i64::try_from(ctx.position().number).unwrap_or(i64::MAX),
        )),
        Function::Source => Ok(Value::from(ctx.position().source)),
        Function::Set => {
            let name = text(0)?.to_owned();
            let value = args[1].clone();
            ctx.shared_globals("set")?.insert(name, value.clone());
            Ok(value)
        }
        Function::Incr => {
            let name = text(0)?.to_owned();
            let step = args.get(1).cloned().unwrap_or(Value::Int(1));
            let globals = ctx.shared_globals("incr")?;
            let current = match globals.get(&name) {
                None | Some(Value::Null) => Value::Int(0),
                Some(value) => value.clone(),
            };
            let next = arith(ArithOp::Add, &current, &step)?;
            globals.insert(name, next.clone());
            Ok(next)
        }
    }
}

fn string_arg(function: Function, value: &Value) -> Result<&str, ExprError> {
    value.as_str().ok_or_else(|| ExprError::InvalidArgument {
        function: function.name(),
        message: format!("expected a string, found {}", value.type_name()),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn to_int(value: &Value) -> Result<Value, String> {
    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(f) if f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
            Ok(Value::Int(f.trunc() as i64))
        }
        Value::String(s) => s
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| format!("cannot convert {value} to int")),
        other => Err(format!("cannot convert {other} to int")),
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_float(value: &Value) -> Result<Value, String> {
    match value {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|_| format!("cannot convert {value} to float")),
        Value::Null => Err("cannot convert null to float".to_owned()),
    }
}
