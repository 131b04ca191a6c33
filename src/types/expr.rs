use std::fmt;

use super::Value;

/// Comparison operators supported in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Arithmetic operators. `Add` doubles as string concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// The closed set of functions callable from rule expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Int,
    Float,
    Str,
    Len,
    Lower,
    Upper,
    Strip,
    Replace,
    Contains,
    StartsWith,
    EndsWith,
    Default,
    Group,
    Matched,
    Line,
    LineNo,
    Source,
    Set,
    Incr,
}

impl Function {
    /// Resolve a function by the name used in rule text.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" => Function::Int,
            "float" => Function::Float,
            "str" => Function::Str,
            "len" => Function::Len,
            "lower" => Function::Lower,
            "upper" => Function::Upper,
            "strip" => Function::Strip,
            "replace" => Function::Replace,
            "contains" => Function::Contains,
            "starts_with" => Function::StartsWith,
            "ends_with" => Function::EndsWith,
            "default" => Function::Default,
            "group" => Function::Group,
            "matched" => Function::Matched,
            "line" => Function::Line,
            "lineno" => Function::LineNo,
            "source" => Function::Source,
            "set" => Function::Set,
            "incr" => Function::Incr,
            _ => return None,
        })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Function::Int => "int",
            Function::Float => "float",
            Function::Str => "str",
            Function::Len => "len",
            Function::Lower => "lower",
            Function::Upper => "upper",
            Function::Strip => "strip",
            Function::Replace => "replace",
            Function::Contains => "contains",
            Function::StartsWith => "starts_with",
            Function::EndsWith => "ends_with",
            Function::Default => "default",
            Function::Group => "group",
            Function::Matched => "matched",
            Function::Line => "line",
            Function::LineNo => "lineno",
            Function::Source => "source",
            Function::Set => "set",
            Function::Incr => "incr",
        }
    }

    /// Inclusive range of accepted argument counts.
    #[must_use]
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::Matched | Function::Line | Function::LineNo | Function::Source => (0, 0),
            Function::Int
            | Function::Float
            | Function::Str
            | Function::Len
            | Function::Lower
            | Function::Upper
            | Function::Strip
            | Function::Group => (1, 1),
            Function::Contains
            | Function::StartsWith
            | Function::EndsWith
            | Function::Default
            | Function::Set => (2, 2),
            Function::Incr => (1, 2),
            Function::Replace => (3, 3),
        }
    }

    /// Functions that write to the shared global bindings. Only `eval`
    /// commands may call them.
    #[must_use]
    pub fn mutates_globals(self) -> bool {
        matches!(self, Function::Set | Function::Incr)
    }
}

/// Expression AST produced by the rule-text parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Visit every function call in this expression tree, outermost first.
    pub fn for_each_call(&self, f: &mut impl FnMut(Function, usize)) {
        match self {
            Expr::Literal(_) | Expr::Name(_) => {}
            Expr::Neg(inner) | Expr::Not(inner) => inner.for_each_call(f),
            Expr::Arith { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => {
                lhs.for_each_call(f);
                rhs.for_each_call(f);
            }
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.for_each_call(f);
                b.for_each_call(f);
            }
            Expr::Call { function, args } => {
                f(*function, args.len());
                for arg in args {
                    arg.for_each_call(f);
                }
            }
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
            ArithOp::Rem => write!(f, "%"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Name(name) => write!(f, "{name}"),
            Expr::Neg(inner) => write!(f, "(-{inner})"),
            Expr::Not(inner) => write!(f, "(not {inner})"),
            Expr::Arith { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::Compare { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::And(a, b) => write!(f, "({a} and {b})"),
            Expr::Or(a, b) => write!(f, "({a} or {b})"),
            Expr::Call { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}
