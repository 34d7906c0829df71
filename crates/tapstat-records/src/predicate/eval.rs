use std::{cmp::Ordering, collections::HashMap};

use chrono::NaiveDateTime;

use super::parser::{BinaryOp, Expr, Literal};
use crate::{
    column::ColumnView,
    value::{Value, parse_time},
};

/// Intermediate result of evaluating an expression on one row.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar<'a> {
    Missing,
    Number(f64),
    Bool(bool),
    Text(&'a str),
    Time(NaiveDateTime),
}

impl<'a> Scalar<'a> {
    fn from_value(value: &'a Value) -> Self {
        match value {
            Value::Missing => Self::Missing,
            Value::Time(t) => Self::Time(*t),
            Value::Text(s) => Self::Text(s),
            Value::Int(_) | Value::Float(_) => Self::number(value.to_f64()),
        }
    }

    fn number(n: f64) -> Self {
        if n.is_nan() {
            Self::Missing
        } else {
            Self::Number(n)
        }
    }

    fn as_number(self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n),
            Self::Bool(b) => Some(f64::from(u8::from(b))),
            _ => None,
        }
    }

    fn kind(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::Text(_) => "text",
            Self::Time(_) => "time",
        }
    }

    fn truthy(self) -> Result<bool, String> {
        match self {
            Self::Missing => Ok(false),
            Self::Bool(b) => Ok(b),
            Self::Number(n) => Ok(n != 0.0),
            Self::Text(_) | Self::Time(_) => {
                Err(format!("{} value used as a condition", self.kind()))
            }
        }
    }
}

/// Columns referenced by an expression, resolved once per evaluation.
pub(crate) type Columns<'a> = HashMap<&'a str, ColumnView<'a>>;

/// Evaluates `expr` on every row `0..len` and returns the boolean mask.
pub(crate) fn mask(expr: &Expr, columns: &Columns<'_>, len: usize) -> Result<Vec<bool>, String> {
    (0..len)
        .map(|row| eval(expr, columns, row)?.truthy())
        .collect()
}

fn eval<'a>(expr: &'a Expr, columns: &'a Columns<'_>, row: usize) -> Result<Scalar<'a>, String> {
    match expr {
        Expr::Literal(Literal::Number(n)) => Ok(Scalar::number(*n)),
        Expr::Literal(Literal::Bool(b)) => Ok(Scalar::Bool(*b)),
        Expr::Literal(Literal::Text(s)) => Ok(Scalar::Text(s)),
        Expr::Column(name) => columns
            .get(name.as_str())
            .map(|view| Scalar::from_value(view.get(row)))
            .ok_or_else(|| format!("column `{name}` was not resolved")),
        Expr::Not(inner) => Ok(Scalar::Bool(!eval(inner, columns, row)?.truthy()?)),
        Expr::Neg(inner) => match eval(inner, columns, row)? {
            Scalar::Missing => Ok(Scalar::Missing),
            value => value
                .as_number()
                .map(|n| Scalar::number(-n))
                .ok_or_else(|| format!("cannot negate a {} value", value.kind())),
        },
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, columns, row)?;
            let rhs = eval(rhs, columns, row)?;
            binary(*op, lhs, rhs)
        }
    }
}

fn binary<'a>(op: BinaryOp, lhs: Scalar<'a>, rhs: Scalar<'a>) -> Result<Scalar<'a>, String> {
    match op {
        BinaryOp::Or => Ok(Scalar::Bool(lhs.truthy()? || rhs.truthy()?)),
        BinaryOp::And => Ok(Scalar::Bool(lhs.truthy()? && rhs.truthy()?)),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, lhs, rhs),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            compare(op, lhs, rhs).map(Scalar::Bool)
        }
    }
}

fn arithmetic<'a>(op: BinaryOp, lhs: Scalar<'a>, rhs: Scalar<'a>) -> Result<Scalar<'a>, String> {
    if lhs == Scalar::Missing || rhs == Scalar::Missing {
        return Ok(Scalar::Missing);
    }
    let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
        return Err(format!(
            "cannot apply `{}` to {} and {} values",
            op.symbol(),
            lhs.kind(),
            rhs.kind()
        ));
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ => a / b,
    };
    Ok(Scalar::number(result))
}

fn compare(op: BinaryOp, lhs: Scalar<'_>, rhs: Scalar<'_>) -> Result<bool, String> {
    if lhs == Scalar::Missing || rhs == Scalar::Missing {
        return Ok(op == BinaryOp::Ne);
    }
    let ordering = match (lhs, rhs) {
        (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
        (Scalar::Time(a), Scalar::Time(b)) => Some(a.cmp(&b)),
        (Scalar::Time(a), Scalar::Text(b)) => Some(a.cmp(&time_literal(b)?)),
        (Scalar::Text(a), Scalar::Time(b)) => Some(time_literal(a)?.cmp(&b)),
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    let Some(ordering) = ordering else {
        return match op {
            BinaryOp::Eq => Ok(false),
            BinaryOp::Ne => Ok(true),
            _ => Err(format!(
                "cannot compare {} and {} values with `{}`",
                lhs.kind(),
                rhs.kind(),
                op.symbol()
            )),
        };
    };
    Ok(match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn time_literal(raw: &str) -> Result<NaiveDateTime, String> {
    parse_time(raw).ok_or_else(|| format!("'{raw}' is not a timestamp"))
}
