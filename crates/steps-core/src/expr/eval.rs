//! Evaluación de un `Expr` sobre un snapshot de contexto.
use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::errors::{ExprError, ExprResult};
use super::parser::{BinaryOp, Expr, Literal};
use crate::context::Context;

/// Evalúa la expresión y exige un resultado booleano.
pub fn evaluate_bool(expr: &Expr, ctx: &Context) -> ExprResult<bool> {
    match evaluate(expr, ctx)? {
        Value::Bool(b) => Ok(b),
        other => Err(ExprError::eval(format!("condition evaluated to {}, expected a boolean", type_name(&other)))),
    }
}

pub fn evaluate(expr: &Expr, ctx: &Context) -> ExprResult<Value> {
    match expr {
        Expr::Literal(lit) => Ok(literal_value(lit)),
        Expr::Path(segments) => lookup(segments, ctx).cloned(),
        Expr::Not(inner) => match evaluate(inner, ctx)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(ExprError::eval(format!("'!' expects a boolean, found {}", type_name(&other)))),
        },
        Expr::Neg(inner) => negate(evaluate(inner, ctx)?),
        Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
            Ok(Value::Bool(as_bool(evaluate(lhs, ctx)?, "&&")? && as_bool(evaluate(rhs, ctx)?, "&&")?))
        }
        Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
            Ok(Value::Bool(as_bool(evaluate(lhs, ctx)?, "||")? || as_bool(evaluate(rhs, ctx)?, "||")?))
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = evaluate(lhs, ctx)?;
            let r = evaluate(rhs, ctx)?;
            compare(*op, &l, &r).map(Value::Bool)
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::from(*n),
        // El parser rechaza floats no finitos.
        Literal::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Literal::Str(s) => Value::String(s.clone()),
    }
}

fn lookup<'c>(segments: &[String], ctx: &'c Context) -> ExprResult<&'c Value> {
    let (head, rest) = segments.split_first()
                               .ok_or_else(|| ExprError::eval("empty field path"))?;
    let mut current = ctx.get(head)
                         .ok_or_else(|| ExprError::eval(format!("unknown field '{head}'")))?;
    for (i, seg) in rest.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(seg),
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|idx| items.get(idx)),
            _ => None,
        };
        current = next.ok_or_else(|| {
                          let walked = segments[..i + 2].join(".");
                          ExprError::eval(format!("unknown field '{walked}'"))
                      })?;
    }
    Ok(current)
}

fn as_bool(value: Value, op: &str) -> ExprResult<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(ExprError::eval(format!("'{op}' expects boolean operands, found {}", type_name(&other)))),
    }
}

fn negate(value: Value) -> ExprResult<Value> {
    let Value::Number(n) = &value else {
        return Err(ExprError::eval(format!("'-' expects a number, found {}", type_name(&value))));
    };
    if let Some(i) = n.as_i64() {
        if let Some(neg) = i.checked_neg() {
            return Ok(Value::from(neg));
        }
    }
    n.as_f64()
     .and_then(|f| Number::from_f64(-f))
     .map(Value::Number)
     .ok_or_else(|| ExprError::eval("numeric overflow"))
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> ExprResult<bool> {
    match op {
        BinaryOp::Eq => equals(l, r),
        BinaryOp::Ne => equals(l, r).map(|eq| !eq),
        BinaryOp::Lt => Ok(ordering(l, r)? == Ordering::Less),
        BinaryOp::Le => Ok(ordering(l, r)? != Ordering::Greater),
        BinaryOp::Gt => Ok(ordering(l, r)? == Ordering::Greater),
        BinaryOp::Ge => Ok(ordering(l, r)? != Ordering::Less),
        BinaryOp::And | BinaryOp::Or => Err(ExprError::eval("logical operator used as comparison")),
    }
}

fn equals(l: &Value, r: &Value) -> ExprResult<bool> {
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => Ok(l.is_null() && r.is_null()),
        (Value::Number(a), Value::Number(b)) => Ok(cmp_numbers(a, b) == Some(Ordering::Equal)),
        (Value::String(a), Value::String(b)) => Ok(a == b),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => Ok(l == r),
        _ => Err(mismatch("==", l, r)),
    }
}

fn ordering(l: &Value, r: &Value) -> ExprResult<Ordering> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => cmp_numbers(a, b).ok_or_else(|| mismatch("<", l, r)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(mismatch("<", l, r)),
    }
}

fn cmp_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn mismatch(op: &str, l: &Value, r: &Value) -> ExprError {
    ExprError::eval(format!("cannot apply '{op}' to {} and {}", type_name(l), type_name(r)))
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::expr::parser::Parser;

    fn ctx() -> Context {
        json!({
            "claim": {
                "amount_approved": 250.5,
                "amount_claimed": 300,
                "status": "open",
                "is_high_risk": true,
                "notes": null,
                "tags": ["a", "b"]
            }
        }).as_object()
          .cloned()
          .unwrap()
    }

    fn eval(src: &str) -> ExprResult<bool> {
        evaluate_bool(&Parser::parse(src)?, &ctx())
    }

    #[test]
    fn numeric_comparisons_mix_int_and_float() {
        assert_eq!(eval("claim.amount_approved > 0.0"), Ok(true));
        assert_eq!(eval("claim.amount_claimed == 300.0"), Ok(true));
        assert_eq!(eval("claim.amount_claimed >= claim.amount_approved"), Ok(true));
        assert_eq!(eval("-claim.amount_claimed < 0"), Ok(true));
    }

    #[test]
    fn null_compares_with_anything() {
        assert_eq!(eval("claim.notes == null"), Ok(true));
        assert_eq!(eval("claim.amount_approved != null"), Ok(true));
        assert_eq!(eval("claim.notes == 0.0"), Ok(false));
    }

    #[test]
    fn ordering_against_null_is_an_error() {
        assert!(matches!(eval("claim.notes > 0"), Err(ExprError::Evaluation(_))));
    }

    #[test]
    fn short_circuit_skips_missing_field() {
        assert_eq!(eval("claim.is_high_risk || claim.missing == 1"), Ok(true));
        assert_eq!(eval("!claim.is_high_risk && claim.missing == 1"), Ok(false));
    }

    #[test]
    fn missing_field_is_evaluation_error() {
        let err = eval("claim.missing == 1").unwrap_err();
        assert_eq!(err, ExprError::Evaluation("unknown field 'claim.missing'".into()));
        assert!(matches!(eval("other == 1"), Err(ExprError::Evaluation(_))));
    }

    #[test]
    fn type_mismatch_and_non_boolean_result() {
        assert!(matches!(eval("claim.status == 1"), Err(ExprError::Evaluation(_))));
        assert!(matches!(eval("claim.status && true"), Err(ExprError::Evaluation(_))));
        assert!(matches!(eval("claim.amount_claimed"), Err(ExprError::Evaluation(_))));
    }

    #[test]
    fn strings_and_array_index() {
        assert_eq!(eval("claim.status == \"open\" && claim.tags.1 == 'b'"), Ok(true));
        assert_eq!(eval("claim.status < 'zzz'"), Ok(true));
    }
}
