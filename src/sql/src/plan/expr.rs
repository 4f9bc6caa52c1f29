// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Type checking and evaluation of the constant expressions DDL
//! encounters: partition boundary values, column defaults, and check
//! constraints (after their column references have been substituted
//! with typed dummies).
//!
//! This is deliberately not a general expression engine; anything a
//! query planner would need lives upstream.

use gr_repr::{Datum, ScalarType, SemanticType};
use ordered_float::OrderedFloat;

use crate::ast::Expr;
use crate::plan::PlanError;

const AGGREGATES: &[&str] = &[
    "array_agg",
    "avg",
    "count",
    "max",
    "min",
    "stddev",
    "sum",
    "variance",
];

/// Verifies that the constant `expr` can produce a value of `desired`.
pub fn type_check(expr: &Expr, desired: &ScalarType) -> Result<(), PlanError> {
    use crate::ast::Value;
    match expr {
        Expr::Nested(inner) => type_check(inner, desired),
        Expr::Value(Value::Null) => Ok(()),
        Expr::Value(Value::Boolean(_)) => expect(desired, SemanticType::Bool, "bool"),
        Expr::Value(Value::Number(n)) => match desired.semantic() {
            SemanticType::Int => {
                if n.parse::<i64>().is_ok() {
                    Ok(())
                } else {
                    Err(parse_err(n, desired))
                }
            }
            SemanticType::Float => {
                if n.parse::<f64>().is_ok() {
                    Ok(())
                } else {
                    Err(parse_err(n, desired))
                }
            }
            _ => Err(type_err("numeric literal", desired)),
        },
        Expr::Value(Value::String(_)) => match desired.semantic() {
            SemanticType::String | SemanticType::Bytes => Ok(()),
            _ => Err(type_err("string literal", desired)),
        },
        Expr::Op { op, expr1, expr2 } if op == "-" && expr2.is_none() => {
            match desired.semantic() {
                SemanticType::Int | SemanticType::Float => type_check(expr1, desired),
                _ => Err(type_err("numeric expression", desired)),
            }
        }
        Expr::TypedDummy { typ } => {
            if typ.semantic() == desired.semantic() {
                Ok(())
            } else {
                Err(type_err(&typ.to_string(), desired))
            }
        }
        Expr::Column(name) => Err(PlanError::Unstructured(format!(
            "column reference \"{}\" is not allowed in a constant expression",
            name
        ))),
        Expr::Parameter(n) => Err(PlanError::Unstructured(format!(
            "placeholder ${} is not allowed in a constant expression",
            n
        ))),
        _ => Err(PlanError::Unstructured(format!(
            "unsupported constant expression: {}",
            expr
        ))),
    }
}

/// Evaluates the constant `expr` to a datum of `desired`. Callers must
/// have run [`type_check`] first; failures past that point are bugs in
/// the literal handling, not user errors.
pub fn eval_constant(expr: &Expr, desired: &ScalarType) -> Result<Datum, PlanError> {
    use crate::ast::Value;
    match expr {
        Expr::Nested(inner) => eval_constant(inner, desired),
        Expr::Value(Value::Null) => Ok(Datum::Null),
        Expr::Value(Value::Boolean(b)) => Ok(Datum::from_bool(*b)),
        Expr::Value(Value::Number(n)) => match desired.semantic() {
            SemanticType::Float => {
                let f = n.parse::<f64>().map_err(|_| parse_err(n, desired))?;
                Ok(Datum::Float64(OrderedFloat(f)))
            }
            _ => {
                let i = n.parse::<i64>().map_err(|_| parse_err(n, desired))?;
                Ok(Datum::Int64(i))
            }
        },
        Expr::Value(Value::String(s)) => match desired.semantic() {
            SemanticType::Bytes => Ok(Datum::Bytes(s.clone().into_bytes())),
            _ => Ok(Datum::String(s.clone())),
        },
        Expr::Op { op, expr1, expr2 } if op == "-" && expr2.is_none() => {
            match eval_constant(expr1, desired)? {
                Datum::Int64(i) => Ok(Datum::Int64(-i)),
                Datum::Float64(f) => Ok(Datum::Float64(-f)),
                other => Err(PlanError::Unstructured(format!(
                    "cannot negate {}",
                    other
                ))),
            }
        }
        Expr::TypedDummy { .. } => {
            // The dummy exists only so check constraints type-check;
            // nothing evaluates a check at DDL time.
            unreachable!("TypedDummy cannot be evaluated")
        }
        _ => Err(PlanError::Unstructured(format!(
            "unsupported constant expression: {}",
            expr
        ))),
    }
}

/// Rejects aggregate functions anywhere in `expr`.
pub fn assert_no_aggregation(expr: &Expr, context: &str) -> Result<(), PlanError> {
    match expr {
        Expr::Function { name, args } => {
            if AGGREGATES.contains(&name.as_str().to_lowercase().as_str()) {
                sql_bail!("aggregate functions are not allowed in {}", context);
            }
            for arg in args {
                assert_no_aggregation(arg, context)?;
            }
            Ok(())
        }
        Expr::Nested(inner) => assert_no_aggregation(inner, context),
        Expr::Tuple(exprs) => {
            for e in exprs {
                assert_no_aggregation(e, context)?;
            }
            Ok(())
        }
        Expr::Op { expr1, expr2, .. } => {
            assert_no_aggregation(expr1, context)?;
            if let Some(expr2) = expr2 {
                assert_no_aggregation(expr2, context)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Verifies that `expr` contains no free variables and types as `BOOL`.
/// Run after column references have been replaced by typed dummies.
pub fn sanitize_var_free_expr(expr: &Expr, context: &str) -> Result<(), PlanError> {
    match infer(expr, context)? {
        None | Some(SemanticType::Bool) => Ok(()),
        Some(other) => Err(PlanError::Unstructured(format!(
            "expected {} expression to have type bool, found type {}",
            context, other
        ))),
    }
}

fn infer(expr: &Expr, context: &str) -> Result<Option<SemanticType>, PlanError> {
    use crate::ast::Value;
    match expr {
        Expr::Column(name) => Err(PlanError::Unstructured(format!(
            "variable sub-expression \"{}\" is not allowed in {}",
            name, context
        ))),
        Expr::Parameter(_) => Err(PlanError::Unstructured(format!(
            "placeholders are not allowed in {}",
            context
        ))),
        Expr::Value(Value::Null) => Ok(None),
        Expr::Value(Value::Boolean(_)) => Ok(Some(SemanticType::Bool)),
        Expr::Value(Value::Number(n)) => {
            if n.parse::<i64>().is_ok() {
                Ok(Some(SemanticType::Int))
            } else {
                Ok(Some(SemanticType::Float))
            }
        }
        Expr::Value(Value::String(_)) => Ok(Some(SemanticType::String)),
        Expr::TypedDummy { typ } => Ok(Some(typ.semantic())),
        Expr::Nested(inner) => infer(inner, context),
        Expr::Op { op, expr1, expr2 } => {
            let t1 = infer(expr1, context)?;
            let t2 = match expr2 {
                Some(expr2) => infer(expr2, context)?,
                None => None,
            };
            let op_upper = op.to_uppercase();
            match (op_upper.as_str(), expr2.is_some()) {
                ("=" | "!=" | "<>" | "<" | ">" | "<=" | ">=", true) => {
                    if comparable(t1, t2) {
                        Ok(Some(SemanticType::Bool))
                    } else {
                        Err(incompatible(op, t1, t2))
                    }
                }
                ("AND" | "OR", true) => {
                    for t in [t1, t2].into_iter().flatten() {
                        if t != SemanticType::Bool {
                            return Err(incompatible(op, t1, t2));
                        }
                    }
                    Ok(Some(SemanticType::Bool))
                }
                ("NOT", false) => match t1 {
                    None | Some(SemanticType::Bool) => Ok(Some(SemanticType::Bool)),
                    _ => Err(incompatible(op, t1, None)),
                },
                ("+" | "*" | "/" | "%", true) | ("-", _) => {
                    for t in [t1, t2].into_iter().flatten() {
                        if !numeric(t) {
                            return Err(incompatible(op, t1, t2));
                        }
                    }
                    if t1 == Some(SemanticType::Float) || t2 == Some(SemanticType::Float) {
                        Ok(Some(SemanticType::Float))
                    } else {
                        Ok(Some(SemanticType::Int))
                    }
                }
                _ => Err(PlanError::Unstructured(format!(
                    "unsupported operator: {}",
                    op
                ))),
            }
        }
        Expr::Function { name, .. } => Err(PlanError::Unstructured(format!(
            "unknown function: {}()",
            name
        ))),
        Expr::Default | Expr::MaxValue | Expr::Tuple(_) => Err(PlanError::Unstructured(format!(
            "unexpected expression in {}: {}",
            context, expr
        ))),
    }
}

fn comparable(t1: Option<SemanticType>, t2: Option<SemanticType>) -> bool {
    match (t1, t2) {
        (None, _) | (_, None) => true,
        (Some(a), Some(b)) => a == b || (numeric(a) && numeric(b)),
    }
}

fn numeric(t: SemanticType) -> bool {
    matches!(t, SemanticType::Int | SemanticType::Float)
}

fn incompatible(
    op: &str,
    t1: Option<SemanticType>,
    t2: Option<SemanticType>,
) -> PlanError {
    let name = |t: Option<SemanticType>| match t {
        None => "unknown".to_string(),
        Some(t) => t.to_string(),
    };
    PlanError::Unstructured(format!(
        "incompatible types for {}: {} and {}",
        op,
        name(t1),
        name(t2)
    ))
}

fn expect(desired: &ScalarType, found: SemanticType, what: &str) -> Result<(), PlanError> {
    if desired.semantic() == found {
        Ok(())
    } else {
        Err(type_err(what, desired))
    }
}

fn type_err(found: &str, desired: &ScalarType) -> PlanError {
    PlanError::Unstructured(format!("expected {} expression, found {}", desired, found))
}

fn parse_err(literal: &str, desired: &ScalarType) -> PlanError {
    PlanError::Unstructured(format!(
        "could not parse \"{}\" as type {}",
        literal, desired
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ident, Value};

    fn num(s: &str) -> Expr {
        Expr::Value(Value::Number(s.into()))
    }

    #[test]
    fn numeric_literals_coerce_to_the_desired_type() {
        assert_eq!(
            eval_constant(&num("1"), &ScalarType::Int).unwrap(),
            Datum::Int64(1)
        );
        assert_eq!(
            eval_constant(&num("1"), &ScalarType::Float).unwrap(),
            Datum::Float64(OrderedFloat(1.0))
        );
        assert!(type_check(&num("1.5"), &ScalarType::Int).is_err());
    }

    #[test]
    fn unary_minus_negates() {
        let e = Expr::Op {
            op: "-".into(),
            expr1: Box::new(num("3")),
            expr2: None,
        };
        assert_eq!(
            eval_constant(&e, &ScalarType::Int).unwrap(),
            Datum::Int64(-3)
        );
    }

    #[test]
    fn check_expressions_must_be_bool() {
        let cmp = Expr::Op {
            op: ">".into(),
            expr1: Box::new(Expr::TypedDummy {
                typ: ScalarType::Int,
            }),
            expr2: Some(Box::new(num("0"))),
        };
        sanitize_var_free_expr(&cmp, "CHECK").unwrap();
        assert!(sanitize_var_free_expr(&num("1"), "CHECK").is_err());
    }

    #[test]
    fn free_variables_are_rejected() {
        let e = Expr::Column(Ident::new("a"));
        assert!(sanitize_var_free_expr(&e, "CHECK").is_err());
    }

    #[test]
    fn aggregates_are_rejected() {
        let e = Expr::Function {
            name: Ident::new("count"),
            args: vec![num("1")],
        };
        assert!(assert_no_aggregation(&e, "CHECK expressions").is_err());
    }
}
