// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Mutable traversal of the query AST.
//!
//! Only the query fragment of the AST is visitable; the one consumer is
//! view planning, which rewrites every table name in the view's source
//! query to its fully qualified form before the query text is persisted.

use crate::ast::{Cte, Expr, Query, Select, SelectItem, SetExpr, TableFactor, UnresolvedTableName};

/// A mutable visitor over the query AST. Implementations override the
/// methods they care about and delegate the rest to the free `visit_*`
/// walkers.
pub trait VisitMut {
    fn visit_query_mut(&mut self, query: &mut Query) {
        visit_query_mut(self, query);
    }

    fn visit_cte_mut(&mut self, cte: &mut Cte) {
        visit_cte_mut(self, cte);
    }

    fn visit_set_expr_mut(&mut self, set_expr: &mut SetExpr) {
        visit_set_expr_mut(self, set_expr);
    }

    fn visit_select_mut(&mut self, select: &mut Select) {
        visit_select_mut(self, select);
    }

    fn visit_table_factor_mut(&mut self, table_factor: &mut TableFactor) {
        visit_table_factor_mut(self, table_factor);
    }

    fn visit_table_name_mut(&mut self, _table_name: &mut UnresolvedTableName) {}

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        visit_expr_mut(self, expr);
    }
}

pub fn visit_query_mut<V: VisitMut + ?Sized>(visitor: &mut V, query: &mut Query) {
    for cte in &mut query.ctes {
        visitor.visit_cte_mut(cte);
    }
    visitor.visit_set_expr_mut(&mut query.body);
}

pub fn visit_cte_mut<V: VisitMut + ?Sized>(visitor: &mut V, cte: &mut Cte) {
    visitor.visit_query_mut(&mut cte.query);
}

pub fn visit_set_expr_mut<V: VisitMut + ?Sized>(visitor: &mut V, set_expr: &mut SetExpr) {
    match set_expr {
        SetExpr::Select(select) => visitor.visit_select_mut(select),
        SetExpr::Values(rows) => {
            for row in rows {
                for expr in row {
                    visitor.visit_expr_mut(expr);
                }
            }
        }
        SetExpr::Op { left, right, .. } => {
            visitor.visit_set_expr_mut(left);
            visitor.visit_set_expr_mut(right);
        }
    }
}

pub fn visit_select_mut<V: VisitMut + ?Sized>(visitor: &mut V, select: &mut Select) {
    for item in &mut select.projection {
        if let SelectItem::Expr { expr, .. } = item {
            visitor.visit_expr_mut(expr);
        }
    }
    for table_factor in &mut select.from {
        visitor.visit_table_factor_mut(table_factor);
    }
    if let Some(selection) = &mut select.selection {
        visitor.visit_expr_mut(selection);
    }
}

pub fn visit_table_factor_mut<V: VisitMut + ?Sized>(
    visitor: &mut V,
    table_factor: &mut TableFactor,
) {
    match table_factor {
        TableFactor::Table { name, .. } => visitor.visit_table_name_mut(name),
        TableFactor::Derived { subquery, .. } => visitor.visit_query_mut(subquery),
    }
}

pub fn visit_expr_mut<V: VisitMut + ?Sized>(visitor: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Column(_)
        | Expr::Value(_)
        | Expr::Default
        | Expr::MaxValue
        | Expr::Parameter(_)
        | Expr::TypedDummy { .. } => {}
        Expr::Tuple(exprs) => {
            for expr in exprs {
                visitor.visit_expr_mut(expr);
            }
        }
        Expr::Nested(expr) => visitor.visit_expr_mut(expr),
        Expr::Op { expr1, expr2, .. } => {
            visitor.visit_expr_mut(expr1);
            if let Some(expr2) = expr2 {
                visitor.visit_expr_mut(expr2);
            }
        }
        Expr::Function { args, .. } => {
            for arg in args {
                visitor.visit_expr_mut(arg);
            }
        }
    }
}
