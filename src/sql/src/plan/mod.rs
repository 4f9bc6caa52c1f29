// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Plan nodes for DDL statements.
//!
//! Planning validates a statement against the catalog and loads the
//! descriptors execution will need; execution then runs inside the
//! session's transaction. Each DDL is one variant of [`Plan`]. The node
//! surface mirrors the executor's row-at-a-time protocol: `start` does
//! all the work, `next` is a no-op for every DDL, `values` yields no
//! rows, and the user-catalog nodes additionally report a fast-path row
//! count.

use gr_catalog::descriptor::{DatabaseDescriptor, TableDescriptor};
use gr_repr::Datum;

use crate::ast::{
    AlterUserSetPasswordStatement, CreateDatabaseStatement, CreateIndexStatement,
    CreateSequenceStatement, CreateTableStatement, CreateUserStatement, CreateViewStatement, Expr,
};
use crate::exec::{PlanDependencies, PlannedQuery, ResultColumn};
use crate::names::TableName;

mod error;
mod statement;

pub mod expr;

pub use error::PlanError;
pub use statement::Planner;

/// A planned DDL statement.
#[derive(Debug)]
pub enum Plan {
    CreateDatabase(CreateDatabaseNode),
    CreateTable(CreateTableNode),
    CreateView(CreateViewNode),
    CreateSequence(CreateSequenceNode),
    CreateIndex(CreateIndexNode),
    CreateUser(CreateUserNode),
    AlterUserSetPassword(AlterUserSetPasswordNode),
}

impl Plan {
    /// Advances the node. DDL produces no rows, so this is always
    /// immediately exhausted.
    pub fn next(&mut self) -> Result<bool, PlanError> {
        Ok(false)
    }

    /// The current row. DDL has none.
    pub fn values(&self) -> Vec<Datum> {
        Vec::new()
    }

    /// Releases any resources held by the node.
    pub fn close(&mut self) {
        if let Plan::CreateTable(node) = self {
            node.source = None;
        }
    }

    /// The affected-row count for statements that report one without
    /// producing rows.
    pub fn fast_path_results(&self) -> Option<u64> {
        match self {
            Plan::CreateUser(node) => Some(node.rows_affected),
            Plan::AlterUserSetPassword(node) => Some(node.rows_affected),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct CreateDatabaseNode {
    pub stmt: CreateDatabaseStatement,
}

#[derive(Debug)]
pub struct CreateTableNode {
    pub stmt: CreateTableStatement,
    pub table_name: TableName,
    pub db_desc: DatabaseDescriptor,
    /// The eagerly planned `AS` source, so `EXPLAIN` can render it.
    pub source: Option<PlannedQuery>,
    /// Rows inserted by the `AS` form. Populating the table is DML and
    /// happens outside this core, so this stays zero here.
    pub count: u64,
}

#[derive(Debug)]
pub struct CreateViewNode {
    pub stmt: CreateViewStatement,
    pub view_name: TableName,
    pub db_desc: DatabaseDescriptor,
    pub source_columns: Vec<ResultColumn>,
    /// The relations the view's query reads, collected while the query
    /// was analyzed.
    pub plan_deps: PlanDependencies,
}

#[derive(Debug)]
pub struct CreateSequenceNode {
    pub stmt: CreateSequenceStatement,
    pub seq_name: TableName,
    pub db_desc: DatabaseDescriptor,
}

#[derive(Debug)]
pub struct CreateIndexNode {
    pub stmt: CreateIndexStatement,
    pub table_name: TableName,
    pub table_desc: TableDescriptor,
}

/// The deferred name and password of a `CREATE USER` / `ALTER USER`,
/// resolved (and the password hashed) at execution time.
#[derive(Debug)]
pub struct UserAuthInfo {
    pub name: Expr,
    pub password: Option<Expr>,
}

#[derive(Debug)]
pub struct CreateUserNode {
    pub stmt: CreateUserStatement,
    pub user_auth: UserAuthInfo,
    pub if_not_exists: bool,
    pub rows_affected: u64,
}

#[derive(Debug)]
pub struct AlterUserSetPasswordNode {
    pub stmt: AlterUserSetPasswordStatement,
    pub user_auth: UserAuthInfo,
    pub if_exists: bool,
    pub rows_affected: u64,
}
