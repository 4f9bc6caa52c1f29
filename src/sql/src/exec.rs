// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The execution configuration and the interfaces of the DDL core's
//! external collaborators.
//!
//! Everything the core consumes but does not implement is a trait here:
//! query planning for `SELECT` sources, the asynchronous schema changer,
//! password hashing, and the internal executor the user catalog issues
//! parameterized SQL through.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use gr_catalog::descriptor::{TableDescriptor, TableReference};
use gr_catalog::kv::{IdGenerator, Transaction};
use gr_catalog::{DescId, MutationId};
use gr_repr::{Datum, ScalarType};

use crate::ast::Query;
use crate::plan::PlanError;
use crate::session::Session;

/// One column of a planned query's result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResultColumn {
    pub name: String,
    pub typ: ScalarType,
}

/// One relation a planned query reads, with the back-reference entries
/// to install on it. The `id` of each entry is filled in by view
/// creation once the view's own id is known.
#[derive(Clone, Debug)]
pub struct PlanDependency {
    pub desc: TableDescriptor,
    pub deps: Vec<TableReference>,
}

/// The relations a planned query reads, keyed by descriptor id so a
/// relation read twice is recorded once.
pub type PlanDependencies = BTreeMap<DescId, PlanDependency>;

/// A planned `SELECT` source: its result columns and the relations it
/// reads.
#[derive(Clone, Debug)]
pub struct PlannedQuery {
    pub columns: Vec<ResultColumn>,
    pub dependencies: PlanDependencies,
}

/// The external query planner, used by `CREATE TABLE ... AS` (planned
/// eagerly so `EXPLAIN` has something to render) and `CREATE VIEW`.
pub trait QueryPlanner {
    fn plan_query(
        &self,
        txn: &mut dyn Transaction,
        session: &Session,
        query: &Query,
    ) -> Result<PlannedQuery, PlanError>;
}

/// The asynchronous schema changer's doorbell. Best-effort: the DDL has
/// already committed its intent, so delivery failures are logged, never
/// propagated.
pub trait SchemaChangeHook {
    fn notify_schema_change(&self, desc_id: DescId, mutation_id: MutationId)
        -> Result<(), anyhow::Error>;
}

/// Password hashing, performed outside the core.
pub trait PasswordHasher {
    fn hash_password(&self, password: &str) -> Result<Vec<u8>, anyhow::Error>;
}

/// An error from the internal executor.
#[derive(Clone, Debug)]
pub enum ExecError {
    /// The statement violated a uniqueness constraint.
    UniquenessViolation,
    Other(String),
}

impl ExecError {
    pub fn is_uniqueness_constraint_violation(&self) -> bool {
        matches!(self, ExecError::UniquenessViolation)
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecError::UniquenessViolation => f.write_str("duplicate key value"),
            ExecError::Other(msg) => f.write_str(msg),
        }
    }
}

impl Error for ExecError {}

/// Executes parameterized SQL with positional placeholders inside the
/// surrounding transaction, returning the number of rows affected. Used
/// only by the user catalog.
pub trait InternalExecutor {
    fn execute(
        &self,
        txn: &mut dyn Transaction,
        stmt: &str,
        params: &[Datum],
    ) -> Result<u64, ExecError>;
}

/// The per-process execution configuration handed to the planner.
pub struct ExecConfig<'a> {
    /// This node's id, recorded as the reporter of event-log entries.
    pub node_id: u32,
    pub id_generator: &'a dyn IdGenerator,
    pub query_planner: &'a dyn QueryPlanner,
    pub schema_change_hook: &'a dyn SchemaChangeHook,
    pub password_hasher: &'a dyn PasswordHasher,
    pub internal_executor: &'a dyn InternalExecutor,
}
