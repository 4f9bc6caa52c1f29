// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Test scaffolding: minimal implementations of the external
//! collaborators (query planner, schema-change hook, password hasher,
//! internal executor) and a harness that runs statements end to end
//! against an in-memory store.
//!
//! These are deliberately simple; the production counterparts live in
//! the query planning and job-management layers.

use std::sync::Mutex;

use gr_catalog::descriptor::{DatabaseDescriptor, TableDescriptor, TableReference};
use gr_catalog::jobs::JobRecord;
use gr_catalog::keys;
use gr_catalog::kv::{KvError, MemStore, Transaction};
use gr_catalog::store;
use gr_catalog::system;
use gr_catalog::{DescId, IndexId, MutationId};
use gr_repr::{Datum, ScalarType};

use crate::ast::{Ident, Query, SelectItem, SetExpr, Statement, TableFactor, Value};
use crate::exec::{
    ExecConfig, ExecError, InternalExecutor, PasswordHasher, PlanDependencies, PlanDependency,
    PlannedQuery, QueryPlanner, ResultColumn, SchemaChangeHook,
};
use crate::names;
use crate::plan::{Plan, PlanError, Planner};
use crate::session::Session;

/// A query planner that resolves the `FROM` relations of a query and
/// projects their columns. It covers what DDL tests need: wildcards,
/// column references, literals, and CTE shadowing.
pub struct BasicQueryPlanner;

impl QueryPlanner for BasicQueryPlanner {
    fn plan_query(
        &self,
        txn: &mut dyn Transaction,
        session: &Session,
        query: &Query,
    ) -> Result<PlannedQuery, PlanError> {
        let mut ctes = Vec::new();
        plan_query_inner(txn, session, query, &mut ctes)
    }
}

fn plan_query_inner(
    txn: &mut dyn Transaction,
    session: &Session,
    query: &Query,
    ctes: &mut Vec<Ident>,
) -> Result<PlannedQuery, PlanError> {
    let n = ctes.len();
    for cte in &query.ctes {
        ctes.push(cte.alias.clone());
    }
    let planned = plan_set_expr(txn, session, &query.body, ctes);
    ctes.truncate(n);
    planned
}

fn plan_set_expr(
    txn: &mut dyn Transaction,
    session: &Session,
    body: &SetExpr,
    ctes: &mut Vec<Ident>,
) -> Result<PlannedQuery, PlanError> {
    match body {
        SetExpr::Op { left, .. } => plan_set_expr(txn, session, left, ctes),
        SetExpr::Values(rows) => {
            let row = rows
                .first()
                .ok_or_else(|| PlanError::Syntax("VALUES lists must not be empty".into()))?;
            let columns = row
                .iter()
                .enumerate()
                .map(|(i, expr)| ResultColumn {
                    name: format!("column{}", i + 1),
                    typ: literal_type(expr),
                })
                .collect();
            Ok(PlannedQuery {
                columns,
                dependencies: PlanDependencies::new(),
            })
        }
        SetExpr::Select(select) => {
            let mut tables: Vec<TableDescriptor> = Vec::new();
            let mut dependencies = PlanDependencies::new();
            for factor in &select.from {
                match factor {
                    TableFactor::Table { name, .. } => {
                        if let [ident] = name.0.as_slice() {
                            if ctes.contains(ident) {
                                continue;
                            }
                        }
                        let table_name = names::normalize_table_name(name, &session.database)?;
                        let desc = store::must_get_table_desc(
                            txn,
                            &table_name.database,
                            &table_name.table,
                            false,
                        )?;
                        dependencies
                            .entry(desc.id)
                            .or_insert_with(|| PlanDependency {
                                desc: desc.clone(),
                                deps: vec![TableReference {
                                    // Filled in with the depending
                                    // relation's id once it exists.
                                    id: DescId(0),
                                    index_id: IndexId(0),
                                    column_ids: desc
                                        .columns
                                        .iter()
                                        .filter(|c| !c.hidden)
                                        .map(|c| c.id)
                                        .collect(),
                                }],
                            });
                        tables.push(desc);
                    }
                    TableFactor::Derived { subquery, .. } => {
                        let inner = plan_query_inner(txn, session, subquery, ctes)?;
                        dependencies.extend(inner.dependencies);
                    }
                }
            }

            let mut columns = Vec::new();
            for item in &select.projection {
                match item {
                    SelectItem::Wildcard => {
                        for table in &tables {
                            for col in table.columns.iter().filter(|c| !c.hidden) {
                                columns.push(ResultColumn {
                                    name: col.name.clone(),
                                    typ: col.typ.clone(),
                                });
                            }
                        }
                    }
                    SelectItem::Expr { expr, alias } => {
                        let (name, typ) = match expr {
                            crate::ast::Expr::Column(ident) => {
                                let col_name = crate::normalize::ident(ident);
                                let col = tables
                                    .iter()
                                    .find_map(|t| t.find_column_by_name(&col_name))
                                    .ok_or_else(|| {
                                        PlanError::Unstructured(format!(
                                            "column \"{}\" does not exist",
                                            col_name
                                        ))
                                    })?;
                                (col.name.clone(), col.typ.clone())
                            }
                            other => ("?column?".to_string(), literal_type(other)),
                        };
                        let name = match alias {
                            Some(alias) => crate::normalize::ident(alias),
                            None => name,
                        };
                        columns.push(ResultColumn { name, typ });
                    }
                }
            }
            Ok(PlannedQuery {
                columns,
                dependencies,
            })
        }
    }
}

fn literal_type(expr: &crate::ast::Expr) -> ScalarType {
    match expr {
        crate::ast::Expr::Value(Value::Number(n)) if n.parse::<i64>().is_ok() => ScalarType::Int,
        crate::ast::Expr::Value(Value::Number(_)) => ScalarType::Float,
        crate::ast::Expr::Value(Value::Boolean(_)) => ScalarType::Bool,
        _ => ScalarType::String { max_length: None },
    }
}

/// Records every schema-change notification instead of waking a worker.
#[derive(Debug, Default)]
pub struct RecordingSchemaChangeHook {
    notifications: Mutex<Vec<(DescId, MutationId)>>,
}

impl RecordingSchemaChangeHook {
    /// Drains and returns the notifications recorded so far.
    pub fn take(&self) -> Vec<(DescId, MutationId)> {
        std::mem::take(&mut self.notifications.lock().expect("poisoned"))
    }
}

impl SchemaChangeHook for RecordingSchemaChangeHook {
    fn notify_schema_change(
        &self,
        desc_id: DescId,
        mutation_id: MutationId,
    ) -> Result<(), anyhow::Error> {
        self.notifications
            .lock()
            .expect("poisoned")
            .push((desc_id, mutation_id));
        Ok(())
    }
}

/// A stand-in for the external password hashing service.
pub struct TestPasswordHasher;

impl PasswordHasher for TestPasswordHasher {
    fn hash_password(&self, password: &str) -> Result<Vec<u8>, anyhow::Error> {
        Ok(format!("hashed:{}", password).into_bytes())
    }
}

/// An internal executor that understands exactly the two statements the
/// user catalog issues, backed by the users table's row key space.
pub struct UsersTableExecutor;

const NO_PASSWORD: u8 = 0;
const HAS_PASSWORD: u8 = 1;

fn users_row_value(password: &Datum) -> Result<Vec<u8>, ExecError> {
    match password {
        Datum::Null => Ok(vec![NO_PASSWORD]),
        Datum::Bytes(hash) => {
            let mut value = Vec::with_capacity(1 + hash.len());
            value.push(HAS_PASSWORD);
            value.extend_from_slice(hash);
            Ok(value)
        }
        other => Err(ExecError::Other(format!(
            "unexpected password parameter: {}",
            other
        ))),
    }
}

impl InternalExecutor for UsersTableExecutor {
    fn execute(
        &self,
        txn: &mut dyn Transaction,
        stmt: &str,
        params: &[Datum],
    ) -> Result<u64, ExecError> {
        let (username, password) = match params {
            [Datum::String(username), password] => (username, password),
            _ => {
                return Err(ExecError::Other(format!(
                    "unexpected parameters for {}",
                    stmt
                )))
            }
        };
        let key = keys::table_row_key(keys::USERS_TABLE_ID, username.as_bytes());
        let value = users_row_value(password)?;
        if stmt.starts_with("INSERT INTO system.users") {
            match txn.cput(&key, value, None) {
                Ok(()) => Ok(1),
                Err(KvError::ConditionFailed { .. }) => Err(ExecError::UniquenessViolation),
                Err(err) => Err(ExecError::Other(err.to_string())),
            }
        } else if stmt.starts_with("UPDATE system.users") {
            match txn.get(&key).map_err(|e| ExecError::Other(e.to_string()))? {
                None => Ok(0),
                Some(_) => {
                    txn.put(&key, value)
                        .map_err(|e| ExecError::Other(e.to_string()))?;
                    Ok(1)
                }
            }
        } else {
            Err(ExecError::Other(format!("unsupported statement: {}", stmt)))
        }
    }
}

/// Runs statements end to end against a bootstrapped in-memory cluster:
/// plan, start, commit; on error the transaction is dropped and nothing
/// survives.
pub struct TestHarness {
    pub store: MemStore,
    pub session: Session,
    pub schema_changes: RecordingSchemaChangeHook,
    query_planner: BasicQueryPlanner,
    password_hasher: TestPasswordHasher,
    internal_executor: UsersTableExecutor,
}

impl TestHarness {
    /// A fresh single-node cluster with the system tables installed and
    /// a root session.
    pub fn new() -> TestHarness {
        let store = MemStore::new();
        let mut txn = store.begin();
        system::bootstrap(&mut txn).expect("bootstrap on empty store");
        txn.commit().expect("bootstrap commit");
        TestHarness {
            store,
            session: Session::new("root", ""),
            schema_changes: RecordingSchemaChangeHook::default(),
            query_planner: BasicQueryPlanner,
            password_hasher: TestPasswordHasher,
            internal_executor: UsersTableExecutor,
        }
    }

    pub fn set_database(&mut self, database: &str) {
        self.session.database = database.into();
    }

    pub fn set_user(&mut self, user: &str) {
        self.session.user = user.into();
    }

    /// Plans and executes one statement in its own transaction,
    /// returning the finished plan node.
    pub fn run(&mut self, stmt: Statement) -> Result<Plan, PlanError> {
        let mut txn = self.store.begin();
        let config = ExecConfig {
            node_id: 1,
            id_generator: &self.store,
            query_planner: &self.query_planner,
            schema_change_hook: &self.schema_changes,
            password_hasher: &self.password_hasher,
            internal_executor: &self.internal_executor,
        };
        let mut planner = Planner::new(&mut txn, &mut self.session, &config);
        let mut plan = planner.plan(stmt)?;
        planner.start(&mut plan)?;
        txn.commit()?;
        Ok(plan)
    }

    /// Reads a committed database descriptor.
    pub fn database(&self, name: &str) -> DatabaseDescriptor {
        let mut txn = self.store.begin();
        store::must_get_database_desc(&mut txn, name).expect("database exists")
    }

    /// Reads a committed table descriptor, regardless of its state.
    pub fn table(&self, database: &str, table: &str) -> TableDescriptor {
        let mut txn = self.store.begin();
        store::get_table_desc(&mut txn, database, table)
            .expect("lookup succeeds")
            .expect("table exists")
    }

    /// The committed event-log records, oldest first.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.store
            .entries_with_prefix(&keys::event_log_prefix())
            .into_iter()
            .filter(|(key, _)| *key != keys::event_log_seq_key())
            .map(|(_, value)| serde_json::from_slice(&value).expect("valid event record"))
            .collect()
    }

    /// The committed schema-change job records, oldest first.
    pub fn jobs(&self) -> Vec<JobRecord> {
        self.store
            .entries_with_prefix(&keys::job_prefix())
            .into_iter()
            .filter(|(key, _)| *key != keys::job_seq_key())
            .map(|(_, value)| serde_json::from_slice(&value).expect("valid job record"))
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> TestHarness {
        TestHarness::new()
    }
}
