// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The planner: per-statement entry points and shared context.

use std::fmt;

use gr_catalog::kv::Transaction;
use gr_catalog::privilege::{Privilege, PrivilegeDescriptor, ROOT_USER};

use crate::ast::Statement;
use crate::exec::ExecConfig;
use crate::plan::{Plan, PlanError};
use crate::session::Session;

mod ddl;

/// Plans and executes DDL statements on behalf of one session, inside
/// that session's transaction.
pub struct Planner<'a> {
    pub txn: &'a mut dyn Transaction,
    pub session: &'a mut Session,
    pub config: &'a ExecConfig<'a>,
}

impl<'a> Planner<'a> {
    pub fn new(
        txn: &'a mut dyn Transaction,
        session: &'a mut Session,
        config: &'a ExecConfig<'a>,
    ) -> Planner<'a> {
        Planner {
            txn,
            session,
            config,
        }
    }

    /// Validates `stmt` against the catalog and produces its plan node.
    pub fn plan(&mut self, stmt: Statement) -> Result<Plan, PlanError> {
        match stmt {
            Statement::CreateDatabase(stmt) => self.plan_create_database(stmt),
            Statement::CreateTable(stmt) => self.plan_create_table(stmt),
            Statement::CreateView(stmt) => self.plan_create_view(stmt),
            Statement::CreateSequence(stmt) => self.plan_create_sequence(stmt),
            Statement::CreateIndex(stmt) => self.plan_create_index(stmt),
            Statement::CreateUser(stmt) => self.plan_create_user(stmt),
            Statement::AlterUserSetPassword(stmt) => self.plan_alter_user_set_password(stmt),
        }
    }

    /// Executes a plan node. All catalog effects land in this
    /// transaction; if anything fails, the caller aborts the transaction
    /// and no partial state survives.
    pub fn start(&mut self, plan: &mut Plan) -> Result<(), PlanError> {
        match plan {
            Plan::CreateDatabase(node) => self.start_create_database(node),
            Plan::CreateTable(node) => self.start_create_table(node),
            Plan::CreateView(node) => self.start_create_view(node),
            Plan::CreateSequence(node) => self.start_create_sequence(node),
            Plan::CreateIndex(node) => self.start_create_index(node),
            Plan::CreateUser(node) => self.start_create_user(node),
            Plan::AlterUserSetPassword(node) => self.start_alter_user_set_password(node),
        }
    }

    /// Checks that the session's user holds `privilege` on the object
    /// whose privileges are given.
    pub(crate) fn check_privilege(
        &self,
        privileges: &PrivilegeDescriptor,
        privilege: Privilege,
        object: impl fmt::Display,
    ) -> Result<(), PlanError> {
        if privileges.check(&self.session.user, privilege) {
            return Ok(());
        }
        Err(PlanError::InsufficientPrivilege {
            user: self.session.user.clone(),
            privilege: privilege.to_string(),
            object: object.to_string(),
        })
    }

    /// Restricts an operation to the root principal.
    pub(crate) fn require_superuser(&self, op: &str) -> Result<(), PlanError> {
        if self.session.user == ROOT_USER {
            return Ok(());
        }
        Err(PlanError::RequiresSuperuser { op: op.into() })
    }
}
