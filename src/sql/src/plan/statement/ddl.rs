// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Data definition language (DDL).
//!
//! This module houses the planning and execution of the statements that
//! mutate the catalog: `CREATE DATABASE`, `CREATE TABLE` (with and
//! without `AS`), `CREATE VIEW`, `CREATE SEQUENCE`, `CREATE INDEX`,
//! `CREATE USER`, and `ALTER USER ... WITH PASSWORD`.
//!
//! Planning loads and validates everything execution needs; execution
//! performs all catalog writes inside the session's transaction, so a
//! failure anywhere aborts the whole statement with no partial state.

use std::collections::BTreeMap;

use gr_catalog::descriptor::{
    DatabaseDescriptor, Descriptor, IndexDescriptor, IndexDirection, IndexRef, MutationDirection,
    TableDescriptor, TableState,
};
use gr_catalog::event::EventLogType;
use gr_catalog::jobs::{self, JobRecord};
use gr_catalog::keys;
use gr_catalog::privilege::{Privilege, PrivilegeDescriptor};
use gr_catalog::store;
use gr_catalog::system::{SYSTEM_DATABASE_NAME, USERS_TABLE_NAME};
use gr_catalog::{DescId, MutationId};
use gr_repr::{Datum, ScalarType};
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ast::visit_mut::{self, VisitMut};
use crate::ast::{
    AlterUserSetPasswordStatement, CreateDatabaseStatement, CreateIndexStatement,
    CreateSequenceStatement, CreateTableStatement, CreateUserStatement, CreateViewStatement, Expr,
    Ident, Query, TableDef, UnresolvedTableName,
};
use crate::names;
use crate::normalize;
use crate::plan::expr::eval_constant;
use crate::plan::statement::Planner;
use crate::plan::{
    AlterUserSetPasswordNode, CreateDatabaseNode, CreateIndexNode, CreateSequenceNode,
    CreateTableNode, CreateUserNode, CreateViewNode, Plan, PlanError, UserAuthInfo,
};

mod table;

#[derive(Serialize)]
struct CreateDatabaseEvent {
    database_name: String,
    statement: String,
    user: String,
}

#[derive(Serialize)]
struct CreateTableEvent {
    table_name: String,
    statement: String,
    user: String,
}

#[derive(Serialize)]
struct CreateViewEvent {
    view_name: String,
    statement: String,
    user: String,
}

#[derive(Serialize)]
struct CreateSequenceEvent {
    sequence_name: String,
    statement: String,
    user: String,
}

#[derive(Serialize)]
struct CreateIndexEvent {
    table_name: String,
    index_name: String,
    statement: String,
    user: String,
    mutation_id: u32,
}

impl<'a> Planner<'a> {
    // CREATE DATABASE
    //
    // Privileges: root only. Postgres requires superuser or CREATEDB.
    pub(super) fn plan_create_database(
        &mut self,
        stmt: CreateDatabaseStatement,
    ) -> Result<Plan, PlanError> {
        if stmt.name.as_str().is_empty() {
            return Err(PlanError::EmptyDatabaseName);
        }
        if let Some(template) = &stmt.template {
            // Only the empty template is meaningful to us; see the
            // postgres docs on template databases.
            if !template.eq_ignore_ascii_case("template0") {
                sql_bail!("unsupported template: {}", template);
            }
        }
        if let Some(encoding) = &stmt.encoding {
            // We only support UTF8, under any of its aliases.
            if !(encoding.eq_ignore_ascii_case("UTF8")
                || encoding.eq_ignore_ascii_case("UTF-8")
                || encoding.eq_ignore_ascii_case("UNICODE"))
            {
                sql_bail!("unsupported encoding: {}", encoding);
            }
        }
        if let Some(collate) = &stmt.collate {
            if collate != "C" && collate != "C.UTF-8" {
                sql_bail!("unsupported collation: {}", collate);
            }
        }
        if let Some(ctype) = &stmt.ctype {
            if ctype != "C" && ctype != "C.UTF-8" {
                sql_bail!("unsupported character classification: {}", ctype);
            }
        }
        self.require_superuser("CREATE DATABASE")?;
        Ok(Plan::CreateDatabase(CreateDatabaseNode { stmt }))
    }

    pub(super) fn start_create_database(
        &mut self,
        node: &mut CreateDatabaseNode,
    ) -> Result<(), PlanError> {
        let name = normalize::ident(&node.stmt.name);
        let mut desc = DatabaseDescriptor::new(name.clone());
        let created = self.create_database(&mut desc, node.stmt.if_not_exists)?;
        if created {
            // Recorded in the same transaction as the descriptor write.
            self.insert_event_record(
                EventLogType::CreateDatabase,
                desc.id,
                &CreateDatabaseEvent {
                    database_name: name.clone(),
                    statement: node.stmt.to_string(),
                    user: self.session.user.clone(),
                },
            )?;
            self.session
                .tables
                .add_uncommitted_database(name, desc.id, false);
        }
        Ok(())
    }

    fn create_database(
        &mut self,
        desc: &mut DatabaseDescriptor,
        if_not_exists: bool,
    ) -> Result<bool, PlanError> {
        let key = keys::namespace_key(keys::ROOT_NAMESPACE_ID, &desc.name);
        if store::desc_exists(self.txn, &key)? {
            if if_not_exists {
                return Ok(false);
            }
            return Err(
                gr_catalog::CatalogError::DatabaseAlreadyExists(desc.name.clone()).into(),
            );
        }
        desc.id = self.config.id_generator.generate_unique_desc_id()?;
        store::create_descriptor_with_id(
            self.txn,
            &key,
            desc.id,
            &Descriptor::Database(desc.clone()),
        )?;
        Ok(true)
    }

    // CREATE TABLE
    //
    // Privileges: CREATE on database.
    pub(super) fn plan_create_table(
        &mut self,
        mut stmt: CreateTableStatement,
    ) -> Result<Plan, PlanError> {
        let table_name = names::normalize_table_name(&stmt.name, &self.session.database)?;
        let db_desc = store::must_get_database_desc(self.txn, &table_name.database)?;
        self.check_privilege(
            &db_desc.privileges,
            Privilege::Create,
            format!("database {}", db_desc.name),
        )?;

        table::hoist_constraints(&mut stmt);
        let column_names: Vec<String> = stmt
            .defs
            .iter()
            .filter_map(|def| match def {
                TableDef::Column(c) => Some(normalize::ident(&c.name)),
                _ => None,
            })
            .collect();
        if let Some(dup) = column_names.iter().duplicates().next() {
            sql_bail!("column \"{}\" specified more than once", dup);
        }
        for def in &stmt.defs {
            if let TableDef::ForeignKey(fk) = def {
                names::normalize_table_name(&fk.table, &self.session.database)?;
            }
        }

        let source = match &stmt.as_source {
            Some(query) => {
                // Planned eagerly so EXPLAIN has something useful to
                // show about CREATE TABLE ... AS.
                let planned = self
                    .config
                    .query_planner
                    .plan_query(self.txn, self.session, query)?;
                let num_col_names = stmt.as_column_names.len();
                let num_columns = planned.columns.len();
                if num_col_names != 0 && num_col_names != num_columns {
                    return Err(PlanError::Syntax(format!(
                        "CREATE TABLE specifies {} column name{}, but data source has {} column{}",
                        num_col_names,
                        pluralize(num_col_names),
                        num_columns,
                        pluralize(num_columns),
                    )));
                }
                Some(planned)
            }
            None => None,
        };

        Ok(Plan::CreateTable(CreateTableNode {
            stmt,
            table_name,
            db_desc,
            source,
            count: 0,
        }))
    }

    pub(super) fn start_create_table(
        &mut self,
        node: &mut CreateTableNode,
    ) -> Result<(), PlanError> {
        let key = keys::namespace_key(node.db_desc.id, &node.table_name.table);
        if store::desc_exists(self.txn, &key)? {
            if node.stmt.if_not_exists {
                return Ok(());
            }
            return Err(gr_catalog::CatalogError::RelationAlreadyExists(
                node.table_name.table.clone(),
            )
            .into());
        }

        let id = self.config.id_generator.generate_unique_desc_id()?;

        // New relations inherit the database's privileges, except that a
        // new system table always gets the default system set.
        let mut privileges = node.db_desc.privileges.clone();
        if node.db_desc.id == keys::SYSTEM_DATABASE_ID {
            privileges = PrivilegeDescriptor::new_default();
        }

        let creation_time = self.txn.orig_timestamp();
        let mut affected = BTreeMap::new();
        let mut desc = if node.stmt.is_as() {
            let source = node.source.as_ref().ok_or_else(|| {
                PlanError::Internal("CREATE TABLE AS source was not planned".into())
            })?;
            table::make_table_desc_if_as(
                &node.stmt,
                &node.table_name,
                node.db_desc.id,
                id,
                creation_time,
                &source.columns,
                privileges,
            )?
        } else {
            table::make_table_desc(
                self,
                &node.stmt,
                &node.table_name,
                node.db_desc.id,
                id,
                creation_time,
                privileges,
                &mut affected,
            )?
        };

        // Back-references on other tables are not installed yet, so only
        // validate the table itself here; the full check runs below.
        desc.validate_table()?;

        store::create_descriptor_with_id(self.txn, &key, id, &Descriptor::Table(desc.clone()))?;

        for (_, mut updated) in affected {
            self.save_nonmutation_and_notify(&mut updated)?;
        }
        if desc.adding() {
            self.notify_schema_change(desc.id, MutationId::INVALID);
        }

        let interleaved: Vec<IndexDescriptor> = desc
            .all_non_drop_indexes()
            .into_iter()
            .filter(|index| !index.interleave.ancestors.is_empty())
            .cloned()
            .collect();
        for index in interleaved {
            self.finalize_interleave(&mut desc, index)?;
        }

        desc.validate(self.txn)?;

        self.insert_event_record(
            EventLogType::CreateTable,
            desc.id,
            &CreateTableEvent {
                table_name: node.stmt.name.to_string(),
                statement: node.stmt.to_string(),
                user: self.session.user.clone(),
            },
        )?;

        if node.stmt.is_as() {
            // Filling the new table from the source query is DML and is
            // driven by the executor, not this core.
            node.count = 0;
        }
        Ok(())
    }

    // CREATE VIEW
    //
    // Privileges: CREATE on database, plus SELECT on the selected
    // columns (enforced by the query planner).
    pub(super) fn plan_create_view(
        &mut self,
        mut stmt: CreateViewStatement,
    ) -> Result<Plan, PlanError> {
        let view_name = names::normalize_table_name(&stmt.name, &self.session.database)?;
        let db_desc = store::must_get_database_desc(self.txn, &view_name.database)?;
        self.check_privilege(
            &db_desc.privileges,
            Privilege::Create,
            format!("database {}", db_desc.name),
        )?;

        // Qualify every table name in the source query. The traversal
        // rewrites the names in place, so the query text stored in the
        // descriptor always resolves unambiguously.
        {
            let mut normalizer = QueryNormalizer::new(&self.session.database);
            normalizer.visit_query_mut(&mut stmt.query);
            if let Some(err) = normalizer.err {
                return Err(err);
            }
        }

        let planned = self
            .config
            .query_planner
            .plan_query(self.txn, self.session, &stmt.query)?;

        let num_col_names = stmt.column_names.len();
        let num_columns = planned.columns.len();
        if num_col_names != 0 && num_col_names != num_columns {
            return Err(PlanError::Syntax(format!(
                "CREATE VIEW specifies {} column name{}, but data source has {} column{}",
                num_col_names,
                pluralize(num_col_names),
                num_columns,
                pluralize(num_columns),
            )));
        }

        debug!(
            "collected view dependencies: {} relations",
            planned.dependencies.len()
        );

        Ok(Plan::CreateView(CreateViewNode {
            stmt,
            view_name,
            db_desc,
            source_columns: planned.columns,
            plan_deps: planned.dependencies,
        }))
    }

    pub(super) fn start_create_view(&mut self, node: &mut CreateViewNode) -> Result<(), PlanError> {
        let key = keys::namespace_key(node.db_desc.id, &node.view_name.table);
        if store::desc_exists(self.txn, &key)? {
            return Err(gr_catalog::CatalogError::RelationAlreadyExists(
                node.view_name.table.clone(),
            )
            .into());
        }

        let id = self.config.id_generator.generate_unique_desc_id()?;

        let privileges = node.db_desc.privileges.clone();
        let mut desc = table::make_view_table_desc(
            &node.stmt,
            &node.view_name.table,
            node.db_desc.id,
            id,
            self.txn.orig_timestamp(),
            &node.source_columns,
            privileges,
        )?;
        desc.validate_table()?;

        for backref_id in node.plan_deps.keys() {
            desc.depends_on.push(*backref_id);
        }

        store::create_descriptor_with_id(self.txn, &key, id, &Descriptor::Table(desc.clone()))?;

        // Persist the back-references in all referenced descriptors. The
        // planner registered the dependencies without an id, because the
        // view's id did not exist yet; it does now.
        for dep in node.plan_deps.values() {
            let mut backref_desc = dep.desc.clone();
            for entry in &dep.deps {
                let mut entry = entry.clone();
                entry.id = desc.id;
                backref_desc.depended_on_by.push(entry);
            }
            self.save_nonmutation_and_notify(&mut backref_desc)?;
        }

        if desc.adding() {
            self.notify_schema_change(desc.id, MutationId::INVALID);
        }
        desc.validate(self.txn)?;

        self.insert_event_record(
            EventLogType::CreateView,
            desc.id,
            &CreateViewEvent {
                view_name: node.stmt.name.to_string(),
                statement: node.stmt.to_string(),
                user: self.session.user.clone(),
            },
        )
    }

    // CREATE SEQUENCE
    //
    // Privileges: CREATE on database.
    pub(super) fn plan_create_sequence(
        &mut self,
        stmt: CreateSequenceStatement,
    ) -> Result<Plan, PlanError> {
        let seq_name = names::normalize_table_name(&stmt.name, &self.session.database)?;
        let db_desc = store::must_get_database_desc(self.txn, &seq_name.database)?;
        self.check_privilege(
            &db_desc.privileges,
            Privilege::Create,
            format!("database {}", db_desc.name),
        )?;
        Ok(Plan::CreateSequence(CreateSequenceNode {
            stmt,
            seq_name,
            db_desc,
        }))
    }

    pub(super) fn start_create_sequence(
        &mut self,
        node: &mut CreateSequenceNode,
    ) -> Result<(), PlanError> {
        let key = keys::namespace_key(node.db_desc.id, &node.seq_name.table);
        if store::desc_exists(self.txn, &key)? {
            if node.stmt.if_not_exists {
                return Ok(());
            }
            return Err(gr_catalog::CatalogError::RelationAlreadyExists(
                node.seq_name.table.clone(),
            )
            .into());
        }

        let id = self.config.id_generator.generate_unique_desc_id()?;

        let privileges = node.db_desc.privileges.clone();
        let desc = table::make_sequence_table_desc(
            &node.stmt,
            &node.seq_name.table,
            node.db_desc.id,
            id,
            self.txn.orig_timestamp(),
            privileges,
        )?;
        desc.validate_table()?;

        store::create_descriptor_with_id(self.txn, &key, id, &Descriptor::Table(desc.clone()))?;

        // Position the value counter one increment before START, so the
        // first nextval lands exactly on START.
        let opts = desc
            .sequence_opts
            .as_ref()
            .ok_or_else(|| PlanError::Internal("sequence descriptor has no options".into()))?;
        self.txn
            .inc(&keys::sequence_value_key(id), opts.start - opts.increment)?;

        if desc.adding() {
            self.notify_schema_change(desc.id, MutationId::INVALID);
        }
        desc.validate(self.txn)?;

        self.insert_event_record(
            EventLogType::CreateSequence,
            desc.id,
            &CreateSequenceEvent {
                sequence_name: node.stmt.name.to_string(),
                statement: node.stmt.to_string(),
                user: self.session.user.clone(),
            },
        )
    }

    // CREATE INDEX
    //
    // Privileges: CREATE on the table.
    pub(super) fn plan_create_index(
        &mut self,
        stmt: CreateIndexStatement,
    ) -> Result<Plan, PlanError> {
        let table_name = names::normalize_table_name(&stmt.table, &self.session.database)?;
        let table_desc = store::must_get_table_desc(
            self.txn,
            &table_name.database,
            &table_name.table,
            true,
        )?;
        self.check_privilege(
            &table_desc.privileges,
            Privilege::Create,
            format!("relation {}", table_desc.name),
        )?;
        Ok(Plan::CreateIndex(CreateIndexNode {
            stmt,
            table_name,
            table_desc,
        }))
    }

    pub(super) fn start_create_index(
        &mut self,
        node: &mut CreateIndexNode,
    ) -> Result<(), PlanError> {
        let index_name = normalize::ident(&node.stmt.name);
        if let Some((_, dropped)) = node.table_desc.find_index_by_name(&index_name) {
            if dropped {
                sql_bail!("index \"{}\" being dropped, try again later", index_name);
            }
            if node.stmt.if_not_exists {
                return Ok(());
            }
            return Err(gr_catalog::CatalogError::RelationAlreadyExists(index_name).into());
        }

        let mut index = IndexDescriptor {
            name: index_name,
            unique: node.stmt.unique,
            store_column_names: node.stmt.storing.iter().map(normalize::ident).collect(),
            ..Default::default()
        };
        index.fill_columns(node.stmt.columns.iter().map(|elem| {
            let direction = if elem.descending {
                IndexDirection::Desc
            } else {
                IndexDirection::Asc
            };
            (normalize::ident(&elem.column), direction)
        }))?;
        if let Some(partition_by) = &node.stmt.partition_by {
            index.partitioning =
                table::add_partitioned_by(&node.table_desc, &index, partition_by, 0)?;
        }

        let desc = &mut node.table_desc;
        let mutation_idx = desc.mutations.len();
        desc.add_index_mutation(index, MutationDirection::Add);
        desc.allocate_ids()?;

        if let Some(interleave) = &node.stmt.interleave {
            let index_id = desc.mutations[mutation_idx].index.id;
            table::add_interleave(self.txn, &self.session.database, desc, index_id, interleave)?;
            let index = desc.mutations[mutation_idx].index.clone();
            self.finalize_interleave(desc, index)?;
        }

        desc.bump_version();
        desc.validate_table()?;

        let mutation_id = self.create_schema_change_job(desc, node.stmt.to_string())?;
        store::write_table_desc(self.txn, desc)?;

        // Recorded in the same transaction as the descriptor update.
        let event = CreateIndexEvent {
            table_name: node.table_desc.name.clone(),
            index_name: node.stmt.name.to_string(),
            statement: node.stmt.to_string(),
            user: self.session.user.clone(),
            mutation_id: mutation_id.0,
        };
        self.insert_event_record(EventLogType::CreateIndex, node.table_desc.id, &event)?;
        self.notify_schema_change(node.table_desc.id, mutation_id);
        Ok(())
    }

    // CREATE USER
    //
    // Privileges: INSERT on system.users. Like postgres, an empty
    // password is representable only by omitting the PASSWORD clause,
    // which disables password authentication for the user.
    pub(super) fn plan_create_user(&mut self, stmt: CreateUserStatement) -> Result<Plan, PlanError> {
        let users_desc = store::must_get_table_desc(
            self.txn,
            SYSTEM_DATABASE_NAME,
            USERS_TABLE_NAME,
            false,
        )?;
        self.check_privilege(
            &users_desc.privileges,
            Privilege::Insert,
            format!("table {}.{}", SYSTEM_DATABASE_NAME, USERS_TABLE_NAME),
        )?;
        let user_auth = UserAuthInfo {
            name: stmt.name.clone(),
            password: stmt.password.clone(),
        };
        Ok(Plan::CreateUser(CreateUserNode {
            if_not_exists: stmt.if_not_exists,
            stmt,
            user_auth,
            rows_affected: 0,
        }))
    }

    pub(super) fn start_create_user(&mut self, node: &mut CreateUserNode) -> Result<(), PlanError> {
        let (username, hashed_password) = self.resolve_user_auth(&node.user_auth)?;
        let params = [
            Datum::String(username.clone()),
            match hashed_password {
                Some(hash) => Datum::Bytes(hash),
                None => Datum::Null,
            },
        ];
        match self.config.internal_executor.execute(
            self.txn,
            "INSERT INTO system.users VALUES ($1, $2);",
            &params,
        ) {
            Ok(rows_affected) => {
                node.rows_affected = rows_affected;
                if rows_affected != 1 {
                    return Err(PlanError::Internal(format!(
                        "{} rows affected by user creation; expected exactly one row affected",
                        rows_affected,
                    )));
                }
                Ok(())
            }
            Err(err) if err.is_uniqueness_constraint_violation() => {
                if node.if_not_exists {
                    // The insert batch may have counted the row before
                    // detecting the duplicate; the statement is a no-op,
                    // so the count reported to the client must be zero.
                    node.rows_affected = 0;
                    return Ok(());
                }
                Err(PlanError::DuplicateUser(username))
            }
            Err(err) => Err(PlanError::Unstructured(err.to_string())),
        }
    }

    // ALTER USER ... WITH PASSWORD
    //
    // Privileges: UPDATE on system.users.
    pub(super) fn plan_alter_user_set_password(
        &mut self,
        stmt: AlterUserSetPasswordStatement,
    ) -> Result<Plan, PlanError> {
        let users_desc = store::must_get_table_desc(
            self.txn,
            SYSTEM_DATABASE_NAME,
            USERS_TABLE_NAME,
            false,
        )?;
        self.check_privilege(
            &users_desc.privileges,
            Privilege::Update,
            format!("table {}.{}", SYSTEM_DATABASE_NAME, USERS_TABLE_NAME),
        )?;
        let user_auth = UserAuthInfo {
            name: stmt.name.clone(),
            password: Some(stmt.password.clone()),
        };
        Ok(Plan::AlterUserSetPassword(AlterUserSetPasswordNode {
            if_exists: stmt.if_exists,
            stmt,
            user_auth,
            rows_affected: 0,
        }))
    }

    pub(super) fn start_alter_user_set_password(
        &mut self,
        node: &mut AlterUserSetPasswordNode,
    ) -> Result<(), PlanError> {
        let (username, hashed_password) = self.resolve_user_auth(&node.user_auth)?;
        let params = [
            Datum::String(username.clone()),
            match hashed_password {
                Some(hash) => Datum::Bytes(hash),
                None => Datum::Null,
            },
        ];
        let rows_affected = self
            .config
            .internal_executor
            .execute(
                self.txn,
                "UPDATE system.users SET \"hashedPassword\" = $2 WHERE username = $1",
                &params,
            )
            .map_err(|err| PlanError::Unstructured(err.to_string()))?;
        node.rows_affected = rows_affected;
        if rows_affected == 0 && !node.if_exists {
            return Err(PlanError::UnknownUser(username));
        }
        if rows_affected > 1 {
            return Err(PlanError::Internal(format!(
                "{} rows affected by password change; expected at most one row affected",
                rows_affected,
            )));
        }
        Ok(())
    }

    /// Resolves the username and (hashed) password of a user statement.
    fn resolve_user_auth(
        &self,
        user_auth: &UserAuthInfo,
    ) -> Result<(String, Option<Vec<u8>>), PlanError> {
        let name = type_as_string(&user_auth.name, "username")?;
        if name.is_empty() {
            sql_bail!("no username specified");
        }
        let username = normalize::normalize_and_validate_username(&name)?;

        let hashed_password = match &user_auth.password {
            None => None,
            Some(password) => {
                let password = type_as_string(password, "password")?;
                if password.is_empty() {
                    return Err(PlanError::EmptyPassword);
                }
                Some(self.config.password_hasher.hash_password(&password)?)
            }
        };
        Ok((username, hashed_password))
    }

    /// Bumps the descriptor's version, revalidates it, writes it back,
    /// and rings the schema changer even though no mutation record was
    /// added, so leaseholders refresh before dependent state goes
    /// public.
    pub(super) fn save_nonmutation_and_notify(
        &mut self,
        desc: &mut TableDescriptor,
    ) -> Result<(), PlanError> {
        desc.bump_version();
        desc.validate_table()?;
        store::write_table_desc(self.txn, desc)?;
        self.notify_schema_change(desc.id, MutationId::INVALID);
        Ok(())
    }

    /// Stamps the descriptor's pending mutations with a fresh mutation
    /// id and records the schema-change job.
    pub(super) fn create_schema_change_job(
        &mut self,
        desc: &mut TableDescriptor,
        statement: String,
    ) -> Result<MutationId, PlanError> {
        let mutation_id = desc.finalize_mutation();
        jobs::insert_job_record(
            self.txn,
            &JobRecord {
                desc_id: desc.id,
                mutation_id,
                statement,
            },
        )?;
        Ok(mutation_id)
    }

    /// Rings the asynchronous schema changer. Best-effort: the intent is
    /// already durable in the transaction, so a delivery failure must
    /// not fail the DDL.
    pub(super) fn notify_schema_change(&self, desc_id: DescId, mutation_id: MutationId) {
        if let Err(err) = self
            .config
            .schema_change_hook
            .notify_schema_change(desc_id, mutation_id)
        {
            warn!(%desc_id, "failed to notify schema changer: {:#}", err);
        }
    }

    /// Creates the back-reference from an interleaving parent to the
    /// child index interleaved into it, and flips the child public once
    /// the pair agrees.
    pub(super) fn finalize_interleave(
        &mut self,
        desc: &mut TableDescriptor,
        index: IndexDescriptor,
    ) -> Result<(), PlanError> {
        let ancestor = match index.interleave.ancestors.last() {
            None => return Ok(()),
            Some(ancestor) => *ancestor,
        };
        let backref = IndexRef {
            table: desc.id,
            index: index.id,
        };
        // Only the deepest ancestor carries the back-reference.
        if ancestor.table_id == desc.id {
            desc.find_index_by_id_mut(ancestor.index_id)?
                .interleaved_by
                .push(backref);
            self.save_nonmutation_and_notify(desc)?;
        } else {
            let mut ancestor_table = store::must_get_table_desc_by_id(self.txn, ancestor.table_id)?;
            ancestor_table
                .find_index_by_id_mut(ancestor.index_id)?
                .interleaved_by
                .push(backref);
            self.save_nonmutation_and_notify(&mut ancestor_table)?;
        }

        if desc.state == TableState::Add {
            desc.state = TableState::Public;
            self.save_nonmutation_and_notify(desc)?;
        }
        Ok(())
    }

    fn insert_event_record(
        &mut self,
        event_type: EventLogType,
        target_id: DescId,
        info: &impl Serialize,
    ) -> Result<(), PlanError> {
        let logger = gr_catalog::event::EventLogger::new(self.config.node_id);
        logger.insert_event_record(self.txn, event_type, target_id, info)?;
        Ok(())
    }
}

/// Rewrites every table name in a query to its fully qualified form.
/// CTE names shadow relations, so single-part names bound by a
/// surrounding WITH are left alone.
struct QueryNormalizer<'a> {
    session_database: &'a str,
    ctes: Vec<Ident>,
    err: Option<PlanError>,
}

impl<'a> QueryNormalizer<'a> {
    fn new(session_database: &'a str) -> QueryNormalizer<'a> {
        QueryNormalizer {
            session_database,
            ctes: Vec::new(),
            err: None,
        }
    }
}

impl<'a> VisitMut for QueryNormalizer<'a> {
    fn visit_query_mut(&mut self, query: &mut Query) {
        let n = self.ctes.len();
        for cte in &query.ctes {
            self.ctes.push(cte.alias.clone());
        }
        visit_mut::visit_query_mut(self, query);
        self.ctes.truncate(n);
    }

    fn visit_table_name_mut(&mut self, name: &mut UnresolvedTableName) {
        if let [ident] = name.0.as_slice() {
            if self.ctes.contains(ident) {
                return;
            }
        }
        if let Err(err) = names::qualify_table_name(name, self.session_database) {
            warn!(
                "failed to qualify table name {} with database name: {}",
                name, err
            );
            if self.err.is_none() {
                self.err = Some(err);
            }
        }
    }
}

/// Evaluates an expression that must produce a string, e.g. a username.
fn type_as_string(expr: &Expr, what: &str) -> Result<String, PlanError> {
    match eval_constant(expr, &ScalarType::String { max_length: None })? {
        Datum::String(s) => Ok(s),
        other => Err(PlanError::Unstructured(format!(
            "expected string for {}, found {}",
            what, other
        ))),
    }
}

fn pluralize(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
