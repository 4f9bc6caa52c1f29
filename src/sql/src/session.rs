// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Session state the DDL core reads and writes.

use gr_catalog::DescId;

/// A database created (or dropped) by the session's current transaction,
/// cached so later statements in the transaction resolve it without
/// waiting for leases to observe the commit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UncommittedDatabase {
    pub name: String,
    pub id: DescId,
    pub dropped: bool,
}

/// The session-scoped descriptor cache. Single-writer: only the owning
/// session's task touches it.
#[derive(Clone, Debug, Default)]
pub struct SessionTables {
    uncommitted_databases: Vec<UncommittedDatabase>,
}

impl SessionTables {
    pub fn add_uncommitted_database(&mut self, name: String, id: DescId, dropped: bool) {
        self.uncommitted_databases
            .push(UncommittedDatabase { name, id, dropped });
    }

    pub fn uncommitted_database(&self, name: &str) -> Option<&UncommittedDatabase> {
        // Later entries shadow earlier ones within a transaction.
        self.uncommitted_databases
            .iter()
            .rev()
            .find(|db| db.name == name)
    }
}

/// Per-session state.
#[derive(Clone, Debug)]
pub struct Session {
    /// The authenticated user.
    pub user: String,
    /// The current database, possibly empty.
    pub database: String,
    pub tables: SessionTables,
}

impl Session {
    pub fn new(user: impl Into<String>, database: impl Into<String>) -> Session {
        Session {
            user: user.into(),
            database: database.into(),
            tables: SessionTables::default(),
        }
    }
}
