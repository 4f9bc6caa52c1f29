// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The structured event log.
//!
//! Every successful DDL appends one auditable event record in the same
//! transaction as the descriptor writes, so the event is visible exactly
//! when the DDL committed.

use serde::Serialize;
use tracing::debug;

use crate::error::CatalogError;
use crate::ids::DescId;
use crate::keys;
use crate::kv::Transaction;

/// The kind of a DDL event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum EventLogType {
    CreateDatabase,
    CreateTable,
    CreateView,
    CreateSequence,
    CreateIndex,
}

/// One persisted event record.
#[derive(Debug, Serialize)]
struct EventRecord {
    timestamp: gr_repr::Timestamp,
    event_type: EventLogType,
    target_id: DescId,
    reporting_id: u32,
    info: serde_json::Value,
}

/// Writes DDL event records on behalf of one node.
#[derive(Clone, Copy, Debug)]
pub struct EventLogger {
    /// The node id recorded as the reporter of each event.
    pub node_id: u32,
}

impl EventLogger {
    pub fn new(node_id: u32) -> EventLogger {
        EventLogger { node_id }
    }

    /// Appends an event record within `txn`. `info` is the event's
    /// structured payload; it must carry at least the object name, the
    /// full statement text, and the invoking user.
    pub fn insert_event_record(
        &self,
        txn: &mut dyn Transaction,
        event_type: EventLogType,
        target_id: DescId,
        info: &impl Serialize,
    ) -> Result<(), CatalogError> {
        let seq = txn.inc(&keys::event_log_seq_key(), 1)?;
        debug!(?event_type, %target_id, "recording ddl event");
        let record = EventRecord {
            timestamp: txn.orig_timestamp(),
            event_type,
            target_id,
            reporting_id: self.node_id,
            info: serde_json::to_value(info)?,
        };
        txn.put(&keys::event_log_key(seq), serde_json::to_vec(&record)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;
    use crate::kv::MemStore;

    #[derive(Serialize)]
    struct Info<'a> {
        table_name: &'a str,
        statement: &'a str,
        user: &'a str,
    }

    #[test]
    fn events_commit_with_the_transaction() {
        let store = MemStore::new();
        let logger = EventLogger::new(1);

        let mut txn = store.begin();
        logger
            .insert_event_record(
                &mut txn,
                EventLogType::CreateTable,
                DescId(51),
                &Info {
                    table_name: "t",
                    statement: "CREATE TABLE t (a INT)",
                    user: "root",
                },
            )
            .unwrap();
        // Uncommitted: nothing visible.
        assert!(store.entries_with_prefix(&keys::event_log_prefix()).is_empty());
        txn.commit().unwrap();

        let entries = store.entries_with_prefix(&keys::event_log_prefix());
        // The sequence counter shares the prefix with the records.
        let records: Vec<_> = entries
            .iter()
            .filter(|(k, _)| *k != keys::event_log_seq_key())
            .collect();
        assert_eq!(records.len(), 1);
        let parsed: serde_json::Value = serde_json::from_slice(&records[0].1).unwrap();
        assert_eq!(parsed["event_type"], "CreateTable");
        assert_eq!(parsed["info"]["user"], "root");
    }
}
