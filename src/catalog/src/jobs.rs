// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Schema-change job records.
//!
//! When a DDL queues a descriptor mutation, it also records a job so the
//! asynchronous schema changer (and observability surfaces) can find the
//! pending work with the statement that caused it.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::ids::{DescId, MutationId};
use crate::keys;
use crate::kv::Transaction;

/// One schema-change job record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub desc_id: DescId,
    pub mutation_id: MutationId,
    /// The statement that queued the mutation, fully qualified.
    pub statement: String,
}

/// Appends a job record within `txn`.
pub fn insert_job_record(txn: &mut dyn Transaction, record: &JobRecord) -> Result<(), CatalogError> {
    let seq = txn.inc(&keys::job_seq_key(), 1)?;
    txn.put(&keys::job_key(seq), serde_json::to_vec(record)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemStore;

    #[test]
    fn job_records_round_trip() {
        let store = MemStore::new();
        let mut txn = store.begin();
        let record = JobRecord {
            desc_id: DescId(51),
            mutation_id: MutationId(1),
            statement: "CREATE INDEX idx ON db1.t (b)".into(),
        };
        insert_job_record(&mut txn, &record).unwrap();
        txn.commit().unwrap();

        let entries = store.entries_with_prefix(&keys::job_prefix());
        let records: Vec<JobRecord> = entries
            .iter()
            .filter(|(k, _)| *k != keys::job_seq_key())
            .map(|(_, v)| serde_json::from_slice(v).unwrap())
            .collect();
        assert_eq!(records, vec![record]);
    }
}
