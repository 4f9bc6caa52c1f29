// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The catalog's key-space layout.
//!
//! Every key starts with a one-byte prefix naming its key space. Naming
//! entries map `(parent_id, name)` to a descriptor id; databases live
//! under the root namespace id. Uniqueness of names is enforced by
//! writing naming entries with a conditional put.

use crate::ids::DescId;

/// The parent id under which database naming entries live.
pub const ROOT_NAMESPACE_ID: DescId = DescId(0);

/// The id of the `system` database.
pub const SYSTEM_DATABASE_ID: DescId = DescId(1);

/// The id of the `system.users` table.
pub const USERS_TABLE_ID: DescId = DescId(2);

/// The first descriptor id handed to user-created descriptors. Ids below
/// this are reserved for system descriptors.
pub const MIN_USER_DESC_ID: u64 = 50;

const ID_GENERATOR_PREFIX: u8 = 0x00;
const NAMESPACE_PREFIX: u8 = 0x01;
const DESCRIPTOR_PREFIX: u8 = 0x02;
const SEQUENCE_PREFIX: u8 = 0x03;
const EVENT_LOG_PREFIX: u8 = 0x04;
const JOB_PREFIX: u8 = 0x05;
const TABLE_DATA_PREFIX: u8 = 0x06;

/// The key holding the cluster-wide descriptor id counter.
pub fn desc_id_generator_key() -> Vec<u8> {
    vec![ID_GENERATOR_PREFIX]
}

/// The key space prefix of all naming entries.
pub fn namespace_prefix() -> Vec<u8> {
    vec![NAMESPACE_PREFIX]
}

/// The naming key for `name` under `parent_id`. Holds the descriptor id.
pub fn namespace_key(parent_id: DescId, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(9 + name.len());
    key.push(NAMESPACE_PREFIX);
    key.extend_from_slice(&parent_id.0.to_be_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

/// The key holding the serialized descriptor with id `id`.
pub fn descriptor_key(id: DescId) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(DESCRIPTOR_PREFIX);
    key.extend_from_slice(&id.0.to_be_bytes());
    key
}

/// The key holding the current value counter of sequence `id`.
pub fn sequence_value_key(id: DescId) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(SEQUENCE_PREFIX);
    key.extend_from_slice(&id.0.to_be_bytes());
    key
}

/// The key space prefix of the event log.
pub fn event_log_prefix() -> Vec<u8> {
    vec![EVENT_LOG_PREFIX]
}

/// The event-log entry key for sequence number `seq`.
pub fn event_log_key(seq: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(EVENT_LOG_PREFIX);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// The key holding the event-log sequence counter.
pub fn event_log_seq_key() -> Vec<u8> {
    vec![EVENT_LOG_PREFIX, 0xff]
}

/// The key space prefix of schema-change job records.
pub fn job_prefix() -> Vec<u8> {
    vec![JOB_PREFIX]
}

/// The job record key for sequence number `seq`.
pub fn job_key(seq: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(JOB_PREFIX);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// The key holding the job sequence counter.
pub fn job_seq_key() -> Vec<u8> {
    vec![JOB_PREFIX, 0xff]
}

/// The row key for the row of table `id` whose encoded primary key is
/// `pk`.
pub fn table_row_key(id: DescId, pk: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(9 + pk.len());
    key.push(TABLE_DATA_PREFIX);
    key.extend_from_slice(&id.0.to_be_bytes());
    key.extend_from_slice(pk);
    key
}

/// Decodes the descriptor id stored in a naming entry.
pub fn decode_id(raw: &[u8]) -> Option<DescId> {
    let bytes: [u8; 8] = raw.try_into().ok()?;
    Some(DescId(u64::from_be_bytes(bytes)))
}

/// Encodes a descriptor id for storage in a naming entry.
pub fn encode_id(id: DescId) -> Vec<u8> {
    id.0.to_be_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_keys_differ_by_parent() {
        let a = namespace_key(DescId(1), "t");
        let b = namespace_key(DescId(2), "t");
        assert_ne!(a, b);
    }

    #[test]
    fn id_round_trips_through_naming_entry() {
        let id = DescId(123456);
        assert_eq!(decode_id(&encode_id(id)), Some(id));
    }
}
