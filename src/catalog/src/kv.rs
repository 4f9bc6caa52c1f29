// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The transactional KV interface the catalog runs against.
//!
//! The real store is the distributed transactional KV layer; this module
//! defines only the handful of operations the DDL core issues, plus an
//! in-memory implementation used by tests and bootstrap tooling. The
//! in-memory transaction buffers writes and reads its own buffer first,
//! which is the read-your-writes behavior the catalog depends on.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex};

use gr_repr::Timestamp;

use crate::ids::DescId;
use crate::keys;

/// An error from the KV layer.
#[derive(Clone, Debug)]
pub enum KvError {
    /// A conditional put found a value other than the expected one.
    ConditionFailed { key: Vec<u8> },
    /// A counter key held something other than a 64-bit integer.
    InvalidCounter { key: Vec<u8> },
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KvError::ConditionFailed { key } => {
                write!(f, "unexpected value for key {:?}", key)
            }
            KvError::InvalidCounter { key } => {
                write!(f, "key {:?} does not hold a counter", key)
            }
        }
    }
}

impl Error for KvError {}

/// One transaction against the KV store.
///
/// Reads observe all prior writes by the same transaction. Suspension
/// points in the DDL core are exclusively these operations.
pub trait Transaction {
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError>;

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), KvError>;

    /// Conditional put: writes `value` only if the key currently holds
    /// `expected` (`None` meaning absent), failing with
    /// [`KvError::ConditionFailed`] otherwise.
    fn cput(&mut self, key: &[u8], value: Vec<u8>, expected: Option<&[u8]>) -> Result<(), KvError>;

    /// Atomically adds `delta` to the 64-bit counter at `key`, treating an
    /// absent key as zero, and returns the new value.
    fn inc(&mut self, key: &[u8], delta: i64) -> Result<i64, KvError>;

    /// The timestamp at which this transaction originally read.
    fn orig_timestamp(&self) -> Timestamp;
}

/// Allocates globally unique, monotonically increasing descriptor ids.
///
/// Id allocation deliberately happens outside the DDL transaction: a
/// wasted id on abort is cheaper than serializing all DDL on the counter.
pub trait IdGenerator {
    fn generate_unique_desc_id(&self) -> Result<DescId, KvError>;
}

#[derive(Debug, Default)]
struct MemInner {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    next_wall_time: i64,
}

/// An in-memory KV store.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    inner: Arc<Mutex<MemInner>>,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }

    /// Starts a transaction with a fresh origin timestamp.
    pub fn begin(&self) -> MemTransaction {
        let mut inner = self.inner.lock().expect("poisoned");
        inner.next_wall_time += 1;
        MemTransaction {
            store: self.clone(),
            writes: BTreeMap::new(),
            orig_timestamp: Timestamp::new(inner.next_wall_time, 0),
        }
    }

    /// Returns the committed entries whose keys start with `prefix`, in
    /// key order. Test-only observability; the trait has no scans.
    pub fn entries_with_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let inner = self.inner.lock().expect("poisoned");
        inner
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn read(&self, key: &[u8]) -> Option<Vec<u8>> {
        let inner = self.inner.lock().expect("poisoned");
        inner.data.get(key).cloned()
    }

    fn add_to_counter(&self, key: &[u8], delta: i64) -> Result<i64, KvError> {
        let mut inner = self.inner.lock().expect("poisoned");
        let current = match inner.data.get(key) {
            None => 0,
            Some(raw) => decode_counter(key, raw)?,
        };
        let next = current + delta;
        inner.data.insert(key.to_vec(), next.to_be_bytes().to_vec());
        Ok(next)
    }
}

impl IdGenerator for MemStore {
    fn generate_unique_desc_id(&self) -> Result<DescId, KvError> {
        let id = self.add_to_counter(&keys::desc_id_generator_key(), 1)?;
        Ok(DescId(id as u64))
    }
}

/// A transaction against a [`MemStore`].
#[derive(Debug)]
pub struct MemTransaction {
    store: MemStore,
    writes: BTreeMap<Vec<u8>, Vec<u8>>,
    orig_timestamp: Timestamp,
}

impl MemTransaction {
    /// Atomically applies every buffered write.
    pub fn commit(self) -> Result<(), KvError> {
        let mut inner = self.store.inner.lock().expect("poisoned");
        for (key, value) in self.writes {
            inner.data.insert(key, value);
        }
        Ok(())
    }

    /// Discards every buffered write. Dropping the transaction without
    /// committing has the same effect; this form reads better at call
    /// sites that abort deliberately.
    pub fn rollback(self) {}
}

impl Transaction for MemTransaction {
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        if let Some(value) = self.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(self.store.read(key))
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), KvError> {
        self.writes.insert(key.to_vec(), value);
        Ok(())
    }

    fn cput(&mut self, key: &[u8], value: Vec<u8>, expected: Option<&[u8]>) -> Result<(), KvError> {
        let current = self.get(key)?;
        if current.as_deref() != expected {
            return Err(KvError::ConditionFailed { key: key.to_vec() });
        }
        self.writes.insert(key.to_vec(), value);
        Ok(())
    }

    fn inc(&mut self, key: &[u8], delta: i64) -> Result<i64, KvError> {
        let current = match self.get(key)? {
            None => 0,
            Some(raw) => decode_counter(key, &raw)?,
        };
        let next = current + delta;
        self.writes.insert(key.to_vec(), next.to_be_bytes().to_vec());
        Ok(next)
    }

    fn orig_timestamp(&self) -> Timestamp {
        self.orig_timestamp
    }
}

fn decode_counter(key: &[u8], raw: &[u8]) -> Result<i64, KvError> {
    let bytes: [u8; 8] = raw
        .try_into()
        .map_err(|_| KvError::InvalidCounter { key: key.to_vec() })?;
    Ok(i64::from_be_bytes(bytes))
}
