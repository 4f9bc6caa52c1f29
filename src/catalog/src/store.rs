// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Transactional reads and writes of descriptors and naming entries.
//!
//! A descriptor is installed under two keys: the naming entry
//! `(parent_id, name) → id`, written conditionally so that name
//! uniqueness is enforced by the KV layer, and the payload at
//! `descriptor_key(id)`. Reads within a DDL transaction observe the
//! transaction's own writes.

use crate::descriptor::{DatabaseDescriptor, Descriptor, TableDescriptor, TableState};
use crate::error::CatalogError;
use crate::ids::DescId;
use crate::keys;
use crate::kv::Transaction;

/// Reports whether a naming entry exists at `key`.
pub fn desc_exists(txn: &mut dyn Transaction, key: &[u8]) -> Result<bool, CatalogError> {
    Ok(txn.get(key)?.is_some())
}

/// Resolves `(parent_id, name)` to a descriptor id, if present.
pub fn lookup_id(
    txn: &mut dyn Transaction,
    parent_id: DescId,
    name: &str,
) -> Result<Option<DescId>, CatalogError> {
    let raw = txn.get(&keys::namespace_key(parent_id, name))?;
    match raw {
        None => Ok(None),
        Some(raw) => keys::decode_id(&raw)
            .map(Some)
            .ok_or(CatalogError::InvalidDescriptor(parent_id)),
    }
}

/// Reads the descriptor payload at `id`, if present.
pub fn get_descriptor(
    txn: &mut dyn Transaction,
    id: DescId,
) -> Result<Option<Descriptor>, CatalogError> {
    match txn.get(&keys::descriptor_key(id))? {
        None => Ok(None),
        Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
    }
}

/// Reads the table descriptor at `id`, failing if it is missing or not a
/// relation. Missing here means a dangling reference: a bug or
/// corruption, never a user error.
pub fn must_get_table_desc_by_id(
    txn: &mut dyn Transaction,
    id: DescId,
) -> Result<TableDescriptor, CatalogError> {
    match get_descriptor(txn, id)? {
        Some(Descriptor::Table(desc)) => Ok(desc),
        _ => Err(CatalogError::InvalidDescriptor(id)),
    }
}

/// Resolves a database by name.
pub fn get_database_desc(
    txn: &mut dyn Transaction,
    name: &str,
) -> Result<Option<DatabaseDescriptor>, CatalogError> {
    let id = match lookup_id(txn, keys::ROOT_NAMESPACE_ID, name)? {
        None => return Ok(None),
        Some(id) => id,
    };
    match get_descriptor(txn, id)? {
        Some(Descriptor::Database(desc)) => Ok(Some(desc)),
        Some(Descriptor::Table(_)) => Err(CatalogError::WrongDescriptorType {
            name: name.into(),
            expected: "database",
        }),
        None => Err(CatalogError::InvalidDescriptor(id)),
    }
}

/// Resolves a database by name, failing if it does not exist.
pub fn must_get_database_desc(
    txn: &mut dyn Transaction,
    name: &str,
) -> Result<DatabaseDescriptor, CatalogError> {
    get_database_desc(txn, name)?.ok_or_else(|| CatalogError::UnknownDatabase(name.into()))
}

/// Resolves a relation by qualified name, if present.
pub fn get_table_desc(
    txn: &mut dyn Transaction,
    database: &str,
    table: &str,
) -> Result<Option<TableDescriptor>, CatalogError> {
    let db = match get_database_desc(txn, database)? {
        None => return Err(CatalogError::UnknownDatabase(database.into())),
        Some(db) => db,
    };
    let id = match lookup_id(txn, db.id, table)? {
        None => return Ok(None),
        Some(id) => id,
    };
    match get_descriptor(txn, id)? {
        Some(Descriptor::Table(desc)) => Ok(Some(desc)),
        Some(Descriptor::Database(_)) => Err(CatalogError::WrongDescriptorType {
            name: format!("{}.{}", database, table),
            expected: "relation",
        }),
        None => Err(CatalogError::InvalidDescriptor(id)),
    }
}

/// Resolves a relation by qualified name, failing if it does not exist.
/// Relations still in the `Add` state are only visible with
/// `allow_adding`; relations being dropped are never visible.
pub fn must_get_table_desc(
    txn: &mut dyn Transaction,
    database: &str,
    table: &str,
    allow_adding: bool,
) -> Result<TableDescriptor, CatalogError> {
    let display = format!("{}.{}", database, table);
    let desc = get_table_desc(txn, database, table)?
        .ok_or_else(|| CatalogError::UnknownRelation(display.clone()))?;
    match desc.state {
        TableState::Public => Ok(desc),
        TableState::Add => {
            if allow_adding {
                Ok(desc)
            } else {
                Err(CatalogError::RelationAdding(display))
            }
        }
        TableState::Drop => Err(CatalogError::UnknownRelation(display)),
    }
}

/// Atomically installs a new descriptor: the naming entry at `key` (which
/// must not exist) and the payload at `id`.
pub fn create_descriptor_with_id(
    txn: &mut dyn Transaction,
    key: &[u8],
    id: DescId,
    desc: &Descriptor,
) -> Result<(), CatalogError> {
    txn.cput(key, keys::encode_id(id), None)?;
    txn.put(&keys::descriptor_key(id), serde_json::to_vec(desc)?)?;
    Ok(())
}

/// Persists `desc` at its descriptor key, with whatever mutations it has
/// accumulated. Does not touch the version; callers bump it.
pub fn write_table_desc(
    txn: &mut dyn Transaction,
    desc: &TableDescriptor,
) -> Result<(), CatalogError> {
    txn.put(
        &keys::descriptor_key(desc.id),
        serde_json::to_vec(&Descriptor::Table(desc.clone()))?,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use gr_repr::Timestamp;

    use super::*;
    use crate::kv::{KvError, MemStore};
    use crate::privilege::PrivilegeDescriptor;

    #[test]
    fn descriptor_round_trip() {
        let store = MemStore::new();
        let mut txn = store.begin();

        let mut db = DatabaseDescriptor::new("db1".into());
        db.id = DescId(51);
        create_descriptor_with_id(
            &mut txn,
            &keys::namespace_key(keys::ROOT_NAMESPACE_ID, "db1"),
            db.id,
            &Descriptor::Database(db.clone()),
        )
        .unwrap();

        let mut table = TableDescriptor::init(
            DescId(52),
            db.id,
            "t".into(),
            Timestamp::MIN,
            PrivilegeDescriptor::new_default(),
        );
        table.sequence_opts = Some(Default::default());
        create_descriptor_with_id(
            &mut txn,
            &keys::namespace_key(db.id, "t"),
            table.id,
            &Descriptor::Table(table.clone()),
        )
        .unwrap();

        assert_eq!(must_get_database_desc(&mut txn, "db1").unwrap(), db);
        assert_eq!(
            must_get_table_desc(&mut txn, "db1", "t", false).unwrap(),
            table
        );
        assert!(matches!(
            must_get_table_desc(&mut txn, "db1", "missing", false),
            Err(CatalogError::UnknownRelation(_))
        ));
        assert!(matches!(
            must_get_database_desc(&mut txn, "nope"),
            Err(CatalogError::UnknownDatabase(_))
        ));
    }

    #[test]
    fn naming_entries_are_unique() {
        let store = MemStore::new();
        let mut txn = store.begin();
        let key = keys::namespace_key(keys::ROOT_NAMESPACE_ID, "db1");
        let db = DatabaseDescriptor::new("db1".into());
        create_descriptor_with_id(&mut txn, &key, DescId(51), &Descriptor::Database(db.clone()))
            .unwrap();
        let err = create_descriptor_with_id(&mut txn, &key, DescId(52), &Descriptor::Database(db))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Kv(KvError::ConditionFailed { .. })
        ));
    }

    #[test]
    fn adding_tables_are_gated() {
        let store = MemStore::new();
        let mut txn = store.begin();
        let mut db = DatabaseDescriptor::new("db1".into());
        db.id = DescId(51);
        create_descriptor_with_id(
            &mut txn,
            &keys::namespace_key(keys::ROOT_NAMESPACE_ID, "db1"),
            db.id,
            &Descriptor::Database(db.clone()),
        )
        .unwrap();
        let mut table = TableDescriptor::init(
            DescId(52),
            db.id,
            "t".into(),
            Timestamp::MIN,
            PrivilegeDescriptor::new_default(),
        );
        table.state = TableState::Add;
        table.sequence_opts = Some(Default::default());
        create_descriptor_with_id(
            &mut txn,
            &keys::namespace_key(db.id, "t"),
            table.id,
            &Descriptor::Table(table),
        )
        .unwrap();

        assert!(matches!(
            must_get_table_desc(&mut txn, "db1", "t", false),
            Err(CatalogError::RelationAdding(_))
        ));
        assert!(must_get_table_desc(&mut txn, "db1", "t", true).is_ok());
    }
}
