// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! System descriptors and cluster bootstrap.
//!
//! The `system` database and its tables occupy reserved descriptor ids
//! below [`keys::MIN_USER_DESC_ID`]. Bootstrap installs them and
//! positions the descriptor id counter just past the reserved range.

use gr_repr::{ScalarType, Timestamp};

use crate::descriptor::{
    ColumnDescriptor, DatabaseDescriptor, Descriptor, IndexDescriptor, IndexDirection,
    TableDescriptor,
};
use crate::error::CatalogError;
use crate::ids::{ColumnId, FamilyId};
use crate::keys;
use crate::kv::Transaction;
use crate::privilege::PrivilegeDescriptor;
use crate::store;

/// The name of the system database.
pub const SYSTEM_DATABASE_NAME: &str = "system";

/// The name of the users table.
pub const USERS_TABLE_NAME: &str = "users";

/// The descriptor of the `system` database.
pub fn system_database_desc() -> DatabaseDescriptor {
    let mut desc = DatabaseDescriptor::new(SYSTEM_DATABASE_NAME.into());
    desc.id = keys::SYSTEM_DATABASE_ID;
    desc
}

/// The descriptor of `system.users`: `username` is the primary key,
/// `hashedPassword` is null for users without password authentication.
pub fn users_table_desc() -> TableDescriptor {
    let mut desc = TableDescriptor::init(
        keys::USERS_TABLE_ID,
        keys::SYSTEM_DATABASE_ID,
        USERS_TABLE_NAME.into(),
        Timestamp::MIN,
        PrivilegeDescriptor::new_default(),
    );
    desc.add_column(ColumnDescriptor {
        id: ColumnId(0),
        name: "username".into(),
        typ: ScalarType::String { max_length: None },
        nullable: false,
        default_expr: None,
        hidden: false,
        family_id: FamilyId(0),
    });
    desc.add_column(ColumnDescriptor {
        id: ColumnId(0),
        name: "hashedPassword".into(),
        typ: ScalarType::Bytes,
        nullable: true,
        default_expr: None,
        hidden: false,
        family_id: FamilyId(0),
    });
    let mut pk = IndexDescriptor {
        unique: true,
        ..Default::default()
    };
    pk.fill_columns([("username".to_string(), IndexDirection::Asc)])
        .expect("non-empty column list");
    desc.add_index(pk, true).expect("first primary index");
    desc.allocate_ids().expect("static descriptor allocates");
    desc
}

/// Installs the system descriptors and advances the descriptor id
/// counter past the reserved range. The caller commits `txn`.
pub fn bootstrap(txn: &mut dyn Transaction) -> Result<(), CatalogError> {
    let db = system_database_desc();
    store::create_descriptor_with_id(
        txn,
        &keys::namespace_key(keys::ROOT_NAMESPACE_ID, &db.name),
        db.id,
        &Descriptor::Database(db.clone()),
    )?;
    let users = users_table_desc();
    store::create_descriptor_with_id(
        txn,
        &keys::namespace_key(db.id, &users.name),
        users.id,
        &Descriptor::Table(users),
    )?;
    txn.inc(&keys::desc_id_generator_key(), keys::MIN_USER_DESC_ID as i64)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{IdGenerator, MemStore};

    #[test]
    fn bootstrap_installs_system_tables() {
        let store = MemStore::new();
        let mut txn = store.begin();
        bootstrap(&mut txn).unwrap();
        txn.commit().unwrap();

        let mut txn = store.begin();
        let db = store::must_get_database_desc(&mut txn, SYSTEM_DATABASE_NAME).unwrap();
        assert_eq!(db.id, keys::SYSTEM_DATABASE_ID);
        let users =
            store::must_get_table_desc(&mut txn, SYSTEM_DATABASE_NAME, USERS_TABLE_NAME, false)
                .unwrap();
        assert_eq!(users.primary_index.column_names, vec!["username"]);
        users.validate_table().unwrap();

        // User descriptors allocate above the reserved range.
        let id = store.generate_unique_desc_id().unwrap();
        assert!(id.0 > keys::MIN_USER_DESC_ID);
    }
}
