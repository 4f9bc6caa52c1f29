// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Descriptors: the serialized metadata records for databases, tables,
//! views, and sequences.
//!
//! A table descriptor owns its columns, families, and indexes, and
//! carries every cross-descriptor relationship as a pair of ids: foreign
//! keys and their back-references, interleave ancestors and
//! `interleaved_by`, view `depends_on` and `depended_on_by`. Each pair of
//! descriptors must agree about the relationship at the end of every DDL
//! transaction; [`TableDescriptor::validate`] checks exactly that.

use std::collections::BTreeSet;

use gr_repr::{ScalarType, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::ids::{ColumnId, DescId, FamilyId, IndexId, MutationId};
use crate::kv::Transaction;
use crate::privilege::PrivilegeDescriptor;
use crate::store;

/// The name of the implicit column family every column lands in unless a
/// `FAMILY` definition claims it first.
pub const PRIMARY_FAMILY_NAME: &str = "primary";

/// The name given to an unnamed primary index.
pub const PRIMARY_INDEX_NAME: &str = "primary";

/// The hidden primary-key column added to tables declared without one.
pub const ROWID_COLUMN_NAME: &str = "rowid";

/// A database: a namespace for relations.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    pub id: DescId,
    pub name: String,
    pub privileges: PrivilegeDescriptor,
}

impl DatabaseDescriptor {
    pub fn new(name: String) -> DatabaseDescriptor {
        DatabaseDescriptor {
            id: DescId(0),
            name,
            privileges: PrivilegeDescriptor::new_default(),
        }
    }
}

/// The lifecycle state of a table descriptor.
///
/// A table with an unresolved cross-descriptor obligation (a foreign key
/// or interleave into another table whose leaseholders have not yet
/// observed the back-reference) is `Add`; a table with none is `Public`.
/// Transitions are always written explicitly, never inferred.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TableState {
    Public,
    Add,
    Drop,
}

/// The on-disk format generation of a table descriptor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FormatVersion {
    Base,
    Family,
    Interleaved,
}

/// Whether a foreign key is known to hold for all existing rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConstraintValidity {
    Validated,
    Unvalidated,
}

/// The sort direction of one index column.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum IndexDirection {
    Asc,
    Desc,
}

/// A referential action attached to `ON DELETE` / `ON UPDATE`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ReferenceAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl std::fmt::Display for ReferenceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ReferenceAction::NoAction => f.write_str("NO ACTION"),
            ReferenceAction::Restrict => f.write_str("RESTRICT"),
            ReferenceAction::Cascade => f.write_str("CASCADE"),
            ReferenceAction::SetNull => f.write_str("SET NULL"),
            ReferenceAction::SetDefault => f.write_str("SET DEFAULT"),
        }
    }
}

/// A named, typed column.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub id: ColumnId,
    pub name: String,
    pub typ: ScalarType,
    pub nullable: bool,
    /// The serialized default expression, if any.
    pub default_expr: Option<String>,
    pub hidden: bool,
    /// The family the column's value is stored in; assigned by
    /// [`TableDescriptor::allocate_ids`].
    pub family_id: FamilyId,
}

/// A group of columns stored together.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FamilyDescriptor {
    pub id: FamilyId,
    pub name: String,
    pub column_names: Vec<String>,
    pub column_ids: Vec<ColumnId>,
}

/// The forward half of a foreign key: lives on the referencing (source)
/// index and points at the referenced (target) table and index.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    pub table: DescId,
    pub index: IndexId,
    pub name: String,
    pub validity: ConstraintValidity,
    /// How many leading columns of the source index participate in the
    /// foreign key. The source index may be wider than the constraint.
    pub shared_prefix_len: u32,
    pub on_delete: ReferenceAction,
    pub on_update: ReferenceAction,
}

/// The back-reference half of a cross-descriptor relationship: a bare
/// `(table, index)` pair mirrored on the referenced descriptor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IndexRef {
    pub table: DescId,
    pub index: IndexId,
}

/// One ancestor in an interleave chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InterleaveAncestor {
    pub table_id: DescId,
    pub index_id: IndexId,
    /// How many key columns this ancestor contributes beyond the
    /// ancestors before it.
    pub shared_prefix_len: u32,
}

/// The interleave chain of an index: all ancestors, root first.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct InterleaveDescriptor {
    pub ancestors: Vec<InterleaveAncestor>,
}

/// One list partition: a name and the encoded tuples it contains.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PartitionList {
    pub name: String,
    /// Value-encoded tuples; see `gr_repr::row`.
    pub values: Vec<Vec<u8>>,
    pub subpartitioning: PartitioningDescriptor,
}

/// One range partition: a name and its encoded exclusive upper bound.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PartitionRange {
    pub name: String,
    pub upper_bound: Vec<u8>,
}

/// Declarative partitioning of an index's key space.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PartitioningDescriptor {
    /// How many index columns this level of partitioning consumes.
    pub num_columns: u32,
    pub list: Vec<PartitionList>,
    pub range: Vec<PartitionRange>,
}

impl PartitioningDescriptor {
    pub fn is_partitioned(&self) -> bool {
        self.num_columns > 0
    }
}

/// An ordered access path over a table.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub id: IndexId,
    pub name: String,
    pub unique: bool,
    pub column_names: Vec<String>,
    pub column_directions: Vec<IndexDirection>,
    /// Filled from `column_names` by [`TableDescriptor::allocate_ids`].
    pub column_ids: Vec<ColumnId>,
    /// Extra columns stored in the index but not part of its key.
    pub store_column_names: Vec<String>,
    pub foreign_key: Option<ForeignKeyReference>,
    /// Foreign keys on other tables that reference this index.
    pub referenced_by: Vec<IndexRef>,
    pub interleave: InterleaveDescriptor,
    /// Child indexes interleaved into this index's key space.
    pub interleaved_by: Vec<IndexRef>,
    pub partitioning: PartitioningDescriptor,
}

impl IndexDescriptor {
    /// Populates `column_names` and `column_directions` from `(name,
    /// direction)` pairs, as written in the statement.
    pub fn fill_columns<I>(&mut self, columns: I) -> Result<(), CatalogError>
    where
        I: IntoIterator<Item = (String, IndexDirection)>,
    {
        for (name, direction) in columns {
            self.column_names.push(name);
            self.column_directions.push(direction);
        }
        if self.column_names.is_empty() {
            return Err(CatalogError::InvalidTableDefinition(
                "index must contain at least 1 column".into(),
            ));
        }
        Ok(())
    }
}

/// The direction of a pending schema change.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MutationDirection {
    Add,
    Drop,
}

/// A pending schema change on a table, consumed by the asynchronous
/// schema changer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DescriptorMutation {
    pub index: IndexDescriptor,
    pub direction: MutationDirection,
    pub mutation_id: MutationId,
}

/// The options of a sequence.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SequenceOpts {
    pub increment: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub start: i64,
    pub cycle: bool,
}

impl Default for SequenceOpts {
    fn default() -> SequenceOpts {
        SequenceOpts {
            increment: 1,
            min_value: 0,
            max_value: 0,
            start: 0,
            cycle: false,
        }
    }
}

/// A view dependency back-reference: which relation depends on this one,
/// through which index, using which columns.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableReference {
    /// The id of the depending relation (e.g. the view).
    pub id: DescId,
    pub index_id: IndexId,
    pub column_ids: Vec<ColumnId>,
}

/// A stored or computed relation: table, view, or sequence.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub id: DescId,
    pub parent_id: DescId,
    pub name: String,
    pub version: u32,
    pub format_version: FormatVersion,
    pub state: TableState,
    pub modification_time: Timestamp,
    pub privileges: PrivilegeDescriptor,
    pub columns: Vec<ColumnDescriptor>,
    pub families: Vec<FamilyDescriptor>,
    pub primary_index: IndexDescriptor,
    pub indexes: Vec<IndexDescriptor>,
    pub checks: Vec<CheckConstraint>,
    pub mutations: Vec<DescriptorMutation>,
    pub depends_on: Vec<DescId>,
    pub depended_on_by: Vec<TableReference>,
    pub view_query: Option<String>,
    pub sequence_opts: Option<SequenceOpts>,
    pub next_column_id: u32,
    pub next_family_id: u32,
    pub next_index_id: u32,
    pub next_mutation_id: u32,
}

/// A check constraint: its name and the serialized original expression.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: String,
    pub expr: String,
}

/// The serialized descriptor union stored at a descriptor key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Descriptor {
    Database(DatabaseDescriptor),
    Table(TableDescriptor),
}

impl TableDescriptor {
    /// Initializes a fresh descriptor: version 1, interleaved format,
    /// no structure yet.
    pub fn init(
        id: DescId,
        parent_id: DescId,
        name: String,
        creation_time: Timestamp,
        privileges: PrivilegeDescriptor,
    ) -> TableDescriptor {
        TableDescriptor {
            id,
            parent_id,
            name,
            version: 1,
            format_version: FormatVersion::Interleaved,
            state: TableState::Public,
            modification_time: creation_time,
            privileges,
            columns: Vec::new(),
            families: Vec::new(),
            primary_index: IndexDescriptor::default(),
            indexes: Vec::new(),
            checks: Vec::new(),
            mutations: Vec::new(),
            depends_on: Vec::new(),
            depended_on_by: Vec::new(),
            view_query: None,
            sequence_opts: None,
            next_column_id: 0,
            next_family_id: 0,
            next_index_id: 0,
            next_mutation_id: 0,
        }
    }

    pub fn is_view(&self) -> bool {
        self.view_query.is_some()
    }

    pub fn is_sequence(&self) -> bool {
        self.sequence_opts.is_some()
    }

    /// A physical table stores rows of its own; views and sequences do
    /// not (a sequence's value lives at a dedicated counter key).
    pub fn is_physical_table(&self) -> bool {
        !self.is_view() && !self.is_sequence()
    }

    pub fn adding(&self) -> bool {
        self.state == TableState::Add
    }

    /// Bumps the version. Every write of a touched descriptor must carry
    /// a version strictly greater than any previously published one.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn add_column(&mut self, column: ColumnDescriptor) {
        self.columns.push(column);
    }

    /// Adds an index. A second primary index is an error.
    pub fn add_index(&mut self, index: IndexDescriptor, primary: bool) -> Result<(), CatalogError> {
        if primary {
            if !self.primary_index.column_names.is_empty() {
                return Err(CatalogError::InvalidTableDefinition(format!(
                    "multiple primary keys for table \"{}\" are not allowed",
                    self.name
                )));
            }
            self.primary_index = index;
        } else {
            self.indexes.push(index);
        }
        Ok(())
    }

    pub fn add_family(&mut self, family: FamilyDescriptor) {
        self.families.push(family);
    }

    /// Attaches `col_name` to the family named `family_name`. With
    /// `create`, a missing family is created; with `create` but not
    /// `if_not_exists`, an existing family is an error.
    pub fn add_column_to_family_maybe_create(
        &mut self,
        col_name: &str,
        family_name: &str,
        create: bool,
        if_not_exists: bool,
    ) -> Result<(), CatalogError> {
        match self.families.iter_mut().find(|f| f.name == family_name) {
            Some(family) => {
                if create && !if_not_exists {
                    return Err(CatalogError::InvalidTableDefinition(format!(
                        "family \"{}\" already exists",
                        family_name
                    )));
                }
                family.column_names.push(col_name.into());
                Ok(())
            }
            None => {
                if !create {
                    return Err(CatalogError::InvalidTableDefinition(format!(
                        "unknown family \"{}\"",
                        family_name
                    )));
                }
                self.families.push(FamilyDescriptor {
                    id: FamilyId(0),
                    name: family_name.into(),
                    column_names: vec![col_name.into()],
                    column_ids: Vec::new(),
                });
                Ok(())
            }
        }
    }

    pub fn find_column_by_name(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like [`Self::find_column_by_name`], but an error when missing.
    /// "Active" excludes columns in mutations, of which the DDL core
    /// creates none on the tables it builds.
    pub fn find_active_column_by_name(&self, name: &str) -> Result<&ColumnDescriptor, CatalogError> {
        self.find_column_by_name(name).ok_or_else(|| {
            CatalogError::InvalidTableDefinition(format!("column \"{}\" does not exist", name))
        })
    }

    pub fn find_active_columns_by_names<'a, I>(
        &self,
        names: I,
    ) -> Result<Vec<ColumnDescriptor>, CatalogError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| self.find_active_column_by_name(name).cloned())
            .collect()
    }

    pub fn find_column_by_id(&self, id: ColumnId) -> Result<&ColumnDescriptor, CatalogError> {
        self.columns
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CatalogError::InvalidTableDefinition(format!("no column with id {}", id)))
    }

    /// Finds an index by name among the primary index, the secondary
    /// indexes, and pending mutations. The second component reports
    /// whether the index is being dropped.
    pub fn find_index_by_name(&self, name: &str) -> Option<(&IndexDescriptor, bool)> {
        if self.primary_index.name == name {
            return Some((&self.primary_index, false));
        }
        if let Some(idx) = self.indexes.iter().find(|i| i.name == name) {
            return Some((idx, false));
        }
        self.mutations
            .iter()
            .find(|m| m.index.name == name)
            .map(|m| (&m.index, m.direction == MutationDirection::Drop))
    }

    pub fn find_index_by_id(&self, id: IndexId) -> Result<&IndexDescriptor, CatalogError> {
        if self.primary_index.id == id {
            return Ok(&self.primary_index);
        }
        if let Some(idx) = self.indexes.iter().find(|i| i.id == id) {
            return Ok(idx);
        }
        self.mutations
            .iter()
            .find(|m| m.index.id == id)
            .map(|m| &m.index)
            .ok_or_else(|| CatalogError::InvalidTableDefinition(format!("no index with id {}", id)))
    }

    pub fn find_index_by_id_mut(
        &mut self,
        id: IndexId,
    ) -> Result<&mut IndexDescriptor, CatalogError> {
        if self.primary_index.id == id {
            return Ok(&mut self.primary_index);
        }
        if let Some(idx) = self.indexes.iter_mut().find(|i| i.id == id) {
            return Ok(idx);
        }
        self.mutations
            .iter_mut()
            .find(|m| m.index.id == id)
            .map(|m| &mut m.index)
            .ok_or_else(|| CatalogError::InvalidTableDefinition(format!("no index with id {}", id)))
    }

    /// Every index that is not being dropped: the primary index (for
    /// physical tables), the secondary indexes, and indexes pending in
    /// `Add` mutations.
    pub fn all_non_drop_indexes(&self) -> Vec<&IndexDescriptor> {
        let mut indexes = Vec::with_capacity(1 + self.indexes.len() + self.mutations.len());
        if self.is_physical_table() {
            indexes.push(&self.primary_index);
        }
        indexes.extend(self.indexes.iter());
        indexes.extend(
            self.mutations
                .iter()
                .filter(|m| m.direction == MutationDirection::Add)
                .map(|m| &m.index),
        );
        indexes
    }

    /// Queues `index` as a pending mutation. The mutation id is assigned
    /// later by [`Self::finalize_mutation`].
    pub fn add_index_mutation(&mut self, index: IndexDescriptor, direction: MutationDirection) {
        self.mutations.push(DescriptorMutation {
            index,
            direction,
            mutation_id: MutationId(0),
        });
    }

    /// Stamps every unstamped mutation with the next mutation id and
    /// returns it.
    pub fn finalize_mutation(&mut self) -> MutationId {
        if self.next_mutation_id == 0 {
            self.next_mutation_id = 1;
        }
        let id = MutationId(self.next_mutation_id);
        self.next_mutation_id += 1;
        for m in &mut self.mutations {
            if m.mutation_id == MutationId(0) {
                m.mutation_id = id;
            }
        }
        id
    }

    /// Assigns stable ids to columns, families, and indexes.
    ///
    /// Idempotent: ids already assigned are left alone, so it is safe to
    /// call again after constraint resolution adds indexes. For physical
    /// tables without a declared primary key, a hidden `rowid` column
    /// and a primary index over it are added first.
    pub fn allocate_ids(&mut self) -> Result<(), CatalogError> {
        if self.is_physical_table() {
            self.ensure_primary_key()?;
        }

        if self.next_column_id == 0 {
            self.next_column_id = 1;
        }
        for col in &mut self.columns {
            if col.id == ColumnId(0) {
                col.id = ColumnId(self.next_column_id);
                self.next_column_id += 1;
            }
        }

        if self.is_physical_table() {
            self.allocate_family_ids()?;
        }

        // Name resolution for index columns happens here, after column
        // ids exist.
        let columns: Vec<(String, ColumnId)> = self
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.id))
            .collect();
        if self.next_index_id == 0 {
            self.next_index_id = 1;
        }
        let table_name = self.name.clone();
        let mut used_names: BTreeSet<String> = self
            .all_non_drop_indexes()
            .iter()
            .map(|idx| idx.name.clone())
            .filter(|n| !n.is_empty())
            .collect();
        let mut next_index_id = self.next_index_id;
        let physical = self.is_physical_table();
        {
            let mut indexes: Vec<&mut IndexDescriptor> = Vec::new();
            if physical {
                indexes.push(&mut self.primary_index);
            }
            indexes.extend(self.indexes.iter_mut());
            indexes.extend(self.mutations.iter_mut().map(|m| &mut m.index));
            for (i, index) in indexes.into_iter().enumerate() {
                let primary = physical && i == 0;
                if index.id == IndexId(0) {
                    index.id = IndexId(next_index_id);
                    next_index_id += 1;
                }
                if index.name.is_empty() {
                    index.name = if primary {
                        PRIMARY_INDEX_NAME.into()
                    } else {
                        allocate_index_name(&table_name, index, &used_names)
                    };
                }
                used_names.insert(index.name.clone());
                if index.column_ids.len() != index.column_names.len() {
                    index.column_ids.clear();
                    for name in &index.column_names {
                        match columns.iter().find(|(n, _)| n == name) {
                            Some((_, id)) => index.column_ids.push(*id),
                            None => {
                                return Err(CatalogError::InvalidTableDefinition(format!(
                                    "index \"{}\" contains unknown column \"{}\"",
                                    index.name, name
                                )))
                            }
                        }
                    }
                }
            }
        }
        self.next_index_id = next_index_id;
        Ok(())
    }

    fn ensure_primary_key(&mut self) -> Result<(), CatalogError> {
        if !self.primary_index.column_names.is_empty() {
            return Ok(());
        }
        let mut name = ROWID_COLUMN_NAME.to_string();
        let mut i = 1;
        while self.find_column_by_name(&name).is_some() {
            name = format!("{}_{}", ROWID_COLUMN_NAME, i);
            i += 1;
        }
        self.add_column(ColumnDescriptor {
            id: ColumnId(0),
            name: name.clone(),
            typ: ScalarType::Int,
            nullable: false,
            default_expr: Some("unique_rowid()".into()),
            hidden: true,
            family_id: FamilyId(0),
        });
        let mut index = IndexDescriptor {
            name: PRIMARY_INDEX_NAME.into(),
            unique: true,
            ..Default::default()
        };
        index.fill_columns([(name, IndexDirection::Asc)])?;
        self.add_index(index, true)
    }

    fn allocate_family_ids(&mut self) -> Result<(), CatalogError> {
        if !self.families.iter().any(|f| f.name == PRIMARY_FAMILY_NAME) {
            self.families.insert(
                0,
                FamilyDescriptor {
                    id: FamilyId(0),
                    name: PRIMARY_FAMILY_NAME.into(),
                    column_names: Vec::new(),
                    column_ids: Vec::new(),
                },
            );
        }
        if self.next_family_id == 0 {
            self.next_family_id = 1;
        }
        let mut assigned: BTreeSet<String> = BTreeSet::new();
        for family in &mut self.families {
            if family.name != PRIMARY_FAMILY_NAME && family.id == FamilyId(0) {
                family.id = FamilyId(self.next_family_id);
                self.next_family_id += 1;
            }
            for name in &family.column_names {
                assigned.insert(name.clone());
            }
        }
        // Columns no FAMILY definition claimed land in the primary family.
        let unassigned: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !assigned.contains(&c.name))
            .map(|c| c.name.clone())
            .collect();
        let primary = self
            .families
            .iter_mut()
            .find(|f| f.name == PRIMARY_FAMILY_NAME)
            .expect("primary family ensured above");
        primary.column_names.extend(unassigned);

        let columns: Vec<(String, ColumnId)> = self
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.id))
            .collect();
        let mut memberships: Vec<(String, FamilyId)> = Vec::new();
        for family in &mut self.families {
            family.column_ids.clear();
            for name in &family.column_names {
                match columns.iter().find(|(n, _)| n == name) {
                    Some((_, id)) => family.column_ids.push(*id),
                    None => {
                        return Err(CatalogError::InvalidTableDefinition(format!(
                            "family \"{}\" contains unknown column \"{}\"",
                            family.name, name
                        )))
                    }
                }
            }
            for name in &family.column_names {
                memberships.push((name.clone(), family.id));
            }
        }
        for col in &mut self.columns {
            if let Some((_, family_id)) = memberships.iter().find(|(n, _)| *n == col.name) {
                col.family_id = *family_id;
            }
        }
        self.families.sort_by_key(|f| f.id.0);
        Ok(())
    }

    /// Checks the descriptor's self-consistency, without touching the
    /// catalog. Cross-descriptor agreement is [`Self::validate`].
    pub fn validate_table(&self) -> Result<(), CatalogError> {
        if self.name.is_empty() {
            return Err(invalid("empty relation name"));
        }
        if self.id == DescId(0) {
            return Err(invalid(format!("invalid id {} for {}", self.id, self.name)));
        }
        if self.parent_id == DescId(0) {
            return Err(invalid(format!("invalid parent id for {}", self.name)));
        }
        if self.is_sequence() {
            // Sequences have no row structure; their value is a counter
            // at a dedicated key.
            return Ok(());
        }
        if self.columns.is_empty() {
            return Err(invalid(format!("table \"{}\" has no columns", self.name)));
        }
        let mut col_names = BTreeSet::new();
        let mut col_ids = BTreeSet::new();
        for col in &self.columns {
            if col.name.is_empty() {
                return Err(invalid("empty column name"));
            }
            if !col_names.insert(col.name.clone()) {
                return Err(invalid(format!("duplicate column name: \"{}\"", col.name)));
            }
            if col.id == ColumnId(0) {
                return Err(invalid(format!(
                    "column \"{}\" has unallocated id",
                    col.name
                )));
            }
            if !col_ids.insert(col.id) {
                return Err(invalid(format!("duplicate column id {}", col.id)));
            }
            if col.id.0 >= self.next_column_id {
                return Err(invalid(format!(
                    "column \"{}\" id {} not less than next column id {}",
                    col.name, col.id, self.next_column_id
                )));
            }
        }
        if self.is_physical_table() {
            self.validate_families(&col_names)?;
            if self.primary_index.column_names.is_empty() {
                return Err(invalid(format!(
                    "table \"{}\" has no primary key",
                    self.name
                )));
            }
            if self.format_version != FormatVersion::Interleaved {
                return Err(invalid(format!(
                    "table \"{}\" has unexpected format version",
                    self.name
                )));
            }
        }
        let mut index_names = BTreeSet::new();
        let mut index_ids = BTreeSet::new();
        for index in self.all_non_drop_indexes() {
            if index.name.is_empty() {
                return Err(invalid("empty index name"));
            }
            if !index_names.insert(index.name.clone()) {
                return Err(invalid(format!(
                    "duplicate index name: \"{}\"",
                    index.name
                )));
            }
            if index.id == IndexId(0) {
                return Err(invalid(format!(
                    "index \"{}\" has unallocated id",
                    index.name
                )));
            }
            if !index_ids.insert(index.id) {
                return Err(invalid(format!("duplicate index id {}", index.id)));
            }
            if index.column_ids.len() != index.column_names.len()
                || index.column_directions.len() != index.column_names.len()
            {
                return Err(invalid(format!(
                    "mismatched column lists for index \"{}\"",
                    index.name
                )));
            }
            if index.column_ids.is_empty() {
                return Err(invalid(format!(
                    "index \"{}\" must contain at least 1 column",
                    index.name
                )));
            }
        }
        Ok(())
    }

    fn validate_families(&self, col_names: &BTreeSet<String>) -> Result<(), CatalogError> {
        if self.families.is_empty() {
            return Err(invalid(format!(
                "table \"{}\" has no column families",
                self.name
            )));
        }
        if self.families[0].id != FamilyId(0) {
            return Err(invalid("first column family must have id 0"));
        }
        let mut family_names = BTreeSet::new();
        let mut family_ids = BTreeSet::new();
        let mut covered = BTreeSet::new();
        for family in &self.families {
            if !family_names.insert(family.name.clone()) {
                return Err(invalid(format!(
                    "duplicate family name: \"{}\"",
                    family.name
                )));
            }
            if !family_ids.insert(family.id) {
                return Err(invalid(format!("duplicate family id {}", family.id)));
            }
            if family.column_ids.len() != family.column_names.len() {
                return Err(invalid(format!(
                    "mismatched column lists for family \"{}\"",
                    family.name
                )));
            }
            for name in &family.column_names {
                if !col_names.contains(name) {
                    return Err(invalid(format!(
                        "family \"{}\" contains unknown column \"{}\"",
                        family.name, name
                    )));
                }
                if !covered.insert(name.clone()) {
                    return Err(invalid(format!(
                        "column \"{}\" is in multiple families",
                        name
                    )));
                }
            }
        }
        for name in col_names {
            if !covered.contains(name) {
                return Err(invalid(format!("column \"{}\" is in no family", name)));
            }
        }
        Ok(())
    }

    /// Loads a referenced table during [`Self::validate`]. References to
    /// this very descriptor resolve to the in-memory copy, which may be
    /// newer than what the transaction has written.
    fn load_for_validation(
        &self,
        txn: &mut dyn Transaction,
        id: DescId,
    ) -> Result<TableDescriptor, CatalogError> {
        if id == self.id {
            Ok(self.clone())
        } else {
            store::must_get_table_desc_by_id(txn, id)
        }
    }

    /// Full validation: self-consistency plus agreement with every
    /// descriptor this one references. Reads the referenced descriptors
    /// through `txn`, so within a DDL transaction it observes the
    /// back-references written moments earlier.
    pub fn validate(&self, txn: &mut dyn Transaction) -> Result<(), CatalogError> {
        self.validate_table()?;

        match store::get_descriptor(txn, self.parent_id)? {
            Some(Descriptor::Database(_)) => {}
            _ => {
                return Err(invalid(format!(
                    "parent database {} for \"{}\" does not exist",
                    self.parent_id, self.name
                )))
            }
        }

        for index in self.all_non_drop_indexes() {
            if let Some(fk) = &index.foreign_key {
                let target = self.load_for_validation(txn, fk.table)?;
                let target_index = target.find_index_by_id(fk.index)?;
                let backrefs = target_index
                    .referenced_by
                    .iter()
                    .filter(|r| r.table == self.id && r.index == index.id)
                    .count();
                if backrefs != 1 {
                    return Err(invalid(format!(
                        "foreign key \"{}\" has {} matching back-references on \"{}\"",
                        fk.name, backrefs, target.name
                    )));
                }
            }
            for backref in &index.referenced_by {
                let origin = self.load_for_validation(txn, backref.table)?;
                let origin_index = origin.find_index_by_id(backref.index)?;
                match &origin_index.foreign_key {
                    Some(fk) if fk.table == self.id && fk.index == index.id => {}
                    _ => {
                        return Err(invalid(format!(
                            "broken foreign key backward reference from \"{}\" to \"{}\"",
                            self.name, origin.name
                        )))
                    }
                }
            }
            if let Some(ancestor) = index.interleave.ancestors.last() {
                let parent = self.load_for_validation(txn, ancestor.table_id)?;
                let parent_index = parent.find_index_by_id(ancestor.index_id)?;
                let backrefs = parent_index
                    .interleaved_by
                    .iter()
                    .filter(|r| r.table == self.id && r.index == index.id)
                    .count();
                if backrefs != 1 {
                    return Err(invalid(format!(
                        "missing interleave back-reference on \"{}\" for index \"{}\"",
                        parent.name, index.name
                    )));
                }
            }
            for child in &index.interleaved_by {
                let child_table = self.load_for_validation(txn, child.table)?;
                let child_index = child_table.find_index_by_id(child.index)?;
                match child_index.interleave.ancestors.last() {
                    Some(a) if a.table_id == self.id && a.index_id == index.id => {}
                    _ => {
                        return Err(invalid(format!(
                            "broken interleave backward reference from \"{}\" to \"{}\"",
                            self.name, child_table.name
                        )))
                    }
                }
            }
        }

        for backref in &self.depended_on_by {
            let view = self.load_for_validation(txn, backref.id)?;
            if !view.depends_on.contains(&self.id) {
                return Err(invalid(format!(
                    "broken view backward reference from \"{}\" to \"{}\"",
                    self.name, view.name
                )));
            }
        }
        for dep in &self.depends_on {
            let relation = self.load_for_validation(txn, *dep)?;
            if !relation.depended_on_by.iter().any(|r| r.id == self.id) {
                return Err(invalid(format!(
                    "view \"{}\" not registered as a dependency of \"{}\"",
                    self.name, relation.name
                )));
            }
        }
        Ok(())
    }
}

fn allocate_index_name(
    table_name: &str,
    index: &IndexDescriptor,
    used: &BTreeSet<String>,
) -> String {
    let mut segments = Vec::with_capacity(index.column_names.len() + 2);
    segments.push(table_name.to_string());
    segments.extend(index.column_names.iter().cloned());
    segments.push(if index.unique { "key" } else { "idx" }.to_string());
    let base = segments.join("_");
    if !used.contains(&base) {
        return base;
    }
    let mut i = 1;
    loop {
        let name = format!("{}{}", base, i);
        if !used.contains(&name) {
            return name;
        }
        i += 1;
    }
}

fn invalid(msg: impl Into<String>) -> CatalogError {
    CatalogError::InvalidTableDefinition(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> TableDescriptor {
        TableDescriptor::init(
            DescId(51),
            DescId(50),
            name.into(),
            Timestamp::MIN,
            PrivilegeDescriptor::new_default(),
        )
    }

    fn column(name: &str, typ: ScalarType) -> ColumnDescriptor {
        ColumnDescriptor {
            id: ColumnId(0),
            name: name.into(),
            typ,
            nullable: true,
            default_expr: None,
            hidden: false,
            family_id: FamilyId(0),
        }
    }

    #[test]
    fn allocate_ids_assigns_monotonic_column_ids() {
        let mut desc = table("t");
        desc.add_column(column("a", ScalarType::Int));
        desc.add_column(column("b", ScalarType::String { max_length: None }));
        let mut pk = IndexDescriptor {
            unique: true,
            ..Default::default()
        };
        pk.fill_columns([("a".to_string(), IndexDirection::Asc)])
            .unwrap();
        desc.add_index(pk, true).unwrap();
        desc.allocate_ids().unwrap();

        assert_eq!(desc.columns[0].id, ColumnId(1));
        assert_eq!(desc.columns[1].id, ColumnId(2));
        assert_eq!(desc.primary_index.id, IndexId(1));
        assert_eq!(desc.primary_index.name, PRIMARY_INDEX_NAME);
        assert_eq!(desc.primary_index.column_ids, vec![ColumnId(1)]);
        desc.validate_table().unwrap();
    }

    #[test]
    fn allocate_ids_is_idempotent() {
        let mut desc = table("t");
        desc.add_column(column("a", ScalarType::Int));
        let mut pk = IndexDescriptor::default();
        pk.fill_columns([("a".to_string(), IndexDirection::Asc)])
            .unwrap();
        desc.add_index(pk, true).unwrap();
        desc.allocate_ids().unwrap();
        let snapshot = desc.clone();
        desc.allocate_ids().unwrap();
        assert_eq!(desc, snapshot);
    }

    #[test]
    fn missing_primary_key_gets_hidden_rowid() {
        let mut desc = table("t");
        desc.add_column(column("a", ScalarType::Int));
        desc.allocate_ids().unwrap();
        let rowid = desc.find_column_by_name(ROWID_COLUMN_NAME).unwrap();
        assert!(rowid.hidden);
        assert!(!rowid.nullable);
        assert_eq!(rowid.default_expr.as_deref(), Some("unique_rowid()"));
        assert_eq!(desc.primary_index.column_names, vec![ROWID_COLUMN_NAME]);
        desc.validate_table().unwrap();
    }

    #[test]
    fn unassigned_columns_land_in_primary_family() {
        let mut desc = table("t");
        desc.add_column(column("a", ScalarType::Int));
        desc.add_column(column("b", ScalarType::Int));
        desc.add_family(FamilyDescriptor {
            id: FamilyId(0),
            name: "f1".into(),
            column_names: vec!["b".into()],
            column_ids: Vec::new(),
        });
        let mut pk = IndexDescriptor::default();
        pk.fill_columns([("a".to_string(), IndexDirection::Asc)])
            .unwrap();
        desc.add_index(pk, true).unwrap();
        desc.allocate_ids().unwrap();

        let primary = desc
            .families
            .iter()
            .find(|f| f.name == PRIMARY_FAMILY_NAME)
            .unwrap();
        assert_eq!(primary.id, FamilyId(0));
        assert!(primary.column_names.contains(&"a".to_string()));
        let f1 = desc.families.iter().find(|f| f.name == "f1").unwrap();
        assert_eq!(f1.id, FamilyId(1));
        assert_eq!(
            desc.find_column_by_name("b").unwrap().family_id,
            FamilyId(1)
        );
        desc.validate_table().unwrap();
    }

    #[test]
    fn second_primary_key_is_rejected() {
        let mut desc = table("t");
        desc.add_column(column("a", ScalarType::Int));
        desc.add_column(column("b", ScalarType::Int));
        let mut pk = IndexDescriptor::default();
        pk.fill_columns([("a".to_string(), IndexDirection::Asc)])
            .unwrap();
        desc.add_index(pk, true).unwrap();
        let mut pk2 = IndexDescriptor::default();
        pk2.fill_columns([("b".to_string(), IndexDirection::Asc)])
            .unwrap();
        assert!(desc.add_index(pk2, true).is_err());
    }

    #[test]
    fn unnamed_secondary_indexes_get_generated_names() {
        let mut desc = table("t");
        desc.add_column(column("a", ScalarType::Int));
        desc.add_column(column("b", ScalarType::Int));
        let mut pk = IndexDescriptor::default();
        pk.fill_columns([("a".to_string(), IndexDirection::Asc)])
            .unwrap();
        desc.add_index(pk, true).unwrap();
        let mut idx = IndexDescriptor {
            unique: true,
            ..Default::default()
        };
        idx.fill_columns([("b".to_string(), IndexDirection::Asc)])
            .unwrap();
        desc.add_index(idx, false).unwrap();
        desc.allocate_ids().unwrap();
        assert_eq!(desc.indexes[0].name, "t_b_key");
    }

    #[test]
    fn finalize_mutation_stamps_pending_mutations() {
        let mut desc = table("t");
        desc.add_column(column("a", ScalarType::Int));
        let mut pk = IndexDescriptor::default();
        pk.fill_columns([("a".to_string(), IndexDirection::Asc)])
            .unwrap();
        desc.add_index(pk, true).unwrap();
        let mut idx = IndexDescriptor {
            name: "idx".into(),
            ..Default::default()
        };
        idx.fill_columns([("a".to_string(), IndexDirection::Asc)])
            .unwrap();
        desc.add_index_mutation(idx, MutationDirection::Add);
        let id = desc.finalize_mutation();
        assert_eq!(id, MutationId(1));
        assert_eq!(desc.mutations[0].mutation_id, id);
        assert_eq!(desc.finalize_mutation(), MutationId(2));
    }

    #[test]
    fn validate_table_rejects_duplicate_columns() {
        let mut desc = table("t");
        desc.add_column(column("a", ScalarType::Int));
        desc.add_column(column("a", ScalarType::Int));
        let mut pk = IndexDescriptor::default();
        pk.fill_columns([("a".to_string(), IndexDirection::Asc)])
            .unwrap();
        desc.add_index(pk, true).unwrap();
        desc.allocate_ids().unwrap();
        assert!(desc.validate_table().is_err());
    }
}
