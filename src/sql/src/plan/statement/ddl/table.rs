// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Table-descriptor construction.
//!
//! Everything that turns a `CREATE TABLE` / `VIEW` / `SEQUENCE`
//! statement (or a computed column set) into a validated descriptor:
//! constraint hoisting, the multi-pass build, foreign key resolution,
//! interleave wiring, partition encoding, and check constraints.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use gr_catalog::descriptor::{
    CheckConstraint, ColumnDescriptor, ConstraintValidity, FamilyDescriptor, ForeignKeyReference,
    IndexDescriptor, IndexDirection, IndexRef, InterleaveAncestor, InterleaveDescriptor,
    PartitionList, PartitionRange, PartitioningDescriptor, ReferenceAction, SequenceOpts,
    TableDescriptor, TableState,
};
use gr_catalog::kv::Transaction;
use gr_catalog::privilege::PrivilegeDescriptor;
use gr_catalog::store;
use gr_catalog::{ColumnId, DescId, FamilyId, IndexId};
use gr_repr::row::{encode_datum, encode_not_null_marker, NO_COLUMN_ID};
use gr_repr::{ScalarType, Timestamp};

use crate::ast;
use crate::ast::display::AstDisplay;
use crate::ast::{
    CheckConstraintDef, ColumnDef, CreateSequenceStatement, CreateTableStatement,
    CreateViewStatement, DataType, DropBehavior, Expr, ForeignKeyDef, Ident, IndexElem,
    InterleaveDef, Nullability, PartitionBy, SequenceOption, TableDef,
};
use crate::exec::ResultColumn;
use crate::names;
use crate::normalize;
use crate::plan::expr as plan_expr;
use crate::plan::statement::Planner;
use crate::plan::PlanError;

/// Moves constraints defined inline with columns into table-level
/// definitions, so later passes see a single source of truth. The
/// foreign key in `CREATE TABLE foo (a INT REFERENCES bar (a))` becomes
/// a table-level `FOREIGN KEY (a) REFERENCES bar (a)` and the inline
/// reference is cleared.
pub fn hoist_constraints(stmt: &mut CreateTableStatement) {
    let mut hoisted = Vec::new();
    for def in &mut stmt.defs {
        if let TableDef::Column(col) = def {
            for check in col.check_exprs.drain(..) {
                hoisted.push(TableDef::Check(CheckConstraintDef {
                    name: check.name,
                    expr: check.expr,
                }));
            }
            if let Some(fk) = col.references.take() {
                let to_cols = match fk.column {
                    Some(column) => vec![column],
                    None => Vec::new(),
                };
                hoisted.push(TableDef::ForeignKey(ForeignKeyDef {
                    name: fk.name,
                    table: fk.table,
                    from_cols: vec![col.name.clone()],
                    to_cols,
                    actions: fk.actions,
                }));
            }
        }
    }
    stmt.defs.extend(hoisted);
}

/// Maps a declared SQL type to its stored type.
pub fn scalar_type_from_sql(data_type: &DataType) -> ScalarType {
    match data_type {
        DataType::Bool => ScalarType::Bool,
        DataType::Int => ScalarType::Int,
        DataType::Float => ScalarType::Float,
        DataType::String { length } => ScalarType::String {
            max_length: *length,
        },
        DataType::Bytes => ScalarType::Bytes,
        DataType::Timestamp => ScalarType::Timestamp,
        DataType::Vector => ScalarType::Vector,
    }
}

fn data_type_from_scalar(typ: &ScalarType) -> DataType {
    match typ {
        ScalarType::Bool => DataType::Bool,
        ScalarType::Int => DataType::Int,
        ScalarType::Float => DataType::Float,
        ScalarType::String { max_length } => DataType::String {
            length: *max_length,
        },
        ScalarType::Bytes => DataType::Bytes,
        ScalarType::Timestamp => DataType::Timestamp,
        ScalarType::Vector => DataType::Vector,
    }
}

/// Builds the column descriptor for one column definition, plus the
/// single-column unique index implied by an inline `PRIMARY KEY` or
/// `UNIQUE`.
pub fn make_column_def_descs(
    d: &ColumnDef,
) -> Result<(ColumnDescriptor, Option<IndexDescriptor>), PlanError> {
    let name = normalize::ident(&d.name);
    let typ = scalar_type_from_sql(&d.data_type);

    let default_expr = match &d.default {
        None => None,
        Some(expr) => {
            // Defaults must be constant and agree with the column type.
            plan_expr::type_check(expr, &typ)?;
            Some(expr.to_ast_string())
        }
    };

    let column = ColumnDescriptor {
        id: ColumnId(0),
        name: name.clone(),
        typ,
        nullable: !matches!(d.nullability, Nullability::NotNull) && !d.primary_key,
        default_expr,
        hidden: false,
        family_id: FamilyId(0),
    };

    let index = if d.primary_key || d.unique {
        let mut index = IndexDescriptor {
            unique: true,
            ..Default::default()
        };
        index.fill_columns([(name, IndexDirection::Asc)])?;
        Some(index)
    } else {
        None
    };

    Ok((column, index))
}

/// Creates a table descriptor from a `CREATE TABLE` statement.
///
/// Foreign keys are resolved after the descriptor is otherwise complete
/// and ids are allocated, since the references carry those ids.
/// Resolution accumulates updates to other tables (their
/// back-references) in `affected`; the caller persists everything in
/// that map alongside the new table.
pub fn make_table_desc(
    planner: &mut Planner,
    stmt: &CreateTableStatement,
    table_name: &names::TableName,
    parent_id: DescId,
    id: DescId,
    creation_time: Timestamp,
    privileges: PrivilegeDescriptor,
    affected: &mut BTreeMap<DescId, TableDescriptor>,
) -> Result<TableDescriptor, PlanError> {
    let mut desc = TableDescriptor::init(
        id,
        parent_id,
        table_name.table.clone(),
        creation_time,
        privileges,
    );

    // First pass: columns (with their families and inline single-column
    // indexes).
    for def in &stmt.defs {
        if let TableDef::Column(d) = def {
            // The tables built here are never virtual, which is the one
            // place the legacy VECTOR type survives.
            if d.data_type == DataType::Vector {
                return Err(PlanError::Unsupported {
                    feature: "VECTOR column types".into(),
                    issue_no: None,
                });
            }
            let (column, index) = make_column_def_descs(d)?;
            let column_name = column.name.clone();
            desc.add_column(column);
            if let Some(index) = index {
                desc.add_index(index, d.primary_key)?;
            }
            if let Some(family) = &d.family {
                // When creating a table we always create the named
                // family if it does not exist yet.
                desc.add_column_to_family_maybe_create(
                    &column_name,
                    &normalize::ident(family),
                    true,
                    true,
                )?;
            }
        }
    }

    // Second pass: index-like definitions.
    let mut primary_index_columns: Option<BTreeSet<String>> = None;
    for def in &stmt.defs {
        match def {
            TableDef::Column(_) => {}
            TableDef::Index(d) => {
                let mut index = IndexDescriptor {
                    name: d.name.as_ref().map(normalize::ident).unwrap_or_default(),
                    store_column_names: d.storing.iter().map(normalize::ident).collect(),
                    ..Default::default()
                };
                index.fill_columns(index_elems(&d.columns))?;
                if let Some(partition_by) = &d.partition_by {
                    index.partitioning = add_partitioned_by(&desc, &index, partition_by, 0)?;
                }
                desc.add_index(index, false)?;
                if d.interleave.is_some() {
                    bail_unsupported!(9148, "use CREATE INDEX to make interleaved indexes");
                }
            }
            TableDef::UniqueConstraint(d) => {
                let mut index = IndexDescriptor {
                    name: d.name.as_ref().map(normalize::ident).unwrap_or_default(),
                    unique: true,
                    store_column_names: d.storing.iter().map(normalize::ident).collect(),
                    ..Default::default()
                };
                index.fill_columns(index_elems(&d.columns))?;
                if let Some(partition_by) = &d.partition_by {
                    index.partitioning = add_partitioned_by(&desc, &index, partition_by, 0)?;
                }
                desc.add_index(index, d.primary)?;
                if d.primary {
                    primary_index_columns = Some(
                        d.columns
                            .iter()
                            .map(|elem| normalize::ident(&elem.column))
                            .collect(),
                    );
                }
                if d.interleave.is_some() {
                    bail_unsupported!(9148, "use CREATE INDEX to make interleaved indexes");
                }
            }
            TableDef::Check(_) | TableDef::ForeignKey(_) | TableDef::Family(_) => {}
        }
    }

    if let Some(primary_index_columns) = primary_index_columns {
        // Primary index columns are not nullable.
        for column in &mut desc.columns {
            if primary_index_columns.contains(&column.name) {
                column.nullable = false;
            }
        }
    }

    // Third pass: explicit families, before allocation so implicit
    // families never steal their names.
    for def in &stmt.defs {
        if let TableDef::Family(d) = def {
            desc.add_family(FamilyDescriptor {
                id: FamilyId(0),
                name: normalize::ident(&d.name),
                column_names: d.columns.iter().map(normalize::ident).collect(),
                column_ids: Vec::new(),
            });
        }
    }

    desc.allocate_ids()?;

    if let Some(interleave) = &stmt.interleave {
        let primary_id = desc.primary_index.id;
        add_interleave(
            planner.txn,
            &planner.session.database,
            &mut desc,
            primary_id,
            interleave,
        )?;
    }

    if let Some(partition_by) = &stmt.partition_by {
        desc.primary_index.partitioning =
            add_partitioned_by(&desc, &desc.primary_index, partition_by, 0)?;
    }

    // Fourth pass: constraints.
    let mut generated_names = BTreeSet::new();
    for def in &stmt.defs {
        match def {
            TableDef::Check(d) => {
                let check = make_check_constraint(&desc, d, &mut generated_names)?;
                desc.checks.push(check);
            }
            TableDef::ForeignKey(d) => {
                resolve_fk(planner, &mut desc, d, affected, ConstraintValidity::Validated)?;
            }
            _ => {}
        }
    }

    // Multiple foreign keys from the same column would give conflicting
    // referential actions.
    let mut cols_in_fks: BTreeSet<ColumnId> = BTreeSet::new();
    let mut indexes: Vec<&IndexDescriptor> = vec![&desc.primary_index];
    indexes.extend(desc.indexes.iter());
    for index in indexes {
        if let Some(fk) = &index.foreign_key {
            let num_cols = if fk.shared_prefix_len > 0 {
                fk.shared_prefix_len as usize
            } else {
                index.column_ids.len()
            };
            for i in 0..num_cols {
                if !cols_in_fks.insert(index.column_ids[i]) {
                    sql_bail!(
                        "column \"{}\" cannot be used by multiple foreign key constraints",
                        index.column_names[i]
                    );
                }
            }
        }
    }

    desc.allocate_ids()?;
    Ok(desc)
}

/// Creates a table descriptor for the `CREATE TABLE ... AS` form from
/// the source query's result columns. No constraints, interleaves, or
/// partitions apply; every column is silently nullable.
pub fn make_table_desc_if_as(
    stmt: &CreateTableStatement,
    table_name: &names::TableName,
    parent_id: DescId,
    id: DescId,
    creation_time: Timestamp,
    result_columns: &[ResultColumn],
    privileges: PrivilegeDescriptor,
) -> Result<TableDescriptor, PlanError> {
    let mut desc = TableDescriptor::init(
        id,
        parent_id,
        table_name.table.clone(),
        creation_time,
        privileges,
    );
    for (i, result_column) in result_columns.iter().enumerate() {
        let mut column_def = ColumnDef::new(
            Ident::new(result_column.name.clone()),
            data_type_from_scalar(&result_column.typ),
        );
        if let Some(name) = stmt.as_column_names.get(i) {
            column_def.name = name.clone();
        }
        let (column, _) = make_column_def_descs(&column_def)?;
        desc.add_column(column);
    }
    desc.allocate_ids()?;
    Ok(desc)
}

/// Creates the table descriptor for a new view.
///
/// The descriptor is created directly in the public state rather than
/// `Add`: the back-references on its dependencies are installed in the
/// same transaction, so a cached dependency descriptor that is missing
/// the back-reference is harmless.
pub fn make_view_table_desc(
    stmt: &CreateViewStatement,
    view_name: &str,
    parent_id: DescId,
    id: DescId,
    creation_time: Timestamp,
    result_columns: &[ResultColumn],
    privileges: PrivilegeDescriptor,
) -> Result<TableDescriptor, PlanError> {
    let mut desc = TableDescriptor::init(
        id,
        parent_id,
        view_name.into(),
        creation_time,
        privileges,
    );
    // The query was qualified during planning; the stored text must
    // resolve identically from any session.
    desc.view_query = Some(stmt.query.to_ast_string_stable());
    for (i, result_column) in result_columns.iter().enumerate() {
        let mut column_def = ColumnDef::new(
            Ident::new(result_column.name.clone()),
            data_type_from_scalar(&result_column.typ),
        );
        if let Some(name) = stmt.column_names.get(i) {
            column_def.name = name.clone();
        }
        let (column, _) = make_column_def_descs(&column_def)?;
        desc.add_column(column);
    }
    desc.allocate_ids()?;
    Ok(desc)
}

/// Creates the table descriptor for a new sequence, starting from the
/// default options and applying each option the statement sets.
pub fn make_sequence_table_desc(
    stmt: &CreateSequenceStatement,
    sequence_name: &str,
    parent_id: DescId,
    id: DescId,
    creation_time: Timestamp,
    privileges: PrivilegeDescriptor,
) -> Result<TableDescriptor, PlanError> {
    let mut desc = TableDescriptor::init(
        id,
        parent_id,
        sequence_name.into(),
        creation_time,
        privileges,
    );
    let mut opts = SequenceOpts::default();
    assign_sequence_options(&mut opts, &stmt.options)?;
    desc.sequence_opts = Some(opts);
    desc.allocate_ids()?;
    Ok(desc)
}

fn assign_sequence_options(
    opts: &mut SequenceOpts,
    options: &[SequenceOption],
) -> Result<(), PlanError> {
    for option in options {
        if let SequenceOption::Increment(v) = option {
            if *v == 0 {
                sql_bail!("INCREMENT must not be zero");
            }
            opts.increment = *v;
        }
    }
    // Bounds and start default from the direction of the sequence.
    if opts.increment > 0 {
        opts.min_value = 1;
        opts.max_value = i64::MAX;
        opts.start = opts.min_value;
    } else {
        opts.min_value = i64::MIN;
        opts.max_value = -1;
        opts.start = opts.max_value;
    }
    let mut start_set = false;
    for option in options {
        match option {
            SequenceOption::Increment(_) => {}
            SequenceOption::Cycle => bail_unsupported!("CYCLE option"),
            SequenceOption::NoCycle => opts.cycle = false,
            SequenceOption::MinValue(v) => {
                opts.min_value = *v;
                if !start_set && opts.increment > 0 {
                    opts.start = opts.min_value;
                }
            }
            SequenceOption::NoMinValue => {
                opts.min_value = if opts.increment > 0 { 1 } else { i64::MIN };
            }
            SequenceOption::MaxValue(v) => {
                opts.max_value = *v;
                if !start_set && opts.increment < 0 {
                    opts.start = opts.max_value;
                }
            }
            SequenceOption::NoMaxValue => {
                opts.max_value = if opts.increment > 0 { i64::MAX } else { -1 };
            }
            SequenceOption::Start(v) => {
                opts.start = *v;
                start_set = true;
            }
        }
    }
    if opts.min_value > opts.max_value {
        sql_bail!(
            "MINVALUE ({}) must be less than MAXVALUE ({})",
            opts.min_value,
            opts.max_value
        );
    }
    if opts.start < opts.min_value {
        sql_bail!(
            "START value ({}) cannot be less than MINVALUE ({})",
            opts.start,
            opts.min_value
        );
    }
    if opts.start > opts.max_value {
        sql_bail!(
            "START value ({}) cannot be greater than MAXVALUE ({})",
            opts.start,
            opts.max_value
        );
    }
    Ok(())
}

fn index_elems(elems: &[IndexElem]) -> impl Iterator<Item = (String, IndexDirection)> + '_ {
    elems.iter().map(|elem| {
        let direction = if elem.descending {
            IndexDirection::Desc
        } else {
            IndexDirection::Asc
        };
        (normalize::ident(&elem.column), direction)
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IndexMatch {
    /// Referenced columns must be unique, so referenced indexes must
    /// match exactly.
    Exact,
    /// Referencing columns have no uniqueness requirement and may match
    /// a strict prefix of an index.
    Prefix,
}

fn matches_index(cols: &[ColumnDescriptor], index: &IndexDescriptor, matching: IndexMatch) -> bool {
    if cols.len() > index.column_ids.len()
        || (matching == IndexMatch::Exact && cols.len() != index.column_ids.len())
    {
        return false;
    }
    cols.iter()
        .zip(&index.column_ids)
        .all(|(col, id)| col.id == *id)
}

#[derive(Clone, Copy)]
enum FkTarget {
    /// The reference points at the table being built or altered.
    SelfRef,
    /// The reference points at another existing table.
    Other(DescId),
}

/// Looks up the table and columns mentioned in a `REFERENCES` definition
/// and adds the constraint's metadata to `tbl`. Descriptors of other
/// tables that pick up back-references land in `backrefs`, which the
/// caller must persist with the table. Constraints not known to hold for
/// existing data are created unvalidated; at table creation the table is
/// empty, so `Validated` is sound.
pub fn resolve_fk(
    planner: &mut Planner,
    tbl: &mut TableDescriptor,
    d: &ForeignKeyDef,
    backrefs: &mut BTreeMap<DescId, TableDescriptor>,
    mode: ConstraintValidity,
) -> Result<(), PlanError> {
    if d.from_cols.is_empty() {
        return Err(PlanError::Syntax(
            "foreign key must name at least one column".into(),
        ));
    }
    let target_name = names::normalize_table_name(&d.table, &planner.session.database)?;
    let target = match store::get_table_desc(
        planner.txn,
        &target_name.database,
        &target_name.table,
    )? {
        // Self-referencing foreign keys name a table that does not
        // exist yet, because we are creating it.
        None if target_name.table == tbl.name => FkTarget::SelfRef,
        None => {
            sql_bail!("referenced table \"{}\" not found", target_name);
        }
        // When adding a self-reference to an existing table, edit the
        // same copy.
        Some(t) if t.id == tbl.id => FkTarget::SelfRef,
        Some(t) => {
            // This table references another table, so it must be created
            // in the non-public `Add` state and made public only after
            // all leases on the target include the back-reference.
            if mode == ConstraintValidity::Validated {
                tbl.state = TableState::Add;
                tbl.bump_version();
            }
            let target_id = t.id;
            // Any other FK on the same target must edit this one copy.
            backrefs.entry(target_id).or_insert(t);
            FkTarget::Other(target_id)
        }
    };

    let target_view: TableDescriptor = match target {
        FkTarget::SelfRef => tbl.clone(),
        FkTarget::Other(id) => backrefs[&id].clone(),
    };

    let src_col_names: Vec<String> = d.from_cols.iter().map(normalize::ident).collect();
    let src_cols =
        tbl.find_active_columns_by_names(src_col_names.iter().map(|name| name.as_str()))?;

    // If no target columns are specified, default to the primary key.
    let target_col_names: Vec<String> = if d.to_cols.is_empty() {
        target_view.primary_index.column_names.clone()
    } else {
        d.to_cols.iter().map(normalize::ident).collect()
    };
    let target_cols =
        target_view.find_active_columns_by_names(target_col_names.iter().map(|name| name.as_str()))?;

    if target_cols.len() != src_cols.len() {
        sql_bail!(
            "{} columns must reference exactly {} columns in referenced table (found {})",
            src_cols.len(),
            src_cols.len(),
            target_cols.len()
        );
    }

    for (src, target_col) in src_cols.iter().zip(&target_cols) {
        // Semantic equality only; width and precision may differ.
        if src.typ.semantic() != target_col.typ.semantic() {
            sql_bail!(
                "type of \"{}\" ({}) does not match foreign key \"{}\".\"{}\" ({})",
                src.name,
                src.typ.semantic(),
                target_view.name,
                target_col.name,
                target_col.typ.semantic()
            );
        }
    }

    let constraint_name = match &d.name {
        Some(name) => normalize::ident(name),
        None => format!("fk_{}_ref_{}", src_col_names[0], target_view.name),
    };

    let target_index_id = if matches_index(&target_cols, &target_view.primary_index, IndexMatch::Exact)
    {
        target_view.primary_index.id
    } else {
        let found = target_view
            .indexes
            .iter()
            .find(|index| index.unique && matches_index(&target_cols, index, IndexMatch::Exact));
        match found {
            Some(index) => index.id,
            None => {
                return Err(PlanError::InvalidForeignKey(format!(
                    "there is no unique constraint matching given keys for referenced table {}",
                    target_name
                )))
            }
        }
    };

    if !matches!(
        d.actions.on_delete,
        ast::ReferenceAction::NoAction | ast::ReferenceAction::Restrict
    ) {
        bail_unsupported!(format!("ON DELETE {}", d.actions.on_delete));
    }
    if !matches!(
        d.actions.on_update,
        ast::ReferenceAction::NoAction | ast::ReferenceAction::Restrict
    ) {
        bail_unsupported!(format!("ON UPDATE {}", d.actions.on_update));
    }

    let mut fk = ForeignKeyReference {
        table: match target {
            FkTarget::SelfRef => tbl.id,
            FkTarget::Other(id) => id,
        },
        index: target_index_id,
        name: constraint_name.clone(),
        validity: ConstraintValidity::Validated,
        shared_prefix_len: src_cols.len() as u32,
        on_delete: reference_action(d.actions.on_delete),
        on_update: reference_action(d.actions.on_update),
    };
    if mode == ConstraintValidity::Unvalidated {
        fk.validity = ConstraintValidity::Unvalidated;
    }

    let backref_index_id;
    if matches_index(&src_cols, &tbl.primary_index, IndexMatch::Prefix) {
        if tbl.primary_index.foreign_key.is_some() {
            return Err(PlanError::InvalidForeignKey(
                "columns cannot be used by multiple foreign key constraints".into(),
            ));
        }
        tbl.primary_index.foreign_key = Some(fk);
        backref_index_id = tbl.primary_index.id;
    } else {
        let found = tbl
            .indexes
            .iter()
            .position(|index| matches_index(&src_cols, index, IndexMatch::Prefix));
        match found {
            Some(i) => {
                if tbl.indexes[i].foreign_key.is_some() {
                    return Err(PlanError::InvalidForeignKey(
                        "columns cannot be used by multiple foreign key constraints".into(),
                    ));
                }
                tbl.indexes[i].foreign_key = Some(fk);
                backref_index_id = tbl.indexes[i].id;
            }
            None => {
                // Adding a constraint to an existing table must never
                // trigger a surprise index build.
                if mode == ConstraintValidity::Unvalidated {
                    return Err(PlanError::InvalidForeignKey(format!(
                        "foreign key requires an existing index on columns {}",
                        col_names(&src_cols)
                    )));
                }
                backref_index_id = add_index_for_fk(tbl, &src_cols, &constraint_name, fk)?;
            }
        }
    }

    let backref = IndexRef {
        table: tbl.id,
        index: backref_index_id,
    };
    match target {
        FkTarget::SelfRef => {
            tbl.find_index_by_id_mut(target_index_id)?
                .referenced_by
                .push(backref);
        }
        FkTarget::Other(id) => {
            let target_tbl = backrefs
                .get_mut(&id)
                .ok_or_else(|| PlanError::Internal("foreign key target vanished".into()))?;
            target_tbl
                .find_index_by_id_mut(target_index_id)?
                .referenced_by
                .push(backref);
        }
    }
    Ok(())
}

/// Adds a non-unique ascending index over `src_cols` to a table being
/// created, to back a foreign key for which no existing index matched.
fn add_index_for_fk(
    tbl: &mut TableDescriptor,
    src_cols: &[ColumnDescriptor],
    constraint_name: &str,
    fk: ForeignKeyReference,
) -> Result<IndexId, PlanError> {
    let mut index = IndexDescriptor {
        name: format!("{}_auto_index_{}", tbl.name, constraint_name),
        foreign_key: Some(fk),
        ..Default::default()
    };
    index.fill_columns(
        src_cols
            .iter()
            .map(|col| (col.name.clone(), IndexDirection::Asc)),
    )?;
    tbl.add_index(index, false)?;
    tbl.allocate_ids()?;

    // The index was appended, so it is the last one; verify rather than
    // assume.
    let added = tbl
        .indexes
        .last()
        .ok_or_else(|| PlanError::Internal("auto-generated index missing".into()))?;
    if !matches_index(src_cols, added, IndexMatch::Prefix) {
        return Err(PlanError::Internal(
            "no matching index and auto-generated index failed to match".into(),
        ));
    }
    Ok(added.id)
}

fn reference_action(action: ast::ReferenceAction) -> ReferenceAction {
    match action {
        ast::ReferenceAction::NoAction => ReferenceAction::NoAction,
        ast::ReferenceAction::Restrict => ReferenceAction::Restrict,
        ast::ReferenceAction::Cascade => ReferenceAction::Cascade,
        ast::ReferenceAction::SetNull => ReferenceAction::SetNull,
        ast::ReferenceAction::SetDefault => ReferenceAction::SetDefault,
    }
}

/// Renders a column list for an error message: `("a", "b")`.
fn col_names(cols: &[ColumnDescriptor]) -> String {
    let mut out = String::from("(\"");
    for (i, col) in cols.iter().enumerate() {
        if i != 0 {
            out.push_str("\", \"");
        }
        out.push_str(&col.name);
    }
    out.push_str("\")");
    out
}

/// Marks `index_id` on `desc` as interleaved into the parent named by
/// the definition. The child ends in the `Add` state; the parent's
/// back-reference is installed by `finalize_interleave` once the
/// descriptor exists.
pub fn add_interleave(
    txn: &mut dyn Transaction,
    session_database: &str,
    desc: &mut TableDescriptor,
    index_id: IndexId,
    interleave: &InterleaveDef,
) -> Result<(), PlanError> {
    if interleave.drop_behavior != DropBehavior::Default {
        let behavior = match interleave.drop_behavior {
            DropBehavior::Restrict => "RESTRICT",
            DropBehavior::Cascade => "CASCADE",
            DropBehavior::Default => unreachable!("checked above"),
        };
        bail_unsupported!(7854, format!("unsupported shorthand {}", behavior));
    }

    let parent_name = names::normalize_table_name(&interleave.parent, session_database)?;
    // Interleaving into a parent that is itself still being added is
    // fine; both go public together.
    let parent_table =
        store::must_get_table_desc(txn, &parent_name.database, &parent_name.table, true)?;
    let parent_index = &parent_table.primary_index;
    let index = desc.find_index_by_id(index_id)?.clone();

    if interleave.fields.len() != parent_index.column_ids.len() {
        sql_bail!("interleaved columns must match parent");
    }
    // The child index may carry more columns than the interleave prefix,
    // never fewer.
    if interleave.fields.len() > index.column_ids.len() {
        sql_bail!("declared columns must match index being interleaved");
    }
    for (i, target_col_id) in parent_index.column_ids.iter().enumerate() {
        let target_col = parent_table.find_column_by_id(*target_col_id)?;
        let col = desc.find_column_by_id(index.column_ids[i])?;
        if normalize::ident(&interleave.fields[i]) != col.name {
            sql_bail!("declared columns must match index being interleaved");
        }
        if col.typ != target_col.typ
            || index.column_directions[i] != parent_index.column_directions[i]
        {
            sql_bail!("interleaved columns must match parent");
        }
    }

    let mut ancestors = parent_index.interleave.ancestors.clone();
    let mut shared_prefix_len = parent_index.column_ids.len() as u32;
    for ancestor in &ancestors {
        shared_prefix_len -= ancestor.shared_prefix_len;
    }
    ancestors.push(InterleaveAncestor {
        table_id: parent_table.id,
        index_id: parent_index.id,
        shared_prefix_len,
    });
    desc.find_index_by_id_mut(index_id)?.interleave = InterleaveDescriptor { ancestors };

    desc.state = TableState::Add;
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PartitionByType {
    List,
    Range,
}

impl fmt::Display for PartitionByType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PartitionByType::List => f.write_str("LIST"),
            PartitionByType::Range => f.write_str("RANGE"),
        }
    }
}

/// Type-checks the datums in `maybe_tuple` and returns their
/// concatenated table value encoding. The special values `DEFAULT` (list
/// only) and `MAXVALUE` (range only) encode as the reserved NOT NULL
/// marker and are told apart positionally.
fn value_encode_partition_tuple(
    typ: PartitionByType,
    maybe_tuple: &Expr,
    cols: &[ColumnDescriptor],
) -> Result<Vec<u8>, PlanError> {
    let maybe_tuple = maybe_tuple.strip_parens();
    let single;
    let exprs: &[Expr] = match maybe_tuple {
        Expr::Tuple(exprs) => exprs,
        other => {
            // Promote a bare expression to a 1-tuple.
            single = [other.clone()];
            &single
        }
    };

    if exprs.len() != cols.len() {
        sql_bail!(
            "partition has {} columns but {} values were supplied",
            cols.len(),
            exprs.len()
        );
    }

    let mut value = Vec::new();
    for (expr, col) in exprs.iter().zip(cols) {
        match expr {
            Expr::Default => {
                if typ != PartitionByType::List {
                    sql_bail!("DEFAULT cannot be used with PARTITION BY {}", typ);
                }
                // NOT NULL is used to signal DEFAULT.
                encode_not_null_marker(&mut value);
                continue;
            }
            Expr::MaxValue => {
                if typ != PartitionByType::Range {
                    sql_bail!("MAXVALUE cannot be used with PARTITION BY {}", typ);
                }
                // NOT NULL is used to signal MAXVALUE.
                encode_not_null_marker(&mut value);
                continue;
            }
            Expr::Parameter(_) => {
                bail_unsupported!(19464, "placeholders are not supported in PARTITION BY");
            }
            _ => {}
        }

        plan_expr::type_check(expr, &col.typ)?;
        let datum = plan_expr::eval_constant(expr, &col.typ)?;
        if !col.typ.accepts(&datum) {
            sql_bail!(
                "value type {} doesn't match type {} of column \"{}\"",
                datum,
                col.typ,
                col.name
            );
        }
        encode_datum(&mut value, NO_COLUMN_ID, &datum);
    }
    Ok(value)
}

/// Builds the partitioning of `index` from a `PARTITION BY` clause,
/// recursing into subpartitions with the column offset advanced past
/// the columns this level consumed.
pub fn add_partitioned_by(
    desc: &TableDescriptor,
    index: &IndexDescriptor,
    partition_by: &PartitionBy,
    col_offset: usize,
) -> Result<PartitioningDescriptor, PlanError> {
    let mut partitioning = PartitioningDescriptor {
        num_columns: partition_by.fields.len() as u32,
        ..Default::default()
    };

    let mut cols = Vec::with_capacity(partition_by.fields.len());
    for (i, field) in partition_by.fields.iter().enumerate() {
        if col_offset + i >= index.column_names.len() {
            sql_bail!("declared partition columns must match index being partitioned");
        }
        // Search by name: some callers have not allocated column ids
        // yet, so they are still all zero.
        let col = desc.find_active_column_by_name(&index.column_names[col_offset + i])?;
        if normalize::ident(field) != col.name {
            sql_bail!("declared partition columns must match index being partitioned");
        }
        cols.push(col.clone());
    }

    for l in &partition_by.list {
        let mut partition = PartitionList {
            name: normalize::ident(&l.name),
            values: Vec::new(),
            subpartitioning: PartitioningDescriptor::default(),
        };
        for expr in &l.exprs {
            let encoded = value_encode_partition_tuple(PartitionByType::List, expr, &cols)
                .map_err(|err| partition_err(&partition.name, err))?;
            partition.values.push(encoded);
        }
        if let Some(subpartition) = &l.subpartition {
            let new_col_offset = col_offset + partitioning.num_columns as usize;
            partition.subpartitioning =
                add_partitioned_by(desc, index, subpartition, new_col_offset)?;
        }
        partitioning.list.push(partition);
    }
    for r in &partition_by.range {
        let name = normalize::ident(&r.name);
        let encoded = value_encode_partition_tuple(PartitionByType::Range, &r.expr, &cols)
            .map_err(|err| partition_err(&name, err))?;
        if r.subpartition.is_some() {
            sql_bail!("PARTITION {}: cannot subpartition a range partition", name);
        }
        partitioning.range.push(PartitionRange {
            name,
            upper_bound: encoded,
        });
    }

    Ok(partitioning)
}

fn partition_err(name: &str, err: PlanError) -> PlanError {
    match err {
        PlanError::Unstructured(msg) => {
            PlanError::Unstructured(format!("PARTITION {}: {}", name, msg))
        }
        other => other,
    }
}

/// Builds one check constraint: resolves the referenced columns against
/// the table's active columns, substitutes each with a typed dummy so
/// the expression can be checked without binding, and synthesizes a
/// deterministic name when none was given. The stored form is the
/// serialized original expression.
pub fn make_check_constraint(
    desc: &TableDescriptor,
    d: &CheckConstraintDef,
    inuse_names: &mut BTreeSet<String>,
) -> Result<CheckConstraint, PlanError> {
    let given_name = d.name.as_ref().map(normalize::ident);
    let generate_name = given_name.is_none();
    let mut name_buf = String::from("check");

    let constraint_printed = d.expr.to_ast_string();
    let substituted = substitute_check_columns(
        desc,
        &d.expr,
        &constraint_printed,
        generate_name,
        &mut name_buf,
    )?;

    plan_expr::assert_no_aggregation(&substituted, "CHECK expressions")?;
    plan_expr::sanitize_var_free_expr(&substituted, "CHECK")?;

    let mut name = match given_name {
        Some(name) => name,
        None => name_buf,
    };
    if generate_name {
        // If the generated name is taken, append a number until unique.
        if inuse_names.contains(&name) {
            let mut i = 1;
            loop {
                let appended = format!("{}{}", name, i);
                if !inuse_names.contains(&appended) {
                    name = appended;
                    break;
                }
                i += 1;
            }
        }
        inuse_names.insert(name.clone());
    }

    Ok(CheckConstraint {
        name,
        expr: constraint_printed,
    })
}

fn substitute_check_columns(
    desc: &TableDescriptor,
    expr: &Expr,
    constraint: &str,
    generate_name: bool,
    name_buf: &mut String,
) -> Result<Expr, PlanError> {
    match expr {
        Expr::Column(ident) => {
            let col_name = normalize::ident(ident);
            let col = desc.find_active_column_by_name(&col_name).map_err(|_| {
                PlanError::Unstructured(format!(
                    "column \"{}\" not found for constraint \"{}\"",
                    col_name, constraint
                ))
            })?;
            if generate_name {
                name_buf.push('_');
                name_buf.push_str(&col.name);
            }
            Ok(Expr::TypedDummy {
                typ: col.typ.clone(),
            })
        }
        Expr::Nested(inner) => Ok(Expr::Nested(Box::new(substitute_check_columns(
            desc,
            inner,
            constraint,
            generate_name,
            name_buf,
        )?))),
        Expr::Tuple(exprs) => {
            let exprs = exprs
                .iter()
                .map(|e| substitute_check_columns(desc, e, constraint, generate_name, name_buf))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Tuple(exprs))
        }
        Expr::Op { op, expr1, expr2 } => {
            let expr1 = Box::new(substitute_check_columns(
                desc,
                expr1,
                constraint,
                generate_name,
                name_buf,
            )?);
            let expr2 = match expr2 {
                None => None,
                Some(expr2) => Some(Box::new(substitute_check_columns(
                    desc,
                    expr2,
                    constraint,
                    generate_name,
                    name_buf,
                )?)),
            };
            Ok(Expr::Op {
                op: op.clone(),
                expr1,
                expr2,
            })
        }
        Expr::Function { name, args } => {
            let args = args
                .iter()
                .map(|e| substitute_check_columns(desc, e, constraint, generate_name, name_buf))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Function {
                name: name.clone(),
                args,
            })
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::ast::{
        ColumnCheckConstraint, ColumnFkConstraint, ReferenceActions, UnresolvedTableName, Value,
    };

    fn column_with_constraints(name: &str) -> ColumnDef {
        let mut def = ColumnDef::new(Ident::new(name), DataType::Int);
        def.check_exprs.push(ColumnCheckConstraint {
            name: None,
            expr: Expr::Op {
                op: ">".into(),
                expr1: Box::new(Expr::Column(Ident::new(name))),
                expr2: Some(Box::new(Expr::Value(Value::Number("0".into())))),
            },
        });
        def.references = Some(ColumnFkConstraint {
            name: None,
            table: UnresolvedTableName(vec![Ident::new("parent")]),
            column: Some(Ident::new("id")),
            actions: ReferenceActions::default(),
        });
        def
    }

    fn stmt_with(defs: Vec<TableDef>) -> CreateTableStatement {
        CreateTableStatement {
            name: UnresolvedTableName(vec![Ident::new("t")]),
            defs,
            if_not_exists: false,
            interleave: None,
            partition_by: None,
            as_source: None,
            as_column_names: Vec::new(),
        }
    }

    #[test]
    fn hoisting_moves_inline_constraints_to_table_level() {
        let mut stmt = stmt_with(vec![TableDef::Column(column_with_constraints("a"))]);
        hoist_constraints(&mut stmt);

        assert_eq!(stmt.defs.len(), 3);
        match &stmt.defs[0] {
            TableDef::Column(col) => {
                assert!(col.check_exprs.is_empty());
                assert!(col.references.is_none());
            }
            other => panic!("expected column, got {:?}", other),
        }
        match &stmt.defs[1] {
            TableDef::Check(_) => {}
            other => panic!("expected check, got {:?}", other),
        }
        match &stmt.defs[2] {
            TableDef::ForeignKey(fk) => {
                assert_eq!(fk.from_cols, vec![Ident::new("a")]);
                assert_eq!(fk.to_cols, vec![Ident::new("id")]);
            }
            other => panic!("expected foreign key, got {:?}", other),
        }
    }

    proptest! {
        // Hoisting must be idempotent: a second run finds no inline
        // constraints left and changes nothing.
        #[test]
        fn hoisting_is_idempotent(n_cols in 1usize..4) {
            let defs = (0..n_cols)
                .map(|i| TableDef::Column(column_with_constraints(&format!("c{}", i))))
                .collect();
            let mut stmt = stmt_with(defs);
            hoist_constraints(&mut stmt);
            let once = stmt.clone();
            hoist_constraints(&mut stmt);
            prop_assert_eq!(stmt, once);
        }
    }

    #[test]
    fn sequence_defaults_follow_increment_direction() {
        let mut opts = SequenceOpts::default();
        assign_sequence_options(&mut opts, &[]).unwrap();
        assert_eq!((opts.min_value, opts.max_value, opts.start), (1, i64::MAX, 1));

        let mut opts = SequenceOpts::default();
        assign_sequence_options(&mut opts, &[SequenceOption::Increment(-2)]).unwrap();
        assert_eq!((opts.min_value, opts.max_value, opts.start), (i64::MIN, -1, -1));
    }

    #[test]
    fn sequence_bounds_are_validated() {
        let mut opts = SequenceOpts::default();
        assert!(assign_sequence_options(&mut opts, &[SequenceOption::Increment(0)]).is_err());

        let mut opts = SequenceOpts::default();
        assert!(assign_sequence_options(
            &mut opts,
            &[SequenceOption::Start(100), SequenceOption::MaxValue(10)],
        )
        .is_err());

        let mut opts = SequenceOpts::default();
        assert!(assign_sequence_options(&mut opts, &[SequenceOption::Cycle]).is_err());
    }
}
