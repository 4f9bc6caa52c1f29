// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! End-to-end DDL tests: statements run against a bootstrapped
//! in-memory cluster through the same plan/start path the executor
//! uses.

use gr_catalog::descriptor::{MutationDirection, TableState};
use gr_catalog::keys;
use gr_catalog::{DescId, MutationId};
use gr_repr::row;
use gr_repr::Datum;
use gr_sql::ast::{
    ColumnDef, ColumnFkConstraint, CreateDatabaseStatement, CreateIndexStatement,
    CreateSequenceStatement, CreateTableStatement, CreateUserStatement, CreateViewStatement,
    AlterUserSetPasswordStatement, DataType, Expr, Ident, IndexElem, InterleaveDef, ListPartition,
    PartitionBy, Query, ReferenceActions, Select, SelectItem, SequenceOption, SetExpr, Statement,
    TableDef, TableFactor, UniqueConstraintDef, UnresolvedTableName, Value,
};
use gr_sql::testing::TestHarness;

fn name(parts: &[&str]) -> UnresolvedTableName {
    UnresolvedTableName(parts.iter().map(|p| Ident::new(*p)).collect())
}

fn create_database(db: &str) -> Statement {
    Statement::CreateDatabase(CreateDatabaseStatement {
        name: Ident::new(db),
        if_not_exists: false,
        template: None,
        encoding: None,
        collate: None,
        ctype: None,
    })
}

fn column(col: &str, data_type: DataType) -> ColumnDef {
    ColumnDef::new(Ident::new(col), data_type)
}

fn create_table(table: &str, defs: Vec<TableDef>) -> CreateTableStatement {
    CreateTableStatement {
        name: name(&[table]),
        defs,
        if_not_exists: false,
        interleave: None,
        partition_by: None,
        as_source: None,
        as_column_names: Vec::new(),
    }
}

fn index_elem(col: &str) -> IndexElem {
    IndexElem {
        column: Ident::new(col),
        descending: false,
    }
}

fn select_columns(cols: &[&str], from: &str) -> Query {
    Query {
        ctes: Vec::new(),
        body: SetExpr::Select(Box::new(Select {
            distinct: false,
            projection: cols
                .iter()
                .map(|c| SelectItem::Expr {
                    expr: Expr::Column(Ident::new(*c)),
                    alias: None,
                })
                .collect(),
            from: vec![TableFactor::Table {
                name: name(&[from]),
                alias: None,
            }],
            selection: None,
        })),
    }
}

fn harness_with_db() -> TestHarness {
    let mut harness = TestHarness::new();
    harness.run(create_database("db1")).unwrap();
    harness.set_database("db1");
    harness
}

// S1: database creation options.
#[test]
fn create_database_validates_options() {
    let mut harness = TestHarness::new();

    let stmt = Statement::CreateDatabase(CreateDatabaseStatement {
        name: Ident::new("db1"),
        if_not_exists: false,
        template: None,
        encoding: Some("UTF-8".into()),
        collate: None,
        ctype: None,
    });
    harness.run(stmt).unwrap();
    assert_eq!(harness.database("db1").name, "db1");
    assert_eq!(harness.events()[0]["event_type"], "CreateDatabase");

    let stmt = Statement::CreateDatabase(CreateDatabaseStatement {
        name: Ident::new("db1"),
        if_not_exists: false,
        template: None,
        encoding: Some("LATIN1".into()),
        collate: None,
        ctype: None,
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.to_string(), "unsupported encoding: LATIN1");

    let err = harness.run(create_database("db1")).unwrap_err();
    assert_eq!(err.code(), "42P04");

    let stmt = Statement::CreateDatabase(CreateDatabaseStatement {
        name: Ident::new("db1"),
        if_not_exists: true,
        template: None,
        encoding: None,
        collate: None,
        ctype: None,
    });
    harness.run(stmt).unwrap();

    let stmt = Statement::CreateDatabase(CreateDatabaseStatement {
        name: Ident::new("db2"),
        if_not_exists: false,
        template: Some("template1".into()),
        encoding: None,
        collate: None,
        ctype: None,
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.to_string(), "unsupported template: template1");

    let stmt = Statement::CreateDatabase(CreateDatabaseStatement {
        name: Ident::new("db2"),
        if_not_exists: false,
        template: None,
        encoding: None,
        collate: Some("en_US".into()),
        ctype: None,
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.to_string(), "unsupported collation: en_US");

    harness.set_user("alice");
    let err = harness.run(create_database("db3")).unwrap_err();
    assert_eq!(err.code(), "42501");
}

// S2: a self-referencing foreign key resolves against the table being
// created and ends public in the same transaction.
#[test]
fn self_referencing_foreign_key() {
    let mut harness = harness_with_db();

    let mut b = column("b", DataType::Int);
    b.references = Some(ColumnFkConstraint {
        name: None,
        table: name(&["t"]),
        column: Some(Ident::new("a")),
        actions: ReferenceActions::default(),
    });
    let mut a = column("a", DataType::Int);
    a.primary_key = true;
    let stmt = create_table("t", vec![TableDef::Column(a), TableDef::Column(b)]);
    harness.run(Statement::CreateTable(stmt)).unwrap();

    let t = harness.table("db1", "t");
    assert_eq!(t.state, TableState::Public);

    // The referencing side got an auto-created index, named after the
    // generated constraint name.
    assert_eq!(t.indexes.len(), 1);
    let auto = &t.indexes[0];
    assert_eq!(auto.name, "t_auto_index_fk_b_ref_t");
    assert!(!auto.unique);
    let fk = auto.foreign_key.as_ref().unwrap();
    assert_eq!(fk.table, t.id);
    assert_eq!(fk.index, t.primary_index.id);
    assert_eq!(fk.name, "fk_b_ref_t");
    assert_eq!(fk.shared_prefix_len, 1);

    // FK symmetry: exactly one back-reference on the target index.
    let backrefs: Vec<_> = t
        .primary_index
        .referenced_by
        .iter()
        .filter(|r| r.table == t.id && r.index == auto.id)
        .collect();
    assert_eq!(backrefs.len(), 1);
}

// A foreign key into another table leaves the new table in the Add
// state and updates the target atomically.
#[test]
fn foreign_key_to_existing_table() {
    let mut harness = harness_with_db();

    let mut id_col = column("id", DataType::Int);
    id_col.primary_key = true;
    let stmt = create_table("parent", vec![TableDef::Column(id_col)]);
    harness.run(Statement::CreateTable(stmt)).unwrap();
    let parent_before = harness.table("db1", "parent");

    harness.schema_changes.take();

    let mut fk_col = column("pid", DataType::Int);
    fk_col.references = Some(ColumnFkConstraint {
        name: None,
        table: name(&["parent"]),
        column: None, // defaults to the parent's primary key
        actions: ReferenceActions::default(),
    });
    let stmt = create_table("child", vec![TableDef::Column(fk_col)]);
    harness.run(Statement::CreateTable(stmt)).unwrap();

    let child = harness.table("db1", "child");
    let parent = harness.table("db1", "parent");

    // Public only after leases on the parent observe the back-reference.
    assert_eq!(child.state, TableState::Add);
    let auto = &child.indexes[0];
    let fk = auto.foreign_key.as_ref().unwrap();
    assert_eq!(fk.table, parent.id);
    assert_eq!(fk.index, parent.primary_index.id);
    assert_eq!(
        parent
            .primary_index
            .referenced_by
            .iter()
            .filter(|r| r.table == child.id && r.index == auto.id)
            .count(),
        1
    );

    // Version monotonicity on the touched parent.
    assert!(parent.version > parent_before.version);

    // Both the parent save and the adding child rang the schema changer.
    let notifications = harness.schema_changes.take();
    assert!(notifications.contains(&(parent.id, MutationId::INVALID)));
    assert!(notifications.contains(&(child.id, MutationId::INVALID)));
}

#[test]
fn foreign_key_errors() {
    let mut harness = harness_with_db();

    // Missing target.
    let mut fk_col = column("pid", DataType::Int);
    fk_col.references = Some(ColumnFkConstraint {
        name: None,
        table: name(&["nonexistent"]),
        column: None,
        actions: ReferenceActions::default(),
    });
    let stmt = create_table("child", vec![TableDef::Column(fk_col)]);
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "referenced table \"db1.nonexistent\" not found"
    );

    // Target without a matching unique constraint.
    let stmt = create_table("parent", vec![TableDef::Column(column("v", DataType::Int))]);
    harness.run(Statement::CreateTable(stmt)).unwrap();
    let mut fk_col = column("pid", DataType::Int);
    fk_col.references = Some(ColumnFkConstraint {
        name: None,
        table: name(&["parent"]),
        column: Some(Ident::new("v")),
        actions: ReferenceActions::default(),
    });
    let stmt = create_table("child", vec![TableDef::Column(fk_col)]);
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(err.code(), "42830");
    assert!(err
        .to_string()
        .contains("no unique constraint matching given keys"));

    // Type mismatch at the semantic level.
    let mut id_col = column("id", DataType::String { length: None });
    id_col.primary_key = true;
    let stmt = create_table("sparent", vec![TableDef::Column(id_col)]);
    harness.run(Statement::CreateTable(stmt)).unwrap();
    let mut fk_col = column("pid", DataType::Int);
    fk_col.references = Some(ColumnFkConstraint {
        name: None,
        table: name(&["sparent"]),
        column: None,
        actions: ReferenceActions::default(),
    });
    let stmt = create_table("child", vec![TableDef::Column(fk_col)]);
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert!(err.to_string().contains("does not match foreign key"));

    // Unsupported referential action.
    let mut id_col = column("id", DataType::Int);
    id_col.primary_key = true;
    let stmt = create_table("iparent", vec![TableDef::Column(id_col)]);
    harness.run(Statement::CreateTable(stmt)).unwrap();
    let mut fk_col = column("pid", DataType::Int);
    fk_col.references = Some(ColumnFkConstraint {
        name: None,
        table: name(&["iparent"]),
        column: None,
        actions: ReferenceActions {
            on_delete: gr_sql::ast::ReferenceAction::Cascade,
            on_update: gr_sql::ast::ReferenceAction::NoAction,
        },
    });
    let stmt = create_table("child", vec![TableDef::Column(fk_col)]);
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(err.code(), "0A000");
    assert!(err.to_string().contains("ON DELETE CASCADE"));
}

// Width may differ as long as the semantic type matches, and a column
// cannot serve two foreign keys.
#[test]
fn foreign_key_column_rules() {
    let mut harness = harness_with_db();

    let mut id_col = column("id", DataType::String { length: Some(10) });
    id_col.primary_key = true;
    let stmt = create_table("parent", vec![TableDef::Column(id_col)]);
    harness.run(Statement::CreateTable(stmt)).unwrap();

    // STRING references STRING(10): fine.
    let mut fk_col = column("pid", DataType::String { length: None });
    fk_col.references = Some(ColumnFkConstraint {
        name: None,
        table: name(&["parent"]),
        column: None,
        actions: ReferenceActions::default(),
    });
    let stmt = create_table("child", vec![TableDef::Column(fk_col)]);
    harness.run(Statement::CreateTable(stmt)).unwrap();

    // Two FKs from the same column: rejected.
    let stmt = create_table(
        "child2",
        vec![
            TableDef::Column(column("pid", DataType::String { length: None })),
            TableDef::ForeignKey(gr_sql::ast::ForeignKeyDef {
                name: Some(Ident::new("fk1")),
                table: name(&["parent"]),
                from_cols: vec![Ident::new("pid")],
                to_cols: Vec::new(),
                actions: ReferenceActions::default(),
            }),
            TableDef::ForeignKey(gr_sql::ast::ForeignKeyDef {
                name: Some(Ident::new("fk2")),
                table: name(&["parent"]),
                from_cols: vec![Ident::new("pid")],
                to_cols: Vec::new(),
                actions: ReferenceActions::default(),
            }),
        ],
    );
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(err.code(), "42830");
    assert!(err
        .to_string()
        .contains("columns cannot be used by multiple foreign key constraints"));
}

// S3: interleaved child tables wire into the parent's key space, with
// back-references installed when the transaction finalizes.
#[test]
fn interleave_in_parent() {
    let mut harness = harness_with_db();

    let mut pid = column("pid", DataType::Int);
    pid.primary_key = true;
    let stmt = create_table("parent", vec![TableDef::Column(pid)]);
    harness.run(Statement::CreateTable(stmt)).unwrap();

    let mut stmt = create_table(
        "child",
        vec![
            TableDef::Column(column("pid", DataType::Int)),
            TableDef::Column(column("cid", DataType::Int)),
            TableDef::UniqueConstraint(UniqueConstraintDef {
                name: None,
                primary: true,
                columns: vec![index_elem("pid"), index_elem("cid")],
                storing: Vec::new(),
                interleave: None,
                partition_by: None,
            }),
        ],
    );
    stmt.interleave = Some(InterleaveDef {
        parent: name(&["parent"]),
        fields: vec![Ident::new("pid")],
        drop_behavior: gr_sql::ast::DropBehavior::Default,
    });
    harness.run(Statement::CreateTable(stmt)).unwrap();

    let parent = harness.table("db1", "parent");
    let child = harness.table("db1", "child");

    assert_eq!(child.primary_index.interleave.ancestors.len(), 1);
    let ancestor = child.primary_index.interleave.ancestors[0];
    assert_eq!(ancestor.table_id, parent.id);
    assert_eq!(ancestor.index_id, parent.primary_index.id);
    assert_eq!(ancestor.shared_prefix_len, 1);

    // Interleave symmetry: the deepest ancestor lists the child.
    assert_eq!(
        parent
            .primary_index
            .interleaved_by
            .iter()
            .filter(|r| r.table == child.id && r.index == child.primary_index.id)
            .count(),
        1
    );

    // The child went Add -> Public within the transaction.
    assert_eq!(child.state, TableState::Public);
    assert!(child.version > 1);
    assert!(parent.version > 1);
}

#[test]
fn interleave_mismatches_are_rejected() {
    let mut harness = harness_with_db();

    let stmt = create_table(
        "parent",
        vec![
            TableDef::Column(column("p1", DataType::Int)),
            TableDef::Column(column("p2", DataType::Int)),
            TableDef::UniqueConstraint(UniqueConstraintDef {
                name: None,
                primary: true,
                columns: vec![index_elem("p1"), index_elem("p2")],
                storing: Vec::new(),
                interleave: None,
                partition_by: None,
            }),
        ],
    );
    harness.run(Statement::CreateTable(stmt)).unwrap();

    // Fewer interleave fields than the parent's primary key columns.
    let mut p1 = column("p1", DataType::Int);
    p1.primary_key = true;
    let mut stmt = create_table("child", vec![TableDef::Column(p1)]);
    stmt.interleave = Some(InterleaveDef {
        parent: name(&["parent"]),
        fields: vec![Ident::new("p1")],
        drop_behavior: gr_sql::ast::DropBehavior::Default,
    });
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(err.to_string(), "interleaved columns must match parent");

    // Field names must match the child index's columns in order.
    let mut x = column("x", DataType::Int);
    x.primary_key = true;
    let mut y = column("y", DataType::Int);
    y.primary_key = false;
    let mut stmt = create_table(
        "child",
        vec![
            TableDef::Column(x),
            TableDef::Column(y),
            TableDef::UniqueConstraint(UniqueConstraintDef {
                name: None,
                primary: false,
                columns: vec![index_elem("y")],
                storing: Vec::new(),
                interleave: None,
                partition_by: None,
            }),
        ],
    );
    stmt.interleave = Some(InterleaveDef {
        parent: name(&["parent"]),
        fields: vec![Ident::new("p1"), Ident::new("p2")],
        drop_behavior: gr_sql::ast::DropBehavior::Default,
    });
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "declared columns must match index being interleaved"
    );

    // Column types must match the parent exactly.
    let mut s1 = column("p1", DataType::String { length: None });
    s1.primary_key = false;
    let mut stmt = create_table(
        "child",
        vec![
            TableDef::Column(s1),
            TableDef::Column(column("p2", DataType::Int)),
            TableDef::UniqueConstraint(UniqueConstraintDef {
                name: None,
                primary: true,
                columns: vec![index_elem("p1"), index_elem("p2")],
                storing: Vec::new(),
                interleave: None,
                partition_by: None,
            }),
        ],
    );
    stmt.interleave = Some(InterleaveDef {
        parent: name(&["parent"]),
        fields: vec![Ident::new("p1"), Ident::new("p2")],
        drop_behavior: gr_sql::ast::DropBehavior::Default,
    });
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(err.to_string(), "interleaved columns must match parent");
}

// S4: user creation and password changes.
#[test]
fn create_and_alter_users() {
    let mut harness = TestHarness::new();

    let stmt = Statement::CreateUser(CreateUserStatement {
        name: Expr::Value(Value::String("alice".into())),
        password: Some(Expr::Value(Value::String("".into()))),
        if_not_exists: false,
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.to_string(), "empty passwords are not permitted");

    // No PASSWORD clause at all: allowed, password auth disabled.
    let stmt = Statement::CreateUser(CreateUserStatement {
        name: Expr::Value(Value::String("Alice".into())),
        password: None,
        if_not_exists: false,
    });
    let plan = harness.run(stmt).unwrap();
    assert_eq!(plan.fast_path_results(), Some(1));

    let stmt = Statement::CreateUser(CreateUserStatement {
        name: Expr::Value(Value::String("alice".into())),
        password: None,
        if_not_exists: true,
    });
    let plan = harness.run(stmt).unwrap();
    assert_eq!(plan.fast_path_results(), Some(0));

    let stmt = Statement::CreateUser(CreateUserStatement {
        name: Expr::Value(Value::String("alice".into())),
        password: None,
        if_not_exists: false,
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.code(), "23505");
    assert_eq!(err.to_string(), "user alice already exists");

    let stmt = Statement::AlterUserSetPassword(AlterUserSetPasswordStatement {
        name: Expr::Value(Value::String("bob".into())),
        password: Expr::Value(Value::String("hunter2".into())),
        if_exists: false,
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.to_string(), "user bob does not exist");

    let stmt = Statement::AlterUserSetPassword(AlterUserSetPasswordStatement {
        name: Expr::Value(Value::String("bob".into())),
        password: Expr::Value(Value::String("hunter2".into())),
        if_exists: true,
    });
    let plan = harness.run(stmt).unwrap();
    assert_eq!(plan.fast_path_results(), Some(0));

    let stmt = Statement::AlterUserSetPassword(AlterUserSetPasswordStatement {
        name: Expr::Value(Value::String("alice".into())),
        password: Expr::Value(Value::String("hunter2".into())),
        if_exists: false,
    });
    let plan = harness.run(stmt).unwrap();
    assert_eq!(plan.fast_path_results(), Some(1));

    // Invalid usernames never reach the users table.
    let stmt = Statement::CreateUser(CreateUserStatement {
        name: Expr::Value(Value::String("not valid".into())),
        password: None,
        if_not_exists: false,
    });
    let err = harness.run(stmt).unwrap_err();
    assert!(err.to_string().contains("invalid"));
}

// S5: CREATE INDEX queues a mutation, records the job and event, and
// rings the schema changer exactly once.
#[test]
fn create_index_schedules_backfill() {
    let mut harness = harness_with_db();

    let mut a = column("a", DataType::Int);
    a.primary_key = true;
    let stmt = create_table(
        "t",
        vec![TableDef::Column(a), TableDef::Column(column("b", DataType::Int))],
    );
    harness.run(Statement::CreateTable(stmt)).unwrap();
    let before = harness.table("db1", "t");
    harness.schema_changes.take();

    let stmt = Statement::CreateIndex(CreateIndexStatement {
        name: Ident::new("idx"),
        table: name(&["t"]),
        unique: false,
        if_not_exists: false,
        columns: vec![index_elem("b")],
        storing: Vec::new(),
        interleave: None,
        partition_by: None,
    });
    harness.run(stmt).unwrap();

    let t = harness.table("db1", "t");
    assert_eq!(t.mutations.len(), 1);
    let mutation = &t.mutations[0];
    assert_eq!(mutation.direction, MutationDirection::Add);
    assert_eq!(mutation.mutation_id, MutationId(1));
    assert_eq!(mutation.index.name, "idx");
    assert!(!mutation.index.unique);
    assert!(t.version > before.version);

    let jobs = harness.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].desc_id, t.id);
    assert_eq!(jobs[0].mutation_id, MutationId(1));
    assert!(jobs[0].statement.contains("CREATE INDEX"));

    let events = harness.events();
    assert_eq!(
        events.last().unwrap()["event_type"],
        serde_json::json!("CreateIndex")
    );

    let notifications = harness.schema_changes.take();
    assert_eq!(notifications, vec![(t.id, MutationId(1))]);

    // The same index again: IF NOT EXISTS is silent, otherwise an error.
    let stmt = Statement::CreateIndex(CreateIndexStatement {
        name: Ident::new("idx"),
        table: name(&["t"]),
        unique: false,
        if_not_exists: true,
        columns: vec![index_elem("b")],
        storing: Vec::new(),
        interleave: None,
        partition_by: None,
    });
    harness.run(stmt).unwrap();
    let stmt = Statement::CreateIndex(CreateIndexStatement {
        name: Ident::new("idx"),
        table: name(&["t"]),
        unique: false,
        if_not_exists: false,
        columns: vec![index_elem("b")],
        storing: Vec::new(),
        interleave: None,
        partition_by: None,
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.code(), "42P07");
}

// S6: unnamed check constraints get deterministic names.
#[test]
fn check_constraint_naming() {
    let mut harness = harness_with_db();

    let gt = |col: &str, op: &str, n: &str| {
        Expr::Op {
            op: op.into(),
            expr1: Box::new(Expr::Column(Ident::new(col))),
            expr2: Some(Box::new(Expr::Value(Value::Number(n.into())))),
        }
    };
    let stmt = create_table(
        "t",
        vec![
            TableDef::Column(column("a", DataType::Int)),
            TableDef::Check(gr_sql::ast::CheckConstraintDef {
                name: None,
                expr: gt("a", ">", "0"),
            }),
            TableDef::Check(gr_sql::ast::CheckConstraintDef {
                name: None,
                expr: gt("a", "<", "10"),
            }),
        ],
    );
    harness.run(Statement::CreateTable(stmt)).unwrap();

    let t = harness.table("db1", "t");
    assert_eq!(t.checks.len(), 2);
    assert_eq!(t.checks[0].name, "check_a");
    assert_eq!(t.checks[1].name, "check_a1");
    assert_eq!(t.checks[0].expr, "a > 0");
    assert_eq!(t.checks[1].expr, "a < 10");

    // Unknown columns and non-bool expressions are rejected.
    let stmt = create_table(
        "t2",
        vec![
            TableDef::Column(column("a", DataType::Int)),
            TableDef::Check(gr_sql::ast::CheckConstraintDef {
                name: None,
                expr: gt("b", ">", "0"),
            }),
        ],
    );
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert!(err.to_string().contains("column \"b\" not found"));

    let stmt = create_table(
        "t2",
        vec![
            TableDef::Column(column("a", DataType::Int)),
            TableDef::Check(gr_sql::ast::CheckConstraintDef {
                name: None,
                expr: Expr::Value(Value::Number("1".into())),
            }),
        ],
    );
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert!(err.to_string().contains("type bool"));
}

#[test]
fn create_view_records_dependencies() {
    let mut harness = harness_with_db();

    let mut a = column("a", DataType::Int);
    a.primary_key = true;
    let stmt = create_table(
        "t",
        vec![TableDef::Column(a), TableDef::Column(column("b", DataType::String { length: None }))],
    );
    harness.run(Statement::CreateTable(stmt)).unwrap();
    let t_before = harness.table("db1", "t");

    let stmt = Statement::CreateView(CreateViewStatement {
        name: name(&["v"]),
        column_names: vec![Ident::new("x"), Ident::new("y")],
        query: select_columns(&["a", "b"], "t"),
    });
    harness.run(stmt).unwrap();

    let v = harness.table("db1", "v");
    let t = harness.table("db1", "t");

    // The stored query is fully qualified and stable-quoted.
    assert_eq!(
        v.view_query.as_deref(),
        Some("SELECT \"a\", \"b\" FROM \"db1\".\"t\"")
    );
    assert_eq!(v.state, TableState::Public);
    assert_eq!(v.columns.len(), 2);
    assert_eq!(v.columns[0].name, "x");
    assert_eq!(v.columns[1].name, "y");

    // Dependency symmetry.
    assert_eq!(v.depends_on, vec![t.id]);
    assert_eq!(
        t.depended_on_by.iter().filter(|r| r.id == v.id).count(),
        1
    );
    assert!(t.version > t_before.version);

    // Mismatched alias list.
    let stmt = Statement::CreateView(CreateViewStatement {
        name: name(&["v2"]),
        column_names: vec![Ident::new("only_one")],
        query: select_columns(&["a", "b"], "t"),
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(
        err.to_string(),
        "CREATE VIEW specifies 1 column name, but data source has 2 columns"
    );

    // Duplicate view name.
    let stmt = Statement::CreateView(CreateViewStatement {
        name: name(&["v"]),
        column_names: Vec::new(),
        query: select_columns(&["a"], "t"),
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.code(), "42P07");
}

#[test]
fn create_table_as_uses_source_columns() {
    let mut harness = harness_with_db();

    let mut a = column("a", DataType::Int);
    a.primary_key = true;
    let stmt = create_table(
        "t",
        vec![TableDef::Column(a), TableDef::Column(column("b", DataType::String { length: None }))],
    );
    harness.run(Statement::CreateTable(stmt)).unwrap();

    let mut stmt = create_table("t2", Vec::new());
    stmt.as_source = Some(select_columns(&["a", "b"], "t"));
    stmt.as_column_names = vec![Ident::new("x"), Ident::new("y")];
    harness.run(Statement::CreateTable(stmt)).unwrap();

    let t2 = harness.table("db1", "t2");
    assert_eq!(t2.state, TableState::Public);
    let names: Vec<_> = t2
        .columns
        .iter()
        .filter(|c| !c.hidden)
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["x", "y"]);
    // AS columns default to nullable; the hidden rowid backs the key.
    assert!(t2.columns.iter().filter(|c| !c.hidden).all(|c| c.nullable));
    assert!(t2.columns.iter().any(|c| c.hidden));

    // Column-name count mismatch is caught at planning.
    let mut stmt = create_table("t3", Vec::new());
    stmt.as_source = Some(select_columns(&["a", "b"], "t"));
    stmt.as_column_names = vec![Ident::new("x")];
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "CREATE TABLE specifies 1 column name, but data source has 2 columns"
    );
}

#[test]
fn create_sequence_initializes_value() {
    let mut harness = harness_with_db();

    let stmt = Statement::CreateSequence(CreateSequenceStatement {
        name: name(&["s"]),
        if_not_exists: false,
        options: vec![SequenceOption::Increment(2), SequenceOption::Start(5)],
    });
    harness.run(stmt).unwrap();

    let s = harness.table("db1", "s");
    let opts = s.sequence_opts.as_ref().unwrap();
    assert_eq!(opts.increment, 2);
    assert_eq!(opts.start, 5);
    assert!(!opts.cycle);

    // The value counter sits one increment before START.
    let entries = harness
        .store
        .entries_with_prefix(&keys::sequence_value_key(s.id));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, 3i64.to_be_bytes().to_vec());

    // IF NOT EXISTS tolerates the duplicate; otherwise it errors.
    let stmt = Statement::CreateSequence(CreateSequenceStatement {
        name: name(&["s"]),
        if_not_exists: true,
        options: Vec::new(),
    });
    harness.run(stmt).unwrap();
    let stmt = Statement::CreateSequence(CreateSequenceStatement {
        name: name(&["s"]),
        if_not_exists: false,
        options: Vec::new(),
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.code(), "42P07");
}

#[test]
fn partitioning_encodes_values() {
    let mut harness = harness_with_db();

    let mut a = column("a", DataType::Int);
    a.primary_key = true;
    let mut stmt = create_table("t", vec![TableDef::Column(a)]);
    stmt.partition_by = Some(PartitionBy {
        fields: vec![Ident::new("a")],
        list: vec![
            ListPartition {
                name: Ident::new("p0"),
                exprs: vec![
                    Expr::Nested(Box::new(Expr::Value(Value::Number("1".into())))),
                    Expr::Value(Value::Number("2".into())),
                ],
                subpartition: None,
            },
            ListPartition {
                name: Ident::new("pd"),
                exprs: vec![Expr::Default],
                subpartition: None,
            },
        ],
        range: Vec::new(),
    });
    harness.run(Statement::CreateTable(stmt)).unwrap();

    let t = harness.table("db1", "t");
    let partitioning = &t.primary_index.partitioning;
    assert_eq!(partitioning.num_columns, 1);
    assert_eq!(partitioning.list.len(), 2);

    let mut one = Vec::new();
    row::encode_datum(&mut one, row::NO_COLUMN_ID, &Datum::Int64(1));
    let mut two = Vec::new();
    row::encode_datum(&mut two, row::NO_COLUMN_ID, &Datum::Int64(2));
    assert_eq!(partitioning.list[0].values, vec![one, two]);

    // DEFAULT encodes as the reserved NOT NULL / no-column marker.
    let mut marker = Vec::new();
    row::encode_not_null_marker(&mut marker);
    assert_eq!(partitioning.list[1].values, vec![marker]);
}

#[test]
fn partitioning_rejects_misuse() {
    let mut harness = harness_with_db();

    let pk = |table: &str| {
        let mut a = column("a", DataType::Int);
        a.primary_key = true;
        create_table(table, vec![TableDef::Column(a)])
    };

    // MAXVALUE under LIST.
    let mut stmt = pk("t1");
    stmt.partition_by = Some(PartitionBy {
        fields: vec![Ident::new("a")],
        list: vec![ListPartition {
            name: Ident::new("p0"),
            exprs: vec![Expr::MaxValue],
            subpartition: None,
        }],
        range: Vec::new(),
    });
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert!(err
        .to_string()
        .contains("MAXVALUE cannot be used with PARTITION BY LIST"));

    // Placeholders.
    let mut stmt = pk("t2");
    stmt.partition_by = Some(PartitionBy {
        fields: vec![Ident::new("a")],
        list: vec![ListPartition {
            name: Ident::new("p0"),
            exprs: vec![Expr::Parameter(1)],
            subpartition: None,
        }],
        range: Vec::new(),
    });
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(err.code(), "0A000");

    // Subpartition of a range partition.
    let mut stmt = pk("t3");
    stmt.partition_by = Some(PartitionBy {
        fields: vec![Ident::new("a")],
        list: Vec::new(),
        range: vec![gr_sql::ast::RangePartition {
            name: Ident::new("r0"),
            expr: Expr::Value(Value::Number("10".into())),
            subpartition: Some(Box::new(PartitionBy {
                fields: vec![Ident::new("a")],
                list: Vec::new(),
                range: Vec::new(),
            })),
        }],
    });
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert!(err.to_string().contains("cannot subpartition"));

    // Wrong tuple arity.
    let mut stmt = pk("t4");
    stmt.partition_by = Some(PartitionBy {
        fields: vec![Ident::new("a")],
        list: vec![ListPartition {
            name: Ident::new("p0"),
            exprs: vec![Expr::Tuple(vec![
                Expr::Value(Value::Number("1".into())),
                Expr::Value(Value::Number("2".into())),
            ])],
            subpartition: None,
        }],
        range: Vec::new(),
    });
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert!(err
        .to_string()
        .contains("partition has 1 columns but 2 values were supplied"));
}

#[test]
fn relation_name_conflicts() {
    let mut harness = harness_with_db();

    let stmt = create_table("t", vec![TableDef::Column(column("a", DataType::Int))]);
    harness.run(Statement::CreateTable(stmt)).unwrap();

    let stmt = create_table("t", vec![TableDef::Column(column("a", DataType::Int))]);
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(err.code(), "42P07");

    let mut stmt = create_table("t", vec![TableDef::Column(column("a", DataType::Int))]);
    stmt.if_not_exists = true;
    harness.run(Statement::CreateTable(stmt)).unwrap();

    // Naming uniqueness across everything created so far: any two
    // entries under one parent with the same name share an id, and ids
    // are never reused across names.
    let entries = harness
        .store
        .entries_with_prefix(&keys::namespace_prefix());
    let mut ids: Vec<DescId> = entries
        .iter()
        .map(|(_, raw)| keys::decode_id(raw).unwrap())
        .collect();
    ids.sort();
    let len_before = ids.len();
    ids.dedup();
    assert_eq!(ids.len(), len_before);
}

#[test]
fn privileges_gate_ddl() {
    let mut harness = harness_with_db();
    harness.set_user("alice");

    let stmt = create_table("t", vec![TableDef::Column(column("a", DataType::Int))]);
    let err = harness.run(Statement::CreateTable(stmt)).unwrap_err();
    assert_eq!(err.code(), "42501");
    assert!(err.to_string().contains("CREATE"));

    let stmt = Statement::CreateUser(CreateUserStatement {
        name: Expr::Value(Value::String("mallory".into())),
        password: None,
        if_not_exists: false,
    });
    let err = harness.run(stmt).unwrap_err();
    assert_eq!(err.code(), "42501");
    assert!(err.to_string().contains("INSERT"));
}

#[test]
fn failed_statements_leave_no_state() {
    let mut harness = harness_with_db();

    // The table descriptor write happens before FK resolution fails, but
    // the transaction aborts, so nothing survives.
    let mut fk_col = column("pid", DataType::Int);
    fk_col.references = Some(ColumnFkConstraint {
        name: None,
        table: name(&["missing"]),
        column: None,
        actions: ReferenceActions::default(),
    });
    let stmt = create_table("ghost", vec![TableDef::Column(fk_col)]);
    harness.run(Statement::CreateTable(stmt)).unwrap_err();

    let mut txn = harness.store.begin();
    assert!(
        gr_catalog::store::get_table_desc(&mut txn, "db1", "ghost")
            .unwrap()
            .is_none()
    );
}
