// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The statement AST consumed by the DDL core.
//!
//! The parser lives upstream and is assumed to produce well-formed
//! trees; nothing here validates syntax. The definitions cover exactly
//! the DDL surface the core plans, plus enough of the query grammar for
//! a view's source query to be traversed, rewritten, and re-serialized.

use std::fmt;

use gr_repr::ScalarType;

use crate::ast::display::{
    self, comma_separated, escape_single_quote_string, AstDisplay, AstFormatter,
};
use crate::ast::display::impl_display;

/// An identifier as written, with original quoting discarded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident(pub String);

impl Ident {
    pub fn new<S: Into<String>>(s: S) -> Ident {
        Ident(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_bare(&self) -> bool {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(ch) if ch.is_ascii_lowercase() || ch == '_' => {}
            _ => return false,
        }
        chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
    }
}

impl AstDisplay for Ident {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        if self.is_bare() && !f.stable() {
            f.write_str(&self.0);
        } else {
            f.write_str("\"");
            f.write_str(self.0.replace('"', "\"\""));
            f.write_str("\"");
        }
    }
}
impl_display!(Ident);

/// A possibly partially qualified table name: `[database.]table`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnresolvedTableName(pub Vec<Ident>);

impl AstDisplay for UnresolvedTableName {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_node(&display::separated(&self.0, "."));
    }
}
impl_display!(UnresolvedTableName);

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// A numeric literal, kept as written.
    Number(String),
    String(String),
    Boolean(bool),
    Null,
}

impl AstDisplay for Value {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            Value::Number(n) => f.write_str(n),
            Value::String(s) => {
                f.write_str("'");
                f.write_str(&escape_single_quote_string(s));
                f.write_str("'");
            }
            Value::Boolean(true) => f.write_str("true"),
            Value::Boolean(false) => f.write_str("false"),
            Value::Null => f.write_str("NULL"),
        }
    }
}
impl_display!(Value);

/// A scalar expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A reference to a column by name.
    Column(Ident),
    Value(Value),
    /// `DEFAULT`, legal only as a `PARTITION BY LIST` value.
    Default,
    /// `MAXVALUE`, legal only as a `PARTITION BY RANGE` bound.
    MaxValue,
    /// `$n`.
    Parameter(usize),
    /// `(a, b, ...)` with more than one element, or a trailing comma.
    Tuple(Vec<Expr>),
    /// A parenthesized expression.
    Nested(Box<Expr>),
    /// A unary or binary operator application.
    Op {
        op: String,
        expr1: Box<Expr>,
        expr2: Option<Box<Expr>>,
    },
    Function {
        name: Ident,
        args: Vec<Expr>,
    },
    /// A placeholder carrying only a type, substituted for column
    /// references while type-checking check constraints. It implements
    /// the full expression surface, but evaluating it is a bug; it must
    /// never survive into a stored expression.
    TypedDummy { typ: ScalarType },
}

impl Expr {
    /// Removes any number of enclosing parentheses.
    pub fn strip_parens(&self) -> &Expr {
        match self {
            Expr::Nested(inner) => inner.strip_parens(),
            other => other,
        }
    }
}

impl AstDisplay for Expr {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            Expr::Column(name) => f.write_node(name),
            Expr::Value(v) => f.write_node(v),
            Expr::Default => f.write_str("DEFAULT"),
            Expr::MaxValue => f.write_str("MAXVALUE"),
            Expr::Parameter(n) => f.write_str(format!("${}", n)),
            Expr::Tuple(exprs) => {
                f.write_str("(");
                f.write_node(&comma_separated(exprs));
                f.write_str(")");
            }
            Expr::Nested(expr) => {
                f.write_str("(");
                f.write_node(&**expr);
                f.write_str(")");
            }
            Expr::Op { op, expr1, expr2 } => match expr2 {
                None => {
                    f.write_str(op);
                    // Word operators like NOT need the separator;
                    // symbolic ones like unary minus read better bare.
                    if op.chars().all(|ch| ch.is_ascii_alphabetic()) {
                        f.write_str(" ");
                    }
                    f.write_node(&**expr1);
                }
                Some(expr2) => {
                    f.write_node(&**expr1);
                    f.write_str(" ");
                    f.write_str(op);
                    f.write_str(" ");
                    f.write_node(&**expr2);
                }
            },
            Expr::Function { name, args } => {
                f.write_node(name);
                f.write_str("(");
                f.write_node(&comma_separated(args));
                f.write_str(")");
            }
            Expr::TypedDummy { typ } => {
                f.write_str(format!("<{}>", typ));
            }
        }
    }
}
impl_display!(Expr);

/// A column's declared SQL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Bool,
    Int,
    Float,
    String { length: Option<u64> },
    Bytes,
    Timestamp,
    Vector,
}

impl AstDisplay for DataType {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            DataType::Bool => f.write_str("BOOL"),
            DataType::Int => f.write_str("INT"),
            DataType::Float => f.write_str("FLOAT"),
            DataType::String { length: None } => f.write_str("STRING"),
            DataType::String { length: Some(n) } => f.write_str(format!("STRING({})", n)),
            DataType::Bytes => f.write_str("BYTES"),
            DataType::Timestamp => f.write_str("TIMESTAMP"),
            DataType::Vector => f.write_str("VECTOR"),
        }
    }
}
impl_display!(DataType);

/// The nullability written on a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    /// Nothing written; nullable unless a primary key claims the column.
    Default,
    NotNull,
    Null,
}

/// An inline `CHECK` on a column, prior to hoisting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCheckConstraint {
    pub name: Option<Ident>,
    pub expr: Expr,
}

/// An inline `REFERENCES` on a column, prior to hoisting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFkConstraint {
    pub name: Option<Ident>,
    pub table: UnresolvedTableName,
    /// The referenced column; the target's primary key when omitted.
    pub column: Option<Ident>,
    pub actions: ReferenceActions,
}

/// `ON DELETE` / `ON UPDATE` actions on a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReferenceActions {
    pub on_delete: ReferenceAction,
    pub on_update: ReferenceAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl AstDisplay for ReferenceAction {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            ReferenceAction::NoAction => f.write_str("NO ACTION"),
            ReferenceAction::Restrict => f.write_str("RESTRICT"),
            ReferenceAction::Cascade => f.write_str("CASCADE"),
            ReferenceAction::SetNull => f.write_str("SET NULL"),
            ReferenceAction::SetDefault => f.write_str("SET DEFAULT"),
        }
    }
}
impl_display!(ReferenceAction);

/// A column definition within `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: Ident,
    pub data_type: DataType,
    pub nullability: Nullability,
    pub default: Option<Expr>,
    pub primary_key: bool,
    pub unique: bool,
    pub family: Option<Ident>,
    pub check_exprs: Vec<ColumnCheckConstraint>,
    pub references: Option<ColumnFkConstraint>,
}

impl ColumnDef {
    pub fn new(name: Ident, data_type: DataType) -> ColumnDef {
        ColumnDef {
            name,
            data_type,
            nullability: Nullability::Default,
            default: None,
            primary_key: false,
            unique: false,
            family: None,
            check_exprs: Vec::new(),
            references: None,
        }
    }

    pub fn has_fk_constraint(&self) -> bool {
        self.references.is_some()
    }
}

impl AstDisplay for ColumnDef {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_node(&self.name);
        f.write_str(" ");
        f.write_node(&self.data_type);
        match self.nullability {
            Nullability::Default => {}
            Nullability::NotNull => f.write_str(" NOT NULL"),
            Nullability::Null => f.write_str(" NULL"),
        }
        if let Some(default) = &self.default {
            f.write_str(" DEFAULT ");
            f.write_node(default);
        }
        if self.primary_key {
            f.write_str(" PRIMARY KEY");
        } else if self.unique {
            f.write_str(" UNIQUE");
        }
        if let Some(family) = &self.family {
            f.write_str(" FAMILY ");
            f.write_node(family);
        }
        for check in &self.check_exprs {
            if let Some(name) = &check.name {
                f.write_str(" CONSTRAINT ");
                f.write_node(name);
            }
            f.write_str(" CHECK (");
            f.write_node(&check.expr);
            f.write_str(")");
        }
        if let Some(fk) = &self.references {
            if let Some(name) = &fk.name {
                f.write_str(" CONSTRAINT ");
                f.write_node(name);
            }
            f.write_str(" REFERENCES ");
            f.write_node(&fk.table);
            if let Some(column) = &fk.column {
                f.write_str(" (");
                f.write_node(column);
                f.write_str(")");
            }
        }
    }
}
impl_display!(ColumnDef);

/// One column of an index, with its sort direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexElem {
    pub column: Ident,
    pub descending: bool,
}

impl AstDisplay for IndexElem {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_node(&self.column);
        if self.descending {
            f.write_str(" DESC");
        }
    }
}
impl_display!(IndexElem);

/// An `INTERLEAVE IN PARENT` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleaveDef {
    pub parent: UnresolvedTableName,
    pub fields: Vec<Ident>,
    pub drop_behavior: DropBehavior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropBehavior {
    #[default]
    Default,
    Restrict,
    Cascade,
}

impl AstDisplay for InterleaveDef {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("INTERLEAVE IN PARENT ");
        f.write_node(&self.parent);
        f.write_str(" (");
        f.write_node(&comma_separated(&self.fields));
        f.write_str(")");
        match self.drop_behavior {
            DropBehavior::Default => {}
            DropBehavior::Restrict => f.write_str(" RESTRICT"),
            DropBehavior::Cascade => f.write_str(" CASCADE"),
        }
    }
}
impl_display!(InterleaveDef);

/// A `PARTITION BY` clause. Exactly one of `list` and `range` is
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionBy {
    pub fields: Vec<Ident>,
    pub list: Vec<ListPartition>,
    pub range: Vec<RangePartition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPartition {
    pub name: Ident,
    pub exprs: Vec<Expr>,
    pub subpartition: Option<Box<PartitionBy>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePartition {
    pub name: Ident,
    pub expr: Expr,
    pub subpartition: Option<Box<PartitionBy>>,
}

impl AstDisplay for PartitionBy {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        if !self.list.is_empty() {
            f.write_str("PARTITION BY LIST (");
        } else {
            f.write_str("PARTITION BY RANGE (");
        }
        f.write_node(&comma_separated(&self.fields));
        f.write_str(") (");
        let mut delim = "";
        for l in &self.list {
            f.write_str(delim);
            delim = ", ";
            f.write_str("PARTITION ");
            f.write_node(&l.name);
            f.write_str(" VALUES IN (");
            f.write_node(&comma_separated(&l.exprs));
            f.write_str(")");
            if let Some(sub) = &l.subpartition {
                f.write_str(" ");
                f.write_node(&**sub);
            }
        }
        for r in &self.range {
            f.write_str(delim);
            delim = ", ";
            f.write_str("PARTITION ");
            f.write_node(&r.name);
            f.write_str(" VALUES < ");
            f.write_node(&r.expr);
            if let Some(sub) = &r.subpartition {
                f.write_str(" ");
                f.write_node(&**sub);
            }
        }
        f.write_str(")");
    }
}
impl_display!(PartitionBy);

/// One definition in a `CREATE TABLE` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableDef {
    Column(ColumnDef),
    Index(IndexDef),
    UniqueConstraint(UniqueConstraintDef),
    Check(CheckConstraintDef),
    ForeignKey(ForeignKeyDef),
    Family(FamilyDef),
}

impl AstDisplay for TableDef {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            TableDef::Column(def) => f.write_node(def),
            TableDef::Index(def) => f.write_node(def),
            TableDef::UniqueConstraint(def) => f.write_node(def),
            TableDef::Check(def) => f.write_node(def),
            TableDef::ForeignKey(def) => f.write_node(def),
            TableDef::Family(def) => f.write_node(def),
        }
    }
}
impl_display!(TableDef);

/// A table-level (non-unique) `INDEX` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: Option<Ident>,
    pub columns: Vec<IndexElem>,
    pub storing: Vec<Ident>,
    pub interleave: Option<InterleaveDef>,
    pub partition_by: Option<PartitionBy>,
}

impl AstDisplay for IndexDef {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("INDEX ");
        if let Some(name) = &self.name {
            f.write_node(name);
            f.write_str(" ");
        }
        f.write_str("(");
        f.write_node(&comma_separated(&self.columns));
        f.write_str(")");
        if !self.storing.is_empty() {
            f.write_str(" STORING (");
            f.write_node(&comma_separated(&self.storing));
            f.write_str(")");
        }
        if let Some(interleave) = &self.interleave {
            f.write_str(" ");
            f.write_node(interleave);
        }
        if let Some(partition_by) = &self.partition_by {
            f.write_str(" ");
            f.write_node(partition_by);
        }
    }
}
impl_display!(IndexDef);

/// A table-level `UNIQUE` or `PRIMARY KEY` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraintDef {
    pub name: Option<Ident>,
    pub primary: bool,
    pub columns: Vec<IndexElem>,
    pub storing: Vec<Ident>,
    pub interleave: Option<InterleaveDef>,
    pub partition_by: Option<PartitionBy>,
}

impl AstDisplay for UniqueConstraintDef {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        if let Some(name) = &self.name {
            f.write_str("CONSTRAINT ");
            f.write_node(name);
            f.write_str(" ");
        }
        if self.primary {
            f.write_str("PRIMARY KEY (");
        } else {
            f.write_str("UNIQUE (");
        }
        f.write_node(&comma_separated(&self.columns));
        f.write_str(")");
        if !self.storing.is_empty() {
            f.write_str(" STORING (");
            f.write_node(&comma_separated(&self.storing));
            f.write_str(")");
        }
        if let Some(interleave) = &self.interleave {
            f.write_str(" ");
            f.write_node(interleave);
        }
        if let Some(partition_by) = &self.partition_by {
            f.write_str(" ");
            f.write_node(partition_by);
        }
    }
}
impl_display!(UniqueConstraintDef);

/// A table-level `CHECK` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConstraintDef {
    pub name: Option<Ident>,
    pub expr: Expr,
}

impl AstDisplay for CheckConstraintDef {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        if let Some(name) = &self.name {
            f.write_str("CONSTRAINT ");
            f.write_node(name);
            f.write_str(" ");
        }
        f.write_str("CHECK (");
        f.write_node(&self.expr);
        f.write_str(")");
    }
}
impl_display!(CheckConstraintDef);

/// A table-level `FOREIGN KEY` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub name: Option<Ident>,
    pub table: UnresolvedTableName,
    pub from_cols: Vec<Ident>,
    /// The referenced columns; the target's primary key when empty.
    pub to_cols: Vec<Ident>,
    pub actions: ReferenceActions,
}

impl AstDisplay for ForeignKeyDef {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        if let Some(name) = &self.name {
            f.write_str("CONSTRAINT ");
            f.write_node(name);
            f.write_str(" ");
        }
        f.write_str("FOREIGN KEY (");
        f.write_node(&comma_separated(&self.from_cols));
        f.write_str(") REFERENCES ");
        f.write_node(&self.table);
        if !self.to_cols.is_empty() {
            f.write_str(" (");
            f.write_node(&comma_separated(&self.to_cols));
            f.write_str(")");
        }
        if self.actions.on_delete != ReferenceAction::NoAction {
            f.write_str(" ON DELETE ");
            f.write_node(&self.actions.on_delete);
        }
        if self.actions.on_update != ReferenceAction::NoAction {
            f.write_str(" ON UPDATE ");
            f.write_node(&self.actions.on_update);
        }
    }
}
impl_display!(ForeignKeyDef);

/// A `FAMILY` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDef {
    pub name: Ident,
    pub columns: Vec<Ident>,
}

impl AstDisplay for FamilyDef {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("FAMILY ");
        f.write_node(&self.name);
        f.write_str(" (");
        f.write_node(&comma_separated(&self.columns));
        f.write_str(")");
    }
}
impl_display!(FamilyDef);

/// `CREATE DATABASE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatabaseStatement {
    pub name: Ident,
    pub if_not_exists: bool,
    pub template: Option<String>,
    pub encoding: Option<String>,
    pub collate: Option<String>,
    pub ctype: Option<String>,
}

impl AstDisplay for CreateDatabaseStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("CREATE DATABASE ");
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ");
        }
        f.write_node(&self.name);
        for (option, value) in [
            ("TEMPLATE", &self.template),
            ("ENCODING", &self.encoding),
            ("LC_COLLATE", &self.collate),
            ("LC_CTYPE", &self.ctype),
        ] {
            if let Some(value) = value {
                f.write_str(" ");
                f.write_str(option);
                f.write_str(" = '");
                f.write_str(&escape_single_quote_string(value));
                f.write_str("'");
            }
        }
    }
}
impl_display!(CreateDatabaseStatement);

/// `CREATE TABLE`, in both its definition and `AS` forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableStatement {
    pub name: UnresolvedTableName,
    pub defs: Vec<TableDef>,
    pub if_not_exists: bool,
    pub interleave: Option<InterleaveDef>,
    pub partition_by: Option<PartitionBy>,
    pub as_source: Option<Query>,
    pub as_column_names: Vec<Ident>,
}

impl CreateTableStatement {
    /// Whether this is the `CREATE TABLE ... AS ...` form.
    pub fn is_as(&self) -> bool {
        self.as_source.is_some()
    }
}

impl AstDisplay for CreateTableStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("CREATE TABLE ");
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ");
        }
        f.write_node(&self.name);
        if let Some(query) = &self.as_source {
            if !self.as_column_names.is_empty() {
                f.write_str(" (");
                f.write_node(&comma_separated(&self.as_column_names));
                f.write_str(")");
            }
            f.write_str(" AS ");
            f.write_node(query);
        } else {
            f.write_str(" (");
            f.write_node(&comma_separated(&self.defs));
            f.write_str(")");
            if let Some(interleave) = &self.interleave {
                f.write_str(" ");
                f.write_node(interleave);
            }
            if let Some(partition_by) = &self.partition_by {
                f.write_str(" ");
                f.write_node(partition_by);
            }
        }
    }
}
impl_display!(CreateTableStatement);

/// `CREATE VIEW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateViewStatement {
    pub name: UnresolvedTableName,
    pub column_names: Vec<Ident>,
    pub query: Query,
}

impl AstDisplay for CreateViewStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("CREATE VIEW ");
        f.write_node(&self.name);
        if !self.column_names.is_empty() {
            f.write_str(" (");
            f.write_node(&comma_separated(&self.column_names));
            f.write_str(")");
        }
        f.write_str(" AS ");
        f.write_node(&self.query);
    }
}
impl_display!(CreateViewStatement);

/// One option in `CREATE SEQUENCE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceOption {
    Increment(i64),
    MinValue(i64),
    NoMinValue,
    MaxValue(i64),
    NoMaxValue,
    Start(i64),
    Cycle,
    NoCycle,
}

impl AstDisplay for SequenceOption {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            SequenceOption::Increment(v) => f.write_str(format!("INCREMENT {}", v)),
            SequenceOption::MinValue(v) => f.write_str(format!("MINVALUE {}", v)),
            SequenceOption::NoMinValue => f.write_str("NO MINVALUE"),
            SequenceOption::MaxValue(v) => f.write_str(format!("MAXVALUE {}", v)),
            SequenceOption::NoMaxValue => f.write_str("NO MAXVALUE"),
            SequenceOption::Start(v) => f.write_str(format!("START {}", v)),
            SequenceOption::Cycle => f.write_str("CYCLE"),
            SequenceOption::NoCycle => f.write_str("NO CYCLE"),
        }
    }
}
impl_display!(SequenceOption);

/// `CREATE SEQUENCE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSequenceStatement {
    pub name: UnresolvedTableName,
    pub if_not_exists: bool,
    pub options: Vec<SequenceOption>,
}

impl AstDisplay for CreateSequenceStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("CREATE SEQUENCE ");
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ");
        }
        f.write_node(&self.name);
        for option in &self.options {
            f.write_str(" ");
            f.write_node(option);
        }
    }
}
impl_display!(CreateSequenceStatement);

/// `CREATE INDEX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexStatement {
    pub name: Ident,
    pub table: UnresolvedTableName,
    pub unique: bool,
    pub if_not_exists: bool,
    pub columns: Vec<IndexElem>,
    pub storing: Vec<Ident>,
    pub interleave: Option<InterleaveDef>,
    pub partition_by: Option<PartitionBy>,
}

impl AstDisplay for CreateIndexStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("CREATE ");
        if self.unique {
            f.write_str("UNIQUE ");
        }
        f.write_str("INDEX ");
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ");
        }
        f.write_node(&self.name);
        f.write_str(" ON ");
        f.write_node(&self.table);
        f.write_str(" (");
        f.write_node(&comma_separated(&self.columns));
        f.write_str(")");
        if !self.storing.is_empty() {
            f.write_str(" STORING (");
            f.write_node(&comma_separated(&self.storing));
            f.write_str(")");
        }
        if let Some(interleave) = &self.interleave {
            f.write_str(" ");
            f.write_node(interleave);
        }
        if let Some(partition_by) = &self.partition_by {
            f.write_str(" ");
            f.write_node(partition_by);
        }
    }
}
impl_display!(CreateIndexStatement);

/// `CREATE USER`. The name and password are expressions so that the
/// session layer can thread string parameters through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserStatement {
    pub name: Expr,
    pub password: Option<Expr>,
    pub if_not_exists: bool,
}

impl AstDisplay for CreateUserStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("CREATE USER ");
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ");
        }
        f.write_node(&self.name);
        if self.password.is_some() {
            // Never reveal the password, even in diagnostics.
            f.write_str(" WITH PASSWORD *****");
        }
    }
}
impl_display!(CreateUserStatement);

/// `ALTER USER ... WITH PASSWORD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterUserSetPasswordStatement {
    pub name: Expr,
    pub password: Expr,
    pub if_exists: bool,
}

impl AstDisplay for AlterUserSetPasswordStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("ALTER USER ");
        if self.if_exists {
            f.write_str("IF EXISTS ");
        }
        f.write_node(&self.name);
        f.write_str(" WITH PASSWORD *****");
    }
}
impl_display!(AlterUserSetPasswordStatement);

/// A parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateDatabase(CreateDatabaseStatement),
    CreateTable(CreateTableStatement),
    CreateView(CreateViewStatement),
    CreateSequence(CreateSequenceStatement),
    CreateIndex(CreateIndexStatement),
    CreateUser(CreateUserStatement),
    AlterUserSetPassword(AlterUserSetPasswordStatement),
}

impl AstDisplay for Statement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            Statement::CreateDatabase(stmt) => f.write_node(stmt),
            Statement::CreateTable(stmt) => f.write_node(stmt),
            Statement::CreateView(stmt) => f.write_node(stmt),
            Statement::CreateSequence(stmt) => f.write_node(stmt),
            Statement::CreateIndex(stmt) => f.write_node(stmt),
            Statement::CreateUser(stmt) => f.write_node(stmt),
            Statement::AlterUserSetPassword(stmt) => f.write_node(stmt),
        }
    }
}
impl_display!(Statement);

/// A query, as much of it as view creation needs to traverse and
/// re-serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub ctes: Vec<Cte>,
    pub body: SetExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cte {
    pub alias: Ident,
    pub query: Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetExpr {
    Select(Box<Select>),
    Values(Vec<Vec<Expr>>),
    Op {
        op: SetOperator,
        left: Box<SetExpr>,
        right: Box<SetExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Except,
    Intersect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Vec<TableFactor>,
    pub selection: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    Expr { expr: Expr, alias: Option<Ident> },
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableFactor {
    Table {
        name: UnresolvedTableName,
        alias: Option<Ident>,
    },
    Derived {
        subquery: Box<Query>,
        alias: Option<Ident>,
    },
}

impl AstDisplay for Query {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        if !self.ctes.is_empty() {
            f.write_str("WITH ");
            f.write_node(&comma_separated(&self.ctes));
            f.write_str(" ");
        }
        f.write_node(&self.body);
    }
}
impl_display!(Query);

impl AstDisplay for Cte {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_node(&self.alias);
        f.write_str(" AS (");
        f.write_node(&self.query);
        f.write_str(")");
    }
}
impl_display!(Cte);

impl AstDisplay for SetExpr {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            SetExpr::Select(select) => f.write_node(&**select),
            SetExpr::Values(rows) => {
                f.write_str("VALUES ");
                let mut delim = "";
                for row in rows {
                    f.write_str(delim);
                    delim = ", ";
                    f.write_str("(");
                    f.write_node(&comma_separated(row));
                    f.write_str(")");
                }
            }
            SetExpr::Op { op, left, right } => {
                f.write_node(&**left);
                match op {
                    SetOperator::Union => f.write_str(" UNION "),
                    SetOperator::Except => f.write_str(" EXCEPT "),
                    SetOperator::Intersect => f.write_str(" INTERSECT "),
                }
                f.write_node(&**right);
            }
        }
    }
}
impl_display!(SetExpr);

impl AstDisplay for Select {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("SELECT ");
        if self.distinct {
            f.write_str("DISTINCT ");
        }
        f.write_node(&comma_separated(&self.projection));
        if !self.from.is_empty() {
            f.write_str(" FROM ");
            f.write_node(&comma_separated(&self.from));
        }
        if let Some(selection) = &self.selection {
            f.write_str(" WHERE ");
            f.write_node(selection);
        }
    }
}
impl_display!(Select);

impl AstDisplay for SelectItem {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            SelectItem::Expr { expr, alias } => {
                f.write_node(expr);
                if let Some(alias) = alias {
                    f.write_str(" AS ");
                    f.write_node(alias);
                }
            }
            SelectItem::Wildcard => f.write_str("*"),
        }
    }
}
impl_display!(SelectItem);

impl AstDisplay for TableFactor {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            TableFactor::Table { name, alias } => {
                f.write_node(name);
                if let Some(alias) = alias {
                    f.write_str(" AS ");
                    f.write_node(alias);
                }
            }
            TableFactor::Derived { subquery, alias } => {
                f.write_str("(");
                f.write_node(&**subquery);
                f.write_str(")");
                if let Some(alias) = alias {
                    f.write_str(" AS ");
                    f.write_node(alias);
                }
            }
        }
    }
}
impl_display!(TableFactor);
