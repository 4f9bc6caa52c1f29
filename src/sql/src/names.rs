// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Structured name types and qualification.

use std::fmt;

use crate::ast::display::{AstDisplay, AstFormatter};
use crate::ast::{Ident, UnresolvedTableName};
use crate::normalize;
use crate::plan::PlanError;

/// A fully qualified relation name.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableName {
    pub database: String,
    pub table: String,
}

impl AstDisplay for TableName {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_node(&Ident::new(self.database.clone()));
        f.write_str(".");
        f.write_node(&Ident::new(self.table.clone()));
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_ast_string())
    }
}

/// Qualifies `name` against the session's current database. A name that
/// already carries a database keeps it; a bare name requires the session
/// to have one selected.
pub fn normalize_table_name(
    name: &UnresolvedTableName,
    session_database: &str,
) -> Result<TableName, PlanError> {
    match name.0.as_slice() {
        [table] => {
            if session_database.is_empty() {
                return Err(PlanError::NoDatabaseSelected);
            }
            Ok(TableName {
                database: session_database.into(),
                table: normalize::ident(table),
            })
        }
        [database, table] => Ok(TableName {
            database: normalize::ident(database),
            table: normalize::ident(table),
        }),
        _ => Err(PlanError::MisqualifiedName(name.to_string())),
    }
}

/// Rewrites `name` in place to its fully qualified form, as
/// [`normalize_table_name`] would resolve it. View planning persists
/// this rewrite into the stored query text.
pub fn qualify_table_name(
    name: &mut UnresolvedTableName,
    session_database: &str,
) -> Result<(), PlanError> {
    let resolved = normalize_table_name(name, session_database)?;
    name.0 = vec![
        Ident::new(resolved.database),
        Ident::new(resolved.table),
    ];
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_take_the_session_database() {
        let name = UnresolvedTableName(vec![Ident::new("T")]);
        let resolved = normalize_table_name(&name, "db1").unwrap();
        assert_eq!(resolved.database, "db1");
        assert_eq!(resolved.table, "t");
    }

    #[test]
    fn bare_name_without_database_fails() {
        let name = UnresolvedTableName(vec![Ident::new("t")]);
        assert!(matches!(
            normalize_table_name(&name, ""),
            Err(PlanError::NoDatabaseSelected)
        ));
    }

    #[test]
    fn qualification_persists_into_the_name() {
        let mut name = UnresolvedTableName(vec![Ident::new("t")]);
        qualify_table_name(&mut name, "db1").unwrap();
        assert_eq!(name.to_string(), "db1.t");
    }

    #[test]
    fn overqualified_names_are_rejected() {
        let name = UnresolvedTableName(vec![
            Ident::new("a"),
            Ident::new("b"),
            Ident::new("c"),
        ]);
        assert!(matches!(
            normalize_table_name(&name, "db1"),
            Err(PlanError::MisqualifiedName(_))
        ));
    }
}
