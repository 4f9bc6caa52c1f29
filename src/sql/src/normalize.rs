// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Normalization of identifiers and usernames.

use gr_repr::ColumnName;
use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::Ident;
use crate::plan::PlanError;

/// Normalizes an identifier: the case-insensitive form is folded to
/// lowercase.
pub fn ident(ident: &Ident) -> String {
    ident.as_str().to_lowercase()
}

/// Normalizes an identifier into a column name.
pub fn column_name(id: &Ident) -> ColumnName {
    ColumnName::from(ident(id))
}

const USERNAME_HELP: &str = "usernames are case insensitive, must start with a letter \
or underscore, may contain letters, digits or underscores, and must not exceed 63 characters";

lazy_static! {
    static ref USERNAME_RE: Regex =
        Regex::new(r"^[\p{Ll}_][\p{Ll}0-9_]{0,62}$").expect("valid regex");
}

/// Usernames reserved for internal principals.
const RESERVED_USERNAMES: &[&str] = &["node"];

/// Case-folds `username` and verifies it against the username pattern
/// and the reserved set.
pub fn normalize_and_validate_username(username: &str) -> Result<String, PlanError> {
    let username = username.to_lowercase();
    if !USERNAME_RE.is_match(&username) {
        sql_bail!("username \"{}\" invalid; {}", username, USERNAME_HELP);
    }
    if RESERVED_USERNAMES.contains(&username.as_str()) {
        sql_bail!("username \"{}\" reserved", username);
    }
    Ok(username)
}
