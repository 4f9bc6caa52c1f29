// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::error::Error;
use std::fmt;

use gr_catalog::kv::KvError;
use gr_catalog::CatalogError;

/// An error while planning or executing a DDL statement.
#[derive(Clone, Debug)]
pub enum PlanError {
    /// This feature is not yet supported, but may be at some point.
    Unsupported {
        feature: String,
        issue_no: Option<usize>,
    },
    EmptyDatabaseName,
    NoDatabaseSelected,
    /// A name did not have between one and two components.
    MisqualifiedName(String),
    /// The operation is reserved for the root principal.
    RequiresSuperuser { op: String },
    InsufficientPrivilege {
        user: String,
        privilege: String,
        object: String,
    },
    Catalog(CatalogError),
    /// A foreign key definition could not be resolved against its
    /// target.
    InvalidForeignKey(String),
    DuplicateUser(String),
    UnknownUser(String),
    EmptyPassword,
    Syntax(String),
    /// A bug: an invariant the core maintains was found violated.
    Internal(String),
    Unstructured(String),
}

impl PlanError {
    /// The SQLSTATE code for this error, where callers distinguish it.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::Unsupported { .. } => "0A000",
            PlanError::EmptyDatabaseName
            | PlanError::MisqualifiedName(_)
            | PlanError::Syntax(_) => "42601",
            PlanError::NoDatabaseSelected => "3D000",
            PlanError::RequiresSuperuser { .. } | PlanError::InsufficientPrivilege { .. } => {
                "42501"
            }
            PlanError::Catalog(e) => e.code(),
            PlanError::InvalidForeignKey(_) => "42830",
            PlanError::DuplicateUser(_) => "23505",
            PlanError::UnknownUser(_) => "42704",
            PlanError::EmptyPassword => "28P01",
            PlanError::Internal(_) => "XX000",
            PlanError::Unstructured(_) => "XXUUU",
        }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlanError::Unsupported { feature, issue_no } => {
                write!(f, "unsupported: {}", feature)?;
                if let Some(issue_no) = issue_no {
                    write!(f, " (see issue #{})", issue_no)?;
                }
                Ok(())
            }
            PlanError::EmptyDatabaseName => f.write_str("empty database name"),
            PlanError::NoDatabaseSelected => f.write_str("no database specified"),
            PlanError::MisqualifiedName(name) => write!(
                f,
                "name \"{}\" does not have between 1 and 2 components",
                name
            ),
            PlanError::RequiresSuperuser { op } => {
                write!(f, "only root is allowed to {}", op)
            }
            PlanError::InsufficientPrivilege {
                user,
                privilege,
                object,
            } => write!(
                f,
                "user {} does not have {} privilege on {}",
                user, privilege, object
            ),
            PlanError::Catalog(e) => e.fmt(f),
            PlanError::InvalidForeignKey(msg) => f.write_str(msg),
            PlanError::DuplicateUser(name) => write!(f, "user {} already exists", name),
            PlanError::UnknownUser(name) => write!(f, "user {} does not exist", name),
            PlanError::EmptyPassword => f.write_str("empty passwords are not permitted"),
            PlanError::Syntax(msg) => f.write_str(msg),
            PlanError::Internal(msg) => write!(f, "internal error: {}", msg),
            PlanError::Unstructured(msg) => f.write_str(msg),
        }
    }
}

impl Error for PlanError {}

impl From<CatalogError> for PlanError {
    fn from(e: CatalogError) -> PlanError {
        PlanError::Catalog(e)
    }
}

impl From<KvError> for PlanError {
    fn from(e: KvError) -> PlanError {
        PlanError::Catalog(CatalogError::Kv(e))
    }
}

impl From<anyhow::Error> for PlanError {
    fn from(e: anyhow::Error) -> PlanError {
        PlanError::Unstructured(format!("{:#}", e))
    }
}
