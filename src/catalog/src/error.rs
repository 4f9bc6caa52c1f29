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

use crate::ids::DescId;
use crate::kv::KvError;

/// An error from resolving or persisting catalog state.
#[derive(Clone, Debug)]
pub enum CatalogError {
    /// The named database does not exist.
    UnknownDatabase(String),
    /// The named relation does not exist.
    UnknownRelation(String),
    /// A database with the given name already exists.
    DatabaseAlreadyExists(String),
    /// A relation with the given name already exists under its database.
    RelationAlreadyExists(String),
    /// The named relation exists but is still being added and the caller
    /// did not opt in to observing adding relations.
    RelationAdding(String),
    /// A naming entry resolved to a descriptor of the wrong kind.
    WrongDescriptorType {
        name: String,
        expected: &'static str,
    },
    /// A table definition or descriptor failed structural validation.
    InvalidTableDefinition(String),
    /// A descriptor id resolved to no payload, or to one that failed to
    /// deserialize. Always indicates corruption or a bug.
    InvalidDescriptor(DescId),
    /// The underlying KV operation failed.
    Kv(KvError),
    /// A descriptor payload failed to (de)serialize.
    Serialization(String),
}

impl CatalogError {
    /// The SQLSTATE code for this error, where clients distinguish it.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::UnknownDatabase(_) => "3D000",
            CatalogError::UnknownRelation(_) | CatalogError::RelationAdding(_) => "42P01",
            CatalogError::DatabaseAlreadyExists(_) => "42P04",
            CatalogError::RelationAlreadyExists(_) => "42P07",
            CatalogError::WrongDescriptorType { .. } => "42809",
            CatalogError::InvalidTableDefinition(_) => "42601",
            CatalogError::InvalidDescriptor(_)
            | CatalogError::Kv(_)
            | CatalogError::Serialization(_) => "XX000",
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CatalogError::UnknownDatabase(name) => {
                write!(f, "database \"{}\" does not exist", name)
            }
            CatalogError::UnknownRelation(name) => {
                write!(f, "relation \"{}\" does not exist", name)
            }
            CatalogError::DatabaseAlreadyExists(name) => {
                write!(f, "database \"{}\" already exists", name)
            }
            CatalogError::RelationAlreadyExists(name) => {
                write!(f, "relation \"{}\" already exists", name)
            }
            CatalogError::RelationAdding(name) => {
                write!(f, "relation \"{}\" is being added, try again later", name)
            }
            CatalogError::WrongDescriptorType { name, expected } => {
                write!(f, "\"{}\" is not a {}", name, expected)
            }
            CatalogError::InvalidTableDefinition(msg) => f.write_str(msg),
            CatalogError::InvalidDescriptor(id) => {
                write!(f, "descriptor {} is invalid", id)
            }
            CatalogError::Kv(e) => write!(f, "{}", e),
            CatalogError::Serialization(msg) => write!(f, "descriptor serialization: {}", msg),
        }
    }
}

impl Error for CatalogError {}

impl From<KvError> for CatalogError {
    fn from(e: KvError) -> CatalogError {
        CatalogError::Kv(e)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> CatalogError {
        CatalogError::Serialization(e.to_string())
    }
}
