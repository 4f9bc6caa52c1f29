// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Fundamental data representation for Granite.
//!
//! This crate houses the types that the rest of the system agrees on:
//! scalar types and datums, the table value encoding, and hybrid
//! logical-clock timestamps. It is the bottom of the crate graph; it
//! must not grow dependencies on the catalog or SQL layers.

mod scalar;
mod timestamp;

pub mod row;

pub use scalar::{Datum, ScalarType, SemanticType};
pub use timestamp::Timestamp;

use std::fmt;

use serde::{Deserialize, Serialize};

/// The name of a column in a relation or index.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ColumnName(String);

impl ColumnName {
    /// Returns this column name as a `str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ColumnName {
    fn from(s: String) -> ColumnName {
        ColumnName(s)
    }
}

impl From<&str> for ColumnName {
    fn from(s: &str) -> ColumnName {
        ColumnName(s.into())
    }
}
