// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// The type of a column as stored in a descriptor.
///
/// A `ScalarType` carries modifiers like a string's maximum length. Two
/// types that differ only in their modifiers still compare equal at the
/// semantic level; see [`ScalarType::semantic`]. Foreign key resolution,
/// for example, only requires semantic equality between the referencing
/// and referenced columns.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    String {
        /// The maximum length of a value, if constrained, as in
        /// `STRING(10)`. Purely a constraint; it does not affect the
        /// semantic type.
        max_length: Option<u64>,
    },
    Bytes,
    Timestamp,
    /// The legacy `VECTOR` type. It survives only in virtual tables;
    /// the descriptor builder rejects it everywhere else.
    Vector,
}

/// The semantic class of a [`ScalarType`], with modifiers erased.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Bool,
    Int,
    Float,
    String,
    Bytes,
    Timestamp,
    Vector,
}

impl ScalarType {
    /// Reports the semantic class of this type.
    pub fn semantic(&self) -> SemanticType {
        match self {
            ScalarType::Bool => SemanticType::Bool,
            ScalarType::Int => SemanticType::Int,
            ScalarType::Float => SemanticType::Float,
            ScalarType::String { .. } => SemanticType::String,
            ScalarType::Bytes => SemanticType::Bytes,
            ScalarType::Timestamp => SemanticType::Timestamp,
            ScalarType::Vector => SemanticType::Vector,
        }
    }

    /// Reports whether `datum` is a valid value of this type.
    pub fn accepts(&self, datum: &Datum) -> bool {
        match datum {
            Datum::Null => true,
            Datum::True | Datum::False => self.semantic() == SemanticType::Bool,
            Datum::Int64(_) => self.semantic() == SemanticType::Int,
            Datum::Float64(_) => self.semantic() == SemanticType::Float,
            Datum::String(_) => self.semantic() == SemanticType::String,
            Datum::Bytes(_) => self.semantic() == SemanticType::Bytes,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScalarType::Bool => f.write_str("BOOL"),
            ScalarType::Int => f.write_str("INT"),
            ScalarType::Float => f.write_str("FLOAT"),
            ScalarType::String { max_length: None } => f.write_str("STRING"),
            ScalarType::String {
                max_length: Some(n),
            } => write!(f, "STRING({})", n),
            ScalarType::Bytes => f.write_str("BYTES"),
            ScalarType::Timestamp => f.write_str("TIMESTAMP"),
            ScalarType::Vector => f.write_str("VECTOR"),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SemanticType::Bool => f.write_str("bool"),
            SemanticType::Int => f.write_str("int"),
            SemanticType::Float => f.write_str("float"),
            SemanticType::String => f.write_str("string"),
            SemanticType::Bytes => f.write_str("bytes"),
            SemanticType::Timestamp => f.write_str("timestamp"),
            SemanticType::Vector => f.write_str("vector"),
        }
    }
}

/// A single value.
///
/// Unlike a full query engine, the DDL core only ever materializes datums
/// while evaluating constant expressions (partition boundary tuples), so
/// an owned representation is fine here.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Datum {
    Null,
    True,
    False,
    Int64(i64),
    Float64(OrderedFloat<f64>),
    String(String),
    Bytes(Vec<u8>),
}

impl Datum {
    pub fn from_bool(b: bool) -> Datum {
        if b {
            Datum::True
        } else {
            Datum::False
        }
    }

    /// Reports the type this datum most naturally belongs to, or `None`
    /// for `Null`, which belongs to every type.
    pub fn semantic(&self) -> Option<SemanticType> {
        match self {
            Datum::Null => None,
            Datum::True | Datum::False => Some(SemanticType::Bool),
            Datum::Int64(_) => Some(SemanticType::Int),
            Datum::Float64(_) => Some(SemanticType::Float),
            Datum::String(_) => Some(SemanticType::String),
            Datum::Bytes(_) => Some(SemanticType::Bytes),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Datum::Null => f.write_str("NULL"),
            Datum::True => f.write_str("true"),
            Datum::False => f.write_str("false"),
            Datum::Int64(i) => write!(f, "{}", i),
            Datum::Float64(n) => write!(f, "{}", n),
            Datum::String(s) => write!(f, "'{}'", s),
            Datum::Bytes(b) => {
                f.write_str("x'")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                f.write_str("'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_type_ignores_modifiers() {
        let narrow = ScalarType::String {
            max_length: Some(10),
        };
        let wide = ScalarType::String { max_length: None };
        assert_ne!(narrow, wide);
        assert_eq!(narrow.semantic(), wide.semantic());
    }

    #[test]
    fn accepts_null_everywhere() {
        for ty in [ScalarType::Bool, ScalarType::Int, ScalarType::Bytes] {
            assert!(ty.accepts(&Datum::Null));
        }
        assert!(ScalarType::Int.accepts(&Datum::Int64(42)));
        assert!(!ScalarType::Int.accepts(&Datum::String("42".into())));
    }
}
