// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! SQL DDL planning and catalog mutation.
//!
//! This crate turns parsed `CREATE ...` and `ALTER USER` statements into
//! plan nodes, and executes those plan nodes against the catalog inside
//! the session's transaction: building descriptors, resolving
//! constraints, wiring interleaves and partitions, and scheduling
//! asynchronous index backfill.
//!
//! Parsing itself lives upstream; this crate consumes the statement AST.

/// Returns a `PlanError::Unstructured` from the enclosing function.
#[macro_export]
macro_rules! sql_bail {
    ($($arg:tt)*) => {
        return Err($crate::plan::PlanError::Unstructured(format!($($arg)*)))
    };
}

/// Returns a `PlanError::Unsupported` from the enclosing function,
/// optionally tagged with the tracking issue for the feature.
#[macro_export]
macro_rules! bail_unsupported {
    ($feature:expr) => {
        return Err($crate::plan::PlanError::Unsupported {
            feature: $feature.to_string(),
            issue_no: None,
        })
    };
    ($issue:expr, $feature:expr) => {
        return Err($crate::plan::PlanError::Unsupported {
            feature: $feature.to_string(),
            issue_no: Some($issue),
        })
    };
}

pub mod ast;
pub mod exec;
pub mod names;
pub mod normalize;
pub mod plan;
pub mod session;
pub mod testing;
