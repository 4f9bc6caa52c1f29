// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Granite catalog: descriptors and their transactional storage.
//!
//! A descriptor is the serialized metadata record for a database, table,
//! view, or sequence. Descriptors reference each other only by id (foreign
//! keys, view dependencies, interleaves); the cyclic graph they form is
//! resolved through catalog lookups, never through direct references, so a
//! stale cached copy can never hold a stale pointer.
//!
//! Storage is a thin layer over a transactional KV store: a naming entry
//! `(parent_id, name) → id` plus the descriptor payload at its id. All
//! mutations made by one DDL statement commit atomically with the
//! statement's transaction.

mod error;
mod ids;

pub mod descriptor;
pub mod event;
pub mod jobs;
pub mod keys;
pub mod kv;
pub mod privilege;
pub mod store;
pub mod system;

pub use error::CatalogError;
pub use ids::{ColumnId, DescId, FamilyId, IndexId, MutationId};
