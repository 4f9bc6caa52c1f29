// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A hybrid logical-clock timestamp.
///
/// Descriptors record the transaction's origin timestamp as their
/// modification time. The DDL core never compares timestamps across
/// nodes; it only needs a total order and a zero value.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    /// Nanoseconds since the Unix epoch.
    pub wall_time: i64,
    /// Ties between equal wall times.
    pub logical: i32,
}

impl Timestamp {
    pub const MIN: Timestamp = Timestamp {
        wall_time: 0,
        logical: 0,
    };

    pub fn new(wall_time: i64, logical: i32) -> Timestamp {
        Timestamp { wall_time, logical }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:09}", self.wall_time, self.logical)
    }
}
