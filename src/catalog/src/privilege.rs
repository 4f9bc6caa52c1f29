// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Privilege descriptors.
//!
//! Administration of privileges (GRANT/REVOKE) lives outside the DDL
//! core; what lives here is the representation stored inside descriptors
//! and the check the planner consults. New relations inherit their
//! database's privileges at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The root principal. Only root may create databases, and root always
/// appears in default privilege descriptors.
pub const ROOT_USER: &str = "root";

/// A kind of privilege on a descriptor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Privilege {
    All,
    Create,
    Drop,
    Grant,
    Select,
    Insert,
    Delete,
    Update,
}

impl Privilege {
    fn bit(self) -> u32 {
        match self {
            Privilege::All => 1 << 0,
            Privilege::Create => 1 << 1,
            Privilege::Drop => 1 << 2,
            Privilege::Grant => 1 << 3,
            Privilege::Select => 1 << 4,
            Privilege::Insert => 1 << 5,
            Privilege::Delete => 1 << 6,
            Privilege::Update => 1 << 7,
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Privilege::All => f.write_str("ALL"),
            Privilege::Create => f.write_str("CREATE"),
            Privilege::Drop => f.write_str("DROP"),
            Privilege::Grant => f.write_str("GRANT"),
            Privilege::Select => f.write_str("SELECT"),
            Privilege::Insert => f.write_str("INSERT"),
            Privilege::Delete => f.write_str("DELETE"),
            Privilege::Update => f.write_str("UPDATE"),
        }
    }
}

/// The privileges of one user on one descriptor.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserPrivileges {
    pub user: String,
    privileges: u32,
}

/// The privileges stored in a descriptor.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PrivilegeDescriptor {
    users: Vec<UserPrivileges>,
}

impl PrivilegeDescriptor {
    /// The default privilege set for a new descriptor: root holds ALL.
    pub fn new_default() -> PrivilegeDescriptor {
        let mut privs = PrivilegeDescriptor::default();
        privs.grant(ROOT_USER, Privilege::All);
        privs
    }

    /// Grants `privilege` to `user`.
    pub fn grant(&mut self, user: &str, privilege: Privilege) {
        if let Some(up) = self.users.iter_mut().find(|up| up.user == user) {
            up.privileges |= privilege.bit();
            return;
        }
        self.users.push(UserPrivileges {
            user: user.into(),
            privileges: privilege.bit(),
        });
    }

    /// Reports whether `user` holds `privilege`, directly or via ALL.
    pub fn check(&self, user: &str, privilege: Privilege) -> bool {
        self.users.iter().any(|up| {
            up.user == user
                && (up.privileges & Privilege::All.bit() != 0
                    || up.privileges & privilege.bit() != 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grants_root_everything() {
        let privs = PrivilegeDescriptor::new_default();
        for p in [Privilege::Create, Privilege::Insert, Privilege::Update] {
            assert!(privs.check(ROOT_USER, p));
        }
        assert!(!privs.check("alice", Privilege::Select));
    }

    #[test]
    fn grant_is_additive() {
        let mut privs = PrivilegeDescriptor::new_default();
        privs.grant("alice", Privilege::Select);
        privs.grant("alice", Privilege::Insert);
        assert!(privs.check("alice", Privilege::Select));
        assert!(privs.check("alice", Privilege::Insert));
        assert!(!privs.check("alice", Privilege::Create));
    }
}
