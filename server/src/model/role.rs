// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! The `Role` and `Guard` data types.

use ers_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user, which determines the operations the user may perform.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Role {
    /// Manages user accounts.
    #[serde(rename = "ADMIN")]
    Admin,

    /// Approves or denies reimbursement requests.
    #[serde(rename = "FINANCIAL MANAGER")]
    FinancialManager,

    /// Submits reimbursement requests.
    #[serde(rename = "EMPLOYEE")]
    Employee,

    /// Cannot do anything.  Also the fallback for unknown roles found in the database.
    #[serde(rename = "LOCKED")]
    Locked,
}

impl Role {
    /// All roles, in the order of their identifiers.
    pub const ALL: [Role; 4] = [Role::Admin, Role::FinancialManager, Role::Employee, Role::Locked];

    /// Maps a role identifier as stored in the database.  Unknown identifiers lock the account.
    pub fn from_id(id: i32) -> Self {
        match id {
            1 => Role::Admin,
            2 => Role::FinancialManager,
            3 => Role::Employee,
            _ => Role::Locked,
        }
    }

    /// Returns the identifier of the role in the database.
    pub fn id(self) -> i32 {
        match self {
            Role::Admin => 1,
            Role::FinancialManager => 2,
            Role::Employee => 3,
            Role::Locked => 4,
        }
    }

    /// Returns the public name of the role.
    pub fn name(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::FinancialManager => "FINANCIAL MANAGER",
            Role::Employee => "EMPLOYEE",
            Role::Locked => "LOCKED",
        }
    }

    /// Parses a role name coming from untrusted input, ignoring case.
    pub fn parse(name: &str) -> ModelResult<Self> {
        let name = name.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ModelError(format!("Unknown role '{}'", name)))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of roles allowed to reach a group of operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Guard {
    /// Any user whose account is not locked.
    Authenticated,

    /// Administrators only.
    AdminOnly,

    /// Financial managers only.
    FinanceOnly,

    /// Employees and financial managers.
    Staff,
}

impl Guard {
    /// Returns true if a user with `role` may pass this guard.
    pub fn allows(self, role: Role) -> bool {
        match self {
            Guard::Authenticated => role != Role::Locked,
            Guard::AdminOnly => role == Role::Admin,
            Guard::FinanceOnly => role == Role::FinancialManager,
            Guard::Staff => matches!(role, Role::Employee | Role::FinancialManager),
        }
    }
}
