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

//! The `User` data type and its request payload.

use crate::model::{HashedPassword, Id, Role};
use crate::validator::Record;
use derivative::Derivative;
use derive_getters::Getters;
use derive_more::Constructor;
use ers_core::model::{EmailAddress, ModelResult, Username};
use serde::{Deserialize, Serialize};

/// The mutable properties of a user.
#[derive(Clone, Constructor, Debug, Deserialize, Getters, PartialEq, Serialize)]
pub struct UserDetails {
    /// Login name of the user.
    username: Username,

    /// Given name.
    first_name: String,

    /// Family name.
    last_name: String,

    /// Contact email address.
    email: EmailAddress,

    /// Role granted to the user.
    role: Role,
}

/// Representation of a persisted user.
///
/// The password hash is never serialized.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct User {
    /// Identifier assigned by the database.
    id: Id,

    /// Everything else about the user.
    #[serde(flatten)]
    details: UserDetails,

    /// Hashed password.  Only present while the user is inside the driver.
    #[serde(skip)]
    password: Option<HashedPassword>,
}

impl User {
    /// Creates a new user without a password.
    pub(crate) fn new(id: Id, details: UserDetails) -> Self {
        Self { id, details, password: None }
    }

    /// Modifies a user to attach its password hash.
    pub(crate) fn with_password(mut self, password: HashedPassword) -> Self {
        self.password = Some(password);
        self
    }

    /// Drops the password hash so that the user can leave the driver.
    pub(crate) fn without_password(mut self) -> Self {
        self.password = None;
        self
    }

    /// Gets the user's identifier.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Gets the user's mutable properties.
    pub fn details(&self) -> &UserDetails {
        &self.details
    }

    /// Gets the user's password as a hash.
    pub fn password(&self) -> Option<&HashedPassword> {
        self.password.as_ref()
    }
}

/// Body of the requests that create or replace a user.
///
/// All fields default to empty so that missing properties are reported by `is_valid_object`
/// with a meaningful message instead of a JSON decoding failure.
#[derive(Default, Deserialize, Derivative, Serialize)]
#[derivative(Debug)]
#[serde(default)]
pub struct UserFields {
    /// Identifier, ignored on creation and superseded by the path on updates.
    pub id: Option<i64>,

    /// Login name.
    pub username: String,

    /// Plain text password.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Contact email address.
    pub email: String,

    /// Role name.  Optional on creation, where it defaults to the employee role.
    pub role: Option<String>,
}

impl UserFields {
    /// Converts the payload into validated user details with the given `role`.
    pub(crate) fn to_details(&self, role: Role) -> ModelResult<UserDetails> {
        Ok(UserDetails::new(
            Username::new(&self.username)?,
            self.first_name.clone(),
            self.last_name.clone(),
            EmailAddress::new(&self.email)?,
            role,
        ))
    }
}

impl Record for UserFields {
    const FIELDS: &'static [&'static str] =
        &["id", "username", "password", "first_name", "last_name", "email", "role"];
    const UNIQUE_KEYS: &'static [&'static str] = &["id", "username", "email"];

    fn has_value(&self, field: &str) -> bool {
        match field {
            "id" => self.id.is_some_and(|id| id != 0),
            "username" => !self.username.is_empty(),
            "password" => !self.password.is_empty(),
            "first_name" => !self.first_name.is_empty(),
            "last_name" => !self.last_name.is_empty(),
            "email" => !self.email.is_empty(),
            "role" => self.role.as_ref().is_some_and(|role| !role.is_empty()),
            _ => false,
        }
    }
}
