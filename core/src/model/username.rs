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

//! The `Username` data type.

use crate::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a username, matching the width of the column in the schema.
pub(crate) const MAX_USERNAME_LENGTH: usize = 32;

/// Login name of an employee.
///
/// Usernames are unique across the service and compared case-insensitively, so they are stored
/// in lowercase.  Only ASCII letters, digits and the `.`, `-` and `_` separators are accepted.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct Username(String);

impl Username {
    /// Creates a new username from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.is_empty() {
            return Err(ModelError("Username cannot be empty".to_owned()));
        }
        if s.len() > MAX_USERNAME_LENGTH {
            return Err(ModelError(format!(
                "Username cannot be longer than {} characters",
                MAX_USERNAME_LENGTH
            )));
        }
        if let Some(ch) = s.chars().find(|ch| !(ch.is_ascii_alphanumeric() || ".-_".contains(*ch)))
        {
            return Err(ModelError(format!("Unsupported character '{}' in username '{}'", ch, s)));
        }

        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Creates a username without validating it.  Only useful to feed bad data into tests.
    #[cfg(any(test, feature = "testutils"))]
    pub fn new_invalid<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns a string view of the username.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

impl TryFrom<String> for Username {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        Username::new(s)
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&'static str> for Username {
    /// Creates a username from a hardcoded string, which must be valid and lowercase.
    fn from(name: &'static str) -> Self {
        assert_eq!(name, name.to_ascii_lowercase(), "Hardcoded usernames must be lowercase");
        Username::new(name).expect("Hardcoded usernames must be valid")
    }
}
