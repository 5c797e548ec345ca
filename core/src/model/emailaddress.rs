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

//! The `EmailAddress` data type.

use crate::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of an email address, matching the width of the column in the schema.
pub(crate) const MAX_EMAIL_LENGTH: usize = 64;

/// Contact address of an employee.
///
/// Addresses are only checked for basic shape.  The domain part is stored in lowercase, as it is
/// case insensitive, but the local part is kept verbatim because mail servers may honor its case.
/// Uniqueness across the service follows the normalized form.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new email address from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.trim().is_empty() {
            return Err(ModelError("Email address cannot be empty".to_owned()));
        }
        if s.len() > MAX_EMAIL_LENGTH {
            return Err(ModelError(format!(
                "Email address cannot be longer than {} characters",
                MAX_EMAIL_LENGTH
            )));
        }
        let (local, domain) = match s.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => (local, domain),
            _ => {
                return Err(ModelError(format!(
                    "Email does not look like a valid address '{}'",
                    s
                )));
            }
        };
        if s.contains(char::is_whitespace) {
            return Err(ModelError(format!("Email does not look like a valid address '{}'", s)));
        }

        Ok(Self(format!("{}@{}", local, domain.to_ascii_lowercase())))
    }

    /// Creates an email address without validating it.  Only useful to feed bad data into tests.
    #[cfg(any(test, feature = "testutils"))]
    pub fn new_invalid<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns a string view of the email address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        EmailAddress::new(s)
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&'static str> for EmailAddress {
    fn from(raw: &'static str) -> Self {
        Self::new(raw).expect("Hardcoded email addresses must be valid")
    }
}
