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

//! The `Id` data type.

use crate::validator::is_valid_id;
use derive_more::Display;
use ers_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the database to a persisted record.
///
/// Always strictly positive and representable as the `INTEGER` type of the schema.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(into = "i32", try_from = "i32")]
pub struct Id(i32);

impl Id {
    /// Creates an identifier from a value read back from the database.
    pub fn new(id: i32) -> ModelResult<Self> {
        if id < 1 {
            return Err(ModelError(format!("Invalid id {}", id)));
        }
        Ok(Self(id))
    }

    /// Parses an identifier out of untrusted text, such as a path segment.
    ///
    /// The text is read as a number first so that values such as `7.0` are accepted but `7.5`,
    /// `-7` or `abc` are not.
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let number = raw.trim().parse::<f64>().unwrap_or(f64::NAN);
        if !is_valid_id(number) {
            return Err(ModelError(format!("Invalid id '{}'", raw)));
        }
        Ok(Self(number as i32))
    }

    /// Returns the raw value of the identifier.
    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<Id> for i32 {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl TryFrom<i32> for Id {
    type Error = ModelError;

    fn try_from(id: i32) -> ModelResult<Self> {
        Id::new(id)
    }
}
