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

//! Business logic for the reimbursement service.

use crate::validator::{Record, is_property_of};
use ers_core::clocks::Clock;
use ers_core::db::{Db, DbError};
use ers_core::driver::{DriverError, DriverResult};
use ers_core::env::get_optional_var;
use ers_core::model::ModelError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

mod auth;
mod reimbursements;
#[cfg(test)]
pub(crate) mod testutils;
mod users;

/// Default value for the `SESSION_MAX_AGE` setting when not specified.
const DEFAULT_SESSION_MAX_AGE_SECONDS: u64 = 24 * 60 * 60;

/// Default value for the `SESSION_MAX_SKEW` setting when not specified.
const DEFAULT_SESSION_MAX_SKEW_SECONDS: u64 = 60 * 60;

/// Configuration options for the driver.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct DriverOptions {
    /// The amount of time we consider sessions valid for.
    pub session_max_age: Duration,

    /// The amount of time we tolerate in clock skew when validating sessions.  We should never see
    /// this, except if we end up serving requests from different machines and their clocks aren't
    /// properly synchronized.
    pub session_max_skew: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            session_max_age: Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECONDS),
            session_max_skew: Duration::from_secs(DEFAULT_SESSION_MAX_SKEW_SECONDS),
        }
    }
}

impl DriverOptions {
    /// Creates a new set of options from environment variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            session_max_age: get_optional_var::<Duration>(prefix, "SESSION_MAX_AGE")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECONDS)),
            session_max_skew: get_optional_var::<Duration>(prefix, "SESSION_MAX_SKEW")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_SESSION_MAX_SKEW_SECONDS)),
        })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Options for the driver.
    opts: DriverOptions,
}

impl Driver {
    /// Creates a new driver backed by the given dependencies.
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        opts: DriverOptions,
    ) -> Self {
        Self { db, clock, opts }
    }
}

/// Extracts the single lookup key from an untrusted `query` meant to find one record of type `T`.
fn single_unique_key<T: Record>(query: &BTreeMap<String, String>) -> DriverResult<(&str, &str)> {
    let mut iter = query.iter();
    let (key, value) = match (iter.next(), iter.next()) {
        (Some((key, value)), None) => (key.as_str(), value.as_str()),
        (None, _) => {
            return Err(DriverError::InvalidInput("A lookup key is required".to_owned()));
        }
        (Some(_), Some(_)) => {
            return Err(DriverError::InvalidInput(
                "Only one lookup key can be provided".to_owned(),
            ));
        }
    };

    if !is_property_of::<T>(key) {
        return Err(DriverError::InvalidInput(format!("Unknown property '{}'", key)));
    }
    if !T::UNIQUE_KEYS.contains(&key) {
        return Err(DriverError::InvalidInput(format!(
            "Property '{}' does not identify a single record",
            key
        )));
    }
    Ok((key, value))
}

/// Converts a `DbError::NotFound` into a `DriverError::NotFound` with a meaningful `message`.
fn not_found_as(message: String) -> impl FnOnce(DbError) -> DriverError {
    move |e| match e {
        DbError::NotFound => DriverError::NotFound(message),
        e => e.into(),
    }
}

/// Converts a failure to hash or to verify a password into a `DriverError::BackendError`.
///
/// These failures come from bcrypt or from a corrupt stored hash, never from the caller's input.
fn password_failure(e: ModelError) -> DriverError {
    DbError::BackendError(e.to_string()).into()
}
