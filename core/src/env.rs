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

//! Access to configuration provided via environment variables.
//!
//! Variables are named `<prefix>_<suffix>` so that a single binary can hold more than one set of
//! settings for the same component, like the production and test databases.

use std::env;
use std::time::Duration;

/// Result type for environment errors.
type Result<T> = std::result::Result<T, String>;

/// Wrapper around an environment variable's value to support conversions to other types.
pub struct Value(String);

impl TryFrom<Value> for String {
    type Error = String;

    fn try_from(value: Value) -> Result<Self> {
        Ok(value.0)
    }
}

/// Generates a `TryFrom<Value>` for a type that can be parsed by `FromStr`.
macro_rules! tryfrom_value_for_fromstr [
    ( $( $t:ty ),+ ) => {
        $(
            impl TryFrom<Value> for $t {
                type Error = String;

                fn try_from(value: Value) -> Result<Self> {
                    value.0.parse::<$t>().map_err(|e| format!("Invalid {}: {}", stringify!($t), e))
                }
            }
        )+
    }
];

tryfrom_value_for_fromstr!(bool, i16, i32, i64, u16, u32, u64, usize);

impl TryFrom<Value> for Duration {
    type Error = String;

    /// Parses durations such as `45s`, `30m`, `12h` or `2d`.  A bare number means seconds.
    fn try_from(value: Value) -> Result<Self> {
        let raw = value.0.trim();
        let (number, multiplier) = match raw.char_indices().last() {
            Some((i, 's')) => (&raw[..i], 1),
            Some((i, 'm')) => (&raw[..i], 60),
            Some((i, 'h')) => (&raw[..i], 60 * 60),
            Some((i, 'd')) => (&raw[..i], 24 * 60 * 60),
            Some(_) => (raw, 1),
            None => return Err("Invalid Duration: empty value".to_owned()),
        };
        let number = number
            .parse::<u64>()
            .map_err(|e| format!("Invalid Duration '{}': {}", raw, e))?;
        match number.checked_mul(multiplier) {
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => Err(format!("Invalid Duration '{}': too large", raw)),
        }
    }
}

/// Reads the variable `name` and converts it to `T`, returning `None` if it is not set.
fn get_var<T: TryFrom<Value, Error = String>>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => match Value(value).try_into() {
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(format!("Invalid type in environment variable {}: {}", name, e)),
        },
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(format!("Invalid value in environment variable {}", name))
        }
    }
}

/// Gets a required environment variable whose name is `<prefix>_<suffix>` with a conversion to
/// a target type `T`.
pub fn get_required_var<T: TryFrom<Value, Error = String>>(
    prefix: &str,
    suffix: &str,
) -> Result<T> {
    let name = format!("{}_{}", prefix, suffix);
    match get_var(&name)? {
        Some(value) => Ok(value),
        None => Err(format!("Required environment variable {} not present", name)),
    }
}

/// Gets an optional environment variable whose name is `<prefix>_<suffix>` with a conversion to
/// a target type `T`.
pub fn get_optional_var<T: TryFrom<Value, Error = String>>(
    prefix: &str,
    suffix: &str,
) -> Result<Option<T>> {
    get_var(&format!("{}_{}", prefix, suffix))
}
