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

//! Pure predicates to validate untrusted input before it reaches the database.

use std::collections::BTreeMap;

/// Describes the properties of a payload type so that they can be checked by name.
pub trait Record {
    /// Names of all the properties of the type, as they appear in JSON.
    const FIELDS: &'static [&'static str];

    /// Subset of `FIELDS` that can be used to look up a single record.
    const UNIQUE_KEYS: &'static [&'static str];

    /// Returns true if `field` holds a non-empty, non-zero value.  Unknown fields have no value.
    fn has_value(&self, field: &str) -> bool;
}

/// Returns true if `x` is a positive integer that fits in a record identifier.
pub fn is_valid_id(x: f64) -> bool {
    x.is_finite() && x >= 1.0 && x.fract() == 0.0 && x <= f64::from(i32::MAX)
}

/// Returns true if none of `xs` is empty.
pub fn is_valid_strings(xs: &[&str]) -> bool {
    xs.iter().all(|x| !x.is_empty())
}

/// Returns true if every property of `obj` that is not listed in `nullable` holds a value.
pub fn is_valid_object<T: Record>(obj: &T, nullable: &[&str]) -> bool {
    T::FIELDS.iter().filter(|field| !nullable.contains(field)).all(|field| obj.has_value(field))
}

/// Returns true if `prop` names a property of `T`.
pub fn is_property_of<T: Record>(prop: &str) -> bool {
    T::FIELDS.contains(&prop)
}

/// Returns true if `obj` carries no keys at all.
pub fn is_empty_object(obj: &BTreeMap<String, String>) -> bool {
    obj.is_empty()
}
