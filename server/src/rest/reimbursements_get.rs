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

//! API to list reimbursements, to filter them or to look one up by a unique property.

use crate::driver::Driver;
use crate::model::Guard;
use crate::rest::require;
use crate::validator::is_empty_object;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use ers_core::rest::{EmptyBody, RestError};
use std::collections::BTreeMap;

/// Query keys that select the filtering mode instead of the unique-key lookup.
const FILTER_KEYS: &[&str] = &["status", "type"];

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    _: EmptyBody,
) -> Result<Response, RestError> {
    require(driver.clone(), &headers, Guard::Authenticated).await?;

    if is_empty_object(&query) {
        let reimbursements = driver.get_all_reimbursements().await?;
        Ok(Json(reimbursements).into_response())
    } else if query.keys().all(|key| FILTER_KEYS.contains(&key.as_str())) {
        let status = query.get("status").map(String::as_str);
        let reimb_type = query.get("type").map(String::as_str);
        let reimbursements = driver.get_reimbursements_by_filter(status, reimb_type).await?;
        Ok(Json(reimbursements).into_response())
    } else {
        let reimbursement = driver.get_reimbursement_by_unique_key(query).await?;
        Ok(Json(reimbursement).into_response())
    }
}
